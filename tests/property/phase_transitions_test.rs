//! Property tests for the update state machine.
//!
//! Feeds arbitrary operation sequences to the machine and checks structural
//! properties that must hold after every step: no panics, phases only reached
//! through their entry operations, generation numbers never going backwards,
//! and downloaded metadata appearing only after a verified completion.

use proptest::prelude::*;

use harbor_updater::services::event_bus::EventBus;
use harbor_updater::services::update_machine::UpdateMachine;
use harbor_updater::types::errors::{DownloadError, FeedError};
use harbor_updater::types::update::{
    ReleaseManifest, UpdateCheckResult, UpdateInfo, UpdatePhase,
};

#[derive(Debug, Clone)]
enum Op {
    BeginCheck { manual: bool },
    CheckFoundUpdate,
    CheckFoundNothing,
    CheckFailed,
    BeginDownload,
    DownloadSucceeded { stale: bool },
    DownloadFailed,
    CancelDownload,
    BeginInstall,
    AcknowledgeFailure,
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        any::<bool>().prop_map(|manual| Op::BeginCheck { manual }),
        Just(Op::CheckFoundUpdate),
        Just(Op::CheckFoundNothing),
        Just(Op::CheckFailed),
        Just(Op::BeginDownload),
        any::<bool>().prop_map(|stale| Op::DownloadSucceeded { stale }),
        Just(Op::DownloadFailed),
        Just(Op::CancelDownload),
        Just(Op::BeginInstall),
        Just(Op::AcknowledgeFailure),
    ]
}

fn manifest(version: &str) -> ReleaseManifest {
    ReleaseManifest {
        version: version.to_string(),
        release_notes: None,
        asset_name: "harbor-test.pkg".to_string(),
        download_url: "https://releases.harbor.app/a".to_string(),
        size: 1,
        sha256: None,
    }
}

fn update_info(version: &str) -> UpdateInfo {
    UpdateInfo {
        version: version.to_string(),
        release_notes: None,
        artifact_dir: "/cache/harbor-update-x".into(),
        asset_path: "/cache/harbor-update-x/harbor.pkg".into(),
        sha256: "ff".to_string(),
        size: 1,
    }
}

fn apply(machine: &mut UpdateMachine, op: &Op) {
    let generation = machine.state().download_generation;
    match op {
        Op::BeginCheck { manual } => {
            machine.begin_check(*manual);
        }
        Op::CheckFoundUpdate => {
            machine.check_completed(Ok(UpdateCheckResult::newer(manifest("9.9.9"))));
        }
        Op::CheckFoundNothing => {
            machine.check_completed(Ok(UpdateCheckResult::up_to_date()));
        }
        Op::CheckFailed => {
            machine.check_completed(Err(FeedError::NetworkError("x".to_string())));
        }
        Op::BeginDownload => {
            machine.begin_download();
        }
        Op::DownloadSucceeded { stale } => {
            let gen = if *stale { generation + 1 } else { generation };
            machine.download_completed(gen, Ok(update_info("9.9.9")));
        }
        Op::DownloadFailed => {
            machine.download_completed(
                generation,
                Err(DownloadError::NetworkError("x".to_string())),
            );
        }
        Op::CancelDownload => {
            machine.cancel_download();
        }
        Op::BeginInstall => {
            machine.begin_install();
        }
        Op::AcknowledgeFailure => {
            machine.acknowledge_failure();
        }
    }
}

proptest! {
    /// Any operation sequence leaves the machine in a coherent state.
    #[test]
    fn machine_state_stays_coherent(ops in prop::collection::vec(op_strategy(), 0..40)) {
        let mut machine = UpdateMachine::new(EventBus::new());
        let mut last_generation = 0;

        for op in &ops {
            apply(&mut machine, op);
            let state = machine.state();

            // Generations only move forward.
            prop_assert!(state.download_generation >= last_generation);
            last_generation = state.download_generation;

            // Downloaded metadata appears and disappears together.
            prop_assert_eq!(
                state.version_downloaded.is_some(),
                state.downloaded.is_some()
            );

            // A download in flight always has a manifest to download.
            if state.phase == UpdatePhase::Downloading {
                prop_assert!(state.available.is_some());
            }

            // Installing keeps the artifact metadata it was started from.
            if state.phase == UpdatePhase::Installing {
                prop_assert!(state.downloaded.is_some());
            }

            // An available version always has its manifest recorded.
            if state.phase == UpdatePhase::Available {
                prop_assert!(state.version_available.is_some());
                prop_assert!(state.available.is_some());
            }

            // A parked failure always carries its error.
            if state.phase == UpdatePhase::Failed {
                prop_assert!(state.last_error.is_some());
            }
        }
    }

    /// A download only ever starts from `Available`, and installing only from
    /// `Downloaded`.
    #[test]
    fn entry_operations_gate_their_phases(ops in prop::collection::vec(op_strategy(), 0..40)) {
        let mut machine = UpdateMachine::new(EventBus::new());

        for op in &ops {
            let before = machine.phase();
            match op {
                Op::BeginDownload => {
                    let started = machine.begin_download().is_some();
                    prop_assert_eq!(started, before == UpdatePhase::Available);
                    if started {
                        prop_assert_eq!(machine.phase(), UpdatePhase::Downloading);
                    }
                }
                Op::BeginInstall => {
                    let started = machine.begin_install().is_some();
                    prop_assert_eq!(started, before == UpdatePhase::Downloaded);
                    if started {
                        prop_assert_eq!(machine.phase(), UpdatePhase::Installing);
                    }
                }
                other => apply(&mut machine, other),
            }
        }
    }

    /// A stale completion never changes the phase.
    #[test]
    fn stale_completions_are_inert(ops in prop::collection::vec(op_strategy(), 0..40)) {
        let mut machine = UpdateMachine::new(EventBus::new());

        for op in &ops {
            if let Op::DownloadSucceeded { stale: true } = op {
                let before = machine.phase();
                apply(&mut machine, op);
                prop_assert_eq!(machine.phase(), before);
            } else {
                apply(&mut machine, op);
            }
        }
    }
}
