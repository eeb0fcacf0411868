//! Unit tests for the update state machine.
//!
//! The machine is synchronous, so these tests drive complete lifecycle
//! scenarios without a runtime and observe emitted events through a
//! broadcast subscription.

use harbor_updater::services::event_bus::EventBus;
use harbor_updater::services::update_machine::{
    CheckOutcome, DownloadOutcome, NotifyContent, UpdateMachine,
};
use harbor_updater::types::errors::{DownloadError, FeedError};
use harbor_updater::types::update::{
    DownloadProgress, ReleaseManifest, UpdateCheckResult, UpdateEvent, UpdateInfo, UpdatePhase,
};

fn manifest(version: &str) -> ReleaseManifest {
    ReleaseManifest {
        version: version.to_string(),
        release_notes: Some("notes".to_string()),
        asset_name: format!("harbor-{}.pkg", version),
        download_url: format!("https://releases.harbor.app/{}", version),
        size: 2048,
        sha256: None,
    }
}

fn update_info(version: &str) -> UpdateInfo {
    UpdateInfo {
        version: version.to_string(),
        release_notes: Some("notes".to_string()),
        artifact_dir: format!("/cache/harbor-update-{}", version).into(),
        asset_path: format!("/cache/harbor-update-{}/harbor.pkg", version).into(),
        sha256: "abc123".to_string(),
        size: 2048,
    }
}

/// Drives the machine to `Available` for `version`.
fn machine_with_available(version: &str) -> UpdateMachine {
    let mut machine = UpdateMachine::new(EventBus::new());
    assert!(machine.begin_check(false));
    machine.check_completed(Ok(UpdateCheckResult::newer(manifest(version))));
    assert_eq!(machine.phase(), UpdatePhase::Available);
    machine
}

/// Drives the machine to `Downloaded` for `version`, returning the download
/// generation used.
fn machine_with_downloaded(version: &str) -> (UpdateMachine, u64) {
    let mut machine = machine_with_available(version);
    let (generation, _) = machine.begin_download().unwrap();
    let outcome = machine.download_completed(generation, Ok(update_info(version)));
    assert_eq!(
        outcome,
        DownloadOutcome::Completed {
            version: version.to_string()
        }
    );
    (machine, generation)
}

#[test]
fn test_begin_check_from_idle() {
    let mut machine = UpdateMachine::new(EventBus::new());
    assert_eq!(machine.phase(), UpdatePhase::Idle);
    assert!(machine.begin_check(false));
    assert_eq!(machine.phase(), UpdatePhase::Checking);
}

#[test]
fn test_check_not_restarted_while_checking() {
    let mut machine = UpdateMachine::new(EventBus::new());
    assert!(machine.begin_check(false));
    assert!(!machine.begin_check(false));
    assert_eq!(machine.phase(), UpdatePhase::Checking);
}

#[test]
fn test_manual_request_upgrades_running_background_check() {
    let mut machine = UpdateMachine::new(EventBus::new());
    assert!(machine.begin_check(false));
    // Manual request joins the in-flight background check.
    assert!(!machine.begin_check(true));

    let outcome = machine.check_completed(Ok(UpdateCheckResult::up_to_date()));
    assert_eq!(outcome, CheckOutcome::NoUpdate { manual: true });
}

#[test]
fn test_check_suppressed_while_downloading() {
    let mut machine = machine_with_available("2.0.0");
    machine.begin_download().unwrap();
    assert!(!machine.begin_check(true));
    assert_eq!(machine.phase(), UpdatePhase::Downloading);
}

/// A check arriving after an artifact is fully downloaded must not pull the
/// machine back to `Checking`: that would leave the user looking at a restart
/// prompt whose install action can never fire again.
#[test]
fn test_check_suppressed_once_downloaded() {
    let (mut machine, _) = machine_with_downloaded("2.0.0");

    assert!(!machine.begin_check(false));
    assert!(!machine.begin_check(true));
    assert_eq!(machine.phase(), UpdatePhase::Downloaded);

    // The restart prompt and its install action both still work.
    assert!(matches!(
        machine.notification_content(),
        Some(NotifyContent::RestartToInstall { version, .. }) if version == "2.0.0"
    ));
    let info = machine.begin_install().unwrap();
    assert_eq!(info.version, "2.0.0");
}

#[test]
fn test_check_finds_newer_version() {
    let events = EventBus::new();
    let mut rx = events.subscribe();
    let mut machine = UpdateMachine::new(events);

    assert!(machine.begin_check(false));
    let outcome = machine.check_completed(Ok(UpdateCheckResult::newer(manifest("2.0.0"))));

    assert_eq!(
        outcome,
        CheckOutcome::Available {
            version: "2.0.0".to_string()
        }
    );
    assert_eq!(machine.phase(), UpdatePhase::Available);
    assert_eq!(machine.state().version_available.as_deref(), Some("2.0.0"));

    assert!(matches!(
        rx.try_recv().unwrap(),
        UpdateEvent::UpdateAvailable { version } if version == "2.0.0"
    ));
    assert!(matches!(
        rx.try_recv().unwrap(),
        UpdateEvent::MenuRefreshRequested
    ));
}

#[test]
fn test_check_finds_no_update() {
    let events = EventBus::new();
    let mut rx = events.subscribe();
    let mut machine = UpdateMachine::new(events);

    assert!(machine.begin_check(false));
    let outcome = machine.check_completed(Ok(UpdateCheckResult::up_to_date()));

    assert_eq!(outcome, CheckOutcome::NoUpdate { manual: false });
    assert_eq!(machine.phase(), UpdatePhase::Idle);
    assert!(matches!(
        rx.try_recv().unwrap(),
        UpdateEvent::NoUpdateAvailable
    ));
}

#[test]
fn test_check_failure_parks_in_failed_until_acknowledged() {
    let mut machine = UpdateMachine::new(EventBus::new());
    assert!(machine.begin_check(true));

    let outcome =
        machine.check_completed(Err(FeedError::NetworkError("timed out".to_string())));

    assert!(matches!(outcome, CheckOutcome::Failed { manual: true, .. }));
    assert_eq!(machine.phase(), UpdatePhase::Failed);
    assert!(machine
        .state()
        .last_error
        .as_deref()
        .unwrap()
        .contains("timed out"));

    // Once the failure has been routed, the machine settles back to Idle
    // and the error stays recorded for diagnostics.
    machine.acknowledge_failure();
    assert_eq!(machine.phase(), UpdatePhase::Idle);
    assert!(machine.state().last_error.is_some());

    // The next check runs normally.
    assert!(machine.begin_check(false));
}

#[test]
fn test_acknowledge_failure_outside_failed_is_a_noop() {
    let mut machine = machine_with_available("2.0.0");
    machine.acknowledge_failure();
    assert_eq!(machine.phase(), UpdatePhase::Available);
}

#[test]
fn test_check_completion_outside_checking_is_ignored() {
    let mut machine = UpdateMachine::new(EventBus::new());
    let outcome = machine.check_completed(Ok(UpdateCheckResult::up_to_date()));
    assert_eq!(outcome, CheckOutcome::Ignored);
    assert_eq!(machine.phase(), UpdatePhase::Idle);
}

#[test]
fn test_download_requires_available_phase() {
    let mut machine = UpdateMachine::new(EventBus::new());
    assert!(machine.begin_download().is_none());

    let mut machine = machine_with_available("2.0.0");
    let (generation, manifest) = machine.begin_download().unwrap();
    assert_eq!(machine.phase(), UpdatePhase::Downloading);
    assert_eq!(generation, 1);
    assert_eq!(manifest.version, "2.0.0");
}

#[test]
fn test_download_progress_forwarded_only_for_current_generation() {
    let events = EventBus::new();
    let mut rx = events.subscribe();
    let mut machine = UpdateMachine::new(events);
    assert!(machine.begin_check(false));
    machine.check_completed(Ok(UpdateCheckResult::newer(manifest("2.0.0"))));
    while rx.try_recv().is_ok() {}

    let (generation, _) = machine.begin_download().unwrap();
    let progress = DownloadProgress {
        percent: 50.0,
        bytes_per_second: 1024,
        transferred: 1024,
        total: 2048,
    };

    machine.download_progressed(generation + 1, progress);
    assert!(rx.try_recv().is_err());

    machine.download_progressed(generation, progress);
    assert!(matches!(
        rx.try_recv().unwrap(),
        UpdateEvent::DownloadProgress(_)
    ));
}

#[test]
fn test_download_completes() {
    let (machine, _) = machine_with_downloaded("2.0.0");
    assert_eq!(machine.phase(), UpdatePhase::Downloaded);
    assert_eq!(machine.state().version_downloaded.as_deref(), Some("2.0.0"));
}

#[test]
fn test_download_failure_parks_in_failed_until_acknowledged() {
    let mut machine = machine_with_available("2.0.0");
    let (generation, _) = machine.begin_download().unwrap();

    let outcome = machine.download_completed(
        generation,
        Err(DownloadError::NetworkError("reset".to_string())),
    );

    assert!(matches!(outcome, DownloadOutcome::Failed { .. }));
    assert_eq!(machine.phase(), UpdatePhase::Failed);
    assert!(machine.state().last_error.is_some());

    // No prompt is owed for a failed download.
    assert_eq!(machine.notification_content(), None);

    machine.acknowledge_failure();
    assert_eq!(machine.phase(), UpdatePhase::Idle);
}

#[test]
fn test_stale_download_completion_is_dropped() {
    let mut machine = machine_with_available("2.0.0");
    let (generation, _) = machine.begin_download().unwrap();

    let outcome = machine.download_completed(generation + 1, Ok(update_info("2.0.0")));
    assert_eq!(outcome, DownloadOutcome::Stale);
    assert_eq!(machine.phase(), UpdatePhase::Downloading);
}

#[test]
fn test_cancel_returns_to_available_and_invalidates_generation() {
    let mut machine = machine_with_available("2.0.0");
    let (generation, _) = machine.begin_download().unwrap();

    machine.cancel_download();
    assert_eq!(machine.phase(), UpdatePhase::Available);

    // The cancelled download's eventual completion must be a no-op.
    let outcome = machine.download_completed(generation, Ok(update_info("2.0.0")));
    assert_eq!(outcome, DownloadOutcome::Stale);
    assert_eq!(machine.phase(), UpdatePhase::Available);
    assert!(machine.state().version_downloaded.is_none());
}

#[test]
fn test_redownload_after_cancel_uses_fresh_generation() {
    let mut machine = machine_with_available("2.0.0");
    let (first, _) = machine.begin_download().unwrap();
    machine.cancel_download();

    let (second, _) = machine.begin_download().unwrap();
    assert!(second > first);

    let outcome = machine.download_completed(second, Ok(update_info("2.0.0")));
    assert_eq!(
        outcome,
        DownloadOutcome::Completed {
            version: "2.0.0".to_string()
        }
    );
}

#[test]
fn test_install_requires_downloaded_phase() {
    let mut machine = machine_with_available("2.0.0");
    assert!(machine.begin_install().is_none());

    let (mut machine, _) = machine_with_downloaded("2.0.0");
    let info = machine.begin_install().unwrap();
    assert_eq!(info.version, "2.0.0");
    assert_eq!(machine.phase(), UpdatePhase::Installing);
}

#[test]
fn test_notification_content_prefers_downloaded() {
    let machine = UpdateMachine::new(EventBus::new());
    assert_eq!(machine.notification_content(), None);

    let machine = machine_with_available("2.0.0");
    assert_eq!(
        machine.notification_content(),
        Some(NotifyContent::UpdateAvailable {
            version: "2.0.0".to_string()
        })
    );

    let (machine, _) = machine_with_downloaded("2.0.0");
    assert!(matches!(
        machine.notification_content(),
        Some(NotifyContent::RestartToInstall { version, .. }) if version == "2.0.0"
    ));
}
