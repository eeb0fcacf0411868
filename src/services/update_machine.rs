//! Update State Machine for the Harbor updater.
//!
//! Single source of truth for the update lifecycle and the only place that
//! transitions `UpdateState.phase`. The core is synchronous: every transition
//! happens inside a method call on the service task, so transitions never
//! interleave. Async work (feed checks, downloads, installs) reports back
//! through these methods.

use tracing::{info, warn};

use crate::services::event_bus::EventBus;
use crate::types::errors::{DownloadError, FeedError};
use crate::types::update::{
    DownloadProgress, ReleaseManifest, UpdateCheckResult, UpdateEvent, UpdateInfo, UpdatePhase,
};

/// The single mutable lifecycle record. Owned exclusively by
/// [`UpdateMachine`]; constructed once by the app core, never persisted.
#[derive(Debug)]
pub struct UpdateState {
    pub phase: UpdatePhase,
    pub version_available: Option<String>,
    pub version_downloaded: Option<String>,
    pub available: Option<ReleaseManifest>,
    pub downloaded: Option<UpdateInfo>,
    /// Cancellation token for the in-flight download. A completion carrying
    /// a stale generation is a no-op.
    pub download_generation: u64,
    pub last_error: Option<String>,
}

impl UpdateState {
    fn new() -> Self {
        Self {
            phase: UpdatePhase::Idle,
            version_available: None,
            version_downloaded: None,
            available: None,
            downloaded: None,
            download_generation: 0,
            last_error: None,
        }
    }
}

/// How a completed check should be handled by the service.
#[derive(Debug, PartialEq)]
pub enum CheckOutcome {
    /// A newer version exists; notifications should be (re)scheduled.
    Available { version: String },
    /// Running version is current. A dialog fires only for manual checks.
    NoUpdate { manual: bool },
    /// The check failed. Surfaced to the user only for manual checks.
    Failed { manual: bool, error: String },
    /// The machine was not in `Checking`; the completion was dropped.
    Ignored,
}

/// How a finished download should be handled by the service.
#[derive(Debug, PartialEq)]
pub enum DownloadOutcome {
    /// Artifact fetched and integrity-verified.
    Completed { version: String },
    /// Download failed; phase parked in `Failed` with the error recorded.
    Failed { error: String },
    /// Completion from a cancelled or superseded download; dropped.
    Stale,
}

/// What the notification scheduler should show right now.
/// `Downloaded` beats `Available`, so a stale "available" prompt is
/// superseded once a download completes.
#[derive(Debug, Clone, PartialEq)]
pub enum NotifyContent {
    RestartToInstall {
        version: String,
        release_notes: Option<String>,
    },
    UpdateAvailable {
        version: String,
    },
}

/// Owner of [`UpdateState`]; emits typed events on phase changes.
pub struct UpdateMachine {
    state: UpdateState,
    events: EventBus,
    /// True while the current check was requested manually.
    manual_check: bool,
}

impl UpdateMachine {
    pub fn new(events: EventBus) -> Self {
        Self {
            state: UpdateState::new(),
            events,
            manual_check: false,
        }
    }

    pub fn state(&self) -> &UpdateState {
        &self.state
    }

    pub fn phase(&self) -> UpdatePhase {
        self.state.phase
    }

    /// `Idle → Checking`. Returns true if a feed call should be started.
    ///
    /// A check already running is not restarted; a manual request during a
    /// background check upgrades it so its result surfaces to the user.
    /// Checks are also suppressed from `Downloading` onward: re-entering
    /// `Checking` from `Downloaded` would orphan the verified artifact behind
    /// a restart prompt whose install action no longer fires.
    pub fn begin_check(&mut self, manual: bool) -> bool {
        match self.state.phase {
            UpdatePhase::Checking => {
                if manual {
                    self.manual_check = true;
                }
                false
            }
            UpdatePhase::Downloading | UpdatePhase::Downloaded | UpdatePhase::Installing => {
                info!(phase = ?self.state.phase, "skipping check, update already in progress");
                false
            }
            _ => {
                self.state.phase = UpdatePhase::Checking;
                self.manual_check = manual;
                true
            }
        }
    }

    /// `Checking → Available | Idle | Failed`. Errors park the machine in
    /// `Failed` with the error recorded, never silently dropped; the service
    /// settles it back to `Idle` via [`acknowledge_failure`] once the failure
    /// has been routed.
    ///
    /// [`acknowledge_failure`]: UpdateMachine::acknowledge_failure
    pub fn check_completed(
        &mut self,
        result: Result<UpdateCheckResult, FeedError>,
    ) -> CheckOutcome {
        if self.state.phase != UpdatePhase::Checking {
            warn!(phase = ?self.state.phase, "dropping check completion outside Checking");
            return CheckOutcome::Ignored;
        }
        let manual = self.manual_check;
        self.manual_check = false;

        match result {
            Ok(check) if check.available => {
                // available == manifest present, by construction.
                let manifest = match check.manifest {
                    Some(m) => m,
                    None => {
                        let error = "feed reported availability without a manifest".to_string();
                        self.state.last_error = Some(error.clone());
                        self.state.phase = UpdatePhase::Failed;
                        return CheckOutcome::Failed { manual, error };
                    }
                };
                let version = manifest.version.clone();
                info!(%version, "new version available");
                self.state.phase = UpdatePhase::Available;
                self.state.version_available = Some(version.clone());
                self.state.available = Some(manifest);
                self.events.emit(UpdateEvent::UpdateAvailable {
                    version: version.clone(),
                });
                self.events.emit(UpdateEvent::MenuRefreshRequested);
                CheckOutcome::Available { version }
            }
            Ok(_) => {
                info!("no update available");
                self.state.phase = UpdatePhase::Idle;
                self.events.emit(UpdateEvent::NoUpdateAvailable);
                CheckOutcome::NoUpdate { manual }
            }
            Err(e) => {
                warn!(error = %e, "update check failed");
                self.state.last_error = Some(e.to_string());
                self.state.phase = UpdatePhase::Failed;
                self.events.emit(UpdateEvent::NoUpdateAvailable);
                CheckOutcome::Failed {
                    manual,
                    error: e.to_string(),
                }
            }
        }
    }

    /// `Available → Downloading`, on explicit user consent. Invalidates any
    /// previous cancellation token and returns the new one together with the
    /// manifest to fetch.
    pub fn begin_download(&mut self) -> Option<(u64, ReleaseManifest)> {
        if self.state.phase != UpdatePhase::Available {
            warn!(phase = ?self.state.phase, "download requested outside Available");
            return None;
        }
        let manifest = self.state.available.clone()?;
        self.state.phase = UpdatePhase::Downloading;
        self.state.download_generation += 1;
        info!(
            version = %manifest.version,
            generation = self.state.download_generation,
            "starting update download"
        );
        Some((self.state.download_generation, manifest))
    }

    /// Forwards progress for the current download; stale generations are
    /// dropped.
    pub fn download_progressed(&self, generation: u64, progress: DownloadProgress) {
        if self.state.phase == UpdatePhase::Downloading
            && generation == self.state.download_generation
        {
            self.events.emit(UpdateEvent::DownloadProgress(progress));
        }
    }

    /// `Downloading → Downloaded | Failed`. `version_downloaded` is set only
    /// on the success path, after the downloader verified integrity.
    pub fn download_completed(
        &mut self,
        generation: u64,
        result: Result<UpdateInfo, DownloadError>,
    ) -> DownloadOutcome {
        if self.state.phase != UpdatePhase::Downloading
            || generation != self.state.download_generation
        {
            return DownloadOutcome::Stale;
        }

        match result {
            Ok(info) => {
                let version = info.version.clone();
                info!(%version, path = %info.asset_path.display(), "update downloaded");
                self.state.phase = UpdatePhase::Downloaded;
                self.state.version_downloaded = Some(version.clone());
                self.state.downloaded = Some(info);
                self.events.emit(UpdateEvent::UpdateDownloaded {
                    version: version.clone(),
                });
                self.events.emit(UpdateEvent::MenuRefreshRequested);
                DownloadOutcome::Completed { version }
            }
            Err(DownloadError::Cancelled) => {
                // The cancel path already transitioned; a late Cancelled
                // completion on the current generation is still terminal.
                self.finish_cancel();
                DownloadOutcome::Stale
            }
            Err(e) => {
                warn!(error = %e, "update download failed");
                self.state.phase = UpdatePhase::Failed;
                self.state.last_error = Some(e.to_string());
                DownloadOutcome::Failed {
                    error: e.to_string(),
                }
            }
        }
    }

    /// `Failed → Idle`, once the failure has been routed (logged or shown).
    /// `last_error` is kept for diagnostics; the next check runs normally.
    pub fn acknowledge_failure(&mut self) {
        if self.state.phase == UpdatePhase::Failed {
            self.state.phase = UpdatePhase::Idle;
        }
    }

    /// User-initiated cancel: back to `Available` when a version is known,
    /// otherwise `Idle`. The generation bump invalidates in-flight work.
    pub fn cancel_download(&mut self) {
        if self.state.phase != UpdatePhase::Downloading {
            return;
        }
        info!("user cancelled update download");
        self.finish_cancel();
    }

    fn finish_cancel(&mut self) {
        self.state.download_generation += 1;
        self.state.phase = if self.state.version_available.is_some() {
            UpdatePhase::Available
        } else {
            UpdatePhase::Idle
        };
    }

    /// `Downloaded → Installing`, on explicit user confirmation. Terminal for
    /// this machine; the install executor takes over.
    pub fn begin_install(&mut self) -> Option<UpdateInfo> {
        if self.state.phase != UpdatePhase::Downloaded {
            warn!(phase = ?self.state.phase, "install requested outside Downloaded");
            return None;
        }
        let info = self.state.downloaded.clone()?;
        self.state.phase = UpdatePhase::Installing;
        info!(version = %info.version, "beginning install");
        Some(info)
    }

    /// Content the notification scheduler should show at fire time, computed
    /// from the current phase. Nothing is offered outside `Available` and
    /// `Downloaded`/`Installing`: a prompt whose action the machine would
    /// refuse must not be shown.
    pub fn notification_content(&self) -> Option<NotifyContent> {
        match self.state.phase {
            UpdatePhase::Downloaded | UpdatePhase::Installing => {
                let info = self.state.downloaded.as_ref()?;
                Some(NotifyContent::RestartToInstall {
                    version: info.version.clone(),
                    release_notes: info.release_notes.clone(),
                })
            }
            UpdatePhase::Available => {
                self.state
                    .version_available
                    .as_ref()
                    .map(|version| NotifyContent::UpdateAvailable {
                        version: version.clone(),
                    })
            }
            _ => None,
        }
    }
}
