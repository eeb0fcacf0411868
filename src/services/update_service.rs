//! Update service loop.
//!
//! Owns the update machine and processes [`UpdateCommand`]s one at a time,
//! which serializes every phase transition. Feed checks and downloads run as
//! spawned tasks and report back through the same command channel, tagged
//! with the machine's download generation so stale completions are dropped.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::platform::PlatformInstaller;
use crate::services::artifact_downloader::{ArtifactDownloader, CancelFlag};
use crate::services::event_bus::EventBus;
use crate::services::feed_client::ReleaseFeed;
use crate::services::install_executor::InstallExecutor;
use crate::services::notification_scheduler::NotificationScheduler;
use crate::services::periodic::PeriodicTask;
use crate::services::release_notes;
use crate::services::update_machine::{CheckOutcome, DownloadOutcome, NotifyContent, UpdateMachine};
use crate::types::config::UpdaterConfig;
use crate::types::errors::{DownloadError, FeedError};
use crate::types::update::{UpdateCheckResult, UpdateCommand, UpdateInfo};

pub struct UpdateService<F: ReleaseFeed + 'static, P: PlatformInstaller> {
    machine: UpdateMachine,
    feed: Arc<F>,
    downloader: Arc<ArtifactDownloader>,
    scheduler: NotificationScheduler,
    executor: InstallExecutor<P>,
    config: UpdaterConfig,
    check_timer: PeriodicTask,
    commands: mpsc::Sender<UpdateCommand>,
    /// Cancellation token for the in-flight download, if any.
    cancel: Option<CancelFlag>,
    current_version: String,
    changelog_path: PathBuf,
}

impl<F: ReleaseFeed + 'static, P: PlatformInstaller> UpdateService<F, P> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        events: EventBus,
        feed: Arc<F>,
        downloader: Arc<ArtifactDownloader>,
        scheduler: NotificationScheduler,
        executor: InstallExecutor<P>,
        config: UpdaterConfig,
        commands: mpsc::Sender<UpdateCommand>,
        changelog_path: PathBuf,
    ) -> Self {
        Self {
            machine: UpdateMachine::new(events),
            feed,
            downloader,
            scheduler,
            executor,
            config,
            check_timer: PeriodicTask::new("check"),
            commands,
            cancel: None,
            current_version: env!("CARGO_PKG_VERSION").to_string(),
            changelog_path,
        }
    }

    pub fn machine(&self) -> &UpdateMachine {
        &self.machine
    }

    /// Runs the service until a `Shutdown` command arrives. Arms the periodic
    /// background check and kicks off an initial one on entry.
    pub async fn run(&mut self, mut rx: mpsc::Receiver<UpdateCommand>) {
        if self.config.auto_update_enabled {
            let tx = self.commands.clone();
            self.check_timer
                .start(Duration::from_secs(self.config.check_interval_secs), move || {
                    let _ = tx.try_send(UpdateCommand::CheckForUpdates { manual: false });
                });
            self.handle(UpdateCommand::CheckForUpdates { manual: false });
        } else {
            info!("auto updates are disabled");
        }

        while let Some(command) = rx.recv().await {
            if !self.handle(command) {
                break;
            }
        }
        info!("update service stopped");
    }

    /// Processes one command. Returns false when the service should stop.
    fn handle(&mut self, command: UpdateCommand) -> bool {
        match command {
            UpdateCommand::CheckForUpdates { manual } => self.on_check_requested(manual),
            UpdateCommand::CheckFinished { result } => self.on_check_finished(result),
            UpdateCommand::StartDownload => self.on_start_download(),
            UpdateCommand::CancelDownload => self.on_cancel_download(),
            UpdateCommand::DownloadProgressed {
                generation,
                progress,
            } => self.machine.download_progressed(generation, progress),
            UpdateCommand::DownloadFinished { generation, result } => {
                self.on_download_finished(generation, result)
            }
            UpdateCommand::ConfirmInstall => self.on_confirm_install(),
            UpdateCommand::NotifyTick => self.on_notify_tick(),
            UpdateCommand::Shutdown => {
                self.check_timer.stop();
                self.scheduler.disarm();
                return false;
            }
        }
        true
    }

    fn on_check_requested(&mut self, manual: bool) {
        if !self.config.auto_update_enabled {
            info!("auto updates are disabled, skipping check");
            return;
        }
        // Once a notification is scheduled, re-surfacing is the notify
        // timer's job; re-checking on the (shorter) check cadence would
        // re-prompt users who already picked "Remind Me Later".
        if !manual && self.scheduler.is_armed() {
            debug!("notification already scheduled, skipping background check");
            return;
        }
        if !self.machine.begin_check(manual) {
            return;
        }
        let feed = Arc::clone(&self.feed);
        let tx = self.commands.clone();
        tokio::spawn(async move {
            let result = feed.fetch_latest().await;
            let _ = tx.send(UpdateCommand::CheckFinished { result }).await;
        });
    }

    fn on_check_finished(&mut self, result: Result<UpdateCheckResult, FeedError>) {
        match self.machine.check_completed(result) {
            CheckOutcome::Available { version } => {
                self.scheduler
                    .arm(Duration::from_secs(self.config.notify_interval_secs));
                self.scheduler.present_available(&version);
            }
            CheckOutcome::NoUpdate { manual } => {
                self.scheduler.disarm();
                if manual {
                    self.scheduler.present_no_update(&self.current_version);
                }
            }
            CheckOutcome::Failed { manual, error } => {
                warn!(%error, "update check failed");
                if manual {
                    self.scheduler
                        .present_failure("Could not check for updates. Please try again later.");
                }
                self.machine.acknowledge_failure();
            }
            CheckOutcome::Ignored => {}
        }
    }

    fn on_start_download(&mut self) {
        let Some((generation, manifest)) = self.machine.begin_download() else {
            return;
        };
        let cancel = CancelFlag::new();
        self.cancel = Some(cancel.clone());

        let downloader = Arc::clone(&self.downloader);
        let tx = self.commands.clone();
        tokio::spawn(async move {
            let progress_tx = tx.clone();
            let result = downloader
                .download(&manifest, cancel, move |progress| {
                    let _ = progress_tx.try_send(UpdateCommand::DownloadProgressed {
                        generation,
                        progress,
                    });
                })
                .await;
            let _ = tx
                .send(UpdateCommand::DownloadFinished { generation, result })
                .await;
        });
    }

    fn on_cancel_download(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }
        self.machine.cancel_download();
    }

    fn on_download_finished(
        &mut self,
        generation: u64,
        result: Result<UpdateInfo, DownloadError>,
    ) {
        match self.machine.download_completed(generation, result) {
            DownloadOutcome::Completed { version } => {
                self.cancel = None;
                let notes = self.resolved_notes();
                self.scheduler.present_restart(&version, Some(&notes));
            }
            DownloadOutcome::Failed { error } => {
                self.cancel = None;
                warn!(%error, "update download failed");
                self.scheduler
                    .present_failure("The update could not be downloaded. Please try again later.");
                self.machine.acknowledge_failure();
            }
            DownloadOutcome::Stale => {}
        }
    }

    fn on_confirm_install(&mut self) {
        let Some(info) = self.machine.begin_install() else {
            return;
        };
        if let Err(e) = self.executor.install_and_restart(&info) {
            warn!(error = %e, "install failed");
            self.scheduler.present_failure(
                "The update could not be installed. Please download Harbor again.",
            );
        }
    }

    fn on_notify_tick(&mut self) {
        match self.machine.notification_content() {
            Some(NotifyContent::RestartToInstall { version, .. }) => {
                let notes = self.resolved_notes();
                self.scheduler.present_restart(&version, Some(&notes));
            }
            Some(NotifyContent::UpdateAvailable { version }) => {
                self.scheduler.present_available(&version);
            }
            None => self.scheduler.disarm(),
        }
    }

    /// Notes for the restart prompt: feed notes, then the bundled changelog,
    /// then a generic line.
    fn resolved_notes(&self) -> String {
        let feed_notes = self
            .machine
            .state()
            .downloaded
            .as_ref()
            .and_then(|info| info.release_notes.as_deref());
        release_notes::resolve_notes(feed_notes, &self.changelog_path)
    }
}
