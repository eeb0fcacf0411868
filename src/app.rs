//! App core for the Harbor updater.
//!
//! Single construction point: builds the event bus, quit coordinator, feed
//! client, downloader, scheduler, and install executor, then spawns the
//! update service loop. The host talks to the subsystem only through this
//! struct and the typed event bus.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::platform::{get_config_dir, NativeInstaller, PlatformInstaller};
use crate::services::artifact_downloader::ArtifactDownloader;
use crate::services::config_store::ConfigStore;
use crate::services::event_bus::EventBus;
use crate::services::feed_client::HttpReleaseFeed;
use crate::services::install_executor::InstallExecutor;
use crate::services::notification_scheduler::{NotificationScheduler, Prompter};
use crate::services::quit_coordinator::QuitCoordinator;
use crate::services::update_service::UpdateService;
use crate::types::config::UpdaterConfig;
use crate::types::errors::InstallError;
use crate::types::update::{UpdateCommand, UpdateEvent};

const COMMAND_CAPACITY: usize = 32;
const LAST_VERSION_FILE: &str = "last_version";

/// Central struct owning the update subsystem's lifecycle.
pub struct App {
    events: EventBus,
    quit: Arc<QuitCoordinator>,
    commands: mpsc::Sender<UpdateCommand>,
    service: JoinHandle<()>,
    config: UpdaterConfig,
}

impl App {
    /// Builds the subsystem and spawns the service loop. `config_path`
    /// overrides the default `updater.json` location; the host supplies the
    /// prompt primitive.
    pub fn start(
        config_path: Option<PathBuf>,
        prompter: Arc<dyn Prompter>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let config = ConfigStore::new(config_path).load()?;

        let events = EventBus::new();
        let quit = Arc::new(QuitCoordinator::new());
        let installer = NativeInstaller;
        let cache_dir = installer
            .update_cache_dir()
            .ok_or(InstallError::NoCacheDir)?;

        let feed = Arc::new(HttpReleaseFeed::new(&config.feed_url)?);
        let downloader = Arc::new(ArtifactDownloader::new(cache_dir)?);

        let (tx, rx) = mpsc::channel(COMMAND_CAPACITY);
        let scheduler = NotificationScheduler::new(prompter, tx.clone());
        let executor = InstallExecutor::new(
            installer,
            Arc::clone(&quit),
            Duration::from_millis(config.forced_exit_delay_ms),
        );

        let mut service = UpdateService::new(
            events.clone(),
            feed,
            downloader,
            scheduler,
            executor,
            config.clone(),
            tx.clone(),
            bundled_changelog_path(),
        );
        let service = tokio::spawn(async move { service.run(rx).await });

        info!(version = env!("CARGO_PKG_VERSION"), "harbor updater started");
        Ok(Self {
            events,
            quit,
            commands: tx,
            service,
            config,
        })
    }

    pub fn config(&self) -> &UpdaterConfig {
        &self.config
    }

    /// Subscribes to update subsystem events.
    pub fn subscribe(&self) -> broadcast::Receiver<UpdateEvent> {
        self.events.subscribe()
    }

    pub fn quit_coordinator(&self) -> &Arc<QuitCoordinator> {
        &self.quit
    }

    /// Asks the service to run an update check now, as if the user picked
    /// "Check for Updates" from a menu.
    pub async fn check_for_updates(&self) {
        self.send(UpdateCommand::CheckForUpdates { manual: true }).await;
    }

    pub async fn start_download(&self) {
        self.send(UpdateCommand::StartDownload).await;
    }

    pub async fn cancel_download(&self) {
        self.send(UpdateCommand::CancelDownload).await;
    }

    pub async fn confirm_install(&self) {
        self.send(UpdateCommand::ConfirmInstall).await;
    }

    /// Stops the service loop and waits for it to finish.
    pub async fn shutdown(self) {
        let _ = self.commands.send(UpdateCommand::Shutdown).await;
        let _ = self.service.await;
    }

    async fn send(&self, command: UpdateCommand) {
        if self.commands.send(command).await.is_err() {
            warn!("update service is not running");
        }
    }
}

/// Location of the changelog shipped next to the executable.
fn bundled_changelog_path() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("CHANGELOG.md")
}

/// Whether this run is the first one after an update was installed. Compares
/// the recorded last-run version against the running one and re-records it,
/// so the answer is true exactly once per installed update.
pub fn was_updated() -> bool {
    was_updated_in(&get_config_dir())
}

fn was_updated_in(config_dir: &Path) -> bool {
    let marker = config_dir.join(LAST_VERSION_FILE);
    let current = env!("CARGO_PKG_VERSION");
    let previous = std::fs::read_to_string(&marker).ok();

    let updated = matches!(&previous, Some(prev) if prev.trim() != current);
    if previous.as_deref().map(str::trim) != Some(current) {
        if std::fs::create_dir_all(config_dir).is_ok() {
            if let Err(e) = std::fs::write(&marker, current) {
                warn!(error = %e, "failed to record running version");
            }
        }
    }
    updated
}
