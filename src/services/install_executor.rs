//! Install executor.
//!
//! Drives the terminal phase of an update: flags the upcoming exit as
//! update-driven, hands the downloaded artifact to the OS installer, and on
//! failure falls back to a manual replacement from the update cache where the
//! platform supports one. Failures in the fallback are logged and surfaced,
//! never panicked, so the app can tell the user to reinstall.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use semver::Version;
use tracing::{error, info, warn};

use crate::platform::PlatformInstaller;
use crate::services::quit_coordinator::QuitCoordinator;
use crate::types::errors::InstallError;
use crate::types::update::{InstallArtifact, UpdateInfo, UPDATE_ARTIFACT_PREFIX};

pub struct InstallExecutor<P: PlatformInstaller> {
    platform: P,
    quit: Arc<QuitCoordinator>,
    forced_exit_delay: Duration,
}

impl<P: PlatformInstaller> InstallExecutor<P> {
    pub fn new(platform: P, quit: Arc<QuitCoordinator>, forced_exit_delay: Duration) -> Self {
        Self {
            platform,
            quit,
            forced_exit_delay,
        }
    }

    /// Installs the downloaded update and restarts the application.
    ///
    /// The quit intent is flagged before anything else so that window close
    /// handlers triggered by the installer do not veto the exit. If the
    /// primary OS path fails, the manual fallback runs; if that also fails
    /// the error is returned and the process keeps running.
    pub fn install_and_restart(&self, update: &UpdateInfo) -> Result<(), InstallError> {
        self.quit.mark_update_quit();

        match self.platform.invoke_primary(update) {
            Ok(()) => {
                info!(version = %update.version, "primary install path invoked");
                let _ = self.quit.arm_forced_exit(self.forced_exit_delay);
                Ok(())
            }
            Err(primary_err) => {
                warn!(error = %primary_err, "primary install path failed, trying manual fallback");
                self.manual_fallback().map_err(|fallback_err| {
                    error!(
                        primary = %primary_err,
                        fallback = %fallback_err,
                        "manual install fallback failed"
                    );
                    fallback_err
                })
            }
        }
    }

    /// Replaces the installed application from the newest cached artifact
    /// using elevated platform commands, then relaunches and exits.
    fn manual_fallback(&self) -> Result<(), InstallError> {
        if !self.platform.supports_manual_fallback() {
            return Err(InstallError::Unsupported(
                std::env::consts::OS.to_string(),
            ));
        }

        let cache_dir = self
            .platform
            .update_cache_dir()
            .ok_or(InstallError::NoCacheDir)?;
        let candidate = select_candidate(&cache_dir)?;
        info!(candidate = %candidate.path.display(), "installing from cached artifact");

        self.platform.replace_installed(&candidate.path)?;

        // The artifact has been consumed; remove it so a stale copy can never
        // be re-installed by a later fallback.
        if let Err(e) = std::fs::remove_dir_all(&candidate.path) {
            warn!(error = %e, "failed to remove consumed update artifact");
        }

        self.platform.relaunch()?;
        self.quit.request_exit(0);
        Ok(())
    }
}

/// Picks the installable candidate from the update cache: the artifact
/// directory with the newest modification time, breaking ties by the version
/// embedded in the directory name.
pub fn select_candidate(cache_dir: &Path) -> Result<InstallArtifact, InstallError> {
    let entries = std::fs::read_dir(cache_dir)
        .map_err(|e| InstallError::FileSystemError(e.to_string()))?;

    let mut candidates: Vec<InstallArtifact> = Vec::new();
    for entry in entries.flatten() {
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if !name.starts_with(UPDATE_ARTIFACT_PREFIX) {
            continue;
        }
        let Ok(metadata) = entry.metadata() else {
            continue;
        };
        if !metadata.is_dir() {
            continue;
        }
        let Ok(modified) = metadata.modified() else {
            continue;
        };
        candidates.push(InstallArtifact {
            path: entry.path(),
            modified,
        });
    }

    candidates.sort_by(|a, b| {
        b.modified
            .cmp(&a.modified)
            .then_with(|| embedded_version(&b.path).cmp(&embedded_version(&a.path)))
    });

    candidates
        .into_iter()
        .next()
        .ok_or_else(|| InstallError::NoCandidate(cache_dir.display().to_string()))
}

/// Parses the version embedded in an artifact directory name, if any.
fn embedded_version(path: &Path) -> Option<Version> {
    let name = path.file_name()?.to_str()?;
    let version = name.strip_prefix(UPDATE_ARTIFACT_PREFIX)?;
    Version::parse(version).ok()
}
