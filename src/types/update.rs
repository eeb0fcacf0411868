use std::path::PathBuf;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::types::errors::{DownloadError, FeedError};

/// Prefix for cached update artifact directories in the platform cache dir.
/// The manual install fallback scans for entries with this marker.
pub const UPDATE_ARTIFACT_PREFIX: &str = "harbor-update-";

/// Discrete stage of the update lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpdatePhase {
    Idle,
    Checking,
    Available,
    Downloading,
    Downloaded,
    Installing,
    Failed,
}

/// A release published on the feed that is newer than the running version,
/// with the asset already resolved for the current platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReleaseManifest {
    pub version: String,
    pub release_notes: Option<String>,
    pub asset_name: String,
    pub download_url: String,
    pub size: u64,
    /// Expected sha256 of the asset, hex-encoded, when the feed publishes one.
    pub sha256: Option<String>,
}

/// Result of a single feed check, produced by the Release Feed Client and
/// consumed only by the Update State Machine. `manifest` is present exactly
/// when `available` is true.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateCheckResult {
    pub available: bool,
    pub version: Option<String>,
    pub release_notes: Option<String>,
    pub manifest: Option<ReleaseManifest>,
}

impl UpdateCheckResult {
    /// A check result reporting that the running version is current.
    pub fn up_to_date() -> Self {
        Self {
            available: false,
            version: None,
            release_notes: None,
            manifest: None,
        }
    }

    /// A check result carrying a newer release.
    pub fn newer(manifest: ReleaseManifest) -> Self {
        Self {
            available: true,
            version: Some(manifest.version.clone()),
            release_notes: manifest.release_notes.clone(),
            manifest: Some(manifest),
        }
    }
}

/// Metadata recorded after a successful, integrity-verified download.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateInfo {
    pub version: String,
    pub release_notes: Option<String>,
    /// Artifact directory under the update cache, named with
    /// [`UPDATE_ARTIFACT_PREFIX`] + version.
    pub artifact_dir: PathBuf,
    /// Path of the downloaded asset inside `artifact_dir`.
    pub asset_path: PathBuf,
    /// Verified sha256 of the asset, hex-encoded.
    pub sha256: String,
    pub size: u64,
}

/// Progress of an in-flight update download.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DownloadProgress {
    pub percent: f64,
    pub bytes_per_second: u64,
    pub transferred: u64,
    pub total: u64,
}

/// A cached update artifact located on disk by the manual install fallback.
#[derive(Debug, Clone)]
pub struct InstallArtifact {
    pub path: PathBuf,
    pub modified: SystemTime,
}

/// Typed events published by the update subsystem for the rest of the host
/// (menu, badges, renderer bridges) to subscribe to.
#[derive(Debug, Clone)]
pub enum UpdateEvent {
    UpdateAvailable { version: String },
    UpdateDownloaded { version: String },
    DownloadProgress(DownloadProgress),
    NoUpdateAvailable,
    /// The host should rebuild update-related menu entries and badges.
    MenuRefreshRequested,
}

/// Commands driving the update service loop. All phase transitions happen
/// while one of these is being handled, which serializes them.
#[derive(Debug)]
pub enum UpdateCommand {
    CheckForUpdates {
        manual: bool,
    },
    CheckFinished {
        result: Result<UpdateCheckResult, FeedError>,
    },
    StartDownload,
    CancelDownload,
    DownloadProgressed {
        generation: u64,
        progress: DownloadProgress,
    },
    DownloadFinished {
        generation: u64,
        result: Result<UpdateInfo, DownloadError>,
    },
    ConfirmInstall,
    NotifyTick,
    Shutdown,
}
