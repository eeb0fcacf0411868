//! Update artifact downloader.
//!
//! Streams a release asset into the update cache, emitting progress and
//! verifying the sha256 before the artifact is considered downloaded.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use ring::digest;
use tracing::{debug, info, warn};

use crate::types::errors::DownloadError;
use crate::types::update::{
    DownloadProgress, ReleaseManifest, UpdateInfo, UPDATE_ARTIFACT_PREFIX,
};

const USER_AGENT: &str = concat!("harbor-desktop/", env!("CARGO_PKG_VERSION"));
const PROGRESS_EMIT_INTERVAL: Duration = Duration::from_millis(250);

/// Revocable handle for an in-flight download. Cloned into the download task;
/// cancelling makes the task stop at the next chunk boundary.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Downloads release assets into per-version artifact directories under the
/// platform update cache.
pub struct ArtifactDownloader {
    client: reqwest::Client,
    cache_dir: PathBuf,
}

impl ArtifactDownloader {
    pub fn new(cache_dir: PathBuf) -> Result<Self, DownloadError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| DownloadError::NetworkError(e.to_string()))?;
        Ok(Self { client, cache_dir })
    }

    /// Fetches the asset described by `manifest`, reporting progress through
    /// `progress`. On success the artifact lives at
    /// `<cache>/harbor-update-<version>/<asset_name>`.
    pub async fn download<F>(
        &self,
        manifest: &ReleaseManifest,
        cancel: CancelFlag,
        progress: F,
    ) -> Result<UpdateInfo, DownloadError>
    where
        F: Fn(DownloadProgress),
    {
        self.clear_stale_artifacts(&manifest.version);

        let artifact_dir = self
            .cache_dir
            .join(format!("{}{}", UPDATE_ARTIFACT_PREFIX, manifest.version));
        std::fs::create_dir_all(&artifact_dir)
            .map_err(|e| DownloadError::FileSystemError(e.to_string()))?;
        let asset_path = artifact_dir.join(&manifest.asset_name);
        let partial_path = asset_path.with_extension("partial");

        debug!(url = %manifest.download_url, dest = %asset_path.display(), "downloading update");

        let mut response = self
            .client
            .get(&manifest.download_url)
            .send()
            .await
            .map_err(|e| DownloadError::NetworkError(e.to_string()))?;
        if !response.status().is_success() {
            return Err(DownloadError::NetworkError(format!(
                "download failed with status {}",
                response.status()
            )));
        }

        let total = response.content_length().unwrap_or(manifest.size);
        let mut file = tokio::fs::File::create(&partial_path)
            .await
            .map_err(|e| DownloadError::FileSystemError(e.to_string()))?;

        let mut hasher = digest::Context::new(&digest::SHA256);
        let mut transferred: u64 = 0;
        let started = Instant::now();
        let mut last_emit: Option<Instant> = None;

        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| DownloadError::NetworkError(e.to_string()))?
        {
            if cancel.is_cancelled() {
                drop(file);
                let _ = tokio::fs::remove_file(&partial_path).await;
                info!("download cancelled, removed partial artifact");
                return Err(DownloadError::Cancelled);
            }

            tokio::io::AsyncWriteExt::write_all(&mut file, &chunk)
                .await
                .map_err(|e| DownloadError::FileSystemError(e.to_string()))?;
            hasher.update(&chunk);
            transferred += chunk.len() as u64;

            if last_emit.map_or(true, |t| t.elapsed() >= PROGRESS_EMIT_INTERVAL) {
                last_emit = Some(Instant::now());
                progress(snapshot(transferred, total, started));
            }
        }

        tokio::io::AsyncWriteExt::flush(&mut file)
            .await
            .map_err(|e| DownloadError::FileSystemError(e.to_string()))?;
        drop(file);

        let actual = hex_encode(hasher.finish().as_ref());
        if let Some(expected) = &manifest.sha256 {
            if !expected.eq_ignore_ascii_case(&actual) {
                warn!(%expected, %actual, "artifact checksum mismatch");
                let _ = tokio::fs::remove_file(&partial_path).await;
                return Err(DownloadError::ChecksumMismatch(format!(
                    "expected {}, got {}",
                    expected, actual
                )));
            }
        }

        tokio::fs::rename(&partial_path, &asset_path)
            .await
            .map_err(|e| DownloadError::FileSystemError(e.to_string()))?;

        progress(snapshot(transferred, total, started));
        info!(version = %manifest.version, bytes = transferred, "update artifact downloaded");

        Ok(UpdateInfo {
            version: manifest.version.clone(),
            release_notes: manifest.release_notes.clone(),
            artifact_dir,
            asset_path,
            sha256: actual,
            size: transferred,
        })
    }

    /// Removes cached artifacts from other versions before a new download so
    /// the manual fallback can only ever pick up the version being fetched.
    fn clear_stale_artifacts(&self, keep_version: &str) {
        let keep = format!("{}{}", UPDATE_ARTIFACT_PREFIX, keep_version);
        let Ok(entries) = std::fs::read_dir(&self.cache_dir) else {
            return;
        };
        for entry in entries.flatten() {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if name.starts_with(UPDATE_ARTIFACT_PREFIX) && name != keep {
                debug!(artifact = name, "removing stale update artifact");
                let _ = std::fs::remove_dir_all(entry.path());
            }
        }
    }
}

fn snapshot(transferred: u64, total: u64, started: Instant) -> DownloadProgress {
    let elapsed = started.elapsed().as_secs_f64();
    let bytes_per_second = if elapsed > 0.0 {
        (transferred as f64 / elapsed) as u64
    } else {
        0
    };
    let percent = if total > 0 {
        (transferred as f64 / total as f64) * 100.0
    } else {
        0.0
    };
    DownloadProgress {
        percent,
        bytes_per_second,
        transferred,
        total,
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
