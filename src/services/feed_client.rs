//! Release Feed Client for the Harbor updater.
//!
//! Queries the remote release feed for the latest published version.
//! Pure request/response; all lifecycle state lives in the update machine.

use std::future::Future;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::types::errors::FeedError;
use crate::types::update::{ReleaseManifest, UpdateCheckResult};

const USER_AGENT: &str = concat!("harbor-desktop/", env!("CARGO_PKG_VERSION"));
const FEED_TIMEOUT: Duration = Duration::from_secs(15);

/// Seam for the service loop so tests can run against a scripted feed.
pub trait ReleaseFeed: Send + Sync {
    /// Fetches the latest release metadata and compares it against the
    /// running version. `available` is true only for a strictly newer release
    /// that has an asset for this platform.
    fn fetch_latest(&self) -> impl Future<Output = Result<UpdateCheckResult, FeedError>> + Send;
}

/// Release JSON as published on the feed (GitHub releases compatible).
#[derive(Debug, Deserialize)]
struct RawRelease {
    tag_name: String,
    body: Option<String>,
    assets: Vec<RawAsset>,
}

#[derive(Debug, Deserialize)]
struct RawAsset {
    name: String,
    browser_download_url: String,
    size: u64,
    sha256: Option<String>,
}

/// HTTP release feed client.
pub struct HttpReleaseFeed {
    client: reqwest::Client,
    feed_url: String,
    current_version: String,
}

impl HttpReleaseFeed {
    pub fn new(feed_url: &str) -> Result<Self, FeedError> {
        Self::with_current_version(feed_url, env!("CARGO_PKG_VERSION"))
    }

    /// Builds a client comparing against an explicit running version.
    pub fn with_current_version(feed_url: &str, current: &str) -> Result<Self, FeedError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(FEED_TIMEOUT)
            .build()
            .map_err(|e| FeedError::NetworkError(e.to_string()))?;
        Ok(Self {
            client,
            feed_url: feed_url.to_string(),
            current_version: current.to_string(),
        })
    }
}

impl ReleaseFeed for HttpReleaseFeed {
    async fn fetch_latest(&self) -> Result<UpdateCheckResult, FeedError> {
        debug!(url = %self.feed_url, "checking release feed");

        let response = self
            .client
            .get(&self.feed_url)
            .header("Accept", "application/vnd.github+json")
            .send()
            .await
            .map_err(|e| FeedError::NetworkError(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            // No releases published yet; treated as "up to date".
            debug!("feed returned 404, no releases published");
            return Ok(UpdateCheckResult::up_to_date());
        }
        if !response.status().is_success() {
            return Err(FeedError::ApiError(format!(
                "feed returned status {}",
                response.status()
            )));
        }

        let release: RawRelease = response
            .json()
            .await
            .map_err(|e| FeedError::ParseError(e.to_string()))?;

        resolve_release(release, &self.current_version)
    }
}

/// Turns a raw feed release into a check result against `current_version`.
fn resolve_release(release: RawRelease, current_version: &str) -> Result<UpdateCheckResult, FeedError> {
    if !is_newer(&release.tag_name, current_version)? {
        debug!(
            remote = %release.tag_name,
            current = %current_version,
            "running version is current"
        );
        return Ok(UpdateCheckResult::up_to_date());
    }

    let asset = select_platform_asset(&release.assets).ok_or_else(|| {
        warn!(version = %release.tag_name, "release has no asset for this platform");
        FeedError::NoPlatformAsset(target_triple().to_string())
    })?;

    Ok(UpdateCheckResult::newer(ReleaseManifest {
        version: release.tag_name.trim_start_matches('v').to_string(),
        release_notes: release.body.clone(),
        asset_name: asset.name.clone(),
        download_url: asset.browser_download_url.clone(),
        size: asset.size,
        sha256: asset.sha256.clone(),
    }))
}

/// Parses a version string with or without a leading `v`.
pub fn parse_version(version: &str) -> Result<semver::Version, FeedError> {
    semver::Version::parse(version.trim_start_matches('v'))
        .map_err(|e| FeedError::ParseError(format!("invalid version '{}': {}", version, e)))
}

/// Returns true if `remote` is strictly newer than `current`.
pub fn is_newer(remote: &str, current: &str) -> Result<bool, FeedError> {
    Ok(parse_version(remote)? > parse_version(current)?)
}

fn select_platform_asset(assets: &[RawAsset]) -> Option<&RawAsset> {
    let expected = expected_asset_name();
    assets.iter().find(|a| a.name == expected)
}

/// Asset naming convention: `harbor-<target-triple>.<ext>`, where the
/// extension matches the platform install mechanism (installer executable on
/// Windows, installer package on macOS, self-contained image on Linux).
pub fn expected_asset_name() -> String {
    let extension = if cfg!(target_os = "windows") {
        ".exe"
    } else if cfg!(target_os = "macos") {
        ".pkg"
    } else {
        ".AppImage"
    };
    format!("harbor-{}{}", target_triple(), extension)
}

/// Target triple for the running build.
pub fn target_triple() -> &'static str {
    #[cfg(all(target_os = "macos", target_arch = "x86_64"))]
    return "x86_64-apple-darwin";

    #[cfg(all(target_os = "macos", target_arch = "aarch64"))]
    return "aarch64-apple-darwin";

    #[cfg(all(target_os = "linux", target_arch = "x86_64"))]
    return "x86_64-unknown-linux-gnu";

    #[cfg(all(target_os = "linux", target_arch = "aarch64"))]
    return "aarch64-unknown-linux-gnu";

    #[cfg(all(target_os = "windows", target_arch = "x86_64"))]
    return "x86_64-pc-windows-msvc";

    #[cfg(not(any(
        all(target_os = "macos", target_arch = "x86_64"),
        all(target_os = "macos", target_arch = "aarch64"),
        all(target_os = "linux", target_arch = "x86_64"),
        all(target_os = "linux", target_arch = "aarch64"),
        all(target_os = "windows", target_arch = "x86_64")
    )))]
    return "unknown";
}
