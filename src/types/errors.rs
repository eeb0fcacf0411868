use std::fmt;

// === FeedError ===

/// Errors from the release feed client.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedError {
    /// A network error occurred while querying the release feed.
    NetworkError(String),
    /// The feed endpoint returned a non-success status.
    ApiError(String),
    /// The feed response could not be parsed.
    ParseError(String),
    /// The release carries no asset for the current platform.
    NoPlatformAsset(String),
}

impl fmt::Display for FeedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedError::NetworkError(msg) => write!(f, "Feed network error: {}", msg),
            FeedError::ApiError(msg) => write!(f, "Feed API error: {}", msg),
            FeedError::ParseError(msg) => write!(f, "Feed parse error: {}", msg),
            FeedError::NoPlatformAsset(target) => {
                write!(f, "No release asset for platform: {}", target)
            }
        }
    }
}

impl std::error::Error for FeedError {}

// === DownloadError ===

/// Errors from the update artifact downloader.
#[derive(Debug, Clone, PartialEq)]
pub enum DownloadError {
    /// A network error occurred during the download.
    NetworkError(String),
    /// A file system error occurred while writing the artifact.
    FileSystemError(String),
    /// The downloaded artifact's checksum does not match the expected value.
    ChecksumMismatch(String),
    /// The download was cancelled via its cancellation token.
    Cancelled,
}

impl fmt::Display for DownloadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DownloadError::NetworkError(msg) => write!(f, "Download network error: {}", msg),
            DownloadError::FileSystemError(msg) => {
                write!(f, "Download file system error: {}", msg)
            }
            DownloadError::ChecksumMismatch(msg) => {
                write!(f, "Download checksum mismatch: {}", msg)
            }
            DownloadError::Cancelled => write!(f, "Download cancelled"),
        }
    }
}

impl std::error::Error for DownloadError {}

// === InstallError ===

/// Errors from the install executor and platform installers.
#[derive(Debug, Clone, PartialEq)]
pub enum InstallError {
    /// The primary OS installer invocation failed.
    PrimaryFailed(String),
    /// No update cache directory exists on this platform.
    NoCacheDir,
    /// No cached update artifact was found in the cache directory.
    NoCandidate(String),
    /// An elevated replace command failed.
    ElevationFailed(String),
    /// Relaunching the installed application failed.
    RelaunchFailed(String),
    /// This platform has no supported manual install fallback.
    Unsupported(String),
    /// A file system error occurred during install.
    FileSystemError(String),
}

impl fmt::Display for InstallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstallError::PrimaryFailed(msg) => {
                write!(f, "Primary install path failed: {}", msg)
            }
            InstallError::NoCacheDir => write!(f, "No update cache directory"),
            InstallError::NoCandidate(dir) => {
                write!(f, "No update artifact found in: {}", dir)
            }
            InstallError::ElevationFailed(msg) => {
                write!(f, "Elevated install command failed: {}", msg)
            }
            InstallError::RelaunchFailed(msg) => write!(f, "Relaunch failed: {}", msg),
            InstallError::Unsupported(platform) => {
                write!(f, "Manual install not supported on: {}", platform)
            }
            InstallError::FileSystemError(msg) => {
                write!(f, "Install file system error: {}", msg)
            }
        }
    }
}

impl std::error::Error for InstallError {}

// === ConfigError ===

/// Errors from the updater configuration store.
#[derive(Debug)]
pub enum ConfigError {
    /// An I/O error occurred while reading or writing the config file.
    IoError(String),
    /// Failed to serialize or deserialize the configuration.
    SerializationError(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::IoError(msg) => write!(f, "Config I/O error: {}", msg),
            ConfigError::SerializationError(msg) => {
                write!(f, "Config serialization error: {}", msg)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
