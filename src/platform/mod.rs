// Harbor platform abstraction
// Provides platform-specific paths and install actions for Windows, macOS,
// and Linux.
//
// Uses `cfg(target_os)` for conditional compilation to select the correct
// platform-specific implementation at compile time.

use std::path::{Path, PathBuf};

use crate::types::errors::InstallError;
use crate::types::update::UpdateInfo;

#[cfg(target_os = "linux")]
mod linux;

#[cfg(target_os = "macos")]
mod macos;

#[cfg(target_os = "windows")]
mod windows;

/// Per-OS install capability. One variant per platform, each owning its own
/// command construction, instead of building privileged shell strings inline
/// at the call sites.
pub trait PlatformInstaller: Send + Sync {
    /// Cache directory holding downloaded update artifacts, when the
    /// platform has one.
    fn update_cache_dir(&self) -> Option<PathBuf>;

    /// Whether this platform has a supported manual install procedure.
    fn supports_manual_fallback(&self) -> bool;

    /// Primary path: hand the downloaded artifact to the OS installer
    /// mechanism, which replaces the installed app and relaunches.
    fn invoke_primary(&self, update: &UpdateInfo) -> Result<(), InstallError>;

    /// Manual fallback step: replace the installed application with the
    /// cached candidate using elevated platform commands.
    fn replace_installed(&self, candidate: &Path) -> Result<(), InstallError>;

    /// Relaunch the application from its installed location.
    fn relaunch(&self) -> Result<(), InstallError>;
}

/// The installer for the OS this build targets.
pub struct NativeInstaller;

impl PlatformInstaller for NativeInstaller {
    fn update_cache_dir(&self) -> Option<PathBuf> {
        Some(get_cache_dir().join("updates"))
    }

    fn supports_manual_fallback(&self) -> bool {
        cfg!(any(target_os = "macos", target_os = "windows"))
    }

    fn invoke_primary(&self, update: &UpdateInfo) -> Result<(), InstallError> {
        #[cfg(target_os = "linux")]
        {
            linux::invoke_primary(update)
        }
        #[cfg(target_os = "macos")]
        {
            macos::invoke_primary(update)
        }
        #[cfg(target_os = "windows")]
        {
            windows::invoke_primary(update)
        }
    }

    fn replace_installed(&self, candidate: &Path) -> Result<(), InstallError> {
        #[cfg(target_os = "linux")]
        {
            let _ = candidate;
            Err(InstallError::Unsupported("linux".to_string()))
        }
        #[cfg(target_os = "macos")]
        {
            macos::replace_installed(candidate)
        }
        #[cfg(target_os = "windows")]
        {
            windows::replace_installed(candidate)
        }
    }

    fn relaunch(&self) -> Result<(), InstallError> {
        #[cfg(target_os = "linux")]
        {
            linux::relaunch()
        }
        #[cfg(target_os = "macos")]
        {
            macos::relaunch()
        }
        #[cfg(target_os = "windows")]
        {
            windows::relaunch()
        }
    }
}

/// Returns the platform-specific configuration directory for Harbor.
///
/// - **Linux**: `~/.config/harbor` (or `$XDG_CONFIG_HOME/harbor`)
/// - **macOS**: `~/Library/Application Support/Harbor`
/// - **Windows**: `%APPDATA%/Harbor`
pub fn get_config_dir() -> PathBuf {
    #[cfg(target_os = "linux")]
    {
        linux::get_config_dir()
    }
    #[cfg(target_os = "macos")]
    {
        macos::get_config_dir()
    }
    #[cfg(target_os = "windows")]
    {
        windows::get_config_dir()
    }
}

/// Returns the platform-specific cache directory for Harbor.
///
/// - **Linux**: `~/.cache/harbor` (or `$XDG_CACHE_HOME/harbor`)
/// - **macOS**: `~/Library/Caches/Harbor`
/// - **Windows**: `%LOCALAPPDATA%/Harbor/cache`
pub fn get_cache_dir() -> PathBuf {
    #[cfg(target_os = "linux")]
    {
        linux::get_cache_dir()
    }
    #[cfg(target_os = "macos")]
    {
        macos::get_cache_dir()
    }
    #[cfg(target_os = "windows")]
    {
        windows::get_cache_dir()
    }
}

/// Whether the OS reports an active do-not-disturb / focus mode that should
/// defer update prompts. Unreadable state counts as off, so prompts are
/// never blocked by a failed query.
pub fn do_not_disturb_enabled() -> bool {
    #[cfg(target_os = "linux")]
    {
        linux::do_not_disturb_enabled()
    }
    #[cfg(target_os = "macos")]
    {
        macos::do_not_disturb_enabled()
    }
    #[cfg(target_os = "windows")]
    {
        windows::do_not_disturb_enabled()
    }
}
