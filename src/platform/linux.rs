// Harbor platform support for Linux
// Config: ~/.config/harbor
// Cache:  ~/.cache/harbor
//
// Linux builds ship as a single self-contained executable (AppImage-style):
// the primary install path swaps the running image in place and relaunches.
// There is no supported manual fallback; if the swap fails the user must
// reinstall.

use std::env;
use std::path::PathBuf;
use std::process::Command;

use tracing::info;

use crate::types::errors::InstallError;
use crate::types::update::UpdateInfo;

/// Returns the configuration directory for Harbor on Linux.
/// Uses `$XDG_CONFIG_HOME/harbor` if set, otherwise `~/.config/harbor`.
pub fn get_config_dir() -> PathBuf {
    if let Ok(xdg) = env::var("XDG_CONFIG_HOME") {
        PathBuf::from(xdg).join("harbor")
    } else {
        let home = env::var("HOME").unwrap_or_else(|_| String::from("/tmp"));
        PathBuf::from(home).join(".config").join("harbor")
    }
}

/// Returns the cache directory for Harbor on Linux.
/// Uses `$XDG_CACHE_HOME/harbor` if set, otherwise `~/.cache/harbor`.
pub fn get_cache_dir() -> PathBuf {
    if let Ok(xdg) = env::var("XDG_CACHE_HOME") {
        PathBuf::from(xdg).join("harbor")
    } else {
        let home = env::var("HOME").unwrap_or_else(|_| String::from("/tmp"));
        PathBuf::from(home).join(".cache").join("harbor")
    }
}

/// Linux desktops expose no portable do-not-disturb query; update prompts
/// are never deferred here.
pub fn do_not_disturb_enabled() -> bool {
    false
}

/// Swaps the running image with the downloaded one and relaunches.
pub fn invoke_primary(update: &UpdateInfo) -> Result<(), InstallError> {
    let current_exe =
        env::current_exe().map_err(|e| InstallError::FileSystemError(e.to_string()))?;

    info!(
        from = %update.asset_path.display(),
        to = %current_exe.display(),
        "replacing installed image"
    );

    // Unlink first: writing over a running executable fails with ETXTBSY,
    // but replacing the unlinked path is fine.
    std::fs::remove_file(&current_exe)
        .map_err(|e| InstallError::PrimaryFailed(e.to_string()))?;
    std::fs::copy(&update.asset_path, &current_exe)
        .map_err(|e| InstallError::PrimaryFailed(e.to_string()))?;

    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = std::fs::metadata(&current_exe)
            .map_err(|e| InstallError::FileSystemError(e.to_string()))?
            .permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&current_exe, perms)
            .map_err(|e| InstallError::FileSystemError(e.to_string()))?;
    }

    relaunch()
}

/// Spawns a detached instance of the installed executable.
pub fn relaunch() -> Result<(), InstallError> {
    let current_exe =
        env::current_exe().map_err(|e| InstallError::FileSystemError(e.to_string()))?;
    Command::new(&current_exe)
        .spawn()
        .map_err(|e| InstallError::RelaunchFailed(e.to_string()))?;
    Ok(())
}
