// Harbor platform support for Windows
// Config: %APPDATA%/Harbor
// Cache:  %LOCALAPPDATA%/Harbor/cache
//
// Primary path hands off to the downloaded installer executable, which
// replaces the installation and restarts the app itself. The manual fallback
// copies the cached candidate over the install directory through an elevated
// PowerShell invocation.

use std::env;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::info;

use crate::types::errors::InstallError;
use crate::types::update::UpdateInfo;

/// Returns the configuration directory for Harbor on Windows.
/// `%APPDATA%/Harbor`
pub fn get_config_dir() -> PathBuf {
    let base = env::var("APPDATA").unwrap_or_else(|_| String::from("C:\\Temp"));
    PathBuf::from(base).join("Harbor")
}

/// Returns the cache directory for Harbor on Windows.
/// `%LOCALAPPDATA%/Harbor/cache`
pub fn get_cache_dir() -> PathBuf {
    let base = env::var("LOCALAPPDATA").unwrap_or_else(|_| String::from("C:\\Temp"));
    PathBuf::from(base).join("Harbor").join("cache")
}

/// Whether focus assist is suppressing toasts. Focus assist itself has no
/// stable query surface, so the readable toast toggle under the notification
/// settings key is used as the signal; an unreadable value counts as off.
pub fn do_not_disturb_enabled() -> bool {
    let output = Command::new("reg.exe")
        .args([
            "query",
            r"HKCU\Software\Microsoft\Windows\CurrentVersion\Notifications\Settings",
            "/v",
            "NOC_GLOBAL_SETTING_TOASTS_ENABLED",
        ])
        .output();
    match output {
        Ok(out) if out.status.success() => {
            String::from_utf8_lossy(&out.stdout).contains("0x0")
        }
        _ => false,
    }
}

/// Spawns the downloaded installer silently. The installer replaces the
/// installation and relaunches the app, so this process only has to exit.
pub fn invoke_primary(update: &UpdateInfo) -> Result<(), InstallError> {
    info!(installer = %update.asset_path.display(), "spawning installer");
    Command::new(&update.asset_path)
        .arg("/S")
        .spawn()
        .map_err(|e| InstallError::PrimaryFailed(e.to_string()))?;
    Ok(())
}

/// Copies the cached candidate over the install directory with an elevated
/// PowerShell process, waiting for it to finish.
pub fn replace_installed(candidate: &Path) -> Result<(), InstallError> {
    let install_dir = env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(Path::to_path_buf))
        .ok_or_else(|| InstallError::FileSystemError("cannot locate install dir".to_string()))?;

    let copy_cmd = format!(
        "Copy-Item -Path '{}\\*' -Destination '{}' -Recurse -Force",
        candidate.display(),
        install_dir.display()
    );
    info!(%copy_cmd, "replacing installed files with elevated copy");

    let status = Command::new("powershell")
        .args(["-NoProfile", "-Command"])
        .arg(format!(
            "Start-Process powershell -Verb RunAs -Wait -ArgumentList '-NoProfile','-Command',\"{}\"",
            copy_cmd.replace('"', "`\"")
        ))
        .status()
        .map_err(|e| InstallError::ElevationFailed(e.to_string()))?;
    if !status.success() {
        return Err(InstallError::ElevationFailed(format!(
            "powershell exited with {}",
            status
        )));
    }
    Ok(())
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
