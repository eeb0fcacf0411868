// Harbor platform support for macOS
// Config: ~/Library/Application Support/Harbor
// Cache:  ~/Library/Caches/Harbor
//
// Primary path runs the downloaded .pkg through the system installer, which
// requires privileges and can fail on locked-down machines; the manual
// fallback replaces /Applications/Harbor.app from the cached artifact with
// an administrator-authorized shell script.

use std::env;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::info;

use crate::types::errors::InstallError;
use crate::types::update::UpdateInfo;

const INSTALLED_APP: &str = "/Applications/Harbor.app";

/// Returns the home directory on macOS.
fn home_dir() -> PathBuf {
    PathBuf::from(env::var("HOME").unwrap_or_else(|_| String::from("/tmp")))
}

/// Returns the configuration directory for Harbor on macOS.
/// `~/Library/Application Support/Harbor`
pub fn get_config_dir() -> PathBuf {
    home_dir()
        .join("Library")
        .join("Application Support")
        .join("Harbor")
}

/// Returns the cache directory for Harbor on macOS.
/// `~/Library/Caches/Harbor`
pub fn get_cache_dir() -> PathBuf {
    home_dir().join("Library").join("Caches").join("Harbor")
}

/// Reads the Notification Center do-not-disturb flag. Focus modes on newer
/// macOS are not readable without private APIs; an unreadable flag counts
/// as off.
pub fn do_not_disturb_enabled() -> bool {
    let output = Command::new("defaults")
        .args(["-currentHost", "read", "com.apple.notificationcenterui", "doNotDisturb"])
        .output();
    match output {
        Ok(out) if out.status.success() => String::from_utf8_lossy(&out.stdout).trim() == "1",
        _ => false,
    }
}

/// Runs the downloaded package through the system installer.
pub fn invoke_primary(update: &UpdateInfo) -> Result<(), InstallError> {
    info!(pkg = %update.asset_path.display(), "invoking system installer");
    let status = Command::new("/usr/sbin/installer")
        .arg("-pkg")
        .arg(&update.asset_path)
        .arg("-target")
        .arg("/")
        .status()
        .map_err(|e| InstallError::PrimaryFailed(e.to_string()))?;
    if !status.success() {
        return Err(InstallError::PrimaryFailed(format!(
            "installer exited with {}",
            status
        )));
    }
    relaunch()
}

/// Replaces the installed bundle with the cached candidate using an
/// administrator-privileged shell script.
pub fn replace_installed(candidate: &Path) -> Result<(), InstallError> {
    let script = format!(
        "rm -rf {installed} && ditto {candidate} {installed}",
        installed = shell_quote(INSTALLED_APP),
        candidate = shell_quote(&candidate.to_string_lossy()),
    );
    info!(%script, "replacing installed app with elevated script");

    let status = Command::new("/usr/bin/osascript")
        .arg("-e")
        .arg(format!(
            "do shell script \"{}\" with administrator privileges",
            script.replace('\\', "\\\\").replace('"', "\\\"")
        ))
        .status()
        .map_err(|e| InstallError::ElevationFailed(e.to_string()))?;
    if !status.success() {
        return Err(InstallError::ElevationFailed(format!(
            "osascript exited with {}",
            status
        )));
    }
    Ok(())
}

/// Launches a fresh instance of the installed bundle.
pub fn relaunch() -> Result<(), InstallError> {
    Command::new("/usr/bin/open")
        .arg("-n")
        .arg(INSTALLED_APP)
        .spawn()
        .map_err(|e| InstallError::RelaunchFailed(e.to_string()))?;
    Ok(())
}

/// Single-quotes a path for embedding in a shell script.
fn shell_quote(path: &str) -> String {
    format!("'{}'", path.replace('\'', "'\\''"))
}
