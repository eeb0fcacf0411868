use serde::{Deserialize, Serialize};

/// Default release feed endpoint for Harbor Desktop.
pub const DEFAULT_FEED_URL: &str = "https://releases.harbor.app/desktop/latest.json";

fn default_true() -> bool {
    true
}

fn default_check_interval() -> u64 {
    3600 // 1 hour
}

fn default_notify_interval() -> u64 {
    86400 // 24 hours
}

fn default_forced_exit_delay() -> u64 {
    500
}

fn default_feed_url() -> String {
    DEFAULT_FEED_URL.to_string()
}

/// Updater configuration, loaded from `updater.json` in the platform config
/// directory. Missing fields fall back to defaults so old config files keep
/// working.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdaterConfig {
    /// Master gate: when false, neither scheduled nor manual checks run.
    #[serde(default = "default_true")]
    pub auto_update_enabled: bool,
    /// Release feed endpoint serving release JSON.
    #[serde(default = "default_feed_url")]
    pub feed_url: String,
    /// Seconds between background update checks.
    #[serde(default = "default_check_interval")]
    pub check_interval_secs: u64,
    /// Seconds between re-surfacing update notifications.
    #[serde(default = "default_notify_interval")]
    pub notify_interval_secs: u64,
    /// Safety-net delay before a forced exit after invoking the OS installer.
    /// Tunable because the right value depends on machine and disk speed.
    #[serde(default = "default_forced_exit_delay")]
    pub forced_exit_delay_ms: u64,
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self {
            auto_update_enabled: true,
            feed_url: default_feed_url(),
            check_interval_secs: default_check_interval(),
            notify_interval_secs: default_notify_interval(),
            forced_exit_delay_ms: default_forced_exit_delay(),
        }
    }
}
