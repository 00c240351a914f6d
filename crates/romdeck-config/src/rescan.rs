//! Rescan behavior configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Settings that control when library rescans run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RescanConfig {
    /// Schedule a rescan when files change under the library root
    #[serde(default = "default_true")]
    pub on_filesystem_change: bool,

    /// Debounce delay in minutes before a change-triggered rescan runs
    #[serde(default = "default_delay_minutes")]
    pub delay_minutes: u64,

    /// Run a periodic background rescan of unidentified entries
    #[serde(default = "default_true")]
    pub scheduled: bool,

    /// Interval in minutes between scheduled background rescans
    #[serde(default = "default_scheduled_interval")]
    pub scheduled_interval_minutes: u64,
}

fn default_true() -> bool {
    true
}

fn default_delay_minutes() -> u64 {
    5
}

fn default_scheduled_interval() -> u64 {
    24 * 60
}

impl Default for RescanConfig {
    fn default() -> Self {
        Self {
            on_filesystem_change: true,
            delay_minutes: default_delay_minutes(),
            scheduled: true,
            scheduled_interval_minutes: default_scheduled_interval(),
        }
    }
}

impl RescanConfig {
    /// Debounce delay as a [`Duration`]
    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.delay_minutes * 60)
    }

    /// Scheduled rescan interval as a [`Duration`]
    pub fn scheduled_interval(&self) -> Duration {
        Duration::from_secs(self.scheduled_interval_minutes * 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_enable_both_paths() {
        let config = RescanConfig::default();
        assert!(config.on_filesystem_change);
        assert!(config.scheduled);
        assert_eq!(config.scheduled_interval(), Duration::from_secs(86400));
    }
}
