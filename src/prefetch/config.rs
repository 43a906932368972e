//! Prefetch scheduler configuration.

use crate::prefetch::conditions::ConditionSnapshot;

/// Prefetch configuration supplied by the host application.
#[derive(Debug, Clone, PartialEq)]
pub struct PrefetchConfig {
    /// Master switch; when false the scheduler issues nothing.
    pub enabled: bool,
    /// Maximum concurrent in-flight prefetch fetches.
    pub max_concurrent: usize,
    /// Items to prefetch ahead of the current index on fast connections.
    pub ahead_count: usize,
    /// Items to prefetch behind the current index.
    pub behind_count: usize,
    /// Battery percentage below which prefetch is gated off (unless charging).
    pub min_battery_percent: u8,
    /// Only prefetch on Wi-Fi-class connections.
    pub wifi_only: bool,
}

impl Default for PrefetchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_concurrent: 2,
            ahead_count: 3,
            behind_count: 1,
            min_battery_percent: 20,
            wifi_only: false,
        }
    }
}

impl PrefetchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent;
        self
    }

    pub fn with_ahead_count(mut self, ahead_count: usize) -> Self {
        self.ahead_count = ahead_count;
        self
    }

    pub fn with_behind_count(mut self, behind_count: usize) -> Self {
        self.behind_count = behind_count;
        self
    }

    pub fn with_min_battery_percent(mut self, percent: u8) -> Self {
        self.min_battery_percent = percent;
        self
    }

    pub fn with_wifi_only(mut self, wifi_only: bool) -> Self {
        self.wifi_only = wifi_only;
        self
    }

    /// The forward window size for the given conditions.
    ///
    /// Slow connections shrink the window to a single item so speculative
    /// fetches do not compete with the playing video for bandwidth.
    pub fn effective_ahead(&self, snapshot: &ConditionSnapshot) -> usize {
        if snapshot.is_fast() {
            self.ahead_count
        } else {
            self.ahead_count.min(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prefetch::conditions::ConnectionClass;

    #[test]
    fn test_config_defaults() {
        let config = PrefetchConfig::default();

        assert!(config.enabled);
        assert_eq!(config.max_concurrent, 2);
        assert_eq!(config.ahead_count, 3);
        assert_eq!(config.behind_count, 1);
        assert_eq!(config.min_battery_percent, 20);
        assert!(!config.wifi_only);
    }

    #[test]
    fn test_config_builder() {
        let config = PrefetchConfig::new()
            .with_enabled(false)
            .with_max_concurrent(4)
            .with_ahead_count(5)
            .with_behind_count(2)
            .with_min_battery_percent(30)
            .with_wifi_only(true);

        assert!(!config.enabled);
        assert_eq!(config.max_concurrent, 4);
        assert_eq!(config.ahead_count, 5);
        assert_eq!(config.behind_count, 2);
        assert_eq!(config.min_battery_percent, 30);
        assert!(config.wifi_only);
    }

    #[test]
    fn test_effective_ahead_fast_connection() {
        let config = PrefetchConfig::default();
        let snapshot = ConditionSnapshot::default(); // Wi-Fi class

        assert_eq!(config.effective_ahead(&snapshot), 3);
    }

    #[test]
    fn test_effective_ahead_slow_connection() {
        let config = PrefetchConfig::default();
        let snapshot = ConditionSnapshot {
            connection: ConnectionClass::Cellular3g,
            ..ConditionSnapshot::default()
        };

        assert_eq!(config.effective_ahead(&snapshot), 1);
    }
}
