//! Arbiter configuration (`[arbiter]` TOML section).

use serde::{Deserialize, Serialize};

/// Thresholds of the signal rate arbiter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArbiterConfig {
    /// When false every signal is calm.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Sliding window length in seconds.
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
    /// Signals inside the window that make it noisy.
    #[serde(default = "default_max_signals")]
    pub max_signals: u32,
    /// Direction flips inside the window that make it noisy.
    #[serde(default = "default_max_flips")]
    pub max_flips: u32,
    /// A signal arriving sooner than this after a successful open is noisy.
    #[serde(default = "default_min_hold_secs")]
    pub min_hold_secs: u64,
    /// How long noisy mode stays latched once triggered.
    #[serde(default = "default_hysteresis_secs")]
    pub hysteresis_secs: u64,
}

fn default_enabled() -> bool {
    true
}

fn default_window_secs() -> u64 {
    90
}

fn default_max_signals() -> u32 {
    4
}

fn default_max_flips() -> u32 {
    3
}

fn default_min_hold_secs() -> u64 {
    30
}

fn default_hysteresis_secs() -> u64 {
    60
}

impl Default for ArbiterConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            window_secs: default_window_secs(),
            max_signals: default_max_signals(),
            max_flips: default_max_flips(),
            min_hold_secs: default_min_hold_secs(),
            hysteresis_secs: default_hysteresis_secs(),
        }
    }
}

impl ArbiterConfig {
    pub(crate) fn window_ms(&self) -> u64 {
        self.window_secs * 1000
    }

    pub(crate) fn min_hold_ms(&self) -> u64 {
        self.min_hold_secs * 1000
    }

    pub(crate) fn hysteresis_ms(&self) -> u64 {
        self.hysteresis_secs * 1000
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ArbiterConfig::default();
        assert!(config.enabled);
        assert_eq!(config.window_secs, 90);
        assert_eq!(config.max_signals, 4);
        assert_eq!(config.max_flips, 3);
        assert_eq!(config.min_hold_secs, 30);
        assert_eq!(config.hysteresis_secs, 60);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: ArbiterConfig = toml::from_str("max_signals = 6\nenabled = false").unwrap();
        assert!(!config.enabled);
        assert_eq!(config.max_signals, 6);
        assert_eq!(config.window_secs, 90);
        assert_eq!(config.hysteresis_secs, 60);
    }
}
