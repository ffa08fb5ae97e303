use std::fs;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use crate::trigger::PollPolicy;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// Severity thresholds for colouring average-success cells, in percent.
/// A row at or below `critical` is critical, at or below `warning` is a
/// warning, anything above is healthy.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub warning: f64,
    pub critical: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            warning: 99.9,
            critical: 99.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PollSettings {
    pub interval_ms: u64,
    pub backoff_factor: f64,
    pub max_interval_ms: u64,
    pub max_attempts: u32,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval_ms: 1_000,
            backoff_factor: 2.0,
            max_interval_ms: 30_000,
            max_attempts: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// API root of the dashboard backend.
    pub base_url: String,
    /// Quiet interval for coalescing filter edits, in milliseconds.
    pub debounce_ms: u64,
    pub poll: PollSettings,
    pub thresholds: Thresholds,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000/api/v1".to_string(),
            debounce_ms: 500,
            poll: PollSettings::default(),
            thresholds: Thresholds::default(),
        }
    }
}

impl DashboardConfig {
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_string(),
            source,
        })?;
        let config: DashboardConfig =
            toml::from_str(&raw).map_err(|source| ConfigError::Parse {
                path: path.to_string(),
                source,
            })?;
        info!(path = %path, base_url = %config.base_url, "Loaded dashboard config.");
        Ok(config)
    }

    pub fn quiet_interval(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn poll_policy(&self) -> PollPolicy {
        PollPolicy {
            base_interval: Duration::from_millis(self.poll.interval_ms),
            backoff_factor: self.poll.backoff_factor,
            max_interval: Duration::from_millis(self.poll.max_interval_ms),
            max_attempts: self.poll.max_attempts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DashboardConfig::default();
        assert_eq!(config.debounce_ms, 500);
        assert_eq!(config.quiet_interval(), Duration::from_millis(500));
        assert_eq!(config.thresholds.warning, 99.9);
        assert_eq!(config.thresholds.critical, 99.0);
        assert_eq!(config.poll_policy().max_attempts, 60);
    }

    #[test]
    fn test_parse_overrides() {
        let raw = r#"
            base_url = "https://jmon.example.com/api/v1"
            debounce_ms = 250

            [poll]
            interval_ms = 2000
            max_attempts = 10

            [thresholds]
            warning = 95.0
            critical = 80.0
        "#;
        let config: DashboardConfig = toml::from_str(raw).unwrap();
        assert_eq!(config.base_url, "https://jmon.example.com/api/v1");
        assert_eq!(config.quiet_interval(), Duration::from_millis(250));
        assert_eq!(config.poll.interval_ms, 2_000);
        assert_eq!(config.poll.max_attempts, 10);
        // Unspecified poll fields keep their defaults.
        assert_eq!(config.poll.backoff_factor, 2.0);
        assert_eq!(config.thresholds.warning, 95.0);
        assert_eq!(config.thresholds.critical, 80.0);
    }

    #[test]
    fn test_missing_file_is_a_read_error() {
        let result = DashboardConfig::load("/nonexistent/checkdeck.toml");
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }
}
