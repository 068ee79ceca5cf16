//! Configuration for the controller manager.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::queue::Backoff;

/// Configuration for the controller manager and its work queues.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ManagerConfig {
    /// Concurrent workers per controller.
    #[serde(default = "default_workers")]
    pub workers_per_controller: usize,

    /// First retry delay after a failed pass.
    #[serde(default = "default_base_backoff_ms")]
    pub base_backoff_ms: u64,

    /// Upper bound on the retry delay after repeated failures.
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,

    /// Fixed delay before re-checking a dependency that does not exist yet.
    #[serde(default = "default_missing_dependency_delay_ms")]
    pub missing_dependency_delay_ms: u64,

    /// Watch events buffered before the manager falls behind and resyncs.
    #[serde(default = "default_watch_buffer")]
    pub watch_buffer: usize,

    /// Time allowed for workers to finish on shutdown.
    #[serde(default = "default_shutdown_timeout_ms")]
    pub shutdown_timeout_ms: u64,
}

const fn default_workers() -> usize {
    2
}

const fn default_base_backoff_ms() -> u64 {
    5
}

const fn default_max_backoff_ms() -> u64 {
    30_000
}

const fn default_missing_dependency_delay_ms() -> u64 {
    10_000
}

const fn default_watch_buffer() -> usize {
    1024
}

const fn default_shutdown_timeout_ms() -> u64 {
    5_000
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            workers_per_controller: default_workers(),
            base_backoff_ms: default_base_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            missing_dependency_delay_ms: default_missing_dependency_delay_ms(),
            watch_buffer: default_watch_buffer(),
            shutdown_timeout_ms: default_shutdown_timeout_ms(),
        }
    }
}

impl ManagerConfig {
    /// Create a new config with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(input: &str) -> Result<Self> {
        let config: Self = flightdeck_core::parse_toml(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = flightdeck_core::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.workers_per_controller == 0 {
            return Err(Error::invalid_config(
                "workers_per_controller must be greater than 0",
            ));
        }

        if self.watch_buffer == 0 {
            return Err(Error::invalid_config("watch_buffer must be greater than 0"));
        }

        if self.base_backoff_ms > self.max_backoff_ms {
            return Err(Error::invalid_config(format!(
                "base_backoff_ms ({}) must not exceed max_backoff_ms ({})",
                self.base_backoff_ms, self.max_backoff_ms
            )));
        }

        if self.missing_dependency_delay_ms == 0 {
            return Err(Error::invalid_config(
                "missing_dependency_delay_ms must be greater than 0",
            ));
        }

        Ok(())
    }

    #[must_use]
    pub const fn missing_dependency_delay(&self) -> Duration {
        Duration::from_millis(self.missing_dependency_delay_ms)
    }

    #[must_use]
    pub const fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }

    /// Backoff curve for keys whose pass failed.
    #[must_use]
    pub const fn backoff(&self) -> Backoff {
        Backoff::new(
            Duration::from_millis(self.base_backoff_ms),
            Duration::from_millis(self.max_backoff_ms),
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ManagerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.missing_dependency_delay(), Duration::from_secs(10));
    }

    #[test]
    fn test_partial_toml_uses_defaults() -> Result<()> {
        let config = ManagerConfig::from_toml_str("workers_per_controller = 4\n")?;
        assert_eq!(config.workers_per_controller, 4);
        assert_eq!(config.max_backoff_ms, default_max_backoff_ms());
        Ok(())
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let result = ManagerConfig::from_toml_str("wokers = 4\n");
        assert!(matches!(result, Err(Error::ConfigLoad { .. })));
    }

    #[test]
    fn test_validation_failures() {
        let zero_workers = ManagerConfig {
            workers_per_controller: 0,
            ..ManagerConfig::default()
        };
        assert!(zero_workers.validate().is_err());

        let inverted = ManagerConfig {
            base_backoff_ms: 10,
            max_backoff_ms: 5,
            ..ManagerConfig::default()
        };
        assert!(matches!(
            inverted.validate(),
            Err(Error::InvalidConfig { .. })
        ));

        let no_delay = ManagerConfig {
            missing_dependency_delay_ms: 0,
            ..ManagerConfig::default()
        };
        assert!(no_delay.validate().is_err());
    }

    #[test]
    fn test_backoff_uses_configured_bounds() {
        let config = ManagerConfig {
            base_backoff_ms: 5,
            max_backoff_ms: 100,
            ..ManagerConfig::default()
        };
        let backoff = config.backoff();
        assert_eq!(backoff.delay(1), Duration::from_millis(5));
        assert_eq!(backoff.delay(10), Duration::from_millis(100));
    }

    #[test]
    fn test_load_from_file() -> Result<()> {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "missing_dependency_delay_ms = 250").unwrap();

        let config = ManagerConfig::load(file.path())?;
        assert_eq!(config.missing_dependency_delay(), Duration::from_millis(250));
        Ok(())
    }
}
