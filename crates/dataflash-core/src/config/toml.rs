//! TOML driver configuration
//!
//! All keys are optional; missing ones keep their defaults:
//!
//! ```toml
//! busy_wait_policy = "post-operation"
//! power_policy = "sleep-between-operations"
//! resume_settle_us = 50
//!
//! [wait]
//! poll_interval_us = 10
//! timeout_us = 200000
//!
//! [chip_erase_wait]
//! poll_interval_us = 10000
//! timeout_us = 300000000
//! ```

use std::fmt;
use std::fs;
use std::path::Path;
use std::string::String;

use super::DriverConfig;

/// Errors that can occur when loading a configuration file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// File could not be read
    IoError,
    /// File is not valid TOML or has unknown values
    ParseError,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IoError => write!(f, "failed to read configuration file"),
            Self::ParseError => write!(f, "failed to parse configuration file"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl DriverConfig {
    /// Load a configuration from a TOML file
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|_| ConfigError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// Parse a configuration from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| {
            log::error!("invalid driver configuration: {}", e);
            ConfigError::ParseError
        })
    }

    /// Convert the configuration to a TOML string
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string(self).map_err(|_| ConfigError::ParseError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BusyWaitPolicy, PowerPolicy, WaitPolicy};

    #[test]
    fn test_parse_full_config() {
        let content = r#"
busy_wait_policy = "post-operation"
power_policy = "sleep-between-operations"
resume_settle_us = 35

[wait]
poll_interval_us = 20
timeout_us = 100000
"#;
        let config = DriverConfig::from_toml_str(content).unwrap();
        assert_eq!(config.busy_wait_policy, BusyWaitPolicy::PostOperation);
        assert_eq!(config.power_policy, PowerPolicy::SleepBetweenOperations);
        assert_eq!(config.resume_settle_us, 35);
        assert_eq!(config.wait, WaitPolicy::new(20, 100_000));
        assert_eq!(config.chip_erase_wait, DriverConfig::default().chip_erase_wait);
    }

    #[test]
    fn test_empty_config_is_default() {
        assert_eq!(DriverConfig::from_toml_str("").unwrap(), DriverConfig::default());
    }

    #[test]
    fn test_partial_wait_table_keeps_other_field() {
        let config = DriverConfig::from_toml_str("[wait]\ntimeout_us = 5000\n").unwrap();
        assert_eq!(config.wait.timeout_us, 5000);
        assert_eq!(config.wait.poll_interval_us, 10);
    }

    #[test]
    fn test_unknown_policy_rejected() {
        assert_eq!(
            DriverConfig::from_toml_str("busy_wait_policy = \"sometimes\"\n"),
            Err(ConfigError::ParseError)
        );
    }

    #[test]
    fn test_round_trip_through_toml() {
        let config = DriverConfig::default()
            .with_busy_wait_policy(BusyWaitPolicy::PostOperation)
            .with_power_policy(PowerPolicy::SleepBetweenOperations);
        let text = config.to_toml_string().unwrap();
        assert_eq!(DriverConfig::from_toml_str(&text).unwrap(), config);
    }
}
