//! Wiring configuration: sender/receiver link pairs from a TOML file.
//!
//! The link table is the startup description of the robot's data flow:
//! each entry names one sender and one receiver by their qualified
//! `"Process.Endpoint"` names. It is loaded once at assembly time and
//! applied through [`Runtime::connect_from`]; wiring never changes at
//! runtime.
//!
//! # TOML Example
//!
//! ```toml
//! [[links]]
//! sender = "Cognition.MotionRequest.O"
//! receiver = "Motion.MotionRequest.I"
//!
//! [[links]]
//! sender = "Motion.JointData.O"
//! receiver = "Debug.JointData.I"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use axon_core::consts::NAME_LENGTH_MAX;

use crate::registry::{Runtime, WiringError};

/// Error type for configuration loading operations.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Configuration file not found at the specified path.
    #[error("configuration file not found")]
    FileNotFound,

    /// TOML parsing failed.
    #[error("failed to parse configuration: {0}")]
    ParseError(String),

    /// Semantic validation failed.
    #[error("configuration validation failed: {0}")]
    ValidationError(String),
}

/// Trait for loading configuration from TOML files.
///
/// Provides a default implementation for any type implementing
/// `serde::de::DeserializeOwned`.
///
/// # Contract
///
/// - Returns `ConfigError::FileNotFound` if the file does not exist
/// - Returns `ConfigError::ParseError` if TOML syntax is invalid
pub trait ConfigLoader: Sized + serde::de::DeserializeOwned {
    /// Load configuration from a TOML file.
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound
            } else {
                ConfigError::ParseError(e.to_string())
            }
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}

/// One directed sender-to-receiver connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Link {
    /// Qualified name of the sending endpoint.
    pub sender: String,
    /// Qualified name of the receiving endpoint.
    pub receiver: String,
}

/// The full wiring table of a runtime.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WiringConfig {
    /// Connections, applied in file order.
    #[serde(default)]
    pub links: Vec<Link>,
}

impl WiringConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if a link names an empty
    /// or unqualified endpoint, or exceeds the qualified-name length
    /// bound.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for link in &self.links {
            for name in [&link.sender, &link.receiver] {
                if name.is_empty() {
                    return Err(ConfigError::ValidationError(
                        "link with empty endpoint name".to_string(),
                    ));
                }
                if !name.contains('.') {
                    return Err(ConfigError::ValidationError(format!(
                        "endpoint name '{name}' lacks a process qualifier"
                    )));
                }
                if name.len() > NAME_LENGTH_MAX {
                    return Err(ConfigError::ValidationError(format!(
                        "endpoint name '{name}' exceeds {NAME_LENGTH_MAX} characters"
                    )));
                }
            }
        }
        Ok(())
    }
}

impl Runtime {
    /// Apply every link of a wiring table, file order. The first
    /// failure aborts: a partially wired runtime must not start.
    pub fn connect_from(&self, config: &WiringConfig) -> Result<(), WiringError> {
        for link in &config.links {
            self.connect(&link.sender, &link.receiver)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn parses_link_table() {
        let config: WiringConfig = toml::from_str(
            r#"
            [[links]]
            sender = "Cognition.MotionRequest.O"
            receiver = "Motion.MotionRequest.I"

            [[links]]
            sender = "Motion.JointData.O"
            receiver = "Debug.JointData.I"
            "#,
        )
        .unwrap();
        assert_eq!(config.links.len(), 2);
        assert_eq!(config.links[0].sender, "Cognition.MotionRequest.O");
        assert_eq!(config.links[1].receiver, "Debug.JointData.I");
        config.validate().unwrap();
    }

    #[test]
    fn empty_table_is_valid() {
        let config: WiringConfig = toml::from_str("").unwrap();
        assert!(config.links.is_empty());
        config.validate().unwrap();
    }

    #[test]
    fn load_reports_missing_file() {
        let err = WiringConfig::load(Path::new("/nonexistent/wiring.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound));
    }

    #[test]
    fn load_reports_syntax_errors() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "links = not valid toml").unwrap();
        let err = WiringConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn validation_rejects_unqualified_names() {
        let config = WiringConfig {
            links: vec![Link {
                sender: "NoDotHere".to_string(),
                receiver: "Motion.In".to_string(),
            }],
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn validation_rejects_over_long_names() {
        let config = WiringConfig {
            links: vec![Link {
                sender: format!("A.{}", "x".repeat(NAME_LENGTH_MAX)),
                receiver: "B.In".to_string(),
            }],
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }
}
