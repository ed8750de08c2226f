//! Error types for configuration loading

use rules_core::RuleError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read a file
    #[error("failed to read file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse YAML
    #[error("failed to parse YAML in {path}: {source}")]
    ParseYaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// A required parameter is absent
    #[error("missing required configuration value '{key}'")]
    MissingValue { key: String },

    /// Invalid configuration value
    #[error("invalid configuration value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },
}

impl ConfigError {
    pub(crate) fn invalid(key: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidValue {
            key: key.into(),
            reason: reason.to_string(),
        }
    }

    /// The configuration key this error is about, if any
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::MissingValue { key } | Self::InvalidValue { key, .. } => Some(key),
            Self::ReadFile { .. } | Self::ParseYaml { .. } => None,
        }
    }
}

impl From<ConfigError> for RuleError {
    fn from(err: ConfigError) -> Self {
        let key = err.key().unwrap_or("<document>").to_string();
        let reason = match &err {
            ConfigError::MissingValue { .. } => "missing required value".to_string(),
            ConfigError::InvalidValue { reason, .. } => reason.clone(),
            other => other.to_string(),
        };
        RuleError::InvalidConfiguration { key, reason }
    }
}
