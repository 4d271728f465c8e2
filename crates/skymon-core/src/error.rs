//! Domain-level error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading the monitor configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML for [`crate::MonitorConfig`].
    #[error("Failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Errors in domain operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    /// A field failed validation.
    #[error("Invalid {field}: {value} (expected {expected})")]
    InvalidFieldValue {
        field: String,
        value: String,
        expected: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DomainError::InvalidFieldValue {
            field: "command".to_string(),
            value: "altitude".to_string(),
            expected: "speed | info | exit".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid command: altitude (expected speed | info | exit)"
        );
    }
}
