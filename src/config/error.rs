//! Errors raised while loading or checking configuration.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", path.display())]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed configuration: {0}")]
    ParseError(#[from] toml::de::Error),

    /// A value that parsed but cannot be used; `key` is the dotted TOML path.
    #[error("{key}: {message}")]
    ValidationError { key: String, message: String },

    #[error("environment variable {var}: {message}")]
    EnvParseError { var: String, message: String },
}

impl ConfigError {
    pub fn validation(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ValidationError {
            key: key.into(),
            message: message.into(),
        }
    }

    pub fn env_parse(var: impl Into<String>, message: impl Into<String>) -> Self {
        Self::EnvParseError {
            var: var.into(),
            message: message.into(),
        }
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ConfigError::validation("trace.buffer_size", "20 is not a non-zero multiple of 16");
        assert_eq!(
            err.to_string(),
            "trace.buffer_size: 20 is not a non-zero multiple of 16"
        );

        let err = ConfigError::env_parse("SERIAL_LINK_BAUD", "'fast' is not a baud rate");
        assert_eq!(
            err.to_string(),
            "environment variable SERIAL_LINK_BAUD: 'fast' is not a baud rate"
        );
    }

    #[test]
    fn test_read_error_names_path() {
        let err = ConfigError::ReadError {
            path: PathBuf::from("/etc/serial-link.toml"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert!(err.to_string().starts_with("cannot read /etc/serial-link.toml: "));
    }
}
