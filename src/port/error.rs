//! Port-specific error types.
//!
//! Configuration problems (bad settings, unsupported rates, devices that are
//! not serial ports) are fatal to opening a port and never retried. I/O
//! problems come straight from the operating system; retrying is left to the
//! caller. Timeouts and end-of-file are not errors: reads report them as a
//! zero-byte success.

use crate::config::ConfigError;
use thiserror::Error;

/// Errors that can occur during serial port operations.
#[derive(Debug, Error)]
pub enum PortError {
    /// The requested baud rate has no platform equivalent.
    #[error("Unsupported baud rate: {0}")]
    UnsupportedBaudRate(u32),

    /// The device exists but cannot be used as a serial port.
    #[error("Invalid device '{name}': {reason}")]
    InvalidDevice { name: String, reason: String },

    /// The port configuration was rejected before touching the device.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// An I/O error occurred during port operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PortError {
    /// Create an InvalidDevice error.
    pub fn invalid_device(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidDevice {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create an Io error from the calling thread's last OS error.
    pub fn last_os_error() -> Self {
        Self::Io(std::io::Error::last_os_error())
    }

    /// Whether this error belongs to the configuration family.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedBaudRate(_) | Self::InvalidDevice { .. } | Self::Config(_)
        )
    }

    /// The underlying I/O error kind, if this is an I/O error.
    pub fn io_kind(&self) -> Option<std::io::ErrorKind> {
        match self {
            Self::Io(e) => Some(e.kind()),
            _ => None,
        }
    }
}

impl From<PortError> for std::io::Error {
    fn from(err: PortError) -> Self {
        match err {
            PortError::Io(e) => e,
            other => std::io::Error::new(std::io::ErrorKind::InvalidInput, other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_io_error_keeps_kind() {
        let io: std::io::Error =
            PortError::from(std::io::Error::from(std::io::ErrorKind::TimedOut)).into();
        assert_eq!(io.kind(), std::io::ErrorKind::TimedOut);

        let io: std::io::Error = PortError::UnsupportedBaudRate(7).into();
        assert_eq!(io.kind(), std::io::ErrorKind::InvalidInput);
    }

    #[test]
    fn test_error_display() {
        let err = PortError::UnsupportedBaudRate(1234);
        assert_eq!(err.to_string(), "Unsupported baud rate: 1234");

        let err = PortError::invalid_device("/dev/null", "not a tty");
        assert_eq!(err.to_string(), "Invalid device '/dev/null': not a tty");
    }

    #[test]
    fn test_classification() {
        assert!(PortError::UnsupportedBaudRate(1234).is_configuration());
        assert!(PortError::invalid_device("x", "y").is_configuration());
        assert!(PortError::from(ConfigError::validation("name", "empty")).is_configuration());

        let io = PortError::from(std::io::Error::from(std::io::ErrorKind::BrokenPipe));
        assert!(!io.is_configuration());
        assert_eq!(io.io_kind(), Some(std::io::ErrorKind::BrokenPipe));
    }
}
