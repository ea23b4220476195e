//! Configuration schema definitions.
//!
//! This module defines the structure of the configuration file using serde.
//! Every section has defaults, so a partial file is always accepted.

use super::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// Default baud rate when the file does not name one.
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Default trace buffer size in bytes.
pub const DEFAULT_TRACE_BUFFER_SIZE: usize = 64;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Port to open
    pub port: PortConfig,
    /// Port aliases for convenience ("modem" -> "/dev/ttyUSB0")
    pub aliases: HashMap<String, String>,
}

impl Config {
    /// Resolve a port name through aliases
    pub fn resolve_port(&self, name: &str) -> String {
        self.aliases
            .get(name)
            .cloned()
            .unwrap_or_else(|| name.to_string())
    }

    /// The port configuration with its name resolved through the aliases.
    pub fn resolved_port(&self) -> PortConfig {
        let mut port = self.port.clone();
        port.name = self.resolve_port(&port.name);
        port
    }
}

/// Everything needed to open one serial port.
///
/// The value is only borrowed while the port opens; the open port keeps no
/// reference to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortConfig {
    /// Device path ("/dev/ttyUSB0") or name ("COM3")
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_baud")]
    pub baud_rate: u32,
    /// Longest a read waits for its first byte; 0 blocks indefinitely
    #[serde(default)]
    pub read_timeout_ms: u64,
    #[serde(default)]
    pub stop_bits: StopBits,
    /// Trace log destination; tracing is disabled without one
    #[serde(default)]
    pub log_file: Option<PathBuf>,
    #[serde(default)]
    pub trace: TraceSettings,
}

/// Default baud rate for serial port configuration (9600 bps).
pub fn default_baud() -> u32 {
    DEFAULT_BAUD_RATE
}

impl Default for PortConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout_ms: 0,
            stop_bits: StopBits::One,
            log_file: None,
            trace: TraceSettings::default(),
        }
    }
}

impl PortConfig {
    /// Configuration for `name` at `baud_rate`, everything else defaulted.
    pub fn new(name: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            name: name.into(),
            baud_rate,
            ..Self::default()
        }
    }

    /// Set the read timeout; [`Duration::ZERO`] blocks indefinitely.
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout_ms = timeout.as_millis().min(u64::MAX as u128) as u64;
        self
    }

    pub fn stop_bits(mut self, stop_bits: StopBits) -> Self {
        self.stop_bits = stop_bits;
        self
    }

    /// Enable the trace log at `path`.
    pub fn log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_file = Some(path.into());
        self
    }

    pub fn trace_settings(mut self, trace: TraceSettings) -> Self {
        self.trace = trace;
        self
    }

    /// Get the read timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    /// Check the values that can be rejected without touching a device.
    ///
    /// Baud rates are not checked here: whether a rate is supported is a
    /// property of the platform and is reported by the port itself.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::validation("name", "device name is empty"));
        }
        if self.baud_rate == 0 {
            return Err(ConfigError::validation("baud_rate", "must be greater than zero"));
        }
        self.trace.validate()
    }
}

/// Number of stop bits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StopBits {
    #[default]
    One,
    Two,
}

impl std::str::FromStr for StopBits {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "1" | "one" => Ok(Self::One),
            "2" | "two" => Ok(Self::Two),
            other => Err(format!("expected 1 or 2, got '{}'", other)),
        }
    }
}

/// Trace log tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceSettings {
    /// Staging buffer size: a non-zero multiple of 16 (64 or 128 typically)
    pub buffer_size: usize,
    /// Prefix every line with a local timestamp
    pub timestamps: bool,
}

impl Default for TraceSettings {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_TRACE_BUFFER_SIZE,
            timestamps: true,
        }
    }
}

impl TraceSettings {
    pub fn validate(&self) -> ConfigResult<()> {
        if self.buffer_size == 0 || self.buffer_size % 16 != 0 {
            return Err(ConfigError::validation(
                "trace.buffer_size",
                format!("{} is not a non-zero multiple of 16", self.buffer_size),
            ));
        }
        Ok(())
    }
}
