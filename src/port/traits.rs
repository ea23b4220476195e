//! Core traits for serial port abstraction.
//!
//! Defines the `SerialDevice` trait implemented once per platform backend
//! (and by the mock used in tests). Shared state such as the trace logger
//! lives in [`Port`](super::Port), which composes a device rather than
//! extending it.

use super::error::PortError;
use std::fmt;

/// Modem control lines driven by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    /// Data Terminal Ready.
    Dtr,
    /// Request To Send.
    Rts,
}

impl Signal {
    /// The conventional line name, as written to the trace log.
    pub fn name(self) -> &'static str {
        match self {
            Self::Dtr => "DTR",
            Self::Rts => "RTS",
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Snapshot of the modem status lines driven by the device.
///
/// Only ever produced by a successful status read; a failed read is an
/// error, never an all-false snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModemStatus {
    pub clear_to_send: bool,
    pub data_set_ready: bool,
    pub ring_indicator: bool,
    pub carrier_detect: bool,
}

impl ModemStatus {
    /// Decode a platform status word given the bit assigned to each line.
    pub fn from_bits(bits: u32, cts: u32, dsr: u32, ri: u32, cd: u32) -> Self {
        Self {
            clear_to_send: bits & cts != 0,
            data_set_ready: bits & dsr != 0,
            ring_indicator: bits & ri != 0,
            carrier_detect: bits & cd != 0,
        }
    }
}

impl fmt::Display for ModemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CTS:{} DSR:{} RI:{} CD:{}",
            self.clear_to_send, self.data_set_ready, self.ring_indicator, self.carrier_detect
        )
    }
}

/// Trait for an open serial device.
///
/// All operations take `&self`: a device is shared between at most one
/// reader and one writer, and each backend provides whatever exclusion its
/// I/O model needs. Reads return `Ok(0)` on timeout or end-of-file.
pub trait SerialDevice: Send + Sync + fmt::Debug {
    /// Read into `buffer`, blocking up to the configured read timeout.
    fn read_bytes(&self, buffer: &mut [u8]) -> Result<usize, PortError>;

    /// Write `data`, returning the number of bytes accepted.
    fn write_bytes(&self, data: &[u8]) -> Result<usize, PortError>;

    /// Discard unread input and unsent output held by the driver.
    fn clear_buffers(&self) -> Result<(), PortError>;

    /// Assert or clear a modem control line.
    fn set_signal(&self, signal: Signal, asserted: bool) -> Result<(), PortError>;

    /// Read the modem status lines.
    fn modem_status(&self) -> Result<ModemStatus, PortError>;

    /// Get the name/path of this device.
    fn name(&self) -> &str;

    /// Release the device, reporting any error from the final close.
    fn close(self) -> Result<(), PortError>
    where
        Self: Sized;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_names() {
        assert_eq!(Signal::Dtr.name(), "DTR");
        assert_eq!(Signal::Rts.to_string(), "RTS");
    }

    #[test]
    fn test_modem_status_from_bits() {
        let status = ModemStatus::from_bits(0x10 | 0x80, 0x10, 0x20, 0x40, 0x80);
        assert_eq!(
            status,
            ModemStatus {
                clear_to_send: true,
                data_set_ready: false,
                ring_indicator: false,
                carrier_detect: true,
            }
        );
        assert_eq!(status.to_string(), "CTS:true DSR:false RI:false CD:true");
    }
}
