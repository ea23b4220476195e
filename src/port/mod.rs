//! Port abstraction layer for serial communication.
//!
//! [`Port`] is the handle callers use. It composes a platform device
//! ([`NativeDevice`]: termios on Unix, overlapped I/O on Windows) with the
//! optional trace logger, and reports every transfer, failure and
//! line-control outcome to that log.

pub mod baud;
pub mod error;
pub mod mock;
pub mod traits;

#[cfg(unix)]
mod posix;
#[cfg(windows)]
mod win32;
#[cfg(windows)]
mod windows;

pub use error::PortError;
pub use mock::MockDevice;
pub use traits::*;

#[cfg(unix)]
pub use posix::PosixDevice;
#[cfg(windows)]
pub use windows::OverlappedDevice;

/// The device type [`Port::open`] produces on this platform.
#[cfg(unix)]
pub type NativeDevice = PosixDevice;

/// The device type [`Port::open`] produces on this platform.
#[cfg(windows)]
pub type NativeDevice = OverlappedDevice;

use crate::config::PortConfig;
use crate::trace::{TraceLogger, TraceTag};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

/// Outcome of attaching the trace log at open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceStatus {
    /// No log destination was configured.
    Disabled,
    /// Traffic is being logged.
    Attached,
    /// The log could not be opened; the port runs without one.
    Failed { path: PathBuf, reason: String },
}

/// An open serial port.
///
/// Reads, writes, flushes and line control all take `&self`, so one thread
/// may read while another writes (share it with `Arc` or scoped threads).
/// [`Port::close`] consumes the port, which rules out any use after close.
/// Dropping a port without closing it still releases the device and flushes
/// the trace log.
#[derive(Debug)]
pub struct Port<D: SerialDevice = NativeDevice> {
    // Dropped in declaration order: the trace flushes before the device goes.
    trace: Option<TraceLogger>,
    device: D,
    trace_status: TraceStatus,
}

impl Port<NativeDevice> {
    /// Open the port described by `config`.
    ///
    /// The baud rate is resolved before the device is touched, so an
    /// unsupported rate never creates a descriptor. Either a fully configured
    /// port is returned or every resource acquired along the way has been
    /// released.
    ///
    /// # Example
    /// ```no_run
    /// use serial_link::{Port, PortConfig};
    /// use std::time::Duration;
    ///
    /// let config = PortConfig::new("/dev/ttyUSB0", 115200)
    ///     .read_timeout(Duration::from_millis(500))
    ///     .log_file("serial.log");
    /// let port = Port::open(&config)?;
    /// port.write(b"ATZ\r")?;
    /// let mut reply = [0u8; 64];
    /// let n = port.read(&mut reply)?;
    /// port.close()?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn open(config: &PortConfig) -> Result<Self, PortError> {
        config.validate()?;
        let speed = baud::lookup(config.baud_rate)
            .ok_or(PortError::UnsupportedBaudRate(config.baud_rate))?;

        let device = NativeDevice::open(config, speed)?;
        tracing::debug!(
            port = %config.name,
            baud = config.baud_rate,
            timeout_ms = config.read_timeout_ms,
            "port opened"
        );

        Ok(Self::from_device(device, config))
    }
}

impl<D: SerialDevice> Port<D> {
    /// Wrap an already open device, attaching the trace log `config` names.
    ///
    /// A trace log that cannot be opened is reported once through `tracing`
    /// and [`Port::trace_status`]; the port itself stays usable.
    pub fn from_device(device: D, config: &PortConfig) -> Self {
        let (trace, trace_status) = match &config.log_file {
            None => (None, TraceStatus::Disabled),
            Some(path) => match attach_trace(path, config) {
                Ok(logger) => (Some(logger), TraceStatus::Attached),
                Err(reason) => {
                    tracing::warn!(path = %path.display(), "trace log unavailable: {}", reason);
                    let status = TraceStatus::Failed {
                        path: path.clone(),
                        reason,
                    };
                    (None, status)
                }
            },
        };

        let port = Self {
            device,
            trace,
            trace_status,
        };
        port.log_message("Open", format_args!("{}", port.device.name()));
        port
    }

    /// Wrap an already open device with an explicit trace logger.
    pub fn with_logger(device: D, logger: TraceLogger) -> Self {
        let port = Self {
            device,
            trace: Some(logger),
            trace_status: TraceStatus::Attached,
        };
        port.log_message("Open", format_args!("{}", port.device.name()));
        port
    }

    /// Get the name/path of this port.
    pub fn name(&self) -> &str {
        self.device.name()
    }

    /// The underlying device.
    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn trace_status(&self) -> &TraceStatus {
        &self.trace_status
    }

    /// Read into `buffer`.
    ///
    /// Returns `Ok(0)` when the read timeout expires or the device reports
    /// end-of-file. Received bytes are logged before this returns.
    pub fn read(&self, buffer: &mut [u8]) -> Result<usize, PortError> {
        match self.device.read_bytes(buffer) {
            Ok(n) => {
                if n > 0 {
                    self.log_data(TraceTag::Read, &buffer[..n]);
                }
                Ok(n)
            }
            Err(e) => {
                self.log_message("Read", format_args!("error {}", e));
                Err(e)
            }
        }
    }

    /// Write `data`, returning how many bytes the device accepted.
    pub fn write(&self, data: &[u8]) -> Result<usize, PortError> {
        match self.device.write_bytes(data) {
            Ok(n) => {
                if n > 0 {
                    self.log_data(TraceTag::Write, &data[..n]);
                }
                Ok(n)
            }
            Err(e) => {
                self.log_message("Write", format_args!("error {}", e));
                Err(e)
            }
        }
    }

    /// Discard data received but not read and data written but not sent.
    ///
    /// This acts on the device; it is unrelated to the trace log.
    pub fn flush(&self) -> Result<(), PortError> {
        self.device.clear_buffers().map_err(|e| {
            self.log_message("Flush", format_args!("error {}", e));
            e
        })
    }

    /// Assert or clear a modem control line. The outcome is always logged.
    pub fn set_signal(&self, signal: Signal, asserted: bool) -> Result<(), PortError> {
        let result = self.device.set_signal(signal, asserted);
        match &result {
            Ok(()) => self.log_message(signal.name(), format_args!("{}", asserted)),
            Err(e) => self.log_message(signal.name(), format_args!("{} -> error {}", asserted, e)),
        }
        result
    }

    pub fn set_dtr(&self, asserted: bool) -> Result<(), PortError> {
        self.set_signal(Signal::Dtr, asserted)
    }

    pub fn set_rts(&self, asserted: bool) -> Result<(), PortError> {
        self.set_signal(Signal::Rts, asserted)
    }

    /// Read the modem status lines.
    ///
    /// On failure no flags are returned at all, so a failed query can never
    /// be read as "all lines deasserted".
    pub fn modem_status(&self) -> Result<ModemStatus, PortError> {
        let result = self.device.modem_status();
        match &result {
            Ok(status) => self.log_message("ModemStatus", format_args!("{}", status)),
            Err(e) => self.log_message("ModemStatus", format_args!("error {}", e)),
        }
        result
    }

    /// Write out any partially filled trace row.
    pub fn flush_trace(&self) {
        if let Some(trace) = &self.trace {
            trace.flush();
        }
    }

    /// Close the port.
    ///
    /// The trace log is flushed before the device is released. No read or
    /// write may be in flight; the `self` receiver makes that a borrow error
    /// rather than a runtime hazard.
    pub fn close(self) -> Result<(), PortError> {
        let Self { device, trace, .. } = self;
        let name = device.name().to_string();

        if let Some(trace) = &trace {
            trace.log_message("Close", format_args!("{}", name));
            trace.flush();
        }

        let result = device.close();
        if let (Err(e), Some(trace)) = (&result, &trace) {
            trace.log_message("Close", format_args!("error {}", e));
        }
        tracing::debug!(port = %name, ok = result.is_ok(), "port closed");
        result
    }

    fn log_data(&self, tag: TraceTag, data: &[u8]) {
        if let Some(trace) = &self.trace {
            trace.log_data(tag, data);
        }
    }

    fn log_message(&self, tag: &str, args: fmt::Arguments<'_>) {
        if let Some(trace) = &self.trace {
            trace.log_message(tag, args);
        }
    }
}

fn attach_trace(path: &Path, config: &PortConfig) -> Result<TraceLogger, String> {
    config.trace.validate().map_err(|e| e.to_string())?;
    TraceLogger::open_file(path, &config.trace).map_err(|e| e.to_string())
}

impl<D: SerialDevice> io::Read for &Port<D> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Port::<D>::read(self, buf).map_err(io::Error::from)
    }
}

impl<D: SerialDevice> io::Write for &Port<D> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Port::<D>::write(self, buf).map_err(io::Error::from)
    }

    /// Flushes the trace log only; transmitted data is never discarded here.
    fn flush(&mut self) -> io::Result<()> {
        self.flush_trace();
        Ok(())
    }
}

impl<D: SerialDevice> io::Read for Port<D> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        io::Read::read(&mut &*self, buf)
    }
}

impl<D: SerialDevice> io::Write for Port<D> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::Write::write(&mut &*self, buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        io::Write::flush(&mut &*self)
    }
}
