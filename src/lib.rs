//! Serial Link Library
//!
//! Cross-platform serial port I/O with one set of semantics on every
//! backend: blocking reads with a uniform timeout model, writes, device-side
//! flushing, DTR/RTS control and modem status, plus an optional hex/ASCII
//! trace of everything that crosses the port.
//!
//! # Modules
//!
//! - `config`: Port configuration with TOML support
//! - `port`: The `Port` handle, the `SerialDevice` backends and a mock device
//! - `timeout`: Read-timeout translation for termios and Win32
//! - `trace`: The hex/ASCII trace logger
//!
//! # Example
//!
//! ```no_run
//! use serial_link::{Port, PortConfig, Signal};
//! use std::time::Duration;
//!
//! let config = PortConfig::new("/dev/ttyUSB0", 9600)
//!     .read_timeout(Duration::from_millis(250));
//! let port = Port::open(&config)?;
//! port.set_signal(Signal::Dtr, true)?;
//! port.write(b"hello")?;
//!
//! let mut buffer = [0u8; 32];
//! match port.read(&mut buffer)? {
//!     0 => println!("timed out"),
//!     n => println!("got {:?}", &buffer[..n]),
//! }
//! port.close()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
pub mod port;
pub mod timeout;
pub mod trace;

// Re-export commonly used types for convenience
pub use config::{
    Config, ConfigError, ConfigLoader, ConfigResult, PortConfig, StopBits, TraceSettings,
};
pub use port::{
    MockDevice, ModemStatus, NativeDevice, Port, PortError, SerialDevice, Signal, TraceStatus,
};
pub use timeout::{posix_timeouts, windows_timeouts, PosixTimeouts, WindowsTimeouts};
pub use trace::{TraceLogger, TraceTag};
