//! Port configuration.
//!
//! Settings are built in code with [`PortConfig::new`] and its setters, or
//! read from TOML by [`ConfigLoader`]:
//!
//! ```toml
//! [port]
//! name = "modem"
//! baud_rate = 115200
//! read_timeout_ms = 500
//! log_file = "serial.log"
//!
//! [aliases]
//! modem = "/dev/ttyUSB0"
//! ```
//!
//! [`ConfigLoader::load`] reads the first file it finds among
//! `$SERIAL_LINK_CONFIG`, `./serial-link.toml` and
//! `<user config dir>/serial-link/serial-link.toml`, falling back to
//! defaults. `SERIAL_LINK_PORT`, `SERIAL_LINK_BAUD`,
//! `SERIAL_LINK_READ_TIMEOUT_MS`, `SERIAL_LINK_STOP_BITS` and
//! `SERIAL_LINK_LOG_FILE` then replace the matching file values.
//!
//! # Example
//!
//! ```rust,no_run
//! use serial_link::config::ConfigLoader;
//! use serial_link::Port;
//!
//! let loader = ConfigLoader::load()?;
//! let port = Port::open(&loader.config().resolved_port())?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod error;
mod loader;
mod schema;

pub use error::{ConfigError, ConfigResult};
pub use loader::{get_default_config_path, resolve_config_path, ConfigLoader};
pub use schema::{
    default_baud, Config, PortConfig, StopBits, TraceSettings, DEFAULT_BAUD_RATE,
    DEFAULT_TRACE_BUFFER_SIZE,
};
