//! Shared test utilities.
//!
//! Provides tracing setup, trace settings without timestamps (so log lines
//! can be compared verbatim) and, on Unix, a pseudo-terminal pair that
//! stands in for a serial cable.

#![allow(dead_code)]

use serial_link::{PortConfig, TraceSettings};
use std::path::Path;
use std::sync::Once;
use std::time::Duration;

static TRACING: Once = Once::new();

/// Install a test subscriber honouring `RUST_LOG`, once per test binary.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Trace settings whose output is stable across runs.
pub fn plain_trace() -> TraceSettings {
    TraceSettings {
        timestamps: false,
        ..TraceSettings::default()
    }
}

/// Port configuration with a trace log at `log` and a read timeout.
pub fn traced_config(name: &str, log: &Path, timeout: Duration) -> PortConfig {
    PortConfig::new(name, 9600)
        .read_timeout(timeout)
        .log_file(log)
        .trace_settings(plain_trace())
}

/// Read a trace file into lines.
pub fn trace_lines(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}

#[cfg(unix)]
pub use pty::*;

#[cfg(unix)]
mod pty {
    use std::ffi::CStr;
    use std::fs::File;
    use std::os::unix::io::FromRawFd;

    /// The controlling side of a pseudo-terminal and the path of its peer.
    pub struct PtyPair {
        pub master: File,
        pub slave_path: String,
    }

    /// Allocate a pseudo-terminal. The slave stays closed until a port opens it.
    pub fn open_pty() -> PtyPair {
        unsafe {
            let fd = libc::posix_openpt(libc::O_RDWR | libc::O_NOCTTY);
            assert!(fd >= 0, "posix_openpt: {}", std::io::Error::last_os_error());
            assert_eq!(libc::grantpt(fd), 0, "grantpt");
            assert_eq!(libc::unlockpt(fd), 0, "unlockpt");

            let name = libc::ptsname(fd);
            assert!(!name.is_null(), "ptsname");
            let slave_path = CStr::from_ptr(name).to_string_lossy().into_owned();

            PtyPair {
                master: File::from_raw_fd(fd),
                slave_path,
            }
        }
    }

    /// Descriptors currently open in this process.
    #[cfg(target_os = "linux")]
    pub fn open_fd_count() -> usize {
        std::fs::read_dir("/proc/self/fd")
            .map(|entries| entries.count())
            .unwrap_or(0)
    }
}
