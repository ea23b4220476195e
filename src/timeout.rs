//! Read-timeout translation.
//!
//! A port is configured with one abstract read timeout: the longest a read
//! may wait for its first byte, with [`Duration::ZERO`] meaning "no ceiling".
//! Each backend expresses that differently, and this module is the only place
//! where the millisecond and decisecond conversions happen.

use std::time::Duration;

/// Largest value a Win32 `DWORD` timeout field can hold.
pub const MAXDWORD: u32 = u32::MAX;

/// `VMIN`/`VTIME` pair installed into the termios control characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PosixTimeouts {
    /// Minimum number of bytes a read waits for.
    pub vmin: u8,
    /// Read timer in deciseconds; zero disables the timer.
    pub vtime: u8,
}

/// Read-side fields of a Win32 `COMMTIMEOUTS` structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowsTimeouts {
    pub read_interval: u32,
    pub read_total_multiplier: u32,
    pub read_total_constant: u32,
}

/// Translate a read timeout into termios `VMIN`/`VTIME`.
///
/// A zero timeout is a classic blocking read (`VMIN = 1`, `VTIME = 0`).
/// Anything else arms the timer alone (`VMIN = 0`) so that expiry yields a
/// zero-byte read. Whole milliseconds are truncated to deciseconds, then
/// clamped to `1..=255`: a sub-100ms request still arms a 0.1s timer and
/// anything past 25.5s is capped.
pub fn posix_timeouts(read_timeout: Duration) -> PosixTimeouts {
    if read_timeout.is_zero() {
        return PosixTimeouts { vmin: 1, vtime: 0 };
    }

    let deciseconds = read_timeout.as_millis() / 100;
    let vtime = deciseconds.clamp(1, u8::MAX as u128) as u8;

    PosixTimeouts { vmin: 0, vtime }
}

/// Translate a read timeout into Win32 `COMMTIMEOUTS` read fields.
///
/// A zero timeout uses the documented "wait for at least one byte, return on
/// partial arrival" triple (`MAXDWORD`, `MAXDWORD`, `MAXDWORD - 1`). Anything
/// else becomes a fixed total timeout in milliseconds, independent of gaps
/// between bytes.
pub fn windows_timeouts(read_timeout: Duration) -> WindowsTimeouts {
    if read_timeout.is_zero() {
        return WindowsTimeouts {
            read_interval: MAXDWORD,
            read_total_multiplier: MAXDWORD,
            read_total_constant: MAXDWORD - 1,
        };
    }

    let millis = read_timeout.as_millis().clamp(1, MAXDWORD as u128) as u32;

    WindowsTimeouts {
        read_interval: 0,
        read_total_multiplier: 0,
        read_total_constant: millis,
    }
}
