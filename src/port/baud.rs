//! Baud rate lookup.
//!
//! Maps a requested symbol rate to the constant the platform configuration
//! call expects. Rates without an entry are rejected before any device is
//! opened.

/// Platform representation of a baud rate.
#[cfg(unix)]
pub type BaudConstant = libc::speed_t;

/// Platform representation of a baud rate (the DCB takes the rate itself).
#[cfg(windows)]
pub type BaudConstant = u32;

#[cfg(unix)]
static BAUD_TABLE: &[(u32, BaudConstant)] = &[
    (50, libc::B50),
    (75, libc::B75),
    (110, libc::B110),
    (134, libc::B134),
    (150, libc::B150),
    (200, libc::B200),
    (300, libc::B300),
    (600, libc::B600),
    (1200, libc::B1200),
    (1800, libc::B1800),
    (2400, libc::B2400),
    (4800, libc::B4800),
    (9600, libc::B9600),
    (19200, libc::B19200),
    (38400, libc::B38400),
    (57600, libc::B57600),
    (115200, libc::B115200),
    (230400, libc::B230400),
];

/// Rates only Linux defines constants for.
#[cfg(target_os = "linux")]
static HIGH_BAUD_TABLE: &[(u32, BaudConstant)] = &[
    (460800, libc::B460800),
    (500000, libc::B500000),
    (576000, libc::B576000),
    (921600, libc::B921600),
    (1000000, libc::B1000000),
    (1152000, libc::B1152000),
    (1500000, libc::B1500000),
    (2000000, libc::B2000000),
    (2500000, libc::B2500000),
    (3000000, libc::B3000000),
    (3500000, libc::B3500000),
    (4000000, libc::B4000000),
];

#[cfg(all(unix, not(target_os = "linux")))]
static HIGH_BAUD_TABLE: &[(u32, BaudConstant)] = &[];

#[cfg(windows)]
static HIGH_BAUD_TABLE: &[(u32, BaudConstant)] = &[];

#[cfg(windows)]
static BAUD_TABLE: &[(u32, BaudConstant)] = &[
    (110, 110),
    (300, 300),
    (600, 600),
    (1200, 1200),
    (2400, 2400),
    (4800, 4800),
    (9600, 9600),
    (14400, 14400),
    (19200, 19200),
    (38400, 38400),
    (57600, 57600),
    (115200, 115200),
    (128000, 128000),
    (230400, 230400),
    (256000, 256000),
    (460800, 460800),
    (921600, 921600),
    (1000000, 1000000),
    (2000000, 2000000),
    (3000000, 3000000),
];

/// Look up the platform constant for `rate`.
pub fn lookup(rate: u32) -> Option<BaudConstant> {
    entries()
        .find(|(supported, _)| *supported == rate)
        .map(|(_, constant)| *constant)
}

/// All rates this platform accepts, in ascending order.
pub fn supported_rates() -> impl Iterator<Item = u32> {
    entries().map(|(rate, _)| *rate)
}

fn entries() -> impl Iterator<Item = &'static (u32, BaudConstant)> {
    BAUD_TABLE.iter().chain(HIGH_BAUD_TABLE.iter())
}
