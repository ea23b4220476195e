//! POSIX backend: termios configuration and blocking read/write.
//!
//! The descriptor is opened non-blocking so that opening never waits on
//! carrier detect, configured into raw mode with the translated
//! `VMIN`/`VTIME`, and only then switched back to blocking mode. Reads and
//! writes are plain blocking syscalls; the kernel serializes them, so a
//! reader and a writer can share the device without extra locking.

use super::baud::BaudConstant;
use super::error::PortError;
use super::traits::{ModemStatus, SerialDevice, Signal};
use crate::config::{PortConfig, StopBits};
use crate::timeout::{posix_timeouts, PosixTimeouts};
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::mem::MaybeUninit;
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::{AsRawFd, IntoRawFd, RawFd};

/// An open terminal device.
#[derive(Debug)]
pub struct PosixDevice {
    file: File,
    name: String,
}

impl PosixDevice {
    /// Open and configure `config.name` at the already-resolved `speed`.
    ///
    /// Any failure drops the partially configured `File`, which closes the
    /// descriptor before the error is returned.
    pub fn open(config: &PortConfig, speed: BaudConstant) -> Result<Self, PortError> {
        let name = config.name.as_str();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_NOCTTY | libc::O_NONBLOCK)
            .open(name)
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => PortError::invalid_device(name, "no such device"),
                _ => PortError::Io(e),
            })?;
        let fd = file.as_raw_fd();

        if unsafe { libc::isatty(fd) } != 1 {
            return Err(PortError::invalid_device(name, "not a tty"));
        }

        let mut termios = get_attributes(fd)?;
        let timeouts = posix_timeouts(config.timeout());
        make_raw(&mut termios, config.stop_bits, timeouts);
        set_speed(&mut termios, speed)?;
        set_attributes(fd, &termios)?;
        set_blocking(fd)?;

        tracing::debug!(
            port = name,
            vmin = timeouts.vmin,
            vtime = timeouts.vtime,
            "terminal configured"
        );

        Ok(Self {
            file,
            name: name.to_string(),
        })
    }
}

impl SerialDevice for PosixDevice {
    fn read_bytes(&self, buffer: &mut [u8]) -> Result<usize, PortError> {
        // End-of-file and VTIME expiry both surface as Ok(0).
        (&self.file).read(buffer).map_err(PortError::Io)
    }

    fn write_bytes(&self, data: &[u8]) -> Result<usize, PortError> {
        (&self.file).write(data).map_err(PortError::Io)
    }

    fn clear_buffers(&self) -> Result<(), PortError> {
        check(unsafe { libc::tcflush(self.file.as_raw_fd(), libc::TCIOFLUSH) })
    }

    fn set_signal(&self, signal: Signal, asserted: bool) -> Result<(), PortError> {
        let bits: libc::c_int = match signal {
            Signal::Dtr => libc::TIOCM_DTR,
            Signal::Rts => libc::TIOCM_RTS,
        };
        let request = if asserted {
            libc::TIOCMBIS
        } else {
            libc::TIOCMBIC
        };
        let fd = self.file.as_raw_fd();
        check(unsafe { libc::ioctl(fd, request, &bits as *const libc::c_int) })
    }

    fn modem_status(&self) -> Result<ModemStatus, PortError> {
        let fd = self.file.as_raw_fd();
        let mut bits: libc::c_int = 0;
        check(unsafe { libc::ioctl(fd, libc::TIOCMGET, &mut bits as *mut libc::c_int) })?;
        Ok(ModemStatus::from_bits(
            bits as u32,
            libc::TIOCM_CTS as u32,
            libc::TIOCM_DSR as u32,
            libc::TIOCM_RI as u32,
            libc::TIOCM_CD as u32,
        ))
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn close(self) -> Result<(), PortError> {
        let fd = self.file.into_raw_fd();
        check(unsafe { libc::close(fd) })
    }
}

impl AsRawFd for PosixDevice {
    fn as_raw_fd(&self) -> RawFd {
        self.file.as_raw_fd()
    }
}

fn check(ret: libc::c_int) -> Result<(), PortError> {
    if ret == -1 {
        Err(PortError::last_os_error())
    } else {
        Ok(())
    }
}

fn get_attributes(fd: RawFd) -> Result<libc::termios, PortError> {
    let mut termios = MaybeUninit::<libc::termios>::uninit();
    check(unsafe { libc::tcgetattr(fd, termios.as_mut_ptr()) })?;
    Ok(unsafe { termios.assume_init() })
}

fn set_attributes(fd: RawFd, termios: &libc::termios) -> Result<(), PortError> {
    check(unsafe { libc::tcsetattr(fd, libc::TCSANOW, termios) })
}

fn set_speed(termios: &mut libc::termios, speed: BaudConstant) -> Result<(), PortError> {
    check(unsafe { libc::cfsetispeed(termios, speed) })?;
    check(unsafe { libc::cfsetospeed(termios, speed) })
}

/// Clear `O_NONBLOCK` now that the line discipline is configured.
fn set_blocking(fd: RawFd) -> Result<(), PortError> {
    let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
    check(flags)?;
    check(unsafe { libc::fcntl(fd, libc::F_SETFL, flags & !libc::O_NONBLOCK) })
}

/// Raw 8-bit mode: no echo, no canonical processing, no signals, no
/// parity, no software or hardware flow control.
fn make_raw(termios: &mut libc::termios, stop_bits: StopBits, timeouts: PosixTimeouts) {
    termios.c_iflag &= !(libc::IGNBRK
        | libc::BRKINT
        | libc::PARMRK
        | libc::ISTRIP
        | libc::INLCR
        | libc::IGNCR
        | libc::ICRNL
        | libc::INPCK
        | libc::IXON
        | libc::IXOFF
        | libc::IXANY);
    termios.c_oflag &= !libc::OPOST;
    termios.c_lflag &= !(libc::ECHO
        | libc::ECHOE
        | libc::ECHONL
        | libc::ICANON
        | libc::ISIG
        | libc::IEXTEN);
    termios.c_cflag &= !(libc::CSIZE | libc::PARENB | libc::CRTSCTS | libc::CSTOPB);
    termios.c_cflag |= libc::CS8 | libc::CREAD | libc::CLOCAL;
    if stop_bits == StopBits::Two {
        termios.c_cflag |= libc::CSTOPB;
    }

    termios.c_cc[libc::VMIN] = timeouts.vmin as libc::cc_t;
    termios.c_cc[libc::VTIME] = timeouts.vtime as libc::cc_t;
}
