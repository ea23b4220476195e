//! Windows backend: overlapped I/O with one completion event per direction.
//!
//! The handle is opened with `FILE_FLAG_OVERLAPPED`, so `ReadFile` and
//! `WriteFile` may report `ERROR_IO_PENDING` instead of a byte count. Each
//! direction owns an OVERLAPPED block and a manual-reset event behind its own
//! lock, held for the whole call: one read and one write can be in flight at
//! once, a second reader (or writer) waits for the first.

use super::baud::BaudConstant;
use super::error::PortError;
use super::traits::{ModemStatus, SerialDevice, Signal};
use super::win32::{kernel32, Kernel32};
use crate::config::{PortConfig, StopBits};
use crate::timeout::windows_timeouts;
use parking_lot::Mutex;
use std::ffi::OsStr;
use std::io;
use std::iter::once;
use std::mem;
use std::os::windows::ffi::OsStrExt;
use std::ptr;
use winapi::shared::minwindef::{BOOL, DWORD, FALSE, TRUE};
use winapi::shared::winerror::ERROR_IO_PENDING;
use winapi::um::errhandlingapi::GetLastError;
use winapi::um::fileapi::{CreateFileW, ReadFile, WriteFile, OPEN_EXISTING};
use winapi::um::handleapi::{CloseHandle, INVALID_HANDLE_VALUE};
use winapi::um::minwinbase::OVERLAPPED;
use winapi::um::winbase::{
    CLRDTR, CLRRTS, COMMTIMEOUTS, DCB, DTR_CONTROL_ENABLE, EV_RXCHAR, FILE_FLAG_OVERLAPPED,
    MS_CTS_ON, MS_DSR_ON, MS_RING_ON, MS_RLSD_ON, NOPARITY, ONESTOPBIT, PURGE_RXABORT,
    PURGE_RXCLEAR, PURGE_TXABORT, PURGE_TXCLEAR, RTS_CONTROL_ENABLE, SETDTR, SETRTS,
    TWOSTOPBITS,
};
use winapi::um::winnt::{FILE_ATTRIBUTE_NORMAL, GENERIC_READ, GENERIC_WRITE, HANDLE};

/// Driver queue sizes requested at open.
const QUEUE_SIZE: DWORD = 64;

/// A kernel handle closed on drop.
#[derive(Debug)]
struct OwnedHandle(HANDLE);

// SAFETY: kernel handles may be used and closed from any thread.
unsafe impl Send for OwnedHandle {}
unsafe impl Sync for OwnedHandle {}

impl OwnedHandle {
    fn raw(&self) -> HANDLE {
        self.0
    }

    /// Close now and report the result instead of ignoring it in `drop`.
    fn close(self) -> io::Result<()> {
        let raw = self.0;
        mem::forget(self);
        if unsafe { CloseHandle(raw) } == 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}

impl Drop for OwnedHandle {
    fn drop(&mut self) {
        unsafe { CloseHandle(self.0) };
    }
}

/// Per-direction overlapped state: the OVERLAPPED block and its event.
struct Completion {
    overlapped: Box<OVERLAPPED>,
    event: OwnedHandle,
}

// SAFETY: the OVERLAPPED block only holds the event handle and offsets; it
// is touched solely while the owning direction lock is held.
unsafe impl Send for Completion {}

impl Completion {
    fn new(k32: &Kernel32) -> Result<Self, PortError> {
        let raw = unsafe { (k32.create_event)(ptr::null_mut(), TRUE, FALSE, ptr::null()) };
        if raw.is_null() {
            return Err(PortError::last_os_error());
        }
        let event = OwnedHandle(raw);
        let mut overlapped: Box<OVERLAPPED> = Box::new(unsafe { mem::zeroed() });
        overlapped.hEvent = event.raw();
        Ok(Self { overlapped, event })
    }

    /// Reset the event and clear the block ahead of a new operation.
    fn prepare(&mut self, k32: &Kernel32) -> Result<*mut OVERLAPPED, PortError> {
        if unsafe { (k32.reset_event)(self.event.raw()) } == 0 {
            return Err(PortError::last_os_error());
        }
        *self.overlapped = unsafe { mem::zeroed() };
        self.overlapped.hEvent = self.event.raw();
        Ok(&mut *self.overlapped)
    }

    /// Second phase of a transfer: wait for the event if the operation was
    /// queued and fetch the byte count.
    fn finish(&mut self, k32: &Kernel32, handle: HANDLE, issued: BOOL) -> Result<usize, PortError> {
        if issued == 0 {
            let code = unsafe { GetLastError() };
            if code != ERROR_IO_PENDING {
                return Err(PortError::Io(io::Error::from_raw_os_error(code as i32)));
            }
        }

        let mut transferred: DWORD = 0;
        let ok = unsafe {
            (k32.get_overlapped_result)(handle, &mut *self.overlapped, &mut transferred, TRUE)
        };
        if ok == 0 {
            return Err(PortError::last_os_error());
        }
        Ok(transferred as usize)
    }
}

/// An open COM port.
pub struct OverlappedDevice {
    handle: OwnedHandle,
    name: String,
    reader: Mutex<Completion>,
    writer: Mutex<Completion>,
    k32: &'static Kernel32,
}

impl OverlappedDevice {
    /// Open and configure `config.name` at the already-resolved `baud`.
    ///
    /// Handles acquired before a failing step are owned values, so they are
    /// closed on every error path.
    pub fn open(config: &PortConfig, baud: BaudConstant) -> Result<Self, PortError> {
        let k32 = kernel32()?;
        let path = device_path(&config.name);
        let wide: Vec<u16> = OsStr::new(&path).encode_wide().chain(once(0)).collect();

        let raw = unsafe {
            CreateFileW(
                wide.as_ptr(),
                GENERIC_READ | GENERIC_WRITE,
                0,
                ptr::null_mut(),
                OPEN_EXISTING,
                FILE_ATTRIBUTE_NORMAL | FILE_FLAG_OVERLAPPED,
                ptr::null_mut(),
            )
        };
        if raw == INVALID_HANDLE_VALUE {
            let err = io::Error::last_os_error();
            return Err(match err.kind() {
                io::ErrorKind::NotFound => PortError::invalid_device(&config.name, "no such device"),
                _ => PortError::Io(err),
            });
        }
        let handle = OwnedHandle(raw);

        set_comm_state(k32, handle.raw(), baud, config.stop_bits)?;
        check(unsafe { (k32.setup_comm)(handle.raw(), QUEUE_SIZE, QUEUE_SIZE) })?;
        set_comm_timeouts(k32, handle.raw(), config)?;
        check(unsafe { (k32.set_comm_mask)(handle.raw(), EV_RXCHAR) })?;

        let reader = Completion::new(k32)?;
        let writer = Completion::new(k32)?;

        tracing::debug!(port = %path, "comm port configured");

        Ok(Self {
            handle,
            name: config.name.clone(),
            reader: Mutex::new(reader),
            writer: Mutex::new(writer),
            k32,
        })
    }
}

impl SerialDevice for OverlappedDevice {
    fn read_bytes(&self, buffer: &mut [u8]) -> Result<usize, PortError> {
        let mut completion = self.reader.lock();
        let overlapped = completion.prepare(self.k32).map_err(|e| phase("read.reset", e))?;

        let len = buffer.len().min(DWORD::MAX as usize) as DWORD;
        let issued = unsafe {
            ReadFile(
                self.handle.raw(),
                buffer.as_mut_ptr().cast(),
                len,
                ptr::null_mut(),
                overlapped,
            )
        };
        completion
            .finish(self.k32, self.handle.raw(), issued)
            .map_err(|e| phase("read", e))
    }

    fn write_bytes(&self, data: &[u8]) -> Result<usize, PortError> {
        let mut completion = self.writer.lock();
        let overlapped = completion.prepare(self.k32).map_err(|e| phase("write.reset", e))?;

        let len = data.len().min(DWORD::MAX as usize) as DWORD;
        let issued = unsafe {
            WriteFile(
                self.handle.raw(),
                data.as_ptr().cast(),
                len,
                ptr::null_mut(),
                overlapped,
            )
        };
        completion
            .finish(self.k32, self.handle.raw(), issued)
            .map_err(|e| phase("write", e))
    }

    fn clear_buffers(&self) -> Result<(), PortError> {
        let flags = PURGE_TXABORT | PURGE_RXABORT | PURGE_TXCLEAR | PURGE_RXCLEAR;
        check(unsafe { (self.k32.purge_comm)(self.handle.raw(), flags) })
    }

    fn set_signal(&self, signal: Signal, asserted: bool) -> Result<(), PortError> {
        let function = match (signal, asserted) {
            (Signal::Dtr, true) => SETDTR,
            (Signal::Dtr, false) => CLRDTR,
            (Signal::Rts, true) => SETRTS,
            (Signal::Rts, false) => CLRRTS,
        };
        check(unsafe { (self.k32.escape_comm_function)(self.handle.raw(), function) })
    }

    fn modem_status(&self) -> Result<ModemStatus, PortError> {
        let mut bits: DWORD = 0;
        check(unsafe { (self.k32.get_comm_modem_status)(self.handle.raw(), &mut bits) })?;
        Ok(ModemStatus::from_bits(
            bits,
            MS_CTS_ON,
            MS_DSR_ON,
            MS_RING_ON,
            MS_RLSD_ON,
        ))
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn close(self) -> Result<(), PortError> {
        let Self {
            handle,
            reader,
            writer,
            ..
        } = self;
        drop(reader);
        drop(writer);
        handle.close().map_err(PortError::Io)
    }
}

impl std::fmt::Debug for OverlappedDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OverlappedDevice")
            .field("name", &self.name)
            .field("handle", &self.handle)
            .finish()
    }
}

/// Bare names such as `COM12` need the device namespace prefix.
fn device_path(name: &str) -> String {
    if name.starts_with('\\') {
        name.to_string()
    } else {
        format!(r"\\.\{}", name)
    }
}

fn check(ret: BOOL) -> Result<(), PortError> {
    if ret == 0 {
        Err(PortError::last_os_error())
    } else {
        Ok(())
    }
}

fn phase(step: &'static str, err: PortError) -> PortError {
    tracing::debug!(step, "overlapped transfer failed: {}", err);
    err
}

fn set_comm_state(
    k32: &Kernel32,
    handle: HANDLE,
    baud: BaudConstant,
    stop_bits: StopBits,
) -> Result<(), PortError> {
    let mut dcb: DCB = unsafe { mem::zeroed() };
    dcb.DCBlength = mem::size_of::<DCB>() as DWORD;
    check(unsafe { (k32.get_comm_state)(handle, &mut dcb) })?;

    dcb.BaudRate = baud;
    dcb.ByteSize = 8;
    dcb.Parity = NOPARITY;
    dcb.StopBits = match stop_bits {
        StopBits::One => ONESTOPBIT,
        StopBits::Two => TWOSTOPBITS,
    };
    dcb.set_fBinary(TRUE as DWORD);
    dcb.set_fParity(0);
    dcb.set_fOutxCtsFlow(0);
    dcb.set_fOutxDsrFlow(0);
    dcb.set_fDtrControl(DTR_CONTROL_ENABLE);
    dcb.set_fDsrSensitivity(0);
    dcb.set_fOutX(0);
    dcb.set_fInX(0);
    dcb.set_fRtsControl(RTS_CONTROL_ENABLE);
    dcb.set_fAbortOnError(0);

    check(unsafe { (k32.set_comm_state)(handle, &mut dcb) })
}

fn set_comm_timeouts(k32: &Kernel32, handle: HANDLE, config: &PortConfig) -> Result<(), PortError> {
    let read = windows_timeouts(config.timeout());
    let mut timeouts = COMMTIMEOUTS {
        ReadIntervalTimeout: read.read_interval,
        ReadTotalTimeoutMultiplier: read.read_total_multiplier,
        ReadTotalTimeoutConstant: read.read_total_constant,
        WriteTotalTimeoutMultiplier: 0,
        WriteTotalTimeoutConstant: 0,
    };
    check(unsafe { (k32.set_comm_timeouts)(handle, &mut timeouts) })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_device_path_prefix() {
        assert_eq!(device_path("COM3"), r"\\.\COM3");
        assert_eq!(device_path("COM12"), r"\\.\COM12");
        assert_eq!(device_path(r"\\.\COM3"), r"\\.\COM3");
    }

    /// Both ends of an overlapped byte-mode pipe, each wrapped the way
    /// `open` wraps a comm handle.
    fn pipe_pair() -> (OverlappedDevice, OverlappedDevice) {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use winapi::um::namedpipeapi::CreateNamedPipeW;
        use winapi::um::winbase::{
            PIPE_ACCESS_DUPLEX, PIPE_READMODE_BYTE, PIPE_TYPE_BYTE, PIPE_WAIT,
        };

        static NEXT: AtomicUsize = AtomicUsize::new(0);
        let path = format!(
            r"\\.\pipe\serial-link-test-{}-{}",
            std::process::id(),
            NEXT.fetch_add(1, Ordering::Relaxed)
        );
        let wide: Vec<u16> = OsStr::new(&path).encode_wide().chain(once(0)).collect();

        let server = unsafe {
            CreateNamedPipeW(
                wide.as_ptr(),
                PIPE_ACCESS_DUPLEX | FILE_FLAG_OVERLAPPED,
                PIPE_TYPE_BYTE | PIPE_READMODE_BYTE | PIPE_WAIT,
                1,
                4096,
                4096,
                0,
                ptr::null_mut(),
            )
        };
        assert_ne!(server, INVALID_HANDLE_VALUE, "CreateNamedPipeW failed");
        let server = OwnedHandle(server);

        let client = unsafe {
            CreateFileW(
                wide.as_ptr(),
                GENERIC_READ | GENERIC_WRITE,
                0,
                ptr::null_mut(),
                OPEN_EXISTING,
                FILE_ATTRIBUTE_NORMAL | FILE_FLAG_OVERLAPPED,
                ptr::null_mut(),
            )
        };
        assert_ne!(client, INVALID_HANDLE_VALUE, "CreateFileW on pipe failed");
        let client = OwnedHandle(client);

        let k32 = kernel32().unwrap();
        let wrap = |handle: OwnedHandle, name: &str| OverlappedDevice {
            handle,
            name: name.to_string(),
            reader: Mutex::new(Completion::new(k32).unwrap()),
            writer: Mutex::new(Completion::new(k32).unwrap()),
            k32,
        };
        (wrap(server, "pipe-server"), wrap(client, "pipe-client"))
    }

    fn read_exact(device: &OverlappedDevice, want: usize) -> Vec<u8> {
        let mut received = Vec::new();
        let mut buffer = [0u8; 64];
        while received.len() < want {
            let n = device.read_bytes(&mut buffer).unwrap();
            received.extend_from_slice(&buffer[..n]);
        }
        received
    }

    #[test]
    fn test_pending_read_does_not_block_write() {
        let (server, client) = pipe_pair();

        thread::scope(|s| {
            // Queued before any data exists, so it stays pending on the pipe.
            let reader = s.spawn(|| read_exact(&client, 4));
            thread::sleep(Duration::from_millis(50));

            let writer = s.spawn(|| client.write_bytes(b"ping").unwrap());
            assert_eq!(writer.join().unwrap(), 4);
            assert_eq!(read_exact(&server, 4), b"ping");

            assert_eq!(server.write_bytes(b"pong").unwrap(), 4);
            assert_eq!(reader.join().unwrap(), b"pong");
        });
    }

    #[test]
    fn test_second_reader_waits_for_first() {
        let (server, client) = pipe_pair();

        thread::scope(|s| {
            let first = s.spawn(|| read_exact(&client, 3));
            thread::sleep(Duration::from_millis(50));

            // The pending read holds the reader lock; the writer lock is free.
            assert!(client.reader.try_lock().is_none());
            assert!(client.writer.try_lock().is_some());

            let second = s.spawn(|| read_exact(&client, 3));
            thread::sleep(Duration::from_millis(50));
            assert!(!second.is_finished());

            server.write_bytes(b"one").unwrap();
            assert_eq!(first.join().unwrap(), b"one");

            server.write_bytes(b"two").unwrap();
            assert_eq!(second.join().unwrap(), b"two");
        });
    }

    #[test]
    fn test_open_missing_port() {
        let config = PortConfig::new("COM250", 9600);
        let err = OverlappedDevice::open(&config, 9600).unwrap_err();
        assert!(matches!(err, PortError::InvalidDevice { .. } | PortError::Io(_)));
    }
}
