//! Mock serial device for testing.
//!
//! Provides a `MockDevice` that simulates a serial device without requiring
//! actual hardware. Supports a read queue, a write log, modem lines and
//! injected failures. Clones share state, so a test can keep a handle while
//! the port owns the device.

use super::error::PortError;
use super::traits::{ModemStatus, SerialDevice, Signal};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::io;
use std::sync::Arc;

/// Inner state of the mock device, protected by a mutex for interior mutability.
#[derive(Debug, Default)]
struct MockDeviceState {
    /// Queue of bytes to be returned by read operations.
    read_queue: VecDeque<u8>,
    /// Log of all bytes written to the device.
    write_log: Vec<Vec<u8>>,
    /// Accept at most this many bytes per write.
    write_limit: Option<usize>,
    /// Current level of each control line.
    signals: HashMap<Signal, bool>,
    /// Status returned by `modem_status`.
    modem_status: ModemStatus,
    /// How many times the buffers were cleared.
    clear_count: usize,
    fail_next_read: Option<io::ErrorKind>,
    fail_next_write: Option<io::ErrorKind>,
    fail_control: Option<io::ErrorKind>,
    closed: bool,
}

/// Mock serial device implementation for testing.
///
/// # Example
/// ```
/// use serial_link::port::{MockDevice, SerialDevice};
///
/// let device = MockDevice::new("MOCK0");
/// device.enqueue_read(b"OK\r\n");
///
/// let mut buffer = [0u8; 8];
/// let n = device.read_bytes(&mut buffer).unwrap();
/// assert_eq!(&buffer[..n], b"OK\r\n");
///
/// // An empty queue behaves like an expired read timeout.
/// assert_eq!(device.read_bytes(&mut buffer).unwrap(), 0);
/// ```
#[derive(Clone)]
pub struct MockDevice {
    /// The device name/identifier.
    name: String,
    /// The internal state, shared between clones.
    state: Arc<Mutex<MockDeviceState>>,
}

impl MockDevice {
    /// Create a new mock device with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Arc::new(Mutex::new(MockDeviceState::default())),
        }
    }

    /// Enqueue bytes to be returned by subsequent read operations.
    pub fn enqueue_read(&self, data: &[u8]) {
        self.state.lock().read_queue.extend(data);
    }

    /// Get a copy of all data written to the device, one entry per write.
    pub fn write_log(&self) -> Vec<Vec<u8>> {
        self.state.lock().write_log.clone()
    }

    /// Limit how many bytes a single write accepts, to simulate short writes.
    pub fn set_write_limit(&self, limit: Option<usize>) {
        self.state.lock().write_limit = limit;
    }

    /// Make the next read fail with `kind`.
    pub fn fail_next_read(&self, kind: io::ErrorKind) {
        self.state.lock().fail_next_read = Some(kind);
    }

    /// Make the next write fail with `kind`.
    pub fn fail_next_write(&self, kind: io::ErrorKind) {
        self.state.lock().fail_next_write = Some(kind);
    }

    /// Make line control and status calls fail with `kind` until cleared.
    pub fn fail_control(&self, kind: Option<io::ErrorKind>) {
        self.state.lock().fail_control = kind;
    }

    /// Set the status lines reported by `modem_status`.
    pub fn set_modem_status(&self, status: ModemStatus) {
        self.state.lock().modem_status = status;
    }

    /// Current level of a control line (deasserted if never set).
    pub fn signal(&self, signal: Signal) -> bool {
        self.state
            .lock()
            .signals
            .get(&signal)
            .copied()
            .unwrap_or(false)
    }

    /// How many times `clear_buffers` ran.
    pub fn clear_count(&self) -> usize {
        self.state.lock().clear_count
    }

    /// Get the number of bytes available to read.
    pub fn available_bytes(&self) -> usize {
        self.state.lock().read_queue.len()
    }

    /// Whether `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }
}

impl SerialDevice for MockDevice {
    fn read_bytes(&self, buffer: &mut [u8]) -> Result<usize, PortError> {
        let mut state = self.state.lock();
        if let Some(kind) = state.fail_next_read.take() {
            return Err(PortError::Io(io::Error::new(kind, "injected read failure")));
        }

        let n = buffer.len().min(state.read_queue.len());
        for (slot, byte) in buffer.iter_mut().zip(state.read_queue.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn write_bytes(&self, data: &[u8]) -> Result<usize, PortError> {
        let mut state = self.state.lock();
        if let Some(kind) = state.fail_next_write.take() {
            return Err(PortError::Io(io::Error::new(kind, "injected write failure")));
        }

        let n = state.write_limit.map_or(data.len(), |limit| limit.min(data.len()));
        state.write_log.push(data[..n].to_vec());
        Ok(n)
    }

    fn clear_buffers(&self) -> Result<(), PortError> {
        let mut state = self.state.lock();
        state.read_queue.clear();
        state.clear_count += 1;
        Ok(())
    }

    fn set_signal(&self, signal: Signal, asserted: bool) -> Result<(), PortError> {
        let mut state = self.state.lock();
        if let Some(kind) = state.fail_control {
            return Err(PortError::Io(io::Error::new(kind, "injected control failure")));
        }
        state.signals.insert(signal, asserted);
        Ok(())
    }

    fn modem_status(&self) -> Result<ModemStatus, PortError> {
        let state = self.state.lock();
        if let Some(kind) = state.fail_control {
            return Err(PortError::Io(io::Error::new(kind, "injected control failure")));
        }
        Ok(state.modem_status)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn close(self) -> Result<(), PortError> {
        self.state.lock().closed = true;
        Ok(())
    }
}

impl std::fmt::Debug for MockDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockDevice")
            .field("name", &self.name)
            .field("available_bytes", &self.available_bytes())
            .finish()
    }
}
