//! Hex/ASCII trace log for port traffic.
//!
//! Transferred bytes are staged in a [`TraceBuffer`] per direction and
//! written out as fixed 16-byte rows:
//!
//! ```text
//! 2024/05/01 12:00:00 [Open] /dev/ttyUSB0
//! 2024/05/01 12:00:00 - 41 54 0D                                         AT.
//! 2024/05/01 12:00:00 + 4F 4B 0D 0A                                      OK..
//! ```
//!
//! Control messages flush any staged bytes first, so data and messages keep
//! their relative order in the file.

mod buffer;
mod glyph;

pub use buffer::{format_row, TraceBuffer, TraceTag, HEX_COLUMN_WIDTH, ROW_BYTES};
pub use glyph::display_char;

use crate::config::TraceSettings;
use chrono::Local;
use parking_lot::Mutex;
use std::fmt;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;

/// Timestamp prefix written ahead of every line when enabled.
const TIMESTAMP_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

/// Buffered trace writer shared by the read and write paths of a port.
///
/// One lock covers append-and-maybe-flush, so concurrent calls from a reader
/// and a writer never tear the buffer or its fill pointer.
pub struct TraceLogger {
    state: Mutex<TraceState>,
}

struct TraceState {
    sink: Box<dyn Write + Send>,
    buffer: TraceBuffer,
    timestamps: bool,
}

impl TraceLogger {
    /// Create a logger writing to an arbitrary sink.
    pub fn new<W>(sink: W, settings: &TraceSettings) -> Self
    where
        W: Write + Send + 'static,
    {
        Self {
            state: Mutex::new(TraceState {
                sink: Box::new(sink),
                buffer: TraceBuffer::new(settings.buffer_size),
                timestamps: settings.timestamps,
            }),
        }
    }

    /// Open (or create) a trace file in append mode.
    pub fn open_file(path: impl AsRef<Path>, settings: &TraceSettings) -> io::Result<Self> {
        let mut options = OpenOptions::new();
        options.create(true).append(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o644);
        }
        let file = options.open(path)?;
        Ok(Self::new(file, settings))
    }

    /// Stage transferred bytes under `tag`.
    ///
    /// A tag change flushes whatever the other direction had staged; a full
    /// buffer is flushed before more bytes are accepted, so one large
    /// transfer can produce several flushes.
    pub fn log_data(&self, tag: TraceTag, data: &[u8]) {
        let mut state = self.state.lock();
        if state.buffer.tag() != Some(tag) {
            state.flush_rows();
            state.buffer.set_tag(tag);
        }

        let mut rest = data;
        while !rest.is_empty() {
            if state.buffer.is_full() {
                state.flush_rows();
            }
            let taken = state.buffer.fill_from(rest);
            rest = &rest[taken..];
        }
    }

    /// Write a `[tag] message` line after flushing staged bytes.
    pub fn log_message(&self, tag: &str, args: fmt::Arguments<'_>) {
        let mut state = self.state.lock();
        state.flush_rows();

        let message = args.to_string();
        let line = match (tag.is_empty(), message.is_empty()) {
            (true, _) => message,
            (false, true) => format!("[{}]", tag),
            (false, false) => format!("[{}] {}", tag, message),
        };
        state.emit(&line);
    }

    /// Write out any staged bytes and flush the sink.
    pub fn flush(&self) {
        let mut state = self.state.lock();
        state.flush_rows();
        if let Err(e) = state.sink.flush() {
            tracing::debug!("trace sink flush failed: {}", e);
        }
    }

    /// Number of bytes currently staged.
    pub fn pending(&self) -> usize {
        self.state.lock().buffer.len()
    }
}

impl TraceState {
    fn flush_rows(&mut self) {
        if self.buffer.is_empty() {
            return;
        }
        for row in self.buffer.drain_rows() {
            self.emit(&row);
        }
    }

    fn emit(&mut self, line: &str) {
        let result = if self.timestamps {
            writeln!(self.sink, "{} {}", Local::now().format(TIMESTAMP_FORMAT), line)
        } else {
            writeln!(self.sink, "{}", line)
        };
        if let Err(e) = result {
            tracing::debug!("trace sink write failed: {}", e);
        }
    }
}

impl Drop for TraceLogger {
    fn drop(&mut self) {
        self.flush();
    }
}

impl fmt::Debug for TraceLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("TraceLogger")
            .field("capacity", &state.buffer.capacity())
            .field("pending", &state.buffer.len())
            .field("tag", &state.buffer.tag())
            .finish()
    }
}
