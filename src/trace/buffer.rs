//! Fixed-capacity staging buffer behind the trace logger.

use super::glyph::display_char;
use std::fmt::Write as _;

/// Bytes rendered per dump row.
pub const ROW_BYTES: usize = 16;

/// Width of the hex column: `"XX "` for each byte of a full row.
pub const HEX_COLUMN_WIDTH: usize = ROW_BYTES * 3;

/// Direction of the bytes staged in a [`TraceBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TraceTag {
    /// Bytes received from the device.
    Read,
    /// Bytes sent to the device.
    Write,
}

impl TraceTag {
    /// The leading character of a dump row.
    pub fn as_char(self) -> char {
        match self {
            Self::Read => '+',
            Self::Write => '-',
        }
    }
}

/// Byte buffer with a direction tag and a fill pointer.
///
/// The fill pointer never exceeds the capacity. Contents are only read back
/// by [`TraceBuffer::drain_rows`].
#[derive(Debug)]
pub struct TraceBuffer {
    bytes: Box<[u8]>,
    len: usize,
    tag: Option<TraceTag>,
}

impl TraceBuffer {
    /// Capacity is rounded up to a non-zero multiple of [`ROW_BYTES`], so
    /// every flush of a full buffer produces whole rows.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1).div_ceil(ROW_BYTES) * ROW_BYTES;
        Self {
            bytes: vec![0u8; capacity].into_boxed_slice(),
            len: 0,
            tag: None,
        }
    }

    pub fn capacity(&self) -> usize {
        self.bytes.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == self.bytes.len()
    }

    pub fn tag(&self) -> Option<TraceTag> {
        self.tag
    }

    /// Switch the direction tag. Callers drain the buffer first.
    pub fn set_tag(&mut self, tag: TraceTag) {
        debug_assert!(self.is_empty() || self.tag == Some(tag));
        self.tag = Some(tag);
    }

    /// Copy as much of `data` as fits and return how many bytes were taken.
    pub fn fill_from(&mut self, data: &[u8]) -> usize {
        let take = data.len().min(self.bytes.len() - self.len);
        self.bytes[self.len..self.len + take].copy_from_slice(&data[..take]);
        self.len += take;
        take
    }

    /// Render the staged bytes as dump rows and reset the fill pointer.
    ///
    /// The tag survives the drain, so a following append with the same tag
    /// continues without another flush.
    pub fn drain_rows(&mut self) -> Vec<String> {
        let tag = self.tag.map_or(' ', TraceTag::as_char);
        let rows = self.bytes[..self.len]
            .chunks(ROW_BYTES)
            .map(|chunk| format_row(tag, chunk))
            .collect();
        self.len = 0;
        rows
    }
}

/// Format one dump row: `<tag> <hex column> <ascii column>`.
pub fn format_row(tag: char, chunk: &[u8]) -> String {
    let mut hex = String::with_capacity(HEX_COLUMN_WIDTH);
    let mut ascii = String::with_capacity(chunk.len());
    for &byte in chunk {
        let _ = write!(hex, "{:02X} ", byte);
        ascii.push(display_char(byte));
    }
    format!("{} {:<width$} {}", tag, hex, ascii, width = HEX_COLUMN_WIDTH)
}
