//! Event boundary framing for slice buffers
//!
//! A slice travels as one contiguous byte buffer; each event inside it is
//! prefixed with its length as a little-endian u32. Decoding failures are
//! reported as errors, never panics: the buffer crossed a process boundary
//! and its contents are not trusted.

use crate::{EngineError, Result};

/// Append one length-prefixed event to a slice buffer.
pub fn write_frame(buf: &mut Vec<u8>, event: &[u8]) {
    buf.extend_from_slice(&(event.len() as u32).to_le_bytes());
    buf.extend_from_slice(event);
}

/// Decode the frame starting at `cursor`.
///
/// Returns the event payload and the cursor one past it, or `None` when the
/// cursor sits exactly at the end of the buffer.
pub fn read_frame(buf: &[u8], cursor: usize) -> Result<Option<(Vec<u8>, usize)>> {
    if cursor == buf.len() {
        return Ok(None);
    }
    if cursor + 4 > buf.len() {
        return Err(EngineError::MalformedFrame(cursor));
    }
    let len = u32::from_le_bytes([buf[cursor], buf[cursor + 1], buf[cursor + 2], buf[cursor + 3]])
        as usize;
    let start = cursor + 4;
    let end = start + len;
    if end > buf.len() {
        return Err(EngineError::MalformedFrame(cursor));
    }
    Ok(Some((buf[start..end].to_vec(), end)))
}
