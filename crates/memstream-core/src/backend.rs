//! Backend capability driven by the buffered engine.
//!
//! A backend owns the per-stream state (the "cookie") and performs the raw,
//! unbuffered operations. The engine calls these inline in response to
//! application I/O; backends never block.

use std::io::SeekFrom;

use crate::error::{Result, StreamError};

pub trait SeekableBackend {
    /// Caller-owned storage the backend operates on.
    type Handle;

    /// The storage as last published, or `None` once released.
    fn handle(&self) -> Option<&Self::Handle>;

    /// Copy up to `dst.len()` bytes at the current offset into `dst`.
    ///
    /// Returns the number of bytes copied. A short count is the only
    /// end-of-data signal.
    fn read(&mut self, dst: &mut [u8]) -> usize;

    /// Write all of `src`, growing storage as needed.
    ///
    /// On failure the storage is left exactly as it was before the call.
    fn write(&mut self, src: &[u8]) -> Result<usize>;

    /// Move the offset. Positions outside the current content fail and
    /// leave the offset unchanged.
    fn seek(&mut self, pos: SeekFrom) -> Result<u64>;

    /// Current offset.
    fn position(&self) -> u64;

    /// Current content length (logical length for strings).
    fn content_len(&self) -> u64;

    /// Release the per-stream state, dropping the reference to the handle.
    /// The engine calls this exactly once.
    fn close(&mut self);
}

/// Resolve a seek request against `offset` and `len`, rejecting positions
/// outside `0..=len`.
pub(crate) fn resolve_seek(pos: SeekFrom, offset: u64, len: u64) -> Result<u64> {
    let candidate: i128 = match pos {
        SeekFrom::Start(n) => i128::from(n),
        SeekFrom::Current(delta) => i128::from(offset) + i128::from(delta),
        SeekFrom::End(delta) => i128::from(len) + i128::from(delta),
    };
    if candidate < 0 || candidate > i128::from(len) {
        return Err(StreamError::SeekOutOfRange {
            requested: candidate,
            limit: len,
        });
    }
    // Bounded by `len` above.
    Ok(candidate as u64)
}
