//! Memory-stream backend and factory.
//!
//! Streams over a raw byte buffer. Unlike POSIX `fmemopen`, no terminator is
//! stored, existing content is grown automatically, and the mode has no
//! binary-specific behavior. Unlike `open_memstream`, existing content is
//! used as-is and seeking past the end of content is never permitted.

use std::io::SeekFrom;

use crate::backend::{SeekableBackend, resolve_seek};
use crate::config::StreamConfig;
use crate::error::{Result, StreamError};
use crate::handle::{MemBuffer, resize_storage};
use crate::mode::parse_mode;
use crate::stream::BufferedStream;

/// Buffered stream over a [`MemBuffer`].
pub type MemStream<'a> = BufferedStream<MemCookie<'a>>;

/// Per-stream state for a memory stream.
///
/// Invariant: `offset <= buffer length`.
#[derive(Debug)]
pub struct MemCookie<'a> {
    buf: Option<&'a mut MemBuffer>,
    offset: usize,
    append: bool,
    max_len: usize,
}

impl<'a> MemCookie<'a> {
    #[must_use]
    pub fn new(buf: &'a mut MemBuffer, append: bool, max_len: usize) -> Self {
        Self {
            buf: Some(buf),
            offset: 0,
            append,
            max_len,
        }
    }

    #[must_use]
    pub fn is_append(&self) -> bool {
        self.append
    }

    /// Clear the state and hand back the handle reference.
    fn release(&mut self) -> Option<&'a mut MemBuffer> {
        self.offset = 0;
        self.append = false;
        self.buf.take()
    }
}

impl SeekableBackend for MemCookie<'_> {
    type Handle = MemBuffer;

    fn handle(&self) -> Option<&MemBuffer> {
        self.buf.as_deref()
    }

    fn read(&mut self, dst: &mut [u8]) -> usize {
        let Some(data) = self.buf.as_deref().and_then(MemBuffer::as_bytes) else {
            return 0;
        };
        let start = self.offset.min(data.len());
        let n = dst.len().min(data.len() - start);
        dst[..n].copy_from_slice(&data[start..start + n]);
        self.offset = start + n;
        n
    }

    fn write(&mut self, src: &[u8]) -> Result<usize> {
        let storage = self
            .buf
            .as_deref_mut()
            .and_then(MemBuffer::storage_mut)
            .ok_or(StreamError::Closed)?;

        let len = storage.len();
        let target = if self.append { len } else { self.offset };
        let end = target
            .checked_add(src.len())
            .ok_or(StreamError::AllocationFailure {
                requested: usize::MAX,
            })?;

        resize_storage(storage, len.max(end), self.max_len)?;
        storage[target..end].copy_from_slice(src);

        // Append writes leave the read cursor where it was.
        if !self.append {
            self.offset = end;
        }
        Ok(src.len())
    }

    fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        let new_offset = resolve_seek(pos, self.offset as u64, self.content_len())?;
        self.offset = new_offset as usize;
        Ok(new_offset)
    }

    fn position(&self) -> u64 {
        self.offset as u64
    }

    fn content_len(&self) -> u64 {
        self.buf.as_deref().map_or(0, MemBuffer::len) as u64
    }

    fn close(&mut self) {
        self.release();
    }
}

/// Open a memory stream using the process-wide config.
pub fn open<'a>(handle: &'a mut MemBuffer, mode: &str) -> Result<MemStream<'a>> {
    open_with(handle, mode, StreamConfig::global())
}

/// Open a memory stream over `handle`.
///
/// A null handle is replaced with an empty buffer when the mode creates
/// one. If the open fails after that, the handle is reset to null; a buffer
/// that existed before the call is never released.
pub fn open_with<'a>(
    handle: &'a mut MemBuffer,
    mode: &str,
    config: &StreamConfig,
) -> Result<MemStream<'a>> {
    let flags = parse_mode(mode);

    let mut created = false;
    if flags.create && handle.is_null() {
        handle.reset_empty();
        created = true;
    }
    if handle.is_null() {
        return Err(StreamError::MissingBuffer);
    }
    if flags.truncate && !created {
        handle.reset_empty();
    }

    let cookie = MemCookie::new(handle, flags.append, config.max_len);
    let mut stream = BufferedStream::bind(cookie, flags, config).map_err(|(err, cookie)| {
        abandon(cookie, created);
        err
    })?;

    if flags.position_at_end
        && let Err(err) = stream.fseek(SeekFrom::End(0))
    {
        if let Some(cookie) = stream.into_backend() {
            abandon(cookie, created);
        }
        return Err(err);
    }

    Ok(stream)
}

fn abandon(mut cookie: MemCookie<'_>, created: bool) {
    if let Some(handle) = cookie.release()
        && created
    {
        handle.release();
    }
}
