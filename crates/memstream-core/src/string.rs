//! String-stream backend and factory.
//!
//! Streams over a NUL-terminated string. The mode is honored as for fopen:
//!
//! - `w`, `w+`: truncate the string to zero length, allocating it if null.
//! - `a`: allocate if null; positioned at the end; all output goes to the
//!   end of the string regardless of position.
//! - `a+`: as `a`, but reading starts at the beginning.
//!
//! The string is grown and shrunk so that its allocation is always the
//! logical length plus the terminator. Writing a NUL byte truncates the
//! string at that byte; anything after it in the same write is dropped.

use std::io::SeekFrom;

use crate::backend::{SeekableBackend, resolve_seek};
use crate::config::StreamConfig;
use crate::error::{Result, StreamError};
use crate::handle::{StrBuffer, resize_storage, scan_len};
use crate::mode::parse_mode;
use crate::stream::BufferedStream;

/// Buffered stream over a [`StrBuffer`].
pub type StrStream<'a> = BufferedStream<StrCookie<'a>>;

/// Per-stream state for a string stream.
///
/// Invariants:
/// - `length` is the handle's logical length
/// - `offset <= length`
#[derive(Debug)]
pub struct StrCookie<'a> {
    buf: Option<&'a mut StrBuffer>,
    length: usize,
    offset: usize,
    append: bool,
    max_len: usize,
}

impl<'a> StrCookie<'a> {
    #[must_use]
    pub fn new(buf: &'a mut StrBuffer, append: bool, max_len: usize) -> Self {
        let length = buf.len();
        Self {
            buf: Some(buf),
            length,
            offset: 0,
            append,
            max_len,
        }
    }

    /// Cached logical length.
    #[must_use]
    pub fn len(&self) -> usize {
        self.length
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    #[must_use]
    pub fn is_append(&self) -> bool {
        self.append
    }

    fn release(&mut self) -> Option<&'a mut StrBuffer> {
        self.length = 0;
        self.offset = 0;
        self.append = false;
        self.buf.take()
    }
}

impl SeekableBackend for StrCookie<'_> {
    type Handle = StrBuffer;

    fn handle(&self) -> Option<&StrBuffer> {
        self.buf.as_deref()
    }

    fn read(&mut self, dst: &mut [u8]) -> usize {
        let Some(content) = self.buf.as_deref().and_then(StrBuffer::as_bytes) else {
            return 0;
        };
        let start = self.offset.min(self.length);
        let end = start + dst.len().min(self.length - start);
        let span = &content[start..end];
        let n = scan_len(span);
        dst[..n].copy_from_slice(&span[..n]);
        self.offset = start + n;
        n
    }

    fn write(&mut self, src: &[u8]) -> Result<usize> {
        let storage = self
            .buf
            .as_deref_mut()
            .and_then(StrBuffer::storage_mut)
            .ok_or(StreamError::Closed)?;

        let target = if self.append { self.length } else { self.offset };
        let end = target
            .checked_add(src.len())
            .ok_or(StreamError::AllocationFailure {
                requested: usize::MAX,
            })?;

        let kept_len = scan_len(src);
        let new_length = if kept_len < src.len() {
            target + kept_len
        } else {
            self.length.max(end)
        };

        let alloc = new_length
            .checked_add(1)
            .ok_or(StreamError::AllocationFailure {
                requested: usize::MAX,
            })?;
        resize_storage(storage, alloc, self.max_len)?;
        storage[target..target + kept_len].copy_from_slice(&src[..kept_len]);
        storage[new_length] = 0;

        self.length = new_length;
        self.offset = if self.append {
            self.offset.min(new_length)
        } else {
            end.min(new_length)
        };
        Ok(src.len())
    }

    fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        let new_offset = resolve_seek(pos, self.offset as u64, self.length as u64)?;
        self.offset = new_offset as usize;
        Ok(new_offset)
    }

    fn position(&self) -> u64 {
        self.offset as u64
    }

    fn content_len(&self) -> u64 {
        self.length as u64
    }

    fn close(&mut self) {
        self.release();
    }
}

/// Open a string stream using the process-wide config.
pub fn open<'a>(handle: &'a mut StrBuffer, mode: &str) -> Result<StrStream<'a>> {
    open_with(handle, mode, StreamConfig::global())
}

/// Open a string stream over `handle`.
///
/// A null handle becomes an empty string when the mode creates one. If the
/// open fails after that, the handle is reset to null; a string that existed
/// before the call is never released.
pub fn open_with<'a>(
    handle: &'a mut StrBuffer,
    mode: &str,
    config: &StreamConfig,
) -> Result<StrStream<'a>> {
    let flags = parse_mode(mode);

    // An empty string still needs room for its terminator.
    let needs_storage = (flags.create && handle.is_null()) || flags.truncate;
    if needs_storage && config.max_len < 1 {
        return Err(StreamError::AllocationFailure { requested: 1 });
    }

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

    let cookie = StrCookie::new(handle, flags.append, config.max_len);
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

fn abandon(mut cookie: StrCookie<'_>, created: bool) {
    if let Some(handle) = cookie.release()
        && created
    {
        handle.release();
    }
}
