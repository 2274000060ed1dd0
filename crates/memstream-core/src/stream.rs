//! Buffered stream engine.
//!
//! `BufferedStream` is the safe Rust model of a stdio `FILE` bound to an
//! in-process backend. It owns the staging buffer, the EOF/error
//! indicators, and a one-byte push-back slot, and it drives a
//! [`SeekableBackend`] for the raw operations.
//!
//! Written bytes are staged and become visible in the caller's handle only
//! when published: on `fflush`, `fseek`, a full buffer, a switch to reading,
//! or close. `get_ref` always shows the published state.

use std::io::{self, SeekFrom};

use crate::backend::SeekableBackend;
use crate::buffer::{BufMode, StreamBuffer};
use crate::config::StreamConfig;
use crate::error::{Result, StreamError};
use crate::mode::OpenFlags;

/// EOF and error indicators.
#[derive(Debug, Clone, Copy, Default)]
struct StreamFlags {
    eof: bool,
    error: bool,
}

/// What the staging buffer currently holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Idle,
    /// Read-ahead: the backend offset is past the logical position.
    Reading,
    /// Staged writes not yet published.
    Writing,
}

/// A buffered stream bound to a [`SeekableBackend`].
///
/// Dropping the stream publishes staged writes but ignores a failed
/// publish; call [`fclose`](Self::fclose) to observe that error.
#[derive(Debug)]
pub struct BufferedStream<B: SeekableBackend> {
    /// `None` once the backend has been released.
    backend: Option<B>,
    buffer: StreamBuffer,
    open_flags: OpenFlags,
    flags: StreamFlags,
    direction: Direction,
    ungetc_byte: Option<u8>,
}

impl<B: SeekableBackend> BufferedStream<B> {
    /// Bind a backend to a new engine instance.
    ///
    /// The backend is handed back alongside the error when the binding is
    /// rejected, so the caller can unwind whatever it set up.
    pub fn bind(
        backend: B,
        open_flags: OpenFlags,
        config: &StreamConfig,
    ) -> std::result::Result<Self, (StreamError, B)> {
        if !open_flags.has_access() {
            return Err((
                StreamError::BindingFailure {
                    reason: "mode permits neither reading nor writing",
                },
                backend,
            ));
        }
        if backend.handle().is_none() {
            return Err((
                StreamError::BindingFailure {
                    reason: "backend has no storage",
                },
                backend,
            ));
        }
        Ok(Self {
            backend: Some(backend),
            buffer: StreamBuffer::new(config.buf_mode, config.buf_size),
            open_flags,
            flags: StreamFlags::default(),
            direction: Direction::Idle,
            ungetc_byte: None,
        })
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    #[must_use]
    pub fn open_flags(&self) -> OpenFlags {
        self.open_flags
    }

    #[must_use]
    pub fn feof(&self) -> bool {
        self.flags.eof
    }

    #[must_use]
    pub fn ferror(&self) -> bool {
        self.flags.error
    }

    /// Clear EOF and error indicators.
    pub fn clearerr(&mut self) {
        self.flags.eof = false;
        self.flags.error = false;
    }

    #[must_use]
    pub fn buf_mode(&self) -> BufMode {
        self.buffer.mode()
    }

    /// The backing storage as last published. Staged bytes are not
    /// included until the next flush.
    #[must_use]
    pub fn get_ref(&self) -> Option<&B::Handle> {
        self.backend.as_ref().and_then(SeekableBackend::handle)
    }

    #[must_use]
    pub fn backend(&self) -> Option<&B> {
        self.backend.as_ref()
    }

    /// Change buffering (POSIX setvbuf). Only allowed before any I/O.
    pub fn setvbuf(&mut self, mode: BufMode, size: usize) -> bool {
        self.buffer.set_mode(mode, size)
    }

    // -----------------------------------------------------------------------
    // Reading
    // -----------------------------------------------------------------------

    /// Read up to `dst.len()` bytes. A short count means end of content and
    /// sets the EOF indicator.
    pub fn fread(&mut self, dst: &mut [u8]) -> Result<usize> {
        if !self.open_flags.readable {
            self.flags.error = true;
            return Err(StreamError::NotReadable);
        }
        if dst.is_empty() {
            return Ok(0);
        }
        if self.direction == Direction::Writing {
            self.publish()?;
        }
        self.direction = Direction::Reading;

        let mut total = 0usize;
        if let Some(byte) = self.ungetc_byte.take() {
            dst[0] = byte;
            total = 1;
        }

        while total < dst.len() {
            let chunk = self.buffer.read(dst.len() - total);
            if !chunk.is_empty() {
                dst[total..total + chunk.len()].copy_from_slice(chunk);
                total += chunk.len();
                continue;
            }

            let backend = self.backend.as_mut().ok_or(StreamError::Closed)?;
            let remaining = dst.len() - total;
            let direct = self.buffer.capacity() == 0 || remaining >= self.buffer.capacity();
            let n = if direct {
                backend.read(&mut dst[total..])
            } else {
                self.buffer.fill_with(|region| backend.read(region))
            };
            if n == 0 {
                self.flags.eof = true;
                break;
            }
            if direct {
                total += n;
            }
        }
        Ok(total)
    }

    /// Read one byte; `None` at end of content.
    pub fn fgetc(&mut self) -> Result<Option<u8>> {
        let mut byte = [0u8; 1];
        let n = self.fread(&mut byte)?;
        Ok((n == 1).then_some(byte[0]))
    }

    /// Push a byte back so the next read returns it. Returns `false` when
    /// no push-back room is left.
    pub fn ungetc(&mut self, byte: u8) -> bool {
        if !self.open_flags.readable || self.ungetc_byte.is_some() {
            return false;
        }
        if self.direction == Direction::Writing && self.publish().is_err() {
            return false;
        }
        self.direction = Direction::Reading;
        if !self.buffer.unget(byte) {
            self.ungetc_byte = Some(byte);
        }
        self.flags.eof = false;
        true
    }

    // -----------------------------------------------------------------------
    // Writing
    // -----------------------------------------------------------------------

    /// Stage `src` for writing, publishing to the backend when the buffer
    /// mode requires it. Returns the number of bytes accepted.
    pub fn fwrite(&mut self, src: &[u8]) -> Result<usize> {
        if !self.open_flags.writable {
            self.flags.error = true;
            return Err(StreamError::NotWritable);
        }
        if src.is_empty() {
            return Ok(0);
        }
        if self.direction == Direction::Reading {
            self.discard_read_ahead()?;
        }
        self.direction = Direction::Writing;

        let staged = self.buffer.write(src);
        if staged.flush_needed() {
            let backend = self.backend.as_mut().ok_or(StreamError::Closed)?;
            // On failure the earlier staged bytes stay pending.
            if let Err(err) = backend.write(&staged.flush_data) {
                self.flags.error = true;
                return Err(err);
            }
            self.buffer.complete_flush(&src[src.len() - staged.buffered..]);
        }
        Ok(src.len())
    }

    pub fn fputc(&mut self, byte: u8) -> Result<()> {
        self.fwrite(&[byte]).map(|_| ())
    }

    /// Publish staged writes and drop read-ahead.
    pub fn fflush(&mut self) -> Result<()> {
        match self.direction {
            Direction::Writing => self.publish(),
            Direction::Reading => self.discard_read_ahead(),
            Direction::Idle => Ok(()),
        }
    }

    // -----------------------------------------------------------------------
    // Seeking
    // -----------------------------------------------------------------------

    /// Reposition the stream. `SeekFrom::Current` is relative to the
    /// logical position, not the backend's read-ahead position.
    pub fn fseek(&mut self, pos: SeekFrom) -> Result<u64> {
        self.fflush()?;
        let backend = self.backend.as_mut().ok_or(StreamError::Closed)?;
        let new_offset = backend.seek(pos)?;
        self.flags.eof = false;
        Ok(new_offset)
    }

    /// Logical position as seen by the application.
    pub fn ftell(&self) -> Result<u64> {
        let backend = self.backend.as_ref().ok_or(StreamError::Closed)?;
        let pos = backend.position();
        Ok(match self.direction {
            Direction::Reading => pos.saturating_sub(self.unread() as u64),
            // Append writes land at the end; the cursor does not move.
            Direction::Writing if !self.open_flags.append => {
                pos + self.buffer.pending_write_data().len() as u64
            }
            _ => pos,
        })
    }

    /// Seek to the start and clear both indicators.
    pub fn rewind(&mut self) -> Result<()> {
        self.fseek(SeekFrom::Start(0))?;
        self.clearerr();
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Close
    // -----------------------------------------------------------------------

    /// Publish staged writes and release the backend. The backend is
    /// released even when the final publish fails.
    pub fn fclose(mut self) -> Result<()> {
        let result = if self.direction == Direction::Writing {
            self.publish()
        } else {
            Ok(())
        };
        self.release();
        result
    }

    /// Detach the backend without publishing or closing it. Used by the
    /// factories to unwind a failed open.
    pub(crate) fn into_backend(mut self) -> Option<B> {
        self.backend.take()
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    fn unread(&self) -> usize {
        self.buffer.readable() + usize::from(self.ungetc_byte.is_some())
    }

    fn publish(&mut self) -> Result<()> {
        let pending = self.buffer.pending_write_data();
        if !pending.is_empty() {
            let backend = self.backend.as_mut().ok_or(StreamError::Closed)?;
            if let Err(err) = backend.write(pending) {
                self.flags.error = true;
                return Err(err);
            }
            self.buffer.mark_flushed();
        }
        self.direction = Direction::Idle;
        Ok(())
    }

    fn discard_read_ahead(&mut self) -> Result<()> {
        let logical = self.ftell()?;
        self.buffer.reset();
        self.ungetc_byte = None;
        self.direction = Direction::Idle;
        let backend = self.backend.as_mut().ok_or(StreamError::Closed)?;
        if backend.position() != logical {
            backend.seek(SeekFrom::Start(logical))?;
        }
        Ok(())
    }

    fn release(&mut self) {
        if let Some(mut backend) = self.backend.take() {
            backend.close();
        }
    }
}

impl<B: SeekableBackend> Drop for BufferedStream<B> {
    fn drop(&mut self) {
        if self.backend.is_some() && self.direction == Direction::Writing {
            let _ = self.publish();
        }
        self.release();
    }
}

impl<B: SeekableBackend> io::Read for BufferedStream<B> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(self.fread(buf)?)
    }
}

impl<B: SeekableBackend> io::Write for BufferedStream<B> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(self.fwrite(buf)?)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(self.fflush()?)
    }
}

impl<B: SeekableBackend> io::Seek for BufferedStream<B> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        Ok(self.fseek(pos)?)
    }

    fn stream_position(&mut self) -> io::Result<u64> {
        Ok(self.ftell()?)
    }
}
