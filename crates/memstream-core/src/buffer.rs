//! Staging buffer for the buffered stream engine.
//!
//! Implements stdio buffering semantics over a single fixed-capacity
//! region shared by the read and write directions. Three modes:
//! fully-buffered, line-buffered, and unbuffered.
//!
//! Written bytes stay staged here until the engine publishes them to the
//! backend. A write that needs publishing leaves the staged bytes in place
//! until the engine reports success through [`StreamBuffer::complete_flush`]. The engine guarantees the region is never holding read-ahead
//! and staged writes at the same time.

/// Default buffer size (POSIX BUFSIZ).
pub const BUFSIZ: usize = 8192;

/// Buffering mode, matching POSIX `_IOFBF`, `_IOLBF`, `_IONBF`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BufMode {
    /// Publish when the buffer is full.
    #[default]
    Full,
    /// Publish on newline or when the buffer is full.
    Line,
    /// Publish every write immediately.
    None,
}

impl BufMode {
    /// Parse from string (case-insensitive). Unknown values mean `Full`.
    #[must_use]
    pub fn from_str_loose(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "line" | "lbf" | "iolbf" => Self::Line,
            "none" | "off" | "unbuffered" | "nbf" | "ionbf" => Self::None,
            _ => Self::Full,
        }
    }
}

/// Staging buffer state.
///
/// Invariants:
/// - `pos <= filled <= data.len()` while holding read-ahead
/// - `pos <= data.len()` while holding staged writes (`filled == 0`)
#[derive(Debug)]
pub struct StreamBuffer {
    data: Vec<u8>,
    pos: usize,
    filled: usize,
    mode: BufMode,
    /// Set once any I/O has gone through the buffer.
    io_started: bool,
}

impl StreamBuffer {
    #[must_use]
    pub fn new(mode: BufMode, capacity: usize) -> Self {
        Self {
            data: vec![0u8; effective_capacity(mode, capacity)],
            pos: 0,
            filled: 0,
            mode,
            io_started: false,
        }
    }

    #[must_use]
    pub fn mode(&self) -> BufMode {
        self.mode
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Change buffering mode and size.
    ///
    /// Returns `false` once I/O has started.
    pub fn set_mode(&mut self, mode: BufMode, size: usize) -> bool {
        if self.io_started {
            return false;
        }
        self.mode = mode;
        self.data = vec![0u8; effective_capacity(mode, size)];
        self.pos = 0;
        self.filled = 0;
        true
    }

    // -----------------------------------------------------------------------
    // Write side
    // -----------------------------------------------------------------------

    /// Stage a write. The returned result says which bytes must be
    /// published to the backend right now.
    ///
    /// When publishing is needed the buffer is left untouched; the caller
    /// finishes with [`complete_flush`](Self::complete_flush) once the
    /// backend accepted `flush_data`.
    pub fn write(&mut self, data: &[u8]) -> WriteResult {
        self.io_started = true;
        match self.mode {
            BufMode::None => self.flush_through(data, 0),
            BufMode::Full => self.write_full(data),
            BufMode::Line => self.write_line(data),
        }
    }

    /// Drop the published bytes and stage `tail`, the last
    /// `WriteResult::buffered` bytes of the write.
    pub fn complete_flush(&mut self, tail: &[u8]) {
        let take = tail.len().min(self.data.len());
        self.data[..take].copy_from_slice(&tail[..take]);
        self.pos = take;
    }

    /// Staged bytes not yet published.
    #[must_use]
    pub fn pending_write_data(&self) -> &[u8] {
        &self.data[..self.pos]
    }

    pub fn mark_flushed(&mut self) {
        self.pos = 0;
    }

    // -----------------------------------------------------------------------
    // Read side
    // -----------------------------------------------------------------------

    /// Take up to `count` bytes of read-ahead.
    pub fn read(&mut self, count: usize) -> &[u8] {
        self.io_started = true;
        let take = count.min(self.readable());
        let slice = &self.data[self.pos..self.pos + take];
        self.pos += take;
        slice
    }

    /// Bytes of read-ahead not yet consumed.
    #[must_use]
    pub fn readable(&self) -> usize {
        self.filled.saturating_sub(self.pos)
    }

    /// Refill the whole region through `source`, which returns how many
    /// bytes it produced.
    pub fn fill_with<F>(&mut self, source: F) -> usize
    where
        F: FnOnce(&mut [u8]) -> usize,
    {
        self.io_started = true;
        let n = source(&mut self.data).min(self.data.len());
        self.pos = 0;
        self.filled = n;
        n
    }

    /// Push a byte back into the read-ahead. Returns `false` when there is
    /// no room.
    pub fn unget(&mut self, byte: u8) -> bool {
        if self.pos > 0 {
            self.pos -= 1;
            self.data[self.pos] = byte;
            true
        } else if self.filled < self.data.len() {
            if self.filled > 0 {
                self.data.copy_within(0..self.filled, 1);
            }
            self.data[0] = byte;
            self.filled += 1;
            true
        } else {
            false
        }
    }

    /// Discard all read-ahead and staged bytes.
    pub fn reset(&mut self) {
        self.pos = 0;
        self.filled = 0;
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    fn write_full(&mut self, data: &[u8]) -> WriteResult {
        let remaining = self.data.len().saturating_sub(self.pos);
        if data.len() <= remaining {
            self.data[self.pos..self.pos + data.len()].copy_from_slice(data);
            self.pos += data.len();
            WriteResult {
                buffered: data.len(),
                flush_data: Vec::new(),
            }
        } else {
            self.flush_through(data, 0)
        }
    }

    fn write_line(&mut self, data: &[u8]) -> WriteResult {
        let Some(nl_pos) = data.iter().rposition(|&b| b == b'\n') else {
            return self.write_full(data);
        };

        // Publish through the last newline, stage the tail.
        let flush_end = nl_pos + 1;
        let remainder = &data[flush_end..];
        let take = if remainder.len() <= self.data.len() {
            remainder.len()
        } else {
            0
        };

        self.flush_through(data, take)
    }

    /// Staged bytes followed by all of `data` except its last `keep` bytes.
    fn flush_through(&self, data: &[u8], keep: usize) -> WriteResult {
        let mut flush = Vec::with_capacity(self.pos + data.len());
        flush.extend_from_slice(&self.data[..self.pos]);
        flush.extend_from_slice(&data[..data.len() - keep]);
        WriteResult {
            buffered: keep,
            flush_data: flush,
        }
    }
}

fn effective_capacity(mode: BufMode, capacity: usize) -> usize {
    if matches!(mode, BufMode::None) {
        0
    } else {
        capacity.max(1)
    }
}

/// Result of staging a write.
#[derive(Debug)]
pub struct WriteResult {
    /// How many trailing bytes of the caller's data stay staged.
    pub buffered: usize,
    /// Bytes that must be published now, in order.
    pub flush_data: Vec<u8>,
}

impl WriteResult {
    #[must_use]
    pub fn flush_needed(&self) -> bool {
        !self.flush_data.is_empty()
    }
}
