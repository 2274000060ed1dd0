//! Chunked stream-to-stream copy.

use thiserror::Error;

use crate::backend::SeekableBackend;
use crate::error::StreamError;
use crate::stream::BufferedStream;

/// Chunk size used by [`copy`].
pub const DEFAULT_CHUNK: usize = 4096;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CopyError {
    #[error("copy chunk size must be non-zero")]
    ZeroChunk,
    #[error("read failed after {copied} bytes: {source}")]
    Read { copied: u64, source: StreamError },
    #[error("write failed after {copied} bytes: {source}")]
    Write { copied: u64, source: StreamError },
}

impl CopyError {
    /// Bytes fully transferred before the failure.
    #[must_use]
    pub const fn copied(&self) -> u64 {
        match self {
            Self::ZeroChunk => 0,
            Self::Read { copied, .. } | Self::Write { copied, .. } => *copied,
        }
    }

    /// Platform error code of the underlying failure.
    #[must_use]
    pub const fn errno(&self) -> i32 {
        match self {
            Self::ZeroChunk => libc::EINVAL,
            Self::Read { source, .. } | Self::Write { source, .. } => source.errno(),
        }
    }
}

/// Copy from `from` to `to` in 4096-byte chunks until `from` reports EOF.
pub fn copy<A, B>(from: &mut BufferedStream<A>, to: &mut BufferedStream<B>) -> Result<u64, CopyError>
where
    A: SeekableBackend,
    B: SeekableBackend,
{
    copy_by(from, to, DEFAULT_CHUNK)
}

/// Copy from `from` to `to` through a `chunk`-byte scratch buffer.
///
/// Stops at the first error from either side; the error carries the number
/// of bytes written before it.
pub fn copy_by<A, B>(
    from: &mut BufferedStream<A>,
    to: &mut BufferedStream<B>,
    chunk: usize,
) -> Result<u64, CopyError>
where
    A: SeekableBackend,
    B: SeekableBackend,
{
    if chunk == 0 {
        return Err(CopyError::ZeroChunk);
    }

    let mut scratch = vec![0u8; chunk];
    let mut copied = 0u64;
    while !from.feof() {
        let n = from
            .fread(&mut scratch)
            .map_err(|source| CopyError::Read { copied, source })?;
        if n == 0 {
            break;
        }
        to.fwrite(&scratch[..n])
            .map_err(|source| CopyError::Write { copied, source })?;
        copied += n as u64;
    }
    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StreamConfig;
    use crate::handle::{MemBuffer, StrBuffer};
    use crate::{mem, string};

    #[test]
    fn copies_across_chunk_boundaries() {
        let payload: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8 + 1).collect();
        let mut src = MemBuffer::from(payload.clone());
        let mut dst = MemBuffer::null();
        {
            let mut from = mem::open_with(&mut src, "r", &StreamConfig::default()).unwrap();
            let mut to = mem::open_with(&mut dst, "w", &StreamConfig::default()).unwrap();
            assert_eq!(copy_by(&mut from, &mut to, 333).unwrap(), 10_000);
            assert!(from.feof());
            to.fclose().unwrap();
        }
        assert_eq!(dst.as_bytes(), Some(payload.as_slice()));
    }

    #[test]
    fn memory_into_string_stops_at_nul() {
        let mut src = MemBuffer::from(&b"abc\0def"[..]);
        let mut dst = StrBuffer::null();
        {
            let mut from = mem::open_with(&mut src, "r", &StreamConfig::default()).unwrap();
            let mut to = string::open_with(&mut dst, "w", &StreamConfig::default()).unwrap();
            assert_eq!(copy(&mut from, &mut to).unwrap(), 7);
        }
        assert_eq!(dst.to_str(), Some("abc"));
    }

    #[test]
    fn zero_chunk_rejected() {
        let mut a = MemBuffer::new();
        let mut b = MemBuffer::new();
        let mut from = mem::open_with(&mut a, "r", &StreamConfig::default()).unwrap();
        let mut to = mem::open_with(&mut b, "w", &StreamConfig::default()).unwrap();
        let err = copy_by(&mut from, &mut to, 0).unwrap_err();
        assert_eq!(err, CopyError::ZeroChunk);
        assert_eq!(err.errno(), libc::EINVAL);
    }

    #[test]
    fn write_side_failure_reports_progress() {
        let mut src = MemBuffer::from("0123456789");
        let mut dst = MemBuffer::new();
        let cfg = StreamConfig::unbuffered().with_max_len(4);
        let mut from = mem::open_with(&mut src, "r", &StreamConfig::default()).unwrap();
        let mut to = mem::open_with(&mut dst, "w", &cfg).unwrap();
        let err = copy_by(&mut from, &mut to, 3).unwrap_err();
        assert_eq!(err.copied(), 3);
        assert!(matches!(
            err,
            CopyError::Write {
                source: StreamError::AllocationFailure { requested: 6 },
                ..
            }
        ));
    }

    #[test]
    fn read_side_failure_is_reported() {
        let mut src = MemBuffer::from("x");
        let mut dst = MemBuffer::new();
        let mut from = mem::open_with(&mut src, "a", &StreamConfig::default()).unwrap();
        let mut to = mem::open_with(&mut dst, "w", &StreamConfig::default()).unwrap();
        let err = copy(&mut from, &mut to).unwrap_err();
        assert_eq!(
            err,
            CopyError::Read {
                copied: 0,
                source: StreamError::NotReadable
            }
        );
    }
}
