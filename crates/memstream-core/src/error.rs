//! Stream error taxonomy.
//!
//! Every failure is reported synchronously by the operation that detects it.
//! Each variant maps to a platform errno so callers that want a raised-fault
//! convention can convert into `std::io::Error` with `?`.

use std::io;

use thiserror::Error;

/// Errors surfaced by the backends, the buffered engine, and the factories.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StreamError {
    /// Storage could not be grown to `requested` bytes.
    #[error("allocation of {requested} bytes failed")]
    AllocationFailure { requested: usize },
    /// The buffer handle was null and the open mode does not create one.
    #[error("buffer handle is null and the open mode does not create one")]
    MissingBuffer,
    /// A seek targeted a position outside `0..=limit`.
    #[error("seek to {requested} is outside the content bounds 0..={limit}")]
    SeekOutOfRange { requested: i128, limit: u64 },
    /// The engine refused to bind the backend.
    #[error("stream binding rejected: {reason}")]
    BindingFailure { reason: &'static str },
    /// Read attempted on a stream opened without read permission.
    #[error("stream is not open for reading")]
    NotReadable,
    /// Write attempted on a stream opened without write permission.
    #[error("stream is not open for writing")]
    NotWritable,
    /// The backend has already been released.
    #[error("stream is closed")]
    Closed,
}

impl StreamError {
    /// Platform errno equivalent of this error.
    #[must_use]
    pub const fn errno(&self) -> i32 {
        match self {
            Self::AllocationFailure { .. } => libc::ENOMEM,
            Self::MissingBuffer => libc::ENOENT,
            Self::SeekOutOfRange { .. } | Self::BindingFailure { .. } => libc::EINVAL,
            Self::NotReadable | Self::NotWritable | Self::Closed => libc::EBADF,
        }
    }

    fn kind(&self) -> io::ErrorKind {
        match self {
            Self::AllocationFailure { .. } => io::ErrorKind::OutOfMemory,
            Self::MissingBuffer => io::ErrorKind::NotFound,
            Self::SeekOutOfRange { .. } | Self::BindingFailure { .. } => {
                io::ErrorKind::InvalidInput
            }
            Self::NotReadable | Self::NotWritable | Self::Closed => io::ErrorKind::Other,
        }
    }
}

impl From<StreamError> for io::Error {
    fn from(err: StreamError) -> Self {
        io::Error::new(err.kind(), err)
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T, E = StreamError> = std::result::Result<T, E>;
