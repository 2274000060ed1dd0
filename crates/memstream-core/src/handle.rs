//! Caller-owned backing storage.
//!
//! A handle models a possibly-null growable buffer. The caller owns it for
//! its whole lifetime; an open stream holds an exclusive borrow and resizes
//! it as writes are published. Nothing in this crate frees a handle the
//! caller supplied, except a factory undoing a buffer it created itself
//! during a failed open.

use std::ffi::CStr;

use crate::error::{Result, StreamError};

/// Raw byte buffer backing a memory stream. No terminator is stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemBuffer {
    data: Option<Vec<u8>>,
}

impl MemBuffer {
    /// A null handle. Only creating modes can open a stream over it.
    #[must_use]
    pub const fn null() -> Self {
        Self { data: None }
    }

    /// A non-null, zero-length buffer.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            data: Some(Vec::new()),
        }
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        self.data.is_none()
    }

    /// Number of content bytes (0 for a null handle).
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.as_ref().map_or(0, Vec::len)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Published content, or `None` for a null handle.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        self.data.as_deref()
    }

    /// Take the storage out, leaving the handle null.
    pub fn take(&mut self) -> Option<Vec<u8>> {
        self.data.take()
    }

    #[must_use]
    pub fn into_vec(self) -> Option<Vec<u8>> {
        self.data
    }

    pub(crate) fn storage_mut(&mut self) -> Option<&mut Vec<u8>> {
        self.data.as_mut()
    }

    pub(crate) fn reset_empty(&mut self) {
        self.data = Some(Vec::new());
    }

    pub(crate) fn release(&mut self) {
        self.data = None;
    }
}

impl From<Vec<u8>> for MemBuffer {
    fn from(data: Vec<u8>) -> Self {
        Self { data: Some(data) }
    }
}

impl From<&[u8]> for MemBuffer {
    fn from(data: &[u8]) -> Self {
        Self::from(data.to_vec())
    }
}

impl From<&str> for MemBuffer {
    fn from(data: &str) -> Self {
        Self::from(data.as_bytes())
    }
}

/// NUL-terminated string backing a string stream.
///
/// Invariants for a non-null handle:
/// - storage length is logical length + 1
/// - the last byte is the terminator and no other byte is
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StrBuffer {
    data: Option<Vec<u8>>,
}

impl StrBuffer {
    #[must_use]
    pub const fn null() -> Self {
        Self { data: None }
    }

    /// A non-null empty string (terminator only).
    #[must_use]
    pub fn new() -> Self {
        Self {
            data: Some(vec![0]),
        }
    }

    /// Build from raw bytes. Content ends at the first NUL, if any.
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let len = scan_len(bytes);
        let mut data = Vec::with_capacity(len + 1);
        data.extend_from_slice(&bytes[..len]);
        data.push(0);
        Self { data: Some(data) }
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        self.data.is_none()
    }

    /// Logical length, excluding the terminator (0 for a null handle).
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.as_ref().map_or(0, |d| d.len() - 1)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Content without the terminator.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        self.data.as_deref().map(|d| &d[..d.len() - 1])
    }

    /// Content including the terminator (allocation view).
    #[must_use]
    pub fn as_bytes_with_nul(&self) -> Option<&[u8]> {
        self.data.as_deref()
    }

    #[must_use]
    pub fn as_c_str(&self) -> Option<&CStr> {
        self.as_bytes_with_nul()
            .and_then(|d| CStr::from_bytes_with_nul(d).ok())
    }

    /// Content as UTF-8, if it is valid UTF-8.
    #[must_use]
    pub fn to_str(&self) -> Option<&str> {
        self.as_bytes().and_then(|b| std::str::from_utf8(b).ok())
    }

    /// Take the content out (without terminator), leaving the handle null.
    pub fn take(&mut self) -> Option<Vec<u8>> {
        self.data.take().map(|mut d| {
            d.pop();
            d
        })
    }

    pub(crate) fn storage_mut(&mut self) -> Option<&mut Vec<u8>> {
        self.data.as_mut()
    }

    pub(crate) fn reset_empty(&mut self) {
        self.data = Some(vec![0]);
    }

    pub(crate) fn release(&mut self) {
        self.data = None;
    }
}

impl From<&[u8]> for StrBuffer {
    fn from(bytes: &[u8]) -> Self {
        Self::from_bytes(bytes)
    }
}

impl From<&str> for StrBuffer {
    fn from(s: &str) -> Self {
        Self::from_bytes(s.as_bytes())
    }
}

impl From<String> for StrBuffer {
    fn from(s: String) -> Self {
        let mut data = s.into_bytes();
        let len = scan_len(&data);
        data.truncate(len);
        data.push(0);
        Self { data: Some(data) }
    }
}

/// Distance to the first NUL, or the full length when there is none.
pub(crate) fn scan_len(bytes: &[u8]) -> usize {
    bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len())
}

/// Resize `storage` to `new_len`, failing without mutation when the
/// allocator or the configured ceiling refuses the growth.
pub(crate) fn resize_storage(storage: &mut Vec<u8>, new_len: usize, max_len: usize) -> Result<()> {
    if new_len > max_len {
        return Err(StreamError::AllocationFailure { requested: new_len });
    }
    if new_len > storage.len() {
        storage
            .try_reserve(new_len - storage.len())
            .map_err(|_| StreamError::AllocationFailure { requested: new_len })?;
    }
    storage.resize(new_len, 0);
    Ok(())
}
