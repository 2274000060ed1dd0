//! # memstream-core
//!
//! Seekable, growable streams over caller-owned memory.
//!
//! Two backends plug into one buffered stream engine:
//!
//! - [`mem`]: a raw byte buffer ([`MemBuffer`]), no terminator stored.
//! - [`string`]: a NUL-terminated string ([`StrBuffer`]) whose allocation
//!   always tracks its logical length plus the terminator.
//!
//! Both grow automatically on write and reject seeks past the end of
//! content. Streams hold an exclusive borrow of their handle; the caller
//! sees the published content through [`BufferedStream::get_ref`] while the
//! stream is open, or directly once it is closed.
//!
//! No `unsafe` code is permitted in this crate.

#![forbid(unsafe_code)]

pub mod backend;
pub mod buffer;
pub mod config;
pub mod copy;
pub mod error;
pub mod handle;
pub mod mem;
pub mod mode;
pub mod stream;
pub mod string;

pub use backend::SeekableBackend;
pub use buffer::{BUFSIZ, BufMode};
pub use config::StreamConfig;
pub use copy::{CopyError, copy, copy_by};
pub use error::{Result, StreamError};
pub use handle::{MemBuffer, StrBuffer};
pub use mem::{MemCookie, MemStream};
pub use mode::{OpenFlags, parse_mode};
pub use stream::BufferedStream;
pub use string::{StrCookie, StrStream};
