//! Scenario fixture loading.
//!
//! A fixture set is a JSON document listing scenarios. Each scenario opens
//! one stream over an initial buffer, applies a sequence of operations with
//! per-step expectations, and checks the buffer the caller is left with.
//! Byte payloads are JSON strings; `"\u0000"` writes a terminator.

use std::path::Path;

use memstream_core::{BufMode, StreamConfig};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::structured_log::BackendKind;

#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("failed to read fixture {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid fixture JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Seek origin, as in `fseek`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Whence {
    Set,
    Cur,
    End,
}

/// One stream operation with its expectations.
///
/// `expect_errno` names the error an operation must fail with (`"ENOMEM"`,
/// `"EINVAL"`, ...). When absent the operation must succeed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Op {
    Write {
        data: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        expect_errno: Option<String>,
    },
    Read {
        len: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        expect: Option<String>,
    },
    Seek {
        whence: Whence,
        offset: i64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        expect_errno: Option<String>,
    },
    Tell {
        expect: u64,
    },
    Flush {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        expect_errno: Option<String>,
    },
    Putc {
        byte: u8,
    },
    Getc {
        /// `None` expects end of content.
        expect: Option<u8>,
    },
    Ungetc {
        byte: u8,
    },
    Rewind,
    /// Check the published buffer while the stream is still open.
    Verify {
        expect: ExpectedState,
    },
    Close {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        expect_errno: Option<String>,
    },
}

impl Op {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Write { .. } => "write",
            Self::Read { .. } => "read",
            Self::Seek { .. } => "seek",
            Self::Tell { .. } => "tell",
            Self::Flush { .. } => "flush",
            Self::Putc { .. } => "putc",
            Self::Getc { .. } => "getc",
            Self::Ungetc { .. } => "ungetc",
            Self::Rewind => "rewind",
            Self::Verify { .. } => "verify",
            Self::Close { .. } => "close",
        }
    }
}

/// Expected buffer state. Absent fields are not checked.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpectedState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub len: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub null: Option<bool>,
}

/// Engine settings for a scenario; absent fields use the defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScenarioConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buffering: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buf_size: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_len: Option<usize>,
}

impl ScenarioConfig {
    #[must_use]
    pub fn to_stream_config(&self) -> StreamConfig {
        let defaults = StreamConfig::default();
        let mode = self
            .buffering
            .as_deref()
            .map_or(defaults.buf_mode, BufMode::from_str_loose);
        StreamConfig {
            buf_mode: mode,
            buf_size: self.buf_size.unwrap_or(defaults.buf_size),
            max_len: self.max_len.unwrap_or(defaults.max_len),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub backend: BackendKind,
    /// Initial buffer content; `None` starts from a null handle.
    #[serde(default)]
    pub initial: Option<String>,
    pub mode: String,
    #[serde(default)]
    pub config: ScenarioConfig,
    /// When set, the open itself must fail with this errno name and no
    /// operations run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open_errno: Option<String>,
    #[serde(default)]
    pub ops: Vec<Op>,
    /// Checked after the stream is closed or dropped.
    #[serde(default)]
    pub expected: ExpectedState,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixtureSet {
    pub version: String,
    pub family: String,
    pub scenarios: Vec<Scenario>,
}

impl FixtureSet {
    pub fn from_json(json: &str) -> Result<Self, FixtureError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_file(path: &Path) -> Result<Self, FixtureError> {
        let content = std::fs::read_to_string(path).map_err(|source| FixtureError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&content)
    }
}
