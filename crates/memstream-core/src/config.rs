//! Stream configuration.
//!
//! Defaults come from the environment, read once per process:
//! - `MEMSTREAM_BUFFERING`: `full` (default), `line`, or `none`.
//! - `MEMSTREAM_BUFSIZ`: engine buffer capacity in bytes (default 8192).
//! - `MEMSTREAM_MAX_LEN`: ceiling on backend storage in bytes. Growth past
//!   it is reported as an allocation failure. Default is unbounded.
//!
//! Factories called without an explicit config use [`StreamConfig::global`].

use std::sync::OnceLock;

use crate::buffer::{BUFSIZ, BufMode};

pub const ENV_BUFFERING: &str = "MEMSTREAM_BUFFERING";
pub const ENV_BUFSIZ: &str = "MEMSTREAM_BUFSIZ";
pub const ENV_MAX_LEN: &str = "MEMSTREAM_MAX_LEN";

/// Largest storage a backend may grow to by default.
pub const UNBOUNDED_LEN: usize = isize::MAX as usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamConfig {
    pub buf_mode: BufMode,
    pub buf_size: usize,
    pub max_len: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            buf_mode: BufMode::Full,
            buf_size: BUFSIZ,
            max_len: UNBOUNDED_LEN,
        }
    }
}

impl StreamConfig {
    /// Unbuffered config: every write is published immediately.
    #[must_use]
    pub fn unbuffered() -> Self {
        Self {
            buf_mode: BufMode::None,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_buffering(mut self, mode: BufMode, size: usize) -> Self {
        self.buf_mode = mode;
        self.buf_size = size;
        self
    }

    #[must_use]
    pub fn with_max_len(mut self, max_len: usize) -> Self {
        self.max_len = max_len;
        self
    }

    /// Build from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Unparseable values fall back to
    /// the defaults.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            buf_mode: lookup(ENV_BUFFERING)
                .map(|v| BufMode::from_str_loose(&v))
                .unwrap_or(defaults.buf_mode),
            buf_size: lookup(ENV_BUFSIZ)
                .and_then(|v| parse_size(&v))
                .filter(|&n| n > 0)
                .unwrap_or(defaults.buf_size),
            max_len: lookup(ENV_MAX_LEN)
                .and_then(|v| parse_size(&v))
                .map(|n| n.min(UNBOUNDED_LEN))
                .unwrap_or(defaults.max_len),
        }
    }

    /// Process-wide config, resolved from the environment on first use.
    #[must_use]
    pub fn global() -> &'static StreamConfig {
        static GLOBAL: OnceLock<StreamConfig> = OnceLock::new();
        GLOBAL.get_or_init(Self::from_env)
    }
}

/// Accepts decimal or `0x`-prefixed hex, with `_` separators.
fn parse_size(raw: &str) -> Option<usize> {
    let cleaned: String = raw.trim().chars().filter(|&c| c != '_').collect();
    match cleaned
        .strip_prefix("0x")
        .or_else(|| cleaned.strip_prefix("0X"))
    {
        Some(hex) => usize::from_str_radix(hex, 16).ok(),
        None => cleaned.parse().ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup_from(pairs: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        move |key| {
            pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| (*v).to_string())
        }
    }

    #[test]
    fn defaults_without_env() {
        let cfg = StreamConfig::from_lookup(|_| None);
        assert_eq!(cfg, StreamConfig::default());
        assert_eq!(cfg.buf_size, BUFSIZ);
        assert_eq!(cfg.max_len, UNBOUNDED_LEN);
    }

    #[test]
    fn reads_all_keys() {
        let cfg = StreamConfig::from_lookup(lookup_from(&[
            (ENV_BUFFERING, "line"),
            (ENV_BUFSIZ, "0x100"),
            (ENV_MAX_LEN, "1_024"),
        ]));
        assert_eq!(cfg.buf_mode, BufMode::Line);
        assert_eq!(cfg.buf_size, 256);
        assert_eq!(cfg.max_len, 1024);
    }

    #[test]
    fn bad_values_fall_back() {
        let cfg = StreamConfig::from_lookup(lookup_from(&[
            (ENV_BUFFERING, "sometimes"),
            (ENV_BUFSIZ, "0"),
            (ENV_MAX_LEN, "lots"),
        ]));
        assert_eq!(cfg, StreamConfig::default());
    }

    #[test]
    fn builders() {
        let cfg = StreamConfig::unbuffered().with_max_len(16);
        assert_eq!(cfg.buf_mode, BufMode::None);
        assert_eq!(cfg.max_len, 16);
        let cfg = cfg.with_buffering(BufMode::Full, 32);
        assert_eq!(cfg.buf_size, 32);
    }

    #[test]
    fn global_is_sticky() {
        let a = StreamConfig::global();
        let b = StreamConfig::global();
        assert!(std::ptr::eq(a, b));
    }
}
