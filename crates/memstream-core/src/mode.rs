//! Open-mode parsing.
//!
//! Interprets fopen-style mode strings ("r", "r+", "w", "w+", "a", "a+",
//! optionally with a `b` binary marker in the second position) into the flag
//! set the stream factories act on.
//!
//! The parser never rejects a mode. An unrecognized leading character yields
//! a flag set with neither read nor write permission, and the engine refuses
//! to bind such a stream.

/// Flags derived from an open-mode string.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpenFlags {
    pub readable: bool,
    pub writable: bool,
    /// Allocate a fresh buffer when the handle is null.
    pub create: bool,
    /// Discard existing content at open.
    pub truncate: bool,
    /// Writes always target end-of-content.
    pub append: bool,
    /// Seek to end-of-content after binding (plain "a" only).
    pub position_at_end: bool,
    /// Binary marker was present. Has no effect on in-memory streams.
    pub binary: bool,
}

impl OpenFlags {
    /// True when the flag set permits at least one direction of I/O.
    #[must_use]
    pub const fn has_access(&self) -> bool {
        self.readable || self.writable
    }
}

/// Parse an fopen-style mode string.
#[must_use]
pub fn parse_mode(mode: &str) -> OpenFlags {
    let bytes = mode.as_bytes();
    let mut flags = OpenFlags::default();

    let Some(&base) = bytes.first() else {
        return flags;
    };

    // The update marker sits right after the base character, or after the
    // binary marker ("rb+").
    let update = match bytes.get(1) {
        Some(b'+') => {
            flags.binary = bytes.get(2) == Some(&b'b');
            true
        }
        Some(b'b') => {
            flags.binary = true;
            bytes.get(2) == Some(&b'+')
        }
        _ => false,
    };

    match base {
        b'r' => {
            flags.readable = true;
            flags.writable = update;
        }
        b'w' => {
            flags.readable = update;
            flags.writable = true;
            flags.create = true;
            flags.truncate = true;
        }
        b'a' => {
            flags.readable = update;
            flags.writable = true;
            flags.create = true;
            flags.append = true;
            flags.position_at_end = !update;
        }
        _ => {}
    }

    flags
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_only() {
        let f = parse_mode("r");
        assert!(f.readable);
        assert!(!f.writable);
        assert!(!f.create && !f.truncate && !f.append && !f.position_at_end);
    }

    #[test]
    fn read_write() {
        let f = parse_mode("r+");
        assert!(f.readable && f.writable);
        assert!(!f.create && !f.truncate);
    }

    #[test]
    fn write_truncates_and_creates() {
        let f = parse_mode("w");
        assert!(!f.readable);
        assert!(f.writable && f.create && f.truncate);
        assert!(!f.append);

        let f = parse_mode("w+");
        assert!(f.readable && f.writable && f.create && f.truncate);
    }

    #[test]
    fn plain_append_positions_at_end() {
        let f = parse_mode("a");
        assert!(f.append && f.create && f.position_at_end);
        assert!(!f.readable);
    }

    #[test]
    fn append_update_starts_at_zero() {
        let f = parse_mode("a+");
        assert!(f.append && f.create && f.readable && f.writable);
        assert!(!f.position_at_end);
    }

    #[test]
    fn binary_marker_positions() {
        let f = parse_mode("rb+");
        assert!(f.binary && f.readable && f.writable);

        let f = parse_mode("r+b");
        assert!(f.binary && f.readable && f.writable);

        let f = parse_mode("ab");
        assert!(f.binary && f.position_at_end && !f.readable);

        assert_eq!(
            OpenFlags {
                binary: false,
                ..parse_mode("wb+")
            },
            parse_mode("w+")
        );
    }

    #[test]
    fn unknown_modes_have_no_access() {
        assert!(!parse_mode("").has_access());
        assert!(!parse_mode("z").has_access());
        assert!(!parse_mode("x+").has_access());
    }
}
