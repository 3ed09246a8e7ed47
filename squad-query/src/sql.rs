//! SQL dialect helpers.

use std::fmt;

/// Largest LIMIT/OFFSET a statement can carry; SQLite integers are signed
/// 64-bit.
pub const MAX_WINDOW_BOUND: u64 = i64::MAX as u64;

/// Database type for parameter placeholder generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DatabaseType {
    /// SQLite uses ?, ?, etc.
    #[default]
    SQLite,
}

impl DatabaseType {
    /// Get the parameter placeholder.
    pub fn placeholder(&self) -> &'static str {
        match self {
            Self::SQLite => "?",
        }
    }

    /// Write a LIMIT/OFFSET clause.
    ///
    /// SQLite does not accept OFFSET without LIMIT, so an unbounded
    /// `LIMIT -1` is emitted there. Bounds above [`MAX_WINDOW_BOUND`] are
    /// clamped to it; no store holds that many rows, so the window is the
    /// same.
    pub fn write_limit_offset(&self, buffer: &mut String, limit: Option<u64>, offset: Option<u64>) {
        use std::fmt::Write;

        match (limit, offset, self) {
            (Some(limit), _, _) => {
                let _ = write!(buffer, " LIMIT {}", limit.min(MAX_WINDOW_BOUND));
            }
            (None, Some(_), Self::SQLite) => buffer.push_str(" LIMIT -1"),
            (None, None, _) => {}
        }
        if let Some(offset) = offset {
            let _ = write!(buffer, " OFFSET {}", offset.min(MAX_WINDOW_BOUND));
        }
    }
}

impl fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SQLite => write!(f, "sqlite"),
        }
    }
}
