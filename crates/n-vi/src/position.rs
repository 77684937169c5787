//! Text position and span types.
//!
//! Lines are **1-indexed** and columns **0-indexed**, the way vi reports
//! them: `Position { line: 1, col: 0 }` is the first character of the buffer.
//! Columns count Unicode scalar values (chars), never bytes.
//!
//! The column may equal the line's length. That slot is the line's newline
//! (real, or implied on the last line) and is where insert-like cursors and
//! exclusive span ends sit.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Position
// ---------------------------------------------------------------------------

/// A position in a buffer: 1-based line, 0-based char column.
///
/// Positions are plain values. Anything that walks the buffer works on a
/// copy and hands the result back, so a failed motion never disturbs the
/// position it started from.
///
/// # Ordering
///
/// Lexicographic: line first, then column.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub line: usize,
    pub col: usize,
}

impl Position {
    /// First character of the buffer.
    pub const START: Self = Self { line: 1, col: 0 };

    /// Create a new position.
    #[inline]
    #[must_use]
    pub const fn new(line: usize, col: usize) -> Self {
        Self { line, col }
    }

    /// Same line, different column.
    #[inline]
    #[must_use]
    pub const fn with_col(self, col: usize) -> Self {
        Self {
            line: self.line,
            col,
        }
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::START
    }
}

impl Ord for Position {
    #[inline]
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.line
            .cmp(&other.line)
            .then(self.col.cmp(&other.col))
    }
}

impl PartialOrd for Position {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Debug for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pos({}:{})", self.line, self.col)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // vi's `line,col` ruler shows the column 1-based.
        write!(f, "{}:{}", self.line, self.col + 1)
    }
}

// ---------------------------------------------------------------------------
// Span
// ---------------------------------------------------------------------------

/// Granularity an operator applies a span at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SpanKind {
    /// Character-wise: `start..end` in reading order.
    #[default]
    Char,
    /// Line-wise: whole lines `start.line..=end.line`, columns ignored.
    Line,
    /// Block-wise: the rectangle spanned by the two corners.
    Block,
}

/// The target of an operator, produced by motions and text objects.
///
/// For `Char` spans `inclusive` decides whether the character at `end`
/// belongs to the span. `Line` spans ignore columns entirely.
///
/// Objects run in Visual mode report the new Visual area with `start` as
/// the anchor and `end` as the cursor, so `start` may follow `end` when the
/// area was extended backward. [`Span::ordered`] normalizes that.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    pub start: Position,
    pub end: Position,
    pub kind: SpanKind,
    pub inclusive: bool,
}

impl Span {
    /// A character-wise span.
    #[inline]
    #[must_use]
    pub const fn chars(start: Position, end: Position, inclusive: bool) -> Self {
        Self {
            start,
            end,
            kind: SpanKind::Char,
            inclusive,
        }
    }

    /// A line-wise span over `start.line..=end.line`.
    #[inline]
    #[must_use]
    pub const fn lines(start: Position, end: Position) -> Self {
        Self {
            start,
            end,
            kind: SpanKind::Line,
            inclusive: true,
        }
    }

    /// Same span with `start <= end`.
    #[must_use]
    pub fn ordered(self) -> Self {
        if self.start <= self.end {
            self
        } else {
            Self {
                start: self.end,
                end: self.start,
                ..self
            }
        }
    }

    /// True when `start` comes after `end` (a Visual area extended backward).
    #[inline]
    #[must_use]
    pub fn is_reversed(&self) -> bool {
        self.start > self.end
    }

    /// Number of lines touched.
    #[inline]
    #[must_use]
    pub fn line_span(&self) -> usize {
        let s = self.ordered();
        s.end.line - s.start.line + 1
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let close = if self.inclusive { ']' } else { ')' };
        write!(
            f,
            "Span({:?} [{}:{} .. {}:{}{close})",
            self.kind, self.start.line, self.start.col, self.end.line, self.end.col
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
