//! Visual-mode state as the command core sees it.
//!
//! The key layer owns mode switching. Motions and text objects only need to
//! know whether a Visual area is active, where its anchor is, and which
//! flavour it is, since several objects extend an existing area instead of
//! selecting a fresh one.

use std::fmt;

use crate::position::{Position, SpanKind};

/// The sub-mode of visual selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum VisualKind {
    /// `v`: character-wise selection.
    #[default]
    Char,
    /// `V`: line-wise selection (always selects full lines).
    Line,
    /// `Ctrl-V`: block (column) selection.
    Block,
}

impl VisualKind {
    /// The span granularity an operator applied to this area uses.
    #[must_use]
    pub const fn span_kind(self) -> SpanKind {
        match self {
            Self::Char => SpanKind::Char,
            Self::Line => SpanKind::Line,
            Self::Block => SpanKind::Block,
        }
    }
}

impl fmt::Display for VisualKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Char => f.write_str("VISUAL"),
            Self::Line => f.write_str("VISUAL LINE"),
            Self::Block => f.write_str("VISUAL BLOCK"),
        }
    }
}

/// An active Visual area: the fixed end is `anchor`, the moving end is the
/// cursor (held by the caller).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Visual {
    pub anchor: Position,
    pub kind: VisualKind,
}

impl Visual {
    #[must_use]
    pub const fn new(anchor: Position, kind: VisualKind) -> Self {
        Self { anchor, kind }
    }

    /// True when the area is a single character at `cursor`.
    #[must_use]
    pub fn is_empty_at(&self, cursor: Position) -> bool {
        self.anchor == cursor
    }
}
