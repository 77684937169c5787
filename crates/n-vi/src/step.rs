//! Elementary cursor stepping.
//!
//! Every motion in the crate moves through the buffer with these four
//! primitives rather than doing its own line/column arithmetic:
//!
//! - [`inc`] / [`dec`] step one char, crossing line boundaries. Forward
//!   steps visit the newline slot at the end of each line; backward steps
//!   land on it when they cross into the previous line.
//! - [`incl`] / [`decl`] do the same but skip the newline slot of non-empty
//!   lines, so repeated application only rests on a newline when the line
//!   is empty.

use crate::buffer::Buffer;
use crate::position::Position;

/// What a single step did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    /// Moved within the line.
    Within,
    /// Moved forward onto the newline slot at the end of the line.
    OntoNewline,
    /// Moved to the next (or previous) line.
    CrossedLine,
    /// Already at the end (or start) of the buffer; nothing moved.
    Boundary,
}

impl Step {
    /// True when the step could not move.
    #[inline]
    #[must_use]
    pub const fn is_boundary(self) -> bool {
        matches!(self, Self::Boundary)
    }

    /// True when the step left the line's content: crossed into another
    /// line or landed on the newline slot.
    #[inline]
    #[must_use]
    pub const fn crossed(self) -> bool {
        matches!(self, Self::OntoNewline | Self::CrossedLine)
    }
}

/// Step forward one char.
pub fn inc(buf: &Buffer, pos: &mut Position) -> Step {
    if buf.gchar(*pos) != '\n' {
        pos.col += 1;
        return if buf.gchar(*pos) == '\n' {
            Step::OntoNewline
        } else {
            Step::Within
        };
    }
    if pos.line < buf.line_count() {
        pos.line += 1;
        pos.col = 0;
        return Step::CrossedLine;
    }
    Step::Boundary
}

/// Step backward one char. Crossing into the previous line lands on its
/// newline slot.
pub fn dec(buf: &Buffer, pos: &mut Position) -> Step {
    let len = buf.line_len(pos.line);
    if pos.col > len {
        pos.col = len;
    }
    if pos.col > 0 {
        pos.col -= 1;
        return Step::Within;
    }
    if pos.line > 1 {
        pos.line -= 1;
        pos.col = buf.line_len(pos.line);
        return Step::CrossedLine;
    }
    Step::Boundary
}

/// [`inc`], skipping the newline slot of non-empty lines.
pub fn incl(buf: &Buffer, pos: &mut Position) -> Step {
    let step = inc(buf, pos);
    if step.crossed() && pos.col > 0 {
        return inc(buf, pos);
    }
    step
}

/// [`dec`], skipping the newline slot of non-empty lines.
pub fn decl(buf: &Buffer, pos: &mut Position) -> Step {
    let step = dec(buf, pos);
    if step == Step::CrossedLine && pos.col > 0 {
        return dec(buf, pos);
    }
    step
}

/// [`incl`] or [`decl`] by direction.
pub fn incl_decl(buf: &Buffer, pos: &mut Position, forward: bool) -> Step {
    if forward {
        incl(buf, pos)
    } else {
        decl(buf, pos)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
