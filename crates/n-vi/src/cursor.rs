//! A position walking over a buffer.
//!
//! Motions and objects are long loops of "look at the char here, classify
//! it, take one step". `Cursor` bundles the buffer, the keyword set and the
//! position being moved so those loops read as plain vi logic. Walkers work
//! on a copy of the caller's position; a failed motion simply drops its
//! walker and the caller's cursor is untouched.

use crate::buffer::Buffer;
use crate::charclass::{CharClass, Keywords, classify, is_white};
use crate::position::Position;
use crate::step::{self, Step};

#[derive(Clone, Copy)]
pub struct Cursor<'a> {
    buf: &'a Buffer,
    keywords: &'a Keywords,
    pub pos: Position,
    /// Classify for WORDs (only blanks separate).
    pub big_word: bool,
}

impl<'a> Cursor<'a> {
    #[must_use]
    pub const fn new(buf: &'a Buffer, keywords: &'a Keywords, pos: Position) -> Self {
        Self {
            buf,
            keywords,
            pos,
            big_word: false,
        }
    }

    #[must_use]
    pub const fn buffer(&self) -> &'a Buffer {
        self.buf
    }

    #[must_use]
    pub const fn keywords(&self) -> &'a Keywords {
        self.keywords
    }

    /// A walker over the same buffer at another position.
    #[must_use]
    pub const fn at(&self, pos: Position) -> Self {
        Self { pos, ..*self }
    }

    // -- Inspection ---------------------------------------------------------

    #[inline]
    #[must_use]
    pub fn gchar(&self) -> char {
        self.buf.gchar(self.pos)
    }

    /// Class of the char under the walker.
    #[inline]
    #[must_use]
    pub fn cls(&self) -> CharClass {
        classify(self.gchar(), self.big_word, self.keywords)
    }

    #[inline]
    #[must_use]
    pub fn is_white(&self) -> bool {
        is_white(self.gchar())
    }

    #[inline]
    #[must_use]
    pub fn line_len(&self) -> usize {
        self.buf.line_len(self.pos.line)
    }

    #[inline]
    #[must_use]
    pub fn line_empty(&self) -> bool {
        self.buf.is_line_empty(self.pos.line)
    }

    #[inline]
    #[must_use]
    pub fn on_last_line(&self) -> bool {
        self.pos.line >= self.buf.line_count()
    }

    /// With `extra == 0`, true when the walker is on or before the first
    /// non-blank; with `extra == 1`, strictly before it.
    #[must_use]
    pub fn in_indent(&self, extra: usize) -> bool {
        self.buf.first_non_blank(self.pos.line) >= self.pos.col + extra
    }

    // -- Stepping -----------------------------------------------------------

    #[inline]
    pub fn inc(&mut self) -> Step {
        step::inc(self.buf, &mut self.pos)
    }

    #[inline]
    pub fn dec(&mut self) -> Step {
        step::dec(self.buf, &mut self.pos)
    }

    #[inline]
    pub fn incl(&mut self) -> Step {
        step::incl(self.buf, &mut self.pos)
    }

    #[inline]
    pub fn decl(&mut self) -> Step {
        step::decl(self.buf, &mut self.pos)
    }

    #[inline]
    pub fn step(&mut self, forward: bool) -> Step {
        if forward { self.inc() } else { self.dec() }
    }

    #[inline]
    pub fn incl_decl(&mut self, forward: bool) -> Step {
        step::incl_decl(self.buf, &mut self.pos, forward)
    }

    /// Step over chars of class `class`. True if the buffer edge was hit.
    pub fn skip_class(&mut self, class: CharClass, forward: bool) -> bool {
        while self.cls() == class {
            if self.step(forward).is_boundary() {
                return true;
            }
        }
        false
    }

    /// Step back over spaces and tabs on the current line.
    pub fn back_over_white(&mut self) {
        while self.pos.col > 0 && is_white(self.buf.gchar(self.pos.with_col(self.pos.col - 1))) {
            self.pos.col -= 1;
        }
    }

    /// Move one char left within the line. False at column 0.
    pub fn oneleft(&mut self) -> bool {
        if self.pos.col == 0 {
            return false;
        }
        self.pos.col -= 1;
        true
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
