//! Text buffer: line access for the command core.
//!
//! A `Buffer` wraps a [`ropey::Rope`] and presents it the way vi sees text:
//! a sequence of lines numbered from 1, each ending in a newline. The last
//! line's newline is implied when the file does not end with one, and a
//! file that does end with one does not grow a phantom empty line.
//!
//! # Coordinate system
//!
//! Positions are `(line, col)` with 1-based lines and 0-based char columns.
//! `col == line_len(line)` addresses the line's newline. Absolute offsets
//! count chars from the start of the buffer, newline included.
//!
//! # Edits
//!
//! Every edit returns the [`LineAdjust`] records that describe how line
//! numbers moved, so marks and jump-list entries can follow the text.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use ropey::Rope;

use crate::error::{Error, Result};
use crate::position::Position;

// ---------------------------------------------------------------------------
// Line adjustments
// ---------------------------------------------------------------------------

/// How an edit moved line numbers.
///
/// Lines `line1..=line2` move by `amount`, or are gone when `amount` is
/// `None`. Lines after `line2` move by `amount_after`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineAdjust {
    pub line1: usize,
    pub line2: usize,
    pub amount: Option<isize>,
    pub amount_after: isize,
}

impl LineAdjust {
    /// `count` lines appended after line `after`.
    #[must_use]
    pub fn appended(after: usize, count: usize) -> Self {
        Self {
            line1: after + 1,
            line2: usize::MAX,
            amount: Some(signed(count)),
            amount_after: 0,
        }
    }

    /// `count` lines starting at `first` were removed.
    #[must_use]
    pub fn deleted(first: usize, count: usize) -> Self {
        Self {
            line1: first,
            line2: first + count - 1,
            amount: None,
            amount_after: -signed(count),
        }
    }

    /// Where line `line` ends up, or `None` if it was deleted.
    #[must_use]
    pub fn apply(&self, line: usize) -> Option<usize> {
        let delta = if line < self.line1 {
            0
        } else if line <= self.line2 {
            self.amount?
        } else {
            self.amount_after
        };
        line.checked_add_signed(delta)
    }
}

fn signed(count: usize) -> isize {
    isize::try_from(count).unwrap_or(isize::MAX)
}

// ---------------------------------------------------------------------------
// Buffer
// ---------------------------------------------------------------------------

/// Chars ropey ends a line on. `\r\n` is one break.
const fn is_line_break(c: char) -> bool {
    matches!(
        c,
        '\n' | '\r' | '\u{000B}' | '\u{000C}' | '\u{0085}' | '\u{2028}' | '\u{2029}'
    )
}

/// A text buffer backed by a rope.
pub struct Buffer {
    rope: Rope,
    path: Option<PathBuf>,
    modified: bool,
}

impl Buffer {
    // -- Construction -------------------------------------------------------

    /// An empty buffer: one empty line, no path.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rope: Rope::new(),
            path: None,
            modified: false,
        }
    }

    /// Create a buffer from a string.
    #[must_use]
    pub fn from_text(text: &str) -> Self {
        Self {
            rope: Rope::from_str(text),
            path: None,
            modified: false,
        }
    }

    /// Build a buffer from lines (no trailing newlines in the items).
    #[must_use]
    pub fn from_lines<S: AsRef<str>>(lines: &[S]) -> Self {
        let mut text = String::new();
        for line in lines {
            text.push_str(line.as_ref());
            text.push('\n');
        }
        Self::from_text(&text)
    }

    /// Load a buffer from a file. The stored path is made absolute so file
    /// marks and persisted marks key on a stable name.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not UTF-8.
    pub fn from_file(path: &Path) -> io::Result<Self> {
        let text = fs::read_to_string(path)?;
        let path = std::path::absolute(path)?;
        Ok(Self {
            rope: Rope::from_str(&text),
            path: Some(path),
            modified: false,
        })
    }

    // -- Line access --------------------------------------------------------

    /// Number of lines. An empty buffer has one (empty) line.
    #[must_use]
    pub fn line_count(&self) -> usize {
        let n = self.rope.len_lines();
        if n > 1 && self.rope.line(n - 1).len_chars() == 0 {
            n - 1
        } else {
            n
        }
    }

    /// Chars in the whole buffer, line endings included.
    #[must_use]
    pub fn len_chars(&self) -> usize {
        self.rope.len_chars()
    }

    /// True if `line` is a valid 1-based line number.
    #[inline]
    #[must_use]
    pub fn has_line(&self, line: usize) -> bool {
        line >= 1 && line <= self.line_count()
    }

    /// Chars in `line`, excluding the line ending. Any break ropey splits
    /// lines on counts: `\n`, `\r\n`, a lone `\r`, and the Unicode
    /// separators. Zero for lines outside the buffer.
    #[must_use]
    pub fn line_len(&self, line: usize) -> usize {
        if !self.has_line(line) {
            return 0;
        }
        self.rope.line(line - 1).len_chars() - self.ending_len(line)
    }

    /// Chars in the line ending of `line`; zero on an unterminated last line.
    fn ending_len(&self, line: usize) -> usize {
        let slice = self.rope.line(line - 1);
        let len = slice.len_chars();
        match len.checked_sub(1).map(|i| slice.char(i)) {
            Some('\n') if len > 1 && slice.char(len - 2) == '\r' => 2,
            Some(c) if is_line_break(c) => 1,
            _ => 0,
        }
    }

    /// Content of `line` without its line ending.
    #[must_use]
    pub fn line_text(&self, line: usize) -> String {
        if !self.has_line(line) {
            return String::new();
        }
        let len = self.line_len(line);
        self.rope.line(line - 1).slice(..len).to_string()
    }

    /// Content of `line` followed by exactly one `'\n'`, whether or not the
    /// file stores one. This is the haystack searches run over.
    #[must_use]
    pub fn line_segment(&self, line: usize) -> String {
        let mut text = self.line_text(line);
        text.push('\n');
        text
    }

    /// Character at `pos`. Columns at or past the end of the line read as
    /// `'\n'`, on the last line too.
    #[must_use]
    pub fn gchar(&self, pos: Position) -> char {
        if pos.col >= self.line_len(pos.line) {
            return '\n';
        }
        self.rope.line(pos.line - 1).char(pos.col)
    }

    /// First char of `line`, `None` when the line is empty.
    #[must_use]
    pub fn first_char(&self, line: usize) -> Option<char> {
        (self.line_len(line) > 0).then(|| self.gchar(Position::new(line, 0)))
    }

    /// True if `line` has no characters.
    #[inline]
    #[must_use]
    pub fn is_line_empty(&self, line: usize) -> bool {
        self.line_len(line) == 0
    }

    /// True if `line` holds nothing but spaces and tabs.
    #[must_use]
    pub fn is_line_white(&self, line: usize) -> bool {
        self.line_text(line).chars().all(|c| c == ' ' || c == '\t')
    }

    /// Column of the first non-blank char (the line length when blank).
    #[must_use]
    pub fn first_non_blank(&self, line: usize) -> usize {
        self.line_text(line)
            .chars()
            .take_while(|c| *c == ' ' || *c == '\t')
            .count()
    }

    // -- Offsets ------------------------------------------------------------

    /// Absolute char offset of the first char of `line`.
    #[must_use]
    pub fn line_start_offset(&self, line: usize) -> usize {
        let line = line.clamp(1, self.line_count());
        self.rope.line_to_char(line - 1)
    }

    /// Absolute offset just past `line`'s line ending. An unterminated last
    /// line counts as ending in a newline.
    #[must_use]
    pub fn line_end_offset(&self, line: usize) -> usize {
        let line = line.clamp(1, self.line_count());
        self.line_start_offset(line) + self.line_len(line) + self.ending_len(line).max(1)
    }

    /// Absolute offset of `pos`, with the column clamped to the newline slot.
    #[must_use]
    pub fn offset(&self, pos: Position) -> usize {
        self.line_start_offset(pos.line) + pos.col.min(self.line_len(pos.line))
    }

    /// Position of an absolute offset, clamped into the buffer.
    #[must_use]
    pub fn position_at(&self, offset: usize) -> Position {
        let offset = offset.min(self.rope.len_chars());
        let line = (self.rope.char_to_line(offset) + 1).min(self.line_count());
        let col = offset.saturating_sub(self.line_start_offset(line));
        Position::new(line, col.min(self.line_len(line)))
    }

    /// Clamp a position into the buffer. With `past_end` the column may sit
    /// on the newline slot; otherwise it stops on the last char.
    #[must_use]
    pub fn clamp(&self, pos: Position, past_end: bool) -> Position {
        let line = pos.line.clamp(1, self.line_count());
        let len = self.line_len(line);
        let max_col = if past_end { len } else { len.saturating_sub(1) };
        Position::new(line, pos.col.min(max_col))
    }

    /// Last character position in the buffer.
    #[must_use]
    pub fn end_position(&self) -> Position {
        let line = self.line_count();
        Position::new(line, self.line_len(line).saturating_sub(1))
    }

    // -- Editing ------------------------------------------------------------

    /// Insert text at `pos` (the newline slot is allowed).
    ///
    /// # Errors
    ///
    /// [`Error::Buffer`] when `pos` is outside the buffer.
    pub fn insert(&mut self, pos: Position, text: &str) -> Result<Vec<LineAdjust>> {
        let idx = self.char_idx(pos)?;
        let before = self.rope.len_lines();
        self.rope.insert(idx, text);
        self.modified = true;
        let added = self.rope.len_lines().saturating_sub(before);
        if added == 0 {
            return Ok(Vec::new());
        }
        // Text before the insertion point keeps its line; everything after
        // it (the rest of `pos.line` included) moves down.
        let first = if pos.col == 0 { pos.line } else { pos.line + 1 };
        Ok(vec![LineAdjust::appended(first - 1, added)])
    }

    /// Delete the text between `start` and `end` (exclusive).
    ///
    /// # Errors
    ///
    /// [`Error::Buffer`] when either end is outside the buffer or
    /// `end < start`.
    pub fn delete(&mut self, start: Position, end: Position) -> Result<Vec<LineAdjust>> {
        if end < start {
            return Err(Error::Buffer(format!("{start:?} after {end:?}")));
        }
        let from = self.char_idx(start)?;
        let to = self.char_idx(end)?;
        if from == to {
            return Ok(Vec::new());
        }
        self.rope.remove(from..to);
        self.modified = true;

        let joined = end.line - start.line;
        if joined == 0 {
            return Ok(Vec::new());
        }
        let mut adjust = Vec::with_capacity(2);
        if start.col == 0 && end.col == 0 {
            adjust.push(LineAdjust::deleted(start.line, joined));
            return Ok(adjust);
        }
        // Lines strictly inside the range are gone; the tail of `end.line`
        // is joined onto `start.line`.
        if joined > 1 {
            adjust.push(LineAdjust::deleted(start.line + 1, joined - 1));
        }
        let moved = start.line + 1;
        adjust.push(LineAdjust {
            line1: moved,
            line2: moved,
            amount: Some(-1),
            amount_after: -1,
        });
        Ok(adjust)
    }

    /// Replace the text between `start` and `end` with `text`.
    ///
    /// # Errors
    ///
    /// As [`delete`](Self::delete) and [`insert`](Self::insert).
    pub fn replace(
        &mut self,
        start: Position,
        end: Position,
        text: &str,
    ) -> Result<Vec<LineAdjust>> {
        let mut adjust = self.delete(start, end)?;
        adjust.extend(self.insert(start, text)?);
        Ok(adjust)
    }

    /// Delete lines `first..=last`.
    ///
    /// # Errors
    ///
    /// [`Error::Buffer`] when the range is empty or outside the buffer.
    pub fn delete_lines(&mut self, first: usize, last: usize) -> Result<Vec<LineAdjust>> {
        if first > last || !self.has_line(first) || !self.has_line(last) {
            return Err(Error::Buffer(format!("lines {first}..={last}")));
        }
        let from = self.rope.line_to_char(first - 1);
        let to = if last < self.rope.len_lines() {
            self.rope.line_to_char(last)
        } else {
            self.rope.len_chars()
        };
        self.rope.remove(from..to);
        self.modified = true;
        Ok(vec![LineAdjust::deleted(first, last - first + 1)])
    }

    /// Insert whole lines after line `after` (0 inserts at the top).
    ///
    /// # Errors
    ///
    /// [`Error::Buffer`] when `after` is past the last line.
    pub fn insert_lines<S: AsRef<str>>(
        &mut self,
        after: usize,
        lines: &[S],
    ) -> Result<Vec<LineAdjust>> {
        if after > self.line_count() {
            return Err(Error::Buffer(format!("append after line {after}")));
        }
        if lines.is_empty() {
            return Ok(Vec::new());
        }
        let mut text = String::new();
        for line in lines {
            text.push_str(line.as_ref());
            text.push('\n');
        }
        let idx = if after == 0 {
            0
        } else if after < self.rope.len_lines() {
            self.rope.line_to_char(after)
        } else {
            self.rope.len_chars()
        };
        // A last line without newline needs one before the appended text.
        if idx == self.rope.len_chars() && idx > 0 && !is_line_break(self.rope.char(idx - 1)) {
            text.insert(0, '\n');
            text.pop();
        }
        self.rope.insert(idx, &text);
        self.modified = true;
        Ok(vec![LineAdjust::appended(after, lines.len())])
    }

    fn char_idx(&self, pos: Position) -> Result<usize> {
        if !self.has_line(pos.line) || pos.col > self.line_len(pos.line) {
            // The newline slot of the last line is valid even without a
            // stored newline.
            return Err(Error::Buffer(format!("{pos:?}")));
        }
        Ok(self.rope.line_to_char(pos.line - 1) + pos.col)
    }

    // -- Metadata -----------------------------------------------------------

    /// The file path this buffer is associated with, if any.
    #[inline]
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Set the file path for this buffer.
    #[inline]
    pub fn set_path(&mut self, path: PathBuf) {
        self.path = Some(path);
    }

    /// True if the buffer has been modified since creation or load.
    #[inline]
    #[must_use]
    pub const fn is_modified(&self) -> bool {
        self.modified
    }

    /// Collect all text into a `String`.
    #[must_use]
    pub fn contents(&self) -> String {
        self.rope.to_string()
    }
}

impl Default for Buffer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Buffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Buffer")
            .field("lines", &self.line_count())
            .field("chars", &self.rope.len_chars())
            .field("modified", &self.modified)
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
