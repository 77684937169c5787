//! Jump list and the previous-context mark.
//!
//! Jumps (`G`, `/`, `n`, `%`, `(`, `{`, `'x`, and any motion that travels
//! far enough) call [`JumpList::set_pcmark`] with the cursor's pre-jump
//! position. That remembers the position as the `''` mark and appends it
//! to the history. Navigate the history with [`JumpList::move_by`]
//! (`Ctrl+O` is `-count`, `Ctrl+I`/`Tab` is `+count`).
//!
//! The list holds at most one entry per line: pushing a position drops any
//! earlier entry on the same line, so the newest visit wins. When the index
//! sits one past the last entry (the "live" position), the first backward
//! move records the cursor first so a forward move can return to it.

use tracing::trace;

use crate::buffer::LineAdjust;
use crate::position::Position;

/// Default bound, as in vi.
pub const JUMPLIST_SIZE: usize = 50;

/// Position history for `Ctrl+O` / `Ctrl+I`, plus the `''` mark pair.
#[derive(Debug, Clone)]
pub struct JumpList {
    entries: Vec<Position>,
    /// Index into `entries`; `entries.len()` when at the live position.
    idx: usize,
    capacity: usize,
    pcmark: Option<Position>,
    prev_pcmark: Option<Position>,
}

impl Default for JumpList {
    fn default() -> Self {
        Self::new(JUMPLIST_SIZE)
    }
}

impl JumpList {
    /// An empty list holding at most `capacity` entries.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Vec::new(),
            idx: 0,
            capacity: capacity.max(1),
            pcmark: None,
            prev_pcmark: None,
        }
    }

    /// Change the bound, dropping the oldest entries if needed.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity.max(1);
        let excess = self.entries.len().saturating_sub(self.capacity);
        if excess > 0 {
            self.entries.drain(..excess);
            self.idx = self.idx.saturating_sub(excess);
        }
    }

    // -- Previous-context mark ----------------------------------------------

    /// Record `cursor` as the `''` mark and push it onto the history.
    pub fn set_pcmark(&mut self, cursor: Position) {
        self.prev_pcmark = self.pcmark;
        self.pcmark = Some(cursor);
        self.push(cursor);
    }

    /// Before jumping to `''`: when the mark is the cursor itself (or
    /// unset), use the one before it.
    pub fn check_pcmark(&mut self, cursor: Position) {
        if self.prev_pcmark.is_some() && self.pcmark.is_none_or(|pc| pc == cursor) {
            self.pcmark = self.prev_pcmark.take();
        }
    }

    /// The `''` mark.
    #[must_use]
    pub const fn pcmark(&self) -> Option<Position> {
        self.pcmark
    }

    /// The `''` mark before the latest jump.
    #[must_use]
    pub const fn prev_pcmark(&self) -> Option<Position> {
        self.prev_pcmark
    }

    /// Set the `''` mark without touching the history.
    pub fn set_pcmark_only(&mut self, pos: Position) {
        self.pcmark = Some(pos);
    }

    /// Make the current `''` mark survive a [`check_pcmark`](Self::check_pcmark)
    /// even when the cursor has not moved away from it.
    pub fn pin_pcmark(&mut self) {
        self.prev_pcmark = self.pcmark;
    }

    // -- History ------------------------------------------------------------

    /// Append `pos`, drop earlier entries on its line, and move to the live
    /// position.
    pub fn push(&mut self, pos: Position) {
        self.entries.push(pos);
        if self.entries.len() > self.capacity {
            self.entries.remove(0);
        }
        self.idx = self.entries.len();
        self.cleanup();
    }

    /// Remove entries that a later entry on the same line supersedes,
    /// keeping the index on the same logical entry.
    fn cleanup(&mut self) {
        let before = self.entries.len();
        let mut kept = Vec::with_capacity(before);
        let mut new_idx = None;
        for (from, pos) in self.entries.iter().enumerate() {
            if from == self.idx {
                new_idx = Some(kept.len());
            }
            let superseded = self.entries[from + 1..].iter().any(|later| later.line == pos.line);
            if !superseded {
                kept.push(*pos);
            }
        }
        self.idx = new_idx.unwrap_or(kept.len());
        if kept.len() != before {
            trace!(dropped = before - kept.len(), "jump list cleanup");
        }
        self.entries = kept;
    }

    /// Walk `count` entries (negative is older). `cursor` is recorded
    /// first when leaving the live position.
    ///
    /// Returns `None` when the walk would leave the history.
    pub fn move_by(&mut self, count: isize, cursor: Position) -> Option<Position> {
        self.cleanup();
        if self.entries.is_empty() {
            return None;
        }
        let target = self.idx.checked_add_signed(count)?;
        if target >= self.entries.len() {
            return None;
        }
        if self.idx == self.entries.len() {
            // First Ctrl+O after a jump: remember where we are.
            self.set_pcmark(cursor);
            self.idx = self.entries.len() - 1;
        }
        self.idx = self.idx.checked_add_signed(count)?;
        let pos = *self.entries.get(self.idx)?;
        trace!(idx = self.idx, ?pos, "jump");
        Some(pos)
    }

    /// Forget the history and the `''` marks.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.idx = 0;
        self.pcmark = None;
        self.prev_pcmark = None;
    }

    /// Follow an edit: entries on deleted lines move to the first line of
    /// the deleted region, later entries shift.
    pub fn adjust(&mut self, adjust: &LineAdjust) {
        let follow = |pos: &mut Position| {
            pos.line = adjust.apply(pos.line).unwrap_or(adjust.line1).max(1);
        };
        self.entries.iter_mut().for_each(follow);
        for pos in [&mut self.pcmark, &mut self.prev_pcmark].into_iter().flatten() {
            follow(pos);
        }
    }

    /// Entries, oldest first (`:jumps`).
    pub fn iter(&self) -> impl Iterator<Item = &Position> {
        self.entries.iter()
    }

    /// Current index; equal to [`len`](Self::len) at the live position.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.idx
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
