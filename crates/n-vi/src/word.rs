//! Word and WORD motions: `w`, `b`, `e`, `ge` and their big-word forms.
//!
//! Each function advances a [`Cursor`] by `count` words and returns `false`
//! when the buffer edge stopped it early. The walker has still moved in
//! that case; callers decide whether to keep the partial motion (operators
//! do, plain cursor motions do not).

use crate::charclass::CharClass;
use crate::cursor::Cursor;

/// `w` / `W`: forward to the start of the next word.
///
/// With `eol` (an operator is pending) the last word stops at the end of
/// its line instead of running onto the next one.
pub fn fwd_word(cur: &mut Cursor<'_>, count: usize, eol: bool) -> bool {
    for remaining in (0..count).rev() {
        let last = remaining == 0;
        let start = cur.cls();
        let last_line = cur.on_last_line();
        let step = cur.inc();
        if step.is_boundary() || (step.crossed() && last_line) {
            return false;
        }
        if step.crossed() && eol && last {
            return true;
        }

        // Past the end of the current word, if any.
        if start != CharClass::Blank {
            while cur.cls() == start {
                let step = cur.inc();
                if step.is_boundary() || (step.crossed() && eol && last) {
                    return true;
                }
            }
        }

        // To the next non-blank, stopping on an empty line.
        while cur.cls() == CharClass::Blank {
            if cur.pos.col == 0 && cur.gchar() == '\n' {
                break;
            }
            let step = cur.inc();
            if step.is_boundary() || (step.crossed() && eol && last) {
                return true;
            }
        }
    }
    true
}

/// `b` / `B`: back to the start of the previous word.
///
/// With `stop`, a cursor already on the start of a word moves one word
/// less (used by word objects).
pub fn bck_word(cur: &mut Cursor<'_>, count: usize, mut stop: bool) -> bool {
    for _ in 0..count {
        let start = cur.cls();
        if cur.dec().is_boundary() {
            return false;
        }
        if bck_word_once(cur, start, stop) == Walk::Done {
            return true;
        }
        stop = false;
    }
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Walk {
    Continue,
    Done,
}

fn bck_word_once(cur: &mut Cursor<'_>, start: CharClass, stop: bool) -> Walk {
    if !stop || start == cur.cls() || start == CharClass::Blank {
        // Blanks before the word; an empty line is a word of its own.
        while cur.cls() == CharClass::Blank {
            if cur.pos.col == 0 && cur.line_empty() {
                return Walk::Continue;
            }
            if cur.dec().is_boundary() {
                return Walk::Done;
            }
        }
        if cur.skip_class(cur.cls(), false) {
            return Walk::Done;
        }
    }
    // Overshot by one.
    cur.inc();
    Walk::Continue
}

/// `e` / `E`: forward to the end of the word.
///
/// With `stop`, a cursor already on the end of a word moves one word less.
/// With `empty`, an empty line counts as a word.
pub fn end_word(cur: &mut Cursor<'_>, count: usize, mut stop: bool, empty: bool) -> bool {
    for _ in 0..count {
        let start = cur.cls();
        if cur.inc().is_boundary() {
            return false;
        }
        if cur.cls() == start && start != CharClass::Blank {
            if cur.skip_class(start, true) {
                return false;
            }
            cur.dec();
        } else if !stop || start == CharClass::Blank {
            let mut on_empty = false;
            while cur.cls() == CharClass::Blank {
                if empty && cur.pos.col == 0 && cur.line_empty() {
                    on_empty = true;
                    break;
                }
                if cur.inc().is_boundary() {
                    return false;
                }
            }
            if !on_empty {
                if cur.skip_class(cur.cls(), true) {
                    return false;
                }
                cur.dec();
            }
        } else {
            cur.dec();
        }
        stop = false;
    }
    true
}

/// `ge` / `gE`: back to the end of the previous word.
///
/// With `eol`, stop when the motion crosses a line boundary.
pub fn bckend_word(cur: &mut Cursor<'_>, count: usize, eol: bool) -> bool {
    for _ in 0..count {
        let start = cur.cls();
        let step = cur.dec();
        if step.is_boundary() {
            return false;
        }
        if eol && step.crossed() {
            return true;
        }

        if start != CharClass::Blank {
            while cur.cls() == start {
                let step = cur.dec();
                if step.is_boundary() || (eol && step.crossed()) {
                    return true;
                }
            }
        }

        while cur.cls() == CharClass::Blank {
            if cur.pos.col == 0 && cur.line_empty() {
                break;
            }
            let step = cur.dec();
            if step.is_boundary() || (eol && step.crossed()) {
                return true;
            }
        }
    }
    true
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
