//! Cursor motions.
//!
//! [`resolve`] maps a [`MotionKind`] and count onto a destination. The
//! sentence, paragraph and char-find algorithms live here; word motions are
//! in [`crate::word`] and bracket matching in [`crate::matchpair`].
//!
//! Resolution never touches the caller's cursor. On failure the caller
//! simply keeps its old position.

use bitflags::bitflags;
use tracing::trace;

use crate::buffer::Buffer;
use crate::charclass::{Keywords, is_white};
use crate::cursor::Cursor;
use crate::error::{Error, Result};
use crate::matchpair::{MatchTarget, find_match};
use crate::options::Options;
use crate::position::Position;
use crate::word::{bck_word, bckend_word, end_word, fwd_word};

/// Every motion the core resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionKind {
    /// `w` / `W`
    WordForward,
    /// `b` / `B`
    WordBackward,
    /// `e` / `E`
    WordEndForward,
    /// `ge` / `gE`
    WordEndBackward,
    /// `)`
    SentenceForward,
    /// `(`
    SentenceBackward,
    /// `}`
    ParagraphForward,
    /// `{`
    ParagraphBackward,
    /// `]]`, or `][` with `end`.
    SectionForward { end: bool },
    /// `[[`, or `[]` with `end`.
    SectionBackward { end: bool },
    /// `f`, `F`, `t`, `T`.
    FindChar { ch: char, forward: bool, till: bool },
    /// `;`, or `,` with `reverse`.
    RepeatFindChar { reverse: bool },
    /// `%`
    MatchPair,
    /// `[(`, `[{`: back to the enclosing unmatched opener.
    UnmatchedOpen(char),
    /// `])`, `]}`: forward to the enclosing unmatched closer.
    UnmatchedClose(char),
    /// `[/`, `]/`: start or end of the enclosing C comment.
    CommentBound { forward: bool },
    /// `[#`, `]#`: the enclosing unmatched `#if`/`#else`/`#endif`.
    DirectiveBound { forward: bool },
    /// `n`, or `N` with `reverse`.
    SearchNext { reverse: bool },
}

bitflags! {
    /// Modifiers for [`resolve`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MotionFlags: u8 {
        /// WORD instead of word (`W`, `B`, `E`, `gE`).
        const BIG_WORD = 1 << 0;
        /// An operator is pending; the motion defines its range.
        const OPERATOR = 1 << 1;
    }
}

/// Where a motion lands and how an operator should treat the range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotionResult {
    pub pos: Position,
    /// The destination char is part of the operated range.
    pub inclusive: bool,
    /// The operated range covers whole lines.
    pub linewise: bool,
    /// vi records this motion in the jump list regardless of distance.
    pub jump: bool,
}

impl MotionResult {
    const fn exclusive(pos: Position) -> Self {
        Self {
            pos,
            inclusive: false,
            linewise: false,
            jump: false,
        }
    }

    const fn inclusive(pos: Position) -> Self {
        Self {
            inclusive: true,
            ..Self::exclusive(pos)
        }
    }

    const fn jumping(self) -> Self {
        Self { jump: true, ..self }
    }
}

/// The last `f`/`F`/`t`/`T`, for `;` and `,`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharSearch {
    pub ch: char,
    pub forward: bool,
    pub till: bool,
}

/// Resolve `kind` from `start`.
///
/// `last_find` is read by `;`/`,` and updated by `f`/`t`. `search_next`
/// runs `n`/`N` (which needs the pattern state the caller owns).
///
/// # Errors
///
/// [`Error::Boundary`] when the motion runs off the buffer,
/// [`Error::UnmatchedDelimiter`] when a bracket has no partner, and
/// whatever `search_next` reports.
#[allow(clippy::too_many_arguments)]
pub fn resolve(
    buf: &Buffer,
    opts: &Options,
    last_find: &mut Option<CharSearch>,
    start: Position,
    kind: MotionKind,
    count: usize,
    flags: MotionFlags,
    search_next: impl FnOnce(bool, usize) -> Result<Position>,
) -> Result<MotionResult> {
    let count = count.max(1);
    let operator = flags.contains(MotionFlags::OPERATOR);
    let mut cur = Cursor::new(buf, &opts.iskeyword, start);
    cur.big_word = flags.contains(MotionFlags::BIG_WORD);

    let result = match kind {
        MotionKind::WordForward => {
            let ok = fwd_word(&mut cur, count, operator);
            // An operator keeps a motion that ran into the end of the buffer.
            if !ok && !(operator && cur.pos > start) {
                return Err(Error::Boundary);
            }
            MotionResult::exclusive(cur.pos)
        }
        MotionKind::WordBackward => {
            if !bck_word(&mut cur, count, false) {
                return Err(Error::Boundary);
            }
            MotionResult::exclusive(cur.pos)
        }
        MotionKind::WordEndForward => {
            if !end_word(&mut cur, count, false, false) {
                return Err(Error::Boundary);
            }
            MotionResult::inclusive(cur.pos)
        }
        MotionKind::WordEndBackward => {
            if !bckend_word(&mut cur, count, false) {
                return Err(Error::Boundary);
            }
            MotionResult::inclusive(cur.pos)
        }
        MotionKind::SentenceForward | MotionKind::SentenceBackward => {
            let forward = kind == MotionKind::SentenceForward;
            let pos = findsent(buf, opts.cpo_j, start, forward, count).ok_or(Error::Boundary)?;
            MotionResult::exclusive(pos).jumping()
        }
        MotionKind::ParagraphForward | MotionKind::ParagraphBackward => {
            let forward = kind == MotionKind::ParagraphForward;
            findpar(buf, start.line, forward, count, None, false)
                .ok_or(Error::Boundary)?
                .jumping()
        }
        MotionKind::SectionForward { end } | MotionKind::SectionBackward { end } => {
            let forward = matches!(kind, MotionKind::SectionForward { .. });
            let what = if end { '}' } else { '{' };
            // vi quirk: `]]` under an operator also stops at a `}`.
            let both = operator && forward && !end;
            let mut result = findpar(buf, start.line, forward, count, Some(what), both)
                .ok_or(Error::Boundary)?;
            if !operator {
                let line = result.pos.line;
                result.pos = buf.clamp(Position::new(line, buf.first_non_blank(line)), false);
            }
            result.jumping()
        }
        MotionKind::FindChar { ch, forward, till } => {
            let search = CharSearch { ch, forward, till };
            *last_find = Some(search);
            find_char_motion(buf, start, search, count)?
        }
        MotionKind::RepeatFindChar { reverse } => {
            let mut search = last_find.ok_or(Error::Boundary)?;
            if reverse {
                search.forward = !search.forward;
            }
            find_char_motion(buf, start, search, count)?
        }
        MotionKind::MatchPair => {
            let found = find_match(
                buf,
                &opts.matchpairs,
                start,
                MatchTarget::UnderCursor,
                !opts.cpo_match,
            )
            .ok_or_else(|| Error::UnmatchedDelimiter(buf.gchar(start)))?;
            MotionResult {
                linewise: found.linewise,
                ..MotionResult::inclusive(found.pos)
            }
            .jumping()
        }
        MotionKind::UnmatchedOpen(ch) | MotionKind::UnmatchedClose(ch) => {
            let (other, is_open) = opts
                .matchpairs
                .partner(ch)
                .ok_or(Error::UnmatchedDelimiter(ch))?;
            let want_open = matches!(kind, MotionKind::UnmatchedOpen(_));
            let target = if is_open == want_open { ch } else { other };
            repeat_match(buf, opts, start, MatchTarget::Unmatched(target), count)
                .ok_or(Error::UnmatchedDelimiter(target))?
        }
        MotionKind::CommentBound { forward } => {
            repeat_match(buf, opts, start, MatchTarget::Comment { forward }, count)
                .ok_or(Error::UnmatchedDelimiter('/'))?
        }
        MotionKind::DirectiveBound { forward } => {
            repeat_match(buf, opts, start, MatchTarget::Directive { forward }, count)
                .ok_or(Error::UnmatchedDelimiter('#'))?
        }
        MotionKind::SearchNext { reverse } => {
            MotionResult::exclusive(search_next(reverse, count)?).jumping()
        }
    };
    trace!(?kind, count, ?start, pos = ?result.pos, "motion");
    Ok(result)
}

/// Apply a bracket target `count` times. When a later round finds nothing,
/// the last partner found stands.
fn repeat_match(
    buf: &Buffer,
    opts: &Options,
    start: Position,
    target: MatchTarget,
    count: usize,
) -> Option<MotionResult> {
    let mut pos = start;
    let mut last = None;
    for _ in 0..count {
        let Some(found) = find_match(buf, &opts.matchpairs, pos, target, !opts.cpo_match) else {
            break;
        };
        pos = found.pos;
        last = Some(MotionResult {
            linewise: found.linewise,
            ..MotionResult::exclusive(found.pos)
        });
    }
    last.map(MotionResult::jumping)
}

fn find_char_motion(
    buf: &Buffer,
    start: Position,
    search: CharSearch,
    count: usize,
) -> Result<MotionResult> {
    let pos = find_char(buf, start, search, count).ok_or(Error::Boundary)?;
    Ok(if search.forward {
        MotionResult::inclusive(pos)
    } else {
        MotionResult::exclusive(pos)
    })
}

// ---------------------------------------------------------------------------
// Char find
// ---------------------------------------------------------------------------

/// `f`/`t` within the cursor's line. `None` when there are fewer than
/// `count` occurrences.
#[must_use]
pub fn find_char(buf: &Buffer, start: Position, search: CharSearch, count: usize) -> Option<Position> {
    let line: Vec<char> = buf.line_text(start.line).chars().collect();
    let mut col = start.col;
    for _ in 0..count {
        loop {
            col = if search.forward {
                col.checked_add(1).filter(|c| *c < line.len())?
            } else {
                col.checked_sub(1)?
            };
            if line.get(col) == Some(&search.ch) {
                break;
            }
        }
    }
    if search.till {
        col = if search.forward { col - 1 } else { col + 1 };
    }
    Some(start.with_col(col))
}

// ---------------------------------------------------------------------------
// Sentences and paragraphs
// ---------------------------------------------------------------------------

/// True when `lnum` starts a paragraph or section.
///
/// With `section` set only lines starting with that char (`{` or `}`)
/// count; otherwise an empty line does. A form feed always does, and with
/// `both` so does a `}`.
#[must_use]
pub fn starts_para(buf: &Buffer, lnum: usize, section: Option<char>, both: bool) -> bool {
    match buf.first_char(lnum) {
        None => section.is_none(),
        Some(c) => Some(c) == section || c == '\x0c' || (both && c == '}'),
    }
}

/// `(` and `)`: the start of the `count`th sentence from `start`.
///
/// A sentence ends at `.`, `!` or `?` followed (after any closing `)]"'`)
/// by the end of the line or a blank, or with `cpo_j` two spaces. Empty
/// lines and paragraph starts are sentence boundaries too.
#[must_use]
pub fn findsent(
    buf: &Buffer,
    cpo_j: bool,
    start: Position,
    forward: bool,
    count: usize,
) -> Option<Position> {
    // Sentences never classify chars.
    let keywords = Keywords::default();
    let mut cur = Cursor::new(buf, &keywords, start);
    let mut noskip = false;

    for remaining in (0..count).rev() {
        'found: {
            if cur.gchar() == '\n' {
                loop {
                    if cur.incl_decl(forward).is_boundary() || cur.gchar() != '\n' {
                        break;
                    }
                }
                if forward {
                    break 'found;
                }
            } else if forward && cur.pos.col == 0 && starts_para(buf, cur.pos.line, None, false) {
                if cur.on_last_line() {
                    return None;
                }
                cur.pos = Position::new(cur.pos.line + 1, 0);
                break 'found;
            } else if !forward {
                cur.decl();
            }

            // Back to the previous non-blank, skipping a single end mark.
            let mut found_dot = false;
            loop {
                let c = cur.gchar();
                if !(is_white(c) || (!forward && ".!?)]\"'".contains(c))) {
                    break;
                }
                if ".!?".contains(c) {
                    if found_dot {
                        break;
                    }
                    found_dot = true;
                }
                if cur.decl().is_boundary() {
                    break;
                }
                if forward && cur.line_empty() {
                    cur.incl();
                    break 'found;
                }
            }

            let start_line = cur.pos.line;
            loop {
                let c = cur.gchar();
                if c == '\n' || (cur.pos.col == 0 && starts_para(buf, cur.pos.line, None, false)) {
                    if !forward && cur.pos.line != start_line {
                        cur.pos = Position::new(cur.pos.line + 1, 0);
                    }
                    break;
                }
                if matches!(c, '.' | '!' | '?') {
                    if let Some(end) = sentence_end(&cur, cpo_j) {
                        cur.pos = end;
                        if cur.gchar() == '\n' {
                            cur.inc();
                        }
                        break;
                    }
                }
                if cur.incl_decl(forward).is_boundary() {
                    if remaining > 0 {
                        return None;
                    }
                    noskip = true;
                    break;
                }
            }
        }

        while !noskip && cur.is_white() {
            if cur.incl().is_boundary() {
                break;
            }
        }
    }
    Some(cur.pos)
}

/// With the walker on an end mark, the position just past it (and past
/// closing brackets and quotes) if it really ends a sentence.
fn sentence_end(cur: &Cursor<'_>, cpo_j: bool) -> Option<Position> {
    let mut t = *cur;
    let mut c = t.gchar();
    let mut at_end = false;
    loop {
        if t.inc().is_boundary() {
            at_end = true;
            break;
        }
        c = t.gchar();
        if !")]\"'".contains(c) {
            break;
        }
    }
    let ends = at_end
        || (!cpo_j && is_white(c))
        || c == '\n'
        || (cpo_j && c == ' ' && !t.inc().is_boundary() && t.gchar() == ' ');
    ends.then_some(t.pos)
}

/// `{`, `}`, `[[`, `]]`, `[]`, `][`: move `count` paragraphs (or sections
/// when `section` is set) from `line`.
///
/// Lands in column 0, except on the last line of the buffer where it lands
/// on the last char and the motion becomes inclusive.
#[must_use]
pub fn findpar(
    buf: &Buffer,
    line: usize,
    forward: bool,
    count: usize,
    section: Option<char>,
    both: bool,
) -> Option<MotionResult> {
    let last = buf.line_count();
    let mut curr = line;
    for remaining in (0..count).rev() {
        let mut did_skip = false;
        let mut first = true;
        loop {
            if !buf.is_line_empty(curr) {
                did_skip = true;
            }
            if !first && did_skip && starts_para(buf, curr, section, both) {
                break;
            }
            let next = if forward { curr + 1 } else { curr - 1 };
            if next < 1 || next > last {
                if remaining > 0 {
                    return None;
                }
                break;
            }
            curr = next;
            first = false;
        }
    }

    if both && buf.first_char(curr) == Some('}') {
        curr += 1;
    }
    if curr >= last {
        let len = buf.line_len(last);
        if len > 0 {
            return Some(MotionResult::inclusive(Position::new(last, len - 1)));
        }
        return Some(MotionResult::exclusive(Position::new(last, 0)));
    }
    Some(MotionResult::exclusive(Position::new(curr, 0)))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn p(line: usize, col: usize) -> Position {
        Position::new(line, col)
    }

    fn no_search(_: bool, _: usize) -> Result<Position> {
        Err(Error::NoPreviousPattern)
    }

    fn go(lines: &[&str], start: Position, kind: MotionKind, count: usize) -> Result<MotionResult> {
        let b = Buffer::from_lines(lines);
        let mut last = None;
        resolve(&b, &Options::default(), &mut last, start, kind, count, MotionFlags::empty(), no_search)
    }

    fn dest(lines: &[&str], start: Position, kind: MotionKind, count: usize) -> Option<Position> {
        go(lines, start, kind, count).ok().map(|r| r.pos)
    }

    // -- Words ----------------------------------------------------------------

    #[test]
    fn word_motions_dispatch() {
        let lines = ["foo.bar baz"];
        assert_eq!(dest(&lines, p(1, 0), MotionKind::WordForward, 1), Some(p(1, 3)));
        assert_eq!(dest(&lines, p(1, 8), MotionKind::WordBackward, 1), Some(p(1, 4)));
        assert_eq!(dest(&lines, p(1, 0), MotionKind::WordEndForward, 1), Some(p(1, 2)));
        assert_eq!(dest(&lines, p(1, 8), MotionKind::WordEndBackward, 1), Some(p(1, 6)));
    }

    #[test]
    fn big_word_flag() {
        let b = Buffer::from_lines(&["foo.bar baz"]);
        let mut last = None;
        let r = resolve(
            &b,
            &Options::default(),
            &mut last,
            p(1, 0),
            MotionKind::WordForward,
            1,
            MotionFlags::BIG_WORD,
            no_search,
        )
        .unwrap();
        assert_eq!(r.pos, p(1, 8));
        assert!(!r.inclusive);
    }

    #[test]
    fn word_forward_under_operator_keeps_end_of_buffer() {
        let b = Buffer::from_lines(&["foo"]);
        let mut last = None;
        let r = resolve(
            &b,
            &Options::default(),
            &mut last,
            p(1, 0),
            MotionKind::WordForward,
            1,
            MotionFlags::OPERATOR,
            no_search,
        )
        .unwrap();
        assert_eq!(r.pos, p(1, 3));
        assert!(matches!(
            go(&["foo"], p(1, 2), MotionKind::WordForward, 1),
            Err(Error::Boundary)
        ));
    }

    #[test]
    fn word_backward_at_start_fails() {
        assert!(matches!(
            go(&["foo"], p(1, 0), MotionKind::WordBackward, 1),
            Err(Error::Boundary)
        ));
    }

    // -- Sentences ------------------------------------------------------------

    #[test]
    fn sentence_forward_and_backward() {
        let lines = ["Hello there. This is it. Done."];
        assert_eq!(dest(&lines, p(1, 0), MotionKind::SentenceForward, 1), Some(p(1, 13)));
        assert_eq!(dest(&lines, p(1, 0), MotionKind::SentenceForward, 2), Some(p(1, 25)));
        assert_eq!(dest(&lines, p(1, 25), MotionKind::SentenceBackward, 1), Some(p(1, 13)));
        assert_eq!(dest(&lines, p(1, 15), MotionKind::SentenceBackward, 1), Some(p(1, 13)));
        assert_eq!(dest(&lines, p(1, 13), MotionKind::SentenceBackward, 1), Some(p(1, 0)));
    }

    #[test]
    fn sentence_end_needs_trailing_blank() {
        let lines = ["a.b c. d"];
        assert_eq!(dest(&lines, p(1, 0), MotionKind::SentenceForward, 1), Some(p(1, 7)));
    }

    #[test]
    fn sentence_closing_brackets_belong_to_sentence() {
        let lines = ["(Yes.) No."];
        assert_eq!(dest(&lines, p(1, 0), MotionKind::SentenceForward, 1), Some(p(1, 7)));
    }

    #[test]
    fn sentence_two_spaces_with_cpo_j() {
        let b = Buffer::from_lines(&["A. B.  C"]);
        assert_eq!(findsent(&b, true, p(1, 0), true, 1), Some(p(1, 7)));
        assert_eq!(findsent(&b, false, p(1, 0), true, 1), Some(p(1, 3)));
    }

    #[test]
    fn empty_line_is_a_sentence_boundary() {
        let lines = ["one", "", "two"];
        assert_eq!(dest(&lines, p(1, 0), MotionKind::SentenceForward, 1), Some(p(2, 0)));
        assert_eq!(dest(&lines, p(2, 0), MotionKind::SentenceForward, 1), Some(p(3, 0)));
    }

    #[test]
    fn sentence_motion_is_a_jump() {
        let r = go(&["A. B."], p(1, 0), MotionKind::SentenceForward, 1).unwrap();
        assert!(r.jump);
        assert!(!r.inclusive);
    }

    // -- Paragraphs -----------------------------------------------------------

    #[test]
    fn paragraph_forward_stops_at_blank_line() {
        let lines = ["a", "b", "", "c", "d"];
        assert_eq!(dest(&lines, p(1, 0), MotionKind::ParagraphForward, 1), Some(p(3, 0)));
        let last = go(&lines, p(3, 0), MotionKind::ParagraphForward, 1).unwrap();
        assert_eq!(last.pos, p(5, 0));
        assert!(last.inclusive);
    }

    #[test]
    fn paragraph_backward() {
        let lines = ["a", "b", "", "c", "d"];
        assert_eq!(dest(&lines, p(5, 0), MotionKind::ParagraphBackward, 1), Some(p(3, 0)));
        assert_eq!(dest(&lines, p(3, 0), MotionKind::ParagraphBackward, 1), Some(p(1, 0)));
    }

    #[test]
    fn paragraph_count_past_edge_fails() {
        let lines = ["a", "", "b"];
        assert!(go(&lines, p(1, 0), MotionKind::ParagraphForward, 5).is_err());
    }

    #[test]
    fn consecutive_blank_lines_are_one_boundary() {
        let lines = ["a", "", "", "b", "", "c"];
        assert_eq!(dest(&lines, p(2, 0), MotionKind::ParagraphForward, 1), Some(p(5, 0)));
    }

    // -- Sections -------------------------------------------------------------

    #[test]
    fn sections_stop_at_braces_in_column_zero() {
        let lines = ["int f()", "{", "  x", "}", "", "{", "}", "end"];
        let fwd = MotionKind::SectionForward { end: false };
        assert_eq!(dest(&lines, p(1, 0), fwd, 1), Some(p(2, 0)));
        assert_eq!(dest(&lines, p(2, 0), fwd, 1), Some(p(6, 0)));
        let end = MotionKind::SectionForward { end: true };
        assert_eq!(dest(&lines, p(2, 0), end, 1), Some(p(4, 0)));
        let back = MotionKind::SectionBackward { end: false };
        assert_eq!(dest(&lines, p(8, 0), back, 1), Some(p(6, 0)));
    }

    // -- Char find ------------------------------------------------------------

    #[test]
    fn find_and_till() {
        let lines = ["a,b,c,d"];
        let f = |ch, forward, till| MotionKind::FindChar { ch, forward, till };
        assert_eq!(dest(&lines, p(1, 0), f(',', true, false), 1), Some(p(1, 1)));
        assert_eq!(dest(&lines, p(1, 0), f(',', true, false), 2), Some(p(1, 3)));
        assert_eq!(dest(&lines, p(1, 0), f(',', true, true), 2), Some(p(1, 2)));
        assert_eq!(dest(&lines, p(1, 6), f(',', false, false), 1), Some(p(1, 5)));
        assert_eq!(dest(&lines, p(1, 6), f(',', false, true), 1), Some(p(1, 6)));
        assert_eq!(dest(&lines, p(1, 0), f('z', true, false), 1), None);
    }

    #[test]
    fn repeat_find_remembers_and_reverses() {
        let b = Buffer::from_lines(&["a,b,c,d"]);
        let o = Options::default();
        let mut last = None;
        let run = |last: &mut Option<CharSearch>, pos, kind| {
            resolve(&b, &o, last, pos, kind, 1, MotionFlags::empty(), no_search).map(|r| r.pos)
        };
        let kind = MotionKind::RepeatFindChar { reverse: false };
        assert!(run(&mut last, p(1, 0), kind).is_err());
        let first = run(&mut last, p(1, 0), MotionKind::FindChar { ch: ',', forward: true, till: false });
        assert_eq!(first.unwrap(), p(1, 1));
        assert_eq!(run(&mut last, p(1, 1), kind).unwrap(), p(1, 3));
        let back = MotionKind::RepeatFindChar { reverse: true };
        assert_eq!(run(&mut last, p(1, 3), back).unwrap(), p(1, 1));
    }

    #[test]
    fn find_forward_is_inclusive() {
        let r = go(&["abc"], p(1, 0), MotionKind::FindChar { ch: 'c', forward: true, till: false }, 1);
        assert!(r.unwrap().inclusive);
        let r = go(&["abc"], p(1, 2), MotionKind::FindChar { ch: 'a', forward: false, till: false }, 1);
        assert!(!r.unwrap().inclusive);
    }

    // -- Brackets -------------------------------------------------------------

    #[test]
    fn percent_is_inclusive_jump() {
        let r = go(&["(a)"], p(1, 0), MotionKind::MatchPair, 1).unwrap();
        assert_eq!(r.pos, p(1, 2));
        assert!(r.inclusive && r.jump);
        assert!(matches!(
            go(&["abc"], p(1, 0), MotionKind::MatchPair, 1),
            Err(Error::UnmatchedDelimiter('a'))
        ));
    }

    #[test]
    fn unmatched_brackets_with_count() {
        let lines = ["((a) (b c))"];
        assert_eq!(dest(&lines, p(1, 7), MotionKind::UnmatchedOpen('('), 1), Some(p(1, 5)));
        assert_eq!(dest(&lines, p(1, 7), MotionKind::UnmatchedOpen('('), 2), Some(p(1, 0)));
        // A count beyond the outermost pair keeps the last one found.
        assert_eq!(dest(&lines, p(1, 7), MotionKind::UnmatchedOpen('('), 5), Some(p(1, 0)));
        assert_eq!(dest(&lines, p(1, 7), MotionKind::UnmatchedClose(')'), 1), Some(p(1, 9)));
        // Either half names the pair.
        assert_eq!(dest(&lines, p(1, 7), MotionKind::UnmatchedClose('('), 1), Some(p(1, 9)));
    }

    #[test]
    fn search_next_delegates() {
        let b = Buffer::from_lines(&["abc"]);
        let mut last = None;
        let r = resolve(
            &b,
            &Options::default(),
            &mut last,
            p(1, 0),
            MotionKind::SearchNext { reverse: true },
            2,
            MotionFlags::empty(),
            |reverse, count| {
                assert!(reverse);
                assert_eq!(count, 2);
                Ok(p(1, 2))
            },
        )
        .unwrap();
        assert_eq!(r.pos, p(1, 2));
        assert!(r.jump);
    }
}
