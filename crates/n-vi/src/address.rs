//! Ex command ranges.
//!
//! The range in front of an Ex command (`:3,5d`, `:'a,'bs/x/y/`,
//! `:/begin/+1;/end/-1y`) is a list of addresses separated by `,` or `;`.
//! Each address is a base followed by any number of offsets:
//!
//! | Base        | Line                                                |
//! |-------------|-----------------------------------------------------|
//! | `.`         | the cursor line                                     |
//! | `$`         | the last line                                       |
//! | `N`         | line `N` (0 means "before the first line")          |
//! | `'x`        | the line of mark `x`                                |
//! | `/pat/`     | next line matching `pat`                            |
//! | `?pat?`     | previous line matching `pat`                        |
//! | `\/` `\?`   | next / previous match of the last search pattern    |
//! | `\&`        | next match of the last substitute pattern           |
//! | `%`         | the whole buffer (`1,$`)                            |
//!
//! Offsets are `+N`, `-N` or a bare `N` (meaning `+N`); `+` and `-`
//! alone count 1. An offset with no base applies to the cursor line.
//! After `;` the cursor line becomes the previous address for the rest of
//! the range.

use tracing::debug;

use crate::buffer::Buffer;
use crate::error::{Error, Result};
use crate::mark::MarkTable;
use crate::options::Options;
use crate::pattern::UseSlot;
use crate::position::Position;
use crate::search::{Direction, SearchFlags, SearchState};

/// The question asked before swapping a backwards range.
pub const SWAP_PROMPT: &str = "Backwards range given, OK to swap (y/n)?";

/// A resolved range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressRange<'a> {
    pub line1: usize,
    pub line2: usize,
    /// Addresses given: 0 (none, both lines are the cursor line), 1, or 2
    /// and more. `%` counts as two.
    pub addr_count: usize,
    /// The command text after the range.
    pub rest: &'a str,
}

/// What to do when the range ends before it starts.
pub enum SwapPolicy<'a> {
    /// Swap silently. Scripts and other non-interactive callers.
    AutoSwap,
    /// Fail with [`Error::RangeInverted`].
    Refuse,
    /// Ask the user; the callback gets [`SWAP_PROMPT`] and answers yes or
    /// no.
    Ask(&'a mut dyn FnMut(&str) -> bool),
}

impl std::fmt::Debug for SwapPolicy<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AutoSwap => f.write_str("AutoSwap"),
            Self::Refuse => f.write_str("Refuse"),
            Self::Ask(_) => f.write_str("Ask(..)"),
        }
    }
}

/// What range resolution reads, and the search state `/pat/` updates.
pub struct AddressEnv<'a> {
    pub buf: &'a Buffer,
    pub opts: &'a Options,
    pub marks: &'a MarkTable,
    pub search: &'a mut SearchState,
    pub cursor: Position,
}

// ---------------------------------------------------------------------------
// Range
// ---------------------------------------------------------------------------

/// Resolve the range at the start of `input`.
///
/// # Errors
///
/// [`Error::BadAddressSyntax`] for a malformed address, mark errors for
/// `'x`, search errors for `/pat/` and friends, [`Error::InvalidRange`]
/// when a line is past the end of the buffer, and
/// [`Error::RangeInverted`] when a backwards range is not swapped.
pub fn parse_range<'t>(
    env: &mut AddressEnv<'_>,
    input: &'t str,
    policy: SwapPolicy<'_>,
) -> Result<AddressRange<'t>> {
    let last = env.buf.line_count();
    let mut cur_line = env.cursor.line;
    let mut rest = input;
    let mut line1;
    let mut line2 = to_signed(cur_line);
    let mut addr_count = 0;
    let mut given;

    loop {
        line1 = line2;
        line2 = to_signed(cur_line);
        let (lnum, after) = get_address(env, cur_line, rest)?;
        rest = after;
        given = lnum.is_some();
        match lnum {
            Some(n) => line2 = n,
            None => {
                if let Some(after) = rest.strip_prefix('%') {
                    rest = after;
                    line1 = 1;
                    line2 = to_signed(last);
                    addr_count += 1;
                }
            }
        }
        addr_count += 1;

        if let Some(after) = rest.strip_prefix(';') {
            cur_line = checked_line(line2, last)?.max(1);
            rest = after;
        } else if let Some(after) = rest.strip_prefix(',') {
            rest = after;
        } else {
            break;
        }
    }

    if addr_count == 1 {
        line1 = line2;
        if !given {
            addr_count = 0;
        }
    }

    let mut line1 = checked_line(line1, last)?;
    let mut line2 = checked_line(line2, last)?;
    if line1 > line2 {
        let swap = match policy {
            SwapPolicy::AutoSwap => true,
            SwapPolicy::Refuse => false,
            SwapPolicy::Ask(ask) => ask(SWAP_PROMPT),
        };
        if !swap {
            return Err(Error::RangeInverted { line1, line2 });
        }
        std::mem::swap(&mut line1, &mut line2);
    }

    debug!(line1, line2, addr_count, "range resolved");
    Ok(AddressRange {
        line1,
        line2,
        addr_count,
        rest,
    })
}

// ---------------------------------------------------------------------------
// Single address
// ---------------------------------------------------------------------------

/// One address: a base, its offsets, and any searches chained onto it
/// (`/a//b/` finds `b` after `a`). `None` when the text holds no address.
fn get_address<'t>(
    env: &mut AddressEnv<'_>,
    cur_line: usize,
    input: &'t str,
) -> Result<(Option<isize>, &'t str)> {
    let last = env.buf.line_count();
    let mut s = input.trim_start();
    let mut lnum: Option<isize> = None;

    loop {
        match s.chars().next() {
            Some('.') => {
                s = &s[1..];
                lnum = Some(to_signed(cur_line));
            }
            Some('$') => {
                s = &s[1..];
                lnum = Some(to_signed(last));
            }
            Some('\'') => {
                let mut chars = s[1..].chars();
                let Some(name) = chars.next() else {
                    return Err(Error::BadAddressSyntax(input.to_string()));
                };
                s = chars.as_str();
                lnum = Some(to_signed(env.marks.check(name, env.buf)?.line));
            }
            Some(c @ ('/' | '?')) => {
                let dir = if c == '/' { Direction::Forward } else { Direction::Backward };
                let start = search_start(env.buf, lnum.map_or(cur_line, |n| clamp_line(n, last)), dir);
                let mv = env
                    .search
                    .do_search(env.buf, env.opts, start, Some(dir), &s[1..], 1, SearchFlags::HIS)?;
                s = &s[1 + mv.consumed..];
                lnum = Some(to_signed(mv.pos.line));
            }
            Some('\\') => {
                let (slot, dir) = match s[1..].chars().next() {
                    Some('/') => (UseSlot::Search, Direction::Forward),
                    Some('?') => (UseSlot::Search, Direction::Backward),
                    Some('&') => (UseSlot::Substitute, Direction::Forward),
                    _ => return Err(Error::BadAddressSyntax(input.to_string())),
                };
                let start = search_start(env.buf, lnum.map_or(cur_line, |n| clamp_line(n, last)), dir);
                let hit = env.search.searchit_slot(
                    env.buf,
                    env.opts,
                    start,
                    dir,
                    "",
                    slot,
                    1,
                    SearchFlags::KEEP,
                )?;
                s = &s[2..];
                lnum = Some(to_signed(hit.pos.line));
            }
            Some(c) if c.is_ascii_digit() => {
                if let Some((n, after)) = parse_number(s) {
                    lnum = Some(n);
                    s = after;
                }
            }
            _ => {}
        }

        loop {
            s = s.trim_start();
            let Some(c) = s.chars().next() else { break };
            if c != '+' && c != '-' && !c.is_ascii_digit() {
                break;
            }
            let base = lnum.unwrap_or_else(|| to_signed(cur_line));
            let (minus, after) = match c {
                '+' => (false, &s[1..]),
                '-' => (true, &s[1..]),
                _ => (false, s),
            };
            let (n, after) = parse_number(after).unwrap_or((1, after));
            s = after;
            lnum = Some(if minus { base.saturating_sub(n) } else { base.saturating_add(n) });
        }

        if !(s.starts_with('/') || s.starts_with('?')) {
            break;
        }
    }
    Ok((lnum, s))
}

/// Forward searches start at the end of the line and backward ones at its
/// start, so the line itself never matches.
fn search_start(buf: &Buffer, line: usize, dir: Direction) -> Position {
    match dir {
        Direction::Forward => Position::new(line, buf.line_len(line)),
        Direction::Backward => Position::new(line, 0),
    }
}

/// Leading digits of `input` and the text after them.
fn parse_number(input: &str) -> Option<(isize, &str)> {
    let end = input.find(|c: char| !c.is_ascii_digit()).unwrap_or(input.len());
    if end == 0 {
        return None;
    }
    let n = input[..end].parse().unwrap_or(isize::MAX);
    Some((n, &input[end..]))
}

fn checked_line(n: isize, last: usize) -> Result<usize> {
    usize::try_from(n)
        .ok()
        .filter(|&line| line <= last)
        .ok_or(Error::InvalidRange)
}

fn clamp_line(n: isize, last: usize) -> usize {
    usize::try_from(n).unwrap_or(0).clamp(1, last)
}

fn to_signed(line: usize) -> isize {
    isize::try_from(line).unwrap_or(isize::MAX)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const LINES: [&str; 7] = ["alpha", "beta", "gamma", "alpha", "delta", "", "omega"];

    struct Fixture {
        buf: Buffer,
        opts: Options,
        marks: MarkTable,
        search: SearchState,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                buf: Buffer::from_lines(&LINES),
                opts: Options::default(),
                marks: MarkTable::default(),
                search: SearchState::new(),
            }
        }

        fn range<'t>(&mut self, cursor: usize, input: &'t str) -> Result<AddressRange<'t>> {
            self.range_with(cursor, input, SwapPolicy::AutoSwap)
        }

        fn range_with<'t>(
            &mut self,
            cursor: usize,
            input: &'t str,
            policy: SwapPolicy<'_>,
        ) -> Result<AddressRange<'t>> {
            let mut env = AddressEnv {
                buf: &self.buf,
                opts: &self.opts,
                marks: &self.marks,
                search: &mut self.search,
                cursor: Position::new(cursor, 0),
            };
            parse_range(&mut env, input, policy)
        }

        fn lines(&mut self, cursor: usize, input: &str) -> (usize, usize, usize) {
            let r = self.range(cursor, input).unwrap();
            (r.line1, r.line2, r.addr_count)
        }
    }

    // -- Plain addresses ----------------------------------------------------

    #[test]
    fn no_address_is_cursor_line() {
        let mut f = Fixture::new();
        let r = f.range(3, "d").unwrap();
        assert_eq!((r.line1, r.line2, r.addr_count, r.rest), (3, 3, 0, "d"));
    }

    #[test]
    fn dot_dollar_and_numbers() {
        let mut f = Fixture::new();
        assert_eq!(f.lines(2, "."), (2, 2, 1));
        assert_eq!(f.lines(2, "$"), (7, 7, 1));
        assert_eq!(f.lines(2, "3,5"), (3, 5, 2));
        assert_eq!(f.lines(2, " 3 , 5 "), (3, 5, 2));
    }

    #[test]
    fn percent_is_whole_buffer() {
        let mut f = Fixture::new();
        let r = f.range(4, "%s/a/b/").unwrap();
        assert_eq!((r.line1, r.line2, r.addr_count, r.rest), (1, 7, 2, "s/a/b/"));
    }

    #[test]
    fn rest_is_command_tail() {
        let mut f = Fixture::new();
        assert_eq!(f.range(1, "2,4yank").unwrap().rest, "yank");
    }

    // -- Offsets ------------------------------------------------------------

    #[test]
    fn offsets_apply_to_base_or_cursor() {
        let mut f = Fixture::new();
        assert_eq!(f.lines(2, ".+2"), (4, 4, 1));
        assert_eq!(f.lines(2, "+"), (3, 3, 1));
        assert_eq!(f.lines(4, "-"), (3, 3, 1));
        assert_eq!(f.lines(4, "--"), (2, 2, 1));
        assert_eq!(f.lines(2, ".3"), (5, 5, 1));
        assert_eq!(f.lines(2, "$-1"), (6, 6, 1));
        assert_eq!(f.lines(1, "+0"), (1, 1, 1));
    }

    #[test]
    fn missing_address_after_comma_is_cursor_line() {
        let mut f = Fixture::new();
        assert_eq!(f.lines(2, ",5"), (2, 5, 2));
        assert_eq!(f.lines(2, "4,"), (2, 4, 2));
    }

    // -- Separators ---------------------------------------------------------

    #[test]
    fn semicolon_moves_cursor_for_next_address() {
        let mut f = Fixture::new();
        assert_eq!(f.lines(1, "3;+2"), (3, 5, 2));
        assert_eq!(f.lines(1, "3,+2"), (3, 3, 2));
    }

    // -- Marks --------------------------------------------------------------

    #[test]
    fn mark_addresses() {
        let mut f = Fixture::new();
        f.marks.set('a', Position::new(2, 1), Position::START, &f.buf).unwrap();
        f.marks.set('b', Position::new(5, 0), Position::START, &f.buf).unwrap();
        assert_eq!(f.lines(1, "'a,'b"), (2, 5, 2));
        assert_eq!(f.lines(1, "'a+1"), (3, 3, 1));
    }

    #[test]
    fn unset_mark_fails() {
        let mut f = Fixture::new();
        assert!(matches!(f.range(1, "'z"), Err(Error::MarkNotSet('z'))));
    }

    #[test]
    fn quote_without_name_is_bad_syntax() {
        let mut f = Fixture::new();
        assert!(matches!(f.range(1, "'"), Err(Error::BadAddressSyntax(_))));
    }

    // -- Searches -----------------------------------------------------------

    #[test]
    fn forward_search_skips_current_line() {
        let mut f = Fixture::new();
        assert_eq!(f.lines(1, "/alpha/"), (4, 4, 1));
        assert_eq!(f.search.last_pattern(), Some("alpha"));
    }

    #[test]
    fn backward_search_skips_current_line() {
        let mut f = Fixture::new();
        assert_eq!(f.lines(4, "?alpha?"), (1, 1, 1));
    }

    #[test]
    fn search_with_line_offset() {
        let mut f = Fixture::new();
        assert_eq!(f.lines(1, "/gamma/+1"), (4, 4, 1));
    }

    #[test]
    fn chained_searches_start_from_previous_match() {
        let mut f = Fixture::new();
        assert_eq!(f.lines(1, "/alpha//delta/"), (5, 5, 1));
    }

    #[test]
    fn search_range_and_command_tail() {
        let mut f = Fixture::new();
        let r = f.range(1, "/beta/,/delta/d").unwrap();
        assert_eq!((r.line1, r.line2, r.rest), (2, 5, "d"));
    }

    #[test]
    fn repeat_last_search_pattern() {
        let mut f = Fixture::new();
        f.range(1, "/alpha/").unwrap();
        assert_eq!(f.lines(2, "\\/"), (4, 4, 1));
        assert_eq!(f.lines(4, "\\?"), (1, 1, 1));
    }

    #[test]
    fn repeat_substitute_pattern() {
        let mut f = Fixture::new();
        assert!(matches!(f.range(1, "\\&"), Err(Error::NoPreviousSubstitute)));
        f.search.set_substitute_pattern("delta", &f.opts).unwrap();
        assert_eq!(f.lines(1, "\\&"), (5, 5, 1));
    }

    #[test]
    fn backslash_needs_search_char() {
        let mut f = Fixture::new();
        assert!(matches!(f.range(1, "\\x"), Err(Error::BadAddressSyntax(_))));
    }

    #[test]
    fn failed_search_is_an_error() {
        let mut f = Fixture::new();
        assert!(matches!(f.range(1, "/zeta/"), Err(Error::NoMatch { .. })));
    }

    // -- Validation ---------------------------------------------------------

    #[test]
    fn line_past_end_is_invalid() {
        let mut f = Fixture::new();
        assert!(matches!(f.range(1, "20"), Err(Error::InvalidRange)));
        assert!(matches!(f.range(1, "1,$+1"), Err(Error::InvalidRange)));
        assert!(matches!(f.range(1, "-5"), Err(Error::InvalidRange)));
    }

    #[test]
    fn line_zero_is_allowed() {
        let mut f = Fixture::new();
        assert_eq!(f.lines(3, "0"), (0, 0, 1));
    }

    #[test]
    fn backwards_range_policies() {
        let mut f = Fixture::new();
        assert_eq!(f.lines(1, "5,3"), (3, 5, 2));

        assert!(matches!(
            f.range_with(1, "5,3", SwapPolicy::Refuse),
            Err(Error::RangeInverted { line1: 5, line2: 3 })
        ));

        let mut asked = Vec::new();
        let mut yes = |q: &str| {
            asked.push(q.to_string());
            true
        };
        let r = f.range_with(1, "5,3", SwapPolicy::Ask(&mut yes)).unwrap();
        assert_eq!((r.line1, r.line2), (3, 5));
        assert_eq!(asked, vec![SWAP_PROMPT.to_string()]);

        let mut no = |_: &str| false;
        assert!(f.range_with(1, "5,3", SwapPolicy::Ask(&mut no)).is_err());
    }
}
