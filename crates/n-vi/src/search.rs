//! Pattern search over the buffer.
//!
//! [`search_regex`] is the scanner: it walks the buffer line by line in
//! either direction, starting strictly after (or before) the start
//! position unless [`SearchFlags::START`] is given, and wraps around the
//! buffer once when `wrapscan` is on. A backward scan takes the last
//! qualifying match on a line, not the first.
//!
//! [`SearchState`] layers the vi commands on top: it owns the remembered
//! patterns, the direction and the search offset used by `n`/`N`, and
//! turns `/pat/e+1` style input into a destination. [`search_pair`] is the
//! nesting-aware pair search used by the tag-block object.

use bitflags::bitflags;
use regex::Regex;
use tracing::{debug, trace};

use crate::buffer::Buffer;
use crate::error::{Error, MissReason, Result};
use crate::options::Options;
use crate::pattern::{self, CompileRequest, Patterns, SaveTo, UseSlot};
use crate::position::Position;
use crate::step::{self, Step};

// ---------------------------------------------------------------------------
// Direction
// ---------------------------------------------------------------------------

/// Search direction.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum Direction {
    #[default]
    Forward,
    Backward,
}

impl Direction {
    /// The opposite direction.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Forward => Self::Backward,
            Self::Backward => Self::Forward,
        }
    }

    /// The command char: `/` or `?`.
    #[must_use]
    pub const fn as_char(self) -> char {
        match self {
            Self::Forward => '/',
            Self::Backward => '?',
        }
    }

    #[must_use]
    pub const fn from_char(c: char) -> Option<Self> {
        match c {
            '/' => Some(Self::Forward),
            '?' => Some(Self::Backward),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_forward(self) -> bool {
        matches!(self, Self::Forward)
    }
}

bitflags! {
    /// Modifiers for [`SearchState::searchit`] and [`SearchState::do_search`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct SearchFlags: u16 {
        /// Accept a match at the start position.
        const START = 1 << 0;
        /// Land on the last char of the match.
        const END = 1 << 1;
        /// Report misses and wraparound to the message sink.
        const MSG = 1 << 2;
        /// Do not replace the remembered pattern, offset or direction.
        const KEEP = 1 << 3;
        /// Record the pattern in the history.
        const HIS = 1 << 4;
        /// Ignore the search offset.
        const NOOF = 1 << 5;
        /// Only look, the caller may discard the result.
        const PEEK = 1 << 6;
        /// Set the previous-context mark before moving.
        const MARK = 1 << 7;
        /// Parse a `/pattern/offset` tail.
        const OPT = 1 << 8;
        /// Echo the command line.
        const ECHO = 1 << 9;
        /// Reverse the remembered direction.
        const REV = 1 << 10;
        /// The pattern is already in `regex` syntax.
        const CLEAN = 1 << 11;
    }
}

/// The option values a scan depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanOptions {
    pub wrapscan: bool,
    /// Continue after the end of a rejected match instead of its start.
    pub cpo_search: bool,
}

impl From<&Options> for ScanOptions {
    fn from(opts: &Options) -> Self {
        Self {
            wrapscan: opts.wrapscan,
            cpo_search: opts.cpo_search,
        }
    }
}

/// A match found by [`search_regex`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchHit {
    /// Where the cursor goes: the match start, or its last char with
    /// [`SearchFlags::END`].
    pub pos: Position,
    /// Length of the match in chars.
    pub len: usize,
    /// First capture group (1-9) that took part in the match, 0 if none.
    pub submatch: usize,
    /// The scan wrapped around the end of the buffer.
    pub wrapped: bool,
}

// ---------------------------------------------------------------------------
// Scanner
// ---------------------------------------------------------------------------

/// One line of text prepared for matching.
struct LineText {
    text: String,
    /// Byte offset of every char, plus the end.
    starts: Vec<usize>,
    /// Column of the newline slot.
    eol: usize,
}

impl LineText {
    fn new(buf: &Buffer, line: usize) -> Self {
        let text = buf.line_segment(line);
        let mut starts: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
        starts.push(text.len());
        Self {
            eol: buf.line_len(line),
            text,
            starts,
        }
    }

    fn byte(&self, col: usize) -> usize {
        self.starts[col.min(self.starts.len() - 1)]
    }

    fn col(&self, byte: usize) -> usize {
        self.starts.partition_point(|&b| b < byte)
    }

    /// First match starting at or after `col`.
    fn find(&self, regex: &Regex, col: usize) -> Option<LineMatch> {
        let caps = regex.captures_at(&self.text, self.byte(col))?;
        let whole = caps.get(0)?;
        let start = self.col(whole.start());
        // Only the empty match after the final newline can start here.
        if start > self.eol {
            return None;
        }
        let submatch = (1..caps.len().min(10))
            .find(|&i| caps.get(i).is_some())
            .unwrap_or(0);
        Some(LineMatch {
            start,
            end: self.col(whole.end()),
            submatch,
        })
    }
}

#[derive(Debug, Clone, Copy)]
struct LineMatch {
    start: usize,
    end: usize,
    submatch: usize,
}

/// Where a scan starts and what it accepts.
struct Scan<'a> {
    buf: &'a Buffer,
    regex: &'a Regex,
    from: Position,
    forward: bool,
    extra: usize,
    end: bool,
    cpo_search: bool,
}

impl Scan<'_> {
    /// Column to retry from after rejecting `m`, `None` to give up on the
    /// line.
    fn next_col(&self, line: &LineText, m: LineMatch) -> Option<usize> {
        let mut col = if self.cpo_search {
            if m.end > line.eol {
                return None;
            }
            m.end
        } else {
            m.start
        };
        if (!self.cpo_search || col == m.start) && col < line.eol {
            col += 1;
        }
        (col < line.eol).then_some(col)
    }

    /// A forward match on the start line lies before the start position.
    /// A match on the newline slot counts one column back so that `/$`
    /// moves on.
    fn before_start(&self, line: &LineText, m: LineMatch) -> bool {
        if self.end {
            m.end <= line.eol && m.end < self.from.col + self.extra + 1
        } else {
            m.start < self.from.col + self.extra + usize::from(m.start >= line.eol)
        }
    }

    /// A backward match on or before the start line lies before the start
    /// position.
    fn before_cursor(&self, lnum: usize, line: &LineText, m: LineMatch) -> bool {
        if self.end {
            let (eline, ecol) = if m.end > line.eol {
                (lnum + 1, 0)
            } else {
                (lnum, m.end)
            };
            eline < self.from.line
                || (eline == self.from.line && ecol + self.extra <= self.from.col + 1)
        } else {
            lnum < self.from.line || (lnum == self.from.line && m.start + self.extra <= self.from.col)
        }
    }

    fn line(&self, lnum: usize, at_first_line: bool, wrapped_lap: bool) -> Option<LineMatch> {
        let line = LineText::new(self.buf, lnum);
        let mut m = line.find(self.regex, 0)?;
        if self.forward {
            if at_first_line {
                while self.before_start(&line, m) {
                    let col = self.next_col(&line, m)?;
                    m = line.find(self.regex, col)?;
                }
            }
            return Some(m);
        }

        let mut best = None;
        loop {
            if !wrapped_lap && !self.before_cursor(lnum, &line, m) {
                break;
            }
            best = Some(m);
            let Some(col) = self.next_col(&line, m) else {
                break;
            };
            match line.find(self.regex, col) {
                Some(next) => m = next,
                None => break,
            }
        }
        best
    }
}

/// Scan for `regex` `count` times from `start`.
///
/// # Errors
///
/// The [`MissReason`] when no match was found: `NotFound` after a full
/// wrapped scan, `HitTop` / `HitBottom` with `wrapscan` off.
pub fn search_regex(
    buf: &Buffer,
    regex: &Regex,
    start: Position,
    dir: Direction,
    count: usize,
    flags: SearchFlags,
    opts: ScanOptions,
) -> std::result::Result<SearchHit, MissReason> {
    let forward = dir.is_forward();
    let last_line = buf.line_count();
    let mut pos = start;
    let mut wrapped = false;
    let mut found = None;

    for _ in 0..count.max(1) {
        let scan = Scan {
            buf,
            regex,
            from: pos,
            forward,
            extra: usize::from(!flags.contains(SearchFlags::START)),
            end: flags.contains(SearchFlags::END),
            cpo_search: opts.cpo_search,
        };
        let mut lnum = pos.line;
        let mut at_first_line = true;
        if !forward && pos.col == 0 {
            lnum = pos.line - 1;
            at_first_line = false;
        }

        let mut hit = None;
        for lap in 0..2 {
            while lnum >= 1 && lnum <= last_line {
                if let Some(m) = scan.line(lnum, at_first_line, lap == 1) {
                    hit = Some((lnum, m));
                    break;
                }
                if lap == 1 && lnum == pos.line {
                    break;
                }
                at_first_line = false;
                lnum = if forward { lnum + 1 } else { lnum - 1 };
            }
            at_first_line = false;
            if hit.is_some() || !opts.wrapscan || lap == 1 {
                break;
            }
            lnum = if forward { 1 } else { last_line };
            wrapped = true;
            debug!(?dir, "search wrapped");
        }

        let Some((lnum, m)) = hit else {
            let reason = if opts.wrapscan {
                MissReason::NotFound
            } else if lnum == 0 {
                MissReason::HitTop
            } else {
                MissReason::HitBottom
            };
            trace!(?start, ?reason, "search missed");
            return Err(reason);
        };

        let len = m.end - m.start;
        let mut at = if scan.end && !flags.contains(SearchFlags::NOOF) && len > 0 {
            Position::new(lnum, m.end - 1)
        } else {
            Position::new(lnum, m.start)
        };
        if len == 0 {
            at = buf.clamp(at, false);
        }
        pos = at;
        found = Some(SearchHit {
            pos: at,
            len,
            submatch: m.submatch,
            wrapped: false,
        });
    }

    let hit = found.map(|h| SearchHit { wrapped, ..h });
    trace!(?start, ?hit, "search done");
    hit.ok_or(MissReason::NotFound)
}

// ---------------------------------------------------------------------------
// Search offsets
// ---------------------------------------------------------------------------

/// The `/pattern/offset` tail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SearchOffset {
    /// `[+-]N`: lines below or above the match.
    pub line: bool,
    /// `e[+-N]`: relative to the match end.
    pub end: bool,
    pub off: isize,
}

impl SearchOffset {
    /// Parse an offset at the start of `text`. Character offsets
    /// (`e`, `s`, `b`) are only recognized with `chars`. Returns the
    /// offset and the number of bytes consumed.
    #[must_use]
    pub fn parse(text: &str, chars: bool) -> (Self, usize) {
        let bytes = text.as_bytes();
        let mut i = 0;
        let mut offset = Self::default();
        match bytes.first() {
            Some(b'+' | b'-' | b'0'..=b'9') => offset.line = true,
            Some(b'e' | b's' | b'b') if chars => {
                offset.end = bytes[0] == b'e';
                i = 1;
            }
            _ => {}
        }
        let sign = match bytes.get(i) {
            Some(b'+') => Some(1),
            Some(b'-') => Some(-1),
            Some(b'0'..=b'9') => None,
            _ => return (offset, i),
        };
        if sign.is_some() {
            i += 1;
        }
        let digits = bytes[i..].iter().take_while(|b| b.is_ascii_digit()).count();
        let n = text[i..i + digits].parse::<isize>().unwrap_or(1);
        offset.off = sign.unwrap_or(1) * if digits == 0 { 1 } else { n };
        (offset, i + digits)
    }

    const fn moves_chars(self) -> bool {
        !self.line && self.off != 0
    }
}

/// Where a pattern ends in `/pattern/offset` input: the first `dirc` not
/// escaped by a backslash.
fn split_pattern(input: &str, dirc: char) -> (&str, Option<&str>) {
    let mut escaped = false;
    for (i, c) in input.char_indices() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == dirc {
            return (&input[..i], Some(&input[i + c.len_utf8()..]));
        }
    }
    (input, None)
}

/// Result of [`SearchState::do_search`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchMove {
    pub pos: Position,
    /// Length of the match in chars.
    pub len: usize,
    /// A line offset was applied.
    pub linewise: bool,
    /// An end offset makes the motion include the landing char.
    pub inclusive: bool,
    pub wrapped: bool,
    /// Bytes of the input consumed by the pattern and its offset.
    pub consumed: usize,
    /// The pattern searched for, as typed.
    pub pattern: String,
    pub direction: Direction,
}

// ---------------------------------------------------------------------------
// SearchState
// ---------------------------------------------------------------------------

/// Remembered search state: patterns, direction and offset.
#[derive(Debug, Default)]
pub struct SearchState {
    patterns: Patterns,
    direction: Direction,
    offset: SearchOffset,
}

impl SearchState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile `pattern` (empty reuses the last one) and scan for it.
    ///
    /// # Errors
    ///
    /// Pattern errors from [`Patterns::compile`] and [`Error::NoMatch`].
    #[allow(clippy::too_many_arguments)]
    pub fn searchit(
        &mut self,
        buf: &Buffer,
        opts: &Options,
        start: Position,
        dir: Direction,
        pattern: &str,
        count: usize,
        flags: SearchFlags,
    ) -> Result<SearchHit> {
        self.searchit_slot(buf, opts, start, dir, pattern, UseSlot::Last, count, flags)
    }

    /// As [`searchit`](Self::searchit), with an explicit choice of which
    /// remembered pattern an empty `pattern` reuses (`\/`, `\?` and `\&`
    /// in ranges).
    ///
    /// # Errors
    ///
    /// As [`SearchState::searchit`].
    #[allow(clippy::too_many_arguments)]
    pub fn searchit_slot(
        &mut self,
        buf: &Buffer,
        opts: &Options,
        start: Position,
        dir: Direction,
        pattern: &str,
        use_slot: UseSlot,
        count: usize,
        flags: SearchFlags,
    ) -> Result<SearchHit> {
        let compiled = self.patterns.compile(
            CompileRequest {
                pattern,
                save: SaveTo::Search,
                use_slot,
                keep: flags.contains(SearchFlags::KEEP),
                clean: flags.contains(SearchFlags::CLEAN),
                history: flags.contains(SearchFlags::HIS),
            },
            opts,
        )?;
        debug!(pattern = %compiled.raw, ?dir, ?start, count, "searchit");
        search_regex(buf, &compiled.regex, start, dir, count, flags, ScanOptions::from(opts)).map_err(
            |reason| Error::NoMatch {
                pattern: compiled.raw.clone(),
                reason,
            },
        )
    }

    /// The `/` and `?` commands, and `n`/`N` with an empty `input`.
    ///
    /// `dir` of `None` reuses the remembered direction; `Some` replaces
    /// it. `input` is the text after the command char: a pattern,
    /// optionally closed by the command char and followed by an offset.
    /// An empty pattern reuses the last one along with its offset.
    ///
    /// # Errors
    ///
    /// As [`SearchState::searchit`].
    #[allow(clippy::too_many_arguments)]
    pub fn do_search(
        &mut self,
        buf: &Buffer,
        opts: &Options,
        start: Position,
        dir: Option<Direction>,
        input: &str,
        count: usize,
        flags: SearchFlags,
    ) -> Result<SearchMove> {
        let saved_direction = self.direction;
        let mut direction = match dir {
            Some(d) => {
                self.direction = d;
                d
            }
            None => self.direction,
        };
        if flags.contains(SearchFlags::REV) {
            direction = direction.opposite();
        }

        let saved_offset = self.offset;
        let dirc = self.direction.as_char();
        let (pattern, tail) = split_pattern(input, dirc);
        let mut consumed = pattern.len();
        if !input.is_empty() {
            self.offset = SearchOffset::default();
            if let Some(tail) = tail {
                let (offset, used) = SearchOffset::parse(tail, flags.contains(SearchFlags::OPT));
                self.offset = offset;
                consumed += dirc.len_utf8() + used;
            }
        }
        let offset = self.offset;

        let use_slot = if pattern.is_empty() {
            if self.patterns.search_pattern().is_none() {
                if self.patterns.substitute_pattern().is_none() {
                    self.offset = saved_offset;
                    self.direction = saved_direction;
                    return Err(Error::NoPreviousPattern);
                }
                UseSlot::Substitute
            } else {
                UseSlot::Last
            }
        } else {
            UseSlot::Last
        };

        let shown = if pattern.is_empty() {
            match use_slot {
                UseSlot::Substitute => self.patterns.substitute_pattern(),
                _ => self.patterns.last_pattern(),
            }
            .unwrap_or_default()
            .to_string()
        } else {
            pattern.to_string()
        };

        let no_offset = flags.contains(SearchFlags::NOOF);
        let (from, mut scan_flags) = if no_offset {
            (start, SearchFlags::empty())
        } else {
            self.pre_offset(buf, start, offset)
        };
        scan_flags |= flags
            & (SearchFlags::KEEP
                | SearchFlags::PEEK
                | SearchFlags::HIS
                | SearchFlags::MSG
                | SearchFlags::START
                | SearchFlags::NOOF
                | SearchFlags::CLEAN);
        if offset.end {
            scan_flags |= SearchFlags::END;
        }

        let result = self.searchit_slot(buf, opts, from, direction, pattern, use_slot, count, scan_flags);
        if flags.contains(SearchFlags::KEEP) {
            self.offset = saved_offset;
            self.direction = saved_direction;
        }
        let hit = result?;

        let mut mv = SearchMove {
            pos: hit.pos,
            len: hit.len,
            linewise: false,
            inclusive: offset.end,
            wrapped: hit.wrapped,
            consumed,
            pattern: shown,
            direction,
        };
        if !no_offset {
            if offset.line {
                let target = hit.pos.line.saturating_add_signed(offset.off);
                mv.pos = Position::new(target.clamp(1, buf.line_count()), 0);
                mv.linewise = true;
            } else {
                mv.pos = step_chars(buf, hit.pos, offset.off);
            }
        }
        Ok(mv)
    }

    /// Move the scan start against a character offset so that repeating
    /// the search with `n` does not find the same match again.
    fn pre_offset(&self, buf: &Buffer, start: Position, offset: SearchOffset) -> (Position, SearchFlags) {
        if !offset.moves_chars() {
            return (start, SearchFlags::empty());
        }
        let mut pos = start;
        let steps = offset.off.unsigned_abs();
        let walk = |pos: &mut Position| {
            if offset.off > 0 {
                step::decl(buf, pos)
            } else {
                step::incl(buf, pos)
            }
        };
        for _ in 0..steps {
            if walk(&mut pos) == Step::Boundary {
                // Past the buffer edge: anything on the edge line qualifies.
                return if offset.off > 0 {
                    (Position::START, SearchFlags::START)
                } else {
                    let last = buf.line_count();
                    (Position::new(last, buf.line_len(last) + 1), SearchFlags::START)
                };
            }
        }
        trace!(?start, ?pos, "search start moved by offset");
        (pos, SearchFlags::empty())
    }

    /// Remember `pattern` as the substitute pattern.
    ///
    /// # Errors
    ///
    /// As [`Patterns::compile`].
    pub fn set_substitute_pattern(&mut self, pattern: &str, opts: &Options) -> Result<()> {
        self.patterns.compile(
            CompileRequest {
                save: SaveTo::Substitute,
                use_slot: UseSlot::Substitute,
                ..CompileRequest::search(pattern)
            },
            opts,
        )?;
        Ok(())
    }

    /// The pattern `n` would search for, as typed.
    #[must_use]
    pub fn last_pattern(&self) -> Option<&str> {
        self.patterns.last_pattern()
    }

    #[must_use]
    pub fn last_search_pattern(&self) -> Option<&str> {
        self.patterns.search_pattern()
    }

    #[must_use]
    pub fn last_substitute_pattern(&self) -> Option<&str> {
        self.patterns.substitute_pattern()
    }

    #[must_use]
    pub const fn direction(&self) -> Direction {
        self.direction
    }

    #[must_use]
    pub const fn offset(&self) -> SearchOffset {
        self.offset
    }

    #[must_use]
    pub fn history(&self) -> &[String] {
        self.patterns.history()
    }

    #[must_use]
    pub const fn patterns(&self) -> &Patterns {
        &self.patterns
    }

    pub fn patterns_mut(&mut self) -> &mut Patterns {
        &mut self.patterns
    }
}

/// Step `off` chars with [`step::incl`] / [`step::decl`], stopping at the
/// buffer edge.
fn step_chars(buf: &Buffer, start: Position, off: isize) -> Position {
    let mut pos = start;
    for _ in 0..off.unsigned_abs() {
        if step::incl_decl(buf, &mut pos, off > 0) == Step::Boundary {
            break;
        }
    }
    pos
}

// ---------------------------------------------------------------------------
// Pair search
// ---------------------------------------------------------------------------

/// Search for the `end` (backward: `start`) pattern that closes the
/// nesting level at `from`, skipping nested `start`..`end` pairs. A
/// non-empty `middle` matching at the outer level also ends the search.
///
/// The three patterns are in `regex` syntax and must not contain capture
/// groups.
///
/// # Errors
///
/// [`Error::InvalidPattern`] when a pattern does not compile. Not finding
/// a partner is `Ok(None)`.
pub fn search_pair(
    buf: &Buffer,
    from: Position,
    start: &str,
    middle: &str,
    end: &str,
    dir: Direction,
    wrapscan: bool,
) -> Result<Option<Position>> {
    let two = format!("({start})|({end})");
    let pat2 = pattern::compile(&two, &two, false)?;
    let pat3 = if middle.is_empty() {
        pat2.clone()
    } else {
        let three = format!("({start})|({end})|({middle})");
        pattern::compile(&three, &three, false)?
    };
    let scan = ScanOptions {
        wrapscan,
        cpo_search: false,
    };

    let mut pos = from;
    let mut first: Option<Position> = None;
    let mut found: Option<Position> = None;
    let mut nest = 1usize;
    let mut outer = true;
    loop {
        let regex = if outer { &pat3 } else { &pat2 };
        let Ok(hit) = search_regex(buf, regex, pos, dir, 1, SearchFlags::KEEP, scan) else {
            break;
        };
        pos = hit.pos;
        match first {
            // Wrapped around to the first match: no partner.
            Some(f) if f == pos => break,
            None => first = Some(pos),
            Some(_) => {}
        }
        if found == Some(pos) {
            // Stuck on an empty match.
            step::incl_decl(buf, &mut pos, dir.is_forward());
        }
        found = Some(pos);

        let which = hit.submatch + 1;
        let opens = if dir.is_forward() { which == 2 } else { which == 3 };
        if opens {
            nest += 1;
            outer = false;
        } else {
            nest -= 1;
            if nest == 1 {
                outer = true;
            }
        }
        if nest == 0 {
            trace!(?from, ?pos, "pair found");
            return Ok(Some(pos));
        }
    }
    trace!(?from, "pair not found");
    Ok(None)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
