//! Balanced-delimiter matching for `%`, `[(`, `])`, `[/`, `[#` and the
//! block text objects.
//!
//! The scan walks char by char from the start position, counting nesting.
//! In smart mode (the default, vi's `cpo` without `%`) it also:
//!
//! - ignores brackets inside double-quoted strings, when the line has an
//!   even number of quotes or continues a string with a trailing `\`,
//! - skips char literals such as `'('` and `'\)'`,
//! - treats `/* */` comments and `#if`/`#else`/`#endif` lines as pairs.
//!
//! A bracket only matches one with the same backslash parity, so `\(`
//! pairs with `\)` and not with `)`.

use crate::buffer::Buffer;
use crate::options::MatchPairs;
use crate::position::Position;

/// What to find a partner for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchTarget {
    /// `%`: the bracket, comment delimiter or preprocessor line under or
    /// after the cursor.
    UnderCursor,
    /// `[(`, `[{`, `])`, `]}`: the enclosing unmatched `ch`.
    Unmatched(char),
    /// `[/` / `]/`: start or end of the enclosing C comment.
    Comment { forward: bool },
    /// `[#` / `]#`: the enclosing unmatched `#if` / `#else` / `#endif`.
    Directive { forward: bool },
}

/// A partner position. Preprocessor matches are linewise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Found {
    pub pos: Position,
    pub linewise: bool,
}

impl Found {
    const fn at(line: usize, col: usize) -> Self {
        Self {
            pos: Position::new(line, col),
            linewise: false,
        }
    }
}

/// Find the partner of `target` starting at `start`.
///
/// `smart` enables quote, char-literal, comment and preprocessor
/// awareness. Block objects turn it off so that only brackets count.
#[must_use]
pub fn find_match(
    buf: &Buffer,
    pairs: &MatchPairs,
    start: Position,
    target: MatchTarget,
    smart: bool,
) -> Option<Found> {
    let mut scan = Scan::new(buf, start);

    match target {
        MatchTarget::Comment { forward } => {
            scan.comment = Some(forward);
            scan.ignore_cend = true;
            scan.backwards = !forward;
        }
        MatchTarget::Unmatched(ch) => {
            let (other, is_open) = pairs.partner(ch)?;
            scan.findc = Some(ch);
            scan.initc = Some(other);
            scan.backwards = is_open;
        }
        MatchTarget::Directive { forward } => {
            return scan.directive(if forward { 1 } else { -1 }, true);
        }
        MatchTarget::UnderCursor => {
            if smart {
                scan.detect_special();
                if let Some(dir) = scan.hash {
                    return scan.directive(dir, false);
                }
            }
            if scan.comment.is_none() && !scan.find_bracket(pairs) {
                // No bracket on the line: maybe it is a `#if` line.
                let line = &scan.line;
                if smart && line.at(line.skip_white(0)) == '#' {
                    return scan.directive(1, false);
                }
                return None;
            }
        }
    }
    scan.run(smart)
}

// ---------------------------------------------------------------------------
// Scanner state
// ---------------------------------------------------------------------------

/// One line of chars. Indexes at or past the end read as `'\n'`.
struct Line(Vec<char>);

impl Line {
    fn load(buf: &Buffer, lnum: usize) -> Self {
        Self(buf.line_text(lnum).chars().collect())
    }

    fn len(&self) -> usize {
        self.0.len()
    }

    fn at(&self, idx: usize) -> char {
        self.0.get(idx).copied().unwrap_or('\n')
    }

    fn skip_white(&self, mut idx: usize) -> usize {
        while matches!(self.at(idx), ' ' | '\t') {
            idx += 1;
        }
        idx
    }

    fn starts_with_at(&self, idx: usize, word: &str) -> bool {
        word.chars().enumerate().all(|(i, c)| self.at(idx + i) == c)
    }

    /// Run of backslashes directly before `idx`.
    fn backslashes_before(&self, idx: usize) -> usize {
        self.0[..idx.min(self.len())]
            .iter()
            .rev()
            .take_while(|c| **c == '\\')
            .count()
    }

    /// Column of a `//` comment, `usize::MAX` when there is none.
    fn line_comment(&self) -> usize {
        self.0
            .windows(2)
            .position(|w| w == ['/', '/'])
            .unwrap_or(usize::MAX)
    }

    /// Directive keyword after the `#` at `hash`.
    fn directive_after(&self, hash: usize) -> Option<Directive> {
        let ptr = self.skip_white(hash + 1);
        if self.starts_with_at(ptr, "if") {
            Some(Directive::If)
        } else if self.starts_with_at(ptr, "el") {
            Some(Directive::Else)
        } else if self.starts_with_at(ptr, "endif") {
            Some(Directive::Endif)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Directive {
    If,
    Else,
    Endif,
}

struct Scan<'a> {
    buf: &'a Buffer,
    lnum: usize,
    col: usize,
    line: Line,
    /// The char that opens a nesting level.
    initc: Option<char>,
    /// The char we are looking for.
    findc: Option<char>,
    backwards: bool,
    /// Scanning for a comment delimiter; `Some(true)` is forward.
    comment: Option<bool>,
    ignore_cend: bool,
    /// Scanning preprocessor lines; +1 forward, -1 backward.
    hash: Option<i8>,
    /// The start bracket is escaped (odd backslash run).
    match_escaped: bool,
}

impl<'a> Scan<'a> {
    fn new(buf: &'a Buffer, start: Position) -> Self {
        Self {
            buf,
            lnum: start.line,
            col: start.col,
            line: Line::load(buf, start.line),
            initc: None,
            findc: None,
            backwards: false,
            comment: None,
            ignore_cend: false,
            hash: None,
            match_escaped: false,
        }
    }

    /// Is the cursor on a `#if` line or a comment delimiter?
    fn detect_special(&mut self) {
        let line = &self.line;
        let ptr = line.skip_white(0);
        if ptr < line.len() && line.at(ptr) == '#' && self.col <= ptr {
            if line.directive_after(ptr).is_some() {
                self.hash = Some(1);
            }
            return;
        }
        let col = self.col;
        match line.at(col) {
            '/' if line.at(col + 1) == '*' => {
                self.comment = Some(true);
                self.col += 1;
            }
            '/' if col > 0 && line.at(col - 1) == '*' => {
                self.comment = Some(false);
                self.backwards = true;
                self.col -= 1;
            }
            '*' if line.at(col + 1) == '/' => {
                self.comment = Some(false);
                self.backwards = true;
            }
            '*' if col > 0 && line.at(col - 1) == '/' => {
                self.comment = Some(true);
            }
            _ => {}
        }
    }

    /// Find a bracket under or after the cursor. False when the rest of
    /// the line has none.
    fn find_bracket(&mut self, pairs: &MatchPairs) -> bool {
        let len = self.line.len();
        if self.col >= len && self.col != 0 {
            self.col = len - 1;
        }
        while self.col < len {
            let c = self.line.at(self.col);
            if let Some((other, is_open)) = pairs.partner(c) {
                self.initc = Some(c);
                self.findc = Some(other);
                self.backwards = !is_open;
                self.match_escaped = self.line.backslashes_before(self.col) % 2 == 1;
                return true;
            }
            self.col += 1;
        }
        false
    }

    /// Walk `#if` / `#else` / `#endif` lines. `from_hash` is the `[#`
    /// flavour, where an `#else` going backward also stops the scan.
    fn directive(mut self, mut dir: i8, from_hash: bool) -> Option<Found> {
        if !from_hash {
            let hash = self.line.skip_white(0);
            dir = match self.line.directive_after(hash)? {
                Directive::If | Directive::Else => 1,
                Directive::Endif => -1,
            };
        }
        let last = self.buf.line_count();
        let mut depth = 0usize;
        loop {
            if (dir > 0 && self.lnum == last) || (dir < 0 && self.lnum == 1) {
                return None;
            }
            self.lnum = if dir > 0 { self.lnum + 1 } else { self.lnum - 1 };
            let line = Line::load(self.buf, self.lnum);
            let ptr = line.skip_white(0);
            if line.at(ptr) != '#' {
                continue;
            }
            let found = Found {
                pos: Position::new(self.lnum, ptr),
                linewise: true,
            };
            match (dir > 0, line.directive_after(ptr)) {
                (true, Some(Directive::If)) | (false, Some(Directive::Endif)) => depth += 1,
                (true, Some(Directive::Else)) if depth == 0 => return Some(found),
                (false, Some(Directive::Else)) if from_hash && depth == 0 => return Some(found),
                (true, Some(Directive::Endif)) | (false, Some(Directive::If)) => {
                    if depth == 0 {
                        return Some(found);
                    }
                    depth -= 1;
                }
                _ => {}
            }
        }
    }

    /// Step one char in the scan direction, visiting each line's newline
    /// slot. False at the buffer edge.
    fn advance(&mut self) -> bool {
        if self.backwards {
            if self.col == 0 {
                if self.lnum == 1 {
                    return false;
                }
                self.lnum -= 1;
                self.line = Line::load(self.buf, self.lnum);
                self.col = self.line.len();
                return true;
            }
            self.col -= 1;
        } else {
            if self.col >= self.line.len() {
                if self.lnum >= self.buf.line_count() {
                    return false;
                }
                self.lnum += 1;
                self.line = Line::load(self.buf, self.lnum);
                self.col = 0;
                return true;
            }
            self.col += 1;
        }
        true
    }

    /// The bracket and comment scan.
    fn run(mut self, smart: bool) -> Option<Found> {
        let mut depth = 0usize;
        let mut inquote = false;
        // None until the current line's quotes are counted.
        let mut do_quotes: Option<bool> = None;
        // Whether the start position is inside a string; None is unknown.
        let mut start_in_quotes: Option<bool> = None;
        let mut comment_match = Position::START;
        let mut comment_col = if self.backwards && self.comment.is_some() {
            self.line.line_comment()
        } else {
            usize::MAX
        };

        loop {
            let prev_line = self.lnum;
            if !self.advance() {
                break;
            }
            if self.lnum != prev_line {
                do_quotes = None;
                if self.backwards && self.comment.is_some() {
                    comment_col = self.line.line_comment();
                }
            }
            let (line, col) = (&self.line, self.col);

            if let Some(forward) = self.comment {
                // Comments do not nest and quotes inside them do not count.
                if forward {
                    if line.at(col) == '*' && line.at(col + 1) == '/' {
                        return Some(Found::at(self.lnum, col + 1));
                    }
                } else if col > 0 && line.at(col - 1) == '/' && line.at(col) == '*' && col < comment_col {
                    depth += 1;
                    comment_match = Position::new(self.lnum, col - 1);
                } else if col > 0 && line.at(col - 1) == '*' && line.at(col) == '/' {
                    if depth > 0 {
                        return Some(Found::at(comment_match.line, comment_match.col));
                    } else if col > 1 && line.at(col - 2) == '/' && col <= comment_col {
                        return Some(Found::at(self.lnum, col - 2));
                    } else if !self.ignore_cend {
                        return None;
                    }
                }
                continue;
            }

            if !smart {
                do_quotes = Some(false);
            } else if do_quotes.is_none() {
                let (even, at_start) = count_quotes(line, col, self.backwards);
                do_quotes = Some(even);
                if !even {
                    inquote = false;
                    if line.at(line.len().wrapping_sub(1)) == '\\' {
                        do_quotes = Some(true);
                        if start_in_quotes.is_none() {
                            inquote = true;
                            start_in_quotes = Some(true);
                        } else if self.backwards {
                            inquote = true;
                        }
                    }
                    if self.lnum > 1 {
                        let prev = Line::load(self.buf, self.lnum - 1);
                        if prev.len() > 0 && prev.at(prev.len() - 1) == '\\' {
                            do_quotes = Some(true);
                            if start_in_quotes.is_none() {
                                inquote = at_start;
                                if inquote {
                                    start_in_quotes = Some(true);
                                }
                            } else if !self.backwards {
                                inquote = true;
                            }
                        }
                    }
                }
            }
            if start_in_quotes.is_none() {
                start_in_quotes = Some(false);
            }

            let c = line.at(col);
            if col >= line.len() {
                // End of a line not continued with `\`: strings end here.
                if col == 0 || line.at(col - 1) != '\\' {
                    inquote = false;
                    start_in_quotes = Some(false);
                }
                continue;
            }
            if c == '"' {
                if do_quotes == Some(true) && line.backslashes_before(col) % 2 == 0 {
                    inquote = !inquote;
                    start_in_quotes = Some(false);
                }
                continue;
            }
            if c == '\'' && smart && self.initc != Some('\'') && self.findc != Some('\'') {
                if let Some(skip) = char_literal(line, col, self.backwards) {
                    self.col = skip;
                    continue;
                }
            }

            if (!inquote || start_in_quotes == Some(true))
                && (Some(c) == self.initc || Some(c) == self.findc)
                && (line.backslashes_before(col) % 2 == 1) == self.match_escaped
            {
                if Some(c) == self.initc {
                    depth += 1;
                } else if depth == 0 {
                    return Some(Found::at(self.lnum, col));
                } else {
                    depth -= 1;
                }
            }
        }

        if self.comment == Some(false) && depth > 0 {
            return Some(Found::at(comment_match.line, comment_match.col));
        }
        None
    }
}

/// Count the line's double quotes, ignoring `'"'` and escaped quotes.
/// Returns (even count, whether an even number precede `col`).
fn count_quotes(line: &Line, col: usize, backwards: bool) -> (bool, bool) {
    let target = col + usize::from(backwards);
    let mut quotes = 0usize;
    let mut at_start = true;
    let mut ptr = 0;
    while ptr < line.len() {
        if ptr == target {
            at_start = quotes % 2 == 0;
        }
        let c = line.at(ptr);
        if c == '"' && (ptr == 0 || line.at(ptr - 1) != '\'' || line.at(ptr + 1) != '\'') {
            quotes += 1;
        }
        if c == '\\' && ptr + 1 <= line.len() {
            ptr += 1;
        }
        ptr += 1;
    }
    (quotes % 2 == 0, at_start)
}

/// When `col` opens (or closes, going backward) a char literal like `'x'`
/// or `'\x'`, the column of its other quote.
fn char_literal(line: &Line, col: usize, backwards: bool) -> Option<usize> {
    if backwards {
        if col > 1 && line.at(col - 2) == '\'' {
            return Some(col - 2);
        }
        if col > 2 && line.at(col - 2) == '\\' && line.at(col - 3) == '\'' {
            return Some(col - 3);
        }
    } else if col + 2 <= line.len() {
        if line.at(col + 1) == '\\' && col + 3 <= line.len() && line.at(col + 3) == '\'' {
            return Some(col + 3);
        }
        if line.at(col + 2) == '\'' {
            return Some(col + 2);
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
