//! Text objects: `iw aw iW aW is as ip ap i( a( it at i" a"` and friends.
//!
//! [`select`] works out the span an operator applies to, or, with a Visual
//! area active, the new area. Visual results come back as a [`Span`] whose
//! `start` is the new anchor and whose `end` is the new cursor, so a
//! reversed span means the cursor sits at the start of the area.
//!
//! Several objects grow an existing Visual area instead of selecting a
//! fresh one: repeating `iw`, `is`, `ip`, `i(` or `it` keeps extending the
//! selection outward. Every object works on copies of the cursor and
//! anchor; on failure nothing the caller owns has moved.

use tracing::trace;

use crate::buffer::Buffer;
use crate::charclass::{CharClass, is_white};
use crate::cursor::Cursor;
use crate::error::{Error, Result};
use crate::matchpair::{MatchTarget, find_match};
use crate::mode::{Visual, VisualKind};
use crate::motion::{findsent, starts_para};
use crate::options::{MatchPairs, Options};
use crate::position::{Position, Span};
use crate::search::{Direction, search_pair};
use crate::step::{self, Step};
use crate::word::{bck_word, bckend_word, end_word, fwd_word};

/// Which object to select.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextObjectKind {
    /// `w` / `W`
    Word,
    /// `s`
    Sentence,
    /// `p`
    Paragraph,
    /// `(`, `{`, `[`, `<` and their aliases.
    Block { open: char, close: char },
    /// `t`: an XML/HTML tag block.
    Tag,
    /// `"`, `'`, `` ` ``
    Quote(char),
}

impl TextObjectKind {
    /// The block object for the char typed after `i` / `a`.
    #[must_use]
    pub const fn block_for(ch: char) -> Option<Self> {
        let (open, close) = match ch {
            '(' | ')' | 'b' => ('(', ')'),
            '{' | '}' | 'B' => ('{', '}'),
            '[' | ']' => ('[', ']'),
            '<' | '>' => ('<', '>'),
            _ => return None,
        };
        Some(Self::Block { open, close })
    }
}

/// An object request: `3aw` is `Word`, count 3, include, not big.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextObject {
    pub kind: TextObjectKind,
    pub count: usize,
    /// `a` objects include white space (or the delimiters).
    pub include: bool,
    /// `W` rather than `w`.
    pub big_word: bool,
}

impl TextObject {
    #[must_use]
    pub const fn new(kind: TextObjectKind, count: usize, include: bool) -> Self {
        Self {
            kind,
            count,
            include,
            big_word: false,
        }
    }
}

/// Select `obj` around `cursor`.
///
/// # Errors
///
/// [`Error::Boundary`] when a word, sentence or paragraph object runs into
/// the buffer edge, [`Error::UnmatchedDelimiter`] when a block, tag or
/// quote has no partner, and pattern errors from the tag search.
pub fn select(
    buf: &Buffer,
    opts: &Options,
    cursor: Position,
    visual: Option<Visual>,
    obj: TextObject,
) -> Result<Span> {
    let sel = Selector {
        buf,
        opts,
        cursor,
        visual,
    };
    // No buffer holds more objects than it has chars.
    let count = obj.count.clamp(1, buf.len_chars() + 1);
    let span = match obj.kind {
        TextObjectKind::Word => sel.word(count, obj.include, obj.big_word),
        TextObjectKind::Sentence => sel.sentence(count, obj.include),
        TextObjectKind::Paragraph => sel.paragraph(count, obj.include),
        TextObjectKind::Block { open, close } => sel.block(count, obj.include, open, close),
        TextObjectKind::Tag => sel.tag(count, obj.include),
        TextObjectKind::Quote(q) => sel.quote(count, obj.include, q),
    }?;
    trace!(?obj, ?cursor, ?span, "text object");
    Ok(span)
}

/// A Visual result: anchor to cursor.
const fn visual_span(anchor: Position, cursor: Position, kind: VisualKind) -> Span {
    Span {
        start: anchor,
        end: cursor,
        kind: kind.span_kind(),
        inclusive: true,
    }
}

struct Selector<'a> {
    buf: &'a Buffer,
    opts: &'a Options,
    cursor: Position,
    visual: Option<Visual>,
}

impl<'a> Selector<'a> {
    fn walker(&self, pos: Position) -> Cursor<'a> {
        Cursor::new(self.buf, &self.opts.iskeyword, pos)
    }

    /// True without a Visual area, or when it is a single char.
    fn fresh(&self, cursor: Position) -> bool {
        self.visual.is_none_or(|v| v.anchor == cursor)
    }

    // -- Words --------------------------------------------------------------

    fn word(&self, mut count: usize, include: bool, big: bool) -> Result<Span> {
        let mut cur = self.walker(self.cursor);
        cur.big_word = big;
        let mut anchor = self.visual.map(|v| v.anchor);
        let mut start = cur.pos;
        let mut inclusive = true;
        let mut include_white = false;

        if let Some(v) = self.visual {
            if self.opts.selection_exclusive && v.anchor < cur.pos {
                cur.dec();
            }
        }

        if self.fresh(cur.pos) {
            back_in_line(&mut cur);
            start = cur.pos;
            // On blanks with `aw`, or on a word with `iw`: to its end.
            if (cur.cls() == CharClass::Blank) == include {
                if !end_word(&mut cur, 1, true, true) {
                    return Err(Error::Boundary);
                }
            } else {
                fwd_word(&mut cur, 1, true);
                // A one-char word at the end of a line.
                if cur.pos.col == 0 {
                    cur.decl();
                } else {
                    cur.oneleft();
                }
                include_white = include;
            }
            if anchor.is_some() {
                anchor = Some(start);
            }
            count -= 1;
        }

        while count > 0 {
            inclusive = true;
            if anchor.is_some_and(|a| cur.pos < a) {
                // Cursor at the start of the area: grow backward.
                if cur.decl() == Step::Boundary {
                    return Err(Error::Boundary);
                }
                if include != (cur.cls() != CharClass::Blank) {
                    if !bck_word(&mut cur, 1, true) {
                        return Err(Error::Boundary);
                    }
                } else {
                    if !bckend_word(&mut cur, 1, true) {
                        return Err(Error::Boundary);
                    }
                    cur.incl();
                }
            } else {
                if cur.incl() == Step::Boundary {
                    return Err(Error::Boundary);
                }
                if include != (cur.cls() == CharClass::Blank) {
                    if !fwd_word(&mut cur, 1, true) && count > 1 {
                        return Err(Error::Boundary);
                    }
                    // Just past a line break: keep the next line out.
                    if !cur.oneleft() {
                        inclusive = false;
                    }
                } else if !end_word(&mut cur, 1, true, true) {
                    return Err(Error::Boundary);
                }
            }
            count -= 1;
        }

        // No trailing white: take the white before the word instead, but
        // never the indent.
        if include_white && (cur.cls() != CharClass::Blank || (cur.pos.col == 0 && !inclusive)) {
            let mut front = cur.at(start);
            if front.oneleft() {
                back_in_line(&mut front);
                if front.cls() == CharClass::Blank && front.pos.col > 0 {
                    if anchor.is_some() {
                        anchor = Some(front.pos);
                    } else {
                        start = front.pos;
                    }
                }
            }
        }

        match anchor {
            Some(anchor) => {
                if self.opts.selection_exclusive && inclusive && anchor <= cur.pos {
                    cur.inc();
                }
                let kind = match self.visual.map(|v| v.kind) {
                    Some(VisualKind::Block) => VisualKind::Block,
                    _ => VisualKind::Char,
                };
                Ok(visual_span(anchor, cur.pos, kind))
            }
            None => Ok(Span::chars(start, cur.pos, inclusive)),
        }
    }

    // -- Sentences ----------------------------------------------------------

    fn findsent(&self, pos: &mut Position, forward: bool) {
        if let Some(found) = findsent(self.buf, self.opts.cpo_j, *pos, forward, 1) {
            *pos = found;
        }
    }

    /// Forward over `count` sentences, alternating between the sentence and
    /// the white after it.
    fn findsent_forward(&self, cursor: &mut Position, count: usize, mut at_start_sent: bool) {
        for remaining in (0..count).rev() {
            self.findsent(cursor, true);
            if at_start_sent {
                find_first_blank(self.buf, cursor);
            }
            if remaining == 0 || at_start_sent {
                step::decl(self.buf, cursor);
            }
            at_start_sent = !at_start_sent;
        }
    }

    fn sentence(&self, count: usize, include: bool) -> Result<Span> {
        let buf = self.buf;
        let mut start_pos = self.cursor;
        let mut pos = start_pos;
        let mut cursor = self.cursor;
        self.findsent(&mut cursor, true);

        if let Some(v) = self.visual {
            if start_pos != v.anchor {
                return Ok(self.extend_sentence(v, start_pos, pos, cursor, count, include));
            }
        }

        // Started on white: is it just before the next sentence?
        while is_white(buf.gchar(pos)) {
            if step::incl(buf, &mut pos) == Step::Boundary {
                break;
            }
        }
        let start_blank = pos == cursor;
        if start_blank {
            find_first_blank(buf, &mut start_pos);
        } else {
            self.findsent(&mut cursor, false);
            start_pos = cursor;
        }

        let ncount = if include {
            count.saturating_mul(2)
        } else {
            count - usize::from(start_blank)
        };
        if ncount > 0 {
            self.findsent_forward(&mut cursor, ncount, true);
        } else {
            step::decl(buf, &mut cursor);
        }

        if include {
            // Leading white taken: drop the trailing white. No trailing
            // white: take the leading white.
            if start_blank {
                find_first_blank(buf, &mut cursor);
                if is_white(buf.gchar(cursor)) {
                    step::decl(buf, &mut cursor);
                }
            } else if !is_white(buf.gchar(cursor)) {
                find_first_blank(buf, &mut start_pos);
            }
        }

        if let Some(v) = self.visual {
            // `is` on a single blank before a sentence would not grow.
            if start_pos == cursor {
                return Ok(self.extend_sentence(v, start_pos, pos, cursor, count, include));
            }
            if self.opts.selection_exclusive {
                cursor.col += 1;
            }
            return Ok(visual_span(start_pos, cursor, VisualKind::Char));
        }

        // Take the line break after the sentence, if there is one.
        let mut end = cursor;
        if step::incl(buf, &mut end) == Step::Boundary {
            return Ok(Span::chars(start_pos, cursor, true));
        }
        Ok(Span::chars(start_pos, end, false))
    }

    /// Grow a Visual area by sentences from whichever end the cursor is on.
    fn extend_sentence(
        &self,
        v: Visual,
        start_pos: Position,
        mut pos: Position,
        mut cursor: Position,
        count: usize,
        include: bool,
    ) -> Span {
        let buf = self.buf;
        let count = if include { count.saturating_mul(2) } else { count };

        if start_pos < v.anchor {
            // Cursor at the start: white before a sentence, inside one, or
            // exactly at its start?
            let mut at_start_sent = true;
            step::decl(buf, &mut pos);
            while pos < cursor {
                if !is_white(buf.gchar(pos)) {
                    at_start_sent = false;
                    break;
                }
                if step::incl(buf, &mut pos) == Step::Boundary {
                    break;
                }
            }
            if !at_start_sent {
                self.findsent(&mut cursor, false);
                if cursor == start_pos {
                    at_start_sent = true;
                } else {
                    self.findsent(&mut cursor, true);
                }
            }
            for _ in 0..count {
                if at_start_sent {
                    find_first_blank(buf, &mut cursor);
                }
                if !at_start_sent || (!include && !is_white(buf.gchar(cursor))) {
                    self.findsent(&mut cursor, false);
                }
                at_start_sent = !at_start_sent;
            }
        } else {
            // Cursor at the end: just before a sentence, in the white
            // before one, or inside one?
            step::incl(buf, &mut pos);
            let mut at_start_sent = true;
            if pos != cursor {
                at_start_sent = false;
                while pos < cursor {
                    if !is_white(buf.gchar(pos)) {
                        at_start_sent = true;
                        break;
                    }
                    if step::incl(buf, &mut pos) == Step::Boundary {
                        break;
                    }
                }
                if at_start_sent {
                    self.findsent(&mut cursor, false);
                } else {
                    cursor = start_pos;
                }
            }
            self.findsent_forward(&mut cursor, count, at_start_sent);
            if self.opts.selection_exclusive {
                cursor.col += 1;
            }
        }
        visual_span(v.anchor, cursor, v.kind)
    }

    // -- Paragraphs ---------------------------------------------------------

    fn paragraph(&self, count: usize, include: bool) -> Result<Span> {
        let buf = self.buf;
        let last = buf.line_count();
        let white = |l: usize| buf.is_line_white(l);
        let starts = |l: usize| starts_para(buf, l, None, false);
        let mut start = self.cursor.line;

        if let Some(v) = self.visual {
            if start != v.anchor.line {
                return self.extend_paragraph(v, start, count, include);
            }
        }

        // Back to the first line of the paragraph or white run.
        let white_in_front = white(start);
        while start > 1 {
            let stop = if white_in_front {
                !white(start - 1)
            } else {
                white(start - 1) || starts(start)
            };
            if stop {
                break;
            }
            start -= 1;
        }

        // Past the end of any white lines.
        let mut end = start;
        while end <= last && white(end) {
            end += 1;
        }
        end -= 1;

        let mut i = count;
        if !include && white_in_front {
            i -= 1;
        }
        let mut do_white = false;
        while i > 0 {
            i -= 1;
            if end == last {
                return Err(Error::Boundary);
            }
            if !include {
                do_white = white(end + 1);
            }
            if include || !do_white {
                end += 1;
                while end < last && !white(end + 1) && !starts(end + 1) {
                    end += 1;
                }
            }
            if i == 0 && white_in_front && include {
                break;
            }
            if include || do_white {
                while end < last && white(end + 1) {
                    end += 1;
                }
            }
        }

        // No white lines at the end: take those at the start.
        if !white_in_front && !white(end) && include {
            while start > 1 && white(start - 1) {
                start -= 1;
            }
        }

        match self.visual {
            Some(v) => {
                if v.kind == VisualKind::Line && start == self.cursor.line {
                    return self.extend_paragraph(v, start, count, include);
                }
                Ok(visual_span(
                    Position::new(start, v.anchor.col),
                    Position::new(end, 0),
                    VisualKind::Line,
                ))
            }
            None => Ok(Span::lines(Position::new(start, 0), Position::new(end, 0))),
        }
    }

    /// Grow a linewise area by paragraphs (and white runs with `ap`).
    fn extend_paragraph(&self, v: Visual, mut start: usize, count: usize, include: bool) -> Result<Span> {
        let buf = self.buf;
        let last = buf.line_count();
        let forward = start >= v.anchor.line;
        let edge = if forward { last } else { 1 };
        let next = |l: usize| if forward { l + 1 } else { l - 1 };
        let prev = |l: usize| if forward { l - 1 } else { l + 1 };

        for _ in 0..count {
            if start == edge {
                return Err(Error::Boundary);
            }
            let mut prev_white = None;
            for _ in 0..2 {
                start = next(start);
                let w = buf.is_line_white(start);
                if prev_white == Some(w) {
                    start = prev(start);
                    break;
                }
                while start != edge {
                    let para = starts_para(buf, start + usize::from(forward), None, false);
                    if w != buf.is_line_white(next(start)) || (!w && para) {
                        break;
                    }
                    start = next(start);
                }
                if !include || start == edge {
                    break;
                }
                prev_white = Some(w);
            }
        }
        Ok(visual_span(v.anchor, Position::new(start, 0), v.kind))
    }

    // -- Blocks -------------------------------------------------------------

    fn unmatched(&self, pairs: &MatchPairs, from: Position, ch: char, smart: bool) -> Result<Position> {
        find_match(self.buf, pairs, from, MatchTarget::Unmatched(ch), smart)
            .map(|found| found.pos)
            .ok_or(Error::UnmatchedDelimiter(ch))
    }

    fn block(&self, count: usize, include: bool, what: char, other: char) -> Result<Span> {
        let smart = !self.opts.cpo_match;
        let pairs = MatchPairs::single(what, other);
        let mut cur = self.walker(self.cursor);
        let mut old_start = self.cursor;
        let mut old_end = self.cursor;

        match self.visual {
            Some(v) if v.anchor != self.cursor => {
                if v.anchor < self.cursor {
                    old_start = v.anchor;
                    cur.pos = v.anchor;
                } else {
                    old_end = v.anchor;
                }
            }
            _ => {
                if what == '{' {
                    while cur.in_indent(1) {
                        if cur.inc() != Step::Within {
                            break;
                        }
                    }
                }
                // On the opener itself: the block it opens.
                if cur.gchar() == what {
                    cur.pos.col += 1;
                }
            }
        }

        // Quotes never hide the outer brackets.
        for _ in 0..count {
            cur.pos = self.unmatched(&pairs, cur.pos, what, false)?;
        }
        let mut start_pos = cur.pos;
        cur.pos = self.unmatched(&pairs, cur.pos, other, smart)?;

        // Drop the brackets, and the indent before a closing brace. In
        // Visual mode, an area that would not grow moves to the next block.
        let mut sol = false;
        while !include {
            step::incl(self.buf, &mut start_pos);
            sol = cur.pos.col == 0;
            cur.decl();
            if what == '{' {
                while cur.in_indent(1) {
                    sol = true;
                    if cur.decl() != Step::Within {
                        break;
                    }
                }
            }
            if self.visual.is_none() || start_pos < old_start || old_end < cur.pos {
                break;
            }
            cur.pos = old_start;
            cur.decl();
            start_pos = self.unmatched(&pairs, cur.pos, what, smart)?;
            cur.pos = self.unmatched(&pairs, start_pos, other, smart)?;
        }

        if self.visual.is_some() {
            if self.opts.selection_exclusive {
                cur.pos.col += 1;
            }
            if sol && cur.gchar() != '\n' {
                cur.inc();
            }
            return Ok(visual_span(start_pos, cur.pos, VisualKind::Char));
        }
        if sol {
            cur.incl();
            return Ok(Span::chars(start_pos, cur.pos, false));
        }
        if start_pos <= cur.pos {
            Ok(Span::chars(start_pos, cur.pos, true))
        } else {
            // Nothing between the brackets.
            Ok(Span::chars(start_pos, start_pos, false))
        }
    }

    // -- Tags ---------------------------------------------------------------

    fn tag(&self, count: usize, include: bool) -> Result<Span> {
        let buf = self.buf;
        let mut cur = self.walker(self.cursor);
        let mut old_start = self.cursor;
        let mut old_end = self.cursor;

        match self.visual {
            Some(v) if v.anchor != self.cursor => {
                if v.anchor < self.cursor {
                    old_start = v.anchor;
                    cur.pos = v.anchor;
                } else {
                    old_end = v.anchor;
                }
            }
            _ => {
                while cur.in_indent(1) {
                    if cur.inc() != Step::Within {
                        break;
                    }
                }
                if in_html_tag(buf, cur.pos, false) {
                    // On a start tag: to its '>'.
                    while cur.gchar() != '>' {
                        if cur.inc() == Step::Boundary {
                            break;
                        }
                    }
                } else if in_html_tag(buf, cur.pos, true) {
                    // On an end tag: to just before it.
                    while cur.gchar() != '<' {
                        if cur.dec() == Step::Boundary {
                            break;
                        }
                    }
                    cur.dec();
                    old_end = cur.pos;
                }
            }
        }

        let mut do_include = include;
        let mut levels = count;
        loop {
            for _ in 0..levels {
                cur.pos = search_pair(buf, cur.pos, START_TAG, "", END_TAG, Direction::Backward, false)?
                    .ok_or(Error::UnmatchedDelimiter('<'))?;
            }
            let mut start_pos = cur.pos;

            cur.inc();
            let name = tag_name(buf, cur.pos);
            if name.is_empty() {
                return Err(Error::UnmatchedDelimiter('<'));
            }
            let name = regex::escape(&name);
            let open = format!("(?i:<{name}(?:[^>]*?[^/]>|>))");
            let close = format!("(?i:</{name}>)");
            let end_tag = search_pair(buf, cur.pos, &open, "", &close, Direction::Forward, false)?;

            // No end tag, or one before the old area: an unclosed tag such
            // as <br>. Look for the next enclosing start tag.
            let Some(end_tag) = end_tag.filter(|end| *end >= old_end) else {
                levels = 1;
                cur.pos = start_pos;
                continue;
            };

            cur.pos = end_tag;
            if do_include {
                while cur.gchar() != '>' {
                    if cur.inc() == Step::Boundary {
                        break;
                    }
                }
            } else if cur.gchar() == '<' {
                cur.dec();
            }
            let end_pos = cur.pos;

            if !do_include {
                // Past the start tag.
                cur.pos = start_pos;
                while cur.inc() != Step::Boundary {
                    if cur.gchar() == '>' && cur.pos < end_pos {
                        cur.inc();
                        start_pos = cur.pos;
                        break;
                    }
                }
                cur.pos = end_pos;

                // Same area as before: select the tags too.
                if self.visual.is_some() && start_pos == old_start && end_pos == old_end {
                    do_include = true;
                    cur.pos = old_start;
                    levels = count;
                    continue;
                }
            }

            if self.visual.is_some() {
                if self.opts.selection_exclusive {
                    cur.pos.col += 1;
                }
                return Ok(visual_span(start_pos, cur.pos, VisualKind::Char));
            }
            return Ok(if end_pos < start_pos {
                // Nothing between the tags.
                Span::chars(start_pos, start_pos, false)
            } else {
                Span::chars(start_pos, end_pos, true)
            });
        }
    }

    // -- Quotes -------------------------------------------------------------

    fn quote(&self, count: usize, include: bool, q: char) -> Result<Span> {
        let buf = self.buf;
        let fail = || Error::UnmatchedDelimiter(q);
        let line: Vec<char> = buf.line_text(self.cursor.line).chars().collect();
        let at = |i: usize| line.get(i).copied().unwrap_or('\n');
        let escape = self.opts.quoteescape.as_str();
        let mut cursor = self.cursor;

        let mut vis_bef_curs = false;
        let mut vis_empty = true;
        if let Some(v) = self.visual {
            if v.anchor.line != cursor.line {
                return Err(fail());
            }
            vis_bef_curs = v.anchor < cursor;
            if self.opts.selection_exclusive && vis_bef_curs {
                step::dec(buf, &mut cursor);
            }
            vis_empty = v.anchor == cursor;
        }
        let anchor = self.visual.map_or(cursor, |v| v.anchor);

        // Is the area exactly the inside of a quoted string, and does it
        // contain a quote?
        let mut inside_quotes = false;
        let mut selected_quote = false;
        if !vis_empty {
            let (lo, hi) = if vis_bef_curs {
                (anchor.col, cursor.col)
            } else {
                (cursor.col, anchor.col)
            };
            inside_quotes = lo > 0 && at(lo - 1) == q && at(hi) != '\n' && at(hi + 1) == q;
            selected_quote = (lo..=hi).any(|i| at(i) == q);
        }

        let (mut col_start, mut col_end);
        if !vis_empty && at(cursor.col) == q {
            // On a quote with an area: the next (or previous) string.
            if vis_bef_curs {
                col_start = find_next_quote(&line, cursor.col + 1, q, "").ok_or_else(fail)?;
                match find_next_quote(&line, col_start + 1, q, escape) {
                    Some(end) => col_end = end,
                    None => {
                        col_end = col_start;
                        col_start = cursor.col;
                    }
                }
            } else {
                col_end = find_prev_quote(&line, cursor.col, q, "");
                if at(col_end) != q {
                    return Err(fail());
                }
                col_start = find_prev_quote(&line, col_end, q, escape);
                if at(col_start) != q {
                    col_start = col_end;
                    col_end = cursor.col;
                }
            }
        } else if at(cursor.col) == q || !vis_empty {
            // Opening or closing quote? Pair them up from the line start.
            let first_col = if vis_empty {
                cursor.col
            } else {
                find_prev_quote(&line, cursor.col, q, "")
            };
            col_start = 0;
            loop {
                col_start = find_next_quote(&line, col_start, q, "")
                    .filter(|&c| c <= first_col)
                    .ok_or_else(fail)?;
                col_end = find_next_quote(&line, col_start + 1, q, escape).ok_or_else(fail)?;
                if first_col <= col_end {
                    break;
                }
                col_start = col_end + 1;
            }
        } else {
            // The quote before the cursor, else the one after it.
            col_start = find_prev_quote(&line, cursor.col, q, escape);
            if at(col_start) != q {
                col_start = find_next_quote(&line, col_start, q, "").ok_or_else(fail)?;
            }
            col_end = find_next_quote(&line, col_start + 1, q, escape).ok_or_else(fail)?;
        }

        // White after the closing quote, else white before the opening one.
        if include {
            if is_white(at(col_end + 1)) {
                while is_white(at(col_end + 1)) {
                    col_end += 1;
                }
            } else {
                while col_start > 0 && is_white(at(col_start - 1)) {
                    col_start -= 1;
                }
            }
        }

        // A second `i"` takes the quotes, as does `2i"`.
        if !include && count < 2 && (vis_empty || !inside_quotes) {
            col_start += 1;
        }
        let start = Position::new(cursor.line, col_start);
        let mut new_anchor = anchor;
        if self.visual.is_some()
            && (vis_empty
                || (vis_bef_curs
                    && !selected_quote
                    && (inside_quotes || (at(anchor.col) != q && (anchor.col == 0 || at(anchor.col - 1) != q)))))
        {
            new_anchor = start;
        }

        let mut end = Position::new(cursor.line, col_end);
        let mut inclusive = false;
        if include || count > 1 || (!vis_empty && inside_quotes) {
            let before = end;
            if step::inc(buf, &mut end) == Step::OntoNewline {
                inclusive = true;
                if self.visual.is_none() {
                    end = before;
                }
            }
        }

        if self.visual.is_none() {
            return Ok(Span::chars(start, end, inclusive));
        }
        if vis_empty || vis_bef_curs {
            if !self.opts.selection_exclusive {
                step::dec(buf, &mut end);
            }
        } else {
            // Cursor at the start of the area: keep it on a quote.
            if inside_quotes || (!selected_quote && at(anchor.col) != q && (at(anchor.col) == '\n' || at(anchor.col + 1) != q)) {
                step::dec(buf, &mut end);
                new_anchor = end;
            }
            end = start;
        }
        Ok(visual_span(new_anchor, end, VisualKind::Char))
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Back to the start of the run of same-class chars, within the line.
fn back_in_line(cur: &mut Cursor<'_>) {
    let class = cur.cls();
    while cur.pos.col > 0 {
        cur.dec();
        if cur.cls() != class {
            cur.inc();
            break;
        }
    }
}

/// Back over white space (and line breaks) to the first blank after
/// non-white text.
fn find_first_blank(buf: &Buffer, pos: &mut Position) {
    while step::decl(buf, pos) != Step::Boundary {
        if !is_white(buf.gchar(*pos)) {
            step::incl(buf, pos);
            break;
        }
    }
}

/// The next `q` at or after `col`; a char from `escape` hides the one
/// after it.
fn find_next_quote(line: &[char], mut col: usize, q: char, escape: &str) -> Option<usize> {
    loop {
        let c = *line.get(col)?;
        if escape.contains(c) {
            col += 1;
        } else if c == q {
            return Some(col);
        }
        col += 1;
    }
}

/// The previous `q` before `col`, skipping quotes behind an odd number of
/// escape chars. Column 0 when there is none.
fn find_prev_quote(line: &[char], mut col: usize, q: char, escape: &str) -> usize {
    while col > 0 {
        col -= 1;
        let mut n = 0;
        while col - n > 0 && escape.contains(line[col - n - 1]) {
            n += 1;
        }
        if n % 2 == 1 {
            col -= n;
        } else if line.get(col) == Some(&q) {
            break;
        }
    }
    col
}

/// An opening tag: `<name`, then attributes up to a `>` not closing an
/// empty element, or the end of the line.
const START_TAG: &str = r"<[^ \t>/!]+(?:\s[^>]*?[^/]>|(?m:$)|\s?>)";
const END_TAG: &str = r"</[^>]*>";

/// True when `pos` is on a start tag (`<aaa>`, not `<aaa/>`), or with
/// `end_tag` on an end tag.
fn in_html_tag(buf: &Buffer, pos: Position, end_tag: bool) -> bool {
    let line: Vec<char> = buf.line_text(pos.line).chars().collect();
    let at = |i: usize| line.get(i).copied().unwrap_or('\n');

    let mut p = pos.col;
    while p > 0 {
        if at(p) == '<' {
            break;
        }
        p -= 1;
        if at(p) == '>' {
            break;
        }
    }
    if at(p) != '<' {
        return false;
    }
    if end_tag {
        return at(p + 1) == '/';
    }
    if at(p + 1) == '/' {
        return false;
    }
    let mut walk = Position::new(pos.line, p);
    let mut last = '\0';
    loop {
        if step::inc(buf, &mut walk) == Step::Boundary {
            return false;
        }
        let c = buf.gchar(walk);
        if c == '>' {
            break;
        }
        last = c;
    }
    last != '/'
}

/// The tag name starting at `pos`.
fn tag_name(buf: &Buffer, pos: Position) -> String {
    buf.line_text(pos.line)
        .chars()
        .skip(pos.col)
        .take_while(|&c| c != '>' && !is_white(c))
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn p(line: usize, col: usize) -> Position {
        Position::new(line, col)
    }

    fn obj(lines: &[&str], cursor: Position, kind: TextObjectKind, count: usize, include: bool) -> Result<Span> {
        let b = Buffer::from_lines(lines);
        select(&b, &Options::default(), cursor, None, TextObject::new(kind, count, include))
    }

    fn vobj(
        lines: &[&str],
        visual: Visual,
        cursor: Position,
        kind: TextObjectKind,
        include: bool,
    ) -> Result<Span> {
        let b = Buffer::from_lines(lines);
        select(&b, &Options::default(), cursor, Some(visual), TextObject::new(kind, 1, include))
    }

    fn charwise(visual: Position) -> Visual {
        Visual::new(visual, VisualKind::Char)
    }

    // -- Words --------------------------------------------------------------

    #[test]
    fn word_object_coverage() {
        let aw = obj(&["foo   bar"], p(1, 0), TextObjectKind::Word, 1, true).unwrap();
        assert_eq!(aw, Span::chars(p(1, 0), p(1, 5), true));
        let iw = obj(&["foo   bar"], p(1, 0), TextObjectKind::Word, 1, false).unwrap();
        assert_eq!(iw, Span::chars(p(1, 0), p(1, 2), true));
    }

    #[test]
    fn inner_word_on_blanks_selects_blanks() {
        let iw = obj(&["foo   bar"], p(1, 4), TextObjectKind::Word, 1, false).unwrap();
        assert_eq!(iw, Span::chars(p(1, 3), p(1, 5), true));
    }

    #[test]
    fn a_word_on_last_word_takes_leading_white() {
        let aw = obj(&["foo bar"], p(1, 5), TextObjectKind::Word, 1, true).unwrap();
        assert_eq!(aw, Span::chars(p(1, 3), p(1, 6), true));
    }

    #[test]
    fn a_word_never_takes_indent() {
        let aw = obj(&["  foo"], p(1, 3), TextObjectKind::Word, 1, true).unwrap();
        assert_eq!(aw, Span::chars(p(1, 2), p(1, 4), true));
    }

    #[test]
    fn word_count_extends() {
        let span = obj(&["foo bar baz"], p(1, 0), TextObjectKind::Word, 3, false).unwrap();
        assert_eq!(span, Span::chars(p(1, 0), p(1, 6), true));
    }

    #[test]
    fn big_word_spans_punctuation() {
        let b = Buffer::from_lines(&["a.b c"]);
        let mut o = TextObject::new(TextObjectKind::Word, 1, false);
        o.big_word = true;
        let span = select(&b, &Options::default(), p(1, 0), None, o).unwrap();
        assert_eq!(span, Span::chars(p(1, 0), p(1, 2), true));
    }

    #[test]
    fn visual_inner_word_grows_by_white() {
        let span = vobj(&["foo bar baz"], charwise(p(1, 0)), p(1, 2), TextObjectKind::Word, false).unwrap();
        assert_eq!(span, visual_span(p(1, 0), p(1, 3), VisualKind::Char));
    }

    // -- Sentences ----------------------------------------------------------

    const SENTENCES: [&str; 1] = ["One two.  Three four.  Five."];

    #[test]
    fn inner_sentence() {
        let span = obj(&SENTENCES, p(1, 12), TextObjectKind::Sentence, 1, false).unwrap();
        assert_eq!(span, Span::chars(p(1, 10), p(1, 21), false));
    }

    #[test]
    fn a_sentence_takes_trailing_white() {
        let span = obj(&SENTENCES, p(1, 12), TextObjectKind::Sentence, 1, true).unwrap();
        assert_eq!(span, Span::chars(p(1, 10), p(1, 23), false));
    }

    #[test]
    fn a_sentence_at_end_takes_leading_white() {
        let span = obj(&SENTENCES, p(1, 25), TextObjectKind::Sentence, 1, true).unwrap();
        assert_eq!(span, Span::chars(p(1, 21), p(1, 27), true));
    }

    #[test]
    fn huge_sentence_count_saturates() {
        let huge = obj(&SENTENCES, p(1, 12), TextObjectKind::Sentence, usize::MAX, true);
        let many = obj(&SENTENCES, p(1, 12), TextObjectKind::Sentence, 1000, true);
        assert_eq!(huge.ok(), many.ok());

        let b = Buffer::from_lines(&SENTENCES);
        let grown = select(
            &b,
            &Options::default(),
            p(1, 12),
            Some(charwise(p(1, 10))),
            TextObject::new(TextObjectKind::Sentence, usize::MAX, true),
        );
        assert!(grown.is_ok_and(|span| span.end.line == 1));
    }

    #[test]
    fn huge_counts_never_panic() {
        let lines = ["a (b [c] \"d\" <x>e</x>).", "", "f"];
        let kinds = [
            TextObjectKind::Word,
            TextObjectKind::Sentence,
            TextObjectKind::Paragraph,
            braces(),
            TextObjectKind::Tag,
            TextObjectKind::Quote('"'),
        ];
        for kind in kinds {
            for include in [false, true] {
                let _ = obj(&lines, p(1, 4), kind, usize::MAX, include);
            }
        }
    }

    // -- Paragraphs ---------------------------------------------------------

    const PARAS: [&str; 5] = ["a", "b", "", "c", "d"];

    #[test]
    fn inner_and_a_paragraph() {
        let ip = obj(&PARAS, p(1, 0), TextObjectKind::Paragraph, 1, false).unwrap();
        assert_eq!(ip, Span::lines(p(1, 0), p(2, 0)));
        let ap = obj(&PARAS, p(1, 0), TextObjectKind::Paragraph, 1, true).unwrap();
        assert_eq!(ap, Span::lines(p(1, 0), p(3, 0)));
    }

    #[test]
    fn a_paragraph_at_end_takes_white_before() {
        let ap = obj(&PARAS, p(5, 0), TextObjectKind::Paragraph, 1, true).unwrap();
        assert_eq!(ap, Span::lines(p(3, 0), p(5, 0)));
    }

    #[test]
    fn paragraph_count_past_end_fails() {
        let err = obj(&PARAS, p(4, 0), TextObjectKind::Paragraph, 3, false);
        assert!(matches!(err, Err(Error::Boundary)));
    }

    #[test]
    fn visual_paragraph_extends_by_lines() {
        let v = Visual::new(p(1, 0), VisualKind::Line);
        let first = vobj(&PARAS, v, p(1, 0), TextObjectKind::Paragraph, false).unwrap();
        assert_eq!(first, visual_span(p(1, 0), p(2, 0), VisualKind::Line));
        let again = vobj(&PARAS, v, p(2, 0), TextObjectKind::Paragraph, false).unwrap();
        assert_eq!(again, visual_span(p(1, 0), p(3, 0), VisualKind::Line));
    }

    // -- Blocks -------------------------------------------------------------

    fn braces() -> TextObjectKind {
        TextObjectKind::block_for('{').unwrap()
    }

    #[test]
    fn inner_and_a_block() {
        let lines = ["f(a, (b), c)"];
        let paren = TextObjectKind::block_for('b').unwrap();
        let ib = obj(&lines, p(1, 3), paren, 1, false).unwrap();
        assert_eq!(ib, Span::chars(p(1, 2), p(1, 10), true));
        let ab = obj(&lines, p(1, 3), paren, 1, true).unwrap();
        assert_eq!(ab, Span::chars(p(1, 1), p(1, 11), true));
        let nested = obj(&lines, p(1, 6), paren, 2, false).unwrap();
        assert_eq!(nested, Span::chars(p(1, 2), p(1, 10), true));
    }

    #[test]
    fn block_on_opener_selects_its_block() {
        let ib = obj(&["(a) (b)"], p(1, 4), TextObjectKind::block_for('(').unwrap(), 1, false).unwrap();
        assert_eq!(ib, Span::chars(p(1, 5), p(1, 5), true));
    }

    #[test]
    fn inner_brace_block_is_linewise_friendly() {
        let lines = ["fn f() {", "    x", "}"];
        let ib = obj(&lines, p(2, 4), braces(), 1, false).unwrap();
        assert_eq!(ib, Span::chars(p(2, 0), p(3, 0), false));
    }

    #[test]
    fn empty_block_is_empty_span() {
        let ib = obj(&["f()"], p(1, 1), TextObjectKind::block_for('(').unwrap(), 1, false).unwrap();
        assert_eq!(ib, Span::chars(p(1, 2), p(1, 2), false));
    }

    #[test]
    fn unmatched_block_fails() {
        let err = obj(&["a (b"], p(1, 3), TextObjectKind::block_for('(').unwrap(), 1, false);
        assert!(matches!(err, Err(Error::UnmatchedDelimiter(')'))));
    }

    #[test]
    fn visual_inner_block_retry_expands_to_outer() {
        let lines = ["{ {x} }"];
        let first = vobj(&lines, charwise(p(1, 3)), p(1, 3), braces(), false).unwrap();
        assert_eq!(first, visual_span(p(1, 1), p(1, 5), VisualKind::Char));
    }

    #[test]
    fn visual_inner_block_grows_again() {
        let lines = ["{ {x} }"];
        let again = vobj(&lines, charwise(p(1, 1)), p(1, 5), braces(), false);
        assert!(matches!(again, Err(Error::UnmatchedDelimiter('{'))));
    }

    // -- Tags ---------------------------------------------------------------

    const HTML: [&str; 1] = ["<div><b>x</b></div>"];

    #[test]
    fn inner_and_a_tag() {
        let it = obj(&HTML, p(1, 8), TextObjectKind::Tag, 1, false).unwrap();
        assert_eq!(it, Span::chars(p(1, 8), p(1, 8), true));
        let at = obj(&HTML, p(1, 8), TextObjectKind::Tag, 1, true).unwrap();
        assert_eq!(at, Span::chars(p(1, 5), p(1, 12), true));
        let outer = obj(&HTML, p(1, 8), TextObjectKind::Tag, 2, false).unwrap();
        assert_eq!(outer, Span::chars(p(1, 5), p(1, 12), true));
    }

    #[test]
    fn tag_names_match_case_insensitively() {
        let it = obj(&["<P>hi</p>"], p(1, 4), TextObjectKind::Tag, 1, false).unwrap();
        assert_eq!(it, Span::chars(p(1, 3), p(1, 4), true));
    }

    #[test]
    fn unclosed_tag_is_skipped() {
        let it = obj(&["<p>a<br>b</p>"], p(1, 8), TextObjectKind::Tag, 1, false).unwrap();
        assert_eq!(it, Span::chars(p(1, 3), p(1, 8), true));
    }

    #[test]
    fn repeated_inner_tag_takes_the_tags() {
        let again = vobj(&HTML, charwise(p(1, 8)), p(1, 8), TextObjectKind::Tag, false).unwrap();
        assert_eq!(again, visual_span(p(1, 5), p(1, 12), VisualKind::Char));
    }

    #[test]
    fn no_tag_fails() {
        let err = obj(&["plain"], p(1, 2), TextObjectKind::Tag, 1, false);
        assert!(matches!(err, Err(Error::UnmatchedDelimiter('<'))));
    }

    // -- Quotes -------------------------------------------------------------

    const QUOTED: [&str; 1] = [r#"x "hello" y"#];

    #[test]
    fn inner_and_a_quote() {
        let iq = obj(&QUOTED, p(1, 4), TextObjectKind::Quote('"'), 1, false).unwrap();
        assert_eq!(iq, Span::chars(p(1, 3), p(1, 8), false));
        let aq = obj(&QUOTED, p(1, 4), TextObjectKind::Quote('"'), 1, true).unwrap();
        assert_eq!(aq, Span::chars(p(1, 2), p(1, 10), false));
    }

    #[test]
    fn quote_from_closing_quote() {
        let iq = obj(&QUOTED, p(1, 8), TextObjectKind::Quote('"'), 1, false).unwrap();
        assert_eq!(iq, Span::chars(p(1, 3), p(1, 8), false));
    }

    #[test]
    fn escaped_quote_is_not_a_delimiter() {
        let iq = obj(&[r#""a\"b""#], p(1, 4), TextObjectKind::Quote('"'), 1, false).unwrap();
        assert_eq!(iq, Span::chars(p(1, 1), p(1, 5), false));
    }

    #[test]
    fn a_quote_at_end_of_line_is_inclusive() {
        let aq = obj(&[r#"x "a""#], p(1, 3), TextObjectKind::Quote('"'), 1, true).unwrap();
        assert_eq!(aq, Span::chars(p(1, 1), p(1, 4), true));
    }

    #[test]
    fn repeated_inner_quote_takes_the_quotes() {
        let first = vobj(&QUOTED, charwise(p(1, 4)), p(1, 4), TextObjectKind::Quote('"'), false).unwrap();
        assert_eq!(first, visual_span(p(1, 3), p(1, 7), VisualKind::Char));
        let again = vobj(&QUOTED, charwise(p(1, 3)), p(1, 7), TextObjectKind::Quote('"'), false).unwrap();
        assert_eq!(again, visual_span(p(1, 2), p(1, 8), VisualKind::Char));
    }

    #[test]
    fn no_quote_fails() {
        let err = obj(&["plain"], p(1, 2), TextObjectKind::Quote('\''), 1, false);
        assert!(matches!(err, Err(Error::UnmatchedDelimiter('\''))));
    }

    // -- Failure ------------------------------------------------------------

    #[test]
    fn failure_leaves_inputs_alone() {
        let b = Buffer::from_lines(&["a (b"]);
        let cursor = p(1, 3);
        let before = cursor;
        let res = select(&b, &Options::default(), cursor, None, TextObject::new(braces(), 1, false));
        assert!(res.is_err());
        assert_eq!(cursor, before);
    }
}
