//! The editing context every command runs against.
//!
//! [`EditorContext`] bundles what vi keeps in globals: the buffer, the
//! cursor and top line of the window showing it, the Visual area, options,
//! marks, search state, the last `f`/`t`, and the message sink. The
//! dispatcher owns one per window and calls into it; nothing here reaches
//! for shared state.
//!
//! Errors come back as `Err` for the dispatcher to act on (beep, flush
//! typeahead). Search errors and wraparound notices also go to the sink
//! when the search asked for messages.

use tracing::{debug, trace};

use crate::address::{self, AddressEnv, AddressRange, SwapPolicy};
use crate::buffer::{Buffer, LineAdjust};
use crate::error::{Error, Result};
use crate::mark::{self, MarkPosition, MarkTable};
use crate::message::{MessageLog, MessageSink};
use crate::mode::{Visual, VisualKind};
use crate::motion::{self, CharSearch, MotionFlags, MotionKind, MotionResult};
use crate::options::{self, Options};
use crate::persist::MarkStore;
use crate::position::{Position, Span, SpanKind};
use crate::search::{Direction, SearchFlags, SearchMove, SearchState};
use crate::text_object::{self, TextObject, TextObjectKind};

/// State for one window onto one buffer.
#[derive(Debug)]
pub struct EditorContext<S: MessageSink = MessageLog> {
    buffer: Buffer,
    options: Options,
    cursor: Position,
    top_line: usize,
    visual: Option<Visual>,
    marks: MarkTable,
    search: SearchState,
    last_find: Option<CharSearch>,
    sink: S,
}

impl EditorContext<MessageLog> {
    /// A context on `buffer` with default options, collecting messages in a
    /// [`MessageLog`].
    #[must_use]
    pub fn new(buffer: Buffer) -> Self {
        Self::with_sink(buffer, Options::default(), MessageLog::new())
    }
}

impl<S: MessageSink> EditorContext<S> {
    #[must_use]
    pub fn with_sink(buffer: Buffer, options: Options, sink: S) -> Self {
        let marks = MarkTable::new(options.jumplist_size);
        Self {
            buffer,
            options,
            cursor: Position::START,
            top_line: 1,
            visual: None,
            marks,
            search: SearchState::new(),
            last_find: None,
            sink,
        }
    }

    // ── Accessors ─────────────────────────────────────────────────────────

    #[must_use]
    pub const fn buffer(&self) -> &Buffer {
        &self.buffer
    }

    #[must_use]
    pub const fn options(&self) -> &Options {
        &self.options
    }

    #[must_use]
    pub const fn cursor(&self) -> Position {
        self.cursor
    }

    /// Move the cursor, clamped into the buffer.
    pub fn set_cursor(&mut self, pos: Position) {
        self.cursor = self.buffer.clamp(pos, self.visual.is_some());
    }

    /// First line shown in the window.
    #[must_use]
    pub const fn top_line(&self) -> usize {
        self.top_line
    }

    pub fn set_top_line(&mut self, line: usize) {
        self.top_line = line.clamp(1, self.buffer.line_count());
    }

    #[must_use]
    pub const fn visual(&self) -> Option<Visual> {
        self.visual
    }

    #[must_use]
    pub const fn marks(&self) -> &MarkTable {
        &self.marks
    }

    #[must_use]
    pub const fn search_state(&self) -> &SearchState {
        &self.search
    }

    pub fn search_state_mut(&mut self) -> &mut SearchState {
        &mut self.search
    }

    #[must_use]
    pub const fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// The pattern `n` searches for.
    #[must_use]
    pub fn last_pattern(&self) -> Option<&str> {
        self.search.last_pattern()
    }

    // ── Options ───────────────────────────────────────────────────────────

    /// Run the arguments of `:set`. Returns the text queries and listings
    /// want shown.
    ///
    /// # Errors
    ///
    /// The first directive that fails; earlier ones stay applied.
    pub fn set(&mut self, args: &str) -> Result<Vec<String>> {
        let mut shown = Vec::new();
        for directive in options::parse_set(args) {
            if let Some(text) = self.options.apply(&directive)? {
                shown.push(text);
            }
        }
        Ok(shown)
    }

    /// Replace every option at once.
    pub fn set_options(&mut self, options: Options) {
        self.marks.jumps.set_capacity(options.jumplist_size);
        self.options = options;
    }

    // ── Visual mode ───────────────────────────────────────────────────────

    /// Start Visual mode with the anchor on the cursor.
    pub fn start_visual(&mut self, kind: VisualKind) {
        self.visual = Some(Visual::new(self.cursor, kind));
    }

    /// Leave Visual mode, remembering the area for `'<`, `'>` and `gv`.
    pub fn end_visual(&mut self) {
        if let Some(v) = self.visual.take() {
            self.marks.set_visual(v.anchor, self.cursor, v.kind);
            self.cursor = self.buffer.clamp(self.cursor, false);
        }
    }

    // ── Motions and text objects ──────────────────────────────────────────

    /// Run a motion from the cursor. Without [`MotionFlags::OPERATOR`] the
    /// cursor moves to the result.
    ///
    /// # Errors
    ///
    /// As [`motion::resolve`]. The cursor does not move on failure.
    pub fn run_motion(&mut self, kind: MotionKind, count: usize, flags: MotionFlags) -> Result<MotionResult> {
        let start = self.cursor;
        let Self {
            buffer,
            options,
            search,
            last_find,
            sink,
            ..
        } = self;
        let buffer: &Buffer = buffer;
        let options: &Options = options;
        let search_next = |reverse: bool, count: usize| {
            let mut flags = SearchFlags::MSG | SearchFlags::OPT | SearchFlags::ECHO;
            if reverse {
                flags |= SearchFlags::REV;
            }
            let mv = search.do_search(buffer, options, start, None, "", count, flags);
            report_search(sink, flags, &mv);
            mv.map(|mv| mv.pos)
        };
        let result = motion::resolve(buffer, options, last_find, start, kind, count, flags, search_next)?;

        if self.is_jump(start, &result) {
            self.marks.jumps.set_pcmark(start);
        }
        if !flags.contains(MotionFlags::OPERATOR) {
            self.cursor = result.pos;
        }
        trace!(?kind, ?start, pos = ?result.pos, "motion");
        Ok(result)
    }

    fn is_jump(&self, start: Position, result: &MotionResult) -> bool {
        let threshold = self.options.jump_threshold;
        result.jump || (threshold > 0 && start.line.abs_diff(result.pos.line) >= threshold)
    }

    /// Select a text object around the cursor. In Visual mode the area is
    /// extended or replaced and the cursor moves to its new end.
    ///
    /// # Errors
    ///
    /// As [`text_object::select`]. Nothing changes on failure.
    pub fn run_text_object(
        &mut self,
        kind: TextObjectKind,
        count: usize,
        include: bool,
        big_word: bool,
    ) -> Result<Span> {
        let obj = TextObject {
            big_word,
            ..TextObject::new(kind, count, include)
        };
        let start = self.cursor;
        let fresh = self.visual.is_none_or(|v| v.is_empty_at(start));
        let span = text_object::select(&self.buffer, &self.options, start, self.visual, obj)?;

        if fresh && matches!(kind, TextObjectKind::Block { .. } | TextObjectKind::Tag) {
            self.marks.jumps.set_pcmark(start);
        }
        if let Some(v) = self.visual.as_mut() {
            v.anchor = span.start;
            v.kind = match (span.kind, v.kind) {
                (SpanKind::Line, _) => VisualKind::Line,
                (_, VisualKind::Line) => VisualKind::Char,
                (_, kind) => kind,
            };
            self.cursor = span.end;
        }
        Ok(span)
    }

    // ── Search ────────────────────────────────────────────────────────────

    /// `/` and `?` (or `n`/`N` with empty `input` and `dir` of `None`).
    /// With [`SearchFlags::PEEK`] the cursor stays put.
    ///
    /// # Errors
    ///
    /// As [`SearchState::do_search`].
    pub fn search(
        &mut self,
        dir: Option<Direction>,
        input: &str,
        count: usize,
        flags: SearchFlags,
    ) -> Result<SearchMove> {
        let start = self.cursor;
        let mv = self
            .search
            .do_search(&self.buffer, &self.options, start, dir, input, count, flags);
        report_search(&mut self.sink, flags, &mv);
        let mv = mv?;
        if flags.contains(SearchFlags::MARK) {
            self.marks.jumps.set_pcmark(start);
        }
        if !flags.contains(SearchFlags::PEEK) {
            self.cursor = mv.pos;
        }
        Ok(mv)
    }

    // ── Marks and jumps ───────────────────────────────────────────────────

    /// `m{name}` at the cursor.
    ///
    /// # Errors
    ///
    /// [`Error::NoSuchMark`] for names that cannot be set.
    pub fn set_mark(&mut self, name: char) -> Result<()> {
        self.set_mark_at(name, self.cursor)
    }

    /// Set mark `name` to `pos`.
    ///
    /// # Errors
    ///
    /// [`Error::NoSuchMark`] for names that cannot be set.
    pub fn set_mark_at(&mut self, name: char, pos: Position) -> Result<()> {
        self.marks.set(name, pos, self.cursor, &self.buffer)
    }

    /// Where mark `name` points.
    ///
    /// # Errors
    ///
    /// As [`MarkTable::get`].
    pub fn get_mark(&self, name: char, allow_file_change: bool) -> Result<MarkPosition> {
        self.marks.get(name, &self.buffer, allow_file_change)
    }

    /// `'x` and `` `x ``: jump to a mark in this buffer, recording the jump.
    /// A mark in another file is returned for the host to open.
    ///
    /// # Errors
    ///
    /// As [`MarkTable::get`].
    pub fn goto_mark(&mut self, name: char) -> Result<MarkPosition> {
        if matches!(name, '\'' | '`') {
            self.marks.jumps.check_pcmark(self.cursor);
        }
        let target = self.marks.get(name, &self.buffer, true)?;
        if let MarkPosition::Here(pos) = target {
            self.marks.jumps.set_pcmark(self.cursor);
            self.cursor = self.buffer.clamp(pos, false);
        }
        Ok(target)
    }

    /// `:delmarks {names}` and `:delmarks!`. Nothing is deleted when any
    /// name is bad.
    ///
    /// # Errors
    ///
    /// [`Error::ArgumentRequired`] with neither names nor `!`, and
    /// [`Error::InvalidArgument`] for names with `!` or a bad name or range.
    pub fn delete_marks(&mut self, args: &str, bang: bool) -> Result<()> {
        let args = args.trim();
        match (bang, args.is_empty()) {
            (true, true) => {
                self.marks.delete_all_local();
                return Ok(());
            }
            (true, false) => return Err(Error::InvalidArgument(args.to_string())),
            (false, true) => return Err(Error::ArgumentRequired),
            (false, false) => {}
        }
        for name in mark::parse_mark_list(args)? {
            self.marks.delete(name)?;
        }
        Ok(())
    }

    /// Record the cursor in the jump list (`m'` without moving).
    pub fn push_jump(&mut self) {
        self.marks.jumps.set_pcmark(self.cursor);
    }

    /// `Ctrl+O` (negative `count`) and `Ctrl+I`.
    ///
    /// # Errors
    ///
    /// [`Error::Boundary`] when the history has no entry that far away.
    pub fn move_jump(&mut self, count: isize) -> Result<Position> {
        let pos = self.marks.jumps.move_by(count, self.cursor).ok_or(Error::Boundary)?;
        self.cursor = self.buffer.clamp(pos, false);
        Ok(self.cursor)
    }

    // ── Ranges ────────────────────────────────────────────────────────────

    /// Resolve the range in front of an Ex command. Search addresses
    /// report misses to the sink.
    ///
    /// # Errors
    ///
    /// As [`address::parse_range`].
    pub fn resolve_address_range<'t>(
        &mut self,
        text: &'t str,
        policy: SwapPolicy<'_>,
    ) -> Result<AddressRange<'t>> {
        let mut env = AddressEnv {
            buf: &self.buffer,
            opts: &self.options,
            marks: &self.marks,
            search: &mut self.search,
            cursor: self.cursor,
        };
        let range = address::parse_range(&mut env, text, policy);
        if let Err(err @ (Error::NoMatch { .. } | Error::NoPreviousPattern | Error::NoPreviousSubstitute)) =
            &range
        {
            self.sink.error(&err.to_string());
        }
        range
    }

    // ── Edits ─────────────────────────────────────────────────────────────

    /// Insert `text` at `pos`.
    ///
    /// # Errors
    ///
    /// [`Error::Buffer`] when `pos` is outside the buffer.
    pub fn insert(&mut self, pos: Position, text: &str) -> Result<()> {
        let adjust = self.buffer.insert(pos, text)?;
        let end = self.last_inserted(pos, text);
        self.after_edit(&adjust, pos, end);
        Ok(())
    }

    /// Delete `start..end`.
    ///
    /// # Errors
    ///
    /// [`Error::Buffer`] for positions outside the buffer or out of order.
    pub fn delete(&mut self, start: Position, end: Position) -> Result<()> {
        let adjust = self.buffer.delete(start, end)?;
        self.after_edit(&adjust, start, start);
        Ok(())
    }

    /// Replace `start..end` with `text`.
    ///
    /// # Errors
    ///
    /// As [`delete`](Self::delete).
    pub fn replace(&mut self, start: Position, end: Position, text: &str) -> Result<()> {
        let adjust = self.buffer.replace(start, end, text)?;
        let end = self.last_inserted(start, text);
        self.after_edit(&adjust, start, end);
        Ok(())
    }

    /// The last char of `text` after inserting it at `start`.
    fn last_inserted(&self, start: Position, text: &str) -> Position {
        let from = self.buffer.offset(start);
        self.buffer.position_at(from + text.chars().count().saturating_sub(1))
    }

    /// Delete lines `first..=last`.
    ///
    /// # Errors
    ///
    /// [`Error::Buffer`] when the lines do not exist.
    pub fn delete_lines(&mut self, first: usize, last: usize) -> Result<()> {
        let adjust = self.buffer.delete_lines(first, last)?;
        let at = Position::new(first.min(self.buffer.line_count()), 0);
        self.after_edit(&adjust, at, at);
        Ok(())
    }

    /// Append `lines` after line `after` (0 puts them first).
    ///
    /// # Errors
    ///
    /// [`Error::Buffer`] when `after` is past the end.
    pub fn insert_lines<T: AsRef<str>>(&mut self, after: usize, lines: &[T]) -> Result<()> {
        let adjust = self.buffer.insert_lines(after, lines)?;
        if lines.is_empty() {
            return Ok(());
        }
        let start = Position::new(after + 1, 0);
        let end = Position::new(after + lines.len(), 0);
        self.after_edit(&adjust, start, end);
        Ok(())
    }

    fn after_edit(&mut self, adjust: &[LineAdjust], start: Position, end: Position) {
        for a in adjust {
            self.marks.adjust(a, &self.buffer);
            if let Some(line) = a.apply(self.cursor.line) {
                self.cursor.line = line;
            } else {
                self.cursor = Position::new(a.line1, 0);
            }
        }
        self.marks.set_changed(start, end);
        self.cursor = self.buffer.clamp(self.cursor, self.visual.is_some());
        self.top_line = self.top_line.clamp(1, self.buffer.line_count());
    }

    // ── Buffer lifetime ───────────────────────────────────────────────────

    /// Leaving the buffer: remember its marks in `store` (if it has a
    /// path) and forget them here. The store keeps at most
    /// `persisted_files` files.
    pub fn close_buffer(&mut self, store: &mut MarkStore) {
        store.set_limit(self.options.persisted_files);
        match self.buffer.path() {
            Some(path) => store.remember(path, &self.marks, self.cursor),
            None => store.remember_file_marks(&self.marks),
        }
        self.marks.clear_buffer_marks();
        self.marks.jumps.clear();
        self.visual = None;
    }

    /// Switch to `buffer`, restoring marks `store` remembers for it.
    /// Closes the current buffer first.
    pub fn open_buffer(&mut self, buffer: Buffer, store: &mut MarkStore) {
        self.close_buffer(store);
        self.buffer = buffer;
        self.cursor = Position::START;
        self.top_line = 1;
        let restored = match self.buffer.path() {
            Some(path) => store.restore_into(path, &mut self.marks),
            None => {
                store.restore_file_marks_into(&mut self.marks);
                false
            }
        };
        debug!(restored, "buffer opened");
    }
}

/// Forward a search outcome to the sink when `flags` ask for messages.
fn report_search<S: MessageSink>(sink: &mut S, flags: SearchFlags, result: &Result<SearchMove>) {
    if !flags.contains(SearchFlags::MSG) {
        return;
    }
    match result {
        Ok(mv) if mv.wrapped => sink.status(match mv.direction {
            Direction::Forward => "search hit BOTTOM, continuing at TOP",
            Direction::Backward => "search hit TOP, continuing at BOTTOM",
        }),
        Ok(_) => {}
        Err(err) => sink.error(&err.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Message;
    use pretty_assertions::assert_eq;
    use std::path::Path;

    fn p(line: usize, col: usize) -> Position {
        Position::new(line, col)
    }

    fn ctx(lines: &[&str]) -> EditorContext {
        EditorContext::new(Buffer::from_lines(lines))
    }

    fn texts(c: &EditorContext) -> Vec<&str> {
        c.sink().messages().iter().map(Message::text).collect()
    }

    // -- Motions ------------------------------------------------------------

    #[test]
    fn motion_moves_cursor() {
        let mut c = ctx(&["foo bar baz"]);
        let r = c.run_motion(MotionKind::WordForward, 2, MotionFlags::empty()).unwrap();
        assert_eq!(r.pos, p(1, 8));
        assert_eq!(c.cursor(), p(1, 8));
    }

    #[test]
    fn operator_motion_leaves_cursor() {
        let mut c = ctx(&["foo bar"]);
        let r = c.run_motion(MotionKind::WordForward, 1, MotionFlags::OPERATOR).unwrap();
        assert_eq!(r.pos, p(1, 4));
        assert_eq!(c.cursor(), p(1, 0));
    }

    #[test]
    fn failed_motion_keeps_cursor() {
        let mut c = ctx(&["foo bar"]);
        assert!(matches!(
            c.run_motion(MotionKind::WordBackward, 1, MotionFlags::empty()),
            Err(Error::Boundary)
        ));
        assert_eq!(c.cursor(), p(1, 0));
    }

    #[test]
    fn paragraph_motion_records_jump() {
        let mut c = ctx(&["a", "b", "", "c"]);
        c.run_motion(MotionKind::ParagraphForward, 1, MotionFlags::empty()).unwrap();
        assert_eq!(c.cursor(), p(3, 0));
        assert_eq!(c.marks().jumps.pcmark(), Some(p(1, 0)));
    }

    #[test]
    fn long_word_motion_records_jump() {
        let lines = ["w"; 10];
        let mut c = ctx(&lines);
        c.run_motion(MotionKind::WordForward, 6, MotionFlags::empty()).unwrap();
        assert_eq!(c.cursor(), p(7, 0));
        assert_eq!(c.marks().jumps.pcmark(), Some(p(1, 0)));

        c.run_motion(MotionKind::WordForward, 1, MotionFlags::empty()).unwrap();
        assert_eq!(c.marks().jumps.pcmark(), Some(p(1, 0)));
    }

    #[test]
    fn char_find_is_repeatable() {
        let mut c = ctx(&["a,b,c,d"]);
        c.run_motion(
            MotionKind::FindChar {
                ch: ',',
                forward: true,
                till: false,
            },
            1,
            MotionFlags::empty(),
        )
        .unwrap();
        c.run_motion(MotionKind::RepeatFindChar { reverse: false }, 1, MotionFlags::empty())
            .unwrap();
        assert_eq!(c.cursor(), p(1, 3));
    }

    // -- Search -------------------------------------------------------------

    #[test]
    fn search_moves_and_reports_wrap() {
        let mut c = ctx(&["abc", "def", "abc"]);
        let flags = SearchFlags::MSG | SearchFlags::OPT | SearchFlags::MARK;
        let mv = c.search(Some(Direction::Forward), "abc", 1, flags).unwrap();
        assert_eq!(mv.pos, p(3, 0));
        assert_eq!(c.cursor(), p(3, 0));
        assert_eq!(c.marks().jumps.pcmark(), Some(p(1, 0)));
        assert!(c.sink().is_empty());

        c.search(None, "", 1, flags).unwrap();
        assert_eq!(c.cursor(), p(1, 0));
        assert_eq!(texts(&c), vec!["search hit BOTTOM, continuing at TOP"]);
        assert_eq!(c.last_pattern(), Some("abc"));
    }

    #[test]
    fn search_miss_reports_and_keeps_cursor() {
        let mut c = ctx(&["abc"]);
        let err = c
            .search(Some(Direction::Forward), "zzz", 1, SearchFlags::MSG)
            .unwrap_err();
        assert!(matches!(err, Error::NoMatch { .. }));
        assert_eq!(c.cursor(), p(1, 0));
        assert_eq!(texts(&c), vec!["E486: Pattern not found: zzz"]);
    }

    #[test]
    fn search_next_motion_uses_last_pattern() {
        let mut c = ctx(&["x foo", "foo", "bar foo"]);
        c.search(Some(Direction::Forward), "foo", 1, SearchFlags::OPT).unwrap();
        assert_eq!(c.cursor(), p(1, 2));
        c.run_motion(MotionKind::SearchNext { reverse: false }, 1, MotionFlags::empty())
            .unwrap();
        assert_eq!(c.cursor(), p(2, 0));
        c.run_motion(MotionKind::SearchNext { reverse: true }, 1, MotionFlags::empty())
            .unwrap();
        assert_eq!(c.cursor(), p(1, 2));
    }

    #[test]
    fn peek_does_not_move() {
        let mut c = ctx(&["abc", "def"]);
        let mv = c
            .search(Some(Direction::Forward), "def", 1, SearchFlags::PEEK)
            .unwrap();
        assert_eq!(mv.pos, p(2, 0));
        assert_eq!(c.cursor(), p(1, 0));
    }

    // -- Text objects -------------------------------------------------------

    #[test]
    fn text_object_outside_visual() {
        let mut c = ctx(&["foo   bar"]);
        let span = c.run_text_object(TextObjectKind::Word, 1, true, false).unwrap();
        assert_eq!(span, Span::chars(p(1, 0), p(1, 5), true));
        assert_eq!(c.cursor(), p(1, 0));
    }

    #[test]
    fn text_object_extends_visual() {
        let mut c = ctx(&["(a b)"]);
        c.set_cursor(p(1, 2));
        c.start_visual(VisualKind::Char);
        let span = c
            .run_text_object(TextObjectKind::block_for('(').unwrap(), 1, false, false)
            .unwrap();
        assert_eq!(span, Span::chars(p(1, 1), p(1, 3), true));
        assert_eq!(c.visual().map(|v| v.anchor), Some(p(1, 1)));
        assert_eq!(c.cursor(), p(1, 3));
        assert_eq!(c.marks().jumps.pcmark(), Some(p(1, 2)));
    }

    #[test]
    fn block_retry_expands_to_outer_block() {
        let mut c = ctx(&["{ {x} }"]);
        c.set_cursor(p(1, 3));
        c.start_visual(VisualKind::Char);
        let inner = TextObjectKind::block_for('{').unwrap();
        let span = c.run_text_object(inner, 1, false, false).unwrap();
        assert_eq!(span, Span::chars(p(1, 1), p(1, 5), true));
        assert_eq!((c.visual().map(|v| v.anchor), c.cursor()), (Some(p(1, 1)), p(1, 5)));
    }

    #[test]
    fn paragraph_object_turns_visual_linewise() {
        let mut c = ctx(&["a", "b", "", "c"]);
        c.start_visual(VisualKind::Char);
        c.run_text_object(TextObjectKind::Paragraph, 1, false, false).unwrap();
        assert_eq!(c.visual().map(|v| v.kind), Some(VisualKind::Line));
        assert_eq!(c.cursor().line, 2);
    }

    // -- Marks and jumps ----------------------------------------------------

    #[test]
    fn goto_mark_records_jump() {
        let mut c = ctx(&["one", "two", "three"]);
        c.set_cursor(p(3, 2));
        c.set_mark('a').unwrap();
        c.set_cursor(p(1, 0));

        assert_eq!(c.goto_mark('a').unwrap(), MarkPosition::Here(p(3, 2)));
        assert_eq!(c.cursor(), p(3, 2));
        c.goto_mark('\'').unwrap();
        assert_eq!(c.cursor(), p(1, 0));
        c.goto_mark('\'').unwrap();
        assert_eq!(c.cursor(), p(3, 2));
    }

    #[test]
    fn unknown_and_unset_marks() {
        let mut c = ctx(&["x"]);
        assert!(matches!(c.goto_mark('#'), Err(Error::NoSuchMark('#'))));
        assert!(matches!(c.get_mark('q', false), Err(Error::MarkNotSet('q'))));
    }

    #[test]
    fn mark_on_deleted_line_is_invalid() {
        let mut c = ctx(&["1", "2", "3", "4"]);
        c.set_cursor(p(3, 0));
        c.set_mark('a').unwrap();
        c.delete_lines(3, 3).unwrap();
        assert!(matches!(c.get_mark('a', false), Err(Error::MarkInvalidated('a'))));
        let err = c.goto_mark('a').unwrap_err();
        assert_eq!(err.to_string(), "E19: Mark has invalid line number");
        assert_eq!(c.cursor(), p(3, 0));
    }

    #[test]
    fn delmarks_names_ranges_and_bang() {
        let mut c = ctx(&["1", "2", "3"]);
        for (name, line) in [('a', 1), ('b', 2), ('c', 3), ('d', 3), ('F', 2)] {
            c.set_mark_at(name, p(line, 0)).unwrap();
        }
        c.delete_marks("a-b F", false).unwrap();
        assert!(matches!(c.get_mark('a', false), Err(Error::MarkNotSet('a'))));
        assert!(matches!(c.get_mark('b', false), Err(Error::MarkNotSet('b'))));
        assert!(matches!(c.get_mark('F', false), Err(Error::MarkNotSet('F'))));
        assert_eq!(c.get_mark('c', false).unwrap(), MarkPosition::Here(p(3, 0)));

        // A bad entry deletes nothing.
        assert!(matches!(c.delete_marks("c #", false), Err(Error::InvalidArgument(_))));
        assert!(c.get_mark('c', false).is_ok());

        assert!(matches!(c.delete_marks("", false), Err(Error::ArgumentRequired)));
        assert!(matches!(c.delete_marks("c", true), Err(Error::InvalidArgument(_))));
        c.delete_marks("", true).unwrap();
        assert_eq!(c.marks().local_marks().count(), 0);
    }

    #[test]
    fn jump_navigation() {
        let mut c = ctx(&["1", "2", "3", "4", "5"]);
        c.push_jump();
        c.set_cursor(p(3, 0));
        c.push_jump();
        c.set_cursor(p(5, 0));

        assert_eq!(c.move_jump(-1).unwrap(), p(3, 0));
        assert_eq!(c.move_jump(-1).unwrap(), p(1, 0));
        assert!(matches!(c.move_jump(-1), Err(Error::Boundary)));
        assert_eq!(c.move_jump(2).unwrap(), p(5, 0));
    }

    #[test]
    fn visual_marks_after_leaving_visual() {
        let mut c = ctx(&["abc", "def"]);
        c.set_cursor(p(2, 2));
        c.start_visual(VisualKind::Line);
        c.set_cursor(p(1, 1));
        c.end_visual();
        assert_eq!(c.get_mark('<', false).unwrap(), MarkPosition::Here(p(1, 0)));
        assert_eq!(c.get_mark('>', false).unwrap(), MarkPosition::Here(p(2, 2)));
    }

    // -- Edits --------------------------------------------------------------

    #[test]
    fn edits_adjust_marks_and_cursor() {
        let mut c = ctx(&["a", "b", "c", "d"]);
        c.set_cursor(p(4, 0));
        c.set_mark('a').unwrap();
        c.set_cursor(p(2, 0));
        c.set_mark('b').unwrap();
        c.set_cursor(p(3, 0));

        c.delete_lines(2, 2).unwrap();
        assert_eq!(c.get_mark('a', false).unwrap(), MarkPosition::Here(p(3, 0)));
        assert!(matches!(c.get_mark('b', false), Err(Error::MarkInvalidated('b'))));
        assert_eq!(c.cursor(), p(2, 0));
        assert_eq!(c.get_mark('.', false).unwrap(), MarkPosition::Here(p(2, 0)));

        c.insert_lines(0, &["new"]).unwrap();
        assert_eq!(c.get_mark('a', false).unwrap(), MarkPosition::Here(p(4, 0)));
        assert_eq!(c.cursor(), p(3, 0));
    }

    #[test]
    fn insert_text_sets_change_marks() {
        let mut c = ctx(&["ac"]);
        c.insert(p(1, 1), "b").unwrap();
        assert_eq!(c.buffer().line_text(1), "abc");
        assert_eq!(c.get_mark('[', false).unwrap(), MarkPosition::Here(p(1, 1)));
        assert_eq!(c.get_mark(']', false).unwrap(), MarkPosition::Here(p(1, 1)));
    }

    // -- Ranges -------------------------------------------------------------

    #[test]
    fn range_through_context() {
        let mut c = ctx(&["a", "b", "c", "d"]);
        c.set_cursor(p(2, 0));
        c.set_mark('x').unwrap();
        let r = c.resolve_address_range("'x,$d", SwapPolicy::AutoSwap).unwrap();
        assert_eq!((r.line1, r.line2, r.addr_count, r.rest), (2, 4, 2, "d"));
        assert_eq!(c.cursor(), p(2, 0));
    }

    // -- Messages -----------------------------------------------------------

    #[test]
    fn wraparound_is_reported() {
        let mut c = ctx(&["foo", "bar", "foo"]);
        c.set_cursor(p(3, 0));
        let mv = c.search(Some(Direction::Forward), "foo", 1, SearchFlags::MSG).unwrap();
        assert_eq!(mv.pos, p(1, 0));
        let mv = c.search(Some(Direction::Backward), "foo", 1, SearchFlags::MSG).unwrap();
        assert_eq!(mv.pos, p(3, 0));
        assert_eq!(
            texts(&c),
            vec![
                "search hit BOTTOM, continuing at TOP",
                "search hit TOP, continuing at BOTTOM",
            ]
        );
        assert!(c.sink().messages().iter().all(|m| !m.is_error()));
    }

    #[test]
    fn misses_are_reported_as_errors() {
        let mut c = ctx(&["foo", "bar", "foo"]);
        assert!(c.search(Some(Direction::Forward), "zzz", 1, SearchFlags::MSG).is_err());

        c.set("nows").unwrap();
        c.set_cursor(p(3, 0));
        assert!(c.search(Some(Direction::Forward), "foo", 1, SearchFlags::MSG).is_err());
        c.set_cursor(p(1, 0));
        assert!(c.search(Some(Direction::Backward), "foo", 1, SearchFlags::MSG).is_err());

        assert_eq!(
            texts(&c),
            vec![
                "E486: Pattern not found: zzz",
                "search hit BOTTOM without match for: foo",
                "search hit TOP without match for: foo",
            ]
        );
        assert!(c.sink().messages().iter().all(Message::is_error));
    }

    #[test]
    fn quiet_search_reports_nothing() {
        let mut c = ctx(&["foo", "foo"]);
        c.set_cursor(p(2, 0));
        c.search(Some(Direction::Forward), "foo", 1, SearchFlags::empty()).unwrap();
        assert!(c.search(Some(Direction::Forward), "zzz", 1, SearchFlags::empty()).is_err());
        assert!(c.sink().is_empty());
    }

    #[test]
    fn n_reports_through_the_sink() {
        let mut c = ctx(&["foo", "foo"]);
        c.set_cursor(p(2, 0));
        c.search(Some(Direction::Forward), "foo", 1, SearchFlags::HIS).unwrap();
        assert_eq!(c.cursor(), p(1, 0));
        assert!(c.sink().is_empty());

        let next = MotionKind::SearchNext { reverse: false };
        c.run_motion(next, 1, MotionFlags::empty()).unwrap();
        assert_eq!(c.cursor(), p(2, 0));
        c.run_motion(next, 1, MotionFlags::empty()).unwrap();
        assert_eq!(c.cursor(), p(1, 0));
        assert_eq!(texts(&c), vec!["search hit BOTTOM, continuing at TOP"]);
    }

    #[test]
    fn range_search_miss_is_reported() {
        let mut c = ctx(&["a", "b"]);
        assert!(c.resolve_address_range("/zz/", SwapPolicy::AutoSwap).is_err());
        assert_eq!(texts(&c), vec!["E486: Pattern not found: zz"]);
    }

    // -- Options ------------------------------------------------------------

    #[test]
    fn set_applies_directives() {
        let mut c = ctx(&["x"]);
        assert!(c.set("ic nows").unwrap().is_empty());
        assert!(c.options().ignorecase);
        assert!(!c.options().wrapscan);
        assert_eq!(c.set("ic?").unwrap(), vec!["ignorecase".to_string()]);
        assert!(matches!(c.set("bogus"), Err(Error::UnknownOption(_))));
    }

    #[test]
    fn set_options_resizes_jump_list() {
        let mut c = ctx(&["1", "2", "3", "4"]);
        for line in 1..=4 {
            c.set_cursor(p(line, 0));
            c.push_jump();
        }
        c.set_options(Options {
            jumplist_size: 2,
            ..Options::default()
        });
        assert_eq!(c.marks().jumps.len(), 2);
    }

    // -- Buffer lifetime ----------------------------------------------------

    #[test]
    fn file_marks_survive_a_new_session() {
        let dir = tempfile::tempdir().unwrap();
        let saved = dir.path().join("marks.json");
        let file_a = || {
            let mut a = Buffer::from_lines(&["one", "two", "three"]);
            a.set_path("/tmp/a.txt".into());
            a
        };

        let mut c = EditorContext::new(file_a());
        c.set_cursor(p(2, 0));
        c.set_mark('a').unwrap();
        c.set_cursor(p(3, 1));
        c.set_mark('A').unwrap();
        let mut store = MarkStore::default();
        c.close_buffer(&mut store);
        store.save(&saved).unwrap();

        let mut loaded = MarkStore::load(&saved, 25).unwrap();
        let mut other = Buffer::from_lines(&["x"]);
        other.set_path("/tmp/b.txt".into());
        let mut next = EditorContext::new(Buffer::from_lines(&[""]));
        next.open_buffer(other, &mut loaded);
        assert_eq!(
            next.get_mark('A', true).unwrap(),
            MarkPosition::OtherFile {
                path: "/tmp/a.txt".into(),
                pos: p(3, 1),
            }
        );

        next.open_buffer(file_a(), &mut loaded);
        assert_eq!(next.get_mark('a', false).unwrap(), MarkPosition::Here(p(2, 0)));
        assert_eq!(next.get_mark('A', false).unwrap(), MarkPosition::Here(p(3, 1)));
    }

    #[test]
    fn store_keeps_persisted_files() {
        let mut c = ctx(&["x"]);
        c.set_options(Options {
            persisted_files: 2,
            ..Options::default()
        });
        let mut store = MarkStore::default();
        for name in ["/tmp/1", "/tmp/2", "/tmp/3", "/tmp/4"] {
            let mut b = Buffer::from_lines(&["x"]);
            b.set_path(name.into());
            c.open_buffer(b, &mut store);
        }
        c.close_buffer(&mut store);
        assert_eq!(
            store.paths().collect::<Vec<_>>(),
            vec![Path::new("/tmp/4"), Path::new("/tmp/3")]
        );
    }

    #[test]
    fn marks_survive_close_and_reopen() {
        let mut store = MarkStore::default();
        let mut first = Buffer::from_lines(&["one", "two", "three"]);
        first.set_path("/tmp/first.txt".into());
        let mut c = EditorContext::new(first);
        c.set_cursor(p(2, 1));
        c.set_mark('a').unwrap();
        c.set_cursor(p(3, 0));

        let mut second = Buffer::from_lines(&["other"]);
        second.set_path("/tmp/second.txt".into());
        c.open_buffer(second, &mut store);
        assert!(matches!(c.get_mark('a', false), Err(Error::MarkNotSet('a'))));
        assert!(c.marks().jumps.is_empty());

        let mut again = Buffer::from_lines(&["one", "two", "three"]);
        again.set_path("/tmp/first.txt".into());
        c.open_buffer(again, &mut store);
        assert_eq!(c.get_mark('a', false).unwrap(), MarkPosition::Here(p(2, 1)));
        assert_eq!(c.get_mark('"', false).unwrap(), MarkPosition::Here(p(3, 0)));
        assert_eq!(
            store.paths().collect::<Vec<_>>(),
            vec![Path::new("/tmp/first.txt"), Path::new("/tmp/second.txt")]
        );
    }
}
