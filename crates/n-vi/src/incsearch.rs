//! Incremental search.
//!
//! While the user types a `/` or `?` pattern, every keystroke calls
//! [`IncrementalSearch::update`] with the text so far. The search runs from
//! where the cursor was when the command line opened, without touching the
//! remembered pattern, direction or history, and the cursor follows the
//! match. `Esc` is [`cancel`](IncrementalSearch::cancel): cursor and top
//! line go back. `Enter` is [`accept`](IncrementalSearch::accept): the
//! search runs for real.
//!
//! Hosts should coalesce keystrokes on large buffers; each update is a full
//! search.

use tracing::trace;

use crate::context::EditorContext;
use crate::error::Result;
use crate::message::MessageSink;
use crate::position::{Position, Span};
use crate::search::{Direction, SearchFlags, SearchMove};

/// One `/` or `?` command line in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IncrementalSearch {
    direction: Direction,
    saved_cursor: Position,
    saved_top: usize,
    current: Option<Span>,
}

impl IncrementalSearch {
    /// Open the command line, remembering the view to return to.
    #[must_use]
    pub fn begin<S: MessageSink>(ctx: &EditorContext<S>, direction: Direction) -> Self {
        Self {
            direction,
            saved_cursor: ctx.cursor(),
            saved_top: ctx.top_line(),
            current: None,
        }
    }

    #[must_use]
    pub const fn direction(&self) -> Direction {
        self.direction
    }

    /// Where the cursor was before the command line opened.
    #[must_use]
    pub const fn saved_cursor(&self) -> Position {
        self.saved_cursor
    }

    /// The match shown for the current input.
    #[must_use]
    pub const fn current(&self) -> Option<Span> {
        self.current
    }

    /// Search for `input` (the command line so far) and move the cursor to
    /// the match. Returns the match to highlight; `None` when the input is
    /// empty or matches nothing, with the cursor back where it started.
    /// With `incsearch` off nothing is searched until
    /// [`accept`](Self::accept).
    pub fn update<S: MessageSink>(&mut self, ctx: &mut EditorContext<S>, input: &str) -> Option<Span> {
        self.current = None;
        ctx.set_cursor(self.saved_cursor);
        if input.is_empty() || !ctx.options().incsearch {
            ctx.set_top_line(self.saved_top);
            return None;
        }

        let flags = SearchFlags::KEEP | SearchFlags::OPT | SearchFlags::NOOF | SearchFlags::PEEK;
        let mv = match ctx.search(Some(self.direction), input, 1, flags) {
            Ok(mv) => mv,
            Err(err) => {
                trace!(%err, "incsearch miss");
                ctx.set_top_line(self.saved_top);
                return None;
            }
        };
        let span = Span::chars(mv.pos, mv.pos.with_col(mv.pos.col + mv.len), false);
        ctx.set_cursor(mv.pos);
        self.current = Some(span);
        trace!(?span, "incsearch match");
        Some(span)
    }

    /// `Esc`: put the cursor and view back.
    pub fn cancel<S: MessageSink>(self, ctx: &mut EditorContext<S>) {
        ctx.set_cursor(self.saved_cursor);
        ctx.set_top_line(self.saved_top);
    }

    /// `Enter`: run the search for `input` from the original cursor,
    /// remembering the pattern, direction and offset for `n`, recording it
    /// in the history and the jump list. An empty `input` repeats the last
    /// search.
    ///
    /// # Errors
    ///
    /// As [`EditorContext::search`]; the cursor is back at its original
    /// position and the error has been reported to the sink.
    pub fn accept<S: MessageSink>(self, ctx: &mut EditorContext<S>, input: &str) -> Result<SearchMove> {
        ctx.set_cursor(self.saved_cursor);
        let flags = SearchFlags::MSG | SearchFlags::HIS | SearchFlags::OPT | SearchFlags::MARK;
        let result = ctx.search(Some(self.direction), input, 1, flags);
        if result.is_err() {
            ctx.set_top_line(self.saved_top);
        }
        result
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::Buffer;
    use pretty_assertions::assert_eq;

    fn p(line: usize, col: usize) -> Position {
        Position::new(line, col)
    }

    fn ctx(lines: &[&str]) -> EditorContext {
        EditorContext::new(Buffer::from_lines(lines))
    }

    #[test]
    fn cursor_follows_each_keystroke() {
        let mut c = ctx(&["one", "two", "three", "ten"]);
        let mut inc = IncrementalSearch::begin(&c, Direction::Forward);

        assert_eq!(inc.update(&mut c, "t"), Some(Span::chars(p(2, 0), p(2, 1), false)));
        assert_eq!(c.cursor(), p(2, 0));
        assert_eq!(inc.update(&mut c, "th"), Some(Span::chars(p(3, 0), p(3, 2), false)));
        assert_eq!(inc.update(&mut c, "te"), Some(Span::chars(p(4, 0), p(4, 2), false)));
        assert_eq!(c.cursor(), p(4, 0));
    }

    #[test]
    fn typing_does_not_touch_remembered_state() {
        let mut c = ctx(&["abc", "xyz"]);
        let mut inc = IncrementalSearch::begin(&c, Direction::Backward);
        inc.update(&mut c, "xyz");
        assert_eq!(c.last_pattern(), None);
        assert!(c.search_state().history().is_empty());
        assert_eq!(c.search_state().direction(), Direction::Forward);
        assert!(c.sink().is_empty());
    }

    #[test]
    fn miss_and_empty_input_restore_cursor() {
        let mut c = ctx(&["abc", "def"]);
        c.set_cursor(p(1, 1));
        let mut inc = IncrementalSearch::begin(&c, Direction::Forward);
        inc.update(&mut c, "de");
        assert_eq!(c.cursor(), p(2, 0));

        assert_eq!(inc.update(&mut c, "dez"), None);
        assert_eq!(c.cursor(), p(1, 1));
        assert!(c.sink().is_empty());

        inc.update(&mut c, "de");
        assert_eq!(inc.update(&mut c, ""), None);
        assert_eq!(inc.current(), None);
        assert_eq!(c.cursor(), p(1, 1));
    }

    #[test]
    fn noincsearch_waits_for_accept() {
        let mut c = ctx(&["abc", "def"]);
        c.set("nois").unwrap();
        let mut inc = IncrementalSearch::begin(&c, Direction::Forward);
        assert_eq!(inc.update(&mut c, "def"), None);
        assert_eq!(c.cursor(), p(1, 0));

        let mv = inc.accept(&mut c, "def").unwrap();
        assert_eq!(mv.pos, p(2, 0));
        assert_eq!(c.cursor(), p(2, 0));
    }

    #[test]
    fn cancel_restores_view() {
        let lines: Vec<String> = (1..=50).map(|n| format!("line {n}")).collect();
        let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
        let mut c = ctx(&refs);
        c.set_top_line(3);
        let mut inc = IncrementalSearch::begin(&c, Direction::Forward);
        inc.update(&mut c, "line 40");
        c.set_top_line(30);

        inc.cancel(&mut c);
        assert_eq!(c.cursor(), p(1, 0));
        assert_eq!(c.top_line(), 3);
        assert_eq!(c.last_pattern(), None);
    }

    #[test]
    fn accept_commits_pattern_and_jump() {
        let mut c = ctx(&["abc", "def", "abc"]);
        let mut inc = IncrementalSearch::begin(&c, Direction::Forward);
        inc.update(&mut c, "abc");
        let mv = inc.accept(&mut c, "abc").unwrap();

        assert_eq!(mv.pos, p(3, 0));
        assert_eq!(c.cursor(), p(3, 0));
        assert_eq!(c.last_pattern(), Some("abc"));
        assert_eq!(c.search_state().history(), ["abc".to_string()]);
        assert_eq!(c.marks().jumps.pcmark(), Some(p(1, 0)));
    }

    #[test]
    fn accept_applies_offset() {
        let mut c = ctx(&["foo bar"]);
        let inc = IncrementalSearch::begin(&c, Direction::Forward);
        let mv = inc.accept(&mut c, "bar/e").unwrap();
        assert_eq!(mv.pos, p(1, 6));
        assert!(c.search_state().offset().end);
    }

    #[test]
    fn accept_miss_reports_and_stays() {
        let mut c = ctx(&["abc"]);
        let inc = IncrementalSearch::begin(&c, Direction::Forward);
        assert!(inc.accept(&mut c, "zzz").is_err());
        assert_eq!(c.cursor(), p(1, 0));
        assert!(c.sink().last().is_some_and(|m| m.is_error()));
    }
}
