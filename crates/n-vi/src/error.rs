//! Errors reported by the command core.
//!
//! Every failure here is recoverable at single-command granularity: the
//! dispatcher beeps, forwards `err.to_string()` to the message sink, and
//! carries on. Display strings follow the vi message texts so they can be
//! shown to the user verbatim.

use std::io;

use thiserror::Error;

/// Why a search came back empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissReason {
    /// Wrapped around the buffer (`wrapscan` on) and found nothing.
    NotFound,
    /// Reached line 1 searching backward with `wrapscan` off.
    HitTop,
    /// Reached the last line searching forward with `wrapscan` off.
    HitBottom,
}

/// Errors produced by motions, text objects, marks, search and ranges.
#[derive(Debug, Error)]
pub enum Error {
    /// The name does not denote any mark.
    #[error("E78: Unknown mark")]
    NoSuchMark(char),

    /// The mark exists by name but was never set, or was cleared.
    #[error("E20: Mark not set")]
    MarkNotSet(char),

    /// The mark's line was deleted, lies past the end of the buffer, or
    /// lives in a file that is not the current one.
    #[error("E19: Mark has invalid line number")]
    MarkInvalidated(char),

    /// The pattern has no match.
    #[error("{}", miss_message(*reason, pattern))]
    NoMatch {
        /// Pattern as the user typed it.
        pattern: String,
        /// Wrapped or boundary miss.
        reason: MissReason,
    },

    /// The pattern did not compile.
    #[error("E486: Invalid search string: {pattern} (at {offset}: {message})")]
    InvalidPattern {
        /// Pattern as the user typed it.
        pattern: String,
        /// Byte offset into the translated pattern where compilation failed.
        offset: usize,
        /// Compiler diagnostic.
        message: String,
    },

    /// A bracket, tag or quote object found no partner.
    #[error("unmatched '{0}'")]
    UnmatchedDelimiter(char),

    /// A motion or object ran into the start or end of the buffer.
    #[error("motion stopped at buffer boundary")]
    Boundary,

    /// An empty pattern with no pattern to reuse.
    #[error("E35: No previous regular expression")]
    NoPreviousPattern,

    /// `:s` repeat with no previous substitute pattern.
    #[error("E35: No previous substitute regular expression")]
    NoPreviousSubstitute,

    /// The range ends before it starts and the user declined the swap.
    #[error("E493: Backwards range given ({line1},{line2})")]
    RangeInverted {
        /// First resolved line.
        line1: usize,
        /// Second resolved line.
        line2: usize,
    },

    /// The address text could not be parsed.
    #[error("E14: Invalid address: {0}")]
    BadAddressSyntax(String),

    /// An address resolved outside `1..=line_count`.
    #[error("E16: Invalid range")]
    InvalidRange,

    /// An edit addressed text outside the buffer.
    #[error("buffer edit out of bounds: {0}")]
    Buffer(String),

    /// An option name or value was rejected by `:set`.
    #[error("E518: Unknown option: {0}")]
    UnknownOption(String),

    /// An option value failed to parse.
    #[error("E521: Invalid argument: {0}")]
    InvalidArgument(String),

    /// A command that needs an argument got none.
    #[error("E471: Argument required")]
    ArgumentRequired,

    /// Reading or writing the mark store failed.
    #[error("mark store I/O: {0}")]
    Io(#[from] io::Error),

    /// The mark store file is malformed.
    #[error("mark store format: {0}")]
    Persist(#[from] serde_json::Error),
}

fn miss_message(reason: MissReason, pattern: &str) -> String {
    match reason {
        MissReason::NotFound => format!("E486: Pattern not found: {pattern}"),
        MissReason::HitTop => format!("search hit TOP without match for: {pattern}"),
        MissReason::HitBottom => format!("search hit BOTTOM without match for: {pattern}"),
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
