//! # n-vi, the vi command core
//!
//! Everything between a decoded keystroke and a cursor move or operator
//! range, independent of any UI:
//!
//! - **[`position`]**, **[`buffer`]**: 1-based positions, spans, and a rope
//!   buffer that reports how edits move lines
//! - **[`charclass`]**, **[`step`]**, **[`cursor`]**: character classes and
//!   single-char stepping
//! - **[`word`]**, **[`motion`]**, **[`matchpair`]**: motions, including
//!   sentences, paragraphs, sections, `f`/`t` and `%`
//! - **[`text_object`]**: `iw`, `as`, `ip`, `i(`, `at`, `i"` and friends
//! - **[`mark`]**, **[`jumplist`]**, **[`persist`]**: marks, the jump list,
//!   and marks remembered across closing a file
//! - **[`pattern`]**, **[`search`]**, **[`incsearch`]**: vi patterns
//!   translated for `regex`, searching with offsets and wraparound
//! - **[`address`]**: Ex command ranges
//! - **[`options`]**, **[`message`]**, **[`error`]**: option values,
//!   user-visible messages, errors
//! - **[`context`]**: [`EditorContext`], the entry point a dispatcher uses

pub mod address;
pub mod buffer;
pub mod charclass;
pub mod context;
pub mod cursor;
pub mod error;
pub mod incsearch;
pub mod jumplist;
pub mod mark;
pub mod matchpair;
pub mod message;
pub mod mode;
pub mod motion;
pub mod options;
pub mod pattern;
pub mod persist;
pub mod position;
pub mod search;
pub mod step;
pub mod text_object;
pub mod word;

pub use address::{AddressRange, SwapPolicy};
pub use buffer::Buffer;
pub use context::EditorContext;
pub use error::{Error, Result};
pub use incsearch::IncrementalSearch;
pub use message::{MessageLog, MessageSink};
pub use motion::{MotionFlags, MotionKind, MotionResult};
pub use options::Options;
pub use position::{Position, Span, SpanKind};
pub use search::{Direction, SearchFlags};
pub use text_object::TextObjectKind;
