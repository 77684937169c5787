//! Pattern dialect translation and the remembered-pattern slots.
//!
//! Users type vi patterns. [`translate`] rewrites them into the syntax of
//! the `regex` crate according to the magic level:
//!
//! | Level           | Escaped (literal unless `\`-prefixed) |
//! |-----------------|---------------------------------------|
//! | `\v` very magic | nothing                               |
//! | `\m` magic      | `( ) \| + ? {`                        |
//! | `\M` no magic   | the above and `. * [`                 |
//! | `\V` very nomagic | the above and `^ $`                 |
//!
//! An escaped char flips its meaning: under magic `(` is a literal paren
//! and `\(` opens a group. `\<` and `\>` become word-boundary assertions
//! (bare `<` and `>` under very magic), `\c` / `\C` force the case policy,
//! and `\v \m \M \V` switch level for the rest of the pattern. A trailing
//! lone `\` matches a backslash.
//!
//! [`Patterns`] keeps the last search and last substitute pattern together
//! with their compiled matchers. A matcher is reused only while its case
//! policy still matches the one in effect.

use bitflags::bitflags;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::options::Options;

/// How many typed patterns the search history keeps.
const HISTORY_MAX: usize = 50;

// ---------------------------------------------------------------------------
// Magic levels
// ---------------------------------------------------------------------------

/// Which metacharacters a typed pattern treats as special.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MagicLevel {
    /// `\v`: every metacharacter is special.
    VeryMagic,
    /// `\m`: the vi default.
    Magic,
    /// `\M`: only `^` and `$` are special.
    NoMagic,
    /// `\V`: nothing is special.
    VeryNoMagic,
}

impl MagicLevel {
    /// Chars whose meaning is inverted by a backslash at this level.
    #[must_use]
    pub const fn escaped(self) -> &'static str {
        match self {
            Self::VeryMagic => "",
            Self::Magic => "()|+?{",
            Self::NoMagic => "()|+?{.*[",
            Self::VeryNoMagic => "()|+?{.*[^$",
        }
    }
}

bitflags! {
    /// What [`translate`] noticed while rewriting a pattern.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PatternFlags: u8 {
        /// `\c` in the pattern.
        const FORCE_IGNORE = 1 << 0;
        /// `\C` in the pattern.
        const FORCE_EXACT = 1 << 1;
        /// A literal uppercase char (drives `smartcase`).
        const HAS_UPPER = 1 << 2;
    }
}

/// A pattern rewritten into `regex` syntax.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translated {
    pub pattern: String,
    pub flags: PatternFlags,
}

/// Rewrite a vi pattern into `regex` syntax.
///
/// With `clean` the pattern is already in `regex` syntax: nothing is
/// escaped, but `\<`, `\>` and the inline flags are still honoured.
#[must_use]
pub fn translate(raw: &str, magic: MagicLevel, clean: bool) -> Translated {
    let mut out = String::with_capacity(raw.len() + 8);
    let mut flags = PatternFlags::empty();
    let mut escapes = if clean { "" } else { magic.escaped() };
    let mut very_magic = !clean && magic == MagicLevel::VeryMagic;
    let mut escaped = false;

    for c in raw.chars() {
        if !escaped && c == '\\' {
            escaped = true;
            continue;
        }
        if very_magic && matches!(c, '<' | '>') {
            match (c, escaped) {
                (_, true) => out.push(c),
                ('<', false) => out.push_str(r"\b{start}"),
                _ => out.push_str(r"\b{end}"),
            }
        } else if escapes.contains(c) {
            // The backslash means the opposite of what it says.
            if !escaped {
                out.push('\\');
            }
            out.push(c);
        } else if escaped && matches!(c, '<' | '>' | 'c' | 'C' | 'v' | 'm' | 'M' | 'V') {
            match c {
                '<' => out.push_str(r"\b{start}"),
                '>' => out.push_str(r"\b{end}"),
                'c' => flags |= PatternFlags::FORCE_IGNORE,
                'C' => flags |= PatternFlags::FORCE_EXACT,
                _ => {
                    let level = match c {
                        'v' => MagicLevel::VeryMagic,
                        'm' => MagicLevel::Magic,
                        'M' => MagicLevel::NoMagic,
                        _ => MagicLevel::VeryNoMagic,
                    };
                    escapes = level.escaped();
                    very_magic = level == MagicLevel::VeryMagic;
                }
            }
        } else {
            if escaped {
                out.push('\\');
            } else if c.is_uppercase() {
                flags |= PatternFlags::HAS_UPPER;
            }
            out.push(c);
        }
        escaped = false;
    }
    if escaped {
        out.push_str(r"\\");
    }
    trace!(%raw, translated = %out, ?magic, "pattern translated");
    Translated {
        pattern: out,
        flags,
    }
}

/// Whether a pattern with `flags` is matched ignoring case under `opts`.
#[must_use]
pub fn ignore_case(opts: &Options, flags: PatternFlags) -> bool {
    if flags.contains(PatternFlags::FORCE_EXACT) {
        return false;
    }
    if flags.contains(PatternFlags::FORCE_IGNORE) {
        return true;
    }
    opts.ignorecase && !(opts.smartcase && flags.contains(PatternFlags::HAS_UPPER))
}

/// Compile a pattern already in `regex` syntax.
///
/// Searches run over one line plus its newline, so `^` and `$` are
/// compiled to match at line boundaries.
///
/// # Errors
///
/// [`Error::InvalidPattern`] naming `raw` and the offset into `clean`
/// where the compiler gave up.
pub fn compile(raw: &str, clean: &str, ignore_case: bool) -> Result<Regex> {
    RegexBuilder::new(clean)
        .case_insensitive(ignore_case)
        .multi_line(true)
        .build()
        .map_err(|err| Error::InvalidPattern {
            pattern: raw.to_string(),
            offset: error_offset(clean),
            message: summary(&err.to_string()),
        })
}

/// Byte offset of the first syntax error in `clean`, 0 when the parser
/// accepts it (the failure was a size limit or similar).
fn error_offset(clean: &str) -> usize {
    match regex_syntax::Parser::new().parse(clean) {
        Ok(_) => 0,
        Err(regex_syntax::Error::Parse(err)) => err.span().start.offset,
        Err(regex_syntax::Error::Translate(err)) => err.span().start.offset,
        Err(_) => 0,
    }
}

fn summary(message: &str) -> String {
    message
        .lines()
        .rev()
        .find(|l| l.starts_with("error:"))
        .map_or_else(|| message.to_string(), |l| l.trim_start_matches("error: ").to_string())
}

// ---------------------------------------------------------------------------
// Pattern slots
// ---------------------------------------------------------------------------

/// Which remembered pattern a command saves into or reuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    /// `/`, `?`, `n`, `N`, `*`.
    Search,
    /// `:s`.
    Substitute,
}

impl Slot {
    const fn index(self) -> usize {
        match self {
            Self::Search => 0,
            Self::Substitute => 1,
        }
    }
}

/// Where a freshly compiled pattern is remembered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveTo {
    Search,
    Substitute,
    /// `:g` saves into both.
    Both,
}

/// Which remembered pattern an empty pattern means.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UseSlot {
    Search,
    Substitute,
    /// Whichever was used last.
    Last,
}

/// A remembered pattern.
#[derive(Debug, Clone)]
pub struct SavedPattern {
    /// As the user typed it.
    pub raw: String,
    /// In `regex` syntax.
    pub clean: String,
    pub flags: PatternFlags,
    regex: Regex,
    /// The case policy `regex` was compiled with.
    ignore_case: bool,
}

/// A pattern ready to search with.
#[derive(Debug, Clone)]
pub struct Compiled {
    pub regex: Regex,
    pub raw: String,
    pub clean: String,
}

/// Request for [`Patterns::compile`].
#[derive(Debug, Clone, Copy)]
pub struct CompileRequest<'a> {
    /// Empty reuses a remembered pattern.
    pub pattern: &'a str,
    pub save: SaveTo,
    pub use_slot: UseSlot,
    /// Do not remember the pattern.
    pub keep: bool,
    /// The pattern is already in `regex` syntax.
    pub clean: bool,
    /// Record a typed pattern in the history.
    pub history: bool,
}

impl<'a> CompileRequest<'a> {
    /// A typed search pattern, remembered in the search slot.
    #[must_use]
    pub const fn search(pattern: &'a str) -> Self {
        Self {
            pattern,
            save: SaveTo::Search,
            use_slot: UseSlot::Last,
            keep: false,
            clean: false,
            history: false,
        }
    }
}

/// The last search and substitute patterns plus the search history.
#[derive(Debug, Default)]
pub struct Patterns {
    slots: [Option<SavedPattern>; 2],
    last: Option<Slot>,
    history: Vec<String>,
}

impl Patterns {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Translate (or reuse) and compile a pattern.
    ///
    /// # Errors
    ///
    /// [`Error::NoPreviousPattern`] / [`Error::NoPreviousSubstitute`] for
    /// an empty pattern with nothing to reuse, and
    /// [`Error::InvalidPattern`] when compilation fails. A failed compile
    /// leaves the remembered patterns untouched.
    pub fn compile(&mut self, req: CompileRequest<'_>, opts: &Options) -> Result<Compiled> {
        let (raw, clean, flags, reused) = if req.pattern.is_empty() {
            let slot = match req.use_slot {
                UseSlot::Search => Slot::Search,
                UseSlot::Substitute => Slot::Substitute,
                UseSlot::Last => self.last.unwrap_or(Slot::Search),
            };
            let Some(saved) = &self.slots[slot.index()] else {
                return Err(if req.use_slot == UseSlot::Substitute {
                    Error::NoPreviousSubstitute
                } else {
                    Error::NoPreviousPattern
                });
            };
            (saved.raw.clone(), saved.clean.clone(), saved.flags, Some(slot))
        } else {
            if req.history {
                self.remember_history(req.pattern);
            }
            let t = translate(req.pattern, opts.magic, req.clean);
            (req.pattern.to_string(), t.pattern, t.flags, None)
        };

        let ic = ignore_case(opts, flags);
        let regex = match self.cached(reused, &clean, ic) {
            Some(regex) => {
                trace!(%clean, ic, "matcher cache hit");
                regex
            }
            None => {
                debug!(%clean, ic, "compiling pattern");
                compile(&raw, &clean, ic)?
            }
        };

        if !req.keep {
            let saved = SavedPattern {
                raw: raw.clone(),
                clean: clean.clone(),
                flags,
                regex: regex.clone(),
                ignore_case: ic,
            };
            match req.save {
                SaveTo::Search => self.save(Slot::Search, saved),
                SaveTo::Substitute => self.save(Slot::Substitute, saved),
                SaveTo::Both => {
                    self.save(Slot::Search, saved.clone());
                    self.save(Slot::Substitute, saved);
                }
            }
        }
        Ok(Compiled { regex, raw, clean })
    }

    fn cached(&self, reused: Option<Slot>, clean: &str, ic: bool) -> Option<Regex> {
        if let Some(slot) = reused {
            if let Some(saved) = &self.slots[slot.index()] {
                if saved.ignore_case == ic {
                    return Some(saved.regex.clone());
                }
            }
        }
        self.slots
            .iter()
            .flatten()
            .find(|s| s.ignore_case == ic && s.clean == clean)
            .map(|s| s.regex.clone())
    }

    fn save(&mut self, slot: Slot, saved: SavedPattern) {
        self.slots[slot.index()] = Some(saved);
        self.last = Some(slot);
    }

    fn remember_history(&mut self, pattern: &str) {
        self.history.retain(|p| p != pattern);
        self.history.push(pattern.to_string());
        if self.history.len() > HISTORY_MAX {
            self.history.remove(0);
        }
    }

    /// The pattern text of the slot used last, as typed.
    #[must_use]
    pub fn last_pattern(&self) -> Option<&str> {
        let slot = self.last?;
        self.slots[slot.index()].as_ref().map(|s| s.raw.as_str())
    }

    /// The remembered search pattern, as typed.
    #[must_use]
    pub fn search_pattern(&self) -> Option<&str> {
        self.slots[0].as_ref().map(|s| s.raw.as_str())
    }

    /// The remembered substitute pattern, as typed.
    #[must_use]
    pub fn substitute_pattern(&self) -> Option<&str> {
        self.slots[1].as_ref().map(|s| s.raw.as_str())
    }

    /// Which slot was used last.
    #[must_use]
    pub const fn last_slot(&self) -> Option<Slot> {
        self.last
    }

    /// Typed patterns, oldest first.
    #[must_use]
    pub fn history(&self) -> &[String] {
        &self.history
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
