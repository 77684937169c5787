//! Option values consulted by the command core, and the `:set` parser.
//!
//! [`Options`] holds every setting the motions, objects and search read.
//! Hosts may load it from their preference storage (it is `serde`
//! serializable) and update it through `:set` directives:
//!
//! | Syntax           | Effect                        |
//! |------------------|-------------------------------|
//! | `:set option`    | Enable boolean / show value   |
//! | `:set nooption`  | Disable boolean               |
//! | `:set option!`   | Toggle boolean                |
//! | `:set option?`   | Query current value           |
//! | `:set option=V`  | Assign a value                |
//! | `:set`           | Show changed options          |
//! | `:set all`       | Show all options              |
//!
//! # Option names
//!
//! | Full name     | Abbrev | Type   | Default             |
//! |---------------|--------|--------|---------------------|
//! | `ignorecase`  | `ic`   | bool   | false               |
//! | `smartcase`   | `scs`  | bool   | false               |
//! | `wrapscan`    | `ws`   | bool   | true                |
//! | `incsearch`   | `is`   | bool   | true                |
//! | `magic`       |        | bool   | true                |
//! | `iskeyword`   | `isk`  | string | `@,48-57,_,192-255` |
//! | `quoteescape` | `qe`   | string | `\`                 |
//! | `matchpairs`  | `mps`  | string | `(:),{:},[:]`       |
//! | `cpoptions`   | `cpo`  | string | empty               |
//! | `selection`   | `sel`  | string | `inclusive`         |

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::charclass::Keywords;
use crate::error::{Error, Result};
use crate::pattern::MagicLevel;

// ---------------------------------------------------------------------------
// Match pairs
// ---------------------------------------------------------------------------

/// The `matchpairs` option: bracket pairs `%` and block objects know about.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MatchPairs(Vec<(char, char)>);

impl MatchPairs {
    /// Parse `"(:),{:},[:]"` syntax.
    ///
    /// # Errors
    ///
    /// Returns the offending part when it is not `x:y`.
    pub fn parse(value: &str) -> std::result::Result<Self, String> {
        value.split(',')
            .filter(|p| !p.is_empty())
            .map(|part| {
                let mut chars = part.chars();
                match (chars.next(), chars.next(), chars.next(), chars.next()) {
                    (Some(open), Some(':'), Some(close), None) if open != close => {
                        Ok((open, close))
                    }
                    _ => Err(part.to_string()),
                }
            })
            .collect::<std::result::Result<Vec<_>, _>>()
            .map(Self)
    }

    /// Just one pair, for block objects.
    #[must_use]
    pub fn single(open: char, close: char) -> Self {
        Self(vec![(open, close)])
    }

    /// The partner of `ch` and whether `ch` is the opening half.
    #[must_use]
    pub fn partner(&self, ch: char) -> Option<(char, bool)> {
        self.0.iter().find_map(|&(open, close)| {
            if ch == open {
                Some((close, true))
            } else if ch == close {
                Some((open, false))
            } else {
                None
            }
        })
    }
}

impl Default for MatchPairs {
    fn default() -> Self {
        Self(vec![('(', ')'), ('{', '}'), ('[', ']')])
    }
}

impl TryFrom<String> for MatchPairs {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<MatchPairs> for String {
    fn from(value: MatchPairs) -> Self {
        value.to_string()
    }
}

impl fmt::Display for MatchPairs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (open, close)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{open}:{close}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for MatchPairs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MatchPairs({self})")
    }
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Every option the command core consults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    pub ignorecase: bool,
    pub smartcase: bool,
    pub wrapscan: bool,
    pub incsearch: bool,
    /// Which metacharacters a typed pattern treats as special.
    pub magic: MagicLevel,
    pub iskeyword: Keywords,
    /// Characters that escape a quote inside a quoted string.
    pub quoteescape: String,
    pub matchpairs: MatchPairs,
    /// `cpo-c`: a forward search continues at the end of a match at the
    /// cursor rather than one char past its start.
    pub cpo_search: bool,
    /// `cpo-J`: a sentence must be followed by two spaces.
    pub cpo_j: bool,
    /// `cpo-%`: `%` matches brackets only, ignoring quotes, comments and
    /// preprocessor lines.
    pub cpo_match: bool,
    /// `selection=exclusive`: the Visual cursor sits one past the area.
    pub selection_exclusive: bool,
    /// Bound on the jump list.
    pub jumplist_size: usize,
    /// Lines a motion must travel before it is recorded as a jump.
    pub jump_threshold: usize,
    /// Closed files whose marks are remembered.
    pub persisted_files: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            ignorecase: false,
            smartcase: false,
            wrapscan: true,
            incsearch: true,
            magic: MagicLevel::Magic,
            iskeyword: Keywords::default(),
            quoteescape: "\\".to_string(),
            matchpairs: MatchPairs::default(),
            cpo_search: false,
            cpo_j: false,
            cpo_match: false,
            selection_exclusive: false,
            jumplist_size: 50,
            jump_threshold: 5,
            persisted_files: 25,
        }
    }
}

impl Options {
    /// Apply one `:set` directive. Queries and listings return the text to
    /// show; assignments return `None`.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownOption`] for names this core does not know and
    /// [`Error::InvalidArgument`] for values that do not parse.
    pub fn apply(&mut self, directive: &SetDirective) -> Result<Option<String>> {
        match directive {
            SetDirective::On(name) => {
                if is_bool_option(name) {
                    self.set_bool(name, true)?;
                    Ok(None)
                } else {
                    self.query(name).map(Some)
                }
            }
            SetDirective::Off(name) => self.set_bool(name, false).map(|()| None),
            SetDirective::Toggle(name) => {
                let value = self.get_bool(name)?;
                self.set_bool(name, !value).map(|()| None)
            }
            SetDirective::Query(name) => self.query(name).map(Some),
            SetDirective::Assign(name, value) => self.assign(name, value).map(|()| None),
            SetDirective::ShowChanged => Ok(Some(self.listing(false))),
            SetDirective::ShowAll => Ok(Some(self.listing(true))),
        }
    }

    fn get_bool(&self, name: &str) -> Result<bool> {
        Ok(match canonical(name) {
            Some("ignorecase") => self.ignorecase,
            Some("smartcase") => self.smartcase,
            Some("wrapscan") => self.wrapscan,
            Some("incsearch") => self.incsearch,
            Some("magic") => self.magic == MagicLevel::Magic,
            _ => return Err(Error::UnknownOption(name.to_string())),
        })
    }

    fn set_bool(&mut self, name: &str, value: bool) -> Result<()> {
        match canonical(name) {
            Some("ignorecase") => self.ignorecase = value,
            Some("smartcase") => self.smartcase = value,
            Some("wrapscan") => self.wrapscan = value,
            Some("incsearch") => self.incsearch = value,
            Some("magic") => {
                self.magic = if value {
                    MagicLevel::Magic
                } else {
                    MagicLevel::NoMagic
                };
            }
            _ => return Err(Error::UnknownOption(name.to_string())),
        }
        Ok(())
    }

    fn assign(&mut self, name: &str, value: &str) -> Result<()> {
        let bad = || Error::InvalidArgument(format!("{name}={value}"));
        match canonical(name) {
            Some("iskeyword") => self.iskeyword = Keywords::parse(value).map_err(|_| bad())?,
            Some("quoteescape") => self.quoteescape = value.to_string(),
            Some("matchpairs") => {
                self.matchpairs = MatchPairs::parse(value).map_err(|_| bad())?;
            }
            Some("cpoptions") => {
                if let Some(flag) = value.chars().find(|c| !matches!(c, 'c' | 'J' | '%')) {
                    return Err(Error::InvalidArgument(format!("{name}={flag}")));
                }
                self.cpo_search = value.contains('c');
                self.cpo_j = value.contains('J');
                self.cpo_match = value.contains('%');
            }
            Some("selection") => {
                self.selection_exclusive = match value {
                    "exclusive" => true,
                    "inclusive" | "old" => false,
                    _ => return Err(bad()),
                };
            }
            Some(_) => return Err(bad()),
            None => return Err(Error::UnknownOption(name.to_string())),
        }
        Ok(())
    }

    fn query(&self, name: &str) -> Result<String> {
        let Some(full) = canonical(name) else {
            return Err(Error::UnknownOption(name.to_string()));
        };
        if is_bool_option(full) {
            return Ok(format_bool(full, self.get_bool(full)?));
        }
        let value = match full {
            "iskeyword" => self.iskeyword.as_str().to_string(),
            "quoteescape" => self.quoteescape.clone(),
            "matchpairs" => self.matchpairs.to_string(),
            "cpoptions" => self.cpo_flags(),
            _ => if self.selection_exclusive { "exclusive" } else { "inclusive" }.to_string(),
        };
        Ok(format!("{full}={value}"))
    }

    fn cpo_flags(&self) -> String {
        let mut flags = String::new();
        if self.cpo_search {
            flags.push('c');
        }
        if self.cpo_j {
            flags.push('J');
        }
        if self.cpo_match {
            flags.push('%');
        }
        flags
    }

    fn listing(&self, all: bool) -> String {
        let defaults = Self::default();
        OPTION_NAMES
            .iter()
            .filter(|name| {
                all || self.query(name).ok() != defaults.query(name).ok()
            })
            .filter_map(|name| self.query(name).ok())
            .collect::<Vec<_>>()
            .join("  ")
    }
}

// ---------------------------------------------------------------------------
// `:set` parsing
// ---------------------------------------------------------------------------

/// A parsed `:set` directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetDirective {
    /// `:set option`: enable a boolean option (or show a string one).
    On(String),

    /// `:set nooption`: disable a boolean option.
    Off(String),

    /// `:set option!`: toggle a boolean option.
    Toggle(String),

    /// `:set option?`: query the current value.
    Query(String),

    /// `:set option=value`: assign a value.
    Assign(String, String),

    /// `:set` with no arguments: show changed options.
    ShowChanged,

    /// `:set all`: show all options.
    ShowAll,
}

const OPTION_NAMES: [&str; 10] = [
    "ignorecase",
    "smartcase",
    "wrapscan",
    "incsearch",
    "magic",
    "iskeyword",
    "quoteescape",
    "matchpairs",
    "cpoptions",
    "selection",
];

/// Full option name for a full name or abbreviation.
#[must_use]
pub fn canonical(name: &str) -> Option<&'static str> {
    Some(match name {
        "ignorecase" | "ic" => "ignorecase",
        "smartcase" | "scs" => "smartcase",
        "wrapscan" | "ws" => "wrapscan",
        "incsearch" | "is" => "incsearch",
        "magic" => "magic",
        "iskeyword" | "isk" => "iskeyword",
        "quoteescape" | "qe" => "quoteescape",
        "matchpairs" | "mps" => "matchpairs",
        "cpoptions" | "cpo" => "cpoptions",
        "selection" | "sel" => "selection",
        _ => return None,
    })
}

/// Returns `true` if `name` is a known boolean option (full name or abbreviation).
#[must_use]
pub fn is_bool_option(name: &str) -> bool {
    matches!(
        canonical(name),
        Some("ignorecase" | "smartcase" | "wrapscan" | "incsearch" | "magic")
    )
}

/// Parse the full `:set` arguments string into directives.
///
/// Multiple space-separated arguments are supported (`:set ic nows`).
/// An empty argument string produces [`SetDirective::ShowChanged`].
#[must_use]
pub fn parse_set(args: &str) -> Vec<SetDirective> {
    let trimmed = args.trim();
    if trimmed.is_empty() {
        return vec![SetDirective::ShowChanged];
    }
    trimmed.split_whitespace().map(parse_set_arg).collect()
}

/// Parse a single `:set` argument into a directive.
#[must_use]
pub fn parse_set_arg(arg: &str) -> SetDirective {
    if arg == "all" {
        return SetDirective::ShowAll;
    }

    if let Some((name, value)) = arg.split_once('=') {
        return SetDirective::Assign(name.to_string(), value.to_string());
    }

    if let Some(name) = arg.strip_suffix('?') {
        return SetDirective::Query(name.to_string());
    }

    if let Some(name) = arg.strip_suffix('!') {
        return SetDirective::Toggle(name.to_string());
    }

    // `nomagic` is Off("magic"), but an unknown `noxyz` stays On("noxyz")
    // so the error names what the user typed.
    if let Some(name) = arg.strip_prefix("no") {
        if is_bool_option(name) {
            return SetDirective::Off(name.to_string());
        }
    }

    SetDirective::On(arg.to_string())
}

/// Format a boolean option for display: `"name"` or `"noname"`.
#[must_use]
pub fn format_bool(name: &str, value: bool) -> String {
    if value {
        name.to_string()
    } else {
        format!("no{name}")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
