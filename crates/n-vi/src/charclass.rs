//! Character classification for word motions.
//!
//! Every word motion and word object decides boundaries by comparing the
//! class of adjacent characters:
//!
//! | Class   | Members                                            |
//! |---------|----------------------------------------------------|
//! | `Blank` | space, tab, newline                                |
//! | `Word`  | characters in `iskeyword`                          |
//! | `Other` | everything else (folded into `Word` for WORDs)     |

use std::fmt;

use serde::{Deserialize, Serialize};

/// The class of a character as seen by word motions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CharClass {
    Blank,
    Word,
    Other,
}

/// Classify `ch`. With `big_word` only blank boundaries matter, so `Other`
/// collapses into `Word`.
#[inline]
#[must_use]
pub fn classify(ch: char, big_word: bool, keywords: &Keywords) -> CharClass {
    if is_white(ch) || ch == '\n' {
        CharClass::Blank
    } else if big_word || keywords.contains(ch) {
        CharClass::Word
    } else {
        CharClass::Other
    }
}

/// Space or tab.
#[inline]
#[must_use]
pub const fn is_white(ch: char) -> bool {
    ch == ' ' || ch == '\t'
}

// ---------------------------------------------------------------------------
// Keywords
// ---------------------------------------------------------------------------

/// The `iskeyword` set.
///
/// Parsed from the vi option syntax: comma-separated parts, each a single
/// char, a decimal code, a `lo-hi` range of codes, `@` for ASCII letters,
/// or any of those prefixed with `^` to exclude. Chars above 255 are
/// keyword chars when alphanumeric.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Keywords {
    table: [bool; 256],
    source: String,
}

impl Keywords {
    /// vi's default: letters, digits, `_`, and Latin-1 letters.
    pub const DEFAULT: &'static str = "@,48-57,_,192-255";

    /// Parse an `iskeyword` value.
    ///
    /// # Errors
    ///
    /// Returns the offending part when it is neither a char, a code, nor a
    /// range of codes.
    pub fn parse(value: &str) -> Result<Self, String> {
        let mut table = [false; 256];
        for part in value.split(',').filter(|p| !p.is_empty()) {
            let (exclude, body) = match part.strip_prefix('^') {
                Some(rest) if !rest.is_empty() => (true, rest),
                _ => (false, part),
            };
            if body == "@" {
                for b in (b'a'..=b'z').chain(b'A'..=b'Z') {
                    table[usize::from(b)] = !exclude;
                }
                continue;
            }
            let (lo, hi) = match body.split_once('-') {
                Some((lo, hi)) if !lo.is_empty() && !hi.is_empty() => {
                    (code_of(lo, part)?, code_of(hi, part)?)
                }
                _ => {
                    let c = code_of(body, part)?;
                    (c, c)
                }
            };
            for code in lo..=hi {
                table[code] = !exclude;
            }
        }
        Ok(Self {
            table,
            source: value.to_string(),
        })
    }

    /// True if `ch` is a keyword character.
    #[inline]
    #[must_use]
    pub fn contains(&self, ch: char) -> bool {
        let code = ch as u32;
        if code < 256 {
            // `code < 256` so the index is in range.
            self.table[code as usize]
        } else {
            ch.is_alphanumeric()
        }
    }

    /// The option text this set was parsed from.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }
}

/// A part is either a decimal code or a single literal char.
fn code_of(text: &str, part: &str) -> Result<usize, String> {
    if text.bytes().all(|b| b.is_ascii_digit()) {
        return text
            .parse::<usize>()
            .ok()
            .filter(|c| *c < 256)
            .ok_or_else(|| part.to_string());
    }
    let mut chars = text.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if (c as u32) < 256 => Ok(c as usize),
        _ => Err(part.to_string()),
    }
}

impl Default for Keywords {
    fn default() -> Self {
        let mut table = [false; 256];
        for b in (b'a'..=b'z').chain(b'A'..=b'Z').chain(b'0'..=b'9') {
            table[usize::from(b)] = true;
        }
        table[usize::from(b'_')] = true;
        for slot in &mut table[192..] {
            *slot = true;
        }
        Self {
            table,
            source: Self::DEFAULT.to_string(),
        }
    }
}

impl TryFrom<String> for Keywords {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Keywords> for String {
    fn from(value: Keywords) -> Self {
        value.source
    }
}

impl fmt::Debug for Keywords {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Keywords({})", self.source)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
