//! Marks that survive closing a file.
//!
//! [`MarkStore`] keeps the buffer marks and the last cursor position of
//! recently closed files, newest first, keyed by absolute path, plus the
//! `A`-`Z` file marks. Files that fall off the end of the list are
//! forgotten. The store round-trips through JSON.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::mark::{FileMark, MarkTable};
use crate::position::Position;

/// One buffer mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredMark {
    pub name: char,
    pub pos: Position,
}

/// What is remembered about one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMarks {
    pub path: PathBuf,
    #[serde(default)]
    pub marks: Vec<StoredMark>,
    /// The `'"` mark.
    #[serde(default)]
    pub last_cursor: Option<Position>,
}

/// One `A`-`Z` mark with the file it points into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredFileMark {
    pub name: char,
    pub path: PathBuf,
    pub pos: Position,
}

/// Most-recently-used store of per-file marks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkStore {
    files: Vec<FileMarks>,
    #[serde(default)]
    file_marks: Vec<StoredFileMark>,
    #[serde(skip, default = "default_limit")]
    limit: usize,
}

const fn default_limit() -> usize {
    25
}

impl Default for MarkStore {
    fn default() -> Self {
        Self::new(default_limit())
    }
}

impl MarkStore {
    /// An empty store remembering at most `limit` files.
    #[must_use]
    pub const fn new(limit: usize) -> Self {
        Self {
            files: Vec::new(),
            file_marks: Vec::new(),
            limit,
        }
    }

    /// Remember `marks` for `path` as the file is closed with the cursor at
    /// `cursor`. The file moves to the front. File marks set in `marks`
    /// replace the stored ones of the same name.
    pub fn remember(&mut self, path: &Path, marks: &MarkTable, cursor: Position) {
        self.remember_file_marks(marks);
        self.files.retain(|f| f.path != path);
        let entry = FileMarks {
            path: path.to_path_buf(),
            marks: marks
                .local_marks()
                .map(|(name, pos)| StoredMark { name, pos })
                .collect(),
            last_cursor: Some(cursor),
        };
        self.files.insert(0, entry);
        self.files.truncate(self.limit);
        debug!(path = %path.display(), files = self.files.len(), "marks remembered");
    }

    /// Record the file marks set in `marks` and forget the ones it dropped.
    /// Marks in unnamed buffers have nowhere to point and are skipped.
    pub fn remember_file_marks(&mut self, marks: &MarkTable) {
        let dropped: Vec<char> = marks.dropped_file_marks().collect();
        self.file_marks.retain(|m| !dropped.contains(&m.name));
        for (name, mark) in marks.file_marks() {
            let Some(path) = mark.path.clone() else { continue };
            let stored = StoredFileMark {
                name,
                path,
                pos: mark.pos,
            };
            match self.file_marks.iter_mut().find(|m| m.name == name) {
                Some(slot) => *slot = stored,
                None => self.file_marks.push(stored),
            }
        }
        self.file_marks.sort_by_key(|m| m.name);
    }

    /// Give `marks` the stored file marks it does not already have.
    pub fn restore_file_marks_into(&self, marks: &mut MarkTable) {
        marks.restore_file_marks(self.file_marks.iter().map(|m| {
            (
                m.name,
                FileMark {
                    pos: m.pos,
                    path: Some(m.path.clone()),
                },
            )
        }));
    }

    /// The stored `A`-`Z` marks, in name order.
    #[must_use]
    pub fn file_marks(&self) -> &[StoredFileMark] {
        &self.file_marks
    }

    /// What is remembered for `path`. The file moves to the front.
    pub fn restore(&mut self, path: &Path) -> Option<&FileMarks> {
        let at = self.files.iter().position(|f| f.path == path)?;
        let entry = self.files.remove(at);
        self.files.insert(0, entry);
        self.files.first()
    }

    /// Load what is remembered for `path` into `marks`, along with any
    /// stored file marks `marks` does not already have. True if anything
    /// was found for `path`.
    pub fn restore_into(&mut self, path: &Path, marks: &mut MarkTable) -> bool {
        self.restore_file_marks_into(marks);
        let Some(entry) = self.restore(path) else {
            return false;
        };
        marks.restore(entry.marks.iter().map(|m| (m.name, m.pos)), entry.last_cursor);
        true
    }

    /// Paths, newest first.
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.files.iter().map(|f| f.path.as_path())
    }

    /// Change the bound, forgetting the oldest files if needed.
    pub fn set_limit(&mut self, limit: usize) {
        self.limit = limit;
        self.files.truncate(limit);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Write the store to `path` as JSON.
    ///
    /// # Errors
    ///
    /// I/O and serialization failures.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Read a store written by [`save`](Self::save). A missing file is an
    /// empty store.
    ///
    /// # Errors
    ///
    /// I/O failures other than a missing file, and malformed JSON.
    pub fn load(path: &Path, limit: usize) -> Result<Self> {
        let json = match fs::read_to_string(path) {
            Ok(json) => json,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Self::new(limit)),
            Err(err) => return Err(err.into()),
        };
        let mut store: Self = serde_json::from_str(&json)?;
        store.set_limit(limit);
        debug!(path = %path.display(), files = store.len(), "mark store loaded");
        Ok(store)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
