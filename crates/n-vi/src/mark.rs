//! Marks.
//!
//! | Name         | Kind                                                  |
//! |--------------|-------------------------------------------------------|
//! | `a`-`z`      | buffer mark                                           |
//! | `A`-`Z`      | file mark; remembers the file it was set in           |
//! | `'` `` ` ``  | previous-context mark (lives in the [`JumpList`])     |
//! | `<` `>`      | start and end of the last Visual area                 |
//! | `[` `]`      | first and last char of the last changed or yanked text |
//! | `.`          | last change                                           |
//! | `"`          | cursor position when the file was last left           |
//!
//! Marks follow edits through [`MarkTable::adjust`]. A mark whose line is
//! deleted is invalidated (E19 when read); the Visual bounds, the
//! previous-context marks and jump-list entries stay on the first line of the
//! deleted region instead.

use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use crate::buffer::{Buffer, LineAdjust};
use crate::error::{Error, Result};
use crate::jumplist::JumpList;
use crate::mode::VisualKind;
use crate::position::Position;

/// A mark that may point into another file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMark {
    pub pos: Position,
    /// File the mark was set in; `None` for an unnamed buffer.
    pub path: Option<PathBuf>,
}

/// Where a mark points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkPosition {
    /// In the current buffer.
    Here(Position),
    /// A file mark in another file; the host loads `path` and moves there.
    OtherFile { path: PathBuf, pos: Position },
}

/// The last Visual area, for `'<`, `'>` and `gv`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisualMarks {
    pub start: Position,
    pub end: Position,
    pub kind: VisualKind,
}

/// One mark slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot<T> {
    Unset,
    Set(T),
    /// The line it was on has been deleted.
    Deleted,
    /// Removed by `:delmarks`. Reads like `Unset`, but a stored copy must
    /// not come back.
    Removed,
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Self::Unset
    }
}

impl<T> Slot<T> {
    fn resolve(&self, name: char) -> Result<&T> {
        match self {
            Self::Set(value) => Ok(value),
            Self::Unset | Self::Removed => Err(Error::MarkNotSet(name)),
            Self::Deleted => Err(Error::MarkInvalidated(name)),
        }
    }

    const fn as_set(&self) -> Option<&T> {
        match self {
            Self::Set(value) => Some(value),
            _ => None,
        }
    }
}

/// Mark slots for one buffer plus the file marks and jump list.
#[derive(Debug, Clone, Default)]
pub struct MarkTable {
    local: [Slot<Position>; 26],
    file: [Slot<FileMark>; 26],
    visual: Option<VisualMarks>,
    op_start: Slot<Position>,
    op_end: Slot<Position>,
    last_change: Slot<Position>,
    last_exit: Slot<Position>,
    /// Jump history and the `''` mark.
    pub jumps: JumpList,
}

fn slot(name: char) -> usize {
    (name.to_ascii_lowercase() as usize) - ('a' as usize)
}

/// Names listed in a `:delmarks` argument: single names, ranges such as
/// `a-d` or `B-F`, and spaces.
///
/// # Errors
///
/// [`Error::InvalidArgument`] carrying `args` from the first bad entry on.
pub fn parse_mark_list(args: &str) -> Result<Vec<char>> {
    let chars: Vec<char> = args.chars().collect();
    let bad = |at: usize| Error::InvalidArgument(chars[at..].iter().collect());
    let mut names = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let from = chars[i];
        match from {
            ' ' => {}
            'a'..='z' | 'A'..='Z' => {
                if chars.get(i + 1) == Some(&'-') {
                    let same_case = |to: char| {
                        to >= from
                            && to.is_ascii_alphabetic()
                            && to.is_ascii_lowercase() == from.is_ascii_lowercase()
                    };
                    let Some(to) = chars.get(i + 2).copied().filter(|&to| same_case(to)) else {
                        return Err(bad(i));
                    };
                    names.extend(from..=to);
                    i += 2;
                } else {
                    names.push(from);
                }
            }
            '[' | ']' | '<' | '>' | '.' | '"' => names.push(from),
            _ => return Err(bad(i)),
        }
        i += 1;
    }
    Ok(names)
}

impl MarkTable {
    #[must_use]
    pub fn new(jumplist_size: usize) -> Self {
        Self {
            jumps: JumpList::new(jumplist_size),
            ..Self::default()
        }
    }

    // -- Setting ------------------------------------------------------------

    /// Set mark `name` to `pos` (`m{name}`). `cursor` decides whether `m'`
    /// records a jump; `buf` supplies the path for file marks.
    ///
    /// # Errors
    ///
    /// [`Error::NoSuchMark`] for names that cannot be set.
    pub fn set(&mut self, name: char, pos: Position, cursor: Position, buf: &Buffer) -> Result<()> {
        match name {
            'a'..='z' => self.local[slot(name)] = Slot::Set(pos),
            'A'..='Z' => {
                self.file[slot(name)] = Slot::Set(FileMark {
                    pos,
                    path: buf.path().map(Path::to_path_buf),
                });
            }
            '\'' | '`' => {
                if pos == cursor {
                    self.jumps.set_pcmark(pos);
                    // Keep it even though the cursor has not moved.
                    self.jumps.pin_pcmark();
                } else {
                    self.jumps.set_pcmark_only(pos);
                }
            }
            '<' | '>' => {
                let kind = self.visual.map_or(VisualKind::Char, |v| v.kind);
                let mut area = self.visual.unwrap_or(VisualMarks {
                    start: pos,
                    end: pos,
                    kind,
                });
                if name == '<' {
                    area.start = pos;
                } else {
                    area.end = pos;
                }
                self.visual = Some(area);
            }
            '[' => self.op_start = Slot::Set(pos),
            ']' => self.op_end = Slot::Set(pos),
            '.' => self.last_change = Slot::Set(pos),
            '"' => self.last_exit = Slot::Set(pos),
            _ => return Err(Error::NoSuchMark(name)),
        }
        trace!(%name, ?pos, "mark set");
        Ok(())
    }

    /// Remember the Visual area just left.
    pub fn set_visual(&mut self, anchor: Position, cursor: Position, kind: VisualKind) {
        self.visual = Some(VisualMarks {
            start: anchor,
            end: cursor,
            kind,
        });
    }

    /// Remember the range an operator just changed or yanked.
    pub fn set_changed(&mut self, start: Position, end: Position) {
        self.op_start = Slot::Set(start);
        self.op_end = Slot::Set(end);
        self.last_change = Slot::Set(start);
    }

    // -- Reading ------------------------------------------------------------

    /// Resolve mark `name` in `buf`.
    ///
    /// A file mark set in another file is [`MarkPosition::OtherFile`] when
    /// `allow_file_change` is set.
    ///
    /// # Errors
    ///
    /// [`Error::NoSuchMark`] for unknown names, [`Error::MarkNotSet`] for
    /// unset marks, and [`Error::MarkInvalidated`] when the mark's
    /// line was deleted, the line is past the end of the buffer, or the mark
    /// is in another file and the file may not change.
    pub fn get(&self, name: char, buf: &Buffer, allow_file_change: bool) -> Result<MarkPosition> {
        let pos = match name {
            'a'..='z' => Some(*self.local[slot(name)].resolve(name)?),
            'A'..='Z' => {
                let mark = self.file[slot(name)].resolve(name)?;
                if mark.path.as_deref() != buf.path() {
                    return match (&mark.path, allow_file_change) {
                        (Some(path), true) => Ok(MarkPosition::OtherFile {
                            path: path.clone(),
                            pos: mark.pos,
                        }),
                        _ => Err(Error::MarkInvalidated(name)),
                    };
                }
                Some(mark.pos)
            }
            '\'' | '`' => self.jumps.pcmark(),
            '<' | '>' => self.visual_bound(name == '<', buf),
            '[' => Some(*self.op_start.resolve(name)?),
            ']' => Some(*self.op_end.resolve(name)?),
            '.' => Some(*self.last_change.resolve(name)?),
            '"' => Some(*self.last_exit.resolve(name)?),
            _ => return Err(Error::NoSuchMark(name)),
        };
        let pos = pos.ok_or(Error::MarkNotSet(name))?;
        if !buf.has_line(pos.line) {
            return Err(Error::MarkInvalidated(name));
        }
        Ok(MarkPosition::Here(pos))
    }

    /// Resolve a mark that must be in the current buffer (`:'a,'b`).
    ///
    /// # Errors
    ///
    /// As [`get`](Self::get) without file changes.
    pub fn check(&self, name: char, buf: &Buffer) -> Result<Position> {
        match self.get(name, buf, false)? {
            MarkPosition::Here(pos) => Ok(pos),
            MarkPosition::OtherFile { .. } => Err(Error::MarkInvalidated(name)),
        }
    }

    /// `'<` is the earlier bound, `'>` the later one. In linewise Visual
    /// they cover whole lines.
    fn visual_bound(&self, start: bool, buf: &Buffer) -> Option<Position> {
        let area = self.visual?;
        let (first, last) = if area.start <= area.end {
            (area.start, area.end)
        } else {
            (area.end, area.start)
        };
        let pos = if start { first } else { last };
        Some(match (area.kind, start) {
            (VisualKind::Line, true) => pos.with_col(0),
            (VisualKind::Line, false) => pos.with_col(buf.line_len(pos.line).saturating_sub(1)),
            _ => pos,
        })
    }

    /// The last Visual area, for `gv`.
    #[must_use]
    pub const fn visual(&self) -> Option<VisualMarks> {
        self.visual
    }

    /// Buffer marks that are set, for `:marks` and persistence.
    pub fn local_marks(&self) -> impl Iterator<Item = (char, Position)> + '_ {
        ('a'..='z')
            .zip(self.local.iter())
            .filter_map(|(name, slot)| slot.as_set().map(|pos| (name, *pos)))
    }

    /// File marks that are set, with the file each was set in.
    pub fn file_marks(&self) -> impl Iterator<Item = (char, &FileMark)> + '_ {
        ('A'..='Z')
            .zip(self.file.iter())
            .filter_map(|(name, slot)| slot.as_set().map(|mark| (name, mark)))
    }

    /// File marks that were deleted, or whose line was, since they were set.
    pub fn dropped_file_marks(&self) -> impl Iterator<Item = char> + '_ {
        ('A'..='Z')
            .zip(self.file.iter())
            .filter(|(_, slot)| matches!(slot, Slot::Deleted | Slot::Removed))
            .map(|(name, _)| name)
    }

    /// Where the cursor was when the file was last left.
    #[must_use]
    pub const fn last_exit(&self) -> Option<Position> {
        match self.last_exit {
            Slot::Set(pos) => Some(pos),
            _ => None,
        }
    }

    // -- Deleting -----------------------------------------------------------

    /// Delete mark `name`. `<` and `>` both drop the whole Visual area.
    ///
    /// # Errors
    ///
    /// [`Error::NoSuchMark`] for names that cannot be deleted.
    pub fn delete(&mut self, name: char) -> Result<()> {
        match name {
            'a'..='z' => self.local[slot(name)] = Slot::Removed,
            'A'..='Z' => self.file[slot(name)] = Slot::Removed,
            '<' | '>' => self.visual = None,
            '[' => self.op_start = Slot::Removed,
            ']' => self.op_end = Slot::Removed,
            '.' => self.last_change = Slot::Removed,
            '"' => self.last_exit = Slot::Removed,
            _ => return Err(Error::NoSuchMark(name)),
        }
        trace!(%name, "mark deleted");
        Ok(())
    }

    /// `:delmarks!`: every mark of this buffer. File marks and the jump list
    /// stay.
    pub fn delete_all_local(&mut self) {
        self.local = [Slot::Removed; 26];
        self.visual = None;
        self.op_start = Slot::Removed;
        self.op_end = Slot::Removed;
        self.last_change = Slot::Removed;
        self.last_exit = Slot::Removed;
        debug!("buffer marks deleted");
    }

    // -- Maintenance --------------------------------------------------------

    /// Follow an edit in `buf`.
    pub fn adjust(&mut self, adjust: &LineAdjust, buf: &Buffer) {
        let drop_deleted = |slot: &mut Slot<Position>| {
            if let Slot::Set(pos) = *slot {
                *slot = adjust
                    .apply(pos.line)
                    .map_or(Slot::Deleted, |line| Slot::Set(Position::new(line, pos.col)));
            }
        };
        self.local.iter_mut().for_each(drop_deleted);
        for slot in [
            &mut self.op_start,
            &mut self.op_end,
            &mut self.last_change,
            &mut self.last_exit,
        ] {
            drop_deleted(slot);
        }
        for mark in &mut self.file {
            let Slot::Set(m) = mark else { continue };
            if m.path.as_deref() != buf.path() {
                continue;
            }
            match adjust.apply(m.pos.line) {
                Some(line) => m.pos.line = line,
                None => *mark = Slot::Deleted,
            }
        }
        if let Some(area) = self.visual.as_mut() {
            for pos in [&mut area.start, &mut area.end] {
                pos.line = adjust.apply(pos.line).unwrap_or(adjust.line1).max(1);
            }
        }
        self.jumps.adjust(adjust);
        debug!(?adjust, "marks adjusted");
    }

    /// The buffer is going away: its marks go with it. File marks and the
    /// jump list belong to the window and survive.
    pub fn clear_buffer_marks(&mut self) {
        self.local = [Slot::Unset; 26];
        self.visual = None;
        self.op_start = Slot::Unset;
        self.op_end = Slot::Unset;
        self.last_change = Slot::Unset;
        self.last_exit = Slot::Unset;
    }

    /// Restore persisted buffer marks and the last exit position.
    pub fn restore<I>(&mut self, marks: I, last_exit: Option<Position>)
    where
        I: IntoIterator<Item = (char, Position)>,
    {
        for (name, pos) in marks {
            if name.is_ascii_lowercase() {
                self.local[slot(name)] = Slot::Set(pos);
            }
        }
        self.last_exit = last_exit.map_or(Slot::Unset, Slot::Set);
    }

    /// Restore persisted file marks into slots that are not set.
    pub fn restore_file_marks<I>(&mut self, marks: I)
    where
        I: IntoIterator<Item = (char, FileMark)>,
    {
        for (name, mark) in marks {
            if !name.is_ascii_uppercase() {
                continue;
            }
            let entry = &mut self.file[slot(name)];
            if matches!(entry, Slot::Unset) {
                *entry = Slot::Set(mark);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
