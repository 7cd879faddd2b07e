//! Positions within a Git tree and the mappings between two trees.
//!
//! A [`Position`] only knows a file path and a line range; character offsets
//! are left to the comment representation since diffs have line granularity.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// A 0-based, end-exclusive line range.
///
/// Diff hunks may carry empty ranges (an insertion or deletion point);
/// a [`Position`] never does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LineRange {
    /// First line (inclusive).
    pub start: u32,
    /// Line after the last one (exclusive).
    pub end: u32,
}

impl LineRange {
    #[must_use]
    pub const fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    #[must_use]
    pub const fn len(&self) -> u32 {
        self.end.saturating_sub(self.start)
    }

    /// Move both ends by `amount` lines. Negative amounts move up, clamped at line 0.
    #[must_use]
    pub fn shift_by(self, amount: i64) -> Self {
        Self {
            start: shift_line(self.start, amount),
            end: shift_line(self.end, amount),
        }
    }

    /// Smallest range covering both `self` and `other`.
    #[must_use]
    pub fn hull(self, other: Self) -> Self {
        Self {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// Whether `other` touches a line of `self`.
    ///
    /// An empty `other` (an insertion point) overlaps when it lies strictly
    /// inside `self`.
    #[must_use]
    pub const fn overlaps(&self, other: &Self) -> bool {
        self.start < other.end && other.start < self.end
    }
}

pub(crate) fn shift_line(line: u32, amount: i64) -> u32 {
    u32::try_from((i64::from(line) + amount).max(0)).unwrap_or(u32::MAX)
}

/// Location of an entity within a Git tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Position {
    /// `None` for positions not tied to any file (whole-change).
    pub file_path: Option<String>,
    /// `None` for positions covering the whole file.
    pub line_range: Option<LineRange>,
}

impl Position {
    /// A position not tied to any file.
    #[must_use]
    pub const fn whole_change() -> Self {
        Self {
            file_path: None,
            line_range: None,
        }
    }

    /// A position covering a whole file.
    #[must_use]
    pub fn file(path: impl Into<String>) -> Self {
        Self {
            file_path: Some(path.into()),
            line_range: None,
        }
    }

    /// A position on specific lines of a file.
    #[must_use]
    pub fn range(path: impl Into<String>, range: LineRange) -> Self {
        debug_assert!(!range.is_empty(), "positions never carry empty ranges");
        Self {
            file_path: Some(path.into()),
            line_range: Some(range),
        }
    }

    #[must_use]
    pub fn with_file_path(&self, path: impl Into<String>) -> Self {
        Self {
            file_path: Some(path.into()),
            line_range: self.line_range,
        }
    }

    #[must_use]
    pub fn without_line_range(&self) -> Self {
        Self {
            file_path: self.file_path.clone(),
            line_range: None,
        }
    }

    #[must_use]
    pub fn shift_by(&self, amount: i64) -> Self {
        Self {
            file_path: self.file_path.clone(),
            line_range: self.line_range.map(|range| range.shift_by(amount)),
        }
    }
}

/// How a file of the source tree maps to the target tree.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FileMapping {
    /// The file still exists, possibly under a new path (rename or copy).
    Live { old_path: String, new_path: String },
    /// The file is gone in the target tree.
    Deleted { old_path: String },
}

impl FileMapping {
    #[must_use]
    pub fn modified(path: impl Into<String>) -> Self {
        let path = path.into();
        Self::Live {
            old_path: path.clone(),
            new_path: path,
        }
    }

    #[must_use]
    pub fn renamed(old_path: impl Into<String>, new_path: impl Into<String>) -> Self {
        Self::Live {
            old_path: old_path.into(),
            new_path: new_path.into(),
        }
    }

    #[must_use]
    pub fn deleted(old_path: impl Into<String>) -> Self {
        Self::Deleted {
            old_path: old_path.into(),
        }
    }

    #[must_use]
    pub fn old_path(&self) -> &str {
        match self {
            Self::Live { old_path, .. } | Self::Deleted { old_path } => old_path,
        }
    }

    /// Path in the target tree, `None` for deleted files.
    #[must_use]
    pub fn new_path(&self) -> Option<&str> {
        match self {
            Self::Live { new_path, .. } => Some(new_path),
            Self::Deleted { .. } => None,
        }
    }
}

/// One diff hunk: `old` lines of the source were replaced by `new` lines of the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ReplacedRange {
    pub old: LineRange,
    pub new: LineRange,
}

impl ReplacedRange {
    #[must_use]
    pub const fn new(old: LineRange, new: LineRange) -> Self {
        Self { old, new }
    }

    /// Net line count change at the end of this hunk, including all earlier hunks.
    #[must_use]
    pub fn shift_after(&self) -> i64 {
        i64::from(self.new.end) - i64::from(self.old.end)
    }
}

/// Everything known about how one file changed between two commits.
///
/// Files absent from a mapping set are unchanged between the commits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mapping {
    pub file: FileMapping,
    /// Hunks ordered by their old range. Empty for pure renames.
    pub edits: BTreeSet<ReplacedRange>,
    /// Line count of the file in the target tree, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_line_count: Option<u32>,
}

impl Mapping {
    #[must_use]
    pub fn new(file: FileMapping, edits: impl IntoIterator<Item = ReplacedRange>) -> Self {
        Self {
            file,
            edits: edits.into_iter().collect(),
            new_line_count: None,
        }
    }

    #[must_use]
    pub fn with_new_line_count(mut self, lines: u32) -> Self {
        self.new_line_count = Some(lines);
        self
    }
}

/// An entity annotated with its [`Position`] and a way to write a new one back.
#[derive(Clone)]
pub struct PositionedEntity<T> {
    entity: T,
    position: Position,
    rebuild: fn(&T, &Position) -> T,
}

impl<T: std::fmt::Debug> std::fmt::Debug for PositionedEntity<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PositionedEntity")
            .field("entity", &self.entity)
            .field("position", &self.position)
            .finish_non_exhaustive()
    }
}

impl<T> PositionedEntity<T> {
    /// Wrap `entity` with an already extracted position.
    pub fn with_position(entity: T, position: Position, rebuild: fn(&T, &Position) -> T) -> Self {
        Self {
            entity,
            position,
            rebuild,
        }
    }

    #[must_use]
    pub const fn position(&self) -> &Position {
        &self.position
    }

    /// Build the entity at `position` without touching the original.
    #[must_use]
    pub fn rebuild_at(&self, position: &Position) -> T {
        (self.rebuild)(&self.entity, position)
    }

    /// The original entity, untouched.
    #[must_use]
    pub fn into_inner(self) -> T {
        self.entity
    }
}
