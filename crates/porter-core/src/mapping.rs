//! Turning diff engine output into [`Mapping`]s.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::position::{FileMapping, LineRange, Mapping, ReplacedRange};

/// How a file changed between two commits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Added,
    Modified,
    Deleted,
    Renamed,
    Copied,
}

/// One file of a tree diff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDiff {
    /// Path in the old commit, `None` for added files.
    pub old_path: Option<String>,
    /// Path in the new commit, `None` for deleted files.
    pub new_path: Option<String>,
    pub change_type: ChangeType,
    /// Replaced line ranges as `(old, new)`, in file order.
    pub edits: Vec<(LineRange, LineRange)>,
    /// Line count of the new file, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_line_count: Option<u32>,
}

/// Options passed through to the diff engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffOptions {
    pub detect_renames: bool,
    pub detect_copies: bool,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            detect_renames: true,
            detect_copies: true,
        }
    }
}

/// The diff between two commits could not be computed.
#[derive(Debug, Error)]
#[error("Diff from {old_commit} to {new_commit} is not available: {reason}")]
pub struct DiffUnavailable {
    pub old_commit: String,
    pub new_commit: String,
    pub reason: String,
}

/// Computes file-level edit lists between two commits.
pub trait DiffEngine {
    /// Modified files between `old_commit` and `new_commit`, keyed by path.
    fn list_modified_files(
        &self,
        old_commit: &str,
        new_commit: &str,
        options: &DiffOptions,
    ) -> Result<BTreeMap<String, FileDiff>, DiffUnavailable>;
}

/// One mapping per file that existed in the old commit.
///
/// Added files are skipped: no position of the old commit can refer to them.
#[must_use]
pub fn build<'a>(files: impl IntoIterator<Item = &'a FileDiff>) -> Vec<Mapping> {
    files
        .into_iter()
        .filter_map(|diff| {
            let old_path = diff.old_path.as_deref()?;
            let file = match diff.new_path.as_deref() {
                Some(new_path) if diff.change_type != ChangeType::Deleted => {
                    FileMapping::renamed(old_path, new_path)
                }
                _ => FileMapping::deleted(old_path),
            };
            let edits = diff
                .edits
                .iter()
                .map(|&(old, new)| ReplacedRange::new(old, new));
            let mut mapping = Mapping::new(file, edits);
            mapping.new_line_count = diff.new_line_count;
            Some(mapping)
        })
        .collect()
}

/// Mappings treating every given path as deleted.
///
/// Used when the real diff is unavailable, so porting still yields an answer
/// with every file comment demoted to the whole change.
#[must_use]
pub fn fallback<'a>(paths: impl IntoIterator<Item = &'a str>) -> Vec<Mapping> {
    paths
        .into_iter()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(|path| Mapping::new(FileMapping::deleted(path), []))
        .collect()
}
