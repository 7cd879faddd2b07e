//! Comment types as handed over by the comment store.
//!
//! Comments are read-only inputs. Porting produces transient copies that keep
//! the original revision number, so callers can tell ported comments from
//! comments written on the requested revision.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Path marker for comments on the whole change rather than a file.
pub const PATCHSET_LEVEL: &str = "/PATCHSET_LEVEL";
/// Synthetic file holding the commit message.
pub const COMMIT_MSG: &str = "/COMMIT_MSG";
/// Synthetic file listing the commits of a merge.
pub const MERGE_LIST: &str = "/MERGE_LIST";

/// Whether `path` names a synthetic file rather than a file of the tree.
#[must_use]
pub fn is_magic_path(path: &str) -> bool {
    matches!(path, PATCHSET_LEVEL | COMMIT_MSG | MERGE_LIST)
}

/// Which commit a comment refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// The parent (base) commit of the revision.
    Parent,
    /// The revision's own commit.
    Revision,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parent => write!(f, "parent"),
            Self::Revision => write!(f, "revision"),
        }
    }
}

/// A character-precise selection: 1-based lines, 0-based characters.
///
/// The end is exclusive in characters, so an `end_char` of 0 ends the
/// selection right before `end_line`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommentRange {
    pub start_line: u32,
    pub start_char: u32,
    pub end_line: u32,
    pub end_char: u32,
}

impl CommentRange {
    #[must_use]
    pub const fn new(start_line: u32, start_char: u32, end_line: u32, end_char: u32) -> Self {
        Self {
            start_line,
            start_char,
            end_line,
            end_char,
        }
    }
}

/// A published or draft inline comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    /// Opaque identifier, shared by all ported copies of the comment.
    pub id: String,
    /// Identifier of the comment this one replies to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_reply_to: Option<String>,
    /// Number of the revision the comment was written on.
    pub revision: u32,
    /// File path, or [`PATCHSET_LEVEL`] for whole-change comments.
    pub path: String,
    pub side: Side,
    /// 1-based line, 0 when the comment has no line.
    #[serde(default)]
    pub line: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<CommentRange>,
    pub message: String,
    #[serde(default)]
    pub unresolved: bool,
    pub author: String,
    pub written_on: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

impl Comment {
    /// Whether the comment is attached to the change rather than a file.
    #[must_use]
    pub fn is_patchset_level(&self) -> bool {
        self.path == PATCHSET_LEVEL
    }

    /// Whether the comment refers to a synthetic file.
    #[must_use]
    pub fn is_on_magic_path(&self) -> bool {
        is_magic_path(&self.path)
    }
}

/// A comment left by an automated analyzer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RobotComment {
    #[serde(flatten)]
    pub comment: Comment,
    pub robot_id: String,
    pub robot_run_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Access to the plain comment inside any comment kind.
///
/// Porting reads coordinates from and writes coordinates to the plain
/// comment; everything else a kind carries is copied through untouched.
pub trait PortableComment: Clone {
    fn comment(&self) -> &Comment;
    fn comment_mut(&mut self) -> &mut Comment;
}

impl PortableComment for Comment {
    fn comment(&self) -> &Comment {
        self
    }

    fn comment_mut(&mut self) -> &mut Comment {
        self
    }
}

impl PortableComment for RobotComment {
    fn comment(&self) -> &Comment {
        &self.comment
    }

    fn comment_mut(&mut self) -> &mut Comment {
        &mut self.comment
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use chrono::TimeZone;

    use super::*;

    /// A comment on revision `revision` at `path`, with no line and no range.
    pub fn comment(id: &str, revision: u32, path: &str) -> Comment {
        Comment {
            id: id.to_string(),
            in_reply_to: None,
            revision,
            path: path.to_string(),
            side: Side::Revision,
            line: 0,
            range: None,
            message: format!("comment {id}"),
            unresolved: true,
            author: "alice".to_string(),
            written_on: Utc
                .with_ymd_and_hms(2024, 3, 1, 12, 0, 0)
                .single()
                .expect("valid timestamp"),
            tag: None,
        }
    }

    pub fn line_comment(id: &str, revision: u32, path: &str, line: u32) -> Comment {
        Comment {
            line,
            ..comment(id, revision, path)
        }
    }

    pub fn range_comment(id: &str, revision: u32, path: &str, range: CommentRange) -> Comment {
        Comment {
            line: range.end_line,
            range: Some(range),
            ..comment(id, revision, path)
        }
    }
}
