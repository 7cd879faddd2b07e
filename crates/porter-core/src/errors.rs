//! Typed error types for comment porting.

use thiserror::Error;

/// Result type alias for porting operations.
pub type PortResult<T> = Result<T, PortError>;

/// Errors that fail a whole porting call.
///
/// Recoverable conditions (an unavailable diff, a revision without a commit)
/// never surface here; they degrade the affected group instead.
#[derive(Debug, Error)]
pub enum PortError {
    /// A comment's stored coordinates cannot describe a valid position.
    #[error("Comment {comment_id} has malformed coordinates: {detail}")]
    MalformedCoordinates { comment_id: String, detail: String },

    /// The target revision does not belong to a known change.
    #[error("Target revision {revision} of change {change} is not valid for porting")]
    InvalidTarget { change: String, revision: u32 },

    /// An internal error from a collaborator.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl PortError {
    pub(crate) fn malformed(comment_id: &str, detail: impl Into<String>) -> Self {
        Self::MalformedCoordinates {
            comment_id: comment_id.to_string(),
            detail: detail.into(),
        }
    }
}
