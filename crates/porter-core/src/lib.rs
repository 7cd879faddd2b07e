//! porter-core: comment porting for code review.
//!
//! Recomputes where inline review comments written against one revision of a
//! change should appear in a later revision, following renames, copies,
//! deletions and line shifts reported by a diff between the two commits.

pub mod codec;
pub mod comment;
pub mod config;
pub mod errors;
pub mod filter;
pub mod mapping;
pub mod metrics;
pub mod porter;
pub mod position;
pub mod scm;
pub mod transform;

pub use comment::{Comment, CommentRange, PortableComment, RobotComment, Side};
pub use config::{ConflictPolicyKind, PortOptions};
pub use errors::{PortError, PortResult};
pub use porter::{CommentPorter, CommitNotFound, CommitResolver, RevisionId};
