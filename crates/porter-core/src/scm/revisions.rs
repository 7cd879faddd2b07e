use std::collections::BTreeMap;

use crate::comment::Side;
use crate::porter::{CommitNotFound, CommitResolver, RevisionId};
use crate::scm::ScmRepo;

/// [`CommitResolver`] over a known list of revision commits of one change.
///
/// The parent side of a revision is its commit's first parent.
pub struct RevisionCommits<'a> {
    repo: &'a dyn ScmRepo,
    change: String,
    commits: BTreeMap<u32, String>,
}

impl<'a> RevisionCommits<'a> {
    #[must_use]
    pub fn new(repo: &'a dyn ScmRepo, change: impl Into<String>, commits: BTreeMap<u32, String>) -> Self {
        Self {
            repo,
            change: change.into(),
            commits,
        }
    }
}

impl CommitResolver for RevisionCommits<'_> {
    fn commit_for(&self, revision: &RevisionId, side: Side) -> Result<String, CommitNotFound> {
        let not_found = || CommitNotFound::new(revision, side);
        if revision.change != self.change {
            return Err(not_found());
        }
        let rev = self.commits.get(&revision.number).ok_or_else(not_found)?;

        let resolved = match side {
            Side::Revision => self.repo.resolve_commit(rev),
            Side::Parent => self.repo.parent_commit(rev),
        };
        resolved.map_err(|err| {
            tracing::debug!(error = %format!("{err:#}"), revision = revision.number, %side, "commit lookup failed");
            not_found()
        })
    }
}
