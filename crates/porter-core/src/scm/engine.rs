use std::collections::BTreeMap;

use crate::mapping::{DiffEngine, DiffOptions, DiffUnavailable, FileDiff};
use crate::scm::unified::parse_file_diffs;
use crate::scm::ScmRepo;

/// [`DiffEngine`] backed by the repository's own diff.
pub struct ScmDiffEngine<'a> {
    repo: &'a dyn ScmRepo,
}

impl<'a> ScmDiffEngine<'a> {
    #[must_use]
    pub fn new(repo: &'a dyn ScmRepo) -> Self {
        Self { repo }
    }

    fn line_count(&self, commit: &str, path: &str) -> Option<u32> {
        match self.repo.show_file(commit, path) {
            Ok(content) => Some(u32::try_from(content.lines().count()).unwrap_or(u32::MAX)),
            Err(err) => {
                tracing::debug!(error = %err, commit, path, "line count unavailable");
                None
            }
        }
    }
}

impl DiffEngine for ScmDiffEngine<'_> {
    fn list_modified_files(
        &self,
        old_commit: &str,
        new_commit: &str,
        options: &DiffOptions,
    ) -> Result<BTreeMap<String, FileDiff>, DiffUnavailable> {
        let unavailable = |err: anyhow::Error| DiffUnavailable {
            old_commit: old_commit.to_string(),
            new_commit: new_commit.to_string(),
            reason: format!("{err:#}"),
        };

        let raw = self
            .repo
            .diff_commits(old_commit, new_commit, options)
            .map_err(unavailable)?;
        let files = parse_file_diffs(&raw).map_err(unavailable)?;

        let mut by_path = BTreeMap::new();
        for mut file in files {
            // Only edited files can have a range widened to the whole file.
            if !file.edits.is_empty() {
                if let Some(new_path) = file.new_path.as_deref() {
                    file.new_line_count = self.line_count(new_commit, new_path);
                }
            }
            let Some(key) = file.new_path.clone().or_else(|| file.old_path.clone()) else {
                continue;
            };
            by_path.insert(key, file);
        }

        tracing::debug!(
            old_commit,
            new_commit,
            files = by_path.len(),
            "listed modified files"
        );
        Ok(by_path)
    }
}
