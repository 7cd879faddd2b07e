use anyhow::{bail, Result};
use std::path::{Component, Path};

pub mod engine;
pub mod git;
pub mod revisions;
pub mod unified;

pub use engine::ScmDiffEngine;
pub use revisions::RevisionCommits;

use crate::mapping::DiffOptions;

/// Read access to the repository holding a change's commits.
pub trait ScmRepo {
    fn root(&self) -> &Path;

    fn resolve_commit(&self, rev: &str) -> Result<String>;
    fn parent_commit(&self, commit: &str) -> Result<String>;

    /// Zero-context unified diff between two commits, decoded lossily.
    fn diff_commits(&self, from: &str, to: &str, options: &DiffOptions) -> Result<String>;

    /// Contents of `path` at `rev`, decoded lossily.
    fn show_file(&self, rev: &str, path: &str) -> Result<String>;
}

/// Open the repository containing `start_path`.
pub fn open_repo(start_path: &Path) -> Result<Box<dyn ScmRepo + Send + Sync>> {
    let Some(root) = git::detect_git_root(start_path) else {
        bail!(
            "No Git repository found at {}.\n  To fix: run inside the repository holding the change, or pass --repo",
            start_path.display()
        );
    };
    Ok(Box::new(git::GitRepo::new(root)))
}

pub fn validate_anchor(anchor: &str) -> Result<()> {
    if anchor.trim().is_empty() {
        bail!("Commit reference cannot be empty");
    }

    if anchor.starts_with('-') {
        bail!("Commit reference cannot start with '-': {anchor}");
    }

    if anchor.contains('\0') || anchor.contains('\n') || anchor.contains('\r') {
        bail!("Commit reference contains invalid control characters");
    }

    Ok(())
}

pub fn validate_repo_relative_path(path: &str) -> Result<()> {
    if path.trim().is_empty() {
        bail!("Path cannot be empty");
    }

    let path_ref = Path::new(path);
    if path_ref.is_absolute() {
        bail!("Path must be repository-relative: {path}");
    }

    for component in path_ref.components() {
        match component {
            Component::Normal(_) => {}
            Component::CurDir => bail!("Path must be normalized (no '.'): {path}"),
            Component::ParentDir => bail!("Path traversal is not allowed: {path}"),
            Component::RootDir | Component::Prefix(_) => {
                bail!("Path must be repository-relative: {path}")
            }
        }
    }

    Ok(())
}
