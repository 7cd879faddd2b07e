use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::mapping::DiffOptions;
use crate::scm::{validate_anchor, validate_repo_relative_path, ScmRepo};

#[derive(Debug, Clone)]
pub struct GitRepo {
    root: PathBuf,
}

impl GitRepo {
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn run_git_bytes(&self, args: &[&str]) -> Result<Vec<u8>> {
        let output = Command::new("git")
            .current_dir(&self.root)
            .args(args)
            .output()
            .with_context(|| {
                if let Err(e) = which::which("git") {
                    format!("git command not found. Please install git: {e}")
                } else {
                    format!("Failed to execute git command: {args:?}")
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!(
                "git command failed with status {}: {}",
                output.status,
                stderr.trim()
            );
        }

        Ok(output.stdout)
    }

    fn run_git(&self, args: &[&str]) -> Result<String> {
        String::from_utf8(self.run_git_bytes(args)?).context("git output was not valid UTF-8")
    }

    /// File contents need not be UTF-8; undecodable bytes become U+FFFD.
    fn run_git_lossy(&self, args: &[&str]) -> Result<String> {
        let stdout = self.run_git_bytes(args)?;
        Ok(String::from_utf8_lossy(&stdout).into_owned())
    }

    fn rev_parse(&self, rev: &str) -> Result<String> {
        let output = self.run_git(&["rev-parse", "--verify", "--end-of-options", rev])?;
        Ok(output.trim().to_string())
    }
}

#[must_use]
pub fn detect_git_root(start_path: &Path) -> Option<PathBuf> {
    let output = Command::new("git")
        .current_dir(start_path)
        .args(["rev-parse", "--show-toplevel"])
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }

    let stdout = String::from_utf8(output.stdout).ok()?;
    let root = stdout.trim();
    if root.is_empty() {
        None
    } else {
        Some(PathBuf::from(root))
    }
}

/// Arguments for a rename/copy aware, zero-context diff.
fn diff_args<'a>(from: &'a str, to: &'a str, options: &DiffOptions) -> Vec<&'a str> {
    let mut args = vec![
        "-c",
        "core.quotePath=false",
        "diff",
        "--no-color",
        "--no-ext-diff",
        "-U0",
    ];
    if options.detect_renames {
        args.push("-M");
        if options.detect_copies {
            args.push("-C");
        }
    } else {
        args.push("--no-renames");
    }
    args.extend(["--end-of-options", from, to]);
    args
}

impl ScmRepo for GitRepo {
    fn root(&self) -> &Path {
        &self.root
    }

    fn resolve_commit(&self, rev: &str) -> Result<String> {
        validate_anchor(rev)?;
        self.rev_parse(&format!("{rev}^{{commit}}"))
            .with_context(|| format!("Failed to resolve commit {rev}"))
    }

    fn parent_commit(&self, commit: &str) -> Result<String> {
        validate_anchor(commit)?;
        self.rev_parse(&format!("{commit}^"))
            .with_context(|| format!("Failed to resolve parent commit for {commit}"))
    }

    fn diff_commits(&self, from: &str, to: &str, options: &DiffOptions) -> Result<String> {
        validate_anchor(from)?;
        validate_anchor(to)?;
        self.run_git_lossy(&diff_args(from, to, options))
            .with_context(|| format!("Failed to diff from {from} to {to}"))
    }

    fn show_file(&self, rev: &str, path: &str) -> Result<String> {
        validate_anchor(rev)?;
        validate_repo_relative_path(path)?;
        let spec = format!("{rev}:{path}");
        self.run_git_lossy(&["show", "--end-of-options", &spec])
            .with_context(|| format!("Failed to show file {path} at {rev}"))
    }
}
