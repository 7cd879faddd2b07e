//! The change manifest read by `porter port`.

use anyhow::{bail, Context, Result};
use porter_core::{Comment, RobotComment};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

/// A change, its revision commits and the comments written on them.
#[derive(Debug, Clone, Deserialize)]
pub struct Manifest {
    pub change: String,
    /// Commit of each revision, keyed by revision number.
    pub revisions: BTreeMap<u32, String>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default)]
    pub robot_comments: Vec<RobotComment>,
    #[serde(default)]
    pub drafts: Vec<Comment>,
}

impl Manifest {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest {}", path.display()))?;
        let manifest = Self::parse(&text)
            .with_context(|| format!("Invalid manifest {}", path.display()))?;
        Ok(manifest)
    }

    pub fn parse(text: &str) -> Result<Self> {
        let manifest: Self = serde_json::from_str(text)?;
        if manifest.change.trim().is_empty() {
            bail!("Manifest has an empty change id");
        }
        if manifest.revisions.contains_key(&0) {
            bail!("Revision numbers start at 1");
        }
        Ok(manifest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use porter_core::Side;

    #[test]
    fn test_parse_manifest() {
        let manifest = Manifest::parse(
            r#"{
                "change": "I8473b95934b5732ac55d26311a706c9c2bde9940",
                "revisions": {"1": "abc123", "2": "def456"},
                "comments": [{
                    "id": "c1",
                    "revision": 1,
                    "path": "src/Foo.java",
                    "side": "parent",
                    "line": 4,
                    "message": "why?",
                    "unresolved": true,
                    "author": "alice",
                    "written_on": "2024-03-01T12:00:00Z"
                }]
            }"#,
        )
        .expect("parse");

        assert_eq!(manifest.revisions.get(&2).map(String::as_str), Some("def456"));
        assert_eq!(manifest.comments.len(), 1);
        assert_eq!(manifest.comments[0].side, Side::Parent);
        assert!(manifest.robot_comments.is_empty());
        assert!(manifest.drafts.is_empty());
    }

    #[test]
    fn test_rejects_revision_zero() {
        let err = Manifest::parse(r#"{"change": "I1", "revisions": {"0": "abc"}}"#)
            .expect_err("revision zero");
        assert!(err.to_string().contains("start at 1"));
    }

    #[test]
    fn test_load_reports_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("missing.json");
        let err = Manifest::load(&path).expect_err("missing file");
        assert!(format!("{err:#}").contains("missing.json"));
    }
}
