//! Implementation of `porter port`.

use anyhow::{bail, Result};
use porter_core::filter::{CommentFilter, PredicateFilter, UnresolvedThreadFilter};
use porter_core::metrics::{MetricsSnapshot, PortMetrics};
use porter_core::scm::{self, RevisionCommits, ScmDiffEngine, ScmRepo};
use porter_core::{
    Comment, CommentPorter, PortOptions, PortableComment, RevisionId, RobotComment,
};
use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;

use crate::cli::PortArgs;
use crate::manifest::Manifest;
use crate::output::{Formatter, OutputFormat};

/// What a port run produced.
#[derive(Debug, Serialize)]
pub struct PortReport {
    pub change: String,
    pub target: u32,
    pub comments: Vec<Comment>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub robot_comments: Vec<RobotComment>,
    /// Outcome counters, absent for drafts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<MetricsSnapshot>,
}

/// Options from the environment, overridden by command-line flags.
pub fn resolve_options(args: &PortArgs) -> Result<PortOptions> {
    let mut options = PortOptions::from_env()?;
    if let Some(policy) = args.policy {
        options.conflict_policy = policy;
    }
    if args.no_copies {
        options.diff.detect_copies = false;
    }
    Ok(options)
}

/// Port the manifest's comments onto `target` and describe the result.
pub fn port_manifest(
    manifest: &Manifest,
    repo: &dyn ScmRepo,
    target: u32,
    options: PortOptions,
    unresolved_only: bool,
    drafts: bool,
) -> Result<PortReport> {
    if !manifest.revisions.contains_key(&target) {
        bail!(
            "Revision {target} is not listed in the manifest of change {}.\n  Known revisions: {:?}",
            manifest.change,
            manifest.revisions.keys().collect::<Vec<_>>()
        );
    }

    let commits = RevisionCommits::new(repo, manifest.change.clone(), manifest.revisions.clone());
    let diffs = ScmDiffEngine::new(repo);
    let metrics = PortMetrics::new();
    let porter = CommentPorter::new(&commits, &diffs, &metrics, options);
    let target_id = RevisionId::new(manifest.change.clone(), target);

    if drafts {
        let comments = porter.port_drafts(&target_id, manifest.drafts.clone())?;
        return Ok(PortReport {
            change: manifest.change.clone(),
            target,
            comments,
            robot_comments: Vec::new(),
            metrics: None,
        });
    }

    let open = unresolved_only.then(|| open_thread_ids(manifest, target));
    let in_open_thread = |c: &Comment| match &open {
        Some(ids) => ids.contains(&c.id),
        None => true,
    };
    let human = PredicateFilter::new(|c: &Comment| in_open_thread(c));
    let robot = PredicateFilter::new(|c: &RobotComment| in_open_thread(c.comment()));

    let comments = porter.port(&target_id, manifest.comments.clone(), &[&human])?;
    let robot_comments = porter.port(&target_id, manifest.robot_comments.clone(), &[&robot])?;

    Ok(PortReport {
        change: manifest.change.clone(),
        target,
        comments,
        robot_comments,
        metrics: Some(metrics.snapshot()),
    })
}

/// Ids of comments in unresolved threads before `target`.
///
/// Human and robot comments share threads: a human reply can resolve a robot
/// comment.
fn open_thread_ids(manifest: &Manifest, target: u32) -> HashSet<String> {
    let earlier: Vec<Comment> = manifest
        .comments
        .iter()
        .chain(manifest.robot_comments.iter().map(PortableComment::comment))
        .filter(|c| c.revision < target)
        .cloned()
        .collect();
    UnresolvedThreadFilter
        .filter(earlier)
        .into_iter()
        .map(|c| c.id)
        .collect()
}

/// Run `porter port`.
#[tracing::instrument(skip(args, format), fields(manifest = %args.manifest.display(), target = args.target))]
pub fn run_port(args: &PortArgs, workspace_root: &Path, format: OutputFormat) -> Result<()> {
    let manifest = Manifest::load(&args.manifest)?;
    let repo_path = args.repo.as_deref().unwrap_or(workspace_root);
    let repo = scm::open_repo(repo_path)?;
    let options = resolve_options(args)?;
    tracing::debug!(
        policy = options.conflict_policy.as_str(),
        detect_copies = options.diff.detect_copies,
        root = %repo.root().display(),
        "porting comments"
    );

    let report = port_manifest(
        &manifest,
        repo.as_ref(),
        args.target,
        options,
        args.unresolved_only,
        args.drafts,
    )?;

    let formatter = Formatter::new(format);
    let mut extra = vec![
        ("change", serde_json::json!(report.change)),
        ("target", serde_json::json!(report.target)),
    ];
    if !report.robot_comments.is_empty() {
        extra.push(("robot_comments", serde_json::to_value(&report.robot_comments)?));
    }
    if let Some(metrics) = report.metrics {
        extra.push(("metrics", serde_json::to_value(metrics)?));
    }
    formatter.print_list(&report.comments, "No comments to port", "comments", &extra)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use porter_core::scm::git::GitRepo;
    use porter_core::{CommentRange, ConflictPolicyKind, Side};
    use std::collections::BTreeMap;
    use std::process::Command;
    use tempfile::tempdir;

    fn git(repo: &Path, args: &[&str]) -> String {
        let output = Command::new("git")
            .current_dir(repo)
            .args(args)
            .output()
            .expect("failed to run git command");
        assert!(output.status.success(), "git command failed: {args:?}");
        String::from_utf8(output.stdout).expect("utf-8").trim().to_string()
    }

    fn commit(repo: &Path, message: &str) -> String {
        git(repo, &["add", "-A"]);
        git(repo, &["commit", "--quiet", "-m", message]);
        git(repo, &["rev-parse", "HEAD"])
    }

    fn lines(count: u32) -> String {
        (1..=count).map(|n| format!("line {n}\n")).collect()
    }

    fn comment(id: &str, path: &str, line: u32, range: Option<CommentRange>) -> Comment {
        Comment {
            id: id.to_string(),
            in_reply_to: None,
            revision: 1,
            path: path.to_string(),
            side: Side::Revision,
            line,
            range,
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

    /// Revision 1 has Foo.java and notes.txt; revision 2 renames Foo.java to
    /// Bar.java with three lines inserted after line 5 and deletes notes.txt.
    fn two_revisions(repo: &Path) -> BTreeMap<u32, String> {
        git(repo, &["init", "--quiet"]);
        git(repo, &["config", "user.email", "test@example.com"]);
        git(repo, &["config", "user.name", "Test User"]);
        std::fs::write(repo.join("base.txt"), "base\n").expect("write");
        commit(repo, "base");

        std::fs::create_dir_all(repo.join("src")).expect("mkdir");
        std::fs::write(repo.join("src/Foo.java"), lines(30)).expect("write");
        std::fs::write(repo.join("notes.txt"), "note\n").expect("write");
        let ps1 = commit(repo, "patch set 1");

        git(repo, &["mv", "src/Foo.java", "src/Bar.java"]);
        git(repo, &["rm", "--quiet", "notes.txt"]);
        let mut body: Vec<String> = lines(30).lines().map(ToString::to_string).collect();
        body.splice(5..5, ["a".to_string(), "b".to_string(), "c".to_string()]);
        std::fs::write(repo.join("src/Bar.java"), body.join("\n") + "\n").expect("write");
        git(repo, &["commit", "--quiet", "--amend", "--no-edit", "-a"]);
        let ps2 = git(repo, &["rev-parse", "HEAD"]);

        BTreeMap::from([(1, ps1), (2, ps2)])
    }

    fn manifest(revisions: BTreeMap<u32, String>, comments: Vec<Comment>) -> Manifest {
        Manifest {
            change: "I1".to_string(),
            revisions,
            comments,
            robot_comments: Vec::new(),
            drafts: Vec::new(),
        }
    }

    #[test]
    fn test_port_manifest_follows_rename_and_deletion() {
        let dir = tempdir().expect("tempdir");
        let revisions = two_revisions(dir.path());
        let repo = GitRepo::new(dir.path().to_path_buf());
        let manifest = manifest(
            revisions,
            vec![
                comment("range", "src/Foo.java", 10, Some(CommentRange::new(10, 0, 10, 5))),
                comment("above", "src/Foo.java", 2, None),
                comment("gone", "notes.txt", 1, None),
            ],
        );

        let report = port_manifest(&manifest, &repo, 2, PortOptions::default(), false, false)
            .expect("port");

        let placed: Vec<_> = report
            .comments
            .iter()
            .map(|c| (c.id.as_str(), c.path.as_str(), c.line))
            .collect();
        assert_eq!(
            placed,
            vec![
                ("range", "src/Bar.java", 13),
                ("above", "src/Bar.java", 2),
                ("gone", "/PATCHSET_LEVEL", 0),
            ]
        );
        assert_eq!(report.comments[0].range, Some(CommentRange::new(13, 0, 13, 5)));

        let metrics = report.metrics.expect("metrics");
        assert_eq!(metrics.range_preserved, 2);
        assert_eq!(metrics.demoted_to_change_level, 1);
    }

    #[test]
    fn test_parent_side_comments_stay_put_when_parent_is_unchanged() {
        let dir = tempdir().expect("tempdir");
        let revisions = two_revisions(dir.path());
        let repo = GitRepo::new(dir.path().to_path_buf());
        let mut on_parent = comment("parent", "base.txt", 1, None);
        on_parent.side = Side::Parent;
        let manifest = manifest(revisions, vec![on_parent.clone()]);

        let report = port_manifest(&manifest, &repo, 2, PortOptions::default(), false, false)
            .expect("port");
        assert_eq!(report.comments, vec![on_parent]);
    }

    #[test]
    fn test_unresolved_only_and_drafts() {
        let dir = tempdir().expect("tempdir");
        let revisions = two_revisions(dir.path());
        let repo = GitRepo::new(dir.path().to_path_buf());
        let mut resolved = comment("done", "src/Foo.java", 3, None);
        resolved.unresolved = false;
        let mut manifest = manifest(revisions, vec![resolved, comment("open", "src/Foo.java", 4, None)]);
        manifest.drafts = vec![comment("draft", "src/Foo.java", 8, None)];

        let report = port_manifest(&manifest, &repo, 2, PortOptions::default(), true, false)
            .expect("port");
        let ids: Vec<_> = report.comments.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["open"]);

        let drafts = port_manifest(&manifest, &repo, 2, PortOptions::default(), false, true)
            .expect("port drafts");
        assert!(drafts.metrics.is_none());
        assert_eq!(drafts.comments.len(), 1);
        assert_eq!(drafts.comments[0].line, 11);
    }

    #[test]
    fn test_human_reply_resolves_robot_thread() {
        let dir = tempdir().expect("tempdir");
        let revisions = two_revisions(dir.path());
        let repo = GitRepo::new(dir.path().to_path_buf());
        let finding = comment("finding", "src/Foo.java", 3, None);
        let mut fixed = comment("fixed", "src/Foo.java", 3, None);
        fixed.in_reply_to = Some("finding".to_string());
        fixed.unresolved = false;
        fixed.written_on += chrono::Duration::minutes(5);
        let mut manifest = manifest(revisions, vec![fixed]);
        manifest.robot_comments = vec![RobotComment {
            comment: finding,
            robot_id: "lint".to_string(),
            robot_run_id: "run-1".to_string(),
            url: None,
        }];

        let all = port_manifest(&manifest, &repo, 2, PortOptions::default(), false, false)
            .expect("port");
        assert_eq!(all.robot_comments.len(), 1);

        let open = port_manifest(&manifest, &repo, 2, PortOptions::default(), true, false)
            .expect("port");
        assert!(open.comments.is_empty());
        assert!(open.robot_comments.is_empty());
    }

    #[test]
    fn test_conflicting_range_follows_policy() {
        let dir = tempdir().expect("tempdir");
        let revisions = two_revisions(dir.path());
        let repo = GitRepo::new(dir.path().to_path_buf());
        let spanning = comment("spanning", "src/Foo.java", 7, Some(CommentRange::new(5, 0, 7, 2)));
        let manifest = manifest(revisions, vec![spanning]);

        let best = port_manifest(&manifest, &repo, 2, PortOptions::default(), false, false)
            .expect("port");
        assert_eq!(best.comments[0].range, Some(CommentRange::new(5, 0, 10, 2)));

        let omit = PortOptions {
            conflict_policy: ConflictPolicyKind::Omit,
            ..PortOptions::default()
        };
        let omitted = port_manifest(&manifest, &repo, 2, omit, false, false).expect("port");
        assert!(omitted.comments.is_empty());
    }

    #[test]
    fn test_unknown_target_is_rejected() {
        let dir = tempdir().expect("tempdir");
        let revisions = two_revisions(dir.path());
        let repo = GitRepo::new(dir.path().to_path_buf());
        let manifest = manifest(revisions, Vec::new());

        let err = port_manifest(&manifest, &repo, 7, PortOptions::default(), false, false)
            .expect_err("unknown target");
        assert!(err.to_string().contains("Revision 7"));
    }
}
