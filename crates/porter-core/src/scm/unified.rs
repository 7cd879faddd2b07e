//! Parsing of multi-file unified diffs as produced by `git diff`.
//!
//! Every file section becomes a [`FileDiff`]. Hunks are split into edits
//! (maximal runs of removed and added lines), so diffs with context lines
//! parse the same way as zero-context ones.

use anyhow::{bail, Context, Result};

use crate::mapping::{ChangeType, FileDiff};
use crate::position::LineRange;

/// A parsed hunk header from unified diff format.
///
/// Format: `@@ -old_start,old_count +new_start,new_count @@`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HunkHeader {
    /// Start line in the old file (1-indexed, or the line before an insertion).
    pub old_start: u32,
    /// Number of lines in the old file (0 for pure insertions).
    pub old_count: u32,
    /// Start line in the new file.
    pub new_start: u32,
    /// Number of lines in the new file.
    pub new_count: u32,
}

impl HunkHeader {
    /// Parse a hunk header line.
    ///
    /// Handles formats:
    /// - `@@ -1,5 +1,7 @@` (standard)
    /// - `@@ -1 +1 @@` (count defaults to 1)
    /// - `@@ -0,0 +1,3 @@` (new file)
    pub fn parse(line: &str) -> Result<Self> {
        let line = line.trim();
        let Some(rest) = line.strip_prefix("@@") else {
            bail!("Not a hunk header: {line}");
        };

        // Everything after the second @@ is the section heading.
        let range_part = rest.find("@@").map_or(rest, |idx| &rest[..idx]);

        let parts: Vec<&str> = range_part.split_whitespace().collect();
        let [old, new, ..] = parts.as_slice() else {
            bail!("Invalid hunk header format: {line}");
        };

        let (old_start, old_count) = Self::parse_range(old, '-')
            .with_context(|| format!("Invalid old range in hunk header: {line}"))?;
        let (new_start, new_count) = Self::parse_range(new, '+')
            .with_context(|| format!("Invalid new range in hunk header: {line}"))?;

        Ok(Self {
            old_start,
            old_count,
            new_start,
            new_count,
        })
    }

    /// Parse a range like `-1,5` or `+1` into (start, count).
    fn parse_range(s: &str, prefix: char) -> Result<(u32, u32)> {
        let Some(s) = s.strip_prefix(prefix) else {
            bail!("Range must start with '{prefix}': {s}");
        };

        if let Some((start, count)) = s.split_once(',') {
            Ok((start.parse()?, count.parse()?))
        } else {
            Ok((s.parse()?, 1))
        }
    }

    /// 0-based index of the first line the hunk covers on each side.
    ///
    /// A side with no lines names the line the hunk sits after, which is
    /// already the 0-based index of the insertion point.
    const fn first_index(start: u32, count: u32) -> u32 {
        if count == 0 {
            start
        } else {
            start.saturating_sub(1)
        }
    }
}

/// Walks the body of one hunk and collects its edits.
struct HunkWalker {
    old_line: u32,
    new_line: u32,
    old_left: u32,
    new_left: u32,
    pending: Option<(u32, u32)>,
}

impl HunkWalker {
    const fn new(header: HunkHeader) -> Self {
        Self {
            old_line: HunkHeader::first_index(header.old_start, header.old_count),
            new_line: HunkHeader::first_index(header.new_start, header.new_count),
            old_left: header.old_count,
            new_left: header.new_count,
            pending: None,
        }
    }

    const fn is_done(&self) -> bool {
        self.old_left == 0 && self.new_left == 0
    }

    fn line(&mut self, line: &str, edits: &mut Vec<(LineRange, LineRange)>) -> Result<()> {
        match line.as_bytes().first() {
            Some(b'-') if self.old_left > 0 => {
                self.begin_edit();
                self.old_line += 1;
                self.old_left -= 1;
            }
            Some(b'+') if self.new_left > 0 => {
                self.begin_edit();
                self.new_line += 1;
                self.new_left -= 1;
            }
            Some(b' ') | None if self.old_left > 0 && self.new_left > 0 => {
                self.flush(edits);
                self.old_line += 1;
                self.new_line += 1;
                self.old_left -= 1;
                self.new_left -= 1;
            }
            Some(b'\\') => {}
            _ => bail!("Unexpected line in hunk body: {line}"),
        }
        if self.is_done() {
            self.flush(edits);
        }
        Ok(())
    }

    fn begin_edit(&mut self) {
        if self.pending.is_none() {
            self.pending = Some((self.old_line, self.new_line));
        }
    }

    fn flush(&mut self, edits: &mut Vec<(LineRange, LineRange)>) {
        if let Some((old_start, new_start)) = self.pending.take() {
            edits.push((
                LineRange::new(old_start, self.old_line),
                LineRange::new(new_start, self.new_line),
            ));
        }
    }
}

/// The file section being parsed.
struct Section {
    diff: FileDiff,
    hunk: Option<HunkWalker>,
}

impl Section {
    fn start(header: &str) -> Self {
        let (old_path, new_path) = split_git_header(header).unwrap_or_default();
        Self {
            diff: FileDiff {
                old_path: Some(old_path),
                new_path: Some(new_path),
                change_type: ChangeType::Modified,
                edits: Vec::new(),
                new_line_count: None,
            },
            hunk: None,
        }
    }

    fn finish(self) -> Result<FileDiff> {
        if self.hunk.is_some_and(|hunk| !hunk.is_done()) {
            bail!(
                "Truncated hunk in diff of {}",
                self.diff
                    .new_path
                    .as_deref()
                    .or(self.diff.old_path.as_deref())
                    .unwrap_or("<unknown>")
            );
        }
        Ok(self.diff)
    }

    fn header_line(&mut self, line: &str) {
        let diff = &mut self.diff;
        if line.starts_with("new file mode") {
            diff.change_type = ChangeType::Added;
            diff.old_path = None;
        } else if line.starts_with("deleted file mode") {
            diff.change_type = ChangeType::Deleted;
            diff.new_path = None;
        } else if let Some(path) = line.strip_prefix("rename from ") {
            diff.change_type = ChangeType::Renamed;
            diff.old_path = Some(unquote(path));
        } else if let Some(path) = line.strip_prefix("rename to ") {
            diff.new_path = Some(unquote(path));
        } else if let Some(path) = line.strip_prefix("copy from ") {
            diff.change_type = ChangeType::Copied;
            diff.old_path = Some(unquote(path));
        } else if let Some(path) = line.strip_prefix("copy to ") {
            diff.new_path = Some(unquote(path));
        } else if let Some(path) = line.strip_prefix("--- ") {
            diff.old_path = side_path(path, "a/");
        } else if let Some(path) = line.strip_prefix("+++ ") {
            diff.new_path = side_path(path, "b/");
        }
    }
}

/// Parse every file section of a `git diff` output.
///
/// Line ranges are 0-based and half-open. Added and deleted files carry no
/// edits worth mapping but are still reported.
pub fn parse_file_diffs(diff: &str) -> Result<Vec<FileDiff>> {
    let mut files = Vec::new();
    let mut current: Option<Section> = None;

    for line in diff.lines() {
        if let Some(header) = line.strip_prefix("diff --git ") {
            if let Some(section) = current.take() {
                files.push(section.finish()?);
            }
            current = Some(Section::start(header));
            continue;
        }

        let Some(section) = current.as_mut() else {
            if line.trim().is_empty() {
                continue;
            }
            bail!("Diff text before the first file header: {line}");
        };

        if let Some(hunk) = section.hunk.as_mut().filter(|hunk| !hunk.is_done()) {
            hunk.line(line, &mut section.diff.edits)?;
        } else if line.starts_with("@@") {
            let header = HunkHeader::parse(line)?;
            let mut hunk = HunkWalker::new(header);
            if hunk.is_done() {
                hunk.flush(&mut section.diff.edits);
            }
            section.hunk = Some(hunk);
        } else {
            section.header_line(line);
        }
    }

    if let Some(section) = current {
        files.push(section.finish()?);
    }
    Ok(files)
}

/// Split `a/<old> b/<new>` from a `diff --git` line.
///
/// Ambiguous when paths contain " b/"; the `---`/`+++` and rename lines
/// that follow override this guess.
fn split_git_header(header: &str) -> Option<(String, String)> {
    if header.starts_with('"') {
        let (old, rest) = split_quoted(header)?;
        let new = rest.trim_start();
        return Some((strip_side(&old, "a/"), strip_side(&unquote(new), "b/")));
    }
    let old = header.strip_prefix("a/")?;
    let (old, new) = old.split_once(" b/")?;
    Some((old.to_string(), unquote(new)))
}

fn split_quoted(text: &str) -> Option<(String, &str)> {
    let body = text.strip_prefix('"')?;
    let mut escaped = false;
    for (idx, ch) in body.char_indices() {
        match ch {
            '\\' if !escaped => escaped = true,
            '"' if !escaped => {
                let quoted = &text[..idx + 2];
                return Some((unquote(quoted), &body[idx + 1..]));
            }
            _ => escaped = false,
        }
    }
    None
}

fn side_path(path: &str, prefix: &str) -> Option<String> {
    let path = unquote(path.trim_end());
    if path == "/dev/null" {
        None
    } else {
        Some(strip_side(&path, prefix))
    }
}

fn strip_side(path: &str, prefix: &str) -> String {
    path.strip_prefix(prefix).unwrap_or(path).to_string()
}

/// Undo git's C-style quoting of unusual paths.
fn unquote(path: &str) -> String {
    let Some(inner) = path
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
    else {
        return path.to_string();
    };

    let mut bytes = Vec::with_capacity(inner.len());
    let mut chars = inner.bytes().peekable();
    while let Some(byte) = chars.next() {
        if byte != b'\\' {
            bytes.push(byte);
            continue;
        }
        match chars.next() {
            Some(b'n') => bytes.push(b'\n'),
            Some(b't') => bytes.push(b'\t'),
            Some(b'"') => bytes.push(b'"'),
            Some(b'\\') | None => bytes.push(b'\\'),
            Some(digit @ b'0'..=b'7') => {
                let mut value = u32::from(digit - b'0');
                for _ in 0..2 {
                    match chars.peek() {
                        Some(&next @ b'0'..=b'7') => {
                            value = value * 8 + u32::from(next - b'0');
                            chars.next();
                        }
                        _ => break,
                    }
                }
                bytes.push(u8::try_from(value).unwrap_or(b'?'));
            }
            Some(other) => {
                bytes.push(b'\\');
                bytes.push(other);
            }
        }
    }
    String::from_utf8_lossy(&bytes).into_owned()
}
