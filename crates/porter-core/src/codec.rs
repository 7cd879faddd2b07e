//! Conversion between comment coordinates and [`Position`]s.
//!
//! Comments use 1-based lines plus optional character offsets; positions use
//! 0-based, end-exclusive line ranges. Only line numbers are ever
//! recomputed: character offsets are carried over verbatim, matching the line
//! granularity of diffs.

use crate::comment::{Comment, CommentRange, PortableComment, Side, PATCHSET_LEVEL};
use crate::errors::{PortError, PortResult};
use crate::position::{LineRange, Position};

/// Line range covered by a comment, `None` for file and whole-change comments.
///
/// A range ending at character 0 of a line does not cover that line. A range
/// comment must also carry a line.
pub fn decode(comment: &Comment) -> PortResult<Option<LineRange>> {
    if let Some(range) = comment.range {
        if comment.line == 0 {
            return Err(PortError::malformed(&comment.id, "range on a comment without a line"));
        }
        if range.start_line == 0 {
            return Err(PortError::malformed(&comment.id, "range starts at line 0"));
        }
        let end = if range.end_char > 0 {
            range.end_line
        } else {
            range.end_line.saturating_sub(1)
        };
        let decoded = LineRange::new(range.start_line - 1, end);
        if decoded.is_empty() {
            return Err(PortError::malformed(
                &comment.id,
                format!(
                    "range {}:{}-{}:{} covers no line",
                    range.start_line, range.start_char, range.end_line, range.end_char
                ),
            ));
        }
        return Ok(Some(decoded));
    }

    if comment.line > 0 {
        return Ok(Some(LineRange::new(comment.line - 1, comment.line)));
    }
    Ok(None)
}

/// Line and range for `original` moved to `new_range`.
///
/// Range comments stay range comments as long as a range remains, with the
/// line pointing at the range's last line.
#[must_use]
pub fn encode(original: &Comment, new_range: Option<LineRange>) -> (u32, Option<CommentRange>) {
    match (original.range, new_range) {
        (Some(old), Some(new)) => {
            let end_line = if old.end_char > 0 { new.end } else { new.end + 1 };
            let range = CommentRange::new(new.start + 1, old.start_char, end_line, old.end_char);
            (end_line, Some(range))
        }
        (Some(_), None) => (0, None),
        (None, new) => (new.map_or(0, |range| range.start + 1), None),
    }
}

/// Position a comment refers to.
pub fn position_of(comment: &Comment) -> PortResult<Position> {
    let line_range = decode(comment)?;
    if comment.is_patchset_level() {
        return Ok(Position::whole_change());
    }
    Ok(Position {
        file_path: Some(comment.path.clone()),
        line_range,
    })
}

/// Copy of `original` moved to `position`.
///
/// A file comment that lost its file is attributed to the revision, since a
/// whole-change comment on the parent side means nothing.
#[must_use]
pub fn apply_position<T: PortableComment>(original: &T, position: &Position) -> T {
    let mut ported = original.clone();
    let base = ported.comment_mut();
    let (line, range) = encode(original.comment(), position.line_range);

    match &position.file_path {
        Some(path) => path.clone_into(&mut base.path),
        None => {
            if !original.comment().is_patchset_level() {
                base.side = Side::Revision;
            }
            PATCHSET_LEVEL.clone_into(&mut base.path);
        }
    }
    base.line = line;
    base.range = range;
    ported
}
