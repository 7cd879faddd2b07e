//! Transformation of [`Position`]s in one Git tree to [`Position`]s in another.
//!
//! Knowing which file of the source tree became which file of the target tree
//! and which line ranges were replaced inside it is enough to move a position:
//!
//! 1. Replace the file path with its counterpart in the target tree. A file
//!    without a counterpart (deleted) is a file conflict.
//! 2. Walk the hunks of that file in order. Hunks entirely before the
//!    position shift it by their net line delta; hunks entirely after it are
//!    irrelevant. A hunk overlapping the position is a range conflict.
//!
//! Conflicts are handed to a [`ConflictPolicy`], which picks a replacement
//! position or drops the entity altogether.

use std::collections::HashMap;

use crate::position::{shift_line, LineRange, Mapping, Position, PositionedEntity, ReplacedRange};

/// Decides what happens to a position that cannot be mapped exactly.
pub trait ConflictPolicy: Send + Sync {
    /// The position's file does not exist in the target tree.
    ///
    /// Returns `None` to drop the entity.
    fn on_file_conflict(&self, position: &Position) -> Option<Position>;

    /// Hunks overlap the position's lines.
    ///
    /// `position` already carries the target file path and the untouched
    /// source range. Returns `None` to drop the entity.
    fn on_range_conflict(&self, position: &Position, conflict: &RangeConflict) -> Option<Position>;
}

/// The hunks clashing with a line range, and enough context to widen it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeConflict {
    /// The range in the source tree.
    pub range: LineRange,
    /// Every hunk overlapping `range`, ordered by old range. Never empty.
    pub overlapping: Vec<ReplacedRange>,
    /// Net shift contributed by the hunks entirely before `range`.
    pub shift_before: i64,
    /// Line count of the target file, when known.
    pub new_line_count: Option<u32>,
}

impl RangeConflict {
    /// Smallest target range covering every overlapping hunk's new lines and
    /// the parts of `range` outside the hunks, shifted accordingly.
    ///
    /// Returns `None` when nothing sensible remains: the lines were deleted
    /// outright, or the widened range covers the whole target file.
    #[must_use]
    pub fn widened(&self) -> Option<LineRange> {
        let first = self.overlapping.first()?;
        let last = self.overlapping.last()?;

        let outside_hunks = LineRange::new(
            shift_line(self.range.start, self.shift_before),
            shift_line(self.range.end, last.shift_after()),
        );
        let widened = outside_hunks.hull(LineRange::new(first.new.start, last.new.end));

        if widened.is_empty() {
            return None;
        }
        if let Some(line_count) = self.new_line_count {
            if widened.start == 0 && widened.end >= line_count {
                return None;
            }
        }
        Some(widened)
    }
}

/// Widen conflicting ranges over every overlapping hunk; keep deleted-file
/// positions as whole-change positions. Never drops an entity.
#[derive(Debug, Clone, Copy, Default)]
pub struct BestPositionOnConflict;

impl ConflictPolicy for BestPositionOnConflict {
    fn on_file_conflict(&self, _position: &Position) -> Option<Position> {
        Some(Position::whole_change())
    }

    fn on_range_conflict(&self, position: &Position, conflict: &RangeConflict) -> Option<Position> {
        Some(match conflict.widened() {
            Some(range) => Position {
                file_path: position.file_path.clone(),
                line_range: Some(range),
            },
            None => position.without_line_range(),
        })
    }
}

/// Fall back one level on conflicts: a conflicting range becomes a file
/// position, a deleted file becomes a whole-change position.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileLevelOnConflict;

impl ConflictPolicy for FileLevelOnConflict {
    fn on_file_conflict(&self, _position: &Position) -> Option<Position> {
        Some(Position::whole_change())
    }

    fn on_range_conflict(&self, position: &Position, _conflict: &RangeConflict) -> Option<Position> {
        Some(position.without_line_range())
    }
}

/// Drop any entity whose position cannot be mapped exactly.
#[derive(Debug, Clone, Copy, Default)]
pub struct OmitPositionOnConflict;

impl ConflictPolicy for OmitPositionOnConflict {
    fn on_file_conflict(&self, _position: &Position) -> Option<Position> {
        None
    }

    fn on_range_conflict(&self, _position: &Position, _conflict: &RangeConflict) -> Option<Position> {
        None
    }
}

/// What the transformer decided for a single position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transformed {
    /// No mapping touches the file; keep the entity as it is.
    Unchanged,
    /// The entity moves to a new position (possibly equal to the old one).
    Moved(Position),
    /// The conflict policy dropped the entity.
    Dropped,
}

/// Maps positioned entities through a set of [`Mapping`]s.
pub struct PositionTransformer {
    policy: Box<dyn ConflictPolicy>,
}

impl Default for PositionTransformer {
    fn default() -> Self {
        Self::new(BestPositionOnConflict)
    }
}

impl PositionTransformer {
    #[must_use]
    pub fn new(policy: impl ConflictPolicy + 'static) -> Self {
        Self {
            policy: Box::new(policy),
        }
    }

    #[must_use]
    pub fn with_boxed_policy(policy: Box<dyn ConflictPolicy>) -> Self {
        Self { policy }
    }

    /// Transform every entity through `mappings`, preserving input order.
    ///
    /// `mappings` should name each old path at most once; copied files are
    /// handled by calling this once per copy target. Mappings for files no
    /// entity refers to are harmless.
    pub fn transform<T>(&self, entities: Vec<PositionedEntity<T>>, mappings: &[Mapping]) -> Vec<T> {
        let by_old_path = index_by_old_path(mappings);
        entities
            .into_iter()
            .filter_map(|entity| match self.transform_position(entity.position(), &by_old_path) {
                Transformed::Unchanged => Some(entity.into_inner()),
                Transformed::Moved(position) => Some(entity.rebuild_at(&position)),
                Transformed::Dropped => None,
            })
            .collect()
    }

    /// Decide the fate of one position given mappings indexed by old path.
    #[must_use]
    pub fn transform_position(
        &self,
        position: &Position,
        by_old_path: &HashMap<&str, &Mapping>,
    ) -> Transformed {
        let Some(path) = position.file_path.as_deref() else {
            return Transformed::Unchanged;
        };
        let Some(mapping) = by_old_path.get(path) else {
            return Transformed::Unchanged;
        };
        let Some(new_path) = mapping.file.new_path() else {
            return self
                .policy
                .on_file_conflict(position)
                .map_or(Transformed::Dropped, Transformed::Moved);
        };

        let renamed = position.with_file_path(new_path);
        let Some(range) = position.line_range else {
            return Transformed::Moved(renamed);
        };

        match locate(range, mapping) {
            Placement::Clear { shift } => Transformed::Moved(renamed.shift_by(shift)),
            Placement::Conflict(conflict) => {
                tracing::trace!(
                    path,
                    new_path,
                    start = range.start,
                    end = range.end,
                    hunks = conflict.overlapping.len(),
                    "range overlaps diff hunks"
                );
                self.policy
                    .on_range_conflict(&renamed, &conflict)
                    .map_or(Transformed::Dropped, Transformed::Moved)
            }
        }
    }
}

/// Index mappings by their old path.
///
/// If several mappings share an old path, the first live one wins over
/// deletions so a file that survives somewhere is never treated as gone.
#[must_use]
pub fn index_by_old_path(mappings: &[Mapping]) -> HashMap<&str, &Mapping> {
    let mut index: HashMap<&str, &Mapping> = HashMap::with_capacity(mappings.len());
    for mapping in mappings {
        let old_path = mapping.file.old_path();
        match index.get(old_path) {
            Some(existing) if existing.file.new_path().is_some() => {}
            Some(_) if mapping.file.new_path().is_none() => {}
            _ => {
                index.insert(old_path, mapping);
            }
        }
    }
    index
}

enum Placement {
    Clear { shift: i64 },
    Conflict(RangeConflict),
}

fn locate(range: LineRange, mapping: &Mapping) -> Placement {
    let mut shift_before = 0;
    let mut overlapping = Vec::new();

    for edit in &mapping.edits {
        if edit.old.end <= range.start {
            shift_before = edit.shift_after();
        } else if range.overlaps(&edit.old) {
            overlapping.push(*edit);
        } else {
            break;
        }
    }

    if overlapping.is_empty() {
        Placement::Clear {
            shift: shift_before,
        }
    } else {
        Placement::Conflict(RangeConflict {
            range,
            overlapping,
            shift_before,
            new_line_count: mapping.new_line_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::FileMapping;

    fn edit(old: (u32, u32), new: (u32, u32)) -> ReplacedRange {
        ReplacedRange::new(LineRange::new(old.0, old.1), LineRange::new(new.0, new.1))
    }

    fn entity(position: Position) -> PositionedEntity<Position> {
        PositionedEntity::with_position(position.clone(), position, |_, new| new.clone())
    }

    fn transform_one(transformer: &PositionTransformer, position: Position, mappings: &[Mapping]) -> Vec<Position> {
        transformer.transform(vec![entity(position)], mappings)
    }

    #[test]
    fn test_positions_on_unmapped_files_are_unchanged() {
        let transformer = PositionTransformer::default();
        let mappings = vec![Mapping::new(
            FileMapping::modified("other.txt"),
            [edit((0, 0), (0, 10))],
        )];
        let position = Position::range("a.txt", LineRange::new(4, 6));
        assert_eq!(transform_one(&transformer, position.clone(), &mappings), vec![position]);
    }

    #[test]
    fn test_whole_change_positions_never_move() {
        let transformer = PositionTransformer::default();
        let mappings = vec![Mapping::new(FileMapping::deleted("a.txt"), [])];
        assert_eq!(
            transform_one(&transformer, Position::whole_change(), &mappings),
            vec![Position::whole_change()]
        );
    }

    #[test]
    fn test_pure_rename_keeps_range() {
        let transformer = PositionTransformer::default();
        let mappings = vec![Mapping::new(FileMapping::renamed("a.txt", "b.txt"), [])];
        let ported = transform_one(&transformer, Position::range("a.txt", LineRange::new(2, 3)), &mappings);
        assert_eq!(ported, vec![Position::range("b.txt", LineRange::new(2, 3))]);
    }

    #[test]
    fn test_file_position_follows_rename_and_ignores_edits() {
        let transformer = PositionTransformer::default();
        let mappings = vec![Mapping::new(
            FileMapping::renamed("a.txt", "b.txt"),
            [edit((0, 3), (0, 9))],
        )];
        let ported = transform_one(&transformer, Position::file("a.txt"), &mappings);
        assert_eq!(ported, vec![Position::file("b.txt")]);
    }

    #[test]
    fn test_deleted_file_demotes_to_whole_change() {
        let transformer = PositionTransformer::default();
        let mappings = vec![Mapping::new(FileMapping::deleted("a.txt"), [])];

        let ported = transform_one(&transformer, Position::range("a.txt", LineRange::new(1, 4)), &mappings);
        assert_eq!(ported, vec![Position::whole_change()]);

        let ported = transform_one(&transformer, Position::file("a.txt"), &mappings);
        assert_eq!(ported, vec![Position::whole_change()]);
    }

    #[test]
    fn test_insertion_before_range_shifts_it() {
        let transformer = PositionTransformer::default();
        let mappings = vec![Mapping::new(
            FileMapping::modified("a.txt"),
            [edit((10, 10), (10, 15))],
        )];
        let ported = transform_one(&transformer, Position::range("a.txt", LineRange::new(19, 20)), &mappings);
        assert_eq!(ported, vec![Position::range("a.txt", LineRange::new(24, 25))]);
    }

    #[test]
    fn test_deletion_before_range_shifts_it_up() {
        let transformer = PositionTransformer::default();
        let mappings = vec![Mapping::new(
            FileMapping::modified("a.txt"),
            [edit((1, 3), (1, 1))],
        )];
        let ported = transform_one(&transformer, Position::range("a.txt", LineRange::new(4, 6)), &mappings);
        assert_eq!(ported, vec![Position::range("a.txt", LineRange::new(2, 4))]);
    }

    #[test]
    fn test_shift_accumulates_over_several_hunks() {
        let transformer = PositionTransformer::default();
        let mappings = vec![Mapping::new(
            FileMapping::modified("a.txt"),
            [
                edit((2, 2), (2, 4)),
                edit((5, 7), (7, 8)),
                edit((30, 31), (30, 40)),
            ],
        )];
        // +2 then -1 before the range, the third hunk is after it.
        let ported = transform_one(&transformer, Position::range("a.txt", LineRange::new(10, 12)), &mappings);
        assert_eq!(ported, vec![Position::range("a.txt", LineRange::new(11, 13))]);
    }

    #[test]
    fn test_hunk_after_range_does_not_shift() {
        let transformer = PositionTransformer::default();
        let mappings = vec![Mapping::new(
            FileMapping::modified("a.txt"),
            [edit((6, 6), (6, 3000))],
        )];
        let ported = transform_one(&transformer, Position::range("a.txt", LineRange::new(4, 6)), &mappings);
        assert_eq!(ported, vec![Position::range("a.txt", LineRange::new(4, 6))]);
    }

    #[test]
    fn test_insertion_at_range_start_shifts_range() {
        let transformer = PositionTransformer::default();
        let mappings = vec![Mapping::new(
            FileMapping::modified("a.txt"),
            [edit((4, 4), (4, 6))],
        )];
        let ported = transform_one(&transformer, Position::range("a.txt", LineRange::new(4, 5)), &mappings);
        assert_eq!(ported, vec![Position::range("a.txt", LineRange::new(6, 7))]);
    }

    #[test]
    fn test_overlap_widens_over_the_hunk() {
        let transformer = PositionTransformer::default();
        let mappings = vec![Mapping::new(
            FileMapping::modified("a.txt"),
            [edit((9, 11), (9, 14))],
        )];
        let ported = transform_one(&transformer, Position::range("a.txt", LineRange::new(8, 12)), &mappings);
        assert_eq!(ported, vec![Position::range("a.txt", LineRange::new(8, 15))]);

        let range = ported[0].line_range.expect("range kept");
        assert!(range.start <= 9 && range.end >= 14);
    }

    #[test]
    fn test_overlap_widens_over_every_overlapping_hunk() {
        let transformer = PositionTransformer::default();
        let mappings = vec![Mapping::new(
            FileMapping::modified("a.txt"),
            [edit((0, 1), (0, 2)), edit((4, 5), (5, 5)), edit((7, 8), (7, 10))],
        )];
        // The range [3, 8) touches the second and third hunk and sits after the first.
        let ported = transform_one(&transformer, Position::range("a.txt", LineRange::new(3, 8)), &mappings);
        assert_eq!(ported, vec![Position::range("a.txt", LineRange::new(4, 10))]);
    }

    #[test]
    fn test_insertion_inside_range_is_a_conflict() {
        let transformer = PositionTransformer::default();
        let mappings = vec![Mapping::new(
            FileMapping::modified("a.txt"),
            [edit((5, 5), (5, 8))],
        )];
        let ported = transform_one(&transformer, Position::range("a.txt", LineRange::new(4, 6)), &mappings);
        assert_eq!(ported, vec![Position::range("a.txt", LineRange::new(4, 9))]);
    }

    #[test]
    fn test_range_inside_deleted_lines_becomes_file_position() {
        let transformer = PositionTransformer::default();
        let mappings = vec![Mapping::new(
            FileMapping::modified("a.txt"),
            [edit((9, 11), (9, 9))],
        )];
        let ported = transform_one(&transformer, Position::range("a.txt", LineRange::new(9, 10)), &mappings);
        assert_eq!(ported, vec![Position::file("a.txt")]);
    }

    #[test]
    fn test_widening_over_whole_file_becomes_file_position() {
        let transformer = PositionTransformer::default();
        let mappings = vec![Mapping::new(
            FileMapping::renamed("a.txt", "b.txt"),
            [edit((0, 5), (0, 7))],
        )
        .with_new_line_count(7)];
        let ported = transform_one(&transformer, Position::range("a.txt", LineRange::new(1, 2)), &mappings);
        assert_eq!(ported, vec![Position::file("b.txt")]);
    }

    #[test]
    fn test_file_level_policy_drops_conflicting_range() {
        let transformer = PositionTransformer::new(FileLevelOnConflict);
        let mappings = vec![Mapping::new(
            FileMapping::modified("a.txt"),
            [edit((9, 11), (9, 14))],
        )];
        let ported = transform_one(&transformer, Position::range("a.txt", LineRange::new(8, 12)), &mappings);
        assert_eq!(ported, vec![Position::file("a.txt")]);
    }

    #[test]
    fn test_omit_policy_drops_conflicting_entities() {
        let transformer = PositionTransformer::new(OmitPositionOnConflict);
        let mappings = vec![
            Mapping::new(FileMapping::modified("a.txt"), [edit((9, 11), (9, 14))]),
            Mapping::new(FileMapping::deleted("gone.txt"), []),
        ];
        let entities = vec![
            entity(Position::range("a.txt", LineRange::new(8, 12))),
            entity(Position::range("a.txt", LineRange::new(20, 21))),
            entity(Position::file("gone.txt")),
        ];
        let ported = transformer.transform(entities, &mappings);
        assert_eq!(ported, vec![Position::range("a.txt", LineRange::new(23, 24))]);
    }

    #[test]
    fn test_output_follows_input_order() {
        let transformer = PositionTransformer::default();
        let mappings = vec![Mapping::new(
            FileMapping::modified("a.txt"),
            [edit((0, 0), (0, 1))],
        )];
        let entities = vec![
            entity(Position::range("a.txt", LineRange::new(9, 10))),
            entity(Position::whole_change()),
            entity(Position::range("a.txt", LineRange::new(1, 2))),
        ];
        let ported = transformer.transform(entities, &mappings);
        assert_eq!(
            ported,
            vec![
                Position::range("a.txt", LineRange::new(10, 11)),
                Position::whole_change(),
                Position::range("a.txt", LineRange::new(2, 3)),
            ]
        );
    }

    #[test]
    fn test_live_mapping_wins_over_deletion_of_same_path() {
        let mappings = vec![
            Mapping::new(FileMapping::deleted("a.txt"), []),
            Mapping::new(FileMapping::renamed("a.txt", "b.txt"), []),
            Mapping::new(FileMapping::renamed("a.txt", "c.txt"), []),
        ];
        let index = index_by_old_path(&mappings);
        assert_eq!(index["a.txt"].file.new_path(), Some("b.txt"));
    }
}
