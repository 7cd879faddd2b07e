//! Porting of comments from earlier revisions onto a target revision.
//!
//! Comments are grouped by the revision and side they were written on, since
//! each group needs its own diff: parent-side comments follow the parent
//! commits, revision-side comments follow the revision commits.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::codec;
use crate::comment::{PortableComment, Side};
use crate::config::PortOptions;
use crate::errors::{PortError, PortResult};
use crate::filter::{CommentFilter, FilterChain};
use crate::mapping::{self, DiffEngine};
use crate::metrics::{classify, MetricsSink, NoopMetrics};
use crate::position::{Mapping, Position, PositionedEntity};
use crate::transform::PositionTransformer;

/// A numbered revision of a change.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RevisionId {
    pub change: String,
    pub number: u32,
}

impl RevisionId {
    #[must_use]
    pub fn new(change: impl Into<String>, number: u32) -> Self {
        Self {
            change: change.into(),
            number,
        }
    }

    #[must_use]
    pub fn with_number(&self, number: u32) -> Self {
        Self {
            change: self.change.clone(),
            number,
        }
    }
}

/// A revision/side combination has no commit.
#[derive(Debug, Error)]
#[error("No {side} commit for revision {revision} of change {change}")]
pub struct CommitNotFound {
    pub change: String,
    pub revision: u32,
    pub side: Side,
}

impl CommitNotFound {
    #[must_use]
    pub fn new(revision: &RevisionId, side: Side) -> Self {
        Self {
            change: revision.change.clone(),
            revision: revision.number,
            side,
        }
    }
}

/// Resolves the commit a revision's side refers to.
pub trait CommitResolver {
    fn commit_for(&self, revision: &RevisionId, side: Side) -> Result<String, CommitNotFound>;
}

/// A comment as written and as ported, kept together for metrics.
#[derive(Debug, Clone)]
struct PortedPair<T> {
    original: T,
    ported: T,
}

impl<T: PortableComment> PortedPair<T> {
    fn unchanged(comment: T) -> Self {
        Self {
            original: comment.clone(),
            ported: comment,
        }
    }

    fn rebuild(pair: &Self, position: &Position) -> Self {
        Self {
            original: pair.original.clone(),
            ported: codec::apply_position(&pair.original, position),
        }
    }
}

/// Ports comments onto later revisions.
pub struct CommentPorter<'a> {
    commits: &'a dyn CommitResolver,
    diffs: &'a dyn DiffEngine,
    metrics: &'a dyn MetricsSink,
    transformer: PositionTransformer,
    options: PortOptions,
}

impl<'a> CommentPorter<'a> {
    #[must_use]
    pub fn new(
        commits: &'a dyn CommitResolver,
        diffs: &'a dyn DiffEngine,
        metrics: &'a dyn MetricsSink,
        options: PortOptions,
    ) -> Self {
        Self {
            commits,
            diffs,
            metrics,
            transformer: PositionTransformer::with_boxed_policy(options.conflict_policy.policy()),
            options,
        }
    }

    /// Port published comments written before `target` onto it.
    ///
    /// `extra_filters` run after the earlier-revision filter, in order.
    /// Ported comments keep their id and original revision number. A comment
    /// on a copied file is returned once per copy.
    pub fn port<T: PortableComment>(
        &self,
        target: &RevisionId,
        comments: Vec<T>,
        extra_filters: &[&dyn CommentFilter<T>],
    ) -> PortResult<Vec<T>> {
        let chain = extra_filters
            .iter()
            .fold(FilterChain::new(target.number), |chain, filter| chain.then(*filter));
        self.port_filtered(target, chain.apply(comments), self.metrics)
    }

    /// Port draft comments written before `target` onto it.
    ///
    /// Drafts only pass the earlier-revision filter and are not counted.
    pub fn port_drafts<T: PortableComment>(
        &self,
        target: &RevisionId,
        comments: Vec<T>,
    ) -> PortResult<Vec<T>> {
        let eligible = FilterChain::new(target.number).apply(comments);
        self.port_filtered(target, eligible, &NoopMetrics)
    }

    fn port_filtered<T: PortableComment>(
        &self,
        target: &RevisionId,
        comments: Vec<T>,
        metrics: &dyn MetricsSink,
    ) -> PortResult<Vec<T>> {
        if target.number == 0 {
            return Err(PortError::InvalidTarget {
                change: target.change.clone(),
                revision: target.number,
            });
        }

        let mut groups: BTreeMap<(u32, Side), Vec<T>> = BTreeMap::new();
        for comment in comments {
            let key = (comment.comment().revision, comment.comment().side);
            groups.entry(key).or_default().push(comment);
        }

        let mut ported = Vec::new();
        for ((revision, side), group) in groups {
            for pair in self.port_group(target, revision, side, group)? {
                if let Some(counter) = classify(pair.original.comment(), pair.ported.comment()) {
                    metrics.increment(counter);
                }
                ported.push(pair.ported);
            }
        }
        Ok(ported)
    }

    fn port_group<T: PortableComment>(
        &self,
        target: &RevisionId,
        revision: u32,
        side: Side,
        comments: Vec<T>,
    ) -> PortResult<Vec<PortedPair<T>>> {
        let entities = comments
            .into_iter()
            .map(|comment| {
                let position = codec::position_of(comment.comment())?;
                Ok(PositionedEntity::with_position(
                    PortedPair::unchanged(comment),
                    position,
                    PortedPair::rebuild,
                ))
            })
            .collect::<PortResult<Vec<_>>>()?;

        let origin = target.with_number(revision);
        let commits = self
            .commits
            .commit_for(&origin, side)
            .and_then(|old| Ok((old, self.commits.commit_for(target, side)?)));
        let (old_commit, new_commit) = match commits {
            Ok(commits) => commits,
            Err(err) => {
                tracing::error!(
                    error = %err,
                    revision,
                    %side,
                    dropped = entities.len(),
                    "cannot resolve commits for comment group; dropping its comments"
                );
                return Ok(Vec::new());
            }
        };

        let mappings = match self
            .diffs
            .list_modified_files(&old_commit, &new_commit, &self.options.diff)
        {
            Ok(files) => mapping::build(files.values()),
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    revision,
                    %side,
                    comments = entities.len(),
                    "diff unavailable; porting comments as if their files were deleted"
                );
                mapping::fallback(
                    entities
                        .iter()
                        .filter_map(|entity| entity.position().file_path.as_deref()),
                )
            }
        };

        tracing::debug!(
            revision,
            %side,
            %old_commit,
            %new_commit,
            comments = entities.len(),
            mappings = mappings.len(),
            "porting comment group"
        );

        Ok(self.transform_with_copies(entities, mappings))
    }

    /// Run the transformer once per copy layer.
    ///
    /// The first layer sees every entity; later layers only the entities on a
    /// file that was copied once more.
    fn transform_with_copies<E: Clone>(
        &self,
        entities: Vec<PositionedEntity<E>>,
        mappings: Vec<Mapping>,
    ) -> Vec<E> {
        let mut layers = copy_layers(mappings).into_iter();
        let first = layers.next().unwrap_or_default();

        let copies: Vec<_> = layers
            .map(|layer| {
                let on_copied_file: Vec<_> = entities
                    .iter()
                    .filter(|entity| {
                        entity.position().file_path.as_deref().is_some_and(|path| {
                            layer.iter().any(|mapping| mapping.file.old_path() == path)
                        })
                    })
                    .cloned()
                    .collect();
                (on_copied_file, layer)
            })
            .collect();

        let mut ported = self.transformer.transform(entities, &first);
        for (on_copied_file, layer) in copies {
            ported.extend(self.transformer.transform(on_copied_file, &layer));
        }
        ported
    }
}

/// Split mappings so that each layer names every old path at most once.
///
/// Deleted mappings only survive for paths without any live counterpart.
fn copy_layers(mappings: Vec<Mapping>) -> Vec<Vec<Mapping>> {
    let mut per_old_path: BTreeMap<String, Vec<Mapping>> = BTreeMap::new();
    for mapping in mappings {
        per_old_path
            .entry(mapping.file.old_path().to_string())
            .or_default()
            .push(mapping);
    }

    let mut layers: Vec<Vec<Mapping>> = Vec::new();
    for mut targets in per_old_path.into_values() {
        if targets.iter().any(|m| m.file.new_path().is_some()) {
            targets.retain(|m| m.file.new_path().is_some());
        }
        for (depth, mapping) in targets.into_iter().enumerate() {
            if layers.len() <= depth {
                layers.push(Vec::new());
            }
            layers[depth].push(mapping);
        }
    }
    layers
}
