//! Counters describing what porting did to each comment.
//!
//! Metrics are observational only; nothing here influences ported comments.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::codec;
use crate::comment::Comment;

/// Outcome of porting one comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PortCounter {
    /// A file comment lost its file and now sits on the whole change.
    DemotedToChangeLevel,
    /// A line or range comment kept its lines.
    RangePreserved,
    /// A line or range comment lost its lines but kept its file.
    DemotedToFileLevel,
}

impl PortCounter {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DemotedToChangeLevel => "ported_comments/demoted_to_change_level",
            Self::RangePreserved => "ported_comments/range_preserved",
            Self::DemotedToFileLevel => "ported_comments/demoted_to_file_level",
        }
    }
}

/// Receives porting outcome counters.
pub trait MetricsSink: Send + Sync {
    fn increment(&self, counter: PortCounter);
}

/// Classify one (original, ported) pair. First match wins.
///
/// A single line counts as a range. Comments on synthetic files are not
/// classified.
#[must_use]
pub fn classify(original: &Comment, ported: &Comment) -> Option<PortCounter> {
    if original.is_on_magic_path() {
        return None;
    }
    if ported.is_patchset_level() {
        return Some(PortCounter::DemotedToChangeLevel);
    }
    match (has_lines(original), has_lines(ported)) {
        (true, true) => Some(PortCounter::RangePreserved),
        (true, false) => Some(PortCounter::DemotedToFileLevel),
        _ => None,
    }
}

fn has_lines(comment: &Comment) -> bool {
    matches!(codec::decode(comment), Ok(Some(_)))
}

/// Discards every counter.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMetrics;

impl MetricsSink for NoopMetrics {
    fn increment(&self, _counter: PortCounter) {}
}

/// In-process counters, safe to share across threads.
#[derive(Debug, Default)]
pub struct PortMetrics {
    demoted_to_change_level: AtomicU64,
    range_preserved: AtomicU64,
    demoted_to_file_level: AtomicU64,
}

/// Point-in-time copy of [`PortMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub demoted_to_change_level: u64,
    pub range_preserved: u64,
    pub demoted_to_file_level: u64,
}

impl PortMetrics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            demoted_to_change_level: self.demoted_to_change_level.load(Ordering::Relaxed),
            range_preserved: self.range_preserved.load(Ordering::Relaxed),
            demoted_to_file_level: self.demoted_to_file_level.load(Ordering::Relaxed),
        }
    }

    const fn counter(&self, counter: PortCounter) -> &AtomicU64 {
        match counter {
            PortCounter::DemotedToChangeLevel => &self.demoted_to_change_level,
            PortCounter::RangePreserved => &self.range_preserved,
            PortCounter::DemotedToFileLevel => &self.demoted_to_file_level,
        }
    }
}

impl MetricsSink for PortMetrics {
    fn increment(&self, counter: PortCounter) {
        self.counter(counter).fetch_add(1, Ordering::Relaxed);
        tracing::trace!(counter = counter.as_str(), "porting outcome");
    }
}
