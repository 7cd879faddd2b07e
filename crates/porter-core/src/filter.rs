//! Filters deciding which comments take part in porting.
//!
//! Filters see the whole list at once, since some of them (thread state)
//! depend on other comments than the one being judged.

use std::collections::{HashMap, HashSet};

use crate::comment::{Comment, PortableComment};

/// A step of the filter chain.
pub trait CommentFilter<T> {
    fn filter(&self, comments: Vec<T>) -> Vec<T>;
}

/// Keeps comments written on a revision strictly before the target.
#[derive(Debug, Clone, Copy)]
pub struct EarlierRevisionFilter {
    target: u32,
}

impl EarlierRevisionFilter {
    #[must_use]
    pub const fn new(target: u32) -> Self {
        Self { target }
    }
}

impl<T: PortableComment> CommentFilter<T> for EarlierRevisionFilter {
    fn filter(&self, mut comments: Vec<T>) -> Vec<T> {
        comments.retain(|c| c.comment().revision < self.target);
        comments
    }
}

/// Keeps comments belonging to unresolved threads.
///
/// A thread is the set of comments sharing a root through `in_reply_to`. Its
/// state is the `unresolved` flag of its most recently written comment.
/// Replies whose parent is missing from the list start their own thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnresolvedThreadFilter;

impl<T: PortableComment> CommentFilter<T> for UnresolvedThreadFilter {
    fn filter(&self, comments: Vec<T>) -> Vec<T> {
        let roots: Vec<String> = {
            let by_id: HashMap<&str, &Comment> = comments
                .iter()
                .map(|c| (c.comment().id.as_str(), c.comment()))
                .collect();
            comments
                .iter()
                .map(|c| thread_root(c.comment(), &by_id).to_string())
                .collect()
        };

        let mut latest_per_root: HashMap<&str, &Comment> = HashMap::new();
        for (c, root) in comments.iter().zip(&roots) {
            let c = c.comment();
            latest_per_root
                .entry(root.as_str())
                .and_modify(|latest| {
                    if c.written_on >= latest.written_on {
                        *latest = c;
                    }
                })
                .or_insert(c);
        }
        let unresolved_roots: HashSet<String> = latest_per_root
            .into_iter()
            .filter(|(_, latest)| latest.unresolved)
            .map(|(root, _)| root.to_string())
            .collect();

        comments
            .into_iter()
            .zip(roots)
            .filter(|(_, root)| unresolved_roots.contains(root))
            .map(|(c, _)| c)
            .collect()
    }
}

fn thread_root<'a>(comment: &'a Comment, by_id: &HashMap<&'a str, &'a Comment>) -> &'a str {
    let mut current = comment;
    // Bounded so that reply cycles terminate.
    for _ in 0..by_id.len() {
        match current
            .in_reply_to
            .as_deref()
            .and_then(|parent| by_id.get(parent).copied())
        {
            Some(parent) => current = parent,
            None => break,
        }
    }
    current.id.as_str()
}

/// Adapts a per-comment predicate into a filter.
pub struct PredicateFilter<F> {
    predicate: F,
}

impl<F> PredicateFilter<F> {
    pub const fn new(predicate: F) -> Self {
        Self { predicate }
    }
}

impl<T, F: Fn(&T) -> bool> CommentFilter<T> for PredicateFilter<F> {
    fn filter(&self, mut comments: Vec<T>) -> Vec<T> {
        comments.retain(|c| (self.predicate)(c));
        comments
    }
}

/// The mandatory earlier-revision filter followed by caller filters, in order.
pub struct FilterChain<'a, T> {
    earlier: EarlierRevisionFilter,
    extra: Vec<&'a dyn CommentFilter<T>>,
}

impl<'a, T: PortableComment> FilterChain<'a, T> {
    #[must_use]
    pub fn new(target_revision: u32) -> Self {
        Self {
            earlier: EarlierRevisionFilter::new(target_revision),
            extra: Vec::new(),
        }
    }

    #[must_use]
    pub fn then(mut self, filter: &'a dyn CommentFilter<T>) -> Self {
        self.extra.push(filter);
        self
    }

    #[must_use]
    pub fn apply(&self, comments: Vec<T>) -> Vec<T> {
        let comments = self.earlier.filter(comments);
        self.extra
            .iter()
            .fold(comments, |comments, filter| filter.filter(comments))
    }
}
