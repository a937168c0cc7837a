#![forbid(unsafe_code)]

//! List mutation vocabulary.
//!
//! [`ListEvent`]s are the raw notifications an item source emits, one per
//! edit, each expressed against the list as it exists after the previous
//! event. The [`ChangeCoalescer`](crate::ChangeCoalescer) folds a batch of
//! them into a [`ChangeSet`]: an ordered list of normalized
//! [`ChangeRecord`]s the reconciler understands.

use std::collections::{BTreeMap, BTreeSet};

/// A raw list mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListEvent {
    /// `count` items inserted starting at `at`.
    Added { at: usize, count: usize },
    /// `count` items removed starting at `at`.
    Removed { at: usize, count: usize },
    /// `removed` items at `at` replaced by `added` new ones.
    Replaced {
        at: usize,
        removed: usize,
        added: usize,
    },
    /// Items in `[from, to)` replaced in place.
    Updated { from: usize, to: usize },
    /// Items in `[from, to)` reordered; `permutation[i - from]` is the new
    /// index of the item formerly at `i`.
    Permuted {
        from: usize,
        to: usize,
        permutation: Vec<usize>,
    },
    /// The whole list replaced by `len` new items.
    Reset { len: usize },
}

impl ListEvent {
    /// Whether the event changes nothing.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        match self {
            Self::Added { count, .. } | Self::Removed { count, .. } => *count == 0,
            Self::Replaced { removed, added, .. } => *removed == 0 && *added == 0,
            Self::Updated { from, to } => to <= from,
            Self::Permuted {
                from,
                to,
                permutation,
            } => {
                to <= from
                    || permutation
                        .iter()
                        .enumerate()
                        .all(|(i, &target)| target == from + i)
            }
            Self::Reset { .. } => false,
        }
    }

    /// List length after applying this event to a list of `len` items.
    #[must_use]
    pub fn len_after(&self, len: usize) -> usize {
        match self {
            Self::Added { count, .. } => len + count,
            Self::Removed { count, .. } => len.saturating_sub(*count),
            Self::Replaced { removed, added, .. } => len.saturating_sub(*removed) + added,
            Self::Updated { .. } | Self::Permuted { .. } => len,
            Self::Reset { len } => *len,
        }
    }

    /// Short name used in logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Added { .. } => "added",
            Self::Removed { .. } => "removed",
            Self::Replaced { .. } => "replaced",
            Self::Updated { .. } => "updated",
            Self::Permuted { .. } => "permuted",
            Self::Reset { .. } => "reset",
        }
    }
}

/// A normalized change the reconciler can apply in one step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeRecord {
    /// Items reordered; maps old index to new index for every moved item.
    Permutation(BTreeMap<usize, usize>),
    /// Items replaced in place; `changed` lists every touched index and
    /// `[from, from + count)` is its span.
    Replace {
        from: usize,
        count: usize,
        changed: BTreeSet<usize>,
    },
    /// `count` items inserted at `from`.
    Insert { from: usize, count: usize },
    /// Items removed; indices refer to the list before the removal, sorted
    /// ascending and unique.
    Remove { indices: Vec<usize> },
}

impl ChangeRecord {
    /// Build a removal record from arbitrary indices.
    #[must_use]
    pub fn remove<I: IntoIterator<Item = usize>>(indices: I) -> Self {
        let set: BTreeSet<usize> = indices.into_iter().collect();
        Self::Remove {
            indices: set.into_iter().collect(),
        }
    }

    /// Build a replace record from touched indices.
    #[must_use]
    pub fn replace<I: IntoIterator<Item = usize>>(changed: I) -> Self {
        let changed: BTreeSet<usize> = changed.into_iter().collect();
        let from = changed.first().copied().unwrap_or(0);
        let count = changed.last().map_or(0, |last| last - from + 1);
        Self::Replace {
            from,
            count,
            changed,
        }
    }

    /// Lowest index this record touches.
    #[must_use]
    pub fn first_index(&self) -> Option<usize> {
        match self {
            Self::Permutation(map) => map.keys().next().copied(),
            Self::Replace { changed, .. } => changed.first().copied(),
            Self::Insert { from, count } => (*count > 0).then_some(*from),
            Self::Remove { indices } => indices.first().copied(),
        }
    }

    /// Short name used in logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Permutation(_) => "permutation",
            Self::Replace { .. } => "replace",
            Self::Insert { .. } => "insert",
            Self::Remove { .. } => "remove",
        }
    }
}

/// A record paired with the list length once it has been applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeStep {
    pub record: ChangeRecord,
    pub len_after: usize,
}

/// The normalized result of one batch of raw events.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    pub steps: Vec<ChangeStep>,
    /// List length before the batch.
    pub len_before: usize,
    /// Raw events folded into the set (no-ops included).
    pub raw_events: usize,
}

impl ChangeSet {
    /// A set holding a single record.
    #[must_use]
    pub fn single(record: ChangeRecord, len_before: usize, len_after: usize) -> Self {
        Self {
            steps: vec![ChangeStep { record, len_after }],
            len_before,
            raw_events: 1,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// List length after the whole batch.
    #[must_use]
    pub fn len_after(&self) -> usize {
        self.steps.last().map_or(self.len_before, |s| s.len_after)
    }

    /// Iterate the records in application order.
    pub fn records(&self) -> impl Iterator<Item = &ChangeRecord> {
        self.steps.iter().map(|s| &s.record)
    }

    /// Append a set that starts where this one ends.
    pub fn append(&mut self, later: ChangeSet) {
        debug_assert_eq!(later.len_before, self.len_after());
        self.steps.extend(later.steps);
        self.raw_events += later.raw_events;
    }
}
