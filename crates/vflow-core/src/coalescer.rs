#![forbid(unsafe_code)]

//! Coalescing of raw list mutations into normalized change sets.
//!
//! Item sources report edits one at a time. Rebuilding the viewport after
//! each edit costs O(window) per edit, so edits are batched: the caller
//! pushes every [`ListEvent`] of a batch and calls [`ChangeCoalescer::flush`]
//! once, receiving a [`ChangeSet`] the reconciler applies in a single pass.
//!
//! # Normalization
//!
//! A batch made of one kind of edit collapses into one record:
//!
//! | Batch | Record |
//! |-------|--------|
//! | only permutations | one [`ChangeRecord::Permutation`] with the composed map |
//! | only in-place updates / equal-size replacements | one [`ChangeRecord::Replace`] |
//! | only additions forming one contiguous block | one [`ChangeRecord::Insert`] |
//! | only removals | one [`ChangeRecord::Remove`] with pre-batch indices |
//!
//! Any other batch becomes the sequence of atomic records, one or two per
//! event, each tagged with the list length after it.
//!
//! # Usage
//!
//! ```
//! use vflow_core::{ChangeCoalescer, ChangeRecord, ListEvent};
//!
//! let mut coalescer = ChangeCoalescer::new(100);
//! coalescer.push(ListEvent::Removed { at: 6, count: 1 });
//! // Index 6 now holds what used to be item 7.
//! coalescer.push(ListEvent::Removed { at: 6, count: 1 });
//!
//! let set = coalescer.flush();
//! assert_eq!(set.len(), 1);
//! assert_eq!(set.steps[0].record, ChangeRecord::Remove { indices: vec![6, 7] });
//! assert_eq!(set.len_after(), 98);
//! ```

use std::collections::{BTreeMap, BTreeSet};

use crate::change::{ChangeRecord, ChangeSet, ChangeStep, ListEvent};

/// Folds a batch of [`ListEvent`]s into a [`ChangeSet`].
///
/// Events are clamped against the tracked list length as they arrive, so a
/// stale or out-of-range notification never produces indices past the end
/// of the list.
#[derive(Debug, Clone, Default)]
pub struct ChangeCoalescer {
    /// List length when the pending batch started.
    len_before: usize,
    /// List length after the last pushed event.
    len_current: usize,
    pending: Vec<ListEvent>,
    raw_events: usize,
}

/// Which single-kind rule a batch qualifies for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BatchKind {
    Permutations,
    InPlace,
    Additions,
    Removals,
    Mixed,
}

impl ChangeCoalescer {
    /// Create a coalescer for a list currently holding `len_before` items.
    #[must_use]
    pub fn new(len_before: usize) -> Self {
        Self {
            len_before,
            len_current: len_before,
            pending: Vec::new(),
            raw_events: 0,
        }
    }

    /// Push one raw event.
    ///
    /// The event must be expressed against the list as it is after every
    /// previously pushed event. No-op events are counted but dropped.
    pub fn push(&mut self, event: ListEvent) {
        self.raw_events += 1;
        let event = clamp_event(event, self.len_current);
        if event.is_noop() {
            crate::trace!(kind = event.kind(), "dropping no-op list event");
            return;
        }
        self.len_current = event.len_after(self.len_current);
        self.pending.push(event);
    }

    /// Push every event of an iterator.
    pub fn extend<I: IntoIterator<Item = ListEvent>>(&mut self, events: I) {
        for event in events {
            self.push(event);
        }
    }

    /// Whether any effective event is waiting.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Number of effective events waiting.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// List length after the pending events.
    #[must_use]
    pub fn current_len(&self) -> usize {
        self.len_current
    }

    /// Normalize the pending batch and start a new one.
    ///
    /// The next batch starts from the length this batch ends with.
    #[must_use]
    pub fn flush(&mut self) -> ChangeSet {
        let events = std::mem::take(&mut self.pending);
        let raw_events = std::mem::take(&mut self.raw_events);
        let len_before = self.len_before;
        let len_after = self.len_current;
        self.len_before = len_after;

        let steps = if events.is_empty() {
            Vec::new()
        } else {
            match classify(&events) {
                BatchKind::Permutations => {
                    compose_permutations(&events).map_or_else(Vec::new, |map| {
                        vec![ChangeStep {
                            record: ChangeRecord::Permutation(map),
                            len_after,
                        }]
                    })
                }
                BatchKind::InPlace => vec![ChangeStep {
                    record: ChangeRecord::replace(in_place_indices(&events)),
                    len_after,
                }],
                BatchKind::Additions => match contiguous_block(&events) {
                    Some((from, count)) => vec![ChangeStep {
                        record: ChangeRecord::Insert { from, count },
                        len_after,
                    }],
                    None => atomic_steps(&events, len_before),
                },
                BatchKind::Removals => vec![ChangeStep {
                    record: ChangeRecord::Remove {
                        indices: pre_batch_removals(&events),
                    },
                    len_after,
                }],
                BatchKind::Mixed => atomic_steps(&events, len_before),
            }
        };

        crate::debug!(
            raw_events,
            steps = steps.len(),
            len_before,
            len_after,
            "coalesced list events"
        );

        ChangeSet {
            steps,
            len_before,
            raw_events,
        }
    }

    /// Drop the pending batch and resynchronize with a list of `len` items.
    pub fn clear(&mut self, len: usize) {
        self.pending.clear();
        self.raw_events = 0;
        self.len_before = len;
        self.len_current = len;
    }
}

fn clamp_event(event: ListEvent, len: usize) -> ListEvent {
    match event {
        ListEvent::Added { at, count } => ListEvent::Added {
            at: at.min(len),
            count,
        },
        ListEvent::Removed { at, count } => ListEvent::Removed {
            at,
            count: count.min(len.saturating_sub(at)),
        },
        ListEvent::Replaced { at, removed, added } => {
            let at = at.min(len);
            ListEvent::Replaced {
                at,
                removed: removed.min(len - at),
                added,
            }
        }
        ListEvent::Updated { from, to } => ListEvent::Updated {
            from,
            to: to.min(len),
        },
        ListEvent::Permuted {
            from,
            to,
            permutation,
        } => {
            if is_permutation_of(from, to, &permutation) && to <= len {
                ListEvent::Permuted {
                    from,
                    to,
                    permutation,
                }
            } else {
                // A malformed reorder still means the items in the span changed.
                ListEvent::Updated {
                    from,
                    to: to.min(len),
                }
            }
        }
        reset @ ListEvent::Reset { .. } => reset,
    }
}

fn is_permutation_of(from: usize, to: usize, permutation: &[usize]) -> bool {
    if to < from || permutation.len() != to - from {
        return false;
    }
    let mut seen = vec![false; permutation.len()];
    for &target in permutation {
        if target < from || target >= to || seen[target - from] {
            return false;
        }
        seen[target - from] = true;
    }
    true
}

fn classify(events: &[ListEvent]) -> BatchKind {
    let kind_of = |event: &ListEvent| match event {
        ListEvent::Permuted { .. } => BatchKind::Permutations,
        ListEvent::Updated { .. } => BatchKind::InPlace,
        ListEvent::Replaced { removed, added, .. } if removed == added => BatchKind::InPlace,
        ListEvent::Added { .. } => BatchKind::Additions,
        ListEvent::Removed { .. } => BatchKind::Removals,
        ListEvent::Replaced { .. } | ListEvent::Reset { .. } => BatchKind::Mixed,
    };
    let first = kind_of(&events[0]);
    if events[1..].iter().all(|e| kind_of(e) == first) {
        first
    } else {
        BatchKind::Mixed
    }
}

/// Compose a run of permutations into one old-index to new-index map.
///
/// Returns `None` when the composition is the identity.
fn compose_permutations(events: &[ListEvent]) -> Option<BTreeMap<usize, usize>> {
    // current index -> pre-batch index, for items that moved
    let mut origin: BTreeMap<usize, usize> = BTreeMap::new();
    for event in events {
        let ListEvent::Permuted {
            from, permutation, ..
        } = event
        else {
            continue;
        };
        let moved: Vec<(usize, usize)> = permutation
            .iter()
            .enumerate()
            .map(|(offset, &target)| {
                let current = from + offset;
                let source = origin.get(&current).copied().unwrap_or(current);
                (target, source)
            })
            .collect();
        for (target, source) in moved {
            if target == source {
                origin.remove(&target);
            } else {
                origin.insert(target, source);
            }
        }
    }
    let map: BTreeMap<usize, usize> = origin
        .into_iter()
        .map(|(current, source)| (source, current))
        .collect();
    (!map.is_empty()).then_some(map)
}

fn in_place_indices(events: &[ListEvent]) -> BTreeSet<usize> {
    let mut changed = BTreeSet::new();
    for event in events {
        match *event {
            ListEvent::Updated { from, to } => changed.extend(from..to),
            ListEvent::Replaced { at, removed, .. } => changed.extend(at..at + removed),
            _ => {}
        }
    }
    changed
}

/// Block `(from, count)` covered by a run of additions, if contiguous.
fn contiguous_block(events: &[ListEvent]) -> Option<(usize, usize)> {
    let mut block: Option<(usize, usize)> = None;
    for event in events {
        let ListEvent::Added { at, count } = *event else {
            return None;
        };
        block = match block {
            None => Some((at, count)),
            // Inserting inside or at either edge of the block keeps it whole.
            Some((from, len)) if at >= from && at <= from + len => Some((from, len + count)),
            Some(_) => return None,
        };
    }
    block
}

/// Translate a run of removals back to indices of the pre-batch list.
fn pre_batch_removals(events: &[ListEvent]) -> Vec<usize> {
    let mut removed: BTreeSet<usize> = BTreeSet::new();
    for event in events {
        let ListEvent::Removed { at, count } = *event else {
            continue;
        };
        let originals: Vec<usize> = (at..at + count)
            .map(|current| original_index(&removed, current))
            .collect();
        removed.extend(originals);
    }
    removed.into_iter().collect()
}

/// Pre-batch index of the item now at `current`, given the pre-batch
/// indices already removed.
fn original_index(removed: &BTreeSet<usize>, current: usize) -> usize {
    let mut index = current;
    for &gone in removed {
        if gone <= index {
            index += 1;
        } else {
            break;
        }
    }
    index
}

fn atomic_steps(events: &[ListEvent], len_before: usize) -> Vec<ChangeStep> {
    let mut steps = Vec::with_capacity(events.len());
    let mut len = len_before;
    let emit = |record: ChangeRecord, len_after: usize, steps: &mut Vec<ChangeStep>| {
        steps.push(ChangeStep { record, len_after });
    };

    for event in events {
        match event {
            ListEvent::Added { at, count } => {
                len += count;
                emit(ChangeRecord::Insert { from: *at, count: *count }, len, &mut steps);
            }
            ListEvent::Removed { at, count } => {
                len -= count;
                emit(ChangeRecord::remove(*at..at + count), len, &mut steps);
            }
            ListEvent::Replaced { at, removed, added } if removed == added => {
                emit(ChangeRecord::replace(*at..at + removed), len, &mut steps);
            }
            ListEvent::Replaced { at, removed, added } => {
                if *removed > 0 {
                    len -= removed;
                    emit(ChangeRecord::remove(*at..at + removed), len, &mut steps);
                }
                if *added > 0 {
                    len += added;
                    emit(ChangeRecord::Insert { from: *at, count: *added }, len, &mut steps);
                }
            }
            ListEvent::Updated { from, to } => {
                emit(ChangeRecord::replace(*from..*to), len, &mut steps);
            }
            ListEvent::Permuted { .. } => {
                if let Some(map) = compose_permutations(std::slice::from_ref(event)) {
                    emit(ChangeRecord::Permutation(map), len, &mut steps);
                }
            }
            ListEvent::Reset { len: new_len } => {
                if len > 0 {
                    emit(ChangeRecord::remove(0..len), 0, &mut steps);
                }
                len = *new_len;
                if len > 0 {
                    emit(ChangeRecord::Insert { from: 0, count: len }, len, &mut steps);
                }
            }
        }
    }
    steps
}
