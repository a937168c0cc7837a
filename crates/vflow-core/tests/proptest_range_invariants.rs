//! Property-based invariant tests for index ranges and change coalescing.
//!
//! 1. Intersection is commutative.
//! 2. Intersection fits within both inputs.
//! 3. Span covers both inputs.
//! 4. Contains agrees with iteration.
//! 5. Length matches iteration count.
//! 6. Coalesced removals equal the model list's removals.
//! 7. Coalesced insert blocks reproduce the model list.

use std::collections::BTreeSet;

use proptest::prelude::*;
use vflow_core::{ChangeCoalescer, ChangeRecord, IndexRange, ListEvent};

// ── Helpers ─────────────────────────────────────────────────────────────

fn range_strategy() -> impl Strategy<Value = IndexRange> {
    prop_oneof![
        1 => Just(IndexRange::INVALID),
        8 => (0usize..200, 0usize..60).prop_map(|(min, len)| IndexRange::of_len(min, len)),
    ]
}

/// Removal events valid against a list that starts with `len` items.
fn removals_strategy(len: usize) -> impl Strategy<Value = Vec<(usize, usize)>> {
    prop::collection::vec((0usize..len.max(1), 1usize..4), 1..8)
}

// ═════════════════════════════════════════════════════════════════════════
// 1. Intersection is commutative
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn intersection_commutative(a in range_strategy(), b in range_strategy()) {
        prop_assert_eq!(a.intersection(&b), b.intersection(&a));
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 2. Intersection fits within both inputs
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn intersection_within_inputs(a in range_strategy(), b in range_strategy()) {
        let i = a.intersection(&b);
        for index in i.iter() {
            prop_assert!(a.contains(index) && b.contains(index));
        }
        prop_assert!(i.len() <= a.len().min(b.len()));
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 3. Span covers both inputs
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn span_covers_inputs(a in range_strategy(), b in range_strategy()) {
        let s = a.span(&b);
        for index in a.iter().chain(b.iter()) {
            prop_assert!(s.contains(index), "{} not in span {} of {} and {}", index, s, a, b);
        }
        prop_assert_eq!(s.is_valid(), a.is_valid() || b.is_valid());
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 4/5. Contains and len agree with iteration
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn contains_agrees_with_iteration(r in range_strategy(), probe in 0usize..300) {
        let set = r.to_set();
        prop_assert_eq!(r.contains(probe), set.contains(&probe));
        prop_assert_eq!(r.len(), set.len());
        prop_assert_eq!(r.iter().count(), r.len());
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 6. Coalesced removals equal the model list's removals
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn coalesced_removals_match_model(len in 1usize..80, raw in removals_strategy(80)) {
        let mut model: Vec<usize> = (0..len).collect();
        let mut coalescer = ChangeCoalescer::new(len);
        for (at, count) in raw {
            if model.is_empty() {
                break;
            }
            let at = at % model.len();
            let count = count.min(model.len() - at);
            model.drain(at..at + count);
            coalescer.push(ListEvent::Removed { at, count });
        }

        let set = coalescer.flush();
        prop_assert_eq!(set.len_after(), model.len());
        let survivors: BTreeSet<usize> = model.iter().copied().collect();
        let expected: Vec<usize> = (0..len).filter(|i| !survivors.contains(i)).collect();
        prop_assert_eq!(set.len(), 1);
        prop_assert_eq!(&set.steps[0].record, &ChangeRecord::Remove { indices: expected });
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 7. Coalesced insert blocks reproduce the model list
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn coalesced_block_inserts_match_model(
        len in 0usize..50,
        start in 0usize..50,
        offsets in prop::collection::vec((0usize..10, 1usize..4), 1..6),
    ) {
        let start = start.min(len);
        let mut block_len = 0usize;
        let mut coalescer = ChangeCoalescer::new(len);
        for (offset, count) in offsets {
            let at = start + offset.min(block_len);
            coalescer.push(ListEvent::Added { at, count });
            block_len += count;
        }

        let set = coalescer.flush();
        prop_assert_eq!(set.len(), 1);
        prop_assert_eq!(
            &set.steps[0].record,
            &ChangeRecord::Insert { from: start, count: block_len }
        );
        prop_assert_eq!(set.len_after(), len + block_len);
    }
}
