#![forbid(unsafe_code)]

//! Mapping tables: where every cell goes in the next state.
//!
//! Planning is pure index arithmetic. A [`Layout`] starts from the old
//! state's keys and is transformed step by step (scroll, permutation,
//! replace, insert, remove); each entry maps a new index to a [`Slot`],
//! either an old cell or a cell still to be acquired, plus the
//! [`SlotFlags`] saying what the cell needs at commit time. Old cells that
//! find no place are released. [`Layout::finish`] freezes the table into a
//! [`Plan`], which [`Plan::validate`] checks before anything is touched.
//!
//! Because flags accumulate across steps and items are fetched only once
//! the plan is final, a multi-step change set binds every cell exactly once,
//! to the item at its final index.

use std::collections::{BTreeMap, BTreeSet};

use bitflags::bitflags;
use vflow_core::{IndexRange, Window};

use crate::error::InvariantViolation;

bitflags! {
    /// Commit-time work for one slot.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct SlotFlags: u8 {
        /// The cell moves to a different index.
        const INDEX_CHANGED = 1 << 0;
        /// The cell must be bound to the item at its index.
        const ITEM_STALE    = 1 << 1;
        /// The cell stays alive but is not shown.
        const HIDDEN        = 1 << 2;
    }
}

/// Where the cell of a slot comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    /// The cell currently at this old index.
    Old(usize),
    /// A cell taken from the pool or the factory.
    New,
}

/// One entry of the mapping table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub slot: Slot,
    pub flags: SlotFlags,
}

impl Placement {
    const NEW: Self = Self {
        slot: Slot::New,
        flags: SlotFlags::ITEM_STALE,
    };

    fn old(index: usize) -> Self {
        Self {
            slot: Slot::Old(index),
            flags: SlotFlags::empty(),
        }
    }

    /// The cell will show a different item.
    fn rebound(mut self) -> Self {
        self.flags |= SlotFlags::ITEM_STALE;
        self
    }
}

/// What happens to an old cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Disposition {
    /// Same index, same item.
    Keep,
    /// New index, same item.
    Shift,
    /// New item (and possibly index).
    Rebind,
    /// Alive but hidden.
    Carry,
    /// Returned to the pool or disposed.
    Dispose,
}

/// Counts of what a plan does.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlanStats {
    pub kept: usize,
    pub shifted: usize,
    pub rebound: usize,
    pub carried: usize,
    pub created: usize,
    pub released: usize,
}

impl PlanStats {
    /// Whether cells were acquired or released.
    #[must_use]
    pub fn cells_changed(&self) -> bool {
        self.created > 0 || self.released > 0
    }
}

/// Mapping table under construction.
#[derive(Debug, Clone)]
pub(crate) struct Layout {
    range: IndexRange,
    target_size: usize,
    slots: BTreeMap<usize, Placement>,
    released: Vec<usize>,
}

impl Layout {
    /// Table for the current state: every cell in place.
    pub(crate) fn from_keys<I>(
        range: IndexRange,
        target_size: usize,
        keys: I,
        hidden: &BTreeSet<usize>,
    ) -> Self
    where
        I: IntoIterator<Item = usize>,
    {
        let slots = keys
            .into_iter()
            .map(|key| {
                let mut placement = Placement::old(key);
                placement.flags.set(SlotFlags::HIDDEN, hidden.contains(&key));
                (key, placement)
            })
            .collect();
        Self {
            range,
            target_size,
            slots,
            released: Vec::new(),
        }
    }

    fn release(&mut self, placement: Placement) {
        if let Slot::Old(index) = placement.slot {
            self.released.push(index);
        }
    }

    fn release_all<I: IntoIterator<Item = Placement>>(&mut self, placements: I) {
        for placement in placements {
            self.release(placement);
        }
    }

    /// Shown slots cover the whole target.
    fn is_full(&self) -> bool {
        let shown = self
            .slots
            .values()
            .filter(|p| !p.flags.contains(SlotFlags::HIDDEN))
            .count();
        self.target_size > 0 && shown >= self.target_size
    }

    /// Fill every unfilled index of `range` in ascending order, first from
    /// `spare` (rebound), then with new cells. Leftover spares are released.
    fn fill(
        &mut self,
        mut slots: BTreeMap<usize, Placement>,
        spare: impl IntoIterator<Item = Placement>,
        range: IndexRange,
    ) {
        let mut spare = spare.into_iter();
        for index in range.iter() {
            if slots.contains_key(&index) {
                continue;
            }
            let placement = spare.next().map_or(Placement::NEW, Placement::rebound);
            slots.insert(index, placement);
        }
        self.release_all(spare);
        self.slots = slots;
        self.range = range;
    }

    fn mark_hidden(&mut self, window: &Window) {
        for (&index, placement) in &mut self.slots {
            placement.flags.set(SlotFlags::HIDDEN, window.is_hidden(index));
        }
    }

    /// Move the table to `window`.
    ///
    /// Indices in both ranges keep their cell untouched. The other new
    /// indices take old cells in ascending old-index order; surplus cells
    /// are released and missing ones acquired.
    pub(crate) fn scroll_to(&mut self, window: &Window) {
        let range = window.range;
        let old_count = self.slots.len();
        let released_before = self.released.len();

        let mut old = std::mem::take(&mut self.slots);
        let mut slots = BTreeMap::new();
        for index in range.intersection(&self.range).iter() {
            if let Some(placement) = old.remove(&index) {
                slots.insert(index, placement);
            }
        }
        self.fill(slots, old.into_values(), range);
        self.target_size = window.target_size;
        self.mark_hidden(window);

        debug_assert_eq!(
            self.released.len() - released_before,
            old_count.saturating_sub(range.len()),
            "scroll released an unexpected number of cells"
        );
    }

    /// Every cell keeps its index and is bound to the item now there.
    pub(crate) fn permute(&mut self) {
        for placement in self.slots.values_mut() {
            placement.flags |= SlotFlags::ITEM_STALE;
        }
    }

    /// Items at `changed` were replaced in place.
    pub(crate) fn replace(&mut self, from: usize, changed: &BTreeSet<usize>, window: &Window) {
        if !self.range.is_valid() {
            self.scroll_to(window);
            return;
        }
        if from > self.range.max() {
            return;
        }
        let range = window.range;
        let mut old = std::mem::take(&mut self.slots);
        let mut slots = BTreeMap::new();

        let in_range: Vec<usize> = old.keys().copied().filter(|&k| range.contains(k)).collect();
        for key in in_range {
            if let Some(placement) = old.remove(&key) {
                let placement = if changed.contains(&key) {
                    placement.rebound()
                } else {
                    placement
                };
                slots.insert(key, placement);
            }
        }
        self.fill(slots, old.into_values(), range);
        self.target_size = window.target_size;
        self.mark_hidden(window);
    }

    /// `count` items were inserted at `at`.
    pub(crate) fn insert(&mut self, at: usize, count: usize, window: &Window) {
        if !self.range.is_valid() {
            self.scroll_to(window);
            return;
        }
        if self.is_full() && at > self.range.max() {
            return;
        }
        let range = window.range;
        let mut old = std::mem::take(&mut self.slots);

        // Shown cells at or after the insertion point go first so they keep
        // their items; hidden cells are the last to be placed.
        let keys_where = |hidden: bool| -> Vec<usize> {
            old.iter()
                .filter(|(_, p)| p.flags.contains(SlotFlags::HIDDEN) == hidden)
                .map(|(&k, _)| k)
                .collect()
        };
        let shown = keys_where(false);
        let hidden = keys_where(true);
        let queue = shown
            .iter()
            .copied()
            .filter(|&k| k >= at)
            .chain(shown.iter().copied().filter(|&k| k < at))
            .chain(hidden);

        let mut slots = BTreeMap::new();
        let mut spare = Vec::new();
        for key in queue {
            let Some(placement) = old.remove(&key) else {
                continue;
            };
            if key < at && range.contains(key) {
                slots.insert(key, placement);
            } else if key >= at && range.contains(key + count) {
                slots.insert(key + count, placement);
            } else {
                spare.push(placement);
            }
        }
        self.fill(slots, spare, range);
        self.target_size = window.target_size;
        self.mark_hidden(window);
    }

    /// Items at `indices` (sorted, pre-removal) were removed, leaving
    /// `len_after` items.
    pub(crate) fn remove(&mut self, indices: &[usize], len_after: usize, window: &Window) {
        if !self.range.is_valid() {
            self.scroll_to(window);
            return;
        }
        match indices.first() {
            Some(&first) if first <= self.range.max() => {}
            _ => return,
        }
        let per_line = window.per_line.max(1);
        let lines_needed = window.lines_needed;
        if len_after == 0 || lines_needed == 0 {
            let old = std::mem::take(&mut self.slots);
            self.release_all(old.into_values());
            self.range = IndexRange::INVALID;
            self.target_size = window.target_size;
            return;
        }

        // The window keeps its first line and slides back only when the
        // list got too short to fill it. Pages are fixed.
        let range = if window.paged {
            window.range
        } else {
            let lines = len_after.div_ceil(per_line);
            let first_line = self.range.min() / per_line;
            let last_line = (first_line + lines_needed - 1).min(lines - 1);
            let start_line = (last_line + 1).saturating_sub(lines_needed);
            IndexRange::new(start_line * per_line, (last_line + 1) * per_line - 1)
                .clamp_to_len(len_after)
        };

        let old = std::mem::take(&mut self.slots);
        let mut slots = BTreeMap::new();
        let mut spare = Vec::new();
        for (key, placement) in old {
            if indices.binary_search(&key).is_ok() {
                spare.push(placement);
                continue;
            }
            let shifted = key - indices.partition_point(|&gone| gone <= key);
            if range.contains(shifted) {
                slots.insert(shifted, placement);
            } else {
                spare.push(placement);
            }
        }
        self.fill(slots, spare, range);
        self.target_size = window.target_size;
        self.mark_hidden(window);
    }

    /// Freeze the table. Flags are normalized against the final window.
    pub(crate) fn finish(mut self, window: &Window) -> Plan {
        for (&index, placement) in &mut self.slots {
            if let Slot::Old(old) = placement.slot {
                placement.flags.set(SlotFlags::INDEX_CHANGED, old != index);
            } else {
                placement.flags |= SlotFlags::INDEX_CHANGED | SlotFlags::ITEM_STALE;
            }
            placement.flags.set(SlotFlags::HIDDEN, window.is_hidden(index));
        }
        self.released.sort_unstable();
        Plan {
            range: self.range,
            target_size: self.target_size,
            slots: self.slots,
            released: self.released,
        }
    }
}

/// A finished mapping table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub(crate) range: IndexRange,
    pub(crate) target_size: usize,
    pub(crate) slots: BTreeMap<usize, Placement>,
    pub(crate) released: Vec<usize>,
}

impl Plan {
    /// Release every old cell and acquire a fresh one for each index of
    /// `window`.
    pub(crate) fn rebuild<I: IntoIterator<Item = usize>>(window: &Window, old_keys: I) -> Self {
        let slots = window
            .range
            .iter()
            .map(|index| {
                let mut placement = Placement::NEW;
                placement.flags |= SlotFlags::INDEX_CHANGED;
                placement.flags.set(SlotFlags::HIDDEN, window.is_hidden(index));
                (index, placement)
            })
            .collect();
        Self {
            range: window.range,
            target_size: window.target_size,
            slots,
            released: old_keys.into_iter().collect(),
        }
    }

    #[must_use]
    pub fn range(&self) -> IndexRange {
        self.range
    }

    #[must_use]
    pub fn slots(&self) -> &BTreeMap<usize, Placement> {
        &self.slots
    }

    /// Old indices whose cells are released.
    #[must_use]
    pub fn released(&self) -> &[usize] {
        &self.released
    }

    /// Disposition of every old cell named by the plan.
    #[must_use]
    pub fn dispositions(&self) -> BTreeMap<usize, Disposition> {
        let mut out = BTreeMap::new();
        for placement in self.slots.values() {
            let Slot::Old(old) = placement.slot else {
                continue;
            };
            let flags = placement.flags;
            let disposition = if flags.contains(SlotFlags::HIDDEN) {
                Disposition::Carry
            } else if flags.contains(SlotFlags::ITEM_STALE) {
                Disposition::Rebind
            } else if flags.contains(SlotFlags::INDEX_CHANGED) {
                Disposition::Shift
            } else {
                Disposition::Keep
            };
            out.insert(old, disposition);
        }
        for &old in &self.released {
            out.insert(old, Disposition::Dispose);
        }
        out
    }

    #[must_use]
    pub fn stats(&self) -> PlanStats {
        let mut stats = PlanStats {
            released: self.released.len(),
            ..PlanStats::default()
        };
        for placement in self.slots.values() {
            if placement.slot == Slot::New {
                stats.created += 1;
            }
        }
        for disposition in self.dispositions().values() {
            match disposition {
                Disposition::Keep => stats.kept += 1,
                Disposition::Shift => stats.shifted += 1,
                Disposition::Rebind => stats.rebound += 1,
                Disposition::Carry => stats.carried += 1,
                Disposition::Dispose => {}
            }
        }
        stats
    }

    /// Whether committing the plan would change nothing.
    #[must_use]
    pub fn is_identity(&self, old_range: IndexRange) -> bool {
        self.range == old_range
            && self.released.is_empty()
            && self.slots.iter().all(|(&index, p)| {
                p.slot == Slot::Old(index)
                    && !p.flags.intersects(SlotFlags::INDEX_CHANGED | SlotFlags::ITEM_STALE)
            })
    }

    /// Check the mapping invariants against the old state's keys.
    ///
    /// Every old cell gets exactly one disposition, every index of the
    /// range exactly one slot, and no slot lies outside the range.
    pub fn validate(&self, old_keys: &BTreeSet<usize>) -> Result<(), InvariantViolation> {
        let mut used = BTreeSet::new();
        for (&index, placement) in &self.slots {
            if !self.range.contains(index) {
                return Err(InvariantViolation::OutOfRange {
                    index,
                    range: self.range,
                });
            }
            if let Slot::Old(old) = placement.slot {
                if !old_keys.contains(&old) {
                    return Err(InvariantViolation::UnplacedCell { old_index: old });
                }
                if !used.insert(old) {
                    return Err(InvariantViolation::DuplicateSlot { old_index: old });
                }
            }
        }
        for &old in &self.released {
            if !old_keys.contains(&old) {
                return Err(InvariantViolation::UnplacedCell { old_index: old });
            }
            if !used.insert(old) {
                return Err(InvariantViolation::DuplicateSlot { old_index: old });
            }
        }
        if let Some(&old) = old_keys.iter().find(|k| !used.contains(k)) {
            return Err(InvariantViolation::UnplacedCell { old_index: old });
        }
        if let Some(index) = self.range.iter().find(|i| !self.slots.contains_key(i)) {
            return Err(InvariantViolation::MissingSlot { index });
        }
        if self.slots.len() != self.range.len() {
            return Err(InvariantViolation::CountMismatch {
                expected: self.range.len(),
                actual: self.slots.len(),
            });
        }
        Ok(())
    }
}
