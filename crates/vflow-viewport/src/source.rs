#![forbid(unsafe_code)]

//! A vector that records its own mutations.
//!
//! [`ObservableVec`] wraps a `Vec<T>` and logs a [`ListEvent`] for every
//! mutation, in the sequential form the coalescer expects. A viewport built
//! over it picks the events up through [`ItemSource::drain_events`].

use std::cmp::Ordering;
use std::ops::Range;

use vflow_core::ListEvent;

use crate::cell::ItemSource;

/// A `Vec<T>` that records mutation events.
#[derive(Debug, Clone, Default)]
pub struct ObservableVec<T> {
    items: Vec<T>,
    events: Vec<ListEvent>,
}

impl<T> ObservableVec<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            events: Vec::new(),
        }
    }

    /// Wrap existing items without recording an event.
    #[must_use]
    pub fn from_vec(items: Vec<T>) -> Self {
        Self {
            items,
            events: Vec::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    /// Events recorded and not yet drained.
    #[must_use]
    pub fn pending_events(&self) -> &[ListEvent] {
        &self.events
    }

    pub fn push(&mut self, item: T) {
        let at = self.items.len();
        self.items.push(item);
        self.events.push(ListEvent::Added { at, count: 1 });
    }

    /// Insert `item` at `index` (clamped to the length).
    pub fn insert(&mut self, index: usize, item: T) {
        let at = index.min(self.items.len());
        self.items.insert(at, item);
        self.events.push(ListEvent::Added { at, count: 1 });
    }

    /// Insert several items starting at `index` (clamped to the length).
    pub fn insert_many<I: IntoIterator<Item = T>>(&mut self, index: usize, items: I) {
        let at = index.min(self.items.len());
        let before = self.items.len();
        self.items.splice(at..at, items);
        let count = self.items.len() - before;
        if count > 0 {
            self.events.push(ListEvent::Added { at, count });
        }
    }

    pub fn remove(&mut self, index: usize) -> Option<T> {
        if index >= self.items.len() {
            return None;
        }
        let item = self.items.remove(index);
        self.events.push(ListEvent::Removed { at: index, count: 1 });
        Some(item)
    }

    /// Remove `range` (clamped to the length) and return the removed items.
    pub fn remove_range(&mut self, range: Range<usize>) -> Vec<T> {
        let end = range.end.min(self.items.len());
        let start = range.start.min(end);
        let removed: Vec<T> = self.items.drain(start..end).collect();
        if !removed.is_empty() {
            self.events.push(ListEvent::Removed {
                at: start,
                count: removed.len(),
            });
        }
        removed
    }

    /// Replace the item at `index`, returning the old one.
    pub fn set(&mut self, index: usize, item: T) -> Option<T> {
        let slot = self.items.get_mut(index)?;
        let old = std::mem::replace(slot, item);
        self.events.push(ListEvent::Updated {
            from: index,
            to: index + 1,
        });
        Some(old)
    }

    pub fn swap(&mut self, a: usize, b: usize) {
        let len = self.items.len();
        if a == b || a >= len || b >= len {
            return;
        }
        self.items.swap(a, b);
        let (from, to) = (a.min(b), a.max(b) + 1);
        let permutation = (from..to)
            .map(|i| match i {
                i if i == a => b,
                i if i == b => a,
                i => i,
            })
            .collect();
        self.events.push(ListEvent::Permuted {
            from,
            to,
            permutation,
        });
    }

    /// Stable sort, recorded as one permutation of the whole list.
    pub fn sort_by<F>(&mut self, mut compare: F)
    where
        F: FnMut(&T, &T) -> Ordering,
    {
        let len = self.items.len();
        let mut order: Vec<usize> = (0..len).collect();
        order.sort_by(|&a, &b| compare(&self.items[a], &self.items[b]));

        let mut permutation = vec![0; len];
        for (new_index, &old_index) in order.iter().enumerate() {
            permutation[old_index] = new_index;
        }

        let mut slots: Vec<Option<T>> = std::mem::take(&mut self.items)
            .into_iter()
            .map(Some)
            .collect();
        self.items = order
            .iter()
            .filter_map(|&old_index| slots[old_index].take())
            .collect();
        self.events.push(ListEvent::Permuted {
            from: 0,
            to: len,
            permutation,
        });
    }

    /// Replace the whole content.
    pub fn replace_all<I: IntoIterator<Item = T>>(&mut self, items: I) {
        self.items = items.into_iter().collect();
        self.events.push(ListEvent::Reset {
            len: self.items.len(),
        });
    }

    pub fn clear(&mut self) {
        let count = self.items.len();
        self.items.clear();
        if count > 0 {
            self.events.push(ListEvent::Removed { at: 0, count });
        }
    }
}

impl<T: Clone> ItemSource for ObservableVec<T> {
    type Item = T;

    fn len(&self) -> usize {
        self.items.len()
    }

    fn get(&self, index: usize) -> Option<T> {
        self.items.as_slice().get(index).cloned()
    }

    fn drain_events(&mut self) -> Vec<ListEvent> {
        std::mem::take(&mut self.events)
    }
}

impl<T> From<Vec<T>> for ObservableVec<T> {
    fn from(items: Vec<T>) -> Self {
        Self::from_vec(items)
    }
}

impl<T> FromIterator<T> for ObservableVec<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from_vec(iter.into_iter().collect())
    }
}
