#![forbid(unsafe_code)]

//! Bounded FIFO pool of recyclable cells.
//!
//! Cells released by a transition are parked here instead of being
//! disposed, and the next transition that needs a cell takes one back
//! before asking the factory. The pool never grows past its capacity:
//! [`CellPool::insert`] hands the cell back when full so the caller can
//! dispose it. A capacity of zero disables pooling.

use std::collections::VecDeque;

/// Default capacity: pooling disabled.
pub const DEFAULT_CAPACITY: usize = 0;

/// Keyed FIFO store of spare cells.
#[derive(Debug, Clone)]
pub struct CellPool<C, K = usize> {
    entries: VecDeque<(K, C)>,
    capacity: usize,
}

impl<C, K: PartialEq> CellPool<C, K> {
    /// Create a pool holding at most `capacity` cells.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(256)),
            capacity,
        }
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.capacity
    }

    /// Park `cell` under `key`.
    ///
    /// Returns the cell back if the pool is full.
    #[must_use = "a rejected cell must be disposed"]
    pub fn insert(&mut self, key: K, cell: C) -> Option<C> {
        if self.is_full() {
            return Some(cell);
        }
        self.entries.push_back((key, cell));
        None
    }

    /// Take the oldest cell parked under `key`.
    pub fn take(&mut self, key: &K) -> Option<C> {
        let position = self.entries.iter().position(|(k, _)| k == key)?;
        self.entries.remove(position).map(|(_, cell)| cell)
    }

    /// Take the oldest cell regardless of key.
    pub fn take_any(&mut self) -> Option<C> {
        self.entries.pop_front().map(|(_, cell)| cell)
    }

    /// Remove every cell, oldest first.
    pub fn evict_all(&mut self) -> Vec<C> {
        self.entries.drain(..).map(|(_, cell)| cell).collect()
    }

    /// Change the capacity, returning cells that no longer fit (oldest
    /// first).
    pub fn set_capacity(&mut self, capacity: usize) -> Vec<C> {
        self.capacity = capacity;
        let excess = self.entries.len().saturating_sub(capacity);
        self.entries.drain(..excess).map(|(_, cell)| cell).collect()
    }
}

impl<C, K: PartialEq> Default for CellPool<C, K> {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
