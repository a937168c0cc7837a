#![forbid(unsafe_code)]

//! Published viewport state.

use std::collections::{BTreeMap, BTreeSet};

use vflow_core::IndexRange;

use crate::error::InvariantViolation;

/// What produced a state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum UpdateKind {
    #[default]
    Init,
    Scroll,
    Change,
}

impl UpdateKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Scroll => "scroll",
            Self::Change => "change",
        }
    }
}

/// Index-to-cell assignment of a viewport.
///
/// A published state satisfies `cells.keys() ⊆ range`. The empty state has
/// an invalid range and no cells.
#[derive(Debug)]
pub struct ViewportState<C> {
    pub(crate) range: IndexRange,
    pub(crate) cells: BTreeMap<usize, C>,
    pub(crate) target_size: usize,
    pub(crate) kind: UpdateKind,
    pub(crate) cells_changed: bool,
    pub(crate) hidden: BTreeSet<usize>,
}

impl<C> ViewportState<C> {
    /// The empty state.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            range: IndexRange::INVALID,
            cells: BTreeMap::new(),
            target_size: 0,
            kind: UpdateKind::Init,
            cells_changed: false,
            hidden: BTreeSet::new(),
        }
    }

    /// Whether this is the empty state.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.range.is_valid() && self.cells.is_empty()
    }

    #[must_use]
    pub fn range(&self) -> IndexRange {
        self.range
    }

    #[must_use]
    pub fn cells(&self) -> &BTreeMap<usize, C> {
        &self.cells
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&C> {
        self.cells.get(&index)
    }

    /// Number of live cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[must_use]
    pub fn target_size(&self) -> usize {
        self.target_size
    }

    #[must_use]
    pub fn kind(&self) -> UpdateKind {
        self.kind
    }

    /// Whether the transition that produced this state acquired or
    /// released cells.
    #[must_use]
    pub fn cells_changed(&self) -> bool {
        self.cells_changed
    }

    /// Indices whose cells are alive but hidden.
    #[must_use]
    pub fn hidden(&self) -> &BTreeSet<usize> {
        &self.hidden
    }

    #[must_use]
    pub fn any_hidden(&self) -> bool {
        !self.hidden.is_empty()
    }

    /// Cells that are shown.
    #[must_use]
    pub fn visible_len(&self) -> usize {
        self.cells.len().saturating_sub(self.hidden.len())
    }

    /// Whether enough cells are shown to fill the viewport.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.target_size > 0 && self.visible_len() >= self.target_size
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &C)> {
        self.cells.iter().map(|(&index, cell)| (index, cell))
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = (usize, &mut C)> {
        self.cells.iter_mut().map(|(&index, cell)| (index, cell))
    }

    /// Move every cell out, leaving the empty state behind.
    pub(crate) fn take_cells(&mut self) -> BTreeMap<usize, C> {
        let cells = std::mem::take(&mut self.cells);
        *self = Self::empty();
        cells
    }

    /// Check the published-state invariants against a list of `len` items.
    pub fn validate(&self, len: usize) -> Result<(), InvariantViolation> {
        if !self.range.is_valid() {
            return match self.cells.len() {
                0 => Ok(()),
                count => Err(InvariantViolation::OrphanedCells { count }),
            };
        }
        for &index in self.cells.keys() {
            if !self.range.contains(index) || index >= len {
                return Err(InvariantViolation::OutOfRange {
                    index,
                    range: self.range,
                });
            }
        }
        if let Some(index) = self.range.iter().find(|i| !self.cells.contains_key(i)) {
            return Err(InvariantViolation::MissingSlot { index });
        }
        if self.cells.len() != self.range.len() {
            return Err(InvariantViolation::CountMismatch {
                expected: self.range.len(),
                actual: self.cells.len(),
            });
        }
        Ok(())
    }
}

impl<C> Default for ViewportState<C> {
    fn default() -> Self {
        Self::empty()
    }
}
