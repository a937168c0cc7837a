#![forbid(unsafe_code)]

//! Holder of the published state and its layout cache.

use vflow_core::IndexRange;

use crate::error::Result;
use crate::positions::Positions;
use crate::state::ViewportState;

/// The current [`ViewportState`], the last laid-out range, and the cached
/// [`Positions`].
#[derive(Debug)]
pub struct StateStore<C> {
    state: ViewportState<C>,
    last_range: IndexRange,
    positions: Option<Positions>,
}

impl<C> StateStore<C> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: ViewportState::empty(),
            last_range: IndexRange::INVALID,
            positions: None,
        }
    }

    #[must_use]
    pub fn state(&self) -> &ViewportState<C> {
        &self.state
    }

    pub(crate) fn state_mut(&mut self) -> &mut ViewportState<C> {
        &mut self.state
    }

    #[must_use]
    pub fn positions(&self) -> Option<&Positions> {
        self.positions.as_ref()
    }

    /// Move the cached positions out, e.g. to seed the next layout pass.
    pub(crate) fn take_positions(&mut self) -> Option<Positions> {
        self.positions.take()
    }

    /// Range of the last layout pass.
    #[must_use]
    pub fn last_range(&self) -> IndexRange {
        self.last_range
    }

    /// Run `transition` against the current state and publish its result.
    ///
    /// Returns the new state and whether cells were acquired or released.
    /// On error the current state is kept.
    pub fn apply<F>(&mut self, transition: F) -> Result<(&ViewportState<C>, bool)>
    where
        F: FnOnce(&mut ViewportState<C>) -> Result<ViewportState<C>>,
    {
        let next = transition(&mut self.state)?;
        let changed = next.cells_changed();
        self.state = next;
        Ok((&self.state, changed))
    }

    /// Whether `range` differs from the last laid-out range.
    #[must_use]
    pub fn needs_layout(&self, range: IndexRange) -> bool {
        range != self.last_range
    }

    /// Record a layout pass.
    pub fn mark_laid_out(&mut self, positions: Positions) {
        self.last_range = positions.range();
        self.positions = Some(positions);
    }

    /// Hand every cell to `sink` and reset to the empty state.
    pub fn clear<S>(&mut self, mut sink: S)
    where
        S: FnMut(usize, C),
    {
        for (index, cell) in self.state.take_cells() {
            sink(index, cell);
        }
        self.last_range = IndexRange::INVALID;
        self.positions = None;
    }
}

impl<C> Default for StateStore<C> {
    fn default() -> Self {
        Self::new()
    }
}
