#![forbid(unsafe_code)]

//! Collaborator traits: cells, the factory that makes them, and the item
//! source they display.

use std::fmt;
use std::marker::PhantomData;

use vflow_core::ListEvent;

/// A recyclable render unit bound to one index and one item at a time.
///
/// Cells are moved between slots, never cloned, so a cell can only ever be
/// in one place.
pub trait Cell {
    type Item;

    /// The cell now displays the item at `index`.
    fn set_index(&mut self, index: usize);

    /// The cell now displays `item`.
    fn set_item(&mut self, item: Self::Item);

    /// Called once when the cell leaves the engine for good.
    fn dispose(&mut self) {}

    /// Show or hide the cell without disposing it.
    fn set_visible(&mut self, _visible: bool) {}
}

/// Creates cells and tears them down.
pub trait CellFactory {
    type Cell: Cell;

    /// Create a cell showing `item`, or `None` if no cell can be made.
    fn create(&mut self, item: <Self::Cell as Cell>::Item) -> Option<Self::Cell>;

    /// Dispose a cell that is not going back to the pool.
    fn teardown(&mut self, mut cell: Self::Cell) {
        cell.dispose();
    }
}

/// [`CellFactory`] backed by a closure.
pub struct FnFactory<C, F> {
    create: F,
    _cell: PhantomData<fn() -> C>,
}

impl<C, F> FnFactory<C, F>
where
    C: Cell,
    F: FnMut(C::Item) -> Option<C>,
{
    #[must_use]
    pub fn new(create: F) -> Self {
        Self {
            create,
            _cell: PhantomData,
        }
    }
}

impl<C, F> CellFactory for FnFactory<C, F>
where
    C: Cell,
    F: FnMut(C::Item) -> Option<C>,
{
    type Cell = C;

    fn create(&mut self, item: C::Item) -> Option<C> {
        (self.create)(item)
    }
}

impl<C, F> fmt::Debug for FnFactory<C, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnFactory").finish_non_exhaustive()
    }
}

/// The backing list.
pub trait ItemSource {
    type Item;

    fn len(&self) -> usize;

    /// Item at `index`, or `None` past the end.
    fn get(&self, index: usize) -> Option<Self::Item>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Mutation events recorded since the last call.
    fn drain_events(&mut self) -> Vec<ListEvent> {
        Vec::new()
    }
}

impl<T: Clone> ItemSource for Vec<T> {
    type Item = T;

    fn len(&self) -> usize {
        Vec::len(self)
    }

    fn get(&self, index: usize) -> Option<T> {
        self.as_slice().get(index).cloned()
    }
}
