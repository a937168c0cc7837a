#![forbid(unsafe_code)]

//! Viewport state reconciliation for virtualized lists and grids.
//!
//! A viewport keeps live cells only for a bounded window of a large list
//! and recycles them as the window scrolls or the list changes. The pieces:
//!
//! - [`Reconciler`] - old state + window (+ change set) into a new state,
//!   reusing as many cells as possible
//! - [`CellPool`] - bounded FIFO of released cells
//! - [`PositionComputer`] - line offsets for a reconciled state
//! - [`StateStore`] - the published state and its layout cache
//! - [`Viewport`] - the facade wiring all of the above to an [`ItemSource`]
//!
//! Window computation and change coalescing live in `vflow-core` and are
//! re-exported here.
//!
//! # Feature flags
//!
//! - `tracing`: spans around every transition and counts of reused,
//!   created and released cells.

pub mod cell;
pub mod config;
pub mod error;
pub mod plan;
pub mod pool;
pub mod positions;
pub mod reconcile;
pub mod source;
pub mod state;
pub mod store;
pub mod viewport;

pub use cell::{Cell, CellFactory, FnFactory, ItemSource};
pub use config::{HiddenCellPolicy, ViewportConfig, ViewportConfigParse};
pub use error::{InvariantViolation, Result, ViewportError};
pub use plan::{Disposition, Placement, Plan, PlanStats, Slot, SlotFlags};
pub use pool::CellPool;
pub use positions::{PositionComputer, Positions};
pub use reconcile::{ItemOf, Reconciler};
pub use source::ObservableVec;
pub use state::{UpdateKind, ViewportState};
pub use store::StateStore;
pub use viewport::Viewport;

pub use vflow_core::{
    BufferSize, ChangeCoalescer, ChangeRecord, ChangeSet, Flat, Geometry, Grid, IndexRange,
    IndexShape, ListEvent, Orientation, Window, WindowCalculator, WindowMode,
};
