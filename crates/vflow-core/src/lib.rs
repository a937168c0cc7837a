#![forbid(unsafe_code)]

//! Core: index ranges, window computation, and list-change coalescing.
//!
//! This crate holds the geometry-free building blocks of the viewport engine:
//!
//! - [`range::IndexRange`] - inclusive index interval with an invalid sentinel
//! - [`shape::IndexShape`] - flat vs row-major grid indexing
//! - [`window::WindowCalculator`] - which indices need live cells
//! - [`change::ChangeRecord`] - normalized list mutations
//! - [`coalescer::ChangeCoalescer`] - folds raw list events into change sets

pub mod change;
pub mod coalescer;
pub mod logging;
pub mod range;
pub mod shape;
pub mod window;

pub use change::{ChangeRecord, ChangeSet, ChangeStep, ListEvent};
pub use coalescer::ChangeCoalescer;
pub use range::IndexRange;
pub use shape::{Flat, Grid, IndexShape};
pub use window::{
    BufferSize, Geometry, HiddenCellPolicy, Orientation, Visibility, Window, WindowCalculator,
    WindowMode,
};

// Re-export tracing macros at crate root for ergonomic use.
#[cfg(feature = "tracing")]
pub use logging::{
    debug, debug_span, error, error_span, info, info_span, trace, trace_span, warn, warn_span,
};
