#![forbid(unsafe_code)]

//! Error types.
//!
//! [`ViewportError`] is returned to callers. [`InvariantViolation`] describes
//! an internal bookkeeping bug: debug builds panic on it, release builds log
//! it and rebuild the viewport from scratch.

use std::fmt;

use vflow_core::IndexRange;

/// Errors surfaced by viewport operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewportError {
    /// The cell factory could not produce a cell for `index`.
    FactoryExhausted { index: usize },
    /// The item source had no item at `index`.
    MissingItem { index: usize, len: usize },
    /// A configuration value was rejected.
    InvalidConfig {
        field: &'static str,
        value: String,
        message: String,
    },
}

impl ViewportError {
    pub(crate) fn invalid_config(
        field: &'static str,
        value: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidConfig {
            field,
            value: value.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ViewportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FactoryExhausted { index } => {
                write!(f, "cell factory produced no cell for index {index}")
            }
            Self::MissingItem { index, len } => {
                write!(f, "no item at index {index} (source length {len})")
            }
            Self::InvalidConfig {
                field,
                value,
                message,
            } => write!(f, "invalid config {field}={value} ({message})"),
        }
    }
}

impl std::error::Error for ViewportError {}

/// A broken cell-assignment invariant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    /// An old cell was assigned to more than one slot.
    DuplicateSlot { old_index: usize },
    /// An old cell received no disposition, or a slot names a cell that
    /// does not exist.
    UnplacedCell { old_index: usize },
    /// An index of the range has no cell.
    MissingSlot { index: usize },
    /// A cell sits outside the range.
    OutOfRange { index: usize, range: IndexRange },
    /// The number of cells does not match the range.
    CountMismatch { expected: usize, actual: usize },
    /// Cells were left behind in the old state.
    OrphanedCells { count: usize },
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateSlot { old_index } => {
                write!(f, "cell from index {old_index} assigned twice")
            }
            Self::UnplacedCell { old_index } => {
                write!(f, "cell from index {old_index} has no disposition")
            }
            Self::MissingSlot { index } => write!(f, "index {index} has no cell"),
            Self::OutOfRange { index, range } => {
                write!(f, "cell at index {index} lies outside {range}")
            }
            Self::CountMismatch { expected, actual } => {
                write!(f, "expected {expected} cells, found {actual}")
            }
            Self::OrphanedCells { count } => write!(f, "{count} cells orphaned in old state"),
        }
    }
}

impl std::error::Error for InvariantViolation {}

/// Result alias for viewport operations.
pub type Result<T> = std::result::Result<T, ViewportError>;
