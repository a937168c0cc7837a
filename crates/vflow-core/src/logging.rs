#![forbid(unsafe_code)]

//! Logging and tracing support for the vflow crates.
//!
//! With the `tracing` feature the usual `tracing` macros are re-exported from
//! the crate root, so downstream crates write `vflow_core::trace!(...)` and
//! never depend on `tracing` directly. Without the feature the same names
//! resolve to no-op macros that expand to nothing; their arguments are not
//! evaluated.
//!
//! Span macros return a guard-producing value in both configurations, so
//! call sites can uniformly write:
//!
//! ```
//! let _span = vflow_core::debug_span!("reconcile", kind = "scroll").entered();
//! ```

/// Target used by every event and span emitted by the engine.
pub const TARGET: &str = "vflow";

#[cfg(feature = "tracing")]
pub use tracing::{
    debug, debug_span, error, error_span, info, info_span, trace, trace_span, warn, warn_span,
};

#[cfg(not(feature = "tracing"))]
mod noop_macros {
    /// No-op `trace!` when tracing is disabled.
    #[macro_export]
    macro_rules! trace {
        ($($arg:tt)*) => {};
    }

    /// No-op `debug!` when tracing is disabled.
    #[macro_export]
    macro_rules! debug {
        ($($arg:tt)*) => {};
    }

    /// No-op `info!` when tracing is disabled.
    #[macro_export]
    macro_rules! info {
        ($($arg:tt)*) => {};
    }

    /// No-op `warn!` when tracing is disabled.
    #[macro_export]
    macro_rules! warn {
        ($($arg:tt)*) => {};
    }

    /// No-op `error!` when tracing is disabled.
    #[macro_export]
    macro_rules! error {
        ($($arg:tt)*) => {};
    }

    /// No-op `trace_span!`; evaluates to a [`NoopSpan`](crate::logging::NoopSpan).
    #[macro_export]
    macro_rules! trace_span {
        ($($arg:tt)*) => {
            $crate::logging::NoopSpan
        };
    }

    /// No-op `debug_span!`; evaluates to a [`NoopSpan`](crate::logging::NoopSpan).
    #[macro_export]
    macro_rules! debug_span {
        ($($arg:tt)*) => {
            $crate::logging::NoopSpan
        };
    }

    /// No-op `info_span!`; evaluates to a [`NoopSpan`](crate::logging::NoopSpan).
    #[macro_export]
    macro_rules! info_span {
        ($($arg:tt)*) => {
            $crate::logging::NoopSpan
        };
    }

    /// No-op `warn_span!`; evaluates to a [`NoopSpan`](crate::logging::NoopSpan).
    #[macro_export]
    macro_rules! warn_span {
        ($($arg:tt)*) => {
            $crate::logging::NoopSpan
        };
    }

    /// No-op `error_span!`; evaluates to a [`NoopSpan`](crate::logging::NoopSpan).
    #[macro_export]
    macro_rules! error_span {
        ($($arg:tt)*) => {
            $crate::logging::NoopSpan
        };
    }
}

/// Stand-in for `tracing::Span` when tracing is disabled.
#[cfg(not(feature = "tracing"))]
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSpan;

#[cfg(not(feature = "tracing"))]
impl NoopSpan {
    /// Enter the span by reference (does nothing).
    pub fn enter(&self) -> NoopGuard {
        NoopGuard
    }

    /// Enter the span by value, mirroring `tracing::Span::entered`.
    pub fn entered(self) -> NoopGuard {
        NoopGuard
    }
}

/// Guard returned by [`NoopSpan::enter`] and [`NoopSpan::entered`].
#[cfg(not(feature = "tracing"))]
#[derive(Debug)]
pub struct NoopGuard;
