#![forbid(unsafe_code)]

//! Viewport configuration.
//!
//! [`ViewportConfig`] is built with `with_*` methods or overlaid from the
//! environment:
//!
//! | Variable | Values |
//! |----------|--------|
//! | `VFLOW_BUFFER` | `small`, `medium`, `big`, or a line count |
//! | `VFLOW_POOL_CAPACITY` | cell count (0 disables pooling) |
//! | `VFLOW_HIDDEN_CELLS` | `keep` or `dispose` |
//! | `VFLOW_REUSE_POSITIONS` | `1/0/true/false/yes/no/on/off` |
//!
//! Malformed values are skipped and reported in
//! [`ViewportConfigParse::errors`].

use std::env;

pub use vflow_core::HiddenCellPolicy;
use vflow_core::{BufferSize, Orientation, WindowMode};

use crate::error::ViewportError;
use crate::pool::DEFAULT_CAPACITY;

pub const ENV_BUFFER: &str = "VFLOW_BUFFER";
pub const ENV_POOL_CAPACITY: &str = "VFLOW_POOL_CAPACITY";
pub const ENV_HIDDEN_CELLS: &str = "VFLOW_HIDDEN_CELLS";
pub const ENV_REUSE_POSITIONS: &str = "VFLOW_REUSE_POSITIONS";

/// Settings for a [`Viewport`](crate::Viewport).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportConfig {
    pub orientation: Orientation,
    pub buffer: BufferSize,
    /// Size of one line along the primary axis.
    pub unit_size: f64,
    /// Size of one column along the cross axis; `None` uses `unit_size`.
    pub cross_unit: Option<f64>,
    pub pool_capacity: usize,
    pub mode: WindowMode,
    pub hidden_policy: HiddenCellPolicy,
    pub reuse_positions: bool,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            orientation: Orientation::Vertical,
            buffer: BufferSize::Medium,
            unit_size: 1.0,
            cross_unit: None,
            pool_capacity: DEFAULT_CAPACITY,
            mode: WindowMode::Continuous,
            hidden_policy: HiddenCellPolicy::KeepHidden,
            reuse_positions: true,
        }
    }
}

/// Result of reading the configuration from the environment.
#[derive(Debug, Clone)]
pub struct ViewportConfigParse {
    pub config: ViewportConfig,
    pub errors: Vec<ViewportError>,
}

impl ViewportConfig {
    #[must_use]
    pub fn with_orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = orientation;
        self
    }

    #[must_use]
    pub fn with_buffer(mut self, buffer: BufferSize) -> Self {
        self.buffer = buffer;
        self
    }

    #[must_use]
    pub fn with_unit_size(mut self, unit_size: f64) -> Self {
        self.unit_size = unit_size;
        self
    }

    #[must_use]
    pub fn with_cross_unit(mut self, cross_unit: f64) -> Self {
        self.cross_unit = Some(cross_unit);
        self
    }

    #[must_use]
    pub fn with_pool_capacity(mut self, capacity: usize) -> Self {
        self.pool_capacity = capacity;
        self
    }

    #[must_use]
    pub fn with_mode(mut self, mode: WindowMode) -> Self {
        self.mode = mode;
        self
    }

    /// Paged mode starting on page 1.
    #[must_use]
    pub fn paged(self, cells_per_page: usize) -> Self {
        self.with_mode(WindowMode::Paged {
            cells_per_page,
            page: 1,
        })
    }

    #[must_use]
    pub fn with_hidden_policy(mut self, policy: HiddenCellPolicy) -> Self {
        self.hidden_policy = policy;
        self
    }

    #[must_use]
    pub fn with_reuse_positions(mut self, reuse: bool) -> Self {
        self.reuse_positions = reuse;
        self
    }

    /// Defaults overlaid with the environment; malformed values are ignored.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_env_with_diagnostics().config
    }

    /// Defaults overlaid with the environment, with parse diagnostics.
    #[must_use]
    pub fn from_env_with_diagnostics() -> ViewportConfigParse {
        Self::from_env_with(|key| env::var(key).ok())
    }

    /// Overlay values looked up through `get` onto the defaults.
    pub fn from_env_with<F>(mut get: F) -> ViewportConfigParse
    where
        F: FnMut(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let mut errors = Vec::new();

        if let Some(value) = get(ENV_BUFFER) {
            match BufferSize::parse(&value) {
                Some(parsed) => config.buffer = parsed,
                None => errors.push(ViewportError::invalid_config(
                    "buffer",
                    value,
                    "expected small|medium|big|<lines>",
                )),
            }
        }

        if let Some(value) = get(ENV_POOL_CAPACITY) {
            match parse_usize(&value) {
                Some(parsed) => config.pool_capacity = parsed,
                None => errors.push(ViewportError::invalid_config(
                    "pool_capacity",
                    value,
                    "expected non-negative integer",
                )),
            }
        }

        if let Some(value) = get(ENV_HIDDEN_CELLS) {
            match HiddenCellPolicy::parse(&value) {
                Some(parsed) => config.hidden_policy = parsed,
                None => errors.push(ViewportError::invalid_config(
                    "hidden_policy",
                    value,
                    "expected keep|dispose",
                )),
            }
        }

        if let Some(value) = get(ENV_REUSE_POSITIONS) {
            match parse_bool(&value) {
                Some(parsed) => config.reuse_positions = parsed,
                None => errors.push(ViewportError::invalid_config(
                    "reuse_positions",
                    value,
                    "expected bool (1/0/true/false)",
                )),
            }
        }

        ViewportConfigParse { config, errors }
    }

    /// Reject settings no viewport can work with.
    pub fn validate(&self) -> Result<(), ViewportError> {
        if !(self.unit_size.is_finite() && self.unit_size > 0.0) {
            return Err(ViewportError::invalid_config(
                "unit_size",
                self.unit_size.to_string(),
                "expected a positive finite size",
            ));
        }
        if let Some(cross) = self.cross_unit
            && !(cross.is_finite() && cross >= 0.0)
        {
            return Err(ViewportError::invalid_config(
                "cross_unit",
                cross.to_string(),
                "expected a non-negative finite size",
            ));
        }
        if let WindowMode::Paged {
            cells_per_page: 0, ..
        } = self.mode
        {
            return Err(ViewportError::invalid_config(
                "cells_per_page",
                "0",
                "a page needs at least one line",
            ));
        }
        Ok(())
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[inline]
fn parse_usize(value: &str) -> Option<usize> {
    value.trim().parse::<usize>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn parse(vars: &[(&str, &str)]) -> ViewportConfigParse {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        ViewportConfig::from_env_with(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let config = ViewportConfig::default();
        assert_eq!(config.buffer, BufferSize::Medium);
        assert_eq!(config.pool_capacity, 0);
        assert_eq!(config.hidden_policy, HiddenCellPolicy::KeepHidden);
        assert!(config.reuse_positions);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn env_overlay() {
        let parsed = parse(&[
            (ENV_BUFFER, "big"),
            (ENV_POOL_CAPACITY, " 16 "),
            (ENV_HIDDEN_CELLS, "dispose"),
            (ENV_REUSE_POSITIONS, "off"),
        ]);
        assert!(parsed.errors.is_empty());
        assert_eq!(parsed.config.buffer, BufferSize::Big);
        assert_eq!(parsed.config.pool_capacity, 16);
        assert_eq!(parsed.config.hidden_policy, HiddenCellPolicy::Dispose);
        assert!(!parsed.config.reuse_positions);
    }

    #[test]
    fn numeric_buffer() {
        let parsed = parse(&[(ENV_BUFFER, "7")]);
        assert_eq!(parsed.config.buffer.count(), 7);
    }

    #[test]
    fn malformed_values_are_reported_and_skipped() {
        let parsed = parse(&[(ENV_POOL_CAPACITY, "-3"), (ENV_REUSE_POSITIONS, "maybe")]);
        assert_eq!(parsed.errors.len(), 2);
        assert_eq!(parsed.config.pool_capacity, 0);
        assert!(parsed.config.reuse_positions);
        assert!(matches!(
            &parsed.errors[0],
            ViewportError::InvalidConfig { field: "pool_capacity", .. }
        ));
    }

    #[test]
    fn validate_rejects_bad_units_and_pages() {
        for unit in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(ViewportConfig::default().with_unit_size(unit).validate().is_err());
        }
        assert!(ViewportConfig::default().paged(0).validate().is_err());
        assert!(ViewportConfig::default().paged(4).validate().is_ok());
        assert!(
            ViewportConfig::default()
                .with_cross_unit(f64::NAN)
                .validate()
                .is_err()
        );
    }
}
