#![forbid(unsafe_code)]

//! Layout offsets for a reconciled state.
//!
//! Offsets run along the primary axis, one per line. Continuous windows are
//! filled in reverse from the bottom line so a window that slid back at the
//! end of the list stays flush with the last item; paged windows are filled
//! forward from the top of the page.

use vflow_core::{Flat, Geometry, IndexRange, IndexShape, Window};

use crate::cell::Cell;
use crate::state::{UpdateKind, ViewportState};

/// Line offsets of a laid-out state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Positions {
    /// One offset per line, ascending, starting at `first_line`.
    offsets: Vec<f64>,
    first_line: usize,
    range: IndexRange,
    unit: f64,
    per_line: usize,
    cross_unit: f64,
    translation: f64,
    adjusted: bool,
    paged: bool,
}

impl Positions {
    /// No offsets.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            range: IndexRange::INVALID,
            per_line: 1,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Number of laid-out lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    #[must_use]
    pub fn offsets(&self) -> &[f64] {
        &self.offsets
    }

    /// Range the offsets were computed for.
    #[must_use]
    pub fn range(&self) -> IndexRange {
        self.range
    }

    #[must_use]
    pub fn unit(&self) -> f64 {
        self.unit
    }

    /// Translation to apply to every offset so the first visible line sits
    /// at the scroll position.
    #[must_use]
    pub fn translation(&self) -> f64 {
        self.translation
    }

    /// Whether the bottom line was pulled up one unit to stay flush with
    /// the end of the list.
    #[must_use]
    pub fn is_adjusted(&self) -> bool {
        self.adjusted
    }

    #[must_use]
    pub fn is_paged(&self) -> bool {
        self.paged
    }

    /// Primary-axis offset of `index`, or `None` if it is not laid out.
    #[must_use]
    pub fn offset_of(&self, index: usize) -> Option<f64> {
        let line = index / self.per_line.max(1);
        let slot = line.checked_sub(self.first_line)?;
        self.offsets.get(slot).copied()
    }

    /// Cross-axis offset of `index`: its column times the cross unit.
    #[must_use]
    pub fn cross_offset(&self, index: usize) -> f64 {
        (index % self.per_line.max(1)) as f64 * self.cross_unit
    }

    /// `(index, offset)` for every laid-out cell of `state`.
    pub fn iter<'a, C>(
        &'a self,
        state: &'a ViewportState<C>,
    ) -> impl Iterator<Item = (usize, f64)> + 'a {
        state
            .cells()
            .keys()
            .filter_map(move |&index| self.offset_of(index).map(|offset| (index, offset)))
    }
}

/// Computes [`Positions`] for reconciled states.
#[derive(Debug, Clone, Copy)]
pub struct PositionComputer<S: IndexShape = Flat> {
    shape: S,
    cross_unit: Option<f64>,
    reuse: bool,
}

impl PositionComputer<Flat> {
    #[must_use]
    pub fn new() -> Self {
        Self::with_shape(Flat)
    }
}

impl Default for PositionComputer<Flat> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: IndexShape> PositionComputer<S> {
    #[must_use]
    pub fn with_shape(shape: S) -> Self {
        Self {
            shape,
            cross_unit: None,
            reuse: true,
        }
    }

    /// Cross-axis size of a cell; defaults to the unit size.
    #[must_use]
    pub fn with_cross_unit(mut self, cross_unit: Option<f64>) -> Self {
        self.cross_unit = cross_unit;
        self
    }

    /// Reuse cached offsets after a change that kept the line count.
    #[must_use]
    pub fn with_reuse(mut self, reuse: bool) -> Self {
        self.reuse = reuse;
        self
    }

    #[must_use]
    pub fn shape(&self) -> S {
        self.shape
    }

    /// Lay out `state` for `window`.
    ///
    /// Paged windows also toggle cell visibility and refresh the state's
    /// hidden set.
    pub fn compute<C: Cell>(
        &self,
        state: &mut ViewportState<C>,
        window: &Window,
        geometry: &Geometry,
        len: usize,
        cached: Option<&Positions>,
    ) -> Positions {
        let range = state.range();
        if !range.is_valid() || !geometry.has_valid_unit() || len == 0 {
            return Positions::empty();
        }
        if window.paged {
            self.compute_paged(state, window, geometry)
        } else {
            self.compute_continuous(state, window, geometry, len, cached)
        }
    }

    fn base(&self, range: IndexRange, geometry: &Geometry) -> Positions {
        let unit = geometry.unit_size;
        Positions {
            offsets: Vec::new(),
            first_line: self.shape.line_of(range.min()),
            range,
            unit,
            per_line: self.shape.per_line(),
            cross_unit: self.cross_unit.unwrap_or(unit),
            translation: 0.0,
            adjusted: false,
            paged: false,
        }
    }

    fn compute_continuous<C>(
        &self,
        state: &ViewportState<C>,
        window: &Window,
        geometry: &Geometry,
        len: usize,
        cached: Option<&Positions>,
    ) -> Positions {
        let range = state.range();
        let mut positions = self.base(range, geometry);
        let unit = positions.unit;
        let lines = self.shape.lines(len);
        let first_line = positions.first_line;
        let lines_in_range = self.shape.line_of(range.max()) - first_line + 1;

        let wanted_last = window
            .first_line
            .saturating_add(window.lines_needed)
            .saturating_sub(1);
        let adjust = wanted_last > lines - 1 && state.is_full();

        let reusable = cached.filter(|c| {
            self.reuse
                && state.kind() == UpdateKind::Change
                && !adjust
                && !c.paged
                && !c.adjusted
                && c.unit == unit
                && c.offsets.len() == lines_in_range
        });
        positions.offsets = match reusable {
            Some(c) => c.offsets.clone(),
            None => {
                let mut offsets = vec![0.0; lines_in_range];
                let mut bottom = (lines_in_range - 1) as f64 * unit;
                if adjust {
                    bottom -= unit;
                }
                for slot in offsets.iter_mut().rev() {
                    *slot = bottom;
                    bottom -= unit;
                }
                offsets
            }
        };
        positions.adjusted = adjust;

        let remainder = geometry.primary_offset().max(0.0) % unit;
        let top = window
            .first_line
            .checked_sub(first_line)
            .and_then(|slot| positions.offsets.get(slot).copied())
            .unwrap_or(0.0);
        positions.translation = -(top + remainder);
        vflow_core::trace!(
            lines = lines_in_range,
            adjust,
            reused = reusable.is_some(),
            "computed positions"
        );
        positions
    }

    fn compute_paged<C: Cell>(
        &self,
        state: &mut ViewportState<C>,
        window: &Window,
        geometry: &Geometry,
    ) -> Positions {
        let visible = window.visible;
        let mut positions = self.base(state.range(), geometry);
        positions.paged = true;
        if visible.is_valid() {
            let first = self.shape.line_of(visible.min());
            let last = self.shape.line_of(visible.max());
            positions.first_line = first;
            positions.offsets = (0..=last - first)
                .map(|occupied| occupied as f64 * positions.unit)
                .collect();
        }

        let mut hidden = std::collections::BTreeSet::new();
        for (index, cell) in state.iter_mut() {
            let shown = visible.contains(index);
            cell.set_visible(shown);
            if !shown {
                hidden.insert(index);
            }
        }
        state.hidden = hidden;
        positions
    }
}
