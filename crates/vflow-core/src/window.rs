#![forbid(unsafe_code)]

//! Window computation: which indices need live cells for a given geometry.
//!
//! The calculator works in *lines* along the primary axis and lets the
//! [`IndexShape`] expand lines into item indices. Two modes exist:
//!
//! - [`WindowMode::Continuous`]: free scrolling. The window covers the lines
//!   intersecting the viewport, one extra line of overscan so a partially
//!   scrolled edge line stays materialized, and `buffer` lines on each side.
//!   Near the end of the list the window slides back so it never holds fewer
//!   lines than needed unless the list itself is shorter.
//! - [`WindowMode::Paged`]: the window is one page of `cells_per_page` lines.
//!   On a partially filled last page, [`HiddenCellPolicy::KeepHidden`] keeps
//!   a full page of cells alive and hides the surplus.
//!
//! Invalid geometry (non-positive or non-finite extent or unit size) and
//! empty lists produce [`Window::EMPTY`]. They are never errors.
//!
//! # Example
//!
//! ```
//! use vflow_core::{BufferSize, Geometry, IndexRange, WindowCalculator};
//!
//! let calc = WindowCalculator::new().with_buffer(BufferSize::Exact(0));
//! let geometry = Geometry::new(100.0, 100.0, 10.0).with_offset(0.0, 55.0);
//! let window = calc.compute(&geometry, 1_000);
//! assert_eq!(window.range, IndexRange::new(5, 15));
//! ```

use crate::range::IndexRange;
use crate::shape::{Flat, IndexShape};

// ═══════════════════════════════════════════════════════════════════════════
// Geometry
// ═══════════════════════════════════════════════════════════════════════════

/// Scroll direction of the viewport.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Orientation {
    /// Items stack top to bottom; reads `offset_y` and `height`.
    #[default]
    Vertical,
    /// Items stack left to right; reads `offset_x` and `width`.
    Horizontal,
}

impl Orientation {
    /// Whether this is [`Orientation::Vertical`].
    #[inline]
    #[must_use]
    pub const fn is_vertical(self) -> bool {
        matches!(self, Self::Vertical)
    }
}

/// Viewport geometry in layout units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geometry {
    pub offset_x: f64,
    pub offset_y: f64,
    pub width: f64,
    pub height: f64,
    /// Size of one line along the primary axis.
    pub unit_size: f64,
    pub orientation: Orientation,
}

impl Geometry {
    /// Vertical geometry scrolled to the origin.
    #[must_use]
    pub const fn new(width: f64, height: f64, unit_size: f64) -> Self {
        Self {
            offset_x: 0.0,
            offset_y: 0.0,
            width,
            height,
            unit_size,
            orientation: Orientation::Vertical,
        }
    }

    /// Set both scroll offsets.
    #[must_use]
    pub const fn with_offset(mut self, offset_x: f64, offset_y: f64) -> Self {
        self.offset_x = offset_x;
        self.offset_y = offset_y;
        self
    }

    /// Set the orientation.
    #[must_use]
    pub const fn with_orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = orientation;
        self
    }

    /// Set the scroll offset along the primary axis.
    #[must_use]
    pub fn with_primary_offset(mut self, offset: f64) -> Self {
        self.set_primary_offset(offset);
        self
    }

    /// Scroll offset along the primary axis.
    #[inline]
    #[must_use]
    pub fn primary_offset(&self) -> f64 {
        match self.orientation {
            Orientation::Vertical => self.offset_y,
            Orientation::Horizontal => self.offset_x,
        }
    }

    /// Viewport extent along the primary axis.
    #[inline]
    #[must_use]
    pub fn primary_extent(&self) -> f64 {
        match self.orientation {
            Orientation::Vertical => self.height,
            Orientation::Horizontal => self.width,
        }
    }

    /// Viewport extent along the cross axis.
    #[inline]
    #[must_use]
    pub fn cross_extent(&self) -> f64 {
        match self.orientation {
            Orientation::Vertical => self.width,
            Orientation::Horizontal => self.height,
        }
    }

    pub fn set_primary_offset(&mut self, offset: f64) {
        match self.orientation {
            Orientation::Vertical => self.offset_y = offset,
            Orientation::Horizontal => self.offset_x = offset,
        }
    }

    pub fn set_primary_extent(&mut self, extent: f64) {
        match self.orientation {
            Orientation::Vertical => self.height = extent,
            Orientation::Horizontal => self.width = extent,
        }
    }

    /// Whether the unit size can be used for division.
    #[inline]
    #[must_use]
    pub fn has_valid_unit(&self) -> bool {
        self.unit_size.is_finite() && self.unit_size > 0.0
    }

    /// Whether a continuous window can be computed at all.
    #[must_use]
    pub fn is_usable(&self) -> bool {
        let extent = self.primary_extent();
        self.has_valid_unit() && extent.is_finite() && extent > 0.0
    }
}

impl Default for Geometry {
    fn default() -> Self {
        Self::new(0.0, 0.0, 1.0)
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Configuration enums
// ═══════════════════════════════════════════════════════════════════════════

/// Lines materialized beyond each edge of the viewport.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum BufferSize {
    Small,
    #[default]
    Medium,
    Big,
    Exact(usize),
}

impl BufferSize {
    /// Number of buffer lines on each side.
    #[inline]
    #[must_use]
    pub const fn count(self) -> usize {
        match self {
            Self::Small => 1,
            Self::Medium => 2,
            Self::Big => 3,
            Self::Exact(n) => n,
        }
    }

    /// Parse `small`, `medium`, `big` (any case) or a decimal count.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        match value.to_ascii_lowercase().as_str() {
            "small" => Some(Self::Small),
            "medium" => Some(Self::Medium),
            "big" => Some(Self::Big),
            other => other.parse::<usize>().ok().map(Self::Exact),
        }
    }
}

impl From<usize> for BufferSize {
    fn from(n: usize) -> Self {
        Self::Exact(n)
    }
}

/// What happens to the surplus cells of a partially filled page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum HiddenCellPolicy {
    /// Keep a full page of cells alive; the surplus is hidden.
    #[default]
    KeepHidden,
    /// Release the surplus.
    Dispose,
}

impl HiddenCellPolicy {
    /// Parse `keep` / `dispose` (any case, a few aliases).
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "keep" | "keep-hidden" | "hidden" => Some(Self::KeepHidden),
            "dispose" | "release" => Some(Self::Dispose),
            _ => None,
        }
    }
}

/// How the window follows the scroll position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum WindowMode {
    /// Free scrolling with overscan and buffer.
    #[default]
    Continuous,
    /// Fixed pages of `cells_per_page` lines; `page` is 1-based.
    Paged { cells_per_page: usize, page: usize },
}

impl WindowMode {
    /// Whether this is a paged mode.
    #[inline]
    #[must_use]
    pub const fn is_paged(&self) -> bool {
        matches!(self, Self::Paged { .. })
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Window
// ═══════════════════════════════════════════════════════════════════════════

/// Where an index sits relative to the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Visibility {
    Visible,
    Buffered,
    Outside,
}

/// Result of a window computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    /// Indices that must have live cells.
    pub range: IndexRange,
    /// Indices shown on screen (a subset of `range`).
    pub visible: IndexRange,
    /// Cells wanted when the viewport is full.
    pub target_size: usize,
    /// First visible index.
    pub first_visible: usize,
    /// Line of `first_visible`.
    pub first_line: usize,
    /// Lines wanted when the viewport is full.
    pub lines_needed: usize,
    /// Indices per line of the shape.
    pub per_line: usize,
    /// Whether the window is a page (cells outside `visible` are hidden).
    pub paged: bool,
}

impl Window {
    /// Nothing to display.
    pub const EMPTY: Self = Self {
        range: IndexRange::INVALID,
        visible: IndexRange::INVALID,
        target_size: 0,
        first_visible: 0,
        first_line: 0,
        lines_needed: 0,
        per_line: 1,
        paged: false,
    };

    /// Whether the window holds no indices.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        !self.range.is_valid()
    }

    /// Whether `index` has a live but hidden cell in this window.
    #[must_use]
    pub const fn is_hidden(&self, index: usize) -> bool {
        self.paged && self.range.contains(index) && !self.visible.contains(index)
    }

    /// Classify `index` against this window.
    #[must_use]
    pub const fn classify(&self, index: usize) -> Visibility {
        if self.visible.contains(index) {
            Visibility::Visible
        } else if self.range.contains(index) {
            Visibility::Buffered
        } else {
            Visibility::Outside
        }
    }
}

impl Default for Window {
    fn default() -> Self {
        Self::EMPTY
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Calculator
// ═══════════════════════════════════════════════════════════════════════════

/// Computes [`Window`]s for a shape, buffer and mode.
#[derive(Debug, Clone, Copy)]
pub struct WindowCalculator<S: IndexShape = Flat> {
    shape: S,
    buffer: BufferSize,
    mode: WindowMode,
    hidden_policy: HiddenCellPolicy,
}

impl WindowCalculator<Flat> {
    /// Continuous calculator for flat lists with the default buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::with_shape(Flat)
    }
}

impl Default for WindowCalculator<Flat> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: IndexShape> WindowCalculator<S> {
    /// Continuous calculator for `shape` with the default buffer.
    #[must_use]
    pub fn with_shape(shape: S) -> Self {
        Self {
            shape,
            buffer: BufferSize::default(),
            mode: WindowMode::Continuous,
            hidden_policy: HiddenCellPolicy::default(),
        }
    }

    /// Set the buffer size.
    #[must_use]
    pub fn with_buffer(mut self, buffer: BufferSize) -> Self {
        self.buffer = buffer;
        self
    }

    /// Set the window mode.
    #[must_use]
    pub fn with_mode(mut self, mode: WindowMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the hidden-cell policy used by paged windows.
    #[must_use]
    pub fn with_hidden_policy(mut self, policy: HiddenCellPolicy) -> Self {
        self.hidden_policy = policy;
        self
    }

    #[inline]
    #[must_use]
    pub fn shape(&self) -> S {
        self.shape
    }

    #[inline]
    #[must_use]
    pub fn buffer(&self) -> BufferSize {
        self.buffer
    }

    #[inline]
    #[must_use]
    pub fn mode(&self) -> WindowMode {
        self.mode
    }

    #[inline]
    #[must_use]
    pub fn hidden_policy(&self) -> HiddenCellPolicy {
        self.hidden_policy
    }

    pub fn set_buffer(&mut self, buffer: BufferSize) {
        self.buffer = buffer;
    }

    pub fn set_mode(&mut self, mode: WindowMode) {
        self.mode = mode;
    }

    pub fn set_hidden_policy(&mut self, policy: HiddenCellPolicy) {
        self.hidden_policy = policy;
    }

    /// Compute the window for `geometry` over a list of `len` items.
    #[must_use]
    pub fn compute(&self, geometry: &Geometry, len: usize) -> Window {
        match self.mode {
            WindowMode::Continuous => self.compute_continuous(geometry, len),
            WindowMode::Paged {
                cells_per_page,
                page,
            } => self.compute_paged(cells_per_page, page, len),
        }
    }

    fn compute_continuous(&self, geometry: &Geometry, len: usize) -> Window {
        if len == 0 || !geometry.is_usable() {
            return Window::EMPTY;
        }
        let unit = geometry.unit_size;
        let lines = self.shape.lines(len);
        let offset = sanitize_offset(geometry.primary_offset());

        let first = floor_to_usize(offset / unit).min(lines - 1);
        let per_view = ceil_to_usize(geometry.primary_extent() / unit);
        let buffer = self.buffer.count();
        let needed = per_view
            .saturating_add(1)
            .saturating_add(buffer.saturating_mul(2));

        let mut start = first.saturating_sub(buffer);
        let last = start.saturating_add(needed - 1).min(lines - 1);
        if last - start + 1 < needed {
            start = (last + 1).saturating_sub(needed);
        }

        let visible_last = first.saturating_add(per_view).min(lines - 1);
        let per_line = self.shape.per_line();
        Window {
            range: self.shape.expand(IndexRange::new(start, last), len),
            visible: self.shape.expand(IndexRange::new(first, visible_last), len),
            target_size: needed.saturating_mul(per_line),
            first_visible: first * per_line,
            first_line: first,
            lines_needed: needed,
            per_line,
            paged: false,
        }
    }

    fn compute_paged(&self, cells_per_page: usize, page: usize, len: usize) -> Window {
        if len == 0 || cells_per_page == 0 {
            return Window::EMPTY;
        }
        let lines = self.shape.lines(len);
        let page = page.clamp(1, lines.div_ceil(cells_per_page).max(1));

        let first = ((page - 1).saturating_mul(cells_per_page)).min(lines - 1);
        let last = first.saturating_add(cells_per_page - 1).min(lines - 1);
        let range_lines = match self.hidden_policy {
            HiddenCellPolicy::KeepHidden => {
                IndexRange::new((last + 1).saturating_sub(cells_per_page), last)
            }
            HiddenCellPolicy::Dispose => IndexRange::new(first, last),
        };

        let per_line = self.shape.per_line();
        Window {
            range: self.shape.expand(range_lines, len),
            visible: self.shape.expand(IndexRange::new(first, last), len),
            target_size: cells_per_page.saturating_mul(per_line),
            first_visible: first * per_line,
            first_line: first,
            lines_needed: cells_per_page,
            per_line,
            paged: true,
        }
    }

    /// Classify `index` against the window for `geometry`.
    #[must_use]
    pub fn classify(&self, geometry: &Geometry, len: usize, index: usize) -> Visibility {
        self.compute(geometry, len).classify(index)
    }

    /// Largest valid scroll offset along the primary axis.
    #[must_use]
    pub fn max_scroll(&self, geometry: &Geometry, len: usize) -> f64 {
        if !geometry.has_valid_unit() {
            return 0.0;
        }
        let unit = geometry.unit_size;
        match self.mode {
            WindowMode::Continuous => {
                let extent = geometry.primary_extent();
                let total = self.shape.lines(len) as f64 * unit;
                if extent.is_finite() {
                    (total - extent).max(0.0)
                } else {
                    0.0
                }
            }
            WindowMode::Paged { .. } => self.page_offset(self.max_page(len), unit),
        }
    }

    /// Clamp `offset` into `[0, max_scroll]`.
    #[must_use]
    pub fn clamp_offset(&self, geometry: &Geometry, len: usize, offset: f64) -> f64 {
        sanitize_offset(offset).min(self.max_scroll(geometry, len))
    }

    /// Sub-unit translation applied to laid-out cells so scrolling is smooth.
    #[must_use]
    pub fn scroll_translation(&self, geometry: &Geometry) -> f64 {
        if !geometry.has_valid_unit() {
            return 0.0;
        }
        -(sanitize_offset(geometry.primary_offset()) % geometry.unit_size)
    }

    /// Number of pages for a list of `len` items (at least 1).
    #[must_use]
    pub fn max_page(&self, len: usize) -> usize {
        match self.mode {
            WindowMode::Paged { cells_per_page, .. } if cells_per_page > 0 => {
                self.shape.lines(len).div_ceil(cells_per_page).max(1)
            }
            _ => 1,
        }
    }

    /// 1-based page holding `index`.
    #[must_use]
    pub fn page_of(&self, index: usize) -> usize {
        match self.mode {
            WindowMode::Paged { cells_per_page, .. } if cells_per_page > 0 => {
                self.shape.line_of(index) / cells_per_page + 1
            }
            _ => 1,
        }
    }

    /// Scroll offset at which `page` starts.
    #[must_use]
    pub fn page_offset(&self, page: usize, unit_size: f64) -> f64 {
        match self.mode {
            WindowMode::Paged { cells_per_page, .. } => {
                (page.saturating_sub(1) * cells_per_page) as f64 * unit_size
            }
            WindowMode::Continuous => 0.0,
        }
    }
}

fn sanitize_offset(offset: f64) -> f64 {
    if offset.is_finite() { offset.max(0.0) } else { 0.0 }
}

// `as` saturates for out-of-range floats; NaN maps to 0.
#[inline]
fn floor_to_usize(value: f64) -> usize {
    value.floor() as usize
}

#[inline]
fn ceil_to_usize(value: f64) -> usize {
    value.ceil() as usize
}
