#![forbid(unsafe_code)]

//! The viewport facade.
//!
//! [`Viewport`] owns the item source, the reconciler and the published
//! state, and wires scroll offsets, geometry changes and list mutations
//! through window computation, reconciliation and layout. Every operation
//! returns `true` when cells were acquired or released, meaning the render
//! tree has to be updated.
//!
//! # Example
//!
//! ```
//! use vflow_viewport::{Cell, FnFactory, ObservableVec, Viewport, ViewportConfig};
//!
//! struct Row { index: usize, text: String }
//! impl Cell for Row {
//!     type Item = String;
//!     fn set_index(&mut self, index: usize) { self.index = index; }
//!     fn set_item(&mut self, item: String) { self.text = item; }
//! }
//!
//! let items: ObservableVec<String> = (0..1000).map(|i| format!("row {i}")).collect();
//! let factory = FnFactory::new(|text: String| Some(Row { index: 0, text }));
//! let mut viewport = Viewport::new(items, factory, ViewportConfig::default()).unwrap();
//!
//! viewport.apply_geometry(20.0, 1.0, vflow_core::BufferSize::Small).unwrap();
//! assert_eq!(viewport.current_state().len(), 23);
//!
//! viewport.apply_scroll(500.0).unwrap();
//! assert_eq!(viewport.current_state().get(500).map(|r| r.text.as_str()), Some("row 500"));
//!
//! viewport.items_mut().remove(500);
//! viewport.sync_source().unwrap();
//! assert_eq!(viewport.current_state().get(500).map(|r| r.text.as_str()), Some("row 501"));
//! ```

use vflow_core::{
    BufferSize, ChangeCoalescer, ChangeSet, Flat, Geometry, IndexShape, ListEvent, Orientation,
    Window, WindowCalculator, WindowMode,
};

use crate::cell::{CellFactory, ItemSource};
use crate::config::ViewportConfig;
use crate::error::{Result, ViewportError};
use crate::positions::{PositionComputer, Positions};
use crate::reconcile::{ItemOf, Reconciler};
use crate::state::ViewportState;
use crate::store::StateStore;

/// A virtualized view over an [`ItemSource`].
pub struct Viewport<Src, F, S = Flat>
where
    F: CellFactory,
    S: IndexShape,
{
    source: Src,
    reconciler: Reconciler<F>,
    calc: WindowCalculator<S>,
    positioner: PositionComputer<S>,
    geometry: Geometry,
    config: ViewportConfig,
    store: StateStore<F::Cell>,
    coalescer: ChangeCoalescer,
    /// Changes whose reconciliation failed; retried before anything else.
    unapplied: Option<ChangeSet>,
    window: Window,
    in_progress: bool,
    pending_scroll: Option<f64>,
}

impl<Src, F> Viewport<Src, F, Flat>
where
    Src: ItemSource<Item = ItemOf<F>>,
    F: CellFactory,
{
    /// A viewport over a flat list.
    pub fn new(source: Src, factory: F, config: ViewportConfig) -> Result<Self> {
        Self::with_shape(source, factory, config, Flat)
    }
}

impl<Src, F, S> Viewport<Src, F, S>
where
    Src: ItemSource<Item = ItemOf<F>>,
    F: CellFactory,
    S: IndexShape,
{
    /// A viewport over a list laid out with `shape`.
    ///
    /// Continuous viewports stay empty until they get a geometry; paged
    /// viewports show their first page right away.
    pub fn with_shape(
        mut source: Src,
        factory: F,
        config: ViewportConfig,
        shape: S,
    ) -> Result<Self> {
        config.validate()?;
        // Events recorded before the viewport existed are already reflected
        // in the source's length.
        let _stale = source.drain_events();

        let calc = WindowCalculator::with_shape(shape)
            .with_buffer(config.buffer)
            .with_mode(config.mode)
            .with_hidden_policy(config.hidden_policy);
        let positioner = PositionComputer::with_shape(shape)
            .with_cross_unit(config.cross_unit)
            .with_reuse(config.reuse_positions);
        let geometry =
            Geometry::new(0.0, 0.0, config.unit_size).with_orientation(config.orientation);
        let len = source.len();

        let mut viewport = Self {
            source,
            reconciler: Reconciler::new(factory, config.pool_capacity),
            calc,
            positioner,
            geometry,
            config,
            store: StateStore::new(),
            coalescer: ChangeCoalescer::new(len),
            unapplied: None,
            window: Window::EMPTY,
            in_progress: false,
            pending_scroll: None,
        };
        if config.mode.is_paged() {
            viewport.run(Self::sync_to_window)?;
        }
        Ok(viewport)
    }

    #[must_use]
    pub fn current_state(&self) -> &ViewportState<F::Cell> {
        self.store.state()
    }

    /// Offsets of the last layout pass.
    #[must_use]
    pub fn positions(&self) -> Option<&Positions> {
        self.store.positions()
    }

    #[must_use]
    pub fn window(&self) -> &Window {
        &self.window
    }

    #[must_use]
    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    #[must_use]
    pub fn config(&self) -> &ViewportConfig {
        &self.config
    }

    #[must_use]
    pub fn reconciler(&self) -> &Reconciler<F> {
        &self.reconciler
    }

    /// Mutable access to the cell factory.
    pub fn factory_mut(&mut self) -> &mut F {
        self.reconciler.factory_mut()
    }

    /// Whether a failed change set is waiting to be retried.
    #[must_use]
    pub fn has_unapplied_changes(&self) -> bool {
        self.unapplied.is_some()
    }

    #[must_use]
    pub fn items(&self) -> &Src {
        &self.source
    }

    /// Mutable access to the source. Follow mutations with
    /// [`sync_source`](Self::sync_source) or
    /// [`apply_mutation`](Self::apply_mutation).
    pub fn items_mut(&mut self) -> &mut Src {
        &mut self.source
    }

    /// Number of pages (1 for continuous viewports).
    #[must_use]
    pub fn max_page(&self) -> usize {
        self.calc.max_page(self.source.len())
    }

    /// Current page (1 for continuous viewports).
    #[must_use]
    pub fn page(&self) -> usize {
        match self.calc.mode() {
            WindowMode::Paged { page, .. } => page,
            WindowMode::Continuous => 1,
        }
    }

    /// Scroll to `offset` along the primary axis.
    ///
    /// The offset is clamped to the scrollable extent; paged viewports snap
    /// it to the start of the page containing it. A scroll requested while
    /// another transition runs is applied once that transition completes.
    pub fn apply_scroll(&mut self, offset: f64) -> Result<bool> {
        if self.in_progress {
            vflow_core::trace!(offset, "deferring scroll");
            self.pending_scroll = Some(offset);
            return Ok(false);
        }
        let len = self.source.len();
        let mut offset = self.calc.clamp_offset(&self.geometry, len, offset);
        if let WindowMode::Paged { cells_per_page, .. } = self.calc.mode() {
            let unit = self.geometry.unit_size;
            let line = (offset / unit).floor() as usize;
            let page = (line / cells_per_page.max(1) + 1).min(self.calc.max_page(len));
            self.calc.set_mode(WindowMode::Paged {
                cells_per_page,
                page,
            });
            offset = self.calc.page_offset(page, unit);
        }
        self.geometry.set_primary_offset(offset);
        self.run(Self::sync_to_window)
    }

    /// Apply raw list events describing mutations already made to the
    /// source.
    pub fn apply_mutation<I>(&mut self, events: I) -> Result<bool>
    where
        I: IntoIterator<Item = ListEvent>,
    {
        self.coalescer.extend(events);
        self.run(Self::apply_pending_changes)
    }

    /// Pick up the events recorded by the source itself.
    ///
    /// A source that changed length without recording events is treated
    /// as reset.
    pub fn sync_source(&mut self) -> Result<bool> {
        let mut events = self.source.drain_events();
        let len = self.source.len();
        if events.is_empty() && len != self.coalescer.current_len() {
            events.push(ListEvent::Reset { len });
        }
        self.apply_mutation(events)
    }

    /// Change the viewport extent along the primary axis, the unit size and
    /// the buffer.
    pub fn apply_geometry(
        &mut self,
        extent: f64,
        unit_size: f64,
        buffer: BufferSize,
    ) -> Result<bool> {
        if !(unit_size.is_finite() && unit_size > 0.0) {
            return Err(ViewportError::invalid_config(
                "unit_size",
                unit_size.to_string(),
                "expected a positive finite size",
            ));
        }
        self.geometry.set_primary_extent(extent);
        self.geometry.unit_size = unit_size;
        self.config.unit_size = unit_size;
        self.config.buffer = buffer;
        self.calc.set_buffer(buffer);
        vflow_core::debug!(extent, unit_size, buffer = buffer.count(), "geometry changed");
        let offset = self.geometry.primary_offset();
        self.apply_scroll(offset)
    }

    /// Set the full geometry, e.g. both extents at once.
    pub fn set_geometry(&mut self, geometry: Geometry) -> Result<bool> {
        if !geometry.has_valid_unit() {
            return Err(ViewportError::invalid_config(
                "unit_size",
                geometry.unit_size.to_string(),
                "expected a positive finite size",
            ));
        }
        self.geometry = geometry;
        self.config.unit_size = geometry.unit_size;
        self.config.orientation = geometry.orientation;
        self.apply_scroll(geometry.primary_offset())
    }

    /// Switch the scroll axis, keeping the scroll offset.
    pub fn set_orientation(&mut self, orientation: Orientation) -> Result<bool> {
        if self.geometry.orientation == orientation {
            return Ok(false);
        }
        let offset = self.geometry.primary_offset();
        self.geometry.orientation = orientation;
        self.config.orientation = orientation;
        self.apply_scroll(offset)
    }

    /// Show page `page` (1-based, clamped). No-op for continuous viewports.
    pub fn go_to_page(&mut self, page: usize) -> Result<bool> {
        let WindowMode::Paged { cells_per_page, .. } = self.calc.mode() else {
            return Ok(false);
        };
        let page = page.clamp(1, self.max_page());
        self.calc.set_mode(WindowMode::Paged {
            cells_per_page,
            page,
        });
        let offset = self.calc.page_offset(page, self.geometry.unit_size);
        self.apply_scroll(offset)
    }

    /// Release every cell and rebuild the window from scratch.
    pub fn reset(&mut self) -> Result<bool> {
        self.clear();
        self.coalescer.clear(self.source.len());
        self.run(Self::sync_to_window)
    }

    /// Release every cell; the state becomes empty.
    pub fn clear(&mut self) {
        let Self {
            store, reconciler, ..
        } = self;
        store.clear(|index, cell| reconciler.release(index, cell));
        self.window = Window::EMPTY;
        self.unapplied = None;
    }

    /// Run `body` as one transition, then any scroll it deferred.
    fn run(&mut self, body: fn(&mut Self) -> Result<bool>) -> Result<bool> {
        self.in_progress = true;
        let result = body(self);
        self.in_progress = false;
        let mut changed = match result {
            Ok(changed) => changed,
            Err(err) => {
                self.pending_scroll = None;
                return Err(err);
            }
        };
        if let Some(offset) = self.pending_scroll.take() {
            changed |= self.apply_scroll(offset)?;
        }
        Ok(changed)
    }

    /// Bring the state in line with the window for the current geometry.
    fn sync_to_window(&mut self) -> Result<bool> {
        if self.unapplied.is_some() {
            return self.apply_pending_changes();
        }
        let window = self.calc.compute(&self.geometry, self.source.len());
        self.window = window;
        if window.is_empty() {
            return Ok(self.release_all());
        }
        let Self {
            store,
            reconciler,
            source,
            ..
        } = self;
        let source = &*source;
        let (_, changed) = if store.state().is_empty() {
            store.apply(|old| reconciler.init(old, &window, source))?
        } else {
            store.apply(|old| reconciler.scroll(old, &window, source))?
        };
        self.layout();
        Ok(changed)
    }

    /// Reconcile the pending change set.
    ///
    /// On failure the state still describes the list before the changes,
    /// so the set is kept and retried by the next transition.
    fn apply_pending_changes(&mut self) -> Result<bool> {
        let mut changes = self.coalescer.flush();
        if let Some(mut earlier) = self.unapplied.take() {
            earlier.append(changes);
            changes = earlier;
        }
        let len = self.source.len();
        if changes.len_after() != len {
            vflow_core::warn!(
                expected = changes.len_after(),
                actual = len,
                "list events disagree with the source; rebuilding"
            );
            self.coalescer.clear(len);
            self.release_all();
            return self.sync_to_window();
        }
        if changes.is_empty() {
            return Ok(false);
        }
        if let WindowMode::Paged {
            cells_per_page,
            page,
        } = self.calc.mode()
        {
            let page = page.min(self.calc.max_page(len));
            self.calc.set_mode(WindowMode::Paged {
                cells_per_page,
                page,
            });
        }

        let window = self.calc.compute(&self.geometry, len);
        self.window = window;
        if window.is_empty() {
            return Ok(self.release_all());
        }

        let calc = self.calc;
        let geometry = self.geometry;
        let Self {
            store,
            reconciler,
            source,
            ..
        } = self;
        let source = &*source;
        let result = if store.state().is_empty() {
            store.apply(|old| reconciler.init(old, &window, source))
        } else {
            store.apply(|old| {
                reconciler.apply_changes(
                    old,
                    &changes,
                    |n| calc.compute(&geometry, n),
                    source,
                )
            })
        };
        let (state, changed) = match result {
            Ok(published) => published,
            Err(err) => {
                vflow_core::debug!(%err, steps = changes.len(), "keeping change set for retry");
                self.unapplied = Some(changes);
                return Err(err);
            }
        };
        let settled = state.range() == window.range;
        self.layout();

        let offset = self.geometry.primary_offset();
        let clamped = self.calc.clamp_offset(&self.geometry, len, offset);
        if !settled || clamped != offset {
            // Deferred until this transition completes.
            self.apply_scroll(clamped)?;
        }
        Ok(changed)
    }

    fn layout(&mut self) {
        let cached = self.store.take_positions();
        let positions = self.positioner.compute(
            self.store.state_mut(),
            &self.window,
            &self.geometry,
            self.source.len(),
            cached.as_ref(),
        );
        vflow_core::trace!(
            relayout = self.store.needs_layout(positions.range()),
            lines = positions.len(),
            "layout"
        );
        self.store.mark_laid_out(positions);
    }

    /// Release every cell; returns whether there were any.
    fn release_all(&mut self) -> bool {
        let had_cells = !self.store.state().is_empty();
        self.clear();
        had_cells
    }
}

impl<Src, F, S> Drop for Viewport<Src, F, S>
where
    F: CellFactory,
    S: IndexShape,
{
    fn drop(&mut self) {
        let Self {
            store, reconciler, ..
        } = self;
        store.clear(|index, cell| reconciler.release(index, cell));
        reconciler.drain_pool();
    }
}

impl<Src, F, S> std::fmt::Debug for Viewport<Src, F, S>
where
    F: CellFactory,
    S: IndexShape,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Viewport")
            .field("range", &self.store.state().range())
            .field("cells", &self.store.state().len())
            .field("window", &self.window)
            .field("geometry", &self.geometry)
            .field("reconciler", &self.reconciler)
            .field("unapplied", &self.unapplied.as_ref().map(ChangeSet::len))
            .finish_non_exhaustive()
    }
}
