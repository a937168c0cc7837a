#![forbid(unsafe_code)]

//! The reconciler: turns an old state plus a window (and a change set) into
//! a new state.
//!
//! Every transition runs in three phases:
//!
//! 1. **Plan**: pure index arithmetic on a mapping table ([`crate::plan`]).
//! 2. **Acquire**: fetch items for every stale slot and take cells for every
//!    new slot from the pool or the factory. Any failure rolls the acquired
//!    cells back and returns an error; the old state is untouched.
//! 3. **Commit**: infallible. Cells move out of the old state into their
//!    slots, `set_index` / `set_item` are called only where the plan says
//!    so, and leftovers are released.
//!
//! # Example
//!
//! ```
//! use vflow_core::{BufferSize, Geometry, WindowCalculator};
//! use vflow_viewport::{Cell, FnFactory, Reconciler, ViewportState};
//!
//! struct Row(usize, u32);
//! impl Cell for Row {
//!     type Item = u32;
//!     fn set_index(&mut self, index: usize) { self.0 = index; }
//!     fn set_item(&mut self, item: u32) { self.1 = item; }
//! }
//!
//! let items: Vec<u32> = (0..100).collect();
//! let calc = WindowCalculator::new().with_buffer(BufferSize::Exact(0));
//! let window = calc.compute(&Geometry::new(100.0, 9.0, 1.0), items.len());
//!
//! let mut reconciler = Reconciler::new(FnFactory::new(|item: u32| Some(Row(0, item))), 0);
//! let mut old = ViewportState::empty();
//! let state = reconciler.init(&mut old, &window, &items).unwrap();
//! assert_eq!(state.len(), 10);
//! assert!(state.cells_changed());
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use vflow_core::{ChangeRecord, ChangeSet, Window};

use crate::cell::{Cell, CellFactory, ItemSource};
use crate::error::{Result, ViewportError};
use crate::plan::{Layout, Plan, PlanStats, Slot, SlotFlags};
use crate::pool::CellPool;
use crate::state::{UpdateKind, ViewportState};

/// Item type shown by the cells of factory `F`.
pub type ItemOf<F> = <<F as CellFactory>::Cell as Cell>::Item;

/// A cell taken during the acquire phase.
struct Acquired<C> {
    index: usize,
    cell: C,
    pooled: bool,
}

/// Owns the factory and the pool, and runs transitions.
pub struct Reconciler<F: CellFactory> {
    factory: F,
    pool: CellPool<F::Cell>,
    last_stats: PlanStats,
}

impl<F: CellFactory> Reconciler<F> {
    /// Create a reconciler with a pool of `pool_capacity` cells.
    #[must_use]
    pub fn new(factory: F, pool_capacity: usize) -> Self {
        Self {
            factory,
            pool: CellPool::new(pool_capacity),
            last_stats: PlanStats::default(),
        }
    }

    #[must_use]
    pub fn factory(&self) -> &F {
        &self.factory
    }

    pub fn factory_mut(&mut self) -> &mut F {
        &mut self.factory
    }

    #[must_use]
    pub fn pool(&self) -> &CellPool<F::Cell> {
        &self.pool
    }

    /// Counts of the last committed transition.
    #[must_use]
    pub fn last_stats(&self) -> PlanStats {
        self.last_stats
    }

    /// Resize the pool, tearing down cells that no longer fit.
    pub fn set_pool_capacity(&mut self, capacity: usize) {
        for cell in self.pool.set_capacity(capacity) {
            self.factory.teardown(cell);
        }
    }

    /// Tear down every pooled cell.
    pub fn drain_pool(&mut self) {
        for cell in self.pool.evict_all() {
            self.factory.teardown(cell);
        }
    }

    /// Build a state for `window` from scratch.
    ///
    /// Cells of a non-empty `old` state are released first.
    pub fn init<Src>(
        &mut self,
        old: &mut ViewportState<F::Cell>,
        window: &Window,
        source: &Src,
    ) -> Result<ViewportState<F::Cell>>
    where
        Src: ItemSource<Item = ItemOf<F>> + ?Sized,
    {
        let plan = Plan::rebuild(window, old.cells.keys().copied());
        self.execute(plan, old, UpdateKind::Init, window, source)
    }

    /// Same as [`init`](Self::init) but reported as a scroll; used after
    /// an invariant fallback or an explicit reset.
    pub fn rebuild<Src>(
        &mut self,
        old: &mut ViewportState<F::Cell>,
        window: &Window,
        source: &Src,
    ) -> Result<ViewportState<F::Cell>>
    where
        Src: ItemSource<Item = ItemOf<F>> + ?Sized,
    {
        let plan = Plan::rebuild(window, old.cells.keys().copied());
        self.execute(plan, old, UpdateKind::Scroll, window, source)
    }

    /// Move the state to `window` for an unchanged list.
    pub fn scroll<Src>(
        &mut self,
        old: &mut ViewportState<F::Cell>,
        window: &Window,
        source: &Src,
    ) -> Result<ViewportState<F::Cell>>
    where
        Src: ItemSource<Item = ItemOf<F>> + ?Sized,
    {
        if old.is_empty() {
            return self.init(old, window, source);
        }
        if old.range == window.range {
            let _span = vflow_core::trace_span!("reconcile", kind = "scroll").entered();
            vflow_core::trace!(range = %window.range, "range unchanged");
            let hidden = old
                .cells
                .keys()
                .copied()
                .filter(|&i| window.is_hidden(i))
                .collect();
            self.last_stats = PlanStats {
                kept: old.len(),
                ..PlanStats::default()
            };
            return Ok(ViewportState {
                range: window.range,
                cells: old.take_cells(),
                target_size: window.target_size,
                kind: UpdateKind::Scroll,
                cells_changed: false,
                hidden,
            });
        }
        let plan = self.plan_scroll(old, window);
        self.execute(plan, old, UpdateKind::Scroll, window, source)
    }

    /// Apply a batch of list changes.
    ///
    /// `window_for(len)` yields the window for a list of `len` items; it is
    /// called once per step and once for the final length.
    pub fn apply_changes<Src, W>(
        &mut self,
        old: &mut ViewportState<F::Cell>,
        changes: &ChangeSet,
        window_for: W,
        source: &Src,
    ) -> Result<ViewportState<F::Cell>>
    where
        Src: ItemSource<Item = ItemOf<F>> + ?Sized,
        W: Fn(usize) -> Window,
    {
        let final_window = window_for(changes.len_after());
        if old.is_empty() {
            let plan = Plan::rebuild(&final_window, std::iter::empty());
            return self.execute(plan, old, UpdateKind::Change, &final_window, source);
        }
        let plan = self.plan_changes(old, changes, window_for);
        self.execute(plan, old, UpdateKind::Change, &final_window, source)
    }

    /// The plan [`scroll`](Self::scroll) would commit; no cell is touched.
    #[must_use]
    pub fn plan_scroll(&self, old: &ViewportState<F::Cell>, window: &Window) -> Plan {
        let mut layout = self.layout_of(old);
        layout.scroll_to(window);
        layout.finish(window)
    }

    /// The plan [`apply_changes`](Self::apply_changes) would commit for a
    /// non-empty `old` state; no cell is touched.
    pub fn plan_changes<W>(
        &self,
        old: &ViewportState<F::Cell>,
        changes: &ChangeSet,
        window_for: W,
    ) -> Plan
    where
        W: Fn(usize) -> Window,
    {
        let mut layout = self.layout_of(old);
        for step in &changes.steps {
            let window = window_for(step.len_after);
            plan_step(&mut layout, &step.record, step.len_after, &window);
        }
        layout.finish(&window_for(changes.len_after()))
    }

    /// Apply a single change record leaving `len_after` items.
    pub fn apply_change<Src>(
        &mut self,
        old: &mut ViewportState<F::Cell>,
        record: ChangeRecord,
        len_before: usize,
        len_after: usize,
        window: &Window,
        source: &Src,
    ) -> Result<ViewportState<F::Cell>>
    where
        Src: ItemSource<Item = ItemOf<F>> + ?Sized,
    {
        let changes = ChangeSet::single(record, len_before, len_after);
        self.apply_changes(old, &changes, |_| *window, source)
    }

    /// Release every cell of `old`, leaving it empty.
    pub fn clear(&mut self, old: &mut ViewportState<F::Cell>) {
        let cells = old.take_cells();
        let released = cells.len();
        for (index, cell) in cells {
            self.release(index, cell);
        }
        self.last_stats = PlanStats {
            released,
            ..PlanStats::default()
        };
    }

    fn layout_of(&self, old: &ViewportState<F::Cell>) -> Layout {
        Layout::from_keys(
            old.range,
            old.target_size,
            old.cells.keys().copied(),
            &old.hidden,
        )
    }

    /// Hand `cell`, last shown at `index`, to the pool, or tear it down
    /// when the pool is full.
    pub fn release(&mut self, index: usize, cell: F::Cell) {
        if let Some(rejected) = self.pool.insert(index, cell) {
            self.factory.teardown(rejected);
        }
    }

    fn acquire(&mut self, index: usize, item: ItemOf<F>) -> Result<Acquired<F::Cell>> {
        if let Some(mut cell) = self.pool.take(&index).or_else(|| self.pool.take_any()) {
            cell.set_item(item);
            return Ok(Acquired {
                index,
                cell,
                pooled: true,
            });
        }
        match self.factory.create(item) {
            Some(cell) => Ok(Acquired {
                index,
                cell,
                pooled: false,
            }),
            None => Err(ViewportError::FactoryExhausted { index }),
        }
    }

    fn rollback(&mut self, acquired: Vec<Acquired<F::Cell>>) {
        for Acquired {
            index,
            cell,
            pooled,
        } in acquired
        {
            if pooled {
                self.release(index, cell);
            } else {
                self.factory.teardown(cell);
            }
        }
    }

    fn execute<Src>(
        &mut self,
        plan: Plan,
        old: &mut ViewportState<F::Cell>,
        kind: UpdateKind,
        window: &Window,
        source: &Src,
    ) -> Result<ViewportState<F::Cell>>
    where
        Src: ItemSource<Item = ItemOf<F>> + ?Sized,
    {
        let _span = vflow_core::debug_span!("reconcile", kind = kind.as_str()).entered();

        let old_keys: BTreeSet<usize> = old.cells.keys().copied().collect();
        let plan = match plan.validate(&old_keys) {
            Ok(()) => plan,
            Err(violation) => {
                if cfg!(debug_assertions) {
                    panic!("cell mapping invariant violated: {violation}");
                }
                vflow_core::warn!(%violation, "cell mapping invariant violated; rebuilding");
                Plan::rebuild(window, old_keys.iter().copied())
            }
        };

        let stats = plan.stats();
        let hidden: BTreeSet<usize> = plan
            .slots
            .iter()
            .filter(|(_, p)| p.flags.contains(SlotFlags::HIDDEN))
            .map(|(&index, _)| index)
            .collect();

        if plan.is_identity(old.range) {
            self.last_stats = stats;
            vflow_core::trace!(cells = old.len(), "identity plan");
            return Ok(ViewportState {
                range: plan.range,
                cells: old.take_cells(),
                target_size: plan.target_size,
                kind,
                cells_changed: false,
                hidden,
            });
        }

        // Acquire.
        let len = source.len();
        let mut items = BTreeMap::new();
        for (&index, placement) in &plan.slots {
            if placement.flags.contains(SlotFlags::ITEM_STALE) {
                let item = source
                    .get(index)
                    .ok_or(ViewportError::MissingItem { index, len })?;
                items.insert(index, item);
            }
        }
        let mut acquired = Vec::with_capacity(stats.created);
        for (&index, placement) in &plan.slots {
            if placement.slot != Slot::New {
                continue;
            }
            let Some(item) = items.remove(&index) else {
                continue;
            };
            match self.acquire(index, item) {
                Ok(cell) => acquired.push(cell),
                Err(err) => {
                    self.rollback(acquired);
                    return Err(err);
                }
            }
        }
        let mut fresh: BTreeMap<usize, F::Cell> =
            acquired.into_iter().map(|a| (a.index, a.cell)).collect();

        // Commit.
        let mut old_cells = old.take_cells();
        let mut cells = BTreeMap::new();
        for (index, placement) in plan.slots {
            let cell = match placement.slot {
                Slot::Old(from) => old_cells.remove(&from).map(|mut cell| {
                    if placement.flags.contains(SlotFlags::INDEX_CHANGED) {
                        cell.set_index(index);
                    }
                    if let Some(item) = items.remove(&index) {
                        cell.set_item(item);
                    }
                    cell
                }),
                Slot::New => fresh.remove(&index).map(|mut cell| {
                    cell.set_index(index);
                    cell
                }),
            };
            if let Some(cell) = cell {
                cells.insert(index, cell);
            }
        }
        for old_index in plan.released {
            if let Some(cell) = old_cells.remove(&old_index) {
                self.release(old_index, cell);
            }
        }
        if !old_cells.is_empty() {
            vflow_core::warn!(count = old_cells.len(), "releasing orphaned cells");
            for (old_index, cell) in old_cells {
                self.release(old_index, cell);
            }
        }

        vflow_core::trace!(
            kept = stats.kept,
            shifted = stats.shifted,
            rebound = stats.rebound,
            carried = stats.carried,
            created = stats.created,
            released = stats.released,
            "reconciled"
        );
        self.last_stats = stats;
        Ok(ViewportState {
            range: plan.range,
            cells,
            target_size: plan.target_size,
            kind,
            cells_changed: stats.cells_changed(),
            hidden,
        })
    }
}

impl<F: CellFactory> fmt::Debug for Reconciler<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reconciler")
            .field("pooled", &self.pool.len())
            .field("pool_capacity", &self.pool.capacity())
            .field("last_stats", &self.last_stats)
            .finish_non_exhaustive()
    }
}

fn plan_step(layout: &mut Layout, record: &ChangeRecord, len_after: usize, window: &Window) {
    match record {
        ChangeRecord::Permutation(_) => layout.permute(),
        ChangeRecord::Replace { from, changed, .. } => layout.replace(*from, changed, window),
        ChangeRecord::Insert { from, count } => layout.insert(*from, *count, window),
        ChangeRecord::Remove { indices } => layout.remove(indices, len_after, window),
    }
}
