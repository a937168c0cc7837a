//! Benchmarks for viewport reconciliation.
//!
//! Run with: cargo bench -p vflow-viewport --bench reconcile_bench

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;
use vflow_viewport::{
    BufferSize, Cell, FnFactory, Grid, ObservableVec, Viewport, ViewportConfig,
};

struct Row {
    index: usize,
    item: u64,
}

impl Cell for Row {
    type Item = u64;

    fn set_index(&mut self, index: usize) {
        self.index = index;
    }

    fn set_item(&mut self, item: u64) {
        self.item = item;
    }
}

fn row(item: u64) -> Option<Row> {
    Some(Row { index: 0, item })
}

fn config() -> ViewportConfig {
    ViewportConfig::default()
        .with_buffer(BufferSize::Medium)
        .with_pool_capacity(16)
}

// =============================================================================
// Scrolling
// =============================================================================

fn bench_scroll(c: &mut Criterion) {
    let mut group = c.benchmark_group("reconcile/scroll");

    for extent in [20.0, 60.0, 200.0] {
        let items: ObservableVec<u64> = (0..100_000).collect();
        let mut vp = Viewport::new(items, FnFactory::new(row), config()).unwrap();
        vp.apply_geometry(extent, 1.0, BufferSize::Medium).unwrap();
        group.throughput(Throughput::Elements(vp.current_state().len() as u64));

        // Small steps keep most cells in place.
        let mut offset = 0.0;
        group.bench_with_input(BenchmarkId::new("step", extent), &(), |b, _| {
            b.iter(|| {
                offset = (offset + 3.0) % 90_000.0;
                black_box(vp.apply_scroll(offset).unwrap());
            })
        });

        // Jumps rebind every cell.
        let mut jump = 0.0;
        group.bench_with_input(BenchmarkId::new("jump", extent), &(), |b, _| {
            b.iter(|| {
                jump = (jump + 5_003.0) % 90_000.0;
                black_box(vp.apply_scroll(jump).unwrap());
            })
        });

        // Unchanged range: fast path.
        group.bench_with_input(BenchmarkId::new("unchanged", extent), &(), |b, _| {
            b.iter(|| black_box(vp.apply_scroll(jump + 0.25).unwrap()))
        });
    }

    group.finish();
}

// =============================================================================
// List mutations
// =============================================================================

fn bench_mutations(c: &mut Criterion) {
    let mut group = c.benchmark_group("reconcile/mutation");

    let items: ObservableVec<u64> = (0..10_000).collect();
    let mut vp = Viewport::new(items, FnFactory::new(row), config()).unwrap();
    vp.apply_geometry(40.0, 1.0, BufferSize::Medium).unwrap();
    vp.apply_scroll(5_000.0).unwrap();

    group.bench_function("insert_above", |b| {
        b.iter(|| {
            vp.items_mut().insert(10, 0);
            vp.items_mut().remove(10);
            black_box(vp.sync_source().unwrap());
        })
    });

    group.bench_function("replace_visible", |b| {
        let mut value = 0;
        b.iter(|| {
            value += 1;
            vp.items_mut().set(5_010, value);
            black_box(vp.sync_source().unwrap());
        })
    });

    group.bench_function("swap_visible", |b| {
        b.iter(|| {
            vp.items_mut().swap(5_005, 5_020);
            black_box(vp.sync_source().unwrap());
        })
    });

    group.bench_function("remove_insert_batch", |b| {
        b.iter(|| {
            let removed = vp.items_mut().remove_range(5_002..5_008);
            vp.items_mut().insert_many(5_030, removed);
            black_box(vp.sync_source().unwrap());
        })
    });

    group.finish();
}

// =============================================================================
// Planning without committing
// =============================================================================

fn bench_plan_only(c: &mut Criterion) {
    let mut group = c.benchmark_group("reconcile/plan");

    for columns in [1usize, 4, 12] {
        let items: ObservableVec<u64> = (0..100_000).collect();
        let mut vp = Viewport::with_shape(
            items,
            FnFactory::new(row),
            config().with_unit_size(10.0),
            Grid::new(columns),
        )
        .unwrap();
        vp.apply_geometry(400.0, 10.0, BufferSize::Medium).unwrap();
        let state = vp.current_state();
        let far = state.range().shift_by(37 * columns as isize);
        group.throughput(Throughput::Elements(state.len() as u64));

        let window = *vp.window();
        let target = vflow_viewport::Window { range: far, ..window };
        group.bench_with_input(BenchmarkId::new("scroll", columns), &target, |b, target| {
            b.iter(|| black_box(vp.reconciler().plan_scroll(state, target).stats()))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_scroll, bench_mutations, bench_plan_only);
criterion_main!(benches);
