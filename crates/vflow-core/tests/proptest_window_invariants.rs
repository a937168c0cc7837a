//! Property-based invariant tests for window computation.
//!
//! 1. The window never reaches past the list.
//! 2. The window holds `min(target_size, len)` indices for flat lists.
//! 3. The first visible index lies inside the window.
//! 4. The visible range is a subset of the window.
//! 5. Grid windows start and end on row boundaries (except the last row).
//! 6. Paged windows cover exactly one page of visible indices.
//! 7. No panics on extreme or non-finite geometry.

use proptest::prelude::*;
use vflow_core::{
    BufferSize, Geometry, Grid, HiddenCellPolicy, IndexShape, Visibility, WindowCalculator,
    WindowMode,
};

// ── Helpers ─────────────────────────────────────────────────────────────

fn geometry_strategy() -> impl Strategy<Value = Geometry> {
    (1.0f64..2_000.0, 1.0f64..80.0, 0.0f64..100_000.0)
        .prop_map(|(extent, unit, offset)| Geometry::new(300.0, extent, unit).with_offset(0.0, offset))
}

fn buffer_strategy() -> impl Strategy<Value = BufferSize> {
    prop_oneof![
        Just(BufferSize::Small),
        Just(BufferSize::Medium),
        Just(BufferSize::Big),
        (0usize..6).prop_map(BufferSize::Exact),
    ]
}

// ═════════════════════════════════════════════════════════════════════════
// 1/2. Bounded by the list, complete when the list is long enough
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn flat_window_is_bounded_and_complete(
        g in geometry_strategy(),
        buffer in buffer_strategy(),
        len in 1usize..5_000,
    ) {
        let calc = WindowCalculator::new().with_buffer(buffer);
        let w = calc.compute(&g, len);
        prop_assert!(w.range.is_valid());
        prop_assert!(w.range.max() < len);
        prop_assert_eq!(w.range.len(), w.target_size.min(len));
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 3/4. First visible and visible range sit inside the window
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn visible_is_inside_window(
        g in geometry_strategy(),
        buffer in buffer_strategy(),
        len in 1usize..5_000,
    ) {
        let calc = WindowCalculator::new().with_buffer(buffer);
        let w = calc.compute(&g, len);
        prop_assert!(w.range.contains(w.first_visible));
        prop_assert_eq!(w.visible.min(), w.first_visible);
        for index in w.visible.iter() {
            prop_assert!(w.range.contains(index));
            prop_assert_eq!(w.classify(index), Visibility::Visible);
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 5. Grid windows align to rows
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn grid_window_aligns_to_rows(
        g in geometry_strategy(),
        columns in 1usize..12,
        len in 1usize..5_000,
    ) {
        let shape = Grid::new(columns);
        let w = WindowCalculator::with_shape(shape).compute(&g, len);
        prop_assert_eq!(w.range.min() % columns, 0);
        prop_assert!(w.range.max() == len - 1 || (w.range.max() + 1) % columns == 0);
        let lines = shape.line_range(w.range).len();
        prop_assert_eq!(lines, w.lines_needed.min(shape.lines(len)));
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 6. Paged windows
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn paged_window_covers_one_page(
        cpp in 1usize..30,
        page in 0usize..50,
        len in 1usize..500,
        dispose in any::<bool>(),
    ) {
        let policy = if dispose { HiddenCellPolicy::Dispose } else { HiddenCellPolicy::KeepHidden };
        let calc = WindowCalculator::new()
            .with_mode(WindowMode::Paged { cells_per_page: cpp, page })
            .with_hidden_policy(policy);
        let w = calc.compute(&Geometry::default(), len);
        let max_page = calc.max_page(len);
        let page = page.clamp(1, max_page);

        prop_assert_eq!(w.visible.min(), (page - 1) * cpp);
        prop_assert!(w.visible.len() <= cpp);
        prop_assert!(w.range.max() < len);
        prop_assert_eq!(w.range.max(), w.visible.max());
        if dispose {
            prop_assert_eq!(w.range, w.visible);
        } else {
            prop_assert_eq!(w.range.len(), cpp.min(len));
        }
        prop_assert_eq!(calc.page_of(w.first_visible), page);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 7. No panics on extreme geometry
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn extreme_geometry_never_panics(
        extent in prop_oneof![Just(f64::NAN), Just(f64::INFINITY), Just(-1.0), Just(f64::MAX), 0.0f64..1e12],
        unit in prop_oneof![Just(f64::NAN), Just(0.0), Just(f64::MIN_POSITIVE), 1e-3f64..1e6],
        offset in prop_oneof![Just(f64::NAN), Just(f64::NEG_INFINITY), Just(f64::MAX), 0.0f64..1e12],
        len in 0usize..1_000_000,
    ) {
        let calc = WindowCalculator::new().with_buffer(BufferSize::Big);
        let g = Geometry::new(10.0, extent, unit).with_offset(0.0, offset);
        let w = calc.compute(&g, len);
        if w.range.is_valid() {
            prop_assert!(w.range.max() < len);
        }
        let max = calc.max_scroll(&g, len);
        prop_assert!(max >= 0.0);
        let _ = calc.clamp_offset(&g, len, offset);
        let _ = calc.scroll_translation(&g);
    }
}
