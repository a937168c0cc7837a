#![forbid(unsafe_code)]

//! Tracing integration tests.
//!
//! Reconcile spans and events enabled:
//!   cargo test -p vflow-viewport --features tracing --test tracing_tests
//!
//! Zero-overhead verification (no feature):
//!   cargo test -p vflow-viewport --test tracing_tests -- zero_overhead

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use vflow_viewport::{BufferSize, Cell, FnFactory, ObservableVec, Viewport, ViewportConfig};

// ============================================================================
// Test Infrastructure
// ============================================================================

/// A captured span or event with its fields and parent span.
#[derive(Debug, Clone)]
#[cfg_attr(not(feature = "tracing"), allow(dead_code))]
struct Captured {
    name: String,
    level: tracing::Level,
    fields: HashMap<String, String>,
    parent_name: Option<String>,
}

/// A tracing Layer that records new spans and events.
struct SpanCapture {
    spans: Arc<Mutex<Vec<Captured>>>,
    events: Arc<Mutex<Vec<Captured>>>,
}

/// Handle to read what was captured.
struct CaptureHandle {
    spans: Arc<Mutex<Vec<Captured>>>,
    events: Arc<Mutex<Vec<Captured>>>,
}

impl CaptureHandle {
    fn spans(&self) -> Vec<Captured> {
        self.spans.lock().unwrap().clone()
    }

    fn events(&self) -> Vec<Captured> {
        self.events.lock().unwrap().clone()
    }

    #[cfg_attr(not(feature = "tracing"), allow(dead_code))]
    fn events_with_message(&self, message: &str) -> Vec<Captured> {
        self.events()
            .into_iter()
            .filter(|e| e.fields.get("message").is_some_and(|m| m == message))
            .collect()
    }
}

/// Visitor that extracts fields.
struct FieldVisitor(Vec<(String, String)>);

impl tracing::field::Visit for FieldVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.0.push((field.name().to_string(), format!("{value:?}")));
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.0.push((field.name().to_string(), value.to_string()));
    }

    fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
        self.0.push((field.name().to_string(), value.to_string()));
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.0.push((field.name().to_string(), value.to_string()));
    }
}

fn current_span_name<S>(ctx: &tracing_subscriber::layer::Context<'_, S>) -> Option<String>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    ctx.current_span()
        .id()
        .and_then(|id| ctx.span(id))
        .map(|span_ref| span_ref.name().to_string())
}

impl<S> tracing_subscriber::Layer<S> for SpanCapture
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(
        &self,
        attrs: &tracing::span::Attributes<'_>,
        _id: &tracing::span::Id,
        ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        let mut visitor = FieldVisitor(Vec::new());
        attrs.record(&mut visitor);
        self.spans.lock().unwrap().push(Captured {
            name: attrs.metadata().name().to_string(),
            level: *attrs.metadata().level(),
            fields: visitor.0.into_iter().collect(),
            parent_name: current_span_name(&ctx),
        });
    }

    fn on_event(&self, event: &tracing::Event<'_>, ctx: tracing_subscriber::layer::Context<'_, S>) {
        let mut visitor = FieldVisitor(Vec::new());
        event.record(&mut visitor);
        self.events.lock().unwrap().push(Captured {
            name: event.metadata().name().to_string(),
            level: *event.metadata().level(),
            fields: visitor.0.into_iter().collect(),
            parent_name: current_span_name(&ctx),
        });
    }
}

/// Set up a tracing subscriber with capture and run a closure.
fn with_captured_spans<F>(f: F) -> CaptureHandle
where
    F: FnOnce(),
{
    let spans = Arc::new(Mutex::new(Vec::new()));
    let events = Arc::new(Mutex::new(Vec::new()));
    let layer = SpanCapture {
        spans: spans.clone(),
        events: events.clone(),
    };
    let subscriber = tracing_subscriber::registry().with(layer);
    tracing::subscriber::with_default(subscriber, f);
    CaptureHandle { spans, events }
}

// ============================================================================
// Fixtures
// ============================================================================

#[derive(Debug)]
struct Row {
    index: usize,
    item: u32,
}

impl Cell for Row {
    type Item = u32;

    fn set_index(&mut self, index: usize) {
        self.index = index;
    }

    fn set_item(&mut self, item: u32) {
        self.item = item;
    }
}

fn row(item: u32) -> Option<Row> {
    Some(Row { index: 0, item })
}

/// Init, one scroll and one mutation on a ten-row viewport.
fn exercise_viewport() {
    let config = ViewportConfig::default().with_buffer(BufferSize::Exact(0));
    let items: ObservableVec<u32> = (0..100).collect();
    let mut vp = Viewport::new(items, FnFactory::new(row), config).unwrap();
    vp.apply_geometry(9.0, 1.0, BufferSize::Exact(0)).unwrap();
    vp.apply_scroll(5.0).unwrap();
    vp.items_mut().set(7, 700);
    vp.sync_source().unwrap();
    assert_eq!(vp.current_state().get(7).map(|r| r.item), Some(700));
}

#[cfg_attr(not(feature = "tracing"), allow(dead_code))]
fn reconcile_kinds(spans: &[Captured]) -> Vec<String> {
    spans
        .iter()
        .filter(|s| s.name == "reconcile")
        .filter_map(|s| s.fields.get("kind").cloned())
        .collect()
}

// ============================================================================
// Unit Tests
// ============================================================================

/// One reconcile span per transition, tagged with the transition kind.
#[test]
#[cfg(feature = "tracing")]
fn reconcile_span_per_transition() {
    let handle = with_captured_spans(exercise_viewport);

    let kinds = reconcile_kinds(&handle.spans());
    assert_eq!(kinds, vec!["init", "scroll", "change"], "got {kinds:?}");
    for span in handle.spans().iter().filter(|s| s.name == "reconcile") {
        assert_eq!(span.level, tracing::Level::DEBUG);
        assert_eq!(span.parent_name, None);
    }
}

/// The stats event is emitted inside the reconcile span with reuse counts.
#[test]
#[cfg(feature = "tracing")]
fn reconciled_event_reports_cell_counts() {
    let handle = with_captured_spans(exercise_viewport);

    let reconciled = handle.events_with_message("reconciled");
    assert_eq!(reconciled.len(), 3);
    assert!(
        reconciled
            .iter()
            .all(|e| e.parent_name.as_deref() == Some("reconcile"))
    );

    // Init creates all ten rows.
    assert_eq!(reconciled[0].fields.get("created").map(String::as_str), Some("10"));
    // Scrolling by five keeps five rows and rebinds the other five.
    assert_eq!(reconciled[1].fields.get("kept").map(String::as_str), Some("5"));
    assert_eq!(reconciled[1].fields.get("rebound").map(String::as_str), Some("5"));
    assert_eq!(reconciled[1].fields.get("created").map(String::as_str), Some("0"));
    // Replacing one item touches nothing else.
    assert_eq!(reconciled[2].fields.get("created").map(String::as_str), Some("0"));
    assert_eq!(reconciled[2].fields.get("released").map(String::as_str), Some("0"));
}

/// Unchanged scrolls take the fast path and log it at trace level.
#[test]
#[cfg(feature = "tracing")]
fn unchanged_scroll_is_traced() {
    let handle = with_captured_spans(|| {
        let config = ViewportConfig::default().with_buffer(BufferSize::Exact(0));
        let items: ObservableVec<u32> = (0..100).collect();
        let mut vp = Viewport::new(items, FnFactory::new(row), config).unwrap();
        vp.apply_geometry(9.0, 1.0, BufferSize::Exact(0)).unwrap();
        assert!(!vp.apply_scroll(0.5).unwrap());
    });

    let unchanged = handle.events_with_message("range unchanged");
    assert_eq!(unchanged.len(), 1);
    assert_eq!(unchanged[0].level, tracing::Level::TRACE);
    assert_eq!(unchanged[0].fields.get("range").map(String::as_str), Some("[0, 9]"));
}

/// Events that disagree with the source fall back to a rebuild with a warning.
#[test]
#[cfg(feature = "tracing")]
fn inconsistent_events_warn() {
    let handle = with_captured_spans(|| {
        let config = ViewportConfig::default().with_buffer(BufferSize::Exact(0));
        let items: Vec<u32> = (0..50).collect();
        let mut vp = Viewport::new(items, FnFactory::new(row), config).unwrap();
        vp.apply_geometry(9.0, 1.0, BufferSize::Exact(0)).unwrap();
        vp.apply_mutation([vflow_viewport::ListEvent::Added { at: 0, count: 3 }])
            .unwrap();
        assert_eq!(vp.current_state().range().len(), 10);
    });

    let warnings: Vec<_> = handle
        .events()
        .into_iter()
        .filter(|e| e.level == tracing::Level::WARN)
        .collect();
    assert_eq!(warnings.len(), 1, "got {warnings:?}");
    assert_eq!(warnings[0].fields.get("expected").map(String::as_str), Some("53"));
    assert_eq!(warnings[0].fields.get("actual").map(String::as_str), Some("50"));
}

/// Each layout pass reports whether the laid-out range moved.
#[test]
#[cfg(feature = "tracing")]
fn layout_reports_relayout() {
    let handle = with_captured_spans(exercise_viewport);

    let layouts = handle.events_with_message("layout");
    let relayout: Vec<_> = layouts
        .iter()
        .map(|e| e.fields.get("relayout").map(String::as_str))
        .collect();
    // Init and the scroll move the range; replacing an item does not.
    assert_eq!(relayout, vec![Some("true"), Some("true"), Some("false")]);
    assert!(layouts.iter().all(|e| e.level == tracing::Level::TRACE));
}

/// Coalescing in the core crate is visible through the same subscriber.
#[test]
#[cfg(feature = "tracing")]
fn coalesced_batches_are_logged() {
    let handle = with_captured_spans(exercise_viewport);

    let batches = handle.events_with_message("coalesced list events");
    assert!(!batches.is_empty());
    let last = batches.last().unwrap();
    assert_eq!(last.fields.get("raw_events").map(String::as_str), Some("1"));
    assert_eq!(last.fields.get("len_after").map(String::as_str), Some("100"));
}

/// Without `--features tracing` the macros expand to nothing, so the
/// subscriber sees no engine spans or events at all.
#[test]
fn zero_overhead_when_disabled() {
    let handle = with_captured_spans(exercise_viewport);

    #[cfg(feature = "tracing")]
    {
        assert!(!reconcile_kinds(&handle.spans()).is_empty());
    }

    #[cfg(not(feature = "tracing"))]
    {
        assert!(
            handle.spans().is_empty(),
            "no spans expected without the tracing feature"
        );
        assert!(handle.events().is_empty());
    }
}
