#![forbid(unsafe_code)]

//! E2E test: tracing spans emitted by a merge session.
//!
//! Covers:
//! (1) Preview recomputes run inside `segedit.tool.recompute`, nested in
//!     `segedit.frame` when coalesced by the scheduler
//! (2) Commits run inside `segedit.commit` with op, layer, and both ids
//! (3) Backend and outcome events are parented to the commit span
//!
//! Run:
//!   cargo test -p segedit-runtime --test commit_tracing

use std::collections::HashMap;
use std::rc::Rc;
use std::sync::{Arc, Mutex};

use futures_executor::block_on;
use segedit_core::SegmentId;
use segedit_runtime::{
    LayerToolBinder, MemoryGraphConnection, MergeSegmentsTool, SegmentationLayer, ToolAction,
    ToolBinder,
};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;

// ============================================================================
// Tracing Capture Infrastructure
// ============================================================================

#[derive(Debug, Clone)]
struct CapturedSpan {
    name: String,
    fields: HashMap<String, String>,
    parent_name: Option<String>,
}

#[derive(Debug, Clone)]
struct CapturedEvent {
    level: tracing::Level,
    message: Option<String>,
    parent_span_name: Option<String>,
}

struct SessionCapture {
    spans: Arc<Mutex<Vec<CapturedSpan>>>,
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

struct FieldVisitor(Vec<(String, String)>);

impl tracing::field::Visit for FieldVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.0.push((field.name().to_string(), format!("{value:?}")));
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.0.push((field.name().to_string(), value.to_string()));
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.0.push((field.name().to_string(), value.to_string()));
    }
}

impl<S> tracing_subscriber::Layer<S> for SessionCapture
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(
        &self,
        attrs: &tracing::span::Attributes<'_>,
        id: &tracing::span::Id,
        ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        let mut visitor = FieldVisitor(Vec::new());
        attrs.record(&mut visitor);

        let parent_name = ctx.span_scope(id).and_then(|mut scope| {
            scope.next(); // skip self
            scope.next().map(|parent| parent.name().to_string())
        });

        self.spans.lock().unwrap().push(CapturedSpan {
            name: attrs.metadata().name().to_string(),
            fields: visitor.0.into_iter().collect(),
            parent_name,
        });
    }

    fn on_event(&self, event: &tracing::Event<'_>, ctx: tracing_subscriber::layer::Context<'_, S>) {
        let mut visitor = FieldVisitor(Vec::new());
        event.record(&mut visitor);
        let fields: HashMap<String, String> = visitor.0.into_iter().collect();

        self.events.lock().unwrap().push(CapturedEvent {
            level: *event.metadata().level(),
            message: fields.get("message").cloned(),
            parent_span_name: ctx.event_span(event).map(|span| span.name().to_string()),
        });
    }
}

fn with_session_capture<F>(f: F) -> (Vec<CapturedSpan>, Vec<CapturedEvent>)
where
    F: FnOnce(),
{
    let spans = Arc::new(Mutex::new(Vec::new()));
    let events = Arc::new(Mutex::new(Vec::new()));
    let layer = SessionCapture {
        spans: Arc::clone(&spans),
        events: Arc::clone(&events),
    };
    let subscriber = tracing_subscriber::registry()
        .with(tracing_subscriber::filter::LevelFilter::TRACE)
        .with(layer);
    tracing::subscriber::with_default(subscriber, f);
    let s = spans.lock().unwrap().clone();
    let e = events.lock().unwrap().clone();
    (s, e)
}

// ============================================================================
// Session
// ============================================================================

fn run_merge_session(reject: Option<&str>) {
    let layer = SegmentationLayer::new("cells").into_handle();
    let graph = MemoryGraphConnection::new(Rc::clone(layer.graph()));
    graph.add_supervoxel(SegmentId(10), SegmentId(100));
    graph.add_supervoxel(SegmentId(20), SegmentId(200));
    if let Some(reason) = reject {
        graph.reject_next(reason);
    }
    layer.set_connection(Some(Rc::new(graph)));

    let binder = Rc::new(ToolBinder::default());
    let bindings = LayerToolBinder::new(Rc::clone(&binder), Rc::clone(&layer));
    bindings
        .set('M', Some(Box::new(MergeSegmentsTool::new(Rc::clone(&layer)))))
        .unwrap();

    binder.activate('M');
    layer.set_hovered(Some(SegmentId(10)));
    binder.dispatch_action(ToolAction::SetAnchor);
    layer.set_hovered(Some(SegmentId(20)));
    layer.scheduler().run_frame();

    let task = binder
        .dispatch_action(ToolAction::Trigger)
        .expect("merge commit");
    block_on(task);
    binder.deactivate();
}

// ============================================================================
// Tests
// ============================================================================

#[test]
fn recompute_spans_nest_under_frames() {
    let (spans, _events) = with_session_capture(|| run_merge_session(None));

    let recomputes: Vec<&CapturedSpan> = spans
        .iter()
        .filter(|span| span.name == "segedit.tool.recompute")
        .collect();
    assert!(recomputes.len() >= 2, "spans: {spans:#?}");
    assert!(recomputes.iter().all(|span| {
        span.fields.get("tool").map(String::as_str) == Some("mergeSegments")
            && span.fields.get("layer").map(String::as_str) == Some("cells")
    }));
    // The first recompute runs at activation; later ones come from frames.
    assert_eq!(recomputes[0].parent_name, None);
    assert!(
        recomputes[1..]
            .iter()
            .all(|span| span.parent_name.as_deref() == Some("segedit.frame"))
    );
}

#[test]
fn commit_span_carries_request() {
    let (spans, events) = with_session_capture(|| run_merge_session(None));

    let commit = spans
        .iter()
        .find(|span| span.name == "segedit.commit")
        .expect("commit span");
    assert_eq!(commit.fields.get("op").map(String::as_str), Some("merge"));
    assert_eq!(commit.fields.get("layer").map(String::as_str), Some("cells"));
    assert_eq!(commit.fields.get("anchor").map(String::as_str), Some("10"));
    assert_eq!(commit.fields.get("other").map(String::as_str), Some("20"));

    let in_commit: Vec<&str> = events
        .iter()
        .filter(|event| event.parent_span_name.as_deref() == Some("segedit.commit"))
        .filter_map(|event| event.message.as_deref())
        .collect();
    assert!(in_commit.contains(&"merge requested"), "{in_commit:?}");
    assert!(in_commit.contains(&"merged segments"), "{in_commit:?}");
    assert!(in_commit.contains(&"commit performed"), "{in_commit:?}");
}

#[test]
fn failed_commit_warns_inside_span() {
    let (_spans, events) = with_session_capture(|| run_merge_session(Some("stale")));

    let failure = events
        .iter()
        .find(|event| event.message.as_deref() == Some("commit failed"))
        .expect("failure event");
    assert_eq!(failure.level, tracing::Level::WARN);
    assert_eq!(failure.parent_span_name.as_deref(), Some("segedit.commit"));
    assert!(
        !events
            .iter()
            .any(|event| event.message.as_deref() == Some("merged segments"))
    );
}
