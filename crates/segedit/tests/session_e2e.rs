#![forbid(unsafe_code)]

//! E2E test: a host loop driving a [`Session`].
//!
//! Covers:
//! (1) Bindings restored from stored JSON text
//! (2) Merge preview and commit driven only by events and frames
//! (3) Debounced deactivation and status expiry reported per frame
//!
//! Run:
//!   cargo test -p segedit --test session_e2e

use std::rc::Rc;

use futures_executor::LocalPool;
use segedit::prelude::*;
use segedit::{OverlaySelection, Recovery};
use web_time::{Duration, Instant};

fn at(t0: Instant, ms: u64) -> Instant {
    t0 + Duration::from_millis(ms)
}

#[test]
fn host_loop_merges_and_cleans_up() {
    let mut session = Session::default();
    let (layer, bindings) = session.add_layer("cells");
    let graph = MemoryGraphConnection::new(Rc::clone(layer.graph()));
    graph.add_supervoxel(SegmentId(10), SegmentId(100));
    graph.add_supervoxel(SegmentId(20), SegmentId(200));
    layer.set_connection(Some(Rc::new(graph)));
    session
        .load_bindings(&bindings, r#"{"M": "mergeSegments", "S": "splitSegments"}"#)
        .unwrap();

    let t0 = Instant::now();
    assert!(matches!(
        session.handle_event(Event::key_press('m'), t0),
        BinderResponse::Activated('M')
    ));

    layer.set_hovered(Some(SegmentId(10)));
    session.handle_event(Event::mouse_down(MouseButton::Right), at(t0, 1));
    layer.set_hovered(Some(SegmentId(20)));
    assert_eq!(session.frame(at(t0, 2)).tasks, 1);
    assert_eq!(
        layer.graph().visible_roots(layer.graph().selection()),
        vec![SegmentId(100), SegmentId(200)]
    );

    let BinderResponse::Action {
        action: ToolAction::Trigger,
        commit: Some(task),
    } = session.handle_event(Event::mouse_down(MouseButton::Left), at(t0, 3))
    else {
        panic!("expected a merge commit");
    };
    let mut pool = LocalPool::new();
    assert_eq!(pool.run_until(task), CommitOutcome::Performed);
    assert_eq!(
        layer.graph().resolve(SegmentId(10), OverlaySelection::PERMANENT),
        SegmentId(200)
    );

    session.handle_event(Event::key_release('m'), at(t0, 10));
    let report = session.frame(at(t0, 50));
    assert!(!report.deactivated);
    let report = session.frame(at(t0, 110));
    assert!(report.deactivated);
    assert!(layer.graph().is_temporary_reset());

    assert_eq!(layer.status_messages(), vec!["Merge performed".to_string()]);
    assert_eq!(session.frame(at(t0, 5_000)).expired_messages, 1);
    assert!(layer.status_messages().is_empty());
}

#[test]
fn stored_state_errors_are_recoverable() {
    let mut session = Session::default();
    let (_layer, bindings) = session.add_layer("cells");

    let err = session
        .load_bindings(&bindings, r#"{"m": "mergeSegments"}"#)
        .unwrap_err();
    assert_eq!(err.recovery(), Recovery::DiscardRestoredState);
    assert!(bindings.is_empty());

    session
        .load_bindings(&bindings, r#"{"S": {"type": "splitSegments", "anchor": "10"}}"#)
        .unwrap();
    let saved = Session::save_bindings(&bindings).unwrap().unwrap();
    let saved: serde_json::Value = serde_json::from_str(&saved).unwrap();
    assert_eq!(
        saved,
        serde_json::json!({"S": {"type": "splitSegments", "anchor": "10"}})
    );
}
