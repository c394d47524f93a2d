//! Property-based invariant tests for the frame scheduler and tool binder.
//!
//! 1. A frame runs exactly one task per pending key, latest request wins.
//! 2. Tasks run in first-request order; cancelled keys never run.
//! 3. At most one bound tool is active after any input sequence.
//! 4. The active key and deactivation deadline follow the press, release,
//!    focus and tick rules.

use std::cell::RefCell;
use std::rc::Rc;

use proptest::prelude::*;
use segedit_core::{Event, SegmentId};
use segedit_runtime::{
    FrameScheduler, LayerToolBinder, MemoryGraphConnection, MergeSegmentsTool, SegmentationLayer,
    SplitSegmentsTool, ToolBinder, ToolConfig,
};
use web_time::{Duration, Instant};

// ── Strategies ────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum SchedulerOp {
    Request(usize, u32),
    Cancel(usize),
}

fn scheduler_ops() -> impl Strategy<Value = Vec<SchedulerOp>> {
    proptest::collection::vec(
        prop_oneof![
            3 => (0usize..4, any::<u32>()).prop_map(|(k, v)| SchedulerOp::Request(k, v)),
            1 => (0usize..4).prop_map(SchedulerOp::Cancel),
        ],
        0..40,
    )
}

#[derive(Debug, Clone)]
enum InputOp {
    Press(char),
    Release(char),
    Blur,
    Advance(u64),
}

const KEYS: [char; 4] = ['M', 'S', 'P', 'Q'];
const DEBOUNCE_MS: u64 = 100;

fn input_ops() -> impl Strategy<Value = Vec<InputOp>> {
    proptest::collection::vec(
        prop_oneof![
            3 => proptest::sample::select(KEYS.to_vec()).prop_map(InputOp::Press),
            2 => proptest::sample::select(KEYS.to_vec()).prop_map(InputOp::Release),
            1 => Just(InputOp::Blur),
            2 => (0u64..=250).prop_map(InputOp::Advance),
        ],
        1..60,
    )
}

// ═════════════════════════════════════════════════════════════════════════
// 1–2. Frame coalescing
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn frame_runs_latest_task_per_key_in_first_request_order(ops in scheduler_ops()) {
        let scheduler = FrameScheduler::new();
        let keys: Vec<_> = (0..4).map(|_| scheduler.next_key()).collect();
        let ran = Rc::new(RefCell::new(Vec::new()));
        let mut model: Vec<(usize, u32)> = Vec::new();

        for op in &ops {
            match *op {
                SchedulerOp::Request(k, v) => {
                    let ran = Rc::clone(&ran);
                    let fresh = scheduler.request(keys[k], move || ran.borrow_mut().push((k, v)));
                    match model.iter_mut().find(|(key, _)| *key == k) {
                        Some(entry) => {
                            prop_assert!(!fresh);
                            entry.1 = v;
                        }
                        None => {
                            prop_assert!(fresh);
                            model.push((k, v));
                        }
                    }
                }
                SchedulerOp::Cancel(k) => {
                    let existed = model.iter().any(|(key, _)| *key == k);
                    prop_assert_eq!(scheduler.cancel(keys[k]), existed);
                    model.retain(|(key, _)| *key != k);
                }
            }
            prop_assert_eq!(scheduler.pending_count(), model.len());
        }

        prop_assert_eq!(scheduler.run_frame(), model.len());
        prop_assert_eq!(&*ran.borrow(), &model);
        prop_assert_eq!(scheduler.pending_count(), 0);
        prop_assert_eq!(scheduler.run_frame(), 0);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 3–4. Binder activation
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn binder_follows_activation_rules(ops in input_ops()) {
        let layer = SegmentationLayer::new("seg").into_handle();
        let graph = MemoryGraphConnection::new(Rc::clone(layer.graph()));
        graph.add_supervoxel(SegmentId(10), SegmentId(100));
        layer.set_connection(Some(Rc::new(graph)));

        let binder = Rc::new(ToolBinder::new(
            ToolConfig::default().with_deactivate_debounce(Duration::from_millis(DEBOUNCE_MS)),
        ));
        let bindings = LayerToolBinder::new(Rc::clone(&binder), Rc::clone(&layer));
        bindings.set('M', Some(Box::new(MergeSegmentsTool::new(Rc::clone(&layer))))).unwrap();
        bindings.set('S', Some(Box::new(SplitSegmentsTool::new(Rc::clone(&layer))))).unwrap();

        let mut now = Instant::now();
        let mut active: Option<char> = None;
        let mut deadline: Option<Instant> = None;

        for op in &ops {
            match *op {
                InputOp::Press(key) => {
                    binder.handle_event(Event::key_press(key), now);
                    if key == 'M' || key == 'S' {
                        active = Some(key);
                        deadline = None;
                    }
                }
                InputOp::Release(key) => {
                    binder.handle_event(Event::key_release(key), now);
                    if active == Some(key) {
                        deadline = Some(now + Duration::from_millis(DEBOUNCE_MS));
                    }
                }
                InputOp::Blur => {
                    binder.handle_event(Event::Focus(false), now);
                    if active.is_some() {
                        deadline = Some(now + Duration::from_millis(DEBOUNCE_MS));
                    }
                }
                InputOp::Advance(ms) => {
                    now += Duration::from_millis(ms);
                    let due = deadline.is_some_and(|at| now >= at);
                    prop_assert_eq!(binder.tick(now), due);
                    if due {
                        active = None;
                        deadline = None;
                    }
                }
            }

            prop_assert_eq!(binder.active_key(), active);
            prop_assert_eq!(binder.pending_deactivation(), deadline);
            let active_tools = ['M', 'S']
                .iter()
                .filter(|key| binder.with_tool(**key, |tool| tool.is_active()) == Some(true))
                .count();
            prop_assert_eq!(active_tools, usize::from(active.is_some()));
        }

        binder.deactivate();
        prop_assert!(layer.graph().is_temporary_reset());
    }
}
