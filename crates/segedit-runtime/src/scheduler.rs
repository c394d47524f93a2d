#![forbid(unsafe_code)]

//! Per-frame coalescing of deferred work.
//!
//! Pointer motion can change the hovered segment many times between two
//! rendered frames. Tools do not recompute on every change; they request a
//! keyed task on the [`FrameScheduler`] and the host runs all pending tasks
//! once per frame with [`FrameScheduler::run_frame`].
//!
//! # Invariants
//!
//! 1. At most one task is pending per key. A second request for the same key
//!    replaces the queued task but keeps its original position.
//! 2. Tasks run in the order their keys were first requested.
//! 3. Tasks requested while a frame is running are deferred to the next frame.
//! 4. A cancelled key never runs until it is requested again.
//!
//! # Failure Modes
//!
//! - **Task panics during a frame**: the remaining tasks still run; the first
//!   panic is re-raised after the frame completes.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use tracing::{debug_span, trace};

/// A deferred unit of work.
pub type FrameTask = Box<dyn FnOnce()>;

/// Key identifying one pending slot on a scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameKey(u64);

struct PendingTask {
    key: FrameKey,
    task: FrameTask,
}

#[derive(Default)]
struct SchedulerInner {
    pending: RefCell<Vec<PendingTask>>,
    next_key: Cell<u64>,
    frames: Cell<u64>,
}

/// Shared keyed queue drained once per frame. Clones share the queue.
#[derive(Clone, Default)]
pub struct FrameScheduler {
    inner: Rc<SchedulerInner>,
}

impl std::fmt::Debug for FrameScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameScheduler")
            .field("pending", &self.pending_count())
            .field("frames", &self.inner.frames.get())
            .finish()
    }
}

impl FrameScheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh key unique to this scheduler.
    pub fn next_key(&self) -> FrameKey {
        let raw = self.inner.next_key.get();
        self.inner.next_key.set(raw.wrapping_add(1));
        FrameKey(raw)
    }

    /// Queue `task` under `key` for the next frame.
    ///
    /// Returns `true` if the key was newly queued, `false` if an already
    /// pending task for the key was replaced.
    pub fn request(&self, key: FrameKey, task: impl FnOnce() + 'static) -> bool {
        let mut pending = self.inner.pending.borrow_mut();
        if let Some(entry) = pending.iter_mut().find(|entry| entry.key == key) {
            entry.task = Box::new(task);
            false
        } else {
            pending.push(PendingTask {
                key,
                task: Box::new(task),
            });
            true
        }
    }

    /// Drop the pending task for `key`, if any. Returns whether one existed.
    pub fn cancel(&self, key: FrameKey) -> bool {
        let mut pending = self.inner.pending.borrow_mut();
        let before = pending.len();
        pending.retain(|entry| entry.key != key);
        pending.len() != before
    }

    #[must_use]
    pub fn is_pending(&self, key: FrameKey) -> bool {
        self.inner
            .pending
            .borrow()
            .iter()
            .any(|entry| entry.key == key)
    }

    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.inner.pending.borrow().len()
    }

    /// Number of frames that ran at least one task.
    #[must_use]
    pub fn frames_run(&self) -> u64 {
        self.inner.frames.get()
    }

    /// Run every task pending at the start of the frame. Returns how many ran.
    pub fn run_frame(&self) -> usize {
        let tasks = std::mem::take(&mut *self.inner.pending.borrow_mut());
        if tasks.is_empty() {
            return 0;
        }
        let count = tasks.len();
        self.inner.frames.set(self.inner.frames.get() + 1);
        let _span = debug_span!("segedit.frame", tasks = count).entered();

        let mut first_panic: Option<Box<dyn std::any::Any + Send>> = None;
        for PendingTask { key, task } in tasks {
            trace!(key = key.0, "running frame task");
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(task));
            if let Err(payload) = result
                && first_panic.is_none()
            {
                first_panic = Some(payload);
            }
        }

        if let Some(payload) = first_panic {
            std::panic::resume_unwind(payload);
        }
        count
    }
}

/// A single-slot handle on a [`FrameScheduler`].
///
/// Scheduling twice before the frame runs keeps one task. Dropping the
/// debouncer cancels whatever is pending, so a tool session that ends
/// never recomputes afterwards.
#[derive(Debug)]
pub struct FrameDebouncer {
    scheduler: FrameScheduler,
    key: FrameKey,
}

impl FrameDebouncer {
    #[must_use]
    pub fn new(scheduler: &FrameScheduler) -> Self {
        Self {
            key: scheduler.next_key(),
            scheduler: scheduler.clone(),
        }
    }

    pub fn schedule(&self, task: impl FnOnce() + 'static) -> bool {
        self.scheduler.request(self.key, task)
    }

    pub fn cancel(&self) -> bool {
        self.scheduler.cancel(self.key)
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.scheduler.is_pending(self.key)
    }
}

impl Drop for FrameDebouncer {
    fn drop(&mut self) {
        self.scheduler.cancel(self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder() -> (Rc<RefCell<Vec<&'static str>>>, impl Fn(&'static str) -> FrameTask) {
        let log: Rc<RefCell<Vec<&'static str>>> = Rc::default();
        let log_clone = Rc::clone(&log);
        let make = move |label: &'static str| -> FrameTask {
            let log = Rc::clone(&log_clone);
            Box::new(move || log.borrow_mut().push(label))
        };
        (log, make)
    }

    #[test]
    fn same_key_coalesces_latest_wins() {
        let scheduler = FrameScheduler::new();
        let (log, make) = recorder();
        let a = scheduler.next_key();
        let b = scheduler.next_key();

        assert!(scheduler.request(a, make("a1")));
        assert!(scheduler.request(b, make("b1")));
        assert!(!scheduler.request(a, make("a2")));
        assert_eq!(scheduler.pending_count(), 2);

        assert_eq!(scheduler.run_frame(), 2);
        assert_eq!(*log.borrow(), vec!["a2", "b1"]);
        assert_eq!(scheduler.frames_run(), 1);
    }

    #[test]
    fn cancel_removes_pending_task() {
        let scheduler = FrameScheduler::new();
        let (log, make) = recorder();
        let key = scheduler.next_key();
        scheduler.request(key, make("x"));
        assert!(scheduler.cancel(key));
        assert!(!scheduler.cancel(key));
        assert_eq!(scheduler.run_frame(), 0);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn requests_during_frame_run_next_frame() {
        let scheduler = FrameScheduler::new();
        let (log, make) = recorder();
        let key = scheduler.next_key();
        let inner = scheduler.clone();
        let follow_up = make("second");
        let first = make("first");
        scheduler.request(key, move || {
            first();
            inner.request(key, follow_up);
        });

        assert_eq!(scheduler.run_frame(), 1);
        assert_eq!(*log.borrow(), vec!["first"]);
        assert_eq!(scheduler.run_frame(), 1);
        assert_eq!(*log.borrow(), vec!["first", "second"]);
    }

    #[test]
    fn dropping_debouncer_cancels() {
        let scheduler = FrameScheduler::new();
        let (log, make) = recorder();
        let debouncer = FrameDebouncer::new(&scheduler);
        debouncer.schedule(make("a"));
        debouncer.schedule(make("b"));
        assert!(debouncer.is_pending());
        drop(debouncer);
        assert_eq!(scheduler.run_frame(), 0);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn panicking_task_does_not_starve_others() {
        let scheduler = FrameScheduler::new();
        let (log, make) = recorder();
        scheduler.request(scheduler.next_key(), || panic!("boom"));
        scheduler.request(scheduler.next_key(), make("after"));

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| scheduler.run_frame()));
        assert!(result.is_err());
        assert_eq!(*log.borrow(), vec!["after"]);
    }
}
