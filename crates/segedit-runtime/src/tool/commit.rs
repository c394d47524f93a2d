#![forbid(unsafe_code)]

//! Asynchronous commit of a previewed edit.
//!
//! `trigger` hands the host a [`CommitTask`]. The task awaits the graph
//! backend and turns the outcome into a transient status message; errors
//! never propagate past it. While a task is alive its tool counts as
//! committing and refuses further triggers.

use std::cell::Cell;
use std::rc::Rc;

use futures_util::FutureExt;
use futures_util::future::LocalBoxFuture;
use segedit_core::SegmentId;
use tracing::{Instrument, info, info_span, warn};

use crate::graph::CommitFuture;
use crate::layer::LayerHandle;
use crate::reactive::Signal;

/// Future the host drives to completion on its event loop.
pub type CommitTask = LocalBoxFuture<'static, CommitOutcome>;

/// How a commit ended. Failures are already reported on the layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    Performed,
    Failed(String),
}

impl CommitOutcome {
    #[must_use]
    pub fn is_performed(&self) -> bool {
        matches!(self, Self::Performed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CommitKind {
    Merge,
    Split,
}

impl CommitKind {
    fn name(self) -> &'static str {
        match self {
            Self::Merge => "merge",
            Self::Split => "split",
        }
    }

    fn performed(self) -> &'static str {
        match self {
            Self::Merge => "Merge performed",
            Self::Split => "Split performed",
        }
    }

    fn failed(self, reason: &str) -> String {
        match self {
            Self::Merge => format!("Merge failed: {reason}"),
            Self::Split => format!("Split failed: {reason}"),
        }
    }
}

/// Marks a tool as committing for as long as it lives.
pub(crate) struct CommitGuard {
    committing: Rc<Cell<bool>>,
    changed: Signal<()>,
}

impl CommitGuard {
    pub(crate) fn new(committing: &Rc<Cell<bool>>, changed: &Signal<()>) -> Self {
        committing.set(true);
        changed.notify();
        Self {
            committing: Rc::clone(committing),
            changed: changed.clone(),
        }
    }
}

impl Drop for CommitGuard {
    fn drop(&mut self) {
        self.committing.set(false);
        self.changed.notify();
    }
}

/// Wrap a backend request into a task that reports its outcome on `layer`.
pub(crate) fn commit_task(
    kind: CommitKind,
    layer: LayerHandle,
    anchor: SegmentId,
    other: SegmentId,
    request: CommitFuture,
    guard: CommitGuard,
) -> CommitTask {
    let span = info_span!(
        "segedit.commit",
        op = kind.name(),
        layer = %layer.name(),
        %anchor,
        %other
    );
    async move {
        let _guard = guard;
        match request.await {
            Ok(()) => {
                info!("commit performed");
                layer.show_status(kind.performed());
                CommitOutcome::Performed
            }
            Err(err) => {
                warn!(error = %err, "commit failed");
                let reason = err.to_string();
                layer.show_status(kind.failed(&reason));
                CommitOutcome::Failed(reason)
            }
        }
    }
    .instrument(span)
    .boxed_local()
}
