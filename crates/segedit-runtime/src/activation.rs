#![forbid(unsafe_code)]

//! Scoped ownership of everything a tool acquires while active.
//!
//! A tool session registers subscriptions, debouncers, and cleanup closures
//! on an [`ActivationContext`]. Disposing the context releases them in
//! reverse registration order, synchronously, so a view never observes a
//! half-torn-down preview. A context is disposed exactly once; dropping an
//! undisposed context disposes it.

use std::any::Any;

use tracing::trace;

use crate::reactive::Subscription;

enum Resource {
    Subscription(Subscription),
    Guard(Box<dyn Any>),
    Disposer(Box<dyn FnOnce()>),
}

/// LIFO arena of resources owned by one tool session.
#[derive(Default)]
pub struct ActivationContext {
    resources: Vec<Resource>,
    disposed: bool,
}

impl std::fmt::Debug for ActivationContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActivationContext")
            .field("resources", &self.resources.len())
            .field("disposed", &self.disposed)
            .finish()
    }
}

impl ActivationContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep `subscription` alive until the context is disposed.
    pub fn register_subscription(&mut self, subscription: Subscription) {
        self.push(Resource::Subscription(subscription));
    }

    /// Keep an arbitrary guard alive until the context is disposed.
    pub fn hold<T: 'static>(&mut self, guard: T) {
        self.push(Resource::Guard(Box::new(guard)));
    }

    /// Run `disposer` when the context is disposed.
    ///
    /// Disposers registered first run last.
    pub fn register_disposer(&mut self, disposer: impl FnOnce() + 'static) {
        self.push(Resource::Disposer(Box::new(disposer)));
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Release every resource, most recent first. Idempotent.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        trace!(resources = self.resources.len(), "disposing activation context");
        while let Some(resource) = self.resources.pop() {
            match resource {
                Resource::Subscription(subscription) => drop(subscription),
                Resource::Guard(guard) => drop(guard),
                Resource::Disposer(disposer) => disposer(),
            }
        }
    }

    fn push(&mut self, resource: Resource) {
        if self.disposed {
            // A resource arriving after disposal is released at once.
            match resource {
                Resource::Disposer(disposer) => disposer(),
                other => drop(other),
            }
            return;
        }
        self.resources.push(resource);
    }
}

impl Drop for ActivationContext {
    fn drop(&mut self) {
        self.dispose();
    }
}
