#![forbid(unsafe_code)]

//! Value-less event broadcast.
//!
//! [`Signal<E>`] is the event counterpart of [`Observable`](super::Observable):
//! it holds no current value and every [`emit`](Signal::emit) reaches all live
//! subscribers, even when the payload repeats. Tool `changed` channels and the
//! binder's input stream are signals.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use super::Subscription;

type Handler<E> = Rc<dyn Fn(&E)>;

/// Shared broadcast channel. Clones share subscribers.
pub struct Signal<E = ()> {
    handlers: Rc<RefCell<Vec<Weak<dyn Fn(&E)>>>>,
}

impl<E> Clone for Signal<E> {
    fn clone(&self) -> Self {
        Self {
            handlers: Rc::clone(&self.handlers),
        }
    }
}

impl<E> Default for Signal<E> {
    fn default() -> Self {
        Self {
            handlers: Rc::new(RefCell::new(Vec::new())),
        }
    }
}

impl<E> std::fmt::Debug for Signal<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("subscriber_count", &self.handlers.borrow().len())
            .finish()
    }
}

impl<E: 'static> Signal<E> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler; dropping the returned guard unregisters it.
    pub fn subscribe(&self, handler: impl Fn(&E) + 'static) -> Subscription {
        let strong: Handler<E> = Rc::new(handler);
        self.handlers.borrow_mut().push(Rc::downgrade(&strong));
        Subscription::new(strong)
    }

    /// Deliver `event` to every live handler in registration order.
    ///
    /// Handlers registered during delivery first see the next emit.
    pub fn emit(&self, event: &E) {
        let live: Vec<Handler<E>> = {
            let mut handlers = self.handlers.borrow_mut();
            handlers.retain(|w| w.strong_count() > 0);
            handlers.iter().filter_map(Weak::upgrade).collect()
        };
        for handler in &live {
            handler(event);
        }
    }

    /// Number of registered handlers (including dead ones not yet pruned).
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.handlers.borrow().len()
    }
}

impl Signal<()> {
    /// Emit the unit event.
    pub fn notify(&self) {
        self.emit(&());
    }
}
