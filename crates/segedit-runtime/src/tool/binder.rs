#![forbid(unsafe_code)]

//! Application-wide key bindings and the single active tool.
//!
//! # Design
//!
//! [`ToolBinder`] owns every bound tool. Holding a bound letter key
//! activates its tool; releasing the key or losing focus schedules a
//! deactivation `deactivate_debounce` later, which [`ToolBinder::tick`]
//! fires once due. Pressing the key again before then keeps the tool
//! active.
//!
//! # Invariants
//!
//! 1. At most one tool is active.
//! 2. A tool removed from its key is deactivated first, then dropped.
//! 3. Every binding belongs to exactly one [`LayerBindings`] owner.
//! 4. A bound tool's `changed` signal is re-emitted on its owner's and the
//!    binder's `changed` signals for as long as it stays bound.
//! 5. No binder borrow is held while a tool runs, so `changed` listeners can
//!    read and serialize bindings.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

use segedit_core::{Event, Modifiers};
use tracing::{debug, info};
use web_time::Instant;

use super::commit::CommitTask;
use super::layer_binder::LayerBindings;
use super::{Tool, ToolAction};
use crate::activation::ActivationContext;
use crate::config::ToolConfig;
use crate::error::{Result, validate_key};
use crate::reactive::{Signal, Subscription};

/// An input event with the time it was received.
#[derive(Debug, Clone, PartialEq)]
pub struct TimedEvent {
    pub event: Event,
    pub at: Instant,
}

/// What [`ToolBinder::handle_event`] did with an event.
pub enum BinderResponse {
    /// Nothing bound to the event.
    Ignored,
    /// The tool bound to this key is active.
    Activated(char),
    /// The active tool performed an action; a commit may be pending.
    Action {
        action: ToolAction,
        commit: Option<CommitTask>,
    },
}

impl std::fmt::Debug for BinderResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ignored => f.write_str("Ignored"),
            Self::Activated(key) => f.debug_tuple("Activated").field(key).finish(),
            Self::Action { action, commit } => f
                .debug_struct("Action")
                .field("action", action)
                .field("commit", &commit.is_some())
                .finish(),
        }
    }
}

struct Binding {
    tool: Rc<dyn Tool>,
    owner: Rc<LayerBindings>,
    _forward: Subscription,
}

struct ActiveTool {
    key: char,
    context: ActivationContext,
}

pub struct ToolBinder {
    bindings: RefCell<BTreeMap<char, Binding>>,
    active: RefCell<Option<ActiveTool>>,
    pending_deactivate: Rc<Cell<Option<Instant>>>,
    input: Signal<TimedEvent>,
    changed: Signal<()>,
    config: ToolConfig,
}

impl std::fmt::Debug for ToolBinder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolBinder")
            .field("keys", &self.keys())
            .field("active", &self.active_key())
            .field("pending_deactivate", &self.pending_deactivate.get())
            .finish()
    }
}

impl Default for ToolBinder {
    fn default() -> Self {
        Self::new(ToolConfig::default())
    }
}

impl ToolBinder {
    #[must_use]
    pub fn new(config: ToolConfig) -> Self {
        Self {
            bindings: RefCell::new(BTreeMap::new()),
            active: RefCell::new(None),
            pending_deactivate: Rc::new(Cell::new(None)),
            input: Signal::new(),
            changed: Signal::new(),
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &ToolConfig {
        &self.config
    }

    /// Fires whenever a binding is added, replaced, or removed, and whenever
    /// a bound tool reports a change.
    #[must_use]
    pub fn changed(&self) -> &Signal<()> {
        &self.changed
    }

    /// Every event passed to [`handle_event`](Self::handle_event).
    #[must_use]
    pub fn input(&self) -> &Signal<TimedEvent> {
        &self.input
    }

    /// Bind `tool` to `key` on behalf of `owner`, or unbind with `None`.
    ///
    /// The previous occupant of `key` is deactivated if active and dropped.
    pub fn set(&self, owner: &Rc<LayerBindings>, key: char, tool: Option<Box<dyn Tool>>) -> Result<()> {
        let key = validate_key(key)?;
        if self.active_key() == Some(key) {
            self.deactivate();
        }

        let bound = tool.is_some();
        let binding = tool.map(|tool| self.binding(owner, Rc::from(tool)));
        let previous = {
            let mut bindings = self.bindings.borrow_mut();
            match binding {
                Some(binding) => bindings.insert(key, binding),
                None => bindings.remove(&key),
            }
        };
        if !bound && previous.is_none() {
            return Ok(());
        }

        let previous_owner = previous.as_ref().map(|binding| Rc::clone(&binding.owner));
        if let Some(binding) = previous {
            debug!(%key, tool = binding.tool.tool_type(), "tool unbound");
            drop(binding);
        }
        if let Some(previous_owner) = previous_owner.filter(|prev| !Rc::ptr_eq(prev, owner)) {
            previous_owner.remove_key(key);
            previous_owner.changed().notify();
        }
        if bound {
            owner.insert_key(key);
        } else {
            owner.remove_key(key);
        }
        owner.changed().notify();
        self.changed.notify();
        Ok(())
    }

    fn binding(&self, owner: &Rc<LayerBindings>, tool: Rc<dyn Tool>) -> Binding {
        let layer_changed = owner.changed().clone();
        let binder_changed = self.changed.clone();
        let forward = tool.changed().subscribe(move |_| {
            layer_changed.notify();
            binder_changed.notify();
        });
        Binding {
            tool,
            owner: Rc::clone(owner),
            _forward: forward,
        }
    }

    /// Shared handle to the tool bound to `key`. The bindings borrow ends
    /// before the handle is returned.
    fn tool(&self, key: char) -> Option<Rc<dyn Tool>> {
        self.bindings
            .borrow()
            .get(&key)
            .map(|binding| Rc::clone(&binding.tool))
    }

    /// Unbind and drop the tool bound to `key`, deactivating it first if
    /// active. Returns whether a tool was bound.
    pub fn destroy_tool(&self, key: char) -> bool {
        let Some(owner) = self
            .bindings
            .borrow()
            .get(&key)
            .map(|binding| Rc::clone(&binding.owner))
        else {
            return false;
        };
        self.set(&owner, key, None).is_ok()
    }

    /// Activate the tool bound to `key`.
    ///
    /// Without a binding the current tool is deactivated. Activating the
    /// already active tool cancels a pending deactivation.
    pub fn activate(&self, key: char) -> bool {
        let Some(tool) = self.tool(key) else {
            self.deactivate();
            return false;
        };
        if self.active_key() == Some(key) {
            self.pending_deactivate.set(None);
            return true;
        }
        self.deactivate();

        let mut context = ActivationContext::new();
        tool.activate(&mut context);
        info!(%key, tool = tool.tool_type(), "tool activated");

        let pending = Rc::clone(&self.pending_deactivate);
        let delay = self.config.deactivate_debounce;
        context.register_subscription(self.input.subscribe(move |timed: &TimedEvent| {
            let ends_session = match &timed.event {
                Event::Key(key_event) => key_event.is_release() && key_event.letter() == Some(key),
                Event::Focus(focused) => !focused,
                Event::Mouse(_) => false,
            };
            if ends_session {
                pending.set(Some(timed.at + delay));
            }
        }));

        *self.active.borrow_mut() = Some(ActiveTool { key, context });
        true
    }

    /// Deactivate the active tool, if any. Returns whether one was active.
    pub fn deactivate(&self) -> bool {
        self.pending_deactivate.set(None);
        let Some(mut active) = self.active.borrow_mut().take() else {
            return false;
        };
        active.context.dispose();
        if let Some(tool) = self.tool(active.key) {
            tool.deactivate();
            info!(key = %active.key, tool = tool.tool_type(), "tool deactivated");
        }
        true
    }

    /// Fire a due deactivation. Returns whether it fired.
    pub fn tick(&self, now: Instant) -> bool {
        match self.pending_deactivate.get() {
            Some(deadline) if now >= deadline => {
                debug!("debounced deactivation due");
                self.deactivate()
            }
            _ => false,
        }
    }

    /// Deadline of the scheduled deactivation, if any.
    #[must_use]
    pub fn pending_deactivation(&self) -> Option<Instant> {
        self.pending_deactivate.get()
    }

    /// Route one input event received at `now`.
    ///
    /// Plain or shifted presses of a bound letter activate its tool; mouse
    /// presses go through the active tool's input event map. Every event is
    /// then published on [`input`](Self::input).
    pub fn handle_event(&self, event: Event, now: Instant) -> BinderResponse {
        let response = match &event {
            Event::Key(key_event)
                if !key_event.is_release()
                    && (key_event.modifiers - Modifiers::SHIFT).is_empty() =>
            {
                match key_event.letter() {
                    Some(letter) if self.bindings.borrow().contains_key(&letter) => {
                        self.activate(letter);
                        BinderResponse::Activated(letter)
                    }
                    _ => BinderResponse::Ignored,
                }
            }
            Event::Mouse(_) => {
                let action = self
                    .with_active_tool(|tool| tool.input_event_map().and_then(|map| map.lookup(&event)))
                    .flatten();
                match action {
                    Some(action) => BinderResponse::Action {
                        action,
                        commit: self.dispatch_action(action),
                    },
                    None => BinderResponse::Ignored,
                }
            }
            _ => BinderResponse::Ignored,
        };
        self.input.emit(&TimedEvent { event, at: now });
        response
    }

    /// Have the active tool perform `action`.
    pub fn dispatch_action(&self, action: ToolAction) -> Option<CommitTask> {
        let key = self.active_key()?;
        let tool = self.tool(key)?;
        debug!(%key, ?action, "dispatching tool action");
        tool.perform(action)
    }

    #[must_use]
    pub fn active_key(&self) -> Option<char> {
        self.active.borrow().as_ref().map(|active| active.key)
    }

    #[must_use]
    pub fn is_active(&self, key: char) -> bool {
        self.active_key() == Some(key)
    }

    /// Bound keys, sorted.
    #[must_use]
    pub fn keys(&self) -> Vec<char> {
        self.bindings.borrow().keys().copied().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.borrow().is_empty()
    }

    /// Run `f` with the tool bound to `key`.
    pub fn with_tool<R>(&self, key: char, f: impl FnOnce(&dyn Tool) -> R) -> Option<R> {
        let tool = self.tool(key)?;
        Some(f(tool.as_ref()))
    }

    /// Run `f` with the active tool.
    pub fn with_active_tool<R>(&self, f: impl FnOnce(&dyn Tool) -> R) -> Option<R> {
        let key = self.active_key()?;
        self.with_tool(key, f)
    }
}

impl Drop for ToolBinder {
    fn drop(&mut self) {
        self.deactivate();
        let bindings = std::mem::take(&mut *self.bindings.borrow_mut());
        for (key, binding) in bindings {
            binding.owner.remove_key(key);
        }
    }
}
