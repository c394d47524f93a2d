#![forbid(unsafe_code)]

//! Per-layer view of the global tool binder.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

use serde_json::{Map, Value};
use tracing::debug;

use super::Tool;
use super::binder::ToolBinder;
use super::registry::ToolRegistry;
use crate::error::{Result, ToolError, parse_key};
use crate::layer::LayerHandle;
use crate::reactive::Signal;

/// Keys a layer owns in the global binder.
#[derive(Debug, Default)]
pub struct LayerBindings {
    keys: RefCell<BTreeSet<char>>,
    changed: Signal<()>,
}

impl LayerBindings {
    #[must_use]
    pub fn keys(&self) -> Vec<char> {
        self.keys.borrow().iter().copied().collect()
    }

    #[must_use]
    pub fn contains(&self, key: char) -> bool {
        self.keys.borrow().contains(&key)
    }

    #[must_use]
    pub fn changed(&self) -> &Signal<()> {
        &self.changed
    }

    pub(crate) fn insert_key(&self, key: char) {
        self.keys.borrow_mut().insert(key);
    }

    pub(crate) fn remove_key(&self, key: char) {
        self.keys.borrow_mut().remove(&key);
    }
}

/// Bindings of one layer. Mutations go through the shared [`ToolBinder`];
/// dropping the layer binder unbinds every tool it owns.
pub struct LayerToolBinder {
    binder: Rc<ToolBinder>,
    bindings: Rc<LayerBindings>,
    layer: LayerHandle,
}

impl std::fmt::Debug for LayerToolBinder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayerToolBinder")
            .field("layer", &self.layer.name())
            .field("keys", &self.bindings.keys())
            .finish()
    }
}

impl LayerToolBinder {
    #[must_use]
    pub fn new(binder: Rc<ToolBinder>, layer: LayerHandle) -> Self {
        Self {
            binder,
            bindings: Rc::new(LayerBindings::default()),
            layer,
        }
    }

    #[must_use]
    pub fn binder(&self) -> &Rc<ToolBinder> {
        &self.binder
    }

    #[must_use]
    pub fn layer(&self) -> &LayerHandle {
        &self.layer
    }

    /// Fires whenever one of this layer's bindings changes.
    #[must_use]
    pub fn changed(&self) -> &Signal<()> {
        &self.bindings.changed
    }

    /// Keys bound by this layer, sorted.
    #[must_use]
    pub fn keys(&self) -> Vec<char> {
        self.bindings.keys()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.keys.borrow().is_empty()
    }

    /// Bind `tool` to `key`, or unbind with `None`.
    pub fn set(&self, key: char, tool: Option<Box<dyn Tool>>) -> Result<()> {
        self.binder.set(&self.bindings, key, tool)
    }

    /// Unbind `key` if this layer owns it.
    pub fn remove(&self, key: char) -> Result<bool> {
        if !self.bindings.contains(key) {
            return Ok(false);
        }
        self.set(key, None)?;
        Ok(true)
    }

    /// Run `f` with this layer's tool bound to `key`.
    pub fn with_tool<R>(&self, key: char, f: impl FnOnce(&dyn Tool) -> R) -> Option<R> {
        if !self.bindings.contains(key) {
            return None;
        }
        self.binder.with_tool(key, f)
    }

    /// Unbind every tool this layer owns, one key at a time.
    pub fn clear(&self) {
        for key in self.bindings.keys() {
            if let Err(err) = self.binder.set(&self.bindings, key, None) {
                debug!(%key, error = %err, "failed to unbind tool");
            }
        }
    }

    /// `{"<key>": <tool>}` for this layer, or `None` without bindings.
    #[must_use]
    pub fn to_json(&self) -> Option<Value> {
        let mut map = Map::new();
        for key in self.bindings.keys() {
            if let Some(tool) = self.binder.with_tool(key, |tool| tool.to_json()) {
                map.insert(key.to_string(), tool);
            }
        }
        if map.is_empty() {
            None
        } else {
            Some(Value::Object(map))
        }
    }

    /// Replace this layer's bindings with the serialized `state`.
    ///
    /// Every key and tool is validated before anything changes.
    pub fn restore_state(&self, state: &Value, registry: &ToolRegistry) -> Result<()> {
        let Value::Object(entries) = state else {
            return Err(ToolError::malformed(format!(
                "expected an object of tool bindings, got {state}"
            )));
        };
        let mut restored = Vec::with_capacity(entries.len());
        for (raw_key, value) in entries {
            let key = parse_key(raw_key)?;
            let tool = registry.restore_tool(&self.layer, value)?;
            restored.push((key, tool));
        }

        self.clear();
        for (key, tool) in restored {
            self.set(key, Some(tool))?;
        }
        debug!(layer = %self.layer.name(), keys = ?self.keys(), "restored tool bindings");
        Ok(())
    }
}

impl Drop for LayerToolBinder {
    fn drop(&mut self) {
        self.clear();
    }
}
