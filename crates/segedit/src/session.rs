#![forbid(unsafe_code)]

//! One editing session: a shared binder, registry, and frame scheduler
//! driving any number of segmentation layers.

use std::rc::Rc;

use segedit_core::Event;
use segedit_runtime::{
    BinderResponse, FrameScheduler, LayerHandle, LayerToolBinder, SegmentationLayer, ToolBinder,
    ToolConfig, ToolRegistry,
};
use tracing::debug;
use web_time::Instant;

use crate::error::Result;

/// What one call to [`Session::frame`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameReport {
    /// Coalesced recomputes that ran.
    pub tasks: usize,
    /// Whether a debounced deactivation fired.
    pub deactivated: bool,
    /// Status messages that expired.
    pub expired_messages: usize,
}

pub struct Session {
    config: ToolConfig,
    scheduler: FrameScheduler,
    binder: Rc<ToolBinder>,
    registry: ToolRegistry,
    layers: Vec<SessionLayer>,
}

struct SessionLayer {
    layer: LayerHandle,
    bindings: Rc<LayerToolBinder>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .field("layers", &self.layers.iter().map(|l| l.layer.name()).collect::<Vec<_>>())
            .field("binder", &self.binder)
            .finish()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(ToolConfig::default())
    }
}

impl Session {
    /// Session with the merge and split tools registered.
    #[must_use]
    pub fn new(config: ToolConfig) -> Self {
        Self {
            config,
            scheduler: FrameScheduler::new(),
            binder: Rc::new(ToolBinder::new(config)),
            registry: ToolRegistry::with_segmentation_tools(),
            layers: Vec::new(),
        }
    }

    /// Session configured from `SEGEDIT_*` environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(ToolConfig::from_env())
    }

    #[must_use]
    pub fn config(&self) -> &ToolConfig {
        &self.config
    }

    #[must_use]
    pub fn binder(&self) -> &Rc<ToolBinder> {
        &self.binder
    }

    #[must_use]
    pub fn scheduler(&self) -> &FrameScheduler {
        &self.scheduler
    }

    #[must_use]
    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Register additional tool factories.
    pub fn registry_mut(&mut self) -> &mut ToolRegistry {
        &mut self.registry
    }

    /// Layers in the order they were added.
    pub fn layers(&self) -> impl Iterator<Item = &LayerHandle> + '_ {
        self.layers.iter().map(|entry| &entry.layer)
    }

    /// The binder view of `layer`, if it belongs to this session.
    #[must_use]
    pub fn layer_bindings(&self, layer: &LayerHandle) -> Option<&Rc<LayerToolBinder>> {
        self.layers
            .iter()
            .find(|entry| Rc::ptr_eq(&entry.layer, layer))
            .map(|entry| &entry.bindings)
    }

    /// Create a layer sharing this session's scheduler and configuration,
    /// together with its view of the binder.
    pub fn add_layer(&mut self, name: impl Into<String>) -> (LayerHandle, Rc<LayerToolBinder>) {
        let layer = SegmentationLayer::new(name)
            .with_scheduler(self.scheduler.clone())
            .with_config(self.config)
            .into_handle();
        let bindings = Rc::new(LayerToolBinder::new(
            Rc::clone(&self.binder),
            Rc::clone(&layer),
        ));
        self.layers.push(SessionLayer {
            layer: Rc::clone(&layer),
            bindings: Rc::clone(&bindings),
        });
        debug!(layer = %layer.name(), "layer added");
        (layer, bindings)
    }

    /// Remove `layer` and unbind every tool it owns.
    pub fn remove_layer(&mut self, layer: &LayerHandle) -> bool {
        let Some(index) = self
            .layers
            .iter()
            .position(|entry| Rc::ptr_eq(&entry.layer, layer))
        else {
            return false;
        };
        let entry = self.layers.remove(index);
        entry.bindings.clear();
        debug!(layer = %layer.name(), "layer removed");
        true
    }

    /// Route one input event received at `now`.
    pub fn handle_event(&self, event: Event, now: Instant) -> BinderResponse {
        self.binder.handle_event(event, now)
    }

    /// Run one frame: coalesced recomputes, due deactivation, and status
    /// message expiry.
    pub fn frame(&self, now: Instant) -> FrameReport {
        let tasks = self.scheduler.run_frame();
        let deactivated = self.binder.tick(now);
        let expired_messages = self.layers().map(|layer| layer.tick_status(now)).sum();
        FrameReport {
            tasks,
            deactivated,
            expired_messages,
        }
    }

    /// Replace the bindings of `bindings` with the JSON in `text`.
    ///
    /// Nothing changes unless every entry restores.
    pub fn load_bindings(&self, bindings: &LayerToolBinder, text: &str) -> Result<()> {
        let state: serde_json::Value = serde_json::from_str(text)?;
        bindings.restore_state(&state, &self.registry)?;
        Ok(())
    }

    /// Serialize the bindings of `bindings`; `None` when it has none.
    pub fn save_bindings(bindings: &LayerToolBinder) -> Result<Option<String>> {
        bindings
            .to_json()
            .map(|state| serde_json::to_string(&state))
            .transpose()
            .map_err(Into::into)
    }
}
