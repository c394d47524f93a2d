#![forbid(unsafe_code)]

//! Interactive tools and the binders that own them.
//!
//! A [`Tool`] is created when it is bound to a key and destroyed when the
//! key is rebound or cleared. While its key is held the binder activates it:
//! the tool receives a fresh [`ActivationContext`] and parks every
//! subscription and cleanup in it. Deactivation disposes the context, which
//! reverts any preview synchronously.
//!
//! Bound tools are shared behind `Rc` and every [`Tool`] method takes
//! `&self`, so tools keep their mutable state in cells. Listeners of a tool's
//! `changed` signal may read the binder while the tool is running.
//!
//! # Module layout
//!
//! - [`anchor`]: anchor state and validation shared by the edit tools.
//! - [`commit`]: the asynchronous commit task returned by `trigger`.
//! - [`merge`] / [`split`]: the concrete segment edit tools.
//! - [`registry`]: restoring tools from JSON.
//! - [`binder`] / [`layer_binder`]: key bindings and the single active tool.

pub mod anchor;
pub mod binder;
pub mod commit;
pub mod layer_binder;
pub mod merge;
pub mod registry;
pub mod split;

use segedit_core::{Event, MouseButton, MouseEventKind};
use serde_json::Value;

use crate::activation::ActivationContext;
use crate::layer::LayerHandle;
use crate::reactive::Signal;
use crate::status::ToolStatus;

pub use anchor::{AnchorState, EditToolState, SegmentRef, ValidatedSegment};
pub use binder::{BinderResponse, TimedEvent, ToolBinder};
pub use commit::{CommitOutcome, CommitTask};
pub use layer_binder::{LayerBindings, LayerToolBinder};
pub use merge::{MERGE_SEGMENTS_TOOL_ID, MergeSegmentsTool, MergeToolState};
pub use registry::{ToolFactory, ToolRegistry};
pub use split::{SPLIT_SEGMENTS_TOOL_ID, SplitSegmentsTool};

/// Action a tool performs in response to input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolAction {
    /// Commit the previewed edit.
    Trigger,
    /// Pin the hovered segment as the anchor.
    SetAnchor,
}

/// Mouse bindings a tool exposes while active.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputEventMap {
    bindings: Vec<(MouseButton, ToolAction)>,
}

impl InputEventMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Primary click triggers, secondary click sets the anchor.
    #[must_use]
    pub fn segment_edit() -> Self {
        Self::new()
            .bind(MouseButton::Left, ToolAction::Trigger)
            .bind(MouseButton::Right, ToolAction::SetAnchor)
    }

    /// Map presses of `button` to `action`, replacing an earlier mapping.
    #[must_use]
    pub fn bind(mut self, button: MouseButton, action: ToolAction) -> Self {
        self.bindings.retain(|(bound, _)| *bound != button);
        self.bindings.push((button, action));
        self
    }

    /// Action for `event`, if it is a mapped button press.
    #[must_use]
    pub fn lookup(&self, event: &Event) -> Option<ToolAction> {
        let Event::Mouse(mouse) = event else {
            return None;
        };
        let MouseEventKind::Down(button) = mouse.kind else {
            return None;
        };
        self.bindings
            .iter()
            .find(|(bound, _)| *bound == button)
            .map(|(_, action)| *action)
    }
}

/// A user-selectable unit of interactive behavior.
///
/// Mutable state lives behind interior mutability.
pub trait Tool {
    /// Tag used in serialized state, e.g. `"mergeSegments"`.
    fn tool_type(&self) -> &'static str;

    fn layer(&self) -> &LayerHandle;

    /// Start a session. Everything acquired goes into `cx`.
    fn activate(&self, cx: &mut ActivationContext);

    /// Called after the session's context was disposed.
    fn deactivate(&self) {}

    #[must_use]
    fn is_active(&self) -> bool;

    /// Commit the current edit. `None` when nothing can be committed.
    fn trigger(&self) -> Option<CommitTask>;

    fn perform(&self, action: ToolAction) -> Option<CommitTask> {
        match action {
            ToolAction::Trigger => self.trigger(),
            ToolAction::SetAnchor => None,
        }
    }

    /// Short human-readable description.
    fn describe(&self) -> String;

    fn to_json(&self) -> Value;

    fn status(&self) -> ToolStatus;

    /// Fires whenever the tool's serialized state or status changes.
    fn changed(&self) -> &Signal<()>;

    fn input_event_map(&self) -> Option<&InputEventMap> {
        None
    }
}

impl std::fmt::Debug for dyn Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tool")
            .field("type", &self.tool_type())
            .field("active", &self.is_active())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use segedit_core::{Event, MouseEvent};

    #[test]
    fn segment_edit_map_routes_clicks() {
        let map = InputEventMap::segment_edit();
        assert_eq!(
            map.lookup(&Event::mouse_down(MouseButton::Left)),
            Some(ToolAction::Trigger)
        );
        assert_eq!(
            map.lookup(&Event::mouse_down(MouseButton::Right)),
            Some(ToolAction::SetAnchor)
        );
        assert_eq!(map.lookup(&Event::mouse_down(MouseButton::Middle)), None);
        assert_eq!(
            map.lookup(&Event::Mouse(MouseEvent::new(MouseEventKind::Up(MouseButton::Left)))),
            None
        );
        assert_eq!(map.lookup(&Event::key_press('M')), None);
    }

    #[test]
    fn rebinding_a_button_replaces_action() {
        let map = InputEventMap::segment_edit().bind(MouseButton::Left, ToolAction::SetAnchor);
        assert_eq!(
            map.lookup(&Event::mouse_down(MouseButton::Left)),
            Some(ToolAction::SetAnchor)
        );
    }
}
