#![forbid(unsafe_code)]

//! Restoring tools from their serialized form.
//!
//! A serialized tool is either a bare tag (`"mergeSegments"`) or an object
//! whose `type` field holds the tag and whose other fields are handed to the
//! factory registered for that tag.

use std::rc::Rc;

use ahash::AHashMap;
use serde_json::{Map, Value};
use tracing::warn;

use super::Tool;
use super::merge::{MERGE_SEGMENTS_TOOL_ID, MergeSegmentsTool};
use super::split::{SPLIT_SEGMENTS_TOOL_ID, SplitSegmentsTool};
use crate::error::{Result, ToolError};
use crate::layer::LayerHandle;

/// Builds a tool for a layer from the fields of its serialized object.
pub type ToolFactory = Rc<dyn Fn(&LayerHandle, &Map<String, Value>) -> Result<Box<dyn Tool>>>;

#[derive(Clone, Default)]
pub struct ToolRegistry {
    factories: AHashMap<String, ToolFactory>,
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut tags: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        tags.sort_unstable();
        f.debug_struct("ToolRegistry").field("tags", &tags).finish()
    }
}

impl ToolRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the merge and split tools.
    #[must_use]
    pub fn with_segmentation_tools() -> Self {
        let mut registry = Self::new();
        registry.register(MERGE_SEGMENTS_TOOL_ID, |layer, options| {
            Ok(Box::new(MergeSegmentsTool::from_options(Rc::clone(layer), options)?))
        });
        registry.register(SPLIT_SEGMENTS_TOOL_ID, |layer, options| {
            Ok(Box::new(SplitSegmentsTool::from_options(Rc::clone(layer), options)?))
        });
        registry
    }

    /// Register `factory` under `tag`. A later registration replaces an
    /// earlier one.
    pub fn register(
        &mut self,
        tag: impl Into<String>,
        factory: impl Fn(&LayerHandle, &Map<String, Value>) -> Result<Box<dyn Tool>> + 'static,
    ) {
        let tag = tag.into();
        if self.factories.contains_key(&tag) {
            warn!(%tag, "replacing registered tool factory");
        }
        self.factories.insert(tag, Rc::new(factory));
    }

    #[must_use]
    pub fn contains(&self, tag: &str) -> bool {
        self.factories.contains_key(tag)
    }

    /// Registered tags, sorted.
    #[must_use]
    pub fn tags(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        tags.sort_unstable();
        tags
    }

    /// Build a tool for `layer` from its serialized form.
    pub fn restore_tool(&self, layer: &LayerHandle, value: &Value) -> Result<Box<dyn Tool>> {
        let empty = Map::new();
        let (tag, options) = match value {
            Value::String(tag) => (tag.as_str(), &empty),
            Value::Object(object) => match object.get("type") {
                Some(Value::String(tag)) => (tag.as_str(), object),
                Some(other) => {
                    return Err(ToolError::malformed(format!(
                        "tool type must be a string, got {other}"
                    )));
                }
                None => return Err(ToolError::malformed("tool object has no \"type\" field")),
            },
            other => {
                return Err(ToolError::malformed(format!(
                    "expected a tool tag or object, got {other}"
                )));
            }
        };
        let factory = self
            .factories
            .get(tag)
            .ok_or_else(|| ToolError::InvalidToolType {
                tag: tag.to_owned(),
            })?;
        factory(layer, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::SegmentationLayer;
    use segedit_core::SegmentId;
    use serde_json::json;

    fn layer() -> LayerHandle {
        SegmentationLayer::new("seg").into_handle()
    }

    #[test]
    fn restores_bare_tags_and_objects() {
        let registry = ToolRegistry::with_segmentation_tools();
        let layer = layer();
        let tool = registry.restore_tool(&layer, &json!("mergeSegments")).unwrap();
        assert_eq!(tool.tool_type(), MERGE_SEGMENTS_TOOL_ID);
        assert_eq!(tool.to_json(), json!("mergeSegments"));

        let tool = registry
            .restore_tool(&layer, &json!({"type": "splitSegments", "anchor": "10"}))
            .unwrap();
        assert_eq!(tool.tool_type(), SPLIT_SEGMENTS_TOOL_ID);
        assert_eq!(tool.to_json(), json!({"type": "splitSegments", "anchor": "10"}));
        assert_eq!(tool.describe(), format!("split segments (anchor {})", SegmentId(10)));
    }

    #[test]
    fn unknown_and_malformed_inputs() {
        let registry = ToolRegistry::with_segmentation_tools();
        let layer = layer();
        assert_eq!(
            registry.restore_tool(&layer, &json!({"type": "bogus"})).unwrap_err(),
            ToolError::InvalidToolType {
                tag: "bogus".into()
            }
        );
        assert!(matches!(
            registry.restore_tool(&layer, &json!(42)).unwrap_err(),
            ToolError::Malformed { .. }
        ));
        assert!(matches!(
            registry.restore_tool(&layer, &json!({"anchor": "1"})).unwrap_err(),
            ToolError::Malformed { .. }
        ));
        assert!(matches!(
            registry.restore_tool(&layer, &json!({"type": 3})).unwrap_err(),
            ToolError::Malformed { .. }
        ));
        assert_eq!(
            registry
                .restore_tool(&layer, &json!({"type": "mergeSegments", "anchor": "abc"}))
                .unwrap_err(),
            ToolError::InvalidSegmentId {
                value: "abc".into()
            }
        );
    }

    #[test]
    fn last_registration_wins() {
        let mut registry = ToolRegistry::with_segmentation_tools();
        registry.register(MERGE_SEGMENTS_TOOL_ID, |layer, _| {
            Ok(Box::new(SplitSegmentsTool::new(Rc::clone(layer))))
        });
        let tool = registry
            .restore_tool(&layer(), &json!("mergeSegments"))
            .unwrap();
        assert_eq!(tool.tool_type(), SPLIT_SEGMENTS_TOOL_ID);
        assert_eq!(registry.tags(), vec!["mergeSegments", "splitSegments"]);
    }
}
