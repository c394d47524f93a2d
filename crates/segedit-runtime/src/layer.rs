#![forbid(unsafe_code)]

//! Segmentation layer: the state tools read and write.

use std::cell::RefCell;
use std::rc::Rc;

use segedit_core::{RepresentativePolicy, SegmentId, SegmentIdLayout};
use tracing::debug;
use web_time::Instant;

use crate::config::ToolConfig;
use crate::graph::GraphConnection;
use crate::graph_state::SegmentationGraphState;
use crate::reactive::Observable;
use crate::scheduler::FrameScheduler;
use crate::status::StatusMessages;

/// Shared handle to a layer. Tools keep one for their whole lifetime.
pub type LayerHandle = Rc<SegmentationLayer>;

pub struct SegmentationLayer {
    name: String,
    graph: Rc<SegmentationGraphState>,
    hovered_base_segment: Observable<Option<SegmentId>>,
    connection: RefCell<Option<Rc<dyn GraphConnection>>>,
    status_messages: RefCell<StatusMessages>,
    scheduler: FrameScheduler,
    config: ToolConfig,
    id_layout: SegmentIdLayout,
}

impl std::fmt::Debug for SegmentationLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SegmentationLayer")
            .field("name", &self.name)
            .field("hovered_base_segment", &self.hovered_base_segment.get())
            .field("connected", &self.is_connected())
            .field("id_layout", &self.id_layout)
            .finish_non_exhaustive()
    }
}

impl SegmentationLayer {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let config = ToolConfig::default();
        Self {
            name: name.into(),
            graph: Rc::new(SegmentationGraphState::new()),
            hovered_base_segment: Observable::new(None),
            connection: RefCell::new(None),
            status_messages: RefCell::new(StatusMessages::new(config.status_message_duration)),
            scheduler: FrameScheduler::new(),
            config,
            id_layout: SegmentIdLayout::FLAT,
        }
    }

    /// Share `scheduler` with other layers so one frame drives them all.
    #[must_use]
    pub fn with_scheduler(mut self, scheduler: FrameScheduler) -> Self {
        self.scheduler = scheduler;
        self
    }

    #[must_use]
    pub fn with_config(mut self, config: ToolConfig) -> Self {
        self.config = config;
        self.status_messages = RefCell::new(StatusMessages::new(config.status_message_duration));
        self
    }

    #[must_use]
    pub fn with_id_layout(mut self, layout: SegmentIdLayout) -> Self {
        self.id_layout = layout;
        self
    }

    #[must_use]
    pub fn with_policy(mut self, policy: RepresentativePolicy) -> Self {
        self.graph = Rc::new(SegmentationGraphState::with_policy(policy));
        self
    }

    #[must_use]
    pub fn into_handle(self) -> LayerHandle {
        Rc::new(self)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn graph(&self) -> &Rc<SegmentationGraphState> {
        &self.graph
    }

    /// Base segment currently under the pointer.
    #[must_use]
    pub fn hovered_base_segment(&self) -> &Observable<Option<SegmentId>> {
        &self.hovered_base_segment
    }

    pub fn set_hovered(&self, base: Option<SegmentId>) -> bool {
        self.hovered_base_segment.set(base)
    }

    #[must_use]
    pub fn connection(&self) -> Option<Rc<dyn GraphConnection>> {
        self.connection.borrow().clone()
    }

    pub fn set_connection(&self, connection: Option<Rc<dyn GraphConnection>>) {
        debug!(layer = %self.name, attached = connection.is_some(), "graph connection changed");
        *self.connection.borrow_mut() = connection;
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connection
            .borrow()
            .as_ref()
            .is_some_and(|connection| connection.is_connected())
    }

    #[must_use]
    pub fn scheduler(&self) -> &FrameScheduler {
        &self.scheduler
    }

    #[must_use]
    pub fn config(&self) -> &ToolConfig {
        &self.config
    }

    #[must_use]
    pub fn id_layout(&self) -> SegmentIdLayout {
        self.id_layout
    }

    /// Post a transient message that expires after the configured lifetime.
    pub fn show_status(&self, text: impl Into<String>) {
        self.show_status_at(text, Instant::now());
    }

    pub fn show_status_at(&self, text: impl Into<String>, now: Instant) {
        let text = text.into();
        debug!(layer = %self.name, message = %text, "status message");
        self.status_messages.borrow_mut().show_temporary(text, now);
    }

    /// Drop expired messages. Returns how many were removed.
    pub fn tick_status(&self, now: Instant) -> usize {
        self.status_messages.borrow_mut().tick(now)
    }

    /// Current messages, oldest first.
    #[must_use]
    pub fn status_messages(&self) -> Vec<String> {
        self.status_messages
            .borrow()
            .messages()
            .map(str::to_owned)
            .collect()
    }
}
