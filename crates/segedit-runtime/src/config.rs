#![forbid(unsafe_code)]

//! Timing configuration for tool sessions.
//!
//! # Environment Variables
//!
//! | Variable | Type | Default | Description |
//! |----------|------|---------|-------------|
//! | `SEGEDIT_DEACTIVATE_DEBOUNCE_MS` | u64 | 100 | Delay between key release or focus loss and tool deactivation |
//! | `SEGEDIT_STATUS_MESSAGE_MS` | u64 | 2000 | Lifetime of transient commit messages |
//!
//! # Example
//!
//! ```bash
//! # Keep a tool active a little longer after the key comes up
//! export SEGEDIT_DEACTIVATE_DEBOUNCE_MS=250
//! ```

use web_time::Duration;

/// Default delay before a released tool key deactivates its tool.
pub const DEFAULT_DEACTIVATE_DEBOUNCE_MS: u64 = 100;
/// Default lifetime of a transient status message.
pub const DEFAULT_STATUS_MESSAGE_MS: u64 = 2000;

const MIN_DEACTIVATE_DEBOUNCE_MS: u64 = 10;
const MAX_DEACTIVATE_DEBOUNCE_MS: u64 = 1000;
const MIN_STATUS_MESSAGE_MS: u64 = 250;
const MAX_STATUS_MESSAGE_MS: u64 = 30_000;

/// Timing knobs shared by the binder and the tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolConfig {
    /// Delay between a key release (or focus loss) and deactivation.
    /// Default: 100ms.
    pub deactivate_debounce: Duration,

    /// How long a commit success or failure message stays visible.
    /// Default: 2s.
    pub status_message_duration: Duration,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            deactivate_debounce: Duration::from_millis(DEFAULT_DEACTIVATE_DEBOUNCE_MS),
            status_message_duration: Duration::from_millis(DEFAULT_STATUS_MESSAGE_MS),
        }
    }
}

impl ToolConfig {
    #[must_use]
    pub fn with_deactivate_debounce(mut self, delay: Duration) -> Self {
        self.deactivate_debounce = delay;
        self
    }

    #[must_use]
    pub fn with_status_message_duration(mut self, duration: Duration) -> Self {
        self.status_message_duration = duration;
        self
    }

    /// Load configuration from environment variables.
    ///
    /// Unparseable values fall back to the defaults. Values are clamped
    /// to valid ranges.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(val) = lookup("SEGEDIT_DEACTIVATE_DEBOUNCE_MS")
            && let Ok(ms) = val.trim().parse::<u64>()
        {
            config.deactivate_debounce = Duration::from_millis(ms);
        }

        if let Some(val) = lookup("SEGEDIT_STATUS_MESSAGE_MS")
            && let Ok(ms) = val.trim().parse::<u64>()
        {
            config.status_message_duration = Duration::from_millis(ms);
        }

        config.validated()
    }

    /// Clamp values to safe ranges.
    ///
    /// - `deactivate_debounce` clamped to 10-1000ms
    /// - `status_message_duration` clamped to 250-30000ms
    #[must_use]
    pub fn validated(mut self) -> Self {
        let debounce_ms = self.deactivate_debounce.as_millis() as u64;
        self.deactivate_debounce = Duration::from_millis(
            debounce_ms.clamp(MIN_DEACTIVATE_DEBOUNCE_MS, MAX_DEACTIVATE_DEBOUNCE_MS),
        );

        let message_ms = self.status_message_duration.as_millis() as u64;
        self.status_message_duration =
            Duration::from_millis(message_ms.clamp(MIN_STATUS_MESSAGE_MS, MAX_STATUS_MESSAGE_MS));

        self
    }
}
