#![forbid(unsafe_code)]

//! Unified error model and recovery actions.
//!
//! # Design Principles
//!
//! 1. **Typed per subsystem**: restoring tools fails with a
//!    [`ToolError`], decoding stored state with a JSON error, and checking a
//!    split with a [`SplitPartitionError`].
//! 2. **Recoverable by default**: every variant maps to a [`Recovery`] the
//!    host applies instead of shutting down. Editing never needs to stop
//!    because a stored binding was bad.

use segedit_core::SplitPartitionError;
use segedit_runtime::ToolError;

/// Top-level error type for segedit hosts.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A serialized tool or binding could not be restored.
    #[error(transparent)]
    Tool(#[from] ToolError),
    /// Stored state is not valid JSON.
    #[error("invalid tool state json: {0}")]
    Json(#[from] serde_json::Error),
    /// A split result does not partition its group.
    #[error(transparent)]
    Split(#[from] SplitPartitionError),
}

/// Standard result type for segedit APIs.
pub type Result<T> = std::result::Result<T, Error>;

/// What the host should do after an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    /// Report the error and continue with the current state.
    KeepRunning,
    /// Drop the state that failed to load; the previous bindings stay.
    DiscardRestoredState,
}

impl Error {
    /// Determine the recovery action for this error.
    #[must_use]
    pub fn recovery(&self) -> Recovery {
        match self {
            Self::Tool(ToolError::InvalidToolType { .. })
            | Self::Tool(ToolError::Malformed { .. })
            | Self::Tool(ToolError::InvalidKey { .. })
            | Self::Tool(ToolError::InvalidSegmentId { .. })
            | Self::Json(_) => Recovery::DiscardRestoredState,
            Self::Split(_) => Recovery::KeepRunning,
        }
    }

    /// Whether the error came from restoring serialized state.
    #[must_use]
    pub fn is_restore_error(&self) -> bool {
        self.recovery() == Recovery::DiscardRestoredState
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn restore_failures_discard_state() {
        let err = Error::from(ToolError::InvalidToolType {
            tag: "bogus".into(),
        });
        assert_eq!(err.recovery(), Recovery::DiscardRestoredState);
        assert_eq!(err.to_string(), "invalid tool type: \"bogus\"");

        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = Error::from(json_err);
        assert!(err.is_restore_error());
        assert!(err.to_string().starts_with("invalid tool state json: "));
    }

    #[test]
    fn split_errors_keep_running() {
        let err = Error::from(SplitPartitionError::EmptySide);
        assert_eq!(err.recovery(), Recovery::KeepRunning);
        assert!(!err.is_restore_error());
    }
}
