#![forbid(unsafe_code)]

//! Errors raised by the runtime.
//!
//! [`ToolError`] covers binding and restoring tools and is returned to the
//! caller. [`CommitError`] comes from a [`GraphConnection`](crate::GraphConnection)
//! and never escapes a commit task; it ends up as a status message.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ToolError>;

/// Errors raised while binding or restoring tools.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolError {
    #[error("invalid tool type: {tag:?}")]
    InvalidToolType { tag: String },

    #[error("malformed tool state: {detail}")]
    Malformed { detail: String },

    #[error("invalid tool key {key:?}: expected a single uppercase letter A-Z")]
    InvalidKey { key: String },

    #[error("invalid segment id: {value}")]
    InvalidSegmentId { value: String },
}

impl ToolError {
    #[must_use]
    pub fn malformed(detail: impl Into<String>) -> Self {
        Self::Malformed {
            detail: detail.into(),
        }
    }

    #[must_use]
    pub fn invalid_key(key: impl Into<String>) -> Self {
        Self::InvalidKey { key: key.into() }
    }
}

/// Why a merge or split could not be committed by the graph backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommitError {
    #[error("{0}")]
    Rejected(String),

    #[error("graph connection is not available")]
    Disconnected,
}

/// Parse a tool key: exactly one uppercase ASCII letter.
pub fn parse_key(raw: &str) -> Result<char> {
    let mut chars = raw.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_uppercase() => Ok(c),
        _ => Err(ToolError::invalid_key(raw)),
    }
}

/// Check a key already held as a `char`.
pub fn validate_key(key: char) -> Result<char> {
    if key.is_ascii_uppercase() {
        Ok(key)
    } else {
        Err(ToolError::invalid_key(key.to_string()))
    }
}
