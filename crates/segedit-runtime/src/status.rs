#![forbid(unsafe_code)]

//! Tool status lines and transient layer messages.

use std::fmt;

use web_time::{Duration, Instant};

/// Two-line status shown while a tool is active.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ToolStatus {
    pub header: String,
    pub body: String,
}

impl ToolStatus {
    #[must_use]
    pub fn new(header: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            body: body.into(),
        }
    }
}

impl fmt::Display for ToolStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\n{}", self.header, self.body)
    }
}

/// A message that disappears at `expires_at`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub text: String,
    pub expires_at: Instant,
}

/// Transient notifications, newest last.
#[derive(Debug, Clone)]
pub struct StatusMessages {
    lifetime: Duration,
    messages: Vec<StatusMessage>,
}

impl StatusMessages {
    #[must_use]
    pub fn new(lifetime: Duration) -> Self {
        Self {
            lifetime,
            messages: Vec::new(),
        }
    }

    #[must_use]
    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    pub fn show_temporary(&mut self, text: impl Into<String>, now: Instant) {
        self.messages.push(StatusMessage {
            text: text.into(),
            expires_at: now + self.lifetime,
        });
    }

    /// Drop expired messages. Returns how many were removed.
    pub fn tick(&mut self, now: Instant) -> usize {
        let before = self.messages.len();
        self.messages.retain(|message| message.expires_at > now);
        before - self.messages.len()
    }

    pub fn messages(&self) -> impl Iterator<Item = &str> + '_ {
        self.messages.iter().map(|message| message.text.as_str())
    }

    #[must_use]
    pub fn latest(&self) -> Option<&str> {
        self.messages.last().map(|message| message.text.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
