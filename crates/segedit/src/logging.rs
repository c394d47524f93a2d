#![forbid(unsafe_code)]

//! Process-wide log output for segedit hosts.
//!
//! The filter comes from `SEGEDIT_LOG` (an `EnvFilter` directive string)
//! and defaults to `segedit=info`. Library crates only emit through
//! `tracing`; nothing is printed until a host calls [`init`].

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Environment variable holding the filter directives.
pub const LOG_ENV: &str = "SEGEDIT_LOG";

/// Directives used when [`LOG_ENV`] is unset or invalid.
pub const DEFAULT_DIRECTIVES: &str = "segedit=info";

/// Output format for log records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// Newline-delimited JSON.
    Json,
}

impl LogFormat {
    /// Parse `text` or `json`, case-insensitively.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "text" => Some(Self::Text),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Json => "json",
        }
    }
}

/// Build the filter from `directives`, falling back to
/// [`DEFAULT_DIRECTIVES`] when they are absent or do not parse.
#[must_use]
pub fn filter_from(directives: Option<&str>) -> EnvFilter {
    directives
        .and_then(|raw| EnvFilter::try_new(raw).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_DIRECTIVES))
}

/// Install the global subscriber. Returns `false` when one is already set.
pub fn init(format: LogFormat) -> bool {
    let directives = std::env::var(LOG_ENV).ok();
    let filter = filter_from(directives.as_deref());
    let installed = match format {
        LogFormat::Text => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .try_init()
            .is_ok(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(false),
            )
            .try_init()
            .is_ok(),
    };
    if installed {
        tracing::info!(format = format.as_str(), "logging initialized");
    }
    installed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_formats() {
        assert_eq!(LogFormat::parse("JSON"), Some(LogFormat::Json));
        assert_eq!(LogFormat::parse(" text "), Some(LogFormat::Text));
        assert_eq!(LogFormat::parse("yaml"), None);
        assert_eq!(LogFormat::default(), LogFormat::Text);
    }

    #[test]
    fn invalid_directives_fall_back() {
        assert_eq!(filter_from(None).to_string(), DEFAULT_DIRECTIVES);
        assert_eq!(filter_from(Some("segedit=verbose")).to_string(), DEFAULT_DIRECTIVES);
        assert_eq!(
            filter_from(Some("segedit_runtime=trace")).to_string(),
            "segedit_runtime=trace"
        );
    }
}
