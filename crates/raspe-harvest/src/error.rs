//! Error types for harvesting.

use raspe_core::RaspeError;
use std::path::PathBuf;
use thiserror::Error;

/// Longest response body kept for diagnostics.
pub const MAX_BODY_CHARS: usize = 500;

/// Errors that can occur while harvesting a source.
#[derive(Debug, Error)]
pub enum HarvestError {
    /// Bad caller input, surfaced before any network activity
    #[error("validation error: {0}")]
    Validation(String),

    /// Required credential missing
    #[error("missing credential {name}: pass it explicitly or set {env_var}")]
    Credential {
        /// Credential name
        name: String,
        /// Environment variable consulted
        env_var: String,
    },

    /// Still rate limited after the attempt budget was spent
    #[error("rate limited (retry after {retry_after:?}s)")]
    RateLimited {
        /// Last retry hint sent by the source, in seconds
        retry_after: Option<u64>,
    },

    /// Still failing with 5xx after the attempt budget was spent
    #[error("server error {status}: {body}")]
    Server {
        /// HTTP status code
        status: u16,
        /// Truncated response body
        body: String,
    },

    /// Network-level failure (connect, timeout, reset)
    #[error("transport failure: {0}")]
    Transport(String),

    /// Anti-bot challenge did not clear in time
    #[error("automation timed out after {seconds}s waiting for the challenge to clear")]
    AutomationTimeout {
        /// Wall-clock limit that was exceeded
        seconds: u64,
    },

    /// Session storage failure
    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),

    /// A persisted payload could not be parsed
    #[error("failed to parse {}: {reason}", path.display())]
    Parse {
        /// Payload file
        path: PathBuf,
        /// Parser message
        reason: String,
    },

    /// Configuration or internal error from the core crate
    #[error(transparent)]
    Core(RaspeError),
}

impl HarvestError {
    /// Errors that must abort a harvest instead of degrading it.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Validation(_)
                | Self::Credential { .. }
                | Self::AutomationTimeout { .. }
                | Self::Core(_)
        )
    }

    /// Build a server error, truncating the body.
    #[must_use]
    pub fn server(status: u16, body: &str) -> Self {
        Self::Server {
            status,
            body: truncate(body, MAX_BODY_CHARS),
        }
    }

    /// Build a parse error for a payload file.
    pub fn parse(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Parse {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

impl From<RaspeError> for HarvestError {
    fn from(err: RaspeError) -> Self {
        match err {
            RaspeError::Validation(msg) => Self::Validation(msg),
            RaspeError::Credential { name, env_var } => Self::Credential { name, env_var },
            RaspeError::Io(e) => Self::Storage(e),
            other => Self::Core(other),
        }
    }
}

/// Truncate to at most `max` characters on a char boundary.
#[must_use]
pub fn truncate(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// Result type for harvest operations.
pub type Result<T> = std::result::Result<T, HarvestError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_body_truncated() {
        let body = "x".repeat(2000);
        match HarvestError::server(503, &body) {
            HarvestError::Server { status, body } => {
                assert_eq!(status, 503);
                assert_eq!(body.chars().count(), MAX_BODY_CHARS);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_truncate_multibyte() {
        assert_eq!(truncate("ação", 2), "aç");
    }

    #[test]
    fn test_fatal_classification() {
        assert!(HarvestError::Validation("x".into()).is_fatal());
        assert!(HarvestError::AutomationTimeout { seconds: 60 }.is_fatal());
        assert!(!HarvestError::RateLimited { retry_after: None }.is_fatal());
        assert!(!HarvestError::server(500, "").is_fatal());
        assert!(!HarvestError::Transport("reset".into()).is_fatal());
    }

    #[test]
    fn test_from_core_error() {
        let err: HarvestError = RaspeError::validation("bad date").into();
        assert!(matches!(err, HarvestError::Validation(_)));

        let err: HarvestError = RaspeError::Credential {
            name: "api_key".into(),
            env_var: "NYT_API_KEY".into(),
        }
        .into();
        assert!(matches!(err, HarvestError::Credential { .. }));
    }
}
