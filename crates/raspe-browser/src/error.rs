use thiserror::Error;

pub type Result<T> = std::result::Result<T, BrowserError>;

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("chromium error: {0}")]
    ChromiumError(String),

    #[error("navigation failed: {0}")]
    NavigationError(String),

    #[error("selector not found: {0}")]
    SelectorNotFound(String),

    #[error("timed out after {seconds}s waiting for {what}")]
    Timeout { what: String, seconds: u64 },

    #[error("script failed: {0}")]
    ScriptError(String),
}

impl BrowserError {
    /// True when a bounded wait ran out of time.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Seconds waited, when this is an anti-bot challenge that never cleared.
    #[must_use]
    pub fn challenge_timeout(&self) -> Option<u64> {
        match self {
            Self::Timeout { what, seconds } if what == crate::challenge::CHALLENGE => Some(*seconds),
            _ => None,
        }
    }
}

impl From<chromiumoxide::error::CdpError> for BrowserError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        Self::ChromiumError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_challenge_timeout() {
        let challenge = BrowserError::Timeout {
            what: crate::challenge::CHALLENGE.to_string(),
            seconds: 60,
        };
        assert_eq!(challenge.challenge_timeout(), Some(60));

        let selector = BrowserError::Timeout {
            what: "#results".to_string(),
            seconds: 15,
        };
        assert!(selector.is_timeout());
        assert_eq!(selector.challenge_timeout(), None);
    }

    #[test]
    fn test_error_display() {
        let err = BrowserError::NavigationError("page not found".to_string());
        assert_eq!(err.to_string(), "navigation failed: page not found");
    }

    #[test]
    fn test_timeout_error() {
        let err = BrowserError::Timeout {
            what: "challenge".to_string(),
            seconds: 60,
        };
        assert!(err.is_timeout());
        assert_eq!(err.to_string(), "timed out after 60s waiting for challenge");
    }
}
