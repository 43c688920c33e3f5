//! Classified result of a single fetch attempt.

use crate::error::{truncate, MAX_BODY_CHARS};

/// HTTP status used by sources to signal rate limiting.
pub const TOO_MANY_REQUESTS: u16 = 429;

/// What one attempt at fetching a page produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Status below 400 with the raw payload
    Success {
        /// Response body
        payload: Vec<u8>,
        /// HTTP status code
        status: u16,
    },
    /// 4xx other than 429
    ClientError {
        /// HTTP status code
        status: u16,
        /// Truncated response body
        body: String,
    },
    /// 429, with the source's `Retry-After` hint if it sent one
    RateLimited {
        /// Seconds to wait
        retry_after: Option<u64>,
    },
    /// 5xx
    ServerError {
        /// HTTP status code
        status: u16,
        /// Truncated response body
        body: String,
    },
    /// The request never produced a response
    TransportFailure {
        /// Underlying error message
        cause: String,
    },
}

impl FetchOutcome {
    /// Classify a response by status code.
    #[must_use]
    pub fn from_response(status: u16, payload: Vec<u8>, retry_after: Option<u64>) -> Self {
        match status {
            TOO_MANY_REQUESTS => Self::RateLimited { retry_after },
            s if s < 400 => Self::Success { payload, status },
            s if s < 500 => Self::ClientError {
                status,
                body: body_excerpt(&payload),
            },
            _ => Self::ServerError {
                status,
                body: body_excerpt(&payload),
            },
        }
    }

    /// Short label for logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Success { .. } => "success",
            Self::ClientError { .. } => "client_error",
            Self::RateLimited { .. } => "rate_limited",
            Self::ServerError { .. } => "server_error",
            Self::TransportFailure { .. } => "transport_failure",
        }
    }
}

fn body_excerpt(payload: &[u8]) -> String {
    truncate(&String::from_utf8_lossy(payload), MAX_BODY_CHARS)
}

/// Parse a `Retry-After` header given in whole seconds.
///
/// HTTP-date values are not supported and yield `None`, which makes the
/// caller fall back to exponential backoff.
#[must_use]
pub fn parse_retry_after(value: &str) -> Option<u64> {
    value.trim().parse().ok()
}
