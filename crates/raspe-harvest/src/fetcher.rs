//! Single-page fetching with retries.

use crate::error::Result;
use crate::outcome::FetchOutcome;
use crate::request::PageRequest;
use crate::retry::{RetryDecision, RetryPolicy};
use crate::transport::Transport;
use std::sync::Arc;

/// Runs one request through a transport under a [`RetryPolicy`].
#[derive(Clone)]
pub struct PageFetcher {
    transport: Arc<dyn Transport>,
    policy: RetryPolicy,
}

impl PageFetcher {
    /// Create a fetcher.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }

    /// Fetch `request`, sleeping between attempts as the policy dictates.
    ///
    /// Returns `Ok` with a [`FetchOutcome::Success`] or
    /// [`FetchOutcome::ClientError`]. Exhausted retries and transport
    /// failures come back as `Err`, as does anything the transport itself
    /// reports as terminal.
    pub async fn fetch(&self, request: &PageRequest) -> Result<FetchOutcome> {
        let mut attempt = 1;
        loop {
            let outcome = self.transport.send(request).await?;
            tracing::debug!(
                kind = ?request.kind,
                attempt,
                outcome = outcome.kind(),
                "Fetch attempt finished"
            );

            match self.policy.decide(outcome, attempt) {
                RetryDecision::Return(outcome) => return Ok(outcome),
                RetryDecision::RetryAfter(wait) => {
                    tracing::warn!(
                        kind = ?request.kind,
                        attempt,
                        max_attempts = self.policy.max_attempts(),
                        wait_secs = wait.as_secs_f64(),
                        "Transient failure, retrying"
                    );
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                }
                RetryDecision::Fail(err) => return Err(err),
            }
        }
    }
}

impl std::fmt::Debug for PageFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageFetcher")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}
