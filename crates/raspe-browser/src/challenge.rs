//! Bounded polling and anti-bot challenge detection.

use crate::actions::BrowserActions;
use crate::error::{BrowserError, Result};
use raspe_core::BrowserConfig;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// Cookie set once the challenge has been passed.
pub const CLEARANCE_COOKIE: &str = "cf_clearance";

/// A real result page is at least this long.
pub const MIN_CONTENT_LEN: usize = 5000;

/// Name of the condition polled by [`wait_for_challenge`].
pub const CHALLENGE: &str = "anti-bot challenge";

/// Text found on interstitial challenge pages.
const CHALLENGE_MARKERS: [&str; 3] = ["checking", "just a moment", "cf-browser-verification"];

/// Poll `predicate` every `interval` until it holds or `timeout` elapses.
///
/// The predicate is checked once immediately. `what` names the condition in
/// the timeout error.
pub async fn poll_until<F, Fut>(
    timeout: Duration,
    interval: Duration,
    what: &str,
    mut predicate: F,
) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = Instant::now() + timeout;
    loop {
        if predicate().await {
            return Ok(());
        }
        if Instant::now() >= deadline {
            return Err(BrowserError::Timeout {
                what: what.to_string(),
                seconds: timeout.as_secs(),
            });
        }
        tokio::time::sleep(interval).await;
    }
}

/// What a page looked like at one poll.
#[derive(Debug, Clone, Default)]
pub struct PageSignals {
    pub cookie_names: Vec<String>,
    pub ready_selector_present: bool,
    pub content: String,
}

impl PageSignals {
    /// Whether the page is past the challenge.
    #[must_use]
    pub fn is_cleared(&self) -> bool {
        if self.cookie_names.iter().any(|c| c == CLEARANCE_COOKIE) {
            return true;
        }
        if self.ready_selector_present {
            return true;
        }
        let lower = self.content.to_lowercase();
        self.content.len() > MIN_CONTENT_LEN
            && !lower.contains("challenge")
            && !CHALLENGE_MARKERS.iter().any(|m| lower.contains(m))
    }
}

async fn read_signals(page: &dyn BrowserActions, ready_selector: Option<&str>) -> PageSignals {
    let ready_selector_present = match ready_selector {
        Some(selector) => page.exists(selector).await.unwrap_or(false),
        None => false,
    };
    PageSignals {
        cookie_names: page.cookie_names().await.unwrap_or_default(),
        ready_selector_present,
        content: page.content().await.unwrap_or_default(),
    }
}

/// Wait until the current page is past its anti-bot challenge.
///
/// Fails with [`BrowserError::Timeout`] after
/// `config.challenge_timeout_secs`.
pub async fn wait_for_challenge(
    page: &dyn BrowserActions,
    ready_selector: Option<&str>,
    config: &BrowserConfig,
) -> Result<()> {
    let started = Instant::now();
    poll_until(
        Duration::from_secs(config.challenge_timeout_secs),
        Duration::from_millis(config.poll_interval_ms),
        CHALLENGE,
        || async { read_signals(page, ready_selector).await.is_cleared() },
    )
    .await?;
    tracing::debug!(
        waited_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        "Challenge cleared"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio_test::{assert_err, assert_ok};

    #[tokio::test(start_paused = true)]
    async fn test_poll_until_succeeds() {
        let calls = AtomicU32::new(0);
        let started = Instant::now();
        assert_ok!(
            poll_until(Duration::from_secs(60), Duration::from_secs(1), "x", || async {
                calls.fetch_add(1, Ordering::SeqCst) >= 2
            })
            .await
        );

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(started.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_until_times_out() {
        let started = Instant::now();
        let err = assert_err!(
            poll_until(Duration::from_secs(60), Duration::from_secs(1), "cookie", || async {
                false
            })
            .await
        );

        assert!(matches!(err, BrowserError::Timeout { seconds: 60, .. }));
        assert!(started.elapsed() >= Duration::from_secs(60));
        assert!(started.elapsed() <= Duration::from_secs(61));
    }

    #[test]
    fn test_clearance_cookie() {
        let signals = PageSignals {
            cookie_names: vec!["PHPSESSID".into(), "cf_clearance".into()],
            ..PageSignals::default()
        };
        assert!(signals.is_cleared());
    }

    #[test]
    fn test_ready_selector() {
        let signals = PageSignals {
            ready_selector_present: true,
            content: "Just a moment...".into(),
            ..PageSignals::default()
        };
        assert!(signals.is_cleared());
    }

    #[test]
    fn test_content_heuristic() {
        let long = "<div class=\"ato\">resultado</div>".repeat(300);
        let cleared = PageSignals {
            content: long.clone(),
            ..PageSignals::default()
        };
        assert!(cleared.is_cleared());

        let interstitial = PageSignals {
            content: format!("{long}<p>Checking your browser</p>"),
            ..PageSignals::default()
        };
        assert!(!interstitial.is_cleared());

        let short = PageSignals {
            content: "<html></html>".into(),
            ..PageSignals::default()
        };
        assert!(!short.is_cleared());
    }
}
