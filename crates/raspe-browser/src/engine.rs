use crate::actions::BrowserPage;
use crate::error::{BrowserError, Result};
use crate::fingerprint::FingerprintConfig;
use chromiumoxide::browser::{Browser, BrowserConfig as ChromeConfig};
use futures_util::stream::StreamExt;
use raspe_core::BrowserConfig;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Browser automation engine
pub struct BrowserEngine {
    browser: Browser,
    handler: JoinHandle<()>,
    fingerprint: FingerprintConfig,
    poll_interval: Duration,
}

impl BrowserEngine {
    /// Launch Chromium with a randomized fingerprint
    pub async fn launch(config: &BrowserConfig) -> Result<Self> {
        Self::with_fingerprint(config, FingerprintConfig::for_config(config)).await
    }

    /// Launch Chromium with a specific fingerprint
    pub async fn with_fingerprint(
        config: &BrowserConfig,
        fingerprint: FingerprintConfig,
    ) -> Result<Self> {
        let mut builder = ChromeConfig::builder()
            .no_sandbox()
            .window_size(fingerprint.viewport_width, fingerprint.viewport_height)
            .args(fingerprint.launch_args());
        if !config.headless {
            builder = builder.with_head();
        }
        let chrome_config = builder.build().map_err(BrowserError::ChromiumError)?;

        let (browser, mut handler) = Browser::launch(chrome_config).await?;

        // drive the CDP connection until the browser goes away
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::trace!(error = %e, "Browser handler event error");
                }
            }
        });

        tracing::info!(
            headless = config.headless,
            user_agent = %fingerprint.user_agent,
            "Browser launched"
        );

        Ok(Self {
            browser,
            handler,
            fingerprint,
            poll_interval: Duration::from_millis(config.poll_interval_ms),
        })
    }

    /// Fingerprint in use.
    #[must_use]
    pub fn fingerprint(&self) -> &FingerprintConfig {
        &self.fingerprint
    }

    /// Open a blank tab.
    pub async fn new_page(&self) -> Result<BrowserPage> {
        let page = self.browser.new_page("about:blank").await?;
        Ok(BrowserPage::new(page, self.poll_interval))
    }

    /// Close the browser and wait for the process to exit.
    pub async fn close(mut self) -> Result<()> {
        self.browser.close().await?;
        if let Err(e) = self.browser.wait().await {
            tracing::debug!(error = %e, "Browser process wait failed");
        }
        self.handler.abort();
        tracing::info!("Browser closed");
        Ok(())
    }
}
