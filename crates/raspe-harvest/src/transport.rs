//! Pluggable page transports.
//!
//! A [`Transport`] performs exactly one attempt per call and classifies the
//! result; retrying is the fetcher's job. Returning `Err` means the harvest
//! cannot go on (for example an anti-bot challenge that never cleared).

use crate::error::{HarvestError, Result};
use crate::outcome::{parse_retry_after, FetchOutcome};
use crate::request::PageRequest;
use async_trait::async_trait;
use raspe_core::HttpConfig;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, RETRY_AFTER};
use reqwest::{Client, RequestBuilder};
use std::time::Duration;

/// Issues one request attempt and classifies the outcome.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform a single attempt.
    async fn send(&self, request: &PageRequest) -> Result<FetchOutcome>;

    /// Release resources once a whole fan-out run is over.
    async fn finish(&self) -> Result<()> {
        Ok(())
    }
}

/// HTTP verb used by a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    /// Query sent as URL parameters
    Get,
    /// Query sent as a urlencoded form body
    Post,
}

/// reqwest-backed transport with a shared cookie store.
///
/// One instance lives for a whole fan-out run, so cookies and default
/// headers are reused across every page of every term.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    endpoint: String,
    method: HttpMethod,
}

impl HttpTransport {
    /// Create a transport for `endpoint`.
    pub fn new(
        endpoint: impl Into<String>,
        method: HttpMethod,
        config: &HttpConfig,
    ) -> Result<Self> {
        Self::with_headers(endpoint, method, config, &[])
    }

    /// Create a transport that sends `headers` on every request.
    pub fn with_headers(
        endpoint: impl Into<String>,
        method: HttpMethod,
        config: &HttpConfig,
        headers: &[(&str, &str)],
    ) -> Result<Self> {
        let mut default_headers = HeaderMap::new();
        for (name, value) in headers {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                HarvestError::Validation(format!("invalid header name {name}: {e}"))
            })?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| HarvestError::Validation(format!("invalid header value: {e}")))?;
            default_headers.insert(name, value);
        }

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .read_timeout(Duration::from_secs(config.read_timeout_secs))
            .user_agent(config.user_agent.clone())
            .default_headers(default_headers)
            .cookie_store(true)
            .build()
            .map_err(|e| HarvestError::Transport(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            method,
        })
    }

    /// Target URL.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &PageRequest) -> Result<FetchOutcome> {
        let pairs = request.query.pairs();
        let builder = match self.method {
            HttpMethod::Get => self.client.get(&self.endpoint).query(pairs),
            HttpMethod::Post => self.client.post(&self.endpoint).form(pairs),
        };
        Ok(classify(&self.endpoint, builder).await)
    }
}

impl HttpTransport {
    /// GET an arbitrary `url` with this transport's client, cookies and headers.
    pub async fn get_url(&self, url: &str) -> FetchOutcome {
        classify(url, self.client.get(url)).await
    }
}

async fn classify(url: &str, builder: RequestBuilder) -> FetchOutcome {
    let response = match builder.send().await {
        Ok(response) => response,
        Err(e) => {
            tracing::debug!(url, error = %e, "Request failed");
            return FetchOutcome::TransportFailure {
                cause: e.to_string(),
            };
        }
    };

    let status = response.status().as_u16();
    let retry_after = response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_retry_after);

    match response.bytes().await {
        Ok(body) => FetchOutcome::from_response(status, body.to_vec(), retry_after),
        Err(e) => FetchOutcome::TransportFailure {
            cause: format!("failed to read body: {e}"),
        },
    }
}
