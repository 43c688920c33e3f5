use crate::error::{BrowserError, Result};
use chromiumoxide::Page;
use std::time::Duration;

/// Browser actions for automation
#[async_trait::async_trait]
pub trait BrowserActions: Send + Sync {
    /// Navigate to a URL
    async fn navigate(&self, url: &str) -> Result<()>;

    /// Replace the value of a form field
    async fn fill_field(&self, selector: &str, value: &str) -> Result<()>;

    /// Click an element by selector
    async fn click(&self, selector: &str) -> Result<()>;

    /// Whether at least one element matches
    async fn exists(&self, selector: &str) -> Result<bool>;

    /// Wait for a selector to appear, up to `timeout`
    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<()>;

    /// Extract text from an element
    async fn extract_text(&self, selector: &str) -> Result<String>;

    /// Full HTML of the current document
    async fn content(&self) -> Result<String>;

    /// Names of the cookies visible to the page
    async fn cookie_names(&self) -> Result<Vec<String>>;

    /// Select option `index` of a `<select>` and fire its change event
    async fn select_option_index(&self, selector: &str, index: usize) -> Result<()>;

    /// Evaluate a script and return its JSON result
    async fn evaluate(&self, script: &str) -> Result<serde_json::Value>;
}

/// A chromiumoxide tab.
#[derive(Debug, Clone)]
pub struct BrowserPage {
    page: Page,
    poll_interval: Duration,
}

impl BrowserPage {
    pub(crate) fn new(page: Page, poll_interval: Duration) -> Self {
        Self {
            page,
            poll_interval,
        }
    }

    /// Close the tab.
    pub async fn close(self) -> Result<()> {
        self.page.close().await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl BrowserActions for BrowserPage {
    async fn navigate(&self, url: &str) -> Result<()> {
        tracing::debug!(url, "Navigating");
        self.page
            .goto(url)
            .await
            .map_err(|e| BrowserError::NavigationError(format!("{url}: {e}")))?;
        self.page
            .wait_for_navigation()
            .await
            .map_err(|e| BrowserError::NavigationError(format!("{url}: {e}")))?;
        Ok(())
    }

    async fn fill_field(&self, selector: &str, value: &str) -> Result<()> {
        let script = format!(
            "(() => {{ const el = document.querySelector({sel}); \
             if (!el) return false; \
             el.focus(); el.value = {val}; \
             el.dispatchEvent(new Event('input', {{ bubbles: true }})); \
             el.dispatchEvent(new Event('change', {{ bubbles: true }})); \
             return true; }})()",
            sel = js_string(selector),
            val = js_string(value),
        );
        expect_true(self.evaluate(&script).await?, selector)
    }

    async fn click(&self, selector: &str) -> Result<()> {
        let element = self
            .page
            .find_element(selector)
            .await
            .map_err(|_| BrowserError::SelectorNotFound(selector.to_string()))?;
        element.click().await?;
        Ok(())
    }

    async fn exists(&self, selector: &str) -> Result<bool> {
        let script = format!("document.querySelector({}) !== null", js_string(selector));
        Ok(self.evaluate(&script).await?.as_bool().unwrap_or(false))
    }

    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<()> {
        crate::challenge::poll_until(timeout, self.poll_interval, selector, || async {
            self.exists(selector).await.unwrap_or(false)
        })
        .await
    }

    async fn extract_text(&self, selector: &str) -> Result<String> {
        let element = self
            .page
            .find_element(selector)
            .await
            .map_err(|_| BrowserError::SelectorNotFound(selector.to_string()))?;
        Ok(element.inner_text().await?.unwrap_or_default())
    }

    async fn content(&self) -> Result<String> {
        Ok(self.page.content().await?)
    }

    async fn cookie_names(&self) -> Result<Vec<String>> {
        let cookies = self.page.get_cookies().await?;
        Ok(cookies.into_iter().map(|c| c.name).collect())
    }

    async fn select_option_index(&self, selector: &str, index: usize) -> Result<()> {
        let script = format!(
            "(() => {{ const el = document.querySelector({sel}); \
             if (!el || el.options.length <= {index}) return false; \
             el.selectedIndex = {index}; \
             el.dispatchEvent(new Event('change', {{ bubbles: true }})); \
             return true; }})()",
            sel = js_string(selector),
        );
        expect_true(self.evaluate(&script).await?, selector)
    }

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value> {
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| BrowserError::ScriptError(e.to_string()))?;
        Ok(result.value().cloned().unwrap_or(serde_json::Value::Null))
    }
}

fn expect_true(value: serde_json::Value, selector: &str) -> Result<()> {
    if value.as_bool() == Some(true) {
        Ok(())
    } else {
        Err(BrowserError::SelectorNotFound(selector.to_string()))
    }
}

/// Quote `text` as a JavaScript string literal.
#[must_use]
pub fn js_string(text: &str) -> String {
    serde_json::Value::String(text.to_string()).to_string()
}

/// Helper to extract domain from URL
pub fn extract_domain(url: &str) -> Result<String> {
    let url = url::Url::parse(url)
        .map_err(|e| BrowserError::NavigationError(format!("Invalid URL: {e}")))?;

    url.host_str()
        .ok_or_else(|| BrowserError::NavigationError("No host in URL".to_string()))
        .map(ToString::to_string)
}

/// Resolve `href` against the page at `base`.
pub fn absolute_url(base: &str, href: &str) -> Result<String> {
    let base = url::Url::parse(base)
        .map_err(|e| BrowserError::NavigationError(format!("Invalid URL: {e}")))?;
    base.join(href)
        .map(String::from)
        .map_err(|e| BrowserError::NavigationError(format!("Invalid link {href}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_domain() {
        assert_eq!(
            extract_domain("https://anslegis.datalegis.net/action/ActionDatalegis.php").unwrap(),
            "anslegis.datalegis.net"
        );
        assert_eq!(
            extract_domain("http://subdomain.example.com:8080/path").unwrap(),
            "subdomain.example.com"
        );
    }

    #[test]
    fn test_extract_domain_invalid() {
        assert!(extract_domain("not-a-url").is_err());
    }

    #[test]
    fn test_absolute_url() {
        let base = "https://anvisalegis.datalegis.net/action/ActionDatalegis.php?acao=x";
        assert_eq!(
            absolute_url(base, "/action/ActionDatalegis.php?acao=abrirTextoAto&id=1").unwrap(),
            "https://anvisalegis.datalegis.net/action/ActionDatalegis.php?acao=abrirTextoAto&id=1"
        );
        assert_eq!(
            absolute_url(base, "https://other.net/a").unwrap(),
            "https://other.net/a"
        );
    }

    #[test]
    fn test_js_string_escapes() {
        assert_eq!(js_string(r#"a"b"#), r#""a\"b""#);
        assert_eq!(js_string("input[name=\"txt_texto[]\"]"), r#""input[name=\"txt_texto[]\"]""#);
    }
}
