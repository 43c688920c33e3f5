//! Moving between result pages of a rendered listing.

use crate::actions::{js_string, BrowserActions};
use crate::error::{BrowserError, Result};
use serde::{Deserialize, Serialize};

/// Links whose text or `onclick` handler addresses a result page.
pub const PAGE_LINK_SELECTOR: &str = ".pagination a, .paginacao a, a[onclick*=\"irParaPagina\"]";

/// How a listing exposes its pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PaginationStrategy {
    /// Click the link for page `n` (`irParaPagina(n)` handler or text `n`)
    NumberedLinks,
    /// Pick option `n - 1` of a page selector dropdown
    Combobox {
        /// CSS selector of the `<select>`
        selector: String,
    },
}

impl Default for PaginationStrategy {
    fn default() -> Self {
        Self::NumberedLinks
    }
}

impl PaginationStrategy {
    /// Switch the listing on `page` to result page `number` (1-based).
    pub async fn go_to_page(&self, page: &dyn BrowserActions, number: u32) -> Result<()> {
        tracing::debug!(strategy = ?self, number, "Switching result page");
        match self {
            Self::NumberedLinks => click_numbered_link(page, number).await,
            Self::Combobox { selector } => {
                let index = usize::try_from(number.saturating_sub(1))
                    .map_err(|e| BrowserError::ScriptError(e.to_string()))?;
                page.select_option_index(selector, index).await
            }
        }
    }

    /// Page count advertised by the listing.
    ///
    /// `None` when the listing has no pagination control at all.
    pub async fn page_count(&self, page: &dyn BrowserActions) -> Result<Option<u32>> {
        let script = match self {
            Self::NumberedLinks => format!(
                "Array.from(document.querySelectorAll({sel})).map(a => a.textContent.trim())",
                sel = js_string(PAGE_LINK_SELECTOR),
            ),
            Self::Combobox { selector } => format!(
                "(() => {{ const el = document.querySelector({sel}); \
                 return el ? Array.from(el.options).map(o => o.textContent.trim()) : []; }})()",
                sel = js_string(selector),
            ),
        };
        let labels = page.evaluate(&script).await?;
        Ok(highest_page(labels.as_array().map_or(&[][..], Vec::as_slice)))
    }
}

/// Largest purely numeric label.
fn highest_page(labels: &[serde_json::Value]) -> Option<u32> {
    labels
        .iter()
        .filter_map(serde_json::Value::as_str)
        .filter_map(|label| label.trim().parse::<u32>().ok())
        .max()
}

async fn click_numbered_link(page: &dyn BrowserActions, number: u32) -> Result<()> {
    let script = format!(
        "(() => {{ \
           const byHandler = document.querySelector({handler}); \
           if (byHandler) {{ byHandler.click(); return true; }} \
           const links = Array.from(document.querySelectorAll({links})); \
           const byText = links.find(a => a.textContent.trim() === {text}); \
           if (byText) {{ byText.click(); return true; }} \
           return false; }})()",
        handler = js_string(&format!("a[onclick*='irParaPagina({number})']")),
        links = js_string(PAGE_LINK_SELECTOR),
        text = js_string(&number.to_string()),
    );
    if page.evaluate(&script).await?.as_bool() == Some(true) {
        Ok(())
    } else {
        Err(BrowserError::SelectorNotFound(format!("link to page {number}")))
    }
}
