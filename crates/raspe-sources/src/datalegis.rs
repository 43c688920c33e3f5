//! Datalegis regulatory-act portals (ANS, ANVISA).
//!
//! These portals sit behind an anti-bot challenge and render results through
//! a search form, so pages are reached by driving a browser: the probe fills
//! the form and submits it, later pages click the pagination control. The
//! rendered HTML of each page is handed back as the payload.

use crate::html::{first_text, parse_html, read_html, selector, text};
use crate::registry::SourceOptions;
use async_trait::async_trait;
use raspe_browser::actions::absolute_url;
use raspe_browser::pagination::PAGE_LINK_SELECTOR;
use raspe_browser::{
    wait_for_challenge, BrowserActions, BrowserEngine, BrowserError, BrowserPage,
    PaginationStrategy,
};
use raspe_core::{BrowserConfig, PayloadFormat, Row, SearchParams};
use raspe_harvest::{
    FetchOutcome, HarvestError, PageCountProbe, PageRequest, PageScheme, Parser, Query,
    QueryBuilder, Result, Source, SourceProfile, Transport,
};
use scraper::Selector;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Search text field.
pub const SEARCH_FIELD: &str = "#nolivesearchGadget, input[name=\"txt_texto[]\"]";

/// Search submit button.
pub const SEARCH_BUTTON: &str = "button.btn-buscar, input[type=\"submit\"][value*=\"Buscar\"]";

/// One Datalegis deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Portal {
    /// Registry identifier
    pub id: &'static str,
    /// Host serving the portal
    pub domain: &'static str,
    /// `cod_modulo` of the act search
    pub module: u32,
    /// `cod_menu` of the act search
    pub menu: u32,
}

impl Portal {
    /// Entry page of the act search.
    #[must_use]
    pub fn search_url(&self) -> String {
        format!(
            "https://{}/action/ActionDatalegis.php?acao=consultarAtosInicial&cod_modulo={}&cod_menu={}",
            self.domain, self.module, self.menu
        )
    }
}

/// National Supplementary Health Agency.
pub const ANS: Portal = Portal {
    id: "ans",
    domain: "anslegis.datalegis.net",
    module: 583,
    menu: 8431,
};

/// National Health Surveillance Agency.
pub const ANVISA: Portal = Portal {
    id: "anvisa",
    domain: "anvisalegis.datalegis.net",
    module: 134,
    menu: 1696,
};

struct DatalegisQuery;

impl QueryBuilder for DatalegisQuery {
    fn accepted_params(&self) -> &[&'static str] {
        &["termo"]
    }

    fn build(&self, params: &SearchParams) -> Result<Query> {
        let termo = params.require("termo")?;
        Ok(Query::new().with("termo", termo))
    }
}

/// Page count read from a rendered listing.
struct DatalegisCount {
    strategy: PaginationStrategy,
}

impl PageCountProbe for DatalegisCount {
    fn probe(&self, payload: &[u8]) -> Option<i64> {
        let html = parse_html(payload);
        let labels: Vec<String> = match &self.strategy {
            PaginationStrategy::NumberedLinks => html
                .select(&selector(PAGE_LINK_SELECTOR))
                .map(text)
                .collect(),
            PaginationStrategy::Combobox { selector: css } => match Selector::parse(css) {
                Ok(dropdown) => html
                    .select(&dropdown)
                    .next()
                    .map(|el| el.select(&selector("option")).map(text).collect())
                    .unwrap_or_default(),
                Err(e) => {
                    warn!(selector = %css, error = %e, "Invalid page selector");
                    Vec::new()
                }
            },
        };

        let highest = labels.iter().filter_map(|l| l.trim().parse::<i64>().ok()).max();
        match highest {
            Some(pages) => Some(pages),
            None if html.select(&selector(".ato")).next().is_some() => Some(1),
            None => Some(0),
        }
    }
}

struct DatalegisParser {
    domain: &'static str,
}

impl Parser for DatalegisParser {
    fn parse(&self, path: &Path) -> Result<Vec<Row>> {
        let html = read_html(path)?;
        let link_sel = selector("a");
        let title_sel = selector("strong");
        let status_sel = selector("span");
        let summary_sel = selector("p");
        let base = format!("https://{}/", self.domain);

        let mut rows = Vec::new();
        for act in html.select(&selector("div.ato")) {
            let Some(link) = act.select(&link_sel).next() else {
                continue;
            };
            let href = link.value().attr("href").unwrap_or_default();
            let url = if href.is_empty() {
                String::new()
            } else {
                absolute_url(&base, href).unwrap_or_else(|_| href.to_string())
            };

            let heading = first_text(link, &title_sel).unwrap_or_default();
            let situacao = link
                .select(&title_sel)
                .next()
                .and_then(|strong| first_text(strong, &status_sel))
                .unwrap_or_default();
            let titulo = heading
                .replacen(&situacao, "", 1)
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ");

            rows.push(
                Row::new()
                    .with("url", url)
                    .with("titulo", titulo)
                    .with("descricao", first_text(link, &summary_sel).unwrap_or_default())
                    .with("situacao", situacao),
            );
        }

        if rows.is_empty() {
            debug!(path = %path.display(), "No acts in listing");
        }
        Ok(rows)
    }
}

/// Open browser state, kept for the whole run.
struct BrowserSession {
    engine: BrowserEngine,
    page: BrowserPage,
    term: Option<String>,
    current_page: u32,
}

/// Transport that reaches result pages by driving Chromium.
pub struct DatalegisTransport {
    url: String,
    config: BrowserConfig,
    strategy: PaginationStrategy,
    session: Mutex<Option<BrowserSession>>,
}

impl DatalegisTransport {
    /// Transport for the search page at `url`. The browser starts lazily.
    #[must_use]
    pub fn new(url: impl Into<String>, config: BrowserConfig, strategy: PaginationStrategy) -> Self {
        Self {
            url: url.into(),
            config,
            strategy,
            session: Mutex::new(None),
        }
    }

    async fn open(&self) -> std::result::Result<BrowserSession, BrowserError> {
        let engine = BrowserEngine::launch(&self.config).await?;
        let page = engine.new_page().await?;
        Ok(BrowserSession {
            engine,
            page,
            term: None,
            current_page: 0,
        })
    }

    async fn drive(
        &self,
        session: &mut BrowserSession,
        term: &str,
        request: &PageRequest,
    ) -> std::result::Result<String, BrowserError> {
        let target = request.page_number().unwrap_or(1);
        let is_probe = request.page_number().is_none();

        if is_probe || session.term.as_deref() != Some(term) {
            run_search(&session.page, &self.url, term, &self.config).await?;
            session.term = Some(term.to_string());
            session.current_page = 1;
        }

        if target != session.current_page {
            self.strategy.go_to_page(&session.page, target).await?;
            tokio::time::sleep(Duration::from_millis(self.config.between_pages_wait_ms)).await;
            session.current_page = target;
        }

        session.page.content().await
    }
}

#[async_trait]
impl Transport for DatalegisTransport {
    async fn send(&self, request: &PageRequest) -> Result<FetchOutcome> {
        let term = request.query.get("termo").unwrap_or_default();
        let mut guard = self.session.lock().await;

        if guard.is_none() {
            match self.open().await {
                Ok(session) => *guard = Some(session),
                Err(e) => return classify(e),
            }
        }
        let Some(session) = guard.as_mut() else {
            return Err(HarvestError::Transport("browser session unavailable".to_string()));
        };

        match self.drive(session, term, request).await {
            Ok(html) => Ok(FetchOutcome::Success {
                payload: html.into_bytes(),
                status: 200,
            }),
            Err(e) => {
                // the listing may be half-navigated; search again next time
                session.term = None;
                classify(e)
            }
        }
    }

    async fn finish(&self) -> Result<()> {
        let Some(session) = self.session.lock().await.take() else {
            return Ok(());
        };
        if let Err(e) = session.page.close().await {
            debug!(error = %e, "Page close failed");
        }
        session
            .engine
            .close()
            .await
            .map_err(|e| HarvestError::Transport(e.to_string()))?;
        info!("Browser closed");
        Ok(())
    }
}

/// Challenge timeouts abort the harvest; everything else is a failed attempt.
fn classify(err: BrowserError) -> Result<FetchOutcome> {
    if let Some(seconds) = err.challenge_timeout() {
        return Err(HarvestError::AutomationTimeout { seconds });
    }
    warn!(error = %err, "Browser step failed");
    Ok(FetchOutcome::TransportFailure {
        cause: err.to_string(),
    })
}

/// Open the search page, get past the challenge and submit `term`.
async fn run_search(
    page: &dyn BrowserActions,
    url: &str,
    term: &str,
    config: &BrowserConfig,
) -> std::result::Result<(), BrowserError> {
    info!(url, term, "Submitting search");
    page.navigate(url).await?;
    wait_for_challenge(page, Some(SEARCH_FIELD), config).await?;
    page.fill_field(SEARCH_FIELD, term).await?;

    if page.exists(SEARCH_BUTTON).await? {
        page.click(SEARCH_BUTTON).await?;
    } else {
        let script = "(() => { \
             const candidates = Array.from(document.querySelectorAll('button, input[type=\"submit\"]')); \
             const button = candidates.find(b => /buscar|pesquisar/i.test(b.textContent || b.value || '')); \
             if (button) { button.click(); return true; } \
             return false; })()";
        if page.evaluate(script).await?.as_bool() != Some(true) {
            return Err(BrowserError::SelectorNotFound("search button".to_string()));
        }
    }

    tokio::time::sleep(Duration::from_millis(config.page_load_wait_ms)).await;
    Ok(())
}

fn build(portal: Portal, options: &SourceOptions) -> Result<Source> {
    let strategy = options.pagination.clone().unwrap_or_default();
    let transport = DatalegisTransport::new(
        options.endpoint_or(&portal.search_url()),
        options.config.browser.clone(),
        strategy.clone(),
    );

    Ok(Source {
        profile: SourceProfile::new(portal.id, PayloadFormat::Html, PageScheme::Navigated)
            .with_max_pages(options.config.browser.max_pages),
        builder: Arc::new(DatalegisQuery),
        probe: Arc::new(DatalegisCount { strategy }),
        parser: Arc::new(DatalegisParser {
            domain: portal.domain,
        }),
        transport: Arc::new(transport),
    })
}

/// Assemble the ANS source.
pub fn build_ans(options: &SourceOptions) -> Result<Source> {
    build(ANS, options)
}

/// Assemble the ANVISA source.
pub fn build_anvisa(options: &SourceOptions) -> Result<Source> {
    build(ANVISA, options)
}
