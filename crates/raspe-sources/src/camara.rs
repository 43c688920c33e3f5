//! Chamber of Deputies legislation search.
//!
//! The portal rejects cold sessions, so the transport visits the home page and
//! the search page once, collecting cookies, before the first search request.

use crate::html::{first_attr, first_text, pages_for, parse_html, read_html, selector, text};
use crate::registry::SourceOptions;
use async_trait::async_trait;
use rand::Rng;
use raspe_core::{PayloadFormat, Row, SearchParams};
use raspe_harvest::{
    FetchOutcome, HarvestError, HttpMethod, HttpTransport, PageCountProbe, PageRequest,
    PageScheme, PageTransform, Parser, Query, QueryBuilder, Result, Source, SourceProfile,
    Transport,
};
use regex::Regex;
use std::ops::RangeInclusive;
use std::path::Path;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::sync::OnceCell;
use url::Url;

/// Registry identifier.
pub const ID: &str = "camara";

/// Search endpoint.
pub const ENDPOINT: &str = "https://www.camara.leg.br/legislacao/busca";

const PER_PAGE: i64 = 10;
const WARMUP_PAUSE_MS: RangeInclusive<u64> = 1000..=3000;

struct CamaraQuery;

impl QueryBuilder for CamaraQuery {
    fn accepted_params(&self) -> &[&'static str] {
        &["pesquisa", "ano", "tipo_materia"]
    }

    fn build(&self, params: &SearchParams) -> Result<Query> {
        let mut query = Query::new()
            .with("ordenacao", "data:ASC")
            .with("abrangencia", "Legislação Federal")
            .with("pagina", 1);
        if let Some(kind) = params.get("tipo_materia") {
            query.set("tipo", kind);
        }
        if let Some(year) = params.get("ano") {
            query.set("ano", year);
        }
        if let Some(term) = params.get("pesquisa") {
            query.set("geral", term);
        }
        Ok(query)
    }
}

struct CamaraCount;

impl PageCountProbe for CamaraCount {
    fn probe(&self, payload: &[u8]) -> Option<i64> {
        static TOTAL: OnceLock<Regex> = OnceLock::new();

        let html = parse_html(payload);
        let info = html
            .select(&selector(
                "div.busca-info__resultado.busca-info__resultado--informado",
            ))
            .next()
            .map(text)?;

        // "Exibindo 1 a 20 de 1.234": the total is the number after the last "de"
        let re = TOTAL.get_or_init(|| Regex::new(r"\bde\s+(\d[\d.]*)").expect("valid regex"));
        let total = re
            .captures_iter(&info)
            .last()?
            .get(1)?
            .as_str()
            .replace('.', "")
            .parse()
            .ok()?;
        Some(pages_for(total, PER_PAGE))
    }
}

struct CamaraParser;

impl Parser for CamaraParser {
    fn parse(&self, path: &Path) -> Result<Vec<Row>> {
        let html = read_html(path)?;
        let Some(list) = html.select(&selector("div.resultado-busca ul")).next() else {
            tracing::debug!(path = %path.display(), "No result list");
            return Ok(Vec::new());
        };

        let link_sel = selector("a");
        let description_sel = selector("div p");
        let status_sel = selector("p.busca-resultados__situacao");

        let mut rows = Vec::new();
        for item in list.select(&selector("li")) {
            let Some(title) = first_text(item, &link_sel) else {
                continue;
            };
            rows.push(
                Row::new()
                    .with("link", first_attr(item, &link_sel, "href").unwrap_or_default())
                    .with("titulo", title)
                    .with("descricao", first_text(item, &description_sel).unwrap_or_default())
                    .with("ementa", first_text(item, &status_sel).unwrap_or_default()),
            );
        }
        Ok(rows)
    }
}

/// Visits a fixed list of pages once before the first real request.
struct WarmedTransport {
    inner: HttpTransport,
    warmup: Vec<String>,
    pause_ms: RangeInclusive<u64>,
    ready: OnceCell<()>,
}

impl WarmedTransport {
    fn new(
        inner: HttpTransport,
        warmup: Vec<String>,
        pause_ms: RangeInclusive<u64>,
    ) -> Self {
        Self {
            inner,
            warmup,
            pause_ms,
            ready: OnceCell::new(),
        }
    }

    async fn warm_up(&self) {
        for url in &self.warmup {
            match self.inner.get_url(url).await {
                FetchOutcome::Success { status, .. } => {
                    tracing::debug!(url = %url, status, "Warm-up page visited");
                }
                other => {
                    tracing::warn!(url = %url, outcome = other.kind(), "Warm-up page failed");
                }
            }
            let pause = rand::thread_rng().gen_range(self.pause_ms.clone());
            tokio::time::sleep(Duration::from_millis(pause)).await;
        }
    }
}

#[async_trait]
impl Transport for WarmedTransport {
    async fn send(&self, request: &PageRequest) -> Result<FetchOutcome> {
        self.ready.get_or_init(|| self.warm_up()).await;
        self.inner.send(request).await
    }
}

/// Home page and search page of the portal serving `endpoint`.
fn warmup_pages(endpoint: &str) -> Result<Vec<String>> {
    let url = Url::parse(endpoint)
        .map_err(|e| HarvestError::Validation(format!("invalid endpoint '{endpoint}': {e}")))?;
    let home = url
        .join("/")
        .map_err(|e| HarvestError::Validation(format!("invalid endpoint '{endpoint}': {e}")))?;
    Ok(vec![home.to_string(), endpoint.to_string()])
}

/// Assemble the source.
pub fn build(options: &SourceOptions) -> Result<Source> {
    let endpoint = options.endpoint_or(ENDPOINT);
    let inner = HttpTransport::with_headers(
        endpoint.clone(),
        HttpMethod::Get,
        &options.config.http,
        &[
            ("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
            ("Accept-Language", "pt-BR,pt;q=0.9,en;q=0.8"),
            ("Referer", ENDPOINT),
            ("Sec-Fetch-Dest", "document"),
            ("Sec-Fetch-Mode", "navigate"),
            ("Sec-Fetch-Site", "same-origin"),
            ("Upgrade-Insecure-Requests", "1"),
        ],
    )?;
    let transport = WarmedTransport::new(inner, warmup_pages(&endpoint)?, WARMUP_PAUSE_MS);

    Ok(Source {
        profile: SourceProfile::new(
            ID,
            PayloadFormat::Html,
            PageScheme::Affine(PageTransform::new("pagina")),
        ),
        builder: Arc::new(CamaraQuery),
        probe: Arc::new(CamaraCount),
        parser: Arc::new(CamaraParser),
        transport: Arc::new(transport),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use raspe_core::HttpConfig;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const LISTING: &str = r#"
        <div class="busca-info__resultado busca-info__resultado--informado">
          Exibindo 1 a 20 de 1.234 resultados
        </div>
        <div class="resultado-busca">
          <ul>
            <li>
              <a href="https://www.camara.leg.br/norma/1">Lei nº 14.874, de 28 de maio de 2024</a>
              <div><p>Dispõe sobre a pesquisa com seres humanos</p></div>
              <p class="busca-resultados__situacao">Em vigor</p>
            </li>
            <li>
              <a href="https://www.camara.leg.br/norma/2">Decreto nº 11.999</a>
            </li>
            <li>sem link</li>
          </ul>
        </div>"#;

    #[test]
    fn test_query_fields() {
        let query = CamaraQuery
            .build(&SearchParams::new().with("pesquisa", "vacina").with("tipo_materia", "Lei"))
            .unwrap();
        assert_eq!(query.get("geral"), Some("vacina"));
        assert_eq!(query.get("tipo"), Some("Lei"));
        assert_eq!(query.get("ordenacao"), Some("data:ASC"));
        assert_eq!(query.get("ano"), None);
    }

    #[test]
    fn test_page_count_uses_last_total() {
        assert_eq!(CamaraCount.probe(LISTING.as_bytes()), Some(124));
        assert_eq!(CamaraCount.probe(b"<div class=\"resultado-busca\"></div>"), None);
    }

    #[test]
    fn test_parse_listing() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("camara_00001.html");
        std::fs::write(&path, LISTING).unwrap();

        let rows = CamaraParser.parse(&path).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("titulo"), Some("Lei nº 14.874, de 28 de maio de 2024"));
        assert_eq!(
            rows[0].get("descricao"),
            Some("Dispõe sobre a pesquisa com seres humanos")
        );
        assert_eq!(rows[0].get("ementa"), Some("Em vigor"));
        assert_eq!(rows[1].get("link"), Some("https://www.camara.leg.br/norma/2"));
        assert_eq!(rows[1].get("ementa"), Some(""));
    }

    #[test]
    fn test_warmup_pages() {
        assert_eq!(
            warmup_pages(ENDPOINT).unwrap(),
            vec![
                "https://www.camara.leg.br/".to_string(),
                ENDPOINT.to_string()
            ]
        );
        assert!(warmup_pages("not a url").is_err());
    }

    #[tokio::test]
    async fn test_warmup_runs_once() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/legislacao/busca"))
            .and(query_param("pagina", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_string(LISTING))
            .expect(2)
            .mount(&server)
            .await;

        let endpoint = format!("{}/legislacao/busca", server.uri());
        let inner =
            HttpTransport::new(endpoint.clone(), HttpMethod::Get, &HttpConfig::default()).unwrap();
        let transport = WarmedTransport::new(inner, vec![format!("{}/", server.uri())], 0..=0);

        let request = PageRequest::probe(Query::new().with("pagina", 1));
        for _ in 0..2 {
            let outcome = transport.send(&request).await.unwrap();
            assert!(matches!(outcome, FetchOutcome::Success { status: 200, .. }));
        }
    }
}
