//! Federal Council of Medicine (CFM and regional CRM) regulations search.

use crate::html::{first_attr, first_text, parse_html, read_html, selector, text};
use crate::registry::SourceOptions;
use raspe_core::{PayloadFormat, Row, SearchParams};
use raspe_harvest::{
    HttpMethod, HttpTransport, PageCountProbe, PageScheme, PageTransform, Parser, Query,
    QueryBuilder, Result, Source, SourceProfile,
};
use regex::Regex;
use scraper::ElementRef;
use std::path::Path;
use std::sync::{Arc, OnceLock};

/// Registry identifier.
pub const ID: &str = "cfm";

/// Search endpoint.
pub const ENDPOINT: &str = "https://portal.cfm.org.br/buscar-normas-cfm-e-crm/";

/// Regulation kinds requested on every search: resolution, opinion,
/// amendment, norm and decision.
const KINDS: [&str; 5] = ["R", "P", "E", "N", "D"];

/// Output columns, in order. Header labels on the page map onto the first four.
const COLUMNS: [&str; 6] = ["Tipo", "UF", "Nº/Ano", "Situação", "Ementa", "Link"];

struct CfmQuery;

impl QueryBuilder for CfmQuery {
    fn accepted_params(&self) -> &[&'static str] {
        &["texto", "uf", "revogada", "numero", "ano"]
    }

    fn build(&self, params: &SearchParams) -> Result<Query> {
        let mut query = Query::new();
        for (i, kind) in KINDS.iter().enumerate() {
            query.set(format!("tipo[{i}]"), kind);
        }
        for key in ["uf", "revogada", "numero", "ano"] {
            query.set(key, params.get(key).unwrap_or_default());
        }
        Ok(query
            .with("ta", "OU")
            .with("assunto[0]", "")
            .with("texto", params.get("texto").unwrap_or_default())
            .with("pagina", 1))
    }
}

struct CfmCount;

impl PageCountProbe for CfmCount {
    fn probe(&self, payload: &[u8]) -> Option<i64> {
        static RECORDS: OnceLock<Regex> = OnceLock::new();
        static SHOWING: OnceLock<Regex> = OnceLock::new();

        let html = parse_html(payload);
        let body = text(html.root_element());
        let records = RECORDS
            .get_or_init(|| Regex::new(r"(\d+)\s+registros encontrados").expect("valid regex"));
        let total: i64 = records.captures(&body)?.get(1)?.as_str().parse().ok()?;

        let showing = SHOWING
            .get_or_init(|| Regex::new(r"Mostrando página \d+ de (\d+)").expect("valid regex"));
        for div in html.select(&selector("div.pt-3")) {
            if let Some(pages) = showing
                .captures(&text(div))
                .and_then(|c| c.get(1)?.as_str().parse().ok())
            {
                return Some(pages);
            }
        }

        let last_link = html
            .select(&selector("a.link-navigation"))
            .filter_map(|a| text(a).parse::<i64>().ok())
            .max();
        Some(last_link.unwrap_or(i64::from(total > 0)))
    }
}

struct CfmParser;

impl CfmParser {
    fn parse_article(article: ElementRef<'_>) -> Option<Row> {
        let label_sel = selector("strong");
        let value_sel = selector("p");

        let mut row = Row::new();
        for item in article.select(&selector("div.card-header ul li")) {
            if let (Some(label), Some(value)) =
                (first_text(item, &label_sel), first_text(item, &value_sel))
            {
                if COLUMNS[..4].contains(&label.as_str()) {
                    row.set(label, value);
                }
            }
        }
        row.get("Tipo")?;

        let body = article.select(&selector("div.card-body")).next();
        let summary = body.and_then(|b| first_text(b, &selector("span")));
        let link = body.and_then(|b| first_attr(b, &selector("a.btn.btn-primary"), "href"));

        Some(COLUMNS.iter().fold(Row::new(), |out, column| {
            let value = match *column {
                "Ementa" => summary.clone().unwrap_or_default(),
                "Link" => link.clone().unwrap_or_default(),
                other => row.get(other).unwrap_or_default().to_string(),
            };
            out.with(*column, value)
        }))
    }
}

impl Parser for CfmParser {
    fn parse(&self, path: &Path) -> Result<Vec<Row>> {
        let html = read_html(path)?;
        let Some(results) = html.select(&selector("div#resultsNormas")).next() else {
            tracing::debug!(path = %path.display(), "Results container not found");
            return Ok(Vec::new());
        };

        Ok(results
            .select(&selector("article"))
            .filter_map(Self::parse_article)
            .collect())
    }
}

/// Assemble the source.
pub fn build(options: &SourceOptions) -> Result<Source> {
    let transport = HttpTransport::with_headers(
        options.endpoint_or(ENDPOINT),
        HttpMethod::Get,
        &options.config.http,
        &[
            ("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
            ("Accept-Language", "pt-BR,en-US;q=0.7,en;q=0.3"),
            ("Referer", ENDPOINT),
            ("Sec-Fetch-Dest", "document"),
            ("Sec-Fetch-Mode", "navigate"),
            ("Sec-Fetch-Site", "same-origin"),
        ],
    )?;

    Ok(Source {
        profile: SourceProfile::new(
            ID,
            PayloadFormat::Html,
            PageScheme::Affine(PageTransform::new("pagina")),
        ),
        builder: Arc::new(CfmQuery),
        probe: Arc::new(CfmCount),
        parser: Arc::new(CfmParser),
        transport: Arc::new(transport),
    })
}
