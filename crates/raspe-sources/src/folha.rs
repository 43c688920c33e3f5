//! Folha de S.Paulo news search.

use crate::html::{
    first_attr, first_number, first_text, pages_for, parse_html, read_html, selector, text,
};
use crate::registry::SourceOptions;
use chrono::NaiveDate;
use raspe_core::{PayloadFormat, Row, SearchParams};
use raspe_harvest::{
    HarvestError, HttpMethod, HttpTransport, PageCountProbe, PageScheme, PageTransform, Parser,
    Query, QueryBuilder, Result, Source, SourceProfile,
};
use regex::Regex;
use std::path::Path;
use std::sync::{Arc, OnceLock};

/// Registry identifier.
pub const ID: &str = "folha";

/// Search endpoint.
pub const ENDPOINT: &str = "https://search.folha.uol.com.br/search";

/// Accepted values of the `site` parameter.
pub const SITES: [&str; 3] = ["todos", "online", "jornal"];

const PER_PAGE: i64 = 25;
const MISSING: &str = "N/A";

struct FolhaQuery;

/// `YYYY-MM-DD` to the `DD/MM/YYYY` the search form expects.
fn br_date(param: &str, iso: &str) -> Result<String> {
    NaiveDate::parse_from_str(iso, "%Y-%m-%d")
        .map(|d| d.format("%d/%m/%Y").to_string())
        .map_err(|e| HarvestError::Validation(format!("'{param}': {e}")))
}

impl QueryBuilder for FolhaQuery {
    fn accepted_params(&self) -> &[&'static str] {
        &["pesquisa", "site", "data_inicio", "data_fim"]
    }

    fn build(&self, params: &SearchParams) -> Result<Query> {
        let site = params.get("site").unwrap_or("todos");
        if !SITES.contains(&site) {
            return Err(HarvestError::Validation(format!(
                "'site' must be one of {}, got '{site}'",
                SITES.join(", ")
            )));
        }

        let mut query = Query::new()
            .with("q", params.get("pesquisa").unwrap_or_default())
            .with("site", site)
            .with("periodo", "todos")
            .with("sr", 1);

        let start = params.get("data_inicio");
        let end = params.get("data_fim");
        if start.is_some() || end.is_some() {
            query.set("periodo", "personalizado");
            if let Some(start) = start {
                query.set("sd", br_date("data_inicio", start)?);
            }
            if let Some(end) = end {
                query.set("ed", br_date("data_fim", end)?);
            }
        }
        Ok(query)
    }
}

struct FolhaCount;

impl PageCountProbe for FolhaCount {
    fn probe(&self, payload: &[u8]) -> Option<i64> {
        static RESULTS: OnceLock<Regex> = OnceLock::new();

        let html = parse_html(payload);
        let total = match html.select(&selector("div[class*=\"c-search__result\"]")).next() {
            Some(div) => first_number(&text(div))?,
            None => {
                let re = RESULTS
                    .get_or_init(|| Regex::new(r"(\d+)\s+resultado").expect("valid regex"));
                let body = html.root_element().text().collect::<String>();
                re.captures(&body)?.get(1)?.as_str().parse().ok()?
            }
        };
        Some(pages_for(total, PER_PAGE))
    }
}

struct FolhaParser;

impl Parser for FolhaParser {
    fn parse(&self, path: &Path) -> Result<Vec<Row>> {
        let html = read_html(path)?;
        let Some(list) = html.select(&selector("ol.u-list-unstyled.c-search")).next() else {
            tracing::warn!(path = %path.display(), "News list not found");
            return Ok(Vec::new());
        };

        let link_sel = selector("a");
        let title_sel = selector("h2");
        let summary_sel = selector("p");
        let time_sel = selector("time");

        let or_missing = |value: Option<String>| value.unwrap_or_else(|| MISSING.to_string());
        Ok(list
            .select(&selector("li"))
            .map(|item| {
                Row::new()
                    .with("link", or_missing(first_attr(item, &link_sel, "href")))
                    .with("titulo", or_missing(first_text(item, &title_sel)))
                    .with("resumo", or_missing(first_text(item, &summary_sel)))
                    .with("data", or_missing(first_text(item, &time_sel)))
            })
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
            ("Accept-Language", "pt-BR,pt;q=0.8,en-US;q=0.5,en;q=0.3"),
            ("Upgrade-Insecure-Requests", "1"),
        ],
    )?;

    Ok(Source {
        profile: SourceProfile::new(
            ID,
            PayloadFormat::Html,
            PageScheme::Affine(PageTransform::new("sr").affine(25, -24)),
        ),
        builder: Arc::new(FolhaQuery),
        probe: Arc::new(FolhaCount),
        parser: Arc::new(FolhaParser),
        transport: Arc::new(transport),
    })
}
