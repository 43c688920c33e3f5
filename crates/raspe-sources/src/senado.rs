//! Federal Senate legislation search.

use crate::html::{first_number, pages_for, parse_html, read_html, selector, text};
use crate::registry::SourceOptions;
use raspe_core::{PayloadFormat, Row, SearchParams};
use raspe_harvest::{
    HttpMethod, HttpTransport, PageCountProbe, PageScheme, PageTransform, Parser, Query,
    QueryBuilder, Result, Source, SourceProfile,
};
use std::path::Path;
use std::sync::Arc;

/// Registry identifier.
pub const ID: &str = "senado";

/// Search endpoint.
pub const ENDPOINT: &str = "https://www6g.senado.leg.br/busca";

const COLLECTION: &str = "Legislação Federal";
const PER_PAGE: i64 = 10;
const NO_DETAILS: &str = "NA";

struct SenadoQuery;

impl QueryBuilder for SenadoQuery {
    fn accepted_params(&self) -> &[&'static str] {
        &["pesquisa", "ano", "tipo_materia"]
    }

    fn build(&self, params: &SearchParams) -> Result<Query> {
        let mut query = Query::new().with("colecao", COLLECTION).with("p", 1);
        if let Some(kind) = params.get("tipo_materia") {
            query.set("tipo-materia", kind);
        }
        if let Some(year) = params.get("ano") {
            query.set("ano", year);
        }
        if let Some(term) = params.get("pesquisa") {
            query.set("q", term);
        }
        Ok(query)
    }
}

struct SenadoCount;

impl PageCountProbe for SenadoCount {
    fn probe(&self, payload: &[u8]) -> Option<i64> {
        let html = parse_html(payload);
        let link = html
            .select(&selector(
                r#"a[data-click-type="dynnav.colecao.Legislação Federal"]"#,
            ))
            .next()?;
        Some(pages_for(first_number(&text(link))?, PER_PAGE))
    }
}

struct SenadoParser;

impl Parser for SenadoParser {
    fn parse(&self, path: &Path) -> Result<Vec<Row>> {
        let html = read_html(path)?;
        let Some(results) = html
            .select(&selector("div.col-xs-12.col-md-12.sf-busca-resultados"))
            .next()
        else {
            tracing::warn!(path = %path.display(), "Result list not found");
            return Ok(Vec::new());
        };

        let link_sel = selector("h3 a");
        let p_sel = selector("p");

        let mut rows = Vec::new();
        for (index, item) in results
            .select(&selector("div.sf-busca-resultados-item"))
            .enumerate()
        {
            let links: Vec<_> = item.select(&link_sel).collect();
            let paragraphs: Vec<String> = item.select(&p_sel).map(text).collect();
            let (Some(main), true) = (links.first(), paragraphs.len() >= 3) else {
                tracing::warn!(
                    path = %path.display(),
                    item = index + 1,
                    links = links.len(),
                    paragraphs = paragraphs.len(),
                    "Unexpected result layout, skipping"
                );
                continue;
            };

            // newer layouts put a "Legislação" label before the description
            let description = if paragraphs[0] == "Legislação" {
                &paragraphs[1]
            } else {
                &paragraphs[0]
            };
            let details = links
                .get(1)
                .and_then(|a| a.value().attr("href"))
                .unwrap_or(NO_DETAILS);

            rows.push(
                Row::new()
                    .with("titulo", text(*main))
                    .with("link_norma", main.value().attr("href").unwrap_or_default())
                    .with("link_detalhes", details)
                    .with("descricao", description.as_str())
                    .with("trecho_descricao", paragraphs[2].as_str()),
            );
        }
        Ok(rows)
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
            ("Sec-Fetch-Dest", "document"),
            ("Sec-Fetch-Mode", "navigate"),
            ("Sec-Fetch-Site", "same-origin"),
            ("Upgrade-Insecure-Requests", "1"),
        ],
    )?;

    Ok(Source {
        profile: SourceProfile::new(
            ID,
            PayloadFormat::Html,
            PageScheme::Affine(PageTransform::new("p")),
        ),
        builder: Arc::new(SenadoQuery),
        probe: Arc::new(SenadoCount),
        parser: Arc::new(SenadoParser),
        transport: Arc::new(transport),
    })
}
