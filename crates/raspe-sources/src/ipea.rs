//! IPEA publications search.

use crate::html::{
    first_attr, first_number, first_text, pages_for, parse_html, read_html, selector, text,
};
use crate::registry::SourceOptions;
use raspe_core::{PayloadFormat, Row, SearchParams};
use raspe_harvest::{
    HttpMethod, HttpTransport, PageCountProbe, PageScheme, PageTransform, Parser, Query,
    QueryBuilder, Result, Source, SourceProfile,
};
use std::path::Path;
use std::sync::Arc;

/// Registry identifier.
pub const ID: &str = "ipea";

/// Search endpoint.
pub const ENDPOINT: &str =
    "https://www.ipea.gov.br/portal/coluna-5/central-de-conteudo/busca-publicacoes";

const SITE: &str = "https://www.ipea.gov.br";
const PER_PAGE: i64 = 10;

struct IpeaQuery;

impl QueryBuilder for IpeaQuery {
    fn accepted_params(&self) -> &[&'static str] {
        &["pesquisa"]
    }

    fn build(&self, params: &SearchParams) -> Result<Query> {
        Ok(Query::new()
            .with("palavra_chave", params.get("pesquisa").unwrap_or_default())
            .with("tipo", "")
            .with("assunto", "")
            .with("autor", "")
            .with("timeperiods", "all")
            .with("data-inicial", "")
            .with("data-final", "")
            .with("pagina", 1))
    }
}

struct IpeaCount;

impl PageCountProbe for IpeaCount {
    fn probe(&self, payload: &[u8]) -> Option<i64> {
        let html = parse_html(payload);
        let count = html
            .select(&selector("div.col.clearfix h4 strong"))
            .next()
            .map(text)?;
        Some(pages_for(first_number(&count)?, PER_PAGE))
    }
}

struct IpeaParser;

impl Parser for IpeaParser {
    fn parse(&self, path: &Path) -> Result<Vec<Row>> {
        let html = read_html(path)?;
        let item_sel = selector("div.lista-publicacoes > div div.row div.publi-conteudo");
        let link_sel = selector("h3 a");
        let authors_sel = selector("div.autores");
        let date_sel = selector("p");
        let subjects_sel = selector("div.assuntos");

        let mut rows = Vec::new();
        for item in html.select(&item_sel) {
            let Some(href) = first_attr(item, &link_sel, "href") else {
                tracing::debug!(path = %path.display(), "Publication without link, skipping");
                continue;
            };
            rows.push(
                Row::new()
                    .with("titulo", first_text(item, &link_sel).unwrap_or_default())
                    .with("link", format!("{SITE}{href}"))
                    .with("autores", first_text(item, &authors_sel).unwrap_or_default())
                    .with("data", first_text(item, &date_sel).unwrap_or_default())
                    .with("assuntos", first_text(item, &subjects_sel).unwrap_or_default()),
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
            ("Accept-Language", "pt-BR,en-US;q=0.7,en;q=0.3"),
        ],
    )?;

    Ok(Source {
        profile: SourceProfile::new(
            ID,
            PayloadFormat::Html,
            PageScheme::Affine(PageTransform::new("pagina")),
        ),
        builder: Arc::new(IpeaQuery),
        probe: Arc::new(IpeaCount),
        parser: Arc::new(IpeaParser),
        transport: Arc::new(transport),
    })
}
