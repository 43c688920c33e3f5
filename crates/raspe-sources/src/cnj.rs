//! Court communications API of the National Council of Justice (CNJ).

use crate::html::{cell, pages_for, read_json};
use crate::registry::SourceOptions;
use raspe_core::{PayloadFormat, Row, SearchParams};
use raspe_harvest::{
    HttpMethod, HttpTransport, PageCountProbe, PageScheme, PageTransform, Parser, Query,
    QueryBuilder, Result, Source, SourceProfile,
};
use std::path::Path;
use std::sync::Arc;

/// Registry identifier.
pub const ID: &str = "cnj";

/// API endpoint.
pub const ENDPOINT: &str = "https://comunicaapi.pje.jus.br/api/v1/comunicacao";

const PER_PAGE: i64 = 5;

struct CnjQuery;

impl QueryBuilder for CnjQuery {
    fn accepted_params(&self) -> &[&'static str] {
        &["pesquisa", "data_inicio", "data_fim"]
    }

    fn build(&self, params: &SearchParams) -> Result<Query> {
        let mut query = Query::new()
            .with("itensPorPagina", PER_PAGE)
            .with("texto", params.get("pesquisa").unwrap_or_default());
        if let Some(start) = params.get("data_inicio") {
            query.set("dataDisponibilizacaoInicio", start);
        }
        if let Some(end) = params.get("data_fim") {
            query.set("dataDisponibilizacaoFim", end);
        }
        Ok(query.with("pagina", 1))
    }
}

struct CnjCount;

impl PageCountProbe for CnjCount {
    fn probe(&self, payload: &[u8]) -> Option<i64> {
        let body: serde_json::Value = serde_json::from_slice(payload).ok()?;
        let total = body
            .get("count")
            .or_else(|| body.get("total"))
            .and_then(serde_json::Value::as_i64)?;
        Some(pages_for(total, PER_PAGE))
    }
}

struct CnjParser;

impl Parser for CnjParser {
    fn parse(&self, path: &Path) -> Result<Vec<Row>> {
        let body = read_json(path)?;
        let Some(items) = body.get("itens").and_then(serde_json::Value::as_array) else {
            return Ok(Vec::new());
        };

        Ok(items
            .iter()
            .filter_map(serde_json::Value::as_object)
            .map(|item| {
                item.iter()
                    .fold(Row::new(), |row, (key, value)| row.with(key.clone(), cell(value)))
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
            ("Accept", "application/json, text/plain, */*"),
            ("Origin", "https://comunica.pje.jus.br"),
            ("Referer", "https://comunica.pje.jus.br/"),
        ],
    )?;

    Ok(Source {
        profile: SourceProfile::new(
            ID,
            PayloadFormat::Json,
            PageScheme::Affine(PageTransform::new("pagina")),
        ),
        builder: Arc::new(CnjQuery),
        probe: Arc::new(CnjCount),
        parser: Arc::new(CnjParser),
        transport: Arc::new(transport),
    })
}
