//! New York Times article search (GraphQL, cursor paginated).

use crate::html::{pages_for, read_json};
use crate::registry::SourceOptions;
use raspe_core::{resolve_api_key, PayloadFormat, Row, SearchParams};
use raspe_harvest::{
    HarvestError, HttpMethod, HttpTransport, PageCountProbe, PageScheme, Parser, Query,
    QueryBuilder, Result, Source, SourceProfile,
};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;

/// Registry identifier.
pub const ID: &str = "nyt";

/// GraphQL endpoint.
pub const ENDPOINT: &str = "https://samizdat-graphql.nytimes.com/graphql/v2";

/// Environment variable holding the API token.
pub const API_KEY_ENV: &str = "NYT_API_KEY";

/// Hash of the persisted `SearchRootQuery`.
pub const PERSISTED_QUERY_HASH: &str =
    "2f5041641b9de748b42e5732e25b735d26f0ae188c900e15029287f391427ddf";

/// Accepted values of the `sort` parameter.
pub const SORTS: [&str; 3] = ["best", "newest", "oldest"];

const PER_PAGE: i64 = 10;

struct NytQuery;

impl NytQuery {
    fn variables(params: &SearchParams) -> Result<Value> {
        let sort = params.get("sort").unwrap_or("best");
        if !SORTS.contains(&sort) {
            return Err(HarvestError::Validation(format!(
                "'sort' must be one of {}, got '{sort}'",
                SORTS.join(", ")
            )));
        }

        let year = match params.get("ano") {
            Some(ano) => Some(ano.parse::<u16>().map_err(|_| {
                HarvestError::Validation(format!("'ano' must be a year, got '{ano}'"))
            })?),
            None => None,
        };
        let start = params
            .get("data_inicio")
            .map(ToString::to_string)
            .or_else(|| year.map(|y| format!("{y}-01-01")));
        let end = params
            .get("data_fim")
            .map(ToString::to_string)
            .or_else(|| year.map(|y| format!("{y}-12-31")));

        Ok(json!({
            "first": PER_PAGE,
            "sort": sort,
            "beginDate": start.map(|d| format!("{d}T00:00:00-05:00")).unwrap_or_default(),
            "endDate": end.map(|d| format!("{d}T23:59:59-05:00")).unwrap_or_default(),
            "lang": "EN",
            "text": params.get("texto").unwrap_or_default(),
            "sectionFacetFilterQuery": "",
            "typeFacetFilterQuery": "",
            "sectionFacetActive": false,
            "typeFacetActive": false,
        }))
    }
}

impl QueryBuilder for NytQuery {
    fn accepted_params(&self) -> &[&'static str] {
        &["texto", "ano", "data_inicio", "data_fim", "sort", "max_resultados"]
    }

    fn build(&self, params: &SearchParams) -> Result<Query> {
        let extensions = json!({
            "persistedQuery": { "version": 1, "sha256Hash": PERSISTED_QUERY_HASH }
        });
        Ok(Query::new()
            .with("operationName", "SearchRootQuery")
            .with("variables", Self::variables(params)?)
            .with("extensions", extensions))
    }

    fn with_cursor(&self, base: &Query, cursor: &str) -> Query {
        let mut variables: Value = base
            .get("variables")
            .and_then(|v| serde_json::from_str(v).ok())
            .unwrap_or_else(|| json!({}));
        if let Some(map) = variables.as_object_mut() {
            map.insert("cursor".to_string(), Value::String(cursor.to_string()));
        }
        let mut query = base.clone();
        query.set("variables", variables);
        query
    }

    fn page_limit(&self, params: &SearchParams) -> Result<Option<u32>> {
        let Some(max) = params.get("max_resultados") else {
            return Ok(None);
        };
        let max: u32 = max.parse().map_err(|_| {
            HarvestError::Validation(format!("'max_resultados' must be a number, got '{max}'"))
        })?;
        Ok(Some(max.div_ceil(10)))
    }
}

fn hits(body: &Value) -> Option<&Value> {
    body.get("data")?.get("search")?.get("hits")
}

struct NytCount;

impl PageCountProbe for NytCount {
    fn probe(&self, payload: &[u8]) -> Option<i64> {
        let body: Value = serde_json::from_slice(payload).ok()?;

        let errors = body.get("errors").and_then(Value::as_array);
        if errors.is_some_and(|e| e.iter().any(|err| err.to_string().contains("PersistedQueryNotFound"))) {
            tracing::error!(
                hash = PERSISTED_QUERY_HASH,
                "Persisted search query no longer recognized; the query hash needs updating"
            );
            return Some(0);
        }

        let total = hits(&body)?.get("totalCount")?.as_i64()?;
        tracing::info!(total, "Search results reported");
        Some(pages_for(total, PER_PAGE))
    }

    fn next_cursor(&self, payload: &[u8]) -> Option<String> {
        let body: Value = serde_json::from_slice(payload).ok()?;
        let page_info = hits(&body)?.get("pageInfo")?;
        if !page_info.get("hasNextPage")?.as_bool()? {
            return None;
        }
        page_info
            .get("endCursor")?
            .as_str()
            .filter(|c| !c.is_empty())
            .map(ToString::to_string)
    }
}

struct NytParser;

fn str_at<'a>(value: &'a Value, path: &[&str]) -> &'a str {
    path.iter()
        .try_fold(value, |v, key| v.get(*key))
        .and_then(Value::as_str)
        .unwrap_or_default()
}

fn image_url(node: &Value) -> &str {
    let Some(media) = node.get("promotionalMedia") else {
        return "";
    };
    if str_at(media, &["__typename"]) != "Image" {
        return "";
    }
    media
        .get("crops")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("renditions"))
        .and_then(|r| r.get(0))
        .map_or("", |r| str_at(r, &["url"]))
}

fn authors(node: &Value) -> String {
    node.get("bylines")
        .and_then(Value::as_array)
        .map(|bylines| {
            bylines
                .iter()
                .map(|b| str_at(b, &["renderedRepresentation"]).replace("By ", ""))
                .map(|a| a.trim().to_string())
                .filter(|a| !a.is_empty())
                .collect::<Vec<_>>()
                .join(", ")
        })
        .unwrap_or_default()
}

impl Parser for NytParser {
    fn parse(&self, path: &Path) -> Result<Vec<Row>> {
        let body = read_json(path)?;
        let Some(edges) = hits(&body)
            .and_then(|h| h.get("edges"))
            .and_then(Value::as_array)
        else {
            return Ok(Vec::new());
        };

        Ok(edges
            .iter()
            .filter_map(|edge| edge.get("node"))
            .map(|node| {
                Row::new()
                    .with("titulo", str_at(node, &["creativeWorkHeadline", "default"]))
                    .with("url", str_at(node, &["url"]))
                    .with("data_publicacao", str_at(node, &["firstPublished"]))
                    .with("secao", str_at(node, &["section", "displayName"]))
                    .with("subsecao", str_at(node, &["subsection", "displayName"]))
                    .with("tipo", str_at(node, &["__typename"]))
                    .with("resumo", str_at(node, &["creativeWorkSummary"]))
                    .with("autores", authors(node))
                    .with("imagem_url", image_url(node))
            })
            .collect())
    }
}

/// Assemble the source. Fails when no API token is available.
pub fn build(options: &SourceOptions) -> Result<Source> {
    let token = resolve_api_key("api_key", options.api_key.as_deref(), API_KEY_ENV)?;

    let transport = HttpTransport::with_headers(
        options.endpoint_or(ENDPOINT),
        HttpMethod::Get,
        &options.config.http,
        &[
            ("Accept", "*/*"),
            ("Content-Type", "application/json"),
            ("Origin", "https://www.nytimes.com"),
            ("Referer", "https://www.nytimes.com/"),
            ("nyt-app-type", "project-vi"),
            ("nyt-app-version", "0.0.5"),
            ("nyt-token", token.as_str()),
        ],
    )?;

    Ok(Source {
        profile: SourceProfile::new(ID, PayloadFormat::Json, PageScheme::Cursor),
        builder: Arc::new(NytQuery),
        probe: Arc::new(NytCount),
        parser: Arc::new(NytParser),
        transport: Arc::new(transport),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn page(total: i64, cursor: Option<&str>) -> Vec<u8> {
        json!({
            "data": { "search": { "hits": {
                "totalCount": total,
                "pageInfo": { "hasNextPage": cursor.is_some(), "endCursor": cursor },
                "edges": [
                    { "node": {
                        "__typename": "Article",
                        "url": "https://www.nytimes.com/2024/05/01/health/dengue.html",
                        "firstPublished": "2024-05-01T09:00:00.000Z",
                        "creativeWorkHeadline": { "default": "Dengue Cases Surge" },
                        "creativeWorkSummary": "Outbreak in Brazil.",
                        "section": { "displayName": "Health" },
                        "subsection": null,
                        "bylines": [
                            { "renderedRepresentation": "By Ana Silva" },
                            { "renderedRepresentation": "" }
                        ],
                        "promotionalMedia": {
                            "__typename": "Image",
                            "crops": [ { "renditions": [ { "url": "https://static01.nyt.com/a.jpg" } ] } ]
                        }
                    } }
                ]
            } } }
        })
        .to_string()
        .into_bytes()
    }

    #[test]
    fn test_variables_from_year() {
        let query = NytQuery
            .build(&SearchParams::new().with("texto", "supreme court").with("ano", "2024"))
            .unwrap();
        let variables: Value = serde_json::from_str(query.get("variables").unwrap()).unwrap();
        assert_eq!(variables["beginDate"], "2024-01-01T00:00:00-05:00");
        assert_eq!(variables["endDate"], "2024-12-31T23:59:59-05:00");
        assert_eq!(variables["text"], "supreme court");
        assert_eq!(variables["sort"], "best");
        assert_eq!(variables["first"], 10);
        assert_eq!(query.get("operationName"), Some("SearchRootQuery"));
        assert!(!query.get("variables").unwrap().contains(' '));
    }

    #[test]
    fn test_explicit_dates_win_over_year() {
        let query = NytQuery
            .build(
                &SearchParams::new()
                    .with("texto", "x")
                    .with("ano", "2024")
                    .with("data_inicio", "2024-06-01"),
            )
            .unwrap();
        let variables: Value = serde_json::from_str(query.get("variables").unwrap()).unwrap();
        assert_eq!(variables["beginDate"], "2024-06-01T00:00:00-05:00");
        assert_eq!(variables["endDate"], "2024-12-31T23:59:59-05:00");
    }

    #[test]
    fn test_invalid_sort() {
        let params = SearchParams::new().with("texto", "x").with("sort", "random");
        assert!(matches!(NytQuery.build(&params), Err(HarvestError::Validation(_))));
    }

    #[test]
    fn test_cursor_added_to_variables() {
        let base = NytQuery.build(&SearchParams::new().with("texto", "x")).unwrap();
        let next = NytQuery.with_cursor(&base, "abc==");
        let variables: Value = serde_json::from_str(next.get("variables").unwrap()).unwrap();
        assert_eq!(variables["cursor"], "abc==");
        assert_eq!(variables["text"], "x");
        assert_eq!(next.get("extensions"), base.get("extensions"));
    }

    #[test]
    fn test_result_cap() {
        let params = SearchParams::new().with("texto", "x").with("max_resultados", "25");
        assert_eq!(NytQuery.page_limit(&params).unwrap(), Some(3));
        assert_eq!(NytQuery.page_limit(&SearchParams::new()).unwrap(), None);
        let bad = SearchParams::new().with("max_resultados", "lots");
        assert!(NytQuery.page_limit(&bad).is_err());
    }

    #[test]
    fn test_page_count_and_cursor() {
        assert_eq!(NytCount.probe(&page(95, Some("c1"))), Some(10));
        assert_eq!(NytCount.next_cursor(&page(95, Some("c1"))), Some("c1".to_string()));
        assert_eq!(NytCount.next_cursor(&page(95, None)), None);
    }

    #[test]
    fn test_expired_query_hash() {
        let body = br#"{"errors":[{"message":"PersistedQueryNotFound"}]}"#;
        assert_eq!(NytCount.probe(body), Some(0));
    }

    #[test]
    fn test_parse_articles() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nyt_00001.json");
        std::fs::write(&path, page(1, None)).unwrap();

        let rows = NytParser.parse(&path).unwrap();
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.get("titulo"), Some("Dengue Cases Surge"));
        assert_eq!(row.get("secao"), Some("Health"));
        assert_eq!(row.get("subsecao"), Some(""));
        assert_eq!(row.get("autores"), Some("Ana Silva"));
        assert_eq!(row.get("imagem_url"), Some("https://static01.nyt.com/a.jpg"));
        assert_eq!(row.get("tipo"), Some("Article"));
    }
}
