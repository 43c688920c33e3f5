//! Post-processing steps that add columns to a harvested table.
//!
//! [`LinkContentFetcher`] downloads the page behind each row's link and
//! stores its text; [`TermCounter`] then counts, per row, how often every
//! search word occurs in that text.

use crate::error::Result;
use crate::fanout::PROVENANCE_COLUMN;
use crate::outcome::FetchOutcome;
use crate::transport::{HttpMethod, HttpTransport};
use raspe_core::{HttpConfig, Table};
use scraper::Html;
use std::collections::BTreeSet;
use std::time::Duration;

/// Suffix of the column holding downloaded page text.
pub const CONTENT_SUFFIX: &str = "_content";

/// Column [`TermCounter`] reads by default.
pub const DEFAULT_CONTENT_COLUMN: &str = "link_content";

const LOCAL_FILE_SCHEME: &str = "file://";

/// Name of the content column derived from `column`.
#[must_use]
pub fn content_column(column: &str) -> String {
    format!("{column}{CONTENT_SUFFIX}")
}

/// Downloads the page behind a link column, one row at a time.
#[derive(Debug, Clone)]
pub struct LinkContentFetcher {
    http: HttpTransport,
    pacing: Duration,
}

impl LinkContentFetcher {
    /// Create a fetcher pausing `pacing` between downloads.
    pub fn new(config: &HttpConfig, pacing: Duration) -> Result<Self> {
        Ok(Self {
            http: HttpTransport::with_headers(
                "",
                HttpMethod::Get,
                config,
                &[("Accept-Language", "pt-BR,en-US;q=0.7,en;q=0.3")],
            )?,
            pacing,
        })
    }

    /// Fill `<column>_content` on every row with the text of the linked page.
    ///
    /// Local `file://` links, failed downloads and error pages yield an empty
    /// cell; a failure never aborts the step.
    pub async fn fetch_column(&self, mut table: Table, column: &str) -> Table {
        let target = content_column(column);
        let total = table.len();
        let mut downloaded = 0usize;

        for (index, row) in table.rows_mut().iter_mut().enumerate() {
            let link = row.get(column).unwrap_or_default().trim().to_string();
            let content = if link.is_empty() {
                String::new()
            } else if link.starts_with(LOCAL_FILE_SCHEME) {
                tracing::debug!(link = %link, "Skipping local file link");
                String::new()
            } else {
                if downloaded > 0 {
                    tokio::time::sleep(self.pacing).await;
                }
                downloaded += 1;
                self.download(&link).await
            };
            row.set(target.clone(), content);
            tracing::debug!(done = index + 1, total, "Link content");
        }

        tracing::info!(column = %column, rows = total, downloaded, "Fetched link content");
        table
    }

    async fn download(&self, link: &str) -> String {
        match self.http.get_url(link).await {
            FetchOutcome::Success { payload, .. } => page_text(&payload),
            other => {
                tracing::warn!(link = %link, outcome = other.kind(), "Failed to fetch link");
                String::new()
            }
        }
    }
}

/// Text of an HTML (or plain text) payload with whitespace runs collapsed.
fn page_text(payload: &[u8]) -> String {
    let html = Html::parse_document(&String::from_utf8_lossy(payload));
    html.root_element()
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Adds one count column per search word.
///
/// Words come from every distinct provenance value (merged provenance lists
/// split on their separator). Counts are whole-word, case-insensitive matches
/// in the content column.
#[derive(Debug, Clone)]
pub struct TermCounter {
    provenance_column: String,
    content_column: String,
}

impl TermCounter {
    /// Counter reading words from `provenance_column` and text from `content_column`.
    pub fn new(provenance_column: impl Into<String>, content_column: impl Into<String>) -> Self {
        Self {
            provenance_column: provenance_column.into(),
            content_column: content_column.into(),
        }
    }

    /// Distinct search words in `table`, sorted.
    #[must_use]
    pub fn words(&self, table: &Table) -> Vec<String> {
        table
            .distinct(&self.provenance_column)
            .into_iter()
            .flat_map(str::split_whitespace)
            .map(|word| word.trim_matches(',').to_string())
            .filter(|word| !word.is_empty())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Add the count columns.
    #[must_use]
    pub fn count(&self, mut table: Table) -> Table {
        let words = self.words(&table);
        for row in table.rows_mut() {
            let content = row.get(&self.content_column).unwrap_or_default().to_lowercase();
            let counts: Vec<usize> = words
                .iter()
                .map(|word| whole_word_count(&content, &word.to_lowercase()))
                .collect();
            for (word, n) in words.iter().zip(counts) {
                row.set(word.clone(), n.to_string());
            }
        }
        tracing::debug!(words = words.len(), rows = table.len(), "Counted search words");
        table
    }
}

impl Default for TermCounter {
    fn default() -> Self {
        Self::new(PROVENANCE_COLUMN, DEFAULT_CONTENT_COLUMN)
    }
}

/// Non-overlapping occurrences of `word` not touching another word character.
fn whole_word_count(haystack: &str, word: &str) -> usize {
    if word.is_empty() {
        return 0;
    }
    let is_word = |c: char| c.is_alphanumeric() || c == '_';
    haystack
        .match_indices(word)
        .filter(|(start, _)| {
            let before = haystack[..*start].chars().next_back();
            let after = haystack[start + word.len()..].chars().next();
            !before.is_some_and(is_word) && !after.is_some_and(is_word)
        })
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use raspe_core::Row;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn row(link: &str, terms: &str, content: &str) -> Row {
        Row::new()
            .with("link", link)
            .with("termo_busca", terms)
            .with("link_content", content)
    }

    #[test]
    fn test_whole_word_count() {
        assert_eq!(whole_word_count("vacina, vacinação e vacina.", "vacina"), 2);
        assert_eq!(whole_word_count("doença rara; doenças raras", "rara"), 1);
        assert_eq!(whole_word_count("saúde", "saúde"), 1);
        assert_eq!(whole_word_count("pré-natal", "natal"), 1);
        assert_eq!(whole_word_count("", "x"), 0);
    }

    #[test]
    fn test_words_split_merged_provenance() {
        let table: Table = vec![
            row("a", "doença rara, medicamento órfão", ""),
            row("b", "doença rara", ""),
        ]
        .into();
        assert_eq!(
            TermCounter::default().words(&table),
            vec!["doença", "medicamento", "rara", "órfão"]
        );
    }

    #[test]
    fn test_count_adds_columns() {
        let table: Table = vec![
            row("a", "doença rara", "A Doença é rara. Outra doença."),
            row("b", "medicamento", "sem menção"),
            Row::new().with("link", "c").with("termo_busca", "doença"),
        ]
        .into();

        let out = TermCounter::default().count(table);
        assert_eq!(out.rows()[0].get("doença"), Some("2"));
        assert_eq!(out.rows()[0].get("rara"), Some("1"));
        assert_eq!(out.rows()[0].get("medicamento"), Some("0"));
        assert_eq!(out.rows()[1].get("medicamento"), Some("0"));
        assert_eq!(out.rows()[2].get("doença"), Some("0"));
    }

    #[test]
    fn test_page_text() {
        let text = page_text(b"<html><body>\n  <h1>Lei</h1><p>texto\t legal</p>\n</body></html>");
        assert_eq!(text, "Lei texto legal");
        assert_eq!(page_text(b"apenas texto"), "apenas texto");
    }

    #[tokio::test]
    async fn test_fetch_column() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/norma/1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("<html><body><p>Lei da vacina</p></body></html>"),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/norma/2"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let table: Table = vec![
            Row::new().with("link", format!("{}/norma/1", server.uri())),
            Row::new().with("link", "file:///tmp/norma.pdf"),
            Row::new().with("link", format!("{}/norma/2", server.uri())),
            Row::new().with("titulo", "sem link"),
        ]
        .into();

        let fetcher = LinkContentFetcher::new(&HttpConfig::default(), Duration::ZERO).unwrap();
        let out = fetcher.fetch_column(table, "link").await;

        let contents: Vec<_> = out.rows().iter().filter_map(|r| r.get("link_content")).collect();
        assert_eq!(contents, vec!["Lei da vacina", "", "", ""]);
    }
}
