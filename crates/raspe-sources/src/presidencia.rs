//! Federal legislation search of the Presidency portal.

use crate::html::{pages_for, parse_html, read_html, selector, text};
use crate::registry::SourceOptions;
use raspe_core::{PayloadFormat, Row, SearchParams};
use raspe_harvest::{
    HttpMethod, HttpTransport, PageCountProbe, PageScheme, PageTransform, Parser, Query,
    QueryBuilder, Result, Source, SourceProfile,
};
use regex::Regex;
use std::path::Path;
use std::sync::{Arc, OnceLock};

/// Registry identifier.
pub const ID: &str = "presidencia";

/// Search endpoint (an AJAX fragment, POSTed as a form).
pub const ENDPOINT: &str =
    "https://legislacao.presidencia.gov.br/pesquisa/ajax/resultado_pesquisa_legislacao.php";

const PER_PAGE: i64 = 10;

struct PresidenciaQuery;

impl QueryBuilder for PresidenciaQuery {
    fn accepted_params(&self) -> &[&'static str] {
        &["pesquisa"]
    }

    fn build(&self, params: &SearchParams) -> Result<Query> {
        Ok(Query::new()
            .with("termo", params.get("pesquisa").unwrap_or_default())
            .with("ordenacao", "maior_data")
            .with("posicao", 0))
    }
}

/// Result total from the `N resultados encontrados` heading.
fn result_total(heading: &str) -> Option<i64> {
    static TOTAL: OnceLock<Regex> = OnceLock::new();
    static ANY_NUMBER: OnceLock<Regex> = OnceLock::new();

    let total = TOTAL.get_or_init(|| {
        Regex::new(r"(?i)([\d.]+)\s+resultados?\s+encontrados?").expect("valid regex")
    });
    let digits = match total.captures(heading) {
        Some(caps) => caps.get(1)?.as_str(),
        None => ANY_NUMBER
            .get_or_init(|| Regex::new(r"[\d.]+").expect("valid regex"))
            .find(heading)?
            .as_str(),
    };
    digits.replace('.', "").parse().ok()
}

struct PresidenciaCount;

impl PageCountProbe for PresidenciaCount {
    fn probe(&self, payload: &[u8]) -> Option<i64> {
        let html = parse_html(payload);
        let heading = html.select(&selector("h4")).next().map(text)?;
        Some(pages_for(result_total(&heading)?, PER_PAGE))
    }
}

struct PresidenciaParser;

impl Parser for PresidenciaParser {
    fn parse(&self, path: &Path) -> Result<Vec<Row>> {
        let html = read_html(path)?;
        let div_sel = selector("div");
        let link_sel = selector("a");
        let para_sel = selector("p");

        let Some(card) = html.select(&selector("div.card-body.p-0")).next() else {
            return Ok(Vec::new());
        };
        let Some(container) = card.select(&div_sel).next() else {
            return Ok(Vec::new());
        };

        // entries alternate with spacer divs
        let mut rows = Vec::new();
        for item in container.select(&div_sel).step_by(2) {
            let links: Vec<_> = item.select(&link_sel).collect();
            let paragraphs: Vec<_> = item.select(&para_sel).collect();
            let ([first, second, ..], [revogacao, descricao, ..]) =
                (links.as_slice(), paragraphs.as_slice())
            else {
                continue;
            };
            rows.push(
                Row::new()
                    .with("nome", text(*first))
                    .with("link", first.value().attr("href").unwrap_or_default())
                    .with("ficha", second.value().attr("href").unwrap_or_default())
                    .with("revogacao", text(*revogacao))
                    .with("descricao", text(*descricao)),
            );
        }
        Ok(rows)
    }
}

/// Assemble the source.
pub fn build(options: &SourceOptions) -> Result<Source> {
    let transport = HttpTransport::with_headers(
        options.endpoint_or(ENDPOINT),
        HttpMethod::Post,
        &options.config.http,
        &[
            ("Accept", "*/*"),
            ("Origin", "https://legislacao.presidencia.gov.br"),
            ("Referer", "https://legislacao.presidencia.gov.br/"),
            ("X-Requested-With", "XMLHttpRequest"),
        ],
    )?;

    Ok(Source {
        profile: SourceProfile::new(
            ID,
            PayloadFormat::Html,
            PageScheme::Affine(PageTransform::new("posicao").affine(10, -10)),
        ),
        builder: Arc::new(PresidenciaQuery),
        probe: Arc::new(PresidenciaCount),
        parser: Arc::new(PresidenciaParser),
        transport: Arc::new(transport),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    const FRAGMENT: &str = r#"
        <h4>1.234 resultados encontrados</h4>
        <div class="card-body p-0">
          <div>
            <div>
              <a href="https://www.planalto.gov.br/lei8080.htm">Lei nº 8.080</a>
              <a href="/ficha/8080">Ficha</a>
              <p>Não consta revogação expressa</p>
              <p>Dispõe sobre as condições para a promoção da saúde.</p>
            </div>
            <div></div>
            <div>
              <a href="https://www.planalto.gov.br/lei9782.htm">Lei nº 9.782</a>
              <p>Sem ficha</p>
            </div>
            <div></div>
          </div>
        </div>"#;

    #[test]
    fn test_result_total() {
        assert_eq!(result_total("1.234 resultados encontrados"), Some(1234));
        assert_eq!(result_total("1 Resultado Encontrado"), Some(1));
        assert_eq!(result_total("Total: 57"), Some(57));
        assert_eq!(result_total("nada"), None);
    }

    #[test]
    fn test_page_count() {
        assert_eq!(PresidenciaCount.probe(FRAGMENT.as_bytes()), Some(124));
    }

    #[test]
    fn test_position_transform() {
        let source = build(&SourceOptions::default()).unwrap();
        let base = source
            .build_query(&SearchParams::new().with("pesquisa", "saúde"))
            .unwrap();
        let third = source.profile.scheme.page_request(&base, 3);
        assert_eq!(third.query.get("posicao"), Some("20"));
        assert_eq!(third.query.get("termo"), Some("saúde"));
    }

    #[test]
    fn test_parse_fragment() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("presidencia_00001.html");
        std::fs::write(&path, FRAGMENT).unwrap();

        let rows = PresidenciaParser.parse(&path).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("nome"), Some("Lei nº 8.080"));
        assert_eq!(
            rows[0].get("link"),
            Some("https://www.planalto.gov.br/lei8080.htm")
        );
        assert_eq!(rows[0].get("ficha"), Some("/ficha/8080"));
        assert_eq!(
            rows[0].get("descricao"),
            Some("Dispõe sobre as condições para a promoção da saúde.")
        );
    }
}
