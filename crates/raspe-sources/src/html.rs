//! Helpers shared by the payload parsers.

use raspe_harvest::{HarvestError, Result};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::path::Path;
use std::sync::OnceLock;

/// Compile a selector known at build time.
pub(crate) fn selector(css: &'static str) -> Selector {
    Selector::parse(css).expect("valid selector")
}

/// Read and parse an HTML payload.
pub(crate) fn read_html(path: &Path) -> Result<Html> {
    let bytes = std::fs::read(path)?;
    Ok(Html::parse_document(&String::from_utf8_lossy(&bytes)))
}

/// Parse an HTML payload held in memory.
pub(crate) fn parse_html(payload: &[u8]) -> Html {
    Html::parse_document(&String::from_utf8_lossy(payload))
}

/// Read and parse a JSON payload.
pub(crate) fn read_json(path: &Path) -> Result<serde_json::Value> {
    let bytes = std::fs::read(path)?;
    serde_json::from_slice(&bytes).map_err(|e| HarvestError::parse(path, e))
}

/// Text content of `element` with runs of whitespace collapsed.
pub(crate) fn text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Text of the first match of `sel` under `element`.
pub(crate) fn first_text(element: ElementRef<'_>, sel: &Selector) -> Option<String> {
    element.select(sel).next().map(text)
}

/// Attribute of the first match of `sel` under `element`.
pub(crate) fn first_attr(element: ElementRef<'_>, sel: &Selector, attr: &str) -> Option<String> {
    element
        .select(sel)
        .next()
        .and_then(|el| el.value().attr(attr))
        .map(ToString::to_string)
}

/// First number in `text`, ignoring `.` thousands separators.
pub(crate) fn first_number(text: &str) -> Option<i64> {
    static NUMBER: OnceLock<Regex> = OnceLock::new();
    let re = NUMBER.get_or_init(|| Regex::new(r"\d[\d.]*").expect("valid regex"));
    re.find(text)
        .and_then(|m| m.as_str().replace('.', "").parse().ok())
}

/// Pages needed for `total` results at `per_page` per page.
pub(crate) fn pages_for(total: i64, per_page: i64) -> i64 {
    if total <= 0 {
        0
    } else {
        (total + per_page - 1) / per_page
    }
}

/// String form of a JSON value for a table cell.
pub(crate) fn cell(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_text_collapses_whitespace() {
        let html = Html::parse_fragment("<p>  Lei \n  nº <b>8.080</b>\t</p>");
        let p = html.select(&selector("p")).next().unwrap();
        assert_eq!(text(p), "Lei nº 8.080");
    }

    #[test]
    fn test_first_number() {
        assert_eq!(first_number("1.234 resultados encontrados"), Some(1234));
        assert_eq!(first_number("Foram 57 resultados"), Some(57));
        assert_eq!(first_number("nenhum"), None);
    }

    #[test]
    fn test_pages_for() {
        assert_eq!(pages_for(23, 10), 3);
        assert_eq!(pages_for(20, 10), 2);
        assert_eq!(pages_for(1, 25), 1);
        assert_eq!(pages_for(0, 10), 0);
    }

    #[test]
    fn test_cell() {
        assert_eq!(cell(&json!(null)), "");
        assert_eq!(cell(&json!("texto")), "texto");
        assert_eq!(cell(&json!(42)), "42");
        assert_eq!(cell(&json!(["a", "b"])), r#"["a","b"]"#);
    }
}
