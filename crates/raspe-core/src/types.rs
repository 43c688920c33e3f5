//! Shared types used across the raspe harvester.
//!
//! This module defines the caller-facing request model (ordered parameters
//! with at most one list-valued entry), page ranges and source identifiers.

use crate::dates;
use crate::error::{RaspeError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;
use std::str::FromStr;
use std::sync::OnceLock;

/// Newtype for source identifiers with validation.
///
/// Source IDs must be lowercase alphanumeric with hyphens, 2-32 characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceId(String);

impl SourceId {
    /// Create a new `SourceId` from a string.
    ///
    /// # Errors
    /// Returns error if the ID doesn't match the required format.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        Self::validate(&id)?;
        Ok(Self(id))
    }

    /// Get the inner string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate(id: &str) -> Result<()> {
        static SOURCE_REGEX: OnceLock<Regex> = OnceLock::new();
        let regex = SOURCE_REGEX
            .get_or_init(|| Regex::new(r"^[a-z0-9][a-z0-9-]{0,30}[a-z0-9]$").expect("valid regex"));

        if regex.is_match(id) {
            Ok(())
        } else {
            Err(RaspeError::validation(format!(
                "invalid source ID: must be 2-32 lowercase alphanumeric characters or hyphens, got '{id}'"
            )))
        }
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single request parameter value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// Fixed value shared by every fan-out iteration
    Scalar(String),
    /// Values that drive fan-out, one harvest per entry
    List(Vec<String>),
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::Scalar(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        Self::Scalar(value)
    }
}

impl From<Vec<String>> for ParamValue {
    fn from(values: Vec<String>) -> Self {
        Self::List(values)
    }
}

/// Caller-facing search request.
///
/// Parameters keep insertion order. At most one may be list-valued; that is
/// checked by [`SearchRequest::validate`]. The page subrange is carried
/// separately so it can never be mistaken for a fan-out axis.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchRequest {
    params: Vec<(String, ParamValue)>,
    pages: Option<PageRange>,
}

impl SearchRequest {
    /// Create an empty request.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a parameter, replacing any previous value for the same key.
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.set(key, value);
        self
    }

    /// Set a list-valued parameter.
    #[must_use]
    pub fn with_list<I, S>(self, key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let values = values.into_iter().map(Into::into).collect::<Vec<_>>();
        self.with_param(key, ParamValue::List(values))
    }

    /// Restrict the harvest to a page subrange.
    #[must_use]
    pub fn with_pages(mut self, pages: PageRange) -> Self {
        self.pages = Some(pages);
        self
    }

    /// Set a parameter in place.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) {
        let key = key.into();
        let value = value.into();
        if let Some(slot) = self.params.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value;
        } else {
            self.params.push((key, value));
        }
    }

    /// Look up a parameter.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.params.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Look up a scalar parameter.
    #[must_use]
    pub fn scalar(&self, key: &str) -> Option<&str> {
        match self.get(key) {
            Some(ParamValue::Scalar(value)) => Some(value),
            _ => None,
        }
    }

    /// Requested page subrange, if any.
    #[must_use]
    pub fn pages(&self) -> Option<PageRange> {
        self.pages
    }

    /// Iterate parameters in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// The single list-valued parameter, if present.
    ///
    /// # Errors
    /// Returns a validation error when more than one parameter is a list.
    pub fn list_param(&self) -> Result<Option<(&str, &[String])>> {
        let lists: Vec<(&str, &[String])> = self
            .params
            .iter()
            .filter_map(|(k, v)| match v {
                ParamValue::List(values) => Some((k.as_str(), values.as_slice())),
                ParamValue::Scalar(_) => None,
            })
            .collect();

        match lists.as_slice() {
            [] => Ok(None),
            [single] => Ok(Some(*single)),
            [(first, _), (second, _), ..] => Err(RaspeError::validation(format!(
                "only one list-valued parameter is supported, got '{first}' and '{second}'"
            ))),
        }
    }

    /// Scalar parameters, i.e. everything held fixed across fan-out.
    #[must_use]
    pub fn fixed_params(&self) -> SearchParams {
        let mut params = SearchParams::new();
        for (key, value) in &self.params {
            if let ParamValue::Scalar(v) = value {
                params.insert(key.clone(), v.clone());
            }
        }
        params
    }

    /// Validate the request and normalize date parameters to `YYYY-MM-DD`.
    ///
    /// # Errors
    /// Returns a validation error for more than one list-valued parameter,
    /// an unparseable date, or a date range whose start is after its end.
    pub fn validate(&mut self) -> Result<()> {
        self.list_param()?;

        // blank dates mean "no bound"
        self.params.retain(|(key, value)| {
            !(dates::is_date_param(key)
                && matches!(value, ParamValue::Scalar(v) if v.trim().is_empty()))
        });

        for (key, value) in &mut self.params {
            if !dates::is_date_param(key) {
                continue;
            }
            match value {
                ParamValue::Scalar(v) => *v = dates::normalize_date(key, v)?,
                ParamValue::List(values) => {
                    for v in values.iter_mut() {
                        *v = dates::normalize_date(key, v)?;
                    }
                }
            }
        }

        for (start_key, end_key) in dates::DATE_RANGE_PAIRS {
            if let (Some(start), Some(end)) = (self.scalar(start_key), self.scalar(end_key)) {
                dates::check_range(start_key, start, end_key, end)?;
            }
        }

        Ok(())
    }
}

/// Ordered scalar parameters for one harvest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SearchParams(Vec<(String, String)>);

impl SearchParams {
    /// Create an empty parameter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        if let Some(slot) = self.0.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value;
        } else {
            self.0.push((key, value));
        }
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Look up a value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Look up a required value.
    ///
    /// # Errors
    /// Returns a validation error when the key is missing or blank.
    pub fn require(&self, key: &str) -> Result<&str> {
        self.get(key)
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| RaspeError::validation(format!("missing required parameter '{key}'")))
    }

    /// Iterate in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no parameters are set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Fail on any key outside `accepted`.
    pub fn reject_unknown(&self, source: &str, accepted: &[&str]) -> Result<()> {
        let unknown: Vec<&str> = self
            .0
            .iter()
            .map(|(k, _)| k.as_str())
            .filter(|k| !accepted.contains(k))
            .collect();

        if unknown.is_empty() {
            Ok(())
        } else {
            Err(RaspeError::validation(format!(
                "{source} does not accept parameter(s) {}; accepted: {}",
                unknown.join(", "),
                accepted.join(", ")
            )))
        }
    }
}

/// Half-open range of logical page indices, `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRange {
    /// First page (inclusive)
    pub start: u32,
    /// Upper bound (exclusive)
    pub end: u32,
}

impl PageRange {
    /// Create a range `[start, end)`.
    #[must_use]
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// Every page of a result set with `total` pages: `[1, total + 1)`.
    #[must_use]
    pub fn all(total: u32) -> Self {
        Self::new(1, total.saturating_add(1))
    }

    /// An empty range.
    #[must_use]
    pub fn empty() -> Self {
        Self::new(1, 1)
    }

    /// Clamp the upper bound so no page past `total` is requested.
    #[must_use]
    pub fn clamp_to(self, total: u32) -> Self {
        let end = self.end.min(total.saturating_add(1));
        if end <= self.start {
            Self::empty()
        } else {
            Self::new(self.start, end)
        }
    }

    /// Whether the range yields no pages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Number of pages in the range.
    #[must_use]
    pub fn len(&self) -> u32 {
        self.end.saturating_sub(self.start)
    }

    /// Iterate page indices in increasing order.
    pub fn iter(&self) -> Range<u32> {
        self.start..self.end.max(self.start)
    }
}

impl fmt::Display for PageRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

impl FromStr for PageRange {
    type Err = RaspeError;

    /// Parses `A..B` (exclusive), `A..=B` (inclusive) or a single page `N`.
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || RaspeError::validation(format!("invalid page range '{s}'"));
        let parse = |v: &str| v.trim().parse::<u32>().map_err(|_| invalid());

        if let Some((start, end)) = s.split_once("..=") {
            Ok(Self::new(parse(start)?, parse(end)?.saturating_add(1)))
        } else if let Some((start, end)) = s.split_once("..") {
            Ok(Self::new(parse(start)?, parse(end)?))
        } else {
            let page = parse(s)?;
            Ok(Self::new(page, page.saturating_add(1)))
        }
    }
}

/// Format of a raw page payload on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadFormat {
    /// Rendered HTML document
    Html,
    /// JSON API response
    Json,
}

impl PayloadFormat {
    /// File extension used for persisted payloads.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Json => "json",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_id_valid() {
        assert!(SourceId::new("ipea").is_ok());
        assert!(SourceId::new("datalegis-ans").is_ok());
    }

    #[test]
    fn test_source_id_invalid() {
        assert!(SourceId::new("IPEA").is_err());
        assert!(SourceId::new("-ans").is_err());
        assert!(SourceId::new("a").is_err());
    }

    #[test]
    fn test_request_keeps_order_and_replaces() {
        let request = SearchRequest::new()
            .with_param("pesquisa", "a")
            .with_param("data_inicio", "2024-01-01")
            .with_param("pesquisa", "b");

        let keys: Vec<&str> = request.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["pesquisa", "data_inicio"]);
        assert_eq!(request.scalar("pesquisa"), Some("b"));
    }

    #[test]
    fn test_single_list_param() {
        let request = SearchRequest::new()
            .with_list("termo", ["x", "y"])
            .with_param("site", "todos");
        let (key, values) = request.list_param().unwrap().unwrap();
        assert_eq!(key, "termo");
        assert_eq!(values, ["x".to_string(), "y".to_string()]);
        assert_eq!(request.fixed_params().len(), 1);
    }

    #[test]
    fn test_two_list_params_rejected() {
        let mut request = SearchRequest::new()
            .with_list("termo", ["x"])
            .with_list("assunto", ["y"]);
        let err = request.validate().unwrap_err();
        assert!(matches!(err, RaspeError::Validation(_)));
        assert!(err.to_string().contains("termo"));
        assert!(err.to_string().contains("assunto"));
    }

    #[test]
    fn test_validate_normalizes_dates() {
        let mut request = SearchRequest::new()
            .with_param("data_inicio", "01/02/2024")
            .with_param("data_fim", "20240301");
        request.validate().unwrap();
        assert_eq!(request.scalar("data_inicio"), Some("2024-02-01"));
        assert_eq!(request.scalar("data_fim"), Some("2024-03-01"));
    }

    #[test]
    fn test_validate_rejects_inverted_range() {
        let mut request = SearchRequest::new()
            .with_param("begin_date", "2024-05-01")
            .with_param("end_date", "2024-04-01");
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_validate_list_of_dates() {
        let mut request = SearchRequest::new().with_list("inicio", ["01/01/2023", "bad"]);
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_params_reject_unknown() {
        let params = SearchParams::new().with("pesquisa", "x").with("foo", "1");
        let err = params.reject_unknown("ipea", &["pesquisa"]).unwrap_err();
        assert!(err.to_string().contains("foo"));
        assert!(params.reject_unknown("ipea", &["pesquisa", "foo"]).is_ok());
    }

    #[test]
    fn test_params_require() {
        let params = SearchParams::new().with("pesquisa", "  ");
        assert!(params.require("pesquisa").is_err());
        assert!(params.require("termo").is_err());
    }

    #[test]
    fn test_page_range_clamp() {
        assert_eq!(PageRange::new(1, 1000).clamp_to(5), PageRange::new(1, 6));
        assert_eq!(PageRange::new(2, 4).clamp_to(10), PageRange::new(2, 4));
        assert!(PageRange::new(7, 9).clamp_to(5).is_empty());
        assert!(PageRange::new(1, 10).clamp_to(0).is_empty());
        assert_eq!(PageRange::all(3).iter().collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn test_page_range_inverted_is_empty() {
        let range = PageRange::new(5, 2);
        assert!(range.is_empty());
        assert_eq!(range.len(), 0);
        assert_eq!(range.iter().count(), 0);
    }

    #[test]
    fn test_page_range_parse() {
        assert_eq!("1..4".parse::<PageRange>().unwrap(), PageRange::new(1, 4));
        assert_eq!("2..=3".parse::<PageRange>().unwrap(), PageRange::new(2, 4));
        assert_eq!("7".parse::<PageRange>().unwrap(), PageRange::new(7, 8));
        assert!("a..b".parse::<PageRange>().is_err());
    }

    #[test]
    fn test_payload_extension() {
        assert_eq!(PayloadFormat::Html.extension(), "html");
        assert_eq!(PayloadFormat::Json.extension(), "json");
    }
}
