//! Date parameter validation.
//!
//! Sources accept dates in a handful of spellings. Everything is normalized
//! to ISO `YYYY-MM-DD` before a query is built; sources that need another
//! wire format convert from there.

use crate::error::{RaspeError, Result};
use chrono::NaiveDate;
use regex::Regex;
use std::sync::OnceLock;

/// Accepted input spellings with the exact shape each must have, tried in order.
const INPUT_FORMATS: &[(&str, &str)] = &[
    ("%Y-%m-%d", r"^\d{4}-\d{2}-\d{2}$"),
    ("%d/%m/%Y", r"^\d{2}/\d{2}/\d{4}$"),
    ("%Y%m%d", r"^\d{8}$"),
];

/// Parameter pairs that describe a start/end range.
pub const DATE_RANGE_PAIRS: &[(&str, &str)] = &[
    ("data_inicio", "data_fim"),
    ("data_inicial", "data_final"),
    ("inicio", "fim"),
    ("begin_date", "end_date"),
];

/// Whether `key` names a date parameter.
#[must_use]
pub fn is_date_param(key: &str) -> bool {
    DATE_RANGE_PAIRS
        .iter()
        .any(|(start, end)| *start == key || *end == key)
}

/// Parse a date in any accepted spelling.
///
/// # Errors
/// Returns a validation error naming `param` when the value matches no
/// accepted spelling or is not a real calendar date.
pub fn parse_date(param: &str, value: &str) -> Result<NaiveDate> {
    static SHAPES: OnceLock<Vec<(&'static str, Regex)>> = OnceLock::new();
    let shapes = SHAPES.get_or_init(|| {
        INPUT_FORMATS
            .iter()
            .map(|(fmt, shape)| (*fmt, Regex::new(shape).expect("valid regex")))
            .collect()
    });

    let trimmed = value.trim();
    let (fmt, _) = shapes
        .iter()
        .find(|(_, shape)| shape.is_match(trimmed))
        .ok_or_else(|| {
            RaspeError::validation(format!(
                "{param}: invalid date '{value}' (expected YYYY-MM-DD, DD/MM/YYYY or YYYYMMDD)"
            ))
        })?;

    NaiveDate::parse_from_str(trimmed, fmt).map_err(|_| {
        RaspeError::validation(format!(
            "{param}: impossible date '{value}', check day, month and year"
        ))
    })
}

/// Normalize a date to `YYYY-MM-DD`.
pub fn normalize_date(param: &str, value: &str) -> Result<String> {
    Ok(parse_date(param, value)?.format("%Y-%m-%d").to_string())
}

/// Check that `start` is not after `end`.
pub fn check_range(start_param: &str, start: &str, end_param: &str, end: &str) -> Result<()> {
    let from = parse_date(start_param, start)?;
    let to = parse_date(end_param, end)?;
    if from > to {
        return Err(RaspeError::validation(format!(
            "{start_param} ({from}) is after {end_param} ({to})"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepted_spellings() {
        assert_eq!(normalize_date("inicio", "2024-03-05").unwrap(), "2024-03-05");
        assert_eq!(normalize_date("inicio", "05/03/2024").unwrap(), "2024-03-05");
        assert_eq!(normalize_date("inicio", "20240305").unwrap(), "2024-03-05");
        assert_eq!(normalize_date("inicio", " 2024-03-05 ").unwrap(), "2024-03-05");
    }

    #[test]
    fn test_rejects_impossible_dates() {
        assert!(normalize_date("fim", "2024-02-30").is_err());
        assert!(normalize_date("fim", "31/04/2024").is_err());
        assert!(normalize_date("fim", "yesterday").is_err());
        assert!(normalize_date("fim", "202403051").is_err());
        assert!(normalize_date("fim", "5/3/2024").is_err());
    }

    #[test]
    fn test_error_names_parameter() {
        let err = normalize_date("data_fim", "março").unwrap_err();
        assert!(err.to_string().contains("data_fim"));
    }

    #[test]
    fn test_range_order() {
        assert!(check_range("inicio", "01/01/2024", "fim", "2024-01-01").is_ok());
        assert!(check_range("inicio", "2024-01-02", "fim", "2024-01-01").is_err());
    }

    #[test]
    fn test_is_date_param() {
        assert!(is_date_param("data_inicio"));
        assert!(is_date_param("end_date"));
        assert!(!is_date_param("pesquisa"));
    }
}
