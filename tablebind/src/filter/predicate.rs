//! Date predicates used by the custom search pass.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::config::CellValue;

use super::DateRange;

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"];
const DATE_TIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Calendar date of a cell, if it holds or spells one.
pub fn cell_date(value: &CellValue) -> Option<NaiveDate> {
    match value {
        CellValue::Date(d) => Some(*d),
        CellValue::DateTime(dt) => Some(dt.date()),
        CellValue::Text(text) => parse_date(text),
        _ => None,
    }
}

/// Parse a date from text.
///
/// Accepts RFC 3339 timestamps, `YYYY-MM-DD`, `MM/DD/YYYY`, `YYYY/MM/DD` and
/// the common date-time layouts.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.date_naive());
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
        .or_else(|| {
            DATE_TIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
                .map(|dt| dt.date())
        })
}

/// Single date filter. Unset passes every row.
pub fn date_matches(value: &CellValue, filter: Option<NaiveDate>) -> bool {
    match filter {
        None => true,
        Some(wanted) => cell_date(value) == Some(wanted),
    }
}

/// Inclusive date range filter. Inactive until both bounds are set.
pub fn range_matches(value: &CellValue, range: &DateRange) -> bool {
    match (range.min, range.max) {
        (Some(min), Some(max)) => cell_date(value).is_some_and(|d| min <= d && d <= max),
        _ => true,
    }
}
