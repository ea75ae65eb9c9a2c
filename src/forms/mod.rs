//! Form payloads submitted by the portals and the JSON API.

use chrono::{NaiveDate, NaiveDateTime};
use thiserror::Error;
use validator::ValidationErrors;

use crate::domain::types::TypeConstraintError;

pub mod admin;
pub mod bookings;
pub mod catalog;
pub mod dental_chart;
pub mod documents;
pub mod messages;
pub mod offers;
pub mod plans;
pub mod quote;

#[derive(Debug, Error)]
/// Errors that can occur when processing form data.
pub enum FormError {
    #[error("validation errors: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("{0}")]
    Constraint(#[from] TypeConstraintError),

    #[error("invalid date: {0}")]
    InvalidDate(String),

    #[error("invalid status: {0}")]
    InvalidStatus(String),

    #[error("csv error: {0}")]
    Csv(String),

    #[error("line {line}: {reason}")]
    CsvRow { line: u64, reason: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Toggle posted by activate/deactivate buttons.
#[derive(Debug, serde::Deserialize)]
pub struct ActiveForm {
    pub active: bool,
}

/// Treats blank inputs as absent.
pub(crate) fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Parses the value of an `<input type="datetime-local">`.
pub(crate) fn parse_datetime_local(value: &str) -> Result<NaiveDateTime, FormError> {
    let value = value.trim();
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S"))
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M"))
        .map_err(|_| FormError::InvalidDate(value.to_string()))
}

/// Parses the value of an `<input type="date">`, blank meaning none.
pub(crate) fn parse_optional_date(value: &Option<String>) -> Result<Option<NaiveDate>, FormError> {
    match non_blank(value) {
        Some(raw) => NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| FormError::InvalidDate(raw)),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn datetime_local_accepts_browser_format() {
        let parsed = parse_datetime_local("2026-11-03T09:30").unwrap();
        assert_eq!(parsed.to_string(), "2026-11-03 09:30:00");
        assert!(parse_datetime_local("03/11/2026").is_err());
    }

    #[test]
    fn blank_dates_are_none() {
        assert_eq!(parse_optional_date(&Some("  ".into())).unwrap(), None);
        assert!(parse_optional_date(&Some("2026-13-01".into())).is_err());
    }
}
