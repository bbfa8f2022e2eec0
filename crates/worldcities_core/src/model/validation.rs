//! Field-level rules shared by import rows and edit forms.
//!
//! # Responsibility
//! - Check required text, ISO code patterns and coordinate ranges.
//! - Report failures per field so callers can attach them to inputs.

use crate::model::coordinate::{Coordinate, CoordinateError};
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

static ISO2_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-zA-Z]{2}$").expect("valid iso2 regex"));
static ISO3_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-zA-Z]{3}$").expect("valid iso3 regex"));

pub const LATITUDE_MIN: i64 = -90;
pub const LATITUDE_MAX: i64 = 90;
pub const LONGITUDE_MIN: i64 = -180;
pub const LONGITUDE_MAX: i64 = 180;

/// Why a single field was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    /// Value is missing or blank after trim.
    Required,
    /// Value does not match the expected shape.
    Pattern { expected: &'static str },
    /// Numeric value lies outside the accepted range (degrees).
    OutOfRange { min: i64, max: i64 },
}

impl Display for FieldError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Required => write!(f, "value is required"),
            Self::Pattern { expected } => write!(f, "expected {expected}"),
            Self::OutOfRange { min, max } => write!(f, "must be between {min} and {max}"),
        }
    }
}

/// One rejected field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldIssue {
    pub field: &'static str,
    pub error: FieldError,
}

impl FieldIssue {
    pub fn new(field: &'static str, error: FieldError) -> Self {
        Self { field, error }
    }
}

impl Display for FieldIssue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.error)
    }
}

impl Error for FieldIssue {}

/// Trims a display name; blank input is rejected.
pub fn normalize_name(field: &'static str, value: &str) -> Result<String, FieldIssue> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(FieldIssue::new(field, FieldError::Required));
    }
    Ok(trimmed.to_string())
}

/// Validates an ISO 3166-1 alpha-2 code and returns it trimmed.
pub fn validate_iso2(value: &str) -> Result<String, FieldIssue> {
    validate_code("iso2", value, &ISO2_RE, "exactly 2 letters")
}

/// Validates an ISO 3166-1 alpha-3 code and returns it trimmed.
pub fn validate_iso3(value: &str) -> Result<String, FieldIssue> {
    validate_code("iso3", value, &ISO3_RE, "exactly 3 letters")
}

fn validate_code(
    field: &'static str,
    value: &str,
    pattern: &Regex,
    expected: &'static str,
) -> Result<String, FieldIssue> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(FieldIssue::new(field, FieldError::Required));
    }
    if !pattern.is_match(trimmed) {
        return Err(FieldIssue::new(field, FieldError::Pattern { expected }));
    }
    Ok(trimmed.to_string())
}

/// Parses latitude text and checks the [-90, 90] range.
pub fn parse_latitude(value: &str) -> Result<Coordinate, FieldIssue> {
    parse_coordinate("lat", value, LATITUDE_MIN, LATITUDE_MAX)
}

/// Parses longitude text and checks the [-180, 180] range.
pub fn parse_longitude(value: &str) -> Result<Coordinate, FieldIssue> {
    parse_coordinate("lon", value, LONGITUDE_MIN, LONGITUDE_MAX)
}

pub fn check_latitude(value: Coordinate) -> Result<(), FieldIssue> {
    check_range("lat", value, LATITUDE_MIN, LATITUDE_MAX)
}

pub fn check_longitude(value: Coordinate) -> Result<(), FieldIssue> {
    check_range("lon", value, LONGITUDE_MIN, LONGITUDE_MAX)
}

fn parse_coordinate(
    field: &'static str,
    value: &str,
    min: i64,
    max: i64,
) -> Result<Coordinate, FieldIssue> {
    if value.trim().is_empty() {
        return Err(FieldIssue::new(field, FieldError::Required));
    }
    let coordinate = Coordinate::parse(value).map_err(|err| match err {
        CoordinateError::Malformed(_) => FieldIssue::new(
            field,
            FieldError::Pattern {
                expected: "a decimal number with up to 4 fractional digits",
            },
        ),
        CoordinateError::Overflow(_) => {
            FieldIssue::new(field, FieldError::OutOfRange { min, max })
        }
    })?;
    check_range(field, coordinate, min, max)?;
    Ok(coordinate)
}

fn check_range(
    field: &'static str,
    value: Coordinate,
    min: i64,
    max: i64,
) -> Result<(), FieldIssue> {
    if value.within_degrees(min, max) {
        Ok(())
    } else {
        Err(FieldIssue::new(field, FieldError::OutOfRange { min, max }))
    }
}

#[cfg(test)]
mod tests {
    use super::{
        normalize_name, parse_latitude, parse_longitude, validate_iso2, validate_iso3, FieldError,
    };

    #[test]
    fn iso_codes_accept_letters_of_either_case() {
        assert_eq!(validate_iso2(" fr ").unwrap(), "fr");
        assert_eq!(validate_iso3("FRA").unwrap(), "FRA");
    }

    #[test]
    fn iso_codes_reject_wrong_length_or_digits() {
        let issue = validate_iso2("FRA").unwrap_err();
        assert_eq!(issue.field, "iso2");
        assert!(matches!(issue.error, FieldError::Pattern { .. }));

        let issue = validate_iso3("F1A").unwrap_err();
        assert_eq!(issue.field, "iso3");

        let issue = validate_iso3("  ").unwrap_err();
        assert_eq!(issue.error, FieldError::Required);
    }

    #[test]
    fn names_are_trimmed_and_blank_rejected() {
        assert_eq!(normalize_name("name", "  Paris ").unwrap(), "Paris");
        assert_eq!(
            normalize_name("name", "\t").unwrap_err().error,
            FieldError::Required
        );
    }

    #[test]
    fn coordinates_enforce_pattern_and_range() {
        assert_eq!(parse_latitude("48.8566").unwrap().units(), 488_566);
        assert!(matches!(
            parse_latitude("91").unwrap_err().error,
            FieldError::OutOfRange { min: -90, max: 90 }
        ));
        assert!(parse_longitude("-180").is_ok());
        assert!(matches!(
            parse_longitude("2.35221").unwrap_err().error,
            FieldError::Pattern { .. }
        ));
        assert_eq!(parse_longitude("").unwrap_err().error, FieldError::Required);
    }
}
