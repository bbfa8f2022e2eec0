//! Fixed-precision geographic coordinate.
//!
//! # Responsibility
//! - Represent latitude/longitude values with exactly 4 fractional digits.
//! - Parse and render the canonical decimal text form.
//!
//! # Invariants
//! - Values are stored as signed ten-thousandths, so equality is exact.
//! - Magnitude never exceeds `999.9999` (the `decimal(7,4)` column bound).

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Number of fractional digits carried by every coordinate.
pub const COORDINATE_SCALE_DIGITS: u32 = 4;
const SCALE: i64 = 10_000;
const MAX_ABS_UNITS: i64 = 9_999_999;

static COORDINATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-?[0-9]+(\.[0-9]{1,4})?$").expect("valid coordinate regex"));

/// Parse failure for coordinate text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoordinateError {
    /// Text does not match `-?digits(.d{1,4})?`.
    Malformed(String),
    /// Value does not fit `decimal(7,4)`.
    Overflow(String),
}

impl Display for CoordinateError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Malformed(value) => write!(
                f,
                "invalid coordinate `{value}`; expected up to 4 fractional digits"
            ),
            Self::Overflow(value) => write!(f, "coordinate `{value}` exceeds 999.9999"),
        }
    }
}

impl Error for CoordinateError {}

/// Latitude or longitude in ten-thousandths of a degree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Coordinate(i64);

impl Coordinate {
    /// Builds a coordinate from raw ten-thousandths.
    ///
    /// Returns `None` when the value does not fit `decimal(7,4)`.
    pub fn from_units(units: i64) -> Option<Self> {
        if units.abs() > MAX_ABS_UNITS {
            None
        } else {
            Some(Self(units))
        }
    }

    /// Raw ten-thousandths, as persisted.
    pub fn units(self) -> i64 {
        self.0
    }

    /// Whether the value lies within `[min_degrees, max_degrees]`.
    pub fn within_degrees(self, min_degrees: i64, max_degrees: i64) -> bool {
        self.0 >= min_degrees * SCALE && self.0 <= max_degrees * SCALE
    }

    /// Parses canonical decimal text such as `48.8566` or `-0.5`.
    pub fn parse(text: &str) -> Result<Self, CoordinateError> {
        let trimmed = text.trim();
        if !COORDINATE_RE.is_match(trimmed) {
            return Err(CoordinateError::Malformed(trimmed.to_string()));
        }

        let (negative, unsigned) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };
        let (whole, fraction) = unsigned.split_once('.').unwrap_or((unsigned, ""));

        let overflow = || CoordinateError::Overflow(trimmed.to_string());
        let whole: i64 = whole.parse().map_err(|_| overflow())?;
        let mut fraction_units: i64 = 0;
        for (position, digit) in fraction.bytes().enumerate() {
            let exponent = COORDINATE_SCALE_DIGITS - 1 - position as u32;
            fraction_units += i64::from(digit - b'0') * 10_i64.pow(exponent);
        }

        let magnitude = whole
            .checked_mul(SCALE)
            .and_then(|value| value.checked_add(fraction_units))
            .ok_or_else(overflow)?;
        let units = if negative { -magnitude } else { magnitude };
        Self::from_units(units).ok_or_else(overflow)
    }
}

impl Display for Coordinate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let magnitude = self.0.abs();
        write!(f, "{sign}{}.{:04}", magnitude / SCALE, magnitude % SCALE)
    }
}

impl FromStr for Coordinate {
    type Err = CoordinateError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

impl TryFrom<String> for Coordinate {
    type Error = CoordinateError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value.as_str())
    }
}

impl From<Coordinate> for String {
    fn from(value: Coordinate) -> Self {
        value.to_string()
    }
}
