//! Natural-key normalization shared by bulk import and live checks.
//!
//! # Responsibility
//! - Define the one equality rule per natural key.
//! - Feed the in-memory import indexes, the persisted `name_key` column and
//!   the duplicate-check queries from the same functions.
//!
//! # Invariants
//! - Country names compare case-insensitively (Unicode lowercase, trimmed).
//! - ISO codes compare case-insensitively (ASCII uppercase, trimmed).
//! - City keys compare exactly: case-sensitive name, fixed-point coordinates,
//!   owning country id.

use crate::model::coordinate::Coordinate;
use crate::model::country::CountryId;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Folded form of a country name used for identity.
pub fn country_name_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Folded form of an ISO 3166-1 code used for identity.
///
/// Mirrors SQLite `upper()`, which folds ASCII only.
pub fn iso_code_key(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

/// Country columns that are checked for duplicates during edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CountryField {
    Name,
    Iso2,
    Iso3,
}

impl CountryField {
    pub const ALL: [CountryField; 3] = [Self::Name, Self::Iso2, Self::Iso3];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Iso2 => "iso2",
            Self::Iso3 => "iso3",
        }
    }

    /// Folds a candidate value with this field's equality rule.
    pub fn key(self, value: &str) -> String {
        match self {
            Self::Name => country_name_key(value),
            Self::Iso2 | Self::Iso3 => iso_code_key(value),
        }
    }
}

impl Display for CountryField {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown country field name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCountryField(pub String);

impl Display for UnknownCountryField {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "unknown country field `{}`; expected name|iso2|iso3",
            self.0
        )
    }
}

impl Error for UnknownCountryField {}

impl FromStr for CountryField {
    type Err = UnknownCountryField;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "name" => Ok(Self::Name),
            "iso2" => Ok(Self::Iso2),
            "iso3" => Ok(Self::Iso3),
            other => Err(UnknownCountryField(other.to_string())),
        }
    }
}

/// Composite natural key of a city.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CityKey {
    pub name: String,
    pub lat: Coordinate,
    pub lon: Coordinate,
    pub country_id: CountryId,
}

impl CityKey {
    /// Builds a key; the name is trimmed but keeps its case.
    pub fn new(
        name: impl AsRef<str>,
        lat: Coordinate,
        lon: Coordinate,
        country_id: CountryId,
    ) -> Self {
        Self {
            name: name.as_ref().trim().to_string(),
            lat,
            lon,
            country_id,
        }
    }
}
