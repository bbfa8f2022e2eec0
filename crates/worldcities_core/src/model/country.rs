//! Country domain model.
//!
//! # Invariants
//! - `id` is assigned by the store and never reused.
//! - No two persisted countries share a name under `country_name_key`.
//! - `iso2`/`iso3` uniqueness is an edit-time rule only.

use crate::model::natural_key::country_name_key;
use crate::model::validation::{normalize_name, validate_iso2, validate_iso3, FieldIssue};
use serde::{Deserialize, Serialize};

/// Store-assigned surrogate identifier.
pub type CountryId = i64;

/// Persisted country row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Country {
    pub id: CountryId,
    /// Display name (UTF-8).
    pub name: String,
    /// ISO 3166-1 alpha-2 code.
    pub iso2: String,
    /// ISO 3166-1 alpha-3 code.
    pub iso3: String,
}

impl Country {
    /// Folded name used as this country's natural key.
    pub fn name_key(&self) -> String {
        country_name_key(&self.name)
    }

    /// Validates fields and returns a trimmed copy with the same id.
    pub fn normalized(&self) -> Result<Self, FieldIssue> {
        let fields = NewCountry::new(self.name.as_str(), self.iso2.as_str(), self.iso3.as_str())
            .normalized()?;
        Ok(fields.into_country(self.id))
    }
}

/// Country not yet persisted; the store assigns its id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCountry {
    pub name: String,
    pub iso2: String,
    pub iso3: String,
}

impl NewCountry {
    pub fn new(name: impl Into<String>, iso2: impl Into<String>, iso3: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            iso2: iso2.into(),
            iso3: iso3.into(),
        }
    }

    pub fn name_key(&self) -> String {
        country_name_key(&self.name)
    }

    /// Validates fields and returns a trimmed copy ready for persistence.
    pub fn normalized(&self) -> Result<Self, FieldIssue> {
        Ok(Self {
            name: normalize_name("name", &self.name)?,
            iso2: validate_iso2(&self.iso2)?,
            iso3: validate_iso3(&self.iso3)?,
        })
    }

    /// Attaches a store-assigned id.
    pub fn into_country(self, id: CountryId) -> Country {
        Country {
            id,
            name: self.name,
            iso2: self.iso2,
            iso3: self.iso3,
        }
    }
}
