//! City domain model.
//!
//! # Invariants
//! - `country_id` references an existing country when the city is committed.
//! - No two persisted cities share the same [`CityKey`].

use crate::model::coordinate::Coordinate;
use crate::model::country::CountryId;
use crate::model::natural_key::CityKey;
use crate::model::validation::{check_latitude, check_longitude, normalize_name, FieldIssue};
use serde::{Deserialize, Serialize};

/// Store-assigned surrogate identifier.
pub type CityId = i64;

/// Persisted city row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct City {
    pub id: CityId,
    /// Display name (UTF-8), compared case-sensitively.
    pub name: String,
    pub lat: Coordinate,
    pub lon: Coordinate,
    pub country_id: CountryId,
}

impl City {
    pub fn key(&self) -> CityKey {
        CityKey::new(&self.name, self.lat, self.lon, self.country_id)
    }

    /// Validates fields and returns a trimmed copy with the same id.
    pub fn normalized(&self) -> Result<Self, FieldIssue> {
        let fields = NewCity {
            name: self.name.clone(),
            lat: self.lat,
            lon: self.lon,
            country_id: self.country_id,
        }
        .normalized()?;
        Ok(fields.into_city(self.id))
    }
}

/// City not yet persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCity {
    pub name: String,
    pub lat: Coordinate,
    pub lon: Coordinate,
    pub country_id: CountryId,
}

impl NewCity {
    pub fn key(&self) -> CityKey {
        CityKey::new(&self.name, self.lat, self.lon, self.country_id)
    }

    /// Validates name and coordinate ranges; returns a trimmed copy.
    pub fn normalized(&self) -> Result<Self, FieldIssue> {
        check_latitude(self.lat)?;
        check_longitude(self.lon)?;
        Ok(Self {
            name: normalize_name("name", &self.name)?,
            lat: self.lat,
            lon: self.lon,
            country_id: self.country_id,
        })
    }

    pub fn into_city(self, id: CityId) -> City {
        City {
            id,
            name: self.name,
            lat: self.lat,
            lon: self.lon,
            country_id: self.country_id,
        }
    }
}

impl From<CityKey> for NewCity {
    fn from(key: CityKey) -> Self {
        Self {
            name: key.name,
            lat: key.lat,
            lon: key.lon,
            country_id: key.country_id,
        }
    }
}
