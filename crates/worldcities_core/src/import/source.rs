//! Source rows delivered by the import driver.
//!
//! # Responsibility
//! - Carry one parsed dataset record (city + owning country columns).
//! - Convert raw text columns into typed rows, reporting the failing field.

use crate::model::coordinate::Coordinate;
use crate::model::validation::{
    check_latitude, check_longitude, normalize_name, parse_latitude, parse_longitude,
    validate_iso2, validate_iso3, FieldIssue,
};
use serde::{Deserialize, Serialize};

/// Typed dataset row consumed by the reconciliation engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRow {
    pub city_name: String,
    /// ASCII transliteration; carried through, not used for identity.
    pub city_name_ascii: String,
    pub lat: Coordinate,
    pub lon: Coordinate,
    pub country_name: String,
    pub iso2: String,
    pub iso3: String,
}

impl SourceRow {
    /// Checks every column the engine relies on.
    pub fn validate(&self) -> Result<(), FieldIssue> {
        normalize_name("city", &self.city_name)?;
        normalize_name("country", &self.country_name)?;
        validate_iso2(&self.iso2)?;
        validate_iso3(&self.iso3)?;
        check_latitude(self.lat)?;
        check_longitude(self.lon)?;
        Ok(())
    }

    /// Short identifying text for diagnostics.
    pub fn summary(&self) -> String {
        format!(
            "city=`{}` lat={} lon={} country=`{}`",
            self.city_name, self.lat, self.lon, self.country_name
        )
    }
}

/// Untyped dataset row, exactly as read from the source file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSourceRow {
    pub city_name: String,
    pub city_name_ascii: String,
    pub lat: String,
    pub lon: String,
    pub country_name: String,
    pub iso2: String,
    pub iso3: String,
}

impl RawSourceRow {
    /// Parses and trims all columns into a [`SourceRow`].
    pub fn parse(&self) -> Result<SourceRow, FieldIssue> {
        Ok(SourceRow {
            city_name: normalize_name("city", &self.city_name)?,
            city_name_ascii: self.city_name_ascii.trim().to_string(),
            lat: parse_latitude(&self.lat)?,
            lon: parse_longitude(&self.lon)?,
            country_name: normalize_name("country", &self.country_name)?,
            iso2: validate_iso2(&self.iso2)?,
            iso3: validate_iso3(&self.iso3)?,
        })
    }

    pub fn summary(&self) -> String {
        format!(
            "city=`{}` lat=`{}` lon=`{}` country=`{}`",
            self.city_name, self.lat, self.lon, self.country_name
        )
    }
}

#[cfg(test)]
mod tests {
    use super::RawSourceRow;
    use crate::model::validation::FieldError;

    fn paris() -> RawSourceRow {
        RawSourceRow {
            city_name: " Paris ".to_string(),
            city_name_ascii: "Paris".to_string(),
            lat: "48.8566".to_string(),
            lon: "2.3522".to_string(),
            country_name: "France".to_string(),
            iso2: "FR".to_string(),
            iso3: "FRA".to_string(),
        }
    }

    #[test]
    fn parse_trims_and_types_columns() {
        let row = paris().parse().unwrap();
        assert_eq!(row.city_name, "Paris");
        assert_eq!(row.lat.to_string(), "48.8566");
        assert_eq!(row.lon.units(), 23_522);
        assert!(row.validate().is_ok());
    }

    #[test]
    fn parse_reports_the_failing_column() {
        let mut raw = paris();
        raw.lon = "east".to_string();
        let issue = raw.parse().unwrap_err();
        assert_eq!(issue.field, "lon");

        let mut raw = paris();
        raw.country_name = String::new();
        let issue = raw.parse().unwrap_err();
        assert_eq!(issue.field, "country");
        assert_eq!(issue.error, FieldError::Required);
    }
}
