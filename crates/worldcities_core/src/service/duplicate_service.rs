//! Point-wise duplicate checks for interactive edits.
//!
//! # Responsibility
//! - Answer "does another record already own this natural key?".
//! - Exclude the record being edited from its own check.
//!
//! # Invariants
//! - Read-only; safe to call repeatedly and concurrently.
//! - Equality follows `model::natural_key`, the same rules the bulk import
//!   indexes use.
//! - Results are advisory: a concurrent write may invalidate them.

use crate::model::country::CountryId;
use crate::model::natural_key::{CityKey, CountryField};
use crate::repo::city_repo::CityRepository;
use crate::repo::country_repo::CountryRepository;
use crate::repo::RepoResult;
use log::debug;

/// Record excluded from a duplicate check (the one being edited).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExcludeId(Option<i64>);

impl ExcludeId {
    /// No exclusion; used by create flows.
    pub const NONE: Self = Self(None);

    /// Converts wire ids where `0` means "no exclusion".
    pub fn from_raw(raw: i64) -> Self {
        if raw > 0 {
            Self(Some(raw))
        } else {
            Self::NONE
        }
    }

    pub fn id(self) -> Option<i64> {
        self.0
    }
}

impl From<Option<i64>> for ExcludeId {
    fn from(value: Option<i64>) -> Self {
        value.map_or(Self::NONE, Self::from_raw)
    }
}

/// Natural key proposed by an edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DuplicateCandidate {
    /// One country column and its proposed value.
    Country { field: CountryField, value: String },
    /// Full composite city key.
    City(CityKey),
}

impl DuplicateCandidate {
    pub fn country(field: CountryField, value: impl Into<String>) -> Self {
        Self::Country {
            field,
            value: value.into(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Country { .. } => "country",
            Self::City(_) => "city",
        }
    }
}

/// Whether a country other than `exclude` already uses `value` for `field`.
///
/// Blank values never count as duplicates; they fail required-field checks.
pub fn country_field_taken<C: CountryRepository>(
    repo: &C,
    field: CountryField,
    value: &str,
    exclude: ExcludeId,
) -> RepoResult<bool> {
    if value.trim().is_empty() {
        return Ok(false);
    }
    let duplicate = repo.country_field_exists(field, value, exclude.id())?;
    debug!(
        "event=duplicate_check module=service kind=country field={} exclude={} duplicate={}",
        field,
        exclude.id().unwrap_or(0),
        duplicate
    );
    Ok(duplicate)
}

/// Whether a city other than `exclude` already has exactly `key`.
pub fn city_key_taken<Y: CityRepository>(
    repo: &Y,
    key: &CityKey,
    exclude: ExcludeId,
) -> RepoResult<bool> {
    let duplicate = repo.city_key_exists(key, exclude.id())?;
    debug!(
        "event=duplicate_check module=service kind=city country_id={} exclude={} duplicate={}",
        key.country_id,
        exclude.id().unwrap_or(0),
        duplicate
    );
    Ok(duplicate)
}

/// Duplicate-check facade over both entity repositories.
pub struct DuplicateCheckService<C: CountryRepository, Y: CityRepository> {
    countries: C,
    cities: Y,
}

impl<C: CountryRepository, Y: CityRepository> DuplicateCheckService<C, Y> {
    pub fn new(countries: C, cities: Y) -> Self {
        Self { countries, cities }
    }

    /// Returns `true` iff another record already owns `candidate`.
    pub fn is_duplicate(
        &self,
        candidate: &DuplicateCandidate,
        exclude: ExcludeId,
    ) -> RepoResult<bool> {
        match candidate {
            DuplicateCandidate::Country { field, value } => {
                country_field_taken(&self.countries, *field, value, exclude)
            }
            DuplicateCandidate::City(key) => city_key_taken(&self.cities, key, exclude),
        }
    }

    /// Checks one country column by its wire name.
    pub fn is_duplicate_country_field(
        &self,
        field: CountryField,
        value: &str,
        exclude: ExcludeId,
    ) -> RepoResult<bool> {
        country_field_taken(&self.countries, field, value, exclude)
    }

    pub fn is_duplicate_city(&self, key: &CityKey, exclude: ExcludeId) -> RepoResult<bool> {
        city_key_taken(&self.cities, key, exclude)
    }
}
