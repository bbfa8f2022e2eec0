//! City edit use-case service.
//!
//! # Responsibility
//! - Validate city forms, resolve the owning country and reject composite
//!   key duplicates before committing.
//!
//! # Invariants
//! - The owning country must exist when the city is written.
//! - The edited city is excluded from its own duplicate check.

use crate::model::city::{City, CityId, NewCity};
use crate::model::country::CountryId;
use crate::model::natural_key::CityKey;
use crate::model::validation::{
    normalize_name, parse_latitude, parse_longitude, FieldError, FieldIssue,
};
use crate::repo::city_repo::CityRepository;
use crate::repo::country_repo::CountryRepository;
use crate::repo::{RepoError, RepoResult};
use crate::service::duplicate_service::{city_key_taken, ExcludeId};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Service error for city edit use-cases.
#[derive(Debug)]
pub enum CityServiceError {
    Invalid(Vec<FieldIssue>),
    /// Another city already has this composite key.
    Duplicate(CityKey),
    CityNotFound(CityId),
    CountryNotFound(CountryId),
    Repo(RepoError),
}

impl Display for CityServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Invalid(issues) => {
                let joined = issues
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("; ");
                write!(f, "invalid city: {joined}")
            }
            Self::Duplicate(key) => write!(
                f,
                "duplicate city `{}` at {},{} in country {}",
                key.name, key.lat, key.lon, key.country_id
            ),
            Self::CityNotFound(id) => write!(f, "city not found: {id}"),
            Self::CountryNotFound(id) => write!(f, "country not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for CityServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for CityServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(issue) => Self::Invalid(vec![issue]),
            other => Self::Repo(other),
        }
    }
}

/// City edit form values, as typed by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CityForm {
    pub name: String,
    pub lat: String,
    pub lon: String,
    pub country_id: CountryId,
}

impl CityForm {
    /// Validates every field, collecting all issues.
    pub fn validate(&self) -> Result<NewCity, Vec<FieldIssue>> {
        let name = normalize_name("name", &self.name);
        let lat = parse_latitude(&self.lat);
        let lon = parse_longitude(&self.lon);
        let country_id = if self.country_id > 0 {
            Ok(self.country_id)
        } else {
            Err(FieldIssue::new("country_id", FieldError::Required))
        };

        match (name, lat, lon, country_id) {
            (Ok(name), Ok(lat), Ok(lon), Ok(country_id)) => Ok(NewCity {
                name,
                lat,
                lon,
                country_id,
            }),
            (name, lat, lon, country_id) => Err([
                name.err(),
                lat.err(),
                lon.err(),
                country_id.err(),
            ]
            .into_iter()
            .flatten()
            .collect()),
        }
    }
}

/// City edit service facade.
pub struct CityService<Y: CityRepository, C: CountryRepository> {
    cities: Y,
    countries: C,
}

impl<Y: CityRepository, C: CountryRepository> CityService<Y, C> {
    pub fn new(cities: Y, countries: C) -> Self {
        Self { cities, countries }
    }

    pub fn get_city(&self, id: CityId) -> RepoResult<Option<City>> {
        self.cities.get_city(id)
    }

    /// Cities owned by one country, ordered by name.
    pub fn list_cities_by_country(&self, country_id: CountryId) -> RepoResult<Vec<City>> {
        self.cities.list_cities_by_country(country_id)
    }

    /// Advisory composite-key check for a form being edited.
    pub fn check_duplicate(
        &self,
        exclude: ExcludeId,
        form: &CityForm,
    ) -> Result<bool, CityServiceError> {
        let fields = form.validate().map_err(CityServiceError::Invalid)?;
        Ok(city_key_taken(&self.cities, &fields.key(), exclude)?)
    }

    /// Creates (`id = None`) or updates a city after validation.
    pub fn save_city(
        &self,
        id: Option<CityId>,
        form: &CityForm,
    ) -> Result<City, CityServiceError> {
        let fields = form.validate().map_err(CityServiceError::Invalid)?;

        if self.countries.get_country(fields.country_id)?.is_none() {
            return Err(CityServiceError::CountryNotFound(fields.country_id));
        }
        if let Some(id) = id {
            if self.cities.get_city(id)?.is_none() {
                return Err(CityServiceError::CityNotFound(id));
            }
        }

        let key = fields.key();
        if city_key_taken(&self.cities, &key, ExcludeId::from(id))? {
            return Err(CityServiceError::Duplicate(key));
        }

        let saved = match id {
            None => self.cities.create_city(&fields),
            Some(id) => {
                let city = fields.into_city(id);
                self.cities.update_city(&city).map(|()| city)
            }
        };

        saved.map_err(|err| match err {
            RepoError::UniqueViolation(_) => CityServiceError::Duplicate(key),
            RepoError::NotFound { id, .. } => CityServiceError::CityNotFound(id),
            other => other.into(),
        })
    }
}
