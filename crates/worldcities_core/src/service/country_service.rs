//! Country edit use-case service.
//!
//! # Responsibility
//! - Validate country forms and reject duplicates before committing.
//! - Provide the per-field advisory check used while a form is edited.
//!
//! # Invariants
//! - A save never reaches the store while any field is invalid or any of
//!   name/iso2/iso3 is owned by another country.
//! - The edited country is excluded from its own duplicate checks.

use crate::model::country::{Country, CountryId, NewCountry};
use crate::model::natural_key::CountryField;
use crate::model::validation::{normalize_name, validate_iso2, validate_iso3, FieldIssue};
use crate::repo::country_repo::CountryRepository;
use crate::repo::{RepoError, RepoResult};
use crate::service::duplicate_service::{country_field_taken, ExcludeId};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Service error for country edit use-cases.
#[derive(Debug)]
pub enum CountryServiceError {
    /// One or more fields failed validation.
    Invalid(Vec<FieldIssue>),
    /// These fields are already used by another country.
    Duplicate(Vec<CountryField>),
    CountryNotFound(CountryId),
    Repo(RepoError),
}

impl Display for CountryServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Invalid(issues) => {
                let joined = issues
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("; ");
                write!(f, "invalid country: {joined}")
            }
            Self::Duplicate(fields) => {
                let joined = fields
                    .iter()
                    .map(|field| field.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "duplicate country fields: {joined}")
            }
            Self::CountryNotFound(id) => write!(f, "country not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for CountryServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for CountryServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound { id, .. } => Self::CountryNotFound(id),
            RepoError::UniqueViolation(_) => Self::Duplicate(vec![CountryField::Name]),
            RepoError::Validation(issue) => Self::Invalid(vec![issue]),
            other => Self::Repo(other),
        }
    }
}

/// Country edit form values, as typed by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountryForm {
    pub name: String,
    pub iso2: String,
    pub iso3: String,
}

impl CountryForm {
    pub fn value(&self, field: CountryField) -> &str {
        match field {
            CountryField::Name => &self.name,
            CountryField::Iso2 => &self.iso2,
            CountryField::Iso3 => &self.iso3,
        }
    }

    /// Validates every field, collecting all issues.
    pub fn validate(&self) -> Result<NewCountry, Vec<FieldIssue>> {
        let name = normalize_name("name", &self.name);
        let iso2 = validate_iso2(&self.iso2);
        let iso3 = validate_iso3(&self.iso3);
        match (name, iso2, iso3) {
            (Ok(name), Ok(iso2), Ok(iso3)) => Ok(NewCountry::new(name, iso2, iso3)),
            (name, iso2, iso3) => Err([name.err(), iso2.err(), iso3.err()]
                .into_iter()
                .flatten()
                .collect()),
        }
    }
}

/// Country edit service facade.
pub struct CountryService<R: CountryRepository> {
    repo: R,
}

impl<R: CountryRepository> CountryService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn get_country(&self, id: CountryId) -> RepoResult<Option<Country>> {
        self.repo.get_country(id)
    }

    pub fn list_countries(&self) -> RepoResult<Vec<Country>> {
        self.repo.list_countries()
    }

    /// Advisory check for a single field while the form is edited.
    pub fn check_field(
        &self,
        exclude: ExcludeId,
        field: CountryField,
        value: &str,
    ) -> RepoResult<bool> {
        country_field_taken(&self.repo, field, value, exclude)
    }

    /// Fields of `form` already used by a country other than `exclude`.
    pub fn duplicate_fields(
        &self,
        exclude: ExcludeId,
        form: &CountryForm,
    ) -> RepoResult<Vec<CountryField>> {
        let mut duplicates = Vec::new();
        for field in CountryField::ALL {
            if country_field_taken(&self.repo, field, form.value(field), exclude)? {
                duplicates.push(field);
            }
        }
        Ok(duplicates)
    }

    /// Creates (`id = None`) or updates a country after validation.
    pub fn save_country(
        &self,
        id: Option<CountryId>,
        form: &CountryForm,
    ) -> Result<Country, CountryServiceError> {
        let fields = form.validate().map_err(CountryServiceError::Invalid)?;

        if let Some(id) = id {
            if self.repo.get_country(id)?.is_none() {
                return Err(CountryServiceError::CountryNotFound(id));
            }
        }

        let duplicates = self.duplicate_fields(ExcludeId::from(id), form)?;
        if !duplicates.is_empty() {
            return Err(CountryServiceError::Duplicate(duplicates));
        }

        match id {
            None => Ok(self.repo.create_country(&fields)?),
            Some(id) => {
                let country = fields.into_country(id);
                self.repo.update_country(&country)?;
                Ok(country)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::CountryForm;

    #[test]
    fn validate_collects_every_issue() {
        let form = CountryForm {
            name: " ".to_string(),
            iso2: "F".to_string(),
            iso3: "FRA".to_string(),
        };
        let issues = form.validate().unwrap_err();
        let fields: Vec<_> = issues.iter().map(|issue| issue.field).collect();
        assert_eq!(fields, vec!["name", "iso2"]);
    }

    #[test]
    fn validate_trims_accepted_values() {
        let form = CountryForm {
            name: " France ".to_string(),
            iso2: "fr".to_string(),
            iso3: " FRA".to_string(),
        };
        let country = form.validate().unwrap();
        assert_eq!(country.name, "France");
        assert_eq!(country.iso2, "fr");
        assert_eq!(country.iso3, "FRA");
    }
}
