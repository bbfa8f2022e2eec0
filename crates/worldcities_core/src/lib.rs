//! Core domain logic for WorldCities.
//! This crate owns the natural-key rules shared by bulk import and
//! interactive duplicate checks.

pub mod config;
pub mod db;
pub mod import;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::CoreConfig;
pub use db::{open_db, open_db_in_memory, DbError};
pub use import::reconcile::{
    ImportFailure, ImportPhase, ImportService, ImportSummary, ReconciliationFailed,
};
pub use import::source::{RawSourceRow, SourceRow};
pub use logging::{default_log_level, init_logging, init_logging_from_config, logging_status};
pub use model::city::{City, CityId, NewCity};
pub use model::coordinate::{Coordinate, CoordinateError};
pub use model::country::{Country, CountryId, NewCountry};
pub use model::natural_key::{CityKey, CountryField, UnknownCountryField};
pub use model::validation::{FieldError, FieldIssue};
pub use repo::city_repo::{CityRepository, SqliteCityRepository};
pub use repo::country_repo::{CountryRepository, SqliteCountryRepository};
pub use repo::{RepoError, RepoResult};
pub use service::city_service::{CityForm, CityService, CityServiceError};
pub use service::country_service::{CountryForm, CountryService, CountryServiceError};
pub use service::duplicate_service::{DuplicateCandidate, DuplicateCheckService, ExcludeId};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
