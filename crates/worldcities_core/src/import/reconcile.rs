//! Two-phase reconciliation of a source dataset against the store.
//!
//! # Responsibility
//! - Decide "new" vs "existing" for every source row by natural key.
//! - Commit new countries, then new cities, each in one batched save.
//!
//! # Invariants
//! - Store I/O happens at exactly four points: read-all countries, save
//!   countries, read-all cities, save cities. Empty saves are skipped.
//! - Cities only reference country ids returned by the store.
//! - Any malformed row aborts the run before the countries commit.
//! - Callers guarantee a single concurrent run per store.

use crate::import::index::{CityIndex, CountryIndex};
use crate::import::source::{RawSourceRow, SourceRow};
use crate::model::city::NewCity;
use crate::model::country::NewCountry;
use crate::model::natural_key::CityKey;
use crate::model::validation::FieldIssue;
use crate::repo::city_repo::CityRepository;
use crate::repo::country_repo::CountryRepository;
use crate::repo::RepoError;
use log::{error, info};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;
use uuid::Uuid;

/// Counts reported by a successful run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub countries_added: u64,
    pub cities_added: u64,
}

/// Stage of a run at which a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportPhase {
    /// Raw row conversion; nothing touched the store.
    Parse,
    Countries,
    Cities,
}

impl ImportPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Parse => "parse",
            Self::Countries => "countries",
            Self::Cities => "cities",
        }
    }
}

impl Display for ImportPhase {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cause of a failed run.
#[derive(Debug)]
pub enum ImportFailure {
    /// A row is missing a required column or has an unusable value.
    MalformedRow {
        index: usize,
        issue: FieldIssue,
        row: String,
    },
    /// A city row's country has no committed id.
    UnresolvedForeignKey { index: usize, country_name: String },
    /// A bulk read failed.
    StoreUnavailable(RepoError),
    /// A batched save failed; that phase committed nothing.
    CommitFailed(RepoError),
}

impl ImportFailure {
    pub fn code(&self) -> &'static str {
        match self {
            Self::MalformedRow { .. } => "malformed_row",
            Self::UnresolvedForeignKey { .. } => "unresolved_foreign_key",
            Self::StoreUnavailable(_) => "store_unavailable",
            Self::CommitFailed(_) => "commit_failed",
        }
    }
}

impl Display for ImportFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MalformedRow { index, issue, row } => {
                write!(f, "malformed row {index} ({row}): {issue}")
            }
            Self::UnresolvedForeignKey {
                index,
                country_name,
            } => write!(
                f,
                "row {index} references unresolved country `{country_name}`"
            ),
            Self::StoreUnavailable(err) => write!(f, "store read failed: {err}"),
            Self::CommitFailed(err) => write!(f, "batched save failed: {err}"),
        }
    }
}

impl Error for ImportFailure {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::MalformedRow { issue, .. } => Some(issue),
            Self::UnresolvedForeignKey { .. } => None,
            Self::StoreUnavailable(err) | Self::CommitFailed(err) => Some(err),
        }
    }
}

/// Fatal outcome of a reconciliation run.
///
/// `countries_added` counts countries already committed before the failure.
#[derive(Debug)]
pub struct ReconciliationFailed {
    pub phase: ImportPhase,
    pub countries_added: u64,
    pub failure: ImportFailure,
}

impl ReconciliationFailed {
    fn new(phase: ImportPhase, countries_added: u64, failure: ImportFailure) -> Self {
        Self {
            phase,
            countries_added,
            failure,
        }
    }

    /// Whether the countries phase committed before the run failed.
    ///
    /// When `true`, only the city phase needs to be re-run.
    pub fn is_partial(&self) -> bool {
        self.phase == ImportPhase::Cities
    }
}

impl Display for ReconciliationFailed {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "reconciliation failed in {} phase after {} countries committed: {}",
            self.phase, self.countries_added, self.failure
        )
    }
}

impl Error for ReconciliationFailed {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.failure)
    }
}

/// Bulk import service over country and city repositories.
pub struct ImportService<C: CountryRepository, Y: CityRepository> {
    countries: C,
    cities: Y,
}

impl<C: CountryRepository, Y: CityRepository> ImportService<C, Y> {
    pub fn new(countries: C, cities: Y) -> Self {
        Self { countries, cities }
    }

    /// Parses raw rows, then reconciles them.
    ///
    /// The first unparsable row aborts before any store access.
    pub fn reconcile_raw(
        &self,
        rows: &[RawSourceRow],
    ) -> Result<ImportSummary, ReconciliationFailed> {
        let parsed = rows
            .iter()
            .enumerate()
            .map(|(index, raw)| {
                raw.parse().map_err(|issue| {
                    ReconciliationFailed::new(
                        ImportPhase::Parse,
                        0,
                        ImportFailure::MalformedRow {
                            index,
                            issue,
                            row: raw.summary(),
                        },
                    )
                })
            })
            .collect::<Result<Vec<_>, _>>();

        match parsed {
            Ok(parsed) => self.reconcile(&parsed),
            Err(err) => {
                error!(
                    "event=import_run module=import status=error phase={} error_code={}",
                    err.phase,
                    err.failure.code()
                );
                Err(err)
            }
        }
    }

    /// Inserts countries and cities from `rows` that the store lacks.
    ///
    /// `rows` is traversed once per phase.
    pub fn reconcile<'a, I>(&self, rows: I) -> Result<ImportSummary, ReconciliationFailed>
    where
        I: IntoIterator<Item = &'a SourceRow> + Clone,
    {
        let run_id = Uuid::new_v4();
        let started_at = Instant::now();
        info!("event=import_run module=import status=start run_id={run_id}");

        let result = self.run_phases(run_id, rows);
        match &result {
            Ok(summary) => info!(
                "event=import_run module=import status=ok run_id={} countries_added={} cities_added={} duration_ms={}",
                run_id,
                summary.countries_added,
                summary.cities_added,
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event=import_run module=import status=error run_id={} phase={} countries_added={} error_code={} duration_ms={}",
                run_id,
                err.phase,
                err.countries_added,
                err.failure.code(),
                started_at.elapsed().as_millis()
            ),
        }
        result
    }

    fn run_phases<'a, I>(&self, run_id: Uuid, rows: I) -> Result<ImportSummary, ReconciliationFailed>
    where
        I: IntoIterator<Item = &'a SourceRow> + Clone,
    {
        let (country_index, countries_added) = self.reconcile_countries(run_id, rows.clone())?;
        let cities_added = self.reconcile_cities(run_id, &country_index, countries_added, rows)?;
        Ok(ImportSummary {
            countries_added,
            cities_added,
        })
    }

    fn reconcile_countries<'a, I>(
        &self,
        run_id: Uuid,
        rows: I,
    ) -> Result<(CountryIndex, u64), ReconciliationFailed>
    where
        I: IntoIterator<Item = &'a SourceRow>,
    {
        let phase = ImportPhase::Countries;
        let started_at = Instant::now();
        let fail = |failure| ReconciliationFailed::new(phase, 0, failure);

        let existing = self
            .countries
            .list_countries()
            .map_err(|err| fail(ImportFailure::StoreUnavailable(err)))?;
        let mut index = CountryIndex::from_countries(existing);

        let mut staged = Vec::new();
        let mut scanned = 0_usize;
        for (row_index, row) in rows.into_iter().enumerate() {
            scanned += 1;
            row.validate().map_err(|issue| {
                fail(ImportFailure::MalformedRow {
                    index: row_index,
                    issue,
                    row: row.summary(),
                })
            })?;
            if index.stage(&row.country_name) {
                staged.push(NewCountry::new(
                    row.country_name.trim(),
                    row.iso2.trim(),
                    row.iso3.trim(),
                ));
            }
        }

        let mut added = 0_u64;
        if !staged.is_empty() {
            let saved = self
                .countries
                .save_countries(&staged)
                .map_err(|err| fail(ImportFailure::CommitFailed(err)))?;
            added = saved.len() as u64;
            info!(
                "event=import_commit module=import status=ok run_id={run_id} phase={phase} rows={added}"
            );
            index.commit_staged(saved).map_err(|message| {
                ReconciliationFailed::new(
                    phase,
                    added,
                    ImportFailure::CommitFailed(RepoError::InvalidData(message)),
                )
            })?;
        }

        info!(
            "event=import_phase module=import status=ok run_id={} phase={} scanned={} known={} added={} duration_ms={}",
            run_id,
            phase,
            scanned,
            index.len(),
            added,
            started_at.elapsed().as_millis()
        );
        Ok((index, added))
    }

    fn reconcile_cities<'a, I>(
        &self,
        run_id: Uuid,
        countries: &CountryIndex,
        countries_added: u64,
        rows: I,
    ) -> Result<u64, ReconciliationFailed>
    where
        I: IntoIterator<Item = &'a SourceRow>,
    {
        let phase = ImportPhase::Cities;
        let started_at = Instant::now();
        let fail = |failure| ReconciliationFailed::new(phase, countries_added, failure);

        let existing = self
            .cities
            .list_cities()
            .map_err(|err| fail(ImportFailure::StoreUnavailable(err)))?;
        let mut index = CityIndex::from_cities(existing);

        let mut staged = Vec::new();
        let mut scanned = 0_usize;
        for (row_index, row) in rows.into_iter().enumerate() {
            scanned += 1;
            let country_id = countries.country_id(&row.country_name).ok_or_else(|| {
                fail(ImportFailure::UnresolvedForeignKey {
                    index: row_index,
                    country_name: row.country_name.clone(),
                })
            })?;
            let key = CityKey::new(&row.city_name, row.lat, row.lon, country_id);
            if index.stage(&key) {
                staged.push(NewCity::from(key));
            }
        }

        let mut added = 0_u64;
        if !staged.is_empty() {
            let saved = self
                .cities
                .save_cities(&staged)
                .map_err(|err| fail(ImportFailure::CommitFailed(err)))?;
            added = saved.len() as u64;
            info!(
                "event=import_commit module=import status=ok run_id={run_id} phase={phase} rows={added}"
            );
        }

        info!(
            "event=import_phase module=import status=ok run_id={} phase={} scanned={} known={} added={} duration_ms={}",
            run_id,
            phase,
            scanned,
            index.len(),
            added,
            started_at.elapsed().as_millis()
        );
        Ok(added)
    }
}
