//! Country repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide read-all, point, create/update and batched-save APIs over
//!   `countries` storage.
//! - Answer field-level existence queries for duplicate checks.
//!
//! # Invariants
//! - `name_key` is always written from `country_name_key(name)`.
//! - `save_countries` returns rows in input order with assigned ids.

use crate::model::country::{Country, CountryId, NewCountry};
use crate::model::natural_key::CountryField;
use crate::repo::{ensure_connection_ready, map_write_error, RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};

const COUNTRY_SELECT_SQL: &str = "SELECT
    id,
    name,
    iso2,
    iso3
FROM countries";

const COUNTRY_INSERT_SQL: &str = "INSERT INTO countries (
    name,
    name_key,
    iso2,
    iso3
) VALUES (?1, ?2, ?3, ?4);";

const NAME_KEY_INDEX: &str = "idx_countries_name_key";

/// Repository interface for country persistence.
pub trait CountryRepository {
    /// Reads the full country collection.
    fn list_countries(&self) -> RepoResult<Vec<Country>>;
    fn get_country(&self, id: CountryId) -> RepoResult<Option<Country>>;
    fn create_country(&self, country: &NewCountry) -> RepoResult<Country>;
    fn update_country(&self, country: &Country) -> RepoResult<()>;
    /// Persists all given countries in one transaction.
    fn save_countries(&self, batch: &[NewCountry]) -> RepoResult<Vec<Country>>;
    /// Whether a country other than `exclude` matches `value` on `field`.
    ///
    /// `value` is folded with [`CountryField::key`] before comparison.
    fn country_field_exists(
        &self,
        field: CountryField,
        value: &str,
        exclude: Option<CountryId>,
    ) -> RepoResult<bool>;
}

impl<T: CountryRepository + ?Sized> CountryRepository for &T {
    fn list_countries(&self) -> RepoResult<Vec<Country>> {
        (**self).list_countries()
    }

    fn get_country(&self, id: CountryId) -> RepoResult<Option<Country>> {
        (**self).get_country(id)
    }

    fn create_country(&self, country: &NewCountry) -> RepoResult<Country> {
        (**self).create_country(country)
    }

    fn update_country(&self, country: &Country) -> RepoResult<()> {
        (**self).update_country(country)
    }

    fn save_countries(&self, batch: &[NewCountry]) -> RepoResult<Vec<Country>> {
        (**self).save_countries(batch)
    }

    fn country_field_exists(
        &self,
        field: CountryField,
        value: &str,
        exclude: Option<CountryId>,
    ) -> RepoResult<bool> {
        (**self).country_field_exists(field, value, exclude)
    }
}

/// SQLite-backed country repository.
pub struct SqliteCountryRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCountryRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, "countries", &["id", "name", "name_key", "iso2", "iso3"])?;
        Ok(Self { conn })
    }
}

impl CountryRepository for SqliteCountryRepository<'_> {
    fn list_countries(&self) -> RepoResult<Vec<Country>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{COUNTRY_SELECT_SQL} ORDER BY id ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut countries = Vec::new();
        while let Some(row) = rows.next()? {
            countries.push(parse_country_row(row)?);
        }
        Ok(countries)
    }

    fn get_country(&self, id: CountryId) -> RepoResult<Option<Country>> {
        self.conn
            .query_row(
                &format!("{COUNTRY_SELECT_SQL} WHERE id = ?1;"),
                [id],
                |row| Ok(parse_country_row(row)),
            )
            .optional()?
            .transpose()
    }

    fn create_country(&self, country: &NewCountry) -> RepoResult<Country> {
        let country = country.normalized()?;
        let id = insert_country(self.conn, &country)?;
        Ok(country.into_country(id))
    }

    fn update_country(&self, country: &Country) -> RepoResult<()> {
        let country = country.normalized()?;
        let changed = self
            .conn
            .execute(
                "UPDATE countries
                 SET
                    name = ?2,
                    name_key = ?3,
                    iso2 = ?4,
                    iso3 = ?5
                 WHERE id = ?1;",
                params![
                    country.id,
                    country.name.as_str(),
                    country.name_key(),
                    country.iso2.as_str(),
                    country.iso3.as_str(),
                ],
            )
            .map_err(|err| map_write_error(err, NAME_KEY_INDEX))?;

        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "country",
                id: country.id,
            });
        }

        Ok(())
    }

    fn save_countries(&self, batch: &[NewCountry]) -> RepoResult<Vec<Country>> {
        let normalized = batch
            .iter()
            .map(NewCountry::normalized)
            .collect::<Result<Vec<_>, _>>()?;

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let mut saved = Vec::with_capacity(normalized.len());
        for country in normalized {
            let id = insert_country(&tx, &country)?;
            saved.push(country.into_country(id));
        }
        tx.commit()?;

        Ok(saved)
    }

    fn country_field_exists(
        &self,
        field: CountryField,
        value: &str,
        exclude: Option<CountryId>,
    ) -> RepoResult<bool> {
        let predicate = match field {
            CountryField::Name => "name_key = ?1",
            CountryField::Iso2 => "upper(iso2) = ?1",
            CountryField::Iso3 => "upper(iso3) = ?1",
        };
        let exists: i64 = self.conn.query_row(
            &format!(
                "SELECT EXISTS(
                    SELECT 1
                    FROM countries
                    WHERE {predicate}
                      AND (?2 IS NULL OR id <> ?2)
                );"
            ),
            params![field.key(value), exclude],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }
}

fn insert_country(conn: &Connection, country: &NewCountry) -> RepoResult<CountryId> {
    let mut stmt = conn.prepare_cached(COUNTRY_INSERT_SQL)?;
    stmt.execute(params![
        country.name.as_str(),
        country.name_key(),
        country.iso2.as_str(),
        country.iso3.as_str(),
    ])
    .map_err(|err| map_write_error(err, NAME_KEY_INDEX))?;
    Ok(conn.last_insert_rowid())
}

fn parse_country_row(row: &Row<'_>) -> RepoResult<Country> {
    let country = Country {
        id: row.get("id")?,
        name: row.get("name")?,
        iso2: row.get("iso2")?,
        iso3: row.get("iso3")?,
    };
    if country.name.trim().is_empty() {
        return Err(RepoError::InvalidData(format!(
            "blank name in countries row {}",
            country.id
        )));
    }
    Ok(country)
}
