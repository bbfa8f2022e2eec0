//! City repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide read-all, point, create/update and batched-save APIs over
//!   `cities` storage.
//! - Answer composite-key existence queries for duplicate checks.
//!
//! # Invariants
//! - Coordinates are persisted as ten-thousandths; reads reject values that
//!   do not fit `decimal(7,4)`.
//! - `country_id` is enforced by the SQLite foreign key.

use crate::model::city::{City, CityId, NewCity};
use crate::model::coordinate::Coordinate;
use crate::model::country::CountryId;
use crate::model::natural_key::CityKey;
use crate::repo::{ensure_connection_ready, map_write_error, RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};

const CITY_SELECT_SQL: &str = "SELECT
    id,
    name,
    lat,
    lon,
    country_id
FROM cities";

const CITY_INSERT_SQL: &str = "INSERT INTO cities (
    name,
    lat,
    lon,
    country_id
) VALUES (?1, ?2, ?3, ?4);";

const NATURAL_KEY_INDEX: &str = "idx_cities_natural_key";

/// Repository interface for city persistence.
pub trait CityRepository {
    /// Reads the full city collection.
    fn list_cities(&self) -> RepoResult<Vec<City>>;
    fn list_cities_by_country(&self, country_id: CountryId) -> RepoResult<Vec<City>>;
    fn get_city(&self, id: CityId) -> RepoResult<Option<City>>;
    fn create_city(&self, city: &NewCity) -> RepoResult<City>;
    fn update_city(&self, city: &City) -> RepoResult<()>;
    /// Persists all given cities in one transaction.
    fn save_cities(&self, batch: &[NewCity]) -> RepoResult<Vec<City>>;
    /// Whether a city other than `exclude` has exactly this composite key.
    fn city_key_exists(&self, key: &CityKey, exclude: Option<CityId>) -> RepoResult<bool>;
}

impl<T: CityRepository + ?Sized> CityRepository for &T {
    fn list_cities(&self) -> RepoResult<Vec<City>> {
        (**self).list_cities()
    }

    fn list_cities_by_country(&self, country_id: CountryId) -> RepoResult<Vec<City>> {
        (**self).list_cities_by_country(country_id)
    }

    fn get_city(&self, id: CityId) -> RepoResult<Option<City>> {
        (**self).get_city(id)
    }

    fn create_city(&self, city: &NewCity) -> RepoResult<City> {
        (**self).create_city(city)
    }

    fn update_city(&self, city: &City) -> RepoResult<()> {
        (**self).update_city(city)
    }

    fn save_cities(&self, batch: &[NewCity]) -> RepoResult<Vec<City>> {
        (**self).save_cities(batch)
    }

    fn city_key_exists(&self, key: &CityKey, exclude: Option<CityId>) -> RepoResult<bool> {
        (**self).city_key_exists(key, exclude)
    }
}

/// SQLite-backed city repository.
pub struct SqliteCityRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCityRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, "cities", &["id", "name", "lat", "lon", "country_id"])?;
        Ok(Self { conn })
    }
}

impl CityRepository for SqliteCityRepository<'_> {
    fn list_cities(&self) -> RepoResult<Vec<City>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{CITY_SELECT_SQL} ORDER BY id ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut cities = Vec::new();
        while let Some(row) = rows.next()? {
            cities.push(parse_city_row(row)?);
        }
        Ok(cities)
    }

    fn list_cities_by_country(&self, country_id: CountryId) -> RepoResult<Vec<City>> {
        let mut stmt = self.conn.prepare(&format!(
            "{CITY_SELECT_SQL} WHERE country_id = ?1 ORDER BY name ASC, id ASC;"
        ))?;
        let mut rows = stmt.query([country_id])?;
        let mut cities = Vec::new();
        while let Some(row) = rows.next()? {
            cities.push(parse_city_row(row)?);
        }
        Ok(cities)
    }

    fn get_city(&self, id: CityId) -> RepoResult<Option<City>> {
        self.conn
            .query_row(
                &format!("{CITY_SELECT_SQL} WHERE id = ?1;"),
                [id],
                |row| Ok(parse_city_row(row)),
            )
            .optional()?
            .transpose()
    }

    fn create_city(&self, city: &NewCity) -> RepoResult<City> {
        let city = city.normalized()?;
        let id = insert_city(self.conn, &city)?;
        Ok(city.into_city(id))
    }

    fn update_city(&self, city: &City) -> RepoResult<()> {
        let city = city.normalized()?;
        let changed = self
            .conn
            .execute(
                "UPDATE cities
                 SET
                    name = ?2,
                    lat = ?3,
                    lon = ?4,
                    country_id = ?5
                 WHERE id = ?1;",
                params![
                    city.id,
                    city.name.as_str(),
                    city.lat.units(),
                    city.lon.units(),
                    city.country_id,
                ],
            )
            .map_err(|err| map_write_error(err, NATURAL_KEY_INDEX))?;

        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "city",
                id: city.id,
            });
        }

        Ok(())
    }

    fn save_cities(&self, batch: &[NewCity]) -> RepoResult<Vec<City>> {
        let normalized = batch
            .iter()
            .map(NewCity::normalized)
            .collect::<Result<Vec<_>, _>>()?;

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let mut saved = Vec::with_capacity(normalized.len());
        for city in normalized {
            let id = insert_city(&tx, &city)?;
            saved.push(city.into_city(id));
        }
        tx.commit()?;

        Ok(saved)
    }

    fn city_key_exists(&self, key: &CityKey, exclude: Option<CityId>) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM cities
                WHERE name = ?1
                  AND lat = ?2
                  AND lon = ?3
                  AND country_id = ?4
                  AND (?5 IS NULL OR id <> ?5)
            );",
            params![
                key.name.as_str(),
                key.lat.units(),
                key.lon.units(),
                key.country_id,
                exclude,
            ],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }
}

fn insert_city(conn: &Connection, city: &NewCity) -> RepoResult<CityId> {
    let mut stmt = conn.prepare_cached(CITY_INSERT_SQL)?;
    stmt.execute(params![
        city.name.as_str(),
        city.lat.units(),
        city.lon.units(),
        city.country_id,
    ])
    .map_err(|err| map_write_error(err, NATURAL_KEY_INDEX))?;
    Ok(conn.last_insert_rowid())
}

fn parse_city_row(row: &Row<'_>) -> RepoResult<City> {
    let id: CityId = row.get("id")?;
    Ok(City {
        id,
        name: row.get("name")?,
        lat: parse_coordinate(row.get("lat")?, id, "cities.lat")?,
        lon: parse_coordinate(row.get("lon")?, id, "cities.lon")?,
        country_id: row.get("country_id")?,
    })
}

fn parse_coordinate(units: i64, id: CityId, column: &'static str) -> RepoResult<Coordinate> {
    Coordinate::from_units(units).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid coordinate `{units}` in {column} for row {id}"
        ))
    })
}
