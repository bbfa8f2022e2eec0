use rusqlite::Connection;
use worldcities_core::db::open_db_in_memory;
use worldcities_core::{
    CityRepository, Coordinate, CountryRepository, ImportFailure, ImportPhase, ImportService,
    ImportSummary, RawSourceRow, SourceRow, SqliteCityRepository, SqliteCountryRepository,
};

fn row(city: &str, lat: &str, lon: &str, country: &str, iso2: &str, iso3: &str) -> SourceRow {
    SourceRow {
        city_name: city.to_string(),
        city_name_ascii: city.to_string(),
        lat: Coordinate::parse(lat).unwrap(),
        lon: Coordinate::parse(lon).unwrap(),
        country_name: country.to_string(),
        iso2: iso2.to_string(),
        iso3: iso3.to_string(),
    }
}

fn raw(city: &str, lat: &str, lon: &str, country: &str, iso2: &str, iso3: &str) -> RawSourceRow {
    RawSourceRow {
        city_name: city.to_string(),
        city_name_ascii: city.to_string(),
        lat: lat.to_string(),
        lon: lon.to_string(),
        country_name: country.to_string(),
        iso2: iso2.to_string(),
        iso3: iso3.to_string(),
    }
}

fn french_rows() -> Vec<SourceRow> {
    vec![
        row("Paris", "48.8566", "2.3522", "France", "FR", "FRA"),
        row("Lyon", "45.7640", "4.8357", "France", "FR", "FRA"),
    ]
}

fn count(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table};"), [], |row| {
        row.get(0)
    })
    .unwrap()
}

#[test]
fn first_run_adds_everything_and_rerun_adds_nothing() {
    let conn = open_db_in_memory().unwrap();
    let countries = SqliteCountryRepository::try_new(&conn).unwrap();
    let cities = SqliteCityRepository::try_new(&conn).unwrap();
    let service = ImportService::new(&countries, &cities);

    let first = service.reconcile(&french_rows()).unwrap();
    assert_eq!(
        first,
        ImportSummary {
            countries_added: 1,
            cities_added: 2
        }
    );

    let second = service.reconcile(&french_rows()).unwrap();
    assert_eq!(second, ImportSummary::default());
    assert_eq!(count(&conn, "countries"), 1);
    assert_eq!(count(&conn, "cities"), 2);
}

#[test]
fn country_names_match_ignoring_case() {
    let conn = open_db_in_memory().unwrap();
    let countries = SqliteCountryRepository::try_new(&conn).unwrap();
    let cities = SqliteCityRepository::try_new(&conn).unwrap();
    let service = ImportService::new(&countries, &cities);

    service
        .reconcile(&[row("Paris", "48.8566", "2.3522", "France", "FR", "FRA")])
        .unwrap();
    let summary = service
        .reconcile(&[row("Lyon", "45.7640", "4.8357", "FRANCE", "FR", "FRA")])
        .unwrap();

    assert_eq!(summary.countries_added, 0);
    assert_eq!(summary.cities_added, 1);

    let stored = countries.list_countries().unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].name, "France");
    let lyon = cities
        .list_cities()
        .unwrap()
        .into_iter()
        .find(|city| city.name == "Lyon")
        .unwrap();
    assert_eq!(lyon.country_id, stored[0].id);
}

#[test]
fn same_city_in_two_countries_is_two_cities() {
    let conn = open_db_in_memory().unwrap();
    let countries = SqliteCountryRepository::try_new(&conn).unwrap();
    let cities = SqliteCityRepository::try_new(&conn).unwrap();
    let service = ImportService::new(&countries, &cities);

    let summary = service
        .reconcile(&[
            row("Springfield", "39.7990", "-89.6440", "United States", "US", "USA"),
            row("Springfield", "39.7990", "-89.6440", "Canada", "CA", "CAN"),
        ])
        .unwrap();

    assert_eq!(summary.countries_added, 2);
    assert_eq!(summary.cities_added, 2);
}

#[test]
fn new_cities_reference_newly_committed_countries() {
    let conn = open_db_in_memory().unwrap();
    let countries = SqliteCountryRepository::try_new(&conn).unwrap();
    let cities = SqliteCityRepository::try_new(&conn).unwrap();
    let service = ImportService::new(&countries, &cities);

    service.reconcile(&french_rows()).unwrap();
    let summary = service
        .reconcile(&[
            row("Paris", "48.8566", "2.3522", "France", "FR", "FRA"),
            row("Tokyo", "35.6897", "139.6922", "Japan", "JP", "JPN"),
        ])
        .unwrap();
    assert_eq!(
        summary,
        ImportSummary {
            countries_added: 1,
            cities_added: 1
        }
    );

    let japan = countries
        .list_countries()
        .unwrap()
        .into_iter()
        .find(|country| country.iso3 == "JPN")
        .unwrap();
    let japanese = cities.list_cities_by_country(japan.id).unwrap();
    assert_eq!(japanese.len(), 1);
    assert_eq!(japanese[0].name, "Tokyo");
}

#[test]
fn empty_dataset_is_a_no_op() {
    let conn = open_db_in_memory().unwrap();
    let countries = SqliteCountryRepository::try_new(&conn).unwrap();
    let cities = SqliteCityRepository::try_new(&conn).unwrap();
    let service = ImportService::new(&countries, &cities);

    let rows: Vec<SourceRow> = Vec::new();
    assert_eq!(service.reconcile(&rows).unwrap(), ImportSummary::default());
}

#[test]
fn city_commit_failure_keeps_committed_countries() {
    let conn = open_db_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TRIGGER reject_cities BEFORE INSERT ON cities
         BEGIN
            SELECT RAISE(ABORT, 'cities unavailable');
         END;",
    )
    .unwrap();
    let countries = SqliteCountryRepository::try_new(&conn).unwrap();
    let cities = SqliteCityRepository::try_new(&conn).unwrap();
    let service = ImportService::new(&countries, &cities);

    let err = service.reconcile(&french_rows()).unwrap_err();
    assert_eq!(err.phase, ImportPhase::Cities);
    assert_eq!(err.countries_added, 1);
    assert!(err.is_partial());
    assert!(matches!(err.failure, ImportFailure::CommitFailed(_)));
    assert_eq!(count(&conn, "countries"), 1);
    assert_eq!(count(&conn, "cities"), 0);

    conn.execute_batch("DROP TRIGGER reject_cities;").unwrap();
    let retry = service.reconcile(&french_rows()).unwrap();
    assert_eq!(
        retry,
        ImportSummary {
            countries_added: 0,
            cities_added: 2
        }
    );
}

#[test]
fn country_commit_failure_writes_nothing() {
    let conn = open_db_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TRIGGER reject_countries BEFORE INSERT ON countries
         BEGIN
            SELECT RAISE(ABORT, 'countries unavailable');
         END;",
    )
    .unwrap();
    let countries = SqliteCountryRepository::try_new(&conn).unwrap();
    let cities = SqliteCityRepository::try_new(&conn).unwrap();
    let service = ImportService::new(&countries, &cities);

    let err = service.reconcile(&french_rows()).unwrap_err();
    assert_eq!(err.phase, ImportPhase::Countries);
    assert_eq!(err.countries_added, 0);
    assert!(!err.is_partial());
    assert_eq!(count(&conn, "countries"), 0);
    assert_eq!(count(&conn, "cities"), 0);
}

#[test]
fn malformed_row_aborts_without_writes() {
    let conn = open_db_in_memory().unwrap();
    let countries = SqliteCountryRepository::try_new(&conn).unwrap();
    let cities = SqliteCityRepository::try_new(&conn).unwrap();
    let service = ImportService::new(&countries, &cities);

    let mut rows = french_rows();
    rows.push(row("Nowhere", "10", "10", " ", "XX", "XXX"));

    let err = service.reconcile(&rows).unwrap_err();
    assert_eq!(err.phase, ImportPhase::Countries);
    match err.failure {
        ImportFailure::MalformedRow { index, issue, .. } => {
            assert_eq!(index, 2);
            assert_eq!(issue.field, "country");
        }
        other => panic!("unexpected failure: {other}"),
    }
    assert_eq!(count(&conn, "countries"), 0);
    assert_eq!(count(&conn, "cities"), 0);
}

#[test]
fn reconcile_raw_parses_then_imports() {
    let conn = open_db_in_memory().unwrap();
    let countries = SqliteCountryRepository::try_new(&conn).unwrap();
    let cities = SqliteCityRepository::try_new(&conn).unwrap();
    let service = ImportService::new(&countries, &cities);

    let err = service
        .reconcile_raw(&[
            raw("Paris", "48.8566", "2.3522", "France", "FR", "FRA"),
            raw(" Paris ", "48.85660", "2.3522", "france", "fr", "fra"),
        ])
        .unwrap_err();
    // Five fractional digits are rejected rather than rounded.
    assert_eq!(err.phase, ImportPhase::Parse);

    let summary = service
        .reconcile_raw(&[
            raw("Paris", "48.8566", "2.3522", "France", "FR", "FRA"),
            raw(" Paris ", "48.8566", "2.3522", "france", "fr", "fra"),
        ])
        .unwrap();
    assert_eq!(
        summary,
        ImportSummary {
            countries_added: 1,
            cities_added: 1
        }
    );
}

#[test]
fn reconcile_raw_reports_failing_row_and_field() {
    let conn = open_db_in_memory().unwrap();
    let countries = SqliteCountryRepository::try_new(&conn).unwrap();
    let cities = SqliteCityRepository::try_new(&conn).unwrap();
    let service = ImportService::new(&countries, &cities);

    let err = service
        .reconcile_raw(&[
            raw("Paris", "48.8566", "2.3522", "France", "FR", "FRA"),
            raw("Lyon", "north", "4.8357", "France", "FR", "FRA"),
        ])
        .unwrap_err();

    assert_eq!(err.phase, ImportPhase::Parse);
    assert_eq!(err.failure.code(), "malformed_row");
    match err.failure {
        ImportFailure::MalformedRow { index, issue, .. } => {
            assert_eq!(index, 1);
            assert_eq!(issue.field, "lat");
        }
        other => panic!("unexpected failure: {other}"),
    }
    assert_eq!(count(&conn, "countries"), 0);
}
