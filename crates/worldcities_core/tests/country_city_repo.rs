use worldcities_core::db::open_db_in_memory;
use worldcities_core::{
    CityKey, CityRepository, Coordinate, CountryField, CountryRepository, NewCity, NewCountry,
    RepoError, SqliteCityRepository, SqliteCountryRepository,
};

fn coord(text: &str) -> Coordinate {
    Coordinate::parse(text).unwrap()
}

fn france() -> NewCountry {
    NewCountry::new("France", "FR", "FRA")
}

fn city(name: &str, lat: &str, lon: &str, country_id: i64) -> NewCity {
    NewCity {
        name: name.to_string(),
        lat: coord(lat),
        lon: coord(lon),
        country_id,
    }
}

#[test]
fn create_and_get_country_roundtrip() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteCountryRepository::try_new(&conn).unwrap();

    let created = repo
        .create_country(&NewCountry::new(" France ", "FR", "FRA"))
        .unwrap();
    assert_eq!(created.name, "France");

    let loaded = repo.get_country(created.id).unwrap().unwrap();
    assert_eq!(loaded, created);
    assert!(repo.get_country(created.id + 1).unwrap().is_none());
}

#[test]
fn save_countries_returns_ids_in_input_order() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteCountryRepository::try_new(&conn).unwrap();

    let saved = repo
        .save_countries(&[france(), NewCountry::new("Japan", "JP", "JPN")])
        .unwrap();
    assert_eq!(saved.len(), 2);
    assert_eq!(saved[0].name, "France");
    assert_eq!(saved[1].name, "Japan");
    assert!(saved[0].id < saved[1].id);

    let listed = repo.list_countries().unwrap();
    assert_eq!(listed, saved);
}

#[test]
fn country_names_are_unique_ignoring_case() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteCountryRepository::try_new(&conn).unwrap();
    repo.create_country(&france()).unwrap();

    let err = repo
        .create_country(&NewCountry::new("FRANCE", "FX", "FXX"))
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::UniqueViolation("idx_countries_name_key")
    ));
}

#[test]
fn failed_country_batch_commits_nothing() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteCountryRepository::try_new(&conn).unwrap();

    let err = repo
        .save_countries(&[france(), NewCountry::new("france", "FR", "FRA")])
        .unwrap_err();
    assert!(matches!(err, RepoError::UniqueViolation(_)));
    assert!(repo.list_countries().unwrap().is_empty());
}

#[test]
fn invalid_country_is_rejected_before_sql() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteCountryRepository::try_new(&conn).unwrap();

    let err = repo
        .create_country(&NewCountry::new("France", "FRA", "FRA"))
        .unwrap_err();
    match err {
        RepoError::Validation(issue) => assert_eq!(issue.field, "iso2"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn update_country_rewrites_name_key() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteCountryRepository::try_new(&conn).unwrap();
    let mut country = repo.create_country(&france()).unwrap();

    country.name = "République française".to_string();
    repo.update_country(&country).unwrap();

    assert!(repo
        .country_field_exists(CountryField::Name, "RÉPUBLIQUE FRANÇAISE", None)
        .unwrap());
    assert!(!repo
        .country_field_exists(CountryField::Name, "France", None)
        .unwrap());
}

#[test]
fn update_missing_country_returns_not_found() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteCountryRepository::try_new(&conn).unwrap();
    let ghost = france().into_country(404);

    let err = repo.update_country(&ghost).unwrap_err();
    assert!(matches!(
        err,
        RepoError::NotFound {
            entity: "country",
            id: 404
        }
    ));
}

#[test]
fn country_field_exists_honors_exclusion() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteCountryRepository::try_new(&conn).unwrap();
    let country = repo.create_country(&france()).unwrap();

    assert!(repo
        .country_field_exists(CountryField::Iso2, "fr", None)
        .unwrap());
    assert!(!repo
        .country_field_exists(CountryField::Iso2, "FR", Some(country.id))
        .unwrap());
    assert!(repo
        .country_field_exists(CountryField::Iso3, "FRA", Some(country.id + 1))
        .unwrap());
}

#[test]
fn create_and_list_cities_by_country() {
    let conn = open_db_in_memory().unwrap();
    let countries = SqliteCountryRepository::try_new(&conn).unwrap();
    let cities = SqliteCityRepository::try_new(&conn).unwrap();
    let france = countries.create_country(&france()).unwrap();
    let japan = countries
        .create_country(&NewCountry::new("Japan", "JP", "JPN"))
        .unwrap();

    cities
        .save_cities(&[
            city("Paris", "48.8566", "2.3522", france.id),
            city("Lyon", "45.764", "4.8357", france.id),
            city("Tokyo", "35.6897", "139.6922", japan.id),
        ])
        .unwrap();

    let french: Vec<_> = cities
        .list_cities_by_country(france.id)
        .unwrap()
        .into_iter()
        .map(|city| city.name)
        .collect();
    assert_eq!(french, vec!["Lyon", "Paris"]);

    let lyon = cities
        .list_cities()
        .unwrap()
        .into_iter()
        .find(|city| city.name == "Lyon")
        .unwrap();
    assert_eq!(lyon.lat.to_string(), "45.7640");
    assert_eq!(cities.get_city(lyon.id).unwrap(), Some(lyon));
}

#[test]
fn city_requires_existing_country() {
    let conn = open_db_in_memory().unwrap();
    let cities = SqliteCityRepository::try_new(&conn).unwrap();

    let err = cities
        .create_city(&city("Paris", "48.8566", "2.3522", 99))
        .unwrap_err();
    assert!(matches!(err, RepoError::Db(_)));
    assert!(cities.list_cities().unwrap().is_empty());
}

#[test]
fn city_composite_key_is_unique() {
    let conn = open_db_in_memory().unwrap();
    let countries = SqliteCountryRepository::try_new(&conn).unwrap();
    let cities = SqliteCityRepository::try_new(&conn).unwrap();
    let france = countries.create_country(&france()).unwrap();

    cities
        .create_city(&city("Paris", "48.8566", "2.3522", france.id))
        .unwrap();
    let err = cities
        .create_city(&city("Paris", "48.8566", "2.3522", france.id))
        .unwrap_err();
    assert!(matches!(
        err,
        RepoError::UniqueViolation("idx_cities_natural_key")
    ));

    // Same name, other coordinates: a distinct city.
    cities
        .create_city(&city("Paris", "33.6609", "-95.5555", france.id))
        .unwrap();
    assert_eq!(cities.list_cities().unwrap().len(), 2);
}

#[test]
fn city_key_exists_is_exact_and_honors_exclusion() {
    let conn = open_db_in_memory().unwrap();
    let countries = SqliteCountryRepository::try_new(&conn).unwrap();
    let cities = SqliteCityRepository::try_new(&conn).unwrap();
    let france = countries.create_country(&france()).unwrap();
    let paris = cities
        .create_city(&city("Paris", "48.8566", "2.3522", france.id))
        .unwrap();

    let key = CityKey::new("Paris", coord("48.8566"), coord("2.3522"), france.id);
    assert!(cities.city_key_exists(&key, None).unwrap());
    assert!(!cities.city_key_exists(&key, Some(paris.id)).unwrap());

    let other_case = CityKey::new("PARIS", coord("48.8566"), coord("2.3522"), france.id);
    assert!(!cities.city_key_exists(&other_case, None).unwrap());

    let moved = CityKey::new("Paris", coord("48.8567"), coord("2.3522"), france.id);
    assert!(!cities.city_key_exists(&moved, None).unwrap());
}

#[test]
fn update_city_moves_coordinates() {
    let conn = open_db_in_memory().unwrap();
    let countries = SqliteCountryRepository::try_new(&conn).unwrap();
    let cities = SqliteCityRepository::try_new(&conn).unwrap();
    let france = countries.create_country(&france()).unwrap();
    let mut paris = cities
        .create_city(&city("Paris", "48.8566", "2.3522", france.id))
        .unwrap();

    paris.lat = coord("48.86");
    cities.update_city(&paris).unwrap();

    let loaded = cities.get_city(paris.id).unwrap().unwrap();
    assert_eq!(loaded.lat, coord("48.8600"));
}

#[test]
fn country_with_cities_cannot_be_deleted() {
    let conn = open_db_in_memory().unwrap();
    let countries = SqliteCountryRepository::try_new(&conn).unwrap();
    let cities = SqliteCityRepository::try_new(&conn).unwrap();
    let france = countries.create_country(&france()).unwrap();
    cities
        .create_city(&city("Paris", "48.8566", "2.3522", france.id))
        .unwrap();

    let result = conn.execute("DELETE FROM countries WHERE id = ?1;", [france.id]);
    assert!(result.is_err());
}
