//! Command-line driver for the WorldCities core.
//!
//! # Responsibility
//! - Read the source CSV and hand typed rows to the import service.
//! - Expose the duplicate checks for scripting.
//!
//! # Invariants
//! - Exit code is `0` on success and `1` on any failure.
//! - Stdout carries only the command result; diagnostics go to stderr.

use csv::ReaderBuilder;
use log::info;
use std::error::Error;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use worldcities_core::{
    core_version, init_logging_from_config, open_db, CityForm, CityService, CoreConfig,
    CountryField, DuplicateCheckService, ExcludeId, ImportService, RawSourceRow,
    SqliteCityRepository, SqliteCountryRepository,
};

const USAGE: &str = "usage:
  worldcities import <file.csv>
  worldcities check-country <name|iso2|iso3> <value> [exclude_id]
  worldcities check-city <name> <lat> <lon> <country_id> [exclude_id]
  worldcities version";

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Import {
        path: PathBuf,
    },
    CheckCountry {
        field: CountryField,
        value: String,
        exclude: ExcludeId,
    },
    CheckCity {
        form: CityForm,
        exclude: ExcludeId,
    },
    Version,
}

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = match parse_args(&args) {
        Ok(command) => command,
        Err(message) => {
            eprintln!("{message}\n{USAGE}");
            return ExitCode::FAILURE;
        }
    };

    match run(command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn parse_args(args: &[String]) -> Result<Command, String> {
    let (name, rest) = args
        .split_first()
        .ok_or_else(|| "missing command".to_string())?;

    match (name.as_str(), rest) {
        ("import", [path]) => Ok(Command::Import {
            path: PathBuf::from(path),
        }),
        ("check-country", [field, value, exclude @ ..]) if exclude.len() <= 1 => {
            Ok(Command::CheckCountry {
                field: field.parse::<CountryField>().map_err(|err| err.to_string())?,
                value: value.clone(),
                exclude: parse_exclude(exclude.first())?,
            })
        }
        ("check-city", [name, lat, lon, country_id, exclude @ ..]) if exclude.len() <= 1 => {
            Ok(Command::CheckCity {
                form: CityForm {
                    name: name.clone(),
                    lat: lat.clone(),
                    lon: lon.clone(),
                    country_id: parse_id("country_id", country_id)?,
                },
                exclude: parse_exclude(exclude.first())?,
            })
        }
        ("version", []) => Ok(Command::Version),
        (other, _) => Err(format!("unrecognized arguments for `{other}`")),
    }
}

fn parse_exclude(raw: Option<&String>) -> Result<ExcludeId, String> {
    match raw {
        Some(raw) => parse_id("exclude_id", raw).map(ExcludeId::from_raw),
        None => Ok(ExcludeId::NONE),
    }
}

fn parse_id(name: &str, raw: &str) -> Result<i64, String> {
    raw.trim()
        .parse()
        .map_err(|_| format!("{name} must be an integer, got `{raw}`"))
}

fn run(command: Command) -> Result<(), Box<dyn Error>> {
    if command == Command::Version {
        println!("worldcities {}", core_version());
        return Ok(());
    }

    let config = CoreConfig::from_env()?;
    init_logging_from_config(&config)?;
    let conn = open_db(&config.db_path)?;
    let countries = SqliteCountryRepository::try_new(&conn)?;
    let cities = SqliteCityRepository::try_new(&conn)?;

    match command {
        Command::Import { path } => {
            let rows = read_source(&path)?;
            info!(
                "event=cli_import module=cli status=start rows={}",
                rows.len()
            );
            let summary = ImportService::new(&countries, &cities).reconcile_raw(&rows)?;
            println!("{}", serde_json::to_string(&summary)?);
        }
        Command::CheckCountry {
            field,
            value,
            exclude,
        } => {
            let duplicate = DuplicateCheckService::new(&countries, &cities)
                .is_duplicate_country_field(field, &value, exclude)?;
            println!("{duplicate}");
        }
        Command::CheckCity { form, exclude } => {
            let duplicate = CityService::new(&cities, &countries).check_duplicate(exclude, &form)?;
            println!("{duplicate}");
        }
        Command::Version => {}
    }

    Ok(())
}

/// Reads `city, city_ascii, lat, lng, country, iso2, iso3` records after the
/// header row. Missing trailing columns read as empty text.
fn read_source(path: &Path) -> Result<Vec<RawSourceRow>, Box<dyn Error>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        let column = |index: usize| record.get(index).unwrap_or_default().to_string();
        rows.push(RawSourceRow {
            city_name: column(0),
            city_name_ascii: column(1),
            lat: column(2),
            lon: column(3),
            country_name: column(4),
            iso2: column(5),
            iso3: column(6),
        });
    }
    Ok(rows)
}
