//! Natural-key indexes scoped to one reconciliation run.
//!
//! # Responsibility
//! - Snapshot persisted countries/cities by natural key from one bulk read.
//! - Track records staged during the run so repeated rows stage once.
//!
//! # Invariants
//! - Keys are produced only by `model::natural_key`.
//! - An index never observes store writes; staged entries are resolved from
//!   the rows the batched save returns.

use crate::model::city::{City, CityId};
use crate::model::country::{Country, CountryId};
use crate::model::natural_key::{country_name_key, CityKey};
use std::collections::HashMap;

#[derive(Debug, Clone)]
enum CountrySlot {
    Persisted(Country),
    /// Position in the run's staging list.
    Staged(usize),
}

/// Case-insensitive country-name lookup.
#[derive(Debug, Clone, Default)]
pub struct CountryIndex {
    entries: HashMap<String, CountrySlot>,
    staged: usize,
}

impl CountryIndex {
    pub fn from_countries(countries: impl IntoIterator<Item = Country>) -> Self {
        let mut entries = HashMap::new();
        for country in countries {
            entries
                .entry(country.name_key())
                .or_insert(CountrySlot::Persisted(country));
        }
        Self { entries, staged: 0 }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&country_name_key(name))
    }

    /// Stages `name` unless it is already known.
    ///
    /// Returns `true` when the name was newly staged; staging order matches
    /// the order of `true` results.
    pub fn stage(&mut self, name: &str) -> bool {
        let key = country_name_key(name);
        if self.entries.contains_key(&key) {
            return false;
        }
        self.entries.insert(key, CountrySlot::Staged(self.staged));
        self.staged += 1;
        true
    }

    pub fn staged_len(&self) -> usize {
        self.staged
    }

    /// Replaces staged entries with the rows returned by the batched save.
    ///
    /// `saved` must be in staging order.
    pub fn commit_staged(&mut self, saved: Vec<Country>) -> Result<(), String> {
        if saved.len() != self.staged {
            return Err(format!(
                "batched save returned {} countries for {} staged",
                saved.len(),
                self.staged
            ));
        }
        for slot in self.entries.values_mut() {
            if let CountrySlot::Staged(position) = *slot {
                let country = saved
                    .get(position)
                    .ok_or_else(|| format!("no saved country for staging slot {position}"))?;
                *slot = CountrySlot::Persisted(country.clone());
            }
        }
        self.staged = 0;
        Ok(())
    }

    /// Store id for `name`; `None` when unknown or not yet committed.
    pub fn country_id(&self, name: &str) -> Option<CountryId> {
        match self.entries.get(&country_name_key(name)) {
            Some(CountrySlot::Persisted(country)) => Some(country.id),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Exact composite-key city lookup.
#[derive(Debug, Clone, Default)]
pub struct CityIndex {
    /// `None` marks a key staged during this run.
    entries: HashMap<CityKey, Option<CityId>>,
}

impl CityIndex {
    pub fn from_cities(cities: impl IntoIterator<Item = City>) -> Self {
        let entries = cities
            .into_iter()
            .map(|city| (city.key(), Some(city.id)))
            .collect();
        Self { entries }
    }

    pub fn contains(&self, key: &CityKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Returns `true` when `key` was absent and is now staged.
    pub fn stage(&mut self, key: &CityKey) -> bool {
        if self.entries.contains_key(key) {
            return false;
        }
        self.entries.insert(key.clone(), None);
        true
    }

    pub fn city_id(&self, key: &CityKey) -> Option<CityId> {
        self.entries.get(key).copied().flatten()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::{CityIndex, CountryIndex};
    use crate::model::city::City;
    use crate::model::coordinate::Coordinate;
    use crate::model::country::Country;
    use crate::model::natural_key::CityKey;

    fn country(id: i64, name: &str) -> Country {
        Country {
            id,
            name: name.to_string(),
            iso2: "XX".to_string(),
            iso3: "XXX".to_string(),
        }
    }

    #[test]
    fn country_lookup_ignores_case() {
        let index = CountryIndex::from_countries(vec![country(7, "France")]);
        assert!(index.contains("FRANCE"));
        assert_eq!(index.country_id("france"), Some(7));
        assert_eq!(index.country_id("Spain"), None);
    }

    #[test]
    fn staged_country_resolves_only_after_commit() {
        let mut index = CountryIndex::default();
        assert!(index.stage("Italy"));
        assert!(!index.stage("ITALY"));
        assert!(index.stage("Spain"));
        assert_eq!(index.staged_len(), 2);
        assert_eq!(index.country_id("Italy"), None);

        index
            .commit_staged(vec![country(10, "Italy"), country(11, "Spain")])
            .unwrap();
        assert_eq!(index.country_id("italy"), Some(10));
        assert_eq!(index.country_id("Spain"), Some(11));
        assert_eq!(index.staged_len(), 0);
    }

    #[test]
    fn commit_rejects_mismatched_batch() {
        let mut index = CountryIndex::default();
        index.stage("Italy");
        assert!(index.commit_staged(Vec::new()).is_err());
    }

    #[test]
    fn city_index_stages_each_key_once() {
        let lat = Coordinate::parse("45.764").unwrap();
        let lon = Coordinate::parse("4.8357").unwrap();
        let existing = City {
            id: 3,
            name: "Lyon".to_string(),
            lat,
            lon,
            country_id: 1,
        };
        let mut index = CityIndex::from_cities(vec![existing]);
        let known = CityKey::new("Lyon", lat, lon, 1);
        assert_eq!(index.city_id(&known), Some(3));
        assert!(!index.stage(&known));

        let other_country = CityKey::new("Lyon", lat, lon, 2);
        assert!(index.stage(&other_country));
        assert!(!index.stage(&other_country));
        assert_eq!(index.city_id(&other_country), None);
        assert_eq!(index.len(), 2);
    }
}
