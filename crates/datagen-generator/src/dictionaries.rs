//! Reference datasets for dictionary-backed fields.
//!
//! Datasets are semicolon-separated CSV files with a header row. The
//! copies under `dictionaries/` are embedded in the binary; a directory
//! can be supplied to override them. A dataset that cannot be read or
//! parsed degrades to a single fallback entry and a warning, never an
//! error.

use csv::ReaderBuilder;
use datagen_core::{City, Person};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

pub const CITIES_FILE: &str = "worldcities.csv";
pub const NAMES_FILE: &str = "names.csv";
pub const PHONE_CODES_FILE: &str = "phone-country-codes.csv";
pub const COUNTRIES_FILE: &str = "countries.csv";

const EMBEDDED_CITIES: &str = include_str!("../dictionaries/worldcities.csv");
const EMBEDDED_NAMES: &str = include_str!("../dictionaries/names.csv");
const EMBEDDED_PHONE_CODES: &str = include_str!("../dictionaries/phone-country-codes.csv");
const EMBEDDED_COUNTRIES: &str = include_str!("../dictionaries/countries.csv");

/// International dialing prefix of a country.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhoneCode {
    pub indicator: String,
    pub country: String,
}

impl PhoneCode {
    pub fn fallback() -> Self {
        Self {
            indicator: "00".to_string(),
            country: "world".to_string(),
        }
    }
}

#[derive(Deserialize)]
struct CityRecord {
    name: String,
    lat: String,
    long: String,
    country: String,
    population: Option<f64>,
}

#[derive(Deserialize)]
struct NameRecord {
    name: String,
    country: String,
    male: String,
    female: String,
    unisex: String,
}

#[derive(Deserialize)]
struct PhoneRecord {
    indicator: String,
    country: String,
}

#[derive(Deserialize)]
struct CountryRecord {
    name: String,
}

fn flag(s: &str) -> bool {
    matches!(s.trim(), "1" | "true" | "TRUE" | "True" | "yes")
}

/// All reference datasets, loaded once per model.
#[derive(Debug, Clone)]
pub struct Dictionaries {
    cities: Vec<City>,
    names: Vec<Person>,
    phone_codes: Vec<PhoneCode>,
    countries: Vec<String>,
}

impl Default for Dictionaries {
    fn default() -> Self {
        Self::embedded()
    }
}

impl Dictionaries {
    /// Datasets compiled into the binary.
    pub fn embedded() -> Self {
        Self {
            cities: parse_cities(EMBEDDED_CITIES.as_bytes(), "embedded"),
            names: parse_names(EMBEDDED_NAMES.as_bytes(), "embedded"),
            phone_codes: parse_phone_codes(EMBEDDED_PHONE_CODES.as_bytes(), "embedded"),
            countries: parse_countries(EMBEDDED_COUNTRIES.as_bytes(), "embedded"),
        }
    }

    /// Load datasets from `dir`, or the embedded copies when `dir` is `None`.
    ///
    /// Each file is loaded independently: a missing or broken file only
    /// degrades its own dataset.
    pub fn load(dir: Option<&Path>) -> Self {
        let Some(dir) = dir else {
            return Self::embedded();
        };
        debug!("Loading dictionaries from {}", dir.display());
        let read = |file: &str| -> Vec<u8> {
            let path = dir.join(file);
            fs::read(&path).unwrap_or_else(|e| {
                warn!("Could not read dictionary {}: {e}", path.display());
                Vec::new()
            })
        };
        let source = dir.display().to_string();
        Self {
            cities: parse_cities(&read(CITIES_FILE), &source),
            names: parse_names(&read(NAMES_FILE), &source),
            phone_codes: parse_phone_codes(&read(PHONE_CODES_FILE), &source),
            countries: parse_countries(&read(COUNTRIES_FILE), &source),
        }
    }

    pub fn cities(&self) -> &[City] {
        &self.cities
    }

    pub fn names(&self) -> &[Person] {
        &self.names
    }

    pub fn phone_codes(&self) -> &[PhoneCode] {
        &self.phone_codes
    }

    pub fn countries(&self) -> &[String] {
        &self.countries
    }

    /// Cities located in one of `countries`; all cities when the filter is
    /// empty or matches nothing.
    pub fn cities_in(&self, countries: &[String]) -> Vec<City> {
        filter_by_country(&self.cities, countries, |c| &c.country, "city")
    }

    /// First names used in one of `countries`; all names when the filter is
    /// empty or matches nothing.
    pub fn names_in(&self, countries: &[String]) -> Vec<Person> {
        filter_by_country(&self.names, countries, |p| &p.country, "name")
    }

    /// Dialing prefixes of `countries`. A filter matching nothing yields the
    /// single fallback prefix.
    pub fn phone_codes_in(&self, countries: &[String]) -> Vec<PhoneCode> {
        if countries.is_empty() {
            return self.phone_codes.clone();
        }
        let matched: Vec<PhoneCode> = self
            .phone_codes
            .iter()
            .filter(|p| countries.iter().any(|c| c.eq_ignore_ascii_case(&p.country)))
            .cloned()
            .collect();
        if matched.is_empty() {
            warn!("No phone prefix matches filters {countries:?}, using fallback");
            vec![PhoneCode::fallback()]
        } else {
            matched
        }
    }

    /// Country names restricted to `countries` when given.
    pub fn countries_in(&self, countries: &[String]) -> Vec<String> {
        filter_by_country(&self.countries, countries, |c| c, "country")
    }
}

fn filter_by_country<T: Clone>(
    items: &[T],
    countries: &[String],
    country_of: impl Fn(&T) -> &String,
    what: &str,
) -> Vec<T> {
    if countries.is_empty() {
        return items.to_vec();
    }
    let matched: Vec<T> = items
        .iter()
        .filter(|item| {
            let country = country_of(item);
            countries.iter().any(|c| c.eq_ignore_ascii_case(country))
        })
        .cloned()
        .collect();
    if matched.is_empty() {
        warn!("No {what} matches filters {countries:?}, using the whole dictionary");
        items.to_vec()
    } else {
        matched
    }
}

fn read_records<T: DeserializeOwned>(data: &[u8], file: &str, source: &str) -> Vec<T> {
    let mut reader = ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(data);
    let mut records = Vec::new();
    for (line, record) in reader.deserialize::<T>().enumerate() {
        match record {
            Ok(r) => records.push(r),
            Err(e) => debug!("Skipping line {} of {source}/{file}: {e}", line + 2),
        }
    }
    records
}

fn parse_cities(data: &[u8], source: &str) -> Vec<City> {
    let cities: Vec<City> = read_records::<CityRecord>(data, CITIES_FILE, source)
        .into_iter()
        .map(|r| City {
            name: r.name,
            latitude: r.lat,
            longitude: r.long,
            country: r.country,
            population: r.population.unwrap_or(0.0).max(0.0) as u64,
        })
        .collect();
    if cities.is_empty() {
        warn!("City dictionary from {source} is empty, using fallback city");
        return vec![City::fallback()];
    }
    cities
}

fn parse_names(data: &[u8], source: &str) -> Vec<Person> {
    let names: Vec<Person> = read_records::<NameRecord>(data, NAMES_FILE, source)
        .into_iter()
        .map(|r| Person {
            first_name: r.name,
            country: r.country,
            male: flag(&r.male),
            female: flag(&r.female),
            unisex: flag(&r.unisex),
        })
        .collect();
    if names.is_empty() {
        warn!("Name dictionary from {source} is empty, using fallback name");
        return vec![Person::fallback()];
    }
    names
}

fn parse_phone_codes(data: &[u8], source: &str) -> Vec<PhoneCode> {
    let codes: Vec<PhoneCode> = read_records::<PhoneRecord>(data, PHONE_CODES_FILE, source)
        .into_iter()
        .map(|r| PhoneCode {
            indicator: r.indicator,
            country: r.country,
        })
        .collect();
    if codes.is_empty() {
        warn!("Phone code dictionary from {source} is empty, using fallback prefix");
        return vec![PhoneCode::fallback()];
    }
    codes
}

fn parse_countries(data: &[u8], source: &str) -> Vec<String> {
    let countries: Vec<String> = read_records::<CountryRecord>(data, COUNTRIES_FILE, source)
        .into_iter()
        .map(|r| r.name)
        .collect();
    if countries.is_empty() {
        warn!("Country dictionary from {source} is empty, using fallback country");
        return vec!["world".to_string()];
    }
    countries
}
