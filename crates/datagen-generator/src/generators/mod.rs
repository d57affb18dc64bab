//! Value generators for each field kind.
//!
//! A field definition is resolved once into a [`Synthesizer`], which then
//! produces values from scratch. Enumerated and weighted value sets, counters
//! and computed expressions are handled one level up, in
//! [`crate::field::Field`].

pub mod counter;
pub mod dictionary;
pub mod numeric;
pub mod strings;
pub mod temporal;
pub mod weighted;

pub use counter::{Counter, CounterBank};
pub use strings::RegexTemplate;
pub use weighted::WeightedSet;

use crate::dictionaries::PhoneCode;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use datagen_core::{City, Person, Value};
use rand::Rng;
use std::fmt::Write;

/// Synthesis rule of one field.
#[derive(Debug, Clone)]
pub enum Synthesizer {
    Alphanumeric { length: usize },
    Letters { length: usize },
    Regex(RegexTemplate),
    Integer { min: i32, max: i32 },
    Long { min: i64, max: i64 },
    Float { min: f64, max: f64 },
    Boolean,
    Timestamp { min: DateTime<Utc>, max: DateTime<Utc> },
    Date {
        min: DateTime<Utc>,
        max: DateTime<Utc>,
        use_now: bool,
    },
    DateAsString {
        min: DateTime<Utc>,
        max: DateTime<Utc>,
        use_now: bool,
        pattern: Option<String>,
    },
    Birthdate { min: NaiveDate, max: NaiveDate },
    Bytes { length: usize },
    Hash { length: usize },
    Uuid,
    Ip,
    Name(Vec<Person>),
    Country(Vec<String>),
    City(WeightedSet<City>),
    Email(Vec<Person>),
    Phone(Vec<PhoneCode>),
}

fn pick_instant<R: Rng + ?Sized>(
    rng: &mut R,
    min: DateTime<Utc>,
    max: DateTime<Utc>,
    use_now: bool,
) -> DateTime<Utc> {
    if use_now {
        Utc::now()
    } else {
        temporal::instant_between(rng, min, max)
    }
}

impl Synthesizer {
    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R) -> Value {
        match self {
            Synthesizer::Alphanumeric { length } => {
                Value::String(strings::alphanumeric(rng, *length))
            }
            Synthesizer::Letters { length } => Value::String(strings::letters(rng, *length)),
            Synthesizer::Regex(template) => Value::String(template.generate(rng)),
            Synthesizer::Integer { min, max } => numeric::generate_integer(rng, *min, *max),
            Synthesizer::Long { min, max } => numeric::generate_long(rng, *min, *max),
            Synthesizer::Float { min, max } => numeric::generate_float(rng, *min, *max),
            Synthesizer::Boolean => numeric::generate_bool(rng),
            Synthesizer::Timestamp { min, max } => {
                Value::Timestamp(temporal::instant_between(rng, *min, *max))
            }
            Synthesizer::Date { min, max, use_now } => {
                Value::Timestamp(pick_instant(rng, *min, *max, *use_now))
            }
            Synthesizer::DateAsString {
                min,
                max,
                use_now,
                pattern,
            } => {
                let instant = pick_instant(rng, *min, *max, *use_now);
                Value::String(format_instant(instant, pattern.as_deref()))
            }
            Synthesizer::Birthdate { min, max } => {
                Value::Date(temporal::date_between(rng, *min, *max))
            }
            Synthesizer::Bytes { length } => Value::Bytes(strings::bytes(rng, *length)),
            Synthesizer::Hash { length } => Value::String(strings::hash(rng, *length)),
            Synthesizer::Uuid => Value::Uuid(strings::uuid(rng)),
            Synthesizer::Ip => Value::String(strings::ipv4(rng)),
            Synthesizer::Name(names) => dictionary::pick(rng, names)
                .cloned()
                .map(Value::Person)
                .unwrap_or_else(|| Value::Person(Person::fallback())),
            Synthesizer::Country(countries) => dictionary::pick(rng, countries)
                .cloned()
                .map(Value::String)
                .unwrap_or(Value::Null),
            Synthesizer::City(cities) => Value::City(cities.sample(rng).clone()),
            Synthesizer::Email(names) => Value::String(dictionary::email(rng, names)),
            Synthesizer::Phone(codes) => Value::String(dictionary::phone(rng, codes)),
        }
    }
}

/// Format with a strftime pattern, RFC 3339 when none is given.
pub fn format_instant(instant: DateTime<Utc>, pattern: Option<&str>) -> String {
    let Some(pattern) = pattern else {
        return instant.to_rfc3339_opts(SecondsFormat::Secs, true);
    };
    let mut out = String::new();
    if write!(out, "{}", instant.format(pattern)).is_err() {
        return instant.to_rfc3339_opts(SecondsFormat::Secs, true);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionaries::Dictionaries;
    use chrono::TimeZone;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_format_instant() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();
        assert_eq!(format_instant(ts, Some("%d/%m/%Y")), "01/03/2024");
        assert_eq!(format_instant(ts, None), "2024-03-01T12:30:00Z");
    }

    #[test]
    fn test_dictionary_synthesizers_respect_filters() {
        let dicts = Dictionaries::embedded();
        let mut rng = StdRng::seed_from_u64(42);
        let countries = vec!["Italy".to_string()];

        let cities = Synthesizer::City(dictionary::city_set(dicts.cities_in(&countries)));
        let names = Synthesizer::Name(dicts.names_in(&countries));
        for _ in 0..50 {
            match cities.generate(&mut rng) {
                Value::City(c) => assert_eq!(c.country, "Italy"),
                other => panic!("expected city, got {other:?}"),
            }
            match names.generate(&mut rng) {
                Value::Person(p) => assert_eq!(p.country, "Italy"),
                other => panic!("expected person, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_string_lengths() {
        let mut rng = StdRng::seed_from_u64(42);
        let value = Synthesizer::Letters { length: 7 }.generate(&mut rng);
        assert_eq!(value.render().len(), 7);
        let value = Synthesizer::Bytes { length: 4 }.generate(&mut rng);
        assert!(matches!(value, Value::Bytes(ref b) if b.len() == 4));
    }
}
