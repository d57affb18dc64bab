//! Fields: a name, a kind and the rule that produces its values.
//!
//! Value resolution follows a fixed priority for every kind:
//!
//! 1. computed fields evaluate their expression (after all plain fields);
//! 2. counter kinds return `base + ++count`;
//! 3. a non-empty `possible_values` set is sampled uniformly;
//! 4. a non-empty `possible_values_weighted` set is sampled by weight;
//! 5. otherwise the kind's [`Synthesizer`] builds a value from scratch.

use crate::conditions::{ComputedExpr, EvalError};
use crate::dictionaries::Dictionaries;
use crate::generators::temporal::{self, BIRTHDATE_MAX, BIRTHDATE_MIN};
use crate::generators::{dictionary, Counter, CounterBank, RegexTemplate, Synthesizer, WeightedSet};
use crate::row::Row;
use chrono::{DateTime, NaiveDate, Utc};
use datagen_core::schema::Bound;
use datagen_core::{City, FieldDefinition, FieldKind, Person, SchemaError, Value};
use rand::Rng;

const DEFAULT_LENGTH: usize = 20;

#[derive(Debug, Clone)]
enum ValueSource {
    Computed(ComputedExpr),
    Counter(Counter),
    Enumerated(Vec<Value>),
    Weighted(WeightedSet<Value>),
    Synthesized(Synthesizer),
}

#[derive(Debug, Clone)]
pub struct Field {
    name: String,
    kind: FieldKind,
    ghost: bool,
    source: ValueSource,
}

impl Field {
    /// Build a field, allocating its counter in `counters` when it has one.
    pub fn from_definition(
        def: &FieldDefinition,
        dictionaries: &Dictionaries,
        counters: &mut CounterBank,
    ) -> Result<Self, SchemaError> {
        let source = if let Some(expr) = ComputedExpr::from_definition(def)? {
            ValueSource::Computed(expr)
        } else if def.kind.is_counter() {
            ValueSource::Counter(Counter {
                slot: counters.allocate(),
                base: def.min.map(|b| b.as_i64()).unwrap_or(0),
                narrow: def.kind == FieldKind::IncrementInteger,
            })
        } else if !def.possible_values.is_empty() {
            let values = def
                .possible_values
                .iter()
                .map(|v| cast_definition_value(def, v, dictionaries))
                .collect::<Result<Vec<_>, _>>()?;
            ValueSource::Enumerated(values)
        } else if !def.possible_values_weighted.is_empty() {
            let entries = def
                .possible_values_weighted
                .iter()
                .map(|(v, w)| cast_definition_value(def, v, dictionaries).map(|value| (value, *w)))
                .collect::<Result<Vec<_>, _>>()?;
            let set = WeightedSet::new(entries)
                .ok_or_else(|| SchemaError::ZeroWeight(def.name.clone()))?;
            ValueSource::Weighted(set)
        } else {
            ValueSource::Synthesized(build_synthesizer(def, dictionaries)?)
        };

        Ok(Self {
            name: def.name.clone(),
            kind: def.kind,
            ghost: def.ghost,
            source,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    pub fn is_ghost(&self) -> bool {
        self.ghost
    }

    pub fn is_computed(&self) -> bool {
        matches!(self.source, ValueSource::Computed(_))
    }

    pub fn expression(&self) -> Option<&ComputedExpr> {
        match &self.source {
            ValueSource::Computed(expr) => Some(expr),
            _ => None,
        }
    }

    /// Produce a value for a plain field. Computed fields yield `Null`
    /// here; they are resolved with [`Field::compute`].
    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R, counters: &CounterBank) -> Value {
        match &self.source {
            ValueSource::Computed(_) => Value::Null,
            ValueSource::Counter(counter) => counter.next(counters),
            ValueSource::Enumerated(values) => dictionary::pick(rng, values)
                .cloned()
                .unwrap_or(Value::Null),
            ValueSource::Weighted(set) => set.sample(rng).clone(),
            ValueSource::Synthesized(synth) => synth.generate(rng),
        }
    }

    /// Evaluate a computed field on a row and cast the result to its kind.
    pub fn compute(&self, row: &Row) -> Result<Value, EvalError> {
        match &self.source {
            ValueSource::Computed(expr) => {
                let raw = expr.evaluate(row)?;
                self.cast_from_string(&raw)
            }
            _ => Ok(row.get(&self.name).cloned().unwrap_or(Value::Null)),
        }
    }

    pub fn cast_from_string(&self, raw: &str) -> Result<Value, EvalError> {
        cast_value(self.kind, raw)
    }
}

/// Convert a string to a value of `kind`.
///
/// An empty string is a null value for every kind except the textual ones.
pub fn cast_value(kind: FieldKind, raw: &str) -> Result<Value, EvalError> {
    let fail = |reason: String| EvalError::Cast {
        kind: kind.to_string(),
        value: raw.to_string(),
        reason,
    };
    let trimmed = raw.trim();
    let textual = matches!(
        kind,
        FieldKind::String
            | FieldKind::StringAz
            | FieldKind::StringRegex
            | FieldKind::DateAsString
            | FieldKind::Email
            | FieldKind::Phone
            | FieldKind::Ip
            | FieldKind::Hash
            | FieldKind::Country
    );
    if textual {
        return Ok(Value::String(raw.to_string()));
    }
    if trimmed.is_empty() {
        return Ok(Value::Null);
    }

    let value = match kind {
        FieldKind::Integer | FieldKind::IncrementInteger => {
            Value::Integer(trimmed.parse().map_err(|e| fail(format!("{e}")))?)
        }
        FieldKind::Long | FieldKind::IncrementLong => {
            Value::Long(trimmed.parse().map_err(|e| fail(format!("{e}")))?)
        }
        FieldKind::Float => Value::Float(trimmed.parse().map_err(|e| fail(format!("{e}")))?),
        FieldKind::Boolean => match trimmed.to_ascii_lowercase().as_str() {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            _ => return Err(fail("expected true or false".to_string())),
        },
        FieldKind::Timestamp | FieldKind::Date => {
            let instant = match trimmed.parse::<i64>() {
                Ok(millis) => DateTime::<Utc>::from_timestamp_millis(millis),
                Err(_) => temporal::parse_instant(trimmed),
            };
            Value::Timestamp(instant.ok_or_else(|| fail("not a valid instant".to_string()))?)
        }
        FieldKind::Birthdate => Value::Date(
            temporal::parse_date(trimmed).ok_or_else(|| fail("not a valid date".to_string()))?,
        ),
        FieldKind::Bytes => Value::Bytes(raw.as_bytes().to_vec()),
        FieldKind::Uuid => {
            Value::Uuid(uuid::Uuid::parse_str(trimmed).map_err(|e| fail(format!("{e}")))?)
        }
        FieldKind::Name => Value::Person(Person {
            first_name: raw.to_string(),
            country: String::new(),
            male: false,
            female: false,
            unisex: true,
        }),
        FieldKind::City => Value::City(City {
            name: raw.to_string(),
            latitude: String::new(),
            longitude: String::new(),
            country: String::new(),
            population: 0,
        }),
        _ => Value::String(raw.to_string()),
    };
    Ok(value)
}

/// Cast a value of an enumerated or weighted set. Dictionary kinds resolve
/// to the matching dictionary entry when there is one.
fn cast_definition_value(
    def: &FieldDefinition,
    raw: &str,
    dictionaries: &Dictionaries,
) -> Result<Value, SchemaError> {
    match def.kind {
        FieldKind::City => {
            if let Some(city) = dictionaries
                .cities()
                .iter()
                .find(|c| c.name.eq_ignore_ascii_case(raw))
            {
                return Ok(Value::City(city.clone()));
            }
        }
        FieldKind::Name => {
            if let Some(person) = dictionaries
                .names()
                .iter()
                .find(|p| p.first_name.eq_ignore_ascii_case(raw))
            {
                return Ok(Value::Person(person.clone()));
            }
        }
        _ => {}
    }
    cast_value(def.kind, raw).map_err(|e| SchemaError::InvalidValue {
        field: def.name.clone(),
        value: raw.to_string(),
        reason: e.to_string(),
    })
}

fn invalid_range(def: &FieldDefinition, reason: impl Into<String>) -> SchemaError {
    SchemaError::InvalidRange {
        field: def.name.clone(),
        reason: reason.into(),
    }
}

fn ordered<T: PartialOrd + std::fmt::Debug>(
    def: &FieldDefinition,
    min: T,
    max: T,
) -> Result<(T, T), SchemaError> {
    if min > max {
        return Err(invalid_range(def, format!("min {min:?} is greater than max {max:?}")));
    }
    Ok((min, max))
}

fn i32_bound(def: &FieldDefinition, bound: Option<Bound>, default: i32) -> Result<i32, SchemaError> {
    match bound {
        None => Ok(default),
        Some(b) => i32::try_from(b.as_i64())
            .map_err(|_| invalid_range(def, format!("{} does not fit an integer", b.as_i64()))),
    }
}

fn instant_bound(
    def: &FieldDefinition,
    text: Option<&String>,
    default: DateTime<Utc>,
) -> Result<DateTime<Utc>, SchemaError> {
    match text {
        None => Ok(default),
        Some(s) => temporal::parse_instant(s)
            .ok_or_else(|| invalid_range(def, format!("'{s}' is not a valid date"))),
    }
}

fn date_bound(
    def: &FieldDefinition,
    text: Option<&String>,
    default: (i32, u32, u32),
) -> Result<NaiveDate, SchemaError> {
    match text {
        Some(s) => temporal::parse_date(s)
            .ok_or_else(|| invalid_range(def, format!("'{s}' is not a valid date"))),
        None => NaiveDate::from_ymd_opt(default.0, default.1, default.2)
            .ok_or_else(|| invalid_range(def, "invalid default date")),
    }
}

fn build_synthesizer(
    def: &FieldDefinition,
    dictionaries: &Dictionaries,
) -> Result<Synthesizer, SchemaError> {
    let length = def.length.unwrap_or(DEFAULT_LENGTH);
    let epoch = DateTime::<Utc>::default();

    let synth = match def.kind {
        FieldKind::String => Synthesizer::Alphanumeric { length },
        FieldKind::StringAz => Synthesizer::Letters { length },
        FieldKind::StringRegex => {
            let template = def.regex.as_deref().ok_or_else(|| SchemaError::InvalidPattern {
                field: def.name.clone(),
                reason: "string_regex fields need a 'regex' template".to_string(),
            })?;
            Synthesizer::Regex(RegexTemplate::parse(template).map_err(|reason| {
                SchemaError::InvalidPattern {
                    field: def.name.clone(),
                    reason,
                }
            })?)
        }
        FieldKind::Integer => {
            let min = i32_bound(def, def.min, i32::MIN)?;
            let max = i32_bound(def, def.max, i32::MAX)?;
            let (min, max) = ordered(def, min, max)?;
            Synthesizer::Integer { min, max }
        }
        FieldKind::Long | FieldKind::IncrementLong | FieldKind::IncrementInteger => {
            let min = def.min.map(|b| b.as_i64()).unwrap_or(i64::MIN);
            let max = def.max.map(|b| b.as_i64()).unwrap_or(i64::MAX - 1);
            let (min, max) = ordered(def, min, max)?;
            Synthesizer::Long { min, max }
        }
        FieldKind::Float => {
            let min = def.min.map(|b| b.as_f64()).unwrap_or(f64::from(f32::MIN));
            let max = def.max.map(|b| b.as_f64()).unwrap_or(f64::from(f32::MAX));
            let (min, max) = ordered(def, min, max)?;
            if !(max - min).is_finite() {
                return Err(invalid_range(def, format!("span of {min:?}..{max:?} is not finite")));
            }
            Synthesizer::Float { min, max }
        }
        FieldKind::Boolean => Synthesizer::Boolean,
        FieldKind::Timestamp => {
            let min = match def.min {
                Some(b) => DateTime::<Utc>::from_timestamp_millis(b.as_i64())
                    .ok_or_else(|| invalid_range(def, "min is not a valid epoch millis"))?,
                None => instant_bound(def, def.min_date.as_ref(), epoch)?,
            };
            let max = match def.max {
                Some(b) => DateTime::<Utc>::from_timestamp_millis(b.as_i64())
                    .ok_or_else(|| invalid_range(def, "max is not a valid epoch millis"))?,
                None => instant_bound(def, def.max_date.as_ref(), Utc::now())?,
            };
            let (min, max) = ordered(def, min, max)?;
            Synthesizer::Timestamp { min, max }
        }
        FieldKind::Date | FieldKind::DateAsString => {
            let min = instant_bound(def, def.min_date.as_ref(), epoch)?;
            let max = instant_bound(def, def.max_date.as_ref(), Utc::now())?;
            let (min, max) = ordered(def, min, max)?;
            if def.kind == FieldKind::Date {
                Synthesizer::Date {
                    min,
                    max,
                    use_now: def.use_now,
                }
            } else {
                if let Some(pattern) = &def.pattern {
                    temporal::check_pattern(pattern).map_err(|reason| {
                        SchemaError::InvalidPattern {
                            field: def.name.clone(),
                            reason,
                        }
                    })?;
                }
                Synthesizer::DateAsString {
                    min,
                    max,
                    use_now: def.use_now,
                    pattern: def.pattern.clone(),
                }
            }
        }
        FieldKind::Birthdate => {
            let min = date_bound(def, def.min_date.as_ref(), BIRTHDATE_MIN)?;
            let max = date_bound(def, def.max_date.as_ref(), BIRTHDATE_MAX)?;
            let (min, max) = ordered(def, min, max)?;
            Synthesizer::Birthdate { min, max }
        }
        FieldKind::Bytes => Synthesizer::Bytes { length },
        FieldKind::Hash => Synthesizer::Hash { length },
        FieldKind::Uuid => Synthesizer::Uuid,
        FieldKind::Ip => Synthesizer::Ip,
        FieldKind::Name => Synthesizer::Name(dictionaries.names_in(&def.filters)),
        FieldKind::Country => Synthesizer::Country(dictionaries.countries_in(&def.filters)),
        FieldKind::City => {
            Synthesizer::City(dictionary::city_set(dictionaries.cities_in(&def.filters)))
        }
        FieldKind::Email => Synthesizer::Email(dictionaries.names_in(&def.filters)),
        FieldKind::Phone => Synthesizer::Phone(dictionaries.phone_codes_in(&def.filters)),
    };
    Ok(synth)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashMap;

    fn build(def: &FieldDefinition) -> Result<Field, SchemaError> {
        let mut counters = CounterBank::default();
        Field::from_definition(def, &Dictionaries::embedded(), &mut counters)
    }

    #[test]
    fn test_enumerated_values_never_leave_the_set() {
        let mut def = FieldDefinition::new("size", FieldKind::Integer);
        def.possible_values = vec!["1".into(), "5".into(), "9".into()];
        // Weighted values are ignored when an enumerated set is present
        def.possible_values_weighted = vec![("100".into(), 1)];
        let field = build(&def).unwrap();
        let counters = CounterBank::default();
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..500 {
            let value = field.generate(&mut rng, &counters);
            assert!(
                [Value::Integer(1), Value::Integer(5), Value::Integer(9)].contains(&value),
                "unexpected {value:?}"
            );
        }
    }

    #[test]
    fn test_weighted_values_converge() {
        let mut def = FieldDefinition::new("tier", FieldKind::String);
        def.possible_values_weighted = vec![("gold".into(), 1), ("silver".into(), 3)];
        let field = build(&def).unwrap();
        let counters = CounterBank::default();
        let mut rng = StdRng::seed_from_u64(9);
        let mut counts: HashMap<String, u32> = HashMap::new();
        for _ in 0..40_000 {
            *counts.entry(field.generate(&mut rng, &counters).render()).or_default() += 1;
        }
        assert_eq!(counts.len(), 2);
        let gold = f64::from(counts["gold"]) / 40_000.0;
        assert!((gold - 0.25).abs() < 0.015, "gold ratio {gold}");
    }

    #[test]
    fn test_invalid_set_values_are_schema_errors() {
        let mut def = FieldDefinition::new("n", FieldKind::Long);
        def.possible_values = vec!["ten".into()];
        assert!(matches!(build(&def), Err(SchemaError::InvalidValue { .. })));

        let mut def = FieldDefinition::new("n", FieldKind::Long);
        def.possible_values_weighted = vec![("1".into(), 0)];
        assert!(matches!(build(&def), Err(SchemaError::ZeroWeight(_))));
    }

    #[test]
    fn test_ranges() {
        let mut def = FieldDefinition::new("age", FieldKind::Integer);
        def.min = Some(Bound::Int(18));
        def.max = Some(Bound::Int(20));
        let field = build(&def).unwrap();
        let counters = CounterBank::default();
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..100 {
            let Value::Integer(v) = field.generate(&mut rng, &counters) else {
                panic!("expected integer");
            };
            assert!((18..=20).contains(&v));
        }

        def.min = Some(Bound::Int(30));
        assert!(matches!(build(&def), Err(SchemaError::InvalidRange { .. })));

        def.min = Some(Bound::Int(i64::from(i32::MAX) + 1));
        assert!(matches!(build(&def), Err(SchemaError::InvalidRange { .. })));
    }

    #[test]
    fn test_float_span_must_be_finite() {
        let mut def = FieldDefinition::new("ratio", FieldKind::Float);
        def.min = Some(Bound::Float(-1e308));
        def.max = Some(Bound::Float(1e308));
        assert!(matches!(build(&def), Err(SchemaError::InvalidRange { .. })));

        def.min = Some(Bound::Float(f64::NAN));
        def.max = Some(Bound::Float(1.0));
        assert!(matches!(build(&def), Err(SchemaError::InvalidRange { .. })));

        def.min = Some(Bound::Float(-1e300));
        def.max = Some(Bound::Float(1e300));
        let field = build(&def).unwrap();
        let value = field.generate(&mut StdRng::seed_from_u64(3), &CounterBank::default());
        assert!(matches!(value, Value::Float(v) if v.is_finite()));
    }

    #[test]
    fn test_counter_ignores_value_sets() {
        let mut def = FieldDefinition::new("id", FieldKind::IncrementLong);
        def.min = Some(Bound::Int(1000));
        def.possible_values = vec!["1".into()];
        let mut counters = CounterBank::default();
        let field = Field::from_definition(&def, &Dictionaries::embedded(), &mut counters).unwrap();
        let mut rng = StdRng::seed_from_u64(42);
        assert_eq!(field.generate(&mut rng, &counters), Value::Long(1001));
        assert_eq!(field.generate(&mut rng, &counters), Value::Long(1002));
    }

    #[test]
    fn test_regex_field_requires_template() {
        let def = FieldDefinition::new("code", FieldKind::StringRegex);
        assert!(matches!(build(&def), Err(SchemaError::InvalidPattern { .. })));
    }

    #[test]
    fn test_birthdate_defaults() {
        let def = FieldDefinition::new("born", FieldKind::Birthdate);
        let field = build(&def).unwrap();
        let counters = CounterBank::default();
        let mut rng = StdRng::seed_from_u64(42);
        let min = NaiveDate::from_ymd_opt(1920, 1, 1).unwrap();
        let max = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        for _ in 0..100 {
            let Value::Date(d) = field.generate(&mut rng, &counters) else {
                panic!("expected date");
            };
            assert!(d >= min && d <= max);
        }
    }

    #[test]
    fn test_dictionary_possible_values_resolve_entries() {
        let mut def = FieldDefinition::new("city", FieldKind::City);
        def.possible_values = vec!["paris".into()];
        let field = build(&def).unwrap();
        let counters = CounterBank::default();
        let mut rng = StdRng::seed_from_u64(1);
        let Value::City(city) = field.generate(&mut rng, &counters) else {
            panic!("expected city");
        };
        assert_eq!(city.name, "Paris");
        assert_eq!(city.country, "France");
    }

    #[test]
    fn test_cast_value() {
        assert_eq!(cast_value(FieldKind::Boolean, "TRUE"), Ok(Value::Bool(true)));
        assert_eq!(cast_value(FieldKind::Long, " 12 "), Ok(Value::Long(12)));
        assert_eq!(cast_value(FieldKind::Long, ""), Ok(Value::Null));
        assert_eq!(cast_value(FieldKind::String, ""), Ok(Value::String(String::new())));
        assert_eq!(
            cast_value(FieldKind::Birthdate, "24/12/1990"),
            Ok(Value::Date(NaiveDate::from_ymd_opt(1990, 12, 24).unwrap()))
        );
        assert!(matches!(
            cast_value(FieldKind::Integer, "1.5"),
            Err(EvalError::Cast { .. })
        ));
        assert!(matches!(
            cast_value(FieldKind::Timestamp, "0"),
            Ok(Value::Timestamp(ts)) if ts.timestamp_millis() == 0
        ));
    }
}
