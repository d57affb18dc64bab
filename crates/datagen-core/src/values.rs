//! Generated values.
//!
//! A [`Value`] is what a field produces for one row. Dictionary-backed
//! kinds produce structured values ([`City`], [`Person`]) so that computed
//! fields can link to their attributes; sinks see them through
//! [`Value::render`] or [`Value::to_json`].

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A city entry from the cities dictionary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct City {
    pub name: String,
    pub latitude: String,
    pub longitude: String,
    pub country: String,
    pub population: u64,
}

impl City {
    /// Entry used when the dictionary cannot be loaded.
    pub fn fallback() -> Self {
        Self {
            name: "world".to_string(),
            latitude: "0".to_string(),
            longitude: "0".to_string(),
            country: "world".to_string(),
            population: 8_000_000_000,
        }
    }

    /// Attribute lookup for `$city.<attr>` links.
    pub fn attribute(&self, attr: &str) -> Option<String> {
        match attr {
            "name" => Some(self.name.clone()),
            "lat" => Some(self.latitude.clone()),
            "long" => Some(self.longitude.clone()),
            "country" => Some(self.country.clone()),
            "population" => Some(self.population.to_string()),
            _ => None,
        }
    }
}

/// A first-name entry from the names dictionary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    pub first_name: String,
    pub country: String,
    pub male: bool,
    pub female: bool,
    pub unisex: bool,
}

impl Person {
    pub fn fallback() -> Self {
        Self {
            first_name: "Anonymous".to_string(),
            country: "world".to_string(),
            male: false,
            female: false,
            unisex: true,
        }
    }

    /// Attribute lookup for `$name.<attr>` links.
    pub fn attribute(&self, attr: &str) -> Option<String> {
        match attr {
            "sex" => Some(self.sex().to_string()),
            "male" => Some(self.male.to_string()),
            "female" => Some(self.female.to_string()),
            "unisex" => Some(self.unisex.to_string()),
            "country" => Some(self.country.clone()),
            _ => None,
        }
    }

    pub fn sex(&self) -> &'static str {
        if self.unisex {
            "UNKNOWN"
        } else if self.male {
            "MALE"
        } else {
            "FEMALE"
        }
    }
}

/// A single generated value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Integer(i32),
    Long(i64),
    Float(f64),
    String(String),
    Bytes(Vec<u8>),
    Uuid(Uuid),
    Timestamp(DateTime<Utc>),
    Date(NaiveDate),
    City(City),
    Person(Person),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(i64::from(*i)),
            Value::Long(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric view used by conditions and formulas.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(f64::from(*i)),
            Value::Long(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            Value::Timestamp(ts) => Some(ts.timestamp_millis() as f64),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Text form used by text sinks and by the conditional evaluator.
    pub fn render(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Integer(i) => i.to_string(),
            Value::Long(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::String(s) => s.clone(),
            Value::Bytes(b) => b.iter().map(|byte| format!("{byte:02x}")).collect(),
            Value::Uuid(u) => u.to_string(),
            Value::Timestamp(ts) => ts.to_rfc3339_opts(SecondsFormat::Millis, true),
            Value::Date(d) => d.format("%Y-%m-%d").to_string(),
            Value::City(c) => c.name.clone(),
            Value::Person(p) => p.first_name.clone(),
        }
    }

    /// JSON form used by JSON sinks and previews.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Integer(i) => serde_json::Value::from(*i),
            Value::Long(i) => serde_json::Value::from(*i),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            other => serde_json::Value::String(other.render()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_render_scalars() {
        assert_eq!(Value::Long(-3).render(), "-3");
        assert_eq!(Value::Bool(true).render(), "true");
        assert_eq!(Value::Null.render(), "");
        assert_eq!(Value::Bytes(vec![0, 255]).render(), "00ff");
    }

    #[test]
    fn test_render_timestamp_is_rfc3339_utc() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(Value::Timestamp(ts).render(), "2024-01-02T03:04:05.000Z");
    }

    #[test]
    fn test_structured_values_render_by_name() {
        assert_eq!(Value::City(City::fallback()).render(), "world");
        assert_eq!(Value::Person(Person::fallback()).render(), "Anonymous");
    }

    #[test]
    fn test_person_sex() {
        let mut p = Person::fallback();
        assert_eq!(p.sex(), "UNKNOWN");
        p.unisex = false;
        p.male = true;
        assert_eq!(p.attribute("sex").as_deref(), Some("MALE"));
        assert_eq!(p.attribute("nope"), None);
    }

    #[test]
    fn test_to_json_keeps_numbers() {
        assert_eq!(Value::Integer(7).to_json(), serde_json::json!(7));
        assert_eq!(Value::Float(f64::NAN).to_json(), serde_json::Value::Null);
        assert_eq!(Value::from("x").to_json(), serde_json::json!("x"));
    }
}
