//! Links to attributes of structured dictionary values: `$city.lat`.

use super::EvalError;
use crate::row::Row;
use datagen_core::{City, FieldKind, Person, Value};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    field: String,
    attribute: String,
}

impl Link {
    pub fn parse(link: &str) -> Result<Self, String> {
        let body = link.trim().trim_start_matches('$');
        let (field, attribute) = body
            .split_once('.')
            .ok_or_else(|| format!("link '{link}' must look like $field.attribute"))?;
        if field.is_empty() || attribute.is_empty() {
            return Err(format!("link '{link}' must look like $field.attribute"));
        }
        Ok(Self {
            field: field.to_string(),
            attribute: attribute.to_string(),
        })
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    /// Check that the linked field kind exposes the attribute.
    pub fn check_target(&self, kind: FieldKind) -> Result<(), String> {
        let known = match kind {
            FieldKind::City => City::fallback().attribute(&self.attribute).is_some(),
            FieldKind::Name => Person::fallback().attribute(&self.attribute).is_some(),
            other => {
                return Err(format!(
                    "field '{}' of type {other} cannot be linked",
                    self.field
                ))
            }
        };
        if known {
            Ok(())
        } else {
            Err(format!(
                "type {kind} has no attribute '{}'",
                self.attribute
            ))
        }
    }

    pub fn evaluate(&self, row: &Row) -> Result<String, EvalError> {
        let value = row
            .get(&self.field)
            .ok_or_else(|| EvalError::MissingValue(self.field.clone()))?;
        let resolved = match value {
            Value::City(city) => city.attribute(&self.attribute),
            Value::Person(person) => person.attribute(&self.attribute),
            _ => None,
        };
        resolved.ok_or_else(|| EvalError::UnsupportedLink {
            field: self.field.clone(),
            attribute: self.attribute.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_city_link() {
        let mut city = City::fallback();
        city.latitude = "48.85".to_string();
        let row = Row::from_pairs(vec![("city".to_string(), Value::City(city))]);
        let link = Link::parse("$city.lat").unwrap();
        assert_eq!(link.field(), "city");
        assert_eq!(link.evaluate(&row).unwrap(), "48.85");
    }

    #[test]
    fn test_name_link() {
        let row = Row::from_pairs(vec![("n".to_string(), Value::Person(Person::fallback()))]);
        assert_eq!(Link::parse("$n.sex").unwrap().evaluate(&row).unwrap(), "UNKNOWN");
    }

    #[test]
    fn test_check_target() {
        let link = Link::parse("$c.long").unwrap();
        assert!(link.check_target(FieldKind::City).is_ok());
        assert!(link.check_target(FieldKind::String).is_err());
        assert!(Link::parse("$c.altitude").unwrap().check_target(FieldKind::City).is_err());
    }

    #[test]
    fn test_parse_errors() {
        assert!(Link::parse("$city").is_err());
        assert!(Link::parse("$.lat").is_err());
    }

    #[test]
    fn test_non_structured_value() {
        let row = Row::from_pairs(vec![("c".to_string(), Value::from("Paris"))]);
        let err = Link::parse("$c.lat").unwrap().evaluate(&row).unwrap_err();
        assert!(matches!(err, EvalError::UnsupportedLink { .. }));
    }
}
