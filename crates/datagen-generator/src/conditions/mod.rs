//! Computed fields.
//!
//! A computed field derives its value from sibling fields of the same row
//! through exactly one of four sources:
//!
//! - `conditionals` - ordered `condition line -> value` pairs, first match wins
//! - `formula` - arithmetic over numeric fields
//! - `injection` - string template with `${field}` placeholders
//! - `link` - attribute of a city or name value (`$city.lat`)
//!
//! Expressions are parsed when the model is built; a syntax error there is
//! a [`SchemaError`]. Failures while evaluating a row are [`EvalError`]s,
//! which the model logs and turns into a null value.

pub mod formula;
pub mod injection;
pub mod line;
pub mod link;

pub use formula::Formula;
pub use injection::Injection;
pub use line::{Condition, ConditionLine, Operand, Operator};
pub use link::Link;

use crate::row::Row;
use datagen_core::{FieldDefinition, SchemaError};
use thiserror::Error;

/// Error while evaluating a computed field for one row.
#[derive(Debug, Error, PartialEq)]
pub enum EvalError {
    #[error("no value for field '{0}'")]
    MissingValue(String),

    #[error("field '{field}' is not numeric: '{value}'")]
    NotNumeric { field: String, value: String },

    #[error("division by zero")]
    DivisionByZero,

    #[error("field '{field}' has no attribute '{attribute}'")]
    UnsupportedLink { field: String, attribute: String },

    #[error("cannot convert '{value}' to {kind}: {reason}")]
    Cast {
        kind: String,
        value: String,
        reason: String,
    },
}

/// The expression behind a computed field.
#[derive(Debug, Clone, PartialEq)]
pub enum ComputedExpr {
    Conditionals(Vec<(ConditionLine, String)>),
    Formula(Formula),
    Injection(Injection),
    Link(Link),
}

impl ComputedExpr {
    /// Parse the computed source of `def`, `None` for plain fields.
    pub fn from_definition(def: &FieldDefinition) -> Result<Option<Self>, SchemaError> {
        let invalid = |reason: String| SchemaError::InvalidExpression {
            field: def.name.clone(),
            reason,
        };

        let sources = [
            !def.conditionals.is_empty(),
            def.formula.is_some(),
            def.injection.is_some(),
            def.link.is_some(),
        ];
        match sources.iter().filter(|s| **s).count() {
            0 => return Ok(None),
            1 => {}
            _ => {
                return Err(invalid(
                    "only one of conditionals, formula, injection or link may be set".to_string(),
                ))
            }
        }

        let expr = if !def.conditionals.is_empty() {
            let branches = def
                .conditionals
                .iter()
                .map(|(line, value)| {
                    ConditionLine::parse(line)
                        .map(|parsed| (parsed, value.clone()))
                        .map_err(&invalid)
                })
                .collect::<Result<Vec<_>, _>>()?;
            ComputedExpr::Conditionals(branches)
        } else if let Some(formula) = &def.formula {
            ComputedExpr::Formula(Formula::parse(formula).map_err(&invalid)?)
        } else if let Some(template) = &def.injection {
            ComputedExpr::Injection(Injection::parse(template).map_err(&invalid)?)
        } else if let Some(link) = &def.link {
            ComputedExpr::Link(Link::parse(link).map_err(&invalid)?)
        } else {
            return Ok(None);
        };
        Ok(Some(expr))
    }

    /// Names of the fields this expression reads.
    pub fn references(&self) -> Vec<&str> {
        let mut refs: Vec<&str> = match self {
            ComputedExpr::Conditionals(branches) => branches
                .iter()
                .flat_map(|(line, _)| line.conditions().flat_map(Condition::references))
                .collect(),
            ComputedExpr::Formula(f) => f.references().collect(),
            ComputedExpr::Injection(i) => i.references().collect(),
            ComputedExpr::Link(l) => vec![l.field()],
        };
        let mut seen = std::collections::HashSet::new();
        refs.retain(|r| seen.insert(*r));
        refs
    }

    /// Evaluate against a row whose referenced fields are already set.
    ///
    /// `conditionals` with no satisfied line yield an empty string.
    pub fn evaluate(&self, row: &Row) -> Result<String, EvalError> {
        match self {
            ComputedExpr::Conditionals(branches) => {
                for (line, value) in branches {
                    if line.evaluate(row)? {
                        return Ok(value.clone());
                    }
                }
                Ok(String::new())
            }
            ComputedExpr::Formula(f) => f.evaluate_to_string(row),
            ComputedExpr::Injection(i) => i.evaluate(row),
            ComputedExpr::Link(l) => l.evaluate(row),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use datagen_core::{FieldKind, Value};

    fn def_with(f: impl FnOnce(&mut FieldDefinition)) -> FieldDefinition {
        let mut def = FieldDefinition::new("computed", FieldKind::String);
        f(&mut def);
        def
    }

    #[test]
    fn test_plain_field_has_no_expression() {
        let def = FieldDefinition::new("plain", FieldKind::Long);
        assert_eq!(ComputedExpr::from_definition(&def).unwrap(), None);
    }

    #[test]
    fn test_multiple_sources_rejected() {
        let def = def_with(|d| {
            d.formula = Some("1 + 1".to_string());
            d.injection = Some("x".to_string());
        });
        assert!(matches!(
            ComputedExpr::from_definition(&def),
            Err(SchemaError::InvalidExpression { .. })
        ));
    }

    #[test]
    fn test_conditionals_first_match_wins() {
        let def = def_with(|d| {
            d.conditionals = vec![
                ("$age>60".to_string(), "senior".to_string()),
                ("$age>17".to_string(), "adult".to_string()),
                ("default".to_string(), "minor".to_string()),
            ];
        });
        let expr = ComputedExpr::from_definition(&def).unwrap().unwrap();
        assert_eq!(expr.references(), vec!["age"]);

        let eval = |age: i32| {
            let row = Row::from_pairs(vec![("age".to_string(), Value::Integer(age))]);
            expr.evaluate(&row).unwrap()
        };
        assert_eq!(eval(70), "senior");
        assert_eq!(eval(30), "adult");
        assert_eq!(eval(5), "minor");
    }

    #[test]
    fn test_no_match_yields_empty_string() {
        let def = def_with(|d| {
            d.conditionals = vec![("$a=1".to_string(), "one".to_string())];
        });
        let expr = ComputedExpr::from_definition(&def).unwrap().unwrap();
        let row = Row::from_pairs(vec![("a".to_string(), Value::Long(2))]);
        assert_eq!(expr.evaluate(&row).unwrap(), "");
    }

    #[test]
    fn test_syntax_error_is_schema_error() {
        let def = def_with(|d| d.formula = Some("$a +".to_string()));
        assert!(matches!(
            ComputedExpr::from_definition(&def),
            Err(SchemaError::InvalidExpression { field, .. }) if field == "computed"
        ));
    }
}
