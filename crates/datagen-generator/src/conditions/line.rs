//! Condition lines: `$a>$b & $c=France | default`.
//!
//! A line is a disjunction of conjunctions. Conditions are separated by
//! space-delimited `&` (AND) or `|` (OR) tokens; AND binds tighter than OR
//! and evaluation stops as soon as the outcome is known.

use super::EvalError;
use crate::row::Row;
use datagen_core::Value;
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Equal,
    NotEqual,
    Less,
    Greater,
}

impl Operator {
    fn from_char(c: char) -> Option<Self> {
        match c {
            '=' => Some(Operator::Equal),
            '!' => Some(Operator::NotEqual),
            '<' => Some(Operator::Less),
            '>' => Some(Operator::Greater),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    Field(String),
    Literal(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub left: String,
    pub op: Operator,
    pub right: Operand,
}

impl Condition {
    pub fn parse(token: &str) -> Result<Self, String> {
        let body = token
            .strip_prefix('$')
            .ok_or_else(|| format!("condition '{token}' must start with '$'"))?;
        let (pos, op) = body
            .char_indices()
            .find_map(|(i, c)| Operator::from_char(c).map(|op| (i, op)))
            .ok_or_else(|| format!("condition '{token}' has no operator (=, !, <, >)"))?;
        let left = &body[..pos];
        if left.is_empty() {
            return Err(format!("condition '{token}' has no field name"));
        }
        let rest = &body[pos + 1..];
        let right = match rest.strip_prefix('$') {
            Some(name) if !name.is_empty() => Operand::Field(name.to_string()),
            Some(_) => return Err(format!("condition '{token}' has an empty field reference")),
            None => Operand::Literal(rest.to_string()),
        };
        Ok(Self {
            left: left.to_string(),
            op,
            right,
        })
    }

    pub fn references(&self) -> impl Iterator<Item = &str> {
        let right = match &self.right {
            Operand::Field(name) => Some(name.as_str()),
            Operand::Literal(_) => None,
        };
        std::iter::once(self.left.as_str()).chain(right)
    }

    pub fn evaluate(&self, row: &Row) -> Result<bool, EvalError> {
        let left = lookup(row, &self.left)?;
        let right_text = match &self.right {
            Operand::Field(name) => lookup(row, name)?.render(),
            Operand::Literal(text) => text.clone(),
        };

        let numeric = if is_numeric(left) {
            left.as_f64().zip(right_text.trim().parse::<f64>().ok())
        } else {
            None
        };

        let outcome = match (self.op, numeric) {
            (Operator::Equal, Some((l, r))) => l == r,
            (Operator::NotEqual, Some((l, r))) => l != r,
            (Operator::Less, Some((l, r))) => l < r,
            (Operator::Greater, Some((l, r))) => l > r,
            (Operator::Equal, None) => left.render().eq_ignore_ascii_case(&right_text),
            (Operator::NotEqual, None) => !left.render().eq_ignore_ascii_case(&right_text),
            (Operator::Less, None) => left.render().cmp(&right_text) == Ordering::Less,
            (Operator::Greater, None) => left.render().cmp(&right_text) == Ordering::Greater,
        };
        Ok(outcome)
    }
}

fn is_numeric(value: &Value) -> bool {
    matches!(value, Value::Integer(_) | Value::Long(_) | Value::Float(_))
}

fn lookup<'a>(row: &'a Row, name: &str) -> Result<&'a Value, EvalError> {
    row.get(name)
        .ok_or_else(|| EvalError::MissingValue(name.to_string()))
}

/// One key of a `conditionals` mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionLine {
    /// OR of ANDs; empty for `default`.
    groups: Vec<Vec<Condition>>,
}

impl ConditionLine {
    pub fn parse(line: &str) -> Result<Self, String> {
        let line = line.trim();
        if line.eq_ignore_ascii_case("default") {
            return Ok(Self { groups: Vec::new() });
        }

        let mut groups = vec![Vec::new()];
        let mut expect_condition = true;
        for token in line.split_whitespace() {
            if expect_condition {
                let condition = Condition::parse(token)?;
                if let Some(group) = groups.last_mut() {
                    group.push(condition);
                }
            } else {
                match token {
                    "&" | "&&" => {}
                    "|" | "||" => groups.push(Vec::new()),
                    other => {
                        return Err(format!("expected '&' or '|' between conditions, got '{other}'"))
                    }
                }
            }
            expect_condition = !expect_condition;
        }
        if expect_condition {
            return Err(format!("condition line '{line}' is empty or ends with an operator"));
        }
        Ok(Self { groups })
    }

    pub fn is_default(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn conditions(&self) -> impl Iterator<Item = &Condition> {
        self.groups.iter().flatten()
    }

    pub fn evaluate(&self, row: &Row) -> Result<bool, EvalError> {
        if self.is_default() {
            return Ok(true);
        }
        for group in &self.groups {
            let mut all = true;
            for condition in group {
                if !condition.evaluate(row)? {
                    all = false;
                    break;
                }
            }
            if all {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> Row {
        Row::from_pairs(vec![
            ("age".to_string(), Value::Integer(42)),
            ("limit".to_string(), Value::Long(40)),
            ("country".to_string(), Value::from("France")),
            ("code".to_string(), Value::from("9")),
        ])
    }

    #[test]
    fn test_parse_condition() {
        let c = Condition::parse("$age>$limit").unwrap();
        assert_eq!(c.left, "age");
        assert_eq!(c.op, Operator::Greater);
        assert_eq!(c.right, Operand::Field("limit".to_string()));
        assert_eq!(c.references().collect::<Vec<_>>(), vec!["age", "limit"]);

        let c = Condition::parse("$country=France").unwrap();
        assert_eq!(c.right, Operand::Literal("France".to_string()));
    }

    #[test]
    fn test_parse_errors() {
        assert!(Condition::parse("age>3").is_err());
        assert!(Condition::parse("$age").is_err());
        assert!(Condition::parse("$>3").is_err());
        assert!(ConditionLine::parse("$age>3 &").is_err());
        assert!(ConditionLine::parse("$age>3 + $age<5").is_err());
    }

    #[test]
    fn test_numeric_comparison() {
        let row = row();
        assert!(Condition::parse("$age>$limit").unwrap().evaluate(&row).unwrap());
        assert!(Condition::parse("$age<100").unwrap().evaluate(&row).unwrap());
        assert!(Condition::parse("$age=42.0").unwrap().evaluate(&row).unwrap());
        assert!(!Condition::parse("$limit>$age").unwrap().evaluate(&row).unwrap());
    }

    #[test]
    fn test_string_comparison_is_lexical_and_case_insensitive_equality() {
        let row = row();
        assert!(Condition::parse("$country=france").unwrap().evaluate(&row).unwrap());
        assert!(Condition::parse("$country!Spain").unwrap().evaluate(&row).unwrap());
        // "9" > "10" lexically
        assert!(Condition::parse("$code>10").unwrap().evaluate(&row).unwrap());
    }

    #[test]
    fn test_and_binds_tighter_than_or() {
        let row = row();
        // false & true | true  => (false & true) | true => true
        let line = ConditionLine::parse("$age<10 & $country=France | $limit=40").unwrap();
        assert!(line.evaluate(&row).unwrap());
        // true | false & false => true | (false & false) => true
        let line = ConditionLine::parse("$age>10 | $age<10 & $country=Spain").unwrap();
        assert!(line.evaluate(&row).unwrap());
        let line = ConditionLine::parse("$age>10 & $country=Spain").unwrap();
        assert!(!line.evaluate(&row).unwrap());
    }

    #[test]
    fn test_default_line() {
        let line = ConditionLine::parse(" Default ").unwrap();
        assert!(line.is_default());
        assert!(line.evaluate(&row()).unwrap());
    }

    #[test]
    fn test_missing_field_is_an_error() {
        let err = Condition::parse("$nope=1").unwrap().evaluate(&row()).unwrap_err();
        assert!(matches!(err, EvalError::MissingValue(name) if name == "nope"));
    }
}
