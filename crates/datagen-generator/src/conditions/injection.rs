//! String templates: `"${first_name}.${last_name}@corp.com"`.

use super::EvalError;
use crate::row::Row;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Part {
    Text(String),
    Field(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Injection {
    parts: Vec<Part>,
}

impl Injection {
    pub fn parse(template: &str) -> Result<Self, String> {
        let mut parts = Vec::new();
        let mut rest = template;
        while let Some(start) = rest.find("${") {
            if start > 0 {
                parts.push(Part::Text(rest[..start].to_string()));
            }
            let after = &rest[start + 2..];
            let end = after
                .find('}')
                .ok_or_else(|| format!("unclosed '${{' in '{template}'"))?;
            let name = after[..end].trim();
            if name.is_empty() {
                return Err(format!("empty placeholder in '{template}'"));
            }
            parts.push(Part::Field(name.to_string()));
            rest = &after[end + 1..];
        }
        if !rest.is_empty() {
            parts.push(Part::Text(rest.to_string()));
        }
        Ok(Self { parts })
    }

    pub fn references(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().filter_map(|p| match p {
            Part::Field(name) => Some(name.as_str()),
            Part::Text(_) => None,
        })
    }

    pub fn evaluate(&self, row: &Row) -> Result<String, EvalError> {
        let mut out = String::new();
        for part in &self.parts {
            match part {
                Part::Text(text) => out.push_str(text),
                Part::Field(name) => {
                    let value = row
                        .get(name)
                        .ok_or_else(|| EvalError::MissingValue(name.clone()))?;
                    out.push_str(&value.render());
                }
            }
        }
        Ok(out)
    }
}
