//! Model inference from values read back out of existing output.

use chrono::DateTime;
use datagen_core::schema::Bound;
use datagen_core::{FieldDefinition, FieldKind};
use std::collections::HashMap;

/// Records sampled when inference is not deep.
pub const SHALLOW_SAMPLE_ROWS: usize = 100;

/// A string column with at most this many distinct values gets them as
/// `possible_values` in deep mode.
pub const MAX_ENUMERATED_VALUES: usize = 10;

/// Running type evidence for one column.
#[derive(Debug, Clone)]
pub struct ColumnStats {
    name: String,
    seen: usize,
    all_bool: bool,
    all_long: bool,
    all_float: bool,
    all_timestamp: bool,
    all_uuid: bool,
    min: Option<f64>,
    max: Option<f64>,
    distinct: Vec<String>,
    overflowed: bool,
}

impl ColumnStats {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            seen: 0,
            all_bool: true,
            all_long: true,
            all_float: true,
            all_timestamp: true,
            all_uuid: true,
            min: None,
            max: None,
            distinct: Vec::new(),
            overflowed: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Feed one raw value. Empty values carry no type evidence.
    pub fn observe(&mut self, raw: &str) {
        let value = raw.trim();
        if value.is_empty() {
            return;
        }
        self.seen += 1;

        let lower = value.to_ascii_lowercase();
        self.all_bool &= lower == "true" || lower == "false";
        self.all_long &= value.parse::<i64>().is_ok();
        let number = value.parse::<f64>().ok();
        self.all_float &= number.is_some();
        self.all_timestamp &= DateTime::parse_from_rfc3339(value).is_ok();
        self.all_uuid &= uuid::Uuid::parse_str(value).is_ok();

        if let Some(n) = number {
            self.min = Some(self.min.map_or(n, |m| m.min(n)));
            self.max = Some(self.max.map_or(n, |m| m.max(n)));
        }

        if !self.overflowed && !self.distinct.iter().any(|d| d == value) {
            if self.distinct.len() == MAX_ENUMERATED_VALUES {
                self.overflowed = true;
                self.distinct.clear();
            } else {
                self.distinct.push(value.to_string());
            }
        }
    }

    pub fn kind(&self) -> FieldKind {
        if self.seen == 0 {
            FieldKind::String
        } else if self.all_bool {
            FieldKind::Boolean
        } else if self.all_long {
            FieldKind::Long
        } else if self.all_float {
            FieldKind::Float
        } else if self.all_timestamp {
            FieldKind::Timestamp
        } else if self.all_uuid {
            FieldKind::Uuid
        } else {
            FieldKind::String
        }
    }

    /// Turn the evidence into a field definition. Deep inference adds
    /// numeric bounds and enumerated values for low-cardinality strings.
    pub fn to_definition(&self, deep: bool) -> FieldDefinition {
        let kind = self.kind();
        let mut def = FieldDefinition::new(self.name.clone(), kind);
        if !deep {
            return def;
        }
        match kind {
            FieldKind::Long => {
                def.min = self.min.map(|m| Bound::Int(m as i64));
                def.max = self.max.map(|m| Bound::Int(m as i64));
            }
            FieldKind::Float => {
                def.min = self.min.map(Bound::Float);
                def.max = self.max.map(Bound::Float);
            }
            FieldKind::String if !self.overflowed && !self.distinct.is_empty() => {
                def.possible_values = self.distinct.clone();
            }
            _ => {}
        }
        def
    }
}

/// Column statistics for a table, in column order.
#[derive(Debug, Clone, Default)]
pub struct TableStats {
    columns: Vec<ColumnStats>,
    index: HashMap<String, usize>,
    records: usize,
}

impl TableStats {
    pub fn with_columns<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut stats = Self::default();
        for name in names {
            stats.column_mut(&name.into());
        }
        stats
    }

    fn column_mut(&mut self, name: &str) -> &mut ColumnStats {
        let pos = match self.index.get(name) {
            Some(&pos) => pos,
            None => {
                self.columns.push(ColumnStats::new(name));
                self.index.insert(name.to_string(), self.columns.len() - 1);
                self.columns.len() - 1
            }
        };
        &mut self.columns[pos]
    }

    /// Feed one record given as (column, raw value) pairs.
    pub fn observe<'a, I>(&mut self, record: I)
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        for (name, value) in record {
            self.column_mut(name).observe(value);
        }
        self.records += 1;
    }

    pub fn records(&self) -> usize {
        self.records
    }

    pub fn columns(&self) -> &[ColumnStats] {
        &self.columns
    }

    pub fn to_definitions(&self, deep: bool) -> Vec<FieldDefinition> {
        self.columns.iter().map(|c| c.to_definition(deep)).collect()
    }
}

/// Render a JSON value the way a text sink would have written it.
pub fn json_to_raw(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
