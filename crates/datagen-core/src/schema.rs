//! Model definition format.
//!
//! A model file lists the fields to generate plus the metadata sinks need
//! to address their destination. Both YAML and JSON are accepted; mapping
//! order is preserved for `possible_values_weighted` and `conditionals`
//! since both are evaluated in declaration order.

use crate::kinds::FieldKind;
use crate::options::OptionValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Errors raised while loading or validating a model. All of them are
/// fatal: a model that fails validation is never used for generation.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// Error reading model file
    #[error("Failed to read model file: {0}")]
    IoError(#[from] std::io::Error),

    /// Error parsing YAML
    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// Error parsing JSON
    #[error("Failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Model has no fields")]
    EmptyModel,

    #[error("Field at position {0} has an empty name")]
    EmptyFieldName(usize),

    #[error("Field '{0}' is declared more than once")]
    DuplicateField(String),

    /// A value of an enumerated or weighted set does not parse as the field type
    #[error("Field '{field}': invalid value '{value}': {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Field '{0}': weighted values sum to zero")]
    ZeroWeight(String),

    #[error("Field '{field}': invalid range: {reason}")]
    InvalidRange { field: String, reason: String },

    #[error("Field '{field}': invalid pattern: {reason}")]
    InvalidPattern { field: String, reason: String },

    #[error("Field '{field}': invalid expression: {reason}")]
    InvalidExpression { field: String, reason: String },

    #[error("Field '{field}' references unknown field '{reference}'")]
    UnknownReference { field: String, reference: String },

    #[error("Computed fields form a cycle: {}", .0.join(" -> "))]
    ComputedCycle(Vec<String>),

    #[error("Option '{option}' has an invalid value '{value}'")]
    InvalidOption { option: String, value: String },
}

/// A numeric bound, kept integral when written as an integer so that
/// `long` bounds near `i64::MAX` survive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Bound {
    Int(i64),
    Float(f64),
}

impl Bound {
    pub fn as_i64(&self) -> i64 {
        match self {
            Bound::Int(i) => *i,
            Bound::Float(f) => *f as i64,
        }
    }

    pub fn as_f64(&self) -> f64 {
        match self {
            Bound::Int(i) => *i as f64,
            Bound::Float(f) => *f,
        }
    }
}

/// One field of a model file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub name: String,

    #[serde(rename = "type")]
    pub kind: FieldKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<Bound>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<Bound>,

    /// Lower temporal bound, RFC 3339 (or `yyyy-mm-dd` / `dd/mm/yyyy` for birthdates).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_date: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_date: Option<String>,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub use_now: bool,

    /// Closed set sampled uniformly.
    #[serde(
        default,
        skip_serializing_if = "Vec::is_empty",
        deserialize_with = "scalar::deserialize_list"
    )]
    pub possible_values: Vec<String>,

    /// Ordered value -> weight mapping.
    #[serde(
        default,
        skip_serializing_if = "Vec::is_empty",
        with = "ordered_pairs"
    )]
    pub possible_values_weighted: Vec<(String, u64)>,

    /// Dictionary filters, e.g. country names for `city` or `phone`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<String>,

    /// Template for `string_regex` fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regex: Option<String>,

    /// Output format for `date_as_string` fields (strftime).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,

    /// Ordered `condition line -> value` mapping.
    #[serde(
        default,
        skip_serializing_if = "Vec::is_empty",
        with = "ordered_pairs"
    )]
    pub conditionals: Vec<(String, String)>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formula: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub injection: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,

    /// Generated and usable by computed fields, but never written to sinks.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub ghost: bool,
}

impl FieldDefinition {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            length: None,
            min: None,
            max: None,
            min_date: None,
            max_date: None,
            use_now: false,
            possible_values: Vec::new(),
            possible_values_weighted: Vec::new(),
            filters: Vec::new(),
            regex: None,
            pattern: None,
            conditionals: Vec::new(),
            formula: None,
            injection: None,
            link: None,
            ghost: false,
        }
    }

    /// A field is computed when it derives its value from sibling fields.
    pub fn is_computed(&self) -> bool {
        !self.conditionals.is_empty()
            || self.formula.is_some()
            || self.injection.is_some()
            || self.link.is_some()
    }
}

fn default_model_name() -> String {
    "model".to_string()
}

/// A complete model file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDefinition {
    #[serde(default = "default_model_name", alias = "name")]
    pub model_name: String,

    #[serde(alias = "Fields")]
    pub fields: Vec<FieldDefinition>,

    /// Primary-key column lists per logical table.
    #[serde(default, alias = "Primary_Keys", skip_serializing_if = "BTreeMap::is_empty")]
    pub primary_keys: BTreeMap<String, Vec<String>>,

    /// Sink-addressing names (paths, topics, tables, buckets).
    #[serde(default, alias = "Table_Names", skip_serializing_if = "BTreeMap::is_empty")]
    pub table_names: BTreeMap<String, String>,

    #[serde(default, alias = "Options", skip_serializing_if = "BTreeMap::is_empty")]
    pub options: BTreeMap<String, OptionValue>,
}

impl ModelDefinition {
    pub fn new(model_name: impl Into<String>, fields: Vec<FieldDefinition>) -> Self {
        Self {
            model_name: model_name.into(),
            fields,
            primary_keys: BTreeMap::new(),
            table_names: BTreeMap::new(),
            options: BTreeMap::new(),
        }
    }

    /// Load a model from a file, choosing the parser by extension
    /// (`.json` is JSON, anything else YAML).
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SchemaError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json(&content)
        } else {
            Self::from_yaml(&content)
        }
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, SchemaError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_json(json: &str) -> Result<Self, SchemaError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_yaml(&self) -> Result<String, SchemaError> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn to_json(&self) -> Result<String, SchemaError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn get_field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }
}

/// Scalars (strings, numbers, booleans) read as their string form, so that
/// `possible_values: [1, 2, 3]` and `possible_values: ["a"]` both work.
mod scalar {
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    pub(super) enum Scalar {
        Bool(bool),
        Int(i64),
        Float(f64),
        Text(String),
    }

    impl From<Scalar> for String {
        fn from(s: Scalar) -> Self {
            match s {
                Scalar::Bool(b) => b.to_string(),
                Scalar::Int(i) => i.to_string(),
                Scalar::Float(f) => f.to_string(),
                Scalar::Text(t) => t,
            }
        }
    }

    pub fn deserialize_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let values = Vec::<Scalar>::deserialize(deserializer)?;
        Ok(values.into_iter().map(String::from).collect())
    }
}

/// Mapping <-> ordered list of pairs, preserving document order.
mod ordered_pairs {
    use super::scalar::Scalar;
    use serde::de::{DeserializeOwned, MapAccess, Visitor};
    use serde::{Deserializer, Serialize, Serializer};
    use std::fmt;
    use std::marker::PhantomData;

    #[allow(clippy::ptr_arg)]
    pub fn serialize<S, V>(pairs: &Vec<(String, V)>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        V: Serialize,
    {
        serializer.collect_map(pairs.iter().map(|(k, v)| (k, v)))
    }

    pub fn deserialize<'de, D, V>(deserializer: D) -> Result<Vec<(String, V)>, D::Error>
    where
        D: Deserializer<'de>,
        V: DeserializeOwned,
    {
        struct PairsVisitor<V>(PhantomData<V>);

        impl<'de, V: DeserializeOwned> Visitor<'de> for PairsVisitor<V> {
            type Value = Vec<(String, V)>;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a mapping")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut pairs = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some(key) = map.next_key::<Scalar>()? {
                    let value = map.next_value::<V>()?;
                    pairs.push((String::from(key), value));
                }
                Ok(pairs)
            }
        }

        deserializer.deserialize_map(PairsVisitor(PhantomData))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MODEL_YAML: &str = r#"
model_name: customers
fields:
  - name: id
    type: increment_long
    min: 1000
  - name: country
    type: country
    possible_values_weighted:
      Spain: 10
      France: 60
      Germany: 30
  - name: age
    type: integer
    min: 18
    max: 90
  - name: size
    type: integer
    possible_values: [1, 2, 3]
  - name: adult
    type: boolean
    conditionals:
      "$age>17": "true"
      "default": "false"
table_names:
  local_file_name: customers
options:
  csv_header: false
"#;

    #[test]
    fn test_parse_yaml_model() {
        let model = ModelDefinition::from_yaml(MODEL_YAML).unwrap();
        assert_eq!(model.model_name, "customers");
        assert_eq!(model.fields.len(), 5);
        assert_eq!(model.fields[0].kind, FieldKind::IncrementLong);
        assert_eq!(model.fields[0].min, Some(Bound::Int(1000)));
        assert_eq!(model.fields[3].possible_values, vec!["1", "2", "3"]);
        assert_eq!(
            model.table_names.get("local_file_name").map(String::as_str),
            Some("customers")
        );
        assert_eq!(model.options.get("csv_header"), Some(&OptionValue::Bool(false)));
    }

    #[test]
    fn test_weighted_values_keep_declaration_order() {
        let model = ModelDefinition::from_yaml(MODEL_YAML).unwrap();
        let weighted = &model.fields[1].possible_values_weighted;
        let names: Vec<&str> = weighted.iter().map(|(v, _)| v.as_str()).collect();
        assert_eq!(names, vec!["Spain", "France", "Germany"]);
        assert_eq!(weighted[1].1, 60);
    }

    #[test]
    fn test_computed_detection() {
        let model = ModelDefinition::from_yaml(MODEL_YAML).unwrap();
        assert!(!model.fields[2].is_computed());
        assert!(model.fields[4].is_computed());
        assert_eq!(model.fields[4].conditionals[0].0, "$age>17");
    }

    #[test]
    fn test_parse_json_with_legacy_keys() {
        let json = r#"{
            "Fields": [
                {"name": "name", "type": "NAME", "filters": ["France"]},
                {"name": "bucket", "type": "INTEGER", "possible_values_weighted": {"1": 5, "2": 5}}
            ],
            "Table_Names": {"local_file_path": "/tmp/out"},
            "Options": {"one_file_per_iteration": "false"}
        }"#;
        let model = ModelDefinition::from_json(json).unwrap();
        assert_eq!(model.model_name, "model");
        assert_eq!(model.fields[0].kind, FieldKind::Name);
        assert_eq!(model.fields[0].filters, vec!["France"]);
        assert_eq!(model.fields[1].possible_values_weighted.len(), 2);
    }

    #[test]
    fn test_yaml_roundtrip_preserves_model() {
        let model = ModelDefinition::from_yaml(MODEL_YAML).unwrap();
        let again = ModelDefinition::from_yaml(&model.to_yaml().unwrap()).unwrap();
        assert_eq!(model, again);
    }

    #[test]
    fn test_from_file_picks_parser_by_extension() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        let json = ModelDefinition::from_yaml(MODEL_YAML).unwrap().to_json().unwrap();
        file.write_all(json.as_bytes()).unwrap();
        let model = ModelDefinition::from_file(file.path()).unwrap();
        assert_eq!(model.model_name, "customers");
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let result = ModelDefinition::from_yaml("fields:\n  - name: a\n    type: blob\n");
        assert!(matches!(result, Err(SchemaError::YamlError(_))));
    }
}
