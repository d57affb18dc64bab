//! Materialised records.

use datagen_core::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Column layout shared by every row of a model.
#[derive(Debug, Clone, PartialEq)]
pub struct RowLayout {
    names: Vec<String>,
    ghost: Vec<bool>,
    index: HashMap<String, usize>,
}

impl RowLayout {
    pub fn new(columns: impl IntoIterator<Item = (String, bool)>) -> Self {
        let (names, ghost): (Vec<String>, Vec<bool>) = columns.into_iter().unzip();
        let index = names
            .iter()
            .enumerate()
            .map(|(i, n)| (n.clone(), i))
            .collect();
        Self {
            names,
            ghost,
            index,
        }
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Names of the columns delivered to sinks.
    pub fn visible_names(&self) -> Vec<&str> {
        self.names
            .iter()
            .zip(&self.ghost)
            .filter(|(_, ghost)| !**ghost)
            .map(|(n, _)| n.as_str())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// One generated record: field name -> value, in model order.
///
/// Ghost fields are present for computed fields to read but are skipped by
/// [`Row::visible`] and everything built on it.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    layout: Arc<RowLayout>,
    values: Vec<Value>,
}

impl Row {
    pub(crate) fn empty(layout: Arc<RowLayout>) -> Self {
        let values = vec![Value::Null; layout.len()];
        Self { layout, values }
    }

    /// Build a row from explicit pairs, none of them ghost.
    pub fn from_pairs(pairs: Vec<(String, Value)>) -> Self {
        let (names, values): (Vec<String>, Vec<Value>) = pairs.into_iter().unzip();
        let layout = RowLayout::new(names.into_iter().map(|n| (n, false)));
        Self {
            layout: Arc::new(layout),
            values,
        }
    }

    pub(crate) fn set(&mut self, position: usize, value: Value) {
        if let Some(slot) = self.values.get_mut(position) {
            *slot = value;
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.layout.position(name).and_then(|i| self.values.get(i))
    }

    pub fn layout(&self) -> &RowLayout {
        &self.layout
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Every column, ghost fields included.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.layout
            .names
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }

    /// Columns delivered to sinks.
    pub fn visible(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.iter()
            .zip(self.layout.ghost.iter())
            .filter(|(_, ghost)| !**ghost)
            .map(|(pair, _)| pair)
    }

    /// Rendered visible values, in column order.
    pub fn to_record(&self) -> Vec<String> {
        self.visible().map(|(_, v)| v.render()).collect()
    }

    /// Visible columns as a JSON object, keeping column order.
    pub fn to_json(&self) -> serde_json::Value {
        let map: serde_json::Map<String, serde_json::Value> = self
            .visible()
            .map(|(k, v)| (k.to_string(), v.to_json()))
            .collect();
        serde_json::Value::Object(map)
    }
}
