//! A validated, ready-to-generate model.

use crate::conditions::ComputedExpr;
use crate::dictionaries::Dictionaries;
use crate::field::Field;
use crate::generators::CounterBank;
use crate::row::{Row, RowLayout};
use datagen_core::{ModelDefinition, ModelOptions, SchemaError, Value};
use rand::Rng;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};

/// Fields in declaration order plus everything needed to fill a row.
///
/// A `Model` is immutable once built and shared by every worker of a
/// command. Its only mutable state is the [`CounterBank`] behind the
/// `increment_*` fields.
#[derive(Debug)]
pub struct Model {
    definition: ModelDefinition,
    fields: Vec<Field>,
    layout: Arc<RowLayout>,
    plain: Vec<usize>,
    computed_order: Vec<usize>,
    counters: CounterBank,
    options: ModelOptions,
}

impl Model {
    /// Validate `definition` and resolve every field.
    pub fn from_definition(
        definition: &ModelDefinition,
        dictionaries: &Dictionaries,
    ) -> Result<Self, SchemaError> {
        if definition.fields.is_empty() {
            return Err(SchemaError::EmptyModel);
        }

        let mut seen = HashSet::new();
        for (i, def) in definition.fields.iter().enumerate() {
            if def.name.trim().is_empty() {
                return Err(SchemaError::EmptyFieldName(i));
            }
            if !seen.insert(def.name.as_str()) {
                return Err(SchemaError::DuplicateField(def.name.clone()));
            }
        }

        let options = ModelOptions::from_raw(&definition.options)?;

        let mut counters = CounterBank::default();
        let fields = definition
            .fields
            .iter()
            .map(|def| Field::from_definition(def, dictionaries, &mut counters))
            .collect::<Result<Vec<_>, _>>()?;

        check_references(&fields)?;
        let computed_order = computed_order(&fields)?;
        let plain = (0..fields.len()).filter(|&i| !fields[i].is_computed()).collect();

        let layout = RowLayout::new(
            fields
                .iter()
                .map(|f| (f.name().to_string(), f.is_ghost())),
        );

        debug!(
            "Model '{}' built: {} fields, {} computed",
            definition.model_name,
            fields.len(),
            computed_order.len()
        );

        Ok(Self {
            definition: definition.clone(),
            fields,
            layout: Arc::new(layout),
            plain,
            computed_order,
            counters,
            options,
        })
    }

    pub fn name(&self) -> &str {
        &self.definition.model_name
    }

    pub fn definition(&self) -> &ModelDefinition {
        &self.definition
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.layout.position(name).map(|i| &self.fields[i])
    }

    pub fn layout(&self) -> &RowLayout {
        &self.layout
    }

    /// Names delivered to sinks: every field except ghosts.
    pub fn visible_field_names(&self) -> Vec<&str> {
        self.layout.visible_names()
    }

    pub fn options(&self) -> &ModelOptions {
        &self.options
    }

    /// Sink-addressing name, e.g. `table_names::LOCAL_FILE_PATH`.
    pub fn table_name(&self, key: &str) -> Option<&str> {
        self.definition.table_names.get(key).map(String::as_str)
    }

    pub fn counters(&self) -> &CounterBank {
        &self.counters
    }

    /// Names of computed fields in evaluation order.
    pub fn computed_order(&self) -> Vec<&str> {
        self.computed_order
            .iter()
            .map(|&i| self.fields[i].name())
            .collect()
    }

    /// Generate one row: plain fields first, then computed fields in
    /// dependency order.
    pub fn generate_row<R: Rng + ?Sized>(&self, rng: &mut R) -> Row {
        let mut row = Row::empty(Arc::clone(&self.layout));
        for &i in &self.plain {
            row.set(i, self.fields[i].generate(rng, &self.counters));
        }
        for &i in &self.computed_order {
            let field = &self.fields[i];
            let value = field.compute(&row).unwrap_or_else(|e| {
                warn!("Computed field '{}' failed: {e}", field.name());
                Value::Null
            });
            row.set(i, value);
        }
        row
    }

    pub fn generate_rows<R: Rng + ?Sized>(&self, rng: &mut R, count: usize) -> Vec<Row> {
        (0..count).map(|_| self.generate_row(rng)).collect()
    }
}

fn check_references(fields: &[Field]) -> Result<(), SchemaError> {
    let kinds: HashMap<&str, _> = fields.iter().map(|f| (f.name(), f.kind())).collect();
    for field in fields {
        let Some(expr) = field.expression() else {
            continue;
        };
        for reference in expr.references() {
            let Some(kind) = kinds.get(reference) else {
                return Err(SchemaError::UnknownReference {
                    field: field.name().to_string(),
                    reference: reference.to_string(),
                });
            };
            if let ComputedExpr::Link(link) = expr {
                link.check_target(*kind)
                    .map_err(|reason| SchemaError::InvalidExpression {
                        field: field.name().to_string(),
                        reason,
                    })?;
            }
        }
    }
    Ok(())
}

/// Topological order of computed fields (Kahn), ties broken by declaration
/// order. References to plain fields are always satisfied.
fn computed_order(fields: &[Field]) -> Result<Vec<usize>, SchemaError> {
    let index: HashMap<&str, usize> = fields
        .iter()
        .enumerate()
        .map(|(i, f)| (f.name(), i))
        .collect();

    let mut pending: HashMap<usize, usize> = HashMap::new();
    let mut dependents: HashMap<usize, Vec<usize>> = HashMap::new();
    for (i, field) in fields.iter().enumerate() {
        let Some(expr) = field.expression() else {
            continue;
        };
        let deps: Vec<usize> = expr
            .references()
            .into_iter()
            .filter_map(|r| index.get(r).copied())
            .filter(|&d| fields[d].is_computed())
            .collect();
        pending.insert(i, deps.len());
        for d in deps {
            dependents.entry(d).or_default().push(i);
        }
    }

    let mut ready: BTreeSet<usize> = pending
        .iter()
        .filter(|(_, n)| **n == 0)
        .map(|(i, _)| *i)
        .collect();
    let mut order = Vec::with_capacity(pending.len());
    while let Some(next) = ready.pop_first() {
        order.push(next);
        for &dependent in dependents.get(&next).map(Vec::as_slice).unwrap_or(&[]) {
            if let Some(n) = pending.get_mut(&dependent) {
                *n -= 1;
                if *n == 0 {
                    ready.insert(dependent);
                }
            }
        }
    }

    if order.len() < pending.len() {
        let mut stuck: Vec<usize> = pending
            .keys()
            .copied()
            .filter(|i| !order.contains(i))
            .collect();
        stuck.sort_unstable();
        return Err(SchemaError::ComputedCycle(
            stuck.into_iter().map(|i| fields[i].name().to_string()).collect(),
        ));
    }
    Ok(order)
}
