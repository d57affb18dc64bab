//! In-memory sink, used by `preview` and tests.

use crate::error::SinkError;
use crate::infer::TableStats;
use crate::{Sink, SinkMode};
use datagen_core::ModelDefinition;
use datagen_generator::{Model, Row};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

/// Keeps every delivered row.
#[derive(Debug, Default)]
pub struct MemorySink {
    rows: Mutex<Vec<Row>>,
    batches: AtomicUsize,
    initialized: AtomicBool,
    terminated: AtomicBool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> Vec<Row> {
        self.rows
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn row_count(&self) -> usize {
        self.rows
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn batch_count(&self) -> usize {
        self.batches.load(Ordering::SeqCst)
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::SeqCst)
    }
}

impl Sink for MemorySink {
    fn name(&self) -> &str {
        "memory"
    }

    fn init(&self, _model: &Model, _mode: SinkMode) -> Result<(), SinkError> {
        self.initialized.store(true, Ordering::SeqCst);
        self.terminated.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn send_batch(&self, rows: &[Row]) -> Result<(), SinkError> {
        if !self.is_initialized() {
            return Err(SinkError::NotInitialized(self.name().to_string()));
        }
        self.rows
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .extend_from_slice(rows);
        self.batches.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn terminate(&self) -> Result<(), SinkError> {
        self.terminated.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn infer_model(&self, deep: bool) -> Result<ModelDefinition, SinkError> {
        let rows = self.rows();
        if rows.is_empty() {
            return Err(SinkError::NoData(self.name().to_string()));
        }
        let mut stats = TableStats::default();
        for row in &rows {
            let rendered: Vec<(&str, String)> =
                row.visible().map(|(k, v)| (k, v.render())).collect();
            stats.observe(rendered.iter().map(|(k, v)| (*k, v.as_str())));
        }
        Ok(ModelDefinition::new("memory", stats.to_definitions(deep)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use datagen_core::{FieldKind, Value};

    #[test]
    fn test_collects_batches() {
        let sink = MemorySink::new();
        let row = Row::from_pairs(vec![("n".to_string(), Value::Integer(3))]);
        assert!(sink.send_batch(&[row.clone()]).is_err());

        let def = ModelDefinition::from_yaml("fields:\n  - name: n\n    type: integer\n").unwrap();
        let model = Model::from_definition(&def, &Default::default()).unwrap();
        sink.init(&model, SinkMode::Write).unwrap();
        sink.send_batch(&[row.clone(), row.clone()]).unwrap();
        sink.send_batch(&[row]).unwrap();
        sink.terminate().unwrap();

        assert_eq!(sink.row_count(), 3);
        assert_eq!(sink.batch_count(), 2);
        assert!(sink.is_terminated());

        let inferred = sink.infer_model(false).unwrap();
        assert_eq!(inferred.fields[0].kind, FieldKind::Long);
    }
}
