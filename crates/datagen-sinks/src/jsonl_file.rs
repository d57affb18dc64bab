//! JSON lines file sink.

use crate::error::SinkError;
use crate::files::{FileSettings, FileTarget};
use crate::infer::{json_to_raw, TableStats, SHALLOW_SAMPLE_ROWS};
use crate::{Sink, SinkMode};
use datagen_core::options::table_names;
use datagen_core::ModelDefinition;
use datagen_generator::{Model, Row};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::sync::Mutex;
use tracing::{debug, error, info, warn};

#[derive(Default)]
struct JsonlState {
    initialized: bool,
    writer: Option<BufWriter<File>>,
}

/// Writes one JSON object per row and line, either to `{name}.json` or to
/// one numbered file per batch. Ghost fields are left out.
pub struct JsonlSink {
    target: FileTarget,
    settings: FileSettings,
    state: Mutex<JsonlState>,
}

fn write_rows<W: Write>(writer: &mut W, rows: &[Row]) -> Result<(), SinkError> {
    for row in rows {
        serde_json::to_writer(&mut *writer, &row.to_json())?;
        writeln!(writer)?;
    }
    writer.flush()?;
    Ok(())
}

impl JsonlSink {
    pub fn new(target: FileTarget, settings: FileSettings) -> Self {
        Self {
            target,
            settings,
            state: Mutex::new(JsonlState::default()),
        }
    }

    pub fn target(&self) -> &FileTarget {
        &self.target
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, JsonlState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Sink for JsonlSink {
    fn name(&self) -> &str {
        "json"
    }

    fn init(&self, _model: &Model, mode: SinkMode) -> Result<(), SinkError> {
        let mut state = self.lock();
        if mode == SinkMode::Write {
            self.target.create_dir()?;
            if self.settings.delete_previous {
                self.target.purge()?;
            }
            self.target.resume_sequence()?;
            if !self.settings.one_file_per_iteration {
                let path = self.target.single_path();
                info!("Writing JSON lines to '{}'", path.display());
                let (writer, _) = self.target.append_file(&path)?;
                state.writer = Some(writer);
            }
        }
        state.initialized = true;
        Ok(())
    }

    fn send_batch(&self, rows: &[Row]) -> Result<(), SinkError> {
        if self.settings.one_file_per_iteration {
            if !self.lock().initialized {
                return Err(SinkError::NotInitialized(self.name().to_string()));
            }
            let path = self.target.next_path();
            let mut writer = self.target.create_file(&path)?;
            write_rows(&mut writer, rows)?;
            debug!("Wrote {} rows to '{}'", rows.len(), path.display());
            return Ok(());
        }

        let mut state = self.lock();
        let writer = state
            .writer
            .as_mut()
            .ok_or_else(|| SinkError::NotInitialized(self.name().to_string()))?;
        write_rows(writer, rows)
    }

    fn terminate(&self) -> Result<(), SinkError> {
        let mut state = self.lock();
        if let Some(mut writer) = state.writer.take() {
            if let Err(e) = writer.flush() {
                error!("Unable to flush '{}': {e}", self.target.single_path().display());
                return Err(e.into());
            }
        }
        state.initialized = false;
        Ok(())
    }

    fn infer_model(&self, deep: bool) -> Result<ModelDefinition, SinkError> {
        let files = self.target.existing_files()?;
        if files.is_empty() {
            return Err(SinkError::NoData(self.target.single_path().display().to_string()));
        }

        let mut stats = TableStats::default();
        'files: for path in &files {
            debug!("Inferring model from '{}'", path.display());
            let reader = BufReader::new(File::open(path)?);
            for (n, line) in reader.lines().enumerate() {
                let line = line?;
                if line.trim().is_empty() {
                    continue;
                }
                let object = match serde_json::from_str::<serde_json::Value>(&line) {
                    Ok(serde_json::Value::Object(object)) => object,
                    Ok(_) => {
                        warn!("{}:{} is not a JSON object, skipped", path.display(), n + 1);
                        continue;
                    }
                    Err(e) => {
                        warn!("{}:{} is not valid JSON ({e}), skipped", path.display(), n + 1);
                        continue;
                    }
                };
                let raw: Vec<(&str, String)> = object
                    .iter()
                    .map(|(k, v)| (k.as_str(), json_to_raw(v)))
                    .collect();
                stats.observe(raw.iter().map(|(k, v)| (*k, v.as_str())));
                if !deep && stats.records() >= SHALLOW_SAMPLE_ROWS {
                    break 'files;
                }
            }
            if !deep && stats.records() > 0 {
                break;
            }
        }

        let mut definition = ModelDefinition::new(self.target.name(), stats.to_definitions(deep));
        definition.table_names.insert(
            table_names::LOCAL_FILE_PATH.to_string(),
            self.target.dir().display().to_string(),
        );
        definition.table_names.insert(
            table_names::LOCAL_FILE_NAME.to_string(),
            self.target.name().to_string(),
        );
        info!(
            "Inferred {} fields from {} JSON record(s)",
            definition.fields.len(),
            stats.records()
        );
        Ok(definition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use datagen_core::{FieldKind, Value};
    use datagen_generator::Dictionaries;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::fs;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn model() -> Model {
        let def = ModelDefinition::from_yaml(
            r#"
fields:
  - name: id
    type: long
  - name: active
    type: boolean
  - name: hidden
    type: string
    ghost: true
"#,
        )
        .unwrap();
        Model::from_definition(&def, &Dictionaries::embedded()).unwrap()
    }

    fn settings(one_file_per_iteration: bool) -> FileSettings {
        FileSettings {
            one_file_per_iteration,
            header: true,
            delete_previous: false,
        }
    }

    #[test]
    fn test_rows_are_json_lines_without_ghosts() {
        let dir = TempDir::new().unwrap();
        let model = model();
        let sink = JsonlSink::new(FileTarget::new(dir.path(), "events", "json"), settings(false));
        sink.init(&model, SinkMode::Write).unwrap();
        let rows = model.generate_rows(&mut StdRng::seed_from_u64(42), 3);
        sink.send_batch(&rows).unwrap();
        sink.terminate().unwrap();

        let content = fs::read_to_string(dir.path().join("events.json")).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        for line in lines {
            let value: serde_json::Value = serde_json::from_str(line).unwrap();
            let object = value.as_object().unwrap();
            assert_eq!(object.keys().collect::<Vec<_>>(), vec!["id", "active"]);
        }
    }

    #[test]
    fn test_single_file_appends_across_runs() {
        let dir = TempDir::new().unwrap();
        let model = model();
        for seed in [1, 2] {
            let sink = JsonlSink::new(FileTarget::new(dir.path(), "events", "json"), settings(false));
            sink.init(&model, SinkMode::Write).unwrap();
            let rows = model.generate_rows(&mut StdRng::seed_from_u64(seed), 2);
            sink.send_batch(&rows).unwrap();
            sink.terminate().unwrap();
        }
        let content = fs::read_to_string(dir.path().join("events.json")).unwrap();
        assert_eq!(content.lines().count(), 4);
    }

    #[test]
    fn test_concurrent_batches_get_distinct_files() {
        let dir = TempDir::new().unwrap();
        let sink = Arc::new(JsonlSink::new(
            FileTarget::new(dir.path(), "events", "json"),
            settings(true),
        ));
        sink.init(&model(), SinkMode::Write).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let sink = Arc::clone(&sink);
                std::thread::spawn(move || {
                    let row = Row::from_pairs(vec![("id".to_string(), Value::Long(i))]);
                    sink.send_batch(&[row]).unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        sink.terminate().unwrap();
        assert_eq!(sink.target().existing_files().unwrap().len(), 8);
    }

    #[test]
    fn test_infer_model() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("events.json"),
            "{\"id\":1,\"kind\":\"a\",\"at\":\"2024-01-01T00:00:00Z\"}\n\nnot json\n{\"id\":2,\"kind\":\"b\",\"at\":\"2024-02-01T00:00:00Z\"}\n",
        )
        .unwrap();
        let sink = JsonlSink::new(FileTarget::new(dir.path(), "events", "json"), settings(false));
        let def = sink.infer_model(true).unwrap();
        assert_eq!(def.field_names(), vec!["id", "kind", "at"]);
        assert_eq!(def.fields[0].kind, FieldKind::Long);
        assert_eq!(def.fields[1].possible_values, vec!["a", "b"]);
        assert_eq!(def.fields[2].kind, FieldKind::Timestamp);
    }
}
