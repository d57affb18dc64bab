//! CSV file sink.

use crate::error::SinkError;
use crate::files::{FileSettings, FileTarget};
use crate::infer::{TableStats, SHALLOW_SAMPLE_ROWS};
use crate::{Sink, SinkMode};
use csv::{ReaderBuilder, Writer};
use datagen_core::options::table_names;
use datagen_core::{ModelDefinition, OptionKey, OptionValue};
use datagen_generator::{Model, Row};
use std::fs::File;
use std::io::BufWriter;
use std::sync::Mutex;
use tracing::{debug, error, info};

type CsvWriter = Writer<BufWriter<File>>;

#[derive(Default)]
struct CsvState {
    initialized: bool,
    columns: Vec<String>,
    /// Open file when everything goes to a single file.
    writer: Option<CsvWriter>,
}

/// Writes rows as CSV, either to `{name}.csv` or to one numbered file per
/// batch.
pub struct CsvSink {
    target: FileTarget,
    settings: FileSettings,
    state: Mutex<CsvState>,
}

impl CsvSink {
    pub fn new(target: FileTarget, settings: FileSettings) -> Self {
        Self {
            target,
            settings,
            state: Mutex::new(CsvState::default()),
        }
    }

    pub fn target(&self) -> &FileTarget {
        &self.target
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CsvState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_rows(&self, writer: &mut CsvWriter, rows: &[Row]) -> Result<(), SinkError> {
        for row in rows {
            writer.write_record(row.to_record())?;
        }
        writer.flush()?;
        Ok(())
    }
}

impl Sink for CsvSink {
    fn name(&self) -> &str {
        "csv"
    }

    fn init(&self, model: &Model, mode: SinkMode) -> Result<(), SinkError> {
        let mut state = self.lock();
        state.columns = model
            .visible_field_names()
            .into_iter()
            .map(str::to_string)
            .collect();

        if mode == SinkMode::Write {
            self.target.create_dir()?;
            if self.settings.delete_previous {
                self.target.purge()?;
            }
            self.target.resume_sequence()?;
            if !self.settings.one_file_per_iteration {
                let path = self.target.single_path();
                let (file, empty) = self.target.append_file(&path)?;
                let mut writer = Writer::from_writer(file);
                if self.settings.header && empty {
                    writer.write_record(&state.columns)?;
                }
                info!("Writing CSV rows to '{}'", path.display());
                state.writer = Some(writer);
            }
        }
        state.initialized = true;
        Ok(())
    }

    fn send_batch(&self, rows: &[Row]) -> Result<(), SinkError> {
        if self.settings.one_file_per_iteration {
            let columns = {
                let state = self.lock();
                if !state.initialized {
                    return Err(SinkError::NotInitialized(self.name().to_string()));
                }
                state.columns.clone()
            };
            let path = self.target.next_path();
            let mut writer = Writer::from_writer(self.target.create_file(&path)?);
            if self.settings.header {
                writer.write_record(&columns)?;
            }
            self.write_rows(&mut writer, rows)?;
            debug!("Wrote {} rows to '{}'", rows.len(), path.display());
            return Ok(());
        }

        let mut state = self.lock();
        let writer = state
            .writer
            .as_mut()
            .ok_or_else(|| SinkError::NotInitialized(self.name().to_string()))?;
        self.write_rows(writer, rows)
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
            let mut reader = ReaderBuilder::new()
                .has_headers(self.settings.header)
                .flexible(true)
                .from_path(path)?;
            let headers: Vec<String> = if self.settings.header {
                reader.headers()?.iter().map(str::to_string).collect()
            } else {
                Vec::new()
            };

            for record in reader.records() {
                let record = record?;
                let names: Vec<String> = (0..record.len())
                    .map(|i| {
                        headers
                            .get(i)
                            .cloned()
                            .unwrap_or_else(|| format!("column_{}", i + 1))
                    })
                    .collect();
                stats.observe(names.iter().map(String::as_str).zip(record.iter()));
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
        definition.options.insert(
            OptionKey::CsvHeader.as_str().to_string(),
            OptionValue::Bool(self.settings.header),
        );
        info!(
            "Inferred {} fields from {} CSV record(s)",
            definition.fields.len(),
            stats.records()
        );
        Ok(definition)
    }
}
