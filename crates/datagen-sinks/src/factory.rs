//! Building sinks from requests.

use crate::error::SinkError;
use crate::files::{FileSettings, FileTarget};
use crate::{CsvSink, JsonlSink, MemorySink, Sink, StdoutSink};
use clap::ValueEnum;
use datagen_core::options::table_names;
use datagen_core::{ModelDefinition, ModelOptions};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

/// Property keys understood by [`DefaultSinkFactory`]. They take precedence
/// over the model's `table_names` and options.
pub mod properties {
    pub const OUTPUT_DIR: &str = "output_dir";
    pub const FILE_NAME: &str = "file_name";
    pub const ONE_FILE_PER_ITERATION: &str = "one_file_per_iteration";
    pub const CSV_HEADER: &str = "csv_header";
    pub const DELETE_PREVIOUS: &str = "delete_previous";
}

/// Kinds of sink a request can name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    Csv,
    #[serde(alias = "jsonl")]
    #[value(alias = "jsonl")]
    Json,
    Stdout,
    Memory,
}

impl SinkKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SinkKind::Csv => "csv",
            SinkKind::Json => "json",
            SinkKind::Stdout => "stdout",
            SinkKind::Memory => "memory",
        }
    }

    fn extension(&self) -> &'static str {
        match self {
            SinkKind::Csv => "csv",
            _ => "json",
        }
    }
}

impl fmt::Display for SinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SinkKind {
    type Err = SinkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(SinkKind::Csv),
            "json" | "jsonl" => Ok(SinkKind::Json),
            "stdout" => Ok(SinkKind::Stdout),
            "memory" => Ok(SinkKind::Memory),
            other => Err(SinkError::UnknownKind(other.to_string())),
        }
    }
}

/// A sink named in a request: its kind plus free-form properties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SinkSpec {
    pub kind: SinkKind,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, String>,
}

impl SinkSpec {
    pub fn new(kind: SinkKind) -> Self {
        Self {
            kind,
            properties: BTreeMap::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    fn bool_property(&self, key: &str) -> Result<Option<bool>, SinkError> {
        let Some(raw) = self.properties.get(key) else {
            return Ok(None);
        };
        match raw.trim().to_ascii_lowercase().as_str() {
            "true" => Ok(Some(true)),
            "false" => Ok(Some(false)),
            _ => Err(SinkError::InvalidProperty {
                key: key.to_string(),
                value: raw.clone(),
            }),
        }
    }
}

/// Builds sink instances. One instance is created per command run and
/// shared by all its workers.
pub trait SinkFactory: Send + Sync {
    fn create(&self, spec: &SinkSpec, model: &ModelDefinition) -> Result<Arc<dyn Sink>, SinkError>;
}

/// Factory for the local reference sinks.
///
/// File sinks write to `properties.output_dir`, else the model's
/// `local_file_path`, else the factory's output directory. The file name
/// comes from `properties.file_name`, else `local_file_name`, else the
/// model name.
#[derive(Debug, Clone)]
pub struct DefaultSinkFactory {
    output_dir: PathBuf,
}

impl DefaultSinkFactory {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &std::path::Path {
        &self.output_dir
    }

    fn file_target(&self, spec: &SinkSpec, model: &ModelDefinition) -> FileTarget {
        let dir = spec
            .properties
            .get(properties::OUTPUT_DIR)
            .or_else(|| model.table_names.get(table_names::LOCAL_FILE_PATH))
            .map(PathBuf::from)
            .unwrap_or_else(|| self.output_dir.clone());
        let name = spec
            .properties
            .get(properties::FILE_NAME)
            .or_else(|| model.table_names.get(table_names::LOCAL_FILE_NAME))
            .cloned()
            .unwrap_or_else(|| model.model_name.clone());
        FileTarget::new(dir, name, spec.kind.extension())
    }

    fn file_settings(spec: &SinkSpec, model: &ModelDefinition) -> Result<FileSettings, SinkError> {
        let options = ModelOptions::from_raw(&model.options)?;
        let mut settings = FileSettings::from_options(&options);
        if let Some(v) = spec.bool_property(properties::ONE_FILE_PER_ITERATION)? {
            settings.one_file_per_iteration = v;
        }
        if let Some(v) = spec.bool_property(properties::CSV_HEADER)? {
            settings.header = v;
        }
        if let Some(v) = spec.bool_property(properties::DELETE_PREVIOUS)? {
            settings.delete_previous = v;
        }
        Ok(settings)
    }
}

impl SinkFactory for DefaultSinkFactory {
    fn create(&self, spec: &SinkSpec, model: &ModelDefinition) -> Result<Arc<dyn Sink>, SinkError> {
        let sink: Arc<dyn Sink> = match spec.kind {
            SinkKind::Csv => Arc::new(CsvSink::new(
                self.file_target(spec, model),
                Self::file_settings(spec, model)?,
            )),
            SinkKind::Json => Arc::new(JsonlSink::new(
                self.file_target(spec, model),
                Self::file_settings(spec, model)?,
            )),
            SinkKind::Stdout => Arc::new(StdoutSink::new()),
            SinkKind::Memory => Arc::new(MemorySink::new()),
        };
        Ok(sink)
    }
}
