//! Output sinks for datagen.
//!
//! A [`Sink`] receives batches of generated rows. One sink instance is
//! shared by every worker of a command, so all methods take `&self` and
//! implementations synchronize internally.
//!
//! Lifecycle: [`Sink::init`] once, [`Sink::send_batch`] once per batch
//! (possibly from several threads at a time), [`Sink::terminate`] once.
//!
//! This crate ships the local reference sinks:
//!
//! - [`CsvSink`] - CSV files, one per run or one per batch
//! - [`JsonlSink`] - JSON lines files, one per run or one per batch
//! - [`StdoutSink`] - JSON lines on standard output
//! - [`MemorySink`] - rows kept in memory
//!
//! Remote adapters plug in by implementing [`Sink`] and a [`SinkFactory`].
//!
//! # Example
//!
//! ```ignore
//! use datagen_sinks::{DefaultSinkFactory, SinkFactory, SinkKind, SinkMode, SinkSpec};
//!
//! let factory = DefaultSinkFactory::new("/tmp/datagen");
//! let sink = factory.create(&SinkSpec::new(SinkKind::Csv), &model)?;
//! sink.init(&model, SinkMode::Write)?;
//! sink.send_batch(&rows)?;
//! sink.terminate()?;
//! ```

mod csv_file;
mod error;
mod factory;
mod files;
pub mod infer;
mod jsonl_file;
mod memory;
mod stdout;

pub use csv_file::CsvSink;
pub use error::SinkError;
pub use factory::{properties, DefaultSinkFactory, SinkFactory, SinkKind, SinkSpec};
pub use files::FileTarget;
pub use jsonl_file::JsonlSink;
pub use memory::MemorySink;
pub use stdout::StdoutSink;

use datagen_core::ModelDefinition;
use datagen_generator::{Model, Row};

/// Whether a sink is opened to write new output or to read existing output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkMode {
    Write,
    Read,
}

/// Destination of generated rows.
pub trait Sink: Send + Sync {
    /// Short name used in logs and errors.
    fn name(&self) -> &str;

    /// Prepare the destination. In `Write` mode this creates directories
    /// and purges earlier output when `delete_previous` is set.
    fn init(&self, model: &Model, mode: SinkMode) -> Result<(), SinkError>;

    /// Deliver one batch.
    fn send_batch(&self, rows: &[Row]) -> Result<(), SinkError>;

    /// Flush and release resources.
    fn terminate(&self) -> Result<(), SinkError>;

    /// Read existing output back and propose a model for it. `deep` scans
    /// every record; otherwise only the first records are sampled.
    fn infer_model(&self, _deep: bool) -> Result<ModelDefinition, SinkError> {
        Err(SinkError::Unsupported {
            sink: self.name().to_string(),
            operation: "model inference".to_string(),
        })
    }
}
