//! Error types for the execution engine.

use crate::command::CommandId;
use std::path::PathBuf;
use thiserror::Error;

/// Errors returned by the command runner.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The model of a request failed validation.
    #[error("Schema error: {0}")]
    Schema(#[from] datagen_core::SchemaError),

    /// A sink could not be created or initialized.
    #[error("Sink error: {0}")]
    Sink(#[from] datagen_sinks::SinkError),

    /// The request itself is unusable.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Command not found: {0}")]
    NotFound(CommandId),

    #[error("Command {0} is not scheduled")]
    NotScheduled(CommandId),

    /// Reading or writing the scheduled-command store failed.
    #[error("Command store '{path}': {source}")]
    Store {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The store file is not valid JSON.
    #[error("Command store '{path}' is corrupt: {source}")]
    StoreFormat {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Timed out waiting for command {0}")]
    Timeout(CommandId),

    #[error("Cannot start runner thread: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("Command runner is shut down")]
    ShutDown,
}
