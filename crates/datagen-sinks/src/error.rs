//! Error types for sinks.

use thiserror::Error;

/// Errors that can occur while creating a sink or writing to it.
#[derive(Error, Debug)]
pub enum SinkError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization error.
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Model options could not be read.
    #[error("Schema error: {0}")]
    Schema(#[from] datagen_core::SchemaError),

    /// Unknown sink kind in a request.
    #[error("Unknown sink kind: {0}")]
    UnknownKind(String),

    /// A sink property has a value the sink cannot use.
    #[error("Invalid value '{value}' for sink property '{key}'")]
    InvalidProperty { key: String, value: String },

    /// `send_batch` or `terminate` before a successful `init`.
    #[error("Sink '{0}' is not initialized")]
    NotInitialized(String),

    /// Nothing to read back when inferring a model.
    #[error("No existing output found for sink '{0}'")]
    NoData(String),

    /// Operation the sink does not implement.
    #[error("Sink '{sink}' does not support {operation}")]
    Unsupported { sink: String, operation: String },
}
