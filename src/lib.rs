//! Datagen Library
//!
//! Generates synthetic records from a declarative model and delivers them in
//! batches to one or more sinks, once or on a repeating schedule.
//!
//! # Crates
//!
//! - `datagen_core` - model definition format, field kinds, values, options
//! - `datagen_generator` - field generators, computed fields, rows
//! - `datagen_sinks` - the sink contract, local file sinks, model inference
//! - `datagen_engine` - commands, worker pool, scheduler
//!
//! # CLI Usage
//!
//! ```bash
//! # Ten batches of 1000 rows to CSV and JSON-lines files
//! datagen generate --model customers.yaml --sink csv --sink json \
//!   --batches 10 --rows 1000 --threads 4 --output-dir /tmp/out
//!
//! # Same, every five minutes, three times
//! datagen generate --model customers.yaml --delay 5m --cycles 3
//!
//! # Print five rows
//! datagen preview --model customers.yaml --count 5
//!
//! # Check a model
//! datagen validate --model customers.yaml
//!
//! # Infer a model from existing CSV files
//! datagen infer --kind csv --dir /tmp/out --name customers --deep
//! ```

use clap::Parser;
use std::path::PathBuf;

pub mod commands;
pub mod config;

pub use datagen_core as core;
pub use datagen_engine as engine;
pub use datagen_generator as generator;
pub use datagen_sinks as sinks;

/// Where the model comes from and which dictionaries back it.
#[derive(Parser, Clone, Debug)]
pub struct ModelOpts {
    /// Model file (YAML, or JSON with a `.json` extension)
    #[arg(long, short = 'm', value_name = "PATH")]
    pub model: PathBuf,

    /// Directory with dictionary CSV files (default: embedded dictionaries)
    #[arg(long, value_name = "DIR", env = "DATAGEN_DICTIONARIES_DIR")]
    pub dictionaries_dir: Option<PathBuf>,
}
