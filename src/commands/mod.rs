//! Handlers behind the CLI subcommands.

mod generate;
mod infer;
mod preview;
mod validate;

pub use generate::{run_generate, GenerateArgs};
pub use infer::{run_infer, InferArgs};
pub use preview::{run_preview, PreviewArgs};
pub use validate::{run_validate, ValidateArgs};

use crate::config::DatagenConfig;
use crate::ModelOpts;
use anyhow::Context;
use datagen_core::ModelDefinition;
use datagen_generator::Dictionaries;

/// Read the model file named on the command line.
fn load_model(opts: &ModelOpts) -> anyhow::Result<ModelDefinition> {
    ModelDefinition::from_file(&opts.model)
        .with_context(|| format!("Failed to load model from {:?}", opts.model))
}

/// Dictionaries from the flag, else the config file, else embedded.
fn load_dictionaries(opts: &ModelOpts, config: &DatagenConfig) -> Dictionaries {
    Dictionaries::load(
        opts.dictionaries_dir
            .as_deref()
            .or(config.dictionaries_dir.as_deref()),
    )
}
