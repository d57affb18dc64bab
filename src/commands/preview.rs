//! `datagen preview`: print a few rows as JSON.

use super::{load_dictionaries, load_model};
use crate::config::DatagenConfig;
use crate::ModelOpts;
use anyhow::Context;
use clap::Args;
use datagen_generator::{Model, RowGenerator};
use std::io::Write;
use std::sync::Arc;

#[derive(Args, Clone, Debug)]
pub struct PreviewArgs {
    #[command(flatten)]
    pub model: ModelOpts,

    /// Number of rows to print
    #[arg(long, short = 'n', default_value = "10")]
    pub count: u64,

    /// Seed for reproducible output
    #[arg(long)]
    pub seed: Option<u64>,

    /// Pretty-print each row
    #[arg(long)]
    pub pretty: bool,
}

/// Write `count` rows to `out`, one JSON object per line unless pretty.
pub fn run_preview<W: Write>(
    args: &PreviewArgs,
    config: &DatagenConfig,
    out: &mut W,
) -> anyhow::Result<u64> {
    let definition = load_model(&args.model)?;
    let dictionaries = load_dictionaries(&args.model, config);
    let model = Model::from_definition(&definition, &dictionaries)
        .with_context(|| format!("Invalid model {:?}", args.model.model))?;
    let generator = RowGenerator::new(Arc::new(model), args.seed);

    let mut written = 0;
    for row in generator.rows(args.count) {
        let json = row.to_json();
        if args.pretty {
            serde_json::to_writer_pretty(&mut *out, &json)?;
        } else {
            serde_json::to_writer(&mut *out, &json)?;
        }
        writeln!(out)?;
        written += 1;
    }
    out.flush()?;
    Ok(written)
}
