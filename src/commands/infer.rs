//! `datagen infer`: propose a model from files a sink already wrote.

use anyhow::Context;
use clap::Args;
use datagen_core::ModelDefinition;
use datagen_sinks::{properties, DefaultSinkFactory, Sink, SinkFactory, SinkKind, SinkSpec};
use std::path::PathBuf;

#[derive(Args, Clone, Debug)]
pub struct InferArgs {
    /// Format of the existing files
    #[arg(long, value_enum, default_value = "csv")]
    pub kind: SinkKind,

    /// Directory holding the files
    #[arg(long, value_name = "DIR")]
    pub dir: PathBuf,

    /// Base file name, without sequence number or extension
    #[arg(long)]
    pub name: String,

    /// Scan every record and propose enumerated values
    #[arg(long)]
    pub deep: bool,

    /// CSV files have no header line
    #[arg(long)]
    pub no_header: bool,

    /// Write the model here (JSON with a `.json` extension, else YAML)
    #[arg(long, short = 'o', value_name = "PATH")]
    pub output: Option<PathBuf>,
}

/// Infer a model and render it as YAML or JSON.
pub fn run_infer(args: &InferArgs) -> anyhow::Result<String> {
    let mut spec = SinkSpec::new(args.kind).with_property(properties::FILE_NAME, &args.name);
    if args.no_header {
        spec = spec.with_property(properties::CSV_HEADER, "false");
    }
    let factory = DefaultSinkFactory::new(&args.dir);
    let sink = factory.create(&spec, &ModelDefinition::new(&args.name, Vec::new()))?;

    let mut model = sink
        .infer_model(args.deep)
        .with_context(|| format!("Failed to infer a model from {:?}", args.dir))?;
    model.model_name = args.name.clone();
    tracing::info!(
        "Inferred {} fields for '{}' ({} scan)",
        model.fields.len(),
        model.model_name,
        if args.deep { "deep" } else { "shallow" }
    );

    let as_json = args
        .output
        .as_ref()
        .and_then(|p| p.extension())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));
    let rendered = if as_json {
        model.to_json()?
    } else {
        model.to_yaml()?
    };

    if let Some(path) = &args.output {
        std::fs::write(path, &rendered)
            .with_context(|| format!("Failed to write model to {path:?}"))?;
    }
    Ok(rendered)
}
