//! `datagen validate`: build a model and report its shape.

use super::{load_dictionaries, load_model};
use crate::config::DatagenConfig;
use crate::ModelOpts;
use clap::Args;
use datagen_generator::Model;
use std::fmt::Write as _;

#[derive(Args, Clone, Debug)]
pub struct ValidateArgs {
    #[command(flatten)]
    pub model: ModelOpts,
}

/// Validate the model and return a human-readable report.
pub fn run_validate(args: &ValidateArgs, config: &DatagenConfig) -> anyhow::Result<String> {
    let definition = load_model(&args.model)?;
    let dictionaries = load_dictionaries(&args.model, config);
    let model = Model::from_definition(&definition, &dictionaries)
        .map_err(|e| anyhow::anyhow!("Model {:?} is invalid: {e}", args.model.model))?;

    let computed = model.computed_order();
    let ghosts = model.fields().iter().filter(|f| f.is_ghost()).count();

    let mut report = String::new();
    writeln!(
        report,
        "Model '{}' is valid: {} fields ({} computed, {} ghost)",
        model.name(),
        model.fields().len(),
        computed.len(),
        ghosts
    )?;
    for field in model.fields() {
        let mut flags = Vec::new();
        if field.is_computed() {
            flags.push("computed");
        }
        if field.is_ghost() {
            flags.push("ghost");
        }
        if flags.is_empty() {
            writeln!(report, "  {}: {}", field.name(), field.kind().as_str())?;
        } else {
            writeln!(
                report,
                "  {}: {} [{}]",
                field.name(),
                field.kind().as_str(),
                flags.join(", ")
            )?;
        }
    }
    if !computed.is_empty() {
        writeln!(report, "Computed order: {}", computed.join(" -> "))?;
    }
    tracing::debug!("Validated model '{}'", model.name());
    Ok(report)
}
