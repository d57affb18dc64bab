//! Command-line interface for datagen
//!
//! # Usage Examples
//!
//! ## One-shot generation
//! ```bash
//! datagen generate --model customers.yaml --sink csv --batches 10 --rows 1000
//! ```
//!
//! ## Scheduled generation
//! ```bash
//! # Every 5 minutes, stop after 12 runs
//! datagen generate --model customers.yaml --sink json --delay 5m --cycles 12
//! ```
//!
//! ## Models
//! ```bash
//! datagen validate --model customers.yaml
//! datagen preview --model customers.yaml -n 3 --seed 42
//! datagen infer --kind json --dir /tmp/out --name customers -o customers.yaml
//! ```
//!
//! Logging follows `RUST_LOG`, else `--log-level`.

use clap::{Parser, Subcommand};
use datagen::commands::{
    run_generate, run_infer, run_preview, run_validate, GenerateArgs, InferArgs, PreviewArgs,
    ValidateArgs,
};
use datagen::config::DatagenConfig;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "datagen")]
#[command(about = "Generate synthetic data from a model and deliver it to sinks")]
#[command(long_about = None)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(long, global = true, value_name = "PATH", env = "DATAGEN_CONFIG")]
    config: Option<PathBuf>,

    /// Log level used when RUST_LOG is unset
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate data, once or on a schedule
    Generate(GenerateArgs),

    /// Print generated rows as JSON lines
    Preview(PreviewArgs),

    /// Check a model file
    Validate(ValidateArgs),

    /// Infer a model from existing CSV or JSON-lines output
    Infer(InferArgs),
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = DatagenConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Generate(args) => {
            let snapshot = run_generate(args, &config)?;
            eprintln!(
                "Command {} {} ({} cycle(s))",
                snapshot.id, snapshot.status, snapshot.cycles
            );
        }
        Commands::Preview(args) => {
            let mut out = std::io::stdout().lock();
            run_preview(&args, &config, &mut out)?;
        }
        Commands::Validate(args) => {
            print!("{}", run_validate(&args, &config)?);
        }
        Commands::Infer(args) => {
            let rendered = run_infer(&args)?;
            if args.output.is_none() {
                print!("{rendered}");
            }
        }
    }
    Ok(())
}
