//! `datagen generate`: submit one command and wait for it.

use super::{load_dictionaries, load_model};
use crate::config::{parse_duration, DatagenConfig};
use crate::ModelOpts;
use anyhow::Context;
use clap::Args;
use datagen_engine::{CommandId, CommandRunner, CommandSnapshot, CommandStatus, GenerationRequest};
use datagen_sinks::{DefaultSinkFactory, SinkKind, SinkSpec};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const STATUS_POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Args, Clone, Debug)]
pub struct GenerateArgs {
    #[command(flatten)]
    pub model: ModelOpts,

    /// Sinks to deliver to, in order (default: json)
    #[arg(long = "sink", value_enum, value_name = "KIND")]
    pub sinks: Vec<SinkKind>,

    /// Worker threads (default from config)
    #[arg(long)]
    pub threads: Option<usize>,

    /// Number of batches (default from config)
    #[arg(long)]
    pub batches: Option<u64>,

    /// Rows per batch (default from config)
    #[arg(long = "rows")]
    pub rows_per_batch: Option<usize>,

    /// Repeat every DELAY ("30s", "5m", "1h") until stopped
    #[arg(long)]
    pub delay: Option<String>,

    /// With --delay, stop after this many runs
    #[arg(long, requires = "delay")]
    pub cycles: Option<u64>,

    /// Seed for reproducible output
    #[arg(long)]
    pub seed: Option<u64>,

    /// Output directory for file sinks (default from config)
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Extra sink property, KEY=VALUE (repeatable)
    #[arg(long = "property", value_name = "KEY=VALUE")]
    pub properties: Vec<String>,

    /// Maximum time to wait for one run
    #[arg(long, default_value = "24h")]
    pub timeout: String,
}

fn parse_properties(raw: &[String]) -> anyhow::Result<BTreeMap<String, String>> {
    raw.iter()
        .map(|p| {
            let (key, value) = p
                .split_once('=')
                .with_context(|| format!("Invalid property '{p}', expected KEY=VALUE"))?;
            let key = key.trim();
            if key.is_empty() {
                anyhow::bail!("Invalid property '{p}': empty key");
            }
            Ok((key.to_string(), value.trim().to_string()))
        })
        .collect()
}

/// Run the generate command. Returns the command's final snapshot.
pub fn run_generate(args: GenerateArgs, config: &DatagenConfig) -> anyhow::Result<CommandSnapshot> {
    let definition = load_model(&args.model)?;
    let dictionaries = Arc::new(load_dictionaries(&args.model, config));
    let delay = args
        .delay
        .as_deref()
        .map(parse_duration)
        .transpose()
        .context("Invalid --delay")?;
    let timeout = parse_duration(&args.timeout).context("Invalid --timeout")?;

    let output_dir = args
        .output_dir
        .clone()
        .unwrap_or_else(|| config.output_dir.clone());
    let factory = Arc::new(DefaultSinkFactory::new(output_dir));
    let runner = CommandRunner::start(config.runner_config()?, factory, dictionaries)?;

    let mut request = GenerationRequest::new(definition);
    request.sinks = args.sinks.iter().map(|k| SinkSpec::new(*k)).collect();
    request.threads = args.threads;
    request.batches = args.batches;
    request.rows_per_batch = args.rows_per_batch;
    request.delay = delay;
    request.seed = args.seed;
    request.properties = parse_properties(&args.properties)?;

    let id = runner.submit(request).context("Failed to submit command")?;
    tracing::info!("Submitted command {id}");

    let snapshot = match delay {
        None => runner.wait_for(id, timeout)?,
        Some(_) => {
            let snapshot = wait_for_cycles(&runner, id, args.cycles, timeout)?;
            runner.remove_scheduled(&id)?;
            snapshot
        }
    };
    runner.shutdown();

    if snapshot.status == CommandStatus::Failed {
        anyhow::bail!(
            "Command {} failed: {}",
            snapshot.id,
            snapshot.error.as_deref().unwrap_or("unknown error")
        );
    }
    tracing::info!(
        "Command {} {}: {} cycle(s), last run {} ms",
        snapshot.id,
        snapshot.status,
        snapshot.cycles,
        snapshot.duration_ms.unwrap_or_default()
    );
    Ok(snapshot)
}

/// Follow a scheduled command, logging each finished cycle. Without a
/// cycle limit this only returns on failure.
fn wait_for_cycles(
    runner: &CommandRunner,
    id: CommandId,
    cycles: Option<u64>,
    timeout: Duration,
) -> anyhow::Result<CommandSnapshot> {
    let mut seen = 0;
    let mut cycle_started = Instant::now();
    loop {
        let snapshot = runner
            .status(&id)
            .with_context(|| format!("Command {id} disappeared"))?;
        if snapshot.status == CommandStatus::Failed {
            return Ok(snapshot);
        }
        if snapshot.cycles > seen {
            seen = snapshot.cycles;
            cycle_started = Instant::now();
            tracing::info!(
                "Command {id} cycle {seen} done ({:.0}% of last run)",
                snapshot.progress
            );
            if cycles.is_some_and(|limit| seen >= limit) {
                return Ok(snapshot);
            }
        }
        if snapshot.status == CommandStatus::Running && cycle_started.elapsed() > timeout {
            anyhow::bail!("Timed out waiting for command {id}");
        }
        thread::sleep(STATUS_POLL_INTERVAL);
    }
}
