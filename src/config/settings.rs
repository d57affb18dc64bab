//! The `datagen.toml` configuration file.

use super::duration::parse_duration;
use anyhow::Context;
use datagen_engine::{RequestDefaults, RunnerConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Settings read from the configuration file. Every key is optional.
///
/// ```toml
/// threads = 4
/// batches = 10
/// rows_per_batch = 1000
/// output_dir = "/tmp/datagen"
/// dictionaries_dir = "/etc/datagen/dictionaries"
/// scheduler_file = "/var/lib/datagen/commands.json"
/// scheduler_tick = "1s"
/// runner_threads = 2
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatagenConfig {
    pub threads: usize,
    pub batches: u64,
    pub rows_per_batch: usize,
    pub output_dir: PathBuf,
    /// Directory holding `cities.csv`, `names.csv`, ... Embedded
    /// dictionaries are used when unset.
    pub dictionaries_dir: Option<PathBuf>,
    /// Where scheduled commands are persisted.
    pub scheduler_file: Option<PathBuf>,
    pub scheduler_tick: String,
    pub runner_threads: usize,
}

impl Default for DatagenConfig {
    fn default() -> Self {
        let defaults = RequestDefaults::default();
        Self {
            threads: defaults.threads,
            batches: defaults.batches,
            rows_per_batch: defaults.rows_per_batch,
            output_dir: PathBuf::from("datagen-output"),
            dictionaries_dir: None,
            scheduler_file: None,
            scheduler_tick: "1s".to_string(),
            runner_threads: 1,
        }
    }
}

impl DatagenConfig {
    /// Load the configuration file, or the defaults when no path is given.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path:?}"))?;
        let config = Self::from_toml(&content)
            .with_context(|| format!("Failed to parse config file: {path:?}"))?;
        tracing::debug!("Loaded configuration from {path:?}");
        Ok(config)
    }

    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.threads == 0 {
            anyhow::bail!("threads must be at least 1");
        }
        if self.runner_threads == 0 {
            anyhow::bail!("runner_threads must be at least 1");
        }
        let tick = parse_duration(&self.scheduler_tick).context("Invalid scheduler_tick")?;
        if tick.is_zero() {
            anyhow::bail!("scheduler_tick must be greater than zero");
        }
        Ok(())
    }

    pub fn request_defaults(&self) -> RequestDefaults {
        RequestDefaults {
            threads: self.threads,
            batches: self.batches,
            rows_per_batch: self.rows_per_batch,
        }
    }

    pub fn runner_config(&self) -> anyhow::Result<RunnerConfig> {
        Ok(RunnerConfig {
            runner_threads: self.runner_threads,
            scheduler_tick: parse_duration(&self.scheduler_tick)
                .context("Invalid scheduler_tick")?,
            defaults: self.request_defaults(),
            store_path: self.scheduler_file.clone(),
        })
    }
}
