//! Commands: a generation request plus its run state.

use crate::error::EngineError;
use chrono::{DateTime, Utc};
use datagen_core::ModelDefinition;
use datagen_generator::{Dictionaries, Model};
use datagen_sinks::{SinkKind, SinkSpec};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use uuid::Uuid;

/// Identifier of a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommandId(Uuid);

impl CommandId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for CommandId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for CommandId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Lifecycle of a command.
///
/// `Queued -> Running -> Finished | Failed`. Scheduled commands go back to
/// `Queued` once their delay has elapsed after `Finished`. `Removed` is
/// terminal and only reached by removing a scheduled command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommandStatus {
    Queued,
    Running,
    Finished,
    Failed,
    Removed,
}

impl CommandStatus {
    /// A run is over: nothing is executing for this command right now.
    pub fn is_settled(&self) -> bool {
        matches!(
            self,
            CommandStatus::Finished | CommandStatus::Failed | CommandStatus::Removed
        )
    }
}

impl fmt::Display for CommandStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CommandStatus::Queued => "QUEUED",
            CommandStatus::Running => "RUNNING",
            CommandStatus::Finished => "FINISHED",
            CommandStatus::Failed => "FAILED",
            CommandStatus::Removed => "REMOVED",
        };
        f.write_str(s)
    }
}

/// A request to generate data. Missing sizes come from the runner
/// defaults; an empty sink list means JSON lines files.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub model: ModelDefinition,
    pub sinks: Vec<SinkSpec>,
    pub threads: Option<usize>,
    pub batches: Option<u64>,
    pub rows_per_batch: Option<usize>,
    /// Repeat the command this long after each finished run.
    pub delay: Option<Duration>,
    pub owner: Option<String>,
    pub seed: Option<u64>,
    /// Extra properties merged into every sink's properties.
    pub properties: BTreeMap<String, String>,
    /// Merged into sink properties at run time, never kept in snapshots.
    pub credentials: BTreeMap<String, String>,
}

impl GenerationRequest {
    pub fn new(model: ModelDefinition) -> Self {
        Self {
            model,
            sinks: Vec::new(),
            threads: None,
            batches: None,
            rows_per_batch: None,
            delay: None,
            owner: None,
            seed: None,
            properties: BTreeMap::new(),
            credentials: BTreeMap::new(),
        }
    }
}

/// Mutable part of a command, guarded by one lock.
#[derive(Debug, Clone)]
pub(crate) struct CommandState {
    pub status: CommandStatus,
    pub progress: f64,
    pub last_started: Option<DateTime<Utc>>,
    pub last_finished: Option<DateTime<Utc>>,
    pub duration_ms: Option<u64>,
    pub error: Option<String>,
    pub cycles: u64,
    pub send_errors: u64,
}

/// A submitted command.
#[derive(Debug)]
pub struct Command {
    id: CommandId,
    definition: ModelDefinition,
    model: Arc<Model>,
    sinks: Vec<SinkSpec>,
    credentials: BTreeMap<String, String>,
    threads: usize,
    batches: u64,
    rows_per_batch: usize,
    delay: Option<Duration>,
    owner: Option<String>,
    seed: Option<u64>,
    created_at: DateTime<Utc>,
    state: Mutex<CommandState>,
    rows_produced: AtomicU64,
    cancelled: AtomicBool,
}

/// Sizes used when a request leaves them out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestDefaults {
    pub threads: usize,
    pub batches: u64,
    pub rows_per_batch: usize,
}

impl Default for RequestDefaults {
    fn default() -> Self {
        Self {
            threads: 1,
            batches: 1,
            rows_per_batch: 100,
        }
    }
}

impl Command {
    /// Validate a request and build its model.
    pub fn from_request(
        request: GenerationRequest,
        defaults: &RequestDefaults,
        dictionaries: &Dictionaries,
    ) -> Result<Self, EngineError> {
        let threads = request.threads.unwrap_or(defaults.threads);
        if threads == 0 {
            return Err(EngineError::InvalidRequest(
                "threads must be at least 1".to_string(),
            ));
        }
        if request.delay.is_some_and(|d| d.is_zero()) {
            return Err(EngineError::InvalidRequest(
                "delay between runs must be positive".to_string(),
            ));
        }

        let model = Model::from_definition(&request.model, dictionaries)?;

        let mut sinks = if request.sinks.is_empty() {
            vec![SinkSpec::new(SinkKind::Json)]
        } else {
            request.sinks
        };
        for sink in &mut sinks {
            for (key, value) in &request.properties {
                sink.properties
                    .entry(key.clone())
                    .or_insert_with(|| value.clone());
            }
        }

        Ok(Self {
            id: CommandId::new(),
            definition: request.model,
            model: Arc::new(model),
            sinks,
            credentials: request.credentials,
            threads,
            batches: request.batches.unwrap_or(defaults.batches),
            rows_per_batch: request.rows_per_batch.unwrap_or(defaults.rows_per_batch),
            delay: request.delay,
            owner: request.owner,
            seed: request.seed,
            created_at: Utc::now(),
            state: Mutex::new(CommandState {
                status: CommandStatus::Queued,
                progress: 0.0,
                last_started: None,
                last_finished: None,
                duration_ms: None,
                error: None,
                cycles: 0,
                send_errors: 0,
            }),
            rows_produced: AtomicU64::new(0),
            cancelled: AtomicBool::new(false),
        })
    }

    /// Rebuild a command saved by the store.
    pub(crate) fn restore(
        snapshot: CommandSnapshot,
        definition: ModelDefinition,
        dictionaries: &Dictionaries,
    ) -> Result<Self, EngineError> {
        let model = Model::from_definition(&definition, dictionaries)?;
        Ok(Self {
            id: snapshot.id,
            definition,
            model: Arc::new(model),
            sinks: snapshot.sinks,
            credentials: BTreeMap::new(),
            threads: snapshot.threads.max(1),
            batches: snapshot.batches,
            rows_per_batch: snapshot.rows_per_batch,
            delay: snapshot.delay_ms.map(Duration::from_millis),
            owner: snapshot.owner,
            seed: snapshot.seed,
            created_at: snapshot.created_at,
            state: Mutex::new(CommandState {
                status: snapshot.status,
                progress: snapshot.progress,
                last_started: snapshot.last_started,
                last_finished: snapshot.last_finished,
                duration_ms: snapshot.duration_ms,
                error: snapshot.error,
                cycles: snapshot.cycles,
                send_errors: snapshot.send_errors,
            }),
            rows_produced: AtomicU64::new(0),
            cancelled: AtomicBool::new(false),
        })
    }

    pub fn id(&self) -> CommandId {
        self.id
    }

    pub fn definition(&self) -> &ModelDefinition {
        &self.definition
    }

    pub fn model(&self) -> &Arc<Model> {
        &self.model
    }

    pub fn sinks(&self) -> &[SinkSpec] {
        &self.sinks
    }

    /// Sink specs with credentials merged in, for the sink factory only.
    pub(crate) fn sinks_with_credentials(&self) -> Vec<SinkSpec> {
        self.sinks
            .iter()
            .map(|spec| {
                let mut spec = spec.clone();
                for (key, value) in &self.credentials {
                    spec.properties.insert(key.clone(), value.clone());
                }
                spec
            })
            .collect()
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    pub fn batches(&self) -> u64 {
        self.batches
    }

    pub fn rows_per_batch(&self) -> usize {
        self.rows_per_batch
    }

    pub fn total_rows(&self) -> u64 {
        self.batches.saturating_mul(self.rows_per_batch as u64)
    }

    pub fn delay(&self) -> Option<Duration> {
        self.delay
    }

    pub fn is_scheduled(&self) -> bool {
        self.delay.is_some()
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub(crate) fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, CommandState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn status(&self) -> CommandStatus {
        self.lock().status
    }

    pub(crate) fn set_status(&self, status: CommandStatus) {
        self.lock().status = status;
    }

    /// `Finished -> Queued` for a scheduled command that was not removed.
    /// Returns whether the command was re-armed.
    pub(crate) fn try_rearm(&self) -> bool {
        let mut state = self.lock();
        if state.status != CommandStatus::Finished || self.is_cancelled() {
            return false;
        }
        state.status = CommandStatus::Queued;
        true
    }

    /// Cancel the command. One that is not running becomes `Removed` at
    /// once; a running one is settled by its executor.
    pub(crate) fn remove(&self) {
        let mut state = self.lock();
        self.cancel();
        if state.status != CommandStatus::Running {
            state.status = CommandStatus::Removed;
        }
    }

    /// Reset counters and move to `Running`.
    pub(crate) fn start_run(&self) {
        self.rows_produced.store(0, Ordering::SeqCst);
        let mut state = self.lock();
        state.status = CommandStatus::Running;
        state.progress = 0.0;
        state.error = None;
        state.send_errors = 0;
        state.last_started = Some(Utc::now());
    }

    /// Count rows of a finished batch and refresh progress.
    pub(crate) fn record_batch(&self, rows: usize, send_errors: u64) {
        let produced = self.rows_produced.fetch_add(rows as u64, Ordering::SeqCst) + rows as u64;
        let mut state = self.lock();
        state.progress = progress_percent(produced, self.total_rows());
        state.send_errors += send_errors;
    }

    pub fn rows_produced(&self) -> u64 {
        self.rows_produced.load(Ordering::SeqCst)
    }

    /// Close a run with its final status. A command removed while it ran
    /// settles `Removed` unless the run failed.
    pub(crate) fn finish_run(
        &self,
        status: CommandStatus,
        error: Option<String>,
        duration: Duration,
    ) -> CommandStatus {
        let mut state = self.lock();
        state.status = if self.is_cancelled() && status != CommandStatus::Failed {
            CommandStatus::Removed
        } else {
            status
        };
        state.error = error;
        state.duration_ms = Some(duration.as_millis() as u64);
        state.last_finished = Some(Utc::now());
        state.cycles += 1;
        state.status
    }

    /// Consistent copy of the command, taken under its lock. A cancelled
    /// command that is no longer running reports `Removed`.
    pub fn snapshot(&self) -> CommandSnapshot {
        let (state, cancelled) = {
            let state = self.lock();
            (state.clone(), self.is_cancelled())
        };
        let status = match state.status {
            CommandStatus::Queued | CommandStatus::Finished if cancelled => {
                CommandStatus::Removed
            }
            status => status,
        };
        CommandSnapshot {
            id: self.id,
            model_name: self.definition.model_name.clone(),
            status,
            progress: state.progress,
            threads: self.threads,
            batches: self.batches,
            rows_per_batch: self.rows_per_batch,
            delay_ms: self.delay.map(|d| d.as_millis() as u64),
            owner: self.owner.clone(),
            seed: self.seed,
            sinks: self.sinks.clone(),
            created_at: self.created_at,
            last_started: state.last_started,
            last_finished: state.last_finished,
            duration_ms: state.duration_ms,
            error: state.error,
            cycles: state.cycles,
            send_errors: state.send_errors,
        }
    }
}

fn progress_percent(produced: u64, total: u64) -> f64 {
    if total == 0 {
        100.0
    } else {
        (produced as f64 / total as f64 * 100.0).min(100.0)
    }
}

/// Read-only view of a command, as returned by status queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandSnapshot {
    pub id: CommandId,
    pub model_name: String,
    pub status: CommandStatus,
    pub progress: f64,
    pub threads: usize,
    pub batches: u64,
    pub rows_per_batch: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    pub sinks: Vec<SinkSpec>,
    pub created_at: DateTime<Utc>,
    pub last_started: Option<DateTime<Utc>>,
    pub last_finished: Option<DateTime<Utc>>,
    pub duration_ms: Option<u64>,
    pub error: Option<String>,
    pub cycles: u64,
    #[serde(default)]
    pub send_errors: u64,
}

impl CommandSnapshot {
    pub fn is_scheduled(&self) -> bool {
        self.delay_ms.is_some()
    }
}
