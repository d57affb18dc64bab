//! The command runner service: dispatch queue, executor threads and the
//! scheduler.

use crate::command::{
    Command, CommandId, CommandSnapshot, CommandStatus, GenerationRequest, RequestDefaults,
};
use crate::error::EngineError;
use crate::executor::{execute, time_until_due};
use crate::registry::CommandRegistry;
use crate::store::CommandStore;
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use datagen_generator::Dictionaries;
use datagen_sinks::SinkFactory;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Runner settings.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Commands executed at the same time.
    pub runner_threads: usize,
    /// How often the scheduler looks for due commands.
    pub scheduler_tick: Duration,
    pub defaults: RequestDefaults,
    /// Where scheduled commands are persisted. `None` keeps them in memory.
    pub store_path: Option<PathBuf>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            runner_threads: 1,
            scheduler_tick: Duration::from_secs(1),
            defaults: RequestDefaults::default(),
            store_path: None,
        }
    }
}

/// State shared by the runner handle and its threads.
struct Shared {
    registry: Arc<CommandRegistry>,
    factory: Arc<dyn SinkFactory>,
    store: Option<CommandStore>,
    /// Held from listing the registry until the file is replaced, so an
    /// older listing never overwrites a newer one.
    persisting: Mutex<()>,
    stopping: AtomicBool,
}

impl Shared {
    fn persist(&self) -> Result<(), EngineError> {
        let Some(store) = &self.store else {
            return Ok(());
        };
        let _guard = self.persisting.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        store.save(&self.registry.commands()).map(|_| ())
    }

    fn persist_logged(&self) {
        if let Err(e) = self.persist() {
            error!("Failed to persist scheduled commands: {e}");
        }
    }
}

/// Accepts generation requests and runs them on a fixed set of threads.
///
/// ```no_run
/// use datagen_core::ModelDefinition;
/// use datagen_engine::{CommandRunner, GenerationRequest, RunnerConfig};
/// use datagen_generator::Dictionaries;
/// use datagen_sinks::DefaultSinkFactory;
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// let runner = CommandRunner::start(
///     RunnerConfig::default(),
///     Arc::new(DefaultSinkFactory::new("/tmp/datagen")),
///     Arc::new(Dictionaries::embedded()),
/// )?;
/// let model = ModelDefinition::from_file("model.yaml")?;
/// let id = runner.submit(GenerationRequest::new(model))?;
/// let done = runner.wait_for(id, Duration::from_secs(60))?;
/// println!("{}: {}", done.id, done.status);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct CommandRunner {
    shared: Arc<Shared>,
    dictionaries: Arc<Dictionaries>,
    defaults: RequestDefaults,
    dispatch: Mutex<Option<Sender<Arc<Command>>>>,
    threads: Mutex<Vec<JoinHandle<()>>>,
}

impl CommandRunner {
    /// Start the runner threads and the scheduler. Commands saved in the
    /// store are restored first.
    pub fn start(
        config: RunnerConfig,
        factory: Arc<dyn SinkFactory>,
        dictionaries: Arc<Dictionaries>,
    ) -> Result<Self, EngineError> {
        if config.runner_threads == 0 {
            return Err(EngineError::InvalidRequest(
                "runner_threads must be at least 1".to_string(),
            ));
        }

        let registry = Arc::new(CommandRegistry::new());
        let store = config.store_path.map(CommandStore::new);
        if let Some(store) = &store {
            for stored in store.load()? {
                let id = stored.command.id;
                match Command::restore(stored.command, stored.model, &dictionaries) {
                    Ok(command) => registry.insert(Arc::new(command)),
                    Err(e) => warn!("Dropping stored command {id}: {e}"),
                }
            }
        }

        let shared = Arc::new(Shared {
            registry,
            factory,
            store,
            persisting: Mutex::new(()),
            stopping: AtomicBool::new(false),
        });
        let (tx, rx) = unbounded::<Arc<Command>>();
        let tick = config.scheduler_tick;

        let mut threads = Vec::with_capacity(config.runner_threads + 1);
        for i in 0..config.runner_threads {
            let shared = Arc::clone(&shared);
            let rx = rx.clone();
            let handle = thread::Builder::new()
                .name(format!("datagen-runner-{i}"))
                .spawn(move || run_commands(&shared, &rx, tick))
                .map_err(EngineError::Spawn)?;
            threads.push(handle);
        }
        {
            let shared = Arc::clone(&shared);
            let tx = tx.clone();
            let handle = thread::Builder::new()
                .name("datagen-scheduler".to_string())
                .spawn(move || schedule_commands(&shared, &tx, tick))
                .map_err(EngineError::Spawn)?;
            threads.push(handle);
        }

        info!(
            "Command runner started with {} runner threads, {} restored commands",
            config.runner_threads,
            shared.registry.len()
        );

        Ok(Self {
            shared,
            dictionaries,
            defaults: config.defaults,
            dispatch: Mutex::new(Some(tx)),
            threads: Mutex::new(threads),
        })
    }

    pub fn registry(&self) -> &Arc<CommandRegistry> {
        &self.shared.registry
    }

    /// Validate a request, register it and queue its first run.
    pub fn submit(&self, request: GenerationRequest) -> Result<CommandId, EngineError> {
        let dispatch = self
            .dispatch
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
            .ok_or(EngineError::ShutDown)?;

        let command = Arc::new(Command::from_request(
            request,
            &self.defaults,
            &self.dictionaries,
        )?);
        let id = command.id();
        self.shared.registry.insert(Arc::clone(&command));

        if command.is_scheduled() {
            if let Err(e) = self.shared.persist() {
                error!("Failed to persist command {id}: {e}");
                command.finish_run(CommandStatus::Failed, Some(e.to_string()), Duration::ZERO);
                return Err(e);
            }
        }

        dispatch.send(command).map_err(|_| EngineError::ShutDown)?;
        info!("Command {id} queued");
        Ok(id)
    }

    pub fn status(&self, id: &CommandId) -> Option<CommandSnapshot> {
        self.shared.registry.status(id)
    }

    pub fn list_all(&self) -> Vec<CommandSnapshot> {
        self.shared.registry.list_all()
    }

    pub fn list_by_status(&self, status: CommandStatus) -> Vec<CommandSnapshot> {
        self.shared.registry.list_by_status(status)
    }

    pub fn list_scheduled(&self) -> Vec<CommandSnapshot> {
        self.shared.registry.list_scheduled()
    }

    /// Stop a scheduled command from running again. A run in progress
    /// takes no new batch and ends `Removed`.
    pub fn remove_scheduled(&self, id: &CommandId) -> Result<CommandSnapshot, EngineError> {
        let command = self
            .shared
            .registry
            .get(id)
            .ok_or(EngineError::NotFound(*id))?;
        if !command.is_scheduled() {
            return Err(EngineError::NotScheduled(*id));
        }
        command.remove();
        self.shared.persist_logged();
        info!("Scheduled command {id} removed");
        Ok(command.snapshot())
    }

    /// Block until the command is `Finished`, `Failed` or `Removed`.
    pub fn wait_for(&self, id: CommandId, timeout: Duration) -> Result<CommandSnapshot, EngineError> {
        let deadline = Instant::now() + timeout;
        loop {
            let snapshot = self.status(&id).ok_or(EngineError::NotFound(id))?;
            if snapshot.status.is_settled() {
                return Ok(snapshot);
            }
            if Instant::now() >= deadline {
                return Err(EngineError::Timeout(id));
            }
            thread::sleep(WAIT_POLL_INTERVAL);
        }
    }

    /// Stop every thread. Queued runs are abandoned; runs in progress
    /// complete first.
    pub fn shutdown(&self) {
        self.shared.stopping.store(true, Ordering::SeqCst);
        self.dispatch
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();

        let handles: Vec<JoinHandle<()>> = self
            .threads
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .drain(..)
            .collect();
        if handles.is_empty() {
            return;
        }
        for handle in handles {
            if handle.join().is_err() {
                error!("A runner thread panicked");
            }
        }
        info!("Command runner stopped");
    }
}

impl Drop for CommandRunner {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_commands(shared: &Shared, rx: &Receiver<Arc<Command>>, tick: Duration) {
    while !shared.stopping.load(Ordering::SeqCst) {
        let command = match rx.recv_timeout(tick) {
            Ok(command) => command,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        };
        if command.is_cancelled() {
            debug!("Skipping removed command {}", command.id());
            command.set_status(CommandStatus::Removed);
            continue;
        }

        execute(&command, shared.factory.as_ref());
        if command.is_scheduled() {
            shared.persist_logged();
        }
    }
}

/// Re-arm finished scheduled commands once their delay has elapsed.
fn schedule_commands(shared: &Shared, tx: &Sender<Arc<Command>>, tick: Duration) {
    while !shared.stopping.load(Ordering::SeqCst) {
        for command in shared.registry.commands() {
            if !command.is_scheduled() || command.is_cancelled() {
                continue;
            }
            if command.status() != CommandStatus::Finished || time_until_due(&command).is_some() {
                continue;
            }
            if command.try_rearm() {
                debug!("Re-arming scheduled command {}", command.id());
                if tx.send(Arc::clone(&command)).is_err() {
                    return;
                }
            }
        }
        thread::sleep(tick);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::tests::{counter_model, SharedSinkFactory};
    use datagen_sinks::{MemorySink, Sink, SinkKind, SinkSpec};
    use tempfile::TempDir;

    fn config(store_path: Option<PathBuf>) -> RunnerConfig {
        RunnerConfig {
            runner_threads: 2,
            scheduler_tick: Duration::from_millis(10),
            defaults: RequestDefaults::default(),
            store_path,
        }
    }

    fn start(memory: &Arc<MemorySink>, store_path: Option<PathBuf>) -> CommandRunner {
        let factory = SharedSinkFactory::new(vec![Arc::clone(memory) as Arc<dyn Sink>]);
        CommandRunner::start(
            config(store_path),
            Arc::new(factory),
            Arc::new(Dictionaries::embedded()),
        )
        .unwrap()
    }

    fn request(delay: Option<Duration>) -> GenerationRequest {
        let mut request = GenerationRequest::new(counter_model());
        request.sinks = vec![SinkSpec::new(SinkKind::Memory)];
        request.threads = Some(2);
        request.batches = Some(4);
        request.rows_per_batch = Some(10);
        request.delay = delay;
        request
    }

    fn wait_until(timeout: Duration, mut done: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if done() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        done()
    }

    #[test]
    fn test_one_shot_command() {
        let memory = Arc::new(MemorySink::new());
        let runner = start(&memory, None);

        let id = runner.submit(request(None)).unwrap();
        let snapshot = runner.wait_for(id, Duration::from_secs(10)).unwrap();

        assert_eq!(snapshot.status, CommandStatus::Finished);
        assert_eq!(snapshot.progress, 100.0);
        assert_eq!(memory.row_count(), 40);
        assert_eq!(runner.list_by_status(CommandStatus::Finished).len(), 1);
        assert!(runner.list_scheduled().is_empty());
        assert!(matches!(
            runner.remove_scheduled(&id),
            Err(EngineError::NotScheduled(_))
        ));
        assert!(matches!(
            runner.remove_scheduled(&CommandId::new()),
            Err(EngineError::NotFound(_))
        ));
    }

    #[test]
    fn test_scheduled_command_repeats_until_removed() {
        let memory = Arc::new(MemorySink::new());
        let runner = start(&memory, None);

        let id = runner.submit(request(Some(Duration::from_millis(30)))).unwrap();
        assert!(wait_until(Duration::from_secs(10), || {
            runner.status(&id).is_some_and(|s| s.cycles >= 2)
        }));
        assert_eq!(runner.list_scheduled().len(), 1);

        runner.remove_scheduled(&id).unwrap();
        let removed = runner.wait_for(id, Duration::from_secs(10)).unwrap();
        let cycles = removed.cycles;
        thread::sleep(Duration::from_millis(150));

        let snapshot = runner.status(&id).unwrap();
        assert_eq!(snapshot.status, CommandStatus::Removed);
        assert_eq!(snapshot.cycles, cycles);
        assert!(runner.list_scheduled().is_empty());
    }

    #[test]
    fn test_scheduled_commands_are_restored() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("commands.json");
        let memory = Arc::new(MemorySink::new());

        let id = {
            let runner = start(&memory, Some(path.clone()));
            let id = runner.submit(request(Some(Duration::from_secs(3600)))).unwrap();
            runner.wait_for(id, Duration::from_secs(10)).unwrap();
            id
        };

        let runner = start(&memory, Some(path));
        let restored = runner.status(&id).unwrap();
        assert_eq!(restored.status, CommandStatus::Finished);
        assert_eq!(restored.cycles, 1);
        assert_eq!(runner.list_scheduled().len(), 1);
    }

    #[test]
    fn test_submit_after_shutdown() {
        let memory = Arc::new(MemorySink::new());
        let runner = start(&memory, None);
        runner.shutdown();
        assert!(matches!(
            runner.submit(request(None)),
            Err(EngineError::ShutDown)
        ));
    }

    #[test]
    fn test_invalid_request_rejected() {
        let memory = Arc::new(MemorySink::new());
        let runner = start(&memory, None);
        let mut bad = request(None);
        bad.threads = Some(0);
        assert!(matches!(
            runner.submit(bad),
            Err(EngineError::InvalidRequest(_))
        ));
        assert!(runner.list_all().is_empty());
    }
}
