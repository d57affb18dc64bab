//! File-backed store of scheduled commands.

use crate::command::{Command, CommandSnapshot, CommandStatus};
use crate::error::EngineError;
use datagen_core::ModelDefinition;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// One saved command: its model plus the snapshot of its parameters and
/// last run. Credentials are never part of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredCommand {
    pub model: ModelDefinition,
    #[serde(flatten)]
    pub command: CommandSnapshot,
}

/// JSON file holding every scheduled command. Saves are serialized so
/// concurrent writers never share the temporary file.
#[derive(Debug)]
pub struct CommandStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl CommandStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Save the scheduled commands among `commands`, replacing the file
    /// atomically. Removed commands are dropped.
    pub fn save(&self, commands: &[Arc<Command>]) -> Result<usize, EngineError> {
        let _guard = self.write_lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let stored: Vec<StoredCommand> = commands
            .iter()
            .filter(|c| c.is_scheduled() && !c.is_cancelled())
            .map(|c| StoredCommand {
                model: c.definition().clone(),
                command: c.snapshot(),
            })
            .filter(|s| s.command.status != CommandStatus::Removed)
            .collect();

        let json = serde_json::to_vec_pretty(&stored).map_err(|source| EngineError::StoreFormat {
            path: self.path.clone(),
            source,
        })?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| self.io_error(source))?;
        }
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, json).map_err(|source| self.io_error(source))?;
        fs::rename(&tmp, &self.path).map_err(|source| self.io_error(source))?;

        debug!("Saved {} scheduled commands to {}", stored.len(), self.path.display());
        Ok(stored.len())
    }

    /// Load saved commands. A missing file is an empty store. Failed
    /// commands are dropped; commands caught mid-run come back `Finished`
    /// so the scheduler re-arms them.
    pub fn load(&self) -> Result<Vec<StoredCommand>, EngineError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(self.io_error(source)),
        };
        let stored: Vec<StoredCommand> =
            serde_json::from_slice(&bytes).map_err(|source| EngineError::StoreFormat {
                path: self.path.clone(),
                source,
            })?;

        let total = stored.len();
        let kept: Vec<StoredCommand> = stored
            .into_iter()
            .filter(|s| s.command.status != CommandStatus::Failed)
            .map(|mut s| {
                if matches!(s.command.status, CommandStatus::Running | CommandStatus::Queued) {
                    s.command.status = CommandStatus::Finished;
                    s.command.progress = 0.0;
                }
                s
            })
            .collect();
        info!(
            "Loaded {} scheduled commands from {} ({} failed dropped)",
            kept.len(),
            self.path.display(),
            total - kept.len()
        );
        Ok(kept)
    }

    fn io_error(&self, source: std::io::Error) -> EngineError {
        EngineError::Store {
            path: self.path.clone(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{GenerationRequest, RequestDefaults};
    use datagen_generator::Dictionaries;
    use datagen_sinks::{SinkKind, SinkSpec};
    use std::time::Duration;
    use tempfile::TempDir;

    fn command(delay: Option<Duration>, status: CommandStatus) -> Arc<Command> {
        let model = ModelDefinition::from_yaml(
            "model_name: users\nfields:\n  - name: name\n    type: string_az\n    length: 8\n",
        )
        .unwrap();
        let mut request = GenerationRequest::new(model);
        request.delay = delay;
        request.sinks = vec![SinkSpec::new(SinkKind::Csv)];
        request.credentials.insert("token".into(), "hunter2".into());
        let command =
            Command::from_request(request, &RequestDefaults::default(), &Dictionaries::embedded())
                .unwrap();
        command.set_status(status);
        Arc::new(command)
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = CommandStore::new(dir.path().join("none.json"));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = CommandStore::new(dir.path().join("state/commands.json"));
        let minute = Some(Duration::from_secs(60));
        let finished = command(minute, CommandStatus::Finished);
        let running = command(minute, CommandStatus::Running);
        let failed = command(minute, CommandStatus::Failed);
        let removed = command(minute, CommandStatus::Removed);
        let one_shot = command(None, CommandStatus::Finished);

        let saved = store
            .save(&[
                Arc::clone(&finished),
                Arc::clone(&running),
                failed,
                removed,
                one_shot,
            ])
            .unwrap();
        assert_eq!(saved, 3);
        assert!(!store.path().with_extension("tmp").exists());

        let raw = fs::read_to_string(store.path()).unwrap();
        assert!(!raw.contains("hunter2"));

        let loaded = store.load().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].command.id, finished.id());
        assert_eq!(loaded[1].command.id, running.id());
        assert!(loaded.iter().all(|s| s.command.status == CommandStatus::Finished));
        assert_eq!(loaded[0].model, *finished.definition());
        assert_eq!(loaded[0].command.delay_ms, Some(60_000));
    }

    #[test]
    fn test_concurrent_saves() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(CommandStore::new(dir.path().join("commands.json")));
        let commands: Vec<Arc<Command>> = (0..3)
            .map(|_| command(Some(Duration::from_secs(60)), CommandStatus::Finished))
            .collect();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let store = Arc::clone(&store);
                let commands = commands.clone();
                std::thread::spawn(move || {
                    (0..50)
                        .map(|_| store.save(&commands))
                        .filter(Result::is_err)
                        .count()
                })
            })
            .collect();
        let errors: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();

        assert_eq!(errors, 0);
        assert_eq!(store.load().unwrap().len(), 3);
        assert!(!store.path().with_extension("tmp").exists());
    }

    #[test]
    fn test_cancelled_command_not_saved() {
        let dir = TempDir::new().unwrap();
        let store = CommandStore::new(dir.path().join("commands.json"));
        let kept = command(Some(Duration::from_secs(60)), CommandStatus::Finished);
        let removed = command(Some(Duration::from_secs(60)), CommandStatus::Running);
        removed.remove();

        assert_eq!(store.save(&[Arc::clone(&kept), removed]).unwrap(), 1);
        let loaded = store.load().unwrap();
        assert_eq!(loaded[0].command.id, kept.id());
    }

    #[test]
    fn test_corrupt_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("commands.json");
        fs::write(&path, "not json").unwrap();
        assert!(matches!(
            CommandStore::new(path).load(),
            Err(EngineError::StoreFormat { .. })
        ));
    }
}
