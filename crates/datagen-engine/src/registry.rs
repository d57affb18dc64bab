//! Shared table of every known command.

use crate::command::{Command, CommandId, CommandSnapshot, CommandStatus};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Commands by id. Cloned by `Arc` into the runner, scheduler and workers.
#[derive(Debug, Default)]
pub struct CommandRegistry {
    commands: RwLock<BTreeMap<CommandId, Arc<Command>>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<CommandId, Arc<Command>>> {
        self.commands.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<CommandId, Arc<Command>>> {
        self.commands.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn insert(&self, command: Arc<Command>) {
        self.write().insert(command.id(), command);
    }

    pub fn get(&self, id: &CommandId) -> Option<Arc<Command>> {
        self.read().get(id).cloned()
    }

    pub fn status(&self, id: &CommandId) -> Option<CommandSnapshot> {
        self.get(id).map(|c| c.snapshot())
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Commands in creation order.
    pub fn commands(&self) -> Vec<Arc<Command>> {
        let mut commands: Vec<Arc<Command>> = self.read().values().cloned().collect();
        commands.sort_by_key(|c| c.snapshot().created_at);
        commands
    }

    pub fn list_all(&self) -> Vec<CommandSnapshot> {
        self.snapshots(|_| true)
    }

    pub fn list_by_status(&self, status: CommandStatus) -> Vec<CommandSnapshot> {
        self.snapshots(|s| s.status == status)
    }

    /// Scheduled commands that have not been removed.
    pub fn list_scheduled(&self) -> Vec<CommandSnapshot> {
        self.snapshots(|s| s.is_scheduled() && s.status != CommandStatus::Removed)
    }

    fn snapshots(&self, keep: impl Fn(&CommandSnapshot) -> bool) -> Vec<CommandSnapshot> {
        let mut snapshots: Vec<CommandSnapshot> = self
            .read()
            .values()
            .map(|c| c.snapshot())
            .filter(|s| keep(s))
            .collect();
        snapshots.sort_by_key(|s| s.created_at);
        snapshots
    }
}
