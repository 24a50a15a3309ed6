//! In-memory EntityStore backend
//!
//! Suitable for tests, previews and short-lived sessions. Partitions live
//! behind a single `tokio::sync::RwLock`; a commit stages the batch on a copy
//! of the user's partition and swaps it in only when every op applied, which
//! gives all-or-nothing semantics and batch isolation for readers.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::{broadcast, RwLock};

use super::batch::{WriteBatch, WriteOp};
use super::entity_store::{EntityStore, TaskFilter};
use super::error::{StoreError, StoreResult};
use super::events::{StoreChange, STORE_CHANGE_CHANNEL_CAPACITY};
use crate::models::{Task, TaskList, UserId};

#[derive(Debug, Clone, Default)]
struct Partition {
    lists: HashMap<String, TaskList>,
    tasks: HashMap<String, Task>,
}

impl Partition {
    fn apply(&mut self, op: WriteOp) -> StoreResult<()> {
        match op {
            WriteOp::PutList(list) => {
                self.lists.insert(list.id.clone(), list);
            }
            WriteOp::PatchList { id, patch } => {
                let list = self
                    .lists
                    .get_mut(&id)
                    .ok_or_else(|| StoreError::missing_entity("lists", &id))?;
                patch.apply_to(list);
            }
            WriteOp::DeleteList { id } => {
                self.lists.remove(&id);
            }
            WriteOp::PutTask(task) => {
                self.tasks.insert(task.id.clone(), task);
            }
            WriteOp::PatchTask { id, patch } => {
                let task = self
                    .tasks
                    .get_mut(&id)
                    .ok_or_else(|| StoreError::missing_entity("tasks", &id))?;
                patch.apply_to(task);
            }
            WriteOp::DeleteTask { id } => {
                self.tasks.remove(&id);
            }
        }
        Ok(())
    }
}

/// Ephemeral [`EntityStore`] backed by hash maps
pub struct MemoryStore {
    partitions: RwLock<HashMap<UserId, Partition>>,
    change_tx: broadcast::Sender<StoreChange>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_channel_capacity(STORE_CHANGE_CHANNEL_CAPACITY)
    }

    pub fn with_channel_capacity(capacity: usize) -> Self {
        let (change_tx, _) = broadcast::channel(capacity.max(1));
        Self {
            partitions: RwLock::new(HashMap::new()),
            change_tx,
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn get_list(&self, user: &UserId, id: &str) -> StoreResult<Option<TaskList>> {
        let partitions = self.partitions.read().await;
        Ok(partitions
            .get(user)
            .and_then(|partition| partition.lists.get(id))
            .cloned())
    }

    async fn lists(&self, user: &UserId) -> StoreResult<Vec<TaskList>> {
        let partitions = self.partitions.read().await;
        Ok(partitions
            .get(user)
            .map(|partition| partition.lists.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn get_task(&self, user: &UserId, id: &str) -> StoreResult<Option<Task>> {
        let partitions = self.partitions.read().await;
        Ok(partitions
            .get(user)
            .and_then(|partition| partition.tasks.get(id))
            .cloned())
    }

    async fn query_tasks(&self, user: &UserId, filter: &TaskFilter) -> StoreResult<Vec<Task>> {
        let partitions = self.partitions.read().await;
        Ok(partitions
            .get(user)
            .map(|partition| {
                partition
                    .tasks
                    .values()
                    .filter(|task| filter.matches(task))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn tasks_with_ancestor(
        &self,
        user: &UserId,
        ancestor_id: &str,
    ) -> StoreResult<Vec<Task>> {
        let partitions = self.partitions.read().await;
        Ok(partitions
            .get(user)
            .map(|partition| {
                partition
                    .tasks
                    .values()
                    .filter(|task| task.has_ancestor(ancestor_id))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn commit(&self, user: &UserId, batch: WriteBatch) -> StoreResult<()> {
        if batch.is_empty() {
            return Ok(());
        }

        let lists = batch.touches_lists();
        let tasks = batch.touches_tasks();
        let op_count = batch.len();

        {
            let mut partitions = self.partitions.write().await;
            let mut staged = partitions.get(user).cloned().unwrap_or_default();
            for op in batch.into_ops() {
                staged.apply(op)?;
            }
            partitions.insert(user.clone(), staged);
        }

        tracing::debug!("Committed {} op(s) for user '{}'", op_count, user);

        // No subscribers is fine
        let _ = self.change_tx.send(StoreChange::new(user.clone(), lists, tasks));
        Ok(())
    }

    fn subscribe_changes(&self) -> broadcast::Receiver<StoreChange> {
        self.change_tx.subscribe()
    }
}
