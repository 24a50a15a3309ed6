//! EntityStore Trait - Storage Abstraction Layer
//!
//! This module defines the `EntityStore` trait that abstracts persistence of
//! lists and tasks. The mutation protocol and the change feed only talk to
//! this trait, so backends can be swapped without touching ordering or
//! hierarchy logic.
//!
//! # Design Decisions
//!
//! 1. **Async-First**: all reads and commits are async; backends may sit
//!    behind a network
//! 2. **Per-user partitions**: every method takes the owning [`UserId`];
//!    there are no cross-user reads or references
//! 3. **Reads are individual, writes are batched**: a mutation reads what it
//!    needs, computes a [`WriteBatch`], and commits it in one call
//! 4. **No version checks**: a batch computed from a stale read overwrites
//!    concurrent changes (single owner, typically one active session)
//!
//! # Examples
//!
//! ```rust,no_run
//! use tasklists_core::db::{EntityStore, MemoryStore, TaskFilter, WriteBatch};
//! use tasklists_core::models::{TaskList, UserId};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = MemoryStore::new();
//! let user = UserId::new("alice");
//!
//! let mut batch = WriteBatch::new();
//! batch.put_list(TaskList::new(store.generate_id(), "Inbox", 0));
//! store.commit(&user, batch).await?;
//!
//! let tasks = store.query_tasks(&user, &TaskFilter::in_list("missing")).await?;
//! assert!(tasks.is_empty());
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use tokio::sync::broadcast;
use uuid::Uuid;

use super::batch::WriteBatch;
use super::error::StoreResult;
use super::events::StoreChange;
use crate::models::{Task, TaskList, UserId};

/// Field-equality query over tasks
///
/// All set fields are combined with AND; an empty filter matches every task
/// of the user.
///
/// `parent_id` uses the double-Option pattern:
/// - `None`: any parent
/// - `Some(None)`: top-level tasks only
/// - `Some(Some(id))`: direct children of `id`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    pub list_id: Option<String>,
    pub parent_id: Option<Option<String>>,
}

impl TaskFilter {
    /// Every task whose `list_id` equals `list_id`
    pub fn in_list(list_id: impl Into<String>) -> Self {
        Self {
            list_id: Some(list_id.into()),
            parent_id: None,
        }
    }

    /// The sibling group `(list_id, parent_id)`
    pub fn siblings(list_id: impl Into<String>, parent_id: Option<&str>) -> Self {
        Self {
            list_id: Some(list_id.into()),
            parent_id: Some(parent_id.map(str::to_string)),
        }
    }

    pub fn matches(&self, task: &Task) -> bool {
        if let Some(list_id) = &self.list_id {
            if &task.list_id != list_id {
                return false;
            }
        }
        if let Some(parent_id) = &self.parent_id {
            if &task.parent_id != parent_id {
                return false;
            }
        }
        true
    }
}

/// Durable keyed storage for lists and tasks, partitioned per user
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; services hold them as
/// `Arc<dyn EntityStore>` and share them across tasks.
///
/// # Atomicity
///
/// `commit` applies every op of the batch or none of them. A patch aimed at a
/// missing entity fails the whole batch with
/// [`StoreError::MissingEntity`](super::StoreError::MissingEntity); deletes
/// of missing entities are no-ops.
/// After a successful commit exactly one [`StoreChange`] is broadcast.
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Generate a fresh unique entity id
    fn generate_id(&self) -> String {
        Uuid::new_v4().to_string()
    }

    /// Get list by id; `Ok(None)` when it does not exist
    async fn get_list(&self, user: &UserId, id: &str) -> StoreResult<Option<TaskList>>;

    /// All lists of the user, in no particular order
    async fn lists(&self, user: &UserId) -> StoreResult<Vec<TaskList>>;

    /// Get task by id; `Ok(None)` when it does not exist
    async fn get_task(&self, user: &UserId, id: &str) -> StoreResult<Option<Task>>;

    /// Tasks matching every field set in `filter`, in no particular order
    async fn query_tasks(&self, user: &UserId, filter: &TaskFilter) -> StoreResult<Vec<Task>>;

    /// Ancestor-containment query: every task whose `path` contains
    /// `ancestor_id`, i.e. the strict descendants of that task
    async fn tasks_with_ancestor(&self, user: &UserId, ancestor_id: &str)
        -> StoreResult<Vec<Task>>;

    /// Apply a batch atomically and broadcast the change
    async fn commit(&self, user: &UserId, batch: WriteBatch) -> StoreResult<()>;

    /// Receive a [`StoreChange`] for every successful commit, for all users
    fn subscribe_changes(&self) -> broadcast::Receiver<StoreChange>;
}
