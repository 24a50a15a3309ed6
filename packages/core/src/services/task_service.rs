//! Task Service - Mutation Protocol
//!
//! Every public mutation follows the same shape:
//!
//! 1. read the entities it needs from the [`EntityStore`]
//! 2. validate; on failure return [`Outcome::Rejected`] without writing
//! 3. let the ordering and hierarchy engines compute ranks and paths
//! 4. commit everything as one [`WriteBatch`]
//!
//! Store failures surface as [`ServiceError`]; because the batch is
//! all-or-nothing the partition is unchanged in that case too.
//!
//! List operations live in `list_service.rs` as a second `impl` block.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::config::EngineConfig;
use crate::db::{EntityStore, TaskFilter, WriteBatch};
use crate::hierarchy;
use crate::models::{Intent, IntentResult, Task, TaskList, TaskPatch, TaskUpdate, UserId};
use crate::ordering::{self, RankChange};
use crate::services::error::{ServiceError, ServiceResult};
use crate::services::outcome::{Outcome, Rejection};

/// Which boolean flag a toggle flips
#[derive(Debug, Clone, Copy)]
enum Flag {
    Completed,
    Collapsed,
}

impl Flag {
    fn get(self, task: &Task) -> bool {
        match self {
            Flag::Completed => task.completed,
            Flag::Collapsed => task.collapsed,
        }
    }

    fn patch(self, value: bool) -> TaskPatch {
        match self {
            Flag::Completed => TaskPatch {
                completed: Some(value),
                ..Default::default()
            },
            Flag::Collapsed => TaskPatch {
                collapsed: Some(value),
                ..Default::default()
            },
        }
    }
}

/// Atomic task and list mutations over an [`EntityStore`]
///
/// Cheap to clone; clones share the store and the depth bound.
///
/// # Examples
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use tasklists_core::db::MemoryStore;
/// use tasklists_core::models::UserId;
/// use tasklists_core::services::TaskService;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let service = TaskService::new(Arc::new(MemoryStore::new()));
/// let user = UserId::new("alice");
///
/// let list = service.create_list(&user, "Work", None).await?;
/// let task = service
///     .create_root_task(&user, &list.id, "Write report", None)
///     .await?
///     .applied()
///     .expect("list exists");
/// assert_eq!(task.order, 0);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct TaskService {
    pub(super) store: Arc<dyn EntityStore>,

    /// Runtime-adjustable; shared between clones
    max_depth: Arc<AtomicUsize>,

    pub(super) validate_reorders: bool,
}

impl TaskService {
    /// Create a service with default configuration
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        let config = EngineConfig::default();
        Self {
            store,
            max_depth: Arc::new(AtomicUsize::new(config.max_depth)),
            validate_reorders: config.validate_reorders,
        }
    }

    /// Create a service from a loaded configuration
    pub fn with_config(
        store: Arc<dyn EntityStore>,
        config: &EngineConfig,
    ) -> ServiceResult<Self> {
        config.validate()?;
        Ok(Self {
            store,
            max_depth: Arc::new(AtomicUsize::new(config.max_depth)),
            validate_reorders: config.validate_reorders,
        })
    }

    /// Get access to the underlying store
    pub fn store(&self) -> &Arc<dyn EntityStore> {
        &self.store
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth.load(Ordering::Relaxed)
    }

    /// Change the depth bound for subsequent operations
    ///
    /// Existing tasks deeper than the new bound are left alone.
    pub fn set_max_depth(&self, max_depth: usize) -> ServiceResult<()> {
        if max_depth == 0 {
            return Err(ServiceError::invalid_config("max depth must be at least 1"));
        }
        let previous = self.max_depth.swap(max_depth, Ordering::Relaxed);
        tracing::info!("Max depth changed from {} to {}", previous, max_depth);
        Ok(())
    }

    pub fn validates_reorders(&self) -> bool {
        self.validate_reorders
    }

    /// Commit a batch unless there is nothing to write
    pub(super) async fn commit(&self, user: &UserId, batch: WriteBatch) -> ServiceResult<()> {
        if batch.is_empty() {
            return Ok(());
        }
        self.store.commit(user, batch).await?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    pub async fn get_task(&self, user: &UserId, id: &str) -> ServiceResult<Option<Task>> {
        Ok(self.store.get_task(user, id).await?)
    }

    /// Every task of a list, top level first, then by rank
    pub async fn tasks_in_list(&self, user: &UserId, list_id: &str) -> ServiceResult<Vec<Task>> {
        let mut tasks = self.store.query_tasks(user, &TaskFilter::in_list(list_id)).await?;
        tasks.sort_by(|a, b| {
            a.depth()
                .cmp(&b.depth())
                .then_with(|| a.order.cmp(&b.order))
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(tasks)
    }

    /// Direct children of `parent_id` (top level when `None`), by rank
    pub async fn children(
        &self,
        user: &UserId,
        list_id: &str,
        parent_id: Option<&str>,
    ) -> ServiceResult<Vec<Task>> {
        let siblings = self.siblings(user, list_id, parent_id).await?;
        Ok(ordering::sorted_by_rank(&siblings)
            .into_iter()
            .cloned()
            .collect())
    }

    async fn siblings(
        &self,
        user: &UserId,
        list_id: &str,
        parent_id: Option<&str>,
    ) -> ServiceResult<Vec<Task>> {
        Ok(self
            .store
            .query_tasks(user, &TaskFilter::siblings(list_id, parent_id))
            .await?)
    }

    // ------------------------------------------------------------------
    // Creation
    // ------------------------------------------------------------------

    /// Append a top-level task to a list
    pub async fn create_root_task(
        &self,
        user: &UserId,
        list_id: &str,
        title: &str,
        client_id: Option<String>,
    ) -> ServiceResult<Outcome<Task>> {
        if self.store.get_list(user, list_id).await?.is_none() {
            return Ok(Outcome::rejected(Rejection::list_not_found(list_id)));
        }

        let siblings = self.siblings(user, list_id, None).await?;
        let task = Task::new_root(
            self.store.generate_id(),
            list_id,
            title,
            ordering::append_rank(siblings.len()),
        )
        .with_client_id(client_id);

        let mut batch = WriteBatch::new();
        batch.put_task(task.clone());
        self.commit(user, batch).await?;

        tracing::debug!("Created task {} in list {} at order {}", task.id, list_id, task.order);
        Ok(Outcome::Applied(task))
    }

    /// Append a task under `parent_id`
    ///
    /// A missing parent or a child deeper than the bound is a no-op; nothing
    /// is inserted.
    pub async fn create_child_task(
        &self,
        user: &UserId,
        parent_id: &str,
        title: &str,
        client_id: Option<String>,
    ) -> ServiceResult<Outcome<Task>> {
        let Some(parent) = self.store.get_task(user, parent_id).await? else {
            return Ok(Outcome::rejected(Rejection::parent_not_found(parent_id)));
        };

        let depth = hierarchy::child_depth(Some(&parent));
        let max_depth = self.max_depth();
        if depth > max_depth {
            return Ok(Outcome::rejected(Rejection::DepthExceeded { depth, max_depth }));
        }

        let siblings = self
            .siblings(user, &parent.list_id, Some(&parent.id))
            .await?;
        let task = Task::new_child(
            self.store.generate_id(),
            &parent,
            title,
            ordering::append_rank(siblings.len()),
        )
        .with_client_id(client_id);

        let mut batch = WriteBatch::new();
        batch.put_task(task.clone());
        self.commit(user, batch).await?;

        tracing::debug!(
            "Created task {} under {} at depth {} order {}",
            task.id,
            parent.id,
            depth,
            task.order
        );
        Ok(Outcome::Applied(task))
    }

    // ------------------------------------------------------------------
    // Field updates
    // ------------------------------------------------------------------

    /// Merge user-editable fields into a task
    pub async fn update_task(
        &self,
        user: &UserId,
        id: &str,
        update: TaskUpdate,
    ) -> ServiceResult<Outcome<()>> {
        if self.store.get_task(user, id).await?.is_none() {
            return Ok(Outcome::rejected(Rejection::task_not_found(id)));
        }

        let mut batch = WriteBatch::new();
        batch.patch_task(id, update.into());
        self.commit(user, batch).await?;
        Ok(Outcome::Applied(()))
    }

    pub async fn rename_task(
        &self,
        user: &UserId,
        id: &str,
        title: &str,
    ) -> ServiceResult<Outcome<()>> {
        self.update_task(user, id, TaskUpdate::title(title)).await
    }

    /// Flip `completed`; returns the new value
    pub async fn toggle_complete(&self, user: &UserId, id: &str) -> ServiceResult<Outcome<bool>> {
        self.toggle(user, id, Flag::Completed).await
    }

    /// Flip `collapsed`; returns the new value
    pub async fn toggle_collapse(&self, user: &UserId, id: &str) -> ServiceResult<Outcome<bool>> {
        self.toggle(user, id, Flag::Collapsed).await
    }

    async fn toggle(&self, user: &UserId, id: &str, flag: Flag) -> ServiceResult<Outcome<bool>> {
        let Some(task) = self.store.get_task(user, id).await? else {
            return Ok(Outcome::rejected(Rejection::task_not_found(id)));
        };

        let value = !flag.get(&task);
        let mut batch = WriteBatch::new();
        batch.patch_task(id, flag.patch(value));
        self.commit(user, batch).await?;
        Ok(Outcome::Applied(value))
    }

    // ------------------------------------------------------------------
    // Structural operations
    // ------------------------------------------------------------------

    /// Delete a task and all of its descendants, then close the gap among
    /// its former siblings. Returns the number of tasks removed.
    pub async fn delete_task_subtree(
        &self,
        user: &UserId,
        id: &str,
    ) -> ServiceResult<Outcome<usize>> {
        let Some(task) = self.store.get_task(user, id).await? else {
            return Ok(Outcome::rejected(Rejection::task_not_found(id)));
        };

        let descendants = self.store.tasks_with_ancestor(user, id).await?;
        let remaining: Vec<Task> = self
            .siblings(user, &task.list_id, task.parent_id.as_deref())
            .await?
            .into_iter()
            .filter(|sibling| sibling.id != task.id)
            .collect();
        let rank_changes = ordering::close_gap(&remaining);

        let mut batch = WriteBatch::new();
        batch.delete_task(&task.id);
        for descendant in &descendants {
            batch.delete_task(&descendant.id);
        }
        for change in rank_changes {
            batch.patch_task(change.id, TaskPatch::order(change.order));
        }
        self.commit(user, batch).await?;

        let count = descendants.len() + 1;
        tracing::info!("Deleted task {} with {} descendant(s)", task.id, descendants.len());
        Ok(Outcome::Applied(count))
    }

    /// Assign `order = index` to each id of one sibling group
    pub async fn reorder_siblings(
        &self,
        user: &UserId,
        list_id: &str,
        parent_id: Option<&str>,
        ordered_ids: &[String],
    ) -> ServiceResult<Outcome<()>> {
        let members = self.siblings(user, list_id, parent_id).await?;
        if self.validate_reorders {
            if let Err(err) = ordering::validate_arrangement(&members, ordered_ids) {
                return Ok(Outcome::rejected(err));
            }
        }

        let changes = ordering::reorder(&members, ordered_ids);
        tracing::debug!(
            "Reordering {} sibling(s) of {:?} in list {}: {} change(s)",
            members.len(),
            parent_id,
            list_id,
            changes.len()
        );

        let mut batch = WriteBatch::new();
        for change in changes {
            batch.patch_task(change.id, TaskPatch::order(change.order));
        }
        self.commit(user, batch).await?;
        Ok(Outcome::Applied(()))
    }

    /// Move a task and its subtree under `target_parent_id` in
    /// `target_list_id` (top level when `None`), at `insert_index` among the
    /// new siblings or at the end.
    ///
    /// Both sibling groups stay dense: the old one closes its gap and the new
    /// one makes room at the insertion slot. Moving within the same group is
    /// a positional reorder.
    pub async fn reparent_subtree(
        &self,
        user: &UserId,
        task_id: &str,
        target_list_id: &str,
        target_parent_id: Option<&str>,
        insert_index: Option<usize>,
    ) -> ServiceResult<Outcome<()>> {
        if target_parent_id == Some(task_id) {
            return Ok(Outcome::rejected(Rejection::SelfParent {
                task_id: task_id.to_string(),
            }));
        }

        let Some(task) = self.store.get_task(user, task_id).await? else {
            return Ok(Outcome::rejected(Rejection::task_not_found(task_id)));
        };

        let target_parent = match target_parent_id {
            Some(parent_id) => match self.store.get_task(user, parent_id).await? {
                Some(parent) => Some(parent),
                None => return Ok(Outcome::rejected(Rejection::parent_not_found(parent_id))),
            },
            None => None,
        };

        if let Some(parent) = &target_parent {
            if parent.list_id != target_list_id {
                return Ok(Outcome::rejected(Rejection::ListMismatch {
                    parent_id: parent.id.clone(),
                    parent_list_id: parent.list_id.clone(),
                    target_list_id: target_list_id.to_string(),
                }));
            }
        }

        if target_list_id != task.list_id
            && self.store.get_list(user, target_list_id).await?.is_none()
        {
            return Ok(Outcome::rejected(Rejection::list_not_found(target_list_id)));
        }

        let descendants: Vec<Task> = self
            .store
            .tasks_with_ancestor(user, &task.id)
            .await?
            .into_iter()
            .filter(|descendant| descendant.list_id == task.list_id)
            .collect();

        if let Err(violation) =
            hierarchy::validate_move(&task, target_parent.as_ref(), &descendants, self.max_depth())
        {
            return Ok(Outcome::rejected(violation));
        }

        let mut patches: BTreeMap<String, TaskPatch> = BTreeMap::new();
        for (id, patch) in
            hierarchy::plan_move(&task, target_list_id, target_parent.as_ref(), &descendants)
        {
            patches.entry(id).or_default().merge(patch);
        }

        let new_siblings: Vec<Task> = self
            .siblings(user, target_list_id, target_parent_id)
            .await?
            .into_iter()
            .filter(|sibling| sibling.id != task.id)
            .collect();
        let mut rank_changes = ordering::insert_at(&new_siblings, &task.id, insert_index);

        if !task.is_sibling_of(target_list_id, target_parent_id) {
            let old_siblings: Vec<Task> = self
                .siblings(user, &task.list_id, task.parent_id.as_deref())
                .await?
                .into_iter()
                .filter(|sibling| sibling.id != task.id)
                .collect();
            rank_changes.extend(ordering::close_gap(&old_siblings));
        }

        for RankChange { id, order } in rank_changes {
            patches.entry(id).or_default().merge(TaskPatch::order(order));
        }

        let mut batch = WriteBatch::new();
        for (id, patch) in patches {
            batch.patch_task(id, patch);
        }
        self.commit(user, batch).await?;

        tracing::info!(
            "Moved task {} ({} descendant(s)) to list {} under {:?}",
            task.id,
            descendants.len(),
            target_list_id,
            target_parent_id
        );
        Ok(Outcome::Applied(()))
    }

    // ------------------------------------------------------------------
    // Intent dispatch
    // ------------------------------------------------------------------

    /// Apply one presentation-layer intent
    pub async fn apply(
        &self,
        user: &UserId,
        intent: Intent,
    ) -> ServiceResult<Outcome<IntentResult>> {
        tracing::debug!("Applying {} for user '{}'", intent.kind(), user);

        let outcome = match intent {
            Intent::CreateRootTask {
                list_id,
                title,
                client_id,
            } => self
                .create_root_task(user, &list_id, &title, client_id)
                .await?
                .map(|task| IntentResult::Created { id: task.id }),
            Intent::CreateChildTask {
                parent_id,
                title,
                client_id,
            } => self
                .create_child_task(user, &parent_id, &title, client_id)
                .await?
                .map(|task| IntentResult::Created { id: task.id }),
            Intent::UpdateTask { task_id, update } => self
                .update_task(user, &task_id, update)
                .await?
                .map(|()| IntentResult::Updated),
            Intent::ToggleComplete { task_id } => self
                .toggle_complete(user, &task_id)
                .await?
                .map(|value| IntentResult::Toggled { value }),
            Intent::ToggleCollapse { task_id } => self
                .toggle_collapse(user, &task_id)
                .await?
                .map(|value| IntentResult::Toggled { value }),
            Intent::DeleteTask { task_id } => self
                .delete_task_subtree(user, &task_id)
                .await?
                .map(|count| IntentResult::Deleted { count }),
            Intent::ReorderSiblings {
                list_id,
                parent_id,
                ordered_ids,
            } => self
                .reorder_siblings(user, &list_id, parent_id.as_deref(), &ordered_ids)
                .await?
                .map(|()| IntentResult::Updated),
            Intent::ReparentSubtree {
                task_id,
                target_list_id,
                target_parent_id,
                insert_index,
            } => self
                .reparent_subtree(
                    user,
                    &task_id,
                    &target_list_id,
                    target_parent_id.as_deref(),
                    insert_index,
                )
                .await?
                .map(|()| IntentResult::Updated),
            Intent::CreateList { title, client_id } => {
                let list: TaskList = self.create_list(user, &title, client_id).await?;
                Outcome::Applied(IntentResult::Created { id: list.id })
            }
            Intent::RenameList { list_id, title } => self
                .rename_list(user, &list_id, &title)
                .await?
                .map(|()| IntentResult::Updated),
            Intent::DeleteList { list_id } => self
                .delete_list(user, &list_id)
                .await?
                .map(|count| IntentResult::Deleted { count }),
            Intent::ReorderLists { ordered_ids } => self
                .reorder_lists(user, &ordered_ids)
                .await?
                .map(|()| IntentResult::Updated),
        };

        Ok(outcome)
    }
}

#[cfg(test)]
#[path = "task_service_test.rs"]
mod task_service_test;
