//! List operations
//!
//! Lists of one user form a single sibling group; these operations keep its
//! ranks dense the same way task operations do for task groups.

use crate::db::{TaskFilter, WriteBatch};
use crate::models::{ListPatch, TaskList, UserId};
use crate::ordering;
use crate::services::error::ServiceResult;
use crate::services::outcome::{Outcome, Rejection};
use crate::services::TaskService;

impl TaskService {
    pub async fn get_list(&self, user: &UserId, id: &str) -> ServiceResult<Option<TaskList>> {
        Ok(self.store.get_list(user, id).await?)
    }

    /// All lists of the user, by rank
    pub async fn lists(&self, user: &UserId) -> ServiceResult<Vec<TaskList>> {
        let lists = self.store.lists(user).await?;
        Ok(ordering::sorted_by_rank(&lists)
            .into_iter()
            .cloned()
            .collect())
    }

    /// Append a new list after the user's existing lists
    pub async fn create_list(
        &self,
        user: &UserId,
        title: &str,
        client_id: Option<String>,
    ) -> ServiceResult<TaskList> {
        let existing = self.store.lists(user).await?;
        let list = TaskList::new(
            self.store.generate_id(),
            title,
            ordering::append_rank(existing.len()),
        )
        .with_client_id(client_id);

        let mut batch = WriteBatch::new();
        batch.put_list(list.clone());
        self.commit(user, batch).await?;

        tracing::debug!("Created list {} at order {}", list.id, list.order);
        Ok(list)
    }

    pub async fn rename_list(
        &self,
        user: &UserId,
        id: &str,
        title: &str,
    ) -> ServiceResult<Outcome<()>> {
        if self.store.get_list(user, id).await?.is_none() {
            return Ok(Outcome::rejected(Rejection::list_not_found(id)));
        }

        let mut batch = WriteBatch::new();
        batch.patch_list(id, ListPatch::title(title));
        self.commit(user, batch).await?;
        Ok(Outcome::Applied(()))
    }

    /// Delete a list together with every task in it
    ///
    /// Returns the number of tasks removed. Remaining lists are re-ranked.
    pub async fn delete_list(&self, user: &UserId, id: &str) -> ServiceResult<Outcome<usize>> {
        if self.store.get_list(user, id).await?.is_none() {
            return Ok(Outcome::rejected(Rejection::list_not_found(id)));
        }

        let tasks = self.store.query_tasks(user, &TaskFilter::in_list(id)).await?;
        let remaining: Vec<TaskList> = self
            .store
            .lists(user)
            .await?
            .into_iter()
            .filter(|list| list.id != id)
            .collect();

        let mut batch = WriteBatch::new();
        for task in &tasks {
            batch.delete_task(&task.id);
        }
        batch.delete_list(id);
        for change in ordering::close_gap(&remaining) {
            batch.patch_list(change.id, ListPatch::order(change.order));
        }
        self.commit(user, batch).await?;

        tracing::info!("Deleted list {} with {} task(s)", id, tasks.len());
        Ok(Outcome::Applied(tasks.len()))
    }

    /// Assign `order = index` to each list id
    pub async fn reorder_lists(
        &self,
        user: &UserId,
        ordered_ids: &[String],
    ) -> ServiceResult<Outcome<()>> {
        let lists = self.store.lists(user).await?;
        if self.validate_reorders {
            if let Err(err) = ordering::validate_arrangement(&lists, ordered_ids) {
                return Ok(Outcome::rejected(err));
            }
        }

        let mut batch = WriteBatch::new();
        for change in ordering::reorder(&lists, ordered_ids) {
            batch.patch_list(change.id, ListPatch::order(change.order));
        }
        self.commit(user, batch).await?;
        Ok(Outcome::Applied(()))
    }
}

#[cfg(test)]
#[path = "list_service_test.rs"]
mod list_service_test;
