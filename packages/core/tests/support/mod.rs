//! Shared helpers for integration tests
//!
//! [`check_invariants`] walks a whole user partition and verifies the
//! structural guarantees every committed mutation must preserve.

#![allow(dead_code)]

use anyhow::{ensure, Context, Result};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tasklists_core::db::{EntityStore, MemoryStore, TaskFilter, TursoStore};
use tasklists_core::models::{Task, UserId};
use tasklists_core::ordering;
use tasklists_core::services::TaskService;
use tempfile::TempDir;

/// Service over a fresh in-memory store
pub fn memory_service() -> (TaskService, Arc<dyn EntityStore>) {
    let store: Arc<dyn EntityStore> = Arc::new(MemoryStore::new());
    (TaskService::new(store.clone()), store)
}

/// Service over a fresh libsql file store; keep the `TempDir` alive
pub async fn turso_service() -> Result<(TaskService, Arc<dyn EntityStore>, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("tasklists.db");
    let store: Arc<dyn EntityStore> = Arc::new(TursoStore::new(db_path).await?);
    Ok((TaskService::new(store.clone()), store, temp_dir))
}

/// Verify density, path consistency, depth bound, acyclicity and list
/// references over every entity of `user`
pub async fn check_invariants(store: &dyn EntityStore, user: &UserId, max_depth: usize) -> Result<()> {
    let lists = store.lists(user).await?;
    ensure!(ordering::is_dense(&lists), "list ranks are not dense: {:?}", lists);

    let list_ids: HashSet<&str> = lists.iter().map(|l| l.id.as_str()).collect();
    let tasks = store.query_tasks(user, &TaskFilter::default()).await?;
    let by_id: HashMap<&str, &Task> = tasks.iter().map(|t| (t.id.as_str(), t)).collect();

    let mut groups: BTreeMap<(String, Option<String>), Vec<Task>> = BTreeMap::new();
    for task in &tasks {
        ensure!(
            list_ids.contains(task.list_id.as_str()),
            "task {} references missing list {}",
            task.id,
            task.list_id
        );
        ensure!(!task.has_ancestor(&task.id), "task {} is its own ancestor", task.id);
        ensure!(
            task.depth() <= max_depth,
            "task {} at depth {} exceeds {}",
            task.id,
            task.depth(),
            max_depth
        );

        match &task.parent_id {
            Some(parent_id) => {
                let parent = by_id
                    .get(parent_id.as_str())
                    .with_context(|| format!("task {} has missing parent {}", task.id, parent_id))?;
                ensure!(
                    task.path == parent.child_path(),
                    "task {} path {:?} does not extend parent path {:?}",
                    task.id,
                    task.path,
                    parent.path
                );
                ensure!(
                    task.list_id == parent.list_id,
                    "task {} is in a different list than its parent",
                    task.id
                );
            }
            None => ensure!(task.path.is_empty(), "top-level task {} has a path", task.id),
        }

        groups
            .entry((task.list_id.clone(), task.parent_id.clone()))
            .or_default()
            .push(task.clone());
    }

    for ((list_id, parent_id), members) in &groups {
        ensure!(
            ordering::is_dense(members),
            "sibling group ({}, {:?}) is not dense: {:?}",
            list_id,
            parent_id,
            members.iter().map(|t| t.order).collect::<Vec<_>>()
        );
    }

    Ok(())
}

/// Every task of the user sorted by id
pub async fn all_tasks(store: &dyn EntityStore, user: &UserId) -> Result<Vec<Task>> {
    let mut tasks = store.query_tasks(user, &TaskFilter::default()).await?;
    tasks.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(tasks)
}
