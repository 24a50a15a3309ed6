//! Hierarchy Engine
//!
//! Validates and propagates reparenting moves over materialized paths.
//!
//! A move "task R under target P in list L" (P = `None` for top level) is
//! legal when:
//!
//! 1. P is not R itself
//! 2. P is not inside R's subtree (R would become its own ancestor)
//! 3. the deepest node of R's subtree stays within `max_depth` after the move
//!
//! Existence of R and P is checked by the caller, which owns the reads.
//! Once legal, [`plan_move`] rewrites R's container and path and re-roots the
//! path of every descendant, preserving each descendant's position under R.

use std::collections::HashMap;
use thiserror::Error;

use crate::models::{Task, TaskPatch};

/// Why a move is illegal
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MoveViolation {
    #[error("task '{task_id}' cannot become its own parent")]
    SelfParent { task_id: String },

    #[error("task '{target_id}' lies inside the subtree of '{task_id}'")]
    Cycle { task_id: String, target_id: String },

    #[error("move would place a task at depth {depth}, above the limit of {max_depth}")]
    DepthExceeded { depth: usize, max_depth: usize },
}

/// Depth a direct child of `parent` would have; 1 for top level
pub fn child_depth(parent: Option<&Task>) -> usize {
    parent.map_or(1, |p| p.depth() + 1)
}

/// Path a direct child of `parent` carries; empty for top level
pub fn child_path(parent: Option<&Task>) -> Vec<String> {
    parent.map(Task::child_path).unwrap_or_default()
}

/// 1 + the number of levels below `root` among `descendants`
///
/// Walks the subtree with an explicit stack over parent links, so only tasks
/// actually connected to `root` count and breadth is never a recursion
/// concern. Entries of `descendants` not connected to `root` are ignored.
pub fn subtree_height(root: &Task, descendants: &[Task]) -> usize {
    let mut children: HashMap<&str, Vec<&str>> = HashMap::new();
    for task in descendants {
        if let Some(parent_id) = task.parent_id.as_deref() {
            children.entry(parent_id).or_default().push(task.id.as_str());
        }
    }

    let mut height = 1;
    let mut stack: Vec<(&str, usize)> = vec![(root.id.as_str(), 1)];
    while let Some((id, level)) = stack.pop() {
        height = height.max(level);
        if let Some(kids) = children.get(id) {
            // Bounded by the number of descendants: each id is pushed once
            stack.extend(kids.iter().map(|kid| (*kid, level + 1)));
        }
    }
    height
}

/// Check a proposed move of `task` under `target_parent`
pub fn validate_move(
    task: &Task,
    target_parent: Option<&Task>,
    descendants: &[Task],
    max_depth: usize,
) -> Result<(), MoveViolation> {
    if let Some(parent) = target_parent {
        if parent.id == task.id {
            return Err(MoveViolation::SelfParent {
                task_id: task.id.clone(),
            });
        }
        if parent.has_ancestor(&task.id) {
            return Err(MoveViolation::Cycle {
                task_id: task.id.clone(),
                target_id: parent.id.clone(),
            });
        }
    }

    let new_depth = child_depth(target_parent);
    let deepest = new_depth + subtree_height(task, descendants) - 1;
    if deepest > max_depth {
        return Err(MoveViolation::DepthExceeded {
            depth: deepest,
            max_depth,
        });
    }

    Ok(())
}

/// Path of `descendant` once its ancestor `root_id` has moved to `new_root_path`
///
/// Everything up to and including `root_id` is replaced by
/// `new_root_path + [root_id]`; the relative suffix is kept. Returns `None`
/// when `root_id` is not in the descendant's path.
pub fn rebase_path(descendant: &Task, root_id: &str, new_root_path: &[String]) -> Option<Vec<String>> {
    let index = descendant.path.iter().position(|id| id == root_id)?;

    let mut path = Vec::with_capacity(new_root_path.len() + descendant.path.len() - index);
    path.extend(new_root_path.iter().cloned());
    path.extend(descendant.path[index..].iter().cloned());
    Some(path)
}

/// Structural patches for a validated move
///
/// The first entry is the moved task itself (container, parent, path); the
/// rest re-root each descendant. Ranks are not touched here.
pub fn plan_move(
    task: &Task,
    target_list_id: &str,
    target_parent: Option<&Task>,
    descendants: &[Task],
) -> Vec<(String, TaskPatch)> {
    let new_path = child_path(target_parent);

    let mut patches = Vec::with_capacity(descendants.len() + 1);
    patches.push((
        task.id.clone(),
        TaskPatch {
            list_id: Some(target_list_id.to_string()),
            parent_id: Some(target_parent.map(|p| p.id.clone())),
            path: Some(new_path.clone()),
            ..Default::default()
        },
    ));

    for descendant in descendants {
        if let Some(path) = rebase_path(descendant, &task.id, &new_path) {
            patches.push((
                descendant.id.clone(),
                TaskPatch {
                    list_id: Some(target_list_id.to_string()),
                    path: Some(path),
                    ..Default::default()
                },
            ));
        }
    }

    patches
}
