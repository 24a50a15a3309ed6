//! Task model
//!
//! A task lives in exactly one list and is optionally nested under a parent
//! task of the same list. Its ancestry is materialized in `path`:
//!
//! - `path` lists ancestor ids root-first, excluding the task itself
//! - `parent_id == path.last()` for nested tasks, `path` is empty at top level
//! - depth is `path.len() + 1`, so a top-level task has depth 1
//!
//! Siblings are the tasks sharing `(list_id, parent_id)`; within that group
//! `order` is a dense zero-based rank.

use serde::{Deserialize, Deserializer, Serialize};

/// A task node in a list's forest
///
/// # Examples
///
/// ```rust
/// use tasklists_core::models::Task;
///
/// let root = Task::new_root("t-1", "list-1", "Plan trip", 0);
/// let child = Task::new_child("t-2", &root, "Book flights", 0);
///
/// assert_eq!(root.depth(), 1);
/// assert_eq!(child.depth(), 2);
/// assert_eq!(child.path, vec!["t-1".to_string()]);
/// assert_eq!(child.parent_id.as_deref(), Some("t-1"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Store-generated identifier
    pub id: String,

    pub title: String,

    #[serde(default)]
    pub completed: bool,

    /// Presentation hint: children hidden in the tree view
    #[serde(default)]
    pub collapsed: bool,

    /// Owning list
    pub list_id: String,

    /// Immediate parent, `None` for top-level tasks
    #[serde(default)]
    pub parent_id: Option<String>,

    /// Ancestor ids, root-first, excluding self
    #[serde(default)]
    pub path: Vec<String>,

    /// Dense zero-based rank within `(list_id, parent_id)`
    pub order: i64,

    /// Caller-chosen correlation token, see [`crate::models::TaskList::client_id`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
}

impl Task {
    /// Create a top-level task
    pub fn new_root(
        id: impl Into<String>,
        list_id: impl Into<String>,
        title: impl Into<String>,
        order: i64,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            completed: false,
            collapsed: false,
            list_id: list_id.into(),
            parent_id: None,
            path: Vec::new(),
            order,
            client_id: None,
        }
    }

    /// Create a task nested directly under `parent`, inheriting its list
    pub fn new_child(
        id: impl Into<String>,
        parent: &Task,
        title: impl Into<String>,
        order: i64,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            completed: false,
            collapsed: false,
            list_id: parent.list_id.clone(),
            parent_id: Some(parent.id.clone()),
            path: parent.child_path(),
            order,
            client_id: None,
        }
    }

    pub fn with_client_id(mut self, client_id: Option<String>) -> Self {
        self.client_id = client_id;
        self
    }

    /// 1 for top-level tasks, 1 + number of ancestors otherwise
    pub fn depth(&self) -> usize {
        self.path.len() + 1
    }

    /// The path a direct child of this task carries
    pub fn child_path(&self) -> Vec<String> {
        let mut path = Vec::with_capacity(self.path.len() + 1);
        path.extend(self.path.iter().cloned());
        path.push(self.id.clone());
        path
    }

    /// Whether `id` is one of this task's ancestors
    pub fn has_ancestor(&self, id: &str) -> bool {
        self.path.iter().any(|ancestor| ancestor == id)
    }

    /// Whether this task belongs to the sibling group `(list_id, parent_id)`
    pub fn is_sibling_of(&self, list_id: &str, parent_id: Option<&str>) -> bool {
        self.list_id == list_id && self.parent_id.as_deref() == parent_id
    }
}

/// Deserialize a double-Option field
///
/// - Missing field → None (don't update)
/// - null → Some(None) (set to NULL)
/// - "value" → Some(Some("value"))
fn deserialize_optional_field<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Some(Option::<T>::deserialize(deserializer)?))
}

/// Field-level partial update for a task, as written to the store
///
/// Includes the structural fields (`list_id`, `parent_id`, `path`, `order`)
/// that only the ordering and hierarchy engines are expected to set.
/// Callers editing user-visible fields go through [`TaskUpdate`] instead.
///
/// `parent_id` uses the double-Option pattern:
/// - `None`: don't change parent_id
/// - `Some(None)`: move to top level
/// - `Some(Some(id))`: set the parent
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub collapsed: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub list_id: Option<String>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_optional_field"
    )]
    pub parent_id: Option<Option<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
}

impl TaskPatch {
    pub fn order(order: i64) -> Self {
        Self {
            order: Some(order),
            ..Default::default()
        }
    }

    /// Check if the patch contains any changes
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.completed.is_none()
            && self.collapsed.is_none()
            && self.list_id.is_none()
            && self.parent_id.is_none()
            && self.path.is_none()
            && self.order.is_none()
    }

    /// Apply the patch to a task in place
    pub fn apply_to(&self, task: &mut Task) {
        if let Some(title) = &self.title {
            task.title = title.clone();
        }
        if let Some(completed) = self.completed {
            task.completed = completed;
        }
        if let Some(collapsed) = self.collapsed {
            task.collapsed = collapsed;
        }
        if let Some(list_id) = &self.list_id {
            task.list_id = list_id.clone();
        }
        if let Some(parent_id) = &self.parent_id {
            task.parent_id = parent_id.clone();
        }
        if let Some(path) = &self.path {
            task.path = path.clone();
        }
        if let Some(order) = self.order {
            task.order = order;
        }
    }

    /// Fold another patch into this one; fields set in `other` win
    pub fn merge(&mut self, other: TaskPatch) {
        if other.title.is_some() {
            self.title = other.title;
        }
        if other.completed.is_some() {
            self.completed = other.completed;
        }
        if other.collapsed.is_some() {
            self.collapsed = other.collapsed;
        }
        if other.list_id.is_some() {
            self.list_id = other.list_id;
        }
        if other.parent_id.is_some() {
            self.parent_id = other.parent_id;
        }
        if other.path.is_some() {
            self.path = other.path;
        }
        if other.order.is_some() {
            self.order = other.order;
        }
    }
}

/// User-editable task fields for `update_task`
///
/// Structural fields are deliberately absent: moving a task goes through
/// reparenting so paths and ranks stay consistent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub collapsed: Option<bool>,
}

impl TaskUpdate {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.completed.is_none() && self.collapsed.is_none()
    }
}

impl From<TaskUpdate> for TaskPatch {
    fn from(update: TaskUpdate) -> Self {
        Self {
            title: update.title,
            completed: update.completed,
            collapsed: update.collapsed,
            ..Default::default()
        }
    }
}
