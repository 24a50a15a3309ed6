//! Task list model
//!
//! A list is a top-level container of tasks. Lists owned by one user form a
//! single sibling group ranked by `order`.

use serde::{Deserialize, Serialize};

/// An ordered container of tasks
///
/// # Examples
///
/// ```rust
/// use tasklists_core::models::TaskList;
///
/// let list = TaskList::new("list-1", "Work", 0);
/// assert_eq!(list.order, 0);
/// assert!(list.client_id.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskList {
    /// Store-generated identifier
    pub id: String,

    pub title: String,

    /// Dense zero-based rank among all lists of the owning user
    pub order: i64,

    /// Caller-chosen correlation token used to match an optimistic local copy
    /// with its authoritative version. Carries no ordering semantics.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
}

impl TaskList {
    pub fn new(id: impl Into<String>, title: impl Into<String>, order: i64) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            order,
            client_id: None,
        }
    }

    pub fn with_client_id(mut self, client_id: Option<String>) -> Self {
        self.client_id = client_id;
        self
    }
}

/// Field-level partial update for a list
///
/// `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
}

impl ListPatch {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Default::default()
        }
    }

    pub fn order(order: i64) -> Self {
        Self {
            order: Some(order),
            ..Default::default()
        }
    }

    /// Check if the patch contains any changes
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.order.is_none()
    }

    /// Apply the patch to a list in place
    pub fn apply_to(&self, list: &mut TaskList) {
        if let Some(title) = &self.title {
            list.title = title.clone();
        }
        if let Some(order) = self.order {
            list.order = order;
        }
    }
}
