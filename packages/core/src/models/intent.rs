//! High-level mutation intents
//!
//! The presentation layer turns gestures (typing, checkbox clicks, drag and
//! drop) into one of these intents. Each variant maps onto exactly one atomic
//! mutation; [`crate::services::TaskService::apply`] dispatches them with an
//! exhaustive match.
//!
//! The JSON form is internally tagged by `kind`:
//!
//! ```json
//! {"kind":"reparentSubtree","taskId":"t-1","targetListId":"l-2","targetParentId":null,"insertIndex":0}
//! ```

use serde::{Deserialize, Serialize};

use super::TaskUpdate;

/// A single requested mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Intent {
    CreateRootTask {
        list_id: String,
        title: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        client_id: Option<String>,
    },
    CreateChildTask {
        parent_id: String,
        title: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        client_id: Option<String>,
    },
    UpdateTask {
        task_id: String,
        update: TaskUpdate,
    },
    ToggleComplete {
        task_id: String,
    },
    ToggleCollapse {
        task_id: String,
    },
    DeleteTask {
        task_id: String,
    },
    /// Drop within one sibling group: the full sibling id list, permuted
    ReorderSiblings {
        list_id: String,
        #[serde(default)]
        parent_id: Option<String>,
        ordered_ids: Vec<String>,
    },
    /// Drop into another container (or another slot of a different parent)
    ReparentSubtree {
        task_id: String,
        target_list_id: String,
        #[serde(default)]
        target_parent_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        insert_index: Option<usize>,
    },
    CreateList {
        title: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        client_id: Option<String>,
    },
    RenameList {
        list_id: String,
        title: String,
    },
    DeleteList {
        list_id: String,
    },
    ReorderLists {
        ordered_ids: Vec<String>,
    },
}

impl Intent {
    /// Short name for logging
    pub fn kind(&self) -> &'static str {
        match self {
            Intent::CreateRootTask { .. } => "createRootTask",
            Intent::CreateChildTask { .. } => "createChildTask",
            Intent::UpdateTask { .. } => "updateTask",
            Intent::ToggleComplete { .. } => "toggleComplete",
            Intent::ToggleCollapse { .. } => "toggleCollapse",
            Intent::DeleteTask { .. } => "deleteTask",
            Intent::ReorderSiblings { .. } => "reorderSiblings",
            Intent::ReparentSubtree { .. } => "reparentSubtree",
            Intent::CreateList { .. } => "createList",
            Intent::RenameList { .. } => "renameList",
            Intent::DeleteList { .. } => "deleteList",
            Intent::ReorderLists { .. } => "reorderLists",
        }
    }
}

/// What an applied intent produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum IntentResult {
    /// A task or list was inserted with this id
    Created { id: String },
    /// A boolean field was flipped to `value`
    Toggled { value: bool },
    /// This many tasks were removed; a deleted list reports the tasks it held
    Deleted { count: usize },
    Updated,
}
