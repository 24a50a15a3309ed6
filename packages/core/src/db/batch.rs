//! Atomic write batches
//!
//! Every mutation protocol operation is expressed as one [`WriteBatch`] and
//! committed in a single call. Backends apply either all ops or none.

use crate::models::{ListPatch, TaskList, Task, TaskPatch};

/// A single write against one entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOp {
    /// Insert or replace a list
    PutList(TaskList),
    /// Partially update an existing list
    PatchList { id: String, patch: ListPatch },
    /// Remove a list; a list that is already gone is skipped
    DeleteList { id: String },
    /// Insert or replace a task
    PutTask(Task),
    /// Partially update an existing task
    PatchTask { id: String, patch: TaskPatch },
    /// Remove a task; a task that is already gone is skipped
    DeleteTask { id: String },
}

impl WriteOp {
    pub fn touches_lists(&self) -> bool {
        matches!(
            self,
            WriteOp::PutList(_) | WriteOp::PatchList { .. } | WriteOp::DeleteList { .. }
        )
    }

    pub fn touches_tasks(&self) -> bool {
        !self.touches_lists()
    }
}

/// Ordered set of writes committed all-or-nothing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, op: WriteOp) -> &mut Self {
        self.ops.push(op);
        self
    }

    pub fn put_list(&mut self, list: TaskList) -> &mut Self {
        self.push(WriteOp::PutList(list))
    }

    pub fn patch_list(&mut self, id: impl Into<String>, patch: ListPatch) -> &mut Self {
        if patch.is_empty() {
            return self;
        }
        self.push(WriteOp::PatchList {
            id: id.into(),
            patch,
        })
    }

    pub fn delete_list(&mut self, id: impl Into<String>) -> &mut Self {
        self.push(WriteOp::DeleteList { id: id.into() })
    }

    pub fn put_task(&mut self, task: Task) -> &mut Self {
        self.push(WriteOp::PutTask(task))
    }

    pub fn patch_task(&mut self, id: impl Into<String>, patch: TaskPatch) -> &mut Self {
        if patch.is_empty() {
            return self;
        }
        self.push(WriteOp::PatchTask {
            id: id.into(),
            patch,
        })
    }

    pub fn delete_task(&mut self, id: impl Into<String>) -> &mut Self {
        self.push(WriteOp::DeleteTask { id: id.into() })
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<WriteOp> {
        self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn touches_lists(&self) -> bool {
        self.ops.iter().any(WriteOp::touches_lists)
    }

    pub fn touches_tasks(&self) -> bool {
        self.ops.iter().any(WriteOp::touches_tasks)
    }
}
