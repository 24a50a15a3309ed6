//! TursoStore - EntityStore Implementation for the libsql Backend
//!
//! Persists each user partition into two tables, `lists` and `tasks`, keyed
//! by `(user_id, id)`. A task's `path` is stored as a JSON array so the
//! ancestor-containment query can use `json_each`.
//!
//! # Concurrency
//!
//! One connection is shared behind a `tokio::sync::Mutex`. A commit holds the
//! lock from `BEGIN` to `COMMIT`, so readers never observe a half-applied
//! batch and batches from concurrent operations serialize.
//!
//! # Examples
//!
//! ```rust,no_run
//! use tasklists_core::db::{EntityStore, TursoStore};
//! use tasklists_core::models::UserId;
//! use std::path::PathBuf;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = TursoStore::new(PathBuf::from("./data/tasklists.db")).await?;
//! let lists = store.lists(&UserId::new("alice")).await?;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use libsql::{params::Params, Builder, Connection, Row, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};

use super::batch::{WriteBatch, WriteOp};
use super::entity_store::{EntityStore, TaskFilter};
use super::error::{StoreError, StoreResult};
use super::events::{StoreChange, STORE_CHANGE_CHANNEL_CAPACITY};
use crate::models::{ListPatch, Task, TaskList, TaskPatch, UserId};

const IN_MEMORY_PATH: &str = ":memory:";

const LIST_COLUMNS: &str = "id, title, list_order, client_id";

const TASK_COLUMNS: &str =
    "id, title, completed, collapsed, list_id, parent_id, path, task_order, client_id";

/// [`EntityStore`] over an embedded libsql database
pub struct TursoStore {
    conn: Arc<Mutex<Connection>>,
    db_path: PathBuf,
    change_tx: broadcast::Sender<StoreChange>,
}

impl TursoStore {
    /// Open (or create) the database file and initialize the schema
    ///
    /// Pass `":memory:"` for a throwaway database.
    pub async fn new(db_path: PathBuf) -> StoreResult<Self> {
        Self::with_channel_capacity(db_path, STORE_CHANGE_CHANNEL_CAPACITY).await
    }

    pub async fn new_in_memory() -> StoreResult<Self> {
        Self::new(PathBuf::from(IN_MEMORY_PATH)).await
    }

    pub async fn with_channel_capacity(db_path: PathBuf, capacity: usize) -> StoreResult<Self> {
        let in_memory = db_path.as_os_str() == IN_MEMORY_PATH;

        if !in_memory {
            if db_path.file_name().is_none() {
                return Err(StoreError::invalid_path(db_path));
            }
            if let Some(parent) = db_path.parent() {
                if !parent.as_os_str().is_empty() && !parent.exists() {
                    std::fs::create_dir_all(parent)?;
                }
            }
        }

        let db = Builder::new_local(&db_path)
            .build()
            .await
            .map_err(|source| StoreError::ConnectionFailed {
                path: db_path.clone(),
                source,
            })?;
        let conn = db.connect()?;

        let (change_tx, _) = broadcast::channel(capacity.max(1));
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
            db_path,
            change_tx,
        };
        store.initialize_schema(in_memory).await?;

        Ok(store)
    }

    pub fn db_path(&self) -> &PathBuf {
        &self.db_path
    }

    /// PRAGMA statements return rows, so they go through query()
    async fn execute_pragma(conn: &Connection, pragma: &str) -> StoreResult<()> {
        let mut stmt = conn.prepare(pragma).await.map_err(|e| {
            StoreError::sql_execution(format!("Failed to execute '{}': {}", pragma, e))
        })?;
        let _ = stmt.query(()).await.map_err(|e| {
            StoreError::sql_execution(format!("Failed to execute '{}': {}", pragma, e))
        })?;
        Ok(())
    }

    async fn initialize_schema(&self, in_memory: bool) -> StoreResult<()> {
        let conn = self.conn.lock().await;

        if !in_memory {
            Self::execute_pragma(&conn, "PRAGMA journal_mode = WAL").await?;
        }
        Self::execute_pragma(&conn, "PRAGMA busy_timeout = 5000").await?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS lists (
                user_id TEXT NOT NULL,
                id TEXT NOT NULL,
                title TEXT NOT NULL,
                list_order INTEGER NOT NULL,
                client_id TEXT,
                PRIMARY KEY (user_id, id)
            )",
            (),
        )
        .await
        .map_err(|e| StoreError::sql_execution(format!("Failed to create lists table: {}", e)))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS tasks (
                user_id TEXT NOT NULL,
                id TEXT NOT NULL,
                title TEXT NOT NULL,
                completed INTEGER NOT NULL DEFAULT 0,
                collapsed INTEGER NOT NULL DEFAULT 0,
                list_id TEXT NOT NULL,
                parent_id TEXT,
                -- ancestor ids, root-first, as a JSON array
                path TEXT NOT NULL DEFAULT '[]',
                task_order INTEGER NOT NULL,
                client_id TEXT,
                PRIMARY KEY (user_id, id)
            )",
            (),
        )
        .await
        .map_err(|e| StoreError::sql_execution(format!("Failed to create tasks table: {}", e)))?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_tasks_siblings ON tasks(user_id, list_id, parent_id)",
            (),
        )
        .await
        .map_err(|e| StoreError::sql_execution(format!("Failed to create index: {}", e)))?;

        Ok(())
    }

    async fn query_lists(conn: &Connection, sql: &str, params: Params) -> StoreResult<Vec<TaskList>> {
        let mut rows = conn.query(sql, params).await?;
        let mut lists = Vec::new();
        while let Some(row) = rows.next().await? {
            lists.push(row_to_list(&row)?);
        }
        Ok(lists)
    }

    async fn query_task_rows(conn: &Connection, sql: &str, params: Params) -> StoreResult<Vec<Task>> {
        let mut rows = conn.query(sql, params).await?;
        let mut tasks = Vec::new();
        while let Some(row) = rows.next().await? {
            tasks.push(row_to_task(&row)?);
        }
        Ok(tasks)
    }

    async fn apply_op(conn: &Connection, user: &UserId, op: WriteOp) -> StoreResult<()> {
        match op {
            WriteOp::PutList(list) => {
                conn.execute(
                    "INSERT OR REPLACE INTO lists (user_id, id, title, list_order, client_id)
                     VALUES (?, ?, ?, ?, ?)",
                    Params::Positional(vec![
                        text(user.as_str()),
                        text(&list.id),
                        text(&list.title),
                        Value::Integer(list.order),
                        optional_text(list.client_id.as_deref()),
                    ]),
                )
                .await?;
            }
            WriteOp::PatchList { id, patch } => {
                let (assignments, mut values) = list_assignments(&patch);
                if assignments.is_empty() {
                    return Ok(());
                }
                values.push(text(user.as_str()));
                values.push(text(&id));
                let sql = format!(
                    "UPDATE lists SET {} WHERE user_id = ? AND id = ?",
                    assignments.join(", ")
                );
                let changed = conn.execute(&sql, Params::Positional(values)).await?;
                if changed == 0 {
                    return Err(StoreError::missing_entity("lists", id));
                }
            }
            WriteOp::DeleteList { id } => {
                conn.execute(
                    "DELETE FROM lists WHERE user_id = ? AND id = ?",
                    Params::Positional(vec![text(user.as_str()), text(&id)]),
                )
                .await?;
            }
            WriteOp::PutTask(task) => {
                let path = serde_json::to_string(&task.path)?;
                conn.execute(
                    "INSERT OR REPLACE INTO tasks
                        (user_id, id, title, completed, collapsed, list_id, parent_id, path, task_order, client_id)
                     VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                    Params::Positional(vec![
                        text(user.as_str()),
                        text(&task.id),
                        text(&task.title),
                        flag(task.completed),
                        flag(task.collapsed),
                        text(&task.list_id),
                        optional_text(task.parent_id.as_deref()),
                        Value::Text(path),
                        Value::Integer(task.order),
                        optional_text(task.client_id.as_deref()),
                    ]),
                )
                .await?;
            }
            WriteOp::PatchTask { id, patch } => {
                let (assignments, mut values) = task_assignments(&patch)?;
                if assignments.is_empty() {
                    return Ok(());
                }
                values.push(text(user.as_str()));
                values.push(text(&id));
                let sql = format!(
                    "UPDATE tasks SET {} WHERE user_id = ? AND id = ?",
                    assignments.join(", ")
                );
                let changed = conn.execute(&sql, Params::Positional(values)).await?;
                if changed == 0 {
                    return Err(StoreError::missing_entity("tasks", id));
                }
            }
            WriteOp::DeleteTask { id } => {
                conn.execute(
                    "DELETE FROM tasks WHERE user_id = ? AND id = ?",
                    Params::Positional(vec![text(user.as_str()), text(&id)]),
                )
                .await?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl EntityStore for TursoStore {
    async fn get_list(&self, user: &UserId, id: &str) -> StoreResult<Option<TaskList>> {
        let conn = self.conn.lock().await;
        let sql = format!("SELECT {} FROM lists WHERE user_id = ? AND id = ?", LIST_COLUMNS);
        let mut lists = Self::query_lists(
            &conn,
            &sql,
            Params::Positional(vec![text(user.as_str()), text(id)]),
        )
        .await?;
        Ok(lists.pop())
    }

    async fn lists(&self, user: &UserId) -> StoreResult<Vec<TaskList>> {
        let conn = self.conn.lock().await;
        let sql = format!("SELECT {} FROM lists WHERE user_id = ?", LIST_COLUMNS);
        Self::query_lists(&conn, &sql, Params::Positional(vec![text(user.as_str())])).await
    }

    async fn get_task(&self, user: &UserId, id: &str) -> StoreResult<Option<Task>> {
        let conn = self.conn.lock().await;
        let sql = format!("SELECT {} FROM tasks WHERE user_id = ? AND id = ?", TASK_COLUMNS);
        let mut tasks = Self::query_task_rows(
            &conn,
            &sql,
            Params::Positional(vec![text(user.as_str()), text(id)]),
        )
        .await?;
        Ok(tasks.pop())
    }

    async fn query_tasks(&self, user: &UserId, filter: &TaskFilter) -> StoreResult<Vec<Task>> {
        let mut sql = format!("SELECT {} FROM tasks WHERE user_id = ?", TASK_COLUMNS);
        let mut values = vec![text(user.as_str())];

        if let Some(list_id) = &filter.list_id {
            sql.push_str(" AND list_id = ?");
            values.push(text(list_id));
        }
        if let Some(parent_id) = &filter.parent_id {
            // IS compares NULL as a value
            sql.push_str(" AND parent_id IS ?");
            values.push(optional_text(parent_id.as_deref()));
        }

        let conn = self.conn.lock().await;
        Self::query_task_rows(&conn, &sql, Params::Positional(values)).await
    }

    async fn tasks_with_ancestor(
        &self,
        user: &UserId,
        ancestor_id: &str,
    ) -> StoreResult<Vec<Task>> {
        let sql = format!(
            "SELECT {} FROM tasks
             WHERE user_id = ?
               AND EXISTS (SELECT 1 FROM json_each(tasks.path) WHERE json_each.value = ?)",
            TASK_COLUMNS
        );
        let conn = self.conn.lock().await;
        Self::query_task_rows(
            &conn,
            &sql,
            Params::Positional(vec![text(user.as_str()), text(ancestor_id)]),
        )
        .await
    }

    async fn commit(&self, user: &UserId, batch: WriteBatch) -> StoreResult<()> {
        if batch.is_empty() {
            return Ok(());
        }

        let lists = batch.touches_lists();
        let tasks = batch.touches_tasks();
        let op_count = batch.len();

        {
            let conn = self.conn.lock().await;

            conn.execute("BEGIN TRANSACTION", ()).await.map_err(|e| {
                StoreError::sql_execution(format!("Failed to begin transaction: {}", e))
            })?;

            for op in batch.into_ops() {
                if let Err(e) = Self::apply_op(&conn, user, op).await {
                    let _rollback = conn.execute("ROLLBACK", ()).await;
                    return Err(e);
                }
            }

            if let Err(e) = conn.execute("COMMIT", ()).await {
                let _rollback = conn.execute("ROLLBACK", ()).await;
                return Err(StoreError::sql_execution(format!(
                    "Failed to commit transaction: {}",
                    e
                )));
            }
        }

        tracing::debug!("Committed {} op(s) for user '{}'", op_count, user);

        let _ = self.change_tx.send(StoreChange::new(user.clone(), lists, tasks));
        Ok(())
    }

    fn subscribe_changes(&self) -> broadcast::Receiver<StoreChange> {
        self.change_tx.subscribe()
    }
}

fn text(value: &str) -> Value {
    Value::Text(value.to_string())
}

fn optional_text(value: Option<&str>) -> Value {
    value.map(text).unwrap_or(Value::Null)
}

fn flag(value: bool) -> Value {
    Value::Integer(i64::from(value))
}

fn list_assignments(patch: &ListPatch) -> (Vec<&'static str>, Vec<Value>) {
    let mut assignments = Vec::new();
    let mut values = Vec::new();
    if let Some(title) = &patch.title {
        assignments.push("title = ?");
        values.push(text(title));
    }
    if let Some(order) = patch.order {
        assignments.push("list_order = ?");
        values.push(Value::Integer(order));
    }
    (assignments, values)
}

fn task_assignments(patch: &TaskPatch) -> StoreResult<(Vec<&'static str>, Vec<Value>)> {
    let mut assignments = Vec::new();
    let mut values = Vec::new();
    if let Some(title) = &patch.title {
        assignments.push("title = ?");
        values.push(text(title));
    }
    if let Some(completed) = patch.completed {
        assignments.push("completed = ?");
        values.push(flag(completed));
    }
    if let Some(collapsed) = patch.collapsed {
        assignments.push("collapsed = ?");
        values.push(flag(collapsed));
    }
    if let Some(list_id) = &patch.list_id {
        assignments.push("list_id = ?");
        values.push(text(list_id));
    }
    if let Some(parent_id) = &patch.parent_id {
        assignments.push("parent_id = ?");
        values.push(optional_text(parent_id.as_deref()));
    }
    if let Some(path) = &patch.path {
        assignments.push("path = ?");
        values.push(Value::Text(serde_json::to_string(path)?));
    }
    if let Some(order) = patch.order {
        assignments.push("task_order = ?");
        values.push(Value::Integer(order));
    }
    Ok((assignments, values))
}

fn row_to_list(row: &Row) -> StoreResult<TaskList> {
    Ok(TaskList {
        id: row.get::<String>(0)?,
        title: row.get::<String>(1)?,
        order: row.get::<i64>(2)?,
        client_id: row.get::<Option<String>>(3)?,
    })
}

fn row_to_task(row: &Row) -> StoreResult<Task> {
    let path_json = row.get::<String>(6)?;
    Ok(Task {
        id: row.get::<String>(0)?,
        title: row.get::<String>(1)?,
        completed: row.get::<i64>(2)? != 0,
        collapsed: row.get::<i64>(3)? != 0,
        list_id: row.get::<String>(4)?,
        parent_id: row.get::<Option<String>>(5)?,
        path: serde_json::from_str(&path_json)?,
        order: row.get::<i64>(7)?,
        client_id: row.get::<Option<String>>(8)?,
    })
}
