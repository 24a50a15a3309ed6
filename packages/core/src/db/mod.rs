//! Storage Layer
//!
//! Durable keyed storage for lists and tasks, partitioned per user:
//!
//! - [`EntityStore`] - backend-agnostic trait (get, field queries,
//!   ancestor-containment query, atomic batch commit, change broadcast)
//! - [`MemoryStore`] - in-process backend for tests and previews
//! - [`TursoStore`] - embedded libsql backend (feature `turso`)
//!
//! Writes are always expressed as a [`WriteBatch`] and applied
//! all-or-nothing; every successful commit emits one [`StoreChange`].

mod batch;
mod entity_store;
mod error;
pub mod events;
mod memory_store;
#[cfg(feature = "turso")]
mod turso_store;

pub use batch::{WriteBatch, WriteOp};
pub use entity_store::{EntityStore, TaskFilter};
pub use error::{StoreError, StoreResult};
pub use events::{Collection, StoreChange, STORE_CHANGE_CHANNEL_CAPACITY};
pub use memory_store::MemoryStore;
#[cfg(feature = "turso")]
pub use turso_store::TursoStore;
