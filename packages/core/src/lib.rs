//! Tasklists Core - Hierarchical Ordering and Reparenting Engine
//!
//! This crate keeps a per-user forest of tasks, grouped into ordered lists,
//! consistent under insertion, cascading deletion, reordering and
//! cross-container reparenting.
//!
//! # Architecture
//!
//! - **Dense ranks**: siblings always carry orders `0..n`
//! - **Materialized paths**: every task stores its ancestor ids, root-first
//! - **Bounded depth**: no task deeper than the configured `max_depth`
//! - **Atomic batches**: each operation commits all of its writes or none
//! - **Snapshot feeds**: subscribers receive full, sorted collections
//!
//! # Modules
//!
//! - [`models`] - Data structures (TaskList, Task, Intent, UserId)
//! - [`db`] - Entity store trait with in-memory and libsql backends
//! - [`ordering`] - Sibling rank computation
//! - [`hierarchy`] - Move validation and path propagation
//! - [`services`] - Mutation protocol (TaskService) and Session
//! - [`feed`] - Live snapshot subscriptions
//! - [`config`] - Engine configuration

pub mod config;
pub mod db;
pub mod feed;
pub mod hierarchy;
pub mod models;
pub mod ordering;
pub mod services;

// Re-export commonly used types
pub use config::{ConfigError, EngineConfig};
pub use feed::{ChangeFeed, Subscription};
pub use models::*;
pub use services::*;
