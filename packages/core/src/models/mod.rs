//! Data Models
//!
//! Entities persisted by the store and the intents that mutate them:
//!
//! - [`TaskList`] - ordered container of tasks
//! - [`Task`] - node of a list's forest with a materialized ancestor path
//! - [`Intent`] - one requested mutation, as produced by the presentation layer
//! - [`UserId`] - owner of a store partition

mod intent;
mod list;
mod task;
mod user;

pub use intent::{Intent, IntentResult};
pub use list::{ListPatch, TaskList};
pub use task::{Task, TaskPatch, TaskUpdate};
pub use user::UserId;
