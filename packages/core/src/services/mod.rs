//! Business Services
//!
//! This module contains the mutation protocol and the user context:
//!
//! - `TaskService` - atomic task and list operations, intent dispatch
//! - `Outcome` / `Rejection` - applied-or-no-op results with a reason
//! - `Session` - current user, intent routing and feed subscriptions
//!
//! Services coordinate between the storage layer and the ordering and
//! hierarchy engines, turning every operation into a single atomic batch.

pub mod error;
mod list_service;
pub mod outcome;
pub mod session;
pub mod task_service;

pub use error::{ServiceError, ServiceResult};
pub use outcome::{Outcome, Rejection};
pub use session::Session;
pub use task_service::TaskService;
