//! Store Change Events
//!
//! Backends announce every committed batch on a tokio broadcast channel.
//! The change feed listens to these announcements and re-reads full
//! snapshots; events therefore only say *which* collections of *which* user
//! changed, never what the new values are.
//!
//! # Event Flow
//!
//! 1. A mutation commits a `WriteBatch`
//! 2. The backend sends one `StoreChange` after the commit succeeds
//! 3. Every feed subscribed to that user and collection re-reads and emits

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::UserId;

/// Broadcast channel capacity for store changes.
///
/// Lag is harmless: subscribers re-read full snapshots, so a dropped
/// notification is covered by the next one.
pub const STORE_CHANGE_CHANNEL_CAPACITY: usize = 128;

/// Collections of a user partition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Collection {
    Lists,
    Tasks,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Lists => "lists",
            Collection::Tasks => "tasks",
        }
    }
}

/// One committed batch, as seen by subscribers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreChange {
    pub user_id: UserId,
    /// The batch wrote at least one list
    pub lists: bool,
    /// The batch wrote at least one task
    pub tasks: bool,
    pub committed_at: DateTime<Utc>,
}

impl StoreChange {
    pub fn new(user_id: UserId, lists: bool, tasks: bool) -> Self {
        Self {
            user_id,
            lists,
            tasks,
            committed_at: Utc::now(),
        }
    }

    /// Whether a subscriber of `collection` for `user` must re-read
    pub fn affects(&self, user: &UserId, collection: Collection) -> bool {
        if &self.user_id != user {
            return false;
        }
        match collection {
            Collection::Lists => self.lists,
            Collection::Tasks => self.tasks,
        }
    }

    /// Get a string representation of the event type
    pub fn event_type(&self) -> &'static str {
        match (self.lists, self.tasks) {
            (true, true) => "store:lists+tasks",
            (true, false) => "store:lists",
            (false, true) => "store:tasks",
            (false, false) => "store:none",
        }
    }
}
