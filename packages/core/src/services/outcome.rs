//! Operation outcomes
//!
//! Expected rejections (missing ids, depth or cycle violations, bad
//! arrangements) are not errors: the operation simply does nothing. The
//! reason is still carried in [`Outcome::Rejected`] so callers and tests can
//! tell a depth violation from a missing parent. Callers that only care
//! whether something happened use [`Outcome::applied`].

use thiserror::Error;

use crate::hierarchy::MoveViolation;
use crate::ordering::ArrangementError;

/// Why an operation resolved as a no-op
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    #[error("no user is signed in")]
    NotSignedIn,

    #[error("task not found: {id}")]
    TaskNotFound { id: String },

    #[error("list not found: {id}")]
    ListNotFound { id: String },

    #[error("parent task not found: {id}")]
    ParentNotFound { id: String },

    #[error("task '{task_id}' cannot become its own parent")]
    SelfParent { task_id: String },

    #[error("task '{target_id}' lies inside the subtree of '{task_id}'")]
    Cycle { task_id: String, target_id: String },

    #[error("depth {depth} exceeds the maximum of {max_depth}")]
    DepthExceeded { depth: usize, max_depth: usize },

    #[error("parent '{parent_id}' belongs to list '{parent_list_id}', not '{target_list_id}'")]
    ListMismatch {
        parent_id: String,
        parent_list_id: String,
        target_list_id: String,
    },

    #[error("ordered ids do not match the sibling group: {0}")]
    SiblingSetMismatch(#[from] ArrangementError),
}

impl Rejection {
    pub fn task_not_found(id: impl Into<String>) -> Self {
        Self::TaskNotFound { id: id.into() }
    }

    pub fn list_not_found(id: impl Into<String>) -> Self {
        Self::ListNotFound { id: id.into() }
    }

    pub fn parent_not_found(id: impl Into<String>) -> Self {
        Self::ParentNotFound { id: id.into() }
    }
}

impl From<MoveViolation> for Rejection {
    fn from(violation: MoveViolation) -> Self {
        match violation {
            MoveViolation::SelfParent { task_id } => Self::SelfParent { task_id },
            MoveViolation::Cycle { task_id, target_id } => Self::Cycle { task_id, target_id },
            MoveViolation::DepthExceeded { depth, max_depth } => {
                Self::DepthExceeded { depth, max_depth }
            }
        }
    }
}

/// Result of an operation that either wrote a batch or did nothing
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    Applied(T),
    Rejected(Rejection),
}

impl<T> Outcome<T> {
    /// Build a rejection and log it
    pub fn rejected(rejection: impl Into<Rejection>) -> Self {
        let rejection = rejection.into();
        tracing::debug!("Operation rejected: {}", rejection);
        Self::Rejected(rejection)
    }

    /// The applied value, discarding any rejection reason
    pub fn applied(self) -> Option<T> {
        match self {
            Outcome::Applied(value) => Some(value),
            Outcome::Rejected(_) => None,
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, Outcome::Applied(_))
    }

    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            Outcome::Applied(_) => None,
            Outcome::Rejected(rejection) => Some(rejection),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Outcome::Applied(value) => Outcome::Applied(f(value)),
            Outcome::Rejected(rejection) => Outcome::Rejected(rejection),
        }
    }
}
