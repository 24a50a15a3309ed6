//! Service Layer Error Types
//!
//! Only failures the caller may want to retry surface as errors. Expected
//! no-ops are reported through [`super::Outcome`] instead.

use crate::config::ConfigError;
use crate::db::StoreError;
use thiserror::Error;

/// Service operation errors
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Storage or transport failure; nothing was written
    #[error("Store operation failed: {0}")]
    Store(#[from] StoreError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ServiceError {
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }
}

impl From<ConfigError> for ServiceError {
    fn from(err: ConfigError) -> Self {
        Self::InvalidConfig(err.to_string())
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
