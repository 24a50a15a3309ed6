//! Engine configuration
//!
//! Loaded from (lowest to highest precedence) built-in defaults, an optional
//! JSON file and `TASKLISTS_*` environment variables. All fields use
//! `#[serde(default)]` so partial files deserialize without error.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::db::STORE_CHANGE_CHANNEL_CAPACITY;

/// Default nesting bound: top-level tasks are depth 1
pub const DEFAULT_MAX_DEPTH: usize = 4;

pub const ENV_MAX_DEPTH: &str = "TASKLISTS_MAX_DEPTH";
pub const ENV_VALIDATE_REORDERS: &str = "TASKLISTS_VALIDATE_REORDERS";
pub const ENV_FEED_CAPACITY: &str = "TASKLISTS_FEED_CAPACITY";

/// Configuration loading errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    /// Deepest allowed task depth. Lowering it never touches existing tasks;
    /// it only constrains later creates and moves.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Require reorders to name exactly the current members of the group
    #[serde(default = "default_validate_reorders")]
    pub validate_reorders: bool,

    /// Capacity of the store's change broadcast channel
    #[serde(default = "default_feed_channel_capacity")]
    pub feed_channel_capacity: usize,
}

fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

fn default_validate_reorders() -> bool {
    true
}

fn default_feed_channel_capacity() -> usize {
    STORE_CHANGE_CHANNEL_CAPACITY
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            validate_reorders: default_validate_reorders(),
            feed_channel_capacity: default_feed_channel_capacity(),
        }
    }
}

impl EngineConfig {
    /// Load from a JSON file, then apply environment overrides
    ///
    /// A missing file yields defaults; an unreadable or malformed one is an
    /// error.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::load_with(path.as_ref(), |key| std::env::var(key).ok()).await
    }

    async fn load_with(
        path: &Path,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {

        let config = if path.exists() {
            let contents = tokio::fs::read_to_string(path)
                .await
                .map_err(|source| ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
            serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?
        } else {
            tracing::debug!("No config file at {}, using defaults", path.display());
            Self::default()
        };

        let config = config.with_overrides(lookup);
        config.validate()?;
        Ok(config)
    }

    /// Apply `TASKLISTS_*` variables; unparsable values are ignored
    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(raw) = lookup(ENV_MAX_DEPTH) {
            match raw.trim().parse::<usize>() {
                Ok(value) => self.max_depth = value,
                Err(_) => tracing::warn!("Ignoring {}={:?}: not a number", ENV_MAX_DEPTH, raw),
            }
        }
        if let Some(raw) = lookup(ENV_VALIDATE_REORDERS) {
            match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => self.validate_reorders = true,
                "0" | "false" | "no" | "off" => self.validate_reorders = false,
                _ => tracing::warn!(
                    "Ignoring {}={:?}: expected true or false",
                    ENV_VALIDATE_REORDERS,
                    raw
                ),
            }
        }
        if let Some(raw) = lookup(ENV_FEED_CAPACITY) {
            match raw.trim().parse::<usize>() {
                Ok(value) => self.feed_channel_capacity = value,
                Err(_) => tracing::warn!("Ignoring {}={:?}: not a number", ENV_FEED_CAPACITY, raw),
            }
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_depth == 0 {
            return Err(ConfigError::Invalid(
                "maxDepth must be at least 1".to_string(),
            ));
        }
        if self.feed_channel_capacity == 0 {
            return Err(ConfigError::Invalid(
                "feedChannelCapacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
