//! Coordinator configuration.
//!
//! Loaded from TOML; every field has a default so an empty file is valid.
//!
//! ```toml
//! key_field = "id"
//! revert_on_error = true
//! temp_id_len = 9
//! event_capacity = 64
//! ```

use crate::error::{OptimisticError, OptimisticResult};
use portal_model::DEFAULT_KEY_FIELD;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Shortest temporary id suffix accepted by [`CoordinatorConfig::validate`].
pub const MIN_TEMP_ID_LEN: usize = 4;

/// Configuration for the optimistic mutation coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Name of the field that identifies a record.
    pub key_field: String,
    /// Restore the pre-mutation value when an update fails.
    pub revert_on_error: bool,
    /// Length of the random base-36 part of temporary ids.
    pub temp_id_len: usize,
    /// Capacity of the change-event broadcast channel.
    pub event_capacity: usize,
    /// Title of the notification raised when a remote operation fails.
    pub error_title: String,
    /// Title of the notification raised when a delete is confirmed.
    pub delete_success_title: String,
    /// Body of the notification raised when a delete is confirmed.
    pub delete_success_description: String,
    /// Title of the notification raised when a retry succeeds.
    pub retry_success_title: String,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            key_field: DEFAULT_KEY_FIELD.to_string(),
            revert_on_error: true,
            temp_id_len: 9,
            event_capacity: 64,
            error_title: "Error".to_string(),
            delete_success_title: "Deleted".to_string(),
            delete_success_description: "Item removed successfully".to_string(),
            retry_success_title: "Saved".to_string(),
        }
    }
}

impl CoordinatorConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(s: &str) -> OptimisticResult<Self> {
        let config: Self =
            toml::from_str(s).map_err(|e| OptimisticError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    pub fn load(path: impl AsRef<Path>) -> OptimisticResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| OptimisticError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&raw)
    }

    /// Checks field ranges.
    pub fn validate(&self) -> OptimisticResult<()> {
        if self.key_field.trim().is_empty() {
            return Err(OptimisticError::Config("key_field must not be empty".into()));
        }
        if self.temp_id_len < MIN_TEMP_ID_LEN {
            return Err(OptimisticError::Config(format!(
                "temp_id_len must be at least {MIN_TEMP_ID_LEN}, got {}",
                self.temp_id_len
            )));
        }
        if self.event_capacity == 0 {
            return Err(OptimisticError::Config(
                "event_capacity must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Same config with a different key field.
    #[must_use]
    pub fn with_key_field(mut self, key_field: impl Into<String>) -> Self {
        self.key_field = key_field.into();
        self
    }

    /// Same config with `revert_on_error` set.
    #[must_use]
    pub fn with_revert_on_error(mut self, revert: bool) -> Self {
        self.revert_on_error = revert;
        self
    }
}
