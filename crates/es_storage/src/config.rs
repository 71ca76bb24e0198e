//! Storage configuration.

use serde::{Deserialize, Serialize};

use crate::error::{Result, StorageError};
use crate::layout::{DEFAULT_CACHE_WINDOW, MAX_CACHE_WINDOW};

/// Tuning knobs for a [`crate::Storage`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Number of low component ids whose offsets come from the lookup
    /// table. `0` disables the table.
    pub offset_cache_window: u8,
    /// Entity records to reserve room for up front.
    pub entity_capacity: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            offset_cache_window: DEFAULT_CACHE_WINDOW,
            entity_capacity: 0,
        }
    }
}

impl StorageConfig {
    /// Default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the offset cache window.
    #[must_use]
    pub fn with_offset_cache_window(mut self, window: u8) -> Self {
        self.offset_cache_window = window;
        self
    }

    /// Override the initial entity capacity.
    #[must_use]
    pub fn with_entity_capacity(mut self, capacity: usize) -> Self {
        self.entity_capacity = capacity;
        self
    }

    /// Check every value is in range.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidConfig`] if the cache window exceeds
    /// [`MAX_CACHE_WINDOW`].
    pub fn validate(&self) -> Result<()> {
        if self.offset_cache_window > MAX_CACHE_WINDOW {
            return Err(StorageError::InvalidConfig(format!(
                "offset_cache_window {} exceeds the maximum of {MAX_CACHE_WINDOW}",
                self.offset_cache_window
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_window() {
        let config = StorageConfig::default();
        assert_eq!(config.offset_cache_window, 12);
        assert_eq!(config.entity_capacity, 0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = StorageConfig::new()
            .with_offset_cache_window(4)
            .with_entity_capacity(1024);
        assert_eq!(config.offset_cache_window, 4);
        assert_eq!(config.entity_capacity, 1024);
    }

    #[test]
    fn test_window_too_large() {
        let config = StorageConfig::new().with_offset_cache_window(17);
        assert!(matches!(config.validate(), Err(StorageError::InvalidConfig(_))));
    }

    #[test]
    fn test_json_missing_fields_fall_back_to_default() {
        let config: StorageConfig = serde_json::from_str(r#"{ "entity_capacity": 8 }"#).unwrap();
        assert_eq!(config.offset_cache_window, 12);
        assert_eq!(config.entity_capacity, 8);
    }
}
