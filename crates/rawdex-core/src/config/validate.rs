//! Configuration validation with range checks.

use crate::error::ConfigError;

use super::Config;

const JOURNAL_MODES: &[&str] = &["DELETE", "TRUNCATE", "PERSIST", "MEMORY", "WAL", "OFF"];

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pipeline.worker_count == 0 {
            return Err(ConfigError::ValidationError(
                "pipeline.worker_count must be > 0".into(),
            ));
        }
        if self.discovery.extensions.is_empty() {
            return Err(ConfigError::ValidationError(
                "discovery.extensions must not be empty".into(),
            ));
        }
        if self.discovery.extensions.iter().any(|ext| ext.is_empty()) {
            return Err(ConfigError::ValidationError(
                "discovery.extensions must not contain empty entries".into(),
            ));
        }
        if self.preview.max_dimension == 0 || self.preview.max_dimension > u32::from(u16::MAX) {
            return Err(ConfigError::ValidationError(
                "preview.max_dimension must be between 1 and 65535".into(),
            ));
        }
        if !(1..=100).contains(&self.preview.jpeg_quality) {
            return Err(ConfigError::ValidationError(
                "preview.jpeg_quality must be between 1 and 100".into(),
            ));
        }
        if !JOURNAL_MODES
            .iter()
            .any(|mode| mode.eq_ignore_ascii_case(&self.store.journal_mode))
        {
            return Err(ConfigError::ValidationError(format!(
                "store.journal_mode must be one of {}",
                JOURNAL_MODES.join(", ")
            )));
        }
        Ok(())
    }
}
