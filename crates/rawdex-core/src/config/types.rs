//! Sub-configuration structs with their defaults.

use serde::{Deserialize, Serialize};

/// Worker pool settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Number of RAW workers in circulation (bounds images in flight)
    pub worker_count: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self { worker_count: 16 }
    }
}

/// Directory traversal settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// File name suffixes (without the dot) selected for indexing, matched
    /// case-insensitively
    pub extensions: Vec<String>,

    /// Follow symbolic links while walking the image root
    pub follow_links: bool,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            extensions: vec!["orf".to_string()],
            follow_links: false,
        }
    }
}

/// Preview rendering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    /// Longest edge of the preview in pixels
    pub max_dimension: u32,

    /// JPEG quality, 1-100
    pub jpeg_quality: u8,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            max_dimension: 1024,
            jpeg_quality: 85,
        }
    }
}

/// Database settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Value for `PRAGMA journal_mode`
    pub journal_mode: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            journal_mode: "OFF".to_string(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
