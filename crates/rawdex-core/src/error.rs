//! Error types for the rawdex indexing pipeline.
//!
//! Errors are organized by stage. Per-image failures are caught at the worker
//! boundary and logged; only configuration, store-open and fatal pipeline
//! errors reach the caller of [`crate::run_index`].

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for rawdex operations.
#[derive(Error, Debug)]
pub enum IndexError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Database errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Pipeline errors that stop the run
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Per-image pipeline errors, organized by stage.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The RAW service failed to open, unpack or develop the image
    #[error("Decode error for {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: RawError,
    },

    /// The RAW service returned something other than a bitmap
    #[error("Expected a bitmap from the RAW decoder for {path}")]
    NotBitmap { path: PathBuf },

    /// Pixel layout the preview renderer cannot handle
    #[error("Unsupported pixel format for {path}: {colors} colour(s), {bits} bit(s)")]
    UnsupportedPixelFormat {
        path: PathBuf,
        colors: u16,
        bits: u16,
    },

    /// Resampling or JPEG encoding failed
    #[error("Preview encoding failed for {path}: {message}")]
    Encode { path: PathBuf, message: String },

    /// A worker panicked while processing an image
    #[error("Worker panicked while processing {path}")]
    WorkerPanicked { path: PathBuf },
}

impl PipelineError {
    /// Whether the error breaks a programming invariant and must stop the run.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            PipelineError::NotBitmap { .. }
                | PipelineError::UnsupportedPixelFormat { .. }
                | PipelineError::WorkerPanicked { .. }
        )
    }
}

/// Failures reported by a RAW decoder implementation.
#[derive(Error, Debug)]
pub enum RawError {
    /// The file could not be read
    #[error("Cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TIFF/ORF container is malformed
    #[error("Malformed TIFF container: {0}")]
    Container(String),

    /// The sensor data could not be decoded or developed
    #[error("RAW decoding failed: {0}")]
    Decoder(String),

    /// An operation was called before the step it depends on
    #[error("RAW decoder used out of order: {0}")]
    OutOfOrder(&'static str),
}

/// Failures while reading a single TIFF field from a tag callback.
#[derive(Error, Debug)]
pub enum FieldError {
    /// Declared TIFF type differs from the requested one
    #[error("Expected TIFF type {expected}, found {found}")]
    TypeMismatch { expected: u16, found: u16 },

    /// A single-value reader was given a count other than one
    #[error("Expected {expected} element(s), found {found}")]
    CountMismatch { expected: usize, found: usize },

    /// The element count does not fit in memory
    #[error("Element count {count} is too large")]
    Oversized { count: usize },

    /// The byte-order marker is neither "II" nor "MM"
    #[error("Unknown byte order marker {0:#06x}")]
    UnknownByteOrder(u16),

    /// The tag data stream ended early
    #[error("Short read: {0}")]
    Io(#[from] std::io::Error),
}

/// DOP sidecar errors.
#[derive(Error, Debug)]
pub enum DopError {
    /// The document does not match the DOP grammar
    #[error("DOP parse error at byte {offset}")]
    Parse { offset: usize },

    /// A group does not contain the requested key
    #[error("Missing key: {0}")]
    MissingKey(String),

    /// A value has a different variant than the one requested
    #[error("Bad variant access: expected {expected}, found {found}")]
    BadVariantAccess {
        expected: &'static str,
        found: &'static str,
    },

    /// The sidecar could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Database errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Failed to open the database file
    #[error("Failed to open database {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// A statement failed
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
}

impl StoreError {
    /// SQLite primary and extended result codes, when the driver reported them.
    pub fn sqlite_codes(&self) -> Option<(i32, i32)> {
        let source = match self {
            StoreError::Open { source, .. } => source,
            StoreError::Sqlite(source) => source,
        };
        match source {
            // The primary result code is the low byte of the extended one.
            rusqlite::Error::SqliteFailure(err, _) => {
                Some((err.extended_code & 0xff, err.extended_code))
            }
            _ => None,
        }
    }
}

/// Convenience type alias for rawdex results.
pub type Result<T> = std::result::Result<T, IndexError>;

/// Convenience type alias for pipeline-specific results.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
