//! Rawdex Core - indexes camera RAW photographs into SQLite.
//!
//! Rawdex walks a directory tree, decodes every RAW file it finds, collects
//! EXIF metadata and the rank from an optional DxO sidecar, renders a small
//! JPEG preview and writes one row per image to an `image` table.
//!
//! # Architecture
//!
//! ```text
//! Walk → Lease worker → Prepare (open, EXIF, sidecar) → Develop + Preview → Insert
//! ```
//!
//! Preparation and inserts happen on a single coordinator task; developing
//! and encoding run on blocking threads, bounded by the worker count.
//!
//! # Usage
//!
//! ```rust,ignore
//! use rawdex_core::{Config, IndexJob};
//!
//! #[tokio::main]
//! async fn main() -> rawdex_core::Result<()> {
//!     let job = IndexJob::new("/photos", "/photos/index.db");
//!     let summary = rawdex_core::run_index(&Config::default(), &job).await?;
//!     println!("Indexed {} images", summary.persisted);
//!     Ok(())
//! }
//! ```

// Module declarations
pub mod config;
pub mod dop;
pub mod error;
pub mod exif;
pub mod pipeline;
pub mod raw;
pub mod store;
pub mod types;

use std::path::PathBuf;

// Re-exports for convenient access
pub use config::Config;
pub use error::{ConfigError, IndexError, PipelineError, PipelineResult, Result, StoreError};
pub use pipeline::{Dispatcher, RunSummary};
pub use raw::{RawDecoder, RawloaderDecoder};
pub use store::ImageStore;
pub use types::{DopProperties, ExifProperties, ImageRecord};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// What to index and where to put it.
#[derive(Debug, Clone)]
pub struct IndexJob {
    /// Root of the directory tree to scan
    pub image_root: PathBuf,
    /// SQLite database file
    pub database: PathBuf,
    /// Ancestor depth used for project names; 0 disables them
    pub project_name_from_parent: u16,
    /// Create the `image` table if it is missing
    pub create_schema: bool,
}

impl IndexJob {
    pub fn new(image_root: impl Into<PathBuf>, database: impl Into<PathBuf>) -> Self {
        Self {
            image_root: image_root.into(),
            database: database.into(),
            project_name_from_parent: 0,
            create_schema: false,
        }
    }
}

/// Index `job.image_root` into `job.database` with the `rawloader` decoder.
pub async fn run_index(config: &Config, job: &IndexJob) -> Result<RunSummary> {
    run_index_with(config, job, || Box::new(RawloaderDecoder::new())).await
}

/// Index with a custom decoder per worker.
pub async fn run_index_with(
    config: &Config,
    job: &IndexJob,
    make_decoder: impl FnMut() -> Box<dyn RawDecoder>,
) -> Result<RunSummary> {
    tracing::debug!("Initializing rawdex v{}", VERSION);

    let store = ImageStore::open(&job.database, &config.store)?;
    if job.create_schema {
        store.create_schema()?;
    }

    let dispatcher = Dispatcher::new(
        config,
        &job.image_root,
        store,
        job.project_name_from_parent,
        make_decoder,
    );
    Ok(dispatcher.run().await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[tokio::test]
    async fn test_run_index_empty_root() {
        let dir = tempfile::tempdir().unwrap();
        let mut job = IndexJob::new(dir.path(), dir.path().join("index.db"));
        job.create_schema = true;

        let summary = run_index(&Config::default(), &job).await.unwrap();
        assert_eq!(summary.persisted, 0);
        assert_eq!(ImageStore::open(&job.database, &config::StoreConfig::default())
            .unwrap()
            .count()
            .unwrap(), 0);
    }

    #[tokio::test]
    async fn test_run_index_bad_database_path() {
        let dir = tempfile::tempdir().unwrap();
        let job = IndexJob::new(dir.path(), dir.path().join("missing").join("index.db"));
        let err = run_index(&Config::default(), &job).await.unwrap_err();
        assert!(matches!(err, IndexError::Store(StoreError::Open { .. })));
    }
}
