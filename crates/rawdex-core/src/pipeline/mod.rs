//! Indexing pipeline components.
//!
//! - **discovery**: lazy walk of the image root, filtered by file name suffix
//! - **pool**: fixed set of RAW workers handed out as leases
//! - **worker**: prepares one image and renders its preview
//! - **preview**: bounded resize and JPEG encoding
//! - **project**: project names from ancestor directories
//! - **dispatcher**: the coordinator tying the stages to the store

pub mod discovery;
pub mod dispatcher;
pub mod pool;
pub mod preview;
pub mod project;
pub mod worker;

// Re-exports for convenient access
pub use discovery::{DiscoveredFiles, FileDiscovery};
pub use dispatcher::{Dispatcher, ProcessingState, RunSummary};
pub use pool::{WorkerLease, WorkerPool};
pub use preview::{scaled_image_size, PreviewRenderer};
pub use project::project_name;
pub use worker::RawWorker;
