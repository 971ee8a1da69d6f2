//! Coordinator that streams discovered files through the worker pool.
//!
//! All mutable state (the directory walk, the pool, the store) lives in one
//! task that drains an event queue. Preparing a file happens on that task;
//! developing and encoding run under `spawn_blocking`, and the finished worker
//! comes back to the queue as a completion event.
//!
//! ```text
//!             +------------- completion, free worker --------------+
//!             v                                                    |
//!   PROCESSING --- all workers leased ---> WAITING_FOR_WORKER -----+
//!       |
//!       +--- directory exhausted ---> DRAINING --- pool idle ---> finish
//! ```

use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};

use tokio::sync::mpsc;

use crate::config::Config;
use crate::error::{PipelineError, PipelineResult};
use crate::raw::RawDecoder;
use crate::store::ImageStore;

use super::discovery::{DiscoveredFiles, FileDiscovery};
use super::pool::{WorkerLease, WorkerPool};
use super::preview::PreviewRenderer;
use super::project::project_name;
use super::worker::RawWorker;

/// Where the coordinator is in the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingState {
    /// Workers are available or more files may follow
    Processing,
    /// More files may follow but every worker is leased
    WaitingForWorker,
    /// The directory walk is exhausted; waiting for leased workers
    Draining,
}

/// Counters reported when a run finishes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Files handed to a worker
    pub picked_up: usize,
    /// Rows written to the store
    pub persisted: usize,
    /// Images skipped because decoding or encoding failed
    pub failed: usize,
    /// Rows the store rejected
    pub insert_failures: usize,
    /// Most workers leased at the same time
    pub peak_leased: usize,
}

enum Event {
    ProcessNext,
    Completed {
        path: PathBuf,
        lease: WorkerLease<RawWorker>,
        result: PipelineResult<()>,
    },
}

/// Drives every discovered image through prepare, process and persist.
pub struct Dispatcher {
    files: DiscoveredFiles,
    /// Path pulled from the walk that still needs a worker
    pending: Option<PathBuf>,
    pool: WorkerPool<RawWorker>,
    store: ImageStore,
    project_depth: u16,
    state: ProcessingState,
    events_tx: mpsc::UnboundedSender<Event>,
    events_rx: mpsc::UnboundedReceiver<Event>,
    summary: RunSummary,
    finished: bool,
}

impl Dispatcher {
    /// Create a dispatcher over `image_root`, building one decoder per worker
    /// with `make_decoder`.
    pub fn new(
        config: &Config,
        image_root: &Path,
        store: ImageStore,
        project_depth: u16,
        mut make_decoder: impl FnMut() -> Box<dyn RawDecoder>,
    ) -> Self {
        let renderer = PreviewRenderer::new(config.preview.clone());
        let pool = WorkerPool::from_fn(config.pipeline.worker_count, || {
            RawWorker::new(make_decoder(), renderer.clone())
        });
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        Self {
            files: FileDiscovery::new(&config.discovery).walk(image_root),
            pending: None,
            pool,
            store,
            project_depth,
            state: ProcessingState::Processing,
            events_tx,
            events_rx,
            summary: RunSummary::default(),
            finished: false,
        }
    }

    /// Run until the directory is exhausted and every worker has returned.
    ///
    /// Per-image failures are logged and counted. A fatal pipeline error stops
    /// the run and is returned; nothing is persisted after it.
    pub async fn run(mut self) -> PipelineResult<RunSummary> {
        self.process_next();

        while !self.finished {
            let Some(event) = self.events_rx.recv().await else {
                break;
            };
            match event {
                Event::ProcessNext => self.process_next(),
                Event::Completed { path, lease, result } => self.complete(path, lease, result)?,
            }
            debug_assert_eq!(
                self.pool.free_count() + self.pool.leased_count(),
                self.pool.capacity()
            );
        }

        self.summary.peak_leased = self.pool.peak_leased();
        Ok(self.summary)
    }

    fn enqueue(&self, event: Event) {
        // The receiver lives in `self`, so sending cannot fail while we run.
        let _ = self.events_tx.send(event);
    }

    fn process_next(&mut self) {
        if !self.pool.has_free() {
            self.state = ProcessingState::WaitingForWorker;
            return;
        }
        match self.pending.take().or_else(|| self.files.next()) {
            Some(path) => self.process_path(path),
            None => {
                self.state = ProcessingState::Draining;
                if self.pool.is_idle() {
                    self.finish();
                }
            }
        }
    }

    fn process_path(&mut self, path: PathBuf) {
        let Some(mut lease) = self.pool.pick() else {
            tracing::error!(path = %path.display(), "No free worker, deferring");
            self.pending = Some(path);
            self.state = ProcessingState::WaitingForWorker;
            return;
        };
        tracing::info!(path = %path.display(), "Indexing");
        self.summary.picked_up += 1;
        lease.worker_mut().prepare_file(&path);

        let events_tx = self.events_tx.clone();
        tokio::task::spawn_blocking(move || {
            let result = std::panic::catch_unwind(AssertUnwindSafe(|| {
                lease.worker_mut().process_image()
            }))
            .unwrap_or_else(|_| {
                Err(PipelineError::WorkerPanicked { path: path.clone() })
            });
            let _ = events_tx.send(Event::Completed { path, lease, result });
        });

        if self.state == ProcessingState::Processing {
            if self.pool.has_free() {
                self.enqueue(Event::ProcessNext);
            } else {
                self.state = ProcessingState::WaitingForWorker;
            }
        }
    }

    fn complete(
        &mut self,
        path: PathBuf,
        lease: WorkerLease<RawWorker>,
        result: PipelineResult<()>,
    ) -> PipelineResult<()> {
        match result {
            Ok(()) => self.persist(&path, &lease),
            Err(e) if e.is_fatal() => {
                tracing::error!("{e}");
                self.pool.give_back(lease);
                return Err(e);
            }
            Err(e) => {
                tracing::warn!("{e}");
                self.summary.failed += 1;
            }
        }
        self.pool.give_back(lease);

        match self.state {
            ProcessingState::Processing => {}
            ProcessingState::WaitingForWorker => {
                self.state = ProcessingState::Processing;
                self.enqueue(Event::ProcessNext);
            }
            ProcessingState::Draining => {
                if self.pool.is_idle() {
                    self.finish();
                }
            }
        }
        Ok(())
    }

    fn persist(&mut self, path: &Path, lease: &WorkerLease<RawWorker>) {
        let filename = path.to_string_lossy();
        let project = project_name(&filename, self.project_depth);
        match self.store.insert(&lease.worker().record(&filename, project)) {
            Ok(()) => self.summary.persisted += 1,
            Err(e) => {
                self.summary.insert_failures += 1;
                let (code, extended_code) = e.sqlite_codes().unwrap_or_default();
                tracing::error!(
                    path = %path.display(),
                    code,
                    extended_code,
                    "Unable to insert image: {e}"
                );
            }
        }
    }

    fn finish(&mut self) {
        tracing::debug!(
            picked_up = self.summary.picked_up,
            persisted = self.summary.persisted,
            "Directory drained"
        );
        self.finished = true;
    }
}
