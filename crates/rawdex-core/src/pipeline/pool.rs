//! Fixed pool of reusable workers handed out as exclusive leases.
//!
//! Workers live in an index arena. `free` and `leased` hold slot indices, so
//! `free.len() + leased.len()` always equals the pool capacity. The pool is
//! owned by the coordinator and needs no locking.

use std::collections::VecDeque;

/// Exclusive handle to one worker, taken out of the pool.
#[derive(Debug)]
pub struct WorkerLease<W> {
    index: usize,
    worker: W,
}

impl<W> WorkerLease<W> {
    /// Slot this worker returns to.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn worker(&self) -> &W {
        &self.worker
    }

    pub fn worker_mut(&mut self) -> &mut W {
        &mut self.worker
    }
}

/// Worker bookkeeping for the dispatcher.
#[derive(Debug)]
pub struct WorkerPool<W> {
    slots: Vec<Option<W>>,
    free: VecDeque<usize>,
    leased: VecDeque<usize>,
    peak_leased: usize,
}

impl<W> WorkerPool<W> {
    /// Create a pool holding `workers`, all initially free.
    pub fn new(workers: Vec<W>) -> Self {
        let count = workers.len();
        Self {
            slots: workers.into_iter().map(Some).collect(),
            free: (0..count).collect(),
            leased: VecDeque::with_capacity(count),
            peak_leased: 0,
        }
    }

    /// Create a pool of `count` workers built by `make`.
    pub fn from_fn(count: usize, make: impl FnMut() -> W) -> Self {
        Self::new(std::iter::repeat_with(make).take(count).collect())
    }

    /// Lease the worker at the head of the free list, if any.
    pub fn pick(&mut self) -> Option<WorkerLease<W>> {
        let index = self.free.pop_front()?;
        let Some(worker) = self.slots[index].take() else {
            // A free index always has its worker in place.
            self.free.push_front(index);
            return None;
        };
        self.leased.push_back(index);
        self.peak_leased = self.peak_leased.max(self.leased.len());
        Some(WorkerLease { index, worker })
    }

    /// Put a leased worker back at the head of the free list.
    pub fn give_back(&mut self, lease: WorkerLease<W>) {
        let WorkerLease { index, worker } = lease;
        if let Some(pos) = self.leased.iter().position(|&i| i == index) {
            self.leased.remove(pos);
        } else {
            tracing::error!(index, "Returned worker was not leased");
            return;
        }
        self.slots[index] = Some(worker);
        self.free.push_front(index);
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    pub fn leased_count(&self) -> usize {
        self.leased.len()
    }

    /// Highest number of simultaneously leased workers so far.
    pub fn peak_leased(&self) -> usize {
        self.peak_leased
    }

    pub fn has_free(&self) -> bool {
        !self.free.is_empty()
    }

    /// True when no worker is out on lease.
    pub fn is_idle(&self) -> bool {
        self.leased.is_empty()
    }
}
