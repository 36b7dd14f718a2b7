//! Fixed-size pool of renderer workers.
//!
//! ## Design
//!
//! - **Bounded**: the pool holds exactly the workers it was built with. When
//!   all are busy, [`WorkerPool::acquire`] blocks; nothing new is spawned.
//! - **Exclusive**: a worker is moved out of the idle set on acquire, so two
//!   callers can never hold the same worker.
//! - **Always returned**: acquire hands out a [`PooledRenderer`] guard that puts
//!   the worker back when dropped, including during unwinding and on early
//!   error returns.
//!
//! - **No stale cancels**: returning a worker invalidates the cancel handles
//!   taken during the loan, so a late cancel from a finished request cannot
//!   hit the next borrower's render.
//!
//! The pool blocks the calling thread. Async callers should acquire and render
//! inside one `spawn_blocking` task.

use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::error::PoolError;
use crate::worker::TileRenderer;

struct Slots {
    idle: Vec<TileRenderer>,
    closed: bool,
}

struct PoolInner {
    slots: Mutex<Slots>,
    available: Condvar,
    size: usize,
    busy: AtomicUsize,
    peak_busy: AtomicUsize,
}

impl PoolInner {
    fn lock(&self) -> MutexGuard<'_, Slots> {
        // A worker is never touched while the lock is held, so a poisoned lock
        // still guards a consistent idle set.
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn take(&self, slots: &mut Slots) -> Option<TileRenderer> {
        let renderer = slots.idle.pop()?;
        let busy = self.busy.fetch_add(1, Ordering::AcqRel) + 1;
        self.peak_busy.fetch_max(busy, Ordering::AcqRel);
        Some(renderer)
    }

    fn put_back(&self, renderer: TileRenderer) {
        renderer.retire_cancel_handles();
        let mut slots = self.lock();
        slots.idle.push(renderer);
        self.busy.fetch_sub(1, Ordering::AcqRel);
        drop(slots);
        self.available.notify_one();
    }
}

/// Cloneable handle to a shared pool of [`TileRenderer`]s.
#[derive(Clone)]
pub struct WorkerPool {
    inner: Arc<PoolInner>,
}

impl WorkerPool {
    pub fn new(workers: Vec<TileRenderer>) -> Self {
        let size = workers.len();
        info!(size, "Created worker pool");
        Self {
            inner: Arc::new(PoolInner {
                slots: Mutex::new(Slots {
                    idle: workers,
                    closed: false,
                }),
                available: Condvar::new(),
                size,
                busy: AtomicUsize::new(0),
                peak_busy: AtomicUsize::new(0),
            }),
        }
    }

    /// Build `size` workers with `factory(worker_id)`.
    pub fn build<E, F>(size: usize, mut factory: F) -> Result<Self, E>
    where
        F: FnMut(usize) -> Result<TileRenderer, E>,
    {
        let workers = (0..size).map(&mut factory).collect::<Result<Vec<_>, E>>()?;
        Ok(Self::new(workers))
    }

    /// Block until a worker is idle and take it.
    pub fn acquire(&self) -> Result<PooledRenderer, PoolError> {
        let mut slots = self.inner.lock();
        loop {
            if slots.closed {
                return Err(PoolError::Closed);
            }
            if let Some(renderer) = self.inner.take(&mut slots) {
                return Ok(self.guard(renderer));
            }
            slots = self
                .inner
                .available
                .wait(slots)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Like [`acquire`](Self::acquire), but gives up after `timeout` and
    /// returns `Ok(None)`.
    pub fn acquire_timeout(&self, timeout: Duration) -> Result<Option<PooledRenderer>, PoolError> {
        let deadline = Instant::now() + timeout;
        let mut slots = self.inner.lock();
        loop {
            if slots.closed {
                return Err(PoolError::Closed);
            }
            if let Some(renderer) = self.inner.take(&mut slots) {
                return Ok(Some(self.guard(renderer)));
            }
            let now = Instant::now();
            if now >= deadline {
                debug!(timeout_ms = timeout.as_millis() as u64, "Worker acquire timed out");
                return Ok(None);
            }
            slots = self
                .inner
                .available
                .wait_timeout(slots, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    /// Return a worker to the idle set. Same as dropping the guard.
    pub fn release(&self, worker: PooledRenderer) {
        drop(worker);
    }

    /// Refuse further acquires and wake every waiting caller with
    /// [`PoolError::Closed`]. Workers in use are still returned normally.
    pub fn close(&self) {
        let mut slots = self.inner.lock();
        slots.closed = true;
        drop(slots);
        self.inner.available.notify_all();
        info!("Closed worker pool");
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    pub fn size(&self) -> usize {
        self.inner.size
    }

    /// Workers currently handed out.
    pub fn busy(&self) -> usize {
        self.inner.busy.load(Ordering::Acquire)
    }

    /// Highest `busy()` ever observed.
    pub fn peak_busy(&self) -> usize {
        self.inner.peak_busy.load(Ordering::Acquire)
    }

    fn guard(&self, renderer: TileRenderer) -> PooledRenderer {
        PooledRenderer {
            renderer: Some(renderer),
            pool: Arc::clone(&self.inner),
        }
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("size", &self.size())
            .field("busy", &self.busy())
            .field("peak_busy", &self.peak_busy())
            .finish()
    }
}

/// Exclusive loan of one worker. Returns it to the pool on drop.
pub struct PooledRenderer {
    renderer: Option<TileRenderer>,
    pool: Arc<PoolInner>,
}

impl Deref for PooledRenderer {
    type Target = TileRenderer;

    fn deref(&self) -> &TileRenderer {
        // Only `None` inside `drop`.
        self.renderer.as_ref().unwrap_or_else(|| unreachable!())
    }
}

impl DerefMut for PooledRenderer {
    fn deref_mut(&mut self) -> &mut TileRenderer {
        self.renderer.as_mut().unwrap_or_else(|| unreachable!())
    }
}

impl Drop for PooledRenderer {
    fn drop(&mut self) {
        if let Some(renderer) = self.renderer.take() {
            self.pool.put_back(renderer);
        }
    }
}

impl std::fmt::Debug for PooledRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("PooledRenderer").field(&self.renderer).finish()
    }
}
