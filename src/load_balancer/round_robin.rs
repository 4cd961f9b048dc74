//! Round-robin scheduling with dead-backend skip.
//!
//! Each call claims a slot from a shared, monotonically increasing cursor
//! with a single `fetch_add`, so concurrent callers observe one global
//! sequence of cursor values. Dead backends are skipped by claiming further
//! slots; the scan covers the pool at most once and then gives up.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::load_balancer::backend::Backend;
use crate::load_balancer::pool::BackendPool;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchedulerError {
    #[error("no alive backend among {pool_size}")]
    NoBackendAvailable { pool_size: usize },
}

/// The outcome of one scheduling decision.
#[derive(Debug, Clone)]
pub struct Selection {
    pub backend: Arc<Backend>,
    /// Position of `backend` in the pool.
    pub index: usize,
    /// Cursor value claimed by this call's first slot.
    pub cursor: u64,
}

/// Round-robin selector over a fixed pool.
#[derive(Debug)]
pub struct Scheduler {
    pool: Arc<BackendPool>,
    cursor: AtomicU64,
}

impl Scheduler {
    pub fn new(pool: Arc<BackendPool>) -> Self {
        Self::with_cursor(pool, 0)
    }

    /// Start the rotation at an arbitrary cursor value.
    pub fn with_cursor(pool: Arc<BackendPool>, initial: u64) -> Self {
        Self {
            pool,
            cursor: AtomicU64::new(initial),
        }
    }

    pub fn pool(&self) -> &Arc<BackendPool> {
        &self.pool
    }

    /// Current cursor value (the next slot to be claimed).
    pub fn cursor(&self) -> u64 {
        self.cursor.load(Ordering::Relaxed)
    }

    /// Choose the next alive backend.
    pub fn next(&self) -> Result<Selection, SchedulerError> {
        let backends = self.pool.backends();
        let len = backends.len() as u64;

        let start = self.cursor.fetch_add(1, Ordering::Relaxed);
        for step in 0..len {
            if step > 0 {
                // Move the shared rotation past the dead slot as well, so the
                // next caller does not land on it again.
                self.cursor.fetch_add(1, Ordering::Relaxed);
            }
            // Index from our own start so every backend is visited once even
            // when other callers interleave their increments.
            let index = (start.wrapping_add(step) % len) as usize;
            let backend = &backends[index];
            if backend.is_alive() {
                return Ok(Selection {
                    backend: backend.clone(),
                    index,
                    cursor: start,
                });
            }
            tracing::trace!(index, backend = %backend.address(), "Skipping dead backend");
        }

        Err(SchedulerError::NoBackendAvailable {
            pool_size: backends.len(),
        })
    }
}
