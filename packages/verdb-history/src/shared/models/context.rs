//! Per-query execution context
//!
//! Carries the cooperative cancellation flag and an optional deadline.
//! Iterators call [`QueryContext::checkpoint`] before producing each row.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::errors::{HistoryError, Result};

#[derive(Debug, Clone, Default)]
pub struct QueryContext {
    cancel_requested: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl QueryContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Handle that can cancel this query from another thread
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            cancel_requested: Arc::clone(&self.cancel_requested),
        }
    }

    pub fn cancel(&self) {
        self.cancel_requested.store(true, Ordering::Release);
    }

    pub fn is_cancel_requested(&self) -> bool {
        self.cancel_requested.load(Ordering::Acquire)
    }

    /// `Err(Cancelled)` / `Err(DeadlineExceeded)` once the query must stop
    pub fn checkpoint(&self) -> Result<()> {
        if self.is_cancel_requested() {
            return Err(HistoryError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(HistoryError::DeadlineExceeded),
            _ => Ok(()),
        }
    }
}

/// Cloneable cancel switch shared with a [`QueryContext`]
#[derive(Debug, Clone)]
pub struct CancelHandle {
    cancel_requested: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.cancel_requested.store(true, Ordering::Release);
    }
}
