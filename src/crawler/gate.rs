//! Counting admission gate
//!
//! Two independent gates exist at runtime: one bounding concurrently active
//! seed jobs, and one per job bounding its in-flight fetches. A permit is
//! released when its `GatePermit` is dropped, so every exit path of the
//! holder (success, error, panic, cancellation) gives the permit back.

use crate::CrawlError;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Bounded-permit admission control
///
/// Waiters are admitted in FIFO order (tokio's semaphore is fair).
#[derive(Debug, Clone)]
pub struct ConcurrencyGate {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

/// A held admission permit, released on drop
#[derive(Debug)]
pub struct GatePermit {
    _permit: OwnedSemaphorePermit,
}

impl ConcurrencyGate {
    /// Creates a gate admitting at most `capacity` holders at once
    ///
    /// A capacity of 0 is raised to 1 so the gate can never deadlock its users.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Suspends until a permit is available
    ///
    /// # Errors
    ///
    /// Returns `CrawlError::GateClosed` if the underlying semaphore was closed.
    pub async fn acquire(&self) -> Result<GatePermit, CrawlError> {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| CrawlError::GateClosed)?;
        Ok(GatePermit { _permit: permit })
    }

    /// Total number of permits
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Permits not currently held
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Permits currently held
    pub fn in_use(&self) -> usize {
        self.capacity - self.available()
    }
}
