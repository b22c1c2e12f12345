//! Wave barrier: a one-shot join over the work dispatched for one wave
//!
//! The barrier is a task group. Each unit of work is spawned into it and
//! signals completion by finishing, whether it returns normally or panics, so
//! "every unit signals exactly once" does not depend on the unit's own code.
//! The orchestrator awaits the whole wave and receives one `WaveUnit` per
//! dispatched unit.

use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use tokio::task::JoinSet;

/// Completion record of one dispatched unit
#[derive(Debug)]
pub struct WaveUnit<T> {
    /// Key the unit was dispatched under (the URL)
    pub key: String,

    /// The unit's result, or `None` if it panicked
    pub output: Option<T>,
}

/// Join primitive for one wave
pub struct WaveBarrier<T> {
    tasks: JoinSet<WaveUnit<T>>,
    expected: usize,
    dispatched: usize,
}

impl<T: Send + 'static> WaveBarrier<T> {
    /// Creates a barrier expecting `expected` units
    pub fn new(expected: usize) -> Self {
        Self {
            tasks: JoinSet::new(),
            expected,
            dispatched: 0,
        }
    }

    /// Spawns one unit of work into the wave
    pub fn dispatch<F>(&mut self, key: String, work: F)
    where
        F: Future<Output = T> + Send + 'static,
    {
        debug_assert!(
            self.dispatched < self.expected,
            "dispatched more units than the barrier expects"
        );
        self.dispatched += 1;
        self.tasks.spawn(async move {
            let output = AssertUnwindSafe(work).catch_unwind().await.ok();
            WaveUnit { key, output }
        });
    }

    /// Number of units dispatched so far
    pub fn dispatched(&self) -> usize {
        self.dispatched
    }

    /// Number of units the barrier was created for
    pub fn expected(&self) -> usize {
        self.expected
    }

    /// Waits until every dispatched unit has signalled
    ///
    /// Returns immediately for a wave with no dispatched units. Units are
    /// returned in completion order.
    pub async fn await_wave(mut self) -> Vec<WaveUnit<T>> {
        let mut units = Vec::with_capacity(self.dispatched);
        if self.dispatched == 0 {
            return units;
        }

        while let Some(joined) = self.tasks.join_next().await {
            match joined {
                Ok(unit) => units.push(unit),
                // Panics are caught inside the task; only an aborted runtime lands here.
                Err(e) => tracing::error!("Wave unit did not complete: {}", e),
            }
        }
        units
    }
}
