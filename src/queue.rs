//! Rate-limited dispatch queue for calls against one external target.
//!
//! Bounds how many operations run at once and enforces a minimum spacing
//! between the *starts* of consecutive dispatches. Order is FIFO. A failing
//! operation only fails its own caller; the queue keeps draining.
//!
//! Instances are constructed and injected wherever external fetches happen
//! (one per external target), never shared as module globals, so tests can
//! build a queue with tiny intervals.

use std::future::Future;
use std::time::Duration;
use tokio::sync::{Mutex, Semaphore};
use tokio::time::Instant;

pub struct RequestQueue {
    semaphore: Semaphore,
    /// Start time of the most recent dispatch. Held across the pacing sleep
    /// so dispatch starts are strictly serialized.
    last_dispatch: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl RequestQueue {
    /// A queue running at most `max_concurrent` operations at once, with at
    /// least `min_interval` between the starts of consecutive operations.
    pub fn new(max_concurrent: usize, min_interval: Duration) -> Self {
        Self {
            semaphore: Semaphore::new(max_concurrent.max(1)),
            last_dispatch: Mutex::new(None),
            min_interval,
        }
    }

    /// Run `op` subject to the queue's concurrency and pacing limits.
    ///
    /// Resolves with `op`'s own output, success or failure. Callers waiting
    /// here are admitted in arrival order.
    pub async fn enqueue<F, T>(&self, op: F) -> T
    where
        F: Future<Output = T>,
    {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .expect("request queue semaphore closed");
        self.pace().await;
        op.await
    }

    /// Sleep out the remainder of the interval since the previous dispatch,
    /// then claim the current instant as the new dispatch time.
    async fn pace(&self) {
        let mut last = self.last_dispatch.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.min_interval {
                let wait = self.min_interval - elapsed;
                tracing::debug!("queue pacing: waiting {:?}", wait);
                tokio::time::sleep(wait).await;
            }
        }
        *last = Some(Instant::now());
    }

    /// Number of operations that could start immediately.
    pub fn available_slots(&self) -> usize {
        self.semaphore.available_permits()
    }
}
