//! Concurrency and throughput limiter
//!
//! A [`RateLimiter`] admits a future once two conditions hold: fewer than
//! `max_concurrent` admitted futures are still running, and at least
//! `min_interval` has passed since the previous admission. Waiters are admitted
//! in FIFO order because both the semaphore and the pacing mutex are fair.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, Semaphore};
use tokio::time::{Instant, sleep_until};

/// Shared handle to a concurrency- and start-rate-capped executor
///
/// Clones share the same limits.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    permits: Semaphore,
    max_concurrent: usize,
    min_interval: Duration,
    last_start: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// Creates a limiter allowing `max_concurrent` running tasks whose starts
    /// are at least `min_interval` apart
    pub fn new(max_concurrent: usize, min_interval: Duration) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            inner: Arc::new(Inner {
                permits: Semaphore::new(max_concurrent),
                max_concurrent,
                min_interval,
                last_start: Mutex::new(None),
            }),
        }
    }

    /// Creates a limiter that only bounds concurrency
    pub fn concurrency(max_concurrent: usize) -> Self {
        Self::new(max_concurrent, Duration::ZERO)
    }

    /// Runs `task` once admitted and returns its output unchanged
    pub async fn execute<F, T>(&self, task: F) -> T
    where
        F: Future<Output = T>,
    {
        // The semaphore is never closed, so a permit is always granted.
        let _permit = self.inner.permits.acquire().await.ok();
        self.wait_for_start_slot().await;
        task.await
    }

    /// Number of admitted tasks that have not finished yet
    pub fn in_flight(&self) -> usize {
        self.inner.max_concurrent - self.inner.permits.available_permits()
    }

    pub fn max_concurrent(&self) -> usize {
        self.inner.max_concurrent
    }

    pub fn min_interval(&self) -> Duration {
        self.inner.min_interval
    }

    async fn wait_for_start_slot(&self) {
        if self.inner.min_interval.is_zero() {
            return;
        }

        // Held across the sleep so the next waiter measures from our start.
        let mut last_start = self.inner.last_start.lock().await;
        if let Some(previous) = *last_start {
            sleep_until(previous + self.inner.min_interval).await;
        }
        *last_start = Some(Instant::now());
    }
}
