//! Hourly token bucket shared by every outbound call
//!
//! Each acquired token is held for the length of the window and then
//! returned, so at most `capacity` calls start within any window.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::{sleep, Instant};

use crate::metrics;

/// One hour, the window Podio quotas are expressed in
pub const HOUR: Duration = Duration::from_secs(3600);

/// Token bucket rate limiter
#[derive(Clone, Debug)]
pub struct RateLimiter {
    capacity: usize,
    semaphore: Arc<Semaphore>,
    window: Duration,
}

impl RateLimiter {
    /// Create a limiter granting `capacity` tokens per `window`
    pub fn new(capacity: usize, window: Duration) -> Self {
        Self {
            capacity,
            semaphore: Arc::new(Semaphore::new(capacity)),
            window,
        }
    }

    /// Create a limiter granting `capacity` tokens per hour
    pub fn per_hour(capacity: usize) -> Self {
        Self::new(capacity, HOUR)
    }

    /// Tokens per window
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Refill window
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Tokens that can be acquired right now without waiting
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Wait until `tokens` tokens are available and take them
    ///
    /// Tokens are returned to the bucket one window after acquisition.
    pub async fn acquire(&self, tokens: usize) -> Result<(), RateLimitError> {
        if tokens > self.capacity {
            return Err(RateLimitError::ExceedsCapacity {
                requested: tokens,
                capacity: self.capacity,
            });
        }

        let started = Instant::now();
        let permit = self
            .semaphore
            .clone()
            .acquire_many_owned(tokens as u32)
            .await
            .map_err(|e| RateLimitError::AcquireError(e.to_string()))?;

        metrics::record_rate_limit_wait(started.elapsed(), self.available());

        // Hold the tokens for the window, then release them
        let window = self.window;
        tokio::spawn(async move {
            sleep(window).await;
            drop(permit);
        });

        Ok(())
    }
}

/// Rate limiter errors
#[derive(Debug, thiserror::Error)]
pub enum RateLimitError {
    /// Failed to acquire permits
    #[error("failed to acquire rate limit permits: {0}")]
    AcquireError(String),

    /// More tokens requested than the bucket can ever hold
    #[error("requested {requested} tokens but the bucket holds {capacity}")]
    ExceedsCapacity {
        /// Tokens requested
        requested: usize,
        /// Bucket capacity
        capacity: usize,
    },
}
