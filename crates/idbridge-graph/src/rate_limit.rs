//! Outbound rate limiting for the directory API
//!
//! A single token-bucket limiter shared by every caller of the directory
//! client. It enforces a configurable maximum request rate irrespective of
//! server-side throttling, so bulk operations cannot trigger self-inflicted
//! 429 storms.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::debug;

/// Mutable bucket state, protected by a Mutex
#[derive(Debug)]
struct LimiterInner {
    /// Current number of available permits (fractional for smooth refill)
    tokens: f64,
    /// Timestamp of the last refill calculation
    last_refill: Instant,
}

/// Token-bucket request limiter
///
/// Permits are consumed per request and refilled at a constant rate. The
/// bucket starts full, so short bursts up to `capacity` pass without
/// waiting; sustained traffic is held to `refill_rate` requests per second.
#[derive(Debug)]
pub struct RequestLimiter {
    capacity: u32,
    refill_rate: f64,
    inner: Mutex<LimiterInner>,
}

impl RequestLimiter {
    /// Creates a limiter with the given burst capacity and refill rate
    /// (requests per second)
    pub fn new(capacity: u32, refill_rate: f64) -> Self {
        Self {
            capacity,
            refill_rate,
            inner: Mutex::new(LimiterInner {
                tokens: capacity as f64,
                last_refill: Instant::now(),
            }),
        }
    }

    /// Refills the bucket based on elapsed time since the last refill
    fn refill(inner: &mut LimiterInner, refill_rate: f64, capacity: u32) {
        let elapsed = inner.last_refill.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            inner.tokens = (inner.tokens + elapsed * refill_rate).min(capacity as f64);
            inner.last_refill = Instant::now();
        }
    }

    /// Attempts to take one permit without waiting
    pub fn try_acquire(&self) -> bool {
        let mut inner = self.inner.lock().unwrap();
        Self::refill(&mut inner, self.refill_rate, self.capacity);

        if inner.tokens >= 1.0 {
            inner.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Estimated wait until a permit becomes available
    pub fn time_until_available(&self) -> Duration {
        let mut inner = self.inner.lock().unwrap();
        Self::refill(&mut inner, self.refill_rate, self.capacity);

        if inner.tokens >= 1.0 || self.refill_rate <= 0.0 {
            Duration::ZERO
        } else {
            Duration::from_secs_f64((1.0 - inner.tokens) / self.refill_rate)
        }
    }

    /// Takes one permit, sleeping until one is available
    ///
    /// The critical section covers only the bucket arithmetic; the sleep
    /// happens outside the lock.
    pub async fn acquire(&self) {
        loop {
            if self.try_acquire() {
                return;
            }
            let wait = self
                .time_until_available()
                .max(Duration::from_millis(10));
            debug!(wait_ms = wait.as_millis() as u64, "Rate limiter waiting for permit");
            tokio::time::sleep(wait).await;
        }
    }
}
