//! Minimum-interval request throttle.
//!
//! Unauthenticated clients get 10 requests per minute. The throttle is
//! charged before every outbound call, so the call after a success, a
//! rate-limited attempt or a hard failure waits just the same.

use std::thread::sleep;
use std::time::{Duration, Instant};

/// 60s / 10 requests, plus a millisecond of margin.
pub const UNAUTHENTICATED_REQUEST_INTERVAL: Duration = Duration::from_millis(6_001);

#[derive(Debug, Clone)]
pub struct RequestThrottle {
    min_interval: Duration,
    last_request_at: Option<Instant>,
}

impl Default for RequestThrottle {
    fn default() -> Self {
        Self::new(UNAUTHENTICATED_REQUEST_INTERVAL)
    }
}

impl RequestThrottle {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_request_at: None,
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Block until `min_interval` has passed since the previous call, then
    /// record this call as the latest request.
    pub fn wait(&mut self) {
        if let Some(last) = self.last_request_at {
            let elapsed = last.elapsed();
            if elapsed < self.min_interval {
                let remaining = self.min_interval - elapsed;
                log::debug!("throttling next request for {} ms", remaining.as_millis());
                sleep(remaining);
            }
        }
        self.last_request_at = Some(Instant::now());
    }
}
