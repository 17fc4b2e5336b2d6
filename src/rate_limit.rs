//! Per-client rate limiter
//!
//! A fixed 60-second bucket per client identifier, not a sliding window: the
//! bucket restarts whenever the limiter next observes it expired. `allow` and
//! `record` are two separate observable steps; concurrent requests from the
//! same client may both read a stale count and both pass. That race exists in
//! the system this mirrors and is preserved here.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;

const WINDOW: Duration = Duration::from_secs(60);

struct Bucket {
    count: u32,
    window_start: Instant,
}

#[derive(Clone)]
pub struct RateLimiter {
    buckets: Arc<RwLock<HashMap<String, Bucket>>>,
    ceiling: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(ceiling: u32) -> Self {
        Self::with_window(ceiling, WINDOW)
    }

    fn with_window(ceiling: u32, window: Duration) -> Self {
        Self {
            buckets: Arc::new(RwLock::new(HashMap::new())),
            ceiling,
            window,
        }
    }

    /// Whether the client is currently under the ceiling. Expired or absent
    /// buckets always pass.
    pub fn allow(&self, client: &str) -> bool {
        let buckets = self.buckets.read();
        match buckets.get(client) {
            Some(bucket) if bucket.window_start.elapsed() < self.window => {
                bucket.count < self.ceiling
            }
            _ => true,
        }
    }

    /// Count one request against the client's current bucket, starting a new
    /// bucket if none is live
    pub fn record(&self, client: &str) {
        let mut buckets = self.buckets.write();
        let now = Instant::now();
        match buckets.get_mut(client) {
            Some(bucket) if now.duration_since(bucket.window_start) < self.window => {
                bucket.count += 1;
            }
            _ => {
                buckets.insert(
                    client.to_string(),
                    Bucket {
                        count: 1,
                        window_start: now,
                    },
                );
            }
        }
    }
}
