/// Sliding-window rate limiter keyed by caller identity.
///
/// Counts requests inside a moving time window rather than a fixed bucket
/// reset. Constructor-injected into the request handler; shared across
/// requests, which makes it the only cross-request mutable state in the
/// service.
use std::collections::VecDeque;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::config::RateLimitConfig;

pub struct SlidingWindowLimiter {
    enabled: bool,
    max_requests: usize,
    window: Duration,
    buckets: Mutex<FxHashMap<String, VecDeque<Instant>>>,
}

impl SlidingWindowLimiter {
    #[must_use]
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            enabled: config.enabled,
            max_requests: config.max_requests as usize,
            window: Duration::from_secs(config.window_secs),
            buckets: Mutex::new(FxHashMap::default()),
        }
    }

    /// Admit or reject one request for `key`. Admitted requests count
    /// against the window immediately.
    #[must_use]
    pub fn check(&self, key: &str) -> bool {
        self.check_at(key, Instant::now())
    }

    fn check_at(&self, key: &str, now: Instant) -> bool {
        if !self.enabled {
            return true;
        }

        let mut buckets = self.buckets.lock();
        // Prune every bucket, not just the caller's, and drop emptied
        // entries; otherwise each distinct spoofed identity would occupy
        // a map slot for the life of the process.
        buckets.retain(|_, bucket| {
            while let Some(oldest) = bucket.front() {
                if now.duration_since(*oldest) >= self.window {
                    bucket.pop_front();
                } else {
                    break;
                }
            }
            !bucket.is_empty()
        });

        let bucket = buckets.entry(key.to_string()).or_default();
        if bucket.len() >= self.max_requests {
            return false;
        }
        bucket.push_back(now);
        true
    }
}
