//! services/api/src/web/rate_limit.rs
//!
//! Sliding-window limiter for login attempts.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

pub struct RateLimiter {
    limit: usize,
    window: Duration,
    inner: Mutex<Attempts>,
}

struct Attempts {
    hits: HashMap<String, Vec<Instant>>,
    last_sweep: Instant,
}

impl RateLimiter {
    pub fn new(limit: usize, window: Duration) -> Self {
        Self {
            limit,
            window,
            inner: Mutex::new(Attempts {
                hits: HashMap::new(),
                last_sweep: Instant::now(),
            }),
        }
    }

    /// Records an attempt for `key`. Returns false once the window is full.
    pub fn check(&self, key: &str) -> bool {
        self.check_at(key, Instant::now())
    }

    pub fn check_at(&self, key: &str, now: Instant) -> bool {
        let mut inner = self.lock();
        // Keys that stopped sending attempts are dropped at most once per window.
        if now.saturating_duration_since(inner.last_sweep) >= self.window {
            let window = self.window;
            inner.hits.retain(|_, entry| {
                entry.retain(|&at| now.saturating_duration_since(at) < window);
                !entry.is_empty()
            });
            inner.last_sweep = now;
        }

        let entry = inner.hits.entry(key.to_string()).or_default();
        entry.retain(|&at| now.saturating_duration_since(at) < self.window);
        if entry.len() >= self.limit {
            return false;
        }
        entry.push(now);
        true
    }

    pub fn reset(&self, key: &str) {
        self.lock().hits.remove(key);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Attempts> {
        // The map holds only timestamps; a poisoned guard is still usable.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
