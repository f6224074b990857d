//! Per-key fixed-window rate limiting
//!
//! Windows live in process memory only; separate instances do not share
//! counts.

use dashmap::DashMap;
use std::time::{Duration, Instant};

struct Window {
    started: Instant,
    count: u32,
}

/// Allows `max` hits per key in each window of `period`
pub struct RateLimiter {
    windows: DashMap<String, Window>,
    max: u32,
    period: Duration,
}

impl RateLimiter {
    pub fn new(max: u32, period: Duration) -> Self {
        Self {
            windows: DashMap::new(),
            max,
            period,
        }
    }

    pub fn per_minute(max: u32) -> Self {
        Self::new(max, Duration::from_secs(60))
    }

    pub fn per_hour(max: u32) -> Self {
        Self::new(max, Duration::from_secs(60 * 60))
    }

    /// Record a hit for `key`. Returns `false` once the window is used up.
    pub fn check(&self, key: &str) -> bool {
        self.check_at(key, Instant::now())
    }

    fn check_at(&self, key: &str, now: Instant) -> bool {
        let mut window = self.windows.entry(key.to_string()).or_insert(Window {
            started: now,
            count: 0,
        });

        if now.duration_since(window.started) >= self.period {
            window.started = now;
            window.count = 0;
        }

        if window.count >= self.max {
            return false;
        }
        window.count += 1;
        true
    }

    /// Drop windows that have fully expired
    pub fn prune(&self) {
        let now = Instant::now();
        self.windows
            .retain(|_, w| now.duration_since(w.started) < self.period);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allows_up_to_max_then_blocks() {
        let limiter = RateLimiter::per_minute(3);
        assert!(limiter.check("alice"));
        assert!(limiter.check("alice"));
        assert!(limiter.check("alice"));
        assert!(!limiter.check("alice"));
        assert!(!limiter.check("alice"));
    }

    #[test]
    fn test_keys_are_independent() {
        let limiter = RateLimiter::per_hour(1);
        assert!(limiter.check("alice"));
        assert!(!limiter.check("alice"));
        assert!(limiter.check("bob"));
    }

    #[test]
    fn test_window_resets() {
        let limiter = RateLimiter::new(1, Duration::from_secs(10));
        let start = Instant::now();
        assert!(limiter.check_at("k", start));
        assert!(!limiter.check_at("k", start + Duration::from_secs(5)));
        assert!(limiter.check_at("k", start + Duration::from_secs(10)));
    }

    #[test]
    fn test_prune_removes_expired() {
        let limiter = RateLimiter::new(5, Duration::from_millis(1));
        limiter.check("k");
        std::thread::sleep(Duration::from_millis(5));
        limiter.prune();
        assert!(limiter.windows.is_empty());
    }
}
