//! In-memory fixed-window rate limiter keyed by client identity.
//!
//! Windows live in a sharded `DashMap`, so keys on different shards never
//! contend. The map is process-local: counters reset on restart and are not
//! shared between instances. Windows are never removed unless
//! [`RateLimiter::evict_stale`] is called, so the map grows with the number of
//! distinct client keys seen.
//!
//! With the default configuration client keys come from `X-Forwarded-For`
//! and the sweep is off. A caller that rotates that header gets a fresh window
//! for every value, which both sidesteps the limit and grows the map without
//! bound. Deployments not behind a trusted proxy should set
//! `TRUST_FORWARDED_HEADERS=false` and a non-zero `CLEANUP_INTERVAL_SECONDS`.

use crate::rate_limit_config::RateLimitRule;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Instant;

/// Counter state for one client key.
#[derive(Debug, Clone, Copy)]
struct RateLimitWindow {
    window_start: Instant,
    count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed { remaining: u32 },
    Denied,
}

impl RateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateDecision::Allowed { .. })
    }
}

#[derive(Clone)]
pub struct RateLimiter {
    rule: RateLimitRule,
    windows: Arc<DashMap<String, RateLimitWindow>>,
}

impl RateLimiter {
    pub fn new(rule: RateLimitRule) -> Self {
        Self {
            rule,
            windows: Arc::new(DashMap::new()),
        }
    }

    pub fn rule(&self) -> RateLimitRule {
        self.rule
    }

    /// Admit or deny a request from `key` at the current instant.
    pub fn admit(&self, key: &str) -> RateDecision {
        self.admit_at(key, Instant::now())
    }

    /// Admit or deny a request from `key` at `now`.
    ///
    /// The shard entry stays locked from lookup to comparison, so concurrent
    /// callers on one key are serialized. A denied request still counts
    /// toward the window.
    pub fn admit_at(&self, key: &str, now: Instant) -> RateDecision {
        let mut window = self
            .windows
            .entry(key.to_owned())
            .or_insert_with(|| RateLimitWindow {
                window_start: now,
                count: 0,
            });

        if now.saturating_duration_since(window.window_start) >= self.rule.window {
            window.window_start = now;
            window.count = 0;
        }

        window.count = window.count.saturating_add(1);

        if window.count > self.rule.max_requests {
            RateDecision::Denied
        } else {
            RateDecision::Allowed {
                remaining: self.rule.max_requests - window.count,
            }
        }
    }

    /// Remove windows whose period has fully elapsed. Their next request would
    /// reset them anyway, so eviction never changes a decision.
    pub fn evict_stale(&self, now: Instant) -> usize {
        let before = self.windows.len();
        self.windows
            .retain(|_, window| now.saturating_duration_since(window.window_start) < self.rule.window);
        before.saturating_sub(self.windows.len())
    }

    /// Number of client keys currently tracked.
    pub fn tracked_keys(&self) -> usize {
        self.windows.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;
    use std::thread;
    use std::time::Duration;

    fn limiter(max_requests: u32, window_secs: u64) -> RateLimiter {
        RateLimiter::new(RateLimitRule::per_window_secs(max_requests, window_secs))
    }

    #[test]
    fn test_first_request_is_allowed() {
        let limiter = limiter(1, 60);
        assert_eq!(limiter.admit("10.0.0.1"), RateDecision::Allowed { remaining: 0 });
    }

    #[test]
    fn test_request_after_limit_is_denied() {
        let limiter = limiter(3, 60);
        let start = Instant::now();

        for expected_remaining in [2, 1, 0] {
            assert_eq!(
                limiter.admit_at("client", start),
                RateDecision::Allowed { remaining: expected_remaining }
            );
        }
        assert_eq!(limiter.admit_at("client", start + Duration::from_secs(59)), RateDecision::Denied);
    }

    #[test]
    fn test_window_elapsed_allows_again() {
        let limiter = limiter(2, 60);
        let start = Instant::now();

        assert!(limiter.admit_at("client", start).is_allowed());
        assert!(limiter.admit_at("client", start).is_allowed());
        assert!(!limiter.admit_at("client", start + Duration::from_secs(30)).is_allowed());
        assert!(limiter.admit_at("client", start + Duration::from_secs(60)).is_allowed());
    }

    #[test]
    fn test_denied_requests_consume_slots() {
        let limiter = limiter(1, 60);
        let start = Instant::now();

        assert!(limiter.admit_at("client", start).is_allowed());
        for i in 1..5 {
            assert!(!limiter.admit_at("client", start + Duration::from_secs(i)).is_allowed());
        }
        // The window is anchored at the first request, not the last denial.
        assert!(limiter.admit_at("client", start + Duration::from_secs(60)).is_allowed());
    }

    #[test]
    fn test_keys_are_independent() {
        let limiter = limiter(1, 60);
        let now = Instant::now();

        assert!(limiter.admit_at("a", now).is_allowed());
        assert!(!limiter.admit_at("a", now).is_allowed());
        assert!(limiter.admit_at("b", now).is_allowed());
        assert_eq!(limiter.tracked_keys(), 2);
    }

    #[test]
    fn test_concurrent_first_requests_admit_exactly_one() {
        let limiter = limiter(1, 60);

        for round in 0..200 {
            let key = format!("fresh-{}", round);
            let barrier = Arc::new(Barrier::new(2));

            let handles: Vec<_> = (0..2)
                .map(|_| {
                    let limiter = limiter.clone();
                    let barrier = Arc::clone(&barrier);
                    let key = key.clone();
                    thread::spawn(move || {
                        barrier.wait();
                        limiter.admit(&key)
                    })
                })
                .collect();

            let allowed = handles
                .into_iter()
                .map(|handle| handle.join().unwrap())
                .filter(RateDecision::is_allowed)
                .count();
            assert_eq!(allowed, 1, "round {}", round);
        }
    }

    #[test]
    fn test_evict_stale_keeps_live_windows() {
        let limiter = limiter(5, 60);
        let start = Instant::now();

        limiter.admit_at("old", start);
        limiter.admit_at("new", start + Duration::from_secs(30));

        assert_eq!(limiter.evict_stale(start + Duration::from_secs(61)), 1);
        assert_eq!(limiter.tracked_keys(), 1);
        assert_eq!(
            limiter.admit_at("new", start + Duration::from_secs(61)),
            RateDecision::Allowed { remaining: 3 }
        );
    }
}
