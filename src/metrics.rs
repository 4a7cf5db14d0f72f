use crate::error::AffirmError;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub requests: u64,
    pub completed: u64,
    pub rate_limited: u64,
    pub validation_failed: u64,
    pub upstream_failed: u64,
    pub upstream_timeouts: u64,
    pub internal_errors: u64,
    pub since: u64,
}

#[derive(Debug, Default)]
struct Counters {
    requests: AtomicU64,
    completed: AtomicU64,
    rate_limited: AtomicU64,
    validation_failed: AtomicU64,
    upstream_failed: AtomicU64,
    upstream_timeouts: AtomicU64,
    internal_errors: AtomicU64,
}

/// Process-wide outcome counters for the affirmation endpoint
#[derive(Debug, Clone)]
pub struct MetricsCollector {
    counters: Arc<Counters>,
    since: u64,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            counters: Arc::new(Counters::default()),
            since: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs(),
        }
    }

    pub fn record_request(&self) {
        self.counters.requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_completed(&self) {
        self.counters.completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self, err: &AffirmError) {
        let counter = match err {
            AffirmError::Validation(_) => &self.counters.validation_failed,
            AffirmError::RateLimited => &self.counters.rate_limited,
            AffirmError::UpstreamTimeout(_) => &self.counters.upstream_timeouts,
            AffirmError::UpstreamFailure(_) | AffirmError::MalformedUpstreamResponse(_) => {
                &self.counters.upstream_failed
            }
            AffirmError::Internal(_) => &self.counters.internal_errors,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let c = &self.counters;
        MetricsSnapshot {
            requests: c.requests.load(Ordering::Relaxed),
            completed: c.completed.load(Ordering::Relaxed),
            rate_limited: c.rate_limited.load(Ordering::Relaxed),
            validation_failed: c.validation_failed.load(Ordering::Relaxed),
            upstream_failed: c.upstream_failed.load(Ordering::Relaxed),
            upstream_timeouts: c.upstream_timeouts.load(Ordering::Relaxed),
            internal_errors: c.internal_errors.load(Ordering::Relaxed),
            since: self.since,
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_failures_are_bucketed_by_kind() {
        let metrics = MetricsCollector::new();
        metrics.record_request();
        metrics.record_request();
        metrics.record_completed();
        metrics.record_failure(&AffirmError::RateLimited);
        metrics.record_failure(&AffirmError::Validation("x".to_string()));
        metrics.record_failure(&AffirmError::UpstreamTimeout(Duration::from_secs(1)));
        metrics.record_failure(&AffirmError::MalformedUpstreamResponse("x".to_string()));

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.requests, 2);
        assert_eq!(snapshot.completed, 1);
        assert_eq!(snapshot.rate_limited, 1);
        assert_eq!(snapshot.validation_failed, 1);
        assert_eq!(snapshot.upstream_timeouts, 1);
        assert_eq!(snapshot.upstream_failed, 1);
        assert_eq!(snapshot.internal_errors, 0);
    }

    #[test]
    fn test_clones_share_counters() {
        let metrics = MetricsCollector::new();
        metrics.clone().record_request();
        assert_eq!(metrics.snapshot().requests, 1);
    }
}
