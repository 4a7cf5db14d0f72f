use crate::error::ConfigError;
use std::time::Duration;

/// Fixed-window limit applied to every client key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitRule {
    pub max_requests: u32,
    pub window: Duration,
}

impl Default for RateLimitRule {
    fn default() -> Self {
        Self {
            max_requests: 10,
            window: Duration::from_secs(60),
        }
    }
}

impl RateLimitRule {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
        }
    }

    pub fn per_window_secs(max_requests: u32, window_secs: u64) -> Self {
        Self::new(max_requests, Duration::from_secs(window_secs))
    }

    /// Validate rule parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_requests == 0 {
            return Err(ConfigError(
                "Rate limit max requests must be greater than 0".to_string(),
            ));
        }
        if self.window.is_zero() {
            return Err(ConfigError(
                "Rate limit window must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}
