use crate::error::{AffirmError, Result};
use crate::gateway::{sanitize_completion, CompletionGateway};
use crate::metrics::MetricsCollector;
use crate::model::AffirmationResponse;
use crate::prompt::PromptBuilder;
use crate::rate_limiter::{RateDecision, RateLimiter};
use crate::validation::InputValidator;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Pipeline stage a request has reached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestStage {
    Received,
    RateChecked,
    Validated,
    PromptBuilt,
    Completed,
}

impl fmt::Display for RequestStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RequestStage::Received => "received",
            RequestStage::RateChecked => "rate_checked",
            RequestStage::Validated => "validated",
            RequestStage::PromptBuilt => "prompt_built",
            RequestStage::Completed => "completed",
        };
        f.write_str(name)
    }
}

/// Runs the admission pipeline and the upstream call for one request.
pub struct AffirmationService {
    rate_limiter: RateLimiter,
    gateway: Arc<dyn CompletionGateway>,
    upstream_timeout: Duration,
    metrics: MetricsCollector,
}

impl AffirmationService {
    pub fn new(
        rate_limiter: RateLimiter,
        gateway: Arc<dyn CompletionGateway>,
        upstream_timeout: Duration,
        metrics: MetricsCollector,
    ) -> Self {
        Self {
            rate_limiter,
            gateway,
            upstream_timeout,
            metrics,
        }
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    pub fn metrics(&self) -> &MetricsCollector {
        &self.metrics
    }

    /// Handle one request body from `client_key`. Rate limiting runs before the
    /// body is even decoded; no upstream call is made unless every check passes.
    pub async fn handle(&self, client_key: &str, body: &[u8]) -> Result<AffirmationResponse> {
        self.metrics.record_request();

        let mut stage = RequestStage::Received;
        let result = self.run(client_key, body, &mut stage).await;

        match &result {
            Ok(_) => self.metrics.record_completed(),
            Err(err) => {
                self.metrics.record_failure(err);
                debug!(client = %client_key, stage = %stage, error = %err, "request failed");
            }
        }
        result
    }

    async fn run(
        &self,
        client_key: &str,
        body: &[u8],
        stage: &mut RequestStage,
    ) -> Result<AffirmationResponse> {
        match self.rate_limiter.admit(client_key) {
            RateDecision::Allowed { remaining } => {
                debug!(client = %client_key, remaining, "request admitted");
            }
            RateDecision::Denied => {
                info!(client = %client_key, "rate limit exceeded");
                return Err(AffirmError::RateLimited);
            }
        }
        *stage = RequestStage::RateChecked;

        let raw = InputValidator::decode(body)?;
        let request = InputValidator::validate(&raw)?;
        *stage = RequestStage::Validated;

        let prompt = PromptBuilder::build(&request);
        *stage = RequestStage::PromptBuilt;

        let text = tokio::time::timeout(self.upstream_timeout, self.gateway.complete(&prompt))
            .await
            .map_err(|_| AffirmError::UpstreamTimeout(self.upstream_timeout))??;
        let affirmation = sanitize_completion(&text)?;
        *stage = RequestStage::Completed;

        info!(
            client = %client_key,
            language = prompt.language_code,
            chars = affirmation.chars().count(),
            "affirmation generated"
        );
        Ok(AffirmationResponse { affirmation })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UpstreamError;
    use crate::prompt::PromptPayload;
    use crate::rate_limit_config::RateLimitRule;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Instant;

    struct CountingGateway {
        reply: &'static str,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl CompletionGateway for CountingGateway {
        async fn complete(&self, prompt: &PromptPayload) -> std::result::Result<String, UpstreamError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert!(prompt.user_message.contains("Name:"));
            Ok(self.reply.to_string())
        }
    }

    struct StallingGateway;

    #[async_trait]
    impl CompletionGateway for StallingGateway {
        async fn complete(&self, _prompt: &PromptPayload) -> std::result::Result<String, UpstreamError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok("too late".to_string())
        }
    }

    fn service_with(
        gateway: Arc<dyn CompletionGateway>,
        max_requests: u32,
        timeout: Duration,
    ) -> AffirmationService {
        AffirmationService::new(
            RateLimiter::new(RateLimitRule::per_window_secs(max_requests, 60)),
            gateway,
            timeout,
            MetricsCollector::new(),
        )
    }

    fn counting(reply: &'static str) -> Arc<CountingGateway> {
        Arc::new(CountingGateway {
            reply,
            calls: AtomicUsize::new(0),
        })
    }

    const VALID: &[u8] = br#"{"name":"Alex","feeling":"anxious about my interview","language":"en"}"#;

    #[tokio::test]
    async fn test_successful_request() {
        let gateway = counting("  Alex, you are ready.\0  ");
        let service = service_with(gateway.clone(), 10, Duration::from_secs(5));

        let response = service.handle("client", VALID).await.unwrap();
        assert_eq!(response.affirmation, "Alex, you are ready.");
        assert_eq!(gateway.calls.load(Ordering::SeqCst), 1);
        assert_eq!(service.metrics().snapshot().completed, 1);
    }

    #[tokio::test]
    async fn test_invalid_input_never_reaches_gateway() {
        let gateway = counting("unused");
        let service = service_with(gateway.clone(), 10, Duration::from_secs(5));

        let err = service
            .handle("client", br#"{"name":"Alex","feeling":"sad"}"#)
            .await
            .unwrap_err();
        assert!(matches!(err, AffirmError::Validation(_)));
        assert_eq!(gateway.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_rate_limit_checked_before_validation() {
        let gateway = counting("ok, you are doing well");
        let service = service_with(gateway.clone(), 1, Duration::from_secs(5));

        let first = service.handle("client", b"garbage").await.unwrap_err();
        assert!(matches!(first, AffirmError::Validation(_)));

        let second = service.handle("client", VALID).await.unwrap_err();
        assert!(matches!(second, AffirmError::RateLimited));
        assert_eq!(gateway.calls.load(Ordering::SeqCst), 0);

        assert!(service.handle("other-client", VALID).await.is_ok());
    }

    #[tokio::test]
    async fn test_stalled_gateway_times_out() {
        let timeout = Duration::from_millis(100);
        let service = service_with(Arc::new(StallingGateway), 10, timeout);

        let started = Instant::now();
        let err = service.handle("client", VALID).await.unwrap_err();

        assert!(matches!(err, AffirmError::UpstreamTimeout(_)));
        assert!(started.elapsed() < timeout + Duration::from_secs(2));
        assert_eq!(service.metrics().snapshot().upstream_timeouts, 1);
    }

    #[tokio::test]
    async fn test_blank_completion_is_malformed() {
        let service = service_with(counting(" \0 "), 10, Duration::from_secs(5));
        let err = service.handle("client", VALID).await.unwrap_err();
        assert!(matches!(err, AffirmError::MalformedUpstreamResponse(_)));
    }

    #[test]
    fn test_stage_names() {
        assert_eq!(RequestStage::PromptBuilt.to_string(), "prompt_built");
        assert_eq!(RequestStage::Received.to_string(), "received");
    }
}
