use crate::config_validator::ConfigValidator;
use crate::error::ConfigError;
use crate::gateway::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use crate::key_generator::KeyStrategy;
use crate::rate_limit_config::RateLimitRule;
use clap::{ArgAction, Parser};
use std::net::SocketAddr;
use std::time::Duration;

/// Service configuration. Every option can be given as a flag or through
/// the environment variable named next to it.
#[derive(Debug, Clone, Parser)]
#[command(name = "affirmly", version, about = "Affirmation API backend")]
pub struct Config {
    /// Server bind address
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:8000")]
    pub bind_addr: SocketAddr,

    /// Credential for the completion API
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,

    /// Model identifier sent upstream
    #[arg(long, env = "OPENAI_MODEL", default_value = DEFAULT_MODEL)]
    pub openai_model: String,

    /// Root of the OpenAI-compatible API
    #[arg(long, env = "OPENAI_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub openai_base_url: String,

    /// Origins allowed for cross-origin requests, comma separated
    #[arg(
        long,
        env = "ALLOWED_ORIGINS",
        value_delimiter = ',',
        default_value = "http://localhost:3000"
    )]
    pub allowed_origins: Vec<String>,

    /// Requests admitted per client within one window
    #[arg(long, env = "RATE_LIMIT_MAX_REQUESTS", default_value_t = 10)]
    pub rate_limit_max_requests: u32,

    /// Rate limit window length in seconds
    #[arg(long, env = "RATE_LIMIT_WINDOW_SECONDS", default_value_t = 60)]
    pub rate_limit_window_seconds: u64,

    /// Upper bound on a single upstream call, in seconds
    #[arg(long, env = "UPSTREAM_TIMEOUT_SECONDS", default_value_t = 20)]
    pub upstream_timeout_seconds: u64,

    /// Derive client identity from X-Forwarded-For / X-Real-IP
    #[arg(long, env = "TRUST_FORWARDED_HEADERS", default_value_t = true, action = ArgAction::Set)]
    pub trust_forwarded_headers: bool,

    /// Interval for evicting expired rate-limit windows, 0 disables it
    #[arg(long, env = "CLEANUP_INTERVAL_SECONDS", default_value_t = 0)]
    pub cleanup_interval_seconds: u64,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8000)),
            openai_api_key: None,
            openai_model: DEFAULT_MODEL.to_string(),
            openai_base_url: DEFAULT_BASE_URL.to_string(),
            allowed_origins: vec!["http://localhost:3000".to_string()],
            rate_limit_max_requests: 10,
            rate_limit_window_seconds: 60,
            upstream_timeout_seconds: 20,
            trust_forwarded_headers: true,
            cleanup_interval_seconds: 0,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from command line arguments and environment variables
    pub fn from_env() -> Result<Self, clap::Error> {
        Config::try_parse()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        ConfigValidator::validate_config(self)
    }

    /// The credential, if one is set and not blank
    pub fn api_key(&self) -> Option<&str> {
        self.openai_api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }

    pub fn rate_limit_rule(&self) -> RateLimitRule {
        RateLimitRule::per_window_secs(self.rate_limit_max_requests, self.rate_limit_window_seconds)
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_seconds)
    }

    pub fn cleanup_interval(&self) -> Option<Duration> {
        (self.cleanup_interval_seconds > 0).then(|| Duration::from_secs(self.cleanup_interval_seconds))
    }

    pub fn key_strategy(&self) -> KeyStrategy {
        if self.trust_forwarded_headers {
            KeyStrategy::ForwardedHeaders
        } else {
            KeyStrategy::PeerAddress
        }
    }

    /// Allowed origins with blanks dropped
    pub fn origins(&self) -> Vec<&str> {
        self.allowed_origins
            .iter()
            .map(|origin| origin.trim())
            .filter(|origin| !origin.is_empty())
            .collect()
    }
}
