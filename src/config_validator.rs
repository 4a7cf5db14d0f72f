use crate::config::Config;
use crate::error::ConfigError;

/// Validates configuration objects for consistency and correctness
pub struct ConfigValidator;

impl ConfigValidator {
    pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
        config.rate_limit_rule().validate()?;
        Self::validate_timeout(config.upstream_timeout_seconds)?;
        Self::validate_upstream_url(&config.openai_base_url)?;
        Self::validate_model(&config.openai_model)?;
        Self::validate_origins(&config.origins())?;
        Ok(())
    }

    /// Validates the upstream API root
    pub fn validate_upstream_url(url: &str) -> Result<(), ConfigError> {
        if url.trim().is_empty() {
            return Err(ConfigError("Upstream URL cannot be empty".to_string()));
        }

        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ConfigError(
                "Upstream URL must start with 'http://' or 'https://'".to_string(),
            ));
        }

        Ok(())
    }

    pub fn validate_model(model: &str) -> Result<(), ConfigError> {
        if model.trim().is_empty() {
            return Err(ConfigError("Model identifier cannot be empty".to_string()));
        }
        Ok(())
    }

    pub fn validate_timeout(seconds: u64) -> Result<(), ConfigError> {
        if seconds == 0 {
            return Err(ConfigError(
                "Upstream timeout must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Each origin is either `*` or a bare http(s) origin
    pub fn validate_origins(origins: &[&str]) -> Result<(), ConfigError> {
        for origin in origins {
            if *origin == "*" {
                continue;
            }
            let Some(rest) = origin
                .strip_prefix("http://")
                .or_else(|| origin.strip_prefix("https://"))
            else {
                return Err(ConfigError(format!(
                    "Invalid origin '{}': must start with 'http://' or 'https://'",
                    origin
                )));
            };
            if rest.is_empty() || rest.contains('/') {
                return Err(ConfigError(format!(
                    "Invalid origin '{}': expected scheme://host[:port]",
                    origin
                )));
            }
        }
        Ok(())
    }
}
