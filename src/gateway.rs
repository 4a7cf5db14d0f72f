//! Completion gateways: the boundary to the external text-generation service.

use crate::error::UpstreamError;
use crate::prompt::PromptPayload;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
const TEMPERATURE: f32 = 0.7;
const MAX_OUTPUT_TOKENS: u32 = 180;
/// Upstream error bodies kept for logging are cut to this many chars
pub const ERROR_BODY_MAX_CHARS: usize = 300;

#[async_trait]
pub trait CompletionGateway: Send + Sync {
    /// Generate raw text for a prompt. Callers bound this with their own
    /// timeout and pass the result through [`sanitize_completion`].
    async fn complete(&self, prompt: &PromptPayload) -> Result<String, UpstreamError>;
}

/// OpenAI-compatible chat completions client
pub struct OpenAiGateway {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiGateway {
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Result<Self, UpstreamError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
        })
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn request_body<'a>(&'a self, prompt: &'a PromptPayload) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            temperature: TEMPERATURE,
            max_tokens: MAX_OUTPUT_TOKENS,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &prompt.system_instruction,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt.user_message,
                },
            ],
        }
    }
}

#[async_trait]
impl CompletionGateway for OpenAiGateway {
    async fn complete(&self, prompt: &PromptPayload) -> Result<String, UpstreamError> {
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&self.request_body(prompt))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                body: truncate_error_body(&body),
            });
        }

        let completion: ChatResponse = response
            .json()
            .await
            .map_err(|e| UpstreamError::Malformed(e.to_string()))?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| UpstreamError::Malformed("response has no message content".to_string()))
    }
}

/// Used when no upstream credential is configured; every call fails.
pub struct UnconfiguredGateway;

#[async_trait]
impl CompletionGateway for UnconfiguredGateway {
    async fn complete(&self, _prompt: &PromptPayload) -> Result<String, UpstreamError> {
        Err(UpstreamError::NotConfigured)
    }
}

fn truncate_error_body(body: &str) -> String {
    match body.char_indices().nth(ERROR_BODY_MAX_CHARS) {
        Some((end, _)) => format!("{}...", &body[..end]),
        None => body.to_string(),
    }
}

/// Strips NUL characters and surrounding whitespace; empty output is unusable.
pub fn sanitize_completion(text: &str) -> Result<String, UpstreamError> {
    let cleaned = text.replace('\0', "");
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return Err(UpstreamError::Malformed("empty completion".to_string()));
    }
    Ok(cleaned.to_string())
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    max_tokens: u32,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prompt() -> PromptPayload {
        PromptPayload {
            system_instruction: "be kind".to_string(),
            user_message: "Name: Alex".to_string(),
            language_code: "en",
        }
    }

    #[test]
    fn test_builder_defaults() {
        let gateway = OpenAiGateway::new("sk-test", Duration::from_secs(5)).unwrap();
        assert_eq!(gateway.base_url, DEFAULT_BASE_URL);
        assert_eq!(gateway.model(), DEFAULT_MODEL);
    }

    #[test]
    fn test_with_base_url_strips_trailing_slash() {
        let gateway = OpenAiGateway::new("sk-test", Duration::from_secs(5))
            .unwrap()
            .with_base_url("http://localhost:9999/v1/")
            .with_model("gpt-4o");
        assert_eq!(gateway.base_url, "http://localhost:9999/v1");
        assert_eq!(gateway.model(), "gpt-4o");
    }

    #[test]
    fn test_request_body_shape() {
        let gateway = OpenAiGateway::new("sk-test", Duration::from_secs(5)).unwrap();
        let prompt = prompt();
        let body = serde_json::to_value(gateway.request_body(&prompt)).unwrap();

        assert_eq!(body["model"], DEFAULT_MODEL);
        assert_eq!(body["max_tokens"], 180);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], "be kind");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["messages"][1]["content"], "Name: Alex");
    }

    #[test]
    fn test_sanitize_completion() {
        assert_eq!(sanitize_completion("  You are enough.\0 ").unwrap(), "You are enough.");
        assert!(matches!(sanitize_completion(" \0 \n"), Err(UpstreamError::Malformed(_))));
    }

    #[test]
    fn test_truncate_error_body() {
        assert_eq!(truncate_error_body("overloaded"), "overloaded");

        let huge = "é".repeat(ERROR_BODY_MAX_CHARS * 10);
        let cut = truncate_error_body(&huge);
        assert_eq!(cut.chars().count(), ERROR_BODY_MAX_CHARS + 3);
        assert!(cut.ends_with("..."));
    }

    #[tokio::test]
    async fn test_unconfigured_gateway_always_fails() {
        let result = UnconfiguredGateway.complete(&prompt()).await;
        assert!(matches!(result, Err(UpstreamError::NotConfigured)));
    }
}
