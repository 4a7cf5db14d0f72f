use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

pub const RATE_LIMITED_MESSAGE: &str = "Too many requests. Please try again shortly.";
pub const UPSTREAM_UNAVAILABLE_MESSAGE: &str =
    "Unable to generate an affirmation right now. Please try again.";
pub const INTERNAL_ERROR_MESSAGE: &str = "Unexpected server error.";

/// Failure kinds of the affirmation pipeline.
#[derive(Debug, Error)]
pub enum AffirmError {
    #[error("{0}")]
    Validation(String),

    #[error("rate limit exceeded")]
    RateLimited,

    #[error("upstream did not respond within {0:?}")]
    UpstreamTimeout(Duration),

    #[error("upstream request failed: {0}")]
    UpstreamFailure(#[source] UpstreamError),

    #[error("upstream returned an unusable response: {0}")]
    MalformedUpstreamResponse(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<UpstreamError> for AffirmError {
    fn from(err: UpstreamError) -> Self {
        match err {
            UpstreamError::Malformed(detail) => AffirmError::MalformedUpstreamResponse(detail),
            UpstreamError::NotConfigured => {
                AffirmError::Internal("completion gateway has no credential".to_string())
            }
            other => AffirmError::UpstreamFailure(other),
        }
    }
}

/// Errors raised by a completion gateway.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("upstream answered {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed upstream payload: {0}")]
    Malformed(String),

    #[error("completion gateway is not configured")]
    NotConfigured,
}

#[derive(Debug, Error)]
#[error("configuration error: {0}")]
pub struct ConfigError(pub String);

/// Externally visible error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    Validation,
    RateLimited,
    UpstreamTimeout,
    UpstreamFailure,
    Internal,
}

impl ErrorKind {
    pub fn status(self) -> StatusCode {
        match self {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ErrorKind::UpstreamTimeout => StatusCode::GATEWAY_TIMEOUT,
            ErrorKind::UpstreamFailure => StatusCode::BAD_GATEWAY,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Leak-free error body returned to callers.
#[derive(Debug, Clone, Serialize)]
pub struct ApiError {
    #[serde(rename = "error")]
    pub kind: ErrorKind,
    pub message: String,
}

impl ApiError {
    fn new(kind: ErrorKind, message: &str) -> Self {
        Self {
            kind,
            message: message.to_string(),
        }
    }

    /// Map a pipeline failure to its external shape. Only validation messages
    /// pass through; every other kind gets a fixed text.
    pub fn from_failure(err: &AffirmError) -> Self {
        match err {
            AffirmError::Validation(msg) => Self::new(ErrorKind::Validation, msg),
            AffirmError::RateLimited => Self::new(ErrorKind::RateLimited, RATE_LIMITED_MESSAGE),
            AffirmError::UpstreamTimeout(_) => {
                Self::new(ErrorKind::UpstreamTimeout, UPSTREAM_UNAVAILABLE_MESSAGE)
            }
            AffirmError::UpstreamFailure(_) | AffirmError::MalformedUpstreamResponse(_) => {
                Self::new(ErrorKind::UpstreamFailure, UPSTREAM_UNAVAILABLE_MESSAGE)
            }
            AffirmError::Internal(_) => Self::new(ErrorKind::Internal, INTERNAL_ERROR_MESSAGE),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.kind.status()
    }
}

impl From<&AffirmError> for ApiError {
    fn from(err: &AffirmError) -> Self {
        ApiError::from_failure(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

impl IntoResponse for AffirmError {
    fn into_response(self) -> Response {
        match &self {
            AffirmError::Validation(_) | AffirmError::RateLimited => {
                tracing::debug!(error = %self, "request rejected");
            }
            AffirmError::UpstreamTimeout(_)
            | AffirmError::UpstreamFailure(_)
            | AffirmError::MalformedUpstreamResponse(_) => {
                tracing::warn!(error = %self, "upstream generation failed");
            }
            AffirmError::Internal(_) => {
                tracing::error!(error = %self, "internal error while handling request");
            }
        }
        ApiError::from_failure(&self).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AffirmError>;
