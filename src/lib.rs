pub mod config;
pub mod config_validator;
pub mod error;
pub mod gateway;
pub mod handlers;
pub mod health;
pub mod key_generator;
pub mod metrics;
pub mod middleware;
pub mod model;
pub mod prompt;
pub mod rate_limit_config;
pub mod rate_limiter;
pub mod server;
pub mod service;
pub mod validation;

pub use config::Config;
pub use error::{AffirmError, ApiError, Result};
pub use model::{AffirmationRequest, AffirmationResponse};
pub use server::{create_app, Server};
