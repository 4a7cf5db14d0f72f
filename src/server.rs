use crate::config::Config;
use crate::error::ConfigError;
use crate::gateway::{CompletionGateway, OpenAiGateway, UnconfiguredGateway};
use crate::handlers::{create_affirmation, health_check, metrics, AppState, SharedState};
use crate::key_generator::ClientKeyResolver;
use crate::metrics::MetricsCollector;
use crate::middleware::logging_middleware;
use crate::rate_limiter::RateLimiter;
use crate::service::AffirmationService;
use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::{middleware, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Build the router around shared state
pub fn create_app(state: SharedState, cors: CorsLayer) -> Router {
    Router::new()
        .route("/api/affirmation", post(create_affirmation))
        .route("/health", get(health_check))
        .route("/metrics", get(metrics))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(middleware::from_fn(logging_middleware)),
        )
}

/// CORS policy for the configured origins. `*` opens it to any origin.
pub fn cors_layer(origins: &[&str]) -> Result<CorsLayer, ConfigError> {
    let allow_origin = if origins.contains(&"*") {
        AllowOrigin::from(Any)
    } else {
        let origins = origins
            .iter()
            .map(|origin| {
                HeaderValue::from_str(origin)
                    .map_err(|_| ConfigError(format!("Invalid origin '{}'", origin)))
            })
            .collect::<Result<Vec<_>, _>>()?;
        AllowOrigin::list(origins)
    };

    Ok(CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(false))
}

/// Pick the production gateway from configuration
pub fn gateway_from_config(config: &Config) -> Result<Arc<dyn CompletionGateway>, ConfigError> {
    match config.api_key() {
        Some(key) => {
            let gateway = OpenAiGateway::new(key, config.upstream_timeout())
                .map_err(|e| ConfigError(format!("Failed to build HTTP client: {}", e)))?
                .with_base_url(config.openai_base_url.as_str())
                .with_model(config.openai_model.as_str());
            Ok(Arc::new(gateway))
        }
        None => {
            tracing::warn!("OPENAI_API_KEY is not set. /api/affirmation will fail until configured.");
            Ok(Arc::new(UnconfiguredGateway))
        }
    }
}

pub struct Server {
    app: Router,
    bind_addr: SocketAddr,
    state: SharedState,
    cleanup_interval: Option<Duration>,
}

impl Server {
    pub fn new(config: Config) -> Result<Self, ConfigError> {
        let gateway = gateway_from_config(&config)?;
        Self::with_gateway(config, gateway)
    }

    pub fn with_gateway(
        config: Config,
        gateway: Arc<dyn CompletionGateway>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let service = AffirmationService::new(
            RateLimiter::new(config.rate_limit_rule()),
            gateway,
            config.upstream_timeout(),
            MetricsCollector::new(),
        );
        let state = AppState::new(service, ClientKeyResolver::new(config.key_strategy()));
        let app = create_app(state.clone(), cors_layer(&config.origins())?);

        Ok(Self {
            app,
            bind_addr: config.bind_addr,
            state,
            cleanup_interval: config.cleanup_interval(),
        })
    }

    pub fn router(&self) -> Router {
        self.app.clone()
    }

    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        let listener = tokio::net::TcpListener::bind(self.bind_addr).await?;

        tracing::info!("Affirmly server listening on {}", listener.local_addr()?);
        tracing::info!("Health check available at /health");

        if let Some(interval) = self.cleanup_interval {
            spawn_window_sweeper(self.state.service.rate_limiter().clone(), interval);
        }

        axum::serve(
            listener,
            self.app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await?;

        Ok(())
    }
}

/// Periodically drop expired rate-limit windows
pub fn spawn_window_sweeper(limiter: RateLimiter, every: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let evicted = limiter.evict_stale(Instant::now());
            if evicted > 0 {
                tracing::debug!(evicted, tracked = limiter.tracked_keys(), "evicted stale rate-limit windows");
            }
        }
    })
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        },
    }
}
