use axum::{
    body::Bytes,
    extract::{ConnectInfo, State},
    http::HeaderMap,
    response::IntoResponse,
    Json,
};
use std::net::SocketAddr;
use std::sync::Arc;

use crate::error::AffirmError;
use crate::health::{check_health, HealthStatus};
use crate::key_generator::ClientKeyResolver;
use crate::metrics::MetricsSnapshot;
use crate::model::AffirmationResponse;
use crate::service::AffirmationService;

/// Shared application state
pub type SharedState = Arc<AppState>;

/// Application state containing the affirmation pipeline and key resolver
pub struct AppState {
    pub service: AffirmationService,
    pub key_resolver: ClientKeyResolver,
}

impl AppState {
    pub fn new(service: AffirmationService, key_resolver: ClientKeyResolver) -> SharedState {
        Arc::new(Self {
            service,
            key_resolver,
        })
    }
}

/// Generate an affirmation
pub async fn create_affirmation(
    State(state): State<SharedState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<AffirmationResponse>, AffirmError> {
    let peer = connect_info.map(|ConnectInfo(addr)| addr);
    let client_key = state.key_resolver.resolve(&headers, peer);

    let response = state.service.handle(&client_key, &body).await?;
    Ok(Json(response))
}

/// Health check endpoint
pub async fn health_check() -> Json<HealthStatus> {
    Json(check_health())
}

/// Outcome counters
pub async fn metrics(State(state): State<SharedState>) -> impl IntoResponse {
    let snapshot: MetricsSnapshot = state.service.metrics().snapshot();
    Json(snapshot)
}
