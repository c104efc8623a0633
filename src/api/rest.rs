//! REST API router and configuration.

use std::sync::Arc;

use axum::{
    http::{header, Method},
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

use crate::agent::Agent;
use crate::api::handlers::{ask_handler, execute_handler, health_handler, metrics_handler, ApiState};

/// REST API configuration.
#[derive(Debug, Clone)]
pub struct RestApiConfig {
    /// Enable CORS.
    pub enable_cors: bool,
    /// API prefix (e.g., "/api/v1").
    pub prefix: String,
}

impl Default for RestApiConfig {
    fn default() -> Self {
        Self {
            enable_cors: true,
            prefix: "/api/v1".to_string(),
        }
    }
}

/// Create the REST API router.
///
/// Endpoints:
/// - POST /api/v1/ask      - Run the full pipeline for a question
/// - POST /api/v1/execute  - Validate and dispatch a pre-built query
/// - GET  /health          - Liveness probe
/// - GET  /metrics         - Prometheus metrics
pub fn create_rest_router(agent: Arc<Agent>, config: &RestApiConfig) -> Router {
    let state = Arc::new(ApiState::new(agent));

    let api_routes = Router::new()
        .route("/ask", post(ask_handler))
        .route("/execute", post(execute_handler))
        .with_state(state);

    let router = Router::new()
        .nest(&config.prefix, api_routes)
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler));

    if config.enable_cors {
        let cors = CorsLayer::new()
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE])
            .allow_origin(Any);

        router.layer(cors)
    } else {
        router
    }
}
