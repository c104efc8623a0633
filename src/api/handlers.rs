//! REST API request handlers.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::agent::Agent;
use crate::pipeline::{CandidateQuery, Row, ValidatedQuery};

/// Application state shared across handlers.
pub struct ApiState {
    /// The fully wired pipeline.
    pub agent: Arc<Agent>,
}

impl ApiState {
    /// Create new API state.
    pub fn new(agent: Arc<Agent>) -> Self {
        Self { agent }
    }
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Ask request: one natural-language question.
#[derive(Debug, Clone, Deserialize)]
pub struct AskRequest {
    pub question: String,
}

/// Execute request: a pre-built query submitted for gated execution.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecuteRequest {
    #[serde(default)]
    pub query_type: Option<String>,
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub params: Option<Map<String, Value>>,
}

/// Execute response. `results` is set on success, `message` on error.
#[derive(Debug, Clone, Serialize)]
pub struct ExecuteResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<Row>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ExecuteResponse {
    fn success(results: Vec<Row>) -> Self {
        Self {
            status: "success".to_string(),
            results: Some(results),
            message: None,
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            results: None,
            message: Some(message.into()),
        }
    }
}

/// Error response.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

// ============================================================================
// Handler Functions
// ============================================================================

/// POST /api/v1/ask - Run the full pipeline for a question.
pub async fn ask_handler(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<AskRequest>,
) -> impl IntoResponse {
    if request.question.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "Campo obrigatório ausente: question".to_string(),
                code: "missing_field".to_string(),
            }),
        )
            .into_response();
    }

    let report = state.agent.process(&request.question).await;
    (StatusCode::OK, Json(report)).into_response()
}

/// POST /api/v1/execute - Validate and dispatch a pre-built query.
///
/// Skips the language stages entirely; the safety validator still gates
/// every submission, and rejections return 403 with the policy reason.
pub async fn execute_handler(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<ExecuteRequest>,
) -> impl IntoResponse {
    let Some(query_type) = request.query_type.as_deref() else {
        return missing_field("query_type");
    };
    let Some(query) = request.query.as_deref() else {
        return missing_field("query");
    };

    let candidate = match query_type {
        "sql" => CandidateQuery::sql(query),
        "api" => CandidateQuery::api(query, request.params.unwrap_or_default()),
        other => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ExecuteResponse::error(format!(
                    "Tipo de consulta não suportado: {other}"
                ))),
            )
                .into_response();
        }
    };

    let verdict = state.agent.validator().validate(&candidate);
    if !verdict.accepted {
        crate::metrics::get_metrics().rejections_total.inc();
        return (
            StatusCode::FORBIDDEN,
            Json(ExecuteResponse::error(format!(
                "Consulta rejeitada por segurança: {}",
                verdict.reason
            ))),
        )
            .into_response();
    }
    let validated = match ValidatedQuery::new(candidate, &verdict) {
        Ok(validated) => validated,
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ExecuteResponse::error(e.to_string())),
            )
                .into_response();
        }
    };

    let envelope = state.agent.execute_validated(validated).await;
    match (envelope.rows, envelope.error) {
        (Some(rows), None) => {
            (StatusCode::OK, Json(ExecuteResponse::success(rows))).into_response()
        }
        (_, Some(cause)) => (
            StatusCode::OK,
            Json(ExecuteResponse::error(cause)),
        )
            .into_response(),
        (None, None) => (
            StatusCode::OK,
            Json(ExecuteResponse::success(Vec::new())),
        )
            .into_response(),
    }
}

fn missing_field(name: &str) -> axum::response::Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ExecuteResponse::error(format!(
            "Campo obrigatório ausente: {name}"
        ))),
    )
        .into_response()
}

/// GET /health - Liveness probe.
pub async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "healthy" }))
}

/// GET /metrics - Prometheus text exposition.
pub async fn metrics_handler() -> impl IntoResponse {
    crate::metrics::get_metrics().export_prometheus()
}
