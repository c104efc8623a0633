//! REST handler tests.
//!
//! Handlers are exercised directly with a fake language model and SQL
//! backend behind the agent, checking status codes and response shapes.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::{json, Map, Value};

use consulta::api::{ask_handler, execute_handler, health_handler, AskRequest, ExecuteRequest};
use consulta::error::{BackendError, LlmError, Result};
use consulta::pipeline::Row;
use consulta::{Agent, ApiRegistry, ApiState, Catalog, Config, LanguageModel, SqlBackend};

struct StaticModel {
    responses: Mutex<Vec<String>>,
}

#[async_trait]
impl LanguageModel for StaticModel {
    async fn generate(&self, _system: &str, _user: &str) -> Result<String> {
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Err(LlmError::EmptyResponse.into())
        } else {
            Ok(responses.remove(0))
        }
    }
}

struct StaticBackend {
    rows: Vec<Row>,
}

#[async_trait]
impl SqlBackend for StaticBackend {
    async fn run(&self, _sql: &str) -> std::result::Result<Vec<Row>, BackendError> {
        Ok(self.rows.clone())
    }
}

fn state(responses: Vec<&str>, rows: Vec<Row>) -> Arc<ApiState> {
    let model = Arc::new(StaticModel {
        responses: Mutex::new(responses.into_iter().map(String::from).collect()),
    });
    let agent = Agent::new(
        model,
        Catalog::from_parts(Default::default(), Default::default(), Default::default()),
        Some(Arc::new(StaticBackend { rows })),
        Arc::new(ApiRegistry::with_defaults()),
        &Config::default(),
    );
    Arc::new(ApiState::new(Arc::new(agent)))
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), 1 << 20)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn sample_row() -> Row {
    let mut row = Map::new();
    row.insert("Id".to_string(), json!(1));
    row.insert("Nome".to_string(), json!("João Silva"));
    row
}

#[tokio::test]
async fn test_health() {
    let response = health_handler().await.into_response();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_ask_empty_question_is_bad_request() {
    let state = state(vec![], Vec::new());
    let response = ask_handler(
        State(state),
        Json(AskRequest {
            question: "   ".to_string(),
        }),
    )
    .await
    .into_response();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["code"], "missing_field");
}

#[tokio::test]
async fn test_ask_returns_full_report() {
    let intent = json!({"type": "sql", "entities": ["Cadastro"], "conditions": [], "fields": []});
    let state = state(
        vec![
            &intent.to_string(),
            "SELECT * FROM Cadastro WITH (NOLOCK)",
            "Há 1 cadastro.",
        ],
        vec![sample_row()],
    );

    let response = ask_handler(
        State(state),
        Json(AskRequest {
            question: "liste os cadastros".to_string(),
        }),
    )
    .await
    .into_response();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["query_type"], "sql");
    assert_eq!(body["answer"], "Há 1 cadastro.");
    assert!(body["error"].is_null());
    assert_eq!(body["envelope"]["rows"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_execute_missing_field_is_bad_request() {
    let state = state(vec![], Vec::new());
    let response = execute_handler(
        State(state),
        Json(ExecuteRequest {
            query_type: None,
            query: Some("SELECT * FROM Cadastro".to_string()),
            params: None,
        }),
    )
    .await
    .into_response();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["status"], "error");
    assert!(body["message"].as_str().unwrap().contains("query_type"));
}

#[tokio::test]
async fn test_execute_rejected_query_is_forbidden() {
    let state = state(vec![], Vec::new());
    let response = execute_handler(
        State(state),
        Json(ExecuteRequest {
            query_type: Some("sql".to_string()),
            query: Some("DROP TABLE Cadastro".to_string()),
            params: None,
        }),
    )
    .await
    .into_response();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_json(response).await;
    assert_eq!(body["status"], "error");
    assert!(body["message"].as_str().unwrap().contains("DROP"));
}

#[tokio::test]
async fn test_execute_sql_success_shape() {
    let state = state(vec![], vec![sample_row()]);
    let response = execute_handler(
        State(state),
        Json(ExecuteRequest {
            query_type: Some("sql".to_string()),
            query: Some("SELECT * FROM Cadastro WITH (NOLOCK)".to_string()),
            params: None,
        }),
    )
    .await
    .into_response();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "success");
    assert_eq!(body["results"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_execute_api_endpoint() {
    let state = state(vec![], Vec::new());
    let mut params = Map::new();
    params.insert("status".to_string(), json!("Ativo"));

    let response = execute_handler(
        State(state),
        Json(ExecuteRequest {
            query_type: Some("api".to_string()),
            query: Some("/api/cadastro".to_string()),
            params: Some(params),
        }),
    )
    .await
    .into_response();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "success");
    assert_eq!(body["results"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_execute_unknown_type() {
    let state = state(vec![], Vec::new());
    let response = execute_handler(
        State(state),
        Json(ExecuteRequest {
            query_type: Some("graphql".to_string()),
            query: Some("{}".to_string()),
            params: None,
        }),
    )
    .await
    .into_response();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["message"].as_str().unwrap().contains("não suportado"));
}
