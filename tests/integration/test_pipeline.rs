//! End-to-end pipeline tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Map};

use consulta::error::{BackendError, LlmError, Result};
use consulta::pipeline::Row;
use consulta::{Agent, ApiRegistry, Catalog, Config, LanguageModel, SqlBackend};

/// Language model fake that replays a scripted sequence of responses, one
/// per `generate` call, in pipeline order.
struct ScriptedModel {
    responses: Mutex<VecDeque<Result<String>>>,
}

impl ScriptedModel {
    fn new(responses: Vec<Result<String>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into_iter().collect()),
        })
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn generate(&self, _system: &str, _user: &str) -> Result<String> {
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::EmptyResponse.into()))
    }
}

/// SQL backend fake that records the query it received.
struct RecordingBackend {
    rows: Vec<Row>,
    fail_with: Option<String>,
    called: AtomicBool,
    last_query: Mutex<Option<String>>,
}

impl RecordingBackend {
    fn returning(rows: Vec<Row>) -> Arc<Self> {
        Arc::new(Self {
            rows,
            fail_with: None,
            called: AtomicBool::new(false),
            last_query: Mutex::new(None),
        })
    }

    fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            rows: Vec::new(),
            fail_with: Some(message.to_string()),
            called: AtomicBool::new(false),
            last_query: Mutex::new(None),
        })
    }
}

#[async_trait]
impl SqlBackend for RecordingBackend {
    async fn run(&self, sql: &str) -> std::result::Result<Vec<Row>, BackendError> {
        self.called.store(true, Ordering::SeqCst);
        *self.last_query.lock().unwrap() = Some(sql.to_string());
        match &self.fail_with {
            Some(message) => Err(BackendError::Execution(message.clone())),
            None => Ok(self.rows.clone()),
        }
    }
}

fn make_agent(model: Arc<ScriptedModel>, backend: Arc<RecordingBackend>) -> Agent {
    let config = Config::default();
    let catalog = Catalog::from_parts(
        Default::default(),
        Default::default(),
        Default::default(),
    );
    Agent::new(
        model,
        catalog,
        Some(backend),
        Arc::new(ApiRegistry::with_defaults()),
        &config,
    )
}

fn cadastro_row(id: i64, nome: &str) -> Row {
    let mut row = Map::new();
    row.insert("Id".to_string(), json!(id));
    row.insert("Nome".to_string(), json!(nome));
    row.insert("Ativo".to_string(), json!(true));
    row
}

fn sql_intent() -> Result<String> {
    Ok(json!({
        "type": "sql",
        "entities": ["Cadastro"],
        "conditions": ["ativos", "último mês"],
        "fields": []
    })
    .to_string())
}

#[tokio::test]
async fn test_question_gains_missing_date_predicate() {
    // The generated SQL has the status filter but not the date range; the
    // correction pass must inject it before execution.
    let model = ScriptedModel::new(vec![
        sql_intent(),
        Ok("```sql\nSELECT * FROM Cadastro WITH (NOLOCK) WHERE Ativo = 1\n```".to_string()),
        Ok("Foram encontrados 2 cadastros ativos no último mês.".to_string()),
    ]);
    let backend = RecordingBackend::returning(vec![
        cadastro_row(1, "João Silva"),
        cadastro_row(2, "Maria Souza"),
    ]);
    let agent = make_agent(model, backend.clone());

    let report = agent
        .process("Quais são os cadastros ativos registrados no último mês?")
        .await;

    assert_eq!(report.query_type.as_deref(), Some("sql"));
    assert!(report.error.is_none(), "unexpected error: {:?}", report.error);

    let executed = backend.last_query.lock().unwrap().clone().unwrap();
    assert!(
        executed.contains("DataInclusao BETWEEN DATEADD(month, -1, GETDATE()) AND GETDATE()"),
        "date predicate missing from: {executed}"
    );
    assert!(executed.contains("Ativo = 1"));

    let envelope = report.envelope.unwrap();
    assert_eq!(envelope.rows.unwrap().len(), 2);
    assert!(envelope.error.is_none());
    assert_eq!(
        report.answer.as_deref(),
        Some("Foram encontrados 2 cadastros ativos no último mês.")
    );
}

#[tokio::test]
async fn test_blocked_keyword_never_reaches_backend() {
    let model = ScriptedModel::new(vec![
        sql_intent(),
        Ok("DROP TABLE Cadastro".to_string()),
    ]);
    let backend = RecordingBackend::returning(Vec::new());
    let agent = make_agent(model, backend.clone());

    let report = agent.process("apague todos os cadastros").await;

    let error = report.error.expect("rejection expected");
    assert!(error.contains("insegura"), "error was: {error}");
    assert!(error.contains("DROP"), "reason must cite the keyword: {error}");
    assert!(!backend.called.load(Ordering::SeqCst), "backend must not be reached");
    assert!(report.envelope.is_none());
}

#[tokio::test]
async fn test_literal_comment_payload_truncated_before_backend() {
    // A statement hidden behind `--` inside a string literal is invisible
    // to the keyword scan. The backend must receive the same truncated
    // text the validator scanned, never the original.
    let model = ScriptedModel::new(vec![
        sql_intent(),
        Ok("SELECT * FROM Cadastro WHERE Nome = 'a--b'; DROP TABLE Cadastro".to_string()),
        Ok("Nenhum cadastro com esse nome.".to_string()),
    ]);
    let backend = RecordingBackend::returning(Vec::new());
    let agent = make_agent(model, backend.clone());

    let report = agent.process("busque o cadastro com nome especial").await;

    assert!(report.error.is_none(), "unexpected error: {:?}", report.error);
    let executed = backend.last_query.lock().unwrap().clone().unwrap();
    assert_eq!(executed, "SELECT * FROM Cadastro WHERE Nome = 'a");
    assert!(!executed.contains("DROP"), "hidden statement reached the backend: {executed}");
}

#[tokio::test]
async fn test_table_outside_allowlist_rejected() {
    let model = ScriptedModel::new(vec![
        sql_intent(),
        Ok("SELECT * FROM Funcionarios WITH (NOLOCK)".to_string()),
    ]);
    let backend = RecordingBackend::returning(Vec::new());
    let agent = make_agent(model, backend.clone());

    let report = agent.process("liste os funcionários").await;

    let error = report.error.expect("rejection expected");
    assert!(error.contains("Tabela não permitida: Funcionarios"), "error was: {error}");
    assert!(!backend.called.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_backend_failure_flows_through_envelope() {
    let model = ScriptedModel::new(vec![
        sql_intent(),
        Ok("SELECT * FROM Cadastro WITH (NOLOCK)".to_string()),
        // Summarizer must not be consulted for an errored envelope; this
        // entry stays unused.
        Ok("não deveria ser usado".to_string()),
    ]);
    let backend = RecordingBackend::failing("connection refused (os error 111)");
    let agent = make_agent(model, backend);

    let report = agent.process("liste os cadastros").await;

    let envelope = report.envelope.expect("envelope expected even on failure");
    assert!(envelope.rows.is_none());
    assert!(envelope.error.unwrap().contains("connection refused"));

    let error = report.error.expect("execution failure message expected");
    assert!(error.contains("falhou durante a execução"), "error was: {error}");
    assert_eq!(
        report.answer.as_deref(),
        Some("Não foram encontrados resultados para sua consulta.")
    );
}

#[tokio::test]
async fn test_unintelligible_question_aborts_early() {
    let model = ScriptedModel::new(vec![Ok("isso não é um JSON".to_string())]);
    let backend = RecordingBackend::returning(Vec::new());
    let agent = make_agent(model, backend.clone());

    let report = agent.process("asdf qwerty").await;

    assert_eq!(
        report.error.as_deref(),
        Some("Não foi possível entender a sua solicitação.")
    );
    assert!(report.generated_query.is_none());
    assert!(!backend.called.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_api_intent_routes_to_handler() {
    let intent = json!({
        "type": "api",
        "endpoint": "/api/cadastro",
        "params": {"status": "Ativo"}
    })
    .to_string();
    let model = ScriptedModel::new(vec![
        Ok(intent),
        Ok("Há 3 cadastros ativos.".to_string()),
    ]);
    let backend = RecordingBackend::returning(Vec::new());
    let agent = make_agent(model, backend.clone());

    let report = agent.process("consulte o serviço de cadastro").await;

    assert_eq!(report.query_type.as_deref(), Some("api"));
    assert!(report.error.is_none(), "unexpected error: {:?}", report.error);
    assert!(!backend.called.load(Ordering::SeqCst), "SQL backend must stay idle");

    let envelope = report.envelope.unwrap();
    assert_eq!(envelope.query_type, "api");
    assert_eq!(envelope.rows.unwrap().len(), 3);
    assert_eq!(report.answer.as_deref(), Some("Há 3 cadastros ativos."));
}
