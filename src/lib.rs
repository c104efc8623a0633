//! Consulta: Natural Language Query Agent
//!
//! Translates natural-language questions into SQL queries or API calls,
//! gates them through a safety policy, executes them against the configured
//! backend, and summarizes the results back in natural language.
//!
//! The pipeline is strictly sequential: classification → synthesis →
//! validation → dispatch → summarization. Nothing reaches a live backend
//! without an accepted verdict from the safety validator.

pub mod agent;
pub mod api;
pub mod backend;
pub mod catalog;
pub mod config;
pub mod error;
pub mod llm;
pub mod metrics;
pub mod pipeline;

pub use agent::{Agent, PipelineReport};
pub use api::{create_rest_router, ApiState, RestApiConfig};
pub use backend::{ApiHandler, ApiRegistry, CadastroHandler, PostgresBackend, SqlBackend};
pub use catalog::{
    Catalog, FieldDef, InstructionCatalog, PolicyRules, Schema, TableDef, WorkedExample,
};
pub use config::Config;
pub use error::{BackendError, ConfigError, ConsultaError, LlmError, PipelineError, Result};
pub use llm::{GeminiClient, LanguageModel};
pub use metrics::{get_metrics, Metrics};
pub use pipeline::{
    CandidateQuery, ExecutorDispatcher, Intent, IntentClassifier, QuerySynthesizer,
    ResultEnvelope, ResultSummarizer, SafetyValidator, ValidatedQuery, ValidationVerdict,
};
