//! Pipeline orchestrator.
//!
//! Runs one question through the full sequence: classify, synthesize,
//! validate, dispatch, summarize. Stages are strictly sequential and there
//! are no retries; callers needing resilience wrap the whole pipeline.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use serde_json::Value;

use crate::backend::{ApiRegistry, SqlBackend};
use crate::catalog::Catalog;
use crate::config::Config;
use crate::error::Result;
use crate::llm::{GeminiClient, LanguageModel};
use crate::pipeline::{
    ExecutorDispatcher, IntentClassifier, QuerySynthesizer, ResultEnvelope, ResultSummarizer,
    SafetyValidator, ValidatedQuery,
};

/// Outcome of one pipeline run. `error`, when set, is one of the three
/// user-visible failure messages; internal causes stay in the logs.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub question: String,
    pub query_type: Option<String>,
    pub generated_query: Option<Value>,
    pub envelope: Option<ResultEnvelope>,
    pub answer: Option<String>,
    pub error: Option<String>,
    pub elapsed_seconds: f64,
}

impl PipelineReport {
    fn empty(question: &str) -> Self {
        Self {
            question: question.to_string(),
            query_type: None,
            generated_query: None,
            envelope: None,
            answer: None,
            error: None,
            elapsed_seconds: 0.0,
        }
    }
}

/// The fully wired pipeline. One instance serves many concurrent requests;
/// all shared state (catalog, policy) is read-only after construction.
pub struct Agent {
    classifier: IntentClassifier,
    synthesizer: QuerySynthesizer,
    validator: SafetyValidator,
    dispatcher: ExecutorDispatcher,
    summarizer: ResultSummarizer,
    catalog: Arc<Catalog>,
}

impl Agent {
    pub fn new(
        model: Arc<dyn LanguageModel>,
        catalog: Arc<Catalog>,
        sql: Option<Arc<dyn SqlBackend>>,
        api: Arc<ApiRegistry>,
        config: &Config,
    ) -> Self {
        Self {
            classifier: IntentClassifier::new(model.clone()),
            synthesizer: QuerySynthesizer::new(model.clone(), catalog.clone()),
            validator: SafetyValidator::new(catalog.policy.clone()),
            dispatcher: ExecutorDispatcher::new(sql, api, &config.executor),
            summarizer: ResultSummarizer::new(model),
            catalog,
        }
    }

    /// Wire the agent from configuration: Gemini model, lazily connected
    /// PostgreSQL pool, and the default API handler registry.
    pub fn from_config(config: &Config) -> Result<Self> {
        let model: Arc<dyn LanguageModel> = Arc::new(GeminiClient::from_config(&config.llm)?);
        let catalog = Catalog::load(config);
        let sql: Arc<dyn SqlBackend> = Arc::new(crate::backend::PostgresBackend::connect(
            &config.database,
            &config.executor,
        )?);
        let api = Arc::new(ApiRegistry::with_defaults());

        tracing::info!(
            tables = catalog.schema.table_names().len(),
            "Agent initialized"
        );
        Ok(Self::new(model, catalog, Some(sql), api, config))
    }

    /// Access the safety validator, for callers that gate externally
    /// supplied queries without running the language stages.
    pub fn validator(&self) -> &SafetyValidator {
        &self.validator
    }

    /// Dispatch an already validated query, skipping the language stages.
    pub async fn execute_validated(&self, validated: ValidatedQuery) -> ResultEnvelope {
        self.dispatcher.execute(validated).await
    }

    /// Run the full pipeline for one question.
    ///
    /// Classification and synthesis failures abort the request with the
    /// "could not understand" message; validation rejections abort with the
    /// specific policy reason; backend failures flow through the envelope
    /// and still reach the summarizer.
    pub async fn process(&self, question: &str) -> PipelineReport {
        let start = Instant::now();
        let metrics = crate::metrics::get_metrics();
        metrics.questions_total.inc();
        tracing::info!(question, "Processing question");

        let mut report = PipelineReport::empty(question);

        let intent = match self.classifier.classify(question, &self.catalog.schema).await {
            Ok(intent) => intent,
            Err(e) => {
                tracing::error!(error = %e, "Intent classification failed");
                metrics.llm_errors_total.inc();
                report.error = Some("Não foi possível entender a sua solicitação.".to_string());
                report.elapsed_seconds = start.elapsed().as_secs_f64();
                return report;
            }
        };
        report.query_type = Some(intent.query_type().to_string());

        let candidate = match self.synthesizer.synthesize(question, &intent).await {
            Ok(candidate) => candidate,
            Err(e) => {
                tracing::error!(error = %e, "Query synthesis failed");
                metrics.llm_errors_total.inc();
                report.error = Some("Não foi possível entender a sua solicitação.".to_string());
                report.elapsed_seconds = start.elapsed().as_secs_f64();
                return report;
            }
        };
        report.generated_query = Some(candidate.to_query_data());

        let verdict = self.validator.validate(&candidate);
        if !verdict.accepted {
            tracing::warn!(reason = %verdict.reason, "Query rejected by safety policy");
            metrics.rejections_total.inc();
            report.error = Some(format!(
                "A consulta gerada foi considerada insegura: {}",
                verdict.reason
            ));
            report.elapsed_seconds = start.elapsed().as_secs_f64();
            return report;
        }
        let validated = match ValidatedQuery::new(candidate, &verdict) {
            Ok(validated) => validated,
            Err(e) => {
                // Unreachable with the check above; kept fatal-to-request.
                tracing::error!(error = %e, "Dispatcher precondition violated");
                report.error = Some(format!(
                    "A consulta gerada foi considerada insegura: {}",
                    verdict.reason
                ));
                report.elapsed_seconds = start.elapsed().as_secs_f64();
                return report;
            }
        };

        let envelope = self.dispatcher.execute(validated).await;
        if let Some(secs) = envelope.execution_time_seconds {
            metrics.execution_duration_seconds.observe(secs);
        }
        if let Some(cause) = &envelope.error {
            report.error = Some(format!("A consulta falhou durante a execução: {cause}"));
        }

        report.answer = self.summarizer.summarize(question, &envelope).await;
        report.envelope = Some(envelope);
        report.elapsed_seconds = start.elapsed().as_secs_f64();
        metrics
            .pipeline_duration_seconds
            .observe(report.elapsed_seconds);

        tracing::info!(
            query_type = report.query_type.as_deref().unwrap_or("unknown"),
            has_answer = report.answer.is_some(),
            elapsed_secs = report.elapsed_seconds,
            "Question processed"
        );
        report
    }
}
