//! Executor dispatcher.
//!
//! Routes a validated query to the SQL or API backend and wraps the outcome
//! in a uniform [`ResultEnvelope`]. Backend failures are captured in the
//! envelope, never raised past this boundary, so callers branch on the
//! `error` field regardless of backend type.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::backend::{ApiRegistry, SqlBackend};
use crate::config::ExecutorConfig;
use crate::error::BackendError;

use super::types::{CandidateQuery, ResultEnvelope, Row};
use super::validator::ValidatedQuery;

/// Dispatches validated queries to the correct backend.
pub struct ExecutorDispatcher {
    sql: Option<Arc<dyn SqlBackend>>,
    api: Arc<ApiRegistry>,
    timeout: Duration,
}

impl ExecutorDispatcher {
    pub fn new(
        sql: Option<Arc<dyn SqlBackend>>,
        api: Arc<ApiRegistry>,
        executor: &ExecutorConfig,
    ) -> Self {
        Self {
            sql,
            api,
            timeout: Duration::from_secs(executor.timeout_secs),
        }
    }

    /// Execute a validated query. The [`ValidatedQuery`] argument is the
    /// dispatcher's precondition: it cannot be constructed from a rejected
    /// verdict, so no unvalidated text can reach a backend through here.
    pub async fn execute(&self, validated: ValidatedQuery) -> ResultEnvelope {
        // Run the sanitized text the validator scanned; the original
        // candidate only labels the envelope and the logs.
        let (candidate, execution) = validated.into_parts();
        let start = Instant::now();

        let outcome = match &execution {
            CandidateQuery::Sql { query } => self.execute_sql(query).await,
            CandidateQuery::Api { endpoint, params } => {
                self.api.dispatch(endpoint, params).await
            }
        };
        let elapsed = start.elapsed().as_secs_f64();

        match outcome {
            Ok(rows) => {
                tracing::info!(
                    query_type = candidate.query_type(),
                    rows = rows.len(),
                    elapsed_secs = elapsed,
                    "Query executed"
                );
                ResultEnvelope::success(&candidate, rows, elapsed)
            }
            Err(e) => {
                tracing::error!(
                    query_type = candidate.query_type(),
                    error = %e,
                    "Query execution failed"
                );
                crate::metrics::get_metrics().backend_errors_total.inc();
                ResultEnvelope::failure(&candidate, e.to_string(), elapsed)
            }
        }
    }

    async fn execute_sql(&self, query: &str) -> Result<Vec<Row>, BackendError> {
        let backend = self
            .sql
            .as_ref()
            .ok_or_else(|| BackendError::Execution("no SQL backend configured".to_string()))?;

        match tokio::time::timeout(self.timeout, backend.run(query)).await {
            Ok(result) => result,
            Err(_) => Err(BackendError::Timeout(self.timeout.as_secs())),
        }
    }
}
