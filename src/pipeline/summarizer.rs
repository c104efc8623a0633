//! Result summarization.
//!
//! Turns a result envelope into a natural-language answer in Portuguese.
//! Empty result sets are answered with a fixed message without calling the
//! model; model failures degrade to `None` so the caller can still return
//! the raw rows.

use std::sync::Arc;

use crate::llm::LanguageModel;

use super::types::ResultEnvelope;

/// Rows beyond this count are omitted from the model prompt. The total is
/// still reported so the answer can mention it.
const MAX_ROWS_IN_PROMPT: usize = 20;

const SYSTEM_MESSAGE: &str = "Você é um assistente especializado em explicar resultados \
de consultas de banco de dados. Sua tarefa é responder a pergunta do usuário com base \
nos resultados fornecidos. Seja conciso e direto, focando apenas nas informações \
relevantes para a pergunta.";

/// Answer given when the envelope carries no rows. Also used when the
/// envelope carries an execution error, since there is nothing to summarize.
pub const NO_RESULTS_ANSWER: &str = "Não foram encontrados resultados para sua consulta.";

/// Produces a user-facing answer from query results.
pub struct ResultSummarizer {
    model: Arc<dyn LanguageModel>,
}

impl ResultSummarizer {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    /// Summarize the envelope's rows as an answer to `question`.
    ///
    /// Returns `None` only when the model call itself fails; empty or
    /// errored envelopes get the fixed no-results answer.
    pub async fn summarize(&self, question: &str, envelope: &ResultEnvelope) -> Option<String> {
        if !envelope.has_rows() {
            return Some(NO_RESULTS_ANSWER.to_string());
        }

        let rows = envelope.rows.as_deref().unwrap_or_default();
        let shown = &rows[..rows.len().min(MAX_ROWS_IN_PROMPT)];
        let formatted =
            serde_json::to_string_pretty(shown).unwrap_or_else(|_| "[]".to_string());

        let query_context = match (envelope.query_type.as_str(), envelope.query_data.as_str()) {
            ("sql", Some(sql)) => format!("\nConsulta SQL executada: {sql}"),
            _ => String::new(),
        };

        let user_content = format!(
            "Pergunta do usuário: {question}\n\n\
             Resultados da consulta ({count} registros encontrados):{query_context}\n{formatted}\n\n\
             Por favor, responda à pergunta do usuário com base nestes resultados. \
             Seja direto e claro, evitando explicações desnecessárias. \
             Resuma os dados de forma útil e relevante para a pergunta.",
            count = rows.len(),
        );

        match self.model.generate(SYSTEM_MESSAGE, &user_content).await {
            Ok(answer) => {
                let answer = answer.trim().to_string();
                tracing::debug!(answer_len = answer.len(), "Generated answer");
                Some(answer)
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to summarize results");
                crate::metrics::get_metrics().llm_errors_total.inc();
                None
            }
        }
    }
}
