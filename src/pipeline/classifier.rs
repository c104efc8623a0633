//! Intent classifier.
//!
//! Converts a free-text question plus the schema into a structured intent
//! by delegating to the external NLU service and parsing its response.

use std::sync::Arc;

use crate::catalog::Schema;
use crate::error::{PipelineError, Result};
use crate::llm::LanguageModel;

use super::types::Intent;

const SYSTEM_MESSAGE: &str = "Você é um assistente especializado em analisar consultas e identificar a intenção do usuário. \
Para cada consulta, determine:\n\
1. O tipo de operação (consulta, inserção, atualização)\n\
2. As entidades mencionadas (tabelas, campos)\n\
3. Os filtros ou condições mencionados\n\
4. Retorne sempre um JSON com type (sql ou api), entities, conditions e fields.\n";

/// Classifies natural language questions into structured intents.
pub struct IntentClassifier {
    model: Arc<dyn LanguageModel>,
}

impl IntentClassifier {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    /// Classify a question. Single attempt; the external response is
    /// untrusted and malformed output fails with an intent-parse error
    /// rather than a crash.
    pub async fn classify(&self, question: &str, schema: &Schema) -> Result<Intent> {
        let prompt = format!(
            "Esquema do banco: {}\n\nConsulta: {}",
            schema.to_context(),
            question
        );

        let response = self.model.generate(SYSTEM_MESSAGE, &prompt).await?;
        let intent = parse_intent(&response)?;

        tracing::debug!(query_type = intent.query_type(), "Intenção analisada");
        Ok(intent)
    }
}

/// Parse the raw NLU response as the intent JSON shape. If the full text is
/// not valid JSON, recover the outermost brace-delimited substring and
/// reparse before giving up.
fn parse_intent(response: &str) -> Result<Intent> {
    let value = match serde_json::from_str::<serde_json::Value>(response.trim()) {
        Ok(value) => value,
        Err(_) => {
            let recovered = recover_json_object(response).ok_or_else(|| {
                PipelineError::IntentParse("no JSON object found in response".to_string())
            })?;
            serde_json::from_str(recovered)
                .map_err(|e| PipelineError::IntentParse(e.to_string()))?
        }
    };

    Intent::from_value(&value).ok_or_else(|| {
        PipelineError::IntentParse(format!(
            "response is not a valid intent: {}",
            truncate(response, 120)
        ))
        .into()
    })
}

/// Extract the substring between the first `{` and the last `}` inclusive.
fn recover_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
