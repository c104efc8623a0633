//! Query synthesizer.
//!
//! Builds a layered instruction block from the catalog, delegates text
//! generation to the external NLG service, then applies a deterministic
//! correction pass for well-known safety and semantic gaps in the generated
//! text (missing date-range filter, missing status filter).

use std::sync::{Arc, LazyLock};

use regex::Regex;

use crate::catalog::Catalog;
use crate::error::{PipelineError, Result};
use crate::llm::LanguageModel;

use super::types::{CandidateQuery, Intent};

/// Synthesizes backend-specific query text from an intent.
pub struct QuerySynthesizer {
    model: Arc<dyn LanguageModel>,
    catalog: Arc<Catalog>,
}

impl QuerySynthesizer {
    pub fn new(model: Arc<dyn LanguageModel>, catalog: Arc<Catalog>) -> Self {
        Self { model, catalog }
    }

    /// Produce a candidate query for the given intent. API intents carry
    /// their endpoint and parameters through unchanged; SQL intents go
    /// through generation plus the correction pass.
    pub async fn synthesize(&self, question: &str, intent: &Intent) -> Result<CandidateQuery> {
        match intent {
            Intent::Api { endpoint, params } => {
                if endpoint.is_empty() {
                    return Err(PipelineError::Synthesis(
                        "api intent without an endpoint".to_string(),
                    )
                    .into());
                }
                Ok(CandidateQuery::api(endpoint.clone(), params.clone()))
            }
            Intent::Sql { .. } => self.synthesize_sql(question).await,
        }
    }

    async fn synthesize_sql(&self, question: &str) -> Result<CandidateQuery> {
        let system = self.build_instruction_block(question);

        let lock_hint = if self.catalog.policy.require_lock_hint {
            "Certifique-se de incluir a cláusula WITH (NOLOCK) após a tabela."
        } else {
            ""
        };
        let user = format!(
            "Esquema da tabela: {}\n\nConsulta do usuário: {}\n\n\
             Gere uma consulta SQL válida baseada nesta consulta. {}",
            self.catalog.schema.to_context(),
            question,
            lock_hint
        );

        let raw = self.model.generate(&system, &user).await.map_err(|e| {
            PipelineError::Synthesis(format!("generation call failed: {}", e))
        })?;

        let mut sql = extract_query_block(&raw).trim().to_string();
        if sql.is_empty() {
            return Err(PipelineError::Synthesis("model returned empty query text".to_string()).into());
        }

        for rule in correction_rules() {
            sql = rule.apply(question, sql);
        }

        tracing::debug!(sql = %sql, "SQL sintetizado");
        Ok(CandidateQuery::sql(sql))
    }

    /// Layered instruction block: general rules, field semantics, canonical
    /// date and status translations, then relevance-ranked worked examples.
    fn build_instruction_block(&self, question: &str) -> String {
        let catalog = &self.catalog.instructions;
        let mut lines = Vec::new();

        lines.push("INSTRUÇÕES GERAIS:".to_string());
        for (i, rule) in catalog.general.iter().enumerate() {
            lines.push(format!("{}. {}", i + 1, rule));
        }

        lines.push("\nCAMPOS DA TABELA:".to_string());
        for (i, field) in catalog.table_fields.iter().enumerate() {
            lines.push(format!("{}. {}", i + 1, field));
        }

        lines.push("\nFILTROS DE DATA:".to_string());
        for (i, filter) in catalog.date_filters.iter().enumerate() {
            lines.push(format!("{}. {}", i + 1, filter));
        }

        lines.push("\nFILTROS DE STATUS:".to_string());
        for (i, filter) in catalog.status_filters.iter().enumerate() {
            lines.push(format!("{}. {}", i + 1, filter));
        }

        let relevant = rank_examples(question, &self.catalog.instructions.examples);
        if !relevant.is_empty() {
            lines.push("\nEXEMPLOS RELEVANTES:".to_string());
            for (i, example) in relevant.iter().enumerate() {
                lines.push(format!("Exemplo {}:", i + 1));
                lines.push(format!("Query: {}", example.question));
                lines.push(format!("SQL: {}", example.sql));
                lines.push(String::new());
            }
        }

        lines.join("\n")
    }
}

// ============================================================================
// Example ranking
// ============================================================================

/// Rank worked examples by the number of trigger phrases shared with the
/// question. Examples with no overlap are dropped; ties keep catalog order.
fn rank_examples<'a>(
    question: &str,
    examples: &'a [crate::catalog::WorkedExample],
) -> Vec<&'a crate::catalog::WorkedExample> {
    let triggered: Vec<&CorrectionRule> = correction_rules()
        .iter()
        .filter(|rule| rule.trigger.is_match(question))
        .collect();

    let mut scored: Vec<(usize, &crate::catalog::WorkedExample)> = examples
        .iter()
        .filter_map(|example| {
            let score = triggered
                .iter()
                .filter(|rule| rule.trigger.is_match(&example.question))
                .count();
            (score > 0).then_some((score, example))
        })
        .collect();

    // Stable sort preserves catalog order among equal scores.
    scored.sort_by(|a, b| b.0.cmp(&a.0));
    scored.into_iter().map(|(_, e)| e).collect()
}

// ============================================================================
// Code block extraction
// ============================================================================

/// If the generated text is wrapped in fenced code blocks, extract the first
/// block containing a recognizable query keyword; otherwise return the raw
/// text unchanged.
fn extract_query_block(raw: &str) -> &str {
    if !raw.contains("```") {
        return raw;
    }
    for block in raw.split("```") {
        let upper = block.to_uppercase();
        if upper.contains("SELECT") || upper.contains("WITH") {
            // Strip a leading language tag such as `sql`.
            let block = block.trim_start();
            return block.strip_prefix("sql").unwrap_or(block);
        }
    }
    raw
}

// ============================================================================
// Correction rules
// ============================================================================

/// One deterministic correction: when `trigger` matches the question and
/// `present` does not match the generated SQL, `predicate` is injected.
struct CorrectionRule {
    trigger: Regex,
    present: Regex,
    predicate: &'static str,
}

impl CorrectionRule {
    fn apply(&self, question: &str, sql: String) -> String {
        if self.trigger.is_match(question) && !self.present.is_match(&sql) {
            inject_predicate(&sql, self.predicate)
        } else {
            sql
        }
    }
}

/// The canonical relative-time and status rules. Order matters: the
/// inactive rule runs before the active rule so that "inativos" never
/// triggers the `Ativo = 1` injection.
fn correction_rules() -> &'static [CorrectionRule] {
    static RULES: LazyLock<Vec<CorrectionRule>> = LazyLock::new(|| {
        vec![
            CorrectionRule {
                trigger: regex(r"(?i)\b[úu]ltimo\s+m[êe]s\b"),
                present: regex(r"(?i)DATEADD\(month,\s*-1"),
                predicate: "DataInclusao BETWEEN DATEADD(month, -1, GETDATE()) AND GETDATE()",
            },
            CorrectionRule {
                trigger: regex(r"(?i)\b[úu]ltima\s+semana\b"),
                present: regex(r"(?i)DATEADD\(week,\s*-1"),
                predicate: "DataInclusao BETWEEN DATEADD(week, -1, GETDATE()) AND GETDATE()",
            },
            CorrectionRule {
                trigger: regex(r"(?i)\bhoje\b"),
                present: regex(r"(?i)CONVERT\(date,\s*DataInclusao\)"),
                predicate: "CONVERT(date, DataInclusao) = CONVERT(date, GETDATE())",
            },
            CorrectionRule {
                trigger: regex(r"(?i)\binativ[oa]s?\b"),
                present: regex(r"(?i)Ativo\s*=\s*0|Status\s*=\s*'Inativo'"),
                predicate: "Ativo = 0",
            },
            CorrectionRule {
                trigger: regex(r"(?i)\bativ[oa]s?\b"),
                present: regex(r"(?i)Ativo\s*=\s*[01]|Status\s*=\s*'Ativo'"),
                predicate: "Ativo = 1",
            },
        ]
    });
    &RULES
}

fn regex(pattern: &str) -> Regex {
    Regex::new(pattern).expect("Invalid regex")
}

/// Insert a predicate immediately after the first WHERE clause, or append a
/// new WHERE clause when none exists.
fn inject_predicate(sql: &str, predicate: &str) -> String {
    static WHERE_PATTERN: LazyLock<Regex> = LazyLock::new(|| regex(r"(?i)\bWHERE\b"));

    match WHERE_PATTERN.find(sql) {
        Some(m) => format!(
            "{}WHERE {} AND{}",
            &sql[..m.start()],
            predicate,
            &sql[m.end()..]
        ),
        None => format!("{} WHERE {}", sql.trim_end(), predicate),
    }
}
