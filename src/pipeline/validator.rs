//! Safety validator: the policy gate between synthesis and execution.
//!
//! A pure function of (candidate text, policy) → verdict. Checks run over
//! sanitized text (line comments stripped) so comment-hidden intent cannot
//! bypass them, while the envelope and logs keep the original text. The
//! dispatcher only accepts a [`ValidatedQuery`], which can only be built
//! from an accepted verdict, so rejected candidates are unreachable past
//! this module by construction.

use std::sync::LazyLock;

use regex::Regex;

use crate::catalog::PolicyRules;
use crate::error::{PipelineError, Result};

use super::types::{CandidateQuery, ValidationVerdict};

/// Validates candidate queries against the safety policy.
pub struct SafetyValidator {
    policy: PolicyRules,
    keyword_patterns: Vec<(String, Regex)>,
}

impl SafetyValidator {
    pub fn new(policy: PolicyRules) -> Self {
        let keyword_patterns = policy
            .blocked_keywords
            .iter()
            .map(|kw| {
                let escaped = regex::escape(kw);
                // Prefix tokens (xp_, sp_) match any identifier they start;
                // plain keywords match as whole words only.
                let pattern = if kw.ends_with('_') {
                    format!(r"(?i)\b{}\w*", escaped)
                } else {
                    format!(r"(?i)\b{}\b", escaped)
                };
                let regex = Regex::new(&pattern).expect("Invalid regex");
                (kw.clone(), regex)
            })
            .collect();

        Self {
            policy,
            keyword_patterns,
        }
    }

    /// Validate a candidate query. Stages run in order: length check,
    /// blocked-keyword scan, table allowlist (SQL only); the first failure
    /// rejects with its specific reason.
    pub fn validate(&self, candidate: &CandidateQuery) -> ValidationVerdict {
        let text = sanitize(&candidate.validation_text());

        // The limit and the rejection reason are both in characters, so
        // count chars rather than bytes.
        if text.chars().count() > self.policy.max_query_length {
            return ValidationVerdict::reject(format!(
                "Consulta excede o tamanho máximo de {} caracteres",
                self.policy.max_query_length
            ));
        }

        for (keyword, pattern) in &self.keyword_patterns {
            if pattern.is_match(&text) {
                return ValidationVerdict::reject(format!(
                    "Consulta contém palavra-chave bloqueada: {}",
                    keyword
                ));
            }
        }

        // API candidates skip the table allowlist; their endpoint and
        // params were already covered by the checks above.
        if let CandidateQuery::Sql { .. } = candidate {
            for table in extract_tables(&text) {
                if !self.policy.table_allowed(&table) {
                    return ValidationVerdict::reject(format!("Tabela não permitida: {}", table));
                }
            }
        }

        ValidationVerdict::accept("Consulta válida")
    }
}

/// Strip trailing line comments (`--` to end of line) from each line.
/// Trailing whitespace left behind by a removed comment is dropped too.
/// Idempotent: sanitizing sanitized text is a no-op.
pub fn sanitize(query: &str) -> String {
    query
        .lines()
        .map(|line| match line.find("--") {
            Some(idx) => line[..idx].trim_end(),
            None => line.trim_end(),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Extract table names referenced after FROM/JOIN, ignoring aliases.
pub fn extract_tables(sql: &str) -> Vec<String> {
    static TABLE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r#"(?i)\b(?:FROM|JOIN)\s+[\[\"]?([A-Za-z_][A-Za-z0-9_]*)"#)
            .expect("Invalid regex")
    });

    let mut tables = Vec::new();
    for caps in TABLE_PATTERN.captures_iter(sql) {
        if let Some(m) = caps.get(1) {
            let name = m.as_str().to_string();
            if !tables.iter().any(|t: &String| t.eq_ignore_ascii_case(&name)) {
                tables.push(name);
            }
        }
    }
    tables
}

// ============================================================================
// Validated Query
// ============================================================================

/// Witness that a candidate passed validation. The dispatcher's entry point
/// requires this type, so an unvalidated query cannot reach a backend.
///
/// The checks run over sanitized text, so that is also the text sealed for
/// execution; the original candidate is kept only for the envelope and
/// logs. Executing the original would let content hidden behind a `--`
/// inside a string literal reach the backend unchecked.
#[derive(Debug, Clone)]
pub struct ValidatedQuery {
    candidate: CandidateQuery,
    execution: CandidateQuery,
}

impl ValidatedQuery {
    /// Seal an accepted candidate. Building one from a rejected verdict is
    /// a policy violation: an internal-invariant breach, fatal to the
    /// request and logged loudly.
    pub fn new(candidate: CandidateQuery, verdict: &ValidationVerdict) -> Result<Self> {
        if !verdict.accepted {
            tracing::error!(
                reason = %verdict.reason,
                "Dispatcher precondition violated: rejected query presented for execution"
            );
            return Err(PipelineError::PolicyViolation.into());
        }
        let execution = match &candidate {
            CandidateQuery::Sql { query } => CandidateQuery::sql(sanitize(query)),
            api => api.clone(),
        };
        Ok(Self { candidate, execution })
    }

    pub fn candidate(&self) -> &CandidateQuery {
        &self.candidate
    }

    /// The sanitized text the dispatcher executes. Identical to the text
    /// the validator scanned.
    pub fn execution(&self) -> &CandidateQuery {
        &self.execution
    }

    /// Split into (original for the envelope, sanitized for execution).
    pub fn into_parts(self) -> (CandidateQuery, CandidateQuery) {
        (self.candidate, self.execution)
    }
}
