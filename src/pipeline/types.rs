//! Types flowing through the request pipeline.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single result row: ordered field → value mapping.
pub type Row = Map<String, Value>;

// ============================================================================
// Intent
// ============================================================================

/// Structured representation of what a question is asking for. Produced once
/// per request by the classifier, consumed by the synthesizer, then discarded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Intent {
    /// A tabular-data question answered with SQL.
    Sql {
        #[serde(default)]
        entities: Vec<String>,
        #[serde(default)]
        conditions: Vec<String>,
        #[serde(default)]
        fields: Vec<String>,
    },
    /// A question routed to a registered API endpoint.
    Api {
        #[serde(default)]
        endpoint: String,
        #[serde(default)]
        params: Map<String, Value>,
    },
}

impl Intent {
    /// Parse an intent from an untrusted JSON value. A missing `type` field
    /// defaults to `sql`; list fields tolerate scalars and mixed content.
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let ty = obj.get("type").and_then(Value::as_str).unwrap_or("sql");

        match ty {
            "api" => Some(Intent::Api {
                endpoint: obj
                    .get("endpoint")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                params: obj
                    .get("params")
                    .and_then(Value::as_object)
                    .cloned()
                    .unwrap_or_default(),
            }),
            "sql" => Some(Intent::Sql {
                entities: string_list(obj.get("entities")),
                conditions: string_list(obj.get("conditions")),
                fields: string_list(obj.get("fields")),
            }),
            _ => None,
        }
    }

    pub fn query_type(&self) -> &'static str {
        match self {
            Intent::Sql { .. } => "sql",
            Intent::Api { .. } => "api",
        }
    }
}

/// Coerce an untrusted JSON field into a list of strings. Non-list scalars
/// become a single-element list; non-string items are rendered as JSON.
fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items.iter().map(render_string).collect(),
        Some(Value::Null) | None => Vec::new(),
        Some(other) => vec![render_string(other)],
    }
}

fn render_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// ============================================================================
// Candidate Query
// ============================================================================

/// A synthesized but not-yet-validated query. Mutable only during the
/// synthesizer's correction pass; frozen once handed to the validator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "query_type", rename_all = "snake_case")]
pub enum CandidateQuery {
    Sql { query: String },
    Api { endpoint: String, params: Map<String, Value> },
}

impl CandidateQuery {
    pub fn sql(query: impl Into<String>) -> Self {
        Self::Sql { query: query.into() }
    }

    pub fn api(endpoint: impl Into<String>, params: Map<String, Value>) -> Self {
        Self::Api {
            endpoint: endpoint.into(),
            params,
        }
    }

    pub fn query_type(&self) -> &'static str {
        match self {
            Self::Sql { .. } => "sql",
            Self::Api { .. } => "api",
        }
    }

    /// The text the validator scans: raw SQL, or the endpoint+param
    /// serialization for API candidates.
    pub fn validation_text(&self) -> String {
        match self {
            Self::Sql { query } => query.clone(),
            Self::Api { endpoint, params } => {
                format!("{} {}", endpoint, Value::Object(params.clone()))
            }
        }
    }

    /// The query as envelope data.
    pub fn to_query_data(&self) -> Value {
        match self {
            Self::Sql { query } => Value::String(query.clone()),
            Self::Api { endpoint, params } => serde_json::json!({
                "endpoint": endpoint,
                "params": params,
            }),
        }
    }
}

// ============================================================================
// Validation Verdict
// ============================================================================

/// Outcome of the safety validator. Never defaults to accepted; the absence
/// of a verdict is treated as rejection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationVerdict {
    pub accepted: bool,
    pub reason: String,
}

impl ValidationVerdict {
    pub fn accept(reason: impl Into<String>) -> Self {
        Self {
            accepted: true,
            reason: reason.into(),
        }
    }

    pub fn reject(reason: impl Into<String>) -> Self {
        Self {
            accepted: false,
            reason: reason.into(),
        }
    }
}

// ============================================================================
// Result Envelope
// ============================================================================

/// Uniform wrapper returned by the dispatcher regardless of backend type.
/// Exactly one of `rows` or `error` is set on completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultEnvelope {
    pub query_type: String,
    pub query_data: Value,
    pub execution_time_seconds: Option<f64>,
    pub rows: Option<Vec<Row>>,
    pub error: Option<String>,
}

impl ResultEnvelope {
    pub fn success(candidate: &CandidateQuery, rows: Vec<Row>, elapsed_secs: f64) -> Self {
        Self {
            query_type: candidate.query_type().to_string(),
            query_data: candidate.to_query_data(),
            execution_time_seconds: Some(elapsed_secs),
            rows: Some(rows),
            error: None,
        }
    }

    pub fn failure(candidate: &CandidateQuery, error: impl Into<String>, elapsed_secs: f64) -> Self {
        Self {
            query_type: candidate.query_type().to_string(),
            query_data: candidate.to_query_data(),
            execution_time_seconds: Some(elapsed_secs),
            rows: None,
            error: Some(error.into()),
        }
    }

    /// Whether the envelope carries at least one row.
    pub fn has_rows(&self) -> bool {
        self.rows.as_ref().is_some_and(|r| !r.is_empty())
    }
}
