//! PostgreSQL backend.

use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{Column, PgPool, Row as SqlxRow, TypeInfo};

use crate::config::{DatabaseConfig, ExecutorConfig};
use crate::error::{BackendError, Result};
use crate::pipeline::Row;

use super::traits::SqlBackend;

/// Pooled PostgreSQL backend. The pool bounds concurrent connections and
/// guarantees release on every exit path of a call.
pub struct PostgresBackend {
    pool: PgPool,
    max_rows: usize,
}

impl PostgresBackend {
    /// Build a bounded pool from configuration. Connections are opened
    /// lazily, so an unreachable database surfaces as a per-query execution
    /// error instead of a startup failure.
    pub fn connect(db: &DatabaseConfig, executor: &ExecutorConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(db.max_connections)
            .connect_lazy(&db.connection_url())
            .map_err(|e| BackendError::Pool(e.to_string()))?;

        tracing::info!(
            server = %db.server,
            database = %db.database,
            "SQL backend pool configured"
        );

        Ok(Self {
            pool,
            max_rows: executor.max_rows,
        })
    }

    /// Wrap an existing pool. Used by tests against a scratch database.
    pub fn from_pool(pool: PgPool, max_rows: usize) -> Self {
        Self { pool, max_rows }
    }
}

#[async_trait]
impl SqlBackend for PostgresBackend {
    async fn run(&self, sql: &str) -> std::result::Result<Vec<Row>, BackendError> {
        let rows = sqlx::query(sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| BackendError::Execution(e.to_string()))?;

        Ok(rows
            .iter()
            .take(self.max_rows)
            .map(row_to_json)
            .collect())
    }
}

/// Map a database row to an ordered field → value JSON mapping, preserving
/// column order. Types without a direct JSON mapping fall back to their
/// text rendering, then to null.
fn row_to_json(row: &PgRow) -> Row {
    let mut map = Map::new();
    for (idx, column) in row.columns().iter().enumerate() {
        let value = decode_column(row, idx, column.type_info().name());
        map.insert(column.name().to_string(), value);
    }
    map
}

fn decode_column(row: &PgRow, idx: usize, type_name: &str) -> Value {
    match type_name {
        "BOOL" => opt(row.try_get::<Option<bool>, _>(idx)).map(Value::from),
        "INT2" => opt(row.try_get::<Option<i16>, _>(idx)).map(Value::from),
        "INT4" => opt(row.try_get::<Option<i32>, _>(idx)).map(Value::from),
        "INT8" => opt(row.try_get::<Option<i64>, _>(idx)).map(Value::from),
        "FLOAT4" => opt(row.try_get::<Option<f32>, _>(idx)).map(|v| Value::from(v as f64)),
        "FLOAT8" => opt(row.try_get::<Option<f64>, _>(idx)).map(Value::from),
        "TEXT" | "VARCHAR" | "CHAR" | "BPCHAR" | "NAME" => {
            opt(row.try_get::<Option<String>, _>(idx)).map(Value::String)
        }
        "TIMESTAMP" => opt(row.try_get::<Option<chrono::NaiveDateTime>, _>(idx))
            .map(|v| Value::String(v.format("%Y-%m-%dT%H:%M:%S").to_string())),
        "TIMESTAMPTZ" => opt(row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(idx))
            .map(|v| Value::String(v.to_rfc3339())),
        "DATE" => opt(row.try_get::<Option<chrono::NaiveDate>, _>(idx))
            .map(|v| Value::String(v.to_string())),
        "JSON" | "JSONB" => opt(row.try_get::<Option<Value>, _>(idx)),
        _ => opt(row.try_get::<Option<String>, _>(idx)).map(Value::String),
    }
    .unwrap_or(Value::Null)
}

fn opt<T>(result: std::result::Result<Option<T>, sqlx::Error>) -> Option<T> {
    result.ok().flatten()
}
