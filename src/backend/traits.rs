//! Backend traits.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::BackendError;
use crate::pipeline::Row;

/// A SQL execution backend. Implementations execute the text verbatim and
/// return rows as ordered field → value mappings; connection acquire and
/// release must happen inside a single call.
#[async_trait]
pub trait SqlBackend: Send + Sync {
    async fn run(&self, sql: &str) -> Result<Vec<Row>, BackendError>;
}

/// A registered handler for one API endpoint.
#[async_trait]
pub trait ApiHandler: Send + Sync {
    async fn handle(&self, params: &Map<String, Value>) -> Result<Vec<Row>, BackendError>;
}
