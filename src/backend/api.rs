//! API endpoint registry and built-in handlers.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use crate::error::BackendError;
use crate::pipeline::Row;

use super::traits::ApiHandler;

/// Routes API-type queries to registered endpoint handlers.
#[derive(Default)]
pub struct ApiRegistry {
    handlers: HashMap<String, Arc<dyn ApiHandler>>,
}

impl ApiRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in endpoints registered.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("/api/cadastro", Arc::new(CadastroHandler));
        registry
    }

    pub fn register(&mut self, endpoint: impl Into<String>, handler: Arc<dyn ApiHandler>) {
        self.handlers.insert(endpoint.into(), handler);
    }

    /// Dispatch to the handler for `endpoint`. Unknown endpoints fail
    /// without touching any handler.
    pub async fn dispatch(
        &self,
        endpoint: &str,
        params: &Map<String, Value>,
    ) -> Result<Vec<Row>, BackendError> {
        let handler = self
            .handlers
            .get(endpoint)
            .ok_or_else(|| BackendError::UnsupportedEndpoint(endpoint.to_string()))?;
        handler.handle(params).await
    }

    pub fn endpoints(&self) -> Vec<&str> {
        self.handlers.keys().map(String::as_str).collect()
    }
}

/// Built-in registration-listing endpoint. Serves a fixed dataset,
/// optionally filtered by the `status` parameter.
pub struct CadastroHandler;

#[async_trait]
impl ApiHandler for CadastroHandler {
    async fn handle(&self, params: &Map<String, Value>) -> Result<Vec<Row>, BackendError> {
        let records = [
            json!({"Id": 1, "Nome": "João Silva", "Email": "joao@email.com", "DataInclusao": "2023-04-01T10:30:00", "Status": "Ativo"}),
            json!({"Id": 2, "Nome": "Maria Souza", "Email": "maria@email.com", "DataInclusao": "2023-05-05T14:20:00", "Status": "Ativo"}),
            json!({"Id": 3, "Nome": "Pedro Santos", "Email": "pedro@gmail.com", "DataInclusao": "2023-05-10T09:15:00", "Status": "Ativo"}),
        ];

        let status_filter = params.get("status").and_then(Value::as_str);

        Ok(records
            .into_iter()
            .filter_map(|record| match record {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .filter(|record| match status_filter {
                Some(status) => record
                    .get("Status")
                    .and_then(Value::as_str)
                    .is_some_and(|s| s.eq_ignore_ascii_case(status)),
                None => true,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_known_endpoint() {
        let registry = ApiRegistry::with_defaults();
        let rows = registry
            .dispatch("/api/cadastro", &Map::new())
            .await
            .unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0]["Nome"], "João Silva");
    }

    #[tokio::test]
    async fn test_status_filter() {
        let registry = ApiRegistry::with_defaults();
        let mut params = Map::new();
        params.insert("status".to_string(), json!("Inativo"));
        let rows = registry.dispatch("/api/cadastro", &params).await.unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_endpoint() {
        let registry = ApiRegistry::with_defaults();
        let err = registry
            .dispatch("/api/funcionarios", &Map::new())
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::UnsupportedEndpoint(_)));
        assert!(err.to_string().contains("/api/funcionarios"));
    }
}
