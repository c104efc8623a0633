//! Instruction and worked-example catalog for query synthesis.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// A curated question → SQL pair used as a few-shot example.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkedExample {
    #[serde(rename = "query")]
    pub question: String,
    pub sql: String,
}

/// The layered instruction catalog fed to the synthesizer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstructionCatalog {
    /// General formatting rules.
    pub general: Vec<String>,
    /// Field semantics descriptions.
    pub table_fields: Vec<String>,
    /// Canonical translations of relative-time phrases.
    pub date_filters: Vec<String>,
    /// Canonical translations of status phrases.
    pub status_filters: Vec<String>,
    /// Worked examples, in catalog order.
    pub examples: Vec<WorkedExample>,
}

impl Default for InstructionCatalog {
    fn default() -> Self {
        Self {
            general: vec![
                "Ao gerar consultas SQL, use o formato SQL Server".to_string(),
                "Sempre inclua a cláusula WITH (NOLOCK) após cada tabela nas consultas SELECT"
                    .to_string(),
                "Exemplo: SELECT * FROM Tabela WITH (NOLOCK)".to_string(),
            ],
            table_fields: vec![
                "DataInclusao: Data em que o registro foi incluído no sistema (datetime)"
                    .to_string(),
                "Ativo: Status (1 = Ativo, 0 = Inativo)".to_string(),
            ],
            date_filters: vec![
                "Quando o usuário mencionar 'último mês', use: WHERE DataInclusao BETWEEN DATEADD(month, -1, GETDATE()) AND GETDATE()".to_string(),
                "Quando o usuário mencionar 'última semana', use: WHERE DataInclusao BETWEEN DATEADD(week, -1, GETDATE()) AND GETDATE()".to_string(),
                "Quando o usuário mencionar 'hoje', use: WHERE CONVERT(date, DataInclusao) = CONVERT(date, GETDATE())".to_string(),
            ],
            status_filters: vec![
                "Quando o usuário mencionar 'ativos', adicione: AND Ativo = 1".to_string(),
                "Quando o usuário mencionar 'inativos', adicione: AND Ativo = 0".to_string(),
            ],
            examples: Vec::new(),
        }
    }
}

/// On-disk shape of queries.json.
#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    sql_instructions: Option<InstructionCatalog>,
}

impl InstructionCatalog {
    /// Load the catalog from `<dir>/queries.json`, falling back to the
    /// built-in defaults when the file is absent or unreadable.
    pub fn load(schemas_dir: impl AsRef<Path>) -> Self {
        let path = schemas_dir.as_ref().join("queries.json");
        if !path.exists() {
            tracing::warn!("Instruction catalog not found at {}", path.display());
            return Self::default();
        }

        match std::fs::read_to_string(&path)
            .map_err(|e| e.to_string())
            .and_then(|content| {
                serde_json::from_str::<CatalogFile>(&content).map_err(|e| e.to_string())
            }) {
            Ok(file) => {
                tracing::info!("Loaded instruction catalog from {}", path.display());
                file.sql_instructions.unwrap_or_default()
            }
            Err(e) => {
                tracing::error!("Failed to load instruction catalog: {}", e);
                Self::default()
            }
        }
    }
}
