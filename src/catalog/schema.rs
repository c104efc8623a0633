//! Database schema catalog.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// A single field of a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default)]
    pub description: String,
}

/// A table known to the agent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDef {
    #[serde(default)]
    pub description: String,
    /// Ordered field definitions.
    #[serde(default)]
    pub fields: Vec<FieldDef>,
}

/// Mapping of table name → definition. Ordered so serialized context is
/// stable across runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Schema {
    pub tables: BTreeMap<String, TableDef>,
}

impl Default for Schema {
    /// The minimal default schema used when no schema files are present:
    /// a single `Cadastro` registration table.
    fn default() -> Self {
        let fields = vec![
            field("Id", "int", "ID do cadastro"),
            field("Nome", "varchar", "Nome da pessoa"),
            field("Email", "varchar", "Email da pessoa"),
            field("Ativo", "boolean", "Status do cadastro (1 = Ativo, 0 = Inativo)"),
            field("DataInclusao", "datetime", "Data de inclusão"),
        ];

        let mut tables = BTreeMap::new();
        tables.insert(
            "Cadastro".to_string(),
            TableDef {
                description: "Tabela de cadastros".to_string(),
                fields,
            },
        );
        Self { tables }
    }
}

fn field(name: &str, ty: &str, description: &str) -> FieldDef {
    FieldDef {
        name: name.to_string(),
        ty: ty.to_string(),
        description: description.to_string(),
    }
}

impl Schema {
    /// Load the schema from a directory of JSON files.
    ///
    /// `db_schema.json` takes precedence; otherwise every other `*.json`
    /// except `queries.json` is merged in. Errors fall back to the default
    /// schema so startup never fails on catalog problems.
    pub fn load(schemas_dir: impl AsRef<Path>) -> Self {
        let dir = schemas_dir.as_ref();

        let preferred = dir.join("db_schema.json");
        if preferred.exists() {
            match Self::from_json_file(&preferred) {
                Ok(schema) if !schema.tables.is_empty() => {
                    tracing::info!("Loaded schema from {}", preferred.display());
                    return schema;
                }
                Ok(_) => tracing::warn!("{} contained no tables", preferred.display()),
                Err(e) => tracing::error!("Failed to load {}: {}", preferred.display(), e),
            }
        }

        let mut merged = BTreeMap::new();
        if let Ok(entries) = std::fs::read_dir(dir) {
            for entry in entries.flatten() {
                let path = entry.path();
                let is_json = path.extension().is_some_and(|ext| ext == "json");
                let is_queries = path.file_name().is_some_and(|n| n == "queries.json");
                if !is_json || is_queries {
                    continue;
                }
                match Self::from_json_file(&path) {
                    Ok(part) => {
                        tracing::info!("Merged schema fragment from {}", path.display());
                        merged.extend(part.tables);
                    }
                    Err(e) => tracing::error!("Failed to load {}: {}", path.display(), e),
                }
            }
        }

        if merged.is_empty() {
            tracing::warn!("No schema files found, using default Cadastro schema");
            Self::default()
        } else {
            Self { tables: merged }
        }
    }

    fn from_json_file(path: &Path) -> std::io::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(std::io::Error::other)
    }

    /// Serialize the schema as the JSON context embedded in prompts.
    pub fn to_context(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }

    /// Whether a table name is defined in this schema.
    pub fn has_table(&self, name: &str) -> bool {
        self.tables.keys().any(|t| t.eq_ignore_ascii_case(name))
    }

    /// Names of all defined tables.
    pub fn table_names(&self) -> Vec<&str> {
        self.tables.keys().map(String::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_default_schema() {
        let schema = Schema::default();
        assert!(schema.has_table("Cadastro"));
        assert!(schema.has_table("cadastro"));
        assert!(!schema.has_table("Funcionarios"));

        let cadastro = &schema.tables["Cadastro"];
        assert_eq!(cadastro.fields.len(), 5);
        assert_eq!(cadastro.fields[4].name, "DataInclusao");
    }

    #[test]
    fn test_load_missing_dir_falls_back() {
        let schema = Schema::load("/nonexistent/path");
        assert!(schema.has_table("Cadastro"));
    }

    #[test]
    fn test_load_preferred_file() {
        let dir = TempDir::new().unwrap();
        let mut f = std::fs::File::create(dir.path().join("db_schema.json")).unwrap();
        write!(
            f,
            r#"{{"Funcionarios": {{"description": "Tabela de funcionários", "fields": [
                {{"name": "Id", "type": "int", "description": "ID"}}
            ]}}}}"#
        )
        .unwrap();

        let schema = Schema::load(dir.path());
        assert!(schema.has_table("Funcionarios"));
        assert!(!schema.has_table("Cadastro"));
    }

    #[test]
    fn test_load_merges_fragments_skipping_queries() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("parte1.json"),
            r#"{"Cadastro": {"description": "", "fields": []}}"#,
        )
        .unwrap();
        std::fs::write(
            dir.path().join("parte2.json"),
            r#"{"Funcionarios": {"description": "", "fields": []}}"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("queries.json"), r#"{"not": "a schema"}"#).unwrap();

        let schema = Schema::load(dir.path());
        assert_eq!(schema.tables.len(), 2);
    }

    #[test]
    fn test_context_is_stable() {
        let schema = Schema::default();
        assert_eq!(schema.to_context(), schema.to_context());
        assert!(schema.to_context().contains("DataInclusao"));
    }
}
