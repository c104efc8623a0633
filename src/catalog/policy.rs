//! Safety policy rules.

use serde::{Deserialize, Serialize};

use crate::config::SecurityConfig;

/// The process-wide safety policy. Read-only after load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyRules {
    /// Uppercase tokens that reject a candidate on sight. Tokens ending in
    /// `_` (e.g. `xp_`, `sp_`) match as identifier prefixes.
    pub blocked_keywords: Vec<String>,
    /// Tables a SQL candidate may reference.
    pub allowed_tables: Vec<String>,
    /// Maximum candidate length in characters.
    pub max_query_length: usize,
    /// Whether generated SQL must carry a concurrency-safety hint.
    pub require_lock_hint: bool,
}

impl Default for PolicyRules {
    fn default() -> Self {
        Self::from_config(&SecurityConfig::default())
    }
}

impl PolicyRules {
    pub fn from_config(config: &SecurityConfig) -> Self {
        Self {
            blocked_keywords: config
                .blocked_keywords
                .iter()
                .map(|k| {
                    // Prefix tokens keep their original case shape, plain
                    // keywords are normalized to uppercase.
                    if k.ends_with('_') {
                        k.clone()
                    } else {
                        k.to_uppercase()
                    }
                })
                .collect(),
            allowed_tables: config.allowed_tables.clone(),
            max_query_length: config.max_query_length,
            require_lock_hint: config.require_lock_hint,
        }
    }

    pub fn table_allowed(&self, table: &str) -> bool {
        self.allowed_tables.iter().any(|t| t.eq_ignore_ascii_case(table))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = PolicyRules::default();
        assert!(policy.blocked_keywords.contains(&"DROP".to_string()));
        assert!(policy.blocked_keywords.contains(&"xp_".to_string()));
        assert_eq!(policy.max_query_length, 4000);
        assert!(policy.require_lock_hint);
    }

    #[test]
    fn test_table_allowed_case_insensitive() {
        let policy = PolicyRules::default();
        assert!(policy.table_allowed("Cadastro"));
        assert!(policy.table_allowed("CADASTRO"));
        assert!(!policy.table_allowed("Funcionarios"));
    }

    #[test]
    fn test_keywords_normalized_uppercase() {
        let config = SecurityConfig {
            blocked_keywords: vec!["drop".to_string(), "xp_".to_string()],
            ..Default::default()
        };
        let policy = PolicyRules::from_config(&config);
        assert_eq!(policy.blocked_keywords, vec!["DROP", "xp_"]);
    }
}
