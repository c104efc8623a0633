//! Read-only catalogs shared by every pipeline instance.
//!
//! The schema, safety policy, and instruction/example catalog are loaded
//! once at process start and never mutated afterwards, so concurrent
//! requests share them behind an `Arc` without locking.

pub mod instructions;
pub mod policy;
pub mod schema;

pub use instructions::*;
pub use policy::*;
pub use schema::*;

use std::sync::Arc;

use crate::config::Config;

/// Immutable per-process view of the known tables, the safety policy, and
/// the synthesis instruction catalog.
#[derive(Debug, Clone)]
pub struct Catalog {
    pub schema: Schema,
    pub policy: PolicyRules,
    pub instructions: InstructionCatalog,
}

impl Catalog {
    /// Load all catalogs from the configured data directory. Missing or
    /// unreadable files fall back to the documented defaults rather than
    /// failing startup.
    pub fn load(config: &Config) -> Arc<Self> {
        let schema = Schema::load(&config.training.schemas_path);
        let instructions = InstructionCatalog::load(&config.training.schemas_path);
        let policy = PolicyRules::from_config(&config.security);

        Arc::new(Self {
            schema,
            policy,
            instructions,
        })
    }

    /// Build a catalog from in-memory parts. Used by tests to substitute
    /// fixtures per case.
    pub fn from_parts(schema: Schema, policy: PolicyRules, instructions: InstructionCatalog) -> Arc<Self> {
        Arc::new(Self {
            schema,
            policy,
            instructions,
        })
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self {
            schema: Schema::default(),
            policy: PolicyRules::default(),
            instructions: InstructionCatalog::default(),
        }
    }
}
