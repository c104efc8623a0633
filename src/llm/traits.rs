//! Language model trait.

use async_trait::async_trait;

use crate::error::Result;

/// A text-generation service consumed by the classifier, synthesizer, and
/// summarizer. One call per pipeline stage, no retries.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Generate text for the given system instructions and user content.
    async fn generate(&self, system: &str, user: &str) -> Result<String>;
}
