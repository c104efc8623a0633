//! External language service interface.
//!
//! The LLM calls are the only source of non-determinism in the pipeline, so
//! they live behind the narrow [`LanguageModel`] trait. The validator,
//! dispatcher, and correction rules never touch this module.

pub mod gemini;
pub mod traits;

pub use gemini::*;
pub use traits::*;
