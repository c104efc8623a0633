//! The request pipeline.
//!
//! This module provides:
//! - Intent classification of natural language questions
//! - Query synthesis with deterministic correction rules
//! - Policy-gated safety validation
//! - Dispatch to the SQL or API backend
//! - Result summarization
//!
//! Control flow is strictly sequential and no stage may skip the validator.

pub mod classifier;
pub mod dispatcher;
pub mod summarizer;
pub mod synthesizer;
pub mod types;
pub mod validator;

pub use classifier::*;
pub use dispatcher::*;
pub use summarizer::*;
pub use synthesizer::*;
pub use types::*;
pub use validator::*;
