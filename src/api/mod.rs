//! HTTP service surface.
//!
//! Exposes the pipeline over a small REST API so web frontends can ask
//! questions or submit raw queries for gated execution.

mod handlers;
mod rest;

pub use handlers::*;
pub use rest::*;
