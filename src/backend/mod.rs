//! Execution backends for the dispatcher.
//!
//! The SQL and API seams are traits so the dispatcher and the pipeline
//! tests can run against deterministic fakes.

pub mod api;
pub mod sql;
pub mod traits;

pub use api::*;
pub use sql::*;
pub use traits::*;
