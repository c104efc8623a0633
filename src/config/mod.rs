//! Configuration for the consulta agent.

pub mod settings;

pub use settings::*;
