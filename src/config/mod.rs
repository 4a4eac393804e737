//! Configuration model for ticket-runner.
//!
//! This module defines the Config struct that represents `.ticket-runner.yaml`.
//! The file is optional; every field has a default. It supports
//! forward-compatible YAML parsing (unknown fields are ignored) and
//! validation of config values.

mod model;
mod operations;


// Re-export public API
pub use model::Config;
