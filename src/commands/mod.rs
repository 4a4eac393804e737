//! Command implementations for ticket-runner.
//!
//! The CLI has a single action, running the next backlog ticket; it lives
//! in the `run` module.

mod run;

pub use run::{RunRequest, cmd_run};
