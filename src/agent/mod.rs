//! Agent execution subsystem.
//!
//! - **Config**: How the agent CLI is launched (`agent` config section)
//! - **Prompt**: Prompt rendering from ticket fields
//! - **Log**: Per-run log file with a shareable masked reference
//! - **Dispatch**: Subprocess execution with timeout and output capture
//!
//! The agent is any CLI that accepts a prompt and works unattended; it is
//! launched once per ticket and judged only by its exit code.

mod config;
pub mod dispatch;
pub mod log;
pub mod prompt;

pub use config::AgentSettings;
pub use dispatch::{ExecutionLimits, Termination, execute_agent};
pub use log::LogSink;
