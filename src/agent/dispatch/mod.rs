//! Agent subprocess dispatch and supervision.
//!
//! This module provides subprocess execution for agents with:
//!
//! - Prompt delivery on stdin (closed after one write)
//! - Concurrent line-by-line capture of stdout/stderr into the run log
//! - Wall-clock timeout with forced termination
//! - Bounded wait for the output readers after the process ends
//!
//! Failures never escape as errors: every path ends in an exit code plus,
//! where something went wrong, an ERROR entry in the run log.

mod executor;

pub use executor::{AgentCommand, ExecutionLimits, Termination, execute_agent};
