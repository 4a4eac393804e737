//! Exit code constants for the ticket-runner CLI.
//!
//! - 0: Success
//! - 1: Failure (no work, tracker error, agent failure without a usable code)
//! - 2: Usage error (unresolvable owner/repo, bad flags)
//!
//! When the agent itself exits non-zero, its code is propagated instead
//! (see [`process_exit_code`]).

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// Generic failure: empty backlog, tracker error, spawn failure, timeout.
pub const FAILURE: i32 = 1;

/// Usage error, matching the argument parser's convention.
pub const USAGE_ERROR: i32 = 2;

/// Clamp an agent exit code into something the OS can report.
///
/// Codes outside `0..=255` (or negative codes) cannot be represented as a
/// process exit status, so they collapse to [`FAILURE`].
pub fn process_exit_code(code: i32) -> u8 {
    u8::try_from(code).unwrap_or(FAILURE as u8)
}
