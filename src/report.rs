//! Outcome reporting for agent runs.
//!
//! Turns an exit code and a duration into the status summary posted back to
//! the ticket, and into the footer appended to the run log.

use crate::agent::LogSink;
use crate::error::Result;
use std::fmt;
use std::time::Duration;

/// Width of the separator rule around the log footer.
const RULE_WIDTH: usize = 80;

/// Coarse result of an agent run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionStatus {
    Success,
    Failed,
}

impl ExecutionStatus {
    pub fn from_exit_code(exit_code: i32) -> Self {
        if exit_code == 0 {
            ExecutionStatus::Success
        } else {
            ExecutionStatus::Failed
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::Success => "SUCCESS",
            ExecutionStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Exit code and wall-clock duration of one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionResult {
    exit_code: i32,
    duration: Duration,
    status: ExecutionStatus,
}

impl ExecutionResult {
    pub fn new(exit_code: i32, duration: Duration) -> Self {
        Self {
            exit_code,
            duration,
            status: ExecutionStatus::from_exit_code(exit_code),
        }
    }

    pub fn exit_code(&self) -> i32 {
        self.exit_code
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn status(&self) -> ExecutionStatus {
        self.status
    }
}

/// Display-ready fields for the ticket comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportSummary {
    pub status: String,
    pub exit_code: String,
    pub duration: String,
    pub masked_log_url: String,
}

impl ReportSummary {
    pub fn from_result(result: &ExecutionResult, sink: &LogSink) -> Self {
        Self {
            status: result.status().to_string(),
            exit_code: result.exit_code().to_string(),
            duration: format!("{:.2} seconds", result.duration().as_secs_f64()),
            masked_log_url: sink.masked_url(),
        }
    }

    fn succeeded(&self) -> bool {
        self.status == ExecutionStatus::Success.as_str()
    }
}

/// Build the Markdown body of the ticket comment.
///
/// Only the masked log reference is included; the real path stays local.
pub fn render_comment(summary: &ReportSummary) -> String {
    let glyph = if summary.succeeded() { "✅" } else { "❌" };
    format!(
        "{glyph} **Agent run finished**\n\
         \n\
         **Result:**\n\
         - Status: {status}\n\
         - Exit Code: {exit_code}\n\
         - Duration: {duration}\n\
         \n\
         📎 **Log file:** {url}\n\
         \n\
         See the log file for details.\n",
        glyph = glyph,
        status = summary.status,
        exit_code = summary.exit_code,
        duration = summary.duration,
        url = summary.masked_log_url,
    )
}

/// Append the execution summary footer to the run log.
pub fn write_footer(sink: &LogSink, ticket_number: u64, result: &ExecutionResult) -> Result<()> {
    let rule = "=".repeat(RULE_WIDTH);
    sink.info("")?;
    sink.info(&rule)?;
    sink.info(&format!(
        "Issue #{} execution: {}",
        ticket_number,
        result.status()
    ))?;
    sink.info(&format!("Exit Code: {}", result.exit_code()))?;
    sink.info(&format!(
        "Duration: {:.2}s",
        result.duration().as_secs_f64()
    ))?;
    sink.info(&rule)
}
