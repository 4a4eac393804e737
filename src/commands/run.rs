//! Implementation of a ticket run.
//!
//! One invocation handles exactly one ticket:
//!
//! 1. Take the first ticket in the backlog column
//! 2. Fetch its detail and render the prompt
//! 3. Dry run: print the prompt (or the ticket as JSON) and stop
//! 4. Execute: run the agent with a fresh log file, then post the outcome
//!    back to the ticket as a comment
//!
//! Failures before the agent starts are returned as errors. Once the agent
//! has run, its exit code decides the result even if posting the comment
//! fails.

use crate::agent::log::mask;
use crate::agent::prompt::{render_prompt, render_prompt_with};
use crate::agent::{LogSink, Termination, execute_agent};
use crate::cli::OutputFormat;
use crate::config::Config;
use crate::error::{Result, RunnerError};
use crate::exit_codes;
use crate::report::{ExecutionResult, ReportSummary, render_comment, write_footer};
use crate::tracker::{Ticket, Tracker};
use chrono::Local;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

/// Per-invocation options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunRequest {
    pub project: u32,
    pub format: OutputFormat,
    pub execute: bool,
}

/// Run the next backlog ticket.
///
/// Dry-run output goes to `out`; progress lines go to stderr. Returns the
/// process exit code: 0, or the agent's exit code when it failed.
pub fn cmd_run(
    request: &RunRequest,
    config: &Config,
    tracker: &dyn Tracker,
    out: &mut dyn Write,
) -> Result<i32> {
    let ticket = next_ticket(request.project, config, tracker)?;
    let prompt = match config.custom_prompt_template()? {
        Some(template) => render_prompt_with(&template, &ticket),
        None => render_prompt(&ticket),
    };

    if !request.execute {
        print_dry_run(request.format, &ticket, &prompt, out)?;
        return Ok(exit_codes::SUCCESS);
    }

    execute_ticket(&ticket, &prompt, config, tracker)
}

/// Pick the first backlog ticket and fetch its detail.
fn next_ticket(project: u32, config: &Config, tracker: &dyn Tracker) -> Result<Ticket> {
    let backlog = tracker.fetch_backlog(project, &config.backlog_status)?;
    tracing::debug!(project, count = backlog.len(), "fetched backlog");

    let first = backlog.first().ok_or_else(|| {
        RunnerError::NoWork(format!("No tickets in the {}", config.backlog_status.to_lowercase()))
    })?;
    let number = first.number.ok_or_else(|| {
        RunnerError::UserError(format!(
            "could not determine the ticket number of the first {} item{}.\n\
             Fix: convert draft items on the board into issues.",
            config.backlog_status,
            first
                .title
                .as_deref()
                .map(|t| format!(" ('{}')", t))
                .unwrap_or_default()
        ))
    })?;

    eprintln!("✓ Picked ticket #{} from the {}", number, config.backlog_status);
    tracker.get_ticket_detail(number)
}

fn print_dry_run(
    format: OutputFormat,
    ticket: &Ticket,
    prompt: &str,
    out: &mut dyn Write,
) -> Result<()> {
    let text = match format {
        OutputFormat::Prompt => prompt.to_string(),
        OutputFormat::Json => serde_json::to_string_pretty(ticket).map_err(|e| {
            RunnerError::UserError(format!("failed to serialize ticket to JSON: {}", e))
        })?,
    };
    writeln!(out, "{}", text)
        .map_err(|e| RunnerError::UserError(format!("failed to write output: {}", e)))
}

fn execute_ticket(
    ticket: &Ticket,
    prompt: &str,
    config: &Config,
    tracker: &dyn Tracker,
) -> Result<i32> {
    let command = config.agent.build_command(prompt)?;
    let sink = Arc::new(open_run_log(config, ticket.number, prompt)?);

    progress_required(
        &sink,
        &format!("[{}] ✓ Agent run started for ticket #{}", now(), ticket.number),
    )?;
    tracing::info!(ticket = ticket.number, program = command.program(), "starting agent");

    let started = Instant::now();
    let run = execute_agent(&command, prompt, &sink, &config.limits());
    let result = ExecutionResult::new(run.exit_code, started.elapsed());
    tracing::info!(
        ticket = ticket.number,
        exit_code = run.exit_code,
        termination = %run.termination,
        "agent finished"
    );
    if run.termination != Termination::Completed {
        eprintln!("✗ Agent {}; see the run log for details", run.termination);
    }

    progress(&sink, &format!("[{}] ✓ Agent run finished", now()));
    if let Err(e) = write_footer(&sink, ticket.number, &result) {
        tracing::warn!(error = %e, "failed to write log footer");
    }

    let summary = ReportSummary::from_result(&result, &sink);
    match tracker.post_comment(ticket.number, &render_comment(&summary)) {
        Ok(()) => progress(&sink, &format!("✓ Posted comment to ticket #{}", ticket.number)),
        Err(e) => {
            let message = format!("Error: {}", e);
            eprintln!("{}", message);
            if let Err(log_err) = sink.error(&message) {
                tracing::warn!(error = %log_err, "failed to record post failure in run log");
            }
        }
    }

    eprintln!("Log file: {}", sink.resource().display());
    eprintln!("Masked URL: {}", summary.masked_log_url);
    eprintln!("Exit code: {}", result.exit_code());

    Ok(result.exit_code())
}

/// Create the sink for this run: `<log_dir>/issue_<n>_<timestamp>_<digest>.log`.
///
/// The digest is taken from the prompt, so reruns of an edited ticket are
/// easy to tell apart. A name already taken within the same second gets a
/// numeric suffix; the file is created here to claim it. The masked directory is seeded from `log_dir`.
fn open_run_log(config: &Config, number: u64, prompt: &str) -> Result<LogSink> {
    let log_dir = absolute_log_dir(config)?;
    let stem = format!(
        "issue_{}_{}_{}",
        number,
        Local::now().format("%Y%m%d_%H%M%S"),
        mask(prompt)
    );

    LogSink::create_unique(&log_dir, &stem, Some(&log_dir.to_string_lossy()))
}

fn absolute_log_dir(config: &Config) -> Result<PathBuf> {
    std::path::absolute(&config.log_dir).map_err(|e| {
        RunnerError::UserError(format!(
            "failed to resolve log directory '{}': {}",
            config.log_dir.display(),
            e
        ))
    })
}

fn now() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Record a progress line in the log and echo it to stderr.
fn progress_required(sink: &LogSink, message: &str) -> Result<()> {
    sink.info(message)?;
    eprintln!("{}", message);
    Ok(())
}

/// Like [`progress_required`], but a log failure only produces a warning.
fn progress(sink: &LogSink, message: &str) {
    if let Err(e) = sink.info(message) {
        tracing::warn!(error = %e, "failed to write progress line to run log");
    }
    eprintln!("{}", message);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentSettings;
    use crate::test_support::{FakeTracker, bare_ticket, sample_ticket};
    use crate::tracker::TicketSummary;
    use regex::Regex;
    use std::fs;
    use tempfile::TempDir;

    fn dry_run(format: OutputFormat) -> RunRequest {
        RunRequest {
            project: 1,
            format,
            execute: false,
        }
    }

    fn execute() -> RunRequest {
        RunRequest {
            project: 1,
            format: OutputFormat::Prompt,
            execute: true,
        }
    }

    /// Config whose agent is a shell script; the appended agent flags land
    /// in the script's positional parameters and are ignored.
    fn config_with_agent(log_dir: &TempDir, script: &str) -> Config {
        Config {
            log_dir: log_dir.path().join("logs"),
            agent: AgentSettings {
                command: shell_words::join(["sh", "-c", script]),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn log_files(dir: &TempDir) -> Vec<PathBuf> {
        fs::read_dir(dir.path().join("logs"))
            .map(|entries| entries.map(|e| e.unwrap().path()).collect())
            .unwrap_or_default()
    }

    #[test]
    fn dry_run_prints_prompt_and_posts_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let tracker = FakeTracker::with_backlog(vec![sample_ticket(42, "Fix crash")]);
        let config = config_with_agent(&temp_dir, "exit 0");
        let mut out = Vec::new();

        let code = cmd_run(&dry_run(OutputFormat::Prompt), &config, &tracker, &mut out).unwrap();

        assert_eq!(code, 0);
        let printed = String::from_utf8(out).unwrap();
        assert!(printed.contains("# Ticket #42: Fix crash"));
        assert!(printed.contains("feature/42"));
        assert!(printed.contains("Close #42"));
        assert!(tracker.posted().is_empty());
        assert!(log_files(&temp_dir).is_empty());
    }

    #[test]
    fn dry_run_json_prints_ticket() {
        let temp_dir = TempDir::new().unwrap();
        let ticket = sample_ticket(42, "Fix crash");
        let tracker = FakeTracker::with_backlog(vec![ticket.clone()]);
        let mut out = Vec::new();

        cmd_run(
            &dry_run(OutputFormat::Json),
            &config_with_agent(&temp_dir, "exit 0"),
            &tracker,
            &mut out,
        )
        .unwrap();

        let parsed: Ticket = serde_json::from_slice(&out).unwrap();
        assert_eq!(parsed, ticket);
        assert!(String::from_utf8(out).unwrap().contains("\n  \"number\": 42"));
    }

    #[test]
    fn first_backlog_ticket_is_chosen() {
        let temp_dir = TempDir::new().unwrap();
        let tracker = FakeTracker::with_backlog(vec![
            bare_ticket(8, "First"),
            bare_ticket(3, "Second"),
        ]);
        let mut out = Vec::new();

        cmd_run(
            &dry_run(OutputFormat::Prompt),
            &config_with_agent(&temp_dir, "exit 0"),
            &tracker,
            &mut out,
        )
        .unwrap();
        assert!(String::from_utf8(out).unwrap().starts_with("# Ticket #8: First"));
    }

    #[test]
    fn custom_template_is_used_for_dry_run() {
        let temp_dir = TempDir::new().unwrap();
        let tracker = FakeTracker::with_backlog(vec![sample_ticket(5, "Tidy")]);
        let mut config = config_with_agent(&temp_dir, "exit 0");
        config.prompt_template = Some("Handle #{number} ({labels})".to_string());
        let mut out = Vec::new();

        cmd_run(&dry_run(OutputFormat::Prompt), &config, &tracker, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "Handle #5 (bug, p1)\n");
    }

    #[test]
    fn empty_backlog_is_no_work() {
        let temp_dir = TempDir::new().unwrap();
        let tracker = FakeTracker::default();
        let err = cmd_run(
            &execute(),
            &config_with_agent(&temp_dir, "exit 0"),
            &tracker,
            &mut Vec::new(),
        )
        .unwrap_err();

        assert!(matches!(err, RunnerError::NoWork(_)));
        assert_eq!(err.to_string(), "No tickets in the backlog");
        assert_eq!(err.exit_code(), 1);
        assert!(log_files(&temp_dir).is_empty());
    }

    #[test]
    fn draft_item_without_number_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let tracker = FakeTracker {
            backlog: vec![TicketSummary {
                number: None,
                title: Some("Draft idea".to_string()),
                url: None,
                state: None,
                status: Some("Backlog".to_string()),
            }],
            ..Default::default()
        };
        let err = cmd_run(
            &execute(),
            &config_with_agent(&temp_dir, "exit 0"),
            &tracker,
            &mut Vec::new(),
        )
        .unwrap_err();

        assert!(err.to_string().contains("could not determine the ticket number"));
        assert!(err.to_string().contains("Draft idea"));
        assert!(tracker.posted().is_empty());
    }

    #[test]
    fn tracker_failure_before_spawn_aborts() {
        let temp_dir = TempDir::new().unwrap();
        let tracker = FakeTracker {
            fail_backlog: true,
            ..Default::default()
        };
        let err = cmd_run(
            &execute(),
            &config_with_agent(&temp_dir, "exit 0"),
            &tracker,
            &mut Vec::new(),
        )
        .unwrap_err();

        assert!(matches!(err, RunnerError::TrackerError(_)));
        assert!(log_files(&temp_dir).is_empty());
    }

    #[test]
    fn successful_run_posts_one_success_comment() {
        let temp_dir = TempDir::new().unwrap();
        let tracker = FakeTracker::with_backlog(vec![sample_ticket(42, "Fix crash")]);
        let config = config_with_agent(&temp_dir, "cat > /dev/null; sleep 0.2; echo done");

        let code = cmd_run(&execute(), &config, &tracker, &mut Vec::new()).unwrap();
        assert_eq!(code, 0);

        let posted = tracker.posted();
        assert_eq!(posted.len(), 1);
        let (number, body) = &posted[0];
        assert_eq!(*number, 42);
        assert!(body.contains("- Status: SUCCESS"));
        assert!(body.contains("- Exit Code: 0"));

        let url = Regex::new(r"file:///[0-9a-f]{8}/issue_42_\d{8}_\d{6}_[0-9a-f]{8}\.log").unwrap();
        assert!(url.is_match(body), "no masked url in {body}");
        assert!(!body.contains(&temp_dir.path().to_string_lossy().to_string()));
    }

    #[test]
    fn run_log_records_output_progress_and_footer() {
        let temp_dir = TempDir::new().unwrap();
        let tracker = FakeTracker::with_backlog(vec![sample_ticket(42, "Fix crash")]);
        let config = config_with_agent(&temp_dir, "head -n 1; echo oops >&2");

        cmd_run(&execute(), &config, &tracker, &mut Vec::new()).unwrap();

        let files = log_files(&temp_dir);
        assert_eq!(files.len(), 1);
        let name = files[0].file_name().unwrap().to_string_lossy().to_string();
        let expected_digest = mask(&render_prompt(&sample_ticket(42, "Fix crash")));
        assert!(name.starts_with("issue_42_"));
        assert!(name.ends_with(&format!("_{}.log", expected_digest)));

        let log = fs::read_to_string(&files[0]).unwrap();
        assert!(log.contains("✓ Agent run started for ticket #42"));
        assert!(log.contains("[INFO] # Ticket #42: Fix crash"));
        assert!(log.contains("[ERROR] oops"));
        assert!(log.contains("✓ Agent run finished"));
        assert!(log.contains("Issue #42 execution: SUCCESS"));
        assert!(log.contains("✓ Posted comment to ticket #42"));
    }

    #[test]
    fn failed_run_still_posts_and_propagates_exit_code() {
        let temp_dir = TempDir::new().unwrap();
        let tracker = FakeTracker::with_backlog(vec![sample_ticket(42, "Fix crash")]);
        let config = config_with_agent(&temp_dir, "cat > /dev/null; exit 1");

        let code = cmd_run(&execute(), &config, &tracker, &mut Vec::new()).unwrap();
        assert_eq!(code, 1);

        let posted = tracker.posted();
        assert_eq!(posted.len(), 1);
        assert!(posted[0].1.contains("- Status: FAILED"));
        assert!(posted[0].1.contains("- Exit Code: 1"));
    }

    #[test]
    fn agent_exit_code_is_returned_as_is() {
        let temp_dir = TempDir::new().unwrap();
        let tracker = FakeTracker::with_backlog(vec![bare_ticket(9, "x")]);
        let config = config_with_agent(&temp_dir, "exit 42");

        let code = cmd_run(&execute(), &config, &tracker, &mut Vec::new()).unwrap();
        assert_eq!(code, 42);
        assert!(tracker.posted()[0].1.contains("- Exit Code: 42"));
    }

    #[test]
    fn missing_agent_is_reported_as_failure() {
        let temp_dir = TempDir::new().unwrap();
        let tracker = FakeTracker::with_backlog(vec![bare_ticket(9, "x")]);
        let mut config = config_with_agent(&temp_dir, "exit 0");
        config.agent.command = "nonexistent_agent_xyz_123".to_string();

        let code = cmd_run(&execute(), &config, &tracker, &mut Vec::new()).unwrap();
        assert_eq!(code, 1);
        assert!(tracker.posted()[0].1.contains("- Status: FAILED"));

        let log = fs::read_to_string(&log_files(&temp_dir)[0]).unwrap();
        assert!(log.contains("[ERROR] Agent executable 'nonexistent_agent_xyz_123' not found"));
    }

    #[test]
    fn comment_failure_keeps_agent_exit_code() {
        let temp_dir = TempDir::new().unwrap();
        let mut tracker = FakeTracker::with_backlog(vec![bare_ticket(9, "x")]);
        tracker.fail_post = true;

        let code = cmd_run(
            &execute(),
            &config_with_agent(&temp_dir, "exit 0"),
            &tracker,
            &mut Vec::new(),
        )
        .unwrap();
        assert_eq!(code, 0);

        let log = fs::read_to_string(&log_files(&temp_dir)[0]).unwrap();
        assert!(log.contains("[ERROR] Error: Tracker request failed: failed to post comment"));
        assert!(!log.contains("✓ Posted comment"));
    }

    #[test]
    fn each_run_gets_its_own_log_file() {
        let temp_dir = TempDir::new().unwrap();
        let tracker = FakeTracker::with_backlog(vec![bare_ticket(9, "x")]);
        let config = config_with_agent(&temp_dir, "exit 0");

        cmd_run(&execute(), &config, &tracker, &mut Vec::new()).unwrap();
        cmd_run(&execute(), &config, &tracker, &mut Vec::new()).unwrap();

        assert_eq!(log_files(&temp_dir).len(), 2);
        assert_eq!(tracker.posted().len(), 2);
    }

    #[test]
    fn opening_a_run_log_claims_its_name() {
        let temp_dir = TempDir::new().unwrap();
        let config = config_with_agent(&temp_dir, "exit 0");

        // Neither sink has been written to yet.
        let first = open_run_log(&config, 9, "same prompt").unwrap();
        let second = open_run_log(&config, 9, "same prompt").unwrap();

        assert_ne!(first.resource(), second.resource());
        assert_eq!(log_files(&temp_dir).len(), 2);
    }
}
