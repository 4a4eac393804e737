//! Ticket-runner: hand the next backlog ticket to a coding agent.
//!
//! This is the main entry point for the `ticket-runner` CLI. It parses
//! arguments, resolves the repository and config, runs the ticket, and maps
//! the outcome to a process exit code.

mod agent;
mod cli;
mod commands;
pub mod config;
pub mod error;
pub mod exit_codes;
pub mod git;
mod report;
mod tracker;

#[cfg(test)]
mod test_support;

use clap::CommandFactory;
use clap::error::ErrorKind;
use cli::Cli;
use commands::RunRequest;
use config::Config;
use error::{Result, RunnerError};
use git::{GitRemoteProbe, resolve_repository};
use std::process::ExitCode;
use tracker::GhTracker;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the diagnostics filter (e.g. `debug`).
const LOG_ENV: &str = "TICKET_RUNNER_LOG";

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse_args();

    match run(cli) {
        Ok(code) => ExitCode::from(exit_codes::process_exit_code(code)),
        Err(RunnerError::UsageError(msg)) => {
            // Same shape and exit code as clap's own argument errors.
            Cli::command().error(ErrorKind::MissingRequiredArgument, msg).exit()
        }
        Err(err) => {
            // Print user-actionable error message to stderr
            eprintln!("Error: {}", err);
            ExitCode::from(exit_codes::process_exit_code(err.exit_code()))
        }
    }
}

fn run(cli: Cli) -> Result<i32> {
    let cwd = std::env::current_dir()
        .map_err(|e| RunnerError::UserError(format!("failed to read current directory: {}", e)))?;

    let config = Config::load_or_default(cli.config.as_deref(), &cwd)?;
    let repo = resolve_repository(cli.owner, cli.repo, &GitRemoteProbe::new(&cwd))?;
    tracing::debug!(%repo, project = cli.project, "resolved target");

    let request = RunRequest {
        project: cli.project,
        format: cli.format,
        execute: cli.execute,
    };
    let tracker = GhTracker::new(repo);
    let mut stdout = std::io::stdout().lock();

    commands::cmd_run(&request, &config, &tracker, &mut stdout)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
