//! CLI argument parsing for ticket-runner.
//!
//! Uses clap derive macros for declarative argument definitions.
//! The run itself lives in the `commands` module.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Ticket-runner: hand the next backlog ticket to a coding agent.
///
/// Takes the first ticket in the project's backlog column, renders a work
/// prompt for it, and either prints the prompt (dry run) or runs the agent
/// on it and posts the outcome back to the ticket (--execute).
#[derive(Parser, Debug)]
#[command(name = "ticket-runner")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Repository owner (default: inferred from the `origin` remote).
    #[arg(short, long)]
    pub owner: Option<String>,

    /// Repository name (default: inferred from the `origin` remote).
    #[arg(short, long)]
    pub repo: Option<String>,

    /// Project board number.
    #[arg(short, long)]
    pub project: u32,

    /// Dry-run output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Prompt)]
    pub format: OutputFormat,

    /// Run the agent on the ticket instead of printing the prompt.
    #[arg(long)]
    pub execute: bool,

    /// Config file (default: .ticket-runner.yaml in the current directory, if present).
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

/// What a dry run prints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// The rendered agent prompt.
    Prompt,
    /// The ticket detail as pretty-printed JSON.
    Json,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
