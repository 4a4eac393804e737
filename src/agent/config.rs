//! Agent launch settings.
//!
//! The `agent` section of the config file describes how to start the coding
//! agent in headless, single-shot mode:
//!
//! ```yaml
//! agent:
//!   command: "claude"
//!   output_format: text
//!   verbose: true
//!   allowed_tools: [Read, Grep, WebSearch]
//!   permission_mode: acceptEdits
//!   prompt_argument: true
//! ```
//!
//! `command` is split with shell quoting rules, so wrappers such as
//! `"npx @anthropic-ai/claude-code"` work.

use super::dispatch::AgentCommand;
use crate::error::{Result, RunnerError};
use serde::{Deserialize, Serialize};

/// How to launch the agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    /// Executable plus any leading arguments.
    pub command: String,

    /// Value for `--output-format`.
    pub output_format: String,

    /// Pass `--verbose`.
    pub verbose: bool,

    /// Tools the agent may use without asking (`--allowedTools`).
    pub allowed_tools: Vec<String>,

    /// Value for `--permission-mode`.
    pub permission_mode: String,

    /// Also pass the prompt as `-p <prompt>`; it is always sent on stdin.
    pub prompt_argument: bool,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            command: "claude".to_string(),
            output_format: "text".to_string(),
            verbose: true,
            allowed_tools: vec![
                "Read".to_string(),
                "Grep".to_string(),
                "WebSearch".to_string(),
            ],
            permission_mode: "acceptEdits".to_string(),
            prompt_argument: true,
        }
    }
}

impl AgentSettings {
    /// Split `command` into program and leading arguments.
    pub fn command_words(&self) -> Result<Vec<String>> {
        let words = shell_words::split(&self.command).map_err(|e| {
            RunnerError::UserError(format!(
                "failed to parse agent command '{}': {}\n\
                 Fix: check for unmatched quotes or invalid escape sequences.",
                self.command, e
            ))
        })?;

        if words.is_empty() {
            return Err(RunnerError::UserError(
                "agent command is empty. Set `agent.command` in the config file.".to_string(),
            ));
        }

        Ok(words)
    }

    /// Build the full headless invocation for `prompt`.
    pub fn build_command(&self, prompt: &str) -> Result<AgentCommand> {
        let mut words = self.command_words()?.into_iter();
        let program = words.next().unwrap_or_default();
        let mut args: Vec<String> = words.collect();

        if self.prompt_argument {
            args.push("-p".to_string());
            args.push(prompt.to_string());
        }
        if !self.output_format.is_empty() {
            args.push("--output-format".to_string());
            args.push(self.output_format.clone());
        }
        if self.verbose {
            args.push("--verbose".to_string());
        }
        if !self.allowed_tools.is_empty() {
            args.push("--allowedTools".to_string());
            args.push(self.allowed_tools.join(","));
        }
        if !self.permission_mode.is_empty() {
            args.push("--permission-mode".to_string());
            args.push(self.permission_mode.clone());
        }

        Ok(AgentCommand::new(program, args))
    }
}
