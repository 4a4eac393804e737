//! Config struct definition and default implementation.

use crate::agent::AgentSettings;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// File looked up in the current directory when `--config` is not given.
pub const CONFIG_FILE_NAME: &str = ".ticket-runner.yaml";

/// Configuration for a ticket run.
///
/// Unknown fields in the YAML are ignored for forward compatibility.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // =========================================================================
    // Run settings
    // =========================================================================
    /// Directory for per-run log files (default: "logs").
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,

    /// Board column the next ticket is taken from (default: "Backlog").
    #[serde(default = "default_backlog_status")]
    pub backlog_status: String,

    /// Seconds before a running agent is killed (default: 1800).
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Seconds to wait for remaining agent output after exit or kill (default: 5).
    #[serde(default = "default_drain_grace_seconds")]
    pub drain_grace_seconds: u64,

    // =========================================================================
    // Agent settings
    // =========================================================================
    /// How the agent is launched.
    pub agent: AgentSettings,

    /// Replacement for the built-in prompt template.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_template: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_dir: default_log_dir(),
            backlog_status: default_backlog_status(),
            timeout_seconds: default_timeout_seconds(),
            drain_grace_seconds: default_drain_grace_seconds(),
            agent: AgentSettings::default(),
            prompt_template: None,
        }
    }
}

pub(super) fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

pub(super) fn default_backlog_status() -> String {
    "Backlog".to_string()
}

pub(super) fn default_timeout_seconds() -> u64 {
    30 * 60
}

pub(super) fn default_drain_grace_seconds() -> u64 {
    5
}
