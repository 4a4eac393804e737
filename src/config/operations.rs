//! Config loading, validation, and utility operations.

use super::model::{CONFIG_FILE_NAME, Config};
use crate::agent::ExecutionLimits;
use crate::agent::prompt::{Template, parse_prompt_template};
use crate::error::{Result, RunnerError};
use std::path::Path;
use std::time::Duration;

impl Config {
    /// Load config from a YAML file.
    ///
    /// Unknown fields in the YAML are silently ignored for forward compatibility.
    ///
    /// # Returns
    ///
    /// * `Ok(Config)` - Successfully loaded and validated config
    /// * `Err(RunnerError::UserError)` - Read error, parse error or validation failure
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            RunnerError::UserError(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_yaml(&content)
    }

    /// Load the explicit config file, or `.ticket-runner.yaml` in `dir` if
    /// present, or fall back to defaults.
    pub fn load_or_default(explicit: Option<&Path>, dir: &Path) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        let candidate = dir.join(CONFIG_FILE_NAME);
        if candidate.is_file() {
            tracing::debug!(path = %candidate.display(), "loading config");
            Self::load(&candidate)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse config from a YAML string.
    ///
    /// An empty document yields the defaults.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = if yaml.trim().is_empty() {
            Config::default()
        } else {
            serde_yaml::from_str(yaml).map_err(|e| {
                RunnerError::UserError(format!("failed to parse config YAML: {}", e))
            })?
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate config values and return error on invalid values.
    ///
    /// Validation rules:
    /// - `timeout_seconds` must be positive
    /// - `agent.command` must split into at least one word
    /// - `prompt_template`, when set, must parse and only use known variables
    pub fn validate(&self) -> Result<()> {
        if self.timeout_seconds == 0 {
            return Err(RunnerError::UserError(
                "config validation failed: timeout_seconds must be greater than 0".to_string(),
            ));
        }

        if self.backlog_status.trim().is_empty() {
            return Err(RunnerError::UserError(
                "config validation failed: backlog_status must be non-empty".to_string(),
            ));
        }

        self.agent.command_words().map_err(|e| {
            RunnerError::UserError(format!("config validation failed: {}", e))
        })?;

        self.custom_prompt_template()?;

        Ok(())
    }

    /// Time budget for one agent run.
    pub fn limits(&self) -> ExecutionLimits {
        ExecutionLimits {
            timeout: Duration::from_secs(self.timeout_seconds),
            drain_grace: Duration::from_secs(self.drain_grace_seconds),
        }
    }

    /// The parsed custom prompt template, if one is configured.
    pub fn custom_prompt_template(&self) -> Result<Option<Template>> {
        let Some(source) = &self.prompt_template else {
            return Ok(None);
        };
        parse_prompt_template(source).map(Some).map_err(|e| {
            RunnerError::UserError(format!(
                "config validation failed: prompt_template: {}\n\
                 Fix: use only {{number}}, {{title}}, {{body}}, {{state}}, {{author}}, \
                 {{labels}}, {{created_at}}, {{updated_at}}; write literal braces as {{{{ and }}}}.",
                e
            ))
        })
    }
}
