//! Repository resolution from the local git checkout.
//!
//! The owner/repo pair is resolved in a fixed order: explicit flag, then the
//! value inferred from `remote.origin.url`, then a usage error. Inference
//! goes through the [`RemoteProbe`] trait so the resolver never reads
//! process-wide state on its own.

use crate::error::{Result, RunnerError};
use crate::tracker::RepoRef;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::LazyLock;

static GITHUB_REMOTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"github\.com[/:]([\w.-]+)/([\w.-]+?)(?:\.git)?/?$")
        .expect("Invalid GitHub remote regex")
});

/// Source of the `origin` remote URL.
pub trait RemoteProbe {
    /// Returns the configured origin URL, or `None` when there is none.
    fn origin_url(&self) -> Option<String>;
}

/// Reads `remote.origin.url` with `git config` in a given directory.
#[derive(Debug, Clone)]
pub struct GitRemoteProbe {
    cwd: PathBuf,
}

impl GitRemoteProbe {
    pub fn new<P: AsRef<Path>>(cwd: P) -> Self {
        Self {
            cwd: cwd.as_ref().to_path_buf(),
        }
    }
}

impl RemoteProbe for GitRemoteProbe {
    fn origin_url(&self) -> Option<String> {
        let output = Command::new("git")
            .current_dir(&self.cwd)
            .args(["config", "--get", "remote.origin.url"])
            .output()
            .map_err(|e| tracing::debug!(error = %e, "failed to execute git"))
            .ok()?;

        if !output.status.success() {
            return None;
        }

        let url = String::from_utf8_lossy(&output.stdout).trim().to_string();
        (!url.is_empty()).then_some(url)
    }
}

/// Extract `(owner, repo)` from a GitHub remote URL.
///
/// Accepts both `https://github.com/owner/repo(.git)` and
/// `git@github.com:owner/repo(.git)` forms.
pub fn parse_github_remote(url: &str) -> Option<(String, String)> {
    let caps = GITHUB_REMOTE.captures(url.trim())?;
    Some((caps[1].to_string(), caps[2].to_string()))
}

/// Resolve the repository to work on.
///
/// Each half prefers its explicit override; missing halves fall back to the
/// origin remote. If either half is still unknown the result is a
/// `UsageError`.
pub fn resolve_repository(
    owner: Option<String>,
    repo: Option<String>,
    probe: &dyn RemoteProbe,
) -> Result<RepoRef> {
    let inferred = if owner.is_none() || repo.is_none() {
        probe.origin_url().and_then(|url| parse_github_remote(&url))
    } else {
        None
    };
    let (inferred_owner, inferred_repo) = inferred.unzip();

    match (owner.or(inferred_owner), repo.or(inferred_repo)) {
        (Some(owner), Some(repo)) if !owner.is_empty() && !repo.is_empty() => {
            Ok(RepoRef::new(owner, repo))
        }
        _ => Err(RunnerError::UsageError(
            "cannot determine the repository owner and name.\n\
             Check `git remote get-url origin`, or pass -o/--owner and -r/--repo explicitly."
                .to_string(),
        )),
    }
}
