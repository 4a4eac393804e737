use crate::error::{Result, RunnerError};
use crate::tracker::types::TicketState;
use crate::tracker::{Ticket, TicketSummary, Tracker};
use chrono::{TimeZone, Utc};
use std::collections::HashMap;
use std::path::Path;
use std::process::Command;
use std::sync::Mutex;
use tempfile::TempDir;

pub(crate) fn create_test_repo(origin: Option<&str>) -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path();

    git(path, &["init"]);
    if let Some(url) = origin {
        git(path, &["remote", "add", "origin", url]);
    }

    temp_dir
}

fn git(repo_dir: &Path, args: &[&str]) {
    let output = Command::new("git")
        .current_dir(repo_dir)
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("failed to execute git {}: {}", args.join(" "), e));

    if !output.status.success() {
        panic!(
            "git {} failed (exit code {:?})\nstderr:\n{}",
            args.join(" "),
            output.status.code(),
            String::from_utf8_lossy(&output.stderr)
        );
    }
}

/// A fully populated ticket.
pub(crate) fn sample_ticket(number: u64, title: &str) -> Ticket {
    Ticket {
        number,
        title: title.to_string(),
        body: Some("The app crashes when the list is empty.".to_string()),
        state: TicketState::Open,
        author: Some("octocat".to_string()),
        labels: vec!["bug".to_string(), "p1".to_string()],
        created_at: Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).single(),
        updated_at: Utc.with_ymd_and_hms(2024, 5, 2, 11, 30, 0).single(),
    }
}

/// A ticket with every optional field missing.
pub(crate) fn bare_ticket(number: u64, title: &str) -> Ticket {
    Ticket {
        number,
        title: title.to_string(),
        body: None,
        state: TicketState::Open,
        author: None,
        labels: vec![],
        created_at: None,
        updated_at: None,
    }
}

pub(crate) fn summary_for(ticket: &Ticket) -> TicketSummary {
    TicketSummary {
        number: Some(ticket.number),
        title: Some(ticket.title.clone()),
        url: Some(format!("https://github.com/acme/app/issues/{}", ticket.number)),
        state: Some(ticket.state),
        status: Some("Backlog".to_string()),
    }
}

/// In-memory tracker that records posted comments.
#[derive(Default)]
pub(crate) struct FakeTracker {
    pub backlog: Vec<TicketSummary>,
    pub tickets: HashMap<u64, Ticket>,
    pub fail_backlog: bool,
    pub fail_post: bool,
    pub comments: Mutex<Vec<(u64, String)>>,
}

impl FakeTracker {
    /// A tracker whose backlog holds exactly the given tickets, in order.
    pub(crate) fn with_backlog(tickets: Vec<Ticket>) -> Self {
        Self {
            backlog: tickets.iter().map(summary_for).collect(),
            tickets: tickets.into_iter().map(|t| (t.number, t)).collect(),
            ..Default::default()
        }
    }

    pub(crate) fn posted(&self) -> Vec<(u64, String)> {
        self.comments.lock().unwrap().clone()
    }
}

impl Tracker for FakeTracker {
    fn fetch_backlog(&self, _project: u32, status: &str) -> Result<Vec<TicketSummary>> {
        if self.fail_backlog {
            return Err(RunnerError::TrackerError("backlog unavailable".to_string()));
        }
        Ok(self
            .backlog
            .iter()
            .filter(|t| t.status.as_deref() == Some(status))
            .cloned()
            .collect())
    }

    fn get_ticket_detail(&self, number: u64) -> Result<Ticket> {
        self.tickets
            .get(&number)
            .cloned()
            .ok_or_else(|| RunnerError::TrackerError(format!("Issue #{} not found", number)))
    }

    fn post_comment(&self, number: u64, body: &str) -> Result<()> {
        if self.fail_post {
            return Err(RunnerError::TrackerError(
                "failed to post comment: HTTP 502".to_string(),
            ));
        }
        self.comments
            .lock()
            .unwrap()
            .push((number, body.to_string()));
        Ok(())
    }
}
