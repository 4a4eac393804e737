//! GitHub tracker adapter built on the `gh` CLI.
//!
//! Board queries go through `gh api graphql` (projects V2 are GraphQL only);
//! comments go through `gh issue comment`. Authentication is whatever `gh`
//! is already logged in with.

use super::types::{RepoRef, Ticket, TicketState, TicketSummary};
use super::Tracker;
use crate::error::{Result, RunnerError};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::process::Command;

const PROJECT_ITEMS_QUERY: &str = r#"
query($owner:String!, $repo:String!, $number:Int!) {
  repository(owner: $owner, name: $repo) {
    projectV2(number: $number) {
      items(first: 100) {
        nodes {
          id
          content {
            ... on Issue { number title url state }
            ... on PullRequest { number title url state }
          }
          fieldValueByName(name: "Status") {
            ... on ProjectV2ItemFieldSingleSelectValue { name }
          }
        }
      }
    }
  }
}
"#;

const ISSUE_DETAIL_QUERY: &str = r#"
query($owner:String!, $repo:String!, $number:Int!) {
  repository(owner: $owner, name: $repo) {
    issue(number: $number) {
      number
      title
      body
      state
      createdAt
      updatedAt
      author { login }
      labels(first: 10) { nodes { name } }
    }
  }
}
"#;

/// [`Tracker`] implementation that shells out to `gh`.
#[derive(Debug, Clone)]
pub struct GhTracker {
    repo: RepoRef,
    program: String,
}

impl GhTracker {
    pub fn new(repo: RepoRef) -> Self {
        Self {
            repo,
            program: "gh".to_string(),
        }
    }

    fn graphql(&self, query: &str, number: u64) -> Result<String> {
        self.run_gh(&[
            "api".to_string(),
            "graphql".to_string(),
            "-f".to_string(),
            format!("query={}", query),
            "-F".to_string(),
            format!("owner={}", self.repo.owner),
            "-F".to_string(),
            format!("repo={}", self.repo.name),
            "-F".to_string(),
            format!("number={}", number),
        ])
    }

    /// Run `gh` and return its stdout, mapping non-zero exits to tracker errors.
    fn run_gh(&self, args: &[String]) -> Result<String> {
        let subcommand = args.first().map(String::as_str).unwrap_or("");
        tracing::debug!(subcommand, repo = %self.repo, "running gh");

        let output = Command::new(&self.program).args(args).output().map_err(|e| {
            RunnerError::TrackerError(format!(
                "failed to execute {} {}: {}\n\
                 Fix: install the GitHub CLI and run `gh auth login`.",
                self.program, subcommand, e
            ))
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if output.status.success() {
            return Ok(stdout);
        }

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let detail = if stderr.is_empty() { stdout } else { stderr };
        Err(RunnerError::TrackerError(format!(
            "{} {} failed (exit code {}): {}",
            self.program,
            subcommand,
            output.status.code().unwrap_or(-1),
            detail
        )))
    }
}

impl Tracker for GhTracker {
    fn fetch_backlog(&self, project: u32, status: &str) -> Result<Vec<TicketSummary>> {
        let raw = self.graphql(PROJECT_ITEMS_QUERY, u64::from(project))?;
        let tickets = parse_project_items(&raw)?;
        Ok(filter_by_status(tickets, status))
    }

    fn get_ticket_detail(&self, number: u64) -> Result<Ticket> {
        let raw = self.graphql(ISSUE_DETAIL_QUERY, number)?;
        parse_issue_detail(&raw, number)
    }

    fn post_comment(&self, number: u64, body: &str) -> Result<()> {
        self.run_gh(&[
            "issue".to_string(),
            "comment".to_string(),
            number.to_string(),
            "--body".to_string(),
            body.to_string(),
            "--repo".to_string(),
            self.repo.to_string(),
        ])
        .map_err(|e| match e {
            RunnerError::TrackerError(msg) => {
                RunnerError::TrackerError(format!("failed to post comment: {}", msg))
            }
            other => other,
        })?;
        Ok(())
    }
}

// ============================================================================
// Response parsing
// ============================================================================

#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ProjectData {
    repository: Option<ProjectRepository>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProjectRepository {
    project_v2: Option<ProjectV2>,
}

#[derive(Debug, Deserialize)]
struct ProjectV2 {
    items: ItemConnection,
}

#[derive(Debug, Deserialize)]
struct ItemConnection {
    #[serde(default)]
    nodes: Vec<ProjectItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProjectItem {
    content: Option<ItemContent>,
    field_value_by_name: Option<FieldValue>,
}

#[derive(Debug, Deserialize)]
struct ItemContent {
    number: Option<u64>,
    title: Option<String>,
    url: Option<String>,
    state: Option<TicketState>,
}

#[derive(Debug, Deserialize)]
struct FieldValue {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IssueData {
    repository: Option<IssueRepository>,
}

#[derive(Debug, Deserialize)]
struct IssueRepository {
    issue: Option<IssueNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IssueNode {
    number: u64,
    title: String,
    body: Option<String>,
    state: TicketState,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
    author: Option<Author>,
    labels: Option<LabelConnection>,
}

#[derive(Debug, Deserialize)]
struct Author {
    login: String,
}

#[derive(Debug, Deserialize)]
struct LabelConnection {
    #[serde(default)]
    nodes: Vec<Label>,
}

#[derive(Debug, Deserialize)]
struct Label {
    name: String,
}

/// Decode a GraphQL envelope, surfacing `errors` before looking at `data`.
fn decode<T: DeserializeOwned>(raw: &str) -> Result<Option<T>> {
    let response: GraphQlResponse<T> = serde_json::from_str(raw).map_err(|e| {
        RunnerError::TrackerError(format!("invalid JSON from GitHub API: {}", e))
    })?;

    if !response.errors.is_empty() {
        let messages = response
            .errors
            .iter()
            .map(|e| e.message.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        return Err(RunnerError::TrackerError(format!(
            "GitHub API error: {}",
            messages
        )));
    }

    Ok(response.data)
}

fn parse_project_items(raw: &str) -> Result<Vec<TicketSummary>> {
    let nodes = decode::<ProjectData>(raw)?
        .and_then(|d| d.repository)
        .and_then(|r| r.project_v2)
        .map(|p| p.items.nodes)
        .unwrap_or_default();

    let tickets = nodes
        .into_iter()
        .filter_map(|item| {
            let content = item.content?;
            // Draft items come back as an empty object.
            if content.number.is_none() && content.title.is_none() {
                return None;
            }
            Some(TicketSummary {
                number: content.number,
                title: content.title,
                url: content.url,
                state: content.state,
                status: item.field_value_by_name.and_then(|f| f.name),
            })
        })
        .collect();

    Ok(tickets)
}

fn filter_by_status(tickets: Vec<TicketSummary>, status: &str) -> Vec<TicketSummary> {
    if status.is_empty() {
        return tickets;
    }
    tickets
        .into_iter()
        .filter(|t| t.status.as_deref() == Some(status))
        .collect()
}

fn parse_issue_detail(raw: &str, number: u64) -> Result<Ticket> {
    let issue = decode::<IssueData>(raw)?
        .and_then(|d| d.repository)
        .and_then(|r| r.issue)
        .ok_or_else(|| RunnerError::TrackerError(format!("Issue #{} not found", number)))?;

    Ok(Ticket {
        number: issue.number,
        title: issue.title,
        body: issue.body,
        state: issue.state,
        author: issue.author.map(|a| a.login),
        labels: issue
            .labels
            .map(|l| l.nodes.into_iter().map(|n| n.name).collect())
            .unwrap_or_default(),
        created_at: issue.created_at,
        updated_at: issue.updated_at,
    })
}
