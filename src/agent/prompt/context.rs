//! Ticket context extraction for prompt generation.
//!
//! Every template variable has a value for every ticket: optional fields
//! that are missing are replaced with fixed fallback text.

use crate::tracker::Ticket;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Rendered when the ticket has no body (or an empty one).
const NO_DESCRIPTION: &str = "No description provided.";
/// Rendered when the ticket has no labels.
const NO_LABELS: &str = "none";
/// Rendered for a missing author or timestamp.
const UNKNOWN: &str = "unknown";

/// Variables available to prompt templates.
pub const TEMPLATE_VARIABLES: &[&str] = &[
    "number",
    "title",
    "body",
    "state",
    "author",
    "labels",
    "created_at",
    "updated_at",
];

/// Display-ready values extracted from a ticket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketContext {
    pub number: String,
    pub title: String,
    pub body: String,
    pub state: String,
    pub author: String,
    pub labels: String,
    pub created_at: String,
    pub updated_at: String,
}

impl TicketContext {
    pub fn from_ticket(ticket: &Ticket) -> Self {
        // Trim only to detect an empty body; render it verbatim.
        let body = ticket
            .body
            .as_deref()
            .filter(|b| !b.trim().is_empty())
            .unwrap_or(NO_DESCRIPTION)
            .to_string();

        let labels = if ticket.labels.is_empty() {
            NO_LABELS.to_string()
        } else {
            ticket.labels.join(", ")
        };

        Self {
            number: ticket.number.to_string(),
            title: ticket.title.clone(),
            body,
            state: ticket.state.to_string(),
            author: ticket
                .author
                .clone()
                .filter(|a| !a.is_empty())
                .unwrap_or_else(|| UNKNOWN.to_string()),
            labels,
            created_at: format_timestamp(ticket.created_at),
            updated_at: format_timestamp(ticket.updated_at),
        }
    }

    /// Convert the context to template variables.
    pub fn to_template_vars(&self) -> HashMap<&'static str, String> {
        HashMap::from([
            ("number", self.number.clone()),
            ("title", self.title.clone()),
            ("body", self.body.clone()),
            ("state", self.state.clone()),
            ("author", self.author.clone()),
            ("labels", self.labels.clone()),
            ("created_at", self.created_at.clone()),
            ("updated_at", self.updated_at.clone()),
        ])
    }
}

fn format_timestamp(ts: Option<DateTime<Utc>>) -> String {
    ts.map(|t| t.to_rfc3339())
        .unwrap_or_else(|| UNKNOWN.to_string())
}
