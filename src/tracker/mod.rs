//! Issue tracker boundary.
//!
//! The orchestrator only needs three capabilities from a tracker: list the
//! tickets in a board column, read one ticket in full, and post a comment.
//! They are expressed as the [`Tracker`] trait so the run loop can be
//! exercised against an in-memory tracker in tests.
//!
//! - **Types**: `Ticket`, `TicketSummary`, `RepoRef`
//! - **Gh**: `GhTracker`, an adapter over the GitHub CLI (`gh`)

mod gh;
pub(crate) mod types;

pub use gh::GhTracker;
pub use types::{RepoRef, Ticket, TicketSummary};

use crate::error::Result;

/// Capabilities consumed from the external issue tracker.
///
/// Every method may fail with `RunnerError::TrackerError`; callers treat
/// such failures as fatal for the invocation unless stated otherwise.
pub trait Tracker {
    /// Tickets in `project` whose status column equals `status`, in board order.
    fn fetch_backlog(&self, project: u32, status: &str) -> Result<Vec<TicketSummary>>;

    /// Full detail for one ticket.
    fn get_ticket_detail(&self, number: u64) -> Result<Ticket>;

    /// Post `body` as a new comment on the ticket.
    fn post_comment(&self, number: u64, body: &str) -> Result<()>;
}
