//! Prompt generation for agent execution.
//!
//! This module provides:
//!
//! - **Template**: Parsed `{variable}` templates with validation up front
//! - **Context**: Ticket fields with fallback text for missing values
//!
//! The built-in template asks the agent to work the ticket end to end on a
//! `feature/<number>` branch and open an auto-merging pull request that
//! closes the ticket. A custom template can replace it through config; it
//! may use the same variables (see [`TEMPLATE_VARIABLES`]).

mod context;
mod template;

pub use context::{TEMPLATE_VARIABLES, TicketContext};
pub use template::{Template, TemplateError};

use crate::tracker::Ticket;
use std::sync::LazyLock;

/// The built-in prompt template.
pub const DEFAULT_PROMPT_TEMPLATE: &str = r##"# Ticket #{number}: {title}

## Summary
{body}

## Metadata
- **State**: {state}
- **Author**: {author}
- **Labels**: {labels}
- **Created**: {created_at}
- **Updated**: {updated_at}

## Instructions
Work on this ticket by carrying out the following steps:

1. Switch to the `feature/{number}` branch. If it does not exist, check out `master`, pull the latest changes, and create the branch from there.
2. Implement the change described above.
3. Add appropriate tests.
4. Update documentation where needed.
5. Commit the changes and open a pull request.

    - Title the pull request "#{number}: <summary of the change>".
    - End the pull request body with "Close #{number}" so the ticket is closed automatically.
    - Enable auto-merge on the pull request.

6. Switch back to the `master` branch.

Pay attention to code quality and follow the project's conventions."##;

static BUILTIN: LazyLock<Template> = LazyLock::new(|| {
    // A parse failure here is caught by `builtin_template_parses`.
    parse_prompt_template(DEFAULT_PROMPT_TEMPLATE)
        .unwrap_or_else(|_| Template::literal(DEFAULT_PROMPT_TEMPLATE))
});

/// Parse a prompt template against the ticket variables.
pub fn parse_prompt_template(source: &str) -> Result<Template, TemplateError> {
    Template::parse(source, TEMPLATE_VARIABLES)
}

/// Render the built-in prompt for a ticket.
pub fn render_prompt(ticket: &Ticket) -> String {
    render_prompt_with(&BUILTIN, ticket)
}

/// Render `template` for a ticket.
pub fn render_prompt_with(template: &Template, ticket: &Ticket) -> String {
    template.render(&TicketContext::from_ticket(ticket).to_template_vars())
}
