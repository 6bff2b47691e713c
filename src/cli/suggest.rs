//! teamtask suggest command implementation
//!
//! Builds the roster from the team's employees and asks the configured
//! command for an assignment suggestion.

use chrono::Utc;

use crate::error::Result;
use crate::output::{emit_success, HumanOutput};
use crate::suggest::{CommandProvider, Orchestrator, SuggestionRequest};
use crate::task::Priority;
use crate::team::{roster_for_suggestion, Team};

use super::{parse_date, GlobalOptions, Workspace};

/// Options for `teamtask suggest`
pub struct SuggestOptions {
    pub description: String,
    pub priority: String,
    pub date: Option<String>,
    pub global: GlobalOptions,
}

pub fn run(options: SuggestOptions) -> Result<()> {
    let workspace = Workspace::open(&options.global)?;
    let roster = roster_for_suggestion(&Team::new(&workspace.store).list()?);
    let current_date = match options.date.as_deref() {
        Some(raw) => parse_date(raw)?,
        None => Utc::now().date_naive(),
    };
    let request = SuggestionRequest::new(
        options.description,
        options.priority.parse::<Priority>()?,
        roster,
        current_date,
    )?;

    let provider = CommandProvider::new(&workspace.config.suggest.command)?;
    let orchestrator = Orchestrator::new(provider, &workspace.config.suggest);
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let suggestion = runtime.block_on(orchestrator.suggest(&request))?;

    let mut human = HumanOutput::new(format!(
        "teamtask suggest: due {}",
        suggestion.suggested_due_date
    ));
    human.push_summary("due", suggestion.suggested_due_date.to_string());
    human.push_summary("why", suggestion.reasoning_for_due_date.clone());
    for assignee in &suggestion.suggested_assignees {
        human.push_detail(format!(
            "assign {}: {}",
            assignee.name, assignee.reasoning_for_assignment
        ));
    }
    for projection in &suggestion.projected_workload_after_assignment {
        human.push_detail(format!(
            "{} -> {}%",
            projection.name, projection.projected_workload
        ));
    }

    emit_success(options.global.output(), "suggest", &suggestion, Some(&human))
}
