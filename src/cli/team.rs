//! teamtask team command implementation

use serde::Serialize;

use crate::error::Result;
use crate::output::{emit_success, HumanOutput};
use crate::team::{Role, Team, UserProfile};

use super::{GlobalOptions, Workspace};

/// Options for `teamtask team add`
pub struct AddOptions {
    pub name: String,
    pub role: String,
    pub workload: u8,
    pub designation: Option<String>,
    pub id: Option<String>,
    pub global: GlobalOptions,
}

/// Options for `teamtask team workload`
pub struct WorkloadOptions {
    pub id: String,
    pub value: u8,
    pub global: GlobalOptions,
}

#[derive(Serialize)]
struct TeamListReport {
    total: usize,
    members: Vec<UserProfile>,
}

pub fn run_add(options: AddOptions) -> Result<()> {
    let workspace = Workspace::open(&options.global)?;
    let team = Team::new(&workspace.store);

    let profile = team.add(UserProfile {
        id: options.id.unwrap_or_default().trim().to_string(),
        name: options.name,
        role: options.role.parse::<Role>()?,
        current_workload: options.workload,
        designation: options.designation,
    })?;

    let mut human = HumanOutput::new(format!("teamtask team add: {}", profile.name));
    human.push_summary("id", profile.id.clone());
    human.push_summary("role", profile.role.to_string());
    human.push_summary("workload", format!("{}%", profile.current_workload));

    emit_success(options.global.output(), "team add", &profile, Some(&human))
}

pub fn run_list(global: GlobalOptions) -> Result<()> {
    let workspace = Workspace::open(&global)?;
    let members = Team::new(&workspace.store).list()?;

    let mut human = HumanOutput::new(format!("teamtask team list: {} member(s)", members.len()));
    for member in &members {
        let mut line = format!(
            "{}  {} ({}) {}%",
            member.id, member.name, member.role, member.current_workload
        );
        if let Some(designation) = &member.designation {
            line.push_str(&format!(", {designation}"));
        }
        human.push_detail(line);
    }
    if members.is_empty() {
        human.push_next_step("teamtask team add <name> --role employee");
    }

    let report = TeamListReport {
        total: members.len(),
        members,
    };
    emit_success(global.output(), "team list", &report, Some(&human))
}

pub fn run_workload(options: WorkloadOptions) -> Result<()> {
    let workspace = Workspace::open(&options.global)?;
    let profile = Team::new(&workspace.store).set_workload(&options.id, options.value)?;

    let mut human = HumanOutput::new(format!("teamtask team workload: {}", profile.name));
    human.push_summary("workload", format!("{}%", profile.current_workload));

    emit_success(options.global.output(), "team workload", &profile, Some(&human))
}
