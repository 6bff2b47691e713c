//! teamtask actor command implementation
//!
//! Provides actor identity helpers (set/show).

use std::path::PathBuf;

use crate::actor;
use crate::error::Result;
use crate::output::{emit_success, HumanOutput};

use super::GlobalOptions;

#[derive(serde::Serialize)]
struct ActorSetReport {
    actor: String,
    path: PathBuf,
}

#[derive(serde::Serialize)]
struct ActorShowReport {
    actor: String,
}

pub fn run_set(id: &str, global: GlobalOptions) -> Result<()> {
    let storage = global.storage();
    let actor_name = actor::persist_actor(&storage, id)?;
    let actor_path = storage.actor_file();

    let report = ActorSetReport {
        actor: actor_name.clone(),
        path: actor_path.clone(),
    };

    let mut human = HumanOutput::new(format!("teamtask actor set: {actor_name}"));
    human.push_summary("actor", actor_name);
    human.push_summary("path", actor_path.display().to_string());
    human.push_next_step("teamtask notify list");

    emit_success(global.output(), "actor set", &report, Some(&human))
}

pub fn run_show(global: GlobalOptions) -> Result<()> {
    let storage = global.storage();
    let actor_name = actor::resolve_actor(Some(&storage), global.actor.as_deref());

    let report = ActorShowReport {
        actor: actor_name.clone(),
    };

    let header = if actor_name == "unknown" {
        "teamtask actor: not set".to_string()
    } else {
        format!("teamtask actor: {actor_name}")
    };

    let mut human = HumanOutput::new(header);
    human.push_summary("actor", actor_name.clone());

    if actor_name == "unknown" {
        human.push_warning("actor not set; using default".to_string());
        human.push_next_step("teamtask actor set <id>");
    }

    emit_success(global.output(), "actor show", &report, Some(&human))
}
