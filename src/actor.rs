//! Acting user identity.
//!
//! Actor resolution order:
//! 1) CLI --actor (explicit)
//! 2) TEAMTASK_ACTOR environment variable
//! 3) Persisted workspace value in .teamtask/actor
//! 4) Config default (actor.default) or "unknown"

use crate::config::Config;
use crate::error::{Error, Result};
use crate::storage::Storage;

pub const ACTOR_ENV: &str = "TEAMTASK_ACTOR";

/// Resolve the current actor using CLI, environment, persisted value, and config.
pub fn resolve_actor(storage: Option<&Storage>, cli_actor: Option<&str>) -> String {
    if let Some(actor) = non_empty(cli_actor) {
        return actor.to_string();
    }

    if let Ok(env_actor) = std::env::var(ACTOR_ENV) {
        if let Some(actor) = non_empty(Some(env_actor.as_str())) {
            return actor.to_string();
        }
    }

    if let Some(storage) = storage {
        if let Some(actor) = storage.read_actor() {
            return actor;
        }
        return Config::load_from_dir(storage.root()).actor.default;
    }

    "unknown".to_string()
}

/// Persist the actor identity in `.teamtask/actor`.
pub fn persist_actor(storage: &Storage, actor: &str) -> Result<String> {
    let actor = non_empty(Some(actor))
        .ok_or_else(|| Error::InvalidArgument("actor id cannot be empty".to_string()))?;
    storage.write_actor(actor)?;
    Ok(actor.to_string())
}

fn non_empty(input: Option<&str>) -> Option<&str> {
    input.and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed)
        }
    })
}
