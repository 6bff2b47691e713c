//! Team members and their workload.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::store::{Entity, EntityStore};
use crate::suggest::RosterMember;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Manager,
    Employee,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Manager => "manager",
            Role::Employee => "employee",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "manager" => Ok(Role::Manager),
            "employee" => Ok(Role::Employee),
            _ => Err(Error::InvalidArgument(format!(
                "invalid role '{s}': must be manager or employee"
            ))),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub role: Role,
    /// Percentage of capacity in use, 0-100
    pub current_workload: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub designation: Option<String>,
}

impl Entity for UserProfile {
    const COLLECTION: &'static str = "users";

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }
}

pub fn validate_workload(value: u8) -> Result<u8> {
    if value > 100 {
        return Err(Error::InvalidArgument(format!(
            "workload {value} is outside 0-100"
        )));
    }
    Ok(value)
}

/// Ordered suggestion roster from employee profiles.
pub fn roster_for_suggestion(profiles: &[UserProfile]) -> Vec<RosterMember> {
    profiles
        .iter()
        .filter(|profile| profile.role == Role::Employee)
        .map(|profile| RosterMember {
            name: profile.name.clone(),
            current_workload: profile.current_workload,
        })
        .collect()
}

/// Team roster operations over an entity store
pub struct Team<'a, S: EntityStore> {
    store: &'a S,
}

impl<'a, S: EntityStore> Team<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Add a member. An empty `id` gets a generated one.
    pub fn add(&self, mut profile: UserProfile) -> Result<UserProfile> {
        profile.name = profile.name.trim().to_string();
        if profile.name.is_empty() {
            return Err(Error::InvalidArgument("user name cannot be empty".to_string()));
        }
        validate_workload(profile.current_workload)?;
        let name = profile.name.clone();
        if !self
            .store
            .query(|existing: &UserProfile| existing.name == name)?
            .is_empty()
        {
            return Err(Error::InvalidArgument(format!(
                "a team member named '{name}' already exists"
            )));
        }
        let id = self.store.create(profile.clone())?;
        profile.id = id;
        Ok(profile)
    }

    pub fn get(&self, id: &str) -> Result<UserProfile> {
        self.store
            .get(id)?
            .ok_or_else(|| Error::UserNotFound(id.to_string()))
    }

    pub fn list(&self) -> Result<Vec<UserProfile>> {
        self.store.all()
    }

    pub fn managers(&self) -> Result<Vec<UserProfile>> {
        self.store
            .query(|profile: &UserProfile| profile.role == Role::Manager)
    }

    pub fn set_workload(&self, id: &str, workload: u8) -> Result<UserProfile> {
        let mut profile = self.get(id)?;
        profile.current_workload = validate_workload(workload)?;
        self.store.update(&profile)?;
        Ok(profile)
    }

    /// Display name for an actor id, falling back to the id itself.
    pub fn display_name(&self, id: &str) -> Result<String> {
        Ok(self
            .store
            .get::<UserProfile>(id)?
            .map(|profile| profile.name)
            .unwrap_or_else(|| id.to_string()))
    }
}
