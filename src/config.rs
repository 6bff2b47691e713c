//! Configuration loading and management
//!
//! Handles parsing of `.teamtask.toml` configuration files.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Name of the configuration file at the workspace root
pub const CONFIG_FILE: &str = ".teamtask.toml";

const MAX_SUGGEST_RETRIES: u32 = 5;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Actor configuration
    #[serde(default)]
    pub actor: ActorConfig,

    /// Notification routing
    #[serde(default)]
    pub notifications: NotificationsConfig,

    /// Assignment suggestion provider
    #[serde(default)]
    pub suggest: SuggestConfig,
}

/// Actor-related configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorConfig {
    /// Default acting user id when none specified
    #[serde(default = "default_actor")]
    pub default: String,
}

fn default_actor() -> String {
    "unknown".to_string()
}

impl Default for ActorConfig {
    fn default() -> Self {
        Self {
            default: default_actor(),
        }
    }
}

/// How the manager recipient of progress and completion notices is chosen
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RecipientMode {
    /// Always `notifications.manager_id`
    Fixed,
    /// First manager profile in the team roster, falling back to `manager_id`
    Roster,
}

/// Notification configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    /// The well-known manager identity
    #[serde(default = "default_manager_id")]
    pub manager_id: String,

    /// Prefix for task deep links (`<prefix><task-id>`)
    #[serde(default = "default_link_prefix")]
    pub link_prefix: String,

    /// Manager recipient selection
    #[serde(default = "default_recipient_mode")]
    pub recipient: RecipientMode,
}

fn default_manager_id() -> String {
    "manager".to_string()
}

fn default_link_prefix() -> String {
    "/tasks/".to_string()
}

fn default_recipient_mode() -> RecipientMode {
    RecipientMode::Fixed
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            manager_id: default_manager_id(),
            link_prefix: default_link_prefix(),
            recipient: default_recipient_mode(),
        }
    }
}

impl NotificationsConfig {
    /// Deep link for a task
    pub fn task_link(&self, task_id: &str) -> String {
        format!("{}{}", self.link_prefix, task_id)
    }
}

/// Suggestion provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestConfig {
    /// Command (argv) that answers suggestion requests on stdin/stdout
    #[serde(default)]
    pub command: Vec<String>,

    /// Upper bound on a single provider call
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Extra attempts after a failed or empty provider call
    #[serde(default)]
    pub retries: u32,
}

fn default_timeout_secs() -> u64 {
    60
}

impl Default for SuggestConfig {
    fn default() -> Self {
        Self {
            command: Vec::new(),
            timeout_secs: default_timeout_secs(),
            retries: 0,
        }
    }
}

impl SuggestConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    fn validate(&self) -> crate::error::Result<()> {
        if self.timeout_secs == 0 {
            return Err(crate::error::Error::InvalidConfig(
                "suggest.timeout_secs must be > 0".to_string(),
            ));
        }
        if self.retries > MAX_SUGGEST_RETRIES {
            return Err(crate::error::Error::InvalidConfig(format!(
                "suggest.retries must be <= {MAX_SUGGEST_RETRIES}"
            )));
        }
        if self.command.iter().any(|arg| arg.trim().is_empty()) {
            return Err(crate::error::Error::InvalidConfig(
                "suggest.command cannot include empty entries".to_string(),
            ));
        }
        Ok(())
    }
}

impl NotificationsConfig {
    fn validate(&self) -> crate::error::Result<()> {
        if self.manager_id.trim().is_empty() {
            return Err(crate::error::Error::InvalidConfig(
                "notifications.manager_id cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl Config {
    /// Load configuration from a `.teamtask.toml` file
    pub fn load(path: &Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a workspace directory, or return defaults
    pub fn load_from_dir(root: &Path) -> Self {
        let config_path = root.join(CONFIG_FILE);
        if !config_path.exists() {
            return Self::default();
        }
        match Self::load(&config_path) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!(path = %config_path.display(), error = %err, "ignoring invalid config");
                Self::default()
            }
        }
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> crate::error::Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    fn validate(&self) -> crate::error::Result<()> {
        if self.actor.default.trim().is_empty() {
            return Err(crate::error::Error::InvalidConfig(
                "actor.default cannot be empty".to_string(),
            ));
        }
        self.notifications.validate()?;
        self.suggest.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.notifications.manager_id, "manager");
        assert_eq!(config.suggest.timeout(), Duration::from_secs(60));
        assert_eq!(config.suggest.retries, 0);
    }

    #[test]
    fn task_link_uses_prefix() {
        let config = NotificationsConfig::default();
        assert_eq!(config.task_link("01ABC"), "/tasks/01ABC");
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let mut config = Config::default();
        config.suggest.timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn excessive_retries_are_rejected() {
        let mut config = Config::default();
        config.suggest.retries = MAX_SUGGEST_RETRIES + 1;
        assert!(config.validate().is_err());
    }
}
