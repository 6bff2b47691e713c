//! Notifications for task lifecycle events.
//!
//! The [`Dispatcher`] only ever creates records. Reading, marking read and
//! deleting belong to the recipient and go through [`Inbox`], which refuses
//! to touch another recipient's notifications.
//!
//! The dispatcher does not deduplicate. Callers decide whether an event
//! happened by comparing stored and new task state (see
//! [`crate::task::TaskChange`]).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::NotificationsConfig;
use crate::error::{Error, Result};
use crate::graph::DependentState;
use crate::store::{Entity, EntityStore};
use crate::task::Task;
use crate::team::UserProfile;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub recipient: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default)]
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl Entity for Notification {
    const COLLECTION: &'static str = "notifications";

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }
}

/// Picks who hears about progress and completion of a task
pub trait RecipientResolver {
    fn manager_for(&self, task: &Task) -> Option<String>;
}

/// One well-known manager identity for every task
#[derive(Debug, Clone)]
pub struct FixedManager {
    manager_id: String,
}

impl FixedManager {
    pub fn new(manager_id: impl Into<String>) -> Self {
        Self {
            manager_id: manager_id.into(),
        }
    }
}

impl RecipientResolver for FixedManager {
    fn manager_for(&self, _task: &Task) -> Option<String> {
        Some(self.manager_id.clone())
    }
}

/// First manager profile on the team, else a fallback identity
#[derive(Debug, Clone)]
pub struct RosterManager {
    manager_id: Option<String>,
    fallback: String,
}

impl RosterManager {
    pub fn from_profiles(profiles: &[UserProfile], fallback: impl Into<String>) -> Self {
        let manager_id = profiles
            .iter()
            .find(|profile| profile.role == crate::team::Role::Manager)
            .map(|profile| profile.id.clone());
        Self {
            manager_id,
            fallback: fallback.into(),
        }
    }
}

impl RecipientResolver for RosterManager {
    fn manager_for(&self, _task: &Task) -> Option<String> {
        Some(
            self.manager_id
                .clone()
                .unwrap_or_else(|| self.fallback.clone()),
        )
    }
}

/// Creates notification records for task lifecycle events
pub struct Dispatcher<'a, S: EntityStore> {
    store: &'a S,
    recipients: &'a dyn RecipientResolver,
    config: &'a NotificationsConfig,
}

impl<'a, S: EntityStore> Dispatcher<'a, S> {
    pub fn new(
        store: &'a S,
        recipients: &'a dyn RecipientResolver,
        config: &'a NotificationsConfig,
    ) -> Self {
        Self {
            store,
            recipients,
            config,
        }
    }

    /// The task's assignee changed to `employee_id`.
    pub fn on_assignment(&self, task: &Task, employee_id: &str) -> Result<Notification> {
        let message = format!("You have been assigned a new task: \"{}\"", task.title);
        self.send(employee_id, message, task)
    }

    /// Progress or status differs from the stored value.
    pub fn on_progress_or_status_change(
        &self,
        task: &Task,
        actor_name: &str,
    ) -> Result<Option<Notification>> {
        let Some(manager) = self.recipients.manager_for(task) else {
            tracing::debug!(task = %task.id, "no manager recipient; skipping progress notice");
            return Ok(None);
        };
        let message = format!(
            "{actor_name} updated \"{}\": status {}, progress {}%",
            task.title, task.status, task.progress
        );
        self.send(&manager, message, task).map(Some)
    }

    /// The task just moved into `done`.
    pub fn on_completion(&self, task: &Task, actor_name: &str) -> Result<Option<Notification>> {
        let Some(manager) = self.recipients.manager_for(task) else {
            tracing::debug!(task = %task.id, "no manager recipient; skipping completion notice");
            return Ok(None);
        };
        let message = format!("{actor_name} completed \"{}\"", task.title);
        self.send(&manager, message, task).map(Some)
    }

    /// Every dependency of `dependent` is done now that `completed` is.
    /// Unassigned dependents produce nothing.
    pub fn on_dependency_unblocked(
        &self,
        dependent: &Task,
        completed: &Task,
    ) -> Result<Option<Notification>> {
        let Some(assignee) = dependent.assignee.as_deref() else {
            return Ok(None);
        };
        let message = format!(
            "\"{}\" is ready to start: its dependency \"{}\" is done",
            dependent.title, completed.title
        );
        self.send(assignee, message, dependent).map(Some)
    }

    /// Fan out unblock notices for a fully resolved completion event.
    ///
    /// Each notice is pushed to `sent` as soon as it is stored, so a caller
    /// can undo a partial fan-out.
    pub fn dispatch_unblocked(
        &self,
        completed: &Task,
        dependents: &[DependentState],
        sent: &mut Vec<Notification>,
    ) -> Result<()> {
        for state in dependents.iter().filter(|state| state.unblocked) {
            if let Some(notification) = self.on_dependency_unblocked(&state.task, completed)? {
                sent.push(notification);
            }
        }
        Ok(())
    }

    fn send(&self, recipient: &str, message: String, task: &Task) -> Result<Notification> {
        let recipient = recipient.trim();
        if recipient.is_empty() {
            return Err(Error::InvalidArgument(
                "notification recipient cannot be empty".to_string(),
            ));
        }
        let mut notification = Notification {
            id: String::new(),
            recipient: recipient.to_string(),
            message,
            link: Some(self.config.task_link(&task.id)),
            read: false,
            created_at: Utc::now(),
        };
        notification.id = self.store.create(notification.clone())?;
        tracing::debug!(
            notification = %notification.id,
            recipient = %notification.recipient,
            task = %task.id,
            "notification created"
        );
        Ok(notification)
    }
}

/// A recipient's view of their notifications
pub struct Inbox<'a, S: EntityStore> {
    store: &'a S,
}

impl<'a, S: EntityStore> Inbox<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Notifications for `recipient`, newest first.
    pub fn list(&self, recipient: &str) -> Result<Vec<Notification>> {
        let mut items = self
            .store
            .query(|notification: &Notification| notification.recipient == recipient)?;
        items.reverse();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(items)
    }

    pub fn unread_count(&self, recipient: &str) -> Result<usize> {
        Ok(self
            .store
            .query(|notification: &Notification| {
                notification.recipient == recipient && !notification.read
            })?
            .len())
    }

    pub fn mark_read(&self, id: &str, recipient: &str) -> Result<Notification> {
        let mut notification = self.owned(id, recipient)?;
        if !notification.read {
            notification.read = true;
            self.store.update(&notification)?;
        }
        Ok(notification)
    }

    /// Mark every unread notification read; returns how many changed.
    pub fn mark_all_read(&self, recipient: &str) -> Result<usize> {
        let unread = self.store.query(|notification: &Notification| {
            notification.recipient == recipient && !notification.read
        })?;
        for mut notification in unread.iter().cloned() {
            notification.read = true;
            self.store.update(&notification)?;
        }
        Ok(unread.len())
    }

    pub fn delete(&self, id: &str, recipient: &str) -> Result<()> {
        self.owned(id, recipient)?;
        self.store.delete::<Notification>(id)?;
        Ok(())
    }

    /// Delete every notification of `recipient`; returns how many went.
    pub fn delete_all(&self, recipient: &str) -> Result<usize> {
        let items = self
            .store
            .query(|notification: &Notification| notification.recipient == recipient)?;
        let mut removed = 0;
        for notification in &items {
            if self.store.delete::<Notification>(&notification.id)? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    fn owned(&self, id: &str, recipient: &str) -> Result<Notification> {
        match self.store.get::<Notification>(id)? {
            Some(notification) if notification.recipient == recipient => Ok(notification),
            _ => Err(Error::NotificationNotFound(id.to_string())),
        }
    }
}
