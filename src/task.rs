//! Tasks and their lifecycle.
//!
//! [`TaskService`] is the only writer of tasks. Each mutation compares the
//! stored record with the new one ([`TaskChange`]) and dispatches
//! notifications only for fields that actually changed, so re-saving an
//! unchanged task notifies nobody.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::config::NotificationsConfig;
use crate::error::{Error, Result};
use crate::graph::{self, DependentState};
use crate::notify::{Dispatcher, Notification, RecipientResolver};
use crate::store::{Entity, EntityStore};
use crate::team::Team;

const MAX_PROGRESS: u8 = 100;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Done,
    Blocked,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in-progress",
            TaskStatus::Done => "done",
            TaskStatus::Blocked => "blocked",
        }
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "todo" => Ok(TaskStatus::Todo),
            "in-progress" => Ok(TaskStatus::InProgress),
            "done" => Ok(TaskStatus::Done),
            "blocked" => Ok(TaskStatus::Blocked),
            _ => Err(Error::InvalidArgument(format!(
                "invalid status '{s}': must be todo, in-progress, done, or blocked"
            ))),
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

impl std::str::FromStr for Priority {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            _ => Err(Error::InvalidArgument(format!(
                "invalid priority '{s}': must be low, medium, or high"
            ))),
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: Priority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    #[serde(default)]
    pub dependencies: Vec<String>,
    pub progress: u8,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Task {
    const COLLECTION: &'static str = "tasks";

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }
}

/// Input for a new task
#[derive(Debug, Clone)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: Priority,
    pub due_date: Option<NaiveDate>,
    pub assignee: Option<String>,
    pub dependencies: Vec<String>,
    pub progress: u8,
}

impl NewTask {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            status: TaskStatus::Todo,
            priority: Priority::Medium,
            due_date: None,
            assignee: None,
            dependencies: Vec::new(),
            progress: 0,
        }
    }
}

/// Partial update; `None` leaves a field as stored.
///
/// Nested options clear a field with `Some(None)`.
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
    pub due_date: Option<Option<NaiveDate>>,
    pub assignee: Option<Option<String>>,
    pub dependencies: Option<Vec<String>>,
    pub progress: Option<u8>,
}

impl TaskPatch {
    pub fn status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn progress(progress: u8) -> Self {
        Self {
            progress: Some(progress),
            ..Self::default()
        }
    }

    pub fn assignee(assignee: Option<String>) -> Self {
        Self {
            assignee: Some(assignee),
            ..Self::default()
        }
    }

    fn apply(&self, task: &mut Task) -> Result<()> {
        if let Some(title) = &self.title {
            task.title = normalize_title(title)?;
        }
        if let Some(description) = &self.description {
            task.description = non_empty(description.as_deref());
        }
        if let Some(status) = self.status {
            task.status = status;
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(due_date) = self.due_date {
            task.due_date = due_date;
        }
        if let Some(assignee) = &self.assignee {
            task.assignee = non_empty(assignee.as_deref());
        }
        if let Some(dependencies) = &self.dependencies {
            task.dependencies = dependencies.clone();
        }
        if let Some(progress) = self.progress {
            task.progress = validate_progress(progress)?;
        }
        enforce_done_progress(task);
        Ok(())
    }
}

/// Which fields differ between the stored and the new task
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TaskChange {
    pub details: bool,
    pub status: bool,
    pub progress: bool,
    pub assignee: bool,
    pub dependencies: bool,
    /// Transition into `done` from any other status
    pub completed: bool,
}

impl TaskChange {
    pub fn between(old: &Task, new: &Task) -> Self {
        Self {
            details: old.title != new.title
                || old.description != new.description
                || old.priority != new.priority
                || old.due_date != new.due_date,
            status: old.status != new.status,
            progress: old.progress != new.progress,
            assignee: old.assignee != new.assignee,
            dependencies: old.dependencies != new.dependencies,
            completed: old.status != TaskStatus::Done && new.status == TaskStatus::Done,
        }
    }

    pub fn is_empty(&self) -> bool {
        !(self.details || self.status || self.progress || self.assignee || self.dependencies)
    }
}

/// Result of [`TaskService::update`]
#[derive(Debug, Clone, Serialize)]
pub struct TaskUpdateOutcome {
    pub task: Task,
    pub change: TaskChange,
    pub notifications: Vec<Notification>,
    /// Dependents that became actionable through this update
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unblocked: Vec<String>,
}

/// Result of [`TaskService::create`]
#[derive(Debug, Clone, Serialize)]
pub struct TaskCreateOutcome {
    pub task: Task,
    pub notifications: Vec<Notification>,
}

#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub assignee: Option<String>,
    /// Not done and every dependency done
    pub ready: bool,
}

/// Task CRUD with dependency checks and notification dispatch
pub struct TaskService<'a, S: EntityStore> {
    store: &'a S,
    dispatcher: Dispatcher<'a, S>,
}

impl<'a, S: EntityStore> TaskService<'a, S> {
    pub fn new(
        store: &'a S,
        recipients: &'a dyn RecipientResolver,
        config: &'a NotificationsConfig,
    ) -> Self {
        Self {
            store,
            dispatcher: Dispatcher::new(store, recipients, config),
        }
    }

    pub fn get(&self, id: &str) -> Result<Task> {
        self.store
            .get(id)?
            .ok_or_else(|| Error::TaskNotFound(id.to_string()))
    }

    pub fn list(&self, filter: &TaskFilter) -> Result<Vec<Task>> {
        let tasks: Vec<Task> = self.store.all()?;
        let selected = tasks
            .iter()
            .filter(|task| filter.status.map_or(true, |status| task.status == status))
            .filter(|task| {
                filter
                    .assignee
                    .as_deref()
                    .map_or(true, |assignee| task.assignee.as_deref() == Some(assignee))
            })
            .filter(|task| {
                !filter.ready || (task.status != TaskStatus::Done && graph::is_unblocked(task, &tasks))
            })
            .cloned()
            .collect();
        Ok(selected)
    }

    /// Ids of `task`'s dependencies that are not done yet
    pub fn blocking(&self, task: &Task) -> Result<Vec<String>> {
        let tasks: Vec<Task> = self.store.all()?;
        Ok(graph::blocking_dependencies(task, &tasks))
    }

    pub fn create(&self, input: NewTask, actor: &str) -> Result<TaskCreateOutcome> {
        let tasks: Vec<Task> = self.store.all()?;
        graph::validate_dependencies(None, &input.dependencies, &tasks)?;

        let now = Utc::now();
        let mut task = Task {
            id: String::new(),
            title: normalize_title(&input.title)?,
            description: non_empty(input.description.as_deref()),
            status: input.status,
            priority: input.priority,
            due_date: input.due_date,
            assignee: non_empty(input.assignee.as_deref()),
            dependencies: input.dependencies,
            progress: validate_progress(input.progress)?,
            created_at: now,
            updated_at: now,
        };
        enforce_done_progress(&mut task);
        task.id = self.store.create(task.clone())?;
        tracing::debug!(task = %task.id, actor = %actor, "task created");

        let mut notifications = Vec::new();
        if let Some(assignee) = task.assignee.as_deref() {
            match self.dispatcher.on_assignment(&task, assignee) {
                Ok(notification) => notifications.push(notification),
                Err(err) => {
                    tracing::warn!(task = %task.id, error = %err, "assignment notice failed; removing task");
                    if let Err(undo) = self.store.delete::<Task>(&task.id) {
                        tracing::error!(task = %task.id, error = %undo, "could not remove task after failed dispatch");
                    }
                    return Err(err);
                }
            }
        }
        Ok(TaskCreateOutcome {
            task,
            notifications,
        })
    }

    /// Apply `patch` and notify for what actually changed.
    ///
    /// A transition into `done` sends the completion notice instead of the
    /// progress/status notice, so the manager hears about that event once.
    /// If any notice cannot be stored, the notices already written by this
    /// call are removed and the stored task is restored, leaving the update
    /// safe to retry.
    pub fn update(&self, id: &str, patch: &TaskPatch, actor: &str) -> Result<TaskUpdateOutcome> {
        let current = self.get(id)?;
        let mut next = current.clone();
        patch.apply(&mut next)?;

        let change = TaskChange::between(&current, &next);
        if change.is_empty() {
            tracing::debug!(task = %id, "update is a no-op; nothing dispatched");
            return Ok(TaskUpdateOutcome {
                task: current,
                change,
                notifications: Vec::new(),
                unblocked: Vec::new(),
            });
        }

        if change.dependencies {
            let tasks: Vec<Task> = self.store.all()?;
            graph::validate_dependencies(Some(id), &next.dependencies, &tasks)?;
        }

        let actor_name = Team::new(self.store).display_name(actor)?;
        next.updated_at = Utc::now().max(current.created_at);
        self.store.update(&next)?;

        let mut notifications = Vec::new();
        let unblocked = match self.dispatch_update(&next, change, &actor_name, &mut notifications) {
            Ok(unblocked) => unblocked,
            Err(err) => {
                tracing::warn!(task = %id, error = %err, "dispatch failed; restoring task");
                self.roll_back(&current, &notifications);
                return Err(err);
            }
        };

        Ok(TaskUpdateOutcome {
            task: next,
            change,
            notifications,
            unblocked,
        })
    }

    fn dispatch_update(
        &self,
        next: &Task,
        change: TaskChange,
        actor_name: &str,
        sent: &mut Vec<Notification>,
    ) -> Result<Vec<String>> {
        if change.assignee {
            if let Some(assignee) = next.assignee.as_deref() {
                sent.push(self.dispatcher.on_assignment(next, assignee)?);
            }
        }

        if change.completed {
            sent.extend(self.dispatcher.on_completion(next, actor_name)?);

            // Resolve the full dependent set before any unblock notice goes out.
            let tasks: Vec<Task> = self.store.all()?;
            let dependents: Vec<DependentState> = graph::resolve_unblocked(&next.id, &tasks);
            let unblocked: Vec<String> = dependents
                .iter()
                .filter(|state| state.unblocked)
                .map(|state| state.task.id.clone())
                .collect();
            tracing::info!(
                task = %next.id,
                dependents = dependents.len(),
                unblocked = unblocked.len(),
                "task completed"
            );
            self.dispatcher.dispatch_unblocked(next, &dependents, sent)?;
            return Ok(unblocked);
        }

        if change.status || change.progress {
            sent.extend(self.dispatcher.on_progress_or_status_change(next, actor_name)?);
        }
        Ok(Vec::new())
    }

    fn roll_back(&self, previous: &Task, sent: &[Notification]) {
        for notification in sent {
            if let Err(err) = self.store.delete::<Notification>(&notification.id) {
                tracing::error!(notification = %notification.id, error = %err, "could not remove notification");
            }
        }
        if let Err(err) = self.store.update(previous) {
            tracing::error!(task = %previous.id, error = %err, "could not restore task");
        }
    }

    /// Delete a task nothing depends on.
    pub fn delete(&self, id: &str) -> Result<Task> {
        let task = self.get(id)?;
        let dependents: Vec<Task> = self
            .store
            .query(|other: &Task| other.dependencies.iter().any(|dep| dep == id))?;
        if !dependents.is_empty() {
            let ids: Vec<&str> = dependents.iter().map(|other| other.id.as_str()).collect();
            return Err(Error::InvalidArgument(format!(
                "task {id} is a dependency of {}",
                ids.join(", ")
            )));
        }
        self.store.delete::<Task>(id)?;
        Ok(task)
    }
}

fn enforce_done_progress(task: &mut Task) {
    if task.status == TaskStatus::Done {
        task.progress = MAX_PROGRESS;
    }
}

fn validate_progress(progress: u8) -> Result<u8> {
    if progress > MAX_PROGRESS {
        return Err(Error::InvalidArgument(format!(
            "progress {progress} is outside 0-100"
        )));
    }
    Ok(progress)
}

fn normalize_title(title: &str) -> Result<String> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidArgument("task title cannot be empty".to_string()));
    }
    Ok(trimmed.to_string())
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}
