//! teamtask task command implementation
//!
//! Create, edit, complete, list, show and delete tasks. Every mutation goes
//! through `TaskService`, which dispatches the notifications.

use serde::Serialize;

use crate::error::Result;
use crate::notify::Notification;
use crate::output::{emit_success, HumanOutput};
use crate::task::{
    NewTask, Priority, Task, TaskFilter, TaskPatch, TaskService, TaskStatus, TaskUpdateOutcome,
};

use super::{parse_date, GlobalOptions, Workspace};

/// Options for `teamtask task add`
pub struct AddOptions {
    pub title: String,
    pub description: Option<String>,
    pub priority: String,
    pub status: String,
    pub due: Option<String>,
    pub assignee: Option<String>,
    pub depends_on: Vec<String>,
    pub progress: u8,
    pub global: GlobalOptions,
}

/// Options for `teamtask task edit`
pub struct EditOptions {
    pub id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<String>,
    pub status: Option<String>,
    pub due: Option<String>,
    pub clear_due: bool,
    pub assignee: Option<String>,
    pub unassign: bool,
    pub depends_on: Vec<String>,
    pub clear_deps: bool,
    pub progress: Option<u8>,
    pub global: GlobalOptions,
}

/// Options for `teamtask task done`
pub struct DoneOptions {
    pub id: String,
    pub global: GlobalOptions,
}

/// Options for `teamtask task list`
pub struct ListOptions {
    pub status: Option<String>,
    pub assignee: Option<String>,
    pub ready: bool,
    pub global: GlobalOptions,
}

/// Options for `teamtask task show`
pub struct ShowOptions {
    pub id: String,
    pub global: GlobalOptions,
}

/// Options for `teamtask task rm`
pub struct RmOptions {
    pub id: String,
    pub global: GlobalOptions,
}

#[derive(Serialize)]
struct TaskListReport {
    total: usize,
    tasks: Vec<Task>,
}

#[derive(Serialize)]
struct TaskShowReport {
    task: Task,
    blocked_by: Vec<String>,
}

pub fn run_add(options: AddOptions) -> Result<()> {
    let workspace = Workspace::open(&options.global)?;
    let recipients = workspace.recipients()?;
    let service = TaskService::new(
        &workspace.store,
        recipients.as_ref(),
        &workspace.config.notifications,
    );

    let mut input = NewTask::new(options.title);
    input.description = options.description;
    input.priority = options.priority.parse::<Priority>()?;
    input.status = options.status.parse::<TaskStatus>()?;
    input.due_date = options.due.as_deref().map(parse_date).transpose()?;
    input.assignee = options.assignee;
    input.dependencies = options.depends_on;
    input.progress = options.progress;

    let outcome = service.create(input, &workspace.actor)?;

    let mut human = HumanOutput::new(format!("teamtask task add: {}", outcome.task.title));
    push_task_summary(&mut human, &outcome.task);
    push_notifications(&mut human, &outcome.notifications);
    human.push_next_step(format!("teamtask task show {}", outcome.task.id));

    emit_success(options.global.output(), "task add", &outcome, Some(&human))
}

pub fn run_edit(options: EditOptions) -> Result<()> {
    let workspace = Workspace::open(&options.global)?;
    let recipients = workspace.recipients()?;
    let service = TaskService::new(
        &workspace.store,
        recipients.as_ref(),
        &workspace.config.notifications,
    );

    let patch = TaskPatch {
        title: options.title,
        description: options.description.map(Some),
        status: options.status.as_deref().map(str::parse).transpose()?,
        priority: options.priority.as_deref().map(str::parse).transpose()?,
        due_date: if options.clear_due {
            Some(None)
        } else {
            options.due.as_deref().map(parse_date).transpose()?.map(Some)
        },
        assignee: if options.unassign {
            Some(None)
        } else {
            options.assignee.map(Some)
        },
        dependencies: if options.clear_deps {
            Some(Vec::new())
        } else if options.depends_on.is_empty() {
            None
        } else {
            Some(options.depends_on)
        },
        progress: options.progress,
    };

    let outcome = service.update(&options.id, &patch, &workspace.actor)?;
    emit_update("task edit", &outcome, &options.global)
}

pub fn run_done(options: DoneOptions) -> Result<()> {
    let workspace = Workspace::open(&options.global)?;
    let recipients = workspace.recipients()?;
    let service = TaskService::new(
        &workspace.store,
        recipients.as_ref(),
        &workspace.config.notifications,
    );

    let outcome = service.update(
        &options.id,
        &TaskPatch::status(TaskStatus::Done),
        &workspace.actor,
    )?;
    emit_update("task done", &outcome, &options.global)
}

pub fn run_list(options: ListOptions) -> Result<()> {
    let workspace = Workspace::open(&options.global)?;
    let recipients = workspace.recipients()?;
    let service = TaskService::new(
        &workspace.store,
        recipients.as_ref(),
        &workspace.config.notifications,
    );

    let filter = TaskFilter {
        status: options.status.as_deref().map(str::parse).transpose()?,
        assignee: options.assignee,
        ready: options.ready,
    };
    let tasks = service.list(&filter)?;

    let mut human = HumanOutput::new(format!("teamtask task list: {} task(s)", tasks.len()));
    for task in &tasks {
        human.push_detail(task_line(task));
    }
    if tasks.is_empty() {
        human.push_next_step("teamtask task add \"<title>\"");
    }

    let report = TaskListReport {
        total: tasks.len(),
        tasks,
    };
    emit_success(options.global.output(), "task list", &report, Some(&human))
}

pub fn run_show(options: ShowOptions) -> Result<()> {
    let workspace = Workspace::open(&options.global)?;
    let recipients = workspace.recipients()?;
    let service = TaskService::new(
        &workspace.store,
        recipients.as_ref(),
        &workspace.config.notifications,
    );

    let task = service.get(&options.id)?;
    let blocked_by = service.blocking(&task)?;

    let mut human = HumanOutput::new(format!("teamtask task show: {}", task.title));
    push_task_summary(&mut human, &task);
    if let Some(description) = &task.description {
        human.push_detail(description.clone());
    }
    for dependency in &blocked_by {
        human.push_warning(format!("waiting on {dependency}"));
    }

    let report = TaskShowReport { task, blocked_by };
    emit_success(options.global.output(), "task show", &report, Some(&human))
}

pub fn run_rm(options: RmOptions) -> Result<()> {
    let workspace = Workspace::open(&options.global)?;
    let recipients = workspace.recipients()?;
    let service = TaskService::new(
        &workspace.store,
        recipients.as_ref(),
        &workspace.config.notifications,
    );

    let task = service.delete(&options.id)?;

    let mut human = HumanOutput::new(format!("teamtask task rm: {}", task.title));
    human.push_summary("id", task.id.clone());

    emit_success(options.global.output(), "task rm", &task, Some(&human))
}

fn emit_update(command: &str, outcome: &TaskUpdateOutcome, global: &GlobalOptions) -> Result<()> {
    let mut human = HumanOutput::new(format!("teamtask {command}: {}", outcome.task.title));
    push_task_summary(&mut human, &outcome.task);
    if outcome.change.is_empty() {
        human.push_warning("nothing changed");
    }
    push_notifications(&mut human, &outcome.notifications);
    for id in &outcome.unblocked {
        human.push_detail(format!("unblocked {id}"));
    }
    emit_success(global.output(), command, outcome, Some(&human))
}

fn push_task_summary(human: &mut HumanOutput, task: &Task) {
    human.push_summary("id", task.id.clone());
    human.push_summary("status", task.status.to_string());
    human.push_summary("progress", format!("{}%", task.progress));
    human.push_summary("priority", task.priority.to_string());
    if let Some(assignee) = &task.assignee {
        human.push_summary("assignee", assignee.clone());
    }
    if let Some(due_date) = task.due_date {
        human.push_summary("due", due_date.to_string());
    }
    if !task.dependencies.is_empty() {
        human.push_summary("depends on", task.dependencies.join(", "));
    }
}

fn push_notifications(human: &mut HumanOutput, notifications: &[Notification]) {
    for notification in notifications {
        human.push_detail(format!(
            "notified {}: {}",
            notification.recipient, notification.message
        ));
    }
}

fn task_line(task: &Task) -> String {
    let mut line = format!(
        "{}  [{}] {:>3}%  {}",
        task.id, task.status, task.progress, task.title
    );
    if let Some(assignee) = &task.assignee {
        line.push_str(&format!("  @{assignee}"));
    }
    line
}
