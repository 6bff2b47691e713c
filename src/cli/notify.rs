//! teamtask notify command implementation
//!
//! Operates on the inbox of the resolved actor.

use serde::Serialize;

use crate::error::Result;
use crate::notify::{Inbox, Notification};
use crate::output::{emit_success, HumanOutput};

use super::{GlobalOptions, Workspace};

#[derive(Serialize)]
struct InboxReport {
    recipient: String,
    unread: usize,
    notifications: Vec<Notification>,
}

#[derive(Serialize)]
struct CountReport {
    recipient: String,
    count: usize,
}

pub fn run_list(unread_only: bool, global: GlobalOptions) -> Result<()> {
    let workspace = Workspace::open(&global)?;
    let inbox = Inbox::new(&workspace.store);

    let mut notifications = inbox.list(&workspace.actor)?;
    if unread_only {
        notifications.retain(|notification| !notification.read);
    }
    let unread = inbox.unread_count(&workspace.actor)?;

    let mut human = HumanOutput::new(format!(
        "teamtask notify list: {} notification(s), {unread} unread",
        notifications.len()
    ));
    for notification in &notifications {
        let marker = if notification.read { " " } else { "*" };
        let mut line = format!(
            "{marker} {}  {}  {}",
            notification.id,
            notification.created_at.format("%Y-%m-%d %H:%M"),
            notification.message
        );
        if let Some(link) = &notification.link {
            line.push_str(&format!(" ({link})"));
        }
        human.push_detail(line);
    }
    if unread > 0 {
        human.push_next_step("teamtask notify read-all");
    }

    let report = InboxReport {
        recipient: workspace.actor.clone(),
        unread,
        notifications,
    };
    emit_success(global.output(), "notify list", &report, Some(&human))
}

pub fn run_read(id: &str, global: GlobalOptions) -> Result<()> {
    let workspace = Workspace::open(&global)?;
    let notification = Inbox::new(&workspace.store).mark_read(id, &workspace.actor)?;

    let mut human = HumanOutput::new(format!("teamtask notify read: {}", notification.id));
    human.push_detail(notification.message.clone());

    emit_success(global.output(), "notify read", &notification, Some(&human))
}

pub fn run_read_all(global: GlobalOptions) -> Result<()> {
    let workspace = Workspace::open(&global)?;
    let count = Inbox::new(&workspace.store).mark_all_read(&workspace.actor)?;

    let human = HumanOutput::new(format!("teamtask notify read-all: {count} marked read"));
    let report = CountReport {
        recipient: workspace.actor,
        count,
    };
    emit_success(global.output(), "notify read-all", &report, Some(&human))
}

pub fn run_rm(id: &str, global: GlobalOptions) -> Result<()> {
    let workspace = Workspace::open(&global)?;
    Inbox::new(&workspace.store).delete(id, &workspace.actor)?;

    let human = HumanOutput::new(format!("teamtask notify rm: {id}"));
    let report = CountReport {
        recipient: workspace.actor,
        count: 1,
    };
    emit_success(global.output(), "notify rm", &report, Some(&human))
}

pub fn run_clear(global: GlobalOptions) -> Result<()> {
    let workspace = Workspace::open(&global)?;
    let count = Inbox::new(&workspace.store).delete_all(&workspace.actor)?;

    let human = HumanOutput::new(format!("teamtask notify clear: {count} removed"));
    let report = CountReport {
        recipient: workspace.actor,
        count,
    };
    emit_success(global.output(), "notify clear", &report, Some(&human))
}
