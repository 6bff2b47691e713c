//! Command-line interface for teamtask
//!
//! This module defines the CLI structure using clap derive macros.
//! Each command group is implemented in its own submodule.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{Config, RecipientMode};
use crate::error::Result;
use crate::notify::{FixedManager, RecipientResolver, RosterManager};
use crate::output::OutputOptions;
use crate::storage::Storage;
use crate::store::FileStore;
use crate::team::Team;

mod actor;
mod notify;
mod suggest;
mod task;
mod team;

/// teamtask - team task tracking
///
/// Tasks with dependencies, manager and assignee notifications, and
/// workload-aware assignment suggestions.
#[derive(Parser, Debug)]
#[command(name = "teamtask")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Workspace directory holding .teamtask/ (defaults to current directory)
    #[arg(long, global = true, env = "TEAMTASK_DIR")]
    pub dir: Option<PathBuf>,

    /// Acting user id
    #[arg(long, global = true, env = "TEAMTASK_ACTOR")]
    pub actor: Option<String>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Task management
    #[command(subcommand)]
    Task(TaskCommands),

    /// Team roster and workload
    #[command(subcommand)]
    Team(TeamCommands),

    /// Notification inbox of the acting user
    #[command(subcommand)]
    Notify(NotifyCommands),

    /// Suggest assignees and a due date for a new task
    Suggest {
        /// What the task is about
        #[arg(short, long)]
        description: String,

        /// Priority: low, medium, high
        #[arg(short, long, default_value = "medium")]
        priority: String,

        /// Date the suggestion is relative to (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        date: Option<String>,
    },

    /// Set or show actor identity
    #[command(subcommand)]
    Actor(ActorCommands),
}

/// Task subcommands
#[derive(Subcommand, Debug)]
pub enum TaskCommands {
    /// Create a task
    Add {
        /// Task title
        title: String,

        /// Longer description
        #[arg(short, long)]
        description: Option<String>,

        /// Priority: low, medium, high
        #[arg(short, long, default_value = "medium")]
        priority: String,

        /// Initial status: todo, in-progress, done, blocked
        #[arg(long, default_value = "todo")]
        status: String,

        /// Due date (YYYY-MM-DD)
        #[arg(long)]
        due: Option<String>,

        /// Assignee user id
        #[arg(short, long)]
        assignee: Option<String>,

        /// Task ids this task depends on (repeat or comma-separate)
        #[arg(long = "depends-on", value_delimiter = ',')]
        depends_on: Vec<String>,

        /// Initial progress percentage
        #[arg(long, default_value_t = 0)]
        progress: u8,
    },

    /// Change fields of a task
    Edit {
        /// Task id
        id: String,

        #[arg(long)]
        title: Option<String>,

        /// New description (empty clears it)
        #[arg(short, long)]
        description: Option<String>,

        /// Priority: low, medium, high
        #[arg(short, long)]
        priority: Option<String>,

        /// Status: todo, in-progress, done, blocked
        #[arg(long)]
        status: Option<String>,

        /// Due date (YYYY-MM-DD)
        #[arg(long, conflicts_with = "clear_due")]
        due: Option<String>,

        /// Remove the due date
        #[arg(long)]
        clear_due: bool,

        /// Assignee user id
        #[arg(short, long, conflicts_with = "unassign")]
        assignee: Option<String>,

        /// Remove the assignee
        #[arg(long)]
        unassign: bool,

        /// Replace the dependency list (repeat or comma-separate)
        #[arg(long = "depends-on", value_delimiter = ',', conflicts_with = "clear_deps")]
        depends_on: Vec<String>,

        /// Remove every dependency
        #[arg(long)]
        clear_deps: bool,

        /// Progress percentage
        #[arg(long)]
        progress: Option<u8>,
    },

    /// Mark a task done
    Done {
        /// Task id
        id: String,
    },

    /// List tasks
    List {
        /// Filter by status
        #[arg(long)]
        status: Option<String>,

        /// Filter by assignee user id
        #[arg(short, long)]
        assignee: Option<String>,

        /// Only tasks whose dependencies are all done
        #[arg(long)]
        ready: bool,
    },

    /// Show one task and what blocks it
    Show {
        /// Task id
        id: String,
    },

    /// Delete a task nothing depends on
    Rm {
        /// Task id
        id: String,
    },
}

/// Team subcommands
#[derive(Subcommand, Debug)]
pub enum TeamCommands {
    /// Add a team member
    Add {
        /// Display name (unique)
        name: String,

        /// Role: manager, employee
        #[arg(short, long, default_value = "employee")]
        role: String,

        /// Current workload percentage
        #[arg(short, long, default_value_t = 0)]
        workload: u8,

        /// Job title
        #[arg(long)]
        designation: Option<String>,

        /// Explicit user id (generated when omitted)
        #[arg(long)]
        id: Option<String>,
    },

    /// List team members
    List,

    /// Set a member's current workload
    Workload {
        /// User id
        id: String,

        /// Workload percentage (0-100)
        value: u8,
    },
}

/// Notification subcommands
#[derive(Subcommand, Debug)]
pub enum NotifyCommands {
    /// List notifications, newest first
    List {
        /// Only unread notifications
        #[arg(long)]
        unread: bool,
    },

    /// Mark one notification read
    Read {
        /// Notification id
        id: String,
    },

    /// Mark all notifications read
    ReadAll,

    /// Delete one notification
    Rm {
        /// Notification id
        id: String,
    },

    /// Delete all notifications
    Clear,
}

/// Actor subcommands
#[derive(Subcommand, Debug)]
pub enum ActorCommands {
    /// Persist the acting user id for this workspace
    Set {
        /// User id
        id: String,
    },

    /// Show the resolved acting user id
    Show,
}

/// Flags shared by every command
#[derive(Debug, Clone)]
pub struct GlobalOptions {
    pub dir: Option<PathBuf>,
    pub actor: Option<String>,
    pub json: bool,
    pub quiet: bool,
}

impl GlobalOptions {
    fn output(&self) -> OutputOptions {
        OutputOptions {
            json: self.json,
            quiet: self.quiet,
        }
    }

    fn storage(&self) -> Storage {
        let root = self
            .dir
            .clone()
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));
        Storage::new(root)
    }
}

/// Everything a command needs from the workspace
pub(crate) struct Workspace {
    pub store: FileStore,
    pub config: Config,
    pub actor: String,
}

impl Workspace {
    pub(crate) fn open(global: &GlobalOptions) -> Result<Self> {
        let storage = global.storage();
        storage.init()?;
        let config = Config::load_from_dir(storage.root());
        let actor = crate::actor::resolve_actor(Some(&storage), global.actor.as_deref());
        tracing::debug!(root = %storage.root().display(), actor = %actor, "workspace opened");
        Ok(Self {
            store: FileStore::new(storage),
            config,
            actor,
        })
    }

    /// Manager recipient for progress and completion notices
    pub(crate) fn recipients(&self) -> Result<Box<dyn RecipientResolver>> {
        let manager_id = self.config.notifications.manager_id.clone();
        Ok(match self.config.notifications.recipient {
            RecipientMode::Fixed => Box::new(FixedManager::new(manager_id)),
            RecipientMode::Roster => {
                let profiles = Team::new(&self.store).list()?;
                Box::new(RosterManager::from_profiles(&profiles, manager_id))
            }
        })
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<chrono::NaiveDate> {
    chrono::NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| {
        crate::error::Error::InvalidArgument(format!("invalid date '{raw}': expected YYYY-MM-DD"))
    })
}

impl Cli {
    fn global(&self) -> GlobalOptions {
        GlobalOptions {
            dir: self.dir.clone(),
            actor: self.actor.clone(),
            json: self.json,
            quiet: self.quiet,
        }
    }

    /// Execute the CLI command
    pub fn run(self) -> Result<()> {
        let global = self.global();
        match self.command {
            Commands::Task(cmd) => match cmd {
                TaskCommands::Add {
                    title,
                    description,
                    priority,
                    status,
                    due,
                    assignee,
                    depends_on,
                    progress,
                } => task::run_add(task::AddOptions {
                    title,
                    description,
                    priority,
                    status,
                    due,
                    assignee,
                    depends_on,
                    progress,
                    global,
                }),
                TaskCommands::Edit {
                    id,
                    title,
                    description,
                    priority,
                    status,
                    due,
                    clear_due,
                    assignee,
                    unassign,
                    depends_on,
                    clear_deps,
                    progress,
                } => task::run_edit(task::EditOptions {
                    id,
                    title,
                    description,
                    priority,
                    status,
                    due,
                    clear_due,
                    assignee,
                    unassign,
                    depends_on,
                    clear_deps,
                    progress,
                    global,
                }),
                TaskCommands::Done { id } => task::run_done(task::DoneOptions { id, global }),
                TaskCommands::List {
                    status,
                    assignee,
                    ready,
                } => task::run_list(task::ListOptions {
                    status,
                    assignee,
                    ready,
                    global,
                }),
                TaskCommands::Show { id } => task::run_show(task::ShowOptions { id, global }),
                TaskCommands::Rm { id } => task::run_rm(task::RmOptions { id, global }),
            },
            Commands::Team(cmd) => match cmd {
                TeamCommands::Add {
                    name,
                    role,
                    workload,
                    designation,
                    id,
                } => team::run_add(team::AddOptions {
                    name,
                    role,
                    workload,
                    designation,
                    id,
                    global,
                }),
                TeamCommands::List => team::run_list(global),
                TeamCommands::Workload { id, value } => {
                    team::run_workload(team::WorkloadOptions { id, value, global })
                }
            },
            Commands::Notify(cmd) => match cmd {
                NotifyCommands::List { unread } => notify::run_list(unread, global),
                NotifyCommands::Read { id } => notify::run_read(&id, global),
                NotifyCommands::ReadAll => notify::run_read_all(global),
                NotifyCommands::Rm { id } => notify::run_rm(&id, global),
                NotifyCommands::Clear => notify::run_clear(global),
            },
            Commands::Suggest {
                description,
                priority,
                date,
            } => suggest::run(suggest::SuggestOptions {
                description,
                priority,
                date,
                global,
            }),
            Commands::Actor(cmd) => match cmd {
                ActorCommands::Set { id } => actor::run_set(&id, global),
                ActorCommands::Show => actor::run_show(global),
            },
        }
    }
}
