//! teamtask - team task tracking library
//!
//! This library provides the core of the teamtask CLI: tasks with
//! dependencies, lifecycle notifications, and workload-aware assignment
//! suggestions backed by an external provider.
//!
//! # Core Concepts
//!
//! - **Dependencies**: a task is actionable once every task it depends on is done
//! - **Notifications**: assignment, progress, completion and unblock notices
//! - **Suggestions**: provider output is validated against the team roster
//!   before anything sees it
//!
//! # Module Organization
//!
//! - `cli`: Command-line interface using clap
//! - `config`: Configuration loading from `.teamtask.toml`
//! - `error`: Error types and result aliases
//! - `store`: Entity store trait with in-memory and file adapters
//! - `storage`: `.teamtask/` directory and collection documents
//! - `lock`: File locking and atomic writes
//! - `task`: Task model and the task service
//! - `graph`: Dependency resolution and cycle checks
//! - `notify`: Notification dispatcher and inbox
//! - `team`: Team roster and workload
//! - `suggest`: Assignment suggestion orchestrator and validator
//! - `actor`: Acting user identity
//! - `output`: Human and JSON output

pub mod actor;
pub mod cli;
pub mod config;
pub mod error;
pub mod graph;
pub mod lock;
pub mod notify;
pub mod output;
pub mod storage;
pub mod store;
pub mod suggest;
pub mod task;
pub mod team;

pub use error::{Error, Result};
