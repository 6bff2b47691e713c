//! Task dependency graph.
//!
//! An edge `A -> B` (B listed in `A.dependencies`) means B must be done
//! before A is actionable. The resolver re-checks dependents directly on
//! every completion instead of keeping counters.

use std::collections::{HashMap, HashSet};

use crate::error::{Error, Result};
use crate::task::{Task, TaskStatus};

/// A task that depends on a just-completed task
#[derive(Debug, Clone)]
pub struct DependentState {
    pub task: Task,
    /// Every dependency of `task` is done
    pub unblocked: bool,
}

/// Dependents of `completed_id`, each with its "now unblocked" signal.
///
/// `completed_id` counts as done even if `tasks` holds an older copy of it.
/// Dependencies on unknown ids are never satisfied.
pub fn resolve_unblocked(completed_id: &str, tasks: &[Task]) -> Vec<DependentState> {
    let by_id = index(tasks);
    tasks
        .iter()
        .filter(|task| task.id != completed_id)
        .filter(|task| task.dependencies.iter().any(|dep| dep == completed_id))
        .map(|task| DependentState {
            task: task.clone(),
            unblocked: unmet_dependencies(task, Some(completed_id), &by_id).is_empty(),
        })
        .collect()
}

/// True when every dependency of `task` is done (vacuously true for none).
pub fn is_unblocked(task: &Task, tasks: &[Task]) -> bool {
    unmet_dependencies(task, None, &index(tasks)).is_empty()
}

/// Dependency ids of `task` that are not done yet, in list order.
pub fn blocking_dependencies(task: &Task, tasks: &[Task]) -> Vec<String> {
    unmet_dependencies(task, None, &index(tasks))
}

fn index(tasks: &[Task]) -> HashMap<&str, &Task> {
    tasks.iter().map(|task| (task.id.as_str(), task)).collect()
}

fn unmet_dependencies(
    task: &Task,
    completed_id: Option<&str>,
    by_id: &HashMap<&str, &Task>,
) -> Vec<String> {
    task.dependencies
        .iter()
        .filter(|dep| {
            if Some(dep.as_str()) == completed_id {
                return false;
            }
            match by_id.get(dep.as_str()) {
                Some(found) => found.status != TaskStatus::Done,
                None => {
                    tracing::warn!(
                        task = %task.id,
                        dependency = %dep,
                        "dependency references a missing task; treating it as unmet"
                    );
                    true
                }
            }
        })
        .cloned()
        .collect()
}

/// Check a dependency list before it is written.
///
/// `task_id` is `None` for a task that does not exist yet. Rejects
/// duplicates, unknown ids, self-references and edges that would close a
/// cycle through existing tasks.
pub fn validate_dependencies(task_id: Option<&str>, dependencies: &[String], tasks: &[Task]) -> Result<()> {
    let mut seen = HashSet::new();
    for dep in dependencies {
        if dep.trim().is_empty() {
            return Err(Error::InvalidArgument(
                "dependency id cannot be empty".to_string(),
            ));
        }
        if !seen.insert(dep.as_str()) {
            return Err(Error::InvalidArgument(format!(
                "duplicate dependency: {dep}"
            )));
        }
        if Some(dep.as_str()) == task_id {
            return Err(Error::DependencyCycle(vec![dep.clone(), dep.clone()]));
        }
    }

    let by_id = index(tasks);
    if let Some(missing) = dependencies.iter().find(|dep| !by_id.contains_key(dep.as_str())) {
        return Err(Error::TaskNotFound(missing.clone()));
    }

    let Some(task_id) = task_id else {
        return Ok(());
    };

    let mut visited = HashSet::new();
    for dep in dependencies {
        let mut path = vec![task_id.to_string()];
        if reaches(dep, task_id, &by_id, &mut visited, &mut path) {
            return Err(Error::DependencyCycle(path));
        }
    }
    Ok(())
}

/// Depth-first search along dependency edges from `current` looking for
/// `target`. `path` holds the walk when it returns true.
fn reaches<'a>(
    current: &'a str,
    target: &str,
    by_id: &HashMap<&'a str, &'a Task>,
    visited: &mut HashSet<&'a str>,
    path: &mut Vec<String>,
) -> bool {
    path.push(current.to_string());
    if current == target {
        return true;
    }
    if !visited.insert(current) {
        path.pop();
        return false;
    }
    if let Some(&task) = by_id.get(current) {
        for dep in &task.dependencies {
            if reaches(dep.as_str(), target, by_id, visited, path) {
                return true;
            }
        }
    }
    path.pop();
    false
}
