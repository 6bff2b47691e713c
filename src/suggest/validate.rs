//! Shape and completeness checks for provider output.
//!
//! Provider output is untrusted JSON. Every problem is collected and the
//! whole suggestion is rejected if there is at least one; values are never
//! corrected.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde_json::{Map, Value};

use super::{AssignmentSuggestion, ProjectedWorkload, RosterMember, SuggestedAssignee};
use crate::error::{Error, Result};

/// One reason a suggestion was rejected
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationIssue {
    #[error("response is not valid JSON: {0}")]
    NotJson(String),

    #[error("response is not a JSON object")]
    NotAnObject,

    #[error("suggestedDueDate is missing")]
    MissingDueDate,

    #[error("suggestedDueDate '{0}' is not a YYYY-MM-DD date")]
    InvalidDueDate(String),

    #[error("reasoningForDueDate is missing or empty")]
    MissingDueDateReasoning,

    #[error("suggestedAssignees is missing or empty")]
    NoAssignees,

    #[error("suggestedAssignees[{0}] has no name")]
    AssigneeMissingName(usize),

    #[error("suggestedAssignees[{0}] has no reasoningForAssignment")]
    AssigneeMissingReasoning(usize),

    #[error("projectedWorkloadAfterAssignment is missing")]
    MissingProjectedWorkload,

    #[error("projectedWorkloadAfterAssignment[{0}] has no name")]
    ProjectionMissingName(usize),

    #[error("projected workload for {name} is {value}, expected an integer in 0-100")]
    InvalidProjectedWorkload { name: String, value: String },

    #[error("no projected workload for roster member {0}")]
    MissingMember(String),

    #[error("roster member {0} is projected more than once")]
    DuplicateMember(String),

    #[error("projected workload for {0}, who is not on the roster")]
    UnknownMember(String),
}

/// Validate raw provider output against the roster it was asked about.
///
/// `None` (or JSON `null`) means the provider produced nothing and is
/// reported as `Error::SuggestionUnavailable`; everything else that fails
/// is `Error::SuggestionInvalid`.
pub fn validate_suggestion(raw: Option<&Value>, roster: &[RosterMember]) -> Result<AssignmentSuggestion> {
    let raw = match raw {
        None | Some(Value::Null) => {
            return Err(Error::SuggestionUnavailable {
                detail: "provider returned no output".to_string(),
            })
        }
        Some(raw) => raw,
    };
    let Some(object) = raw.as_object() else {
        return Err(Error::SuggestionInvalid(vec![ValidationIssue::NotAnObject]));
    };

    let mut issues = Vec::new();
    let due_date = check_due_date(object, &mut issues);
    let reasoning = non_blank(object.get("reasoningForDueDate"));
    if reasoning.is_none() {
        issues.push(ValidationIssue::MissingDueDateReasoning);
    }
    let assignees = check_assignees(object, &mut issues);
    let projections = check_projections(object, roster, &mut issues);

    match (due_date, reasoning, issues.is_empty()) {
        (Some(suggested_due_date), Some(reasoning_for_due_date), true) => Ok(AssignmentSuggestion {
            suggested_due_date,
            reasoning_for_due_date,
            suggested_assignees: assignees,
            projected_workload_after_assignment: projections,
        }),
        _ => Err(Error::SuggestionInvalid(issues)),
    }
}

fn non_blank(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

fn check_due_date(object: &Map<String, Value>, issues: &mut Vec<ValidationIssue>) -> Option<NaiveDate> {
    match object.get("suggestedDueDate") {
        None | Some(Value::Null) => {
            issues.push(ValidationIssue::MissingDueDate);
            None
        }
        Some(Value::String(text)) => match NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d") {
            Ok(date) => Some(date),
            Err(_) => {
                issues.push(ValidationIssue::InvalidDueDate(text.clone()));
                None
            }
        },
        Some(other) => {
            issues.push(ValidationIssue::InvalidDueDate(other.to_string()));
            None
        }
    }
}

fn check_assignees(object: &Map<String, Value>, issues: &mut Vec<ValidationIssue>) -> Vec<SuggestedAssignee> {
    let entries = match object.get("suggestedAssignees").and_then(Value::as_array) {
        Some(entries) if !entries.is_empty() => entries,
        _ => {
            issues.push(ValidationIssue::NoAssignees);
            return Vec::new();
        }
    };

    let mut assignees = Vec::new();
    for (index, entry) in entries.iter().enumerate() {
        let name = non_blank(entry.get("name"));
        let reasoning = non_blank(entry.get("reasoningForAssignment"));
        if name.is_none() {
            issues.push(ValidationIssue::AssigneeMissingName(index));
        }
        if reasoning.is_none() {
            issues.push(ValidationIssue::AssigneeMissingReasoning(index));
        }
        if let (Some(name), Some(reasoning_for_assignment)) = (name, reasoning) {
            assignees.push(SuggestedAssignee {
                name,
                reasoning_for_assignment,
            });
        }
    }
    assignees
}

fn check_projections(
    object: &Map<String, Value>,
    roster: &[RosterMember],
    issues: &mut Vec<ValidationIssue>,
) -> Vec<ProjectedWorkload> {
    let Some(entries) = object
        .get("projectedWorkloadAfterAssignment")
        .and_then(Value::as_array)
    else {
        issues.push(ValidationIssue::MissingProjectedWorkload);
        return Vec::new();
    };

    let mut seen: HashMap<&str, usize> = roster.iter().map(|member| (member.name.as_str(), 0)).collect();
    let mut projections = Vec::new();

    for (index, entry) in entries.iter().enumerate() {
        let Some(name) = non_blank(entry.get("name")) else {
            issues.push(ValidationIssue::ProjectionMissingName(index));
            continue;
        };
        match seen.get_mut(name.as_str()) {
            None => {
                issues.push(ValidationIssue::UnknownMember(name));
                continue;
            }
            Some(count) => {
                *count += 1;
                if *count == 2 {
                    issues.push(ValidationIssue::DuplicateMember(name.clone()));
                }
            }
        }
        match workload_value(entry.get("projectedWorkload")) {
            Some(projected_workload) => projections.push(ProjectedWorkload {
                name,
                projected_workload,
            }),
            None => issues.push(ValidationIssue::InvalidProjectedWorkload {
                value: entry
                    .get("projectedWorkload")
                    .map(Value::to_string)
                    .unwrap_or_else(|| "missing".to_string()),
                name,
            }),
        }
    }

    for member in roster {
        if seen.get(member.name.as_str()) == Some(&0) {
            issues.push(ValidationIssue::MissingMember(member.name.clone()));
        }
    }
    projections
}

fn workload_value(value: Option<&Value>) -> Option<u8> {
    let number = value?.as_f64()?;
    if number.fract() != 0.0 || !(0.0..=100.0).contains(&number) {
        return None;
    }
    Some(number as u8)
}
