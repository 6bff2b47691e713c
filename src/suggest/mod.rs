//! Workload-aware assignment suggestions.
//!
//! The [`Orchestrator`] turns a [`SuggestionRequest`] into the provider's
//! JSON contract, calls the provider once (plus any configured retries)
//! under a timeout, and hands the raw answer to [`validate_suggestion`].
//!
//! Wire contract (camelCase JSON):
//!
//! ```text
//! request  = { taskDescription, teamMembers: [{ name, currentWorkload }],
//!              priority: "low"|"medium"|"high", currentDate: "YYYY-MM-DD" }
//! response = { suggestedDueDate, reasoningForDueDate,
//!              suggestedAssignees: [{ name, reasoningForAssignment }],
//!              projectedWorkloadAfterAssignment: [{ name, projectedWorkload }] }
//! ```

mod command;
mod validate;

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::SuggestConfig;
use crate::error::{Error, Result};
use crate::task::Priority;

pub use command::CommandProvider;
pub use validate::{validate_suggestion, ValidationIssue};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterMember {
    pub name: String,
    pub current_workload: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionRequest {
    pub task_description: String,
    pub team_members: Vec<RosterMember>,
    pub priority: Priority,
    pub current_date: NaiveDate,
}

impl SuggestionRequest {
    pub fn new(
        task_description: impl Into<String>,
        priority: Priority,
        team_members: Vec<RosterMember>,
        current_date: NaiveDate,
    ) -> Result<Self> {
        let task_description = task_description.into().trim().to_string();
        if task_description.is_empty() {
            return Err(Error::InvalidArgument(
                "task description cannot be empty".to_string(),
            ));
        }
        if team_members.is_empty() {
            return Err(Error::InvalidArgument(
                "suggestion roster cannot be empty".to_string(),
            ));
        }
        let mut team_members = team_members;
        let mut names = HashSet::new();
        for member in &mut team_members {
            member.name = member.name.trim().to_string();
            if member.name.is_empty() {
                return Err(Error::InvalidArgument(
                    "roster member name cannot be empty".to_string(),
                ));
            }
            if member.current_workload > 100 {
                return Err(Error::InvalidArgument(format!(
                    "workload {} for {} is outside 0-100",
                    member.current_workload, member.name
                )));
            }
            if !names.insert(member.name.clone()) {
                return Err(Error::InvalidArgument(format!(
                    "roster member {} is listed twice",
                    member.name
                )));
            }
        }
        Ok(Self {
            task_description,
            team_members,
            priority,
            current_date,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestedAssignee {
    pub name: String,
    pub reasoning_for_assignment: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectedWorkload {
    pub name: String,
    pub projected_workload: u8,
}

/// A validated suggestion
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentSuggestion {
    pub suggested_due_date: NaiveDate,
    pub reasoning_for_due_date: String,
    pub suggested_assignees: Vec<SuggestedAssignee>,
    pub projected_workload_after_assignment: Vec<ProjectedWorkload>,
}

/// Failure inside a provider call
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("provider exited with {status}: {stderr}")]
    Exit { status: String, stderr: String },

    #[error("provider I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("provider returned invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

/// The external suggestion function: one request, one response
#[async_trait]
pub trait SuggestionProvider: Send + Sync {
    /// Answer a request. `Ok(None)` means the provider produced no output.
    async fn suggest(&self, request: &Value) -> std::result::Result<Option<Value>, ProviderError>;
}

/// Calls a provider and validates what comes back
pub struct Orchestrator<P> {
    provider: P,
    timeout: Duration,
    retries: u32,
}

impl<P: SuggestionProvider> Orchestrator<P> {
    pub fn new(provider: P, config: &SuggestConfig) -> Self {
        Self {
            provider,
            timeout: config.timeout(),
            retries: config.retries,
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Ask for a suggestion.
    ///
    /// Provider failures, timeouts and empty output become
    /// `Error::SuggestionUnavailable` once retries are spent. Output that
    /// arrived but is not JSON, or has the wrong shape, is
    /// `Error::SuggestionInvalid` and is never retried.
    pub async fn suggest(&self, request: &SuggestionRequest) -> Result<AssignmentSuggestion> {
        let payload = serde_json::to_value(request)?;
        let mut attempt = 0;
        loop {
            match self.call(&payload).await {
                Ok(raw) => return validate_suggestion(Some(&raw), &request.team_members),
                Err(Error::SuggestionUnavailable { detail }) if attempt < self.retries => {
                    attempt += 1;
                    tracing::warn!(attempt, retries = self.retries, %detail, "suggestion attempt failed; retrying");
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn call(&self, payload: &Value) -> Result<Value> {
        let unavailable = |detail: String| Error::SuggestionUnavailable { detail };
        match tokio::time::timeout(self.timeout, self.provider.suggest(payload)).await {
            Err(_) => Err(unavailable(format!(
                "provider did not answer within {}s",
                self.timeout.as_secs_f64()
            ))),
            Ok(Err(ProviderError::Json(err))) => Err(Error::SuggestionInvalid(vec![
                ValidationIssue::NotJson(err.to_string()),
            ])),
            Ok(Err(err)) => Err(unavailable(err.to_string())),
            Ok(Ok(None)) | Ok(Ok(Some(Value::Null))) => {
                Err(unavailable("provider returned no output".to_string()))
            }
            Ok(Ok(Some(raw))) => Ok(raw),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_serializes_to_wire_contract() {
        let request = SuggestionRequest::new(
            "Migrate billing",
            Priority::High,
            vec![RosterMember {
                name: "Alice".to_string(),
                current_workload: 30,
            }],
            NaiveDate::from_ymd_opt(2026, 10, 19).unwrap(),
        )
        .expect("request");

        assert_eq!(
            serde_json::to_value(&request).expect("json"),
            json!({
                "taskDescription": "Migrate billing",
                "teamMembers": [{ "name": "Alice", "currentWorkload": 30 }],
                "priority": "high",
                "currentDate": "2026-10-19"
            })
        );
    }

    struct Canned(Option<Value>);

    #[async_trait]
    impl SuggestionProvider for Canned {
        async fn suggest(&self, _request: &Value) -> std::result::Result<Option<Value>, ProviderError> {
            Ok(self.0.clone())
        }
    }

    struct Flaky {
        calls: std::sync::atomic::AtomicU32,
        fail_first: u32,
        answer: Value,
    }

    #[async_trait]
    impl SuggestionProvider for Flaky {
        async fn suggest(&self, _request: &Value) -> std::result::Result<Option<Value>, ProviderError> {
            let call = self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            if call < self.fail_first {
                return Err(ProviderError::Other("quota exceeded".to_string()));
            }
            Ok(Some(self.answer.clone()))
        }
    }

    struct Chatty {
        calls: std::sync::atomic::AtomicU32,
    }

    #[async_trait]
    impl SuggestionProvider for Chatty {
        async fn suggest(&self, _request: &Value) -> std::result::Result<Option<Value>, ProviderError> {
            self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            let err = serde_json::from_str::<Value>("Sure! Alice should do it.").unwrap_err();
            Err(ProviderError::Json(err))
        }
    }

    struct Stalled;

    #[async_trait]
    impl SuggestionProvider for Stalled {
        async fn suggest(&self, _request: &Value) -> std::result::Result<Option<Value>, ProviderError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(None)
        }
    }

    fn request() -> SuggestionRequest {
        SuggestionRequest::new(
            "Write onboarding guide",
            Priority::Medium,
            vec![
                RosterMember {
                    name: "Alice".to_string(),
                    current_workload: 30,
                },
                RosterMember {
                    name: "Bob".to_string(),
                    current_workload: 70,
                },
            ],
            NaiveDate::from_ymd_opt(2026, 10, 19).unwrap(),
        )
        .expect("request")
    }

    fn answer() -> Value {
        json!({
            "suggestedDueDate": "2026-10-30",
            "reasoningForDueDate": "Medium priority, light backlog",
            "suggestedAssignees": [{ "name": "Alice", "reasoningForAssignment": "Most capacity" }],
            "projectedWorkloadAfterAssignment": [
                { "name": "Alice", "projectedWorkload": 50 },
                { "name": "Bob", "projectedWorkload": 70 }
            ]
        })
    }

    fn config(retries: u32) -> SuggestConfig {
        SuggestConfig {
            retries,
            ..SuggestConfig::default()
        }
    }

    #[tokio::test]
    async fn valid_answer_is_returned() {
        let orchestrator = Orchestrator::new(Canned(Some(answer())), &config(0));
        let suggestion = orchestrator.suggest(&request()).await.expect("suggestion");
        assert_eq!(suggestion.suggested_assignees[0].name, "Alice");
        assert_eq!(suggestion.projected_workload_after_assignment[1].projected_workload, 70);
    }

    #[tokio::test]
    async fn empty_output_is_unavailable() {
        let orchestrator = Orchestrator::new(Canned(None), &config(0));
        assert!(matches!(
            orchestrator.suggest(&request()).await,
            Err(Error::SuggestionUnavailable { .. })
        ));
    }

    #[tokio::test]
    async fn incomplete_projection_is_invalid() {
        let mut raw = answer();
        raw["projectedWorkloadAfterAssignment"] = json!([{ "name": "Alice", "projectedWorkload": 50 }]);
        let orchestrator = Orchestrator::new(Canned(Some(raw)), &config(2));
        match orchestrator.suggest(&request()).await {
            Err(Error::SuggestionInvalid(issues)) => {
                assert_eq!(issues, vec![ValidationIssue::MissingMember("Bob".to_string())]);
            }
            other => panic!("expected invalid suggestion, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn provider_failures_are_retried() {
        let provider = Flaky {
            calls: Default::default(),
            fail_first: 2,
            answer: answer(),
        };
        let orchestrator = Orchestrator::new(provider, &config(2));
        orchestrator.suggest(&request()).await.expect("third call succeeds");
        assert_eq!(
            orchestrator
                .provider()
                .calls
                .load(std::sync::atomic::Ordering::SeqCst),
            3
        );
    }

    #[tokio::test]
    async fn retries_are_bounded() {
        let provider = Flaky {
            calls: Default::default(),
            fail_first: 5,
            answer: answer(),
        };
        let orchestrator = Orchestrator::new(provider, &config(1));
        match orchestrator.suggest(&request()).await {
            Err(Error::SuggestionUnavailable { detail }) => assert!(detail.contains("quota")),
            other => panic!("expected unavailable, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn stalled_provider_times_out() {
        let config = SuggestConfig {
            timeout_secs: 1,
            ..SuggestConfig::default()
        };
        let orchestrator = Orchestrator::new(Stalled, &config);
        match orchestrator.suggest(&request()).await {
            Err(Error::SuggestionUnavailable { detail }) => assert!(detail.contains("within")),
            other => panic!("expected unavailable, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn prose_answer_is_invalid_and_not_retried() {
        let provider = Chatty {
            calls: Default::default(),
        };
        let orchestrator = Orchestrator::new(provider, &config(3));
        match orchestrator.suggest(&request()).await {
            Err(Error::SuggestionInvalid(issues)) => {
                assert_eq!(issues.len(), 1);
                assert!(matches!(issues[0], ValidationIssue::NotJson(_)));
            }
            other => panic!("expected invalid suggestion, got {other:?}"),
        }
        assert_eq!(
            orchestrator
                .provider()
                .calls
                .load(std::sync::atomic::Ordering::SeqCst),
            1
        );
    }

    #[tokio::test]
    async fn padded_roster_names_match_the_answer() {
        let date = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        let request = SuggestionRequest::new(
            "Write onboarding guide",
            Priority::Medium,
            vec![
                RosterMember {
                    name: "Alice ".to_string(),
                    current_workload: 30,
                },
                RosterMember {
                    name: " Bob".to_string(),
                    current_workload: 70,
                },
            ],
            date,
        )
        .expect("request");
        assert_eq!(request.team_members[0].name, "Alice");
        assert_eq!(request.team_members[1].name, "Bob");

        let orchestrator = Orchestrator::new(Canned(Some(answer())), &config(0));
        orchestrator.suggest(&request).await.expect("suggestion");
    }

    #[test]
    fn request_rejects_bad_roster() {
        let date = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        let member = |name: &str, load: u8| RosterMember {
            name: name.to_string(),
            current_workload: load,
        };
        assert!(SuggestionRequest::new("x", Priority::Low, vec![], date).is_err());
        assert!(SuggestionRequest::new(" ", Priority::Low, vec![member("A", 1)], date).is_err());
        assert!(SuggestionRequest::new("x", Priority::Low, vec![member("A", 101)], date).is_err());
        assert!(
            SuggestionRequest::new("x", Priority::Low, vec![member("A", 1), member("A", 2)], date)
                .is_err()
        );
        assert!(
            SuggestionRequest::new("x", Priority::Low, vec![member("A", 1), member("A ", 2)], date)
                .is_err()
        );
    }
}
