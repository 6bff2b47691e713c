//! Suggestion provider backed by an external command.

use std::process::Stdio;

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::{ProviderError, SuggestionProvider};
use crate::error::{Error, Result};

/// Runs `argv` once per request: request JSON on stdin, response JSON on stdout.
#[derive(Debug, Clone)]
pub struct CommandProvider {
    program: String,
    args: Vec<String>,
}

impl CommandProvider {
    pub fn new(argv: &[String]) -> Result<Self> {
        let Some((program, args)) = argv.split_first() else {
            return Err(Error::InvalidConfig(
                "suggest.command is not set; add it to .teamtask.toml".to_string(),
            ));
        };
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

#[async_trait]
impl SuggestionProvider for CommandProvider {
    async fn suggest(&self, request: &Value) -> std::result::Result<Option<Value>, ProviderError> {
        tracing::debug!(program = %self.program, "running suggestion command");
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let payload = serde_json::to_vec(request)?;
        if let Some(mut stdin) = child.stdin.take() {
            // A provider may exit without reading its input.
            match stdin.write_all(&payload).await {
                Ok(()) => stdin.shutdown().await?,
                Err(err) if err.kind() == std::io::ErrorKind::BrokenPipe => {}
                Err(err) => return Err(err.into()),
            }
        }

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            return Err(ProviderError::Exit {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stdout = stdout.trim();
        if stdout.is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(stdout)?))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use serde_json::json;

    fn sh(script: &str) -> CommandProvider {
        CommandProvider::new(&["sh".to_string(), "-c".to_string(), script.to_string()])
            .expect("provider")
    }

    #[test]
    fn empty_argv_is_a_config_error() {
        assert!(matches!(
            CommandProvider::new(&[]),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[tokio::test]
    async fn request_is_piped_to_stdin() {
        let provider = sh("cat");
        let request = json!({ "taskDescription": "echo me" });
        let answer = provider.suggest(&request).await.expect("run");
        assert_eq!(answer, Some(request));
    }

    #[tokio::test]
    async fn blank_stdout_is_no_output() {
        let provider = sh("cat > /dev/null");
        assert!(provider.suggest(&json!({})).await.expect("run").is_none());
    }

    #[tokio::test]
    async fn failing_command_reports_stderr() {
        let provider = sh("cat > /dev/null; echo 'quota exceeded' >&2; exit 3");
        match provider.suggest(&json!({})).await {
            Err(ProviderError::Exit { stderr, .. }) => assert_eq!(stderr, "quota exceeded"),
            other => panic!("expected exit error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn non_json_stdout_is_a_json_error() {
        let provider = sh("cat > /dev/null; echo 'Sure! Alice should do it.'");
        assert!(matches!(
            provider.suggest(&json!({})).await,
            Err(ProviderError::Json(_))
        ));
    }

    #[tokio::test]
    async fn prose_from_command_is_rejected_as_invalid() {
        use crate::config::SuggestConfig;
        use crate::suggest::{Orchestrator, RosterMember, SuggestionRequest, ValidationIssue};
        use crate::task::Priority;

        let provider = sh("cat > /dev/null; echo 'Sure! Alice should do it.'");
        let request = SuggestionRequest::new(
            "Plan launch",
            Priority::High,
            vec![RosterMember {
                name: "Alice".to_string(),
                current_workload: 10,
            }],
            chrono::NaiveDate::from_ymd_opt(2026, 10, 19).expect("date"),
        )
        .expect("request");
        let orchestrator = Orchestrator::new(provider, &SuggestConfig::default());
        match orchestrator.suggest(&request).await {
            Err(Error::SuggestionInvalid(issues)) => {
                assert!(matches!(issues.as_slice(), [ValidationIssue::NotJson(_)]));
            }
            other => panic!("expected invalid suggestion, got {other:?}"),
        }
    }
}
