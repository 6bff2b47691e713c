//! Shared output formatting for teamtask CLI commands.

use serde::Serialize;

use crate::error::{Error, Result};

pub const SCHEMA_VERSION: &str = "teamtask.v1";

#[derive(Debug, Clone, Copy)]
pub struct OutputOptions {
    pub json: bool,
    pub quiet: bool,
}

#[derive(Debug, Clone)]
pub struct HumanOutput {
    header: String,
    summary: Vec<(String, String)>,
    details: Vec<String>,
    warnings: Vec<String>,
    next_steps: Vec<String>,
}

impl HumanOutput {
    pub fn new(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            summary: Vec::new(),
            details: Vec::new(),
            warnings: Vec::new(),
            next_steps: Vec::new(),
        }
    }

    pub fn push_summary(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.summary.push((key.into(), value.into()));
    }

    pub fn push_detail(&mut self, value: impl Into<String>) {
        self.details.push(value.into());
    }

    pub fn push_warning(&mut self, value: impl Into<String>) {
        self.warnings.push(value.into());
    }

    pub fn push_next_step(&mut self, value: impl Into<String>) {
        self.next_steps.push(value.into());
    }
}

pub fn emit_success<T: Serialize>(
    options: OutputOptions,
    command: &str,
    data: &T,
    human: Option<&HumanOutput>,
) -> Result<()> {
    if options.json {
        let warnings = human.map(|h| h.warnings.clone()).unwrap_or_default();
        let next_steps = human.map(|h| h.next_steps.clone()).unwrap_or_default();

        #[derive(Serialize)]
        struct Envelope<'a, T: Serialize> {
            schema_version: &'static str,
            command: &'a str,
            status: &'static str,
            data: &'a T,
            #[serde(skip_serializing_if = "Vec::is_empty")]
            warnings: Vec<String>,
            #[serde(skip_serializing_if = "Vec::is_empty")]
            next_steps: Vec<String>,
        }

        let payload = Envelope {
            schema_version: SCHEMA_VERSION,
            command,
            status: "success",
            data,
            warnings,
            next_steps,
        };

        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    if options.quiet {
        return Ok(());
    }

    if let Some(human) = human {
        println!("{}", format_human(human));
    }

    Ok(())
}

pub fn emit_error(command: &str, err: &Error, json: bool) -> Result<()> {
    let next_steps = error_next_steps(err);
    if json {
        #[derive(Serialize)]
        struct ErrorBody<'a> {
            message: &'a str,
            code: i32,
            kind: &'static str,
            #[serde(skip_serializing_if = "Option::is_none")]
            details: Option<serde_json::Value>,
        }

        #[derive(Serialize)]
        struct Envelope<'a> {
            schema_version: &'static str,
            command: &'a str,
            status: &'static str,
            error: ErrorBody<'a>,
            #[serde(skip_serializing_if = "Vec::is_empty")]
            next_steps: Vec<String>,
        }

        let payload = Envelope {
            schema_version: SCHEMA_VERSION,
            command,
            status: "error",
            error: ErrorBody {
                message: &err.to_string(),
                code: err.exit_code(),
                kind: error_kind(err),
                details: err.details(),
            },
            next_steps,
        };

        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    eprintln!("error: {err}");
    if let Error::SuggestionInvalid(issues) = err {
        for issue in issues {
            eprintln!("  - {issue}");
        }
    }
    if let Some(hint) = next_steps.first() {
        eprintln!("hint: {hint}");
    }
    Ok(())
}

fn format_human(output: &HumanOutput) -> String {
    let summary: Vec<String> = output
        .summary
        .iter()
        .map(|(key, value)| match value.as_str() {
            "" => key.clone(),
            _ => format!("{key}: {value}"),
        })
        .collect();

    let mut text = output.header.clone();
    for (title, items) in [
        ("Summary", &summary),
        ("Details", &output.details),
        ("Warnings", &output.warnings),
        ("Next steps", &output.next_steps),
    ] {
        if items.is_empty() {
            continue;
        }
        text.push_str(&format!("\n\n{title}:"));
        for item in items {
            text.push_str(&format!("\n- {item}"));
        }
    }
    text
}

/// Best-effort `command subcommand` name for error envelopes, before clap runs.
pub fn infer_command_name_from_args() -> String {
    command_name_from(std::env::args().skip(1))
}

fn command_name_from(args: impl IntoIterator<Item = String>) -> String {
    let mut expects_value = false;
    let mut words = Vec::new();

    for arg in args {
        if expects_value {
            expects_value = false;
            continue;
        }
        if arg == "--dir" || arg == "--actor" {
            expects_value = true;
            continue;
        }
        if arg.starts_with('-') {
            continue;
        }
        words.push(arg);
        let grouped = matches!(
            words[0].as_str(),
            "task" | "team" | "notify" | "actor"
        );
        if !grouped || words.len() == 2 {
            break;
        }
    }

    if words.is_empty() {
        "teamtask".to_string()
    } else {
        words.join(" ")
    }
}

fn error_kind(err: &Error) -> &'static str {
    match err.exit_code() {
        2 => "user_error",
        3 => "validation_failed",
        _ => "operation_failed",
    }
}

fn error_next_steps(err: &Error) -> Vec<String> {
    match err {
        Error::TaskNotFound(_) => vec!["teamtask task list".to_string()],
        Error::UserNotFound(_) => vec!["teamtask team list".to_string()],
        Error::NotificationNotFound(_) => vec!["teamtask notify list".to_string()],
        Error::DependencyCycle(_) => vec!["remove one of the listed dependencies".to_string()],
        Error::InvalidConfig(_) => vec!["fix .teamtask.toml then retry".to_string()],
        Error::SuggestionUnavailable { .. } => {
            vec!["retry later or raise suggest.timeout_secs / suggest.retries".to_string()]
        }
        Error::LockFailed(_) => vec!["another teamtask process holds the lock; retry".to_string()],
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(args: &[&str]) -> String {
        command_name_from(args.iter().map(|arg| arg.to_string()))
    }

    #[test]
    fn grouped_commands_include_subcommand() {
        assert_eq!(name(&["--json", "task", "done", "01ABC"]), "task done");
        assert_eq!(name(&["--dir", "/tmp/x", "notify", "list"]), "notify list");
        assert_eq!(name(&["suggest", "--description", "x"]), "suggest");
        assert_eq!(name(&[]), "teamtask");
    }

    #[test]
    fn human_output_lists_sections() {
        let mut human = HumanOutput::new("teamtask task add: Ship it");
        human.push_summary("id", "01ABC");
        human.push_warning("no assignee");
        let text = format_human(&human);
        assert!(text.starts_with("teamtask task add: Ship it"));
        assert!(text.contains("- id: 01ABC"));
        assert!(text.contains("Warnings:\n- no assignee"));
    }
}
