#![cfg(unix)]

mod support;

use predicates::str::contains;

use support::TestWorkspace;

type TestResult = Result<(), Box<dyn std::error::Error>>;

const ANSWER: &str = r#"{"suggestedDueDate":"2026-10-30","reasoningForDueDate":"One sprint","suggestedAssignees":[{"name":"Alice","reasoningForAssignment":"Most capacity"}],"projectedWorkloadAfterAssignment":[{"name":"Alice","projectedWorkload":55},{"name":"Bob","projectedWorkload":70}]}"#;

fn workspace_with_team(script: &str) -> Result<TestWorkspace, Box<dyn std::error::Error>> {
    let ws = TestWorkspace::new()?;
    std::fs::write(ws.path().join("provider.sh"), script)?;
    ws.write_config(
        "[suggest]\ncommand = [\"sh\", \"provider.sh\"]\ntimeout_secs = 10\n",
    )?;
    ws.json("manager", &["team", "add", "Morgan", "--role", "manager"])?;
    ws.json("manager", &["team", "add", "Alice", "--workload", "30"])?;
    ws.json("manager", &["team", "add", "Bob", "--workload", "70"])?;
    Ok(ws)
}

#[test]
fn suggestion_is_returned_when_valid() -> TestResult {
    let ws = workspace_with_team(&format!("cat > /dev/null\necho '{ANSWER}'\n"))?;
    let data = ws.json(
        "manager",
        &["suggest", "--description", "Write docs", "--priority", "high", "--date", "2026-10-19"],
    )?;
    assert_eq!(data["suggestedDueDate"], "2026-10-30");
    assert_eq!(data["suggestedAssignees"][0]["name"], "Alice");
    Ok(())
}

#[test]
fn roster_is_sent_to_the_provider() -> TestResult {
    let ws = workspace_with_team("cat > request.json\n")?;
    ws.cmd()
        .args(["suggest", "--description", "Write docs", "--date", "2026-10-19"])
        .assert()
        .code(4);

    let request: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(ws.path().join("request.json"))?)?;
    assert_eq!(request["taskDescription"], "Write docs");
    assert_eq!(request["priority"], "medium");
    assert_eq!(request["currentDate"], "2026-10-19");
    assert_eq!(
        request["teamMembers"],
        serde_json::json!([
            { "name": "Alice", "currentWorkload": 30 },
            { "name": "Bob", "currentWorkload": 70 }
        ])
    );
    Ok(())
}

#[test]
fn failing_provider_is_unavailable() -> TestResult {
    let ws = workspace_with_team("cat > /dev/null\necho 'model overloaded' >&2\nexit 1\n")?;
    ws.cmd()
        .args(["suggest", "--description", "Write docs"])
        .assert()
        .code(4)
        .stderr(contains("Suggestion unavailable"))
        .stderr(contains("model overloaded"));
    Ok(())
}

#[test]
fn incomplete_projection_is_rejected() -> TestResult {
    let partial = ANSWER.replace(r#",{"name":"Bob","projectedWorkload":70}"#, "");
    let ws = workspace_with_team(&format!("cat > /dev/null\necho '{partial}'\n"))?;
    ws.cmd()
        .args(["suggest", "--description", "Write docs"])
        .assert()
        .code(3)
        .stderr(contains("no projected workload for roster member Bob"));
    Ok(())
}

#[test]
fn prose_answer_is_rejected_without_retry() -> TestResult {
    let ws = TestWorkspace::new()?;
    std::fs::write(
        ws.path().join("provider.sh"),
        "cat > /dev/null\necho call >> calls.log\necho 'Sure! Alice should do it.'\n",
    )?;
    ws.write_config("[suggest]\ncommand = [\"sh\", \"provider.sh\"]\nretries = 2\n")?;
    ws.json("manager", &["team", "add", "Alice"])?;
    ws.cmd()
        .args(["suggest", "--description", "Write docs"])
        .assert()
        .code(3)
        .stderr(contains("response is not valid JSON"));

    let calls = std::fs::read_to_string(ws.path().join("calls.log"))?;
    assert_eq!(calls.lines().count(), 1);
    Ok(())
}

#[test]
fn missing_command_is_a_config_error() -> TestResult {
    let ws = TestWorkspace::new()?;
    ws.json("manager", &["team", "add", "Alice"])?;
    ws.cmd()
        .args(["suggest", "--description", "Write docs"])
        .assert()
        .code(2)
        .stderr(contains("suggest.command is not set"));
    Ok(())
}
