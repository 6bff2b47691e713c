mod support;

use predicates::str::contains;

use support::TestWorkspace;

type TestResult = Result<(), Box<dyn std::error::Error>>;

#[test]
fn completing_a_task_notifies_manager_and_unblocked_assignee() -> TestResult {
    let ws = TestWorkspace::new()?;

    let design = ws.json("manager", &["task", "add", "Design schema"])?;
    let design_id = design["task"]["id"].as_str().ok_or("missing id")?.to_string();

    let build = ws.json(
        "manager",
        &["task", "add", "Build API", "--assignee", "emp-1", "--depends-on", &design_id],
    )?;
    assert_eq!(build["notifications"][0]["recipient"], "emp-1");

    let ready = ws.json("manager", &["task", "list", "--ready"])?;
    assert_eq!(ready["total"], 1);
    assert_eq!(ready["tasks"][0]["id"], design_id.as_str());

    let done = ws.json("emp-2", &["task", "done", &design_id])?;
    assert_eq!(done["task"]["progress"], 100);
    assert_eq!(done["unblocked"].as_array().map(Vec::len), Some(1));

    let inbox = ws.json("emp-1", &["notify", "list"])?;
    assert_eq!(inbox["unread"], 2);
    let newest = inbox["notifications"][0]["message"].as_str().unwrap_or_default();
    assert!(newest.contains("ready to start"));

    let manager_inbox = ws.json("manager", &["notify", "list"])?;
    assert_eq!(manager_inbox["notifications"].as_array().map(Vec::len), Some(1));
    Ok(())
}

#[test]
fn repeated_assignment_creates_no_notification() -> TestResult {
    let ws = TestWorkspace::new()?;
    let task = ws.json("manager", &["task", "add", "Triage"])?;
    let id = task["task"]["id"].as_str().ok_or("missing id")?.to_string();

    let first = ws.json("manager", &["task", "edit", &id, "--assignee", "user-7"])?;
    assert_eq!(first["notifications"].as_array().map(Vec::len), Some(1));

    let second = ws.json("manager", &["task", "edit", &id, "--assignee", "user-7"])?;
    assert_eq!(second["notifications"].as_array().map(Vec::len), Some(0));

    let inbox = ws.json("user-7", &["notify", "list"])?;
    assert_eq!(inbox["notifications"].as_array().map(Vec::len), Some(1));
    Ok(())
}

#[test]
fn cycle_is_rejected_with_validation_exit_code() -> TestResult {
    let ws = TestWorkspace::new()?;
    let a = ws.json("manager", &["task", "add", "A"])?;
    let a_id = a["task"]["id"].as_str().ok_or("missing id")?.to_string();
    let b = ws.json("manager", &["task", "add", "B", "--depends-on", &a_id])?;
    let b_id = b["task"]["id"].as_str().ok_or("missing id")?.to_string();

    ws.cmd()
        .args(["task", "edit", &a_id, "--depends-on", &b_id])
        .assert()
        .code(3)
        .stderr(contains("Dependency cycle"));
    Ok(())
}

#[test]
fn rm_refuses_task_with_dependents() -> TestResult {
    let ws = TestWorkspace::new()?;
    let a = ws.json("manager", &["task", "add", "A"])?;
    let a_id = a["task"]["id"].as_str().ok_or("missing id")?.to_string();
    ws.json("manager", &["task", "add", "B", "--depends-on", &a_id])?;

    ws.cmd()
        .args(["task", "rm", &a_id])
        .assert()
        .code(2)
        .stderr(contains("is a dependency of"));
    Ok(())
}

#[test]
fn notifications_can_be_read_and_cleared() -> TestResult {
    let ws = TestWorkspace::new()?;
    let task = ws.json("manager", &["task", "add", "Review", "--assignee", "emp-3"])?;
    let notice_id = task["notifications"][0]["id"]
        .as_str()
        .ok_or("missing notification id")?
        .to_string();

    let read = ws.json("emp-3", &["notify", "read", &notice_id])?;
    assert_eq!(read["read"], true);

    ws.cmd()
        .args(["--actor", "emp-9", "notify", "read", &notice_id])
        .assert()
        .code(2);

    let cleared = ws.json("emp-3", &["notify", "clear"])?;
    assert_eq!(cleared["count"], 1);
    Ok(())
}
