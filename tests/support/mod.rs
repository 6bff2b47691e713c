#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use serde_json::Value;
use tempfile::TempDir;

/// A scratch workspace for driving the `teamtask` binary
pub struct TestWorkspace {
    dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> std::io::Result<Self> {
        Ok(Self {
            dir: tempfile::tempdir()?,
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn write_config(&self, contents: &str) -> std::io::Result<PathBuf> {
        let path = self.dir.path().join(".teamtask.toml");
        fs::write(&path, contents)?;
        Ok(path)
    }

    /// `teamtask` running in this workspace with a clean environment
    pub fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("teamtask").expect("teamtask binary");
        cmd.current_dir(self.path())
            .env_remove("TEAMTASK_ACTOR")
            .env_remove("TEAMTASK_DIR")
            .env_remove("RUST_LOG");
        cmd
    }

    /// Run a command as `actor` with `--json` and return the `data` payload
    pub fn json(&self, actor: &str, args: &[&str]) -> Result<Value, Box<dyn std::error::Error>> {
        let output = self
            .cmd()
            .args(["--json", "--actor", actor])
            .args(args)
            .output()?;
        if !output.status.success() {
            return Err(format!(
                "teamtask {args:?} failed: {}",
                String::from_utf8_lossy(&output.stdout)
            )
            .into());
        }
        let envelope: Value = serde_json::from_slice(&output.stdout)?;
        Ok(envelope["data"].clone())
    }
}
