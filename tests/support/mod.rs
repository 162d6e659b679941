#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use serde_json::Value;
use tempfile::TempDir;

/// Scratch directory holding a task file, config and operation log.
pub struct TestHome {
    dir: TempDir,
}

impl TestHome {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("failed to create tempdir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn data_file(&self) -> PathBuf {
        self.dir.path().join("todo_calendar.json")
    }

    pub fn log_file(&self) -> PathBuf {
        self.dir.path().join("todo_calendar.json.log.jsonl")
    }

    pub fn write_data(&self, contents: &str) {
        fs::write(self.data_file(), contents).expect("write data file");
    }

    pub fn write_config(&self, contents: &str) -> PathBuf {
        let path = self.dir.path().join("todocal.toml");
        fs::write(&path, contents).expect("write config");
        path
    }

    pub fn read_data(&self) -> Value {
        let text = fs::read_to_string(self.data_file()).expect("read data file");
        serde_json::from_str(&text).expect("data file is JSON")
    }

    /// `todocal` pointed at this directory's task file, isolated from the
    /// caller's environment.
    pub fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("todocal").expect("binary");
        cmd.current_dir(self.dir.path())
            .env_remove("TODOCAL_CONFIG")
            .env_remove("TODOCAL_DATA_FILE")
            .env_remove("RUST_LOG")
            .arg("--data-file")
            .arg(self.data_file());
        cmd
    }

    /// Run with `--json` and return the parsed envelope.
    pub fn json(&self, args: &[&str]) -> Value {
        let output = self
            .cmd()
            .arg("--json")
            .args(args)
            .output()
            .expect("run todocal");
        serde_json::from_slice(&output.stdout).unwrap_or_else(|err| {
            panic!(
                "invalid JSON for {args:?}: {err}\nstdout: {}\nstderr: {}",
                String::from_utf8_lossy(&output.stdout),
                String::from_utf8_lossy(&output.stderr)
            )
        })
    }
}
