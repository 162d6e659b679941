//! Operation log for todocal
//!
//! One JSON object per line, appended to `<data_file>.log.jsonl` unless the
//! config names another file. Appends hold `<log>.lock` so two processes
//! never interleave partial lines.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::lock::{self, FileLock, DEFAULT_LOCK_TIMEOUT_MS};

/// Operation log record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OpRecord {
    pub op_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<u64>,
    pub outcome: OpOutcome,
}

impl OpRecord {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            op_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            command: command.into(),
            task_id: None,
            outcome: OpOutcome::success(),
        }
    }

    pub fn with_task(mut self, task_id: u64) -> Self {
        self.task_id = Some(task_id);
        self
    }

    pub fn with_outcome(mut self, outcome: OpOutcome) -> Self {
        self.outcome = outcome;
        self
    }
}

/// Operation outcome summary
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OpOutcome {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl OpOutcome {
    pub fn success() -> Self {
        Self {
            status: "success".to_string(),
            message: None,
        }
    }

    pub fn success_with(message: impl Into<String>) -> Self {
        Self {
            status: "success".to_string(),
            message: Some(message.into()),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: "failed".to_string(),
            message: Some(message.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

/// Append-only JSONL log
#[derive(Debug, Clone)]
pub struct OpLog {
    path: PathBuf,
}

impl OpLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Default log location next to a data file.
    pub fn beside(data_file: &Path) -> Self {
        Self::new(PathBuf::from(format!("{}.log.jsonl", data_file.display())))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record as a single line.
    pub fn append(&self, record: &OpRecord) -> Result<()> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');

        let _lock = FileLock::acquire(lock::lock_path_for(&self.path), DEFAULT_LOCK_TIMEOUT_MS)?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(&line)?;
        Ok(())
    }

    /// Append, logging instead of failing. Used after a mutation already
    /// happened.
    pub fn record(&self, record: &OpRecord) {
        if let Err(err) = self.append(record) {
            tracing::warn!(path = %self.path.display(), error = %err, "failed to append oplog entry");
        }
    }

    /// Every readable record in file order. Lines that do not decode are
    /// skipped.
    pub fn read_all(&self) -> Result<Vec<OpRecord>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut records = Vec::new();
        for (index, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<OpRecord>(line) {
                Ok(record) => records.push(record),
                Err(err) => {
                    tracing::warn!(line = index + 1, error = %err, "skipping corrupt oplog line")
                }
            }
        }
        Ok(records)
    }

    /// The newest `limit` records, oldest first.
    pub fn recent(&self, limit: usize) -> Result<Vec<OpRecord>> {
        let mut records = self.read_all()?;
        let skip = records.len().saturating_sub(limit);
        Ok(records.split_off(skip))
    }
}

/// Format a single operation record for human-readable output
pub fn format_record(record: &OpRecord) -> String {
    let ts = record
        .timestamp
        .with_timezone(&chrono::Local)
        .format("%Y-%m-%d %H:%M:%S");
    let task = record
        .task_id
        .map(|id| format!(" task={id}"))
        .unwrap_or_default();
    let outcome = match &record.outcome.message {
        Some(msg) => format!("{} ({})", record.outcome.status, msg),
        None => record.outcome.status.clone(),
    };
    format!("{ts} {}{task} {outcome}", record.command)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn append_and_read_records() {
        let temp = TempDir::new().unwrap();
        let log = OpLog::new(temp.path().join("nested").join("ops.jsonl"));

        let first = OpRecord::new("add").with_task(0);
        let second = OpRecord::new("rm")
            .with_task(0)
            .with_outcome(OpOutcome::failed("Save failed"));
        log.append(&first).unwrap();
        log.append(&second).unwrap();

        let records = log.read_all().unwrap();
        assert_eq!(records, vec![first, second]);
        assert!(!records[1].outcome.is_success());

        let text = fs::read_to_string(log.path()).unwrap();
        assert_eq!(text.lines().count(), 2);
    }

    #[test]
    fn recent_returns_newest_oldest_first() {
        let temp = TempDir::new().unwrap();
        let log = OpLog::new(temp.path().join("ops.jsonl"));
        for id in 0..5 {
            log.append(&OpRecord::new("add").with_task(id)).unwrap();
        }

        let ids: Vec<_> = log
            .recent(2)
            .unwrap()
            .iter()
            .map(|r| r.task_id.unwrap())
            .collect();
        assert_eq!(ids, vec![3, 4]);
        assert_eq!(log.recent(50).unwrap().len(), 5);
    }

    #[test]
    fn corrupt_lines_are_skipped() {
        let temp = TempDir::new().unwrap();
        let log = OpLog::new(temp.path().join("ops.jsonl"));
        log.append(&OpRecord::new("add")).unwrap();
        let mut file = OpenOptions::new().append(true).open(log.path()).unwrap();
        writeln!(file, "{{not json").unwrap();
        log.append(&OpRecord::new("edit")).unwrap();

        let records = log.read_all().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].command, "edit");
    }

    #[test]
    fn missing_log_is_empty() {
        let temp = TempDir::new().unwrap();
        let log = OpLog::beside(&temp.path().join("todo_calendar.json"));
        assert!(log.path().ends_with("todo_calendar.json.log.jsonl"));
        assert!(log.recent(10).unwrap().is_empty());
    }

    #[test]
    fn format_includes_task_and_outcome() {
        let record = OpRecord::new("status")
            .with_task(4)
            .with_outcome(OpOutcome::success_with("Completed"));
        let line = format_record(&record);
        assert!(line.contains("status task=4 success (Completed)"));
    }
}
