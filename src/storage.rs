//! Storage layer for todocal
//!
//! The whole collection lives in one JSON document: a top-level array of
//! task objects, UTF-8, pretty-printed.
//!
//! ```text
//! <data dir>/
//!   todo_calendar.json            # the task collection
//!   todo_calendar.json.lock       # advisory lock held during saves
//!   todo_calendar.json.log.jsonl  # operation log (see `oplog`)
//! ```
//!
//! Loading never fails: a missing file is an empty collection, and a file
//! that cannot be read or decoded is reported as a warning and also treated
//! as empty. Saving replaces the file atomically and reports failures to the
//! caller.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use serde::Serialize;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::lock::{self, DEFAULT_LOCK_TIMEOUT_MS};
use crate::task::{normalize_records, NormalizedTasks, Task};

/// Default file name for the task collection
pub const DATA_FILE_NAME: &str = "todo_calendar.json";

/// Raw records read from a store, plus anything worth telling the user.
#[derive(Debug, Clone, Default)]
pub struct RawLoad {
    pub records: Vec<Value>,
    pub warnings: Vec<String>,
}

impl RawLoad {
    fn empty_with_warning(warning: String) -> Self {
        tracing::warn!("{warning}");
        Self {
            records: Vec::new(),
            warnings: vec![warning],
        }
    }
}

/// Normalized load result handed to the repository.
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub tasks: Vec<Task>,
    /// Seed for the id allocator.
    pub next_id: u64,
    pub skipped: usize,
    pub warnings: Vec<String>,
}

impl LoadReport {
    fn from_parts(normalized: NormalizedTasks, mut warnings: Vec<String>) -> Self {
        for (index, reason) in &normalized.skipped {
            warnings.push(format!("skipped record #{index}: {reason}"));
        }
        Self {
            skipped: normalized.skipped.len(),
            next_id: normalized.next_id,
            tasks: normalized.tasks,
            warnings,
        }
    }
}

/// Durability backend for the task collection.
///
/// Implementations only move whole arrays of records; business rules live in
/// [`crate::manager::TaskManager`].
pub trait TaskStore: Send + Sync {
    /// Read raw records. Must not fail; problems become warnings.
    fn load_raw(&self) -> RawLoad;

    /// Replace the stored collection with `tasks`.
    fn save(&self, tasks: &[Task]) -> Result<()>;

    /// Human-readable location, used in messages.
    fn describe(&self) -> String;

    /// Load and normalize.
    fn load(&self) -> LoadReport {
        let raw = self.load_raw();
        let normalized = normalize_records(&raw.records);
        let report = LoadReport::from_parts(normalized, raw.warnings);
        tracing::debug!(
            store = %self.describe(),
            tasks = report.tasks.len(),
            skipped = report.skipped,
            next_id = report.next_id,
            "loaded tasks"
        );
        report
    }
}

// =============================================================================
// JSON file store
// =============================================================================

/// Task store backed by a single JSON file
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
    lock_timeout_ms: u64,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock_timeout_ms: DEFAULT_LOCK_TIMEOUT_MS,
        }
    }

    pub fn with_lock_timeout(mut self, timeout_ms: u64) -> Self {
        self.lock_timeout_ms = timeout_ms;
        self
    }

    /// Path to the JSON document
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path to the sidecar lock file
    pub fn lock_file(&self) -> PathBuf {
        lock::lock_path_for(&self.path)
    }

    fn write_document(&self, tasks: &[Task]) -> Result<()> {
        let json = to_pretty_json(tasks)?;
        lock::write_atomic_locked(&self.path, json.as_bytes(), self.lock_timeout_ms)
    }
}

impl TaskStore for JsonFileStore {
    fn load_raw(&self) -> RawLoad {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return RawLoad::default(),
            Err(err) => {
                return RawLoad::empty_with_warning(format!(
                    "Error loading tasks from {}: {err}. Starting with empty tasks.",
                    self.path.display()
                ))
            }
        };

        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Array(records)) => RawLoad {
                records,
                warnings: Vec::new(),
            },
            Ok(_) => RawLoad::empty_with_warning(format!(
                "{} does not contain a JSON array. Starting with empty tasks.",
                self.path.display()
            )),
            Err(_) => RawLoad::empty_with_warning(format!(
                "Could not decode JSON from {}. Starting with empty tasks.",
                self.path.display()
            )),
        }
    }

    fn save(&self, tasks: &[Task]) -> Result<()> {
        match self.write_document(tasks) {
            Ok(()) => {
                tracing::debug!(path = %self.path.display(), tasks = tasks.len(), "saved tasks");
                Ok(())
            }
            Err(err) => {
                tracing::warn!(path = %self.path.display(), error = %err, "failed to save tasks");
                Err(Error::save_failed(&self.path, err))
            }
        }
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Pretty-print with four-space indentation, non-ASCII left unescaped.
fn to_pretty_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let mut buffer = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
    value.serialize(&mut serializer)?;
    String::from_utf8(buffer).map_err(|e| Error::OperationFailed(format!("Invalid UTF-8: {e}")))
}

// =============================================================================
// In-memory store
// =============================================================================

/// Volatile store holding raw records in memory.
///
/// Counts saves and can be told to fail them, which makes it the test double
/// for the repository's write-through behavior.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<Vec<Value>>,
    saves: AtomicUsize,
    fail_saves: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from arbitrary raw records (as if decoded from a file).
    pub fn with_records(records: Vec<Value>) -> Self {
        Self {
            records: Mutex::new(records),
            ..Self::default()
        }
    }

    /// Number of successful saves so far.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Snapshot of what was last saved.
    pub fn records(&self) -> Vec<Value> {
        match self.records.lock() {
            Ok(records) => records.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl TaskStore for MemoryStore {
    fn load_raw(&self) -> RawLoad {
        RawLoad {
            records: self.records(),
            warnings: Vec::new(),
        }
    }

    fn save(&self, tasks: &[Task]) -> Result<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(Error::save_failed(
                self.describe(),
                Error::OperationFailed("simulated save failure".to_string()),
            ));
        }
        let encoded = tasks
            .iter()
            .map(serde_json::to_value)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let mut records = self
            .records
            .lock()
            .map_err(|_| Error::OperationFailed("memory store poisoned".to_string()))?;
        *records = encoded;
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn describe(&self) -> String {
        "<memory>".to_string()
    }
}

impl<S: TaskStore + ?Sized> TaskStore for std::sync::Arc<S> {
    fn load_raw(&self) -> RawLoad {
        (**self).load_raw()
    }

    fn save(&self, tasks: &[Task]) -> Result<()> {
        (**self).save(tasks)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}
