//! Task records for todocal.
//!
//! A [`Task`] is the only entity. Records read from disk are loosely typed,
//! so every one of them passes through [`Normalizer`] before it becomes a
//! `Task`: statuses are matched case-insensitively against the canonical set,
//! missing fields get their defaults, and records without a description are
//! skipped.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Format of `due_date` values.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Format of `creation_time` values.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Largest id a task may carry. `u64::MAX` stays unused so every id has a
/// successor.
pub const MAX_TASK_ID: u64 = u64::MAX - 1;

/// Task status. Declaration order is the domain sort order.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum TaskStatus {
    #[default]
    #[serde(rename = "Pending")]
    Pending,
    #[serde(rename = "In progress")]
    InProgress,
    #[serde(rename = "Completed")]
    Completed,
    #[serde(rename = "Cancelled")]
    Cancelled,
    #[serde(rename = "On hold")]
    OnHold,
}

impl TaskStatus {
    /// Canonical statuses in domain order.
    pub const ALL: [TaskStatus; 5] = [
        TaskStatus::Pending,
        TaskStatus::InProgress,
        TaskStatus::Completed,
        TaskStatus::Cancelled,
        TaskStatus::OnHold,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pending => "Pending",
            TaskStatus::InProgress => "In progress",
            TaskStatus::Completed => "Completed",
            TaskStatus::Cancelled => "Cancelled",
            TaskStatus::OnHold => "On hold",
        }
    }

    /// Position in [`TaskStatus::ALL`].
    pub fn rank(self) -> usize {
        Self::ALL
            .iter()
            .position(|status| *status == self)
            .unwrap_or(Self::ALL.len())
    }

    /// Case-insensitive match used when repairing stored records.
    pub fn match_loose(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|status| status.as_str().eq_ignore_ascii_case(trimmed))
    }

    fn options_list() -> String {
        Self::ALL
            .iter()
            .map(|status| status.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Exact parse. Mutating calls only accept canonical spellings.
impl FromStr for TaskStatus {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| {
                Error::Validation(format!(
                    "Invalid status: {s}. Must be one of [{}]",
                    Self::options_list()
                ))
            })
    }
}

/// A single to-do record as held in memory and written to disk.
///
/// Every field is always serialized (absent values become `null`) so the
/// file is rewritten with a complete schema on each save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: u64,
    pub description: String,
    pub due_date: Option<String>,
    pub status: TaskStatus,
    pub note: String,
    pub creation_time: Option<String>,
    pub image_path: Option<String>,
}

impl Task {
    /// Parsed due date, if present and well-formed.
    pub fn due(&self) -> Option<NaiveDate> {
        self.due_date.as_deref().and_then(parse_date_prefix)
    }

    /// Parsed creation time, if present and well-formed.
    pub fn created(&self) -> Option<NaiveDateTime> {
        self.creation_time.as_deref().and_then(parse_datetime)
    }

    /// True when the due date parses and lies strictly before `today`.
    pub fn is_past_due(&self, today: NaiveDate) -> bool {
        self.due_date
            .as_deref()
            .and_then(parse_date)
            .map(|due| due < today)
            .unwrap_or(false)
    }
}

/// Strict `YYYY-MM-DD` parse.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT).ok()
}

/// Date parse that ignores anything after the first space, so legacy values
/// carrying a time component still order by their date.
pub fn parse_date_prefix(raw: &str) -> Option<NaiveDate> {
    let head = raw.split(' ').next().unwrap_or(raw);
    parse_date(head)
}

/// Strict `YYYY-MM-DD HH:MM:SS` parse.
pub fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, DATETIME_FORMAT).ok()
}

pub fn format_datetime(value: NaiveDateTime) -> String {
    value.format(DATETIME_FORMAT).to_string()
}

/// Reject a due date that does not parse as `YYYY-MM-DD`.
pub fn validate_due_date(raw: &str) -> Result<()> {
    match parse_date(raw) {
        Some(_) => Ok(()),
        None => Err(Error::Validation(
            "Invalid due date format. Please use YYYY-MM-DD.".to_string(),
        )),
    }
}

/// Reject a blank description.
pub fn validate_description(raw: &str) -> Result<()> {
    if raw.trim().is_empty() {
        return Err(Error::Validation(
            "Task description cannot be empty.".to_string(),
        ));
    }
    Ok(())
}

// =============================================================================
// Normalization of loaded records
// =============================================================================

/// Why a loaded record did not become a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    NotAnObject,
    MissingDescription,
    InvalidDescription,
    NoIdAvailable,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SkipReason::NotAnObject => "record is not an object",
            SkipReason::MissingDescription => "record has no description",
            SkipReason::InvalidDescription => "description is not text",
            SkipReason::NoIdAvailable => "no task id left to assign",
        };
        f.write_str(text)
    }
}

/// Result of normalizing one record.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordOutcome {
    Task(Task),
    Skip(SkipReason),
}

/// Stateful normalizer: tracks the ids handed out so far so placeholders and
/// repaired duplicates stay unique across the whole load.
#[derive(Debug, Default)]
pub struct Normalizer {
    max_seen: Option<u64>,
    seen: HashSet<u64>,
}

impl Normalizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn normalize(&mut self, raw: &Value) -> RecordOutcome {
        let Some(record) = raw.as_object() else {
            return RecordOutcome::Skip(SkipReason::NotAnObject);
        };

        let description = match record.get("description") {
            None => return RecordOutcome::Skip(SkipReason::MissingDescription),
            Some(Value::String(text)) => text.clone(),
            Some(Value::Number(number)) => number.to_string(),
            Some(Value::Bool(flag)) => flag.to_string(),
            Some(_) => return RecordOutcome::Skip(SkipReason::InvalidDescription),
        };

        let Some(id) = self.assign_id(record.get("id")) else {
            return RecordOutcome::Skip(SkipReason::NoIdAvailable);
        };

        let status = match record.get("status") {
            Some(Value::String(raw)) => TaskStatus::match_loose(raw).unwrap_or_default(),
            _ => TaskStatus::default(),
        };

        let note = match record.get("note") {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(text)) => text.clone(),
            Some(other) => other.to_string(),
        };

        RecordOutcome::Task(Task {
            id,
            description,
            due_date: optional_text(record, "due_date"),
            status,
            note,
            creation_time: optional_text(record, "creation_time"),
            image_path: optional_text(record, "image_path"),
        })
    }

    /// First id the allocator may hand out after this load.
    ///
    /// Every kept id is at most [`MAX_TASK_ID`], so this cannot overflow.
    pub fn next_id(&self) -> u64 {
        self.max_seen.map_or(0, |max| max.saturating_add(1))
    }

    fn placeholder(&self) -> Option<u64> {
        match self.max_seen {
            None => Some(0),
            Some(max) => max.checked_add(1).filter(|id| *id <= MAX_TASK_ID),
        }
    }

    fn assign_id(&mut self, raw: Option<&Value>) -> Option<u64> {
        let candidate = raw.and_then(coerce_id);
        let id = match candidate {
            Some(id) if id > MAX_TASK_ID => {
                let replacement = self.placeholder();
                tracing::warn!(id, ?replacement, "task id out of range in data file; reassigned");
                replacement?
            }
            Some(id) if !self.seen.contains(&id) => id,
            Some(id) => {
                let replacement = self.placeholder();
                tracing::warn!(id, ?replacement, "duplicate task id in data file; reassigned");
                replacement?
            }
            None => self.placeholder()?,
        };
        self.seen.insert(id);
        self.max_seen = Some(self.max_seen.map_or(id, |max| max.max(id)));
        Some(id)
    }
}

/// Outcome of normalizing a whole loaded collection.
#[derive(Debug, Clone, Default)]
pub struct NormalizedTasks {
    pub tasks: Vec<Task>,
    /// Index in the raw array and reason for each dropped record.
    pub skipped: Vec<(usize, SkipReason)>,
    pub next_id: u64,
}

pub fn normalize_records(raw: &[Value]) -> NormalizedTasks {
    let mut normalizer = Normalizer::new();
    let mut out = NormalizedTasks::default();
    for (index, value) in raw.iter().enumerate() {
        match normalizer.normalize(value) {
            RecordOutcome::Task(task) => out.tasks.push(task),
            RecordOutcome::Skip(reason) => {
                tracing::warn!(index, %reason, "skipping task record");
                out.skipped.push((index, reason));
            }
        }
    }
    out.next_id = normalizer.next_id();
    out
}

fn coerce_id(value: &Value) -> Option<u64> {
    let Value::Number(number) = value else {
        return None;
    };
    if let Some(id) = number.as_u64() {
        return Some(id);
    }
    match number.as_f64() {
        Some(float) if float.is_finite() && float >= 0.0 && float <= u64::MAX as f64 => {
            Some(float.trunc() as u64)
        }
        _ => None,
    }
}

fn optional_text(record: &Map<String, Value>, key: &str) -> Option<String> {
    match record.get(key) {
        Some(Value::String(text)) => Some(text.clone()),
        _ => None,
    }
}
