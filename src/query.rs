//! Filtering and ordering of task views.
//!
//! Every function here works on a copy; the repository's collection is never
//! reordered. Sorts are stable, so ties keep collection order in both
//! directions.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::task::{parse_date_prefix, parse_datetime, Task, TaskStatus};

/// Column a view can be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortColumn {
    Id,
    Description,
    DueDate,
    Status,
    Note,
    CreationTime,
    ImagePath,
}

impl SortColumn {
    pub const ALL: [SortColumn; 7] = [
        SortColumn::Id,
        SortColumn::Description,
        SortColumn::DueDate,
        SortColumn::Status,
        SortColumn::Note,
        SortColumn::CreationTime,
        SortColumn::ImagePath,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SortColumn::Id => "id",
            SortColumn::Description => "description",
            SortColumn::DueDate => "due_date",
            SortColumn::Status => "status",
            SortColumn::Note => "note",
            SortColumn::CreationTime => "creation_time",
            SortColumn::ImagePath => "image_path",
        }
    }
}

impl fmt::Display for SortColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortColumn {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace('-', "_");
        Self::ALL
            .iter()
            .copied()
            .find(|column| column.as_str() == wanted)
            .ok_or_else(|| {
                Error::InvalidArgument(format!(
                    "unknown sort column '{s}': expected one of {}",
                    Self::ALL
                        .iter()
                        .map(|column| column.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                ))
            })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            SortDirection::Ascending => "ascending",
            SortDirection::Descending => "descending",
        }
    }
}

impl FromStr for SortDirection {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ascending" | "asc" => Ok(SortDirection::Ascending),
            "descending" | "desc" => Ok(SortDirection::Descending),
            _ => Err(Error::InvalidArgument(format!(
                "invalid sort direction '{s}': must be ascending or descending"
            ))),
        }
    }
}

/// Missing or unparsable values compare as the greatest possible value.
fn date_key(task: &Task) -> (bool, Option<NaiveDate>) {
    let parsed = task.due_date.as_deref().and_then(parse_date_prefix);
    (parsed.is_none(), parsed)
}

fn datetime_key(task: &Task) -> (bool, Option<NaiveDateTime>) {
    let parsed = task.creation_time.as_deref().and_then(parse_datetime);
    (parsed.is_none(), parsed)
}

fn text_key(task: &Task, column: SortColumn) -> String {
    let raw = match column {
        SortColumn::Id => task.id.to_string(),
        SortColumn::Description => task.description.clone(),
        SortColumn::Note => task.note.clone(),
        SortColumn::ImagePath => task.image_path.clone().unwrap_or_default(),
        SortColumn::DueDate | SortColumn::CreationTime => String::new(),
        SortColumn::Status => task.status.as_str().to_string(),
    };
    raw.to_lowercase()
}

/// Ascending comparison of two tasks on `column`.
pub fn compare_by(column: SortColumn, left: &Task, right: &Task) -> Ordering {
    match column {
        SortColumn::DueDate => date_key(left).cmp(&date_key(right)),
        SortColumn::CreationTime => datetime_key(left).cmp(&datetime_key(right)),
        SortColumn::Status => left.status.rank().cmp(&right.status.rank()),
        other => text_key(left, other).cmp(&text_key(right, other)),
    }
}

/// Newest first; tasks without a parseable creation time count as the
/// oldest possible and land at the end.
fn default_order(left: &Task, right: &Task) -> Ordering {
    let left_time = left.created();
    let right_time = right.created();
    right_time.cmp(&left_time)
}

/// Stable sort of `tasks` in place.
///
/// With no column the order is by creation time, newest first, and the
/// direction is ignored.
pub fn sort_tasks(tasks: &mut [Task], column: Option<SortColumn>, direction: SortDirection) {
    match column {
        None => tasks.sort_by(default_order),
        Some(column) => match direction {
            SortDirection::Ascending => tasks.sort_by(|a, b| compare_by(column, a, b)),
            SortDirection::Descending => tasks.sort_by(|a, b| compare_by(column, b, a)),
        },
    }
}

/// Sorted copy of `tasks`.
pub fn sorted(tasks: &[Task], column: Option<SortColumn>, direction: SortDirection) -> Vec<Task> {
    let mut copy = tasks.to_vec();
    sort_tasks(&mut copy, column, direction);
    copy
}

/// Parameters of a list view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskView {
    pub status: Option<TaskStatus>,
    pub column: Option<SortColumn>,
    pub direction: SortDirection,
    /// Only consulted when `status` is `None`.
    pub hide_on_hold: bool,
}

/// Result of applying a [`TaskView`].
#[derive(Debug, Clone, Serialize)]
pub struct ViewSummary {
    pub tasks: Vec<Task>,
    pub total: usize,
    pub hidden_on_hold: usize,
}

impl TaskView {
    pub fn apply(&self, tasks: &[Task]) -> ViewSummary {
        let mut selected: Vec<Task> = match self.status {
            Some(status) => tasks
                .iter()
                .filter(|task| task.status == status)
                .cloned()
                .collect(),
            None => tasks.to_vec(),
        };

        let mut hidden_on_hold = 0;
        if self.status.is_none() && self.hide_on_hold {
            let before = selected.len();
            selected.retain(|task| task.status != TaskStatus::OnHold);
            hidden_on_hold = before - selected.len();
        }

        // A status tab keeps collection order until a column is chosen.
        if self.status.is_none() || self.column.is_some() {
            sort_tasks(&mut selected, self.column, self.direction);
        }

        ViewSummary {
            tasks: selected,
            total: tasks.len(),
            hidden_on_hold,
        }
    }
}

/// Parse an optional column name, treating empty input as "default order".
pub fn parse_column(raw: Option<&str>) -> Result<Option<SortColumn>> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value.parse().map(Some),
    }
}
