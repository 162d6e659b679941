//! Task repository
//!
//! [`TaskManager`] owns the in-memory collection and the id allocator, and
//! writes the whole collection back through its [`TaskStore`] after every
//! mutation. A failed save is returned to the caller but the in-memory
//! change is kept, so [`TaskManager::save`] can retry without losing it.

use std::sync::Arc;

use chrono::{Local, NaiveDate, NaiveDateTime};
use tokio::runtime::Handle;
use tokio::sync::mpsc;

use crate::error::{Error, Result};
use crate::ids::IdAllocator;
use crate::query::{self, SortColumn, SortDirection, TaskView, ViewSummary};
use crate::saver::{BackgroundSaver, SaveCompletion};
use crate::storage::TaskStore;
use crate::task::{self, Task, TaskStatus};

/// Field changes for [`TaskManager::update`]. `None` leaves a field alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskUpdate {
    pub description: Option<String>,
    /// `Some(None)` or `Some(Some(""))` clears the due date.
    pub due_date: Option<Option<String>>,
    pub status: Option<TaskStatus>,
    pub note: Option<String>,
}

impl TaskUpdate {
    pub fn is_empty(&self) -> bool {
        self.description.is_none()
            && self.due_date.is_none()
            && self.status.is_none()
            && self.note.is_none()
    }

    pub fn status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    Updated(Task),
    /// No task with that id.
    NotFound,
    /// The update named no fields.
    Unchanged,
}

impl UpdateOutcome {
    pub fn task(&self) -> Option<&Task> {
        match self {
            UpdateOutcome::Updated(task) => Some(task),
            _ => None,
        }
    }
}

enum Durability<S: TaskStore + 'static> {
    /// Save synchronously before returning.
    WriteThrough,
    /// Hand the snapshot to a single-flight background writer.
    Background(BackgroundSaver<S>),
}

pub struct TaskManager<S: TaskStore + 'static> {
    store: Arc<S>,
    tasks: Vec<Task>,
    ids: IdAllocator,
    durability: Durability<S>,
    load_warnings: Vec<String>,
}

impl<S: TaskStore + 'static> TaskManager<S> {
    /// Load the collection from `store`. Never fails; load problems are
    /// available from [`TaskManager::load_warnings`].
    pub fn open(store: S) -> Self {
        Self::from_shared(Arc::new(store))
    }

    pub fn from_shared(store: Arc<S>) -> Self {
        let report = store.load();
        Self {
            store,
            tasks: report.tasks,
            ids: IdAllocator::new(report.next_id),
            durability: Durability::WriteThrough,
            load_warnings: report.warnings,
        }
    }

    /// Switch to background saves on `handle`. Completions arrive on the
    /// returned receiver.
    pub fn with_background_saves(
        mut self,
        handle: Handle,
    ) -> (Self, mpsc::UnboundedReceiver<SaveCompletion>) {
        let (saver, completions) = BackgroundSaver::new(Arc::clone(&self.store), handle);
        self.durability = Durability::Background(saver);
        (self, completions)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn load_warnings(&self) -> &[String] {
        &self.load_warnings
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Id the next created task will receive.
    pub fn next_id(&self) -> u64 {
        self.ids.peek()
    }

    pub fn reset_next_id(&mut self, next: i64) -> Result<()> {
        self.ids.reset(next)
    }

    /// True while a background save is running.
    pub fn is_saving(&self) -> bool {
        match &self.durability {
            Durability::WriteThrough => false,
            Durability::Background(saver) => saver.is_busy(),
        }
    }

    // -------------------------------------------------------------------------
    // Mutations
    // -------------------------------------------------------------------------

    pub fn create(
        &mut self,
        description: &str,
        due_date: Option<&str>,
        note: Option<&str>,
    ) -> Result<Task> {
        self.create_at(description, due_date, note, Local::now().naive_local())
    }

    /// [`TaskManager::create`] with an explicit creation timestamp.
    pub fn create_at(
        &mut self,
        description: &str,
        due_date: Option<&str>,
        note: Option<&str>,
        now: NaiveDateTime,
    ) -> Result<Task> {
        task::validate_description(description)?;
        let due_date = match due_date {
            Some(raw) if !raw.is_empty() => {
                task::validate_due_date(raw)?;
                Some(raw.to_string())
            }
            _ => None,
        };
        self.ensure_writable()?;

        let task = Task {
            id: self.ids.next_id()?,
            description: description.to_string(),
            due_date,
            status: TaskStatus::Pending,
            note: note.unwrap_or_default().to_string(),
            creation_time: Some(task::format_datetime(now)),
            image_path: None,
        };
        self.tasks.push(task.clone());
        tracing::info!(id = task.id, "task created");

        self.persist(vec![task.id])?;
        Ok(task)
    }

    /// Apply `changes` to task `id`.
    ///
    /// Every supplied field is validated before anything is modified.
    pub fn update(&mut self, id: u64, changes: TaskUpdate) -> Result<UpdateOutcome> {
        let Some(index) = self.position(id) else {
            return Ok(UpdateOutcome::NotFound);
        };
        if changes.is_empty() {
            return Ok(UpdateOutcome::Unchanged);
        }

        if let Some(description) = &changes.description {
            task::validate_description(description)?;
        }
        let due_date = match changes.due_date {
            Some(Some(raw)) if !raw.is_empty() => {
                task::validate_due_date(&raw)?;
                Some(Some(raw))
            }
            Some(_) => Some(None),
            None => None,
        };
        self.ensure_writable()?;

        let task = &mut self.tasks[index];
        if let Some(description) = changes.description {
            task.description = description;
        }
        if let Some(due_date) = due_date {
            task.due_date = due_date;
        }
        if let Some(status) = changes.status {
            task.status = status;
        }
        if let Some(note) = changes.note {
            task.note = note;
        }
        let updated = task.clone();
        tracing::info!(id, "task updated");

        self.persist(vec![id])?;
        Ok(UpdateOutcome::Updated(updated))
    }

    /// Remove task `id`. Returns whether anything was removed.
    pub fn delete(&mut self, id: u64) -> Result<bool> {
        let Some(index) = self.position(id) else {
            return Ok(false);
        };
        self.ensure_writable()?;

        self.tasks.remove(index);
        tracing::info!(id, "task deleted");

        self.persist(vec![id])?;
        Ok(true)
    }

    /// Persist the current collection again, e.g. after a failed save.
    pub fn save(&mut self) -> Result<()> {
        self.ensure_writable()?;
        self.persist(Vec::new())
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    pub fn get(&self, id: u64) -> Option<Task> {
        self.tasks.iter().find(|task| task.id == id).cloned()
    }

    /// Copy of the whole collection in stored order.
    pub fn list(&self) -> Vec<Task> {
        self.tasks.clone()
    }

    pub fn list_by_status(&self, status: TaskStatus) -> Vec<Task> {
        self.tasks
            .iter()
            .filter(|task| task.status == status)
            .cloned()
            .collect()
    }

    /// Like [`TaskManager::list_by_status`] for raw input. Only canonical
    /// spellings are accepted.
    pub fn list_by_status_name(&self, status: &str) -> Result<Vec<Task>> {
        let status: TaskStatus = status.parse()?;
        Ok(self.list_by_status(status))
    }

    pub fn sort_all(&self, column: Option<SortColumn>, direction: SortDirection) -> Vec<Task> {
        query::sorted(&self.tasks, column, direction)
    }

    pub fn sorted_by_status(
        &self,
        status: TaskStatus,
        column: Option<SortColumn>,
        direction: SortDirection,
    ) -> Vec<Task> {
        let mut tasks = self.list_by_status(status);
        query::sort_tasks(&mut tasks, column, direction);
        tasks
    }

    pub fn view(&self, view: &TaskView) -> ViewSummary {
        view.apply(&self.tasks)
    }

    /// Tasks due strictly before `today`, in stored order.
    pub fn overdue(&self, today: NaiveDate) -> Vec<Task> {
        self.tasks
            .iter()
            .filter(|task| task.is_past_due(today))
            .cloned()
            .collect()
    }

    /// Count per status, in canonical order.
    pub fn count_by_status(&self) -> Vec<(TaskStatus, usize)> {
        TaskStatus::ALL
            .iter()
            .map(|status| {
                let count = self.tasks.iter().filter(|task| task.status == *status).count();
                (*status, count)
            })
            .collect()
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    fn position(&self, id: u64) -> Option<usize> {
        self.tasks.iter().position(|task| task.id == id)
    }

    /// Reject a mutation up front while a background save is in flight.
    fn ensure_writable(&self) -> Result<()> {
        if self.is_saving() {
            return Err(Error::WriteInProgress);
        }
        Ok(())
    }

    fn persist(&mut self, affected: Vec<u64>) -> Result<()> {
        match &mut self.durability {
            Durability::WriteThrough => self.store.save(&self.tasks),
            Durability::Background(saver) => saver.submit(self.tasks.clone(), affected).map(|_| ()),
        }
    }
}
