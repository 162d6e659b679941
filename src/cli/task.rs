//! todocal task command implementations.

use std::path::PathBuf;

use chrono::Local;
use serde::Serialize;

use crate::cli::format::{format_due, task_line};
use crate::config::ViewConfig;
use crate::error::{Error, Result};
use crate::manager::{TaskManager, TaskUpdate, UpdateOutcome};
use crate::oplog::{OpLog, OpOutcome, OpRecord};
use crate::output::{emit_success, HumanOutput, OutputOptions};
use crate::query::{self, SortDirection, ViewSummary};
use crate::storage::JsonFileStore;
use crate::task::{Task, TaskStatus};

pub struct AddOptions {
    pub description: String,
    pub due: Option<String>,
    pub note: Option<String>,
    pub data_file: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

pub struct EditOptions {
    pub id: u64,
    pub description: Option<String>,
    pub due: Option<String>,
    pub clear_due: bool,
    pub status: Option<String>,
    pub note: Option<String>,
    pub data_file: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

pub struct StatusOptions {
    pub id: u64,
    pub status: String,
    pub data_file: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

pub struct RmOptions {
    pub id: u64,
    pub data_file: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

pub struct ShowOptions {
    pub id: u64,
    pub data_file: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

pub struct ListOptions {
    pub status: Option<String>,
    pub sort: Option<String>,
    pub desc: bool,
    pub hide_on_hold: bool,
    pub data_file: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

pub struct OverdueOptions {
    pub data_file: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

#[derive(Serialize)]
struct TaskOutput {
    task: Task,
}

#[derive(Serialize)]
struct EditOutput {
    changed: bool,
    task: Task,
}

#[derive(Serialize)]
struct RemovedOutput {
    id: u64,
    removed: bool,
}

#[derive(Serialize)]
struct OverdueOutput {
    today: String,
    total: usize,
    tasks: Vec<Task>,
}

struct TaskContext {
    manager: TaskManager<JsonFileStore>,
    oplog: Option<OpLog>,
    view: ViewConfig,
}

impl TaskContext {
    /// Record a mutating command. Failures to write the log are only traced.
    fn record<T>(
        &self,
        command: &str,
        task_id: Option<u64>,
        result: &Result<T>,
        detail: Option<String>,
    ) {
        let Some(oplog) = &self.oplog else {
            return;
        };
        let outcome = match (result, detail) {
            (Ok(_), Some(detail)) => OpOutcome::success_with(detail),
            (Ok(_), None) => OpOutcome::success(),
            (Err(err), _) => OpOutcome::failed(err.to_string()),
        };
        let mut record = OpRecord::new(command).with_outcome(outcome);
        if let Some(id) = task_id {
            record = record.with_task(id);
        }
        oplog.record(&record);
    }

    fn human(&self, header: impl Into<String>) -> HumanOutput {
        let mut human = HumanOutput::new(header);
        for warning in self.manager.load_warnings() {
            human.push_warning(warning.clone());
        }
        human
    }
}

fn load_context(data_file: Option<PathBuf>, config: Option<PathBuf>) -> Result<TaskContext> {
    let config = super::resolve_config(config.as_deref(), data_file)?;
    let path = config.data_file_path();
    tracing::debug!(path = %path.display(), "opening task file");

    let store = JsonFileStore::new(path).with_lock_timeout(config.storage.lock_timeout_ms);
    let manager = TaskManager::open(store);
    let oplog = config.log_file_path().map(OpLog::new);

    Ok(TaskContext {
        manager,
        oplog,
        view: config.view,
    })
}

fn parse_status(raw: &str) -> Result<TaskStatus> {
    raw.parse()
}

pub fn run_add(options: AddOptions) -> Result<()> {
    let mut ctx = load_context(options.data_file, options.config)?;
    let result = ctx.manager.create(
        &options.description,
        options.due.as_deref(),
        options.note.as_deref(),
    );
    let task_id = result.as_ref().ok().map(|task| task.id);
    ctx.record("add", task_id, &result, None);
    let task = result?;

    let mut human = ctx.human(format!("Task {} added", task.id));
    human.push_summary("Description", task.description.clone());
    human.push_summary("Due", format_due(task.due_date.as_deref()));
    human.push_summary("Status", task.status.to_string());

    emit_success(
        OutputOptions {
            json: options.json,
            quiet: options.quiet,
        },
        "add",
        &TaskOutput { task },
        Some(&human),
    )
}

pub fn run_edit(options: EditOptions) -> Result<()> {
    let mut ctx = load_context(options.data_file, options.config)?;
    let due_date = if options.clear_due {
        Some(None)
    } else {
        options.due.map(Some)
    };
    let update = options
        .status
        .as_deref()
        .map(parse_status)
        .transpose()
        .and_then(|status| {
            let changes = TaskUpdate {
                description: options.description,
                due_date,
                status,
                note: options.note,
            };
            ctx.manager.update(options.id, changes)
        });

    let result = match update {
        Ok(UpdateOutcome::Updated(task)) => Ok((true, task)),
        Ok(UpdateOutcome::Unchanged) => ctx
            .manager
            .get(options.id)
            .map(|task| (false, task))
            .ok_or(Error::TaskNotFound(options.id)),
        Ok(UpdateOutcome::NotFound) => Err(Error::TaskNotFound(options.id)),
        Err(err) => Err(err),
    };
    if !matches!(result, Ok((false, _))) {
        ctx.record("edit", Some(options.id), &result, None);
    }
    let (changed, task) = result?;

    let mut human = if changed {
        ctx.human(format!("Task {} updated", task.id))
    } else {
        let mut human = ctx.human(format!("Task {} unchanged", task.id));
        human.push_next_step(format!(
            "todocal edit {} --description <text> (or --due, --clear-due, --status, --note)",
            task.id
        ));
        human
    };
    human.push_detail(task_line(&task));

    emit_success(
        OutputOptions {
            json: options.json,
            quiet: options.quiet,
        },
        "edit",
        &EditOutput { changed, task },
        Some(&human),
    )
}

pub fn run_status(options: StatusOptions) -> Result<()> {
    let mut ctx = load_context(options.data_file, options.config)?;
    let update = parse_status(&options.status)
        .and_then(|status| ctx.manager.update(options.id, TaskUpdate::status(status)));

    let result = match update {
        Ok(UpdateOutcome::Updated(task)) => Ok(task),
        Ok(_) => Err(Error::TaskNotFound(options.id)),
        Err(err) => Err(err),
    };
    let detail = result.as_ref().ok().map(|task| task.status.to_string());
    ctx.record("status", Some(options.id), &result, detail);
    let task = result?;

    let mut human = ctx.human(format!("Task {} is now {}", task.id, task.status));
    human.push_detail(task_line(&task));

    emit_success(
        OutputOptions {
            json: options.json,
            quiet: options.quiet,
        },
        "status",
        &TaskOutput { task },
        Some(&human),
    )
}

pub fn run_rm(options: RmOptions) -> Result<()> {
    let mut ctx = load_context(options.data_file, options.config)?;
    let result = match ctx.manager.delete(options.id) {
        Ok(true) => Ok(()),
        Ok(false) => Err(Error::TaskNotFound(options.id)),
        Err(err) => Err(err),
    };
    ctx.record("rm", Some(options.id), &result, None);
    result?;

    let human = ctx.human(format!("Task {} removed", options.id));
    emit_success(
        OutputOptions {
            json: options.json,
            quiet: options.quiet,
        },
        "rm",
        &RemovedOutput {
            id: options.id,
            removed: true,
        },
        Some(&human),
    )
}

pub fn run_show(options: ShowOptions) -> Result<()> {
    let ctx = load_context(options.data_file, options.config)?;
    let task = ctx
        .manager
        .get(options.id)
        .ok_or(Error::TaskNotFound(options.id))?;

    let mut human = ctx.human(format!("Task {}", task.id));
    human.push_summary("Description", task.description.clone());
    human.push_summary("Status", task.status.to_string());
    human.push_summary("Due", format_due(task.due_date.as_deref()));
    if let Some(created) = &task.creation_time {
        human.push_summary("Created", created.clone());
    }
    if let Some(image) = &task.image_path {
        human.push_summary("Image", image.clone());
    }
    if task.is_past_due(Local::now().date_naive()) && task.status != TaskStatus::Completed {
        human.push_warning("past due");
    }
    if !task.note.is_empty() {
        for line in task.note.lines() {
            human.push_detail(line.to_string());
        }
    }

    emit_success(
        OutputOptions {
            json: options.json,
            quiet: options.quiet,
        },
        "show",
        &TaskOutput { task },
        Some(&human),
    )
}

pub fn run_list(options: ListOptions) -> Result<()> {
    let ctx = load_context(options.data_file, options.config)?;
    let mut view = ctx.view.task_view()?;

    if let Some(raw) = options.status.as_deref() {
        view.status = Some(parse_status(raw)?);
    }
    if options.sort.is_some() {
        view.column = query::parse_column(options.sort.as_deref())?;
    }
    if options.desc {
        view.direction = SortDirection::Descending;
    }
    view.hide_on_hold |= options.hide_on_hold;

    let summary: ViewSummary = ctx.manager.view(&view);

    let header = match view.status {
        Some(status) => format!("{status} tasks"),
        None => "Tasks".to_string(),
    };
    let mut human = ctx.human(header);
    human.push_summary(
        "Shown",
        format!("{}/{}", summary.tasks.len(), summary.total),
    );
    if let Some(column) = view.column {
        human.push_summary("Sort", format!("{column} {}", view.direction.as_str()));
    }
    let counts = ctx
        .manager
        .count_by_status()
        .into_iter()
        .filter(|(_, count)| *count > 0)
        .map(|(status, count)| format!("{status} {count}"))
        .collect::<Vec<_>>();
    if !counts.is_empty() {
        human.push_summary("By status", counts.join(", "));
    }
    if summary.hidden_on_hold > 0 {
        human.push_summary(
            "Hidden",
            format!("{} On hold", summary.hidden_on_hold),
        );
    }
    for task in &summary.tasks {
        human.push_detail(task_line(task));
    }

    emit_success(
        OutputOptions {
            json: options.json,
            quiet: options.quiet,
        },
        "list",
        &summary,
        Some(&human),
    )
}

pub fn run_overdue(options: OverdueOptions) -> Result<()> {
    let ctx = load_context(options.data_file, options.config)?;
    let today = Local::now().date_naive();
    let tasks = ctx.manager.overdue(today);

    let mut human = ctx.human("Overdue tasks");
    human.push_summary("Total", tasks.len().to_string());
    for task in &tasks {
        human.push_detail(task_line(task));
    }

    emit_success(
        OutputOptions {
            json: options.json,
            quiet: options.quiet,
        },
        "overdue",
        &OverdueOutput {
            today: today.format(crate::task::DATE_FORMAT).to_string(),
            total: tasks.len(),
            tasks,
        },
        Some(&human),
    )
}
