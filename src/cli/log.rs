//! todocal log command implementation
//!
//! Shows the most recent entries of the operation log.

use std::path::PathBuf;

use serde::Serialize;

use crate::error::Result;
use crate::oplog::{self, OpLog, OpRecord};
use crate::output::{emit_success, HumanOutput, OutputOptions};

/// Options for the log command
pub struct LogOptions {
    pub limit: usize,
    pub data_file: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

#[derive(Serialize)]
struct LogReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<PathBuf>,
    entries: Vec<OpRecord>,
}

pub fn run(options: LogOptions) -> Result<()> {
    let config = super::resolve_config(options.config.as_deref(), options.data_file)?;

    let mut human = HumanOutput::new("Operation log");
    let report = match config.log_file_path() {
        Some(path) => {
            let entries = OpLog::new(&path).recent(options.limit)?;
            human.push_summary("File", path.display().to_string());
            human.push_summary("Entries", entries.len().to_string());
            for entry in &entries {
                human.push_detail(oplog::format_record(entry));
            }
            LogReport {
                path: Some(path),
                entries,
            }
        }
        None => {
            human.push_warning("operation log is disabled (log.enabled = false)");
            LogReport {
                path: None,
                entries: Vec::new(),
            }
        }
    };

    emit_success(
        OutputOptions {
            json: options.json,
            quiet: options.quiet,
        },
        "log",
        &report,
        Some(&human),
    )
}
