//! Command-line interface for todocal
//!
//! This module defines the CLI structure using clap derive macros.
//! Command bodies live in the submodules.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::error::Result;

mod format;
mod log;
mod task;

/// todocal - a personal task tracker backed by one JSON file
#[derive(Parser, Debug)]
#[command(name = "todocal")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the task file (overrides the config file)
    #[arg(long, global = true, env = "TODOCAL_DATA_FILE")]
    pub data_file: Option<PathBuf>,

    /// Path to a todocal.toml config file
    #[arg(long, global = true, env = "TODOCAL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Add a task
    Add {
        /// What needs doing
        description: String,

        /// Due date (YYYY-MM-DD)
        #[arg(long)]
        due: Option<String>,

        /// Free-form note
        #[arg(long)]
        note: Option<String>,
    },

    /// Change fields of a task
    Edit {
        id: u64,

        #[arg(long)]
        description: Option<String>,

        /// New due date (YYYY-MM-DD)
        #[arg(long, conflicts_with = "clear_due")]
        due: Option<String>,

        /// Remove the due date
        #[arg(long)]
        clear_due: bool,

        /// One of: Pending, "In progress", Completed, Cancelled, "On hold"
        #[arg(long)]
        status: Option<String>,

        #[arg(long)]
        note: Option<String>,
    },

    /// Set the status of a task
    Status {
        id: u64,

        /// One of: Pending, "In progress", Completed, Cancelled, "On hold"
        status: String,
    },

    /// Delete a task
    #[command(alias = "delete")]
    Rm { id: u64 },

    /// Show one task
    Show { id: u64 },

    /// List tasks
    #[command(alias = "ls")]
    List {
        /// Only tasks with this status
        #[arg(long)]
        status: Option<String>,

        /// Sort column: id, description, due_date, status, note, creation_time, image_path
        #[arg(long)]
        sort: Option<String>,

        /// Sort descending
        #[arg(long)]
        desc: bool,

        /// Leave "On hold" tasks out of the unfiltered list
        #[arg(long)]
        hide_on_hold: bool,
    },

    /// List tasks whose due date has passed
    Overdue,

    /// Show recent operations
    Log {
        /// Number of entries to show
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
}

/// Resolve configuration: an explicit path must load, an implicit
/// `todocal.toml` in the working directory is best-effort.
pub(crate) fn resolve_config(explicit: Option<&Path>, data_file: Option<PathBuf>) -> Result<Config> {
    let mut config = match explicit {
        Some(path) => Config::load(path)?,
        None => {
            let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
            Config::load_from_dir(&cwd)
        }
    };
    if let Some(path) = data_file {
        config.data_file = Some(path);
    }
    Ok(config)
}

impl Cli {
    /// Execute the CLI command
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Add { description, due, note } => task::run_add(task::AddOptions {
                description,
                due,
                note,
                data_file: self.data_file,
                config: self.config,
                json: self.json,
                quiet: self.quiet,
            }),
            Commands::Edit {
                id,
                description,
                due,
                clear_due,
                status,
                note,
            } => task::run_edit(task::EditOptions {
                id,
                description,
                due,
                clear_due,
                status,
                note,
                data_file: self.data_file,
                config: self.config,
                json: self.json,
                quiet: self.quiet,
            }),
            Commands::Status { id, status } => task::run_status(task::StatusOptions {
                id,
                status,
                data_file: self.data_file,
                config: self.config,
                json: self.json,
                quiet: self.quiet,
            }),
            Commands::Rm { id } => task::run_rm(task::RmOptions {
                id,
                data_file: self.data_file,
                config: self.config,
                json: self.json,
                quiet: self.quiet,
            }),
            Commands::Show { id } => task::run_show(task::ShowOptions {
                id,
                data_file: self.data_file,
                config: self.config,
                json: self.json,
                quiet: self.quiet,
            }),
            Commands::List {
                status,
                sort,
                desc,
                hide_on_hold,
            } => task::run_list(task::ListOptions {
                status,
                sort,
                desc,
                hide_on_hold,
                data_file: self.data_file,
                config: self.config,
                json: self.json,
                quiet: self.quiet,
            }),
            Commands::Overdue => task::run_overdue(task::OverdueOptions {
                data_file: self.data_file,
                config: self.config,
                json: self.json,
                quiet: self.quiet,
            }),
            Commands::Log { limit } => log::run(log::LogOptions {
                limit,
                data_file: self.data_file,
                config: self.config,
                json: self.json,
                quiet: self.quiet,
            }),
        }
    }
}
