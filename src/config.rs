//! Configuration loading and management
//!
//! Handles parsing of `todocal.toml` configuration files.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::lock::DEFAULT_LOCK_TIMEOUT_MS;
use crate::oplog::OpLog;
use crate::query::{SortColumn, SortDirection, TaskView};
use crate::storage::DATA_FILE_NAME;

/// Config file looked up in the working directory
pub const CONFIG_FILE_NAME: &str = "todocal.toml";

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Task collection path; the platform data directory when unset
    #[serde(default)]
    pub data_file: Option<PathBuf>,

    /// List view defaults
    #[serde(default)]
    pub view: ViewConfig,

    /// Storage tuning
    #[serde(default)]
    pub storage: StorageConfig,

    /// Operation log
    #[serde(default)]
    pub log: LogConfig,
}

/// List view configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ViewConfig {
    /// Include "On hold" tasks in the unfiltered list
    #[serde(default = "default_true")]
    pub show_on_hold: bool,

    /// Column to sort by; newest-first when unset
    #[serde(default)]
    pub sort_column: Option<String>,

    #[serde(default = "default_sort_direction")]
    pub sort_direction: String,
}

fn default_true() -> bool {
    true
}

fn default_sort_direction() -> String {
    "ascending".to_string()
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            show_on_hold: true,
            sort_column: None,
            sort_direction: default_sort_direction(),
        }
    }
}

impl ViewConfig {
    /// The configured view over all statuses.
    pub fn task_view(&self) -> Result<TaskView> {
        Ok(TaskView {
            status: None,
            column: self.column()?,
            direction: self.direction()?,
            hide_on_hold: !self.show_on_hold,
        })
    }

    fn column(&self) -> Result<Option<SortColumn>> {
        match self.sort_column.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => raw
                .parse()
                .map(Some)
                .map_err(|_| Error::InvalidConfig(format!("view.sort_column: unknown column '{raw}'"))),
        }
    }

    fn direction(&self) -> Result<SortDirection> {
        self.sort_direction.parse().map_err(|_| {
            Error::InvalidConfig(format!(
                "view.sort_direction: invalid value '{}' (expected ascending|descending)",
                self.sort_direction
            ))
        })
    }

    fn validate(&self) -> Result<()> {
        self.column()?;
        self.direction()?;
        Ok(())
    }
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// How long a save waits for the data file lock
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
}

fn default_lock_timeout_ms() -> u64 {
    DEFAULT_LOCK_TIMEOUT_MS
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            lock_timeout_ms: default_lock_timeout_ms(),
        }
    }
}

/// Operation log configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Log path; `<data_file>.log.jsonl` when unset
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            file: None,
        }
    }
}

impl Config {
    /// Load configuration from a `todocal.toml` file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|err| Error::InvalidConfig(format!("{}: {err}", path.display())))?;
        let config: Config = toml::from_str(&content)
            .map_err(|err| Error::InvalidConfig(format!("{}: {err}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Load `todocal.toml` from `dir`, or return defaults.
    ///
    /// A file that fails to load is reported and ignored.
    pub fn load_from_dir(dir: &Path) -> Self {
        let config_path = dir.join(CONFIG_FILE_NAME);
        if !config_path.exists() {
            return Self::default();
        }
        match Self::load(&config_path) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!(path = %config_path.display(), error = %err, "ignoring config file");
                Self::default()
            }
        }
    }

    /// Resolved task collection path.
    pub fn data_file_path(&self) -> PathBuf {
        self.data_file.clone().unwrap_or_else(default_data_file)
    }

    /// Resolved operation log path, or `None` when logging is off.
    pub fn log_file_path(&self) -> Option<PathBuf> {
        if !self.log.enabled {
            return None;
        }
        Some(self.log.file.clone().unwrap_or_else(|| {
            OpLog::beside(&self.data_file_path()).path().to_path_buf()
        }))
    }

    fn validate(&self) -> Result<()> {
        if let Some(path) = &self.data_file {
            if path.as_os_str().is_empty() {
                return Err(Error::InvalidConfig(
                    "data_file cannot be empty".to_string(),
                ));
            }
        }
        if self.storage.lock_timeout_ms == 0 {
            return Err(Error::InvalidConfig(
                "storage.lock_timeout_ms must be > 0".to_string(),
            ));
        }
        self.view.validate()?;
        Ok(())
    }
}

/// `<platform data dir>/todocal/todo_calendar.json`, or the bare file name
/// when no home directory can be determined.
pub fn default_data_file() -> PathBuf {
    directories::ProjectDirs::from("", "", "todocal")
        .map(|dirs| dirs.data_dir().join(DATA_FILE_NAME))
        .unwrap_or_else(|| PathBuf::from(DATA_FILE_NAME))
}
