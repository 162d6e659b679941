//! todocal - personal task tracker library
//!
//! Keeps a collection of to-do items in one JSON file and exposes CRUD,
//! filtering and sorting over it.
//!
//! # Core Concepts
//!
//! - **Task**: description, optional due date, status, note, creation time
//! - **Status**: one of Pending, In progress, Completed, Cancelled, On hold;
//!   declaration order doubles as the status sort order
//! - **Write-through**: every mutation rewrites the whole file before it
//!   returns (or hands the snapshot to a single-flight background saver)
//! - **Recovery**: a missing or unreadable file loads as an empty
//!   collection, never as an error
//!
//! # Module Organization
//!
//! - `task`: Task model, status set and record normalization
//! - `storage`: `TaskStore` trait with JSON file and in-memory backends
//! - `lock`: File locking and atomic writes
//! - `ids`: Id allocation
//! - `manager`: `TaskManager`, the CRUD surface
//! - `query`: Sorting and list views
//! - `saver`: Background single-flight saves
//! - `oplog`: Append-only operation log
//! - `config`: Configuration loading from `todocal.toml`
//! - `error`: Error types and result aliases
//! - `output`: Human and JSON output envelopes
//! - `cli`: Command-line interface using clap

pub mod cli;
pub mod config;
pub mod error;
pub mod ids;
pub mod lock;
pub mod manager;
pub mod oplog;
pub mod output;
pub mod query;
pub mod saver;
pub mod storage;
pub mod task;

pub use error::{Error, Result};
pub use manager::{TaskManager, TaskUpdate, UpdateOutcome};
pub use storage::{JsonFileStore, MemoryStore, TaskStore};
pub use task::{Task, TaskStatus};
