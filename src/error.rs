//! Error types for the earned value engine.
//!
//! Expected missing-data conditions are not errors here: empty curves come
//! back as empty vectors and missing ratios as `None`. These variants cover
//! the cases a caller may want to tell apart.

use chrono::NaiveDate;
use thiserror::Error;

/// Errors raised by the weekly row store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A table lock was poisoned by a panicking writer.
    #[error("store lock poisoned: {table}")]
    Poisoned { table: &'static str },

    /// The task referenced by a replace does not exist.
    #[error("unknown task: {0}")]
    UnknownTask(String),
}

/// Errors raised by the analytics engine.
#[derive(Debug, Error)]
pub enum EvmError {
    /// The task is missing a planned date or ends before it starts.
    #[error("invalid planning window for task {task_id}: start={start:?}, end={end:?}")]
    InvalidTaskWindow {
        task_id: String,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    },

    /// The planning window produced no week buckets.
    #[error("planning window for task {0} covers no weeks")]
    EmptyWeekRange(String),

    #[error("unknown task: {0}")]
    UnknownTask(String),

    #[error("unknown stage: {0}")]
    UnknownStage(String),

    #[error("unknown project: {0}")]
    UnknownProject(String),

    /// A replace transaction failed and was rolled back.
    #[error("persistence failure: {0}")]
    Store(#[from] StoreError),
}

/// Convenience alias used across the engine.
pub type EvmResult<T> = std::result::Result<T, EvmError>;
