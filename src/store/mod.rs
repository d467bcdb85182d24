//! Storage collaborators consumed by the engine.
//!
//! The engine only talks to these traits. Weekly plan and actual rows are
//! replaced as whole sets per task; a replace either lands completely or
//! leaves the previous rows in place.

pub mod memory;

pub use memory::MemoryStore;

use crate::error::StoreError;
use crate::models::{ProgressEntry, Stage, Task, WeeklyActual, WeeklyPlan};

/// Read access to tasks and their containment.
pub trait TaskRepository {
    fn task(&self, task_id: &str) -> Option<Task>;
    fn stage(&self, stage_id: &str) -> Option<Stage>;
    fn has_project(&self, project_id: &str) -> bool;
    fn tasks_in_stage(&self, stage_id: &str) -> Vec<Task>;
    fn stages_in_project(&self, project_id: &str) -> Vec<Stage>;
    fn all_tasks(&self) -> Vec<Task>;
}

/// Read access to field progress reports.
pub trait ProgressRepository {
    /// Every entry recorded for the task, whatever its approval state.
    fn progress_entries(&self, task_id: &str) -> Vec<ProgressEntry>;
}

/// Weekly plan/actual rows with whole-set replacement.
pub trait WeeklyStore {
    fn weekly_plan(&self, task_id: &str) -> Vec<WeeklyPlan>;
    fn weekly_actuals(&self, task_id: &str) -> Vec<WeeklyActual>;

    /// Replace every plan row of the task in one transaction.
    fn replace_weekly_plan(&self, task_id: &str, rows: Vec<WeeklyPlan>) -> Result<(), StoreError>;

    /// Replace every actual row of the task in one transaction.
    fn replace_weekly_actuals(
        &self,
        task_id: &str,
        rows: Vec<WeeklyActual>,
    ) -> Result<(), StoreError>;
}

/// Everything the engine needs from storage.
pub trait EvmStore: TaskRepository + ProgressRepository + WeeklyStore {}

impl<T: TaskRepository + ProgressRepository + WeeklyStore> EvmStore for T {}
