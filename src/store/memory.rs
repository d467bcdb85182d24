//! In-memory store.
//!
//! Entities live in insertion order so listings are deterministic. Weekly
//! rows are held per task as a generation-stamped set; a replace swaps the
//! whole set under a single write lock, so readers see either the old set
//! or the new one.

use super::{ProgressRepository, TaskRepository, WeeklyStore};
use crate::error::StoreError;
use crate::models::{ProgressEntry, Project, Stage, Task, WeeklyActual, WeeklyPlan};
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

/// A task's row set together with the number of times it was replaced.
#[derive(Debug, Clone)]
struct Generation<T> {
    generation: u64,
    rows: Vec<T>,
}

impl<T> Default for Generation<T> {
    fn default() -> Self {
        Self {
            generation: 0,
            rows: Vec::new(),
        }
    }
}

#[derive(Debug, Default)]
struct Entities {
    projects: Vec<Project>,
    stages: Vec<Stage>,
    tasks: Vec<Task>,
    progress: Vec<ProgressEntry>,
}

/// Thread-safe in-memory implementation of every storage trait.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entities: RwLock<Entities>,
    plans: RwLock<HashMap<String, Generation<WeeklyPlan>>>,
    actuals: RwLock<HashMap<String, Generation<WeeklyActual>>>,
}

fn read<'a, T>(
    lock: &'a RwLock<T>,
    table: &'static str,
) -> Result<RwLockReadGuard<'a, T>, StoreError> {
    lock.read().map_err(|_| StoreError::Poisoned { table })
}

fn write<'a, T>(
    lock: &'a RwLock<T>,
    table: &'static str,
) -> Result<RwLockWriteGuard<'a, T>, StoreError> {
    lock.write().map_err(|_| StoreError::Poisoned { table })
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or overwrite a project.
    pub fn insert_project(&self, project: Project) -> Result<(), StoreError> {
        let mut entities = write(&self.entities, "entities")?;
        entities.projects.retain(|p| p.id != project.id);
        entities.projects.push(project);
        Ok(())
    }

    /// Add or overwrite a stage.
    pub fn insert_stage(&self, stage: Stage) -> Result<(), StoreError> {
        let mut entities = write(&self.entities, "entities")?;
        entities.stages.retain(|s| s.id != stage.id);
        entities.stages.push(stage);
        Ok(())
    }

    /// Add or overwrite a task.
    pub fn insert_task(&self, task: Task) -> Result<(), StoreError> {
        let mut entities = write(&self.entities, "entities")?;
        entities.tasks.retain(|t| t.id != task.id);
        entities.tasks.push(task);
        Ok(())
    }

    /// Append a progress entry. Entries are never edited in place.
    pub fn record_progress(&self, entry: ProgressEntry) -> Result<(), StoreError> {
        let mut entities = write(&self.entities, "entities")?;
        entities.progress.push(entry);
        Ok(())
    }

    /// How many times the task's plan rows have been replaced.
    pub fn plan_generation(&self, task_id: &str) -> u64 {
        read(&self.plans, "weekly_plan")
            .ok()
            .and_then(|plans| plans.get(task_id).map(|g| g.generation))
            .unwrap_or(0)
    }

    /// How many times the task's actual rows have been replaced.
    pub fn actuals_generation(&self, task_id: &str) -> u64 {
        read(&self.actuals, "weekly_actual")
            .ok()
            .and_then(|actuals| actuals.get(task_id).map(|g| g.generation))
            .unwrap_or(0)
    }

    fn ensure_task(&self, task_id: &str) -> Result<(), StoreError> {
        let entities = read(&self.entities, "entities")?;
        if entities.tasks.iter().any(|t| t.id == task_id) {
            Ok(())
        } else {
            Err(StoreError::UnknownTask(task_id.to_string()))
        }
    }

    fn entities(&self) -> Option<RwLockReadGuard<'_, Entities>> {
        read(&self.entities, "entities").ok()
    }
}

impl TaskRepository for MemoryStore {
    fn task(&self, task_id: &str) -> Option<Task> {
        self.entities()?
            .tasks
            .iter()
            .find(|t| t.id == task_id)
            .cloned()
    }

    fn stage(&self, stage_id: &str) -> Option<Stage> {
        self.entities()?
            .stages
            .iter()
            .find(|s| s.id == stage_id)
            .cloned()
    }

    fn has_project(&self, project_id: &str) -> bool {
        self.entities()
            .map(|e| e.projects.iter().any(|p| p.id == project_id))
            .unwrap_or(false)
    }

    fn tasks_in_stage(&self, stage_id: &str) -> Vec<Task> {
        self.entities()
            .map(|e| {
                e.tasks
                    .iter()
                    .filter(|t| t.stage_id == stage_id)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    fn stages_in_project(&self, project_id: &str) -> Vec<Stage> {
        self.entities()
            .map(|e| {
                e.stages
                    .iter()
                    .filter(|s| s.project_id == project_id)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    fn all_tasks(&self) -> Vec<Task> {
        self.entities().map(|e| e.tasks.clone()).unwrap_or_default()
    }
}

impl ProgressRepository for MemoryStore {
    fn progress_entries(&self, task_id: &str) -> Vec<ProgressEntry> {
        self.entities()
            .map(|e| {
                e.progress
                    .iter()
                    .filter(|p| p.task_id == task_id)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl WeeklyStore for MemoryStore {
    fn weekly_plan(&self, task_id: &str) -> Vec<WeeklyPlan> {
        read(&self.plans, "weekly_plan")
            .ok()
            .and_then(|plans| plans.get(task_id).map(|g| g.rows.clone()))
            .unwrap_or_default()
    }

    fn weekly_actuals(&self, task_id: &str) -> Vec<WeeklyActual> {
        read(&self.actuals, "weekly_actual")
            .ok()
            .and_then(|actuals| actuals.get(task_id).map(|g| g.rows.clone()))
            .unwrap_or_default()
    }

    fn replace_weekly_plan(&self, task_id: &str, rows: Vec<WeeklyPlan>) -> Result<(), StoreError> {
        self.ensure_task(task_id)?;
        let mut plans = write(&self.plans, "weekly_plan")?;
        let slot = plans.entry(task_id.to_string()).or_default();
        slot.generation += 1;
        slot.rows = rows;
        debug!(
            "Replaced weekly plan for {} ({} rows, generation {})",
            task_id,
            slot.rows.len(),
            slot.generation
        );
        Ok(())
    }

    fn replace_weekly_actuals(
        &self,
        task_id: &str,
        rows: Vec<WeeklyActual>,
    ) -> Result<(), StoreError> {
        self.ensure_task(task_id)?;
        let mut actuals = write(&self.actuals, "weekly_actual")?;
        let slot = actuals.entry(task_id.to_string()).or_default();
        slot.generation += 1;
        slot.rows = rows;
        debug!(
            "Replaced weekly actuals for {} ({} rows, generation {})",
            task_id,
            slot.rows.len(),
            slot.generation
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn task(id: &str, stage_id: &str) -> Task {
        Task {
            id: id.to_string(),
            stage_id: stage_id.to_string(),
            name: id.to_string(),
            planned_start_date: None,
            planned_end_date: None,
            planned_quantity: 0.0,
            planned_labor_budget: None,
            unit_of_measure: String::new(),
            completion_percentage: 0.0,
        }
    }

    fn plan_row(task_id: &str, day: u32) -> WeeklyPlan {
        WeeklyPlan {
            task_id: task_id.to_string(),
            week_start_date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            planned_quantity_this_week: 1.0,
            planned_value_this_week: 10.0,
        }
    }

    #[test]
    fn test_containment_queries() {
        let store = MemoryStore::new();
        store
            .insert_project(Project {
                id: "p-1".to_string(),
                name: "Edificio".to_string(),
            })
            .unwrap();
        store
            .insert_stage(Stage {
                id: "s-1".to_string(),
                project_id: "p-1".to_string(),
                name: "Obra gruesa".to_string(),
            })
            .unwrap();
        store.insert_task(task("t-1", "s-1")).unwrap();
        store.insert_task(task("t-2", "s-1")).unwrap();
        store.insert_task(task("t-3", "s-2")).unwrap();

        assert!(store.has_project("p-1"));
        assert!(!store.has_project("p-2"));
        assert_eq!(store.stages_in_project("p-1").len(), 1);
        let ids: Vec<_> = store.tasks_in_stage("s-1").into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec!["t-1", "t-2"]);
        assert_eq!(store.all_tasks().len(), 3);
    }

    #[test]
    fn test_replace_swaps_whole_set() {
        let store = MemoryStore::new();
        store.insert_task(task("t-1", "s-1")).unwrap();

        store
            .replace_weekly_plan("t-1", vec![plan_row("t-1", 1), plan_row("t-1", 8)])
            .unwrap();
        assert_eq!(store.weekly_plan("t-1").len(), 2);
        assert_eq!(store.plan_generation("t-1"), 1);

        store
            .replace_weekly_plan("t-1", vec![plan_row("t-1", 15)])
            .unwrap();
        let rows = store.weekly_plan("t-1");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].week_start_date, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
        assert_eq!(store.plan_generation("t-1"), 2);
    }

    #[test]
    fn test_replace_unknown_task_leaves_store_untouched() {
        let store = MemoryStore::new();
        let err = store
            .replace_weekly_actuals("missing", Vec::new())
            .unwrap_err();
        assert!(matches!(err, StoreError::UnknownTask(_)));
        assert_eq!(store.actuals_generation("missing"), 0);
        assert!(store.weekly_actuals("missing").is_empty());
    }

    #[test]
    fn test_insert_task_overwrites() {
        let store = MemoryStore::new();
        store.insert_task(task("t-1", "s-1")).unwrap();
        let mut updated = task("t-1", "s-1");
        updated.completion_percentage = 50.0;
        store.insert_task(updated).unwrap();

        assert_eq!(store.all_tasks().len(), 1);
        assert_eq!(store.task("t-1").unwrap().completion_percentage, 50.0);
    }
}
