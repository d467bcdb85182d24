//! JSON datasets.
//!
//! A dataset is a snapshot of the planning entities and progress entries
//! exported by the application that owns them. Loading it fills a
//! [`MemoryStore`]; weekly rows are always derived, never loaded.

use crate::models::{ProgressEntry, Project, Stage, Task};
use crate::store::MemoryStore;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, warn};

/// Entities of one or more projects.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub stages: Vec<Stage>,
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub progress_entries: Vec<ProgressEntry>,
}

impl Dataset {
    /// Parse a dataset from JSON text.
    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).context("Failed to parse dataset JSON")
    }

    /// Read and parse a dataset file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read dataset: {}", path.display()))?;
        Self::from_json(&content).with_context(|| format!("Invalid dataset: {}", path.display()))
    }

    /// Load every entity into a fresh store.
    ///
    /// Dangling references are kept but logged: a task whose stage is
    /// missing simply never shows up in a stage or project roll-up.
    pub fn into_store(self) -> Result<MemoryStore> {
        let store = MemoryStore::new();

        let project_ids: HashSet<&str> = self.projects.iter().map(|p| p.id.as_str()).collect();
        let stage_ids: HashSet<&str> = self.stages.iter().map(|s| s.id.as_str()).collect();
        let task_ids: HashSet<&str> = self.tasks.iter().map(|t| t.id.as_str()).collect();

        for stage in &self.stages {
            if !project_ids.contains(stage.project_id.as_str()) {
                warn!("Stage {} references unknown project {}", stage.id, stage.project_id);
            }
        }
        for task in &self.tasks {
            if !stage_ids.contains(task.stage_id.as_str()) {
                warn!("Task {} references unknown stage {}", task.id, task.stage_id);
            }
        }
        let orphans = self
            .progress_entries
            .iter()
            .filter(|e| !task_ids.contains(e.task_id.as_str()))
            .count();
        if orphans > 0 {
            warn!("{} progress entries reference unknown tasks", orphans);
        }

        debug!(
            "Loading {} projects, {} stages, {} tasks, {} progress entries",
            self.projects.len(),
            self.stages.len(),
            self.tasks.len(),
            self.progress_entries.len()
        );

        for project in self.projects {
            store.insert_project(project)?;
        }
        for stage in self.stages {
            store.insert_stage(stage)?;
        }
        for task in self.tasks {
            store.insert_task(task)?;
        }
        for entry in self.progress_entries {
            store.record_progress(entry)?;
        }

        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{ProgressRepository, TaskRepository};

    const SAMPLE: &str = include_str!("../fixtures/edificio.json");

    #[test]
    fn test_parse_fixture() {
        let dataset = Dataset::from_json(SAMPLE).unwrap();
        assert_eq!(dataset.projects.len(), 1);
        assert_eq!(dataset.stages.len(), 2);
        assert!(dataset.tasks.iter().any(|t| t.id == "fundaciones"));

        let fundaciones = dataset.tasks.iter().find(|t| t.id == "fundaciones").unwrap();
        assert_eq!(fundaciones.planned_quantity, 30.0);
        assert_eq!(fundaciones.planned_labor_budget, Some(300_000.0));
        assert_eq!(fundaciones.unit_of_measure, "m3");
    }

    #[test]
    fn test_into_store() {
        let store = Dataset::from_json(SAMPLE).unwrap().into_store().unwrap();
        assert!(store.has_project("p-edificio"));
        assert_eq!(store.tasks_in_stage("s-obra").len(), 3);
        assert_eq!(store.progress_entries("fundaciones").len(), 4);
    }

    #[test]
    fn test_minimal_dataset() {
        let json = r#"{
            "tasks": [{"id": "t-1", "stage_id": "s-x"}]
        }"#;
        let dataset = Dataset::from_json(json).unwrap();
        let task = &dataset.tasks[0];
        assert!(task.planned_start_date.is_none());
        assert!(task.planned_labor_budget.is_none());
        assert_eq!(task.completion_percentage, 0.0);

        let store = dataset.into_store().unwrap();
        assert_eq!(store.all_tasks().len(), 1);
    }

    #[test]
    fn test_invalid_json_is_error() {
        assert!(Dataset::from_json("{\"tasks\": [").is_err());
        assert!(Dataset::load(Path::new("/nonexistent/obra.json")).is_err());
    }
}
