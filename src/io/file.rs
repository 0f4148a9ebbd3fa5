use std::path::Path;

use crate::error::StorageError;
use crate::model::Project;

/// Save a project to a JSON file.
pub fn save_project(project: &Project, path: &Path) -> Result<(), StorageError> {
    let json = serde_json::to_string_pretty(project)?;
    std::fs::write(path, json)?;
    tracing::info!(path = %path.display(), tasks = project.tasks.len(), "project saved");
    Ok(())
}

/// Load a project from a JSON file.
pub fn load_project(path: &Path) -> Result<Project, StorageError> {
    let json = std::fs::read_to_string(path)?;
    let project: Project = serde_json::from_str(&json)?;
    tracing::info!(path = %path.display(), tasks = project.tasks.len(), "project loaded");
    Ok(project)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Task;
    use chrono::NaiveDate;

    #[test]
    fn project_survives_a_trip_to_disk() {
        let day = |d| {
            NaiveDate::from_ymd_opt(2024, 5, d)
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .expect("valid date")
        };
        let mut project = Project::new("Launch");
        project.tasks = vec![
            Task::new("Build", day(1), day(4))
                .with_id("build")
                .with_actual(day(2), day(6))
                .with_progress(40),
            Task::new_milestone("Ship", day(8)).with_dependencies(["build"]),
        ];

        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("launch.gantt.json");
        save_project(&project, &path).expect("save");
        let loaded = load_project(&path).expect("load");

        assert_eq!(loaded.name, "Launch");
        assert_eq!(loaded.tasks, project.tasks);
    }

    #[test]
    fn reports_missing_and_malformed_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("nope.json");
        assert!(matches!(load_project(&missing), Err(StorageError::Io(_))));

        let broken = dir.path().join("broken.json");
        std::fs::write(&broken, "[1, 2").expect("write");
        assert!(matches!(load_project(&broken), Err(StorageError::Json(_))));
    }
}
