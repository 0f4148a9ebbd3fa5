use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::task::Task;

/// The host-owned task collection the timeline renders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub name: String,
    pub tasks: Vec<Task>,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

impl Default for Project {
    fn default() -> Self {
        Self {
            name: "Untitled Project".to_string(),
            tasks: Vec::new(),
            created: Utc::now(),
            modified: Utc::now(),
        }
    }
}

impl Project {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Touch the modified timestamp.
    pub fn touch(&mut self) {
        self.modified = Utc::now();
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Replace the stored task with the same id. Returns false if it is unknown.
    pub fn replace_task(&mut self, task: &Task) -> bool {
        match self.tasks.iter_mut().find(|t| t.id == task.id) {
            Some(slot) => {
                *slot = task.clone();
                self.touch();
                true
            }
            None => false,
        }
    }

    /// Remove a task. Children and dependents keep their now-dangling references.
    pub fn remove_task(&mut self, id: &str) -> Option<Task> {
        let pos = self.tasks.iter().position(|t| t.id == id)?;
        self.touch();
        Some(self.tasks.remove(pos))
    }

    pub fn toggle_collapsed(&mut self, id: &str) {
        if let Some(task) = self.tasks.iter_mut().find(|t| t.id == id) {
            task.hide_children = !task.hide_children;
            self.touch();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn task(id: &str) -> Task {
        let day = NaiveDate::from_ymd_opt(2024, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .expect("valid date");
        Task::new(id, day, day).with_id(id)
    }

    #[test]
    fn replace_and_remove_by_id() {
        let mut project = Project::new("p");
        project.tasks = vec![task("a"), task("b")];

        let mut edited = task("b");
        edited.progress = 40;
        assert!(project.replace_task(&edited));
        assert_eq!(project.task("b").map(|t| t.progress), Some(40));
        assert!(!project.replace_task(&task("zzz")));

        assert_eq!(project.remove_task("a").map(|t| t.id), Some("a".to_string()));
        assert!(project.remove_task("a").is_none());
        assert_eq!(project.tasks.len(), 1);
    }
}
