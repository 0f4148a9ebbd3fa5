//! Which tasks become rows, and in what order.

use std::collections::{HashMap, HashSet};

use crate::model::Task;

/// Rows to render: sorted by `display_order`, minus hidden tasks and the
/// descendants of collapsed projects.
///
/// Tasks without an order keep their input position after the ordered ones.
pub fn visible_rows(tasks: &[Task]) -> Vec<Task> {
    let by_id: HashMap<&str, &Task> = tasks.iter().map(|t| (t.id.as_str(), t)).collect();

    let mut ordered: Vec<&Task> = tasks.iter().collect();
    ordered.sort_by_key(|t| (t.display_order.is_none(), t.display_order.unwrap_or(0)));

    ordered
        .into_iter()
        .filter(|t| !t.hidden && !has_collapsed_ancestor(t, &by_id))
        .cloned()
        .collect()
}

fn has_collapsed_ancestor(task: &Task, by_id: &HashMap<&str, &Task>) -> bool {
    let mut seen: HashSet<&str> = HashSet::from([task.id.as_str()]);
    let mut parent = task.project.as_deref();
    while let Some(id) = parent {
        if !seen.insert(id) {
            tracing::debug!(task = %task.id, "project chain loops back on itself");
            return false;
        }
        match by_id.get(id) {
            Some(p) if p.hide_children => return true,
            Some(p) => parent = p.project.as_deref(),
            None => return false,
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn task(id: &str) -> Task {
        let t = NaiveDate::from_ymd_opt(2024, 2, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .expect("valid date");
        Task::new(id, t, t).with_id(id)
    }

    fn ids(rows: &[Task]) -> Vec<&str> {
        rows.iter().map(|t| t.id.as_str()).collect()
    }

    #[test]
    fn sorts_by_display_order_keeping_unordered_last() {
        let mut a = task("a");
        a.display_order = Some(3);
        let b = task("b");
        let mut c = task("c");
        c.display_order = Some(1);
        let d = task("d");
        assert_eq!(ids(&visible_rows(&[a, b, c, d])), vec!["c", "a", "b", "d"]);
    }

    #[test]
    fn collapsed_project_hides_all_descendants() {
        let mut root = task("root");
        root.hide_children = true;
        let child = task("child").with_project("root");
        let grandchild = task("grandchild").with_project("child");
        let other = task("other");
        let rows = visible_rows(&[root, child, grandchild, other]);
        assert_eq!(ids(&rows), vec!["root", "other"]);
    }

    #[test]
    fn hidden_tasks_and_cycles_do_not_break_rows() {
        let mut hidden = task("hidden");
        hidden.hidden = true;
        let a = task("a").with_project("b");
        let b = task("b").with_project("a");
        let own = task("own").with_project("own");
        let orphan = task("orphan").with_project("missing");
        let rows = visible_rows(&[hidden, a, b, own, orphan]);
        assert_eq!(ids(&rows), vec!["a", "b", "own", "orphan"]);
    }
}
