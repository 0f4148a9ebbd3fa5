//! Task records → pixel-space bars.
//!
//! Building is two-pass: every bar is positioned first, then dependency edges
//! are resolved by id so forward references land on bars built later.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDateTime;

use crate::config::Sizing;
use crate::engine::axis::TimeAxis;
use crate::model::task::{day_end, day_start};
use crate::model::{Task, TaskKind};

/// A closed time interval with `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl Span {
    /// Builds a span, swapping inverted endpoints.
    pub fn new(a: NaiveDateTime, b: NaiveDateTime) -> Self {
        if a <= b {
            Self { start: a, end: b }
        } else {
            Self { start: b, end: a }
        }
    }

    pub fn union(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    fn expand_single_day(self) -> Span {
        if self.start.date() == self.end.date() {
            Span {
                start: day_start(self.start.date()),
                end: day_end(self.end.date()),
            }
        } else {
            self
        }
    }
}

/// A task with every defaulted field filled in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizedTask {
    pub kind: TaskKind,
    pub planned: Span,
    pub actual: Span,
    pub progress: u8,
}

/// Resolve one task's optional fields without looking at its children.
///
/// With `whole_days`, a span that starts and ends on the same calendar day
/// widens to cover that entire day. Milestones stay points.
pub fn normalize(task: &Task, whole_days: bool) -> NormalizedTask {
    let planned = Span::new(
        task.planned_start.unwrap_or(task.start),
        task.planned_end.unwrap_or(task.end),
    );
    let actual = Span::new(
        task.actual_start.unwrap_or(task.start),
        task.actual_end.unwrap_or(task.end),
    );
    let (planned, actual) = if whole_days && task.kind != TaskKind::Milestone {
        (planned.expand_single_day(), actual.expand_single_day())
    } else {
        (planned, actual)
    };
    NormalizedTask {
        kind: task.kind,
        planned,
        actual,
        progress: task.progress.min(100),
    }
}

/// Normalize every task, deriving project spans from their children.
///
/// A project without an explicit planned (or actual) interval takes the
/// min/max of its direct children's effective intervals; the two intervals
/// aggregate independently. Cycles in the project chain fall back to the
/// task's own baseline.
pub fn normalize_all(tasks: &[Task], whole_days: bool) -> HashMap<String, NormalizedTask> {
    let mut resolver = Resolver::new(tasks, whole_days);
    let mut visiting = HashSet::new();
    for task in tasks {
        resolver.resolve(&task.id, &mut visiting);
    }
    resolver
        .resolved
        .into_iter()
        .map(|(id, n)| (id.to_string(), n))
        .collect()
}

struct Resolver<'a> {
    by_id: HashMap<&'a str, &'a Task>,
    children: HashMap<&'a str, Vec<&'a str>>,
    whole_days: bool,
    resolved: HashMap<&'a str, NormalizedTask>,
}

impl<'a> Resolver<'a> {
    fn new(tasks: &'a [Task], whole_days: bool) -> Self {
        let mut children: HashMap<&str, Vec<&str>> = HashMap::new();
        for task in tasks {
            if let Some(parent) = task.project.as_deref() {
                if parent != task.id {
                    children.entry(parent).or_default().push(task.id.as_str());
                }
            }
        }
        Self {
            by_id: tasks.iter().map(|t| (t.id.as_str(), t)).collect(),
            children,
            whole_days,
            resolved: HashMap::new(),
        }
    }

    fn resolve(&mut self, id: &'a str, visiting: &mut HashSet<&'a str>) -> Option<NormalizedTask> {
        if let Some(done) = self.resolved.get(id) {
            return Some(*done);
        }
        let task = *self.by_id.get(id)?;
        let mut normalized = normalize(task, self.whole_days);

        let needs_children = task.is_project()
            && !(task.has_explicit_planned() && task.has_explicit_actual());
        let child_ids = self.children.get(id).cloned().unwrap_or_default();

        if needs_children && !child_ids.is_empty() {
            if !visiting.insert(id) {
                tracing::debug!(task = %id, "project hierarchy cycle, using own baseline");
                return Some(normalized);
            }
            let spans: Vec<NormalizedTask> = child_ids
                .iter()
                .filter_map(|child| self.resolve(*child, visiting))
                .collect();
            visiting.remove(id);

            if !task.has_explicit_planned() {
                if let Some(span) = spans.iter().map(|c| c.planned).reduce(Span::union) {
                    normalized.planned = span;
                }
            }
            if !task.has_explicit_actual() {
                if let Some(span) = spans.iter().map(|c| c.actual).reduce(Span::union) {
                    normalized.actual = span;
                }
            }
        }

        self.resolved.insert(id, normalized);
        Some(normalized)
    }
}

/// Pixel-space projection of one task row.
#[derive(Debug, Clone, PartialEq)]
pub struct BarGeometry {
    /// Row index of the originating task.
    pub index: usize,
    pub task_id: String,
    pub kind: TaskKind,
    pub planned: Span,
    pub actual: Span,
    pub progress: u8,
    pub x1: f64,
    pub x2: f64,
    pub actual_x1: f64,
    pub actual_x2: f64,
    pub y: f64,
    pub height: f64,
    pub progress_x: f64,
    pub progress_width: f64,
    /// Rows of the tasks that depend on this one.
    pub bar_children: Vec<usize>,
}

impl BarGeometry {
    pub fn width(&self) -> f64 {
        self.x2 - self.x1
    }

    /// Right edge of the progress fill in left-to-right mode, left edge otherwise.
    pub fn progress_edge(&self, rtl: bool) -> f64 {
        if rtl {
            self.progress_x
        } else {
            self.progress_x + self.progress_width
        }
    }
}

/// Geometry for a single normalized task placed in row `index`.
pub fn bar_geometry(
    index: usize,
    task_id: &str,
    normalized: &NormalizedTask,
    axis: &TimeAxis,
    sizing: &Sizing,
) -> BarGeometry {
    let height = sizing.bar_height();
    let y = sizing.bar_top(index);
    let mut bar = BarGeometry {
        index,
        task_id: task_id.to_string(),
        kind: normalized.kind,
        planned: normalized.planned,
        actual: normalized.actual,
        progress: normalized.progress,
        x1: 0.0,
        x2: 0.0,
        actual_x1: 0.0,
        actual_x2: 0.0,
        y,
        height,
        progress_x: 0.0,
        progress_width: 0.0,
        bar_children: Vec::new(),
    };
    match normalized.kind {
        TaskKind::Milestone => place_milestone(&mut bar, axis),
        TaskKind::Task | TaskKind::Project => place_span(&mut bar, axis),
    }
    bar
}

fn edges(axis: &TimeAxis, span: Span) -> (f64, f64) {
    let a = axis.time_to_x(span.start);
    let b = axis.time_to_x(span.end);
    (a.min(b), a.max(b))
}

fn place_span(bar: &mut BarGeometry, axis: &TimeAxis) {
    (bar.x1, bar.x2) = edges(axis, bar.planned);
    (bar.actual_x1, bar.actual_x2) = edges(axis, bar.actual);
    bar.progress_width = (bar.x2 - bar.x1) * f64::from(bar.progress) / 100.0;
    bar.progress_x = if axis.is_rtl() {
        bar.x2 - bar.progress_width
    } else {
        bar.x1
    };
}

fn place_milestone(bar: &mut BarGeometry, axis: &TimeAxis) {
    let half = bar.height / 2.0;
    let center = axis.time_to_x(bar.planned.start);
    let actual_center = axis.time_to_x(bar.actual.start);
    bar.x1 = center - half;
    bar.x2 = center + half;
    bar.actual_x1 = actual_center - half;
    bar.actual_x2 = actual_center + half;
    bar.progress_x = bar.x1;
    bar.progress_width = 0.0;
}

/// Geometry for `tasks`, one bar per task in input order.
pub fn build(tasks: &[Task], axis: &TimeAxis, sizing: &Sizing) -> Vec<BarGeometry> {
    let normalized = normalize_all(tasks, !axis.granularity().is_sub_day());
    build_rows(tasks, &normalized, axis, sizing)
}

/// Geometry for `rows` using spans already normalized over the full task set.
pub fn build_rows(
    rows: &[Task],
    normalized: &HashMap<String, NormalizedTask>,
    axis: &TimeAxis,
    sizing: &Sizing,
) -> Vec<BarGeometry> {
    let whole_days = !axis.granularity().is_sub_day();
    let mut bars: Vec<BarGeometry> = rows
        .iter()
        .enumerate()
        .map(|(index, task)| {
            let n = normalized
                .get(&task.id)
                .copied()
                .unwrap_or_else(|| normalize(task, whole_days));
            bar_geometry(index, &task.id, &n, axis, sizing)
        })
        .collect();
    resolve_dependencies(rows, &mut bars);
    bars
}

/// Fill `bar_children`: each predecessor lists the rows that depend on it.
///
/// Unknown and self-referencing dependency ids are dropped.
pub fn resolve_dependencies(rows: &[Task], bars: &mut [BarGeometry]) {
    let index: HashMap<&str, usize> = rows
        .iter()
        .enumerate()
        .map(|(i, t)| (t.id.as_str(), i))
        .collect();

    for (dependent, task) in rows.iter().enumerate() {
        for dep in &task.dependencies {
            match index.get(dep.as_str()) {
                Some(&from) if from != dependent => {
                    let children = &mut bars[from].bar_children;
                    if !children.contains(&dependent) {
                        children.push(dependent);
                    }
                }
                Some(_) => {}
                None => tracing::trace!(task = %task.id, missing = %dep, "dropping dependency"),
            }
        }
    }
}

/// Every (predecessor row, dependent row) pair.
pub fn dependency_edges(bars: &[BarGeometry]) -> Vec<(usize, usize)> {
    bars.iter()
        .flat_map(|bar| bar.bar_children.iter().map(move |&child| (bar.index, child)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::axis::Granularity;
    use chrono::{Duration, NaiveDate};
    use proptest::prelude::*;

    fn day(d: i64) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .expect("valid date")
            + Duration::days(d)
    }

    fn axis(columns: i64, rtl: bool) -> TimeAxis {
        let ticks = (0..=columns).map(day).collect();
        TimeAxis::new(ticks, Granularity::Day, 100.0, rtl)
    }

    fn sizing() -> Sizing {
        Sizing {
            row_height: 40.0,
            bar_fill: 50.0,
            ..Sizing::default()
        }
    }

    #[test]
    fn planned_span_and_progress_fill() {
        let task = Task::new("b", day(0), day(2))
            .with_id("b")
            .with_planned(day(0), day(2))
            .with_progress(50);
        let bars = build(&[task], &axis(4, false), &sizing());
        let bar = &bars[0];
        assert_eq!((bar.x1, bar.x2), (0.0, 200.0));
        assert_eq!(bar.progress_x, 0.0);
        assert_eq!(bar.progress_width, 100.0);
        assert_eq!(bar.y, 10.0);
        assert_eq!(bar.height, 20.0);
    }

    #[test]
    fn rtl_fills_progress_from_the_right() {
        let task = Task::new("b", day(0), day(2)).with_progress(25);
        let bar = &build(&[task], &axis(4, true), &sizing())[0];
        assert_eq!((bar.x1, bar.x2), (200.0, 400.0));
        assert_eq!(bar.progress_width, 50.0);
        assert_eq!(bar.progress_x, 350.0);
    }

    #[test]
    fn actual_interval_is_projected_separately() {
        let task = Task::new("b", day(0), day(2)).with_actual(day(1), day(3));
        let bar = &build(&[task], &axis(4, false), &sizing())[0];
        assert_eq!((bar.x1, bar.x2), (0.0, 200.0));
        assert_eq!((bar.actual_x1, bar.actual_x2), (100.0, 300.0));
    }

    #[test]
    fn single_day_task_covers_the_whole_day() {
        let task = Task::new("d", day(1) + Duration::hours(9), day(1) + Duration::hours(10));
        let bar = &build(&[task], &axis(4, false), &sizing())[0];
        assert_eq!(bar.x1, 100.0);
        assert!(bar.x2 > 199.99 && bar.x2 < 200.0);
    }

    #[test]
    fn sub_day_granularity_keeps_exact_hours() {
        let ticks = (0..=8).map(|i| day(0) + Duration::hours(6 * i)).collect();
        let axis = TimeAxis::new(ticks, Granularity::Shift, 60.0, false);
        let task = Task::new("s", day(0) + Duration::hours(6), day(0) + Duration::hours(9));
        let bar = &build(&[task], &axis, &sizing())[0];
        assert_eq!((bar.x1, bar.x2), (60.0, 90.0));
    }

    #[test]
    fn milestone_is_a_fixed_width_marker() {
        let task = Task::new_milestone("m", day(2)).with_progress(80);
        let bar = &build(&[task], &axis(4, false), &sizing())[0];
        assert_eq!((bar.x1, bar.x2), (190.0, 210.0));
        assert_eq!(bar.progress_width, 0.0);
    }

    #[test]
    fn project_aggregates_children() {
        let project = Task::new_project("p", day(10), day(11)).with_id("p");
        let a = Task::new("a", day(0), day(1)).with_id("a").with_project("p");
        let b = Task::new("b", day(1), day(3)).with_id("b").with_project("p");
        let n = normalize_all(&[project, a, b], true);
        assert_eq!(n["p"].planned, Span::new(day(0), day(3)));
        assert_eq!(n["p"].actual, Span::new(day(0), day(3)));
    }

    #[test]
    fn explicit_planned_survives_while_actual_aggregates() {
        let project = Task::new_project("p", day(10), day(11))
            .with_id("p")
            .with_planned(day(5), day(6));
        let a = Task::new("a", day(0), day(1))
            .with_id("a")
            .with_project("p")
            .with_actual(day(0), day(4));
        let n = normalize_all(&[a, project], true);
        assert_eq!(n["p"].planned, Span::new(day(5), day(6)));
        assert_eq!(n["p"].actual, Span::new(day(0), day(4)));
    }

    #[test]
    fn nested_projects_aggregate_through_levels() {
        let top = Task::new_project("top", day(0), day(0)).with_id("top");
        let mid = Task::new_project("mid", day(0), day(0)).with_id("mid").with_project("top");
        let leaf = Task::new("leaf", day(2), day(6)).with_id("leaf").with_project("mid");
        let n = normalize_all(&[top, mid, leaf], true);
        assert_eq!(n["top"].planned, Span::new(day(2), day(6)));
    }

    #[test]
    fn childless_project_and_cycles_use_own_baseline() {
        let lonely = Task::new_project("l", day(1), day(2)).with_id("l");
        let a = Task::new_project("a", day(3), day(4)).with_id("a").with_project("b");
        let b = Task::new_project("b", day(5), day(6)).with_id("b").with_project("a");
        let own = Task::new_project("o", day(7), day(8)).with_id("o").with_project("o");
        let n = normalize_all(&[lonely, a, b, own], true);
        assert_eq!(n["l"].planned, Span::new(day(1), day(2)));
        assert_eq!(n["o"].planned, Span::new(day(7), day(8)));
        assert!(n.contains_key("a") && n.contains_key("b"));
    }

    #[test]
    fn inverted_dates_do_not_produce_negative_widths() {
        let task = Task::new("x", day(3), day(1));
        let bar = &build(&[task], &axis(4, false), &sizing())[0];
        assert_eq!((bar.x1, bar.x2), (100.0, 300.0));
        assert!(bar.progress_width >= 0.0);
    }

    #[test]
    fn dependencies_resolve_forward_and_drop_unknown_ids() {
        let a = Task::new("a", day(0), day(1)).with_id("a").with_dependencies(["c", "nope", "a"]);
        let b = Task::new("b", day(1), day(2)).with_id("b").with_dependencies(["a"]);
        let c = Task::new("c", day(2), day(3)).with_id("c");
        let bars = build(&[a, b, c], &axis(4, false), &sizing());
        assert_eq!(bars[0].bar_children, vec![1]);
        assert_eq!(bars[2].bar_children, vec![0]);
        assert!(bars[1].bar_children.is_empty());
        assert_eq!(dependency_edges(&bars), vec![(0, 1), (2, 0)]);
    }

    proptest! {
        #[test]
        fn aggregation_matches_children_unless_explicit(
            spans in prop::collection::vec((0i64..40, 0i64..10), 1..6),
            explicit in any::<bool>(),
        ) {
            let mut project = Task::new_project("p", day(100), day(101)).with_id("p");
            if explicit {
                project = project.with_planned(day(50), day(60));
            }
            let mut tasks = vec![project];
            for (i, (start, len)) in spans.iter().enumerate() {
                tasks.push(
                    Task::new("c", day(*start), day(start + len + 1))
                        .with_id(format!("c{i}"))
                        .with_project("p"),
                );
            }
            let n = normalize_all(&tasks, true);
            let expected = if explicit {
                Span::new(day(50), day(60))
            } else {
                let lo = spans.iter().map(|(s, _)| *s).min().unwrap_or(0);
                let hi = spans.iter().map(|(s, l)| s + l + 1).max().unwrap_or(0);
                Span::new(day(lo), day(hi))
            };
            prop_assert_eq!(n["p"].planned, expected);
        }
    }
}
