//! Timeline geometry and drag interaction.
//!
//! [`TimelineModel`] is an immutable snapshot of everything the renderer
//! needs for one task set; rebuild it whenever the tasks or options change.

pub mod arrows;
pub mod axis;
pub mod geometry;
pub mod host;
pub mod interaction;
pub mod rows;
pub mod window;

use std::collections::HashMap;

use chrono::NaiveDateTime;

pub use arrows::{arrow_path, ArrowPath};
pub use axis::{Granularity, TimeAxis};
pub use geometry::{BarGeometry, NormalizedTask, Span};
pub use host::{Confirmation, DragComplete, DragOutcome, TaskChange, TimelineEvent, TimelineHost};
pub use interaction::{hit_test, DragHandle, GestureState, Interaction, PendingCommit, Verdict};
pub use window::VirtualWindow;

use crate::config::ChartOptions;
use crate::model::Task;

#[derive(Debug, Clone)]
pub struct TimelineModel {
    all_tasks: Vec<Task>,
    rows: Vec<Task>,
    bars: Vec<BarGeometry>,
    index: HashMap<String, usize>,
    axis: TimeAxis,
    options: ChartOptions,
    now: NaiveDateTime,
}

impl TimelineModel {
    pub fn build(tasks: &[Task], options: &ChartOptions, now: NaiveDateTime) -> Self {
        let rows = rows::visible_rows(tasks);
        let axis = TimeAxis::for_tasks(tasks, options, now);
        let normalized = geometry::normalize_all(tasks, !options.granularity.is_sub_day());
        let bars = geometry::build_rows(&rows, &normalized, &axis, &options.sizing);
        let index = rows
            .iter()
            .enumerate()
            .map(|(i, t)| (t.id.clone(), i))
            .collect();

        tracing::debug!(
            tasks = tasks.len(),
            rows = rows.len(),
            columns = axis.column_count(),
            "timeline rebuilt"
        );

        Self {
            all_tasks: tasks.to_vec(),
            rows,
            bars,
            index,
            axis,
            options: options.clone(),
            now,
        }
    }

    /// Every task the model was built from, hidden ones included.
    pub fn tasks(&self) -> &[Task] {
        &self.all_tasks
    }

    pub fn rows(&self) -> &[Task] {
        &self.rows
    }

    pub fn bars(&self) -> &[BarGeometry] {
        &self.bars
    }

    pub fn axis(&self) -> &TimeAxis {
        &self.axis
    }

    pub fn options(&self) -> &ChartOptions {
        &self.options
    }

    pub fn now(&self) -> NaiveDateTime {
        self.now
    }

    /// Looks in every task, not just visible rows.
    pub fn task(&self, id: &str) -> Option<&Task> {
        match self.row_of(id) {
            Some(i) => self.rows.get(i),
            None => self.all_tasks.iter().find(|t| t.id == id),
        }
    }

    pub fn bar(&self, id: &str) -> Option<&BarGeometry> {
        self.row_of(id).and_then(|i| self.bars.get(i))
    }

    pub fn row_of(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// Direct children of a project, as supplied.
    pub fn children_of(&self, id: &str) -> Vec<Task> {
        self.all_tasks
            .iter()
            .filter(|t| t.id != id && t.project.as_deref() == Some(id))
            .cloned()
            .collect()
    }

    pub fn width(&self) -> f64 {
        self.axis.total_width()
    }

    pub fn height(&self) -> f64 {
        self.rows.len() as f64 * self.options.sizing.row_height
    }

    pub fn today_x(&self) -> f64 {
        self.axis.today_x(self.now)
    }

    /// Rows to draw for the scroll state; `None` draws them all.
    pub fn window(&self, scroll_top: f64, viewport_height: f64) -> Option<VirtualWindow> {
        window::range(
            scroll_top,
            viewport_height,
            self.options.sizing.row_height,
            self.rows.len(),
            self.options.overscan,
            self.options.virtualize_above,
        )
    }

    /// Every dependency edge as (predecessor row, dependent row).
    pub fn edges(&self) -> Vec<(usize, usize)> {
        geometry::dependency_edges(&self.bars)
    }

    /// Edges whose endpoints are both inside `window`.
    pub fn visible_edges(&self, window: Option<&VirtualWindow>) -> Vec<(usize, usize)> {
        self.edges()
            .into_iter()
            .filter(|&(from, to)| window::arrow_visible(window, from, to))
            .collect()
    }

    pub fn arrow(&self, from: usize, to: usize) -> Option<ArrowPath> {
        let from = self.bars.get(from)?;
        let to = self.bars.get(to)?;
        Some(arrow_path(from, to, &self.options.sizing, self.axis.is_rtl()))
    }

    /// Task and handle under the chart-space point (`x`, `y`).
    pub fn hit(&self, x: f64, y: f64) -> Option<(&BarGeometry, DragHandle)> {
        let row_height = self.options.sizing.row_height;
        if y < 0.0 || !(row_height > 0.0) {
            return None;
        }
        let bar = self.bars.get((y / row_height).floor() as usize)?;
        hit_test(bar, x, y, &self.options.sizing, self.axis.is_rtl()).map(|h| (bar, h))
    }

    /// Model with `id` removed. Dangling references are left as they are.
    pub fn without_task(&self, id: &str) -> TimelineModel {
        let tasks: Vec<Task> = self.all_tasks.iter().filter(|t| t.id != id).cloned().collect();
        TimelineModel::build(&tasks, &self.options, self.now)
    }

    /// Model with `task` replacing the stored task of the same id.
    pub fn with_task(&self, task: &Task) -> TimelineModel {
        let tasks: Vec<Task> = self
            .all_tasks
            .iter()
            .map(|t| if t.id == task.id { task.clone() } else { t.clone() })
            .collect();
        TimelineModel::build(&tasks, &self.options, self.now)
    }
}
