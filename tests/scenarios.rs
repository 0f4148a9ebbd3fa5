use std::cell::Cell;

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, NaiveDateTime};

use gantt_timeline::engine::geometry::{self, Span};
use gantt_timeline::engine::{Confirmation, TimeAxis};
use gantt_timeline::{
    ChartOptions, DragComplete, DragHandle, DragOutcome, Granularity, HostError, Interaction,
    Sizing, Task, TaskChange, TimelineHost, TimelineModel,
};

fn day(d: i64) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 6, 3)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .expect("valid date")
        + Duration::days(d)
}

fn three_day_axis() -> TimeAxis {
    TimeAxis::new(vec![day(0), day(1), day(2)], Granularity::Day, 100.0, false)
}

fn options() -> ChartOptions {
    let mut options = ChartOptions::default();
    options.sizing.column_width = 100.0;
    options
}

#[derive(Default)]
struct Host {
    deny_drag: bool,
    fail_confirm: bool,
    confirms: Cell<usize>,
    changes: Vec<TaskChange>,
    completes: Vec<DragComplete>,
}

#[async_trait(?Send)]
impl TimelineHost for Host {
    fn can_drag(&self, _task: &Task, _handle: DragHandle) -> bool {
        !self.deny_drag
    }

    fn on_task_change(&mut self, change: &TaskChange) -> Result<(), HostError> {
        self.changes.push(change.clone());
        Ok(())
    }

    async fn confirm_drag(&self, _task: &Task, _children: &[Task]) -> Confirmation {
        self.confirms.set(self.confirms.get() + 1);
        if self.fail_confirm {
            Err(HostError::Callback("backend refused the write".into()))
        } else {
            Ok(Some(true))
        }
    }

    fn on_drag_complete(&mut self, event: &DragComplete) {
        self.completes.push(event.clone());
    }
}

#[test]
fn axis_maps_ticks_and_midpoints() {
    let axis = three_day_axis();
    assert_eq!(axis.time_to_x(day(1)), 100.0);
    assert_eq!(axis.x_to_time(150.0), day(1) + Duration::hours(12));
}

#[test]
fn planned_bar_with_half_progress() {
    let task = Task::new("build", day(0), day(2))
        .with_planned(day(0), day(2))
        .with_progress(50);
    let axis = TimeAxis::new((0..=4).map(day).collect(), Granularity::Day, 100.0, false);
    let bar = &geometry::build(&[task], &axis, &Sizing::default())[0];
    assert_eq!((bar.x1, bar.x2), (0.0, 200.0));
    assert_eq!(bar.progress_width, 100.0);
}

#[test]
fn project_spans_its_children() {
    let tasks = vec![
        Task::new_project("p", day(5), day(6)).with_id("p"),
        Task::new("a", day(0), day(1)).with_id("a").with_project("p"),
        Task::new("b", day(1), day(3)).with_id("b").with_project("p"),
    ];
    let model = TimelineModel::build(&tasks, &options(), day(0));
    assert_eq!(model.bar("p").expect("project bar").planned, Span::new(day(0), day(3)));
}

#[tokio::test]
async fn denied_resize_changes_nothing() {
    let tasks = vec![Task::new("t", day(0), day(2)).with_id("t")];
    let model = TimelineModel::build(&tasks, &options(), day(0));
    let before = model.bar("t").cloned();
    let mut host = Host {
        deny_drag: true,
        ..Host::default()
    };
    let mut ui = Interaction::new();

    let from = model.axis().time_to_x(day(2));
    let to = model.axis().time_to_x(day(3));
    ui.pointer_down(&model, "t", Some(DragHandle::PlannedEnd), from, &mut host);
    ui.pointer_move(&model, to, &mut host);
    let done = ui.release(&model, to, &mut host).await;

    assert!(done.is_none());
    assert!(host.changes.is_empty());
    assert!(host.completes.is_empty());
    assert_eq!(model.bar("t").cloned(), before);
}

#[tokio::test]
async fn failed_confirmation_reverts_the_move() {
    let original = Task::new("t", day(0), day(2)).with_id("t");
    let model = TimelineModel::build(std::slice::from_ref(&original), &options(), day(0));
    let mut host = Host {
        fail_confirm: true,
        ..Host::default()
    };
    let mut ui = Interaction::new();

    let x = model.axis().time_to_x(day(1));
    ui.pointer_down(&model, "t", Some(DragHandle::Move), x, &mut host);
    ui.pointer_move(&model, x + 100.0, &mut host);
    let done = ui.release(&model, x + 100.0, &mut host).await.expect("settled");

    assert_eq!(host.confirms.get(), 1);
    assert_eq!(done.outcome, DragOutcome::Failure);
    assert_eq!(done.task, original);
    assert_eq!(host.completes.len(), 1);
    assert_eq!(host.completes[0].task, original);
    let rollback = host.changes.last().expect("corrective update");
    assert!(rollback.rollback);
    assert_eq!(rollback.task, original);
    assert!(ui.is_idle());
}
