//! Pointer-driven drag/resize state machine.
//!
//! `Idle → Armed → Dragging → Committing → Idle`. Each gesture moves the bar
//! optimistically, then asks the host to confirm; a rejection or failure
//! restores the snapshot taken when dragging began. Commit is split in two so
//! the confirmation can be awaited without borrowing the machine:
//!
//! 1. [`Interaction::pointer_up`] hands out a [`PendingCommit`],
//! 2. [`PendingCommit::confirm`] asks the host,
//! 3. [`Interaction::settle`] applies the verdict.
//!
//! Each armed gesture gets a fresh epoch; a verdict whose epoch no longer
//! matches the machine is dropped, so a superseded gesture never writes.

use chrono::{Duration, NaiveDateTime};

use crate::config::Sizing;
use crate::engine::geometry::{bar_geometry, BarGeometry, NormalizedTask, Span};
use crate::engine::host::{DragComplete, DragOutcome, TaskChange, TimelineEvent, TimelineHost};
use crate::engine::TimelineModel;
use crate::error::HostError;
use crate::model::{Task, TaskKind};

/// The part of a bar a gesture grabbed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DragHandle {
    Move,
    PlannedStart,
    PlannedEnd,
    ActualStart,
    ActualEnd,
    Progress,
}

impl DragHandle {
    /// Milestones only move; everything else exposes every handle.
    pub fn applies_to(self, kind: TaskKind) -> bool {
        kind != TaskKind::Milestone || self == DragHandle::Move
    }

    pub fn edits_dates(self) -> bool {
        self != DragHandle::Progress
    }
}

/// A live drag: the snapshot taken when it started and the optimistic state.
#[derive(Debug, Clone, PartialEq)]
pub struct Gesture {
    pub epoch: u64,
    pub task_id: String,
    pub handle: DragHandle,
    /// Pointer x when the handle was grabbed.
    pub origin_x: f64,
    pub original_task: Task,
    pub original: BarGeometry,
    pub current_task: Task,
    pub current: BarGeometry,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum GestureState {
    #[default]
    Idle,
    Armed {
        epoch: u64,
        task_id: String,
        handle: DragHandle,
        origin_x: f64,
    },
    Dragging(Box<Gesture>),
    Committing {
        epoch: u64,
        task_id: String,
    },
}

/// How the host answered a confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Accepted,
    Rejected,
    Failed(HostError),
}

/// A released gesture awaiting the host's verdict.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingCommit {
    pub epoch: u64,
    pub handle: DragHandle,
    pub original_task: Task,
    pub original: BarGeometry,
    pub candidate_task: Task,
    pub candidate: BarGeometry,
    /// Direct children when the dragged task is a project.
    pub children: Vec<Task>,
}

impl PendingCommit {
    /// Ask the host; progress edits use the progress confirmation.
    pub async fn confirm<H: TimelineHost + ?Sized>(&self, host: &H) -> Verdict {
        let answer = match self.handle {
            DragHandle::Progress => {
                host.confirm_progress(&self.candidate_task, &self.children)
                    .await
            }
            _ => host.confirm_drag(&self.candidate_task, &self.children).await,
        };
        match answer {
            Ok(None) | Ok(Some(true)) => Verdict::Accepted,
            Ok(Some(false)) => Verdict::Rejected,
            Err(e) => Verdict::Failed(e),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct DeferredDown {
    task_id: String,
    handle: DragHandle,
    x: f64,
}

/// Single owner of the current gesture, selection and hover.
#[derive(Debug, Default)]
pub struct Interaction {
    state: GestureState,
    epoch: u64,
    deferred: Option<DeferredDown>,
    selected: Option<String>,
    hovered: Option<String>,
}

impl Interaction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &GestureState {
        &self.state
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.state, GestureState::Idle)
    }

    pub fn gesture(&self) -> Option<&Gesture> {
        match &self.state {
            GestureState::Dragging(g) => Some(g),
            _ => None,
        }
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn hovered(&self) -> Option<&str> {
        self.hovered.as_deref()
    }

    // ── Pointer ─────────────────────────────────────────────────

    /// Pointer pressed on a task. Selects it, and arms a drag when `handle` is
    /// given and the host allows it. Returns whether a drag was armed.
    pub fn pointer_down<H: TimelineHost + ?Sized>(
        &mut self,
        model: &TimelineModel,
        task_id: &str,
        handle: Option<DragHandle>,
        x: f64,
        host: &mut H,
    ) -> bool {
        match &self.state {
            GestureState::Committing { .. } => {
                if let Some(handle) = handle {
                    self.deferred = Some(DeferredDown {
                        task_id: task_id.to_string(),
                        handle,
                        x,
                    });
                }
                self.select(Some(task_id), host);
                return false;
            }
            GestureState::Dragging(g) => {
                tracing::debug!(task = %g.task_id, "pointer down while dragging ignored");
                return false;
            }
            GestureState::Idle | GestureState::Armed { .. } => {}
        }

        self.state = GestureState::Idle;
        self.select(Some(task_id), host);
        match handle {
            Some(handle) => self.arm(model, task_id, handle, x, &*host),
            None => false,
        }
    }

    fn arm<H: TimelineHost + ?Sized>(
        &mut self,
        model: &TimelineModel,
        task_id: &str,
        handle: DragHandle,
        x: f64,
        host: &H,
    ) -> bool {
        let Some(task) = model.task(task_id) else {
            return false;
        };
        if task.disabled || !handle.applies_to(task.kind) {
            return false;
        }
        if !host.can_drag(task, handle) {
            tracing::debug!(task = %task_id, ?handle, "drag not permitted");
            return false;
        }
        self.epoch += 1;
        self.state = GestureState::Armed {
            epoch: self.epoch,
            task_id: task_id.to_string(),
            handle,
            origin_x: x,
        };
        true
    }

    /// Pointer moved. The first move after arming snapshots the bar; every
    /// move that changes the candidate pushes an in-flight update to the host.
    /// Returns whether the candidate changed.
    pub fn pointer_move<H: TimelineHost + ?Sized>(
        &mut self,
        model: &TimelineModel,
        x: f64,
        host: &mut H,
    ) -> bool {
        if let GestureState::Armed {
            epoch,
            task_id,
            handle,
            origin_x,
        } = &self.state
        {
            let (epoch, handle, origin_x) = (*epoch, *handle, *origin_x);
            let task_id = task_id.clone();
            match (model.task(&task_id), model.bar(&task_id)) {
                (Some(task), Some(bar)) => {
                    self.state = GestureState::Dragging(Box::new(Gesture {
                        epoch,
                        task_id,
                        handle,
                        origin_x,
                        original_task: task.clone(),
                        original: bar.clone(),
                        current_task: task.clone(),
                        current: bar.clone(),
                    }));
                }
                _ => {
                    tracing::debug!(task = %task_id, "armed task vanished from the chart");
                    self.state = GestureState::Idle;
                    return false;
                }
            }
        }

        let GestureState::Dragging(gesture) = &mut self.state else {
            return false;
        };
        let (task, bar) = candidate(gesture, model, x);
        if task == gesture.current_task {
            return false;
        }
        gesture.current_task = task;
        gesture.current = bar;

        let change = TaskChange {
            action: gesture.handle,
            task: gesture.current_task.clone(),
            geometry: gesture.current.clone(),
            rollback: false,
        };
        if let Err(e) = host.on_task_change(&change) {
            tracing::warn!(task = %change.task.id, error = %e, "in-flight update failed");
        }
        true
    }

    /// Pointer released. Recomputes the final candidate from `x`; returns the
    /// commit to confirm, or `None` when nothing changed.
    pub fn pointer_up(&mut self, model: &TimelineModel, x: f64) -> Option<PendingCommit> {
        match std::mem::take(&mut self.state) {
            GestureState::Dragging(gesture) => {
                let (candidate_task, candidate) = candidate(&gesture, model, x);
                if candidate_task == gesture.original_task {
                    return None;
                }
                let children = if gesture.original_task.is_project() {
                    model.children_of(&gesture.task_id)
                } else {
                    Vec::new()
                };
                self.state = GestureState::Committing {
                    epoch: gesture.epoch,
                    task_id: gesture.task_id.clone(),
                };
                let Gesture {
                    epoch,
                    handle,
                    original_task,
                    original,
                    ..
                } = *gesture;
                Some(PendingCommit {
                    epoch,
                    handle,
                    original_task,
                    original,
                    candidate_task,
                    candidate,
                    children,
                })
            }
            GestureState::Armed { .. } => None,
            other => {
                self.state = other;
                None
            }
        }
    }

    /// Apply the host's verdict and return to idle.
    ///
    /// Accepted candidates stand; anything else re-issues the original as a
    /// corrective update. A verdict for a superseded gesture is ignored.
    pub fn settle<H: TimelineHost + ?Sized>(
        &mut self,
        model: &TimelineModel,
        pending: PendingCommit,
        verdict: Verdict,
        host: &mut H,
    ) -> Option<DragComplete> {
        match &self.state {
            GestureState::Committing { epoch, .. } if *epoch == pending.epoch => {}
            _ => {
                tracing::debug!(epoch = pending.epoch, "verdict for superseded gesture ignored");
                return None;
            }
        }

        let (outcome, task, geometry) = match verdict {
            Verdict::Accepted => (DragOutcome::Success, pending.candidate_task, pending.candidate),
            Verdict::Rejected | Verdict::Failed(_) => {
                match &verdict {
                    Verdict::Failed(e) => {
                        tracing::warn!(task = %pending.original_task.id, error = %e, "confirmation failed, rolling back")
                    }
                    _ => tracing::warn!(task = %pending.original_task.id, "confirmation rejected, rolling back"),
                }
                let change = TaskChange {
                    action: pending.handle,
                    task: pending.original_task.clone(),
                    geometry: pending.original.clone(),
                    rollback: true,
                };
                if let Err(e) = host.on_task_change(&change) {
                    tracing::warn!(task = %change.task.id, error = %e, "rollback update failed");
                }
                (DragOutcome::Failure, pending.original_task, pending.original)
            }
        };

        let delay_days = pending
            .handle
            .edits_dates()
            .then(|| task.delay_days(model.now()));
        let event = DragComplete {
            action: pending.handle,
            outcome,
            task,
            geometry,
            delay_days,
        };
        host.on_drag_complete(&event);

        self.state = GestureState::Idle;
        if let Some(down) = self.deferred.take() {
            self.arm(model, &down.task_id, down.handle, down.x, &*host);
        }
        Some(event)
    }

    /// Release, confirm and settle in one step.
    pub async fn release<H: TimelineHost + ?Sized>(
        &mut self,
        model: &TimelineModel,
        x: f64,
        host: &mut H,
    ) -> Option<DragComplete> {
        let pending = self.pointer_up(model, x)?;
        let verdict = pending.confirm(&*host).await;
        self.settle(model, pending, verdict, host)
    }

    // ── Hover ───────────────────────────────────────────────────

    /// Hover tracking; ignored while a gesture is armed, running or committing.
    pub fn pointer_enter(&mut self, task_id: &str) {
        if self.gesture_active() {
            return;
        }
        self.hovered = Some(task_id.to_string());
    }

    pub fn pointer_leave(&mut self, task_id: &str) {
        if self.gesture_active() {
            return;
        }
        if self.hovered.as_deref() == Some(task_id) {
            self.hovered = None;
        }
    }

    fn gesture_active(&self) -> bool {
        matches!(
            self.state,
            GestureState::Armed { .. }
                | GestureState::Dragging(_)
                | GestureState::Committing { .. }
        )
    }

    // ── Pass-through notifications ──────────────────────────────

    pub fn select<H: TimelineHost + ?Sized>(&mut self, task_id: Option<&str>, host: &mut H) {
        if self.selected.as_deref() == task_id {
            return;
        }
        let previous = std::mem::replace(&mut self.selected, task_id.map(str::to_string));
        host.on_event(&TimelineEvent::SelectionChanged {
            previous,
            current: self.selected.clone(),
        });
    }

    pub fn click<H: TimelineHost + ?Sized>(&mut self, task_id: &str, host: &mut H) {
        host.on_event(&TimelineEvent::Clicked(task_id.to_string()));
    }

    pub fn double_click<H: TimelineHost + ?Sized>(&mut self, task_id: &str, host: &mut H) {
        host.on_event(&TimelineEvent::DoubleClicked(task_id.to_string()));
    }

    /// Ask the host to collapse or expand a project's children.
    pub fn toggle_expander<H: TimelineHost + ?Sized>(
        &mut self,
        model: &TimelineModel,
        task_id: &str,
        host: &mut H,
    ) {
        if let Some(task) = model.task(task_id).filter(|t| t.is_project()) {
            host.on_event(&TimelineEvent::ExpanderToggled {
                task_id: task.id.clone(),
                collapsed: !task.hide_children,
            });
        }
    }

    // ── Keyboard ────────────────────────────────────────────────

    /// Delete a task after host confirmation, abandoning any gesture.
    ///
    /// Returns the rebuilt render model when the deletion went ahead.
    pub async fn delete<H: TimelineHost + ?Sized>(
        &mut self,
        model: &TimelineModel,
        task_id: &str,
        host: &mut H,
    ) -> Option<TimelineModel> {
        let task = model.task(task_id)?.clone();
        if !self.is_idle() {
            tracing::debug!(task = %task_id, "delete abandons the current gesture");
        }
        self.state = GestureState::Idle;
        self.deferred = None;
        self.epoch += 1;

        match host.confirm_delete(&task).await {
            Ok(true) => {
                if self.selected.as_deref() == Some(task_id) {
                    self.select(None, host);
                }
                if self.hovered.as_deref() == Some(task_id) {
                    self.hovered = None;
                }
                host.on_event(&TimelineEvent::Deleted(task.id.clone()));
                Some(model.without_task(task_id))
            }
            Ok(false) => None,
            Err(e) => {
                tracing::warn!(task = %task_id, error = %e, "delete confirmation failed");
                None
            }
        }
    }
}

/// Candidate task and bar for the gesture with the pointer at `x`.
fn candidate(gesture: &Gesture, model: &TimelineModel, x: f64) -> (Task, BarGeometry) {
    let axis = model.axis();
    let snap = model.options().snap_minutes;
    let original = &gesture.original;
    let dx = x - gesture.origin_x;
    // A pointer back at its origin leaves every edge where it was.
    let shifted = |t: NaiveDateTime| {
        if dx == 0.0 {
            t
        } else {
            snap_to(axis.x_to_time(axis.time_to_x(t) + dx), snap)
        }
    };

    let mut planned = original.planned;
    let mut actual = original.actual;
    let mut progress = original.progress;
    match gesture.handle {
        DragHandle::Move => {
            planned = Span {
                start: shifted(original.planned.start),
                end: shifted(original.planned.end),
            };
        }
        DragHandle::PlannedStart => {
            planned.start = shifted(original.planned.start).min(original.planned.end)
        }
        DragHandle::PlannedEnd => {
            planned.end = shifted(original.planned.end).max(original.planned.start)
        }
        DragHandle::ActualStart => {
            actual.start = shifted(original.actual.start).min(original.actual.end)
        }
        DragHandle::ActualEnd => {
            actual.end = shifted(original.actual.end).max(original.actual.start)
        }
        DragHandle::Progress => progress = progress_at(original, x, axis.is_rtl()),
    }

    let mut task = gesture.original_task.clone();
    if planned != original.planned {
        task.planned_start = Some(planned.start);
        task.planned_end = Some(planned.end);
    }
    if actual != original.actual {
        task.actual_start = Some(actual.start);
        task.actual_end = Some(actual.end);
    }
    if progress != original.progress {
        task.progress = progress;
    }

    let normalized = NormalizedTask {
        kind: original.kind,
        planned,
        actual,
        progress,
    };
    let mut bar = bar_geometry(original.index, &task.id, &normalized, axis, &model.options().sizing);
    bar.bar_children = original.bar_children.clone();
    (task, bar)
}

/// Progress percent for a pointer at `x` over the bar's planned interval.
///
/// Always within `0..=100`.
pub fn progress_at(bar: &BarGeometry, x: f64, rtl: bool) -> u8 {
    let width = bar.x2 - bar.x1;
    if !(width > 0.0) {
        return bar.progress.min(100);
    }
    let fraction = if rtl {
        (bar.x2 - x) / width
    } else {
        (x - bar.x1) / width
    };
    let percent = (fraction * 100.0).round();
    if percent.is_nan() {
        return 0;
    }
    percent.clamp(0.0, 100.0) as u8
}

fn snap_to(t: NaiveDateTime, minutes: Option<u32>) -> NaiveDateTime {
    let Some(step) = minutes.filter(|m| *m > 0).map(|m| i64::from(m) * 60_000) else {
        return t;
    };
    let ms = t.and_utc().timestamp_millis();
    let snapped = ((ms as f64 / step as f64).round() as i64).saturating_mul(step);
    t.checked_add_signed(Duration::milliseconds(snapped - ms))
        .unwrap_or(t)
}

/// Which handle, if any, sits under (`x`, `y`) on `bar`.
///
/// Edges win over the progress knob, which wins over the body. The actual
/// interval is grabbed from the strip along the bottom quarter of the bar.
pub fn hit_test(bar: &BarGeometry, x: f64, y: f64, sizing: &Sizing, rtl: bool) -> Option<DragHandle> {
    if y < bar.y || y > bar.y + bar.height {
        return None;
    }
    if bar.kind == TaskKind::Milestone {
        return (bar.x1..=bar.x2).contains(&x).then_some(DragHandle::Move);
    }

    let reach = sizing.handle_width;
    let near = |edge: f64| (x - edge).abs() <= reach / 2.0;
    let (leading, trailing) = if rtl {
        (DragHandle::PlannedEnd, DragHandle::PlannedStart)
    } else {
        (DragHandle::PlannedStart, DragHandle::PlannedEnd)
    };

    if y >= bar.y + bar.height * 0.75 {
        let (actual_leading, actual_trailing) = if rtl {
            (DragHandle::ActualEnd, DragHandle::ActualStart)
        } else {
            (DragHandle::ActualStart, DragHandle::ActualEnd)
        };
        if near(bar.actual_x1) {
            return Some(actual_leading);
        }
        if near(bar.actual_x2) {
            return Some(actual_trailing);
        }
    }

    if !(bar.x1..=bar.x2).contains(&x) {
        return None;
    }
    if x <= bar.x1 + reach {
        return Some(leading);
    }
    if x >= bar.x2 - reach {
        return Some(trailing);
    }
    if near(bar.progress_edge(rtl)) {
        return Some(DragHandle::Progress);
    }
    Some(DragHandle::Move)
}
