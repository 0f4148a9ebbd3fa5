//! The seam between the engine and the application that owns the tasks.

use async_trait::async_trait;

use crate::engine::geometry::BarGeometry;
use crate::engine::interaction::DragHandle;
use crate::error::HostError;
use crate::model::Task;

/// Answer from a drag or progress confirmation.
///
/// `Ok(None)` means the host expressed no opinion and counts as acceptance.
pub type Confirmation = Result<Option<bool>, HostError>;

/// Live geometry pushed to the host while a gesture runs, and the corrective
/// update issued on rollback.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskChange {
    pub action: DragHandle,
    pub task: Task,
    pub geometry: BarGeometry,
    pub rollback: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragOutcome {
    Success,
    Failure,
}

/// Final word on a gesture: the accepted candidate or the restored original.
#[derive(Debug, Clone, PartialEq)]
pub struct DragComplete {
    pub action: DragHandle,
    pub outcome: DragOutcome,
    pub task: Task,
    pub geometry: BarGeometry,
    /// Days late after the change; absent for progress edits.
    pub delay_days: Option<u32>,
}

/// Notifications the engine passes through without keeping state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimelineEvent {
    SelectionChanged {
        previous: Option<String>,
        current: Option<String>,
    },
    Clicked(String),
    DoubleClicked(String),
    ExpanderToggled {
        task_id: String,
        collapsed: bool,
    },
    Deleted(String),
}

/// Callbacks supplied by the application. Every method has a permissive default.
///
/// The engine is single-threaded, so futures need not be `Send`.
#[async_trait(?Send)]
pub trait TimelineHost {
    /// Whether `handle` may be dragged on `task`. Not consulted for selection.
    fn can_drag(&self, _task: &Task, _handle: DragHandle) -> bool {
        true
    }

    /// Fire-and-forget: errors are logged and never abort the gesture.
    fn on_task_change(&mut self, _change: &TaskChange) -> Result<(), HostError> {
        Ok(())
    }

    async fn confirm_drag(&self, _task: &Task, _children: &[Task]) -> Confirmation {
        Ok(None)
    }

    async fn confirm_progress(&self, _task: &Task, _children: &[Task]) -> Confirmation {
        Ok(None)
    }

    async fn confirm_delete(&self, _task: &Task) -> Result<bool, HostError> {
        Ok(true)
    }

    fn on_drag_complete(&mut self, _event: &DragComplete) {}

    fn on_event(&mut self, _event: &TimelineEvent) {}
}
