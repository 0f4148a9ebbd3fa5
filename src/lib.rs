//! Gantt timeline engine: calendar ↔ pixel geometry for task bars, dependency
//! arrows and row virtualization, plus the pointer state machine that drags
//! bars and asks the host to confirm each change.

pub mod config;
pub mod engine;
pub mod error;
pub mod io;
pub mod model;

pub use config::{ChartOptions, Sizing};
pub use engine::{
    DragComplete, DragHandle, DragOutcome, Granularity, Interaction, TaskChange, TimelineEvent,
    TimelineHost, TimelineModel,
};
pub use error::{HostError, StorageError};
pub use model::{Project, Task, TaskKind};
