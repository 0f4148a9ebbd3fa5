use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{Duration, NaiveDateTime};
use futures::executor::block_on;

use gantt_timeline::engine::Confirmation;
use gantt_timeline::{
    ChartOptions, DragComplete, DragHandle, DragOutcome, HostError, Interaction, Project, Task,
    TaskChange, TimelineEvent, TimelineHost, TimelineModel,
};

use crate::ui;

/// Callbacks the chart makes into the application.
///
/// Rejects any drag that would start a task before one of its predecessors
/// has finished; the engine then rolls the bar back.
#[derive(Default)]
pub struct AppHost {
    tasks: Vec<Task>,
    pub live: Option<TaskChange>,
    pub completed: Vec<DragComplete>,
    pub events: Vec<TimelineEvent>,
}

impl AppHost {
    fn sync(&mut self, tasks: &[Task]) {
        self.tasks = tasks.to_vec();
    }

    fn predecessor_end(&self, id: &str) -> Option<NaiveDateTime> {
        self.tasks
            .iter()
            .find(|t| t.id == id)
            .map(|t| t.planned_end.unwrap_or(t.end))
    }
}

#[async_trait(?Send)]
impl TimelineHost for AppHost {
    fn can_drag(&self, task: &Task, handle: DragHandle) -> bool {
        !(task.is_project() && handle == DragHandle::Progress)
    }

    fn on_task_change(&mut self, change: &TaskChange) -> Result<(), HostError> {
        self.live = (!change.rollback).then(|| change.clone());
        Ok(())
    }

    async fn confirm_drag(&self, task: &Task, _children: &[Task]) -> Confirmation {
        let Some(start) = task.planned_start else {
            return Ok(None);
        };
        let blocked = task
            .dependencies
            .iter()
            .filter_map(|id| self.predecessor_end(id))
            .any(|end| end > start);
        Ok(Some(!blocked))
    }

    async fn confirm_delete(&self, task: &Task) -> Result<bool, HostError> {
        Ok(!task.disabled)
    }

    fn on_drag_complete(&mut self, event: &DragComplete) {
        self.live = None;
        self.completed.push(event.clone());
    }

    fn on_event(&mut self, event: &TimelineEvent) {
        self.events.push(event.clone());
    }
}

/// Main application state.
pub struct GanttApp {
    pub project: Project,
    pub options: ChartOptions,
    pub model: TimelineModel,
    pub interaction: Interaction,
    pub host: AppHost,
    pub file_path: PathBuf,
    pub status_message: String,
    dirty: bool,
}

impl GanttApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, file_path: PathBuf) -> Self {
        let options = ChartOptions::settings_path()
            .map(|path| ChartOptions::load_or_default(&path))
            .unwrap_or_default();

        let (project, status_message) = if file_path.exists() {
            match gantt_timeline::io::load_project(&file_path) {
                Ok(project) => (project, "Project loaded".to_string()),
                Err(e) => (Self::sample_project(), format!("Error loading: {e}")),
            }
        } else {
            (Self::sample_project(), "Ready".to_string())
        };

        let model = TimelineModel::build(&project.tasks, &options, now());
        let mut host = AppHost::default();
        host.sync(&project.tasks);

        Self {
            project,
            options,
            model,
            interaction: Interaction::new(),
            host,
            file_path,
            status_message,
            dirty: false,
        }
    }

    /// Generate a sample project for demonstration.
    fn sample_project() -> Project {
        let today = now().date();
        let at = |days: i64| gantt_timeline::model::task::day_start(today + Duration::days(days));
        let mut project = Project::new("Sample Project");

        // ── Phase 1: Planning ───────────────────────────────────────
        let phase1 = Task::new_project("Planning", at(-5), at(8)).with_id("planning");
        let t1 = Task::new("Project Kickoff", at(-5), at(-2))
            .with_id("kickoff")
            .with_project("planning")
            .with_actual(at(-5), at(-1))
            .with_progress(100);
        let t2 = Task::new("Requirements Gathering", at(-1), at(5))
            .with_id("requirements")
            .with_project("planning")
            .with_dependencies(["kickoff"])
            .with_progress(60);
        let m1 = Task::new_milestone("Planning Complete", at(8))
            .with_id("planning-done")
            .with_project("planning")
            .with_dependencies(["requirements"]);

        // ── Phase 2: Execution ──────────────────────────────────────
        let phase2 = Task::new_project("Execution", at(8), at(30)).with_id("execution");
        let t3 = Task::new("UI Design", at(8), at(18))
            .with_id("design")
            .with_project("execution")
            .with_dependencies(["planning-done"]);
        let t4 = Task::new("Backend Development", at(18), at(28))
            .with_id("backend")
            .with_project("execution")
            .with_dependencies(["design"]);
        let m2 = Task::new_milestone("Launch", at(32))
            .with_id("launch")
            .with_dependencies(["backend"]);

        project.tasks = vec![phase1, t1, t2, m1, phase2, t3, t4, m2];
        project
    }

    // --- File operations ---

    pub fn save_project(&mut self) {
        self.project.touch();
        match gantt_timeline::io::save_project(&self.project, &self.file_path) {
            Ok(()) => self.status_message = format!("Saved to {}", self.file_path.display()),
            Err(e) => self.status_message = format!("Error saving: {e}"),
        }
    }

    pub fn reload_project(&mut self) {
        match gantt_timeline::io::load_project(&self.file_path) {
            Ok(project) => {
                self.project = project;
                self.interaction = Interaction::new();
                self.dirty = true;
                self.status_message = "Project loaded".to_string();
            }
            Err(e) => self.status_message = format!("Error loading: {e}"),
        }
    }

    pub fn set_options(&mut self, edit: impl FnOnce(&mut ChartOptions)) {
        edit(&mut self.options);
        self.dirty = true;
        match ChartOptions::settings_path().and_then(|path| self.options.save(&path)) {
            Ok(()) => {}
            Err(e) => tracing::warn!(error = %e, "could not persist chart options"),
        }
    }

    // --- Task operations ---

    pub fn delete_selected(&mut self) {
        let Some(id) = self.interaction.selected().map(str::to_string) else {
            return;
        };
        match block_on(self.interaction.delete(&self.model, &id, &mut self.host)) {
            Some(model) => {
                self.project.remove_task(&id);
                self.host.sync(&self.project.tasks);
                self.model = model;
                self.status_message = "Task deleted".to_string();
            }
            None => self.status_message = "Task is locked".to_string(),
        }
    }

    /// Fold whatever the chart reported this frame into the project.
    fn apply_host_events(&mut self) {
        for done in std::mem::take(&mut self.host.completed) {
            match done.outcome {
                DragOutcome::Success => {
                    self.project.replace_task(&done.task);
                    self.model = self.model.with_task(&done.task);
                    self.host.sync(&self.project.tasks);
                    self.status_message = match done.delay_days {
                        Some(days) if days > 0 => format!("Updated '{}' ({days} days late)", done.task.name),
                        _ => format!("Updated '{}'", done.task.name),
                    };
                }
                DragOutcome::Failure => {
                    self.status_message = failure_message(&done);
                }
            }
        }
        for event in std::mem::take(&mut self.host.events) {
            match event {
                TimelineEvent::ExpanderToggled { task_id, .. } => {
                    self.project.toggle_collapsed(&task_id);
                    self.dirty = true;
                }
                TimelineEvent::DoubleClicked(id) => {
                    if let Some(task) = self.project.task(&id) {
                        self.status_message = format!(
                            "{}: {} → {}",
                            task.name,
                            task.start.format("%Y-%m-%d"),
                            task.end.format("%Y-%m-%d")
                        );
                    }
                }
                TimelineEvent::SelectionChanged { .. }
                | TimelineEvent::Clicked(_)
                | TimelineEvent::Deleted(_) => {}
            }
        }

        if self.dirty && self.interaction.is_idle() {
            self.model = TimelineModel::build(&self.project.tasks, &self.options, now());
            self.host.sync(&self.project.tasks);
            self.dirty = false;
        }
    }
}

fn failure_message(done: &DragComplete) -> String {
    match done.action {
        DragHandle::Progress => format!("Progress change to '{}' was not accepted", done.task.name),
        _ => format!("Change to '{}' was not accepted; restored", done.task.name),
    }
}

const MIN_COLUMN_WIDTH: f64 = 12.0;
const MAX_COLUMN_WIDTH: f64 = 400.0;

fn now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

impl eframe::App for GanttApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        ui::theme::apply_theme(ctx);

        let should_save = ctx.input(|i| i.modifiers.ctrl && i.key_pressed(egui::Key::S));
        let should_delete = ctx.input(|i| i.key_pressed(egui::Key::Delete));
        if should_save {
            self.save_project();
        }
        if should_delete {
            self.delete_selected();
        }

        let zoom = ctx.input(|i| if i.modifiers.ctrl { i.smooth_scroll_delta.y } else { 0.0 });
        if zoom != 0.0 && self.interaction.is_idle() {
            let factor = if zoom > 0.0 { 1.1 } else { 1.0 / 1.1 };
            let width = &mut self.options.sizing.column_width;
            *width = (*width * factor).clamp(MIN_COLUMN_WIDTH, MAX_COLUMN_WIDTH);
            self.dirty = true;
        }

        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            ui::toolbar::show_toolbar(self, ui);
        });

        egui::TopBottomPanel::bottom("status_bar")
            .exact_height(ui::theme::STATUS_BAR_HEIGHT)
            .show(ctx, |ui| {
                let status = match &self.host.live {
                    Some(change) => format!(
                        "{:?} '{}' → {}",
                        change.action,
                        change.task.name,
                        change.task.planned_start.unwrap_or(change.task.start).format("%Y-%m-%d %H:%M")
                    ),
                    None => self.status_message.clone(),
                };
                ui.horizontal_centered(|ui| {
                    ui.label(
                        egui::RichText::new(status)
                            .font(ui::theme::font_status())
                            .color(ui::theme::TEXT_SECONDARY),
                    );
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        ui.label(
                            egui::RichText::new(format!(
                                "Tasks: {} · {}",
                                self.project.tasks.len(),
                                self.options.granularity.label()
                            ))
                            .size(10.5)
                            .color(ui::theme::TEXT_DIM),
                        );
                    });
                });
            });

        let chart_frame = egui::Frame::default()
            .fill(ui::theme::BG_DARK)
            .inner_margin(egui::Margin::ZERO);
        egui::CentralPanel::default().frame(chart_frame).show(ctx, |ui| {
            ui::gantt_chart::show_gantt_chart(&self.model, &mut self.interaction, &mut self.host, ui);
        });

        self.apply_host_events();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rejected(action: DragHandle) -> DragComplete {
        let task = Task::new("Backend Development", now(), now() + Duration::days(2));
        let model = TimelineModel::build(std::slice::from_ref(&task), &ChartOptions::default(), now());
        let geometry = model.bars()[0].clone();
        DragComplete {
            action,
            outcome: DragOutcome::Failure,
            task,
            geometry,
            delay_days: None,
        }
    }

    #[test]
    fn failure_message_follows_the_handle() {
        let progress = failure_message(&rejected(DragHandle::Progress));
        assert!(progress.starts_with("Progress change"));
        let moved = failure_message(&rejected(DragHandle::Move));
        assert!(moved.contains("not accepted"));
        assert!(!moved.contains("predecessors"));
    }
}
