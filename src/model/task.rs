use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use egui::Color32;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What a row represents; each kind has its own geometry strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    #[default]
    Task,
    Milestone,
    Project,
}

/// A single task, milestone, or project row as supplied by the host.
///
/// `planned_*` and `actual_*` default to the `start`/`end` baseline when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub kind: TaskKind,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub planned_start: Option<NaiveDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub planned_end: Option<NaiveDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_start: Option<NaiveDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_end: Option<NaiveDateTime>,
    /// Percent complete, 0–100.
    #[serde(default)]
    pub progress: u8,
    /// Id of the parent project, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    /// Predecessor ids. Only used to draw arrows.
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_order: Option<i32>,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub disabled: bool,
    /// Collapsed project: descendants are not rendered as rows.
    #[serde(default)]
    pub hide_children: bool,
    #[serde(default = "default_color", with = "color_serde")]
    pub color: Color32,
}

fn default_color() -> Color32 {
    Color32::from_rgb(70, 130, 180)
}

impl Task {
    pub fn new(name: impl Into<String>, start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            kind: TaskKind::Task,
            start,
            end,
            planned_start: None,
            planned_end: None,
            actual_start: None,
            actual_end: None,
            progress: 0,
            project: None,
            dependencies: Vec::new(),
            display_order: None,
            hidden: false,
            disabled: false,
            hide_children: false,
            color: default_color(),
        }
    }

    pub fn new_milestone(name: impl Into<String>, at: NaiveDateTime) -> Self {
        Self {
            kind: TaskKind::Milestone,
            color: Color32::from_rgb(255, 165, 0),
            ..Self::new(name, at, at)
        }
    }

    pub fn new_project(name: impl Into<String>, start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self {
            kind: TaskKind::Project,
            color: Color32::from_rgb(96, 110, 140),
            ..Self::new(name, start, end)
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    pub fn with_dependencies<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies = ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_planned(mut self, start: NaiveDateTime, end: NaiveDateTime) -> Self {
        self.planned_start = Some(start);
        self.planned_end = Some(end);
        self
    }

    pub fn with_actual(mut self, start: NaiveDateTime, end: NaiveDateTime) -> Self {
        self.actual_start = Some(start);
        self.actual_end = Some(end);
        self
    }

    pub fn with_progress(mut self, progress: u8) -> Self {
        self.progress = progress.min(100);
        self
    }

    pub fn is_project(&self) -> bool {
        self.kind == TaskKind::Project
    }

    pub fn is_milestone(&self) -> bool {
        self.kind == TaskKind::Milestone
    }

    pub fn has_explicit_planned(&self) -> bool {
        self.planned_start.is_some() && self.planned_end.is_some()
    }

    pub fn has_explicit_actual(&self) -> bool {
        self.actual_start.is_some() && self.actual_end.is_some()
    }

    /// Whole days the task runs late against its planned end.
    ///
    /// Uses the actual end when known, otherwise `now`. Never negative.
    pub fn delay_days(&self, now: NaiveDateTime) -> u32 {
        let planned_end = self.planned_end.unwrap_or(self.end);
        let effective_end = self.actual_end.unwrap_or(now);
        delay_days(planned_end, effective_end)
    }

    /// Direct children of this task within `tasks`.
    pub fn children<'a>(&self, tasks: &'a [Task]) -> Vec<&'a Task> {
        tasks
            .iter()
            .filter(|t| t.id != self.id && t.project.as_deref() == Some(self.id.as_str()))
            .collect()
    }
}

/// Ceiling of whole days from `planned_end` to `effective_end`, zero when on time.
pub fn delay_days(planned_end: NaiveDateTime, effective_end: NaiveDateTime) -> u32 {
    const DAY_MS: i64 = 86_400_000;
    let late_ms = (effective_end - planned_end).num_milliseconds();
    if late_ms <= 0 {
        return 0;
    }
    let days = (late_ms + DAY_MS - 1) / DAY_MS;
    u32::try_from(days).unwrap_or(u32::MAX)
}

/// Midnight at the start of `date`.
pub fn day_start(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

/// Last representable millisecond of `date`.
pub fn day_end(date: NaiveDate) -> NaiveDateTime {
    let last = NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap_or(NaiveTime::MIN);
    date.and_time(last)
}

/// Serde helper for `Color32` stored as `#RRGGBB` / `#RRGGBBAA`.
mod color_serde {
    use egui::Color32;
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(color: &Color32, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let [r, g, b, a] = color.to_array();
        if a == 255 {
            serializer.serialize_str(&format!("#{r:02X}{g:02X}{b:02X}"))
        } else {
            serializer.serialize_str(&format!("#{r:02X}{g:02X}{b:02X}{a:02X}"))
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Color32, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse(&s).map_err(serde::de::Error::custom)
    }

    fn parse(s: &str) -> Result<Color32, String> {
        let hex = s.trim().trim_start_matches('#');
        let channel = |i: usize| {
            hex.get(i..i + 2)
                .and_then(|h| u8::from_str_radix(h, 16).ok())
                .ok_or_else(|| format!("invalid colour '{s}'"))
        };
        match hex.len() {
            6 => Ok(Color32::from_rgb(channel(0)?, channel(2)?, channel(4)?)),
            8 => Ok(Color32::from_rgba_unmultiplied(
                channel(0)?,
                channel(2)?,
                channel(4)?,
                channel(6)?,
            )),
            _ => Err(format!("invalid colour '{s}': expected 6 or 8 hex digits")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, day)
            .and_then(|d| d.and_hms_opt(hour, 0, 0))
            .expect("valid date")
    }

    #[test]
    fn delay_is_zero_when_finished_early_or_on_time() {
        let task = Task::new("t", at(1, 0), at(5, 0)).with_actual(at(1, 0), at(4, 0));
        assert_eq!(task.delay_days(at(20, 0)), 0);

        let on_time = Task::new("t", at(1, 0), at(5, 0)).with_actual(at(1, 0), at(5, 0));
        assert_eq!(on_time.delay_days(at(20, 0)), 0);
    }

    #[test]
    fn delay_rounds_partial_days_up() {
        let task = Task::new("t", at(1, 0), at(5, 0)).with_actual(at(1, 0), at(6, 1));
        assert_eq!(task.delay_days(at(1, 0)), 2);
    }

    #[test]
    fn delay_uses_now_without_actual_end() {
        let task = Task::new("t", at(1, 0), at(5, 0));
        assert_eq!(task.delay_days(at(8, 0)), 3);
        assert_eq!(task.delay_days(at(2, 0)), 0);
    }

    #[test]
    fn children_skip_self_parented_task() {
        let parent = Task::new_project("p", at(1, 0), at(2, 0))
            .with_id("p")
            .with_project("p");
        let child = Task::new("c", at(1, 0), at(2, 0)).with_id("c").with_project("p");
        let tasks = vec![parent.clone(), child];
        let children = parent.children(&tasks);
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].id, "c");
    }

    #[test]
    fn task_json_accepts_missing_optional_fields() {
        let json = r##"{
            "id": "a",
            "name": "Alpha",
            "start": "2024-03-01T00:00:00",
            "end": "2024-03-03T00:00:00",
            "color": "#336699"
        }"##;
        let task: Task = serde_json::from_str(json).expect("parse task");
        assert_eq!(task.kind, TaskKind::Task);
        assert!(task.planned_start.is_none());
        assert_eq!(task.color, Color32::from_rgb(0x33, 0x66, 0x99));
    }
}
