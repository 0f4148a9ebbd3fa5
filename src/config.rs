//! Chart options and their persistence in the OS config directory.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::engine::axis::Granularity;
use crate::error::StorageError;

/// Pixel sizing of rows, columns and bars.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Sizing {
    pub row_height: f64,
    pub column_width: f64,
    /// Bar height as a percentage of the row height.
    pub bar_fill: f64,
    pub handle_width: f64,
    pub corner_radius: f64,
    pub arrow_indent: f64,
}

impl Default for Sizing {
    fn default() -> Self {
        Self {
            row_height: 50.0,
            column_width: 60.0,
            bar_fill: 60.0,
            handle_width: 8.0,
            corner_radius: 3.0,
            arrow_indent: 20.0,
        }
    }
}

impl Sizing {
    pub fn bar_height(&self) -> f64 {
        (self.row_height * self.bar_fill.clamp(0.0, 100.0) / 100.0).max(0.0)
    }

    /// Top of the bar inside row `index`, centred vertically.
    pub fn bar_top(&self, index: usize) -> f64 {
        index as f64 * self.row_height + (self.row_height - self.bar_height()) / 2.0
    }
}

/// Everything the host can tune about the chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartOptions {
    pub granularity: Granularity,
    pub rtl: bool,
    pub sizing: Sizing,
    /// Round dragged times to this many minutes.
    pub snap_minutes: Option<u32>,
    pub overscan: usize,
    /// Row count at or below which every row is rendered.
    pub virtualize_above: usize,
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            granularity: Granularity::Day,
            rtl: false,
            sizing: Sizing::default(),
            snap_minutes: None,
            overscan: crate::engine::window::DEFAULT_OVERSCAN,
            virtualize_above: crate::engine::window::VIRTUALIZE_THRESHOLD,
        }
    }
}

impl ChartOptions {
    /// Location of the persisted options file.
    pub fn settings_path() -> Result<PathBuf, StorageError> {
        directories::ProjectDirs::from("", "", "GanttTimeline")
            .map(|dirs| dirs.config_dir().join("chart.json"))
            .ok_or(StorageError::NoConfigDir)
    }

    pub fn load(path: &Path) -> Result<Self, StorageError> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Load options, falling back to defaults when missing or malformed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(options) => options,
            Err(StorageError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable chart options");
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), StorageError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let options: ChartOptions =
            serde_json::from_str(r#"{ "rtl": true, "sizing": { "row_height": 30.0 } }"#)
                .expect("parse options");
        assert!(options.rtl);
        assert_eq!(options.sizing.row_height, 30.0);
        assert_eq!(options.sizing.column_width, Sizing::default().column_width);
        assert_eq!(options.granularity, Granularity::Day);
    }

    #[test]
    fn bar_is_centred_in_row() {
        let sizing = Sizing {
            row_height: 40.0,
            bar_fill: 50.0,
            ..Sizing::default()
        };
        assert_eq!(sizing.bar_height(), 20.0);
        assert_eq!(sizing.bar_top(0), 10.0);
        assert_eq!(sizing.bar_top(3), 130.0);
    }

    #[test]
    fn save_then_load_from_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("chart.json");
        let options = ChartOptions {
            granularity: Granularity::Week,
            snap_minutes: Some(30),
            ..ChartOptions::default()
        };
        options.save(&path).expect("save options");
        assert_eq!(ChartOptions::load(&path).expect("load options"), options);
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("chart.json");
        std::fs::write(&path, "{ not json").expect("write file");
        assert_eq!(ChartOptions::load_or_default(&path), ChartOptions::default());
        assert_eq!(
            ChartOptions::load_or_default(&dir.path().join("missing.json")),
            ChartOptions::default()
        );
    }
}
