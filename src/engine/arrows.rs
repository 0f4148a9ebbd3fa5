//! Dependency arrow paths between bars.

use crate::config::Sizing;
use crate::engine::geometry::BarGeometry;

/// Length of the arrow head along the path.
const HEAD_SIZE: f64 = 5.0;

/// Polyline from a predecessor's trailing edge to a dependent's leading edge.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrowPath {
    pub points: Vec<(f64, f64)>,
    /// Tip first, then the two base corners.
    pub head: [(f64, f64); 3],
}

/// Route an arrow from `from` to `to`.
///
/// The path leaves the predecessor horizontally by `arrow_indent`, drops half
/// a row towards the dependent, doubles back if the dependent starts before
/// the predecessor ends, and enters the dependent at mid-height.
pub fn arrow_path(from: &BarGeometry, to: &BarGeometry, sizing: &Sizing, rtl: bool) -> ArrowPath {
    // Mirror into a left-to-right frame, route, then mirror back.
    let dir = if rtl { -1.0 } else { 1.0 };
    let (from_exit, to_entry) = if rtl {
        (-from.x1, -to.x2)
    } else {
        (from.x2, to.x1)
    };
    let indent = sizing.arrow_indent;
    let from_y = from.y + from.height / 2.0;
    let to_y = to.y + to.height / 2.0;
    let down = if from.index > to.index { -1.0 } else { 1.0 };
    let lane_y = from_y + down * sizing.row_height / 2.0;

    let mut points = vec![(from_exit, from_y), (from_exit + indent, from_y), (from_exit + indent, lane_y)];
    if from_exit + indent * 2.0 >= to_entry {
        points.push((to_entry - indent, lane_y));
        points.push((to_entry - indent, to_y));
    } else {
        points.push((from_exit + indent, to_y));
    }
    points.push((to_entry, to_y));

    let head = [
        (to_entry, to_y),
        (to_entry - HEAD_SIZE, to_y - HEAD_SIZE),
        (to_entry - HEAD_SIZE, to_y + HEAD_SIZE),
    ];

    let flip = |(x, y): (f64, f64)| (x * dir, y);
    ArrowPath {
        points: points.into_iter().map(flip).collect(),
        head: head.map(flip),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::geometry::Span;
    use crate::model::TaskKind;
    use chrono::NaiveDate;

    fn bar(index: usize, x1: f64, x2: f64) -> BarGeometry {
        let t = NaiveDate::from_ymd_opt(2024, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .expect("valid date");
        let sizing = Sizing::default();
        BarGeometry {
            index,
            task_id: index.to_string(),
            kind: TaskKind::Task,
            planned: Span::new(t, t),
            actual: Span::new(t, t),
            progress: 0,
            x1,
            x2,
            actual_x1: x1,
            actual_x2: x2,
            y: sizing.bar_top(index),
            height: sizing.bar_height(),
            progress_x: x1,
            progress_width: 0.0,
            bar_children: Vec::new(),
        }
    }

    #[test]
    fn straight_route_when_dependent_starts_later() {
        let sizing = Sizing::default();
        let path = arrow_path(&bar(0, 0.0, 100.0), &bar(1, 200.0, 300.0), &sizing, false);
        assert_eq!(path.points.first(), Some(&(100.0, 25.0)));
        assert_eq!(path.points.last(), Some(&(200.0, 75.0)));
        assert_eq!(path.points.len(), 5);
        assert_eq!(path.head[0], (200.0, 75.0));
    }

    #[test]
    fn doubles_back_when_dependent_overlaps() {
        let sizing = Sizing::default();
        let path = arrow_path(&bar(0, 0.0, 100.0), &bar(1, 50.0, 300.0), &sizing, false);
        assert_eq!(path.points.len(), 6);
        assert_eq!(path.points[3], (30.0, 50.0));
        assert_eq!(path.points.last(), Some(&(50.0, 75.0)));
    }

    #[test]
    fn rtl_enters_dependent_from_the_right() {
        let sizing = Sizing::default();
        let path = arrow_path(&bar(0, 400.0, 500.0), &bar(1, 100.0, 300.0), &sizing, true);
        assert_eq!(path.points.first(), Some(&(400.0, 25.0)));
        assert_eq!(path.points.last(), Some(&(300.0, 75.0)));
        assert_eq!(path.head[1].0, 305.0);
    }
}
