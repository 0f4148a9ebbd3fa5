//! Row virtualization.

use std::ops::RangeInclusive;

/// Extra rows rendered above and below the viewport.
pub const DEFAULT_OVERSCAN: usize = 5;

/// Row count at or below which windowing is skipped.
pub const VIRTUALIZE_THRESHOLD: usize = 100;

/// Contiguous slice of rows the renderer must draw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VirtualWindow {
    pub start_index: usize,
    pub end_index: usize,
    /// Vertical offset of `start_index` in pixels.
    pub offset_y: f64,
}

impl VirtualWindow {
    pub fn contains(&self, index: usize) -> bool {
        (self.start_index..=self.end_index).contains(&index)
    }

    pub fn rows(&self) -> RangeInclusive<usize> {
        self.start_index..=self.end_index
    }

    /// Number of rows in the window; never zero.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.end_index - self.start_index + 1
    }
}

/// Whether an arrow between two rows may be drawn.
///
/// Arrows with either endpoint outside the window are suppressed entirely.
pub fn arrow_visible(window: Option<&VirtualWindow>, from: usize, to: usize) -> bool {
    window.map_or(true, |w| w.contains(from) && w.contains(to))
}

/// Visible row range for the given scroll state.
///
/// `None` means render every row: the list is at or below `threshold`, or the
/// viewport size is unknown.
pub fn range(
    scroll_top: f64,
    viewport_height: f64,
    row_height: f64,
    total_count: usize,
    overscan: usize,
    threshold: usize,
) -> Option<VirtualWindow> {
    if total_count <= threshold || total_count == 0 {
        return None;
    }
    if !(viewport_height.is_finite() && viewport_height > 0.0) {
        return None;
    }
    if !(row_height.is_finite() && row_height > 0.0) {
        return None;
    }

    let scroll_top = if scroll_top.is_finite() { scroll_top.max(0.0) } else { 0.0 };
    let first_visible = (scroll_top / row_height).floor() as usize;
    let visible_count = ((viewport_height / row_height).ceil() as usize).max(1);

    // Overscrolling past the last row still leaves a full viewport of rows.
    let latest_start = total_count.saturating_sub(visible_count.min(total_count));
    let start_index = first_visible.saturating_sub(overscan).min(latest_start);
    let end_index = (total_count - 1).min(
        start_index
            .saturating_add(visible_count)
            .saturating_add(overscan.saturating_mul(2)),
    );

    Some(VirtualWindow {
        start_index,
        end_index,
        offset_y: start_index as f64 * row_height,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn small_lists_render_everything() {
        assert_eq!(range(0.0, 500.0, 50.0, 100, 5, 100), None);
        assert_eq!(range(0.0, 0.0, 50.0, 1_000, 5, 100), None);
    }

    #[test]
    fn window_includes_overscan_on_both_sides() {
        let w = range(1_000.0, 500.0, 50.0, 1_000, 5, 100).expect("windowed");
        assert_eq!(w.start_index, 15);
        assert_eq!(w.end_index, 35);
        assert_eq!(w.offset_y, 750.0);
        assert!(w.contains(20));
        assert!(!w.contains(36));
    }

    #[test]
    fn window_clamps_at_top_and_bottom() {
        let top = range(0.0, 500.0, 50.0, 200, 5, 100).expect("windowed");
        assert_eq!((top.start_index, top.end_index), (0, 20));

        let bottom = range(1.0e9, 500.0, 50.0, 200, 5, 100).expect("windowed");
        assert_eq!(bottom.end_index, 199);
        assert!(bottom.len() >= 10);
    }

    #[test]
    fn arrows_need_both_endpoints_visible() {
        let w = VirtualWindow {
            start_index: 10,
            end_index: 20,
            offset_y: 0.0,
        };
        assert!(arrow_visible(Some(&w), 12, 18));
        assert!(!arrow_visible(Some(&w), 5, 18));
        assert!(!arrow_visible(Some(&w), 12, 25));
        assert!(arrow_visible(None, 0, 999));
    }

    proptest! {
        #[test]
        fn window_bounds_hold(
            scroll_top in 0.0f64..100_000.0,
            viewport in 1.0f64..2_000.0,
            row_height in 5.0f64..100.0,
            total in 0usize..3_000,
            overscan in 0usize..10,
        ) {
            let result = range(scroll_top, viewport, row_height, total, overscan, VIRTUALIZE_THRESHOLD);
            if total <= VIRTUALIZE_THRESHOLD {
                prop_assert!(result.is_none());
            } else {
                let w = result.expect("windowed");
                prop_assert!(w.start_index <= w.end_index);
                prop_assert!(w.end_index <= total - 1);
                let visible = (viewport / row_height).ceil() as usize;
                if visible <= total {
                    prop_assert!(w.end_index - w.start_index + 1 >= visible);
                }
            }
        }
    }
}
