//! Calendar ↔ pixel mapping.
//!
//! The axis is an ordered, strictly increasing list of tick boundaries. Column
//! `i` spans `ticks[i]..ticks[i + 1]` and is `column_width` pixels wide, so
//! months and quarters of uneven length still get equal-width columns.

use chrono::{Datelike, Duration, Months, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::config::ChartOptions;
use crate::model::task::day_start;
use crate::model::Task;

/// Hours per shift; four shifts make a day.
const SHIFT_HOURS: i64 = 6;

/// Largest offset ever added to a tick, roughly thirty thousand years.
const MAX_OFFSET_MS: f64 = 1.0e15;

/// Width of one column on the time axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Shift,
    #[default]
    Day,
    Week,
    Month,
    Quarter,
    Year,
}

impl Granularity {
    pub const ALL: [Granularity; 6] = [
        Granularity::Shift,
        Granularity::Day,
        Granularity::Week,
        Granularity::Month,
        Granularity::Quarter,
        Granularity::Year,
    ];

    pub fn is_sub_day(self) -> bool {
        matches!(self, Granularity::Shift)
    }

    /// Padding added on each side of the task range, in units.
    pub fn margin_units(self) -> i32 {
        match self {
            Granularity::Shift => 4,
            Granularity::Day => 10,
            Granularity::Week => 2,
            Granularity::Month | Granularity::Quarter | Granularity::Year => 1,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Granularity::Shift => "Shift",
            Granularity::Day => "Day",
            Granularity::Week => "Week",
            Granularity::Month => "Month",
            Granularity::Quarter => "Quarter",
            Granularity::Year => "Year",
        }
    }

    /// Snap `t` down to the start of its unit.
    pub fn floor(self, t: NaiveDateTime) -> NaiveDateTime {
        let date = t.date();
        match self {
            Granularity::Shift => {
                let hour = (i64::from(t.hour()) / SHIFT_HOURS) * SHIFT_HOURS;
                day_start(date) + Duration::hours(hour)
            }
            Granularity::Day => day_start(date),
            Granularity::Week => {
                let back = i64::from(date.weekday().num_days_from_monday());
                day_start(date - Duration::days(back))
            }
            Granularity::Month => day_start(first_of(date, date.month())),
            Granularity::Quarter => {
                let month = ((date.month() - 1) / 3) * 3 + 1;
                day_start(first_of(date, month))
            }
            Granularity::Year => day_start(first_of(date, 1)),
        }
    }

    /// Move `t` by `units` whole units (negative moves backwards).
    ///
    /// Saturates to `t` itself if the result is unrepresentable.
    pub fn shift(self, t: NaiveDateTime, units: i32) -> NaiveDateTime {
        let units64 = i64::from(units);
        let moved = match self {
            Granularity::Shift => t.checked_add_signed(Duration::hours(SHIFT_HOURS * units64)),
            Granularity::Day => t.checked_add_signed(Duration::days(units64)),
            Granularity::Week => t.checked_add_signed(Duration::weeks(units64)),
            Granularity::Month => add_months(t, units),
            Granularity::Quarter => add_months(t, units.saturating_mul(3)),
            Granularity::Year => add_months(t, units.saturating_mul(12)),
        };
        moved.unwrap_or(t)
    }
}

fn first_of(date: NaiveDate, month: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(date.year(), month, 1).unwrap_or(date)
}

fn add_months(t: NaiveDateTime, months: i32) -> Option<NaiveDateTime> {
    let delta = Months::new(months.unsigned_abs());
    if months >= 0 {
        t.checked_add_months(delta)
    } else {
        t.checked_sub_months(delta)
    }
}

/// Padded visible window `[start, end]` for a task set.
///
/// Spans every task's earliest planned start and latest actual/planned end,
/// padded by the granularity margin and snapped to unit boundaries. The window
/// always contains `now` so the today marker is reachable.
pub fn build_range(
    tasks: &[Task],
    granularity: Granularity,
    now: NaiveDateTime,
) -> (NaiveDateTime, NaiveDateTime) {
    let margin = granularity.margin_units();
    let earliest = tasks.iter().map(|t| t.planned_start.unwrap_or(t.start)).min();
    let latest = tasks
        .iter()
        .map(|t| t.actual_end.or(t.planned_end).unwrap_or(t.end))
        .max();

    let (lo, hi) = match (earliest, latest) {
        (Some(lo), Some(hi)) => (lo, hi),
        _ => (now, now),
    };
    let mut start = granularity.shift(granularity.floor(lo), -margin);
    let mut end = granularity.shift(granularity.floor(hi), margin + 1);

    if now < start {
        start = granularity.shift(granularity.floor(now), -margin);
    }
    if now >= end {
        end = granularity.shift(granularity.floor(now), margin + 1);
    }
    if end <= start {
        end = granularity.shift(start, 2 * margin + 1);
    }
    (start, end)
}

/// Tick boundaries from `start` to `end`, one granularity unit apart.
///
/// Always yields at least two ticks when time can advance past `start`.
pub fn seed(start: NaiveDateTime, end: NaiveDateTime, granularity: Granularity) -> Vec<NaiveDateTime> {
    let mut ticks = vec![start];
    let mut current = start;
    while current < end || ticks.len() < 2 {
        let next = granularity.shift(current, 1);
        if next <= current {
            tracing::warn!(%current, ?granularity, "time axis cannot advance, truncating");
            break;
        }
        ticks.push(next);
        current = next;
    }
    ticks
}

/// Pixel offset of `t` on an unmirrored axis.
///
/// Exact at tick boundaries; times before the first tick map to 0 and times at
/// or after the last tick map to the full width.
pub fn time_to_x(t: NaiveDateTime, ticks: &[NaiveDateTime], column_width: f64) -> f64 {
    if ticks.len() < 2 || !(column_width.is_finite() && column_width > 0.0) {
        return 0.0;
    }
    let last = ticks.len() - 1;
    if t < ticks[0] {
        return 0.0;
    }
    if t >= ticks[last] {
        return last as f64 * column_width;
    }
    let i = ticks.partition_point(|tick| *tick <= t) - 1;
    let span = (ticks[i + 1] - ticks[i]).num_milliseconds();
    if span <= 0 {
        return i as f64 * column_width;
    }
    let fraction = (t - ticks[i]).num_milliseconds() as f64 / span as f64;
    (i as f64 + fraction) * column_width
}

/// Time at pixel offset `x` on an unmirrored axis.
///
/// Offsets beyond either end extrapolate along the outermost column.
pub fn x_to_time(x: f64, ticks: &[NaiveDateTime], column_width: f64) -> Option<NaiveDateTime> {
    let first = *ticks.first()?;
    if ticks.len() < 2 || !x.is_finite() || !(column_width.is_finite() && column_width > 0.0) {
        return Some(first);
    }
    let column = (x / column_width).floor().max(0.0);
    let i = (column as usize).min(ticks.len() - 2);
    let fraction = (x - i as f64 * column_width) / column_width;
    let span = (ticks[i + 1] - ticks[i]).num_milliseconds() as f64;
    let offset = (fraction * span).round().clamp(-MAX_OFFSET_MS, MAX_OFFSET_MS) as i64;
    Some(
        ticks[i]
            .checked_add_signed(Duration::milliseconds(offset))
            .unwrap_or(ticks[i]),
    )
}

/// Tick array plus the pixel scale and direction used to draw it.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeAxis {
    ticks: Vec<NaiveDateTime>,
    granularity: Granularity,
    column_width: f64,
    rtl: bool,
}

impl TimeAxis {
    pub fn new(
        ticks: Vec<NaiveDateTime>,
        granularity: Granularity,
        column_width: f64,
        rtl: bool,
    ) -> Self {
        Self {
            ticks,
            granularity,
            column_width,
            rtl,
        }
    }

    /// Axis covering `tasks` (and `now`) at the configured granularity.
    pub fn for_tasks(tasks: &[Task], options: &ChartOptions, now: NaiveDateTime) -> Self {
        let (start, end) = build_range(tasks, options.granularity, now);
        Self::new(
            seed(start, end, options.granularity),
            options.granularity,
            options.sizing.column_width,
            options.rtl,
        )
    }

    pub fn ticks(&self) -> &[NaiveDateTime] {
        &self.ticks
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    pub fn column_width(&self) -> f64 {
        self.column_width
    }

    pub fn is_rtl(&self) -> bool {
        self.rtl
    }

    pub fn column_count(&self) -> usize {
        self.ticks.len().saturating_sub(1)
    }

    pub fn total_width(&self) -> f64 {
        self.column_count() as f64 * self.column_width.max(0.0)
    }

    /// Screen x of `t`, mirrored around the chart width in right-to-left mode.
    pub fn time_to_x(&self, t: NaiveDateTime) -> f64 {
        let x = time_to_x(t, &self.ticks, self.column_width);
        if self.rtl {
            self.total_width() - x
        } else {
            x
        }
    }

    /// Time under screen x; the inverse of [`TimeAxis::time_to_x`].
    pub fn x_to_time(&self, x: f64) -> NaiveDateTime {
        let x = if self.rtl { self.total_width() - x } else { x };
        x_to_time(x, &self.ticks, self.column_width).unwrap_or_default()
    }

    /// Screen x of the current-time marker.
    pub fn today_x(&self, now: NaiveDateTime) -> f64 {
        self.time_to_x(now)
    }
}
