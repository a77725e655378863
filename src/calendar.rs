//! Month calendar grid for heat-map rendering.
//!
//! A grid is a flat list of cells read in rows of [`WEEK_LEN`]. The first
//! row is left-padded so day 1 sits under its weekday, and the last row is
//! right-padded so every row is complete.

use core::fmt;
use core::str::FromStr;
use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::DailyAggregate;

/// Number of columns in a calendar grid.
pub const WEEK_LEN: usize = 7;

/// Which weekday occupies the first column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WeekStart {
    /// Sunday-first weeks.
    #[default]
    Sunday,
    /// Monday-first (ISO) weeks.
    Monday,
}

impl WeekStart {
    /// Column index of `date` in a week starting on `self`.
    fn column(self, date: NaiveDate) -> usize {
        let weekday = date.weekday();
        let index = match self {
            Self::Sunday => weekday.num_days_from_sunday(),
            Self::Monday => weekday.num_days_from_monday(),
        };
        index as usize
    }

    /// Column headers, two letters each.
    #[inline]
    #[must_use]
    pub const fn headers(self) -> [&'static str; WEEK_LEN] {
        match self {
            Self::Sunday => ["Su", "Mo", "Tu", "We", "Th", "Fr", "Sa"],
            Self::Monday => ["Mo", "Tu", "We", "Th", "Fr", "Sa", "Su"],
        }
    }
}

impl FromStr for WeekStart {
    type Err = String;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sunday" | "sun" => Ok(Self::Sunday),
            "monday" | "mon" => Ok(Self::Monday),
            other => Err(format!("unknown week start {other:?} (expected sunday or monday)")),
        }
    }
}

/// A calendar month, used for navigation between grids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    /// Calendar year.
    year: i32,
    /// Month number, 1 through 12.
    month: u32,
}

impl YearMonth {
    /// Creates a month, or `None` if the month number or year is out of
    /// range.
    #[inline]
    #[must_use]
    pub fn new(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(|_| Self { year, month })
    }

    /// The month containing `date`.
    #[inline]
    #[must_use]
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Calendar year.
    #[inline]
    #[must_use]
    pub const fn year(self) -> i32 {
        self.year
    }

    /// Month number, 1 through 12.
    #[inline]
    #[must_use]
    pub const fn month(self) -> u32 {
        self.month
    }

    /// The following month.
    #[inline]
    #[must_use]
    pub fn next(self) -> Option<Self> {
        if self.month == 12 {
            Self::new(self.year.checked_add(1)?, 1)
        } else {
            Self::new(self.year, self.month + 1)
        }
    }

    /// The preceding month.
    #[inline]
    #[must_use]
    pub fn prev(self) -> Option<Self> {
        if self.month == 1 {
            Self::new(self.year.checked_sub(1)?, 12)
        } else {
            Self::new(self.year, self.month - 1)
        }
    }

    /// First day of the month.
    #[inline]
    #[must_use]
    pub fn first_day(self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    /// Every day of the month, in order.
    #[inline]
    pub fn days(self) -> impl Iterator<Item = NaiveDate> {
        let month = self.month;
        self.first_day()
            .iter_days()
            .take_while(move |date| date.month() == month)
    }
}

impl fmt::Display for YearMonth {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = String;

    /// Parses `YYYY-MM`.
    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (year, month) = s
            .trim()
            .split_once('-')
            .ok_or_else(|| format!("expected YYYY-MM, got {s:?}"))?;
        let year: i32 = year.parse().map_err(|err| format!("invalid year: {err}"))?;
        let month: u32 = month.parse().map_err(|err| format!("invalid month: {err}"))?;
        Self::new(year, month).ok_or_else(|| format!("month out of range: {s:?}"))
    }
}

/// Relative activity of a day, for heat-map shading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HeatLevel {
    /// No transactions, or no movement.
    None,
    /// Up to a third of the busiest day.
    Low,
    /// Up to two thirds of the busiest day.
    Medium,
    /// More than two thirds of the busiest day.
    High,
}

/// One cell of a calendar grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum CalendarCell {
    /// Filler before day 1 or after the last day.
    Padding,
    /// A day of the displayed month.
    Day {
        /// Day of month, starting at 1.
        day: u32,
        /// Full date of the cell.
        date: NaiveDate,
        /// Activity on that day, if any transaction falls on it.
        aggregate: Option<DailyAggregate>,
    },
}

impl CalendarCell {
    /// Returns the aggregate of a day cell.
    #[inline]
    #[must_use]
    pub const fn aggregate(&self) -> Option<&DailyAggregate> {
        match self {
            Self::Day {
                aggregate: Some(aggregate),
                ..
            } => Some(aggregate),
            Self::Day { aggregate: None, .. } | Self::Padding => None,
        }
    }

    /// Shades the cell relative to `scale`, the busiest day of the grid
    /// (see [`activity_scale`]).
    #[inline]
    #[must_use]
    pub fn heat_level(&self, scale: Decimal) -> HeatLevel {
        let Some(aggregate) = self.aggregate() else {
            return HeatLevel::None;
        };
        let activity = activity(aggregate);
        if activity.is_zero() || scale <= Decimal::ZERO {
            return HeatLevel::None;
        }
        let third = scale / Decimal::from(3_u8);
        if activity <= third {
            HeatLevel::Low
        } else if activity <= third.saturating_add(third) {
            HeatLevel::Medium
        } else {
            HeatLevel::High
        }
    }
}

/// Total money moved on a day, in either direction.
fn activity(aggregate: &DailyAggregate) -> Decimal {
    aggregate.income.saturating_add(aggregate.expense.abs())
}

/// Returns the largest single-day activity in the grid, or zero.
#[inline]
#[must_use]
pub fn activity_scale(grid: &[CalendarCell]) -> Decimal {
    grid.iter()
        .filter_map(CalendarCell::aggregate)
        .map(activity)
        .max()
        .unwrap_or(Decimal::ZERO)
}

/// Builds the Sunday-first grid for `year`/`month`.
///
/// An invalid month yields an empty grid. Aggregates dated outside the
/// month are ignored.
#[inline]
#[must_use]
pub fn build_calendar_grid(
    year: i32,
    month: u32,
    daily_aggregates: &BTreeMap<NaiveDate, DailyAggregate>,
) -> Vec<CalendarCell> {
    build_calendar_grid_with(year, month, daily_aggregates, WeekStart::Sunday)
}

/// Builds the grid for `year`/`month` with an explicit first weekday.
#[inline]
#[must_use]
pub fn build_calendar_grid_with(
    year: i32,
    month: u32,
    daily_aggregates: &BTreeMap<NaiveDate, DailyAggregate>,
    week_start: WeekStart,
) -> Vec<CalendarCell> {
    let Some(target) = YearMonth::new(year, month) else {
        tracing::debug!(year, month, "requested calendar for an invalid month");
        return Vec::new();
    };
    let leading = week_start.column(target.first_day());
    let mut cells: Vec<CalendarCell> = Vec::with_capacity(WEEK_LEN * 6);
    cells.extend(core::iter::repeat_n(CalendarCell::Padding, leading));
    cells.extend(target.days().map(|date| CalendarCell::Day {
        day: date.day(),
        date,
        aggregate: daily_aggregates.get(&date).copied(),
    }));
    while cells.len() % WEEK_LEN != 0 {
        cells.push(CalendarCell::Padding);
    }
    cells
}

/// Splits a grid into rows of seven cells.
#[inline]
pub fn weeks(grid: &[CalendarCell]) -> core::slice::Chunks<'_, CalendarCell> {
    grid.chunks(WEEK_LEN)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn day_numbers(grid: &[CalendarCell]) -> Vec<Option<u32>> {
        grid.iter()
            .map(|cell| match cell {
                CalendarCell::Day { day, .. } => Some(*day),
                CalendarCell::Padding => None,
            })
            .collect()
    }

    #[test]
    fn month_starting_wednesday_has_three_padding_cells() {
        // May 2024 starts on a Wednesday.
        let grid = build_calendar_grid(2024, 5, &BTreeMap::new());
        let days = day_numbers(&grid);
        assert_eq!(&days[..4], &[None, None, None, Some(1)]);
    }

    #[test]
    fn grid_rows_are_complete() {
        let grid = build_calendar_grid(2024, 5, &BTreeMap::new());
        assert_eq!(grid.len() % WEEK_LEN, 0);
        // 3 leading + 31 days = 34, padded to 35.
        assert_eq!(grid.len(), 35);
        assert_eq!(weeks(&grid).count(), 5);
        assert!(weeks(&grid).all(|row| row.len() == WEEK_LEN));
        assert_eq!(grid.last(), Some(&CalendarCell::Padding));
    }

    #[test]
    fn february_starting_sunday_needs_no_padding() {
        // February 2015 starts on a Sunday and has 28 days.
        let grid = build_calendar_grid(2015, 2, &BTreeMap::new());
        assert_eq!(grid.len(), 28);
        assert_eq!(day_numbers(&grid).first(), Some(&Some(1)));
        assert!(grid.iter().all(|cell| *cell != CalendarCell::Padding));
    }

    #[test]
    fn leap_february_has_29_days() {
        let grid = build_calendar_grid(2024, 2, &BTreeMap::new());
        let count = grid
            .iter()
            .filter(|cell| matches!(cell, CalendarCell::Day { .. }))
            .count();
        assert_eq!(count, 29);
    }

    #[test]
    fn monday_start_shifts_columns() {
        // May 2024: Wednesday is column 2 when weeks start on Monday.
        let grid = build_calendar_grid_with(2024, 5, &BTreeMap::new(), WeekStart::Monday);
        let days = day_numbers(&grid);
        assert_eq!(&days[..3], &[None, None, Some(1)]);
        // September 2024 starts on a Sunday: last column with Monday start.
        let grid = build_calendar_grid_with(2024, 9, &BTreeMap::new(), WeekStart::Monday);
        assert_eq!(day_numbers(&grid)[6], Some(1));
    }

    #[test]
    fn invalid_month_yields_empty_grid() {
        assert!(build_calendar_grid(2024, 13, &BTreeMap::new()).is_empty());
        assert!(build_calendar_grid(2024, 0, &BTreeMap::new()).is_empty());
    }

    #[test]
    fn cells_carry_aggregates_of_their_month_only() {
        let mut aggregates = BTreeMap::new();
        let mut may_first = DailyAggregate::default();
        may_first.record(Decimal::new(50_000, 0));
        may_first.record(Decimal::new(-3_000, 0));
        let _previous = aggregates.insert(date(2024, 5, 1), may_first);
        let mut june_first = DailyAggregate::default();
        june_first.record(Decimal::new(10, 0));
        let _previous = aggregates.insert(date(2024, 6, 1), june_first);

        let grid = build_calendar_grid(2024, 5, &aggregates);
        let with_data: Vec<&CalendarCell> =
            grid.iter().filter(|cell| cell.aggregate().is_some()).collect();
        assert_eq!(with_data.len(), 1);
        assert_eq!(
            with_data[0],
            &CalendarCell::Day {
                day: 1,
                date: date(2024, 5, 1),
                aggregate: Some(may_first),
            }
        );
    }

    #[test]
    fn heat_levels_scale_with_busiest_day() {
        let mut aggregates = BTreeMap::new();
        for (day, amount) in [(1, 10_i64), (2, 50), (3, -90)] {
            let mut aggregate = DailyAggregate::default();
            aggregate.record(Decimal::new(amount, 0));
            let _previous = aggregates.insert(date(2024, 5, day), aggregate);
        }
        let grid = build_calendar_grid(2024, 5, &aggregates);
        let scale = activity_scale(&grid);
        assert_eq!(scale, Decimal::new(90, 0));
        let levels: Vec<HeatLevel> = grid
            .iter()
            .filter(|cell| cell.aggregate().is_some())
            .map(|cell| cell.heat_level(scale))
            .collect();
        assert_eq!(levels, [HeatLevel::Low, HeatLevel::Medium, HeatLevel::High]);
        assert_eq!(CalendarCell::Padding.heat_level(scale), HeatLevel::None);
    }

    #[test]
    fn year_month_navigation_wraps_years() {
        let december = YearMonth::new(2024, 12).unwrap();
        assert_eq!(december.next(), YearMonth::new(2025, 1));
        let january = YearMonth::new(2025, 1).unwrap();
        assert_eq!(january.prev(), Some(december));
        assert_eq!(YearMonth::of(date(2024, 5, 17)), YearMonth::new(2024, 5).unwrap());
        assert_eq!(december.days().count(), 31);
    }

    #[test]
    fn year_month_parse_and_display() {
        let parsed: YearMonth = "2024-05".parse().unwrap();
        assert_eq!(parsed.to_string(), "2024-05");
        assert_eq!((parsed.year(), parsed.month()), (2024, 5));
        assert!("2024-13".parse::<YearMonth>().is_err());
        assert!("May".parse::<YearMonth>().is_err());
    }

    #[test]
    fn week_start_parse() {
        assert_eq!("Monday".parse::<WeekStart>(), Ok(WeekStart::Monday));
        assert_eq!("sun".parse::<WeekStart>(), Ok(WeekStart::Sunday));
        assert!("friday".parse::<WeekStart>().is_err());
        assert_eq!(WeekStart::default(), WeekStart::Sunday);
    }
}
