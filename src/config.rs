//! Explicit tracker configuration.
//!
//! Configuration is a plain value handed to the tracker builder; nothing
//! here is stored in process-wide state. [`TrackerConfig::from_env`] is a
//! convenience for binaries that read it from environment variables.

use core::str::FromStr;
use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{
    DateTime, FixedOffset, Local, NaiveDate, NaiveTime, Offset as _, TimeDelta, TimeZone as _, Utc,
};

use crate::aggregation;
use crate::calendar::WeekStart;
use crate::error::{Result, SavingsError};
use crate::models::{DailyAggregate, Transaction};

/// Environment variable overriding the storage directory.
pub const DATA_DIR_ENV: &str = "SAVINGS_DATA_DIR";

/// Environment variable selecting the first weekday (`sunday`/`monday`).
pub const WEEK_START_ENV: &str = "SAVINGS_WEEK_START";

/// Environment variable selecting the day boundary (`local` or an offset
/// such as `+02:00`).
pub const UTC_OFFSET_ENV: &str = "SAVINGS_UTC_OFFSET";

/// Time zone whose midnight separates calendar days.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CalendarZone {
    /// The system's local time zone.
    #[default]
    Local,
    /// A fixed UTC offset.
    Fixed(FixedOffset),
}

impl CalendarZone {
    /// Calendar date of `timestamp` in this zone.
    #[inline]
    #[must_use]
    pub fn date_of(&self, timestamp: &DateTime<Utc>) -> NaiveDate {
        match self {
            Self::Local => aggregation::local_date(timestamp, &Local),
            Self::Fixed(offset) => aggregation::local_date(timestamp, offset),
        }
    }

    /// Today's date in this zone.
    #[inline]
    #[must_use]
    pub fn today(&self) -> NaiveDate {
        self.date_of(&Utc::now())
    }

    /// Noon of `date` in this zone, as a UTC instant.
    ///
    /// Used to timestamp entries recorded for a past or future day so
    /// that they land on `date` under this zone's day boundary.
    #[inline]
    #[must_use]
    pub fn midday(&self, date: NaiveDate) -> DateTime<Utc> {
        let naive = date.and_time(NaiveTime::MIN) + TimeDelta::hours(12);
        let resolved = match self {
            Self::Local => Local.from_local_datetime(&naive).earliest().map(|dt| dt.to_utc()),
            Self::Fixed(offset) => offset.from_local_datetime(&naive).earliest().map(|dt| dt.to_utc()),
        };
        resolved.unwrap_or_else(|| naive.and_utc())
    }

    /// [`aggregation::compute_daily_aggregates`] in this zone.
    #[inline]
    #[must_use]
    pub fn daily_aggregates(
        &self,
        transactions: &[Transaction],
    ) -> BTreeMap<NaiveDate, DailyAggregate> {
        match self {
            Self::Local => aggregation::compute_daily_aggregates(transactions, &Local),
            Self::Fixed(offset) => aggregation::compute_daily_aggregates(transactions, offset),
        }
    }

    /// [`aggregation::filter_by_date`] in this zone.
    #[inline]
    #[must_use]
    pub fn filter_by_date(&self, transactions: &[Transaction], date: NaiveDate) -> Vec<Transaction> {
        match self {
            Self::Local => aggregation::filter_by_date(transactions, date, &Local),
            Self::Fixed(offset) => aggregation::filter_by_date(transactions, date, offset),
        }
    }
}

impl FromStr for CalendarZone {
    type Err = String;

    /// Parses `local`, `utc`, or an offset like `+02:00`.
    #[inline]
    fn from_str(s: &str) -> core::result::Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("local") {
            return Ok(Self::Local);
        }
        if trimmed.eq_ignore_ascii_case("utc") || trimmed.eq_ignore_ascii_case("z") {
            return Ok(Self::Fixed(Utc.fix()));
        }
        trimmed
            .parse::<FixedOffset>()
            .map(Self::Fixed)
            .map_err(|err| format!("invalid UTC offset {trimmed:?}: {err}"))
    }
}

/// Settings passed to the tracker at construction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackerConfig {
    /// Storage directory read by `FileStorage::from_config`;
    /// `None` selects the platform default. The tracker itself only carries
    /// it, since the store is chosen by the builder.
    pub data_dir: Option<PathBuf>,
    /// First column of calendar grids.
    pub week_start: WeekStart,
    /// Day boundary for per-day views.
    pub zone: CalendarZone,
}

impl TrackerConfig {
    /// Creates the default configuration: platform data directory,
    /// Sunday-first weeks, local day boundaries.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the storage directory.
    #[inline]
    #[must_use]
    pub fn data_dir<T: Into<PathBuf>>(mut self, dir: T) -> Self {
        self.data_dir = Some(dir.into());
        self
    }

    /// Sets the first weekday of calendar grids.
    #[inline]
    #[must_use]
    pub const fn week_start(mut self, week_start: WeekStart) -> Self {
        self.week_start = week_start;
        self
    }

    /// Sets the day boundary.
    #[inline]
    #[must_use]
    pub const fn zone(mut self, zone: CalendarZone) -> Self {
        self.zone = zone;
        self
    }

    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`SavingsError::InvalidConfig`] if a variable is set to an
    /// unparseable value.
    #[inline]
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`, which maps a variable
    /// name to its value. Empty values count as unset.
    ///
    /// # Errors
    ///
    /// Returns [`SavingsError::InvalidConfig`] if a value cannot be parsed.
    #[inline]
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let mut config = Self::new();
        if let Some(dir) = read(DATA_DIR_ENV) {
            config.data_dir = Some(PathBuf::from(dir));
        }
        if let Some(raw) = read(WEEK_START_ENV) {
            config.week_start = raw
                .parse()
                .map_err(|err| SavingsError::InvalidConfig(format!("{WEEK_START_ENV}: {err}")))?;
        }
        if let Some(raw) = read(UTC_OFFSET_ENV) {
            config.zone = raw
                .parse()
                .map_err(|err| SavingsError::InvalidConfig(format!("{UTC_OFFSET_ENV}: {err}")))?;
        }
        tracing::debug!(?config, "loaded tracker configuration");
        Ok(config)
    }
}
