//! Daily fire-time arithmetic.

use std::time::Duration;

use chrono::{DateTime, Days, NaiveTime, TimeDelta, Utc};
use quarry_config::{ConfigError, ScheduleConfig};

use crate::PipelineError;

/// Fires once per day at a fixed UTC wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailySchedule {
    at: NaiveTime,
}

impl DailySchedule {
    /// # Errors
    ///
    /// Returns [`PipelineError::Config`] if `hour`/`minute` is out of range.
    pub fn new(hour: u32, minute: u32) -> Result<Self, PipelineError> {
        let at = NaiveTime::from_hms_opt(hour, minute, 0).ok_or_else(|| ConfigError::InvalidValue {
            field: String::from("schedule"),
            reason: format!("{hour:02}:{minute:02} is not a time of day"),
        })?;
        Ok(Self { at })
    }

    /// # Errors
    ///
    /// See [`Self::new`].
    pub fn from_config(config: &ScheduleConfig) -> Result<Self, PipelineError> {
        Self::new(config.hour, config.minute)
    }

    /// First fire time strictly after `now`.
    #[must_use]
    pub fn next_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let today = now.date_naive().and_time(self.at).and_utc();
        if today > now {
            return today;
        }
        now.date_naive()
            .checked_add_days(Days::new(1))
            .map_or(today + TimeDelta::days(1), |tomorrow| tomorrow.and_time(self.at).and_utc())
    }

    /// Time to wait from `now` until the next fire.
    #[must_use]
    pub fn delay_from(&self, now: DateTime<Utc>) -> Duration {
        (self.next_after(now) - now).to_std().unwrap_or_default()
    }
}

impl std::fmt::Display for DailySchedule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "daily at {} UTC", self.at.format("%H:%M"))
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[rstest]
    #[case::before_fire(utc(2024, 3, 10, 1, 30, 0), utc(2024, 3, 10, 2, 0, 0))]
    #[case::at_fire(utc(2024, 3, 10, 2, 0, 0), utc(2024, 3, 11, 2, 0, 0))]
    #[case::after_fire(utc(2024, 3, 10, 2, 0, 1), utc(2024, 3, 11, 2, 0, 0))]
    #[case::month_end(utc(2024, 2, 29, 23, 59, 0), utc(2024, 3, 1, 2, 0, 0))]
    #[case::year_end(utc(2024, 12, 31, 3, 0, 0), utc(2025, 1, 1, 2, 0, 0))]
    fn next_fire_is_computed_from_now(#[case] now: DateTime<Utc>, #[case] expected: DateTime<Utc>) {
        let schedule = DailySchedule::new(2, 0).unwrap();
        assert_eq!(schedule.next_after(now), expected);
    }

    #[test]
    fn delay_counts_down_to_fire_time() {
        let schedule = DailySchedule::new(2, 15).unwrap();
        let delay = schedule.delay_from(utc(2024, 3, 10, 2, 0, 0));
        assert_eq!(delay, Duration::from_secs(15 * 60));
    }

    #[test]
    fn rejects_invalid_time() {
        assert!(DailySchedule::new(24, 0).is_err());
        assert!(DailySchedule::new(0, 60).is_err());
    }

    #[test]
    fn displays_fire_time() {
        assert_eq!(DailySchedule::new(2, 5).unwrap().to_string(), "daily at 02:05 UTC");
    }
}
