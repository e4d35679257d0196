use chrono::{Duration, Months};
use serde::{Deserialize, Serialize};
use snafu::Snafu;

use super::*;

/// A time window over `viewed_at`. Both bounds are inclusive and either may be left open.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    #[serde(default)]
    start: Option<Timestamp>,
    #[serde(default)]
    end: Option<Timestamp>,
}

#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
#[snafu(display("period starts at {start} which is after its end {end}"))]
pub struct InvertedPeriod {
    pub start: Timestamp,
    pub end: Timestamp,
}

impl Period {
    /// A period without any bound, matching every view.
    pub fn unbounded() -> Self {
        Period::default()
    }

    pub fn since(start: Timestamp) -> Self {
        Period {
            start: Some(start),
            end: None,
        }
    }

    pub fn upto(end: Timestamp) -> Self {
        Period {
            start: None,
            end: Some(end),
        }
    }

    pub fn between(start: Timestamp, end: Timestamp) -> Result<Self, InvertedPeriod> {
        if start > end {
            return Err(InvertedPeriod { start, end });
        }

        Ok(Period {
            start: Some(start),
            end: Some(end),
        })
    }

    /// Builds a period from two optional bounds, rejecting inverted ranges.
    pub fn from_bounds(
        start: Option<Timestamp>, end: Option<Timestamp>,
    ) -> Result<Self, InvertedPeriod> {
        match (start, end) {
            (Some(start), Some(end)) => Period::between(start, end),
            (start, end) => Ok(Period { start, end }),
        }
    }

    /// Everything since `now - duration`.
    pub fn sub(duration: Duration, now: Timestamp) -> Self {
        Period::since(now.saturating_sub(duration))
    }

    /// Everything since the start of the day `days` days before `now`.
    pub fn past_days(days: u32, now: Timestamp) -> Self {
        Period::since(now.start_of_day().saturating_sub(Duration::days(i64::from(days))))
    }

    pub fn past_weeks(weeks: u32, now: Timestamp) -> Self {
        Period::since(now.start_of_day().saturating_sub(Duration::weeks(i64::from(weeks))))
    }

    /// Everything since the start of the day `months` calendar months before `now`.
    ///
    /// Days that do not exist in the target month are clamped to its last day.
    pub fn past_months(months: u32, now: Timestamp) -> Self {
        Period::since(sub_months(now.start_of_day(), months))
    }

    pub fn past_years(years: u32, now: Timestamp) -> Self {
        Period::since(sub_months(now.start_of_day(), years.saturating_mul(12)))
    }

    pub fn start(&self) -> Option<Timestamp> {
        self.start
    }

    pub fn end(&self) -> Option<Timestamp> {
        self.end
    }

    /// Whether `timestamp` falls within this period.
    pub fn contains(&self, timestamp: Timestamp) -> bool {
        match (self.start, self.end) {
            (None, None) => true,
            (Some(start), None) => timestamp >= start,
            (None, Some(end)) => timestamp <= end,
            (Some(start), Some(end)) => start <= timestamp && timestamp <= end,
        }
    }
}

fn sub_months(timestamp: Timestamp, months: u32) -> Timestamp {
    timestamp
        .inner()
        .checked_sub_months(Months::new(months))
        .map(Timestamp::from)
        .unwrap_or_else(|| chrono::DateTime::<chrono::Utc>::MIN_UTC.into())
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.start, self.end) {
            (None, None) => write!(f, "all time"),
            (Some(start), None) => write!(f, "since {start}"),
            (None, Some(end)) => write!(f, "up to {end}"),
            (Some(start), Some(end)) => write!(f, "{start} to {end}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn at(year: i32, month: u32, day: u32, hour: u32) -> Timestamp {
        Utc.with_ymd_and_hms(year, month, day, hour, 0, 0).unwrap().into()
    }

    #[test]
    fn unbounded_contains_everything() {
        let period = Period::unbounded();
        assert_eq!((period.start(), period.end()), (None, None));
        assert!(period.contains(at(1970, 1, 1, 0)));
        assert!(period.contains(at(2999, 12, 31, 23)));
    }

    #[test]
    fn bounds_are_inclusive() {
        let start = at(2024, 1, 10, 0);
        let end = at(2024, 1, 31, 0);

        assert!(Period::since(start).contains(start));
        assert!(!Period::since(start).contains(at(2024, 1, 9, 23)));

        assert!(Period::upto(end).contains(end));
        assert!(!Period::upto(end).contains(at(2024, 1, 31, 1)));

        let period = Period::between(start, end).unwrap();
        assert!(period.contains(start));
        assert!(period.contains(end));
        assert!(period.contains(at(2024, 1, 15, 0)));
        assert!(!period.contains(at(2024, 2, 1, 0)));
    }

    #[test]
    fn between_rejects_inverted_range() {
        let result = Period::between(at(2024, 2, 1, 0), at(2024, 1, 1, 0));
        assert!(result.is_err());

        let single_instant = Period::between(at(2024, 2, 1, 0), at(2024, 2, 1, 0));
        assert!(single_instant.is_ok());
    }

    #[test]
    fn past_days_start_at_midnight() {
        let now = at(2024, 3, 15, 17);
        assert_eq!(Period::past_days(3, now).start(), Some(at(2024, 3, 12, 0)));
        assert_eq!(Period::past_days(3, now).end(), None);
        assert_eq!(Period::past_weeks(1, now).start(), Some(at(2024, 3, 8, 0)));
    }

    #[test]
    fn past_months_clamps_to_month_end() {
        let now = at(2024, 3, 31, 12);
        assert_eq!(Period::past_months(1, now).start(), Some(at(2024, 2, 29, 0)));
        assert_eq!(Period::past_years(1, now).start(), Some(at(2023, 3, 31, 0)));
    }

    #[test]
    fn sub_keeps_time_of_day() {
        let now = at(2024, 3, 15, 17);
        assert_eq!(
            Period::sub(Duration::hours(5), now).start(),
            Some(at(2024, 3, 15, 12))
        );
    }

    #[test]
    fn huge_durations_clamp_to_earliest_time() {
        let now = at(2024, 3, 15, 17);
        assert_eq!(
            Period::sub(Duration::milliseconds(i64::MAX), now).start(),
            Some(chrono::DateTime::<Utc>::MIN_UTC.into())
        );
        assert_eq!(
            Period::past_weeks(u32::MAX, now).start(),
            Some(chrono::DateTime::<Utc>::MIN_UTC.into())
        );
    }
}
