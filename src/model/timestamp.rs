use chrono::{DateTime, Duration, Utc};
use derive_new::new;
use serde::{Deserialize, Serialize};

pub fn now() -> Timestamp {
    Utc::now().into()
}

/// A point in time, stored as a native SurrealDB datetime so that range comparisons happen on the value rather than its textual form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, new)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    pub fn inner(self) -> DateTime<Utc> {
        self.0
    }

    /// Midnight (UTC) of the day this timestamp falls on.
    pub fn start_of_day(self) -> Timestamp {
        let midnight = self
            .0
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .unwrap_or_default()
            .and_utc();
        Timestamp(midnight)
    }

    /// `self - duration`, clamped to the earliest representable time.
    pub fn saturating_sub(self, duration: Duration) -> Timestamp {
        let earlier = self
            .0
            .checked_sub_signed(duration)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        Timestamp(earlier)
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(value: DateTime<Utc>) -> Self {
        Timestamp(value)
    }
}

impl From<Timestamp> for DateTime<Utc> {
    fn from(value: Timestamp) -> Self {
        value.0
    }
}

impl std::ops::Deref for Timestamp {
    type Target = DateTime<Utc>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl std::str::FromStr for Timestamp {
    type Err = chrono::ParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        DateTime::parse_from_rfc3339(input).map(|dt| Timestamp(dt.with_timezone(&Utc)))
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

impl Serialize for Timestamp {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        surrealdb::sql::Datetime::from(self.0).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let datetime = surrealdb::sql::Datetime::deserialize(deserializer)?;
        Ok(Timestamp(datetime.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parses_rfc3339_in_any_offset() {
        let parsed: Timestamp = "2024-01-15T09:30:00+02:00".parse().unwrap();
        let expected = Utc.with_ymd_and_hms(2024, 1, 15, 7, 30, 0).unwrap();
        assert_eq!(parsed.inner(), expected);
    }

    #[test]
    fn start_of_day_truncates_time() {
        let ts = Timestamp::new(Utc.with_ymd_and_hms(2024, 3, 9, 17, 45, 12).unwrap());
        assert_eq!(
            ts.start_of_day().inner(),
            Utc.with_ymd_and_hms(2024, 3, 9, 0, 0, 0).unwrap()
        );
    }
}
