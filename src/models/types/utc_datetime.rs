use serde::Serialize;
use std::ops::Add;
use time::{Date, Duration, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset};

/// A point in time that is always stored and compared in UTC.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct UtcDateTime(PrimitiveDateTime);

impl UtcDateTime {
    pub fn now() -> UtcDateTime {
        UtcDateTime::from(OffsetDateTime::now_utc())
    }

    pub fn assume_utc(datetime: PrimitiveDateTime) -> UtcDateTime {
        UtcDateTime(datetime)
    }

    /// Midnight at the start of the given day.
    pub fn start_of(date: Date) -> UtcDateTime {
        UtcDateTime(PrimitiveDateTime::new(date, Time::MIDNIGHT))
    }
}

impl From<OffsetDateTime> for UtcDateTime {
    fn from(value: OffsetDateTime) -> Self {
        let value_utc = value.to_offset(UtcOffset::UTC);
        UtcDateTime(PrimitiveDateTime::new(value_utc.date(), value_utc.time()))
    }
}

impl From<UtcDateTime> for OffsetDateTime {
    fn from(value: UtcDateTime) -> Self {
        value.0.assume_utc()
    }
}

impl Add<Duration> for UtcDateTime {
    type Output = UtcDateTime;

    fn add(self, rhs: Duration) -> Self::Output {
        UtcDateTime(self.0 + rhs)
    }
}

#[cfg(test)]
mod tests {
    use time::macros::{date, datetime, offset};
    use time::Duration;

    use super::UtcDateTime;

    #[test]
    fn converts_offsets_to_utc() {
        let local = datetime!(2024-03-10 02:30:00).assume_offset(offset!(+3));
        assert_eq!(
            UtcDateTime::from(local),
            UtcDateTime::assume_utc(datetime!(2024-03-09 23:30:00))
        );
    }

    #[test]
    fn week_arithmetic() {
        let start = UtcDateTime::start_of(date!(2024 - 01 - 01));
        assert_eq!(
            start + Duration::weeks(1),
            UtcDateTime::assume_utc(datetime!(2024-01-08 00:00:00))
        );
    }
}
