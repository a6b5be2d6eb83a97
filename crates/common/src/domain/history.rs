use super::{Parameter, SensorLocation};
use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use std::fmt;

pub const MINUTES_PER_DAY: usize = 1440;

/// One synthesized per-minute sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistoryPoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

/// Half-open calendar-day window `[start, start + 24h)` in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DayWindow {
    pub fn starting_at(start: DateTime<Utc>) -> Self {
        Self {
            start,
            end: start + TimeDelta::days(1),
        }
    }

    /// Calendar day the window belongs to.
    pub fn day(&self) -> NaiveDate {
        self.start.date_naive()
    }
}

/// Storage key of one day blob: `{location}#{parameter}#{YYYY-MM-DD}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlobKey {
    pub location: SensorLocation,
    pub parameter: Parameter,
    pub day: NaiveDate,
}

impl BlobKey {
    pub fn new(location: &SensorLocation, parameter: &Parameter, day: NaiveDate) -> Self {
        Self {
            location: location.clone(),
            parameter: parameter.clone(),
            day,
        }
    }
}

impl fmt::Display for BlobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}#{}#{}",
            self.location,
            self.parameter,
            self.day.format("%Y-%m-%d")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_day_window_spans_one_day() {
        let start = Utc.with_ymd_and_hms(2024, 2, 28, 0, 0, 0).unwrap();
        let window = DayWindow::starting_at(start);
        assert_eq!(window.end, Utc.with_ymd_and_hms(2024, 2, 29, 0, 0, 0).unwrap());
        assert_eq!(window.day(), NaiveDate::from_ymd_opt(2024, 2, 28).unwrap());
    }

    #[test]
    fn test_blob_key_format() {
        let key = BlobKey::new(
            &SensorLocation::from_token("Fabc.Hdef"),
            &Parameter::default(),
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
        );
        assert_eq!(key.to_string(), "Fabc.Hdef#temp#2024-01-02");
    }
}
