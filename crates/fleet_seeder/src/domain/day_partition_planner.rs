use chrono::{DateTime, NaiveTime, TimeDelta, Utc};
use common::domain::{DayWindow, DomainError, DomainResult};

/// Splits a device's history window into consecutive calendar days.
///
/// Windows start at `window_start` and advance by exactly 24h while the day start is
/// before `window_end`. The last window may extend past `window_end`; it is still
/// emitted with its full 24h span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayPartitionPlanner {
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
}

impl DayPartitionPlanner {
    /// Plan over `[window_start, window_end)`; an end before the start is rejected.
    pub fn new(window_start: DateTime<Utc>, window_end: DateTime<Utc>) -> DomainResult<Self> {
        if window_end < window_start {
            return Err(DomainError::InvalidWindow {
                start: window_start,
                end: window_end,
            });
        }

        Ok(Self {
            window_start,
            window_end,
        })
    }

    /// Plan the history of a device observed at `now`: from midnight UTC of `now`
    /// minus `lookback_days`, up to `now` itself.
    pub fn for_lookback(now: DateTime<Utc>, lookback_days: u32) -> Self {
        let midnight = now.date_naive().and_time(NaiveTime::MIN).and_utc();
        Self {
            window_start: midnight - TimeDelta::days(i64::from(lookback_days)),
            window_end: now,
        }
    }

    pub fn window_start(&self) -> DateTime<Utc> {
        self.window_start
    }

    pub fn window_end(&self) -> DateTime<Utc> {
        self.window_end
    }

    /// Number of day windows: `ceil((window_end - window_start) / 1 day)`.
    pub fn len(&self) -> usize {
        remaining_days(self.window_start, self.window_end)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A fresh iterator over the day windows; call again to restart.
    pub fn days(&self) -> DayWindows {
        DayWindows {
            next: self.window_start,
            end: self.window_end,
        }
    }
}

/// Lazy iterator over the day windows of a [`DayPartitionPlanner`].
#[derive(Debug, Clone)]
pub struct DayWindows {
    next: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl Iterator for DayWindows {
    type Item = DayWindow;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.end {
            return None;
        }

        let window = DayWindow::starting_at(self.next);
        self.next = window.end;
        Some(window)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = remaining_days(self.next, self.end);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for DayWindows {}

fn remaining_days(from: DateTime<Utc>, to: DateTime<Utc>) -> usize {
    if to <= from {
        return 0;
    }

    let span = to - from;
    let whole_days = span.num_days();
    let partial = if span > TimeDelta::days(whole_days) { 1 } else { 0 };
    (whole_days + partial) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn test_two_day_lookback_at_midnight() {
        let planner = DayPartitionPlanner::for_lookback(at(2024, 1, 3, 0, 0), 2);
        let days: Vec<DayWindow> = planner.days().collect();

        assert_eq!(planner.window_start(), at(2024, 1, 1, 0, 0));
        assert_eq!(
            days,
            vec![
                DayWindow {
                    start: at(2024, 1, 1, 0, 0),
                    end: at(2024, 1, 2, 0, 0)
                },
                DayWindow {
                    start: at(2024, 1, 2, 0, 0),
                    end: at(2024, 1, 3, 0, 0)
                },
            ]
        );
    }

    #[test]
    fn test_partial_final_day_is_emitted_whole() {
        let now = at(2024, 1, 3, 15, 30);
        let planner = DayPartitionPlanner::for_lookback(now, 2);
        let days: Vec<DayWindow> = planner.days().collect();

        assert_eq!(days.len(), 3);
        let last = days.last().unwrap();
        assert_eq!(last.day(), NaiveDate::from_ymd_opt(2024, 1, 3).unwrap());
        assert_eq!(last.end, at(2024, 1, 4, 0, 0));
        assert!(last.end > now);
    }

    #[test]
    fn test_five_year_lookback_counts() {
        let at_midnight = DayPartitionPlanner::for_lookback(at(2024, 6, 1, 0, 0), 5 * 365);
        assert_eq!(at_midnight.days().count(), 1825);
        assert_eq!(at_midnight.len(), 1825);

        let mid_day = DayPartitionPlanner::for_lookback(at(2024, 6, 1, 12, 0), 5 * 365);
        assert_eq!(mid_day.days().count(), 1826);
        assert_eq!(mid_day.len(), 1826);
    }

    #[test]
    fn test_windows_are_contiguous() {
        let planner = DayPartitionPlanner::for_lookback(at(2024, 3, 2, 8, 0), 40);
        let days: Vec<DayWindow> = planner.days().collect();

        assert_eq!(days.first().unwrap().start, planner.window_start());
        for pair in days.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
            assert_eq!(pair[0].end - pair[0].start, TimeDelta::days(1));
        }
        // Crosses the leap day without skipping or duplicating it
        assert!(days
            .iter()
            .any(|d| d.day() == NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()));
    }

    #[test]
    fn test_sequence_is_restartable() {
        let planner = DayPartitionPlanner::for_lookback(at(2024, 1, 10, 6, 0), 5);
        let first: Vec<DayWindow> = planner.days().collect();
        let second: Vec<DayWindow> = planner.days().collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_size_hint_tracks_progress() {
        let planner = DayPartitionPlanner::for_lookback(at(2024, 1, 3, 0, 0), 2);
        let mut days = planner.days();
        assert_eq!(days.len(), 2);
        days.next();
        assert_eq!(days.len(), 1);
        days.next();
        assert_eq!(days.len(), 0);
        assert!(days.next().is_none());
    }

    #[test]
    fn test_empty_window() {
        let start = at(2024, 1, 1, 0, 0);
        let planner = DayPartitionPlanner::new(start, start).unwrap();
        assert!(planner.is_empty());
        assert_eq!(planner.days().count(), 0);
    }

    #[test]
    fn test_inverted_window_is_rejected() {
        let result = DayPartitionPlanner::new(at(2024, 1, 2, 0, 0), at(2024, 1, 1, 0, 0));
        assert!(matches!(result, Err(DomainError::InvalidWindow { .. })));
    }
}
