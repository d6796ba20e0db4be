//! The `[start, end]` range of wall-clock time a calendar view is showing.

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;

use crate::error::{CalendarError, Result};

/// An inclusive range of local wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl DateWindow {
    /// Build a window, rejecting one that ends before it starts.
    ///
    /// # Errors
    ///
    /// Returns [`CalendarError::InvalidWindow`] if `start > end`.
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Result<Self> {
        if start > end {
            return Err(CalendarError::InvalidWindow(format!(
                "start {start} is after end {end}"
            )));
        }
        Ok(Self { start, end })
    }

    /// The window covering one calendar month, from midnight on the 1st to
    /// `23:59:59.999` on the last day.
    ///
    /// Accepts `YYYY-MM` or any `YYYY-MM-DD` inside the month, which is what
    /// the calendar widget reports when the visible month changes.
    ///
    /// # Errors
    ///
    /// Returns [`CalendarError::InvalidWindow`] if `month` matches neither
    /// format.
    ///
    /// # Examples
    ///
    /// ```
    /// use calendar_marks::DateWindow;
    ///
    /// let february = DateWindow::for_month("2024-02-14").unwrap();
    /// assert_eq!(february.start.to_string(), "2024-02-01 00:00:00");
    /// assert_eq!(february.end.to_string(), "2024-02-29 23:59:59.999");
    /// assert!(DateWindow::for_month("Feb").is_err());
    /// ```
    pub fn for_month(month: &str) -> Result<Self> {
        let trimmed = month.trim();
        let first = NaiveDate::parse_from_str(&format!("{trimmed}-01"), "%Y-%m-%d")
            .or_else(|_| {
                NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").map(|d| d.with_day(1).unwrap_or(d))
            })
            .map_err(|_| CalendarError::InvalidWindow(format!("'{month}' is not a month")))?;

        let next_month = if first.month() == 12 {
            NaiveDate::from_ymd_opt(first.year() + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(first.year(), first.month() + 1, 1)
        }
        .ok_or_else(|| CalendarError::InvalidWindow(format!("'{month}' is out of range")))?;

        let start = first.and_time(NaiveTime::MIN);
        let end = next_month.and_time(NaiveTime::MIN) - chrono::Duration::milliseconds(1);
        Self::new(start, end)
    }

    /// Whether `t` lies inside the window, bounds included.
    pub fn contains(&self, t: NaiveDateTime) -> bool {
        self.start <= t && t <= self.end
    }

    /// Whether `t` lies strictly between the bounds.
    pub fn strictly_contains(&self, t: NaiveDateTime) -> bool {
        self.start < t && t < self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn naive(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f").unwrap()
    }

    #[test]
    fn test_new_rejects_inverted_window() {
        let result = DateWindow::new(naive("2024-03-31T00:00:00"), naive("2024-03-01T00:00:00"));
        let err = result.unwrap_err().to_string();
        assert!(err.contains("Invalid window"), "got: {err}");
    }

    #[test]
    fn test_new_allows_empty_instant_window() {
        let t = naive("2024-03-01T00:00:00");
        assert!(DateWindow::new(t, t).is_ok());
    }

    #[test]
    fn test_for_month_year_month() {
        let w = DateWindow::for_month("2024-02").unwrap();
        assert_eq!(w.start, naive("2024-02-01T00:00:00"));
        assert_eq!(w.end, naive("2024-02-29T23:59:59.999"));
    }

    #[test]
    fn test_for_month_from_day_string() {
        let w = DateWindow::for_month("2024-03-15").unwrap();
        assert_eq!(w.start, naive("2024-03-01T00:00:00"));
        assert_eq!(w.end, naive("2024-03-31T23:59:59.999"));
    }

    #[test]
    fn test_for_month_december_rolls_year() {
        let w = DateWindow::for_month("2024-12").unwrap();
        assert_eq!(w.end, naive("2024-12-31T23:59:59.999"));
    }

    #[test]
    fn test_for_month_invalid() {
        assert!(DateWindow::for_month("March").is_err());
        assert!(DateWindow::for_month("2024-13").is_err());
    }

    #[test]
    fn test_contains_bounds() {
        let w = DateWindow::for_month("2024-03").unwrap();
        assert!(w.contains(w.start));
        assert!(w.contains(w.end));
        assert!(!w.strictly_contains(w.start));
        assert!(w.strictly_contains(naive("2024-03-10T15:00:00")));
        assert!(!w.contains(naive("2024-04-01T00:00:00")));
    }
}
