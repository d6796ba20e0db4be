//! Cheap pre-filter that drops events which cannot appear in a window.
//!
//! Runs before the expander's event cap when `prefilter_relevant` is enabled,
//! so stale series do not use up the cap ahead of current ones.

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime};

use crate::event::Event;
use crate::guard::RuleParts;
use crate::window::DateWindow;

/// Weekly series starting more than this many months before the window are dropped.
const WEEKLY_LOOKBACK_MONTHS: i32 = 12;
/// Daily series starting more than this many days before the window are dropped.
const DAILY_LOOKBACK_DAYS: i64 = 365;

/// The events that may produce an occurrence inside `window`, in input order.
pub fn filter_relevant<'a>(events: &'a [Event], window: &DateWindow) -> Vec<&'a Event> {
    events.iter().filter(|e| is_relevant(e, window)).collect()
}

/// Whether `event` may produce an occurrence inside `window`.
///
/// Events without a readable start never qualify. Single events must start
/// inside the window. Recurring events are dropped when they start after the
/// window, when their `UNTIL` falls before it, or when a weekly/daily series
/// is older than the lookback limits above.
pub fn is_relevant(event: &Event, window: &DateWindow) -> bool {
    let Ok(start) = event.naive_start() else {
        return false;
    };
    let Some(rule) = event.rule() else {
        return window.contains(start);
    };

    if start > window.end {
        return false;
    }

    let parts = RuleParts::parse(rule);
    if let Some(until) = parts.value("UNTIL").and_then(parse_until) {
        if until < window.start {
            return false;
        }
    }

    match parts.value("FREQ") {
        Some("WEEKLY") => {
            let months_back = (window.start.year() - start.year()) * 12
                + (window.start.month() as i32 - start.month() as i32);
            months_back <= WEEKLY_LOOKBACK_MONTHS
        }
        Some("DAILY") => (window.start - start).num_days() <= DAILY_LOOKBACK_DAYS,
        _ => true,
    }
}

/// Parse an RFC 5545 `UNTIL` value (date-time, floating, or date form).
fn parse_until(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim_end_matches('Z');
    NaiveDateTime::parse_from_str(value, "%Y%m%dT%H%M%S")
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y%m%d")
                .ok()
                .map(|d| d.and_time(NaiveTime::MIN))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventTime;

    fn event(start: Option<&str>, rule: Option<&str>) -> Event {
        Event {
            id: "e".to_string(),
            start: start.map(EventTime::parse),
            recurrence_rule: rule.map(str::to_string),
            ..Event::default()
        }
    }

    fn march() -> DateWindow {
        DateWindow::for_month("2024-03").unwrap()
    }

    #[test]
    fn test_single_event_must_be_in_window() {
        assert!(is_relevant(&event(Some("2024-03-10T15:00:00"), None), &march()));
        assert!(!is_relevant(&event(Some("2024-04-10T15:00:00"), None), &march()));
    }

    #[test]
    fn test_no_start_is_irrelevant() {
        assert!(!is_relevant(&event(None, Some("FREQ=WEEKLY")), &march()));
        assert!(!is_relevant(&event(Some("garbage"), None), &march()));
    }

    #[test]
    fn test_series_starting_after_window() {
        let e = event(Some("2024-04-02T10:00:00"), Some("FREQ=WEEKLY"));
        assert!(!is_relevant(&e, &march()));
    }

    #[test]
    fn test_series_ended_before_window() {
        let e = event(Some("2023-01-01T10:00:00"), Some("FREQ=MONTHLY;UNTIL=20240215T000000Z"));
        assert!(!is_relevant(&e, &march()));
        let e = event(Some("2023-01-01T10:00:00"), Some("FREQ=MONTHLY;UNTIL=20240315"));
        assert!(is_relevant(&e, &march()));
    }

    #[test]
    fn test_weekly_lookback() {
        let recent = event(Some("2023-03-05T10:00:00"), Some("FREQ=WEEKLY"));
        assert!(is_relevant(&recent, &march()));
        let stale = event(Some("2023-02-05T10:00:00"), Some("freq=weekly"));
        assert!(!is_relevant(&stale, &march()));
    }

    #[test]
    fn test_daily_lookback() {
        let recent = event(Some("2023-03-10T10:00:00"), Some("FREQ=DAILY"));
        assert!(is_relevant(&recent, &march()));
        let stale = event(Some("2022-12-01T10:00:00"), Some("FREQ=DAILY"));
        assert!(!is_relevant(&stale, &march()));
    }

    #[test]
    fn test_monthly_always_kept() {
        let old = event(Some("2015-01-01T10:00:00"), Some("FREQ=MONTHLY"));
        assert!(is_relevant(&old, &march()));
    }

    #[test]
    fn test_filter_preserves_order() {
        let events = vec![
            event(Some("2024-03-20T10:00:00"), None),
            event(Some("2024-05-01T10:00:00"), None),
            event(Some("2024-03-02T10:00:00"), None),
        ];
        let kept = filter_relevant(&events, &march());
        assert_eq!(kept.len(), 2);
        assert!(std::ptr::eq(kept[0], &events[0]));
        assert!(std::ptr::eq(kept[1], &events[2]));
    }
}
