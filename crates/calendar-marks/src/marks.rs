//! Index occurrences by local calendar date for the calendar widget.

use std::collections::BTreeMap;

use chrono::Datelike;
use serde::{Deserialize, Serialize};

use crate::config::CalendarConfig;
use crate::error::{CalendarError, Result};
use crate::event::Occurrence;

/// One dot drawn under a calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dot {
    pub color: String,
}

/// Everything the widget needs to render one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayMarks {
    pub marked: bool,
    pub dots: Vec<Dot>,
    pub events: Vec<Occurrence>,
}

/// `YYYY-MM-DD` → marks for that day.
pub type MarkedDateMap = BTreeMap<String, DayMarks>;

/// Build the per-day index for the calendar view.
///
/// Returns an empty map when the view is not active, when there is nothing to
/// mark, or when any occurrence cannot be keyed. A partial map is never
/// returned.
///
/// # Examples
///
/// ```
/// use calendar_marks::{aggregate, CalendarConfig, Event, Occurrence};
/// use chrono::NaiveDate;
///
/// let start = NaiveDate::from_ymd_opt(2024, 3, 10)
///     .unwrap()
///     .and_hms_opt(15, 0, 0)
///     .unwrap();
/// let event = Event { id: "e1".to_string(), ..Event::default() };
/// let occurrences = vec![Occurrence::from_event(&event, start, start)];
///
/// let marks = aggregate(&occurrences, true, &CalendarConfig::default());
/// assert!(marks["2024-03-10"].marked);
/// assert_eq!(marks["2024-03-10"].dots[0].color, "#0D47A1");
///
/// assert!(aggregate(&occurrences, false, &CalendarConfig::default()).is_empty());
/// ```
pub fn aggregate(
    occurrences: &[Occurrence],
    is_active_view: bool,
    config: &CalendarConfig,
) -> MarkedDateMap {
    match try_aggregate(occurrences, is_active_view, config) {
        Ok(marks) => marks,
        Err(e) => {
            tracing::error!(error = %e, "Failed to aggregate calendar marks");
            MarkedDateMap::new()
        }
    }
}

/// Like [`aggregate`], but reports why aggregation failed.
///
/// Only the first `max_marked_occurrences` occurrences are indexed.
///
/// # Errors
///
/// Returns [`CalendarError::InvalidDatetime`] if an occurrence's date falls
/// outside the four-digit years a `YYYY-MM-DD` key can express.
pub fn try_aggregate(
    occurrences: &[Occurrence],
    is_active_view: bool,
    config: &CalendarConfig,
) -> Result<MarkedDateMap> {
    let mut marked = MarkedDateMap::new();
    if !is_active_view || occurrences.is_empty() {
        return Ok(marked);
    }

    for occurrence in occurrences.iter().take(config.max_marked_occurrences) {
        let key = date_key(occurrence)?;
        let day = marked.entry(key).or_insert_with(|| DayMarks {
            marked: true,
            dots: Vec::new(),
            events: Vec::new(),
        });
        day.dots.push(Dot {
            color: config.marker_color.clone(),
        });
        day.events.push(occurrence.clone());
    }

    Ok(marked)
}

fn date_key(occurrence: &Occurrence) -> Result<String> {
    let year = occurrence.start.year();
    if !(0..=9999).contains(&year) {
        return Err(CalendarError::InvalidDatetime(format!(
            "occurrence '{}' starts in year {year}, which has no YYYY-MM-DD key",
            occurrence.id
        )));
    }
    Ok(occurrence.date_key())
}
