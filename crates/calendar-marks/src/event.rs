//! Event records as delivered by the events API, and the concrete occurrences
//! derived from them.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CalendarError, Result};

// ── EventTime ───────────────────────────────────────────────────────────────

/// A start or end value on an event record.
///
/// The API sends RFC 3339 instants, but records that have already been
/// normalized carry naive wall-clock times, and all-day entries may carry a
/// bare date. Anything else is kept verbatim as [`EventTime::Unparsed`] so a
/// single bad field fails its own event instead of the whole payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventTime {
    /// Offset-qualified instant, held in UTC.
    Utc(DateTime<Utc>),
    /// Local wall-clock time with no offset attached.
    Local(NaiveDateTime),
    /// Calendar date without a time of day.
    Date(NaiveDate),
    /// A value that is none of the above.
    Unparsed(String),
}

impl EventTime {
    /// Classify a string the same way deserialization does.
    pub fn parse(s: &str) -> Self {
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return EventTime::Utc(dt.with_timezone(&Utc));
        }
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
            return EventTime::Local(naive);
        }
        if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            return EventTime::Date(date);
        }
        EventTime::Unparsed(s.to_string())
    }

    /// The wall-clock reading of this value.
    ///
    /// UTC instants are read field-for-field (their UTC components become the
    /// naive time), which is what a normalized record relies on.
    ///
    /// # Errors
    ///
    /// Returns [`CalendarError::InvalidDatetime`] for [`EventTime::Unparsed`].
    pub fn naive(&self) -> Result<NaiveDateTime> {
        match self {
            EventTime::Utc(dt) => Ok(dt.naive_utc()),
            EventTime::Local(naive) => Ok(*naive),
            EventTime::Date(date) => Ok(date.and_time(NaiveTime::MIN)),
            EventTime::Unparsed(raw) => Err(CalendarError::InvalidDatetime(format!("'{raw}'"))),
        }
    }
}

impl From<DateTime<Utc>> for EventTime {
    fn from(dt: DateTime<Utc>) -> Self {
        EventTime::Utc(dt)
    }
}

impl From<NaiveDateTime> for EventTime {
    fn from(naive: NaiveDateTime) -> Self {
        EventTime::Local(naive)
    }
}

// ── Event ───────────────────────────────────────────────────────────────────

/// One calendar entry, possibly recurring.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<EventTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<EventTime>,
    /// Affects display formatting only.
    #[serde(default)]
    pub all_day: bool,
    /// RFC 5545 style rule body, e.g. `FREQ=WEEKLY;BYDAY=MO`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence_rule: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude_dates: Vec<EventTime>,
    /// Passed through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<String>,
}

impl Event {
    /// The recurrence rule, if present and non-blank.
    pub fn rule(&self) -> Option<&str> {
        self.recurrence_rule
            .as_deref()
            .map(str::trim)
            .filter(|rule| !rule.is_empty())
    }

    pub fn is_recurring(&self) -> bool {
        self.rule().is_some()
    }

    /// Wall-clock start, or an error if absent or unreadable.
    pub fn naive_start(&self) -> Result<NaiveDateTime> {
        self.start
            .as_ref()
            .ok_or_else(|| missing_field(&self.id, "start"))?
            .naive()
    }

    /// Wall-clock end, or an error if absent or unreadable.
    pub fn naive_end(&self) -> Result<NaiveDateTime> {
        self.end
            .as_ref()
            .ok_or_else(|| missing_field(&self.id, "end"))?
            .naive()
    }
}

fn missing_field(id: &str, field: &str) -> CalendarError {
    CalendarError::InvalidDatetime(format!("event '{id}' has no {field}"))
}

// ── Occurrence ──────────────────────────────────────────────────────────────

/// A concrete, dated instance of an [`Event`].
///
/// Every occurrence owns its data; editing one never affects the source event
/// or its siblings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Occurrence {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    #[serde(default)]
    pub all_day: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence_rule: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude_dates: Vec<EventTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<String>,
}

impl Occurrence {
    /// Copy `event` into an occurrence spanning `start..end`.
    pub fn from_event(event: &Event, start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self {
            id: event.id.clone(),
            title: event.title.clone(),
            description: event.description.clone(),
            start,
            end,
            all_day: event.all_day,
            recurrence_rule: event.recurrence_rule.clone(),
            exclude_dates: event.exclude_dates.clone(),
            visibility: event.visibility.clone(),
        }
    }

    /// Local calendar date of the start, as `YYYY-MM-DD`.
    pub fn date_key(&self) -> String {
        self.start.format("%Y-%m-%d").to_string()
    }
}
