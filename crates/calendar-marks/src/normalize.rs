//! Shift raw event times into local wall-clock time.
//!
//! The events API stores instants in UTC. The calendar works in local
//! calendar days, so every start/end is moved by the local UTC offset and
//! stored as a naive [`EventTime::Local`]. Downstream stages then treat the
//! times as plain wall-clock readings.
//!
//! Like the rest of this crate, normalization never reads the system clock
//! itself: the caller supplies a [`LocalClock`] holding "now" and the offset,
//! which keeps these functions deterministic in tests.

use chrono::{DateTime, FixedOffset, Local, NaiveDateTime, Offset, Utc};
use chrono_tz::Tz;

use crate::error::{CalendarError, Result};
use crate::event::{Event, EventTime};

// ── LocalClock ──────────────────────────────────────────────────────────────

/// The "now" anchor and the local UTC offset used for normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalClock {
    pub now: DateTime<Utc>,
    pub utc_offset: FixedOffset,
}

impl LocalClock {
    pub fn new(now: DateTime<Utc>, utc_offset: FixedOffset) -> Self {
        Self { now, utc_offset }
    }

    /// A clock at `now` with no offset.
    pub fn utc(now: DateTime<Utc>) -> Self {
        Self::new(now, Utc.fix())
    }

    /// Capture the host clock and its current offset.
    pub fn system() -> Self {
        let local = Local::now();
        Self::new(local.with_timezone(&Utc), local.offset().fix())
    }

    /// A clock at `now` using the offset an IANA timezone has at that instant.
    ///
    /// # Errors
    ///
    /// Returns [`CalendarError::InvalidDatetime`] if `timezone` is not a valid
    /// IANA name.
    pub fn for_timezone(now: DateTime<Utc>, timezone: &str) -> Result<Self> {
        let tz = parse_timezone(timezone)?;
        let offset = now.with_timezone(&tz).offset().fix();
        Ok(Self::new(now, offset))
    }

    /// The offset formatted as `+HH:MM` / `-HH:MM`.
    pub fn offset_label(&self) -> String {
        let offset_secs = self.utc_offset.local_minus_utc();
        let sign = if offset_secs >= 0 { "+" } else { "-" };
        let abs_secs = offset_secs.unsigned_abs();
        let hours = abs_secs / 3600;
        let minutes = (abs_secs % 3600) / 60;
        format!("{sign}{hours:02}:{minutes:02}")
    }

    /// Local wall-clock reading of a UTC instant.
    fn shift(&self, instant: DateTime<Utc>) -> Result<NaiveDateTime> {
        let offset = chrono::Duration::seconds(i64::from(self.utc_offset.local_minus_utc()));
        instant
            .naive_utc()
            .checked_add_signed(offset)
            .ok_or_else(|| {
                CalendarError::InvalidDatetime(format!(
                    "'{}' shifted by {} is out of range",
                    instant.to_rfc3339(),
                    self.offset_label()
                ))
            })
    }
}

// ── normalize_times ─────────────────────────────────────────────────────────

/// Shift every event's start/end into local wall-clock time.
///
/// A missing start or end defaults to `clock.now`, each field independently.
/// Values that are already wall-clock ([`EventTime::Local`],
/// [`EventTime::Date`]) pass through, so normalizing twice is harmless.
///
/// The output always has the same length and order as the input: an event
/// whose times cannot be read is logged and returned unchanged. No field other
/// than `start`/`end` is touched.
///
/// # Examples
///
/// ```
/// use calendar_marks::{normalize_times, Event, EventTime, LocalClock};
/// use chrono::{FixedOffset, TimeZone, Utc};
///
/// let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
/// let est = LocalClock::new(now, FixedOffset::west_opt(5 * 3600).unwrap());
/// let event = Event {
///     id: "e1".to_string(),
///     start: Some(EventTime::parse("2024-03-10T02:00:00Z")),
///     ..Event::default()
/// };
///
/// let normalized = normalize_times(&[event], &est);
/// // 02:00 UTC on the 10th is 21:00 on the 9th in UTC-5.
/// assert_eq!(normalized[0].start, Some(EventTime::parse("2024-03-09T21:00:00")));
/// // The missing end becomes "now", shifted the same way.
/// assert_eq!(normalized[0].end, Some(EventTime::parse("2024-03-01T07:00:00")));
/// ```
pub fn normalize_times(events: &[Event], clock: &LocalClock) -> Vec<Event> {
    events
        .iter()
        .map(|event| match normalize_event(event, clock) {
            Ok(normalized) => normalized,
            Err(e) => {
                tracing::warn!(
                    event_id = %event.id,
                    error = %e,
                    "Failed to normalize event times, keeping original"
                );
                event.clone()
            }
        })
        .collect()
}

/// Normalize a single event.
///
/// # Errors
///
/// Returns [`CalendarError::InvalidDatetime`] if either time is unparsable or
/// the shifted value leaves chrono's supported range.
pub fn normalize_event(event: &Event, clock: &LocalClock) -> Result<Event> {
    let start = shift_field(event.start.as_ref(), clock)?;
    let end = shift_field(event.end.as_ref(), clock)?;
    Ok(Event {
        start: Some(start),
        end: Some(end),
        ..event.clone()
    })
}

fn shift_field(value: Option<&EventTime>, clock: &LocalClock) -> Result<EventTime> {
    match value {
        None => clock.shift(clock.now).map(EventTime::Local),
        Some(EventTime::Utc(instant)) => clock.shift(*instant).map(EventTime::Local),
        Some(wall_clock @ (EventTime::Local(_) | EventTime::Date(_))) => Ok(wall_clock.clone()),
        Some(EventTime::Unparsed(raw)) => {
            Err(CalendarError::InvalidDatetime(format!("'{raw}'")))
        }
    }
}

/// Parse an IANA timezone string into `Tz`.
fn parse_timezone(s: &str) -> Result<Tz> {
    s.parse::<Tz>()
        .map_err(|_| CalendarError::InvalidDatetime(format!("unknown timezone '{s}'")))
}
