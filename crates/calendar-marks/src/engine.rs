//! The recurrence-rule evaluator consumed by the expander.
//!
//! Rule evaluation itself is delegated: [`RecurrenceRuleEngine`] is the seam,
//! and [`RRuleEngine`] is the default implementation on top of the `rrule`
//! crate. Tests substitute fakes that return fixed candidate lists.

use chrono::{NaiveDate, NaiveDateTime};
use rrule::RRuleSet;

use crate::error::{CalendarError, Result};
use crate::event::{Event, Occurrence};
use crate::guard::format_until;
use crate::window::DateWindow;

/// Evaluates recurrence rules and exclusion lists.
///
/// Implementations may fail for any input; the expander isolates those
/// failures per event.
pub trait RecurrenceRuleEngine {
    /// Candidate start times of `event`'s recurrence inside `window`.
    ///
    /// The event's `recurrence_rule` is the (possibly guard-adjusted) rule to
    /// evaluate and its start is the series anchor. Order is the engine's own.
    fn get_range(&self, event: &Event, window: &DateWindow) -> Result<Vec<NaiveDateTime>>;

    /// A copy of `occurrences` without those falling on one of their own
    /// exclusion dates.
    fn remove_exclude_dates(&self, occurrences: &[Occurrence]) -> Result<Vec<Occurrence>>;
}

impl<E: RecurrenceRuleEngine + ?Sized> RecurrenceRuleEngine for &E {
    fn get_range(&self, event: &Event, window: &DateWindow) -> Result<Vec<NaiveDateTime>> {
        (**self).get_range(event, window)
    }

    fn remove_exclude_dates(&self, occurrences: &[Occurrence]) -> Result<Vec<Occurrence>> {
        (**self).remove_exclude_dates(occurrences)
    }
}

impl<E: RecurrenceRuleEngine + ?Sized> RecurrenceRuleEngine for Box<E> {
    fn get_range(&self, event: &Event, window: &DateWindow) -> Result<Vec<NaiveDateTime>> {
        (**self).get_range(event, window)
    }

    fn remove_exclude_dates(&self, occurrences: &[Occurrence]) -> Result<Vec<Occurrence>> {
        (**self).remove_exclude_dates(occurrences)
    }
}

// ── RRuleEngine ─────────────────────────────────────────────────────────────

/// Default ceiling on instances generated by one `get_range` call.
pub const DEFAULT_INSTANCE_LIMIT: u16 = 366;

/// [`RecurrenceRuleEngine`] backed by the `rrule` crate.
///
/// Wall-clock times are evaluated as floating UTC values, so a 09:00 series
/// stays at 09:00 on every instance. Each call stops after `instance_limit`
/// instances regardless of the rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RRuleEngine {
    pub instance_limit: u16,
}

impl Default for RRuleEngine {
    fn default() -> Self {
        Self {
            instance_limit: DEFAULT_INSTANCE_LIMIT,
        }
    }
}

impl RRuleEngine {
    pub fn new(instance_limit: u16) -> Self {
        Self { instance_limit }
    }
}

impl RecurrenceRuleEngine for RRuleEngine {
    fn get_range(&self, event: &Event, window: &DateWindow) -> Result<Vec<NaiveDateTime>> {
        let rule = event.rule().ok_or_else(|| {
            CalendarError::InvalidRule(format!("event '{}' has no recurrence rule", event.id))
        })?;
        let dtstart = event.naive_start()?;

        let text = format!(
            "DTSTART:{}Z\nRRULE:{}",
            dtstart.format("%Y%m%dT%H%M%S"),
            utc_until(strip_rrule_prefix(rule))
        );
        let set = text
            .parse::<RRuleSet>()
            .map_err(|e| CalendarError::InvalidRule(format!("'{rule}': {e}")))?;

        let tz = rrule::Tz::Tz(chrono_tz::UTC);
        let after = window.start.and_utc().with_timezone(&tz);
        let before = window.end.and_utc().with_timezone(&tz);
        let result = set.after(after).before(before).all(self.instance_limit);

        Ok(result
            .dates
            .into_iter()
            .map(|dt| dt.naive_utc())
            .filter(|t| window.contains(*t))
            .collect())
    }

    fn remove_exclude_dates(&self, occurrences: &[Occurrence]) -> Result<Vec<Occurrence>> {
        Ok(occurrences
            .iter()
            .filter(|occurrence| !is_excluded(occurrence))
            .cloned()
            .collect())
    }
}

/// Whether the occurrence's local date is one of its exclusion dates.
///
/// An unreadable exclusion date never matches.
fn is_excluded(occurrence: &Occurrence) -> bool {
    let day = occurrence.start.date();
    occurrence
        .exclude_dates
        .iter()
        .any(|excluded| match excluded.naive() {
            Ok(excluded) => excluded.date() == day,
            Err(e) => {
                tracing::warn!(event_id = %occurrence.id, error = %e, "Ignoring unreadable exclude date");
                false
            }
        })
}

/// Rewrite a floating or date-only `UNTIL` into the UTC form `DTSTART` uses.
///
/// Wall-clock times are evaluated as floating UTC, so a floating `UNTIL`
/// keeps its reading. A bare date bounds the whole day.
fn utc_until(rule: &str) -> String {
    rule.split(';')
        .map(|part| match part.split_once('=') {
            Some((key, value)) if key.trim().eq_ignore_ascii_case("UNTIL") => {
                match floating_until(value) {
                    Some(until) => format!("UNTIL={}", format_until(until.and_utc())),
                    None => part.to_string(),
                }
            }
            _ => part.to_string(),
        })
        .collect::<Vec<_>>()
        .join(";")
}

fn floating_until(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim().to_ascii_uppercase();
    if value.ends_with('Z') {
        return None;
    }
    NaiveDateTime::parse_from_str(&value, "%Y%m%dT%H%M%S")
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(&value, "%Y%m%d")
                .ok()
                .and_then(|d| d.and_hms_opt(23, 59, 59))
        })
}

fn strip_rrule_prefix(rule: &str) -> &str {
    match rule.get(..6) {
        Some(prefix) if prefix.eq_ignore_ascii_case("RRULE:") => &rule[6..],
        _ => rule,
    }
}
