//! Screen recurrence rules before they reach the recurrence engine.
//!
//! The rule grammar allows combinations that are ambiguous, unstable in the
//! engine, or unbounded. Rather than trusting the rule author, the guard
//! inspects the rule's `KEY=VALUE` parts and either collapses the event to its
//! own single instance or bounds the rule so expansion terminates.
//!
//! Checks run in a fixed order, case-insensitively:
//!
//! 1. `FREQ=DAILY` with `BYDAY` → single
//! 2. `FREQ=DAILY` with `BYSETPOS` → single
//! 3. more than `max_rule_components` distinct `BY*` parts → single
//! 4. neither `UNTIL` nor `COUNT` → expand with `UNTIL` appended
//! 5. otherwise → expand unchanged

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::CalendarConfig;

/// Why a rule was collapsed to a single occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "reason", content = "components")]
pub enum GuardReason {
    /// Daily frequency combined with a weekday filter.
    DailyByDay,
    /// Daily frequency combined with a set-position filter.
    DailyBySetPos,
    /// Too many distinct `BY*` parts; carries the count found.
    TooComplex(usize),
}

/// What the expander should do with a rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "action")]
pub enum GuardDecision {
    /// Emit the event's own start/end once, without consulting the engine.
    Single(GuardReason),
    /// Hand the rule to the engine; `adjusted_rule` replaces it when present.
    #[serde(rename_all = "camelCase")]
    Expand { adjusted_rule: Option<String> },
}

impl GuardDecision {
    pub fn is_single(&self) -> bool {
        matches!(self, GuardDecision::Single(_))
    }
}

/// Screen `rule` with the default limits.
///
/// # Examples
///
/// ```
/// use calendar_marks::{guard, GuardDecision};
/// use chrono::{TimeZone, Utc};
///
/// let now = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
/// assert!(guard("FREQ=DAILY;BYDAY=MO,WE,FR", now).is_single());
///
/// // Open-ended rules are bounded 90 days after `now`.
/// assert_eq!(
///     guard("FREQ=WEEKLY;BYDAY=MO", now),
///     GuardDecision::Expand {
///         adjusted_rule: Some("FREQ=WEEKLY;BYDAY=MO;UNTIL=20240530T000000Z".to_string()),
///     }
/// );
/// ```
pub fn guard(rule: &str, now: DateTime<Utc>) -> GuardDecision {
    guard_with_config(rule, now, &CalendarConfig::default())
}

/// Screen `rule` using the component cap and `UNTIL` horizon from `config`.
///
/// `now` anchors the appended `UNTIL` bound.
pub fn guard_with_config(rule: &str, now: DateTime<Utc>, config: &CalendarConfig) -> GuardDecision {
    let parts = RuleParts::parse(rule);
    let daily = parts.value("FREQ").is_some_and(|f| f == "DAILY");

    if daily && parts.has("BYDAY") {
        return GuardDecision::Single(GuardReason::DailyByDay);
    }
    if daily && parts.has("BYSETPOS") {
        return GuardDecision::Single(GuardReason::DailyBySetPos);
    }

    let by_components = parts.by_component_count();
    if by_components > config.max_rule_components {
        return GuardDecision::Single(GuardReason::TooComplex(by_components));
    }

    if !parts.has("UNTIL") && !parts.has("COUNT") {
        let until = now + chrono::Duration::days(config.default_until_days);
        return GuardDecision::Expand {
            adjusted_rule: Some(append_until(rule, until)),
        };
    }

    GuardDecision::Expand {
        adjusted_rule: None,
    }
}

/// Format an instant as an RFC 5545 UTC `UNTIL` value.
pub fn format_until(until: DateTime<Utc>) -> String {
    until.format("%Y%m%dT%H%M%SZ").to_string()
}

fn append_until(rule: &str, until: DateTime<Utc>) -> String {
    let body = rule.trim().trim_end_matches(';');
    format!("{body};UNTIL={}", format_until(until))
}

// ── Rule inspection ─────────────────────────────────────────────────────────

/// Upper-cased `KEY=VALUE` parts of a rule body.
///
/// This is only a scanner for the guard's checks; evaluating the rule is the
/// engine's job.
#[derive(Debug, Default)]
pub(crate) struct RuleParts {
    parts: Vec<(String, String)>,
}

impl RuleParts {
    pub(crate) fn parse(rule: &str) -> Self {
        let upper = rule.trim().to_ascii_uppercase();
        let body = upper.strip_prefix("RRULE:").unwrap_or(&upper);
        let parts = body
            .split(';')
            .filter_map(|part| part.split_once('='))
            .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
            .filter(|(key, _)| !key.is_empty())
            .collect();
        Self { parts }
    }

    pub(crate) fn has(&self, key: &str) -> bool {
        self.parts.iter().any(|(k, _)| k == key)
    }

    pub(crate) fn value(&self, key: &str) -> Option<&str> {
        self.parts
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    fn by_component_count(&self) -> usize {
        self.parts
            .iter()
            .filter(|(k, _)| k.starts_with("BY"))
            .map(|(k, _)| k.as_str())
            .collect::<BTreeSet<_>>()
            .len()
    }
}
