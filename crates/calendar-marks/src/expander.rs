//! Turn event definitions into the concrete occurrences inside a window.
//!
//! Expansion is bounded at every level, and a failure in one event never
//! affects another:
//!
//! - only the first `max_events` events are considered;
//! - each rule is screened by [`guard_with_config`] first;
//! - an engine error or panic degrades the event to its own single instance;
//! - more than `max_candidates` candidates degrades it the same way;
//! - at most `max_instances_per_event` candidates are kept per event;
//! - output stops growing at `max_total_occurrences`.
//!
//! Truncation is silent: callers see fewer occurrences, never an error.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::config::{CalendarConfig, TruncationOrder};
use crate::engine::RecurrenceRuleEngine;
use crate::error::{CalendarError, Result};
use crate::event::{Event, Occurrence};
use crate::guard::{guard_with_config, GuardDecision};
use crate::relevance::is_relevant;
use crate::window::DateWindow;

/// Expands events through a [`RecurrenceRuleEngine`] under the caps in a
/// [`CalendarConfig`].
#[derive(Debug, Clone)]
pub struct RecurrenceExpander<E> {
    engine: E,
    config: CalendarConfig,
}

impl<E: RecurrenceRuleEngine> RecurrenceExpander<E> {
    pub fn new(engine: E, config: CalendarConfig) -> Self {
        Self { engine, config }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn config(&self) -> &CalendarConfig {
        &self.config
    }

    /// Occurrences of `events` inside `[window_start, window_end]`.
    ///
    /// `now` anchors the `UNTIL` bound added to open-ended rules. Never fails:
    /// an invalid window yields an empty list.
    pub fn expand(
        &self,
        events: &[Event],
        window_start: NaiveDateTime,
        window_end: NaiveDateTime,
        now: DateTime<Utc>,
    ) -> Vec<Occurrence> {
        match self.try_expand(events, window_start, window_end, now) {
            Ok(occurrences) => occurrences,
            Err(e) => {
                tracing::error!(error = %e, "Event expansion failed, returning no occurrences");
                Vec::new()
            }
        }
    }

    /// Like [`RecurrenceExpander::expand`], but reports an invalid window.
    ///
    /// # Errors
    ///
    /// Returns [`CalendarError::InvalidWindow`] if `window_start > window_end`.
    /// Per-event failures are still absorbed.
    pub fn try_expand(
        &self,
        events: &[Event],
        window_start: NaiveDateTime,
        window_end: NaiveDateTime,
        now: DateTime<Utc>,
    ) -> Result<Vec<Occurrence>> {
        let window = DateWindow::new(window_start, window_end)?;
        Ok(self.expand_window(events, &window, now))
    }

    /// Occurrences of `events` inside an already validated window.
    pub fn expand_window(
        &self,
        events: &[Event],
        window: &DateWindow,
        now: DateTime<Utc>,
    ) -> Vec<Occurrence> {
        let selected = self.select(events, window);
        let mut occurrences = Vec::new();

        for event in selected {
            if let Err(e) = self.expand_event(event, window, now, &mut occurrences) {
                tracing::warn!(event_id = %event.id, error = %e, "Skipping event");
            }
        }

        tracing::debug!(
            events = events.len(),
            occurrences = occurrences.len(),
            "Expanded events"
        );
        occurrences
    }

    /// Apply the pre-filter, ordering and `max_events` cap.
    fn select<'a>(&self, events: &'a [Event], window: &DateWindow) -> Vec<&'a Event> {
        let mut selected: Vec<&Event> = if self.config.prefilter_relevant {
            events.iter().filter(|e| is_relevant(e, window)).collect()
        } else {
            events.iter().collect()
        };

        match self.config.truncation_order {
            TruncationOrder::InputOrder => {}
            TruncationOrder::NonRecurringFirst => selected.sort_by_key(|e| e.is_recurring()),
            TruncationOrder::SoonestFirst => selected.sort_by_key(|e| {
                let start = e.naive_start().ok();
                (start.is_none(), start)
            }),
        }

        if selected.len() > self.config.max_events {
            tracing::debug!(
                events = selected.len(),
                cap = self.config.max_events,
                "Event cap reached, ignoring the rest"
            );
            selected.truncate(self.config.max_events);
        }
        selected
    }

    fn expand_event(
        &self,
        event: &Event,
        window: &DateWindow,
        now: DateTime<Utc>,
        out: &mut Vec<Occurrence>,
    ) -> Result<()> {
        let Some(rule) = event.rule() else {
            let start = event.naive_start()?;
            if window.strictly_contains(start) {
                let end = event.naive_end().unwrap_or(start);
                self.push_capped(out, Occurrence::from_event(event, start, end));
            }
            return Ok(());
        };

        let start = event.naive_start()?;
        let end = event.naive_end()?;
        let single = Occurrence::from_event(event, start, end);

        let adjusted_rule = match guard_with_config(rule, now, &self.config) {
            GuardDecision::Single(reason) => {
                tracing::debug!(event_id = %event.id, rule, ?reason, "Rule collapsed to one instance");
                self.push_capped(out, single);
                return Ok(());
            }
            GuardDecision::Expand { adjusted_rule } => adjusted_rule,
        };

        let mut guarded = event.clone();
        if let Some(adjusted) = adjusted_rule {
            guarded.recurrence_rule = Some(adjusted);
        }

        let started = Instant::now();
        let result = contain_panic(|| self.engine.get_range(&guarded, window));
        self.note_duration(event, rule, started);

        let candidates = match result {
            Ok(candidates) => candidates,
            Err(e) => {
                tracing::warn!(event_id = %event.id, rule, error = %e, "Recurrence expansion failed, using single instance");
                self.push_capped(out, single);
                return Ok(());
            }
        };

        if candidates.len() > self.config.max_candidates {
            tracing::debug!(
                event_id = %event.id,
                rule,
                candidates = candidates.len(),
                "Too many candidates, using single instance"
            );
            self.push_capped(out, single);
            return Ok(());
        }
        if candidates.is_empty() {
            return Ok(());
        }

        let duration = end - start;
        for candidate in candidates
            .into_iter()
            .take(self.config.max_instances_per_event)
        {
            let Some(candidate_end) = candidate.checked_add_signed(duration) else {
                tracing::warn!(event_id = %event.id, %candidate, "Occurrence end out of range, skipping candidate");
                continue;
            };
            if !self.push_capped(out, Occurrence::from_event(event, candidate, candidate_end)) {
                break;
            }
        }

        match contain_panic(|| self.engine.remove_exclude_dates(out.as_slice())) {
            Ok(filtered) => *out = filtered,
            Err(e) => {
                tracing::warn!(event_id = %event.id, error = %e, "Exclusion filtering failed, keeping unfiltered occurrences");
            }
        }
        Ok(())
    }

    /// Push unless the global cap is reached; reports whether it pushed.
    fn push_capped(&self, out: &mut Vec<Occurrence>, occurrence: Occurrence) -> bool {
        if out.len() >= self.config.max_total_occurrences {
            tracing::debug!(
                event_id = %occurrence.id,
                cap = self.config.max_total_occurrences,
                "Occurrence cap reached"
            );
            return false;
        }
        out.push(occurrence);
        true
    }

    fn note_duration(&self, event: &Event, rule: &str, started: Instant) {
        let elapsed_ms = started.elapsed().as_millis();
        if elapsed_ms > u128::from(self.config.slow_rule_warn_ms) {
            tracing::warn!(
                event_id = %event.id,
                rule,
                elapsed_ms = elapsed_ms as u64,
                "Slow recurring event processing"
            );
        }
    }
}

/// Run an engine call, turning a panic into [`CalendarError::Engine`].
fn contain_panic<T>(call: impl FnOnce() -> Result<T>) -> Result<T> {
    panic::catch_unwind(AssertUnwindSafe(call))
        .unwrap_or_else(|payload| Err(CalendarError::Engine(panic_message(payload.as_ref()))))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        format!("engine panicked: {msg}")
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        format!("engine panicked: {msg}")
    } else {
        "engine panicked".to_string()
    }
}
