//! The full normalize → expand → aggregate pass the calendar screen runs
//! whenever its events, visible tab or visible month change.
//!
//! Each run recomputes everything from its inputs; nothing is cached between
//! runs, so a stale result can simply be dropped by the caller.

use crate::config::CalendarConfig;
use crate::engine::{RRuleEngine, RecurrenceRuleEngine};
use crate::event::{Event, Occurrence};
use crate::expander::RecurrenceExpander;
use crate::marks::{aggregate, MarkedDateMap};
use crate::normalize::{normalize_times, LocalClock};
use crate::window::DateWindow;

#[derive(Debug, Clone)]
pub struct CalendarPipeline<E> {
    expander: RecurrenceExpander<E>,
}

impl CalendarPipeline<RRuleEngine> {
    /// A pipeline on the `rrule` engine with default limits.
    pub fn with_defaults() -> Self {
        Self::new(RRuleEngine::default(), CalendarConfig::default())
    }
}

impl<E: RecurrenceRuleEngine> CalendarPipeline<E> {
    pub fn new(engine: E, config: CalendarConfig) -> Self {
        Self {
            expander: RecurrenceExpander::new(engine, config),
        }
    }

    pub fn config(&self) -> &CalendarConfig {
        self.expander.config()
    }

    /// Normalized, expanded occurrences of `events` inside `window`.
    pub fn occurrences(
        &self,
        events: &[Event],
        window: &DateWindow,
        clock: &LocalClock,
    ) -> Vec<Occurrence> {
        let normalized = normalize_times(events, clock);
        self.expander.expand_window(&normalized, window, clock.now)
    }

    /// Per-day marks for `window`; empty when the calendar view is not active.
    pub fn run(
        &self,
        events: &[Event],
        window: &DateWindow,
        is_active_view: bool,
        clock: &LocalClock,
    ) -> MarkedDateMap {
        if !is_active_view {
            return MarkedDateMap::new();
        }
        let occurrences = self.occurrences(events, window, clock);
        aggregate(&occurrences, is_active_view, self.config())
    }

    /// [`CalendarPipeline::run`] for the month containing `month`
    /// (`YYYY-MM` or `YYYY-MM-DD`). An unreadable month yields an empty map.
    pub fn run_for_month(
        &self,
        events: &[Event],
        month: &str,
        is_active_view: bool,
        clock: &LocalClock,
    ) -> MarkedDateMap {
        match DateWindow::for_month(month) {
            Ok(window) => self.run(events, &window, is_active_view, clock),
            Err(e) => {
                tracing::error!(month, error = %e, "Cannot build calendar window");
                MarkedDateMap::new()
            }
        }
    }
}
