//! Tunable limits and presentation settings for the calendar pipeline.
//!
//! Every cap that bounds expansion work lives here, together with the marker
//! colour handed to the calendar widget. The defaults reproduce the limits the
//! mobile calendar screen ships with; callers override individual fields from
//! JSON (missing keys fall back to the defaults).

use serde::{Deserialize, Serialize};

use crate::error::{CalendarError, Result};

/// Marker colour used for every dot unless configured otherwise.
pub const DEFAULT_MARKER_COLOR: &str = "#0D47A1";

/// Which events survive the `max_events` cap when the input is longer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TruncationOrder {
    /// Keep the first `max_events` events exactly as supplied.
    #[default]
    InputOrder,
    /// Non-recurring events first, then recurring ones, each group in input order.
    NonRecurringFirst,
    /// Earliest start first; events whose start cannot be read sort last.
    SoonestFirst,
}

/// Configuration for normalization, expansion and aggregation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CalendarConfig {
    /// Colour of the dot emitted for each marked occurrence.
    pub marker_color: String,
    /// Input events considered by the expander.
    pub max_events: usize,
    /// Candidate count above which a rule is treated as pathological.
    pub max_candidates: usize,
    /// Candidates kept per recurring event.
    pub max_instances_per_event: usize,
    /// Hard cap on occurrences produced across all events.
    pub max_total_occurrences: usize,
    /// Occurrences considered by the mark aggregator.
    pub max_marked_occurrences: usize,
    /// Distinct `BY*` parts allowed before a rule is collapsed to one instance.
    pub max_rule_components: usize,
    /// Horizon of the `UNTIL` bound added to open-ended rules.
    pub default_until_days: i64,
    /// Engine calls slower than this are logged.
    pub slow_rule_warn_ms: u64,
    /// Drop events that cannot touch the window before applying `max_events`.
    pub prefilter_relevant: bool,
    pub truncation_order: TruncationOrder,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            marker_color: DEFAULT_MARKER_COLOR.to_string(),
            max_events: 30,
            max_candidates: 50,
            max_instances_per_event: 15,
            max_total_occurrences: 100,
            max_marked_occurrences: 30,
            max_rule_components: 3,
            default_until_days: 90,
            slow_rule_warn_ms: 100,
            prefilter_relevant: false,
            truncation_order: TruncationOrder::InputOrder,
        }
    }
}

impl CalendarConfig {
    /// Parse a JSON document, filling absent keys from [`CalendarConfig::default`].
    ///
    /// # Errors
    ///
    /// Returns [`CalendarError::InvalidConfig`] if the document is not valid JSON
    /// for this shape or fails [`CalendarConfig::validate`].
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| CalendarError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would make the pipeline produce nothing useful.
    pub fn validate(&self) -> Result<()> {
        if self.marker_color.trim().is_empty() {
            return Err(CalendarError::InvalidConfig(
                "markerColor must not be empty".to_string(),
            ));
        }
        if self.max_events == 0 {
            return Err(CalendarError::InvalidConfig(
                "maxEvents must be at least 1".to_string(),
            ));
        }
        if self.default_until_days <= 0 {
            return Err(CalendarError::InvalidConfig(format!(
                "defaultUntilDays must be positive, got {}",
                self.default_until_days
            )));
        }
        Ok(())
    }
}
