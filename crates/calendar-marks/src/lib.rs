//! # calendar-marks
//!
//! Recurring-event expansion and per-day calendar aggregation.
//!
//! Given event definitions (some with recurrence rules) and a visible date
//! window, calendar-marks computes the concrete occurrences inside the window,
//! drops excluded dates, and indexes the result by local calendar day for a
//! calendar widget. Every stage is bounded against pathological rules and
//! degrades to fewer results instead of failing.
//!
//! ## Modules
//!
//! - [`event`] — Event records, event times, and derived occurrences
//! - [`normalize`] — Shift UTC event times to local wall-clock time
//! - [`guard`] — Screen recurrence rules before expansion
//! - [`engine`] — Recurrence-rule evaluator seam and the `rrule`-backed default
//! - [`window`] — Visible date windows, including whole months
//! - [`relevance`] — Optional pre-filter for events that cannot touch a window
//! - [`expander`] — Bounded, failure-isolated recurrence expansion
//! - [`marks`] — Date-keyed marks for the calendar widget
//! - [`pipeline`] — normalize → expand → aggregate in one call
//! - [`config`] — Caps and presentation settings
//! - [`error`] — Error types

pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod expander;
pub mod guard;
pub mod marks;
pub mod normalize;
pub mod pipeline;
pub mod relevance;
pub mod window;

pub use config::{CalendarConfig, TruncationOrder, DEFAULT_MARKER_COLOR};
pub use engine::{RRuleEngine, RecurrenceRuleEngine};
pub use error::CalendarError;
pub use event::{Event, EventTime, Occurrence};
pub use expander::RecurrenceExpander;
pub use guard::{guard, guard_with_config, GuardDecision, GuardReason};
pub use marks::{aggregate, try_aggregate, DayMarks, Dot, MarkedDateMap};
pub use normalize::{normalize_event, normalize_times, LocalClock};
pub use pipeline::CalendarPipeline;
pub use relevance::{filter_relevant, is_relevant};
pub use window::DateWindow;
