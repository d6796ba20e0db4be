//! Error types for calendar-marks operations.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CalendarError {
    #[error("Invalid datetime: {0}")]
    InvalidDatetime(String),

    #[error("Invalid window: {0}")]
    InvalidWindow(String),

    #[error("Invalid RRULE: {0}")]
    InvalidRule(String),

    #[error("Recurrence engine error: {0}")]
    Engine(String),

    #[error("Exclusion error: {0}")]
    Exclusion(String),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, CalendarError>;
