//! Error types for booking-engine operations.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BookingError {
    /// The recurrence pattern is malformed or uses a feature we cannot honour.
    /// Callers rendering a calendar treat this as "the event does not recur".
    #[error("Invalid recurrence rule: {0}")]
    RecurrenceParse(String),

    /// A precondition on an event or interval was violated (e.g. `end <= start`).
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, BookingError>;
