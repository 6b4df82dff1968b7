//! # booking-engine
//!
//! Recurring event expansion and time-slot conflict checking for booking calendars.
//!
//! The engine is pure interval math: it never talks to storage. Callers fetch
//! the rows for an owner, hand them over, and render or validate against the
//! results.
//!
//! ## Modules
//!
//! - [`recurrence`] -- recurrence patterns → validated `RecurrenceRule`
//! - [`generator`] -- parent event + rule → virtual instances up to a boundary
//! - [`conflict`] -- is a proposed `[start, end)` slot free?
//! - [`interval`] -- booking intervals and half-open overlap
//! - [`slots`] -- free gaps between committed intervals
//! - [`calendar`] -- in-memory store tying the above together
//! - [`cache`] -- explicit cache of expanded series
//! - [`event`] -- events, occurrences, booking requests
//! - [`time`] -- DST policy, timestamp parsing, calendar-year windows
//! - [`error`] -- Error types

pub mod cache;
pub mod calendar;
pub mod conflict;
pub mod error;
pub mod event;
pub mod generator;
pub mod interval;
pub mod recurrence;
pub mod slots;
pub mod time;

pub use calendar::{Calendar, CalendarFile, DeleteOutcome, DeleteScope};
pub use conflict::{
    check_availability, check_availability_checked, check_availability_excluding, Availability,
    Exclude,
};
pub use error::BookingError;
pub use event::{BookingRequest, BookingStatus, Event, EventKind, EventOccurrence, InstanceId, ParentEvent};
pub use generator::{
    generate_instances, generate_instances_between, generate_instances_with, GeneratorOptions,
};
pub use interval::{BookingInterval, SourceType};
pub use recurrence::{Frequency, RecurrenceRule};
pub use slots::{find_free_slots, FreeSlot};
pub use time::DstPolicy;
