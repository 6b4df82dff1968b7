//! Time-slot conflict checking.
//!
//! Decides whether a proposed `[start, end)` slot is free against a set of
//! committed booking intervals. Adjacent intervals (one ends exactly when the
//! other starts) are NOT conflicts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::event::validate_range;
use crate::interval::BookingInterval;

/// Outcome of an availability check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Availability {
    pub available: bool,
    /// The first interval (in input order) that overlaps the proposal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conflict: Option<BookingInterval>,
}

impl Availability {
    pub fn free() -> Self {
        Self {
            available: true,
            conflict: None,
        }
    }

    pub fn taken(conflict: BookingInterval) -> Self {
        Self {
            available: false,
            conflict: Some(conflict),
        }
    }

    /// Human-readable reason for refusing the slot, naming the conflicting
    /// record and its time range.
    pub fn describe(&self) -> Option<String> {
        self.conflict.as_ref().map(|c| {
            format!(
                "conflicts with {} ({} - {})",
                c.title.as_deref().unwrap_or(&c.source_id),
                c.start.to_rfc3339(),
                c.end.to_rfc3339()
            )
        })
    }
}

/// What an availability check ignores.
///
/// `id` drops the single record being edited (matched on `source_id`);
/// `series` drops a whole series being rescheduled, parent row and instances.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Exclude<'a> {
    pub id: Option<&'a str>,
    pub series: Option<&'a str>,
}

impl<'a> Exclude<'a> {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn by_id(id: &'a str) -> Self {
        Self {
            id: Some(id),
            series: None,
        }
    }

    pub fn by_series(series_id: &'a str) -> Self {
        Self {
            id: None,
            series: Some(series_id),
        }
    }

    pub fn skips(&self, interval: &BookingInterval) -> bool {
        self.id.is_some_and(|id| interval.source_id == id)
            || self.series.is_some_and(|series| interval.in_series(series))
    }
}

impl<'a> From<Option<&'a str>> for Exclude<'a> {
    fn from(id: Option<&'a str>) -> Self {
        Self { id, series: None }
    }
}

/// Check `[start, end)` against `existing` and report the first overlap.
///
/// The interval whose `source_id` equals `exclude_id` is ignored so a record
/// being edited does not conflict with itself. Other occurrences of the same
/// series still count; see [`check_availability_excluding`] to drop a whole
/// series. The caller is responsible for scoping `existing` to the right owner
/// and for ordering it (typically chronologically) so the reported conflict is
/// predictable.
///
/// Assumes `start < end`; see [`check_availability_checked`].
pub fn check_availability(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    existing: &[BookingInterval],
    exclude_id: Option<&str>,
) -> Availability {
    check_availability_excluding(start, end, existing, Exclude::from(exclude_id))
}

/// [`check_availability`] with an explicit [`Exclude`].
pub fn check_availability_excluding(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    existing: &[BookingInterval],
    exclude: Exclude<'_>,
) -> Availability {
    existing
        .iter()
        .filter(|interval| !exclude.skips(interval))
        .find(|interval| interval.overlaps(start, end))
        .cloned()
        .map_or_else(Availability::free, Availability::taken)
}

/// [`check_availability`] with the `start < end` precondition enforced.
///
/// # Errors
/// Returns `BookingError::Validation` when `end <= start`.
pub fn check_availability_checked(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    existing: &[BookingInterval],
    exclude_id: Option<&str>,
) -> Result<Availability> {
    validate_range(start, end)?;
    Ok(check_availability(start, end, existing, exclude_id))
}

/// Every interval that overlaps `[start, end)`, in input order.
pub fn find_conflicts<'a>(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    existing: &'a [BookingInterval],
    exclude: Exclude<'_>,
) -> Vec<&'a BookingInterval> {
    existing
        .iter()
        .filter(|interval| !exclude.skips(interval))
        .filter(|interval| interval.overlaps(start, end))
        .collect()
}
