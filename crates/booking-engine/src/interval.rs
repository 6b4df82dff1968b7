//! Booking intervals -- the reduced `[start, end)` view of anything that
//! occupies calendar time, used only for conflict checks and free-slot search.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::event::{BookingRequest, EventOccurrence};

/// Where a booking interval came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Event,
    BookingRequest,
}

/// A committed, calendar-occupying interval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingInterval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub source_id: String,
    pub source_type: SourceType,
    /// Series the source belongs to, for virtual and materialized instances.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    /// Display title, so a conflict can name what is in the way.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl BookingInterval {
    pub fn new(
        source_id: impl Into<String>,
        source_type: SourceType,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Self {
        Self {
            start,
            end,
            source_id: source_id.into(),
            source_type,
            parent_id: None,
            title: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Reduce an event occurrence.
    pub fn from_occurrence(occurrence: &EventOccurrence, title: Option<&str>) -> Self {
        Self {
            start: occurrence.start,
            end: occurrence.end,
            source_id: occurrence.id.clone(),
            source_type: SourceType::Event,
            parent_id: occurrence.parent_event_id.clone(),
            title: title.filter(|t| !t.is_empty()).map(str::to_string),
        }
    }

    /// Reduce a booking request; `None` unless it is approved.
    pub fn from_booking(booking: &BookingRequest) -> Option<Self> {
        booking.is_committed().then(|| Self {
            start: booking.start,
            end: booking.end,
            source_id: booking.id.clone(),
            source_type: SourceType::BookingRequest,
            parent_id: None,
            title: booking.title.clone(),
        })
    }

    /// Half-open overlap: touching endpoints do not overlap.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        overlaps(self.start, self.end, start, end)
    }

    /// Minutes shared with `[start, end)`, or 0 when they do not overlap.
    pub fn overlap_minutes(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
        if !self.overlaps(start, end) {
            return 0;
        }
        (self.end.min(end) - self.start.max(start)).num_minutes()
    }

    /// Whether this interval is the series parent `series_id` or one of its instances.
    pub fn in_series(&self, series_id: &str) -> bool {
        self.source_id == series_id || self.parent_id.as_deref() == Some(series_id)
    }
}

/// Two half-open intervals `[a_start, a_end)` and `[b_start, b_end)` overlap
/// iff `a_start < b_end && b_start < a_end`.
pub fn overlaps(
    a_start: DateTime<Utc>,
    a_end: DateTime<Utc>,
    b_start: DateTime<Utc>,
    b_end: DateTime<Utc>,
) -> bool {
    a_start < b_end && b_start < a_end
}

/// Reduce occurrences and approved bookings to intervals, sorted by
/// `(start, end, source_id)` so that "first conflict" is deterministic.
///
/// `title_of` looks up the display title for an occurrence.
pub fn collect_intervals<'a, F>(
    occurrences: &[EventOccurrence],
    bookings: &[BookingRequest],
    title_of: F,
) -> Vec<BookingInterval>
where
    F: Fn(&EventOccurrence) -> Option<&'a str>,
{
    let mut intervals: Vec<BookingInterval> = occurrences
        .iter()
        .map(|occ| BookingInterval::from_occurrence(occ, title_of(occ)))
        .chain(bookings.iter().filter_map(BookingInterval::from_booking))
        .collect();

    intervals.sort_by(|a, b| {
        (a.start, a.end, &a.source_id).cmp(&(b.start, b.end, &b.source_id))
    });
    intervals
}
