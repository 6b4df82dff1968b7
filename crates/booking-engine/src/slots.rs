//! Free slots between committed intervals, for public booking pages.
//!
//! Busy intervals are clipped to the window, sorted, and merged; the gaps
//! between merged periods are the free slots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::interval::BookingInterval;

/// A free time slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreeSlot {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub duration_minutes: i64,
}

impl FreeSlot {
    fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start,
            end,
            duration_minutes: (end - start).num_minutes(),
        }
    }
}

/// Merge overlapping or adjacent busy intervals, clipped to the window.
///
/// Returns a sorted, non-overlapping list of `(start, end)` pairs.
pub fn merge_busy(
    intervals: &[BookingInterval],
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
) -> Vec<(DateTime<Utc>, DateTime<Utc>)> {
    let mut clipped: Vec<(DateTime<Utc>, DateTime<Utc>)> = intervals
        .iter()
        .filter(|i| i.overlaps(window_start, window_end))
        .map(|i| (i.start.max(window_start), i.end.min(window_end)))
        .collect();
    clipped.sort_unstable();

    let mut merged: Vec<(DateTime<Utc>, DateTime<Utc>)> = Vec::with_capacity(clipped.len());
    for (start, end) in clipped {
        if let Some(last) = merged.last_mut() {
            if start <= last.1 {
                last.1 = last.1.max(end);
                continue;
            }
        }
        merged.push((start, end));
    }
    merged
}

/// Free slots inside `[window_start, window_end)`, sorted by start.
pub fn find_free_slots(
    intervals: &[BookingInterval],
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
) -> Vec<FreeSlot> {
    if window_start >= window_end {
        return Vec::new();
    }

    let mut free = Vec::new();
    let mut cursor = window_start;
    for (busy_start, busy_end) in merge_busy(intervals, window_start, window_end) {
        if cursor < busy_start {
            free.push(FreeSlot::new(cursor, busy_start));
        }
        cursor = cursor.max(busy_end);
    }
    if cursor < window_end {
        free.push(FreeSlot::new(cursor, window_end));
    }
    free
}

/// The first free slot of at least `min_duration_minutes`.
pub fn find_first_free_slot(
    intervals: &[BookingInterval],
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
    min_duration_minutes: i64,
) -> Option<FreeSlot> {
    find_free_slots(intervals, window_start, window_end)
        .into_iter()
        .find(|slot| slot.duration_minutes >= min_duration_minutes)
}
