//! Calendar records: persisted events, booking requests, and occurrences.
//!
//! An [`Event`] is a persisted row. When it carries a recurrence pattern it is
//! a *parent* and anchors the first occurrence of a series; the remaining
//! occurrences are [`EventOccurrence`]s with `is_virtual_instance = true`,
//! computed on every read and never stored.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{BookingError, Result};
use crate::recurrence::RecurrenceRule;

/// Individual appointment vs. group session.
///
/// A row is exactly one of these; the two field sets can never be mixed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    Individual {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        client_name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        client_phone: Option<String>,
    },
    Group {
        max_participants: u32,
        #[serde(default)]
        participants: Vec<String>,
    },
}

impl Default for EventKind {
    fn default() -> Self {
        Self::Individual {
            client_name: None,
            client_phone: None,
        }
    }
}

/// A persisted calendar event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    #[serde(default)]
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default)]
    pub kind: EventKind,
    /// Recurrence pattern (`"weekly"`, `"every 2 weeks"`, `"FREQ=MONTHLY"`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<String>,
    /// Last instant at which an instance of the series may start.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeat_until: Option<DateTime<Utc>>,
    /// Set on a materialized instance row: the series it was promoted from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_event_id: Option<String>,
    /// Dates (in the calendar's timezone) removed from the series.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub excluded_dates: BTreeSet<NaiveDate>,
}

impl Event {
    /// A non-recurring individual event.
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            start,
            end,
            kind: EventKind::default(),
            recurrence: None,
            repeat_until: None,
            parent_event_id: None,
            excluded_dates: BTreeSet::new(),
        }
    }

    /// Check the row's invariants.
    ///
    /// # Errors
    /// Returns `BookingError::Validation` for an empty id, `end <= start`, or a
    /// group session with zero capacity or more participants than seats.
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(BookingError::Validation("event id is empty".to_string()));
        }
        if self.end <= self.start {
            return Err(BookingError::Validation(format!(
                "event '{}' ends at or before its start",
                self.id
            )));
        }
        if let EventKind::Group {
            max_participants,
            participants,
        } = &self.kind
        {
            if *max_participants == 0 {
                return Err(BookingError::Validation(format!(
                    "group event '{}' has no seats",
                    self.id
                )));
            }
            if participants.len() > *max_participants as usize {
                return Err(BookingError::Validation(format!(
                    "group event '{}' has {} participants for {} seats",
                    self.id,
                    participants.len(),
                    max_participants
                )));
            }
        }
        Ok(())
    }

    /// A parent row defines a series; materialized instances never do.
    pub fn is_recurring(&self) -> bool {
        self.parent_event_id.is_none()
            && self
                .recurrence
                .as_deref()
                .is_some_and(|r| !r.trim().is_empty())
    }

    /// Parse the recurrence pattern, if this row is a series parent.
    pub fn recurrence_rule(&self) -> Option<Result<RecurrenceRule>> {
        if !self.is_recurring() {
            return None;
        }
        self.recurrence.as_deref().map(RecurrenceRule::parse)
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// The generator's view of this row.
    pub fn as_parent(&self) -> ParentEvent {
        ParentEvent {
            id: self.id.clone(),
            start: self.start,
            end: self.end,
            excluded_dates: self.excluded_dates.clone(),
        }
    }
}

/// The minimal view of a parent event that instance generation needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentEvent {
    pub id: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default)]
    pub excluded_dates: BTreeSet<NaiveDate>,
}

/// A concrete occurrence, either a persisted row or a virtual instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventOccurrence {
    pub id: String,
    pub parent_event_id: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub is_virtual_instance: bool,
    pub instance_date: NaiveDate,
}

impl EventOccurrence {
    /// The occurrence a persisted row stands for.
    pub fn persisted(event: &Event, instance_date: NaiveDate) -> Self {
        Self {
            id: event.id.clone(),
            parent_event_id: event.parent_event_id.clone(),
            start: event.start,
            end: event.end,
            is_virtual_instance: false,
            instance_date,
        }
    }

    /// The series this occurrence belongs to, if any.
    pub fn series_id(&self) -> Option<&str> {
        self.parent_event_id.as_deref()
    }
}

/// Identifier of a virtual instance: `"{parent_id}_{YYYY-MM-DD}"`.
///
/// A pure function of the parent id and instance date, so recomputing a series
/// always hands out the same ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId {
    pub parent_id: String,
    pub date: NaiveDate,
}

impl InstanceId {
    pub fn new(parent_id: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            parent_id: parent_id.into(),
            date,
        }
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.parent_id, self.date.format("%Y-%m-%d"))
    }
}

impl FromStr for InstanceId {
    type Err = BookingError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || BookingError::Validation(format!("'{}' is not an instance id", s));
        let (parent_id, date) = s.rsplit_once('_').ok_or_else(invalid)?;
        if parent_id.is_empty() {
            return Err(invalid());
        }
        let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|_| invalid())?;
        Ok(Self::new(parent_id, date))
    }
}

/// Lifecycle state of a public booking request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
    Cancelled,
}

/// A booking request submitted through a public booking page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingRequest {
    pub id: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub status: BookingStatus,
}

impl BookingRequest {
    /// Only approved requests occupy calendar time.
    pub fn is_committed(&self) -> bool {
        self.status == BookingStatus::Approved
    }
}

/// Reject empty or inverted `[start, end)` ranges.
///
/// # Errors
/// Returns `BookingError::Validation` when `end <= start`.
pub fn validate_range(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<()> {
    if end <= start {
        return Err(BookingError::Validation(format!(
            "end {} is not after start {}",
            end.to_rfc3339(),
            start.to_rfc3339()
        )));
    }
    Ok(())
}
