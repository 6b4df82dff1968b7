//! Virtual instance generation -- expands a parent event into the concrete
//! occurrences of its series up to a boundary.
//!
//! Steps are taken in wall-clock time of a configurable IANA timezone, so a
//! weekly 09:00 meeting stays at 09:00 local across DST changes, while every
//! instance keeps the parent's exact duration. The parent's own occurrence is
//! the persisted row and is never emitted here.

use chrono::{DateTime, Days, NaiveDate, Utc};
use chrono_tz::Tz;
use tracing::{debug, warn};

use crate::error::Result;
use crate::event::{validate_range, EventOccurrence, InstanceId, ParentEvent};
use crate::recurrence::RecurrenceRule;
use crate::time::{local_date, resolve_local, DstPolicy};

/// Hard cap on recurrence steps per expansion, counted from the first step
/// that can reach the window.
pub const DEFAULT_MAX_INSTANCES: u32 = 1000;

/// Knobs for [`generate_instances_with`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeneratorOptions {
    /// Timezone whose wall clock the series follows.
    pub timezone: Tz,
    pub dst_policy: DstPolicy,
    /// Maximum number of recurrence steps taken per expansion before giving up.
    pub max_instances: u32,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            timezone: Tz::UTC,
            dst_policy: DstPolicy::default(),
            max_instances: DEFAULT_MAX_INSTANCES,
        }
    }
}

/// Generate the virtual instances of `parent` in UTC with default options.
///
/// See [`generate_instances_with`].
pub fn generate_instances(
    parent: &ParentEvent,
    rule: &RecurrenceRule,
    repeat_until: Option<DateTime<Utc>>,
    window_end: DateTime<Utc>,
) -> Result<Vec<EventOccurrence>> {
    generate_instances_with(
        parent,
        rule,
        repeat_until,
        window_end,
        &GeneratorOptions::default(),
    )
}

/// Generate the virtual instances of `parent`, in chronological order.
///
/// # Arguments
/// - `parent` -- the persisted series row; its duration is copied to every instance
/// - `rule` -- frequency and step
/// - `repeat_until` -- optional series end; instances may start exactly at it
/// - `window_end` -- rendering boundary; the effective bound is `min(window_end, repeat_until)`
/// - `options` -- timezone, DST policy and iteration cap
///
/// Dates listed in `parent.excluded_dates` are skipped. Identical inputs always
/// yield identical ids, since ids are derived from `(parent.id, instance_date)`.
///
/// # Errors
/// Returns `BookingError::Validation` if `parent.end <= parent.start`.
pub fn generate_instances_with(
    parent: &ParentEvent,
    rule: &RecurrenceRule,
    repeat_until: Option<DateTime<Utc>>,
    window_end: DateTime<Utc>,
    options: &GeneratorOptions,
) -> Result<Vec<EventOccurrence>> {
    expand(parent, rule, repeat_until, None, window_end, options)
}

/// Generate only the virtual instances of `parent` that overlap
/// `[window_start, window_end]`.
///
/// Expansion jumps straight to the steps near `window_start`, so a series
/// anchored years before the window is not cut short by the iteration cap.
/// Ids and dates are identical to those of [`generate_instances_with`].
///
/// # Errors
/// Returns `BookingError::Validation` if `parent.end <= parent.start`.
pub fn generate_instances_between(
    parent: &ParentEvent,
    rule: &RecurrenceRule,
    repeat_until: Option<DateTime<Utc>>,
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
    options: &GeneratorOptions,
) -> Result<Vec<EventOccurrence>> {
    expand(parent, rule, repeat_until, Some(window_start), window_end, options)
}

fn expand(
    parent: &ParentEvent,
    rule: &RecurrenceRule,
    repeat_until: Option<DateTime<Utc>>,
    window_start: Option<DateTime<Utc>>,
    window_end: DateTime<Utc>,
    options: &GeneratorOptions,
) -> Result<Vec<EventOccurrence>> {
    validate_range(parent.start, parent.end)?;

    let boundary = repeat_until.map_or(window_end, |until| until.min(window_end));
    let duration = parent.end - parent.start;

    let local_start = parent.start.with_timezone(&options.timezone).naive_local();
    let (anchor_date, anchor_time) = (local_start.date(), local_start.time());

    // Anything starting at or before `window_start - duration` ends before the
    // window. A day of slack covers the local/UTC date shift.
    let first_step = window_start.map_or(1, |ws| {
        let earliest = local_date(ws.checked_sub_signed(duration).unwrap_or(ws), options.timezone)
            .checked_sub_days(Days::new(1))
            .unwrap_or(NaiveDate::MIN);
        rule.steps_until(anchor_date, earliest).max(1)
    });

    let mut instances = Vec::new();
    let mut reached_boundary = false;

    for step in (first_step..).take(options.max_instances as usize) {
        let Some(date) = rule.advance(anchor_date, step) else {
            reached_boundary = true;
            break;
        };
        let Some(start) = resolve_local(
            options.timezone,
            date.and_time(anchor_time),
            options.dst_policy,
        ) else {
            // Falls in a DST gap under DstPolicy::Skip.
            continue;
        };
        if start > boundary {
            reached_boundary = true;
            break;
        }
        if parent.excluded_dates.contains(&date) {
            continue;
        }
        if window_start.is_some_and(|ws| start + duration <= ws) {
            continue;
        }

        instances.push(EventOccurrence {
            id: InstanceId::new(parent.id.as_str(), date).to_string(),
            parent_event_id: Some(parent.id.clone()),
            start,
            end: start + duration,
            is_virtual_instance: true,
            instance_date: date,
        });
    }

    if !reached_boundary {
        warn!(
            parent_id = %parent.id,
            max_instances = options.max_instances,
            "recurrence expansion stopped at the iteration cap before the window boundary"
        );
    }
    debug!(parent_id = %parent.id, rule = %rule, count = instances.len(), "expanded series");

    Ok(instances)
}
