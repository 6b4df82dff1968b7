//! In-memory calendar store.
//!
//! Holds persisted events, renders them (with virtual instances) into a window,
//! applies the "this instance" / "whole series" delete semantics, and answers
//! availability questions for create/update flows. Fetching rows from storage
//! and scoping them to an owner is the caller's job.

use std::collections::BTreeMap;

use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::cache::{CacheKey, InstanceCache, Lookup};
use crate::conflict::{self, Availability, Exclude};
use crate::error::{BookingError, Result};
use crate::event::{validate_range, BookingRequest, Event, EventOccurrence, InstanceId};
use crate::generator::{generate_instances_between, GeneratorOptions};
use crate::interval::{collect_intervals, overlaps, BookingInterval};
use crate::recurrence::RecurrenceRule;
use crate::slots::{self, FreeSlot};
use crate::time::{local_date, year_window};

/// What a delete applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteScope {
    /// Only the addressed occurrence.
    Instance,
    /// The parent row and every materialized instance of it.
    Series,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// Rows removed from the store.
    Removed { ids: Vec<String> },
    /// A date added to the parent's exception list.
    Excluded { parent_id: String, date: NaiveDate },
}

/// On-disk / over-the-wire shape of a calendar: rows plus booking requests.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CalendarFile {
    #[serde(default)]
    pub events: Vec<Event>,
    #[serde(default)]
    pub bookings: Vec<BookingRequest>,
}

impl CalendarFile {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[derive(Debug, Default)]
pub struct Calendar {
    events: BTreeMap<String, Event>,
    options: GeneratorOptions,
    cache: InstanceCache,
}

impl Calendar {
    pub fn new(options: GeneratorOptions) -> Self {
        Self {
            events: BTreeMap::new(),
            options,
            cache: InstanceCache::new(),
        }
    }

    /// Build a calendar from rows, skipping (and logging) rows that fail validation.
    pub fn from_events(events: impl IntoIterator<Item = Event>, options: GeneratorOptions) -> Self {
        let mut calendar = Self::new(options);
        for event in events {
            let id = event.id.clone();
            if let Err(err) = calendar.upsert(event) {
                warn!(event_id = %id, error = %err, "skipping invalid event");
            }
        }
        calendar
    }

    pub fn options(&self) -> &GeneratorOptions {
        &self.options
    }

    pub fn get(&self, id: &str) -> Option<&Event> {
        self.events.get(id)
    }

    pub fn events(&self) -> impl Iterator<Item = &Event> {
        self.events.values()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn cache(&self) -> &InstanceCache {
        &self.cache
    }

    /// Insert or replace a row. Returns the previous version.
    ///
    /// # Errors
    /// Returns `BookingError::Validation` if the row is invalid; the store is unchanged.
    pub fn upsert(&mut self, event: Event) -> Result<Option<Event>> {
        event.validate()?;
        self.cache.invalidate(&event.id);
        Ok(self.events.insert(event.id.clone(), event))
    }

    /// Every occurrence overlapping `[window_start, window_end)`, sorted by `(start, id)`.
    ///
    /// Persisted rows appear as themselves; series parents are expanded. A
    /// malformed recurrence pattern renders the row as non-recurring, and an
    /// invalid row is left out; both are logged and never abort the render.
    pub fn occurrences(
        &mut self,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Vec<EventOccurrence> {
        self.collect_occurrences(window_start, window_end)
    }

    /// Delete a row or an occurrence.
    ///
    /// With [`DeleteScope::Instance`], a virtual instance id adds its date to the
    /// parent's exception list, a series parent hides its own first occurrence
    /// the same way, and any other row is removed. With [`DeleteScope::Series`],
    /// `id` may name the parent, a materialized instance, or a virtual instance;
    /// the parent and all its materialized rows are removed.
    ///
    /// # Errors
    /// Returns `BookingError::NotFound` if `id` addresses nothing in the store.
    pub fn delete(&mut self, id: &str, scope: DeleteScope) -> Result<DeleteOutcome> {
        match scope {
            DeleteScope::Series => {
                let series_id = self.resolve_series_id(id)?;
                let ids: Vec<String> = self
                    .events
                    .values()
                    .filter(|e| {
                        e.id == series_id
                            || e.parent_event_id.as_deref() == Some(series_id.as_str())
                    })
                    .map(|e| e.id.clone())
                    .collect();
                for removed in &ids {
                    self.events.remove(removed);
                    self.cache.invalidate(removed);
                }
                debug!(series_id = %series_id, removed = ids.len(), "deleted series");
                Ok(DeleteOutcome::Removed { ids })
            }
            DeleteScope::Instance => {
                if let Some(event) = self.events.get(id) {
                    if event.is_recurring() {
                        let date = local_date(event.start, self.options.timezone);
                        return self.exclude(id, date);
                    }
                    self.events.remove(id);
                    self.cache.invalidate(id);
                    return Ok(DeleteOutcome::Removed {
                        ids: vec![id.to_string()],
                    });
                }
                let instance: InstanceId = id
                    .parse()
                    .map_err(|_| BookingError::NotFound(id.to_string()))?;
                self.find_instance(&instance)?;
                self.exclude(&instance.parent_id, instance.date)
            }
        }
    }

    /// Recompute a single virtual instance of a series.
    ///
    /// # Errors
    /// Returns `BookingError::NotFound` if the parent does not exist, does not
    /// recur, or has no instance on that date (including excluded dates), and
    /// `BookingError::RecurrenceParse` if the parent's pattern is malformed.
    pub fn find_instance(&self, instance: &InstanceId) -> Result<EventOccurrence> {
        let not_found = || BookingError::NotFound(instance.to_string());
        let parent = self
            .events
            .get(&instance.parent_id)
            .filter(|e| e.is_recurring())
            .ok_or_else(not_found)?;
        let rule = parent.recurrence_rule().ok_or_else(not_found)??;

        // Two days either side of the date covers any UTC offset.
        let around = |d: Option<NaiveDate>| {
            d.map(|d| d.and_time(NaiveTime::MIN).and_utc())
                .ok_or_else(not_found)
        };
        let from = around(instance.date.checked_sub_days(Days::new(2)))?;
        let until = around(instance.date.checked_add_days(Days::new(2)))?;

        generate_instances_between(
            &parent.as_parent(),
            &rule,
            parent.repeat_until,
            from,
            until,
            &self.options,
        )?
        .into_iter()
        .find(|occ| occ.instance_date == instance.date)
        .ok_or_else(not_found)
    }

    /// Promote a virtual instance to a persisted row so it can be edited on its own.
    ///
    /// The new row keeps the instance id and points back at the parent; the
    /// parent stops generating that date.
    ///
    /// # Errors
    /// Returns `BookingError::NotFound` / `Validation` if `instance_id` does not
    /// address a live virtual instance.
    pub fn materialize_instance(&mut self, instance_id: &str) -> Result<Event> {
        let instance: InstanceId = instance_id.parse()?;
        let occurrence = self.find_instance(&instance)?;
        let parent = self
            .events
            .get(&instance.parent_id)
            .ok_or_else(|| BookingError::NotFound(instance.parent_id.clone()))?;

        let mut row = Event::new(
            occurrence.id,
            parent.title.clone(),
            occurrence.start,
            occurrence.end,
        );
        row.kind = parent.kind.clone();
        row.parent_event_id = Some(parent.id.clone());

        self.exclude(&instance.parent_id, instance.date)?;
        self.events.insert(row.id.clone(), row.clone());
        Ok(row)
    }

    /// Committed intervals (occurrences plus approved bookings) overlapping the window.
    pub fn committed_intervals(
        &mut self,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
        bookings: &[BookingRequest],
    ) -> Vec<BookingInterval> {
        let occurrences = self.collect_occurrences(window_start, window_end);

        let events = &self.events;
        let mut intervals = collect_intervals(&occurrences, bookings, |occ| {
            events
                .get(&occ.id)
                .or_else(|| occ.series_id().and_then(|p| events.get(p)))
                .map(|e| e.title.as_str())
        });
        intervals.retain(|i| i.overlaps(window_start, window_end));
        intervals
    }

    /// Is `[start, end)` free? `exclude_id` names the row or virtual instance
    /// being moved so it does not conflict with itself.
    ///
    /// # Errors
    /// Returns `BookingError::Validation` when `end <= start`.
    pub fn check_availability(
        &mut self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        bookings: &[BookingRequest],
        exclude_id: Option<&str>,
    ) -> Result<Availability> {
        self.check_availability_excluding(start, end, bookings, Exclude::from(exclude_id))
    }

    /// [`Calendar::check_availability`] with an explicit [`Exclude`], e.g. to
    /// reschedule a whole series.
    ///
    /// # Errors
    /// Returns `BookingError::Validation` when `end <= start`.
    pub fn check_availability_excluding(
        &mut self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        bookings: &[BookingRequest],
        exclude: Exclude<'_>,
    ) -> Result<Availability> {
        validate_range(start, end)?;
        let intervals = self.committed_intervals(start, end, bookings);
        Ok(conflict::check_availability_excluding(
            start, end, &intervals, exclude,
        ))
    }

    /// Free gaps in the window after events and approved bookings.
    pub fn free_slots(
        &mut self,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
        bookings: &[BookingRequest],
    ) -> Vec<FreeSlot> {
        let intervals = self.committed_intervals(window_start, window_end, bookings);
        slots::find_free_slots(&intervals, window_start, window_end)
    }

    fn collect_occurrences(
        &mut self,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Vec<EventOccurrence> {
        let Self {
            events,
            options,
            cache,
        } = self;
        let range = expansion_range(options.timezone, window_start, window_end);
        let mut out = Vec::new();

        for event in events.values() {
            if let Err(err) = event.validate() {
                warn!(event_id = %event.id, error = %err, "skipping invalid event");
                continue;
            }

            let own_date = local_date(event.start, options.timezone);
            let hidden = event.is_recurring() && event.excluded_dates.contains(&own_date);
            if !hidden && overlaps(event.start, event.end, window_start, window_end) {
                out.push(EventOccurrence::persisted(event, own_date));
            }

            let rule = match event.recurrence_rule() {
                None => continue,
                Some(Ok(rule)) => rule,
                Some(Err(err)) => {
                    warn!(event_id = %event.id, error = %err, "rendering event as non-recurring");
                    continue;
                }
            };
            match series_instances(cache, options, event, &rule, range) {
                Ok(instances) => out.extend(
                    instances
                        .into_iter()
                        .filter(|occ| overlaps(occ.start, occ.end, window_start, window_end)),
                ),
                Err(err) => {
                    warn!(event_id = %event.id, error = %err, "skipping series expansion");
                }
            }
        }

        out.sort_by(|a, b| (a.start, &a.id).cmp(&(b.start, &b.id)));
        out
    }

    fn resolve_series_id(&self, id: &str) -> Result<String> {
        if let Some(event) = self.events.get(id) {
            return Ok(event.parent_event_id.clone().unwrap_or_else(|| event.id.clone()));
        }
        id.parse::<InstanceId>()
            .ok()
            .filter(|instance| self.events.contains_key(&instance.parent_id))
            .map(|instance| instance.parent_id)
            .ok_or_else(|| BookingError::NotFound(id.to_string()))
    }

    fn exclude(&mut self, parent_id: &str, date: NaiveDate) -> Result<DeleteOutcome> {
        let parent = self
            .events
            .get_mut(parent_id)
            .ok_or_else(|| BookingError::NotFound(parent_id.to_string()))?;
        parent.excluded_dates.insert(date);
        self.cache.invalidate(parent_id);
        debug!(parent_id = %parent_id, %date, "excluded instance date");
        Ok(DeleteOutcome::Excluded {
            parent_id: parent_id.to_string(),
            date,
        })
    }
}

/// Series are expanded over whole calendar years around the requested window,
/// so sliding windows within a year share one cache entry per series.
fn expansion_range(
    tz: Tz,
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
) -> (DateTime<Utc>, DateTime<Utc>) {
    let (year_start, _) = year_window(window_start, tz);
    let (_, year_end) = year_window(window_end, tz);
    (year_start.min(window_start), year_end.max(window_end))
}

fn series_instances(
    cache: &mut InstanceCache,
    options: &GeneratorOptions,
    event: &Event,
    rule: &RecurrenceRule,
    (range_start, range_end): (DateTime<Utc>, DateTime<Utc>),
) -> Result<Vec<EventOccurrence>> {
    let key = CacheKey::new(event.id.as_str(), range_start, range_end);
    if let Lookup::Hit(instances) = cache.get(&key) {
        debug!(event_id = %event.id, "instance cache hit");
        return Ok(instances.to_vec());
    }

    let instances = generate_instances_between(
        &event.as_parent(),
        rule,
        event.repeat_until,
        range_start,
        range_end,
        options,
    )?;
    cache.insert(key, instances.clone());
    Ok(instances)
}
