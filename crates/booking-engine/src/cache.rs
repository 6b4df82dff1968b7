//! Explicit cache for expanded series.
//!
//! Keyed by `(event_id, window_start, window_end)` of the expanded range. The
//! calendar normalises ranges to whole calendar years, so the number of keys
//! per event stays small. Mutating an event must be followed by
//! [`InstanceCache::invalidate`] for that event; nothing here is global.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::event::EventOccurrence;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub event_id: String,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
}

impl CacheKey {
    pub fn new(
        event_id: impl Into<String>,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Self {
        Self {
            event_id: event_id.into(),
            window_start,
            window_end,
        }
    }
}

/// Result of a cache lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<'a> {
    Hit(&'a [EventOccurrence]),
    Miss,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
}

#[derive(Debug, Default)]
pub struct InstanceCache {
    entries: HashMap<CacheKey, Vec<EventOccurrence>>,
    stats: CacheStats,
}

impl InstanceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&mut self, key: &CacheKey) -> Lookup<'_> {
        match self.entries.get(key) {
            Some(instances) => {
                self.stats.hits += 1;
                Lookup::Hit(instances)
            }
            None => {
                self.stats.misses += 1;
                Lookup::Miss
            }
        }
    }

    pub fn insert(&mut self, key: CacheKey, instances: Vec<EventOccurrence>) {
        self.entries.insert(key, instances);
    }

    /// Drop every cached window of `event_id`. Returns how many entries went.
    pub fn invalidate(&mut self, event_id: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, _| key.event_id != event_id);
        before - self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }
}
