//! Content store entries

use std::sync::Arc;

use crate::message::ContentObject;
use crate::time::SimTime;

/// A cache record wrapping one stored object plus usage and freshness state.
///
/// Entries live exactly once, inside the eviction list arena. Indices refer to
/// them by [`EntryHandle`](crate::EntryHandle).
#[derive(Debug, Clone)]
pub struct Entry {
    object: Arc<ContentObject>,
    use_count: u64,
    inserted_at: SimTime,
    last_refreshed_at: SimTime,
    fresh_until: Option<SimTime>,
    stale: bool,
}

impl Entry {
    /// Wrap `object`, computing its freshness deadline from the object's
    /// expiry time and recommended cache time, whichever comes first.
    pub fn new(object: Arc<ContentObject>, now: SimTime) -> Self {
        let by_rct = object.recommended_cache_time().map(|rct| now.adding(rct));
        let fresh_until = match (object.expiry_time(), by_rct) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };

        Self {
            object,
            use_count: 0,
            inserted_at: now,
            last_refreshed_at: now,
            fresh_until,
            stale: false,
        }
    }

    pub fn object(&self) -> &Arc<ContentObject> {
        &self.object
    }

    pub fn use_count(&self) -> u64 {
        self.use_count
    }

    pub fn inserted_at(&self) -> SimTime {
        self.inserted_at
    }

    pub fn last_refreshed_at(&self) -> SimTime {
        self.last_refreshed_at
    }

    pub fn fresh_until(&self) -> Option<SimTime> {
        self.fresh_until
    }

    /// Record a cache hit
    pub fn touch(&mut self, now: SimTime) {
        self.use_count += 1;
        self.last_refreshed_at = now;
    }

    pub fn mark_stale(&mut self) {
        self.stale = true;
    }

    pub fn is_stale(&self) -> bool {
        self.stale
    }

    pub fn is_expired(&self, now: SimTime) -> bool {
        self.fresh_until.is_some_and(|deadline| now >= deadline)
    }

    pub fn is_valid(&self, now: SimTime) -> bool {
        !(self.is_expired(now) || self.stale)
    }
}
