//! ContentStore: LRU content cache with four lookup indices
//!
//! The engine is driven by the service stage; every operation takes the
//! virtual time at which it takes effect.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::entry::Entry;
use crate::index::{AssumeKeyId, IndexSet, KeyIdPolicy};
use crate::lru::EvictionList;
use crate::message::{ContentHash, ContentObject, Interest};
use crate::stats::CacheStats;
use crate::time::SimTime;

/// Result of matching an interest against the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutcome {
    /// A valid entry matched
    Hit(Arc<ContentObject>),
    /// Nothing matched
    Miss,
    /// An entry matched but was expired or stale and has been removed
    Invalidated,
}

impl MatchOutcome {
    pub fn object(&self) -> Option<&Arc<ContentObject>> {
        match self {
            MatchOutcome::Hit(object) => Some(object),
            _ => None,
        }
    }

    pub fn is_hit(&self) -> bool {
        matches!(self, MatchOutcome::Hit(_))
    }
}

/// Content cache bounded by object count
pub struct ContentStore {
    /// Owns every entry, ordered for eviction
    lru: EvictionList,

    /// Handles into `lru`
    indices: IndexSet,

    stats: Arc<CacheStats>,

    capacity: usize,
}

impl ContentStore {
    /// Create a store holding at most `capacity` objects
    pub fn new(capacity: usize) -> Self {
        Self::with_keyid_policy(capacity, Box::new(AssumeKeyId))
    }

    pub fn with_keyid_policy(capacity: usize, policy: Box<dyn KeyIdPolicy>) -> Self {
        assert!(capacity > 0, "Capacity must be greater than 0");

        Self {
            lru: EvictionList::with_capacity(capacity),
            indices: IndexSet::with_capacity(capacity, policy),
            stats: Arc::new(CacheStats::new()),
            capacity,
        }
    }

    /// Match an interest using the single index its fields select.
    ///
    /// A hit on an expired or stale entry tears the entry down and is
    /// reported as [`MatchOutcome::Invalidated`]; the interest is not retried.
    pub(crate) fn lookup(&mut self, interest: &Interest, now: SimTime) -> MatchOutcome {
        let Some(handle) = self.indices.find(interest) else {
            debug!(name = ?interest.name().map(|n| n.to_string()), "no content in store for interest");
            self.stats.record_miss();
            return MatchOutcome::Miss;
        };

        let Some(entry) = self.lru.get_mut(handle) else {
            error!(?handle, "index refers to an entry missing from the eviction list");
            self.stats.record_consistency_fault();
            self.stats.record_miss();
            return MatchOutcome::Miss;
        };

        if entry.is_valid(now) {
            entry.touch(now);
            let object = Arc::clone(entry.object());
            self.lru.promote(handle);
            self.stats.record_hit();
            return MatchOutcome::Hit(object);
        }

        let object = Arc::clone(entry.object());
        info!(
            hash = %object.hash(),
            expired = entry.is_expired(now),
            stale = entry.is_stale(),
            "removing expired or stale content matching interest"
        );
        self.remove_object(&object);
        self.stats.record_invalidation();
        self.stats.record_miss();
        MatchOutcome::Invalidated
    }

    /// Cache `object`, evicting the least recently used entry when full.
    ///
    /// Returns false for an object already present (by hash) and when room
    /// could not be made. The eviction list insertion is not rolled back if
    /// indexing fails afterwards; `count()` reports the resulting mismatch.
    pub(crate) fn insert(&mut self, object: Arc<ContentObject>, now: SimTime) -> bool {
        if self.indices.contains_hash(&object.hash()) {
            debug!(hash = %object.hash(), "object already in store");
            self.stats.record_duplicate();
            return false;
        }

        if self.count() >= self.capacity && !self.evict_one() {
            return false;
        }

        let handle = self.lru.push_front(Entry::new(Arc::clone(&object), now));
        if !self.indices.insert(&object, handle) {
            warn!(hash = %object.hash(), "entry added to eviction list but indexing failed");
            return false;
        }

        self.stats.record_insert();
        true
    }

    fn evict_one(&mut self) -> bool {
        let Some(victim) = self.lru.peek_back().map(|e| Arc::clone(e.object())) else {
            error!(capacity = self.capacity, "store full but eviction list is empty");
            self.stats.record_consistency_fault();
            return false;
        };

        if !self.remove_object(&victim) {
            error!(hash = %victim.hash(), "LRU victim not found in indices; insertion abandoned");
            self.stats.record_consistency_fault();
            return false;
        }

        self.stats.record_eviction();
        true
    }

    /// Remove `object` from every index and from the eviction list.
    ///
    /// Returns false if the object was not indexed by hash, in which case
    /// the eviction list is left untouched.
    pub(crate) fn remove_object(&mut self, object: &ContentObject) -> bool {
        match self.indices.remove(object) {
            Some(handle) => {
                if self.lru.remove(handle).is_none() {
                    error!(hash = %object.hash(), "indexed entry missing from eviction list");
                    self.stats.record_consistency_fault();
                }
                true
            }
            None => false,
        }
    }

    /// Mark the entry for `hash` stale. It is removed by the next lookup
    /// that reaches it.
    pub fn mark_stale(&mut self, hash: &ContentHash) -> bool {
        let Some(handle) = self.indices.find_by_hash(hash) else {
            return false;
        };
        match self.lru.get_mut(handle) {
            Some(entry) => {
                entry.mark_stale();
                true
            }
            None => false,
        }
    }

    /// Inspect an entry without affecting LRU order or statistics
    pub fn peek(&self, hash: &ContentHash) -> Option<&Entry> {
        self.indices
            .find_by_hash(hash)
            .and_then(|handle| self.lru.get(handle))
    }

    /// Number of cached objects, counted on the eviction list.
    ///
    /// A disagreement with the hash index is logged and counted as a
    /// consistency fault.
    pub fn count(&self) -> usize {
        let listed = self.lru.len();
        let indexed = self.indices.hash_len();
        if listed != indexed {
            error!(
                lru_len = listed,
                hash_len = indexed,
                "eviction list and hash index sizes differ"
            );
            self.stats.record_consistency_fault();
        }
        listed
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn stats(&self) -> Arc<CacheStats> {
        Arc::clone(&self.stats)
    }

    /// Entries from most to least recently used
    pub fn entries(&self) -> impl Iterator<Item = &Entry> + '_ {
        self.lru.iter()
    }

    /// Drop every entry (statistics are kept)
    pub fn clear(&mut self) {
        self.lru.clear();
        self.indices.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::ExplicitKeyId;
    use crate::message::KeyId;
    use crate::name::Name;
    use std::time::Duration;

    fn name(uri: &str) -> Name {
        Name::from_uri(uri).unwrap()
    }

    fn object(uri: &str) -> Arc<ContentObject> {
        Arc::new(ContentObject::named(name(uri), uri.as_bytes().to_vec()))
    }

    fn t(nanos: u64) -> SimTime {
        SimTime::from_nanos(nanos)
    }

    fn assert_consistent(store: &ContentStore) {
        assert_eq!(store.lru.len(), store.indices.hash_len());
        assert!(store.lru.len() <= store.capacity());
    }

    #[test]
    fn test_insert_then_find_each() {
        let mut store = ContentStore::new(10);
        let objects: Vec<_> = (0..10).map(|i| object(&format!("ccnx:/obj/{}", i))).collect();

        for obj in &objects {
            assert!(store.insert(Arc::clone(obj), t(0)));
        }
        assert_eq!(store.count(), 10);

        for obj in &objects {
            let interest = Interest::new(obj.name().unwrap().clone());
            assert_eq!(store.lookup(&interest, t(1)), MatchOutcome::Hit(Arc::clone(obj)));
        }
        assert_consistent(&store);
        assert_eq!(store.stats().consistency_faults(), 0);
    }

    #[test]
    fn test_capacity_evicts_least_recently_used() {
        let mut store = ContentStore::new(2);
        let (a, b, c) = (object("ccnx:/a"), object("ccnx:/b"), object("ccnx:/c"));

        store.insert(Arc::clone(&a), t(0));
        store.insert(Arc::clone(&b), t(1));
        store.insert(Arc::clone(&c), t(2)); // Should evict a

        assert_eq!(store.count(), 2);
        assert!(store.peek(&a.hash()).is_none());
        assert!(store.peek(&b.hash()).is_some());
        assert!(store.peek(&c.hash()).is_some());
        assert_eq!(store.stats().evictions(), 1);
        assert_consistent(&store);
    }

    #[test]
    fn test_hit_promotes_and_counts_use() {
        let mut store = ContentStore::new(2);
        let (a, b, c) = (object("ccnx:/a"), object("ccnx:/b"), object("ccnx:/c"));

        store.insert(Arc::clone(&a), t(0));
        store.insert(Arc::clone(&b), t(1));

        let outcome = store.lookup(&Interest::new(name("ccnx:/a")), t(2));
        assert!(outcome.is_hit());
        assert_eq!(store.peek(&a.hash()).unwrap().use_count(), 1);
        assert_eq!(store.peek(&a.hash()).unwrap().last_refreshed_at(), t(2));

        store.insert(Arc::clone(&c), t(3)); // Should evict b, not a

        assert!(store.peek(&a.hash()).is_some());
        assert!(store.peek(&b.hash()).is_none());
    }

    #[test]
    fn test_miss_leaves_count_unchanged() {
        let mut store = ContentStore::new(4);
        store.insert(object("ccnx:/a"), t(0));

        let outcome = store.lookup(&Interest::new(name("ccnx:/nope")), t(1));

        assert_eq!(outcome, MatchOutcome::Miss);
        assert_eq!(store.count(), 1);
        assert_eq!(store.stats().misses(), 1);
    }

    #[test]
    fn test_expired_entry_removed_on_lookup() {
        let mut store = ContentStore::new(4);
        let fresh = object("ccnx:/fresh");
        let expiring = Arc::new(
            ContentObject::named(name("ccnx:/old"), b"x".to_vec())
                .with_recommended_cache_time(Duration::from_nanos(100)),
        );

        store.insert(Arc::clone(&fresh), t(0));
        store.insert(Arc::clone(&expiring), t(0));
        assert_eq!(store.count(), 2);

        // Still fresh
        assert!(store.lookup(&Interest::new(name("ccnx:/old")), t(99)).is_hit());

        // Expired: torn down, not served
        let outcome = store.lookup(&Interest::new(name("ccnx:/old")), t(100));
        assert_eq!(outcome, MatchOutcome::Invalidated);
        assert_eq!(store.count(), 1);
        assert!(store.peek(&expiring.hash()).is_none());
        assert_eq!(store.indices.map_lens(), (1, 1, 1, 0));
        assert_eq!(store.stats().invalidations(), 1);
        assert_consistent(&store);

        // Next lookup is a plain miss
        assert_eq!(
            store.lookup(&Interest::new(name("ccnx:/old")), t(101)),
            MatchOutcome::Miss
        );
    }

    #[test]
    fn test_invalid_entry_counts_until_looked_up() {
        let mut store = ContentStore::new(4);
        let obj = Arc::new(
            ContentObject::named(name("ccnx:/e"), b"x".to_vec()).with_expiry_time(t(10)),
        );

        store.insert(Arc::clone(&obj), t(0));

        // No background sweep
        assert_eq!(store.count(), 1);
        store.lookup(&Interest::new(name("ccnx:/other")), t(1_000));
        assert_eq!(store.count(), 1);
    }

    #[test]
    fn test_mark_stale() {
        let mut store = ContentStore::new(4);
        let obj = object("ccnx:/s");
        store.insert(Arc::clone(&obj), t(0));

        assert!(store.mark_stale(&obj.hash()));
        assert!(!store.mark_stale(&object("ccnx:/absent").hash()));

        let outcome = store.lookup(&Interest::for_hash(obj.hash()), t(1));
        assert_eq!(outcome, MatchOutcome::Invalidated);
        assert_eq!(store.count(), 0);
    }

    #[test]
    fn test_duplicate_insert_is_noop() {
        let mut store = ContentStore::new(4);
        let obj = object("ccnx:/dup");

        assert!(store.insert(Arc::clone(&obj), t(0)));
        store.lookup(&Interest::new(name("ccnx:/dup")), t(1));

        let copy = Arc::new(ContentObject::named(name("ccnx:/dup"), b"ccnx:/dup".to_vec()));
        assert!(!store.insert(copy, t(2)));

        assert_eq!(store.count(), 1);
        assert_eq!(store.peek(&obj.hash()).unwrap().use_count(), 1);
        assert_eq!(store.peek(&obj.hash()).unwrap().inserted_at(), t(0));
        assert_eq!(store.stats().duplicates(), 1);
    }

    #[test]
    fn test_newer_version_takes_over_name() {
        let mut store = ContentStore::new(4);
        let v1 = Arc::new(ContentObject::named(name("ccnx:/doc"), b"v1".to_vec()));
        let v2 = Arc::new(ContentObject::named(name("ccnx:/doc"), b"v2".to_vec()));

        store.insert(Arc::clone(&v1), t(0));
        store.insert(Arc::clone(&v2), t(1));
        assert_eq!(store.count(), 2);

        // The name now resolves to the newest object
        let outcome = store.lookup(&Interest::new(name("ccnx:/doc")), t(2));
        assert_eq!(outcome, MatchOutcome::Hit(Arc::clone(&v2)));

        // The old version is still valid and served by hash
        assert!(!store.peek(&v1.hash()).unwrap().is_stale());
        let outcome = store.lookup(&Interest::for_hash(v1.hash()), t(3));
        assert_eq!(outcome, MatchOutcome::Hit(Arc::clone(&v1)));
        assert_eq!(store.count(), 2);

        // Tearing the old version down leaves the name mapping of the new one
        assert!(store.mark_stale(&v1.hash()));
        assert_eq!(store.lookup(&Interest::for_hash(v1.hash()), t(4)), MatchOutcome::Invalidated);
        assert_eq!(
            store.lookup(&Interest::new(name("ccnx:/doc")), t(5)),
            MatchOutcome::Hit(Arc::clone(&v2))
        );
        assert_eq!(store.count(), 1);
        assert_consistent(&store);
    }

    #[test]
    fn test_lookup_dispatch_by_keyid() {
        let mut store = ContentStore::new(4);
        let named = object("ccnx:/k");
        let blob = Arc::new(ContentObject::nameless(b"blob".to_vec()));

        store.insert(Arc::clone(&named), t(0));
        store.insert(Arc::clone(&blob), t(0));

        let i1 = Interest::new(name("ccnx:/k")).with_keyid_restriction(KeyId::PLACEHOLDER);
        let i3 = Interest::for_hash(blob.hash()).with_keyid_restriction(KeyId::PLACEHOLDER);
        let i4 = Interest::for_hash(blob.hash());

        assert!(store.lookup(&i1, t(1)).is_hit());
        assert!(store.lookup(&i3, t(1)).is_hit());
        assert!(store.lookup(&i4, t(1)).is_hit());

        // Name-addressed interest with a hash restriction still uses the name map
        let i2 = Interest::new(name("ccnx:/k")).with_hash_restriction(blob.hash());
        assert_eq!(store.lookup(&i2, t(1)), MatchOutcome::Hit(Arc::clone(&named)));
    }

    #[test]
    fn test_explicit_keyid_policy() {
        let mut store = ContentStore::with_keyid_policy(4, Box::new(ExplicitKeyId));
        store.insert(object("ccnx:/unsigned"), t(0));

        let interest = Interest::new(name("ccnx:/unsigned")).with_keyid_restriction(KeyId::PLACEHOLDER);
        assert_eq!(store.lookup(&interest, t(1)), MatchOutcome::Miss);
        assert!(store.lookup(&Interest::new(name("ccnx:/unsigned")), t(1)).is_hit());
    }

    #[test]
    fn test_failed_eviction_abandons_insert() {
        let mut store = ContentStore::new(1);
        let a = object("ccnx:/a");
        store.insert(Arc::clone(&a), t(0));

        // Break the invariant: drop the hash key behind the list's back
        store.indices.remove(&a);

        assert!(!store.insert(object("ccnx:/b"), t(1)));
        assert!(store.stats().consistency_faults() >= 2);
        assert_eq!(store.lru.len(), 1);
    }

    #[test]
    fn test_count_reports_mismatch_without_failing() {
        let mut store = ContentStore::new(4);
        let a = object("ccnx:/a");
        store.insert(Arc::clone(&a), t(0));
        store.indices.remove(&a);

        assert_eq!(store.count(), 1);
        assert_eq!(store.stats().consistency_faults(), 1);
    }

    #[test]
    fn test_clear() {
        let mut store = ContentStore::new(4);
        store.insert(object("ccnx:/a"), t(0));
        store.insert(object("ccnx:/b"), t(0));

        store.clear();

        assert_eq!(store.count(), 0);
        assert_eq!(store.entries().count(), 0);
        assert_eq!(store.stats().inserts(), 2);
    }
}
