//! Lookup indices
//!
//! Four independent maps project an object onto a lookup key. Every map
//! stores only an [`EntryHandle`] into the eviction list, never the entry.
//!
//! | Map             | Key              | Populated when                 |
//! |-----------------|------------------|--------------------------------|
//! | `by_hash`       | hash             | always                         |
//! | `by_name`       | name             | object is named                |
//! | `by_name_keyid` | (name, keyid)    | named, policy yields a key id  |
//! | `by_hash_keyid` | (hash, keyid)    | unnamed, policy yields a key id|

use std::collections::hash_map::{self, HashMap};

use ahash::RandomState;

use crate::lru::EntryHandle;
use crate::message::{ContentHash, ContentObject, Interest, KeyId};
use crate::name::Name;

/// Which single index a lookup consults
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupStrategy {
    /// Interest has a name and a key id restriction
    ByNameKeyid,
    /// Interest has a name only
    ByName,
    /// Interest has no name but a key id restriction
    ByHashKeyid,
    /// Interest has neither
    ByHash,
}

impl LookupStrategy {
    pub fn select(has_name: bool, has_keyid_restriction: bool) -> Self {
        match (has_name, has_keyid_restriction) {
            (true, true) => LookupStrategy::ByNameKeyid,
            (true, false) => LookupStrategy::ByName,
            (false, true) => LookupStrategy::ByHashKeyid,
            (false, false) => LookupStrategy::ByHash,
        }
    }

    pub fn for_interest(interest: &Interest) -> Self {
        Self::select(interest.has_name(), interest.has_keyid_restriction())
    }
}

/// Decides which key id, if any, an object is indexed under.
///
/// Returning `None` keeps the object out of both key id maps.
pub trait KeyIdPolicy: Send + Sync {
    fn keyid_for(&self, object: &ContentObject) -> Option<KeyId>;
}

/// Treat every object as carrying a key id, falling back to
/// [`KeyId::PLACEHOLDER`] when it has none. This is the default.
#[derive(Debug, Clone, Copy, Default)]
pub struct AssumeKeyId;

impl KeyIdPolicy for AssumeKeyId {
    fn keyid_for(&self, object: &ContentObject) -> Option<KeyId> {
        Some(object.keyid().unwrap_or(KeyId::PLACEHOLDER))
    }
}

/// Only objects with a real key id populate the key id maps
#[derive(Debug, Clone, Copy, Default)]
pub struct ExplicitKeyId;

impl KeyIdPolicy for ExplicitKeyId {
    fn keyid_for(&self, object: &ContentObject) -> Option<KeyId> {
        object.keyid()
    }
}

/// The four content store indices
pub struct IndexSet {
    by_hash: HashMap<ContentHash, EntryHandle, RandomState>,
    by_name: HashMap<Name, EntryHandle, RandomState>,
    by_name_keyid: HashMap<(Name, KeyId), EntryHandle, RandomState>,
    by_hash_keyid: HashMap<(ContentHash, KeyId), EntryHandle, RandomState>,
    policy: Box<dyn KeyIdPolicy>,
}

impl IndexSet {
    pub fn new(policy: Box<dyn KeyIdPolicy>) -> Self {
        Self::with_capacity(0, policy)
    }

    pub fn with_capacity(capacity: usize, policy: Box<dyn KeyIdPolicy>) -> Self {
        Self {
            by_hash: HashMap::with_capacity_and_hasher(capacity, RandomState::new()),
            by_name: HashMap::with_capacity_and_hasher(capacity, RandomState::new()),
            by_name_keyid: HashMap::with_capacity_and_hasher(capacity, RandomState::new()),
            by_hash_keyid: HashMap::with_capacity_and_hasher(capacity, RandomState::new()),
            policy,
        }
    }

    /// Populate every applicable map with `handle`.
    ///
    /// Returns false if the hash or hash+keyid slot already belongs to a
    /// different entry; such a slot keeps its owner. A hash conflict leaves
    /// every map untouched. Name slots are simply taken over by the newer
    /// object.
    pub fn insert(&mut self, object: &ContentObject, handle: EntryHandle) -> bool {
        if !Self::claim(&mut self.by_hash, object.hash(), handle) {
            return false;
        }
        let keyid = self.policy.keyid_for(object);

        match (object.name(), keyid) {
            (Some(name), keyid) => {
                self.by_name.insert(name.clone(), handle);
                if let Some(keyid) = keyid {
                    self.by_name_keyid.insert((name.clone(), keyid), handle);
                }
                true
            }
            (None, Some(keyid)) => Self::claim(&mut self.by_hash_keyid, (object.hash(), keyid), handle),
            (None, None) => true,
        }
    }

    fn claim<K>(map: &mut HashMap<K, EntryHandle, RandomState>, key: K, handle: EntryHandle) -> bool
    where
        K: std::hash::Hash + Eq,
    {
        match map.entry(key) {
            hash_map::Entry::Occupied(slot) => *slot.get() == handle,
            hash_map::Entry::Vacant(slot) => {
                slot.insert(handle);
                true
            }
        }
    }

    /// Erase the object's keys from every map it was inserted into.
    ///
    /// Returns the handle removed from the hash map, which is the
    /// authoritative existence check. Secondary keys are only erased while
    /// they still point at that handle.
    pub fn remove(&mut self, object: &ContentObject) -> Option<EntryHandle> {
        let handle = self.by_hash.remove(&object.hash())?;
        let keyid = self.policy.keyid_for(object);

        match object.name() {
            Some(name) => {
                if self.by_name.get(name) == Some(&handle) {
                    self.by_name.remove(name);
                }
                if let Some(keyid) = keyid {
                    let key = (name.clone(), keyid);
                    if self.by_name_keyid.get(&key) == Some(&handle) {
                        self.by_name_keyid.remove(&key);
                    }
                }
            }
            None => {
                if let Some(keyid) = keyid {
                    let key = (object.hash(), keyid);
                    if self.by_hash_keyid.get(&key) == Some(&handle) {
                        self.by_hash_keyid.remove(&key);
                    }
                }
            }
        }

        Some(handle)
    }

    /// Look up an interest in the one map its fields select
    pub fn find(&self, interest: &Interest) -> Option<EntryHandle> {
        match LookupStrategy::for_interest(interest) {
            LookupStrategy::ByNameKeyid => {
                let name = interest.name()?.clone();
                let keyid = interest.keyid_restriction()?;
                self.by_name_keyid.get(&(name, keyid)).copied()
            }
            LookupStrategy::ByName => self.by_name.get(interest.name()?).copied(),
            LookupStrategy::ByHashKeyid => {
                let hash = interest.hash_restriction()?;
                let keyid = interest.keyid_restriction()?;
                self.by_hash_keyid.get(&(hash, keyid)).copied()
            }
            LookupStrategy::ByHash => self.find_by_hash(&interest.hash_restriction()?),
        }
    }

    pub fn find_by_hash(&self, hash: &ContentHash) -> Option<EntryHandle> {
        self.by_hash.get(hash).copied()
    }

    pub fn find_by_name(&self, name: &Name) -> Option<EntryHandle> {
        self.by_name.get(name).copied()
    }

    pub fn contains_hash(&self, hash: &ContentHash) -> bool {
        self.by_hash.contains_key(hash)
    }

    pub fn hash_len(&self) -> usize {
        self.by_hash.len()
    }

    /// Sizes of (by_hash, by_name, by_name_keyid, by_hash_keyid)
    pub fn map_lens(&self) -> (usize, usize, usize, usize) {
        (
            self.by_hash.len(),
            self.by_name.len(),
            self.by_name_keyid.len(),
            self.by_hash_keyid.len(),
        )
    }

    pub fn clear(&mut self) {
        self.by_hash.clear();
        self.by_name.clear();
        self.by_name_keyid.clear();
        self.by_hash_keyid.clear();
    }
}

impl Default for IndexSet {
    fn default() -> Self {
        Self::new(Box::new(AssumeKeyId))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::Entry;
    use crate::lru::EvictionList;
    use crate::time::SimTime;
    use std::sync::Arc;

    fn named(uri: &str, payload: &str) -> ContentObject {
        ContentObject::named(Name::from_uri(uri).unwrap(), payload.as_bytes().to_vec())
    }

    /// Real handles come from an eviction list
    fn handles(n: usize) -> Vec<EntryHandle> {
        let mut list = EvictionList::new();
        (0..n)
            .map(|i| {
                let obj = ContentObject::nameless(vec![i as u8]);
                list.push_front(Entry::new(Arc::new(obj), SimTime::ZERO))
            })
            .collect()
    }

    #[test]
    fn test_strategy_selection() {
        assert_eq!(LookupStrategy::select(true, true), LookupStrategy::ByNameKeyid);
        assert_eq!(LookupStrategy::select(true, false), LookupStrategy::ByName);
        assert_eq!(LookupStrategy::select(false, true), LookupStrategy::ByHashKeyid);
        assert_eq!(LookupStrategy::select(false, false), LookupStrategy::ByHash);

        let empty_name = Interest::new(Name::new());
        assert_eq!(LookupStrategy::for_interest(&empty_name), LookupStrategy::ByHash);
    }

    #[test]
    fn test_named_object_populates_name_maps() {
        let mut index = IndexSet::default();
        let h = handles(1)[0];
        let obj = named("ccnx:/a", "1");

        assert!(index.insert(&obj, h));
        assert_eq!(index.map_lens(), (1, 1, 1, 0));

        let by_name = Interest::new(Name::from_uri("ccnx:/a").unwrap());
        assert_eq!(index.find(&by_name), Some(h));

        let by_name_keyid = by_name.clone().with_keyid_restriction(KeyId::PLACEHOLDER);
        assert_eq!(index.find(&by_name_keyid), Some(h));

        // Hash-addressed lookups never reach name-addressed content maps
        let by_hash_keyid = Interest::for_hash(obj.hash()).with_keyid_restriction(KeyId::PLACEHOLDER);
        assert_eq!(index.find(&by_hash_keyid), None);

        // ...but the plain hash map holds everything
        assert_eq!(index.find(&Interest::for_hash(obj.hash())), Some(h));
    }

    #[test]
    fn test_unnamed_object_populates_hash_keyid() {
        let mut index = IndexSet::default();
        let h = handles(1)[0];
        let obj = ContentObject::nameless(b"blob".to_vec());

        assert!(index.insert(&obj, h));
        assert_eq!(index.map_lens(), (1, 0, 0, 1));

        let interest = Interest::for_hash(obj.hash()).with_keyid_restriction(KeyId::PLACEHOLDER);
        assert_eq!(index.find(&interest), Some(h));

        let wrong_key = Interest::for_hash(obj.hash()).with_keyid_restriction(KeyId([9; 32]));
        assert_eq!(index.find(&wrong_key), None);
    }

    #[test]
    fn test_dispatch_consults_only_selected_map() {
        let mut index = IndexSet::default();
        let h = handles(1)[0];
        let obj = named("ccnx:/a", "1").with_keyid(KeyId([1; 32]));
        index.insert(&obj, h);

        // Name + different keyid: miss, even though by_name would match
        let interest = Interest::new(Name::from_uri("ccnx:/a").unwrap()).with_keyid_restriction(KeyId([2; 32]));
        assert_eq!(index.find(&interest), None);

        // Nameless interest without hash restriction cannot match anything
        assert_eq!(index.find(&Interest::default()), None);
    }

    #[test]
    fn test_explicit_keyid_policy() {
        let mut index = IndexSet::new(Box::new(ExplicitKeyId));
        let hs = handles(2);

        index.insert(&named("ccnx:/plain", "1"), hs[0]);
        index.insert(&named("ccnx:/signed", "2").with_keyid(KeyId([4; 32])), hs[1]);

        assert_eq!(index.map_lens(), (2, 2, 1, 0));
    }

    #[test]
    fn test_remove_erases_all_keys() {
        let mut index = IndexSet::default();
        let hs = handles(2);
        let a = named("ccnx:/a", "1");
        let b = ContentObject::nameless(b"b".to_vec());

        index.insert(&a, hs[0]);
        index.insert(&b, hs[1]);

        assert_eq!(index.remove(&a), Some(hs[0]));
        assert_eq!(index.remove(&b), Some(hs[1]));
        assert_eq!(index.map_lens(), (0, 0, 0, 0));
        assert_eq!(index.remove(&a), None);
    }

    #[test]
    fn test_remove_keeps_name_taken_by_newer_version() {
        let mut index = IndexSet::default();
        let hs = handles(2);
        let old = named("ccnx:/doc", "v1");
        let new = named("ccnx:/doc", "v2");

        index.insert(&old, hs[0]);
        index.insert(&new, hs[1]);
        assert_eq!(index.map_lens(), (2, 1, 1, 0));

        assert_eq!(index.remove(&old), Some(hs[0]));
        assert_eq!(index.find_by_name(&Name::from_uri("ccnx:/doc").unwrap()), Some(hs[1]));
        assert_eq!(index.map_lens(), (1, 1, 1, 0));
    }

    #[test]
    fn test_insert_reports_hash_conflict() {
        let mut index = IndexSet::default();
        let hs = handles(2);
        let obj = named("ccnx:/a", "1");

        assert!(index.insert(&obj, hs[0]));
        assert!(index.insert(&obj, hs[0]));
        assert!(!index.insert(&obj, hs[1]));
    }

    #[test]
    fn test_conflicting_insert_keeps_original_owner() {
        let mut index = IndexSet::default();
        let hs = handles(3);
        let obj = named("ccnx:/a", "1");
        let blob = ContentObject::nameless(b"blob".to_vec());

        assert!(index.insert(&obj, hs[0]));
        assert!(index.insert(&blob, hs[1]));
        assert!(!index.insert(&obj, hs[2]));
        assert!(!index.insert(&blob, hs[2]));

        assert_eq!(index.find_by_hash(&obj.hash()), Some(hs[0]));
        assert_eq!(index.find_by_hash(&blob.hash()), Some(hs[1]));
        assert_eq!(index.find_by_name(&Name::from_uri("ccnx:/a").unwrap()), Some(hs[0]));
        let keyed = Interest::for_hash(blob.hash()).with_keyid_restriction(KeyId::PLACEHOLDER);
        assert_eq!(index.find(&keyed), Some(hs[1]));

        // Removal still resolves to the original handle
        assert_eq!(index.remove(&obj), Some(hs[0]));
        assert!(!index.contains_hash(&obj.hash()));
    }
}
