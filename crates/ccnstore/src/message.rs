//! Content objects and interests as seen by the content store

use std::fmt;
use std::time::Duration;

use sha2::{Digest, Sha256};

use crate::name::Name;
use crate::time::SimTime;

/// SHA-256 digest identifying a content object
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentHash(pub [u8; 32]);

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({})", self)
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(&self.0[..8]))
    }
}

/// Key identifier of the key that signed a content object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyId(pub [u8; 32]);

impl KeyId {
    /// Key id given to objects that carry none while every object is
    /// treated as signed (see [`AssumeKeyId`](crate::AssumeKeyId)).
    pub const PLACEHOLDER: KeyId = {
        let mut id = [0u8; 32];
        id[31] = 55;
        KeyId(id)
    };
}

/// A cached content object. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentObject {
    name: Option<Name>,
    payload: Vec<u8>,
    hash: ContentHash,
    keyid: Option<KeyId>,
    expiry_time: Option<SimTime>,
    recommended_cache_time: Option<Duration>,
}

impl ContentObject {
    /// Build an object; its hash covers the name segments and the payload.
    pub fn new(name: Option<Name>, payload: impl Into<Vec<u8>>) -> Self {
        let payload = payload.into();
        let hash = Self::compute_hash(name.as_ref(), &payload);
        Self {
            name,
            payload,
            hash,
            keyid: None,
            expiry_time: None,
            recommended_cache_time: None,
        }
    }

    pub fn named(name: Name, payload: impl Into<Vec<u8>>) -> Self {
        Self::new(Some(name), payload)
    }

    /// Nameless object, reachable only by hash
    pub fn nameless(payload: impl Into<Vec<u8>>) -> Self {
        Self::new(None, payload)
    }

    pub fn with_keyid(mut self, keyid: KeyId) -> Self {
        self.keyid = Some(keyid);
        self
    }

    /// Absolute time after which the object must not be served from cache
    pub fn with_expiry_time(mut self, expiry: SimTime) -> Self {
        self.expiry_time = Some(expiry);
        self
    }

    /// How long a cache may keep serving the object after storing it
    pub fn with_recommended_cache_time(mut self, rct: Duration) -> Self {
        self.recommended_cache_time = Some(rct);
        self
    }

    fn compute_hash(name: Option<&Name>, payload: &[u8]) -> ContentHash {
        let mut hasher = Sha256::new();
        if let Some(name) = name {
            for segment in name.segments() {
                hasher.update(segment.typ().code().to_be_bytes());
                hasher.update((segment.value().len() as u64).to_be_bytes());
                hasher.update(segment.value());
            }
        }
        hasher.update([0xFF]);
        hasher.update(payload);
        ContentHash(hasher.finalize().into())
    }

    /// Name, if present and non-empty
    pub fn name(&self) -> Option<&Name> {
        self.name.as_ref().filter(|n| !n.is_empty())
    }

    pub fn has_name(&self) -> bool {
        self.name().is_some()
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn hash(&self) -> ContentHash {
        self.hash
    }

    pub fn keyid(&self) -> Option<KeyId> {
        self.keyid
    }

    pub fn expiry_time(&self) -> Option<SimTime> {
        self.expiry_time
    }

    pub fn recommended_cache_time(&self) -> Option<Duration> {
        self.recommended_cache_time
    }
}

/// A request for cached content
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Interest {
    name: Option<Name>,
    keyid_restriction: Option<KeyId>,
    hash_restriction: Option<ContentHash>,
}

impl Interest {
    pub fn new(name: Name) -> Self {
        Self {
            name: Some(name),
            ..Default::default()
        }
    }

    /// Nameless interest addressed purely by content hash
    pub fn for_hash(hash: ContentHash) -> Self {
        Self {
            hash_restriction: Some(hash),
            ..Default::default()
        }
    }

    pub fn with_keyid_restriction(mut self, keyid: KeyId) -> Self {
        self.keyid_restriction = Some(keyid);
        self
    }

    pub fn with_hash_restriction(mut self, hash: ContentHash) -> Self {
        self.hash_restriction = Some(hash);
        self
    }

    /// Name, if present and non-empty
    pub fn name(&self) -> Option<&Name> {
        self.name.as_ref().filter(|n| !n.is_empty())
    }

    pub fn has_name(&self) -> bool {
        self.name().is_some()
    }

    pub fn keyid_restriction(&self) -> Option<KeyId> {
        self.keyid_restriction
    }

    pub fn has_keyid_restriction(&self) -> bool {
        self.keyid_restriction.is_some()
    }

    pub fn hash_restriction(&self) -> Option<ContentHash> {
        self.hash_restriction
    }
}
