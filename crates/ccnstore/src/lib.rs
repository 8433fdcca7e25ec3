//! # ccnstore
//!
//! Content store for a named-data (CCNx) forwarder.
//!
//! ## Architecture
//! - **EvictionList**: arena-backed doubly-linked list, sole owner of entries (O(1) promote/evict)
//! - **IndexSet**: four AHash maps (hash, name, name+keyid, hash+keyid) holding entry handles
//! - **ContentStore**: 4-way lookup dispatch, LRU eviction, lazy invalidation
//! - **DelayQueue**: multi-server FIFO service stage on a virtual clock
//! - **ContentStoreService**: queues every operation and reports outcomes through callbacks
//!
//! ## Example
//! ```
//! use std::sync::Arc;
//! use ccnstore::{ContentObject, ContentStoreService, EventLoop, Interest, Name, StoreConfig};
//!
//! let events = Arc::new(EventLoop::new());
//! let service = ContentStoreService::new(StoreConfig::default(), events.clone()).unwrap();
//! service.set_add_content_object_callback(|_| {});
//! service.set_match_interest_callback(|outcome| assert!(outcome.object().is_some()));
//!
//! let name = Name::from_uri("ccnx:/hello").unwrap();
//! service.add_content_object(ContentObject::named(name.clone(), b"world".to_vec()), None).unwrap();
//! service.match_interest(Interest::new(name)).unwrap();
//! events.run();
//! ```

mod config;
mod entry;
mod error;
mod index;
mod lru;
mod message;
mod name;
mod parser;
mod queue;
mod scheduler;
mod service;
mod stats;
mod store;
mod time;

pub use config::StoreConfig;
pub use entry::Entry;
pub use error::{Error, Result};
pub use index::{AssumeKeyId, ExplicitKeyId, IndexSet, KeyIdPolicy, LookupStrategy};
pub use lru::{EntryHandle, EvictionList};
pub use message::{ContentHash, ContentObject, Interest, KeyId};
pub use name::{Name, NameSegment, SegmentType};
pub use parser::parse_name_uri;
pub use queue::DelayQueue;
pub use scheduler::{Callback, EventLoop, Scheduler};
pub use service::{
    ConnectionId, ContentStoreService, InsertOutcome, LookupOutcome, WeakContentStoreService,
    WorkItem, WorkKind,
};
pub use stats::{CacheStats, StatsSnapshot};
pub use store::{ContentStore, MatchOutcome};
pub use time::SimTime;
