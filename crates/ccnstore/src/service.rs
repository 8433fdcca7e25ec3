//! ContentStoreService: the content store behind its admission queue
//!
//! Every lookup and insertion is queued first. When the service stage
//! finishes an item, the engine performs the operation at that virtual time
//! and the matching completion sink receives the outcome.

use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use tracing::debug;

use crate::config::StoreConfig;
use crate::error::{Error, Result};
use crate::index::{AssumeKeyId, KeyIdPolicy};
use crate::message::{ContentHash, ContentObject, Interest};
use crate::queue::DelayQueue;
use crate::scheduler::Scheduler;
use crate::stats::CacheStats;
use crate::store::{ContentStore, MatchOutcome};
use crate::time::SimTime;

/// Identifies a connection an object should be forwarded to after caching
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u32);

/// What a queued work item asks the store to do. Fixed at submission.
#[derive(Debug, Clone)]
pub enum WorkKind {
    Lookup(Interest),
    Insert {
        object: Arc<ContentObject>,
        egress: Option<Vec<ConnectionId>>,
    },
}

/// A unit of work travelling through the admission queue
#[derive(Debug, Clone)]
pub struct WorkItem {
    pub kind: WorkKind,
    pub arrival: SimTime,
}

impl WorkItem {
    /// Bytes of name that drive the item's service time
    pub fn name_bytes(&self) -> usize {
        let name = match &self.kind {
            WorkKind::Lookup(interest) => interest.name(),
            WorkKind::Insert { object, .. } => object.name(),
        };
        name.map_or(0, |n| n.byte_len())
    }
}

/// Delivered to the match-interest sink
#[derive(Debug, Clone)]
pub struct LookupOutcome {
    pub interest: Interest,
    pub outcome: MatchOutcome,
    pub arrival: SimTime,
    pub completed: SimTime,
}

impl LookupOutcome {
    pub fn object(&self) -> Option<&Arc<ContentObject>> {
        self.outcome.object()
    }
}

/// Delivered to the add-content-object sink
#[derive(Debug, Clone)]
pub struct InsertOutcome {
    pub object: Arc<ContentObject>,
    pub egress: Option<Vec<ConnectionId>>,
    pub inserted: bool,
    pub arrival: SimTime,
    pub completed: SimTime,
}

type LookupSink = Arc<dyn Fn(LookupOutcome) + Send + Sync>;
type InsertSink = Arc<dyn Fn(InsertOutcome) + Send + Sync>;

#[derive(Default)]
struct Sinks {
    lookup: Option<LookupSink>,
    insert: Option<InsertSink>,
}

/// Handle to a content store and its service stage. Clones share state.
///
/// The registered sinks live as long as some strong handle does. A sink that
/// needs to submit work should capture a [`WeakContentStoreService`] so it
/// does not keep itself alive.
#[derive(Clone)]
pub struct ContentStoreService {
    store: Arc<Mutex<ContentStore>>,
    sinks: Arc<RwLock<Sinks>>,
    queue: DelayQueue<WorkItem>,
    scheduler: Arc<dyn Scheduler>,
    stats: Arc<CacheStats>,
    config: StoreConfig,
}

impl ContentStoreService {
    pub fn new(config: StoreConfig, scheduler: Arc<dyn Scheduler>) -> Result<Self> {
        Self::with_keyid_policy(config, scheduler, Box::new(AssumeKeyId))
    }

    pub fn with_keyid_policy(
        config: StoreConfig,
        scheduler: Arc<dyn Scheduler>,
        policy: Box<dyn KeyIdPolicy>,
    ) -> Result<Self> {
        config.validate()?;

        let store = ContentStore::with_keyid_policy(config.capacity, policy);
        let stats = store.stats();
        let store = Arc::new(Mutex::new(store));
        let sinks = Arc::new(RwLock::new(Sinks::default()));

        let timing = config.clone();
        let on_serviced = {
            let store = Arc::clone(&store);
            let sinks = Arc::downgrade(&sinks);
            let scheduler = Arc::clone(&scheduler);
            move |item: WorkItem| match sinks.upgrade() {
                Some(sinks) => service_work_item(&store, &sinks, scheduler.now(), item),
                None => debug!("service dropped, discarding serviced work item"),
            }
        };

        let queue = DelayQueue::new(
            config.servers,
            Arc::clone(&scheduler),
            move |item: &WorkItem| timing.service_time(item.name_bytes()),
            on_serviced,
        )?;

        Ok(Self {
            store,
            sinks,
            queue,
            scheduler,
            stats,
            config,
        })
    }

    /// Handle that does not keep the service's sinks alive
    pub fn downgrade(&self) -> WeakContentStoreService {
        WeakContentStoreService {
            store: Arc::clone(&self.store),
            sinks: Arc::downgrade(&self.sinks),
            queue: self.queue.clone(),
            scheduler: Arc::clone(&self.scheduler),
            stats: Arc::clone(&self.stats),
            config: self.config.clone(),
        }
    }

    /// Register the sink that receives every lookup outcome
    pub fn set_match_interest_callback<F>(&self, callback: F)
    where
        F: Fn(LookupOutcome) + Send + Sync + 'static,
    {
        self.sinks.write().lookup = Some(Arc::new(callback));
    }

    /// Register the sink that receives every insertion outcome
    pub fn set_add_content_object_callback<F>(&self, callback: F)
    where
        F: Fn(InsertOutcome) + Send + Sync + 'static,
    {
        self.sinks.write().insert = Some(Arc::new(callback));
    }

    /// Queue a lookup for `interest`
    pub fn match_interest(&self, interest: Interest) -> Result<()> {
        if self.sinks.read().lookup.is_none() {
            return Err(Error::SinkNotRegistered("match interest"));
        }
        self.submit(WorkKind::Lookup(interest));
        Ok(())
    }

    /// Queue insertion of `object`; `egress` is handed back in the outcome
    pub fn add_content_object(
        &self,
        object: impl Into<Arc<ContentObject>>,
        egress: Option<Vec<ConnectionId>>,
    ) -> Result<()> {
        if self.sinks.read().insert.is_none() {
            return Err(Error::SinkNotRegistered("add content object"));
        }
        self.submit(WorkKind::Insert {
            object: object.into(),
            egress,
        });
        Ok(())
    }

    fn submit(&self, kind: WorkKind) {
        self.queue.push_back(WorkItem {
            kind,
            arrival: self.scheduler.now(),
        });
    }

    /// Mark the entry for `hash` stale on behalf of an external authority
    pub fn mark_stale(&self, hash: &ContentHash) -> bool {
        self.store.lock().mark_stale(hash)
    }

    pub fn use_count(&self, hash: &ContentHash) -> Option<u64> {
        self.store.lock().peek(hash).map(|entry| entry.use_count())
    }

    pub fn object_count(&self) -> usize {
        self.store.lock().count()
    }

    pub fn capacity(&self) -> usize {
        self.config.capacity
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Work items waiting for a server
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Work items currently being serviced
    pub fn in_service(&self) -> usize {
        self.queue.in_service()
    }
}

/// Non-owning handle to a [`ContentStoreService`], for use inside sinks
#[derive(Clone)]
pub struct WeakContentStoreService {
    store: Arc<Mutex<ContentStore>>,
    sinks: Weak<RwLock<Sinks>>,
    queue: DelayQueue<WorkItem>,
    scheduler: Arc<dyn Scheduler>,
    stats: Arc<CacheStats>,
    config: StoreConfig,
}

impl WeakContentStoreService {
    /// Strong handle, or `None` once every strong handle has been dropped
    pub fn upgrade(&self) -> Option<ContentStoreService> {
        Some(ContentStoreService {
            store: Arc::clone(&self.store),
            sinks: self.sinks.upgrade()?,
            queue: self.queue.clone(),
            scheduler: Arc::clone(&self.scheduler),
            stats: Arc::clone(&self.stats),
            config: self.config.clone(),
        })
    }
}

/// Demultiplex a serviced item to the engine, then to its sink. The store
/// lock is released before the sink runs so sinks may submit more work.
fn service_work_item(
    store: &Mutex<ContentStore>,
    sinks: &RwLock<Sinks>,
    now: SimTime,
    item: WorkItem,
) {
    match item.kind {
        WorkKind::Lookup(interest) => {
            let outcome = store.lock().lookup(&interest, now);
            debug!(hit = outcome.is_hit(), waited = ?now.since(item.arrival), "serviced lookup");

            let sink = sinks.read().lookup.clone();
            match sink {
                Some(sink) => sink(LookupOutcome {
                    interest,
                    outcome,
                    arrival: item.arrival,
                    completed: now,
                }),
                None => unreachable!("lookup queued without a match interest callback"),
            }
        }
        WorkKind::Insert { object, egress } => {
            let inserted = store.lock().insert(Arc::clone(&object), now);
            debug!(inserted, waited = ?now.since(item.arrival), "serviced insertion");

            let sink = sinks.read().insert.clone();
            match sink {
                Some(sink) => sink(InsertOutcome {
                    object,
                    egress,
                    inserted,
                    arrival: item.arrival,
                    completed: now,
                }),
                None => unreachable!("insertion queued without an add content object callback"),
            }
        }
    }
}
