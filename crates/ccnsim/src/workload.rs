//! Synthetic consumer/producer workload
//!
//! Consumers issue interests for a fixed catalog with a skewed popularity.
//! Every miss is answered by a producer after a fetch delay, and the
//! response is cached on its way back.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use ccnstore::{
    ConnectionId, ContentHash, ContentObject, ContentStoreService, EventLoop, Interest, KeyId,
    Name, Scheduler, StatsSnapshot, StoreConfig,
};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::{debug, error};

/// Number of downstream consumers interests are spread over
const CONSUMERS: u32 = 4;

/// Shape of a simulation run
#[derive(Debug, Clone)]
pub struct WorkloadSpec {
    pub catalog: usize,
    pub interests: usize,
    pub interval: Duration,
    pub fetch_delay: Duration,
    pub freshness: Option<Duration>,
    pub seed: u64,
}

/// Outcome of a simulation run
#[derive(Debug, Clone, Serialize)]
pub struct WorkloadReport {
    pub config: StoreConfig,
    pub interests: usize,
    pub lookups_completed: u64,
    pub responses_cached: u64,
    pub mean_lookup_latency_ns: u64,
    pub object_count: usize,
    pub end_time_ns: u64,
    pub stats: StatsSnapshot,
}

#[derive(Default)]
struct Tally {
    lookups: u64,
    cached: u64,
    latency_ns: u128,
}

/// The content a producer can serve
struct Catalog {
    objects: Vec<Arc<ContentObject>>,
    by_name: HashMap<Name, usize>,
    by_hash: HashMap<ContentHash, usize>,
}

impl Catalog {
    fn new(size: usize, freshness: Option<Duration>) -> Result<Self> {
        let mut objects = Vec::with_capacity(size);
        let mut by_name = HashMap::with_capacity(size);
        let mut by_hash = HashMap::with_capacity(size);

        for i in 0..size {
            let name = Name::from_uri(&format!("ccnx:/sim/catalog/chunk={}", i))?;
            let mut object = ContentObject::named(name.clone(), format!("payload {}", i).into_bytes());
            if let Some(rct) = freshness {
                object = object.with_recommended_cache_time(rct);
            }
            by_name.insert(name, i);
            by_hash.insert(object.hash(), i);
            objects.push(Arc::new(object));
        }

        Ok(Self {
            objects,
            by_name,
            by_hash,
        })
    }

    fn resolve(&self, interest: &Interest) -> Option<Arc<ContentObject>> {
        let idx = match interest.name() {
            Some(name) => self.by_name.get(name),
            None => interest.hash_restriction().and_then(|h| self.by_hash.get(&h)),
        }?;
        self.objects.get(*idx).cloned()
    }

    /// Interest for object `idx`; the addressing mode rotates with `i`
    fn interest(&self, idx: usize, i: usize) -> Interest {
        let object = &self.objects[idx];
        match (object.name(), i % 10) {
            (_, 0) => Interest::for_hash(object.hash()),
            (Some(name), 3 | 7) => Interest::new(name.clone()).with_keyid_restriction(KeyId::PLACEHOLDER),
            (Some(name), _) => Interest::new(name.clone()),
            (None, _) => Interest::for_hash(object.hash()),
        }
    }
}

/// Index in `0..n`, skewed towards small values
fn skewed<R: Rng>(rng: &mut R, n: usize) -> usize {
    let bound = rng.gen_range(1..=n);
    rng.gen_range(0..bound)
}

/// Drive `spec` through a content store configured by `config`
pub fn run(config: StoreConfig, spec: &WorkloadSpec) -> Result<WorkloadReport> {
    anyhow::ensure!(spec.catalog > 0, "catalog must not be empty");

    let events = Arc::new(EventLoop::new());
    let service = ContentStoreService::new(config.clone(), events.clone())?;
    let catalog = Arc::new(Catalog::new(spec.catalog, spec.freshness)?);
    let tally = Arc::new(Mutex::new(Tally::default()));

    {
        let tally = Arc::clone(&tally);
        service.set_add_content_object_callback(move |outcome| {
            if outcome.inserted {
                tally.lock().cached += 1;
            }
            debug!(egress = ?outcome.egress, inserted = outcome.inserted, "response forwarded");
        });
    }

    {
        let tally = Arc::clone(&tally);
        let catalog = Arc::clone(&catalog);
        let producer = service.downgrade();
        let clock = events.clone();
        let fetch_delay = spec.fetch_delay;
        service.set_match_interest_callback(move |outcome| {
            {
                let mut tally = tally.lock();
                tally.lookups += 1;
                tally.latency_ns += outcome
                    .completed
                    .since(outcome.arrival)
                    .map_or(0, |d| d.as_nanos());
            }

            if outcome.object().is_some() {
                return;
            }
            let Some(object) = catalog.resolve(&outcome.interest) else {
                return;
            };
            let producer = producer.clone();
            clock.schedule(
                fetch_delay,
                Box::new(move || {
                    let Some(producer) = producer.upgrade() else {
                        return;
                    };
                    let egress = Some(vec![ConnectionId(0)]);
                    if let Err(e) = producer.add_content_object(object, egress) {
                        error!("Failed to cache response: {}", e);
                    }
                }),
            );
        });
    }

    let mut rng = StdRng::seed_from_u64(spec.seed);
    for i in 0..spec.interests {
        let interest = catalog.interest(skewed(&mut rng, spec.catalog), i);
        let consumer = service.clone();
        let at = Duration::from_nanos(
            u64::try_from(spec.interval.as_nanos())
                .unwrap_or(u64::MAX)
                .saturating_mul(i as u64),
        );
        events.schedule(
            at,
            Box::new(move || {
                if let Err(e) = consumer.match_interest(interest) {
                    error!("Failed to submit interest from consumer {}: {}", i as u32 % CONSUMERS, e);
                }
            }),
        );
    }

    events.run();

    let tally = tally.lock();
    let mean = if tally.lookups == 0 {
        0
    } else {
        u64::try_from(tally.latency_ns / u128::from(tally.lookups)).unwrap_or(u64::MAX)
    };

    Ok(WorkloadReport {
        config,
        interests: spec.interests,
        lookups_completed: tally.lookups,
        responses_cached: tally.cached,
        mean_lookup_latency_ns: mean,
        object_count: service.object_count(),
        end_time_ns: events.now().nanos,
        stats: service.stats().snapshot(),
    })
}
