//! Multi-server delay queue
//!
//! Items wait in FIFO order for one of `servers` servers. A dispatched item
//! occupies its server for a computed service time on the virtual clock and
//! is then handed to the completion callback. Servers are a timing model;
//! nothing here runs in parallel.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::scheduler::Scheduler;

type ServiceTimeFn<T> = dyn Fn(&T) -> Duration + Send + Sync;
type CompletionFn<T> = dyn Fn(T) + Send + Sync;

struct QueueState<T> {
    waiting: VecDeque<T>,
    in_service: usize,
}

/// Bounded-concurrency service stage
pub struct DelayQueue<T> {
    state: Arc<Mutex<QueueState<T>>>,
    servers: usize,
    scheduler: Arc<dyn Scheduler>,
    service_time: Arc<ServiceTimeFn<T>>,
    on_serviced: Arc<CompletionFn<T>>,
}

impl<T> Clone for DelayQueue<T> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            servers: self.servers,
            scheduler: Arc::clone(&self.scheduler),
            service_time: Arc::clone(&self.service_time),
            on_serviced: Arc::clone(&self.on_serviced),
        }
    }
}

impl<T: Send + 'static> DelayQueue<T> {
    /// Create a queue served by `servers` servers.
    ///
    /// `service_time` is evaluated when an item reaches a server;
    /// `on_serviced` runs once that time has elapsed.
    pub fn new<S, C>(
        servers: usize,
        scheduler: Arc<dyn Scheduler>,
        service_time: S,
        on_serviced: C,
    ) -> Result<Self>
    where
        S: Fn(&T) -> Duration + Send + Sync + 'static,
        C: Fn(T) + Send + Sync + 'static,
    {
        if servers == 0 {
            return Err(Error::InvalidConfig(
                "delay queue needs at least one server".to_string(),
            ));
        }

        Ok(Self {
            state: Arc::new(Mutex::new(QueueState {
                waiting: VecDeque::new(),
                in_service: 0,
            })),
            servers,
            scheduler,
            service_time: Arc::new(service_time),
            on_serviced: Arc::new(on_serviced),
        })
    }

    /// Enqueue an item. Returns immediately; the item is serviced later.
    pub fn push_back(&self, item: T) {
        self.state.lock().waiting.push_back(item);
        self.dispatch();
    }

    /// Items waiting for a server
    pub fn len(&self) -> usize {
        self.state.lock().waiting.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Items currently occupying a server
    pub fn in_service(&self) -> usize {
        self.state.lock().in_service
    }

    pub fn servers(&self) -> usize {
        self.servers
    }

    fn dispatch(&self) {
        loop {
            let item = {
                let mut state = self.state.lock();
                if state.in_service >= self.servers {
                    return;
                }
                let Some(item) = state.waiting.pop_front() else {
                    return;
                };
                state.in_service += 1;
                item
            };

            let delay = (self.service_time)(&item);
            let queue = self.clone();
            self.scheduler
                .schedule(delay, Box::new(move || queue.complete(item)));
        }
    }

    fn complete(&self, item: T) {
        self.state.lock().in_service -= 1;
        (self.on_serviced)(item);
        self.dispatch();
    }
}
