//! Virtual-time scheduling
//!
//! The content store never sleeps or spawns threads. Delays are modelled as
//! callbacks scheduled against a [`Scheduler`]; [`EventLoop`] is a
//! deterministic single-threaded implementation.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::time::Duration;

use parking_lot::Mutex;

use crate::time::SimTime;

/// A deferred unit of work
pub type Callback = Box<dyn FnOnce() + Send>;

/// Host simulation clock and timer facility
pub trait Scheduler: Send + Sync {
    /// Current virtual time
    fn now(&self) -> SimTime;

    /// Run `callback` once `delay` has elapsed on the virtual clock
    fn schedule(&self, delay: Duration, callback: Callback);
}

struct Pending {
    at: SimTime,
    seq: u64,
    callback: Callback,
}

impl PartialEq for Pending {
    fn eq(&self, other: &Self) -> bool {
        self.at == other.at && self.seq == other.seq
    }
}

impl Eq for Pending {}

impl PartialOrd for Pending {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Pending {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.at, self.seq).cmp(&(other.at, other.seq))
    }
}

#[derive(Default)]
struct LoopState {
    now: SimTime,
    next_seq: u64,
    pending: BinaryHeap<Reverse<Pending>>,
}

/// Discrete-event loop over a virtual clock.
///
/// Events fire in time order; events due at the same instant fire in the
/// order they were scheduled.
#[derive(Default)]
pub struct EventLoop {
    state: Mutex<LoopState>,
}

impl EventLoop {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire the earliest pending event. Returns false when none is left.
    pub fn step(&self) -> bool {
        self.step_until(None)
    }

    /// Fire events until none remain; returns how many fired
    pub fn run(&self) -> usize {
        let mut fired = 0;
        while self.step() {
            fired += 1;
        }
        fired
    }

    /// Fire every event due at or before `deadline`, then move the clock to
    /// `deadline`. Returns how many fired.
    pub fn run_until(&self, deadline: SimTime) -> usize {
        let mut fired = 0;
        while self.step_until(Some(deadline)) {
            fired += 1;
        }

        let mut state = self.state.lock();
        if state.now < deadline {
            state.now = deadline;
        }
        fired
    }

    /// Number of events not yet fired
    pub fn pending(&self) -> usize {
        self.state.lock().pending.len()
    }

    fn step_until(&self, deadline: Option<SimTime>) -> bool {
        // The lock is released before the callback runs so it can schedule
        let callback = {
            let mut state = self.state.lock();
            match state.pending.peek() {
                Some(Reverse(next)) if deadline.map_or(true, |d| next.at <= d) => {}
                _ => return false,
            }
            let Some(Reverse(next)) = state.pending.pop() else {
                return false;
            };
            state.now = next.at;
            next.callback
        };

        callback();
        true
    }
}

impl Scheduler for EventLoop {
    fn now(&self) -> SimTime {
        self.state.lock().now
    }

    fn schedule(&self, delay: Duration, callback: Callback) {
        let mut state = self.state.lock();
        let at = state.now.adding(delay);
        let seq = state.next_seq;
        state.next_seq += 1;
        state.pending.push(Reverse(Pending { at, seq, callback }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn recorder() -> (Arc<Mutex<Vec<(u64, &'static str)>>>, Arc<EventLoop>) {
        (Arc::new(Mutex::new(Vec::new())), Arc::new(EventLoop::new()))
    }

    #[test]
    fn test_events_fire_in_time_order() {
        let (log, ev) = recorder();

        for (delay, label) in [(30, "c"), (10, "a"), (20, "b")] {
            let log = Arc::clone(&log);
            let clock = Arc::clone(&ev);
            ev.schedule(
                Duration::from_nanos(delay),
                Box::new(move || log.lock().push((clock.now().nanos, label))),
            );
        }

        assert_eq!(ev.pending(), 3);
        assert_eq!(ev.run(), 3);
        assert_eq!(*log.lock(), vec![(10, "a"), (20, "b"), (30, "c")]);
        assert_eq!(ev.now(), SimTime::from_nanos(30));
    }

    #[test]
    fn test_ties_fire_in_schedule_order() {
        let (log, ev) = recorder();

        for label in ["first", "second", "third"] {
            let log = Arc::clone(&log);
            ev.schedule(Duration::from_nanos(5), Box::new(move || log.lock().push((5, label))));
        }
        ev.run();

        let labels: Vec<_> = log.lock().iter().map(|(_, l)| *l).collect();
        assert_eq!(labels, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_callbacks_can_schedule() {
        let (log, ev) = recorder();

        let inner_log = Arc::clone(&log);
        let inner_ev = Arc::clone(&ev);
        ev.schedule(
            Duration::from_nanos(10),
            Box::new(move || {
                let log = Arc::clone(&inner_log);
                let clock = Arc::clone(&inner_ev);
                inner_ev.schedule(
                    Duration::from_nanos(5),
                    Box::new(move || log.lock().push((clock.now().nanos, "nested"))),
                );
            }),
        );

        assert_eq!(ev.run(), 2);
        assert_eq!(*log.lock(), vec![(15, "nested")]);
    }

    #[test]
    fn test_run_until() {
        let (log, ev) = recorder();

        for delay in [10u64, 20, 30] {
            let log = Arc::clone(&log);
            ev.schedule(Duration::from_nanos(delay), Box::new(move || log.lock().push((delay, "x"))));
        }

        assert_eq!(ev.run_until(SimTime::from_nanos(20)), 2);
        assert_eq!(ev.now(), SimTime::from_nanos(20));
        assert_eq!(ev.pending(), 1);

        assert_eq!(ev.run_until(SimTime::from_nanos(25)), 0);
        assert_eq!(ev.now(), SimTime::from_nanos(25));
    }
}
