//! Virtual time

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// An instant on the simulation's virtual clock, in nanoseconds since the
/// clock started.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SimTime {
    pub nanos: u64,
}

impl SimTime {
    pub const ZERO: SimTime = SimTime { nanos: 0 };

    pub fn from_nanos(nanos: u64) -> Self {
        Self { nanos }
    }

    pub fn from_micros(micros: u64) -> Self {
        Self { nanos: micros.saturating_mul(1_000) }
    }

    pub fn adding(&self, delay: Duration) -> Self {
        let delay = u64::try_from(delay.as_nanos()).unwrap_or(u64::MAX);
        Self { nanos: self.nanos.saturating_add(delay) }
    }

    /// Time elapsed since `earlier`, or `None` if `earlier` is in the future.
    pub fn since(&self, earlier: SimTime) -> Option<Duration> {
        self.nanos.checked_sub(earlier.nanos).map(Duration::from_nanos)
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ns", self.nanos)
    }
}
