//! Clocks for the simulation harness
//!
//! - Lockstep: a [`MockTime`] advanced by exactly one period per cycle, so
//!   runs are deterministic and faster than real time
//! - Realtime: a [`WallClock`] paced by a tokio interval

use std::time::Instant;

use robocycle_core::{MockTime, TimeSource};

/// Monotonic clock backed by `std::time::Instant`
#[derive(Debug, Clone, Copy)]
pub struct WallClock {
    epoch: Instant,
}

impl WallClock {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Default for WallClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for WallClock {
    fn now_us(&self) -> u64 {
        u64::try_from(self.epoch.elapsed().as_micros()).unwrap_or(u64::MAX)
    }
}

/// Clock driving a [`Simulation`](crate::harness::Simulation)
#[derive(Debug, Clone)]
pub enum SimClock {
    Lockstep(MockTime),
    Realtime(WallClock),
}

impl SimClock {
    pub fn is_lockstep(&self) -> bool {
        matches!(self, Self::Lockstep(_))
    }

    /// Move lockstep time forward; wall time moves on its own
    pub fn advance(&self, us: u64) {
        if let Self::Lockstep(time) = self {
            time.advance(us);
        }
    }
}

impl TimeSource for SimClock {
    fn now_us(&self) -> u64 {
        match self {
            Self::Lockstep(time) => time.now_us(),
            Self::Realtime(time) => time.now_us(),
        }
    }
}
