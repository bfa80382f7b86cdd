//! Time utilities for the client simulation

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Nominal simulation rate. Movement tuning is expressed per tick at this rate.
pub const SIMULATION_TPS: u32 = 60;
pub const TICK_DURATION_MICROS: u64 = 1_000_000 / SIMULATION_TPS as u64;

/// Get current Unix timestamp in milliseconds
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_millis() as u64
}

/// Duration of one tick at the given rate (falls back to the nominal rate on 0)
pub fn tick_duration(tps: u32) -> Duration {
    let tps = if tps == 0 { SIMULATION_TPS } else { tps };
    Duration::from_micros(1_000_000 / tps as u64)
}

/// A point on the monotonic clock after which a timed state expires.
///
/// Timed transitions (reload, muzzle flash, slide, cooldown) are stored as
/// state + deadline and polled every tick, so there is nothing to cancel when
/// a newer transition replaces an older one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Deadline(Instant);

impl Deadline {
    pub fn after(now: Instant, duration: Duration) -> Self {
        Self(now + duration)
    }

    pub fn is_due(&self, now: Instant) -> bool {
        now >= self.0
    }

    pub fn remaining(&self, now: Instant) -> Duration {
        self.0.saturating_duration_since(now)
    }

    pub fn instant(&self) -> Instant {
        self.0
    }
}

/// A simple timer for measuring durations
#[derive(Debug, Clone)]
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}
