//! Time sources injected into every time-dependent decision.

use chrono::{DateTime, Duration, Utc};
use std::sync::RwLock;

/// Source of the current time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually driven clock for tests
#[derive(Debug)]
pub struct FixedClock {
    now: RwLock<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: RwLock::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        match self.now.write() {
            Ok(mut guard) => *guard = now,
            Err(poisoned) => *poisoned.into_inner() = now,
        }
    }

    pub fn advance(&self, by: Duration) {
        let next = self.now() + by;
        self.set(next);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        match self.now.read() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

/// Reports how long the serving instance has been alive.
///
/// Injected at startup so behind several instances each one reports its own
/// liveness instead of relying on module state.
pub trait LivenessProvider: Send + Sync {
    fn started_at(&self) -> DateTime<Utc>;

    fn uptime_seconds(&self, now: DateTime<Utc>) -> i64 {
        (now - self.started_at()).num_seconds().max(0)
    }
}

/// Liveness anchored at an explicit start time
#[derive(Debug, Clone, Copy)]
pub struct InstanceLiveness {
    started_at: DateTime<Utc>,
}

impl InstanceLiveness {
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self { started_at }
    }

    /// Liveness starting at the clock's current time
    pub fn starting_now(clock: &dyn Clock) -> Self {
        Self::new(clock.now())
    }
}

impl LivenessProvider for InstanceLiveness {
    fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }
}
