use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use std::time::Instant;

/// Monotonic millisecond clock used for view-session bookkeeping.
///
/// Durations are always computed as the difference of two readings from the
/// same clock, so the epoch is irrelevant.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> u64;
}

/// Clock anchored at construction time.
#[derive(Debug, Clone)]
pub struct SystemClock {
    anchor: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            anchor: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        self.anchor.elapsed().as_millis() as u64
    }
}

/// Hand-driven clock for scripted scroll sessions and tests.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, ms: u64) {
        self.now.store(ms, Ordering::SeqCst);
    }

    pub fn advance(&self, ms: u64) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}
