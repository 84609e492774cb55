//! Node-local view of backend liveness, derived purely from elapsed time
//! since the last aggregator beacon. Independent of the server's view of
//! this node.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

pub struct ServerLink {
    last_beacon: Mutex<Instant>,
    reachable: AtomicBool,
    offline_after: Duration,
}

impl ServerLink {
    /// Starts optimistic: reachable until `offline_after` elapses without a
    /// beacon.
    pub fn new(offline_after: Duration) -> Self {
        Self {
            last_beacon: Mutex::new(Instant::now()),
            reachable: AtomicBool::new(true),
            offline_after,
        }
    }

    /// Records a received beacon. Returns true when this flipped the flag
    /// back to reachable, so the caller logs the transition exactly once.
    pub fn observe_beacon(&self, now: Instant) -> bool {
        *self.last_beacon.lock() = now;
        !self.reachable.swap(true, Ordering::SeqCst)
    }

    /// Periodic check. Returns true only on the reachable -> unreachable
    /// transition; repeated ticks while already unreachable return false.
    pub fn tick(&self, now: Instant) -> bool {
        let elapsed = now.saturating_duration_since(*self.last_beacon.lock());
        if elapsed > self.offline_after {
            self.reachable.swap(false, Ordering::SeqCst)
        } else {
            false
        }
    }

    pub fn is_reachable(&self) -> bool {
        self.reachable.load(Ordering::SeqCst)
    }
}
