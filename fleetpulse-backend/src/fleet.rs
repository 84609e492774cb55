//! Liveness table: the backend's in-memory view of every known node.
//!
//! Records arrive from the MQTT listener (`ingest`) and age out under the
//! heartbeat loop's `sweep`. Elapsed time is measured against the `Instant`
//! the message was received, not the wall-clock string the node put on the
//! wire, so clock skew between nodes cannot flap liveness.

use fleetpulse_common::wire::{NodeState, NodeStatus};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};

#[derive(Debug)]
struct NodeRecord {
    status: NodeStatus,
    seen_at: Instant,
}

pub struct FleetTable {
    nodes: Mutex<HashMap<String, NodeRecord>>,
    offline_after: Duration,
    remove_after: Duration,
}

/// What one sweep pass did, for the caller to journal.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SweepOutcome {
    pub marked_offline: Vec<String>,
    pub removed: Vec<String>,
}

impl FleetTable {
    pub fn new(offline_after: Duration, remove_after: Duration) -> Self {
        Self {
            nodes: Mutex::new(HashMap::new()),
            offline_after,
            remove_after,
        }
    }

    /// Upsert by uid, last write wins. An explicit `offline` payload is
    /// stored as-is, which is how a graceful shutdown shows up immediately.
    pub fn ingest(&self, status: NodeStatus, now: Instant) {
        let mut nodes = self.nodes.lock();
        nodes.insert(status.uid.clone(), NodeRecord { status, seen_at: now });
    }

    /// Single consistent pass over every record. Both thresholds are strict
    /// greater-than: a record exactly at a threshold is still live. Removal
    /// short-circuits the offline branch, so no node appears in both lists.
    pub fn sweep(&self, now: Instant) -> SweepOutcome {
        let mut nodes = self.nodes.lock();
        let mut outcome = SweepOutcome::default();
        nodes.retain(|uid, record| {
            let elapsed = now.saturating_duration_since(record.seen_at);
            if elapsed > self.remove_after {
                outcome.removed.push(uid.clone());
                return false;
            }
            if elapsed > self.offline_after && record.status.status != NodeState::Offline {
                record.status.status = NodeState::Offline;
                outcome.marked_offline.push(uid.clone());
            }
            true
        });
        outcome
    }

    /// Point-in-time copy of every record, safe to serialize while ingest
    /// and sweep keep running.
    pub fn snapshot(&self) -> Vec<NodeStatus> {
        self.nodes.lock().values().map(|r| r.status.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.nodes.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.lock().is_empty()
    }
}
