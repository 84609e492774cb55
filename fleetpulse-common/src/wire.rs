//! JSON payloads exchanged over the bus. Field names are frozen; the
//! dashboard and any already-deployed nodes parse these exact shapes.

use crate::clock;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeState {
    Online,
    Offline,
}

/// Per-node status heartbeat, published on `node/{uid}/status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeStatus {
    pub uid: String,
    pub name: String,
    pub ip: String,
    pub cpu: f32,
    pub temp: f32,
    pub status: NodeState,
    pub last_seen: String,
}

impl NodeStatus {
    /// The explicit goodbye a node publishes on graceful shutdown: zeroed
    /// metrics, state `offline`, current timestamp.
    pub fn offline_marker(uid: &str, name: &str, ip: &str) -> Self {
        Self {
            uid: uid.to_string(),
            name: name.to_string(),
            ip: ip.to_string(),
            cpu: 0.0,
            temp: 0.0,
            status: NodeState::Offline,
            last_seen: clock::wall_clock(),
        }
    }
}

/// Aggregator liveness beacon, published on `server/heartbeat`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ServerHeartbeat {
    pub timestamp: f64,
}

/// Remote command addressed to one node on `node/{uid}/command`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandMessage {
    pub action: String,
    #[serde(default)]
    pub args: Vec<String>,
}
