//! Topic layout and inbound routing.
//!
//! Per-node traffic lives under `node/{uid}/{status,log,command}`; the
//! aggregator beacon has its own `server/heartbeat` topic.

pub const SERVER_HEARTBEAT: &str = "server/heartbeat";

/// Wildcard filters the backend subscribes with.
pub const NODE_STATUS_FILTER: &str = "node/+/status";
pub const NODE_LOG_FILTER: &str = "node/+/log";

pub fn status(uid: &str) -> String {
    format!("node/{uid}/status")
}

pub fn log(uid: &str) -> String {
    format!("node/{uid}/log")
}

pub fn command(uid: &str) -> String {
    format!("node/{uid}/command")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicKind {
    Status,
    Log,
    Command,
}

/// Splits a `node/{uid}/{suffix}` topic into its uid and kind.
/// Anything else (including `server/heartbeat`) returns `None`.
pub fn classify(topic: &str) -> Option<(&str, TopicKind)> {
    let rest = topic.strip_prefix("node/")?;
    let (uid, suffix) = rest.rsplit_once('/')?;
    if uid.is_empty() || uid.contains('/') {
        return None;
    }
    let kind = match suffix {
        "status" => TopicKind::Status,
        "log" => TopicKind::Log,
        "command" => TopicKind::Command,
        _ => return None,
    };
    Some((uid, kind))
}
