//! MQTT ingestion: subscriptions, the listener task, and the pure routing
//! step that turns `{topic, payload}` into a typed inbound event.

use crate::config::BackendConfig;
use crate::fleet::FleetTable;
use crate::journal::{self, Journal};
use fleetpulse_common::bus::MessageBus;
use fleetpulse_common::log::{LogEntry, LogLevel};
use fleetpulse_common::topics::{self, TopicKind};
use fleetpulse_common::wire::NodeStatus;
use rumqttc::{AsyncClient, Event, EventLoop, Incoming, MqttOptions, QoS};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

pub fn create_mqtt_client(cfg: &BackendConfig) -> (AsyncClient, EventLoop) {
    let mut opts = MqttOptions::new("fleetpulse-backend", &cfg.mqtt.host, cfg.mqtt.port);
    opts.set_keep_alive(Duration::from_secs(15));
    AsyncClient::new(opts, 64)
}

/// Typed result of routing one inbound message.
#[derive(Debug, PartialEq)]
pub enum Inbound {
    Status(NodeStatus),
    Log(LogEntry),
    /// Our own journal entries echoed back by the broker; skipped to avoid
    /// double-appending.
    SelfLog,
    Malformed { topic: String, error: String },
    Unrouted,
}

pub fn decode_message(topic: &str, payload: &[u8]) -> Inbound {
    match topics::classify(topic) {
        Some((_, TopicKind::Status)) => match serde_json::from_slice::<NodeStatus>(payload) {
            Ok(status) => Inbound::Status(status),
            Err(e) => Inbound::Malformed { topic: topic.to_string(), error: e.to_string() },
        },
        Some((uid, TopicKind::Log)) if uid == journal::ORIGIN => Inbound::SelfLog,
        Some((_, TopicKind::Log)) => match serde_json::from_slice::<LogEntry>(payload) {
            Ok(entry) => Inbound::Log(entry),
            Err(e) => Inbound::Malformed { topic: topic.to_string(), error: e.to_string() },
        },
        _ => Inbound::Unrouted,
    }
}

/// Drives the MQTT event loop: subscribes to per-node status and log topics
/// and routes every publish. Transport errors back off 2s and keep going.
pub fn spawn_mqtt_listener<B: MessageBus>(
    mut eventloop: EventLoop,
    client: AsyncClient,
    fleet: Arc<FleetTable>,
    journal: Journal<B>,
) -> JoinHandle<()> {
    tokio::task::spawn(async move {
        for filter in [topics::NODE_STATUS_FILTER, topics::NODE_LOG_FILTER] {
            if let Err(e) = client.subscribe(filter, QoS::AtLeastOnce).await {
                eprintln!("[mqtt] subscribe {filter} failed: {e:?}");
                return;
            }
        }

        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Incoming::Publish(p))) => {
                    match decode_message(&p.topic, &p.payload) {
                        Inbound::Status(status) => fleet.ingest(status, Instant::now()),
                        Inbound::Log(entry) => journal.append(entry),
                        Inbound::SelfLog | Inbound::Unrouted => {}
                        Inbound::Malformed { topic, error } => {
                            journal
                                .record(
                                    LogLevel::Error,
                                    format!("Dropping malformed payload on {topic}: {error}"),
                                )
                                .await;
                        }
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    eprintln!("[mqtt] transport error: {e:?}");
                    tokio::time::sleep(Duration::from_secs(2)).await;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetpulse_common::wire::NodeState;

    #[test]
    fn status_messages_are_routed_and_parsed() {
        let payload = br#"{
            "uid": "abc", "name": "Node-ABC", "ip": "10.0.0.2",
            "cpu": 7.5, "temp": 42.0, "status": "online",
            "last_seen": "2026-08-23T10:00:00"
        }"#;
        match decode_message("node/abc/status", payload) {
            Inbound::Status(status) => {
                assert_eq!(status.uid, "abc");
                assert_eq!(status.status, NodeState::Online);
            }
            other => panic!("expected status, got {other:?}"),
        }
    }

    #[test]
    fn node_logs_are_routed() {
        let payload = br#"{
            "timestamp": "2026-08-23T10:00:00", "origin": "Node-ABC",
            "level": "I", "message": "Heartbeat check"
        }"#;
        match decode_message("node/abc/log", payload) {
            Inbound::Log(entry) => assert_eq!(entry.message, "Heartbeat check"),
            other => panic!("expected log, got {other:?}"),
        }
    }

    #[test]
    fn own_log_topic_is_skipped() {
        assert_eq!(decode_message("node/backend/log", b"{}"), Inbound::SelfLog);
    }

    #[test]
    fn malformed_payload_is_reported_not_fatal() {
        match decode_message("node/abc/status", b"not json") {
            Inbound::Malformed { topic, .. } => assert_eq!(topic, "node/abc/status"),
            other => panic!("expected malformed, got {other:?}"),
        }
        // Missing required fields counts as malformed too.
        match decode_message("node/abc/status", br#"{"uid": "abc"}"#) {
            Inbound::Malformed { .. } => {}
            other => panic!("expected malformed, got {other:?}"),
        }
    }

    #[test]
    fn unrelated_topics_are_ignored() {
        assert_eq!(decode_message("server/heartbeat", b"{}"), Inbound::Unrouted);
        assert_eq!(decode_message("node/abc/command", b"{}"), Inbound::Unrouted);
    }
}
