//! REST surface consumed by the dashboard.
//!
//! Three routes: the fleet snapshot, the recent log tail, and node
//! registration. Registration is the only mutating call and goes through
//! the identity registry's serialized resolve.

use crate::fleet::FleetTable;
use crate::journal::Journal;
use crate::registry::IdentityRegistry;
use axum::{extract::State, routing::{get, post}, Json, Router};
use fleetpulse_common::bus::MessageBus;
use fleetpulse_common::log::{LogEntry, LogLevel};
use fleetpulse_common::wire::NodeStatus;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Cap on entries returned by `GET /api/logs`.
const LOG_TAIL_LIMIT: usize = 100;

#[derive(Clone)]
pub struct AppState<B: MessageBus> {
    pub fleet: Arc<FleetTable>,
    pub registry: Arc<IdentityRegistry>,
    pub journal: Journal<B>,
    pub min_log_level: LogLevel,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub uid: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub name: String,
}

pub fn build_router<B: MessageBus>(state: AppState<B>) -> Router {
    Router::new()
        .route("/api/nodes", get(get_nodes::<B>))
        .route("/api/logs", get(get_logs::<B>))
        .route("/api/register", post(register_node::<B>))
        .with_state(state)
}

async fn get_nodes<B: MessageBus>(State(app): State<AppState<B>>) -> Json<Vec<NodeStatus>> {
    Json(app.fleet.snapshot())
}

async fn get_logs<B: MessageBus>(State(app): State<AppState<B>>) -> Json<Vec<LogEntry>> {
    Json(app.journal.tail(LOG_TAIL_LIMIT, app.min_log_level))
}

async fn register_node<B: MessageBus>(
    State(app): State<AppState<B>>,
    Json(req): Json<RegisterRequest>,
) -> Json<RegisterResponse> {
    app.journal
        .record(LogLevel::Info, format!("Register request from {}", req.uid))
        .await;

    let res = app.registry.resolve(&req.uid);
    if res.created {
        if let Some(err) = &res.persist_error {
            app.journal
                .record(LogLevel::Warning, format!("Failed to persist identity for {}: {err}", req.uid))
                .await;
        }
        app.journal
            .record(
                LogLevel::Info,
                format!("Did not find {} in table, registered {} -> {}", req.uid, req.uid, res.name),
            )
            .await;
    } else {
        app.journal
            .record(LogLevel::Info, format!("Found {} in table, returning {}", req.uid, res.name))
            .await;
    }

    Json(RegisterResponse { name: res.name })
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetpulse_common::bus::MockBus;
    use fleetpulse_common::wire::{NodeState, NodeStatus};
    use std::time::{Duration, Instant};

    fn state(dir: &tempfile::TempDir) -> AppState<MockBus> {
        AppState {
            fleet: Arc::new(FleetTable::new(Duration::from_secs(5), Duration::from_secs(300))),
            registry: Arc::new(IdentityRegistry::new(dir.path().join("identities.json"))),
            journal: Journal::new(1000, MockBus::new()),
            min_log_level: LogLevel::Info,
        }
    }

    #[tokio::test]
    async fn register_assigns_once_and_journals() {
        let dir = tempfile::tempdir().unwrap();
        let app = state(&dir);

        let Json(first) = register_node(
            State(app.clone()),
            Json(RegisterRequest { uid: "b827eb4f1c22".into() }),
        )
        .await;
        let Json(second) = register_node(
            State(app.clone()),
            Json(RegisterRequest { uid: "b827eb4f1c22".into() }),
        )
        .await;

        assert_eq!(first.name, second.name);

        let tail = app.journal.tail(100, LogLevel::Info);
        assert!(tail.iter().any(|e| e.message.contains("Register request from b827eb4f1c22")));
        assert!(tail.iter().any(|e| e.message.contains("registered b827eb4f1c22 ->")));
        assert!(tail.iter().any(|e| e.message.contains("Found b827eb4f1c22 in table")));
    }

    #[tokio::test]
    async fn nodes_endpoint_serves_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let app = state(&dir);
        app.fleet.ingest(
            NodeStatus {
                uid: "abc".into(),
                name: "Node-ABC".into(),
                ip: "10.0.0.2".into(),
                cpu: 3.0,
                temp: 41.0,
                status: NodeState::Online,
                last_seen: "2026-08-23T10:00:00".into(),
            },
            Instant::now(),
        );

        let Json(nodes) = get_nodes(State(app)).await;
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].uid, "abc");
    }

    #[tokio::test]
    async fn logs_endpoint_filters_and_limits() {
        let dir = tempfile::tempdir().unwrap();
        let app = state(&dir);
        for i in 0..150 {
            app.journal.append(LogEntry::new("Node-ABC", LogLevel::Warning, format!("w {i}")));
            app.journal.append(LogEntry::new("Node-ABC", LogLevel::Debug, format!("d {i}")));
        }

        let Json(logs) = get_logs(State(app)).await;
        assert_eq!(logs.len(), 100);
        // min level Info: debug entries never show up even though more recent.
        assert!(logs.iter().all(|e| e.level >= LogLevel::Info));
        assert_eq!(logs.last().unwrap().message, "w 149");
    }
}
