//! FleetPulse backend - central aggregator for the node fleet.
//!
//! Wires together the building blocks: config, identity registry, liveness
//! table, MQTT listener, heartbeat/sweep loop, and the REST API. Nothing
//! here is fatal after startup except losing the HTTP listener; transport
//! and storage failures degrade with a logged warning.

mod config;
mod fleet;
mod heartbeat;
mod http;
mod journal;
mod mqtt;
mod registry;

use crate::fleet::FleetTable;
use crate::journal::Journal;
use crate::registry::{IdentityRegistry, LoadReport};
use fleetpulse_common::log::LogLevel;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let cfg = config::load_config().await;

    let (client, eventloop) = mqtt::create_mqtt_client(&cfg);
    let journal = Journal::new(cfg.log_capacity, client.clone());

    // Identity registry: any load failure degrades to an empty table.
    if let Some(parent) = Path::new(&cfg.identity_path).parent() {
        std::fs::create_dir_all(parent).unwrap_or_else(|e| {
            eprintln!("[backend] warning: failed to create {}: {e}", parent.display());
        });
    }
    let registry = Arc::new(IdentityRegistry::new(&cfg.identity_path));
    match registry.load() {
        Ok(LoadReport::Missing) => {
            journal
                .record(
                    LogLevel::Info,
                    format!("{} not found, starting with empty table", cfg.identity_path),
                )
                .await;
        }
        Ok(LoadReport::Loaded(count)) => {
            println!("[backend] loaded {count} identities from {}", cfg.identity_path);
        }
        Err(e) => {
            journal
                .record(
                    LogLevel::Warning,
                    format!("Failed to load {} ({e}), starting with empty table", cfg.identity_path),
                )
                .await;
        }
    }

    let fleet = Arc::new(FleetTable::new(cfg.offline_timeout(), cfg.removal_timeout()));

    mqtt::spawn_mqtt_listener(eventloop, client.clone(), fleet.clone(), journal.clone());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let heartbeat = heartbeat::spawn_heartbeat_loop(
        client.clone(),
        fleet.clone(),
        journal.clone(),
        cfg.heartbeat_interval(),
        shutdown_rx,
    );

    let app = http::build_router(http::AppState {
        fleet,
        registry,
        journal,
        min_log_level: cfg.min_log_level,
    });

    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.http_port));
    println!("[backend] listening on http://{addr}");
    let listener = TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap();

    // Stop the heartbeat between cycles and wait it out before the
    // transport goes away, so no sweep runs against a closed session.
    println!("[backend] shutting down");
    let _ = shutdown_tx.send(true);
    let _ = heartbeat.await;
    let _ = client.disconnect().await;
    println!("[backend] shut down cleanly");
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
