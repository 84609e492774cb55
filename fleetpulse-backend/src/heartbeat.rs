//! Aggregator heartbeat loop: the single timer behind offline detection.
//!
//! Each tick publishes the server liveness beacon and then runs one sweep
//! over the fleet table. The loop stops cooperatively between cycles via a
//! watch channel and is awaited by the shutdown path before the transport
//! closes.

use crate::fleet::FleetTable;
use crate::journal::Journal;
use fleetpulse_common::bus::MessageBus;
use fleetpulse_common::log::LogLevel;
use fleetpulse_common::topics;
use fleetpulse_common::wire::ServerHeartbeat;
use fleetpulse_common::clock;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinHandle;

pub fn spawn_heartbeat_loop<B: MessageBus>(
    bus: B,
    fleet: Arc<FleetTable>,
    journal: Journal<B>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    journal.record(LogLevel::Debug, "Sending server heartbeat").await;

                    let beat = ServerHeartbeat { timestamp: clock::epoch_secs() };
                    if let Ok(payload) = serde_json::to_vec(&beat) {
                        if let Err(e) = bus.publish(topics::SERVER_HEARTBEAT, payload).await {
                            eprintln!("[heartbeat] publish failed: {e:?}");
                        }
                    }

                    let outcome = fleet.sweep(Instant::now());
                    for uid in &outcome.marked_offline {
                        journal.record(LogLevel::Debug, format!("Marking node {uid} as offline")).await;
                    }
                    for uid in &outcome.removed {
                        journal.record(LogLevel::Warning, format!("Removing node {uid} due to inactivity")).await;
                    }
                }
                _ = shutdown.changed() => break,
            }
        }
    })
}
