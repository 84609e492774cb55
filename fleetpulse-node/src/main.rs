//! FleetPulse node agent.
//!
//! Announces this machine to the aggregator over MQTT, watches the
//! aggregator's own heartbeat to notice a dead backend, and executes the
//! remote command protocol (rename, shutdown, restart).

mod agent;
mod commands;
mod config;
mod identity;
mod link;
mod metrics;

use anyhow::{Context, Result};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().init();

    let cfg = config::NodeConfig::from_env();
    info!(
        "FleetPulse node agent starting (broker {}:{}, backend {})",
        cfg.broker_host, cfg.broker_port, cfg.backend_url
    );

    let mut agent = agent::NodeAgent::new(cfg);
    agent.run().await.context("agent execution failed")?;
    Ok(())
}
