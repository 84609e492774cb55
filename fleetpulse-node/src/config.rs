//! Agent configuration: built-in defaults with environment overrides for
//! broker and backend locations.

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub broker_host: String,
    pub broker_port: u16,
    pub backend_url: String,
    pub heartbeat_interval: Duration,
    pub monitor_interval: Duration,
    /// Silence after which the backend is considered unreachable; three
    /// missed 2s beacons.
    pub server_offline_timeout: Duration,
    pub restart_delay: Duration,
    pub register_timeout: Duration,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            broker_host: "localhost".to_string(),
            broker_port: 1883,
            backend_url: "http://localhost:8000".to_string(),
            heartbeat_interval: Duration::from_secs(2),
            monitor_interval: Duration::from_secs(1),
            server_offline_timeout: Duration::from_secs(6),
            restart_delay: Duration::from_millis(500),
            register_timeout: Duration::from_secs(5),
        }
    }
}

impl NodeConfig {
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Ok(host) = std::env::var("FLEETPULSE_BROKER_HOST") {
            cfg.broker_host = host;
        }
        if let Ok(port) = std::env::var("FLEETPULSE_BROKER_PORT") {
            if let Ok(port) = port.parse() {
                cfg.broker_port = port;
            }
        }
        if let Ok(url) = std::env::var("FLEETPULSE_BACKEND_URL") {
            cfg.backend_url = url;
        }
        if let Ok(secs) = std::env::var("FLEETPULSE_HEARTBEAT_SECS") {
            if let Ok(secs) = secs.parse() {
                cfg.heartbeat_interval = Duration::from_secs(secs);
            }
        }
        cfg
    }
}
