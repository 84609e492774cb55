use fleetpulse_common::log::LogLevel;
use serde::{Deserialize, Serialize};
use std::{path::Path, time::Duration};
use tokio::fs;

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct BackendConfig {
    pub mqtt: MqttConf,
    pub http_port: u16,
    pub heartbeat_interval_secs: u64,
    pub offline_timeout_secs: u64,
    pub removal_timeout_secs: u64,
    pub min_log_level: LogLevel,
    pub identity_path: String,
    pub log_capacity: usize,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct MqttConf {
    pub host: String,
    pub port: u16,
}

impl Default for MqttConf {
    fn default() -> Self {
        Self { host: "localhost".into(), port: 1883 }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            mqtt: MqttConf::default(),
            http_port: 8000,
            heartbeat_interval_secs: 2,
            offline_timeout_secs: 5,
            removal_timeout_secs: 300,
            min_log_level: LogLevel::Info,
            identity_path: "data/identities.json".into(),
            log_capacity: 1000,
        }
    }
}

impl BackendConfig {
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    pub fn offline_timeout(&self) -> Duration {
        Duration::from_secs(self.offline_timeout_secs)
    }

    pub fn removal_timeout(&self) -> Duration {
        Duration::from_secs(self.removal_timeout_secs)
    }
}

pub async fn load_config() -> BackendConfig {
    let path = std::env::var("FLEETPULSE_BACKEND_CONFIG").unwrap_or_else(|_| "backend.yaml".into());
    if Path::new(&path).exists() {
        let txt = fs::read_to_string(&path).await.unwrap_or_default();
        if txt.trim().is_empty() {
            return BackendConfig::default();
        }
        serde_yaml::from_str(&txt).unwrap_or_else(|e| {
            eprintln!("[backend] invalid config {path}: {e}");
            BackendConfig::default()
        })
    } else {
        eprintln!("[backend] no {path}, using default config");
        BackendConfig::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_every_threshold() {
        let cfg = BackendConfig::default();
        assert_eq!(cfg.heartbeat_interval(), Duration::from_secs(2));
        assert_eq!(cfg.offline_timeout(), Duration::from_secs(5));
        assert_eq!(cfg.removal_timeout(), Duration::from_secs(300));
        assert_eq!(cfg.http_port, 8000);
        assert_eq!(cfg.log_capacity, 1000);
        assert_eq!(cfg.min_log_level, LogLevel::Info);
    }

    #[test]
    fn partial_yaml_fills_missing_fields_from_defaults() {
        let cfg: BackendConfig =
            serde_yaml::from_str("offline_timeout_secs: 10\nmin_log_level: W\n").unwrap();
        assert_eq!(cfg.offline_timeout_secs, 10);
        assert_eq!(cfg.min_log_level, LogLevel::Warning);
        assert_eq!(cfg.removal_timeout_secs, 300);
        assert_eq!(cfg.mqtt.port, 1883);
    }
}
