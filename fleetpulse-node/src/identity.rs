//! Node identity: the stable hardware uid and name resolution against the
//! backend's identity registry.

use anyhow::Result;
use fleetpulse_common::names;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

/// Stable identifier for this machine: the primary MAC without separators,
/// or a random uuid when no interface reports one.
pub fn hardware_uid() -> String {
    match mac_address::get_mac_address() {
        Ok(Some(mac)) => mac.to_string().replace(':', "").to_lowercase(),
        _ => {
            warn!("no MAC address available, falling back to a generated uid");
            uuid::Uuid::new_v4().simple().to_string()
        }
    }
}

#[derive(Serialize)]
struct RegisterRequest<'a> {
    uid: &'a str,
}

#[derive(Deserialize)]
struct RegisterResponse {
    name: String,
}

/// Asks the backend for this node's display name. Registration failure is
/// never fatal and never blocks past the timeout: the agent synthesizes a
/// temporary random name and keeps operating.
pub async fn resolve_name(backend_url: &str, uid: &str, timeout: Duration) -> String {
    match request_name(backend_url, uid, timeout).await {
        Ok(name) => {
            info!("registered with backend as {name}");
            name
        }
        Err(e) => {
            let fallback = names::generate_name();
            warn!("registration failed ({e}), using temporary name {fallback}");
            fallback
        }
    }
}

async fn request_name(backend_url: &str, uid: &str, timeout: Duration) -> Result<String> {
    let client = reqwest::Client::builder().timeout(timeout).build()?;
    let resp = client
        .post(format!("{backend_url}/api/register"))
        .json(&RegisterRequest { uid })
        .send()
        .await?
        .error_for_status()?;
    Ok(resp.json::<RegisterResponse>().await?.name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hardware_uid_has_no_separators() {
        let uid = hardware_uid();
        assert!(!uid.is_empty());
        assert!(!uid.contains(':'));
        assert!(!uid.contains('-'));
    }

    #[tokio::test]
    async fn unreachable_backend_falls_back_to_temporary_name() {
        // Port 9 (discard) is not listening; the call fails fast.
        let name = resolve_name("http://127.0.0.1:9", "abc", Duration::from_millis(200)).await;
        assert!(name.starts_with("Node-"));
        assert_eq!(name.len(), 8);
    }
}
