//! Reported node metrics. CPU load and temperature are simulated for now;
//! the wire shape is what matters to the dashboard.

use rand::Rng;

pub fn sample_cpu() -> f32 {
    round1(rand::thread_rng().gen_range(5.0..30.0))
}

pub fn sample_temp() -> f32 {
    round1(rand::thread_rng().gen_range(40.0..60.0))
}

fn round1(v: f32) -> f32 {
    (v * 10.0).round() / 10.0
}

/// First non-loopback IPv4 address, `0.0.0.0` when none is available.
pub fn local_ip() -> String {
    match if_addrs::get_if_addrs() {
        Ok(ifaces) => ifaces
            .iter()
            .find(|i| !i.is_loopback() && i.ip().is_ipv4())
            .map(|i| i.ip().to_string())
            .unwrap_or_else(|| "0.0.0.0".to_string()),
        Err(_) => "0.0.0.0".to_string(),
    }
}
