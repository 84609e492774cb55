//! Generated display names for nodes.

use rand::Rng;

/// A fresh human-readable name: `Node-` plus three uppercase letters drawn
/// uniformly. Collisions against existing names are not checked; nothing
/// depends on uniqueness.
pub fn generate_name() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..3).map(|_| rng.gen_range(b'A'..=b'Z') as char).collect();
    format!("Node-{suffix}")
}
