//! Identity registry: durable uid -> generated display name mapping.
//!
//! A hardware identifier gets exactly one name for its lifetime, surviving
//! table removal and backend restarts. Creation is serialized under the
//! table lock and the whole file is rewritten synchronously before the name
//! is handed back, so a crash right after responding cannot lose a mapping
//! that a node already received.

use fleetpulse_common::names;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("identity file unreadable: {0}")]
    Unreadable(#[from] std::io::Error),
    #[error("identity file is not a JSON object of names: {0}")]
    Malformed(#[from] serde_json::Error),
}

#[derive(Debug)]
pub enum LoadReport {
    /// No identity file yet; starting with an empty table.
    Missing,
    Loaded(usize),
}

pub struct IdentityRegistry {
    entries: Mutex<HashMap<String, String>>,
    path: PathBuf,
}

/// Result of a `resolve` call. `persist_error` carries a failed durable
/// write; the name is still valid in memory and must be journaled as a
/// warning by the caller.
#[derive(Debug)]
pub struct Resolution {
    pub name: String,
    pub created: bool,
    pub persist_error: Option<String>,
}

impl IdentityRegistry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            path: path.into(),
        }
    }

    /// Reads the identity file. Failures never abort startup; the caller
    /// downgrades them to a warning and continues with an empty table.
    pub fn load(&self) -> Result<LoadReport, RegistryError> {
        if !self.path.exists() {
            return Ok(LoadReport::Missing);
        }
        let content = fs::read_to_string(&self.path)?;
        let loaded: HashMap<String, String> = serde_json::from_str(&content)?;
        let count = loaded.len();
        *self.entries.lock() = loaded;
        Ok(LoadReport::Loaded(count))
    }

    /// Known identifier: return its name, no side effect. Unknown: generate
    /// a name, persist the pair, return it. The check-then-create runs under
    /// one lock, so racing first-time calls for the same uid yield exactly
    /// one name.
    pub fn resolve(&self, uid: &str) -> Resolution {
        let mut entries = self.entries.lock();
        if let Some(name) = entries.get(uid) {
            return Resolution {
                name: name.clone(),
                created: false,
                persist_error: None,
            };
        }

        let name = names::generate_name();
        entries.insert(uid.to_string(), name.clone());
        let persist_error = self.persist(&entries).err().map(|e| e.to_string());
        Resolution {
            name,
            created: true,
            persist_error,
        }
    }

    fn persist(&self, entries: &HashMap<String, String>) -> std::io::Result<()> {
        let content = serde_json::to_string_pretty(entries)?;
        fs::write(&self.path, content)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn registry_in(dir: &tempfile::TempDir) -> IdentityRegistry {
        IdentityRegistry::new(dir.path().join("identities.json"))
    }

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let reg = registry_in(&dir);
        assert!(matches!(reg.load().unwrap(), LoadReport::Missing));
        assert!(reg.is_empty());
    }

    #[test]
    fn corrupt_file_is_an_error_not_a_panic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("identities.json");
        fs::write(&path, "not json at all {{{").unwrap();
        let reg = IdentityRegistry::new(&path);
        assert!(matches!(reg.load(), Err(RegistryError::Malformed(_))));
        assert!(reg.is_empty());
    }

    #[test]
    fn wrong_shape_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("identities.json");
        fs::write(&path, "[1, 2, 3]").unwrap();
        let reg = IdentityRegistry::new(&path);
        assert!(matches!(reg.load(), Err(RegistryError::Malformed(_))));
    }

    #[test]
    fn resolve_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let reg = registry_in(&dir);

        let first = reg.resolve("b827eb4f1c22");
        assert!(first.created);
        assert!(first.persist_error.is_none());

        let second = reg.resolve("b827eb4f1c22");
        assert!(!second.created);
        assert_eq!(second.name, first.name);
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn created_entry_is_durable_before_return() {
        let dir = tempfile::tempdir().unwrap();
        let reg = registry_in(&dir);
        let res = reg.resolve("aabbccddeeff");

        // A second registry over the same file sees the mapping.
        let other = registry_in(&dir);
        assert!(matches!(other.load().unwrap(), LoadReport::Loaded(1)));
        assert_eq!(other.resolve("aabbccddeeff").name, res.name);
    }

    #[test]
    fn concurrent_first_time_calls_yield_one_name() {
        let dir = tempfile::tempdir().unwrap();
        let reg = Arc::new(registry_in(&dir));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let reg = reg.clone();
            handles.push(std::thread::spawn(move || reg.resolve("same-uid").name));
        }
        let names: Vec<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(names.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn persist_failure_still_returns_a_name() {
        // Point the registry at a path whose parent does not exist.
        let reg = IdentityRegistry::new("/nonexistent-dir-fleetpulse/identities.json");
        let res = reg.resolve("aabbccddeeff");
        assert!(res.created);
        assert!(res.persist_error.is_some());
        assert_eq!(res.name.len(), 8);
        // In-memory entry survives for the life of the process.
        assert!(!reg.resolve("aabbccddeeff").created);
    }
}
