//! Backend domain log sink.
//!
//! Every backend event goes three ways: into the rolling buffer served by
//! `/api/logs`, to stdout, and onto `node/backend/log` so external observers
//! of the bus see backend activity too (the listener skips that topic on the
//! way back in, see `mqtt::decode_message`).

use fleetpulse_common::bus::MessageBus;
use fleetpulse_common::log::{LogBuffer, LogEntry, LogLevel};
use fleetpulse_common::topics;
use parking_lot::Mutex;
use std::sync::Arc;

/// Origin label and topic segment for backend-issued entries.
pub const ORIGIN: &str = "backend";

#[derive(Clone)]
pub struct Journal<B: MessageBus> {
    buffer: Arc<Mutex<LogBuffer>>,
    bus: B,
}

impl<B: MessageBus> Journal<B> {
    pub fn new(capacity: usize, bus: B) -> Self {
        Self {
            buffer: Arc::new(Mutex::new(LogBuffer::new(capacity))),
            bus,
        }
    }

    /// Records a backend event: buffer, stdout, bus. Publish failures are
    /// non-fatal; the next heartbeat tick retries naturally.
    pub async fn record(&self, level: LogLevel, message: impl Into<String>) {
        let entry = LogEntry::new(ORIGIN, level, message.into());
        println!("[backend] {} {}", entry.level.as_letter(), entry.message);
        self.buffer.lock().push(entry.clone());

        if let Ok(payload) = serde_json::to_vec(&entry) {
            if let Err(e) = self.bus.publish(&topics::log(ORIGIN), payload).await {
                eprintln!("[backend] failed to publish log entry: {e:?}");
            }
        }
    }

    /// Appends an entry received from the bus (node-originated logs).
    pub fn append(&self, entry: LogEntry) {
        self.buffer.lock().push(entry);
    }

    /// Most recent `limit` entries at or above `min_level`.
    pub fn tail(&self, limit: usize, min_level: LogLevel) -> Vec<LogEntry> {
        self.buffer.lock().tail(limit, min_level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetpulse_common::bus::MockBus;

    #[tokio::test]
    async fn record_buffers_and_republishes() {
        let bus = MockBus::new();
        let journal = Journal::new(100, bus.clone());

        journal.record(LogLevel::Warning, "something aged out").await;

        let tail = journal.tail(10, LogLevel::Debug);
        assert_eq!(tail.len(), 1);
        assert_eq!(tail[0].origin, ORIGIN);
        assert_eq!(tail[0].message, "something aged out");

        let published: Option<LogEntry> = bus.last_json("node/backend/log").unwrap();
        let published = published.unwrap();
        assert_eq!(published.level, LogLevel::Warning);
        assert_eq!(published.message, "something aged out");
    }

    #[tokio::test]
    async fn append_does_not_republish() {
        let bus = MockBus::new();
        let journal = Journal::new(100, bus.clone());

        journal.append(LogEntry::new("Node-ABC", LogLevel::Info, "Heartbeat check"));

        assert_eq!(journal.tail(10, LogLevel::Debug).len(), 1);
        assert!(bus.published().is_empty());
    }
}
