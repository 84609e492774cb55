//! Domain log system: the log entries nodes and the backend publish on the
//! bus, and the bounded buffer the backend serves over `/api/logs`.

use crate::clock;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Severity, ordered `D < I < W < E`. Serialized as single letters on the
/// wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogLevel {
    #[serde(rename = "D")]
    Debug,
    #[serde(rename = "I")]
    Info,
    #[serde(rename = "W")]
    Warning,
    #[serde(rename = "E")]
    Error,
}

impl LogLevel {
    pub fn as_letter(&self) -> &'static str {
        match self {
            LogLevel::Debug => "D",
            LogLevel::Info => "I",
            LogLevel::Warning => "W",
            LogLevel::Error => "E",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: String,
    pub origin: String,
    pub level: LogLevel,
    pub message: String,
}

impl LogEntry {
    pub fn new(origin: impl Into<String>, level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            timestamp: clock::wall_clock(),
            origin: origin.into(),
            level,
            message: message.into(),
        }
    }
}

/// Bounded FIFO of log entries. Oldest entries are evicted on overflow.
#[derive(Debug)]
pub struct LogBuffer {
    entries: VecDeque<LogEntry>,
    capacity: usize,
}

impl LogBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, entry: LogEntry) {
        self.entries.push_back(entry);
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    /// The most recent entries at or above `min_level`, at most `limit`,
    /// oldest first.
    pub fn tail(&self, limit: usize, min_level: LogLevel) -> Vec<LogEntry> {
        let filtered: Vec<&LogEntry> = self
            .entries
            .iter()
            .filter(|e| e.level >= min_level)
            .collect();
        let skip = filtered.len().saturating_sub(limit);
        filtered.into_iter().skip(skip).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
