//! Publish-side abstraction over the MQTT transport.
//!
//! Production code publishes through `rumqttc::AsyncClient`; tests publish
//! through `MockBus`, which records every message for assertions instead of
//! needing a broker.

use anyhow::Result;
use rumqttc::{AsyncClient, QoS};
use serde::de::DeserializeOwned;
use std::future::Future;
use std::sync::{Arc, Mutex};

pub trait MessageBus: Clone + Send + Sync + 'static {
    fn publish(&self, topic: &str, payload: Vec<u8>) -> impl Future<Output = Result<()>> + Send;
}

impl MessageBus for AsyncClient {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<()> {
        AsyncClient::publish(self, topic, QoS::AtLeastOnce, false, payload).await?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct RecordedMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

/// Recording bus for tests. Every publish is appended to an in-memory list.
#[derive(Clone, Default)]
pub struct MockBus {
    published: Arc<Mutex<Vec<RecordedMessage>>>,
}

impl MockBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn published(&self) -> Vec<RecordedMessage> {
        self.published.lock().unwrap().clone()
    }

    pub fn messages_on(&self, topic: &str) -> Vec<RecordedMessage> {
        self.published
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.topic == topic)
            .cloned()
            .collect()
    }

    /// Parses the most recent message on `topic` as JSON.
    pub fn last_json<T: DeserializeOwned>(&self, topic: &str) -> Result<Option<T>> {
        let messages = self.messages_on(topic);
        match messages.last() {
            Some(msg) => Ok(Some(serde_json::from_slice(&msg.payload)?)),
            None => Ok(None),
        }
    }

    pub fn clear(&self) {
        self.published.lock().unwrap().clear();
    }
}

impl MessageBus for MockBus {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<()> {
        self.published.lock().unwrap().push(RecordedMessage {
            topic: topic.to_string(),
            payload,
        });
        Ok(())
    }
}
