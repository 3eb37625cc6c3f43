// src/stream/resumable.rs
// Optional resumable-stream layer (spec.md §4.C12): the producer runs once;
// a reconnecting client draws from the same broadcast. The stream id is also
// mirrored into the key-value store so a second replica could locate it.

use std::collections::HashMap;
use std::sync::Mutex;

use tokio::sync::broadcast;
use uuid::Uuid;

use crate::kv::KvStore;
use crate::stream::StreamEvent;

const BROADCAST_CAPACITY: usize = 256;

pub struct StreamRegistry {
    kv: KvStore,
    channels: Mutex<HashMap<Uuid, broadcast::Sender<StreamEvent>>>,
}

impl StreamRegistry {
    pub fn new(kv: KvStore) -> Self {
        Self {
            kv,
            channels: Mutex::new(HashMap::new()),
        }
    }

    /// Registers a new in-flight run for `chat_id`, mirroring the stream id
    /// into the key-value store, and returns the sender the producer writes
    /// into plus a receiver for the original response.
    pub async fn start(&self, chat_id: Uuid) -> (broadcast::Sender<StreamEvent>, broadcast::Receiver<StreamEvent>) {
        let stream_id = Uuid::new_v4();
        let _ = self
            .kv
            .set_ex(&format!("stream:chat:{}", chat_id), &stream_id.to_string(), 3600)
            .await;

        let (tx, rx) = broadcast::channel(BROADCAST_CAPACITY);
        self.channels.lock().unwrap().insert(chat_id, tx.clone());
        (tx, rx)
    }

    /// Returns a fresh receiver for a reconnecting client, if a run is live.
    pub fn subscribe(&self, chat_id: Uuid) -> Option<broadcast::Receiver<StreamEvent>> {
        self.channels.lock().unwrap().get(&chat_id).map(|tx| tx.subscribe())
    }

    pub fn finish(&self, chat_id: Uuid) {
        self.channels.lock().unwrap().remove(&chat_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn a_second_subscriber_sees_events_sent_after_it_joins() {
        let registry = StreamRegistry::new(crate::kv::test_support::InMemoryKv::new());
        let chat_id = Uuid::new_v4();
        let (tx, _rx1) = registry.start(chat_id).await;
        let mut rx2 = registry.subscribe(chat_id).unwrap();

        tx.send(StreamEvent::TextDelta { delta: "hi".into() }).unwrap();
        let received = rx2.recv().await.unwrap();
        matches!(received, StreamEvent::TextDelta { .. });
    }

    #[tokio::test]
    async fn no_subscriber_after_finish() {
        let registry = StreamRegistry::new(crate::kv::test_support::InMemoryKv::new());
        let chat_id = Uuid::new_v4();
        let _ = registry.start(chat_id).await;
        registry.finish(chat_id);
        assert!(registry.subscribe(chat_id).is_none());
    }
}
