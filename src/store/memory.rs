use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tokio::sync::{broadcast, RwLock};

use super::{DocumentStore, StoreResult};
use crate::types::{RoomCode, RoomDocument};

/// Subscriber backlog per room
const CHANNEL_CAPACITY: usize = 64;

type Channels = HashMap<RoomCode, broadcast::Sender<RoomDocument>>;

/// In-process document store with per-room change fan-out
#[derive(Default)]
pub struct MemoryStore {
    documents: RwLock<HashMap<RoomCode, RoomDocument>>,
    channels: Mutex<Channels>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn channels(&self) -> MutexGuard<'_, Channels> {
        self.channels
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn notify(&self, doc: &RoomDocument) {
        if let Some(tx) = self.channels().get(doc.room_code()) {
            // No subscribers is fine
            let _ = tx.send(doc.clone());
        }
    }

    async fn put(&self, doc: &RoomDocument) {
        self.documents
            .write()
            .await
            .insert(doc.room_code().to_string(), doc.clone());
        self.notify(doc);
    }

    /// Store `doc` unless the same version is already held.
    /// Returns true when subscribers were notified.
    pub async fn save_if_changed(&self, doc: &RoomDocument) -> bool {
        let unchanged = self
            .documents
            .read()
            .await
            .get(doc.room_code())
            .is_some_and(|held| held.version == doc.version && held.updated_at == doc.updated_at);

        if unchanged {
            return false;
        }
        self.put(doc).await;
        true
    }

    /// Store `doc` only if it is newer than the held copy: a higher version,
    /// or the same version written later. Returns true when stored.
    pub async fn save_if_newer(&self, doc: &RoomDocument) -> bool {
        {
            let mut documents = self.documents.write().await;
            if let Some(held) = documents.get(doc.room_code()) {
                // UTC RFC 3339 stamps sort lexically
                let newer = doc.version > held.version
                    || (doc.version == held.version && doc.updated_at > held.updated_at);
                if !newer {
                    return false;
                }
            }
            documents.insert(doc.room_code().to_string(), doc.clone());
        }
        self.notify(doc);
        true
    }

    /// Drop a room and close its subscriptions
    pub async fn remove(&self, room_code: &str) -> Option<RoomDocument> {
        self.channels().remove(room_code);
        self.documents.write().await.remove(room_code)
    }

    /// Live subscriptions to a room
    pub fn receiver_count(&self, room_code: &str) -> usize {
        self.channels()
            .get(room_code)
            .map_or(0, |tx| tx.receiver_count())
    }

    /// Codes of every room held
    pub async fn room_codes(&self) -> Vec<RoomCode> {
        self.documents.read().await.keys().cloned().collect()
    }

    pub async fn contains(&self, room_code: &str) -> bool {
        self.documents.read().await.contains_key(room_code)
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn load(&self, room_code: &str) -> StoreResult<Option<RoomDocument>> {
        Ok(self.documents.read().await.get(room_code).cloned())
    }

    async fn save(&self, doc: &RoomDocument) -> StoreResult<()> {
        self.put(doc).await;
        Ok(())
    }

    async fn subscribe(&self, room_code: &str) -> StoreResult<broadcast::Receiver<RoomDocument>> {
        let mut channels = self.channels();
        let tx = channels
            .entry(room_code.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0);
        Ok(tx.subscribe())
    }

    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
