use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;

use super::{DocumentStore, StoreError, StoreResult};
use crate::config::RemoteStoreConfig;
use crate::types::{RoomCode, RoomDocument};

const CHANNEL_CAPACITY: usize = 64;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

type Watchers = Arc<Mutex<HashMap<RoomCode, broadcast::Sender<RoomDocument>>>>;

/// Client for an external JSON document service.
///
/// Documents live at `{base_url}/{collection}/{room_code}` and are replaced
/// with a plain PUT. Subscriptions poll each watched room and fan out every
/// new version.
#[derive(Clone)]
pub struct RestStore {
    client: Client,
    base_url: Arc<str>,
    collection: Arc<str>,
    poll_interval: Duration,
    watchers: Watchers,
}

impl RestStore {
    pub fn new(config: &RemoteStoreConfig) -> StoreResult<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| StoreError::unavailable("failed to build HTTP client".to_string(), e))?;

        Ok(Self {
            client,
            base_url: Arc::from(config.base_url.trim_end_matches('/')),
            collection: Arc::from(config.collection.as_str()),
            poll_interval: config.poll_interval,
            watchers: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    fn collection_url(&self) -> String {
        format!("{}/{}", self.base_url, self.collection)
    }

    fn document_url(&self, room_code: &str) -> String {
        format!("{}/{}", self.collection_url(), room_code)
    }

    async fn fetch(&self, room_code: &str) -> StoreResult<Option<RoomDocument>> {
        let url = self.document_url(room_code);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| StoreError::unavailable(format!("GET {} failed", url), e))?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => response
                .json::<RoomDocument>()
                .await
                .map(Some)
                .map_err(|e| StoreError::Decode {
                    path: url,
                    source: Box::new(e),
                }),
            status => Err(StoreError::Status {
                path: url,
                status: status.as_u16(),
            }),
        }
    }

    fn spawn_poller(&self, room_code: RoomCode, tx: broadcast::Sender<RoomDocument>) {
        let store = self.clone();

        tokio::spawn(async move {
            let mut last_version = None;

            loop {
                tokio::time::sleep(store.poll_interval).await;

                {
                    let mut watchers = store
                        .watchers
                        .lock()
                        .unwrap_or_else(|poisoned| poisoned.into_inner());
                    if tx.receiver_count() == 0 {
                        watchers.remove(&room_code);
                        tracing::debug!("Stopped watching room {}", room_code);
                        break;
                    }
                }

                match store.fetch(&room_code).await {
                    Ok(Some(doc)) => {
                        let version = (doc.version, doc.updated_at.clone());
                        if last_version.as_ref() != Some(&version) {
                            last_version = Some(version);
                            let _ = tx.send(doc);
                        }
                    }
                    Ok(None) => {}
                    Err(e) => tracing::debug!("Polling room {} failed: {}", room_code, e),
                }
            }
        });
    }
}

#[async_trait]
impl DocumentStore for RestStore {
    async fn load(&self, room_code: &str) -> StoreResult<Option<RoomDocument>> {
        self.fetch(room_code).await
    }

    async fn save(&self, doc: &RoomDocument) -> StoreResult<()> {
        let url = self.document_url(doc.room_code());
        let response = self
            .client
            .put(&url)
            .json(doc)
            .send()
            .await
            .map_err(|e| StoreError::unavailable(format!("PUT {} failed", url), e))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(StoreError::Status {
                path: url,
                status: response.status().as_u16(),
            })
        }
    }

    async fn subscribe(&self, room_code: &str) -> StoreResult<broadcast::Receiver<RoomDocument>> {
        let mut watchers = self
            .watchers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(tx) = watchers.get(room_code) {
            return Ok(tx.subscribe());
        }

        let (tx, rx) = broadcast::channel(CHANNEL_CAPACITY);
        watchers.insert(room_code.to_string(), tx.clone());
        drop(watchers);

        tracing::debug!("Watching room {} on remote store", room_code);
        self.spawn_poller(room_code.to_string(), tx);
        Ok(rx)
    }

    async fn health_check(&self) -> StoreResult<()> {
        let url = self.collection_url();
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| StoreError::unavailable(format!("GET {} failed", url), e))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(StoreError::Status {
                path: url,
                status: response.status().as_u16(),
            })
        }
    }

    fn name(&self) -> &str {
        "rest"
    }
}
