use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;

use super::{DocumentStore, MemoryStore, StoreResult};
use crate::types::{RoomCode, RoomDocument, SyncMode};

/// How often an idle forwarder checks whether anyone still watches its room
const FORWARDER_IDLE_CHECK: Duration = Duration::from_secs(1);

/// Local mirror in front of an optional remote store.
///
/// While the remote is healthy it is the source of truth: reads refresh the
/// mirror, writes go to both, and remote changes are forwarded into the
/// mirror. Once a remote call fails the store drops to local mode and serves
/// everything from the mirror, remembering which rooms changed. A later
/// successful health check pushes those rooms back (last writer wins).
pub struct MirroredStore {
    remote: Option<Arc<dyn DocumentStore>>,
    mirror: Arc<MemoryStore>,
    degraded: AtomicBool,
    dirty: Mutex<HashSet<RoomCode>>,
    forwarding: Arc<Mutex<HashSet<RoomCode>>>,
}

impl MirroredStore {
    /// Mirror only, every room is local
    pub fn local_only() -> Self {
        Self::build(None)
    }

    pub fn with_remote(remote: Arc<dyn DocumentStore>) -> Self {
        Self::build(Some(remote))
    }

    fn build(remote: Option<Arc<dyn DocumentStore>>) -> Self {
        Self {
            remote,
            mirror: Arc::new(MemoryStore::new()),
            degraded: AtomicBool::new(false),
            dirty: Mutex::new(HashSet::new()),
            forwarding: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Where documents currently live
    pub fn mode(&self) -> SyncMode {
        match self.remote {
            Some(_) if !self.degraded.load(Ordering::SeqCst) => SyncMode::Networked,
            _ => SyncMode::Local,
        }
    }

    pub fn has_remote(&self) -> bool {
        self.remote.is_some()
    }

    pub fn mirror(&self) -> &MemoryStore {
        &self.mirror
    }

    fn healthy_remote(&self) -> Option<&Arc<dyn DocumentStore>> {
        match self.mode() {
            SyncMode::Networked => self.remote.as_ref(),
            SyncMode::Local => None,
        }
    }

    fn mark_dirty(&self, room_code: &str) {
        self.dirty
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(room_code.to_string());
    }

    fn enter_degraded(&self, reason: &dyn std::fmt::Display) {
        if !self.degraded.swap(true, Ordering::SeqCst) {
            tracing::warn!("Remote store failed ({}); switching to local mode", reason);
        }
    }

    /// Copy remote changes for one room into the mirror.
    ///
    /// Runs until the remote subscription closes or nobody subscribes to the
    /// room in the mirror any more. Dropping `rx` lets the remote stop
    /// watching the room.
    fn ensure_forwarder(&self, room_code: &str, mut rx: broadcast::Receiver<RoomDocument>) {
        let mirror = self.mirror.clone();
        let forwarding = self.forwarding.clone();
        let room_code = room_code.to_string();

        tokio::spawn(async move {
            loop {
                match tokio::time::timeout(FORWARDER_IDLE_CHECK, rx.recv()).await {
                    Ok(Ok(doc)) => {
                        // Polls can lag behind our own writes
                        if mirror.save_if_newer(&doc).await {
                            tracing::debug!(
                                "Remote update for room {} (v{})",
                                doc.room_code(),
                                doc.version
                            );
                        }
                    }
                    Ok(Err(broadcast::error::RecvError::Lagged(skipped))) => {
                        tracing::debug!("Forwarder for {} lagged by {}", room_code, skipped);
                    }
                    Ok(Err(broadcast::error::RecvError::Closed)) => {
                        forwarding
                            .lock()
                            .unwrap_or_else(|poisoned| poisoned.into_inner())
                            .remove(&room_code);
                        break;
                    }
                    Err(_) => {}
                }

                // Checked under the forwarding lock so a new subscriber either
                // keeps this forwarder alive or starts its own
                let mut watched = forwarding
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner());
                if mirror.receiver_count(&room_code) == 0 {
                    watched.remove(&room_code);
                    tracing::debug!("Stopped forwarding room {}", room_code);
                    break;
                }
            }
        });
    }

    /// Rooms whose remote changes are being forwarded
    pub fn forwarded_rooms(&self) -> Vec<RoomCode> {
        self.forwarding
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .cloned()
            .collect()
    }

    /// Drop a room from the mirror.
    ///
    /// The remote copy is left alone; a later load fetches it again.
    pub async fn forget(&self, room_code: &str) {
        self.dirty
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(room_code);
        self.mirror.remove(room_code).await;
        tracing::debug!("Forgot room {}", room_code);
    }

    /// Push rooms changed during local mode back to the remote
    async fn reconcile(&self, remote: &Arc<dyn DocumentStore>) -> StoreResult<()> {
        let rooms: Vec<RoomCode> = self
            .dirty
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .drain()
            .collect();

        for (index, room_code) in rooms.iter().enumerate() {
            let Some(doc) = self.mirror.load(room_code).await? else {
                continue;
            };
            if let Err(e) = remote.save(&doc).await {
                // Keep this room and everything after it for the next attempt
                for pending in &rooms[index..] {
                    self.mark_dirty(pending);
                }
                return Err(e);
            }
            tracing::info!("Pushed room {} to remote store", room_code);
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MirroredStore {
    async fn load(&self, room_code: &str) -> StoreResult<Option<RoomDocument>> {
        if let Some(remote) = self.healthy_remote() {
            match remote.load(room_code).await {
                Ok(Some(doc)) => {
                    self.mirror.save_if_changed(&doc).await;
                    return Ok(Some(doc));
                }
                Ok(None) => {}
                Err(e) => self.enter_degraded(&e),
            }
        }
        self.mirror.load(room_code).await
    }

    async fn save(&self, doc: &RoomDocument) -> StoreResult<()> {
        self.mirror.save(doc).await?;

        match self.healthy_remote() {
            Some(remote) => {
                if let Err(e) = remote.save(doc).await {
                    self.enter_degraded(&e);
                    self.mark_dirty(doc.room_code());
                }
            }
            None if self.remote.is_some() => self.mark_dirty(doc.room_code()),
            None => {}
        }
        Ok(())
    }

    async fn subscribe(&self, room_code: &str) -> StoreResult<broadcast::Receiver<RoomDocument>> {
        // Subscribe locally first so a forwarder about to go idle sees us
        let rx = self.mirror.subscribe(room_code).await?;

        if let Some(remote) = self.healthy_remote() {
            let newly_forwarded = self
                .forwarding
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .insert(room_code.to_string());

            if newly_forwarded {
                match remote.subscribe(room_code).await {
                    Ok(rx) => self.ensure_forwarder(room_code, rx),
                    Err(e) => {
                        self.forwarding
                            .lock()
                            .unwrap_or_else(|poisoned| poisoned.into_inner())
                            .remove(room_code);
                        self.enter_degraded(&e);
                    }
                }
            }
        }
        Ok(rx)
    }

    async fn health_check(&self) -> StoreResult<()> {
        let Some(remote) = &self.remote else {
            return Ok(());
        };

        if let Err(e) = remote.health_check().await {
            self.enter_degraded(&e);
            return Err(e);
        }

        if self.degraded.load(Ordering::SeqCst) {
            if let Err(e) = self.reconcile(remote).await {
                tracing::warn!("Reconciling with remote store failed: {}", e);
                return Err(e);
            }
            self.degraded.store(false, Ordering::SeqCst);
            tracing::info!("Remote store healthy again; back in networked mode");
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "mirrored"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreError;

    /// Memory-backed remote that can be switched off
    struct FlakyRemote {
        inner: MemoryStore,
        down: AtomicBool,
    }

    impl FlakyRemote {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                inner: MemoryStore::new(),
                down: AtomicBool::new(false),
            })
        }

        fn set_down(&self, down: bool) {
            self.down.store(down, Ordering::SeqCst);
        }

        fn check(&self) -> StoreResult<()> {
            if self.down.load(Ordering::SeqCst) {
                Err(StoreError::unavailable(
                    "remote is down".to_string(),
                    std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused"),
                ))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl DocumentStore for FlakyRemote {
        async fn load(&self, room_code: &str) -> StoreResult<Option<RoomDocument>> {
            self.check()?;
            self.inner.load(room_code).await
        }

        async fn save(&self, doc: &RoomDocument) -> StoreResult<()> {
            self.check()?;
            self.inner.save(doc).await
        }

        async fn subscribe(
            &self,
            room_code: &str,
        ) -> StoreResult<broadcast::Receiver<RoomDocument>> {
            self.check()?;
            self.inner.subscribe(room_code).await
        }

        async fn health_check(&self) -> StoreResult<()> {
            self.check()
        }

        fn name(&self) -> &str {
            "flaky"
        }
    }

    fn doc(code: &str) -> RoomDocument {
        RoomDocument::new(code.to_string(), SyncMode::Networked)
    }

    #[tokio::test]
    async fn test_local_only_is_local() {
        let store = MirroredStore::local_only();
        assert_eq!(store.mode(), SyncMode::Local);

        store.save(&doc("ROOM1")).await.unwrap();
        assert!(store.load("ROOM1").await.unwrap().is_some());
        assert!(store.health_check().await.is_ok());
    }

    #[tokio::test]
    async fn test_networked_writes_reach_remote() {
        let remote = FlakyRemote::new();
        let store = MirroredStore::with_remote(remote.clone());
        assert_eq!(store.mode(), SyncMode::Networked);

        store.save(&doc("ROOM1")).await.unwrap();
        assert!(remote.inner.load("ROOM1").await.unwrap().is_some());
        assert!(store.mirror().contains("ROOM1").await);
    }

    #[tokio::test]
    async fn test_remote_is_source_of_truth_on_read() {
        let remote = FlakyRemote::new();
        let store = MirroredStore::with_remote(remote.clone());
        store.save(&doc("ROOM1")).await.unwrap();

        // Another client overwrites the remote copy
        let mut theirs = remote.inner.load("ROOM1").await.unwrap().unwrap();
        theirs.state.winner_id = Some("them".to_string());
        theirs.touch();
        remote.inner.save(&theirs).await.unwrap();

        let loaded = store.load("ROOM1").await.unwrap().unwrap();
        assert_eq!(loaded.state.winner_id.as_deref(), Some("them"));
        let mirrored = store.mirror().load("ROOM1").await.unwrap().unwrap();
        assert_eq!(mirrored.version, theirs.version);
    }

    #[tokio::test]
    async fn test_failure_falls_back_to_mirror_and_reconciles() {
        let remote = FlakyRemote::new();
        let store = MirroredStore::with_remote(remote.clone());
        let mut room = doc("ROOM1");
        store.save(&room).await.unwrap();

        remote.set_down(true);
        room.state.winner_id = Some("offline".to_string());
        room.touch();
        store.save(&room).await.unwrap();
        assert_eq!(store.mode(), SyncMode::Local);

        // Reads keep working from the mirror
        let loaded = store.load("ROOM1").await.unwrap().unwrap();
        assert_eq!(loaded.state.winner_id.as_deref(), Some("offline"));

        // Still down: health check fails, stays local
        assert!(store.health_check().await.is_err());
        assert_eq!(store.mode(), SyncMode::Local);

        remote.set_down(false);
        store.health_check().await.unwrap();
        assert_eq!(store.mode(), SyncMode::Networked);

        let pushed = remote.inner.load("ROOM1").await.unwrap().unwrap();
        assert_eq!(pushed.state.winner_id.as_deref(), Some("offline"));
    }

    #[tokio::test]
    async fn test_remote_updates_forwarded_to_subscribers() {
        let remote = FlakyRemote::new();
        let store = MirroredStore::with_remote(remote.clone());
        store.save(&doc("ROOM1")).await.unwrap();

        let mut rx = store.subscribe("ROOM1").await.unwrap();

        let mut theirs = remote.inner.load("ROOM1").await.unwrap().unwrap();
        theirs.touch();
        remote.inner.save(&theirs).await.unwrap();

        let received = tokio::time::timeout(std::time::Duration::from_secs(1), rx.recv())
            .await
            .expect("forwarded in time")
            .unwrap();
        assert_eq!(received.version, theirs.version);
    }

    #[tokio::test]
    async fn test_stale_remote_copy_does_not_roll_back_mirror() {
        let remote = FlakyRemote::new();
        let store = MirroredStore::with_remote(remote.clone());
        let mut room = doc("ROOM1");
        store.save(&room).await.unwrap();
        let mut rx = store.subscribe("ROOM1").await.unwrap();

        room.touch();
        let stale = room.clone();
        room.touch();
        store.save(&room).await.unwrap();

        // A poll that started before our last write delivers the older copy
        remote.inner.save(&stale).await.unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;

        let mirrored = store.mirror().load("ROOM1").await.unwrap().unwrap();
        assert_eq!(mirrored.version, room.version);
        while let Ok(seen) = rx.try_recv() {
            assert_eq!(seen.version, room.version);
        }
    }

    #[tokio::test]
    async fn test_forwarder_stops_once_nobody_watches() {
        let remote = FlakyRemote::new();
        let store = MirroredStore::with_remote(remote.clone());
        store.save(&doc("ROOM1")).await.unwrap();

        let rx = store.subscribe("ROOM1").await.unwrap();
        assert_eq!(store.forwarded_rooms(), vec!["ROOM1".to_string()]);
        assert_eq!(remote.inner.receiver_count("ROOM1"), 1);

        drop(rx);
        tokio::time::sleep(FORWARDER_IDLE_CHECK + Duration::from_millis(500)).await;

        assert!(store.forwarded_rooms().is_empty());
        // The remote subscription was released too
        assert_eq!(remote.inner.receiver_count("ROOM1"), 0);
    }

    #[tokio::test]
    async fn test_forget_drops_room_from_mirror_only() {
        let remote = FlakyRemote::new();
        let store = MirroredStore::with_remote(remote.clone());
        store.save(&doc("ROOM1")).await.unwrap();

        store.forget("ROOM1").await;
        assert!(!store.mirror().contains("ROOM1").await);
        assert!(remote.inner.contains("ROOM1").await);
    }
}
