mod bots;
pub mod export;
mod question;
mod room;
mod sabotage;
mod turn;

pub use bots::BotAction;
pub use question::AnswerOutcome;
pub use turn::MoveReport;

use crate::commentary::CommentarySelector;
use crate::config::GameConfig;
use crate::error::{GameError, GameResult};
use crate::protocol::ServerMessage;
use crate::questions::QuestionBank;
use crate::store::{DocumentStore, MirroredStore};
use crate::types::*;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};

/// A server message addressed to everyone in one room
#[derive(Debug, Clone)]
pub struct RoomMessage {
    pub room_code: RoomCode,
    pub message: ServerMessage,
}

/// Shared application state
pub struct AppState {
    pub store: Arc<MirroredStore>,
    pub questions: Arc<QuestionBank>,
    pub config: GameConfig,
    pub commentary: CommentarySelector,
    /// Room-scoped messages (dice, answers, commentary) for connected clients
    pub broadcast: broadcast::Sender<RoomMessage>,
    /// Serialises read-modify-write cycles, one lock per room
    room_locks: std::sync::Mutex<HashMap<RoomCode, Arc<Mutex<()>>>>,
}

impl AppState {
    pub fn new(store: Arc<MirroredStore>, questions: Arc<QuestionBank>, config: GameConfig) -> Self {
        let (tx, _rx) = broadcast::channel(100);
        Self {
            store,
            questions,
            commentary: CommentarySelector::new(&config),
            config,
            broadcast: tx,
            room_locks: std::sync::Mutex::new(HashMap::new()),
        }
    }

    /// Local-only state with the built-in question bank and default rules
    pub fn local() -> Self {
        let questions = QuestionBank::builtin().unwrap_or_else(|e| {
            tracing::error!("Built-in question bank is broken: {}", e);
            QuestionBank::new(Vec::new())
        });
        Self::new(
            Arc::new(MirroredStore::local_only()),
            Arc::new(questions),
            GameConfig::default(),
        )
    }

    /// Current document for a room
    pub async fn get_room(&self, room_code: &str) -> GameResult<RoomDocument> {
        self.store
            .load(room_code)
            .await?
            .ok_or_else(|| GameError::RoomNotFound(room_code.to_string()))
    }

    /// Write lock for one room; other rooms are never blocked by it
    pub(crate) fn room_lock(&self, room_code: &str) -> Arc<Mutex<()>> {
        self.room_locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .entry(room_code.to_string())
            .or_default()
            .clone()
    }

    /// Drop an abandoned room from the mirror along with its lock
    pub(crate) async fn forget_room(&self, room_code: &str) {
        self.room_locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(room_code);
        self.store.forget(room_code).await;
    }

    /// Apply `f` to the room's document and write it back.
    ///
    /// Nothing is written when `f` fails. Events pushed by `f` are announced
    /// after the write succeeds.
    pub(crate) async fn update_room<T, F>(&self, room_code: &str, f: F) -> GameResult<(T, RoomDocument)>
    where
        F: FnOnce(&mut RoomDocument, &mut Vec<GameEvent>) -> GameResult<T>,
    {
        let lock = self.room_lock(room_code);
        let guard = lock.lock().await;

        let mut doc = self.get_room(room_code).await?;
        let mut events = Vec::new();
        let value = f(&mut doc, &mut events)?;

        doc.touch();
        self.store.save(&doc).await?;
        drop(guard);

        self.announce(room_code, events);
        Ok((value, doc))
    }

    /// Write a brand-new document, failing if the code is already taken
    pub(crate) async fn insert_room(&self, doc: &RoomDocument) -> GameResult<bool> {
        let lock = self.room_lock(doc.room_code());
        let _guard = lock.lock().await;
        if self.store.load(doc.room_code()).await?.is_some() {
            return Ok(false);
        }
        self.store.save(doc).await?;
        Ok(true)
    }

    /// Send a message to everyone in a room
    pub fn publish(&self, room_code: &str, message: ServerMessage) {
        // No receivers connected is fine
        let _ = self.broadcast.send(RoomMessage {
            room_code: room_code.to_string(),
            message,
        });
    }

    /// Let the host react to game events
    pub fn announce(&self, room_code: &str, events: Vec<GameEvent>) {
        let mut rng = rand::rng();
        for event in events {
            tracing::debug!("Room {} event {:?}", room_code, event.kind);
            if let Some(comment) = self.commentary.comment_on(&mut rng, &event) {
                self.publish(
                    room_code,
                    ServerMessage::Commentary {
                        trigger: comment.trigger,
                        text: comment.text,
                        player_id: comment.player_id,
                    },
                );
            }
        }
    }

    /// Fail unless `player_id` sits in the room and holds the turn
    pub(crate) fn require_turn(doc: &RoomDocument, player_id: &str) -> GameResult<()> {
        if doc.player(player_id).is_none() {
            return Err(GameError::PlayerNotFound(player_id.to_string()));
        }
        if doc.state.current_player_turn.as_deref() != Some(player_id) {
            return Err(GameError::NotYourTurn);
        }
        Ok(())
    }

    pub(crate) fn require_phase(doc: &RoomDocument, phase: GamePhase) -> GameResult<()> {
        if doc.state.phase != phase {
            return Err(GameError::WrongPhase(doc.state.phase));
        }
        Ok(())
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::local()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Local state whose questions never go chaotic and whose host always talks
    pub(crate) fn test_state() -> AppState {
        let config = GameConfig {
            chaos_chance: 0.0,
            streak_comment_chance: 1.0,
            idle_comment_chance: 1.0,
            ..GameConfig::default()
        };
        AppState::new(
            Arc::new(MirroredStore::local_only()),
            Arc::new(QuestionBank::builtin().unwrap()),
            config,
        )
    }

    #[tokio::test]
    async fn test_missing_room() {
        let state = test_state();
        let err = state.get_room("NOPE1").await.unwrap_err();
        assert_eq!(err.code(), "ROOM_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_failed_update_writes_nothing() {
        let state = test_state();
        let (doc, host) = state.create_room("Ana".to_string(), None).await.unwrap();
        let code = doc.room_code().to_string();

        let result: GameResult<((), RoomDocument)> = state
            .update_room(&code, |doc, _| {
                doc.players.clear();
                Err(GameError::NotYourTurn)
            })
            .await;
        assert!(result.is_err());

        let held = state.get_room(&code).await.unwrap();
        assert_eq!(held.version, doc.version);
        assert!(held.player(&host).is_some());
    }

    /// Triggers of every commentary line sent so far
    pub(crate) fn commentary_triggers(rx: &mut broadcast::Receiver<RoomMessage>) -> Vec<EventKind> {
        let mut triggers = Vec::new();
        while let Ok(sent) = rx.try_recv() {
            if let ServerMessage::Commentary { trigger, .. } = sent.message {
                triggers.push(trigger);
            }
        }
        triggers
    }

    #[tokio::test]
    async fn test_busy_room_does_not_block_others() {
        let state = test_state();
        let (first, _) = state.create_room("Ana".to_string(), None).await.unwrap();
        let (second, host) = state.create_room("Ben".to_string(), None).await.unwrap();

        // Someone is mid-write on the first room
        let lock = state.room_lock(first.room_code());
        let _held = lock.lock().await;

        let update = state.set_media_status(second.room_code(), &host, false, false);
        let doc = tokio::time::timeout(std::time::Duration::from_secs(1), update)
            .await
            .expect("second room is not blocked")
            .unwrap();
        assert!(!doc.player(&host).unwrap().media_status.audio);

        // The first room itself waits
        let blocked = state.set_media_status(first.room_code(), "anyone", false, false);
        assert!(
            tokio::time::timeout(std::time::Duration::from_millis(100), blocked)
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_events_become_commentary() {
        let state = test_state();
        let mut rx = state.broadcast.subscribe();

        state.announce(
            "ROOM1",
            vec![GameEvent::new(EventKind::RolledOne, Some("p1".to_string()))],
        );

        let sent = rx.recv().await.unwrap();
        assert_eq!(sent.room_code, "ROOM1");
        assert!(matches!(
            sent.message,
            ServerMessage::Commentary {
                trigger: EventKind::RolledOne,
                ..
            }
        ));
    }
}
