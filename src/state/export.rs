//! Room export/import for quick and dirty state restoration.
//!
//! A snapshot wraps one room document so a game can be carried over to
//! another server, or restored after the shared store lost it.

use super::AppState;
use crate::error::{GameError, GameResult};
use crate::store::DocumentStore;
use crate::types::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Schema version for export format compatibility
pub const EXPORT_SCHEMA_VERSION: u32 = 1;

/// A serializable snapshot of one room
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomSnapshot {
    /// Schema version for forward compatibility
    pub schema_version: u32,
    /// Export timestamp (ISO8601)
    pub exported_at: String,
    pub document: RoomDocument,
}

impl RoomSnapshot {
    /// Create a new export with current timestamp
    pub fn new(document: RoomDocument) -> Self {
        Self {
            schema_version: EXPORT_SCHEMA_VERSION,
            exported_at: chrono::Utc::now().to_rfc3339(),
            document,
        }
    }

    /// Validate the snapshot before import
    pub fn validate(&self) -> Result<(), String> {
        if self.schema_version > EXPORT_SCHEMA_VERSION {
            return Err(format!(
                "Export schema version {} is newer than supported version {}. \
                 Please update the server.",
                self.schema_version, EXPORT_SCHEMA_VERSION
            ));
        }

        let doc = &self.document;
        let state = &doc.state;

        let mut ids = HashSet::new();
        for player in &doc.players {
            if !ids.insert(player.id.as_str()) {
                return Err(format!("Player '{}' appears twice", player.id));
            }
            if player.position > FINISH_TILE {
                return Err(format!(
                    "Player '{}' is off the board at tile {}",
                    player.id, player.position
                ));
            }
        }
        if doc.players.len() > MAX_PLAYERS {
            return Err(format!("{} players exceed the limit of {}", doc.players.len(), MAX_PLAYERS));
        }

        if let Some(ref turn) = state.current_player_turn {
            if !ids.contains(turn.as_str()) {
                return Err(format!("Turn references player '{}' which doesn't exist", turn));
            }
        } else if state.phase != GamePhase::Lobby && !doc.players.is_empty() {
            return Err(format!("Phase {:?} requires a current player", state.phase));
        }

        let question_open = state.active_question.is_some();
        if question_open != (state.phase == GamePhase::TriviaAnswering) {
            return Err("Active question and TRIVIA_ANSWERING phase must go together".to_string());
        }
        if let Some(ref question) = state.active_question {
            if question.correct_answer_index >= question.options.len() {
                return Err(format!(
                    "Question '{}' points at a missing option",
                    question.id
                ));
            }
        }

        match (&state.winner_id, state.phase) {
            (Some(winner), GamePhase::GameOver) if !ids.contains(winner.as_str()) => {
                return Err(format!("Winner '{}' doesn't exist", winner));
            }
            (Some(_), phase) if phase != GamePhase::GameOver => {
                return Err("A winner is only allowed in GAME_OVER".to_string());
            }
            _ => {}
        }

        Ok(())
    }
}

impl AppState {
    /// Snapshot a room for download
    pub async fn export_room(&self, room_code: &str) -> GameResult<RoomSnapshot> {
        let doc = self.get_room(room_code).await?;
        Ok(RoomSnapshot::new(doc))
    }

    /// Replace (or recreate) a room from a snapshot.
    ///
    /// The imported document is written as a newer version than anything
    /// currently held so subscribers pick it up.
    pub async fn import_room(&self, room_code: &str, snapshot: RoomSnapshot) -> GameResult<RoomDocument> {
        snapshot.validate().map_err(GameError::InvalidSnapshot)?;
        if snapshot.document.room_code() != room_code {
            return Err(GameError::InvalidSnapshot(format!(
                "Snapshot is for room {}, not {}",
                snapshot.document.room_code(),
                room_code
            )));
        }

        let lock = self.room_lock(room_code);
        let _guard = lock.lock().await;
        let held_version = self
            .store
            .load(room_code)
            .await?
            .map(|doc| doc.version)
            .unwrap_or(0);

        let mut doc = snapshot.document;
        for player in doc.players.iter_mut() {
            player.is_me = false;
        }
        doc.version = doc.version.max(held_version);
        doc.touch();
        self.store.save(&doc).await?;

        tracing::info!(
            "Imported room {} (exported {}, now v{})",
            room_code,
            snapshot.exported_at,
            doc.version
        );
        Ok(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::tests::test_state;

    fn lobby_snapshot() -> RoomSnapshot {
        let mut doc = RoomDocument::new("ROOM1".to_string(), SyncMode::Local);
        let mut host = Player::new("p1".to_string(), "Ana".to_string(), "🤡".to_string());
        host.is_host = true;
        doc.players.push(host);
        RoomSnapshot::new(doc)
    }

    #[test]
    fn test_export_serialization_roundtrip() {
        let snapshot = lobby_snapshot();

        let json = serde_json::to_string_pretty(&snapshot).unwrap();
        let parsed: RoomSnapshot = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.schema_version, EXPORT_SCHEMA_VERSION);
        assert_eq!(parsed.document, snapshot.document);
    }

    #[test]
    fn test_validation_future_schema() {
        let mut snapshot = lobby_snapshot();
        snapshot.schema_version = EXPORT_SCHEMA_VERSION + 1;

        let result = snapshot.validate();
        assert!(result.unwrap_err().contains("newer than supported"));
    }

    #[test]
    fn test_validation_missing_turn_player() {
        let mut snapshot = lobby_snapshot();
        snapshot.document.state.phase = GamePhase::Board;
        snapshot.document.state.current_player_turn = Some("ghost".to_string());

        let result = snapshot.validate();
        assert!(result.unwrap_err().contains("doesn't exist"));
    }

    #[test]
    fn test_validation_question_without_phase() {
        let mut snapshot = lobby_snapshot();
        snapshot.document.state.phase = GamePhase::Board;
        snapshot.document.state.current_player_turn = Some("p1".to_string());
        snapshot.document.state.active_question = Some(Question {
            id: "q1".to_string(),
            kind: QuestionKind::Text,
            prompt: "?".to_string(),
            options: vec!["a".to_string(), "b".to_string()],
            correct_answer_index: 0,
        });

        assert!(snapshot.validate().is_err());
    }

    #[test]
    fn test_validation_off_board() {
        let mut snapshot = lobby_snapshot();
        snapshot.document.players[0].position = 30;

        assert!(snapshot.validate().unwrap_err().contains("off the board"));
    }

    #[tokio::test]
    async fn test_import_overwrites_newer() {
        let state = test_state();
        let (doc, host) = state.create_room("Ana".to_string(), None).await.unwrap();
        let code = doc.room_code().to_string();

        let snapshot = state.export_room(&code).await.unwrap();
        state.start_game(&code, &host).await.unwrap();
        let started = state.get_room(&code).await.unwrap();

        let restored = state.import_room(&code, snapshot).await.unwrap();
        assert_eq!(restored.state.phase, GamePhase::Lobby);
        assert!(restored.version > started.version);
        assert_eq!(state.get_room(&code).await.unwrap(), restored);
    }

    #[tokio::test]
    async fn test_import_rejects_other_room() {
        let state = test_state();
        let err = state
            .import_room("OTHER", lobby_snapshot())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_SNAPSHOT");
    }
}
