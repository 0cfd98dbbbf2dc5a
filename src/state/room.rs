use super::AppState;
use crate::error::{GameError, GameResult};
use crate::store::DocumentStore;
use crate::turn::advance_turn;
use crate::types::*;
use rand::Rng;

/// Safe character set for room codes (excludes 0/O, 1/I/L to avoid confusion)
const CODE_CHARS: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";
const CODE_LENGTH: usize = 5;
const MAX_CODE_ATTEMPTS: usize = 32;

/// Default avatar of whoever creates a room
pub const CREATOR_AVATAR: &str = "🗑️🔥";

/// Avatars handed out to joiners who bring none, in order
const AVATAR_POOL: &[&str] = &["🗑️🔥", "🤡", "🥀", "🥛", "💀", "🫠", "🧟", "🪦"];

/// Opponents seeded into rooms played without the shared store
const BOTS: &[(&str, &str)] = &[("CPU 1", "🤡"), ("CPU 2", "🥀"), ("CPU 3", "🥛")];

/// Generate a random room code (5 characters)
fn generate_room_code() -> String {
    let mut rng = rand::rng();
    (0..CODE_LENGTH)
        .map(|_| CODE_CHARS[rng.random_range(0..CODE_CHARS.len())] as char)
        .collect()
}

fn new_player_id() -> PlayerId {
    ulid::Ulid::new().to_string()
}

fn bot_players() -> Vec<Player> {
    BOTS.iter()
        .enumerate()
        .map(|(i, (name, avatar))| {
            let mut bot = Player::new(format!("bot-{}", i + 1), name.to_string(), avatar.to_string());
            bot.is_bot = true;
            bot
        })
        .collect()
}

fn free_avatar(players: &[Player]) -> String {
    AVATAR_POOL
        .iter()
        .find(|a| !players.iter().any(|p| p.avatar == **a))
        .unwrap_or(&AVATAR_POOL[0])
        .to_string()
}

impl AppState {
    /// Open a new room with the caller as host.
    ///
    /// Rooms created while the shared store is unavailable are local and get
    /// three bot opponents.
    pub async fn create_room(
        &self,
        name: String,
        avatar: Option<String>,
    ) -> GameResult<(RoomDocument, PlayerId)> {
        let mode = self.store.mode();
        let host_id = new_player_id();

        let mut host = Player::new(
            host_id.clone(),
            name,
            avatar.unwrap_or_else(|| CREATOR_AVATAR.to_string()),
        );
        host.is_host = true;

        for _ in 0..MAX_CODE_ATTEMPTS {
            let mut doc = RoomDocument::new(generate_room_code(), mode);
            doc.players.push(host.clone());
            if mode == SyncMode::Local {
                doc.players.extend(bot_players());
            }

            // Collision - try again (extremely rare with 28M combinations)
            if !self.insert_room(&doc).await? {
                continue;
            }

            // The insert itself can find the shared store down
            if mode == SyncMode::Networked && self.store.mode() == SyncMode::Local {
                let (_, local) = self
                    .update_room(doc.room_code(), |held, _| {
                        held.state.mode = SyncMode::Local;
                        held.players.extend(bot_players());
                        Ok(())
                    })
                    .await?;
                doc = local;
            }

            tracing::info!(
                "Room {} created by {} ({:?} mode)",
                doc.room_code(),
                host.name,
                doc.state.mode
            );
            return Ok((doc, host_id));
        }

        Err(GameError::RoomFull)
    }

    /// Take a seat in a room that has not started yet
    pub async fn join_room(
        &self,
        room_code: &str,
        name: String,
        avatar: Option<String>,
    ) -> GameResult<(RoomDocument, PlayerId)> {
        let player_id = new_player_id();

        let (_, doc) = self
            .update_room(room_code, |doc, _| {
                Self::require_phase(doc, GamePhase::Lobby)?;
                if doc.players.len() >= MAX_PLAYERS {
                    return Err(GameError::RoomFull);
                }

                let avatar = avatar.unwrap_or_else(|| free_avatar(&doc.players));
                let mut player = Player::new(player_id.clone(), name, avatar);
                player.is_host = doc.players.is_empty();
                tracing::info!("{} joined room {}", player.name, doc.room_code());
                doc.players.push(player);
                Ok(())
            })
            .await?;

        Ok((doc, player_id))
    }

    /// Remove a player, passing on their turn and host seat.
    ///
    /// Once no humans are left the room is dropped from the mirror.
    pub async fn leave_room(&self, room_code: &str, player_id: &str) -> GameResult<RoomDocument> {
        let (_, doc) = self
            .update_room(room_code, |doc, events| {
                let index = doc
                    .players
                    .iter()
                    .position(|p| p.id == player_id)
                    .ok_or_else(|| GameError::PlayerNotFound(player_id.to_string()))?;

                let held_turn = doc.state.current_player_turn.as_deref() == Some(player_id);
                if held_turn && doc.state.phase != GamePhase::Lobby {
                    if let Some(advance) = advance_turn(&mut doc.players, Some(player_id)) {
                        for skipped in advance.skipped {
                            events.push(GameEvent::new(EventKind::FrozenTurn, Some(skipped)));
                        }
                        doc.state.current_player_turn = Some(advance.next);
                    }
                    doc.state.has_rolled = false;
                    doc.state.active_question = None;
                    doc.state.video_sync = VideoSync::default();
                    if doc.state.phase == GamePhase::TriviaAnswering {
                        doc.state.phase = GamePhase::Board;
                    }
                }

                let leaving = doc.players.remove(index);
                tracing::info!("{} left room {}", leaving.name, doc.room_code());

                if leaving.is_host {
                    if let Some(next_host) = doc.players.iter_mut().find(|p| !p.is_bot) {
                        next_host.is_host = true;
                    }
                }

                // Everyone else frozen (or nobody left): first remaining player, if any
                if doc.state.current_player_turn.as_deref() == Some(player_id) {
                    doc.state.current_player_turn = doc.players.first().map(|p| p.id.clone());
                }
                if doc.state.winner_id.as_deref() == Some(player_id) {
                    doc.state.winner_id = None;
                }
                Ok(())
            })
            .await?;

        if !doc.has_humans() {
            let lock = self.room_lock(room_code);
            let _guard = lock.lock().await;
            // Someone may have joined since
            let abandoned = match self.store.mirror().load(room_code).await? {
                Some(held) => !held.has_humans(),
                None => true,
            };
            if abandoned {
                tracing::info!("Room {} is empty; dropping it", room_code);
                self.forget_room(room_code).await;
            }
        }

        Ok(doc)
    }

    /// Host starts the game: everyone to the board, host plays first
    pub async fn start_game(&self, room_code: &str, player_id: &str) -> GameResult<RoomDocument> {
        let (_, doc) = self
            .update_room(room_code, |doc, events| {
                let player = doc
                    .player(player_id)
                    .ok_or_else(|| GameError::PlayerNotFound(player_id.to_string()))?;
                if !player.is_host {
                    return Err(GameError::NotHost("start the game"));
                }
                Self::require_phase(doc, GamePhase::Lobby)?;

                doc.state.phase = GamePhase::Board;
                doc.state.current_player_turn = Some(player_id.to_string());
                doc.state.has_rolled = false;
                doc.state.active_question = None;
                doc.state.winner_id = None;
                events.push(GameEvent::new(EventKind::GameStart, None));

                tracing::info!("Room {} started", doc.room_code());
                Ok(())
            })
            .await?;

        Ok(doc)
    }

    /// Host sends everyone back to the lobby with a clean slate
    pub async fn reset_game(&self, room_code: &str, player_id: &str) -> GameResult<RoomDocument> {
        let (_, doc) = self
            .update_room(room_code, |doc, _| {
                let player = doc
                    .player(player_id)
                    .ok_or_else(|| GameError::PlayerNotFound(player_id.to_string()))?;
                if !player.is_host {
                    return Err(GameError::NotHost("reset the game"));
                }

                for player in doc.players.iter_mut() {
                    player.score = 0;
                    player.position = 0;
                    player.status_effect = StatusEffect::None;
                }

                let room_code = doc.state.room_code.clone();
                let mode = doc.state.mode;
                doc.state = GameState::new(room_code, mode);

                tracing::info!("Room {} reset", doc.room_code());
                Ok(())
            })
            .await?;

        Ok(doc)
    }

    /// Record whether a player's camera and microphone are on
    pub async fn set_media_status(
        &self,
        room_code: &str,
        player_id: &str,
        audio: bool,
        video: bool,
    ) -> GameResult<RoomDocument> {
        let (_, doc) = self
            .update_room(room_code, |doc, _| {
                let player = doc
                    .player_mut(player_id)
                    .ok_or_else(|| GameError::PlayerNotFound(player_id.to_string()))?;
                player.media_status = MediaStatus { audio, video };
                Ok(())
            })
            .await?;

        Ok(doc)
    }
}
