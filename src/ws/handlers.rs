//! WebSocket message dispatch
//!
//! Each client message is checked against the connection's seat, then handed
//! to the matching `AppState` operation. Room changes reach clients through
//! the document subscription; only direct replies are returned here.

use crate::error::GameError;
use crate::protocol::{ClientMessage, RoomView, ServerMessage};
use crate::state::AppState;
use crate::types::{PlayerId, RoomCode};
use std::sync::Arc;

/// Where a connection sits
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub room_code: Option<RoomCode>,
    /// None for spectators
    pub player_id: Option<PlayerId>,
}

impl Session {
    pub fn seat(&mut self, room_code: RoomCode, player_id: PlayerId) {
        self.room_code = Some(room_code);
        self.player_id = Some(player_id);
    }

    pub fn clear(&mut self) {
        self.room_code = None;
        self.player_id = None;
    }
}

/// Macro to require a seat in a room and return early otherwise
macro_rules! require_seat {
    ($session:expr) => {
        match (&$session.room_code, &$session.player_id) {
            (Some(room), Some(player)) => (room.clone(), player.clone()),
            _ => {
                return Some(ServerMessage::Error {
                    code: "NOT_IN_ROOM".to_string(),
                    msg: "Join a room first".to_string(),
                })
            }
        }
    };
}

fn error_reply(e: GameError) -> Option<ServerMessage> {
    match &e {
        GameError::Store(_) => tracing::error!("Store failure: {}", e),
        _ => tracing::debug!("Rejected: {}", e),
    }
    Some(ServerMessage::Error {
        code: e.code().to_string(),
        msg: e.to_string(),
    })
}

/// Reply with `reply` on success, or the error
fn reply_or_error<T>(result: Result<T, GameError>, reply: Option<ServerMessage>) -> Option<ServerMessage> {
    match result {
        Ok(_) => reply,
        Err(e) => error_reply(e),
    }
}

/// Handle client messages and return optional response
pub async fn handle_message(
    msg: ClientMessage,
    session: &mut Session,
    state: &Arc<AppState>,
) -> Option<ServerMessage> {
    match msg {
        ClientMessage::CreateRoom { name, avatar } => {
            tracing::info!("Create room request from {}", name);
            match state.create_room(name, avatar).await {
                Ok((doc, player_id)) => {
                    session.seat(doc.room_code().to_string(), player_id.clone());
                    Some(ServerMessage::Joined {
                        room_code: doc.room_code().to_string(),
                        player_id,
                    })
                }
                Err(e) => error_reply(e),
            }
        }

        ClientMessage::JoinRoom {
            room_code,
            name,
            avatar,
        } => {
            let room_code = room_code.trim().to_uppercase();
            tracing::info!("Join request for room {} from {}", room_code, name);
            match state.join_room(&room_code, name, avatar).await {
                Ok((_, player_id)) => {
                    session.seat(room_code.clone(), player_id.clone());
                    Some(ServerMessage::Joined {
                        room_code,
                        player_id,
                    })
                }
                Err(e) => error_reply(e),
            }
        }

        ClientMessage::LeaveRoom => {
            let (room, player) = require_seat!(session);
            match state.leave_room(&room, &player).await {
                Ok(_) => {
                    session.clear();
                    Some(ServerMessage::Left { room_code: room })
                }
                Err(e) => error_reply(e),
            }
        }

        ClientMessage::StartGame => {
            let (room, player) = require_seat!(session);
            reply_or_error(state.start_game(&room, &player).await, None)
        }

        ClientMessage::ResetGame => {
            let (room, player) = require_seat!(session);
            reply_or_error(state.reset_game(&room, &player).await, None)
        }

        ClientMessage::RollDice => {
            let (room, player) = require_seat!(session);
            reply_or_error(state.roll_dice(&room, &player).await, None)
        }

        ClientMessage::SubmitAnswer { answer_index } => {
            let (room, player) = require_seat!(session);
            reply_or_error(state.submit_answer(&room, &player, answer_index).await, None)
        }

        ClientMessage::EndTurn => {
            let (room, player) = require_seat!(session);
            reply_or_error(state.end_turn(&room, &player).await, None)
        }

        ClientMessage::Sabotage { target_id, kind } => {
            let (room, player) = require_seat!(session);
            reply_or_error(state.sabotage(&room, &player, &target_id, kind).await, None)
        }

        ClientMessage::ToggleVideo {
            playing,
            current_time,
        } => {
            let (room, player) = require_seat!(session);
            reply_or_error(
                state.toggle_video(&room, &player, playing, current_time).await,
                None,
            )
        }

        ClientMessage::SetMedia { audio, video } => {
            let (room, player) = require_seat!(session);
            reply_or_error(state.set_media_status(&room, &player, audio, video).await, None)
        }

        ClientMessage::RequestSnapshot => {
            let Some(room) = session.room_code.clone() else {
                return Some(ServerMessage::Error {
                    code: "NOT_IN_ROOM".to_string(),
                    msg: "Join a room first".to_string(),
                });
            };
            match state.get_room(&room).await {
                Ok(doc) => Some(ServerMessage::Snapshot {
                    room: RoomView::for_viewer(&doc, session.player_id.as_deref()),
                }),
                Err(e) => error_reply(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AppState;

    #[tokio::test]
    async fn test_actions_need_a_seat() {
        let state = Arc::new(AppState::local());
        let mut session = Session::default();

        let reply = handle_message(ClientMessage::RollDice, &mut session, &state).await;
        assert!(matches!(
            reply,
            Some(ServerMessage::Error { ref code, .. }) if code == "NOT_IN_ROOM"
        ));
    }

    #[tokio::test]
    async fn test_create_seats_connection() {
        let state = Arc::new(AppState::local());
        let mut session = Session::default();

        let reply = handle_message(
            ClientMessage::CreateRoom {
                name: "Ana".to_string(),
                avatar: None,
            },
            &mut session,
            &state,
        )
        .await;

        let Some(ServerMessage::Joined {
            room_code,
            player_id,
        }) = reply
        else {
            panic!("expected joined");
        };
        assert_eq!(session.room_code.as_deref(), Some(room_code.as_str()));
        assert_eq!(session.player_id.as_deref(), Some(player_id.as_str()));
    }

    #[tokio::test]
    async fn test_join_normalises_code() {
        let state = Arc::new(AppState::local());
        let (doc, _) = state.create_room("Ana".to_string(), None).await.unwrap();
        let mut session = Session::default();

        let reply = handle_message(
            ClientMessage::JoinRoom {
                room_code: format!(" {} ", doc.room_code().to_lowercase()),
                name: "Ben".to_string(),
                avatar: None,
            },
            &mut session,
            &state,
        )
        .await;
        assert!(matches!(reply, Some(ServerMessage::Joined { .. })));
        assert_eq!(session.room_code.as_deref(), Some(doc.room_code()));
    }

    #[tokio::test]
    async fn test_rule_errors_carry_codes() {
        let state = Arc::new(AppState::local());
        let (doc, host) = state.create_room("Ana".to_string(), None).await.unwrap();
        let mut session = Session::default();
        session.seat(doc.room_code().to_string(), host);

        // Not started yet
        let reply = handle_message(ClientMessage::RollDice, &mut session, &state).await;
        assert!(matches!(
            reply,
            Some(ServerMessage::Error { ref code, .. }) if code == "WRONG_PHASE"
        ));
    }

    #[tokio::test]
    async fn test_snapshot_marks_viewer() {
        let state = Arc::new(AppState::local());
        let (doc, host) = state.create_room("Ana".to_string(), None).await.unwrap();
        let mut session = Session::default();
        session.seat(doc.room_code().to_string(), host.clone());

        let reply = handle_message(ClientMessage::RequestSnapshot, &mut session, &state).await;
        let Some(ServerMessage::Snapshot { room }) = reply else {
            panic!("expected snapshot");
        };
        let me: Vec<_> = room.players.iter().filter(|p| p.is_me).collect();
        assert_eq!(me.len(), 1);
        assert_eq!(me[0].id, host);
    }
}
