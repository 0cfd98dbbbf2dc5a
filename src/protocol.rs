use crate::types::*;
use serde::{Deserialize, Serialize};

/// Protocol version announced in `welcome`
pub const PROTOCOL_VERSION: &str = "1.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ClientMessage {
    CreateRoom {
        name: String,
        #[serde(default)]
        avatar: Option<String>,
    },
    JoinRoom {
        room_code: RoomCode,
        name: String,
        #[serde(default)]
        avatar: Option<String>,
    },
    LeaveRoom,
    // Host-only messages
    StartGame,
    ResetGame,
    // Turn messages
    RollDice,
    SubmitAnswer {
        answer_index: usize,
    },
    EndTurn,
    Sabotage {
        target_id: PlayerId,
        kind: SabotageKind,
    },
    ToggleVideo {
        playing: bool,
        /// Playback position in seconds when the client knows it
        #[serde(default)]
        current_time: Option<f64>,
    },
    SetMedia {
        audio: bool,
        video: bool,
    },
    /// Ask for a fresh snapshot of the bound room
    RequestSnapshot,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ServerMessage {
    Welcome {
        protocol: String,
        /// Mode new rooms would be created in right now
        mode: SyncMode,
        board_tiles: u8,
        server_now: String,
    },
    /// This connection now sits in a room
    Joined {
        room_code: RoomCode,
        player_id: PlayerId,
    },
    Left {
        room_code: RoomCode,
    },
    Snapshot {
        room: RoomView,
    },
    DiceRolled {
        player_id: PlayerId,
        roll: u8,
        from: u8,
        to: u8,
    },
    AnswerResult {
        player_id: PlayerId,
        correct: bool,
        points: u32,
        correct_answer_index: usize,
    },
    Sabotaged {
        attacker_id: PlayerId,
        target_id: PlayerId,
        kind: SabotageKind,
        cost: u32,
    },
    Commentary {
        trigger: EventKind,
        text: String,
        player_id: Option<PlayerId>,
    },
    Error {
        code: String,
        msg: String,
    },
}

/// A room document as one viewer sees it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoomView {
    pub state: GameState,
    pub players: Vec<Player>,
    pub version: u64,
}

impl RoomView {
    /// Resolve `is_me` for `viewer`; spectators see it false everywhere
    pub fn for_viewer(doc: &RoomDocument, viewer: Option<&str>) -> Self {
        let players = doc
            .players
            .iter()
            .map(|p| Player {
                is_me: viewer == Some(p.id.as_str()),
                ..p.clone()
            })
            .collect();

        Self {
            state: doc.state.clone(),
            players,
            version: doc.version,
        }
    }
}
