use serde::{Deserialize, Serialize};

/// Opaque ID types for type safety
pub type RoomCode = String;
pub type PlayerId = String;
pub type QuestionId = String;

/// Number of tiles on the board
pub const BOARD_TILES: u8 = 24;
/// Index of the finish tile
pub const FINISH_TILE: u8 = BOARD_TILES - 1;
/// Maximum number of players in one room
pub const MAX_PLAYERS: usize = 8;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GamePhase {
    Lobby,
    Board,
    TriviaAnswering,
    GameOver,
}

/// How the room's document is synchronised
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    /// Shared through the external realtime store
    Networked,
    /// Kept in the local mirror only, played against bots
    #[default]
    Local,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StatusEffect {
    #[default]
    None,
    Frozen,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct MediaStatus {
    pub audio: bool,
    pub video: bool,
}

impl Default for MediaStatus {
    fn default() -> Self {
        Self {
            audio: true,
            video: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub avatar: String,
    pub score: u32,
    /// Board position (0-23)
    pub position: u8,
    pub is_host: bool,
    /// Resolved per viewer, always false in the stored document
    #[serde(default)]
    pub is_me: bool,
    #[serde(default)]
    pub status_effect: StatusEffect,
    #[serde(default)]
    pub media_status: MediaStatus,
    #[serde(default)]
    pub is_bot: bool,
}

impl Player {
    pub fn new(id: PlayerId, name: String, avatar: String) -> Self {
        Self {
            id,
            name,
            avatar,
            score: 0,
            position: 0,
            is_host: false,
            is_me: false,
            status_effect: StatusEffect::None,
            media_status: MediaStatus::default(),
            is_bot: false,
        }
    }

    pub fn is_frozen(&self) -> bool {
        self.status_effect == StatusEffect::Frozen
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum QuestionType {
    Text,
    Video,
}

/// Type-specific payload of a question
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum QuestionKind {
    Text,
    Video {
        youtube_id: String,
        /// Clip start in seconds
        start_time: f64,
        /// Clip end in seconds
        end_time: f64,
        /// "Blind test": play the clip's audio only
        #[serde(default)]
        is_audio_question: bool,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Question {
    pub id: QuestionId,
    #[serde(flatten)]
    pub kind: QuestionKind,
    pub prompt: String,
    pub options: Vec<String>,
    pub correct_answer_index: usize,
}

impl Question {
    pub fn question_type(&self) -> QuestionType {
        match self.kind {
            QuestionKind::Text => QuestionType::Text,
            QuestionKind::Video { .. } => QuestionType::Video,
        }
    }

    /// Where the shared video should start when the question opens
    pub fn start_time(&self) -> f64 {
        match self.kind {
            QuestionKind::Text => 0.0,
            QuestionKind::Video { start_time, .. } => start_time,
        }
    }

    pub fn is_audio_only(&self) -> bool {
        matches!(
            self.kind,
            QuestionKind::Video {
                is_audio_question: true,
                ..
            }
        )
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct VideoSync {
    pub is_playing: bool,
    pub current_time: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GameState {
    pub room_code: RoomCode,
    #[serde(default)]
    pub mode: SyncMode,
    pub phase: GamePhase,
    pub current_player_turn: Option<PlayerId>,
    pub active_question: Option<Question>,
    #[serde(default)]
    pub video_sync: VideoSync,
    #[serde(default)]
    pub winner_id: Option<PlayerId>,
    /// Whether the current player already rolled this turn
    #[serde(default)]
    pub has_rolled: bool,
}

impl GameState {
    pub fn new(room_code: RoomCode, mode: SyncMode) -> Self {
        Self {
            room_code,
            mode,
            phase: GamePhase::Lobby,
            current_player_turn: None,
            active_question: None,
            video_sync: VideoSync::default(),
            winner_id: None,
            has_rolled: false,
        }
    }
}

/// The single shared document backing a room
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoomDocument {
    pub state: GameState,
    pub players: Vec<Player>,
    pub version: u64,
    pub updated_at: String,
}

impl RoomDocument {
    pub fn new(room_code: RoomCode, mode: SyncMode) -> Self {
        Self {
            state: GameState::new(room_code, mode),
            players: Vec::new(),
            version: 1,
            updated_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn room_code(&self) -> &str {
        &self.state.room_code
    }

    pub fn player(&self, id: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn player_mut(&mut self, id: &str) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    pub fn current_player(&self) -> Option<&Player> {
        self.state
            .current_player_turn
            .as_deref()
            .and_then(|id| self.player(id))
    }

    pub fn has_humans(&self) -> bool {
        self.players.iter().any(|p| !p.is_bot)
    }

    /// Mark a local modification before the document is written back
    pub fn touch(&mut self) {
        self.version += 1;
        self.updated_at = chrono::Utc::now().to_rfc3339();
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SabotageKind {
    /// Target skips their next turn
    Freeze,
    /// Target is knocked back a few tiles
    Bomb,
}

/// Game events the host reacts to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    GameStart,
    RolledOne,
    MissedQuestion,
    Streak,
    Sabotage,
    FrozenTurn,
    Win,
    Waiting,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GameEvent {
    pub kind: EventKind,
    pub player_id: Option<PlayerId>,
    pub timestamp: String,
}

impl GameEvent {
    pub fn new(kind: EventKind, player_id: Option<PlayerId>) -> Self {
        Self {
            kind,
            player_id,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_question_wire_format() {
        let json = r#"{
            "id": "v1",
            "type": "video",
            "prompt": "What happens next?",
            "youtube_id": "abc",
            "start_time": 165,
            "end_time": 180,
            "options": ["A", "B"],
            "correct_answer_index": 1
        }"#;

        let q: Question = serde_json::from_str(json).unwrap();
        assert_eq!(q.question_type(), QuestionType::Video);
        assert_eq!(q.start_time(), 165.0);
        assert!(!q.is_audio_only());

        let value = serde_json::to_value(&q).unwrap();
        assert_eq!(value["type"], "video");
        assert_eq!(value["youtube_id"], "abc");
    }

    #[test]
    fn test_text_question_has_no_clip() {
        let json = r#"{"id":"t1","type":"text","prompt":"?","options":["a","b"],"correct_answer_index":0}"#;
        let q: Question = serde_json::from_str(json).unwrap();
        assert_eq!(q.question_type(), QuestionType::Text);
        assert_eq!(q.start_time(), 0.0);
    }

    #[test]
    fn test_phase_serializes_screaming() {
        let json = serde_json::to_string(&GamePhase::TriviaAnswering).unwrap();
        assert_eq!(json, "\"TRIVIA_ANSWERING\"");
    }

    #[test]
    fn test_touch_bumps_version() {
        let mut doc = RoomDocument::new("ABCDE".to_string(), SyncMode::Local);
        let before = doc.version;
        doc.touch();
        assert_eq!(doc.version, before + 1);
    }
}
