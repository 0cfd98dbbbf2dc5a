use crate::store::StoreError;
use crate::types::GamePhase;

/// Result type for game operations
pub type GameResult<T> = Result<T, GameError>;

/// Rule violations and lookup failures raised by game operations
#[derive(Debug, thiserror::Error)]
pub enum GameError {
    #[error("Room {0} not found")]
    RoomNotFound(String),

    #[error("Player {0} is not in this room")]
    PlayerNotFound(String),

    #[error("Room is full")]
    RoomFull,

    #[error("Action not allowed during {0:?}")]
    WrongPhase(GamePhase),

    #[error("It is not your turn")]
    NotYourTurn,

    #[error("Only the host can {0}")]
    NotHost(&'static str),

    #[error("You already rolled this turn")]
    AlreadyRolled,

    #[error("Answer the active question first")]
    QuestionPending,

    #[error("No active question")]
    NoActiveQuestion,

    #[error("The active question has no video")]
    NotAVideoQuestion,

    #[error("Invalid roll {0} (must be 1-6)")]
    InvalidRoll(u8),

    #[error("Invalid answer index {0}")]
    InvalidAnswer(usize),

    #[error("You cannot sabotage yourself")]
    SelfTarget,

    #[error("Not enough points: need {cost}, have {score}")]
    InsufficientScore { cost: u32, score: u32 },

    #[error("Player {0} is already frozen")]
    AlreadyFrozen(String),

    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl GameError {
    /// Stable error code sent to clients
    pub fn code(&self) -> &'static str {
        match self {
            GameError::RoomNotFound(_) => "ROOM_NOT_FOUND",
            GameError::PlayerNotFound(_) => "PLAYER_NOT_FOUND",
            GameError::RoomFull => "ROOM_FULL",
            GameError::WrongPhase(_) => "WRONG_PHASE",
            GameError::NotYourTurn => "NOT_YOUR_TURN",
            GameError::NotHost(_) => "UNAUTHORIZED",
            GameError::AlreadyRolled => "ALREADY_ROLLED",
            GameError::QuestionPending => "QUESTION_PENDING",
            GameError::NoActiveQuestion => "NO_ACTIVE_QUESTION",
            GameError::NotAVideoQuestion => "NOT_A_VIDEO_QUESTION",
            GameError::InvalidRoll(_) => "INVALID_ROLL",
            GameError::InvalidAnswer(_) => "INVALID_ANSWER",
            GameError::SelfTarget => "SELF_TARGET",
            GameError::InsufficientScore { .. } => "INSUFFICIENT_SCORE",
            GameError::AlreadyFrozen(_) => "ALREADY_FROZEN",
            GameError::InvalidSnapshot(_) => "INVALID_SNAPSHOT",
            GameError::Store(_) => "STORE_UNAVAILABLE",
        }
    }
}
