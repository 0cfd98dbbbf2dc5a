//! Board layout and movement rules
//!
//! The board is a single winding path of 24 tiles. Every third tile (after the
//! start) is a video tile, the last tile is the finish line.

use crate::types::{QuestionType, FINISH_TILE};
use rand::Rng;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileKind {
    Start,
    Trivia,
    Video,
    Finish,
}

impl TileKind {
    /// Question category this tile asks for (None for start/finish)
    pub fn question_type(self) -> Option<QuestionType> {
        match self {
            TileKind::Trivia => Some(QuestionType::Text),
            TileKind::Video => Some(QuestionType::Video),
            TileKind::Start | TileKind::Finish => None,
        }
    }
}

/// Kind of the tile at `position`
pub fn tile_kind(position: u8) -> TileKind {
    match position {
        0 => TileKind::Start,
        p if p >= FINISH_TILE => TileKind::Finish,
        p if p % 3 == 0 => TileKind::Video,
        _ => TileKind::Trivia,
    }
}

/// Roll a six-sided die
pub fn roll_die<R: Rng + ?Sized>(rng: &mut R) -> u8 {
    rng.random_range(1..=6)
}

/// New position after moving `steps` tiles forward, clamped to the finish
pub fn advance(position: u8, steps: u8) -> u8 {
    position.saturating_add(steps).min(FINISH_TILE)
}

/// New position after being knocked back `tiles`, clamped to the start
pub fn retreat(position: u8, tiles: u8) -> u8 {
    position.min(FINISH_TILE).saturating_sub(tiles)
}

/// Result of moving a player along the board
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveOutcome {
    pub from: u8,
    pub to: u8,
    pub tile: TileKind,
}

impl MoveOutcome {
    pub fn reached_finish(&self) -> bool {
        self.tile == TileKind::Finish
    }
}

/// Resolve a move of `steps` from `position`
pub fn resolve_move(position: u8, steps: u8) -> MoveOutcome {
    let to = advance(position, steps);
    MoveOutcome {
        from: position,
        to,
        tile: tile_kind(to),
    }
}
