//! Sabotage rules: spend points to freeze or bomb an opponent

use crate::board;
use crate::config::GameConfig;
use crate::error::{GameError, GameResult};
use crate::types::{Player, SabotageKind, StatusEffect};

/// What a sabotage did to its target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SabotageOutcome {
    pub kind: SabotageKind,
    pub cost: u32,
    /// Target position before and after (unchanged for freeze)
    pub target_from: u8,
    pub target_to: u8,
}

/// Point cost of a sabotage kind
pub fn cost_of(kind: SabotageKind, config: &GameConfig) -> u32 {
    match kind {
        SabotageKind::Freeze => config.freeze_cost,
        SabotageKind::Bomb => config.bomb_cost,
    }
}

/// Debit the attacker and apply the effect to the target.
///
/// Nothing is mutated when any check fails.
pub fn apply(
    players: &mut [Player],
    attacker_id: &str,
    target_id: &str,
    kind: SabotageKind,
    config: &GameConfig,
) -> GameResult<SabotageOutcome> {
    if attacker_id == target_id {
        return Err(GameError::SelfTarget);
    }

    let attacker_index = players
        .iter()
        .position(|p| p.id == attacker_id)
        .ok_or_else(|| GameError::PlayerNotFound(attacker_id.to_string()))?;
    let target_index = players
        .iter()
        .position(|p| p.id == target_id)
        .ok_or_else(|| GameError::PlayerNotFound(target_id.to_string()))?;

    let cost = cost_of(kind, config);
    let score = players[attacker_index].score;
    if score < cost {
        return Err(GameError::InsufficientScore { cost, score });
    }

    if kind == SabotageKind::Freeze && players[target_index].is_frozen() {
        return Err(GameError::AlreadyFrozen(target_id.to_string()));
    }

    players[attacker_index].score = score - cost;

    let target = &mut players[target_index];
    let target_from = target.position;
    match kind {
        SabotageKind::Freeze => target.status_effect = StatusEffect::Frozen,
        SabotageKind::Bomb => target.position = board::retreat(target.position, config.bomb_penalty),
    }

    Ok(SabotageOutcome {
        kind,
        cost,
        target_from,
        target_to: target.position,
    })
}
