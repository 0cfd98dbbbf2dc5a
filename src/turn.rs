//! Turn order resolution

use crate::types::{Player, PlayerId, StatusEffect};

/// Who plays next, and who was skipped on the way
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnAdvance {
    pub next: PlayerId,
    /// Frozen players whose turn was consumed by the freeze
    pub skipped: Vec<PlayerId>,
}

/// Pass the turn after `current`, skipping frozen players and thawing them.
///
/// If every other player is frozen the turn comes back to `current`. Returns
/// None when there are no players. An unknown `current` hands the turn to the
/// first player.
pub fn advance_turn(players: &mut [Player], current: Option<&str>) -> Option<TurnAdvance> {
    if players.is_empty() {
        return None;
    }

    let start = match current.and_then(|id| players.iter().position(|p| p.id == id)) {
        Some(index) => index,
        None => {
            return Some(TurnAdvance {
                next: players[0].id.clone(),
                skipped: Vec::new(),
            })
        }
    };

    let count = players.len();
    let mut skipped = Vec::new();

    for offset in 1..=count {
        let index = (start + offset) % count;
        let candidate = &mut players[index];

        if index != start && candidate.status_effect == StatusEffect::Frozen {
            candidate.status_effect = StatusEffect::None;
            skipped.push(candidate.id.clone());
            continue;
        }

        return Some(TurnAdvance {
            next: candidate.id.clone(),
            skipped,
        });
    }

    // Unreachable: offset == count always lands back on `start`
    None
}
