use super::AppState;
use crate::error::{GameError, GameResult};
use crate::protocol::ServerMessage;
use crate::sabotage::{self, SabotageOutcome};
use crate::types::*;

impl AppState {
    /// Spend points on the current turn to hurt an opponent
    pub async fn sabotage(
        &self,
        room_code: &str,
        attacker_id: &str,
        target_id: &str,
        kind: SabotageKind,
    ) -> GameResult<SabotageOutcome> {
        let (outcome, _) = self
            .update_room(room_code, |doc, events| {
                Self::require_phase(doc, GamePhase::Board)?;
                Self::require_turn(doc, attacker_id)?;
                if doc.state.active_question.is_some() {
                    return Err(GameError::QuestionPending);
                }

                let outcome =
                    sabotage::apply(&mut doc.players, attacker_id, target_id, kind, &self.config)?;
                events.push(GameEvent::new(EventKind::Sabotage, Some(target_id.to_string())));
                Ok(outcome)
            })
            .await?;

        tracing::info!(
            "Room {}: {} used {:?} on {} for {} points",
            room_code,
            attacker_id,
            kind,
            target_id,
            outcome.cost
        );
        self.publish(
            room_code,
            ServerMessage::Sabotaged {
                attacker_id: attacker_id.to_string(),
                target_id: target_id.to_string(),
                kind,
                cost: outcome.cost,
            },
        );

        Ok(outcome)
    }
}
