use super::AppState;
use crate::error::GameResult;
use crate::types::*;
use rand::Rng;

/// What a bot did with its step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotAction {
    Answered { correct: bool },
    Rolled(u8),
    EndedTurn,
}

impl AppState {
    /// Let the bot holding the turn take one action.
    ///
    /// Bots guess answers at random, roll when they have not, and otherwise
    /// end their turn. Rooms without a human are left alone.
    pub async fn play_bot_step(&self, room_code: &str) -> GameResult<Option<BotAction>> {
        let doc = self.get_room(room_code).await?;
        if !doc.has_humans() {
            return Ok(None);
        }
        let Some(bot) = doc.current_player().filter(|p| p.is_bot) else {
            return Ok(None);
        };
        let bot_id = bot.id.clone();

        let action = match (doc.state.phase, &doc.state.active_question) {
            (GamePhase::TriviaAnswering, Some(question)) => {
                let guess = rand::rng().random_range(0..question.options.len().max(1));
                let outcome = self.submit_answer(room_code, &bot_id, guess).await?;
                BotAction::Answered {
                    correct: outcome.correct,
                }
            }
            (GamePhase::Board, None) if !doc.state.has_rolled => {
                let report = self.roll_dice(room_code, &bot_id).await?;
                BotAction::Rolled(report.roll)
            }
            (GamePhase::Board, None) => {
                self.end_turn(room_code, &bot_id).await?;
                BotAction::EndedTurn
            }
            _ => return Ok(None),
        };

        tracing::debug!("Room {}: {} {:?}", room_code, bot.name, action);
        Ok(Some(action))
    }
}
