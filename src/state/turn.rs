use super::AppState;
use crate::board::{self, TileKind};
use crate::error::{GameError, GameResult};
use crate::protocol::ServerMessage;
use crate::turn::{advance_turn, TurnAdvance};
use crate::types::*;

/// Result of one move, as announced to the room
#[derive(Debug, Clone)]
pub struct MoveReport {
    pub player_id: PlayerId,
    pub roll: u8,
    pub from: u8,
    pub to: u8,
    pub tile: TileKind,
    /// Question opened on the landing tile
    pub question: Option<Question>,
    pub won: bool,
}

impl AppState {
    /// Roll the die for the current player and move them
    pub async fn roll_dice(&self, room_code: &str, player_id: &str) -> GameResult<MoveReport> {
        let roll = board::roll_die(&mut rand::rng());
        self.move_player(room_code, player_id, roll).await
    }

    /// Move the current player `steps` tiles and resolve the landing tile
    pub async fn move_player(
        &self,
        room_code: &str,
        player_id: &str,
        steps: u8,
    ) -> GameResult<MoveReport> {
        if !(1..=6).contains(&steps) {
            return Err(GameError::InvalidRoll(steps));
        }

        let chaos_chance = self.config.chaos_chance;

        let (report, _) = self
            .update_room(room_code, |doc, events| {
                Self::require_phase(doc, GamePhase::Board)?;
                Self::require_turn(doc, player_id)?;
                if doc.state.active_question.is_some() {
                    return Err(GameError::QuestionPending);
                }
                if doc.state.has_rolled {
                    return Err(GameError::AlreadyRolled);
                }

                let player = doc
                    .player_mut(player_id)
                    .ok_or_else(|| GameError::PlayerNotFound(player_id.to_string()))?;
                let outcome = board::resolve_move(player.position, steps);
                player.position = outcome.to;
                doc.state.has_rolled = true;

                if steps == 1 {
                    events.push(GameEvent::new(EventKind::RolledOne, Some(player_id.to_string())));
                }

                let mut report = MoveReport {
                    player_id: player_id.to_string(),
                    roll: steps,
                    from: outcome.from,
                    to: outcome.to,
                    tile: outcome.tile,
                    question: None,
                    won: false,
                };

                if outcome.reached_finish() {
                    doc.state.phase = GamePhase::GameOver;
                    doc.state.winner_id = Some(player_id.to_string());
                    events.push(GameEvent::new(EventKind::Win, Some(player_id.to_string())));
                    tracing::info!("Room {}: {} reached the finish", doc.room_code(), player_id);
                    report.won = true;
                    return Ok(report);
                }

                let question = self
                    .questions
                    .question_for_tile(&mut rand::rng(), outcome.tile, chaos_chance);
                if let Some(question) = &question {
                    doc.state.phase = GamePhase::TriviaAnswering;
                    doc.state.video_sync = VideoSync {
                        is_playing: false,
                        current_time: question.start_time(),
                    };
                    doc.state.active_question = Some(question.clone());
                }
                report.question = question;

                Ok(report)
            })
            .await?;

        tracing::debug!(
            "Room {}: {} rolled {} ({} -> {})",
            room_code,
            player_id,
            report.roll,
            report.from,
            report.to
        );
        self.publish(
            room_code,
            ServerMessage::DiceRolled {
                player_id: report.player_id.clone(),
                roll: report.roll,
                from: report.from,
                to: report.to,
            },
        );

        Ok(report)
    }

    /// Pass the turn to the next player who is not frozen
    pub async fn end_turn(&self, room_code: &str, player_id: &str) -> GameResult<TurnAdvance> {
        let (advance, _) = self
            .update_room(room_code, |doc, events| {
                Self::require_phase(doc, GamePhase::Board)?;
                Self::require_turn(doc, player_id)?;
                if doc.state.active_question.is_some() {
                    return Err(GameError::QuestionPending);
                }

                let advance = advance_turn(&mut doc.players, Some(player_id))
                    .ok_or_else(|| GameError::PlayerNotFound(player_id.to_string()))?;

                for skipped in &advance.skipped {
                    events.push(GameEvent::new(EventKind::FrozenTurn, Some(skipped.clone())));
                }
                doc.state.current_player_turn = Some(advance.next.clone());
                doc.state.has_rolled = false;

                Ok(advance)
            })
            .await?;

        tracing::debug!("Room {}: turn passes to {}", room_code, advance.next);
        Ok(advance)
    }
}

#[cfg(test)]
mod tests {
    use crate::state::tests::{commentary_triggers, test_state};
    use crate::state::AppState;
    use crate::store::DocumentStore;
    use crate::types::*;

    async fn started(state: &AppState) -> (String, String) {
        let (doc, host) = state.create_room("Ana".to_string(), None).await.unwrap();
        let code = doc.room_code().to_string();
        state.start_game(&code, &host).await.unwrap();
        (code, host)
    }

    #[tokio::test]
    async fn test_move_opens_question() {
        let state = test_state();
        let (code, host) = started(&state).await;

        // 0 -> 2 is a trivia tile
        let report = state.move_player(&code, &host, 2).await.unwrap();
        assert_eq!(report.to, 2);
        let question = report.question.unwrap();
        assert_eq!(question.question_type(), QuestionType::Text);

        let doc = state.get_room(&code).await.unwrap();
        assert_eq!(doc.state.phase, GamePhase::TriviaAnswering);
        assert!(doc.state.has_rolled);
        assert_eq!(doc.state.active_question.unwrap().id, question.id);
        assert!(!doc.state.video_sync.is_playing);
    }

    #[tokio::test]
    async fn test_video_tile_sets_clip_start() {
        let state = test_state();
        let (code, host) = started(&state).await;

        let report = state.move_player(&code, &host, 3).await.unwrap();
        let question = report.question.unwrap();
        assert_eq!(question.question_type(), QuestionType::Video);

        let doc = state.get_room(&code).await.unwrap();
        assert_eq!(doc.state.video_sync.current_time, question.start_time());
    }

    #[tokio::test]
    async fn test_move_rules() {
        let state = test_state();
        let (code, host) = started(&state).await;

        assert_eq!(state.move_player(&code, &host, 7).await.unwrap_err().code(), "INVALID_ROLL");
        assert_eq!(state.move_player(&code, &host, 0).await.unwrap_err().code(), "INVALID_ROLL");
        assert_eq!(
            state.move_player(&code, "bot-1", 2).await.unwrap_err().code(),
            "NOT_YOUR_TURN"
        );

        state.move_player(&code, &host, 2).await.unwrap();
        assert_eq!(
            state.move_player(&code, &host, 2).await.unwrap_err().code(),
            "WRONG_PHASE"
        );
    }

    #[tokio::test]
    async fn test_one_roll_per_turn() {
        let state = test_state();
        let (code, host) = started(&state).await;

        // Land on a trivia tile, answer, then try again
        state.move_player(&code, &host, 1).await.unwrap();
        let doc = state.get_room(&code).await.unwrap();
        let answer = doc.state.active_question.unwrap().correct_answer_index;
        state.submit_answer(&code, &host, answer).await.unwrap();

        let err = state.move_player(&code, &host, 2).await.unwrap_err();
        assert_eq!(err.code(), "ALREADY_ROLLED");
    }

    #[tokio::test]
    async fn test_finish_wins() {
        let state = test_state();
        let (code, host) = started(&state).await;

        let mut doc = state.get_room(&code).await.unwrap();
        doc.player_mut(&host).unwrap().position = 20;
        doc.touch();
        state.store.save(&doc).await.unwrap();

        let mut rx = state.broadcast.subscribe();
        let report = state.move_player(&code, &host, 6).await.unwrap();
        assert!(report.won);
        assert_eq!(report.to, FINISH_TILE);
        assert!(report.question.is_none());
        assert_eq!(commentary_triggers(&mut rx), vec![EventKind::Win]);

        let doc = state.get_room(&code).await.unwrap();
        assert_eq!(doc.state.phase, GamePhase::GameOver);
        assert_eq!(doc.state.winner_id.as_deref(), Some(host.as_str()));
    }

    #[tokio::test]
    async fn test_end_turn_skips_frozen() {
        let state = test_state();
        let (code, host) = started(&state).await;

        let mut doc = state.get_room(&code).await.unwrap();
        doc.player_mut("bot-1").unwrap().status_effect = StatusEffect::Frozen;
        doc.touch();
        state.store.save(&doc).await.unwrap();

        let mut rx = state.broadcast.subscribe();
        let advance = state.end_turn(&code, &host).await.unwrap();
        assert_eq!(advance.next, "bot-2");
        assert_eq!(advance.skipped, vec!["bot-1".to_string()]);
        assert_eq!(commentary_triggers(&mut rx), vec![EventKind::FrozenTurn]);

        let doc = state.get_room(&code).await.unwrap();
        assert!(!doc.player("bot-1").unwrap().is_frozen());
        assert_eq!(doc.state.current_player_turn.as_deref(), Some("bot-2"));
        assert!(!doc.state.has_rolled);
    }

    #[tokio::test]
    async fn test_rolling_one_is_roasted() {
        let state = test_state();
        let (code, host) = started(&state).await;
        let mut rx = state.broadcast.subscribe();

        state.move_player(&code, &host, 1).await.unwrap();

        let mut roasts = Vec::new();
        while let Ok(sent) = rx.try_recv() {
            if let crate::protocol::ServerMessage::Commentary {
                trigger, player_id, ..
            } = sent.message
            {
                roasts.push((trigger, player_id));
            }
        }
        assert_eq!(roasts, vec![(EventKind::RolledOne, Some(host.clone()))]);
    }

    #[tokio::test]
    async fn test_plain_roll_and_end_turn_stay_quiet() {
        let state = test_state();
        let (code, host) = started(&state).await;
        let mut rx = state.broadcast.subscribe();

        state.move_player(&code, &host, 2).await.unwrap();
        let doc = state.get_room(&code).await.unwrap();
        let question = doc.state.active_question.unwrap();
        let wrong = (question.correct_answer_index + 1) % question.options.len();
        state.submit_answer(&code, &host, wrong).await.unwrap();
        state.end_turn(&code, &host).await.unwrap();

        // Only the missed question is remarked on
        assert_eq!(commentary_triggers(&mut rx), vec![EventKind::MissedQuestion]);
    }

    #[tokio::test]
    async fn test_cannot_end_turn_with_open_question() {
        let state = test_state();
        let (code, host) = started(&state).await;

        state.move_player(&code, &host, 2).await.unwrap();
        let err = state.end_turn(&code, &host).await.unwrap_err();
        assert_eq!(err.code(), "WRONG_PHASE");
    }

    #[tokio::test]
    async fn test_roll_dice_announces() {
        let state = test_state();
        let (code, host) = started(&state).await;
        let mut rx = state.broadcast.subscribe();

        let report = state.roll_dice(&code, &host).await.unwrap();
        assert!((1..=6).contains(&report.roll));

        loop {
            let sent = rx.recv().await.unwrap();
            if let crate::protocol::ServerMessage::DiceRolled { roll, .. } = sent.message {
                assert_eq!(roll, report.roll);
                break;
            }
        }
    }
}
