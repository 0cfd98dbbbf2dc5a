use super::AppState;
use crate::error::{GameError, GameResult};
use crate::protocol::ServerMessage;
use crate::questions::points_for;
use crate::types::*;

/// How an answer was judged
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerOutcome {
    pub player_id: PlayerId,
    pub correct: bool,
    pub points: u32,
    pub correct_answer_index: usize,
}

impl AppState {
    /// Judge the current player's answer and close the question.
    ///
    /// The turn stays with the player; they end it themselves.
    pub async fn submit_answer(
        &self,
        room_code: &str,
        player_id: &str,
        answer_index: usize,
    ) -> GameResult<AnswerOutcome> {
        let (outcome, _) = self
            .update_room(room_code, |doc, events| {
                Self::require_phase(doc, GamePhase::TriviaAnswering)?;
                Self::require_turn(doc, player_id)?;

                let question = doc
                    .state
                    .active_question
                    .as_ref()
                    .ok_or(GameError::NoActiveQuestion)?;
                if answer_index >= question.options.len() {
                    return Err(GameError::InvalidAnswer(answer_index));
                }

                let correct = answer_index == question.correct_answer_index;
                let points = if correct {
                    points_for(question, &self.config)
                } else {
                    0
                };
                let correct_answer_index = question.correct_answer_index;

                if let Some(player) = doc.player_mut(player_id) {
                    player.score = player.score.saturating_add(points);
                }

                let kind = if correct {
                    EventKind::Streak
                } else {
                    EventKind::MissedQuestion
                };
                events.push(GameEvent::new(kind, Some(player_id.to_string())));

                doc.state.active_question = None;
                doc.state.video_sync = VideoSync::default();
                doc.state.phase = GamePhase::Board;

                Ok(AnswerOutcome {
                    player_id: player_id.to_string(),
                    correct,
                    points,
                    correct_answer_index,
                })
            })
            .await?;

        tracing::info!(
            "Room {}: {} answered {} (+{})",
            room_code,
            player_id,
            if outcome.correct { "correctly" } else { "wrong" },
            outcome.points
        );
        self.publish(
            room_code,
            ServerMessage::AnswerResult {
                player_id: outcome.player_id.clone(),
                correct: outcome.correct,
                points: outcome.points,
                correct_answer_index: outcome.correct_answer_index,
            },
        );

        Ok(outcome)
    }

    /// Play or pause the shared clip of the active video question
    pub async fn toggle_video(
        &self,
        room_code: &str,
        player_id: &str,
        playing: bool,
        current_time: Option<f64>,
    ) -> GameResult<VideoSync> {
        let (sync, _) = self
            .update_room(room_code, |doc, _| {
                Self::require_turn(doc, player_id)?;
                let question = doc
                    .state
                    .active_question
                    .as_ref()
                    .ok_or(GameError::NoActiveQuestion)?;
                if question.question_type() != QuestionType::Video {
                    return Err(GameError::NotAVideoQuestion);
                }

                doc.state.video_sync.is_playing = playing;
                if let Some(time) = current_time.filter(|t| t.is_finite() && *t >= 0.0) {
                    doc.state.video_sync.current_time = time;
                }
                Ok(doc.state.video_sync)
            })
            .await?;

        Ok(sync)
    }
}

#[cfg(test)]
mod tests {
    use crate::config::GameConfig;
    use crate::protocol::ServerMessage;
    use crate::questions::QuestionBank;
    use crate::state::tests::test_state;
    use crate::state::AppState;
    use crate::store::{DocumentStore, MirroredStore};
    use crate::types::*;
    use std::sync::Arc;

    async fn on_question(state: &AppState, steps: u8) -> (String, String, Question) {
        let (doc, host) = state.create_room("Ana".to_string(), None).await.unwrap();
        let code = doc.room_code().to_string();
        state.start_game(&code, &host).await.unwrap();
        let question = state
            .move_player(&code, &host, steps)
            .await
            .unwrap()
            .question
            .unwrap();
        (code, host, question)
    }

    #[tokio::test]
    async fn test_correct_text_answer_scores() {
        let state = test_state();
        let (code, host, question) = on_question(&state, 2).await;

        let outcome = state
            .submit_answer(&code, &host, question.correct_answer_index)
            .await
            .unwrap();
        assert!(outcome.correct);
        assert_eq!(outcome.points, 100);

        let doc = state.get_room(&code).await.unwrap();
        assert_eq!(doc.player(&host).unwrap().score, 100);
        assert_eq!(doc.state.phase, GamePhase::Board);
        assert!(doc.state.active_question.is_none());
        // Turn is not passed by answering
        assert_eq!(doc.state.current_player_turn.as_deref(), Some(host.as_str()));
    }

    #[tokio::test]
    async fn test_video_answer_worth_more() {
        let state = test_state();
        let (code, host, question) = on_question(&state, 3).await;

        let outcome = state
            .submit_answer(&code, &host, question.correct_answer_index)
            .await
            .unwrap();
        assert_eq!(outcome.points, 200);
    }

    #[tokio::test]
    async fn test_wrong_answer_roasted() {
        let state = test_state();
        let (code, host, question) = on_question(&state, 2).await;
        let mut rx = state.broadcast.subscribe();

        let wrong = (question.correct_answer_index + 1) % question.options.len();
        let outcome = state.submit_answer(&code, &host, wrong).await.unwrap();
        assert!(!outcome.correct);
        assert_eq!(outcome.points, 0);

        let mut saw_roast = false;
        while let Ok(sent) = rx.try_recv() {
            if let ServerMessage::Commentary { trigger, .. } = sent.message {
                saw_roast |= trigger == EventKind::MissedQuestion;
            }
        }
        assert!(saw_roast);
    }

    #[tokio::test]
    async fn test_score_saturates() {
        let config = GameConfig {
            chaos_chance: 0.0,
            text_points: u32::MAX,
            ..GameConfig::default()
        };
        let state = AppState::new(
            Arc::new(MirroredStore::local_only()),
            Arc::new(QuestionBank::builtin().unwrap()),
            config,
        );
        let (code, host, question) = on_question(&state, 2).await;

        let mut doc = state.get_room(&code).await.unwrap();
        doc.player_mut(&host).unwrap().score = 10;
        doc.touch();
        state.store.save(&doc).await.unwrap();

        let outcome = state
            .submit_answer(&code, &host, question.correct_answer_index)
            .await
            .unwrap();
        assert_eq!(outcome.points, u32::MAX);
        let doc = state.get_room(&code).await.unwrap();
        assert_eq!(doc.player(&host).unwrap().score, u32::MAX);
    }

    #[tokio::test]
    async fn test_answer_validation() {
        let state = test_state();
        let (code, host, question) = on_question(&state, 2).await;

        let err = state
            .submit_answer(&code, &host, question.options.len())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_ANSWER");

        let err = state.submit_answer(&code, "bot-1", 0).await.unwrap_err();
        assert_eq!(err.code(), "NOT_YOUR_TURN");
    }

    #[tokio::test]
    async fn test_toggle_video() {
        let state = test_state();
        let (code, host, question) = on_question(&state, 3).await;

        let sync = state
            .toggle_video(&code, &host, true, Some(question.start_time() + 4.0))
            .await
            .unwrap();
        assert!(sync.is_playing);
        assert_eq!(sync.current_time, question.start_time() + 4.0);

        let err = state
            .toggle_video(&code, "bot-2", false, None)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "NOT_YOUR_TURN");
    }

    #[tokio::test]
    async fn test_toggle_video_needs_video_question() {
        let state = test_state();
        let (code, host, _) = on_question(&state, 2).await;

        let err = state.toggle_video(&code, &host, true, None).await.unwrap_err();
        assert_eq!(err.code(), "NOT_A_VIDEO_QUESTION");
    }
}
