//! Question bank and question resolution
//!
//! The bank is static content. Video tiles ask video questions (including the
//! audio-only "blind test" clips), every other question tile asks a text
//! question, unless chaos strikes and the category is ignored.

use crate::board::TileKind;
use crate::config::GameConfig;
use crate::types::{Question, QuestionType};
use rand::seq::IndexedRandom;
use rand::Rng;
use std::path::Path;

/// Built-in question content
const BUILTIN_QUESTIONS: &str = include_str!("../data/questions.json");

/// Errors raised while loading a question bank
#[derive(Debug, thiserror::Error)]
pub enum QuestionBankError {
    #[error("Failed to read question file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse question file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Question {id} is invalid: {reason}")]
    Invalid { id: String, reason: String },
}

#[derive(Debug, Clone)]
pub struct QuestionBank {
    questions: Vec<Question>,
}

impl QuestionBank {
    /// Create a bank from already validated questions
    pub fn new(questions: Vec<Question>) -> Self {
        Self { questions }
    }

    /// The question set shipped with the game
    pub fn builtin() -> Result<Self, QuestionBankError> {
        Self::from_json(BUILTIN_QUESTIONS)
    }

    pub fn from_json(json: &str) -> Result<Self, QuestionBankError> {
        let questions: Vec<Question> = serde_json::from_str(json)?;
        for question in &questions {
            validate(question)?;
        }
        Ok(Self { questions })
    }

    pub fn from_path(path: &Path) -> Result<Self, QuestionBankError> {
        let json = std::fs::read_to_string(path)?;
        let bank = Self::from_json(&json)?;
        tracing::info!(
            "Loaded {} questions from {}",
            bank.len(),
            path.display()
        );
        Ok(bank)
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Count of questions in a category
    pub fn count(&self, question_type: QuestionType) -> usize {
        self.questions
            .iter()
            .filter(|q| q.question_type() == question_type)
            .count()
    }

    /// Pick a random question of the given category
    pub fn pick_random_by_category<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        question_type: QuestionType,
    ) -> Option<&Question> {
        let candidates: Vec<&Question> = self
            .questions
            .iter()
            .filter(|q| q.question_type() == question_type)
            .collect();
        candidates.choose(rng).copied()
    }

    /// Pick a random question from the whole bank
    pub fn pick_any<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&Question> {
        self.questions.choose(rng)
    }

    /// Pick and issue the question for a landing tile.
    ///
    /// With probability `chaos_chance` the tile's category is ignored. Start
    /// and finish tiles never ask anything.
    pub fn question_for_tile<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        tile: TileKind,
        chaos_chance: f64,
    ) -> Option<Question> {
        let category = tile.question_type()?;

        let picked = if chaos_chance > 0.0 && rng.random_bool(chaos_chance.min(1.0)) {
            tracing::debug!("Chaos pick for {:?} tile", tile);
            self.pick_any(rng)
        } else {
            self.pick_random_by_category(rng, category)
        };

        picked.map(issue)
    }
}

/// Copy a bank question with a fresh id so each showing is distinct
pub fn issue(template: &Question) -> Question {
    Question {
        id: format!("q-{}", ulid::Ulid::new()),
        ..template.clone()
    }
}

/// Points awarded for a correct answer to `question`
pub fn points_for(question: &Question, config: &GameConfig) -> u32 {
    match question.question_type() {
        QuestionType::Text => config.text_points,
        QuestionType::Video => config.video_points,
    }
}

fn validate(question: &Question) -> Result<(), QuestionBankError> {
    let invalid = |reason: &str| QuestionBankError::Invalid {
        id: question.id.clone(),
        reason: reason.to_string(),
    };

    if question.options.len() < 2 {
        return Err(invalid("needs at least two options"));
    }
    if question.correct_answer_index >= question.options.len() {
        return Err(invalid("correct answer index out of range"));
    }
    if let crate::types::QuestionKind::Video {
        start_time,
        end_time,
        ..
    } = question.kind
    {
        if start_time < 0.0 || end_time <= start_time {
            return Err(invalid("clip must end after it starts"));
        }
    }
    Ok(())
}
