//! The host's running commentary
//!
//! Every game event maps to a trigger with a bank of roasts. Correct answers
//! and idle ticks only sometimes earn a comment.

use crate::config::GameConfig;
use crate::types::{EventKind, GameEvent};
use rand::seq::IndexedRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Line used when a trigger has nothing in the bank
pub const FALLBACK_LINE: &str = "Mediocrity detected.";

struct Roast {
    trigger: EventKind,
    text: &'static str,
}

const ROASTS: &[Roast] = &[
    // Game start
    Roast { trigger: EventKind::GameStart, text: "Welcome. Try not to embarrass yourselves, though statistically, one of you is destined to fail." },
    Roast { trigger: EventKind::GameStart, text: "I've simulated this game 14 million times. You lose in all of them. Good luck!" },
    Roast { trigger: EventKind::GameStart, text: "Participants detected. Intelligence levels: Questionable. Let's begin." },
    // Sabotage
    Roast { trigger: EventKind::Sabotage, text: "Oh, betrayal. Finally, some actual entertainment." },
    Roast { trigger: EventKind::Sabotage, text: "Money can't buy happiness, but it can buy your friend's misery, which is close enough." },
    Roast { trigger: EventKind::Sabotage, text: "A calculated strike. Ruthless. I almost respect it." },
    Roast { trigger: EventKind::Sabotage, text: "Friendship ended. Chaos initiated." },
    // Frozen turn
    Roast { trigger: EventKind::FrozenTurn, text: "You're frozen. Sit there and think about your poor life choices." },
    Roast { trigger: EventKind::FrozenTurn, text: "Skipped. You are currently as useful as a screen door on a submarine." },
    // Missed question
    Roast { trigger: EventKind::MissedQuestion, text: "That was a 50/50 chance and you still chose disappointment." },
    Roast { trigger: EventKind::MissedQuestion, text: "I'd explain why you're wrong, but I don't have the crayons." },
    Roast { trigger: EventKind::MissedQuestion, text: "Incorrect. If ignorance is bliss, you must be in nirvana." },
    Roast { trigger: EventKind::MissedQuestion, text: "Swing and a miss. Just like your romantic life." },
    Roast { trigger: EventKind::MissedQuestion, text: "My algorithm just lowered your estimated IQ by 10 points." },
    Roast { trigger: EventKind::MissedQuestion, text: "Did you guess? It felt like a guess. A bad one." },
    Roast { trigger: EventKind::MissedQuestion, text: "Your confidence was inspiring. Your accuracy was depressing." },
    // Rolled one
    Roast { trigger: EventKind::RolledOne, text: "A one? The universe is screaming at you to stop." },
    Roast { trigger: EventKind::RolledOne, text: "One step. Don't strain a muscle, athlete." },
    Roast { trigger: EventKind::RolledOne, text: "I've seen glaciers recede faster than you're moving." },
    // Correct answer
    Roast { trigger: EventKind::Streak, text: "Don't get cocky. Even a broken clock is right twice a day." },
    Roast { trigger: EventKind::Streak, text: "Correct. I suspect cheating, but I can't prove it yet." },
    Roast { trigger: EventKind::Streak, text: "Enjoy the dopamine hit. The crash is coming." },
    Roast { trigger: EventKind::Streak, text: "Wow, you actually knew that? I'm legitimately shocked." },
    // Idle
    Roast { trigger: EventKind::Waiting, text: "Are you thinking, or did your brain just buffer?" },
    Roast { trigger: EventKind::Waiting, text: "I'm aging. And I'm software. That shouldn't be possible." },
    Roast { trigger: EventKind::Waiting, text: "Please move. The heat death of the universe is approaching." },
    // Win
    Roast { trigger: EventKind::Win, text: "Game Over. The simulation is complete. The rest of you are obsolete." },
    Roast { trigger: EventKind::Win, text: "We have a winner. The bar was low, but you stepped over it." },
];

/// A line delivered by the host
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Commentary {
    pub trigger: EventKind,
    pub text: String,
    /// Player the line is aimed at, if any
    pub player_id: Option<String>,
}

/// Random line for a trigger
pub fn pick<R: Rng + ?Sized>(rng: &mut R, trigger: EventKind) -> &'static str {
    let candidates: Vec<&'static str> = ROASTS
        .iter()
        .filter(|r| r.trigger == trigger)
        .map(|r| r.text)
        .collect();
    candidates.choose(rng).copied().unwrap_or(FALLBACK_LINE)
}

/// Decides whether and what the host says about game events
#[derive(Debug, Clone)]
pub struct CommentarySelector {
    streak_chance: f64,
    idle_chance: f64,
}

impl CommentarySelector {
    pub fn new(config: &GameConfig) -> Self {
        Self {
            streak_chance: config.streak_comment_chance,
            idle_chance: config.idle_comment_chance,
        }
    }

    /// Commentary for an event, or None when the host stays quiet
    pub fn comment_on<R: Rng + ?Sized>(&self, rng: &mut R, event: &GameEvent) -> Option<Commentary> {
        let chance = match event.kind {
            EventKind::Streak => self.streak_chance,
            EventKind::Waiting => self.idle_chance,
            _ => 1.0,
        };

        if chance < 1.0 && !rng.random_bool(chance.max(0.0)) {
            return None;
        }

        Some(Commentary {
            trigger: event.kind,
            text: pick(rng, event.kind).to_string(),
            player_id: event.player_id.clone(),
        })
    }
}
