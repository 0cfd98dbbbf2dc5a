use crate::state::AppState;
use crate::store::DocumentStore;
use crate::types::{EventKind, GameEvent, GamePhase, RoomCode};
use std::sync::Arc;
use std::time::Duration;

/// How often the shared store's health is checked
const STORE_HEALTH_INTERVAL: Duration = Duration::from_secs(5);

/// Spawn a background task that lets bots take their turns in rooms with humans
pub fn spawn_bot_driver(state: Arc<AppState>) {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(state.config.bot_turn_delay).await;

            for room_code in state.store.mirror().room_codes().await {
                if let Err(e) = state.play_bot_step(&room_code).await {
                    tracing::debug!("Bot step in room {} failed: {}", room_code, e);
                }
            }
        }
    });
}

/// Spawn a background task that has the host heckle rooms sitting on the board
pub fn spawn_idle_commentator(state: Arc<AppState>) {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(state.config.idle_interval).await;
            heckle_idle_rooms(&state).await;
        }
    });
}

/// Nudge whoever holds the turn in every room waiting on the board.
/// Returns the rooms that were considered.
pub async fn heckle_idle_rooms(state: &AppState) -> Vec<RoomCode> {
    let mut waiting = Vec::new();

    for room_code in state.store.mirror().room_codes().await {
        let doc = match state.get_room(&room_code).await {
            Ok(doc) => doc,
            Err(_) => continue,
        };

        // Lobbies, open questions and finished games are not idle
        if doc.state.phase != GamePhase::Board {
            continue;
        }

        let target = doc.state.current_player_turn.clone();
        state.announce(&room_code, vec![GameEvent::new(EventKind::Waiting, target)]);
        waiting.push(room_code);
    }

    waiting
}

/// Spawn a background task that watches the shared store and reconciles
/// once it comes back. Does nothing without a remote store.
pub fn spawn_store_supervisor(state: Arc<AppState>) {
    if !state.store.has_remote() {
        return;
    }

    tokio::spawn(async move {
        let mut was_healthy = true;

        loop {
            tokio::time::sleep(STORE_HEALTH_INTERVAL).await;

            match state.store.health_check().await {
                Ok(()) => {
                    if !was_healthy {
                        tracing::info!("Shared store reachable again");
                    }
                    was_healthy = true;
                }
                Err(e) => {
                    if was_healthy {
                        tracing::warn!("Shared store health check failed: {}", e);
                    } else {
                        tracing::debug!("Shared store still unavailable: {}", e);
                    }
                    was_healthy = false;
                }
            }
        }
    });
}
