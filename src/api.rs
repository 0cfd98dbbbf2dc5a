//! HTTP API endpoints for room inspection and state management.
//!
//! Export/import lets a host carry a room over to another server or restore
//! it after the shared store lost it.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use crate::error::GameError;
use crate::state::export::RoomSnapshot;
use crate::state::AppState;
use crate::types::{RoomDocument, SyncMode};

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    /// Mode new rooms are created in right now
    pub mode: SyncMode,
    pub rooms: usize,
}

#[derive(Debug, Clone, Serialize)]
struct ErrorBody {
    code: &'static str,
    msg: String,
}

impl IntoResponse for GameError {
    fn into_response(self) -> Response {
        let status = match &self {
            GameError::RoomNotFound(_) | GameError::PlayerNotFound(_) => StatusCode::NOT_FOUND,
            GameError::InvalidSnapshot(_) => StatusCode::BAD_REQUEST,
            GameError::NotHost(_) => StatusCode::FORBIDDEN,
            GameError::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::CONFLICT,
        };
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        }

        let body = ErrorBody {
            code: self.code(),
            msg: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

fn normalise(code: &str) -> String {
    code.trim().to_uppercase()
}

/// Liveness and current sync mode.
///
/// GET /api/health
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        mode: state.store.mode(),
        rooms: state.store.mirror().room_codes().await.len(),
    })
}

/// The raw room document.
///
/// GET /api/rooms/{code}
pub async fn get_room(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> Result<Json<RoomDocument>, GameError> {
    let doc = state.get_room(&normalise(&code)).await?;
    Ok(Json(doc))
}

/// Export a room as a snapshot.
///
/// GET /api/rooms/{code}/export
pub async fn export_room(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> Result<Json<RoomSnapshot>, GameError> {
    let snapshot = state.export_room(&normalise(&code)).await?;
    Ok(Json(snapshot))
}

/// Import a room snapshot.
///
/// POST /api/rooms/{code}/import
///
/// Replaces the room's document; connected clients get the new snapshot
/// through their subscription.
pub async fn import_room(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
    Json(snapshot): Json<RoomSnapshot>,
) -> Result<Json<RoomDocument>, GameError> {
    match state.import_room(&normalise(&code), snapshot).await {
        Ok(doc) => Ok(Json(doc)),
        Err(e) => {
            tracing::error!("Room import failed: {}", e);
            Err(e)
        }
    }
}
