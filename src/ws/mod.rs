pub mod handlers;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::IntoResponse,
};
use futures::{
    sink::SinkExt,
    stream::{SplitSink, StreamExt},
};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};

use crate::protocol::{ClientMessage, RoomView, ServerMessage, PROTOCOL_VERSION};
use crate::state::AppState;
use crate::store::DocumentStore;
use crate::types::{RoomCode, RoomDocument, BOARD_TILES};
use handlers::Session;

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub room: Option<String>,
    pub player: Option<String>,
}

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<WsQuery>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    tracing::info!(
        "WebSocket connection request: room={:?}, player={:?}",
        params.room,
        params.player
    );

    ws.on_upgrade(move |socket| handle_socket(socket, params, state))
}

type Sender = SplitSink<WebSocket, Message>;

async fn send(sender: &mut Sender, msg: &ServerMessage) -> bool {
    match serde_json::to_string(msg) {
        Ok(json) => sender.send(Message::Text(json.into())).await.is_ok(),
        Err(e) => {
            tracing::error!("Failed to serialize message: {}", e);
            true
        }
    }
}

async fn recv_document(
    rx: &mut Option<broadcast::Receiver<RoomDocument>>,
) -> Result<RoomDocument, RecvError> {
    match rx {
        Some(rx) => rx.recv().await,
        // Not in a room: wait forever
        None => std::future::pending().await,
    }
}

/// Resume a seat from the query string, or watch the room as a spectator
async fn resume_session(params: &WsQuery, state: &AppState) -> Session {
    let mut session = Session::default();
    let Some(room) = params.room.as_deref().map(|r| r.trim().to_uppercase()) else {
        return session;
    };

    match state.get_room(&room).await {
        Ok(doc) => {
            session.room_code = Some(room);
            session.player_id = params
                .player
                .as_deref()
                .filter(|id| doc.player(id).is_some())
                .map(str::to_string);
        }
        Err(e) => tracing::debug!("Cannot resume room {}: {}", room, e),
    }
    session
}

/// Handle individual WebSocket connection
async fn handle_socket(socket: WebSocket, params: WsQuery, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    let welcome = ServerMessage::Welcome {
        protocol: PROTOCOL_VERSION.to_string(),
        mode: state.store.mode(),
        board_tiles: BOARD_TILES,
        server_now: chrono::Utc::now().to_rfc3339(),
    };
    if !send(&mut sender, &welcome).await {
        tracing::error!("Failed to send welcome message");
        return;
    }

    let mut session = resume_session(&params, &state).await;
    let mut bound_room: Option<RoomCode> = None;
    let mut doc_rx: Option<broadcast::Receiver<RoomDocument>> = None;
    let mut room_rx = state.broadcast.subscribe();

    loop {
        // Follow the session into whichever room it now sits in
        if session.room_code != bound_room {
            doc_rx = None;
            bound_room = session.room_code.clone();

            if let Some(room) = &bound_room {
                match state.store.subscribe(room).await {
                    Ok(rx) => doc_rx = Some(rx),
                    Err(e) => tracing::error!("Failed to subscribe to room {}: {}", room, e),
                }
                if let Ok(doc) = state.get_room(room).await {
                    let snapshot = ServerMessage::Snapshot {
                        room: RoomView::for_viewer(&doc, session.player_id.as_deref()),
                    };
                    if !send(&mut sender, &snapshot).await {
                        break;
                    }
                }
            }
        }

        tokio::select! {
            // Document changes for the bound room
            doc = recv_document(&mut doc_rx) => {
                match doc {
                    Ok(doc) => {
                        let snapshot = ServerMessage::Snapshot {
                            room: RoomView::for_viewer(&doc, session.player_id.as_deref()),
                        };
                        if !send(&mut sender, &snapshot).await {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::debug!("Snapshot stream lagged by {}", skipped);
                    }
                    Err(RecvError::Closed) => doc_rx = None,
                }
            }

            // Dice, answers, sabotage and commentary for the bound room
            room_msg = room_rx.recv() => {
                if let Ok(room_msg) = room_msg {
                    if bound_room.as_deref() == Some(room_msg.room_code.as_str())
                        && !send(&mut sender, &room_msg.message).await
                    {
                        break;
                    }
                }
            }

            // Handle client messages
            ws_msg = receiver.next() => {
                match ws_msg {
                    Some(Ok(Message::Text(text))) => {
                        tracing::debug!("Received message: {}", text);

                        match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(client_msg) => {
                                if let Some(response) =
                                    handlers::handle_message(client_msg, &mut session, &state).await
                                {
                                    if !send(&mut sender, &response).await {
                                        tracing::error!("Failed to send response");
                                        break;
                                    }
                                }
                            }
                            Err(e) => {
                                tracing::error!("Failed to parse client message: {}", e);
                                let error = ServerMessage::Error {
                                    code: "PARSE_ERROR".to_string(),
                                    msg: format!("Invalid message format: {}", e),
                                };
                                let _ = send(&mut sender, &error).await;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        tracing::info!("WebSocket closed");
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::error!("WebSocket error: {}", e);
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    tracing::info!(
        "WebSocket connection closed (room={:?}, player={:?})",
        session.room_code,
        session.player_id
    );
}
