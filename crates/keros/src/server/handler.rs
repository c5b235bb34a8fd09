//! WebSocket Connection Handler
//!
//! Handles individual WebSocket connections and message processing.

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::facility::FacilityError;

use super::protocol::{ClientMessage, ErrorCode, ServerMessage};
use super::state::{AppState, FACILITY_PATH};

/// Handle a WebSocket connection
pub async fn handle_websocket(socket: WebSocket, state: AppState) {
    let (mut ws_sender, mut ws_receiver) = socket.split();

    // Everything for this client, replies and pushes alike, goes through one channel
    let (tx, mut rx) = mpsc::channel::<ServerMessage>(64);
    let session_id = state.register_client(tx);

    let connected_msg = ServerMessage::connected(session_id.to_string());
    if let Ok(json) = serde_json::to_string(&connected_msg) {
        let _ = ws_sender.send(Message::Text(json)).await;
    }

    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if let Ok(json) = serde_json::to_string(&msg) {
                if ws_sender.send(Message::Text(json)).await.is_err() {
                    break;
                }
            }
        }
    });

    let state_clone = state.clone();
    let recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = ws_receiver.next().await {
            match msg {
                Message::Text(text) => {
                    handle_client_message(&state_clone, session_id, &text);
                }
                Message::Close(_) => break,
                Message::Ping(_) => {
                    // axum answers pings itself
                    tracing::trace!("Received ping from {}", session_id);
                }
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = send_task => {},
        _ = recv_task => {},
    }

    state.remove_client(session_id);
}

/// Handle a client message
pub(crate) fn handle_client_message(state: &AppState, session_id: Uuid, text: &str) {
    let msg: ClientMessage = match serde_json::from_str(text) {
        Ok(m) => m,
        Err(e) => {
            tracing::warn!("Failed to parse client message: {}", e);
            state.send_to_client(
                session_id,
                ServerMessage::error(None, ErrorCode::InvalidRequest, "Invalid JSON"),
            );
            return;
        }
    };

    let reply = match msg {
        ClientMessage::Subscribe { id, paths } => handle_subscribe(state, session_id, id, paths),
        ClientMessage::Unsubscribe { id, paths } => {
            state.unsubscribe(session_id, &paths);
            ServerMessage::ok(id, serde_json::json!({ "unsubscribed": paths }))
        }
        ClientMessage::Get { id, path } => match state.resolve(&path) {
            Some(data) => ServerMessage::ok(id, data),
            None => ServerMessage::refused(id, format!("Nothing at path: {path}")),
        },
        ClientMessage::Lockdown { id, sector } => handle_lockdown(state, id, sector),
        ClientMessage::Ping { id } => ServerMessage::pong(id),
    };

    state.send_to_client(session_id, reply);
}

/// Subscribe and answer with the current value of every readable path
fn handle_subscribe(
    state: &AppState,
    session_id: Uuid,
    id: String,
    paths: Vec<String>,
) -> ServerMessage {
    state.subscribe(session_id, &paths);

    let mut initial_data = serde_json::Map::new();
    for path in &paths {
        if path == "/facility/*" || path == "/facility/**" {
            if let Some(value) = state.resolve(FACILITY_PATH) {
                initial_data.insert(FACILITY_PATH.to_string(), value);
            }
        } else if let Some(value) = state.resolve(path) {
            initial_data.insert(path.clone(), value);
        }
    }

    ServerMessage::ok(
        id,
        serde_json::json!({
            "subscribed": paths,
            "data": initial_data,
        }),
    )
}

fn handle_lockdown(state: &AppState, id: String, sector: String) -> ServerMessage {
    match state.request_lockdown(&sector) {
        Ok(()) => ServerMessage::ok(id, serde_json::json!({ "sector": sector, "status": "pending" })),
        Err(e @ FacilityError::UnknownSector(_)) => {
            ServerMessage::error(Some(id), ErrorCode::NotFound, e.to_string())
        }
        Err(e) => ServerMessage::error(Some(id), ErrorCode::Conflict, e.to_string()),
    }
}
