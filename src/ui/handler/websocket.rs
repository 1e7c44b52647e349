//! WebSocket connection handlers.

use std::sync::Arc;

use axum::{
    extract::{
        Path, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::IntoResponse,
};
use futures_util::{
    sink::SinkExt,
    stream::{SplitSink, StreamExt},
};
use tokio::sync::mpsc;

use crate::{
    domain::{OUTBOUND_QUEUE_CAPACITY, RoomId},
    ui::state::AppState,
};

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
) -> Result<impl IntoResponse, StatusCode> {
    // Convert String -> RoomId (Domain Model)
    let room_id = match RoomId::try_from(room_id) {
        Ok(id) => id,
        Err(e) => {
            tracing::warn!("Rejected WebSocket upgrade: {}", e);
            return Err(StatusCode::BAD_REQUEST);
        }
    };

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, room_id)))
}

/// Forward queued outbound frames to the socket until the queue closes or
/// the socket errors, then close the socket.
fn pusher_loop(
    mut rx: mpsc::Receiver<String>,
    mut sender: SplitSink<WebSocket, Message>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(Message::Text(msg.into())).await.is_err() {
                break;
            }
        }
        let _ = sender.close().await;
    })
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, room_id: RoomId) {
    let (sender, mut receiver) = socket.split();

    // Outbound frames for this connection are queued here by the coordinator
    let (tx, rx) = mpsc::channel(OUTBOUND_QUEUE_CAPACITY);
    let mut send_task = pusher_loop(rx, sender);

    let (handle, session_id) = match state.registry.attach(&room_id, tx).await {
        Ok(attached) => attached,
        Err(e) => {
            tracing::error!("Failed to attach to room '{}': {}", room_id, e);
            send_task.abort();
            return;
        }
    };
    tracing::info!("Session '{}' connected to room '{}'", session_id, room_id);

    let inbound_handle = handle.clone();
    let inbound_session = session_id.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(frame) = receiver.next().await {
            let msg = match frame {
                Ok(msg) => msg,
                Err(e) => {
                    tracing::debug!("WebSocket error from '{}': {}", inbound_session, e);
                    break;
                }
            };
            match msg {
                Message::Text(text) => {
                    if inbound_handle
                        .handle_inbound(&inbound_session, text.to_string())
                        .is_err()
                    {
                        break;
                    }
                }
                Message::Close(_) => {
                    tracing::debug!("Session '{}' requested close", inbound_session);
                    break;
                }
                // Ping/pong is handled by the WebSocket protocol; binary frames are ignored
                _ => {}
            }
        }
    });

    // If any one of the tasks completes, abort the other
    tokio::select! {
        _ = &mut recv_task => send_task.abort(),
        _ = &mut send_task => recv_task.abort(),
    };

    if let Err(e) = handle.detach(&session_id) {
        tracing::debug!("Detach after room shutdown: {}", e);
    }
    tracing::info!("Session '{}' disconnected from room '{}'", session_id, room_id);
}
