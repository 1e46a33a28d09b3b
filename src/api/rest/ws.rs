use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use futures::SinkExt;
use futures::StreamExt;
use tracing::{info, warn};
use uuid::Uuid;

use crate::state::AppState;

/// Push channel for one subscriber (captain, customer or store). Events
/// targeted at or broadcast to this id stream out as JSON. The socket is
/// best-effort; clients reconcile through the pending-ride endpoints when
/// they reconnect.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(subscriber_id): Path<Uuid>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, subscriber_id))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, subscriber_id: Uuid) {
    let (mut sender, mut receiver) = socket.split();
    let mut rx = state.dispatcher.register(subscriber_id);

    info!(subscriber = %subscriber_id, "websocket subscriber connected");

    let send_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let json = match serde_json::to_string(&event) {
                Ok(json) => json,
                Err(err) => {
                    warn!(error = %err, "failed to serialize ride event for ws");
                    continue;
                }
            };

            if sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    let recv_task = tokio::spawn(async move {
        while let Some(Ok(_msg)) = receiver.next().await {}
    });

    tokio::select! {
        _ = send_task => {},
        _ = recv_task => {},
    }

    state.dispatcher.unregister(&subscriber_id);
    info!(subscriber = %subscriber_id, "websocket subscriber disconnected");
}
