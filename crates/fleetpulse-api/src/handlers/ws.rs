//! WebSocket upgrade handler.

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use tracing::{info, warn};

use crate::state::AppState;

/// GET /ws — WebSocket upgrade into the real-time engine.
pub async fn ws_upgrade(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| handle_socket(state, socket))
}

/// Pumps one established WebSocket connection through the engine.
async fn handle_socket(state: AppState, socket: WebSocket) {
    let (mut ws_tx, mut ws_rx) = socket.split();

    let (handle, mut outbound_rx) = state.realtime.lifecycle.on_connect().await;
    let conn_id = handle.id;

    info!(client_id = %conn_id, "WebSocket connection established");

    // outbound pump: engine frames → socket, until the engine closes us
    let writer_handle = handle.clone();
    let outbound_task = tokio::spawn(async move {
        loop {
            tokio::select! {
                frame = outbound_rx.recv() => match frame {
                    Some(text) => {
                        if ws_tx.send(Message::Text(text.into())).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                },
                _ = writer_handle.closed() => {
                    let _ = ws_tx.send(Message::Close(None)).await;
                    break;
                }
            }
        }
    });

    // inbound pump: socket frames → engine
    loop {
        tokio::select! {
            result = ws_rx.next() => match result {
                Some(Ok(Message::Text(text))) => {
                    state.realtime.lifecycle.handle_message(&handle, &text).await;
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(client_id = %conn_id, error = %e, "WebSocket error");
                    break;
                }
            },
            _ = handle.closed() => break,
        }
    }

    outbound_task.abort();
    state.realtime.lifecycle.on_disconnect(conn_id).await;

    info!(client_id = %conn_id, "WebSocket connection closed");
}
