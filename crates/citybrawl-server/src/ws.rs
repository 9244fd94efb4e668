use std::sync::Arc;

use axum::extract::ws::{Message, Utf8Bytes, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use crate::dispatch::{on_close, on_message};
use crate::rate_limit::RateLimiter;
use crate::registry::ConnectionId;
use crate::state::{AppState, ConnectionGuard};

pub async fn ws_handler(
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
) -> Result<Response, StatusCode> {
    let max_ws = state.config.limits.max_ws_connections;
    let Some(guard) = ConnectionGuard::try_acquire(Arc::clone(&state.ws_connection_count), max_ws)
    else {
        tracing::warn!(max = max_ws, "WS connection limit reached");
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    };

    Ok(ws
        .on_upgrade(move |socket| handle_socket(socket, state, guard))
        .into_response())
}

async fn handle_socket(socket: WebSocket, state: AppState, _guard: ConnectionGuard) {
    let (ws_sender, mut ws_receiver) = socket.split();

    // Register before reading anything so the first frame already has a player.
    let (tx, rx) = mpsc::channel::<Utf8Bytes>(state.config.limits.player_message_buffer);
    let (conn, player) = state.registry.write().await.register(tx);
    tracing::info!(connection = %conn, player_id = player.id, "New connection");

    spawn_writer(ws_sender, rx);

    read_loop(&mut ws_receiver, &state, conn).await;

    // Runs whether the client closed cleanly or the transport failed. Dropping
    // the registry entry also drops the sender, which ends the writer task.
    on_close(&state.registry, conn).await;
}

fn spawn_writer(
    mut ws_sender: SplitSink<WebSocket, Message>,
    mut rx: mpsc::Receiver<Utf8Bytes>,
) {
    tokio::spawn(async move {
        while let Some(text) = rx.recv().await {
            if ws_sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });
}

async fn read_loop(
    ws_receiver: &mut SplitStream<WebSocket>,
    state: &AppState,
    conn: ConnectionId,
) {
    let rate = state.config.limits.ws_rate_limit_per_sec;
    let max_size = state.config.limits.max_message_size;
    let mut rate_limiter = RateLimiter::new(rate, rate);

    while let Some(frame) = ws_receiver.next().await {
        let msg = match frame {
            Ok(msg) => msg,
            Err(e) => {
                tracing::debug!(connection = %conn, error = %e, "WebSocket read failed");
                break;
            },
        };

        // Browsers send text frames; binary JSON is accepted too
        let data: &[u8] = match &msg {
            Message::Text(text) => text.as_str().as_bytes(),
            Message::Binary(data) => &data[..],
            Message::Close(_) => break,
            _ => continue,
        };

        handle_frame(state, conn, data, max_size, &mut rate_limiter).await;
    }
}

async fn handle_frame(
    state: &AppState,
    conn: ConnectionId,
    data: &[u8],
    max_size: usize,
    rate_limiter: &mut RateLimiter,
) {
    if data.is_empty() {
        return;
    }

    if data.len() > max_size {
        tracing::warn!(connection = %conn, size = data.len(), "Oversized message dropped");
        return;
    }

    // Rate limit: drop frames that exceed the per-connection rate
    if !rate_limiter.allow() {
        tracing::warn!(connection = %conn, "Rate limited");
        return;
    }

    on_message(&state.registry, conn, data).await;
}
