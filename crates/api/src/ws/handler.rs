use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use huddle_core::types::DbId;
use huddle_db::repositories::RetroRepo;
use serde::Deserialize;
use serde_json::json;

use crate::error::AppResult;
use crate::handlers::resolve_retro;
use crate::middleware::auth::{claims_from_raw, retro_access_allowed};
use crate::state::AppState;
use crate::ws::manager::WsManager;

/// Query parameters of `GET /api/ws`.
///
/// The browser WebSocket API cannot set headers, so the retro token rides
/// in the query string instead of `Authorization`.
#[derive(Debug, Deserialize)]
pub struct WsParams {
    /// Retro slug or numeric id.
    pub retro_id: String,
    pub api_token: Option<String>,
}

/// HTTP handler that authorizes and upgrades the connection to WebSocket.
///
/// Authorization is identical to `GET /retros/{id}`: a private or
/// password-protected retro requires a valid retro token. After the
/// upgrade the connection is registered with `WsManager`, receives the
/// current full retro as its first message, and from then on gets every
/// `retro.updated` payload the broadcaster fans out.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<WsParams>,
    State(state): State<AppState>,
) -> AppResult<Response> {
    let retro = resolve_retro(&state, &params.retro_id).await?;

    let claims = claims_from_raw(params.api_token.as_deref(), &state.config.jwt);
    if !retro_access_allowed(&retro, claims.as_ref()) {
        return Err(huddle_core::CoreError::Forbidden("Retro login required".into()).into());
    }

    let retro_id = retro.id;
    let full = RetroRepo::load_full(&state.pool, retro).await?;
    let initial = json!({ "retro": full }).to_string();

    Ok(ws.on_upgrade(move |socket| {
        handle_socket(socket, state.ws_manager, retro_id, initial)
    }))
}

/// Manage a single WebSocket connection after upgrade.
///
/// Splits the socket into a sink (outbound) and stream (inbound), then:
///   1. Registers the connection with `WsManager` under its retro.
///   2. Pushes the current retro state as the first frame.
///   3. Spawns a sender task that forwards messages from the manager channel.
///   4. Processes inbound messages on the current task.
///   5. Cleans up on disconnect.
async fn handle_socket(
    socket: WebSocket,
    ws_manager: Arc<WsManager>,
    retro_id: DbId,
    initial: String,
) {
    let conn_id = uuid::Uuid::new_v4().to_string();
    tracing::info!(conn_id = %conn_id, retro_id, "WebSocket connected");

    // Register and get the receiver for outbound messages.
    let mut rx = ws_manager.add(conn_id.clone(), retro_id).await;

    let (mut sink, mut stream) = socket.split();

    // Initial state push so the client renders without a separate fetch.
    if sink.send(Message::Text(initial.into())).await.is_err() {
        ws_manager.remove(&conn_id).await;
        return;
    }

    // Sender task: forward channel messages to the WebSocket sink.
    let sender_conn_id = conn_id.clone();
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sink.send(msg).await.is_err() {
                tracing::debug!(conn_id = %sender_conn_id, "WebSocket sink closed");
                break;
            }
        }
    });

    // Receiver loop: clients only ever send control frames.
    while let Some(result) = stream.next().await {
        match result {
            Ok(Message::Close(_)) => break,
            Ok(Message::Pong(_)) => {
                tracing::trace!(conn_id = %conn_id, "Pong received");
            }
            Ok(_msg) => {
                // Inbound data frames are ignored; mutations go over REST.
            }
            Err(e) => {
                tracing::debug!(conn_id = %conn_id, error = %e, "WebSocket receive error");
                break;
            }
        }
    }

    // Clean up: remove connection and abort sender task.
    ws_manager.remove(&conn_id).await;
    send_task.abort();
    tracing::info!(conn_id = %conn_id, "WebSocket disconnected");
}
