//! WebSocket upgrade handler.

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::http::HeaderMap;
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use tracing::{error, info, warn};

use parley_realtime::SessionContext;
use parley_realtime::connection::heartbeat::run_heartbeat;

use crate::error::ApiError;
use crate::state::AppState;

/// GET /ws
///
/// WebSocket upgrade, authenticated by the identity cookie.
pub async fn ws_upgrade(
    State(state): State<AppState>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Result<Response, ApiError> {
    // Authenticate before upgrade
    let session = state
        .realtime
        .authenticator
        .authenticate(&headers)
        .inspect_err(|rejection| warn!(reason = %rejection, "WebSocket handshake rejected"))?;

    let max_frame = state.realtime.config().max_frame_bytes;
    Ok(ws
        .max_message_size(max_frame)
        .on_upgrade(move |socket| handle_ws_connection(state, session, socket)))
}

/// Handles an established WebSocket connection.
async fn handle_ws_connection(state: AppState, session: SessionContext, socket: WebSocket) {
    let engine = state.realtime;
    let (handle, mut outbound_rx) = engine.relay.admit(session).await;
    let conn_id = handle.id;
    let cancel = handle.cancellation();
    let (mut ws_tx, mut ws_rx) = socket.split();

    let watchdog = tokio::spawn(run_heartbeat(handle.clone(), engine.heartbeat_config()));

    // Spawn outbound event forwarder
    let outbound_cancel = cancel.clone();
    let outbound_task = tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = outbound_cancel.cancelled() => break,
                next = outbound_rx.recv() => {
                    let Some(event) = next else { break };
                    let text = match serde_json::to_string(&event) {
                        Ok(text) => text,
                        Err(e) => {
                            error!(conn_id = %conn_id, error = %e, "Failed to serialize outbound event");
                            continue;
                        }
                    };
                    if ws_tx.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
            }
        }
        let _ = ws_tx.send(Message::Close(None)).await;
    });

    // Process inbound frames in order
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            next = ws_rx.next() => match next {
                Some(Ok(Message::Text(text))) => {
                    engine.relay.handle_frame(&handle, text.as_str()).await;
                }
                Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => {
                    handle.touch().await;
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(Message::Binary(_))) => {
                    warn!(conn_id = %conn_id, "Ignoring binary frame");
                }
                Some(Err(e)) => {
                    warn!(conn_id = %conn_id, error = %e, "WebSocket error");
                    break;
                }
            }
        }
    }

    // Cleanup
    handle.close();
    let teardown = engine.relay.spawn_disconnect(handle);
    let _ = outbound_task.await;
    watchdog.abort();
    if let Err(e) = teardown.await {
        error!(conn_id = %conn_id, error = %e, "Disconnect task failed");
    }

    info!(conn_id = %conn_id, "WebSocket connection closed");
}
