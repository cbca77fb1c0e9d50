//! WebSocket upgrade handler.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::response::Response;
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tracing::{debug, info, warn};

use stealth_core::types::UserId;
use stealth_realtime::RealtimeEngine;

use crate::error::ApiError;
use crate::state::AppState;

/// Query parameter for WebSocket authentication.
#[derive(Debug, Default, Deserialize)]
pub struct WsQuery {
    /// JWT access token. Optional unless `auth.require_auth` is set.
    pub token: Option<String>,
}

/// GET /ws?token={jwt}: WebSocket upgrade
pub async fn ws_upgrade(
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
) -> Result<Response, ApiError> {
    // Authenticate before upgrade
    let authenticated_as = state
        .realtime
        .authenticator
        .authenticate(query.token.as_deref())
        .await?;

    let engine = state.realtime.clone();
    Ok(ws.on_upgrade(move |socket| handle_socket(engine, authenticated_as, socket)))
}

/// Drives one established connection until it closes, stops answering
/// pings, or the server shuts down.
async fn handle_socket(
    engine: Arc<RealtimeEngine>,
    authenticated_as: Option<UserId>,
    socket: WebSocket,
) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let connections = engine.connections.clone();

    let (handle, mut outbound_rx) = connections.register(authenticated_as);
    let conn_id = handle.id;

    let heartbeat = connections.heartbeat();
    let mut ping = tokio::time::interval(heartbeat.ping_interval);
    ping.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    ping.tick().await;
    let mut shutdown = engine.shutdown_receiver();

    loop {
        tokio::select! {
            inbound = ws_rx.next() => match inbound {
                Some(Ok(Message::Text(text))) => {
                    connections.handle_inbound(conn_id, text.as_str()).await;
                }
                Some(Ok(Message::Pong(_))) => handle.record_pong().await,
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(conn_id = %conn_id, error = %e, "WebSocket error");
                    break;
                }
            },
            outbound = outbound_rx.recv() => match outbound {
                Some(frame) => {
                    if ws_tx.send(Message::Text(frame.into())).await.is_err() {
                        break;
                    }
                }
                None => break,
            },
            _ = ping.tick() => {
                if !heartbeat.check(&handle).await {
                    debug!(conn_id = %conn_id, "Closing unresponsive connection");
                    break;
                }
                if ws_tx.send(Message::Ping(Bytes::new())).await.is_err() {
                    break;
                }
            },
            _ = shutdown.recv() => {
                let _ = ws_tx.send(Message::Close(None)).await;
                break;
            }
        }
    }

    connections.unregister(conn_id).await;

    info!(conn_id = %conn_id, "WebSocket connection closed");
}
