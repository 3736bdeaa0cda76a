//! WebSocket upgrade handler, first-frame dispatch, and the per-role
//! connection loops.

use std::net::SocketAddr;

use axum::extract::ws::{CloseFrame, Message, WebSocket};
use axum::extract::{ConnectInfo, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::time;

use streamhub_common::id::{prefix, prefixed_ulid};

use crate::AppState;

use super::protocol::{parse_hello, Hello, HelloError};
use super::registry::StreamerSlot;

/// Close codes (RFC 6455 registered values).
const CLOSE_POLICY_VIOLATION: u16 = 1008;
const CLOSE_SUPERSEDED: u16 = 1012;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(ws_upgrade))
}

async fn ws_upgrade(
    ws: WebSocketUpgrade,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_connection(socket, addr, state))
}

/// Read the hello, classify it, and run the role loop.
///
/// Every exit path either never registered the connection or goes through
/// that role's own teardown, so no partial registration survives.
async fn handle_connection(socket: WebSocket, addr: SocketAddr, state: AppState) {
    let conn_id = prefixed_ulid(prefix::CONNECTION);
    tracing::debug!(%addr, %conn_id, "new connection");

    let (mut ws_tx, mut ws_rx) = socket.split();

    // Step 1: wait for the hello frame within the timeout.
    let hello = time::timeout(state.config.hello_timeout, async {
        while let Some(msg) = ws_rx.next().await {
            let msg = match msg {
                Ok(m) => m,
                Err(e) => {
                    tracing::debug!(?e, %addr, "read error before hello");
                    return None;
                }
            };

            match msg {
                Message::Text(text) => return Some(parse_hello(&text)),
                // The original protocol is text-based, but an over-eager
                // client sending its hello as a binary frame still gets a
                // precise rejection if the bytes aren't JSON.
                Message::Binary(bytes) => {
                    return Some(match std::str::from_utf8(&bytes) {
                        Ok(text) => parse_hello(text),
                        Err(_) => Err(HelloError::InvalidJson),
                    });
                }
                Message::Close(_) => return None,
                // Control frames before the hello are not classified.
                Message::Ping(_) | Message::Pong(_) => continue,
            }
        }
        None
    })
    .await;

    let hello = match hello {
        Ok(Some(h)) => h,
        Ok(None) => {
            // Closed before registering — nothing to clean up.
            tracing::debug!(%addr, "connection closed before hello");
            return;
        }
        Err(_elapsed) => {
            tracing::debug!(%addr, "hello timeout");
            let _ = send_close(&mut ws_tx, CLOSE_POLICY_VIOLATION, "Hello timeout").await;
            return;
        }
    };

    match hello {
        Ok(Hello::Streamer { account_number }) => {
            run_streamer(state, account_number, conn_id, addr, ws_tx, ws_rx).await;
        }
        Ok(Hello::Viewer) => {
            run_viewer(state, conn_id, addr, ws_tx, ws_rx).await;
        }
        Err(err) => {
            tracing::warn!(%addr, reason = err.reason(), "rejected hello");
            let _ = send_close(&mut ws_tx, CLOSE_POLICY_VIOLATION, err.reason()).await;
        }
    }
}

/// Relay loop for a registered streamer.
///
/// Every inbound frame is fanned out, verbatim, to the viewers connected
/// at that moment. Exits on remote close, read error, or preemption by a
/// newer connection for the same account.
async fn run_streamer(
    state: AppState,
    account_number: i64,
    conn_id: String,
    addr: SocketAddr,
    mut ws_tx: SplitSink<WebSocket, Message>,
    mut ws_rx: SplitStream<WebSocket>,
) {
    let (slot, mut kick_rx) = StreamerSlot::new(conn_id.clone());
    if let Some(old_conn) = state.streamers.register(account_number, slot) {
        tracing::warn!(
            account = account_number,
            old_conn_id = %old_conn,
            "closing existing streamer connection for this account"
        );
    }
    tracing::info!(account = account_number, %conn_id, %addr, "streamer live");

    loop {
        tokio::select! {
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(frame @ (Message::Text(_) | Message::Binary(_)))) => {
                        let delivered = state.viewers.broadcast(&frame);
                        tracing::trace!(account = account_number, delivered, "frame relayed");
                    }
                    Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => continue,
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        tracing::debug!(?e, account = account_number, %conn_id, "streamer read error");
                        break;
                    }
                }
            }
            _ = kick_rx.recv() => {
                // A newer connection registered for this account.
                let _ = send_close(&mut ws_tx, CLOSE_SUPERSEDED, "New connection established").await;
                break;
            }
        }
    }

    // Only clear the slot if it is still ours; a preempting connection
    // may already own the key.
    state.streamers.remove_if_current(account_number, &conn_id);
    tracing::info!(account = account_number, %conn_id, "streamer disconnected");
}

/// Park loop for a viewer.
///
/// Viewers are listeners: frames queued by the fanout are forwarded to
/// the socket, and anything the viewer sends is ignored. Exits when the
/// remote closes, a read errors, or a forward fails.
async fn run_viewer(
    state: AppState,
    conn_id: String,
    addr: SocketAddr,
    mut ws_tx: SplitSink<WebSocket, Message>,
    mut ws_rx: SplitStream<WebSocket>,
) {
    let mut frames = state.viewers.add(conn_id.clone());
    tracing::info!(%conn_id, %addr, viewers = state.viewers.len(), "viewer connected");

    loop {
        tokio::select! {
            frame = frames.recv() => {
                match frame {
                    Some(frame) => {
                        if let Err(e) = ws_tx.send(frame).await {
                            tracing::debug!(?e, %conn_id, "viewer write failed");
                            break;
                        }
                    }
                    // The fanout entry outlives this loop, so the channel
                    // can only close once the hub is shutting down.
                    None => break,
                }
            }
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        tracing::debug!(?e, %conn_id, "viewer read error");
                        break;
                    }
                    Some(Ok(_)) => continue,
                }
            }
        }
    }

    // The single removal point for this connection.
    state.viewers.remove(&conn_id);
    tracing::info!(%conn_id, %addr, "viewer disconnected");
}

/// Send a WebSocket close frame with a code and reason.
async fn send_close(
    ws_tx: &mut SplitSink<WebSocket, Message>,
    code: u16,
    reason: &str,
) -> Result<(), axum::Error> {
    let close_msg = Message::Close(Some(CloseFrame {
        code,
        reason: reason.to_string().into(),
    }));
    ws_tx.send(close_msg).await
}
