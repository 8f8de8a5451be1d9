//! WebSocket upgrade handler and per-connection event loop.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{CloseFrame, Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, Stream, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time;

use crate::auth::jwt::{self, AuthError, Claims};
use crate::AppState;

use super::events::OutboundMessage;
use super::handler::handle_client_message;
use super::registry::{ConnectionRegistry, CLOSE_GOING_AWAY};
use super::session::ConnectionHandle;

/// Close code for a missing or invalid credential ("policy violation").
pub const CLOSE_POLICY_VIOLATION: u16 = 1008;

/// How long teardown waits for the writer to flush a pending close frame.
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// How long a server-initiated close waits for the peer's close reply.
const CLOSE_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// Why a session's read loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionEnd {
    /// The client closed, or the transport failed.
    Peer,
    /// The server queued a close frame (idle timeout or sweeper eviction).
    Server,
}

#[derive(Debug, Deserialize)]
pub struct ConnectParams {
    #[serde(default)]
    pub token: Option<String>,
}

pub fn router(ws_path: &str) -> Router<AppState> {
    Router::new().route(ws_path, get(ws_upgrade))
}

async fn ws_upgrade(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(params): Query<ConnectParams>,
    headers: HeaderMap,
) -> impl IntoResponse {
    // Verify before upgrading; the outcome is reported over the socket.
    let auth = jwt::connection_token(params.token.as_deref(), &headers)
        .ok_or(AuthError::Missing)
        .and_then(|token| jwt::verify_token(token, &state.config.jwt_secret));

    ws.on_upgrade(move |socket| async move {
        match auth {
            Ok(claims) => handle_connection(socket, state, claims).await,
            Err(err) => reject(socket, err).await,
        }
    })
}

/// Close an unauthenticated socket with 1008. It is never registered.
async fn reject(mut socket: WebSocket, err: AuthError) {
    tracing::info!(reason = %err, "rejecting unauthenticated socket");
    if socket
        .send(close_message(CLOSE_POLICY_VIOLATION, &err.to_string()))
        .await
        .is_ok()
    {
        await_peer_close(&mut socket).await;
    }
}

async fn handle_connection(socket: WebSocket, state: AppState, claims: Claims) {
    let (ws_tx, mut ws_rx) = socket.split();

    let (conn, outbound_rx) = ConnectionHandle::new(claims.id, claims.role, claims.username.clone());
    let conn = Arc::new(conn);

    // Queue the confirmation before registering so it is always the first
    // frame, and register before the writer starts so a client that has seen
    // it is already reachable.
    conn.send(&OutboundMessage::connection_established(&claims));
    state.connections.register(conn.clone());

    let mut writer = tokio::spawn(write_loop(ws_tx, outbound_rx));

    tracing::info!(
        connection_id = %conn.id,
        user_id = conn.user_id,
        username = %conn.username,
        role = %conn.role,
        "realtime connection established"
    );

    let end = run_session(
        &conn,
        &mut ws_rx,
        state.config.heartbeat_interval,
        state.config.idle_timeout,
    )
    .await;

    // Teardown: drop the registry entry unless a newer connection owns it.
    state.connections.unregister(&conn.key(), &conn.id);
    conn.mark_closed();

    tracing::info!(
        connection_id = %conn.id,
        user_id = conn.user_id,
        role = %conn.role,
        ?end,
        connected_secs = conn.connected_for().as_secs(),
        "realtime connection closed"
    );

    drop(conn);
    if time::timeout(WRITER_DRAIN_TIMEOUT, &mut writer).await.is_err() {
        writer.abort();
    }

    // The read half stays alive until the client answers our close frame, so
    // its pending pong replies do not hit a reset socket.
    if end == SessionEnd::Server {
        await_peer_close(&mut ws_rx).await;
    }
}

/// Read and discard frames until the peer's close frame or end of stream.
async fn await_peer_close<S>(ws_rx: &mut S)
where
    S: Stream<Item = Result<Message, axum::Error>> + Unpin,
{
    let handshake = async {
        while let Some(Ok(msg)) = ws_rx.next().await {
            if matches!(msg, Message::Close(_)) {
                break;
            }
        }
    };
    if time::timeout(CLOSE_HANDSHAKE_TIMEOUT, handshake).await.is_err() {
        tracing::debug!("peer did not answer close frame in time");
    }
}

/// Drain the connection's queue into the socket until it closes.
async fn write_loop(
    mut ws_tx: SplitSink<WebSocket, Message>,
    mut outbound_rx: mpsc::UnboundedReceiver<Message>,
) {
    while let Some(msg) = outbound_rx.recv().await {
        let is_close = matches!(msg, Message::Close(_));
        if let Err(e) = ws_tx.send(msg).await {
            tracing::debug!(?e, "ws write failed");
            break;
        }
        if is_close {
            break;
        }
    }
}

/// Read loop: dispatch client messages, probe liveness, enforce idle timeout.
async fn run_session(
    conn: &ConnectionHandle,
    ws_rx: &mut SplitStream<WebSocket>,
    heartbeat_interval: Duration,
    idle_timeout: Duration,
) -> SessionEnd {
    let mut heartbeat = time::interval(heartbeat_interval);
    heartbeat.tick().await; // First tick fires immediately; skip it.

    loop {
        tokio::select! {
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        conn.touch();
                        handle_client_message(conn, text.as_str());
                    }
                    Some(Ok(Message::Binary(_))) => {
                        conn.touch();
                        tracing::debug!(connection_id = %conn.id, "ignoring binary frame");
                    }
                    Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => conn.touch(),
                    Some(Ok(Message::Close(_))) | None => return SessionEnd::Peer,
                    Some(Err(e)) => {
                        tracing::debug!(?e, connection_id = %conn.id, "ws read error");
                        return SessionEnd::Peer;
                    }
                }
            }

            _ = heartbeat.tick() => {
                if !conn.is_open() {
                    // Evicted by the sweeper or the writer died.
                    return SessionEnd::Server;
                }
                if conn.idle_for() > idle_timeout {
                    tracing::debug!(connection_id = %conn.id, "idle timeout, closing connection");
                    conn.close(CLOSE_GOING_AWAY, "Idle timeout");
                    return SessionEnd::Server;
                }
                conn.ping();
            }
        }
    }
}

/// Periodically evict registry entries whose clients went silent.
///
/// Backstop for sockets whose own loop never observes the failure.
pub fn spawn_idle_sweeper(
    registry: Arc<ConnectionRegistry>,
    every: Duration,
    max_idle: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = time::interval(every);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let evicted = registry.evict_idle(max_idle);
            if evicted > 0 {
                tracing::info!(evicted, remaining = registry.connected_count(), "idle sweep");
            }
        }
    })
}

fn close_message(code: u16, reason: &str) -> Message {
    Message::Close(Some(CloseFrame {
        code,
        reason: reason.to_string().into(),
    }))
}
