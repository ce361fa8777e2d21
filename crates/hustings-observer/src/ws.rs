//! `WebSocket` handler for real-time tick summary streaming.
//!
//! Clients connect to `GET /ws/ticks` and receive a JSON-encoded
//! [`TickBroadcast`] message each time a tick completes, whether it was
//! driven by the engine loop or a manual control endpoint. Every client
//! subscribes to the same [`broadcast`] channel; a client that falls
//! behind skips the lagged messages and resumes from the most recent
//! tick. The stream is one-way: inbound frames are ignored apart from
//! pings and close.
//!
//! [`TickBroadcast`]: crate::state::TickBroadcast
//! [`broadcast`]: tokio::sync::broadcast

use std::ops::ControlFlow;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use crate::state::{AppState, TickBroadcast};

/// Upgrade an HTTP request to a `WebSocket` connection and begin
/// streaming tick summaries.
///
/// # Route
///
/// `GET /ws/ticks`
pub async fn ws_ticks(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_ws(socket, state))
}

/// Drive one client session until either side hangs up.
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
    debug!("tick stream client connected");
    let mut rx = state.subscribe();

    loop {
        let flow = tokio::select! {
            tick = rx.recv() => match tick {
                Ok(broadcast) => send_tick(&mut socket, &broadcast).await,
                Err(RecvError::Lagged(skipped)) => {
                    debug!(skipped, "slow tick stream client, resuming from latest");
                    ControlFlow::Continue(())
                }
                Err(RecvError::Closed) => ControlFlow::Break(()),
            },
            inbound = socket.recv() => handle_client_frame(&mut socket, inbound).await,
        };
        if flow.is_break() {
            debug!("tick stream client disconnected");
            return;
        }
    }
}

/// Serialize and forward one tick summary; a failed send ends the
/// session, a summary that will not encode is dropped.
async fn send_tick(socket: &mut WebSocket, tick: &TickBroadcast) -> ControlFlow<()> {
    let frame = match serde_json::to_string(tick) {
        Ok(json) => Message::Text(json.into()),
        Err(error) => {
            warn!(%error, "tick summary failed to serialize");
            return ControlFlow::Continue(());
        }
    };
    match socket.send(frame).await {
        Ok(()) => ControlFlow::Continue(()),
        Err(_) => ControlFlow::Break(()),
    }
}

/// Answer pings and notice disconnects. Text and binary frames from the
/// client carry no meaning here and are dropped.
async fn handle_client_frame(
    socket: &mut WebSocket,
    inbound: Option<Result<Message, axum::Error>>,
) -> ControlFlow<()> {
    match inbound {
        Some(Ok(Message::Ping(data))) => match socket.send(Message::Pong(data)).await {
            Ok(()) => ControlFlow::Continue(()),
            Err(_) => ControlFlow::Break(()),
        },
        Some(Ok(Message::Close(_))) | Some(Err(_)) | None => ControlFlow::Break(()),
        Some(Ok(_)) => ControlFlow::Continue(()),
    }
}
