//! Clock control endpoints.
//!
//! These handlers drive the simulation clock directly: pause, resume,
//! manual ticks, fast-forward, and administrative time sets. Mutations
//! take the simulation write lock, so a manual tick and the engine's
//! own tick loop never interleave. Ticks triggered here are broadcast
//! to `WebSocket` subscribers just like loop-driven ones.

use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};

use hustings_core::engine::MAX_FAST_FORWARD_HOURS;

use crate::error::ObserverError;
use crate::state::{AppState, TickBroadcast};

/// Response body for `GET /api/clock`.
#[derive(Debug, serde::Serialize)]
pub struct ClockStatus {
    /// Current game time.
    pub game_time: DateTime<Utc>,
    /// Whether time advancement is frozen.
    pub paused: bool,
    /// Hours added per unpaused tick.
    pub step_hours: u32,
    /// Events waiting in the due-event queue.
    pub pending_events: usize,
}

/// Request body for `POST /api/clock/fast-forward`.
#[derive(Debug, serde::Deserialize)]
pub struct FastForwardRequest {
    /// Hours to jump, `1..=MAX_FAST_FORWARD_HOURS`.
    pub hours: u32,
}

/// Request body for `PUT /api/clock/time`.
#[derive(Debug, serde::Deserialize)]
pub struct SetTimeRequest {
    /// New absolute game time, RFC 3339.
    pub time: String,
}

/// `GET /api/clock` -- current clock status.
pub async fn clock_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let sim = state.sim.read().await;
    Json(ClockStatus {
        game_time: sim.game_time(),
        paused: sim.is_paused(),
        step_hours: sim.step_hours(),
        pending_events: sim.pending_events(),
    })
}

/// `POST /api/clock/pause` -- freeze time advancement. Idempotent.
pub async fn pause_clock(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let mut sim = state.sim.write().await;
    sim.pause();
    Json(serde_json::json!({ "paused": true, "game_time": sim.game_time() }))
}

/// `POST /api/clock/resume` -- unfreeze time advancement. Idempotent.
pub async fn resume_clock(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let mut sim = state.sim.write().await;
    sim.resume();
    Json(serde_json::json!({ "paused": false, "game_time": sim.game_time() }))
}

/// `POST /api/clock/tick` -- run one tick immediately and return the
/// full report. Due events fire even while paused.
pub async fn manual_tick(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ObserverError> {
    let mut sim = state.sim.write().await;
    let report = sim.run_tick()?;
    drop(sim);
    state.broadcast(&TickBroadcast::from(&report));
    Ok(Json(report))
}

/// `POST /api/clock/fast-forward` -- jump the clock forward and drain
/// everything that comes due, returning one combined report.
pub async fn fast_forward(
    State(state): State<Arc<AppState>>,
    Json(request): Json<FastForwardRequest>,
) -> Result<impl IntoResponse, ObserverError> {
    if request.hours == 0 || request.hours > MAX_FAST_FORWARD_HOURS {
        return Err(ObserverError::Validation(format!(
            "hours must be 1..={MAX_FAST_FORWARD_HOURS}, got {}",
            request.hours
        )));
    }

    let mut sim = state.sim.write().await;
    let report = sim.fast_forward(request.hours)?;
    drop(sim);
    state.broadcast(&TickBroadcast::from(&report));
    Ok(Json(report))
}

/// `PUT /api/clock/time` -- set the game clock to an absolute time.
///
/// The time string must be RFC 3339; anything else is a 400.
pub async fn set_time(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SetTimeRequest>,
) -> Result<impl IntoResponse, ObserverError> {
    let time = DateTime::parse_from_rfc3339(&request.time)
        .map_err(|e| ObserverError::Validation(format!("invalid RFC 3339 time: {e}")))?
        .with_timezone(&Utc);

    let mut sim = state.sim.write().await;
    sim.set_game_time(time)?;
    Ok(Json(serde_json::json!({ "game_time": sim.game_time() })))
}
