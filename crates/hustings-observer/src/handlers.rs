//! REST API endpoint handlers for campaign resources.
//!
//! All handlers go through the shared [`Simulation`] lock in
//! [`AppState`]. Request validation happens here, at the boundary;
//! malformed state codes, bad windows, and unparseable bodies never
//! reach the core.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/` | Minimal HTML status page |
//! | `POST` | `/api/campaigns` | Initialize a campaign cycle |
//! | `GET` | `/api/campaigns/{player}` | Active cycle + history |
//! | `POST` | `/api/campaigns/{player}/modifiers` | Record a state modifier |
//! | `GET` | `/api/campaigns/{player}/trend` | Polling aggregate over a window |
//! | `GET` | `/api/campaigns/{player}/result` | Resolved election result |
//!
//! [`Simulation`]: hustings_core::simulation::Simulation

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::response::{Html, IntoResponse};
use axum::Json;
use uuid::Uuid;

use hustings_types::{CandidateId, PlayerId, StateCode};

use crate::error::ObserverError;
use crate::state::AppState;

/// Upper bound on a trend window: one simulated year in hours.
const MAX_WINDOW_HOURS: u32 = 8_766;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /api/campaigns`.
#[derive(Debug, serde::Deserialize)]
pub struct CreateCampaignRequest {
    /// The player starting the campaign.
    pub player_id: Uuid,
    /// The player's candidate; generated when omitted.
    pub candidate_id: Option<Uuid>,
    /// The opposing candidate; generated when omitted.
    pub opponent_id: Option<Uuid>,
}

/// Request body for `POST /api/campaigns/{player}/modifiers`.
#[derive(Debug, serde::Deserialize)]
pub struct RecordModifierRequest {
    /// Two-letter state code, validated before the core sees it.
    pub state: String,
    /// Signed percentage-point adjustment.
    pub delta: f64,
}

/// Response body for a recorded modifier.
#[derive(Debug, serde::Serialize)]
struct ModifierResponse {
    /// The state that was adjusted.
    state: String,
    /// Accumulated total for that state after the adjustment.
    total: f64,
}

/// Query parameters for `GET /api/campaigns/{player}/trend`.
#[derive(Debug, serde::Deserialize)]
pub struct TrendQuery {
    /// Trailing window length in hours.
    pub window_hours: u32,
}

// ---------------------------------------------------------------------------
// GET / -- minimal HTML status page
// ---------------------------------------------------------------------------

/// Serve a minimal HTML page showing clock status and API links.
pub async fn index(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let sim = state.sim.read().await;
    let game_time = sim.game_time();
    let paused = if sim.is_paused() { "PAUSED" } else { "RUNNING" };
    let step = sim.step_hours();
    let pending = sim.pending_events();
    drop(sim);

    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <title>Hustings Observer</title>
    <style>
        body {{
            background: #0d1117;
            color: #c9d1d9;
            font-family: 'Cascadia Code', 'Fira Code', 'Consolas', monospace;
            padding: 2rem;
            max-width: 800px;
            margin: 0 auto;
        }}
        h1 {{ color: #58a6ff; margin-bottom: 0.25rem; }}
        .subtitle {{ color: #8b949e; margin-top: 0; }}
        .metric {{
            display: inline-block;
            background: #161b22;
            border: 1px solid #30363d;
            border-radius: 6px;
            padding: 1rem 1.5rem;
            margin: 0.5rem 0.5rem 0.5rem 0;
            min-width: 120px;
        }}
        .metric .label {{ color: #8b949e; font-size: 0.85rem; }}
        .metric .value {{ color: #58a6ff; font-size: 1.5rem; font-weight: bold; }}
        a {{ color: #58a6ff; text-decoration: none; }}
        a:hover {{ text-decoration: underline; }}
        ul {{ list-style: none; padding: 0; }}
        li {{ padding: 0.3rem 0; }}
        .status {{ color: #3fb950; font-weight: bold; }}
        hr {{ border: none; border-top: 1px solid #30363d; margin: 1.5rem 0; }}
    </style>
</head>
<body>
    <h1>Hustings Observer</h1>
    <p class="subtitle">Campaign simulation monitoring server</p>

    <p>Status: <span class="status">{paused}</span></p>

    <div>
        <div class="metric">
            <div class="label">Game Time</div>
            <div class="value">{game_time}</div>
        </div>
        <div class="metric">
            <div class="label">Step (hours)</div>
            <div class="value">{step}</div>
        </div>
        <div class="metric">
            <div class="label">Pending Events</div>
            <div class="value">{pending}</div>
        </div>
    </div>

    <hr>

    <ul>
        <li>GET /api/clock</li>
        <li>GET /api/campaigns/{{player}}</li>
        <li>GET /api/campaigns/{{player}}/trend?window_hours=24</li>
        <li>GET /api/campaigns/{{player}}/result</li>
        <li>WS /ws/ticks</li>
    </ul>
</body>
</html>"#
    ))
}

// ---------------------------------------------------------------------------
// POST /api/campaigns
// ---------------------------------------------------------------------------

/// Initialize a new campaign cycle for a player.
///
/// Returns 409 if the player already has an active cycle.
pub async fn create_campaign(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateCampaignRequest>,
) -> Result<impl IntoResponse, ObserverError> {
    let player_id = PlayerId::from(request.player_id);
    let candidate = request
        .candidate_id
        .map_or_else(CandidateId::new, CandidateId::from);
    let opponent = request
        .opponent_id
        .map_or_else(CandidateId::new, CandidateId::from);

    let mut sim = state.sim.write().await;
    let cycle = sim.initialize_campaign(player_id, candidate, opponent)?;
    Ok(Json(cycle))
}

// ---------------------------------------------------------------------------
// GET /api/campaigns/{player}
// ---------------------------------------------------------------------------

/// Return the player's active cycle and full cycle history.
pub async fn get_campaign(
    State(state): State<Arc<AppState>>,
    Path(player): Path<Uuid>,
) -> Result<impl IntoResponse, ObserverError> {
    let player_id = PlayerId::from(player);
    let sim = state.sim.read().await;
    let history = sim.cycle_history(player_id);
    if history.is_empty() {
        return Err(ObserverError::NotFound(format!(
            "no campaign cycles for player {player_id}"
        )));
    }
    let body = serde_json::json!({
        "active": sim.active_cycle(player_id),
        "history": history,
    });
    Ok(Json(body))
}

// ---------------------------------------------------------------------------
// POST /api/campaigns/{player}/modifiers
// ---------------------------------------------------------------------------

/// Record a signed state modifier on the player's active cycle.
///
/// The state code is validated here; a malformed code is a 400 and
/// never reaches the core.
pub async fn record_modifier(
    State(state): State<Arc<AppState>>,
    Path(player): Path<Uuid>,
    Json(request): Json<RecordModifierRequest>,
) -> Result<impl IntoResponse, ObserverError> {
    let code = StateCode::parse(&request.state)
        .map_err(|e| ObserverError::Validation(e.to_string()))?;
    if !request.delta.is_finite() {
        return Err(ObserverError::Validation(
            "delta must be a finite number".to_owned(),
        ));
    }

    let mut sim = state.sim.write().await;
    let total = sim.record_modifier(PlayerId::from(player), code.clone(), request.delta)?;
    Ok(Json(ModifierResponse {
        state: code.to_string(),
        total,
    }))
}

// ---------------------------------------------------------------------------
// GET /api/campaigns/{player}/trend
// ---------------------------------------------------------------------------

/// Return the polling aggregate over the requested trailing window.
///
/// Returns 400 for a zero or oversized window and 422 when fewer than
/// two snapshots fall inside it.
pub async fn get_trend(
    State(state): State<Arc<AppState>>,
    Path(player): Path<Uuid>,
    Query(query): Query<TrendQuery>,
) -> Result<impl IntoResponse, ObserverError> {
    if query.window_hours == 0 || query.window_hours > MAX_WINDOW_HOURS {
        return Err(ObserverError::Validation(format!(
            "window_hours must be 1..={MAX_WINDOW_HOURS}, got {}",
            query.window_hours
        )));
    }

    let sim = state.sim.read().await;
    let aggregate = sim.polling_trend(PlayerId::from(player), query.window_hours)?;
    Ok(Json(aggregate))
}

// ---------------------------------------------------------------------------
// GET /api/campaigns/{player}/result
// ---------------------------------------------------------------------------

/// Return the player's most recent election result, or 404 if no cycle
/// has resolved yet.
pub async fn get_result(
    State(state): State<Arc<AppState>>,
    Path(player): Path<Uuid>,
) -> Result<impl IntoResponse, ObserverError> {
    let player_id = PlayerId::from(player);
    let sim = state.sim.read().await;
    let result = sim.latest_result(player_id).ok_or_else(|| {
        ObserverError::NotFound(format!("no resolved election for player {player_id}"))
    })?;
    Ok(Json(result.clone()))
}
