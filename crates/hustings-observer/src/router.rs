//! Axum router construction for the Observer API.
//!
//! Assembles all routes (REST + `WebSocket`) into a single [`Router`]
//! with CORS middleware enabled for cross-origin dashboard access.

use std::sync::Arc;

use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::control;
use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the complete Axum router for the Observer server.
///
/// The router includes:
/// - `GET /` -- minimal HTML status page
/// - `GET /ws/ticks` -- `WebSocket` tick summary stream
/// - `GET /api/clock` -- clock status
/// - `POST /api/clock/pause` / `resume` / `tick` / `fast-forward`
/// - `PUT /api/clock/time` -- absolute clock set
/// - `POST /api/campaigns` -- initialize a campaign cycle
/// - `GET /api/campaigns/{player}` -- active cycle + history
/// - `POST /api/campaigns/{player}/modifiers` -- record a state modifier
/// - `GET /api/campaigns/{player}/trend` -- polling aggregate
/// - `GET /api/campaigns/{player}/result` -- resolved election
///
/// CORS is configured to allow any origin for development. In
/// production this should be restricted.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Status page
        .route("/", get(handlers::index))
        // WebSocket
        .route("/ws/ticks", get(ws::ws_ticks))
        // Clock control
        .route("/api/clock", get(control::clock_status))
        .route("/api/clock/pause", post(control::pause_clock))
        .route("/api/clock/resume", post(control::resume_clock))
        .route("/api/clock/tick", post(control::manual_tick))
        .route("/api/clock/fast-forward", post(control::fast_forward))
        .route("/api/clock/time", put(control::set_time))
        // Campaign REST API
        .route("/api/campaigns", post(handlers::create_campaign))
        .route("/api/campaigns/{player}", get(handlers::get_campaign))
        .route(
            "/api/campaigns/{player}/modifiers",
            post(handlers::record_modifier),
        )
        .route("/api/campaigns/{player}/trend", get(handlers::get_trend))
        .route("/api/campaigns/{player}/result", get(handlers::get_result))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
