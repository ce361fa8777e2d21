//! Integration tests for the Observer API endpoints.
//!
//! Tests use Axum's `Router` directly via `tower::ServiceExt` without
//! starting a TCP server. This validates handler logic and routing
//! without needing a live network connection.

#![allow(clippy::unwrap_used)]

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use hustings_core::baseline::{BaselineTable, StateBaseline};
use hustings_core::config::HustingsConfig;
use hustings_core::simulation::Simulation;
use hustings_observer::router::build_router;
use hustings_observer::state::AppState;
use hustings_types::StateCode;
use serde_json::Value;
use tokio::sync::RwLock;
use tower::ServiceExt;
use uuid::Uuid;

/// Compressed campaign calendar so a full cycle fits in a few ticks.
fn test_config() -> HustingsConfig {
    let mut config = HustingsConfig::default();
    config.world.start_time = String::from("2025-01-01T00:00:00Z");
    config.world.step_hours = 1;
    config.campaign.announcement_hours = 2;
    config.campaign.primary_hours = 2;
    config.campaign.general_campaign_hours = 2;
    config.campaign.polling_interval_hours = 1;
    config
}

fn test_baseline() -> BaselineTable {
    let mut states = BTreeMap::new();
    states.insert(
        StateCode::parse("CA").unwrap(),
        StateBaseline {
            lean: 12.0,
            electors: 54,
            turnout_weight: 1.0,
        },
    );
    states.insert(
        StateCode::parse("TX").unwrap(),
        StateBaseline {
            lean: -8.0,
            electors: 40,
            turnout_weight: 1.0,
        },
    );
    states.insert(
        StateCode::parse("PA").unwrap(),
        StateBaseline {
            lean: 0.5,
            electors: 19,
            turnout_weight: 1.0,
        },
    );
    BaselineTable::from_states(states)
}

fn make_test_state() -> Arc<AppState> {
    let sim = Simulation::new(test_config(), test_baseline()).unwrap();
    Arc::new(AppState::new(Arc::new(RwLock::new(sim))))
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test]
async fn test_index_returns_html() {
    let router = build_router(make_test_state());

    let response = router
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap();
    assert!(content_type.contains("text/html"));
}

#[tokio::test]
async fn test_clock_status() {
    let router = build_router(make_test_state());

    let response = router
        .oneshot(Request::get("/api/clock").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["game_time"], "2025-01-01T00:00:00Z");
    assert_eq!(json["paused"], false);
    assert_eq!(json["step_hours"], 1);
}

#[tokio::test]
async fn test_pause_and_resume() {
    let router = build_router(make_test_state());

    let response = router
        .clone()
        .oneshot(
            Request::post("/api/clock/pause")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["paused"], true);

    let response = router
        .oneshot(
            Request::post("/api/clock/resume")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["paused"], false);
}

#[tokio::test]
async fn test_manual_tick_advances_clock() {
    let router = build_router(make_test_state());

    let response = router
        .oneshot(
            Request::post("/api/clock/tick")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["game_time"], "2025-01-01T01:00:00Z");
    // The startup broadcast fires on the first tick.
    assert_eq!(json["notices"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_fast_forward_rejects_zero_hours() {
    let router = build_router(make_test_state());

    let response = router
        .oneshot(json_request(
            "POST",
            "/api/clock/fast-forward",
            &serde_json::json!({ "hours": 0 }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_set_time_rejects_malformed_string() {
    let router = build_router(make_test_state());

    let response = router
        .oneshot(json_request(
            "PUT",
            "/api/clock/time",
            &serde_json::json!({ "time": "next tuesday" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_set_time_accepts_rfc3339() {
    let router = build_router(make_test_state());

    let response = router
        .oneshot(json_request(
            "PUT",
            "/api/clock/time",
            &serde_json::json!({ "time": "2025-06-01T12:00:00Z" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["game_time"], "2025-06-01T12:00:00Z");
}

#[tokio::test]
async fn test_create_campaign_returns_announcement_cycle() {
    let router = build_router(make_test_state());
    let player = Uuid::now_v7();

    let response = router
        .oneshot(json_request(
            "POST",
            "/api/campaigns",
            &serde_json::json!({ "player_id": player }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["player_id"], player.to_string());
    assert_eq!(json["cycle_sequence"], 1);
    assert_eq!(json["phase"], "Announcement");
}

#[tokio::test]
async fn test_create_campaign_twice_conflicts() {
    let router = build_router(make_test_state());
    let player = Uuid::now_v7();
    let body = serde_json::json!({ "player_id": player });

    let response = router
        .clone()
        .oneshot(json_request("POST", "/api/campaigns", &body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = router
        .oneshot(json_request("POST", "/api/campaigns", &body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_get_campaign_unknown_player_is_404() {
    let router = build_router(make_test_state());

    let response = router
        .oneshot(
            Request::get(format!("/api/campaigns/{}", Uuid::now_v7()))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_record_modifier_accumulates() {
    let router = build_router(make_test_state());
    let player = Uuid::now_v7();

    let response = router
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/campaigns",
            &serde_json::json!({ "player_id": player }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let uri = format!("/api/campaigns/{player}/modifiers");
    let response = router
        .clone()
        .oneshot(json_request(
            "POST",
            &uri,
            &serde_json::json!({ "state": "PA", "delta": 1.5 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = router
        .oneshot(json_request(
            "POST",
            &uri,
            &serde_json::json!({ "state": "PA", "delta": -0.5 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["state"], "PA");
    let total = json["total"].as_f64().unwrap();
    assert!((total - 1.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_record_modifier_rejects_bad_state_code() {
    let router = build_router(make_test_state());
    let player = Uuid::now_v7();

    let response = router
        .oneshot(json_request(
            "POST",
            &format!("/api/campaigns/{player}/modifiers"),
            &serde_json::json!({ "state": "pennsylvania", "delta": 1.0 }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_record_modifier_without_cycle_is_404() {
    let router = build_router(make_test_state());

    let response = router
        .oneshot(json_request(
            "POST",
            &format!("/api/campaigns/{}/modifiers", Uuid::now_v7()),
            &serde_json::json!({ "state": "OH", "delta": 2.0 }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_trend_rejects_zero_window() {
    let router = build_router(make_test_state());

    let response = router
        .oneshot(
            Request::get(format!(
                "/api/campaigns/{}/trend?window_hours=0",
                Uuid::now_v7()
            ))
            .body(Body::empty())
            .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_trend_without_snapshots_is_422() {
    let router = build_router(make_test_state());
    let player = Uuid::now_v7();

    let response = router
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/campaigns",
            &serde_json::json!({ "player_id": player }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = router
        .oneshot(
            Request::get(format!("/api/campaigns/{player}/trend?window_hours=24"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_trend_after_fast_forward() {
    let router = build_router(make_test_state());
    let player = Uuid::now_v7();

    let response = router
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/campaigns",
            &serde_json::json!({ "player_id": player }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Polling fires hourly; four hours gives four snapshots.
    let response = router
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/clock/fast-forward",
            &serde_json::json!({ "hours": 4 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = router
        .oneshot(
            Request::get(format!("/api/campaigns/{player}/trend?window_hours=24"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["window_hours"], 24);
    assert_eq!(json["sample_count"], 4);
    assert!(json["average_support"].as_f64().unwrap() > 0.0);
}

#[tokio::test]
async fn test_result_before_resolution_is_404() {
    let router = build_router(make_test_state());
    let player = Uuid::now_v7();

    let response = router
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/campaigns",
            &serde_json::json!({ "player_id": player }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = router
        .oneshot(
            Request::get(format!("/api/campaigns/{player}/result"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_fast_forward_through_full_cycle_resolves() {
    let router = build_router(make_test_state());
    let player = Uuid::now_v7();

    let response = router
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/campaigns",
            &serde_json::json!({ "player_id": player }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Announcement + Primary + GeneralCampaign is six hours on the
    // compressed calendar; resolution fires when ElectionDay begins.
    let response = router
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/clock/fast-forward",
            &serde_json::json!({ "hours": 8 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["resolutions"].as_array().unwrap().len(), 1);

    let response = router
        .clone()
        .oneshot(
            Request::get(format!("/api/campaigns/{player}/result"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["cycle_sequence"], 1);
    assert!(json["electoral_college"].is_object());
    assert!(json["summary"]["ev_lead"].is_object());

    // The cycle history now shows a resolved cycle and no active one.
    let response = router
        .oneshot(
            Request::get(format!("/api/campaigns/{player}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert!(json["active"].is_null());
    assert_eq!(json["history"].as_array().unwrap().len(), 1);
    assert_eq!(json["history"][0]["phase"], "Resolved");
}
