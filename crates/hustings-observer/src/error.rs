//! Error types for the Observer API server.
//!
//! [`ObserverError`] unifies all failure modes into a single enum that
//! can be converted into an Axum HTTP response via its
//! [`IntoResponse`](axum::response::IntoResponse) implementation. Core
//! errors map onto the taxonomy rather than leaking internals:
//! validation failures are 400, missing resources 404, lifecycle
//! conflicts 409, and thin polling data 422.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use hustings_core::campaign::CampaignError;
use hustings_core::engine::EngineError;
use hustings_core::polling::PollingError;
use hustings_core::simulation::SimulationError;

/// Errors that can occur in the Observer API layer.
#[derive(Debug, thiserror::Error)]
pub enum ObserverError {
    /// The request failed validation before reaching the core.
    #[error("validation error: {0}")]
    Validation(String),

    /// The requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// The operation conflicts with current lifecycle state.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Not enough polling data to answer the request.
    #[error("insufficient data: {0}")]
    InsufficientData(String),

    /// A serialization or deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<SimulationError> for ObserverError {
    fn from(error: SimulationError) -> Self {
        match error {
            SimulationError::Campaign(CampaignError::CycleAlreadyActive { .. }) => {
                Self::Conflict(error.to_string())
            }
            SimulationError::Campaign(CampaignError::NoActiveCycle { .. }) => {
                Self::NotFound(error.to_string())
            }
            SimulationError::Engine(EngineError::InvalidHours { .. }) => {
                Self::Validation(error.to_string())
            }
            SimulationError::Engine(_)
            | SimulationError::InvalidStartTime { .. }
            | SimulationError::InvalidConfig { .. } => Self::Internal(error.to_string()),
        }
    }
}

impl From<PollingError> for ObserverError {
    fn from(error: PollingError) -> Self {
        Self::InsufficientData(error.to_string())
    }
}

impl IntoResponse for ObserverError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            Self::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            Self::InsufficientData(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg.clone()),
            Self::Serialization(e) => {
                (StatusCode::INTERNAL_SERVER_ERROR, format!("JSON error: {e}"))
            }
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = serde_json::json!({
            "error": message,
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}
