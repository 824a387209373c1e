//! Scheduler and harvest run API handlers.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use harvester_core::{CategoryMapping, SchedulerError, SchedulerStatus};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use crate::state::AppState;

// ============================================================================
// Response Types
// ============================================================================

/// Scheduler status response
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    #[serde(flatten)]
    pub scheduler: SchedulerStatus,
    pub frequency_hours: u32,
    pub categories: Vec<CategoryMapping>,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Simple message response
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// Get scheduler status
pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let scheduler = state.scheduler().status().await;
    Json(StatusResponse {
        scheduler,
        frequency_hours: state.config().schedule.frequency_hours,
        categories: state.scheduler().orchestrator().mappings().to_vec(),
    })
}

/// Get the report of the last completed run
pub async fn get_last_run(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.scheduler().last_report().await {
        Some(report) => (StatusCode::OK, Json(report)).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "No harvest run has completed yet".to_string(),
            }),
        )
            .into_response(),
    }
}

/// Start a harvest run in the background
pub async fn start_run(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.scheduler().spawn_run() {
        Ok(()) => {
            info!("Manual harvest run started via API");
            (
                StatusCode::ACCEPTED,
                Json(MessageResponse {
                    message: "Harvest run started".to_string(),
                }),
            )
                .into_response()
        }
        Err(e @ SchedulerError::AlreadyRunning) => (
            StatusCode::CONFLICT,
            Json(ErrorResponse {
                error: e.to_string(),
            }),
        )
            .into_response(),
    }
}
