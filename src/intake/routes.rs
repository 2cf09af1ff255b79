//! REST endpoints for intake status and finished profiles.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::channels::UserId;

use super::archive::ProfileArchive;
use super::session::SessionStore;

/// Shared state for intake routes.
#[derive(Clone)]
pub struct IntakeRouteState {
    pub sessions: Arc<SessionStore>,
    pub archive: Arc<ProfileArchive>,
}

#[derive(Debug, Serialize)]
struct IntakeStatus {
    active_sessions: usize,
    completed_profiles: usize,
}

/// GET /api/intake/status
async fn get_status(State(state): State<IntakeRouteState>) -> impl IntoResponse {
    Json(IntakeStatus {
        active_sessions: state.sessions.len().await,
        completed_profiles: state.archive.len().await,
    })
}

/// GET /api/intake/profiles/{user_id}
///
/// Returns the flat record of the user's latest finished profile, or 404.
async fn get_profile(
    State(state): State<IntakeRouteState>,
    Path(user_id): Path<UserId>,
) -> impl IntoResponse {
    match state.archive.get(user_id).await {
        Some(profile) => Json(profile.to_record()).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({"error": "No finished profile for this user"})),
        )
            .into_response(),
    }
}

/// Build the intake REST routes.
pub fn intake_routes(state: IntakeRouteState) -> Router {
    Router::new()
        .route("/api/intake/status", get(get_status))
        .route("/api/intake/profiles/{user_id}", get(get_profile))
        .with_state(state)
}
