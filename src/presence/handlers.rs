use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::{info, instrument};

use super::types::{JoinRoomRequest, JoinRoomResponse, LeaveRoomRequest, TypingRequest};
use crate::shared::{AppError, AppState};

/// HTTP handler for joining a room
///
/// POST /rooms/{room_id}/join
#[instrument(name = "join_room", skip(state, request))]
pub async fn join_room(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Json(request): Json<JoinRoomRequest>,
) -> Result<Json<JoinRoomResponse>, AppError> {
    info!(room_id = %room_id, username = %request.username, "Join requested");

    let outcome = state
        .presence
        .join_room(&room_id, &request.username, request.password.as_deref(), false)
        .await?;

    Ok(Json(JoinRoomResponse {
        user_id: outcome.user_id,
    }))
}

/// HTTP handler for leaving a room. Fire-and-forget: always accepted.
///
/// POST /rooms/{room_id}/leave
#[instrument(name = "leave_room", skip(state, request))]
pub async fn leave_room(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Json(request): Json<LeaveRoomRequest>,
) -> StatusCode {
    state
        .presence
        .leave_room(&room_id, &request.user_id, &request.username)
        .await;

    StatusCode::ACCEPTED
}

/// HTTP handler for keystroke events. Fire-and-forget: always accepted.
///
/// POST /rooms/{room_id}/typing
#[instrument(name = "update_typing", skip(state, request))]
pub async fn update_typing(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Json(request): Json<TypingRequest>,
) -> StatusCode {
    state
        .presence
        .update_typing(&room_id, &request.user_id, &request.typing, &request.composing)
        .await;

    StatusCode::ACCEPTED
}
