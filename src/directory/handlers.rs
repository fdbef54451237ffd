use axum::{extract::State, Json};
use tracing::{info, instrument};

use super::types::{RoomCreateRequest, RoomCreateResponse, RoomResponse};
use crate::shared::{AppError, AppState};

/// HTTP handler for creating a room and joining it as the creator
///
/// POST /rooms
#[instrument(name = "create_room", skip(state, request))]
pub async fn create_room(
    State(state): State<AppState>,
    Json(request): Json<RoomCreateRequest>,
) -> Result<Json<RoomCreateResponse>, AppError> {
    info!(name = %request.name, username = %request.username, "Creating new room");

    let (room, outcome) = state
        .directory
        .create_and_join_room(
            &request.name,
            request.is_private,
            request.password,
            &request.username,
        )
        .await?;

    info!(room_id = %room.id, user_id = %outcome.user_id, "Room created and joined");

    Ok(Json(RoomCreateResponse {
        room: RoomResponse::from(&room),
        user_id: outcome.user_id,
    }))
}

/// HTTP handler for listing discoverable rooms
///
/// GET /rooms
#[instrument(name = "list_rooms", skip(state))]
pub async fn list_rooms(
    State(state): State<AppState>,
) -> Result<Json<Vec<RoomResponse>>, AppError> {
    let rooms = state.directory.list_available_rooms().await?;

    info!(room_count = rooms.len(), "Rooms listed successfully");

    Ok(Json(rooms.iter().map(RoomResponse::from).collect()))
}
