use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Room;

/// Request payload for creating (and joining) a new room
#[derive(Debug, Deserialize)]
pub struct RoomCreateRequest {
    pub name: String,
    #[serde(default)]
    pub is_private: bool,
    pub password: Option<String>,
    pub username: String,
}

/// Public view of a room; never exposes the password
#[derive(Debug, Serialize, Deserialize)]
pub struct RoomResponse {
    pub id: String,
    pub name: String,
    pub occupant_count: usize,
    pub is_private: bool,
    pub last_activity: DateTime<Utc>,
    pub message_count: u64,
}

impl From<&Room> for RoomResponse {
    fn from(room: &Room) -> Self {
        Self {
            id: room.id.clone(),
            name: room.name.clone(),
            occupant_count: room.occupant_count(),
            is_private: room.is_private,
            last_activity: room.last_activity,
            message_count: room.message_count,
        }
    }
}

/// Response for room creation: the room plus the creator's user ID
#[derive(Debug, Serialize, Deserialize)]
pub struct RoomCreateResponse {
    pub room: RoomResponse,
    pub user_id: String,
}
