use serde::{Deserialize, Serialize};

/// Request payload for joining a room
#[derive(Debug, Deserialize)]
pub struct JoinRoomRequest {
    pub username: String,
    pub password: Option<String>,
}

/// Response for a successful join
#[derive(Debug, Serialize, Deserialize)]
pub struct JoinRoomResponse {
    pub user_id: String,
}

/// Request payload for leaving a room
#[derive(Debug, Deserialize)]
pub struct LeaveRoomRequest {
    pub user_id: String,
    pub username: String,
}

/// Request payload for a keystroke event
#[derive(Debug, Deserialize)]
pub struct TypingRequest {
    pub user_id: String,
    #[serde(default)]
    pub typing: String,
    #[serde(default)]
    pub composing: String,
}
