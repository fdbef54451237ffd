use serde::Deserialize;

/// Request payload for sending a chat message
#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub user_id: String,
    pub username: String,
    pub text: String,
    pub color: String,
}
