use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display};

/// Fixed display-color palette; every joining user is assigned one at random.
pub const COLOR_PALETTE: [&str; 8] = [
    "#e57373", "#64b5f6", "#81c784", "#ffb74d", "#ba68c8", "#4db6ac", "#f06292", "#a1887f",
];

/// Synthetic identity used for join/leave/clear announcements.
pub const SYSTEM_USER_ID: &str = "system";
pub const SYSTEM_COLOR: &str = "#9e9e9e";

/// Connection status of a room occupant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum UserStatus {
    Active,
    Disconnected,
}

/// Marker for non-user messages; absent for ordinary chat messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MessageKind {
    Join,
    Leave,
    System,
}

/// Presence record for one connected participant in one room
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    /// Raw preview of the main input field.
    pub typing: String,
    /// Raw preview of the secondary (IME composition) field.
    pub composing: String,
    pub is_typing: bool,
    pub last_update: DateTime<Utc>,
    pub joined_at: DateTime<Utc>,
    pub color: String,
    pub status: UserStatus,
}

impl User {
    /// Creates a fresh occupant record with empty typing state
    pub fn new(id: String, username: String, color: String) -> Self {
        let now = Utc::now();
        Self {
            id,
            username,
            typing: String::new(),
            composing: String::new(),
            is_typing: false,
            last_update: now,
            joined_at: now,
            color,
            status: UserStatus::Active,
        }
    }
}

/// A named chat channel with its own occupant set and message log
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: String,
    pub name: String,
    pub users: HashMap<String, User>,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub message_count: u64,
    pub is_private: bool,
    /// Plaintext, access-controlled server-side; not a security boundary here.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl Room {
    /// Creates a new room with a generated ID and no occupants.
    /// The password is kept only for private rooms.
    pub fn new(name: String, is_private: bool, password: Option<String>) -> Self {
        let room_id = petname::Petnames::default().generate_one(2, "");
        let now = Utc::now();

        Self {
            id: room_id,
            name,
            users: HashMap::new(),
            created_at: now,
            last_activity: now,
            message_count: 0,
            is_private,
            password: if is_private { password } else { None },
        }
    }

    /// Get the current number of occupants
    pub fn occupant_count(&self) -> usize {
        self.users.len()
    }

    /// Check whether the room has any occupants left
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// All occupant records currently using the given display name
    pub fn users_named(&self, username: &str) -> Vec<&User> {
        self.users
            .values()
            .filter(|u| u.username == username)
            .collect()
    }
}

/// One entry in a room's append-only message log
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    /// Store-generated, monotonically orderable within a room.
    pub id: String,
    pub user_id: String,
    pub username: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub color: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<MessageKind>,
}

/// Message payload before the store assigns an ID
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub user_id: String,
    pub username: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub color: String,
    pub kind: Option<MessageKind>,
}

impl NewMessage {
    /// Builds a message authored by the synthetic system identity
    pub fn system(text: String, kind: MessageKind) -> Self {
        Self {
            user_id: SYSTEM_USER_ID.to_string(),
            username: SYSTEM_USER_ID.to_string(),
            text,
            timestamp: Utc::now(),
            color: SYSTEM_COLOR.to_string(),
            kind: Some(kind),
        }
    }
}

/// Partial update for a user record; `None` fields are left untouched
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub typing: Option<String>,
    pub composing: Option<String>,
    pub is_typing: Option<bool>,
    pub last_update: Option<DateTime<Utc>>,
    pub status: Option<UserStatus>,
}

impl UserPatch {
    /// Patch produced by a keystroke event
    pub fn typing_update(typing: String, composing: String) -> Self {
        let is_typing = !typing.is_empty() || !composing.is_empty();
        Self {
            typing: Some(typing),
            composing: Some(composing),
            is_typing: Some(is_typing),
            last_update: Some(Utc::now()),
            status: Some(UserStatus::Active),
        }
    }

    /// Patch that resets all typing state (idle expiry, message send)
    pub fn typing_cleared() -> Self {
        Self {
            typing: Some(String::new()),
            composing: Some(String::new()),
            is_typing: Some(false),
            last_update: Some(Utc::now()),
            status: None,
        }
    }

    /// Applies this patch to a user record in place
    pub fn apply(&self, user: &mut User) {
        if let Some(typing) = &self.typing {
            user.typing = typing.clone();
        }
        if let Some(composing) = &self.composing {
            user.composing = composing.clone();
        }
        if let Some(is_typing) = self.is_typing {
            user.is_typing = is_typing;
        }
        if let Some(last_update) = self.last_update {
            user.last_update = last_update;
        }
        if let Some(status) = self.status {
            user.status = status;
        }
    }
}
