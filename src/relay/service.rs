use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, instrument, warn};

use crate::models::{MessageKind, NewMessage, UserPatch};
use crate::store::ChatStore;

/// Appends chat and system messages and keeps room activity metadata
/// current.
///
/// Every operation here is fire-and-forget: store failures are logged and
/// swallowed, never surfaced to the caller. These writes are best-effort
/// and self-heal on the next successful call.
pub struct MessageRelay {
    store: Arc<dyn ChatStore + Send + Sync>,
}

impl MessageRelay {
    pub fn new(store: Arc<dyn ChatStore + Send + Sync>) -> Self {
        Self { store }
    }

    /// Appends a user message, then clears the sender's typing state and
    /// bumps the room's activity timestamp and message count. A sent
    /// message implies typing has stopped.
    #[instrument(skip(self, text))]
    pub async fn send_chat_message(
        &self,
        room_id: &str,
        user_id: &str,
        username: &str,
        text: &str,
        color: &str,
    ) {
        let message = NewMessage {
            user_id: user_id.to_string(),
            username: username.to_string(),
            text: text.to_string(),
            timestamp: Utc::now(),
            color: color.to_string(),
            kind: None,
        };

        match self.store.append_message(room_id, message).await {
            Ok(message_id) => {
                debug!(room_id = %room_id, message_id = %message_id, "Chat message appended");
            }
            Err(e) => {
                warn!(room_id = %room_id, user_id = %user_id, error = %e, "Failed to append chat message");
                return;
            }
        }

        if let Err(e) = self
            .store
            .update_user(room_id, user_id, UserPatch::typing_cleared())
            .await
        {
            warn!(room_id = %room_id, user_id = %user_id, error = %e, "Failed to clear typing state after send");
        }

        if let Err(e) = self.store.touch_room(room_id, true).await {
            warn!(room_id = %room_id, error = %e, "Failed to bump room activity after send");
        }
    }

    /// Appends a message authored by the synthetic system identity
    #[instrument(skip(self, text))]
    pub async fn add_system_message(&self, room_id: &str, text: &str, kind: MessageKind) {
        let message = NewMessage::system(text.to_string(), kind);

        if let Err(e) = self.store.append_message(room_id, message).await {
            warn!(room_id = %room_id, kind = %kind, error = %e, "Failed to append system message");
        }
    }

    /// Deletes the room's entire message log, then appends one system
    /// message recording the clear.
    #[instrument(skip(self))]
    pub async fn clear_room_messages(&self, room_id: &str) {
        if let Err(e) = self.store.clear_messages(room_id).await {
            warn!(room_id = %room_id, error = %e, "Failed to clear room messages");
            return;
        }

        self.add_system_message(room_id, "Chat history was cleared", MessageKind::System)
            .await;
    }
}
