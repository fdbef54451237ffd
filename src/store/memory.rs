use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::broadcast;
use tracing::{debug, info, instrument, warn};

use super::{ChatStore, StoreEvent};
use crate::models::{ChatMessage, NewMessage, Room, User, UserPatch};
use crate::shared::AppError;

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// In-memory implementation of ChatStore for development and testing.
///
/// Mirrors the real-time store's semantics: every record operation is
/// atomic on its own, writes at a missing parent path materialize it, and
/// all mutations feed a change channel. Disconnect removals are collected
/// in a hook registry and fired by `simulate_disconnect`, standing in for
/// the server dropping the client's connection.
pub struct InMemoryChatStore {
    rooms: Mutex<HashMap<String, Room>>,
    messages: Mutex<HashMap<String, Vec<ChatMessage>>>,
    disconnect_hooks: Mutex<Vec<(String, String)>>,
    message_seq: AtomicU64,
    events: broadcast::Sender<StoreEvent>,
}

impl Default for InMemoryChatStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryChatStore {
    /// Creates a new empty in-memory store
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            rooms: Mutex::new(HashMap::new()),
            messages: Mutex::new(HashMap::new()),
            disconnect_hooks: Mutex::new(Vec::new()),
            message_seq: AtomicU64::new(0),
            events,
        }
    }

    fn emit(&self, event: StoreEvent) {
        // Send fails only when no subscriber is attached; that is fine.
        let _ = self.events.send(event);
    }

    /// Fires every registered disconnect removal, as the backing store
    /// would when this client's connection drops. Test hook.
    pub async fn simulate_disconnect(&self) {
        let hooks: Vec<(String, String)> = {
            let mut hooks = self.disconnect_hooks.lock().unwrap();
            hooks.drain(..).collect()
        };

        info!(hook_count = hooks.len(), "Firing disconnect removals");
        for (room_id, user_id) in hooks {
            if let Err(e) = self.delete_user(&room_id, &user_id).await {
                warn!(
                    room_id = %room_id,
                    user_id = %user_id,
                    error = %e,
                    "Disconnect removal failed"
                );
            }
        }
    }

    /// Number of currently registered disconnect removals. Test hook.
    pub fn disconnect_hook_count(&self) -> usize {
        self.disconnect_hooks.lock().unwrap().len()
    }
}

#[async_trait]
impl ChatStore for InMemoryChatStore {
    #[instrument(skip(self, room))]
    async fn put_room(&self, room: &Room) -> Result<(), AppError> {
        debug!(room_id = %room.id, name = %room.name, "Writing room record");

        let mut rooms = self.rooms.lock().unwrap();
        rooms.insert(room.id.clone(), room.clone());
        drop(rooms);

        self.emit(StoreEvent::RoomsChanged);
        self.emit(StoreEvent::RoomChanged(room.id.to_string()));
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_room(&self, room_id: &str) -> Result<Option<Room>, AppError> {
        let rooms = self.rooms.lock().unwrap();
        Ok(rooms.get(room_id).cloned())
    }

    #[instrument(skip(self))]
    async fn list_rooms(&self) -> Result<Vec<Room>, AppError> {
        let rooms = self.rooms.lock().unwrap();
        Ok(rooms.values().cloned().collect())
    }

    #[instrument(skip(self))]
    async fn delete_room(&self, room_id: &str) -> Result<(), AppError> {
        info!(room_id = %room_id, "Deleting room record");

        {
            let mut rooms = self.rooms.lock().unwrap();
            rooms.remove(room_id);
        }
        {
            let mut messages = self.messages.lock().unwrap();
            messages.remove(room_id);
        }
        {
            let mut hooks = self.disconnect_hooks.lock().unwrap();
            hooks.retain(|(room, _)| room != room_id);
        }

        self.emit(StoreEvent::RoomsChanged);
        self.emit(StoreEvent::RoomChanged(room_id.to_string()));
        self.emit(StoreEvent::MessagesChanged(room_id.to_string()));
        Ok(())
    }

    #[instrument(skip(self))]
    async fn touch_room(&self, room_id: &str, bump_message_count: bool) -> Result<(), AppError> {
        let mut rooms = self.rooms.lock().unwrap();
        let Some(room) = rooms.get_mut(room_id) else {
            debug!(room_id = %room_id, "Touch on missing room ignored");
            return Ok(());
        };

        room.last_activity = Utc::now();
        if bump_message_count {
            room.message_count += 1;
        }
        drop(rooms);

        self.emit(StoreEvent::RoomsChanged);
        self.emit(StoreEvent::RoomChanged(room_id.to_string()));
        Ok(())
    }

    #[instrument(skip(self, user))]
    async fn put_user(&self, room_id: &str, user: &User) -> Result<(), AppError> {
        debug!(room_id = %room_id, user_id = %user.id, username = %user.username, "Writing user record");

        let mut rooms = self.rooms.lock().unwrap();
        // A write under a missing parent materializes it, the way a path
        // write does in the backing store.
        let room = rooms.entry(room_id.to_string()).or_insert_with(|| {
            debug!(room_id = %room_id, "Materializing room for user write");
            let mut room = Room::new(room_id.to_string(), false, None);
            room.id = room_id.to_string();
            room
        });
        room.users.insert(user.id.clone(), user.clone());
        drop(rooms);

        self.emit(StoreEvent::RoomsChanged);
        self.emit(StoreEvent::RoomChanged(room_id.to_string()));
        Ok(())
    }

    #[instrument(skip(self, patch))]
    async fn update_user(
        &self,
        room_id: &str,
        user_id: &str,
        patch: UserPatch,
    ) -> Result<(), AppError> {
        let mut rooms = self.rooms.lock().unwrap();
        let Some(user) = rooms
            .get_mut(room_id)
            .and_then(|room| room.users.get_mut(user_id))
        else {
            // Late merge after eviction; nothing to update.
            debug!(room_id = %room_id, user_id = %user_id, "Update on missing user ignored");
            return Ok(());
        };

        patch.apply(user);
        drop(rooms);

        self.emit(StoreEvent::RoomChanged(room_id.to_string()));
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_user(&self, room_id: &str, user_id: &str) -> Result<(), AppError> {
        let removed = {
            let mut rooms = self.rooms.lock().unwrap();
            rooms
                .get_mut(room_id)
                .and_then(|room| room.users.remove(user_id))
                .is_some()
        };

        if removed {
            info!(room_id = %room_id, user_id = %user_id, "Deleted user record");
            self.emit(StoreEvent::RoomsChanged);
            self.emit(StoreEvent::RoomChanged(room_id.to_string()));
        } else {
            debug!(room_id = %room_id, user_id = %user_id, "Delete of missing user ignored");
        }
        Ok(())
    }

    #[instrument(skip(self, message))]
    async fn append_message(&self, room_id: &str, message: NewMessage) -> Result<String, AppError> {
        // Zero-padded sequence so lexicographic order matches append order.
        let id = format!("{:016x}", self.message_seq.fetch_add(1, Ordering::SeqCst));

        let stored = ChatMessage {
            id: id.clone(),
            user_id: message.user_id,
            username: message.username,
            text: message.text,
            timestamp: message.timestamp,
            color: message.color,
            kind: message.kind,
        };

        let mut messages = self.messages.lock().unwrap();
        messages
            .entry(room_id.to_string())
            .or_default()
            .push(stored);
        drop(messages);

        self.emit(StoreEvent::MessagesChanged(room_id.to_string()));
        Ok(id)
    }

    #[instrument(skip(self))]
    async fn list_messages(&self, room_id: &str) -> Result<Vec<ChatMessage>, AppError> {
        let messages = self.messages.lock().unwrap();
        Ok(messages.get(room_id).cloned().unwrap_or_default())
    }

    #[instrument(skip(self))]
    async fn clear_messages(&self, room_id: &str) -> Result<(), AppError> {
        info!(room_id = %room_id, "Clearing room message log");

        let mut messages = self.messages.lock().unwrap();
        messages.remove(room_id);
        drop(messages);

        self.emit(StoreEvent::MessagesChanged(room_id.to_string()));
        Ok(())
    }

    #[instrument(skip(self))]
    async fn register_disconnect_removal(
        &self,
        room_id: &str,
        user_id: &str,
    ) -> Result<(), AppError> {
        debug!(room_id = %room_id, user_id = %user_id, "Registering disconnect removal");

        let mut hooks = self.disconnect_hooks.lock().unwrap();
        hooks.push((room_id.to_string(), user_id.to_string()));
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MessageKind, UserStatus};

    fn test_user(id: &str, username: &str) -> User {
        User::new(id.to_string(), username.to_string(), "#fff".to_string())
    }

    fn test_room(id: &str) -> Room {
        let mut room = Room::new(id.to_string(), false, None);
        room.id = id.to_string();
        room
    }

    #[tokio::test]
    async fn test_put_and_get_room() {
        let store = InMemoryChatStore::new();
        let room = test_room("room-1");

        store.put_room(&room).await.unwrap();

        let fetched = store.get_room("room-1").await.unwrap();
        assert!(fetched.is_some());
        assert_eq!(fetched.unwrap().id, "room-1");
        assert!(store.get_room("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_user_write_materializes_missing_room() {
        let store = InMemoryChatStore::new();

        store
            .put_user("ghost-room", &test_user("u1", "alice"))
            .await
            .unwrap();

        let room = store.get_room("ghost-room").await.unwrap().unwrap();
        assert_eq!(room.occupant_count(), 1);
        assert!(room.users.contains_key("u1"));
    }

    #[tokio::test]
    async fn test_update_user_merges_patch() {
        let store = InMemoryChatStore::new();
        store.put_room(&test_room("room-1")).await.unwrap();
        store
            .put_user("room-1", &test_user("u1", "alice"))
            .await
            .unwrap();

        store
            .update_user(
                "room-1",
                "u1",
                UserPatch::typing_update("hel".to_string(), String::new()),
            )
            .await
            .unwrap();

        let room = store.get_room("room-1").await.unwrap().unwrap();
        let user = &room.users["u1"];
        assert_eq!(user.typing, "hel");
        assert!(user.is_typing);
        assert_eq!(user.status, UserStatus::Active);
        // Untouched fields survive the merge
        assert_eq!(user.username, "alice");
    }

    #[tokio::test]
    async fn test_update_missing_user_is_noop() {
        let store = InMemoryChatStore::new();
        store.put_room(&test_room("room-1")).await.unwrap();

        let result = store
            .update_user("room-1", "ghost", UserPatch::typing_cleared())
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_delete_user_is_idempotent() {
        let store = InMemoryChatStore::new();
        store.put_room(&test_room("room-1")).await.unwrap();
        store
            .put_user("room-1", &test_user("u1", "alice"))
            .await
            .unwrap();

        store.delete_user("room-1", "u1").await.unwrap();
        // Second delete of the same record must still succeed
        store.delete_user("room-1", "u1").await.unwrap();

        let room = store.get_room("room-1").await.unwrap().unwrap();
        assert!(room.is_empty());
    }

    #[tokio::test]
    async fn test_message_ids_are_orderable() {
        let store = InMemoryChatStore::new();
        let now = Utc::now();

        let mut ids = Vec::new();
        for i in 0..20 {
            let id = store
                .append_message(
                    "room-1",
                    NewMessage {
                        user_id: "u1".to_string(),
                        username: "alice".to_string(),
                        text: format!("message {}", i),
                        timestamp: now,
                        color: "#fff".to_string(),
                        kind: None,
                    },
                )
                .await
                .unwrap();
            ids.push(id);
        }

        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted, "IDs must sort in append order");

        let messages = store.list_messages("room-1").await.unwrap();
        assert_eq!(messages.len(), 20);
    }

    #[tokio::test]
    async fn test_clear_messages_empties_log() {
        let store = InMemoryChatStore::new();
        store
            .append_message(
                "room-1",
                NewMessage::system("hello".to_string(), MessageKind::System),
            )
            .await
            .unwrap();

        store.clear_messages("room-1").await.unwrap();

        assert!(store.list_messages("room-1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_touch_room_bumps_activity_and_count() {
        let store = InMemoryChatStore::new();
        let room = test_room("room-1");
        let created_activity = room.last_activity;
        store.put_room(&room).await.unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        store.touch_room("room-1", true).await.unwrap();

        let updated = store.get_room("room-1").await.unwrap().unwrap();
        assert!(updated.last_activity > created_activity);
        assert_eq!(updated.message_count, 1);

        store.touch_room("room-1", false).await.unwrap();
        let updated = store.get_room("room-1").await.unwrap().unwrap();
        assert_eq!(updated.message_count, 1);
    }

    #[tokio::test]
    async fn test_disconnect_removal_purges_user() {
        let store = InMemoryChatStore::new();
        store.put_room(&test_room("room-1")).await.unwrap();
        store
            .put_user("room-1", &test_user("u1", "alice"))
            .await
            .unwrap();
        store
            .register_disconnect_removal("room-1", "u1")
            .await
            .unwrap();
        assert_eq!(store.disconnect_hook_count(), 1);

        store.simulate_disconnect().await;

        let room = store.get_room("room-1").await.unwrap().unwrap();
        assert!(room.is_empty());
        assert_eq!(store.disconnect_hook_count(), 0);
    }

    #[tokio::test]
    async fn test_delete_room_drops_hooks_and_messages() {
        let store = InMemoryChatStore::new();
        store.put_room(&test_room("room-1")).await.unwrap();
        store
            .put_user("room-1", &test_user("u1", "alice"))
            .await
            .unwrap();
        store
            .register_disconnect_removal("room-1", "u1")
            .await
            .unwrap();
        store
            .append_message(
                "room-1",
                NewMessage::system("hello".to_string(), MessageKind::System),
            )
            .await
            .unwrap();

        store.delete_room("room-1").await.unwrap();

        assert!(store.get_room("room-1").await.unwrap().is_none());
        assert!(store.list_messages("room-1").await.unwrap().is_empty());
        assert_eq!(store.disconnect_hook_count(), 0);
    }

    #[tokio::test]
    async fn test_mutations_feed_change_channel() {
        let store = InMemoryChatStore::new();
        let mut rx = store.subscribe();

        store.put_room(&test_room("room-1")).await.unwrap();

        assert_eq!(rx.recv().await.unwrap(), StoreEvent::RoomsChanged);
        assert_eq!(
            rx.recv().await.unwrap(),
            StoreEvent::RoomChanged("room-1".to_string())
        );
    }
}
