use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::broadcast;
use tokio::sync::Notify;

use roomchat::models::{ChatMessage, NewMessage, Room, User, UserPatch};
use roomchat::shared::AppError;
use roomchat::store::{ChatStore, InMemoryChatStore, StoreEvent};

/// Store wrapper that can park `get_room` readers on a gate.
///
/// Used to hold a join mid-flight at its password-check read, so a second
/// join for the same key deterministically observes the in-flight guard.
pub struct GatedChatStore {
    inner: InMemoryChatStore,
    gate: Notify,
    parked: Notify,
    holding: AtomicBool,
}

impl GatedChatStore {
    pub fn new() -> Self {
        Self {
            inner: InMemoryChatStore::new(),
            gate: Notify::new(),
            parked: Notify::new(),
            holding: AtomicBool::new(false),
        }
    }

    pub fn inner(&self) -> &InMemoryChatStore {
        &self.inner
    }

    /// Starts parking `get_room` callers until `release` is called
    pub fn hold_reads(&self) {
        self.holding.store(true, Ordering::SeqCst);
    }

    /// Completes once a reader has reached the gate
    pub async fn wait_for_parked_reader(&self) {
        self.parked.notified().await;
    }

    /// Lets all parked readers proceed
    pub fn release(&self) {
        self.holding.store(false, Ordering::SeqCst);
        self.gate.notify_waiters();
    }
}

#[async_trait]
impl ChatStore for GatedChatStore {
    async fn put_room(&self, room: &Room) -> Result<(), AppError> {
        self.inner.put_room(room).await
    }

    async fn get_room(&self, room_id: &str) -> Result<Option<Room>, AppError> {
        if self.holding.load(Ordering::SeqCst) {
            let gate_open = self.gate.notified();
            self.parked.notify_one();
            gate_open.await;
        }
        self.inner.get_room(room_id).await
    }

    async fn list_rooms(&self) -> Result<Vec<Room>, AppError> {
        self.inner.list_rooms().await
    }

    async fn delete_room(&self, room_id: &str) -> Result<(), AppError> {
        self.inner.delete_room(room_id).await
    }

    async fn touch_room(&self, room_id: &str, bump_message_count: bool) -> Result<(), AppError> {
        self.inner.touch_room(room_id, bump_message_count).await
    }

    async fn put_user(&self, room_id: &str, user: &User) -> Result<(), AppError> {
        self.inner.put_user(room_id, user).await
    }

    async fn update_user(
        &self,
        room_id: &str,
        user_id: &str,
        patch: UserPatch,
    ) -> Result<(), AppError> {
        self.inner.update_user(room_id, user_id, patch).await
    }

    async fn delete_user(&self, room_id: &str, user_id: &str) -> Result<(), AppError> {
        self.inner.delete_user(room_id, user_id).await
    }

    async fn append_message(&self, room_id: &str, message: NewMessage) -> Result<String, AppError> {
        self.inner.append_message(room_id, message).await
    }

    async fn list_messages(&self, room_id: &str) -> Result<Vec<ChatMessage>, AppError> {
        self.inner.list_messages(room_id).await
    }

    async fn clear_messages(&self, room_id: &str) -> Result<(), AppError> {
        self.inner.clear_messages(room_id).await
    }

    async fn register_disconnect_removal(
        &self,
        room_id: &str,
        user_id: &str,
    ) -> Result<(), AppError> {
        self.inner
            .register_disconnect_removal(room_id, user_id)
            .await
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.inner.subscribe()
    }
}

/// Convenience constructor for sharing the gated store across a test
pub fn gated_store() -> Arc<GatedChatStore> {
    Arc::new(GatedChatStore::new())
}
