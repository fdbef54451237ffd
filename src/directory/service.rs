use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, instrument, warn};

use crate::models::{ChatMessage, Room};
use crate::presence::{JoinOutcome, PresenceService};
use crate::relay::MessageRelay;
use crate::shared::AppError;
use crate::store::{ChatStore, StoreEvent, Subscription};

/// Message listeners deliver at most this many of the most recent entries.
pub const MESSAGE_HISTORY_LIMIT: usize = 50;

/// Creates rooms, lists rooms with at least one occupant, and attaches
/// change listeners over the store's feed.
pub struct RoomDirectory {
    store: Arc<dyn ChatStore + Send + Sync>,
    presence: Arc<PresenceService>,
    relay: Arc<MessageRelay>,
}

impl RoomDirectory {
    pub fn new(
        store: Arc<dyn ChatStore + Send + Sync>,
        presence: Arc<PresenceService>,
        relay: Arc<MessageRelay>,
    ) -> Self {
        Self {
            store,
            presence,
            relay,
        }
    }

    /// Creates a new room; the password is stored only for private rooms
    #[instrument(skip(self, password))]
    pub async fn create_room(
        &self,
        name: &str,
        is_private: bool,
        password: Option<String>,
    ) -> Result<Room, AppError> {
        let room = Room::new(name.to_string(), is_private, password);
        self.store.put_room(&room).await?;

        info!(room_id = %room.id, name = %name, is_private = is_private, "Room created");
        Ok(room)
    }

    /// Composes create and join. The creator-bypass flag is set because a
    /// freshly created room cannot hold stale or duplicate sessions.
    #[instrument(skip(self, password))]
    pub async fn create_and_join_room(
        &self,
        name: &str,
        is_private: bool,
        password: Option<String>,
        username: &str,
    ) -> Result<(Room, JoinOutcome), AppError> {
        let room = self.create_room(name, is_private, password.clone()).await?;
        let outcome = self
            .presence
            .join_room(&room.id, username, password.as_deref(), true)
            .await?;

        Ok((room, outcome))
    }

    /// One-shot listing of discoverable rooms: occupied only, most
    /// recently active first.
    #[instrument(skip(self))]
    pub async fn list_available_rooms(&self) -> Result<Vec<Room>, AppError> {
        let mut rooms: Vec<Room> = self
            .store
            .list_rooms()
            .await?
            .into_iter()
            .filter(|room| !room.is_empty())
            .collect();
        rooms.sort_by(|a, b| b.last_activity.cmp(&a.last_activity));

        debug!(room_count = rooms.len(), "Listed available rooms");
        Ok(rooms)
    }

    /// Subscribes to the room collection. The callback receives the full
    /// filtered, sorted list once at attach time and on every relevant
    /// change. Empty rooms are never discoverable, even before the
    /// deletion sweep runs.
    pub fn get_available_rooms(
        &self,
        callback: impl Fn(Vec<Room>) + Send + Sync + 'static,
    ) -> Subscription {
        let store = Arc::clone(&self.store);
        let mut events = store.subscribe();

        let handle = tokio::spawn(async move {
            Self::deliver_rooms(&store, &callback).await;

            loop {
                match events.recv().await {
                    Ok(StoreEvent::RoomsChanged) | Ok(StoreEvent::RoomChanged(_)) => {
                        Self::deliver_rooms(&store, &callback).await;
                    }
                    Ok(StoreEvent::MessagesChanged(_)) => {}
                    // The re-read covers whatever was missed.
                    Err(RecvError::Lagged(_)) => {
                        Self::deliver_rooms(&store, &callback).await;
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });

        Subscription::new(handle)
    }

    /// Subscribes to a single room's metadata and occupant set. Delivers
    /// `None` once the room is deleted.
    pub fn listen_to_room(
        &self,
        room_id: &str,
        callback: impl Fn(Option<Room>) + Send + Sync + 'static,
    ) -> Subscription {
        let store = Arc::clone(&self.store);
        let mut events = store.subscribe();
        let room_id = room_id.to_string();

        let handle = tokio::spawn(async move {
            Self::deliver_room(&store, &room_id, &callback).await;

            loop {
                match events.recv().await {
                    Ok(StoreEvent::RoomChanged(changed)) if changed == room_id => {
                        Self::deliver_room(&store, &room_id, &callback).await;
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(_)) => {
                        Self::deliver_room(&store, &room_id, &callback).await;
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });

        Subscription::new(handle)
    }

    /// Subscribes to a room's message log. Delivers only the most recent
    /// `MESSAGE_HISTORY_LIMIT` messages, ascending by timestamp with the
    /// store-assigned ID as tiebreak.
    pub fn listen_to_messages(
        &self,
        room_id: &str,
        callback: impl Fn(Vec<ChatMessage>) + Send + Sync + 'static,
    ) -> Subscription {
        let store = Arc::clone(&self.store);
        let mut events = store.subscribe();
        let room_id = room_id.to_string();

        let handle = tokio::spawn(async move {
            Self::deliver_messages(&store, &room_id, &callback).await;

            loop {
                match events.recv().await {
                    Ok(StoreEvent::MessagesChanged(changed)) if changed == room_id => {
                        Self::deliver_messages(&store, &room_id, &callback).await;
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(_)) => {
                        Self::deliver_messages(&store, &room_id, &callback).await;
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });

        Subscription::new(handle)
    }

    /// Clears a room's message log through the relay
    pub async fn clear_room_messages(&self, room_id: &str) {
        self.relay.clear_room_messages(room_id).await;
    }

    async fn deliver_rooms(
        store: &Arc<dyn ChatStore + Send + Sync>,
        callback: &(impl Fn(Vec<Room>) + Send + Sync),
    ) {
        match store.list_rooms().await {
            Ok(rooms) => {
                let mut rooms: Vec<Room> =
                    rooms.into_iter().filter(|room| !room.is_empty()).collect();
                rooms.sort_by(|a, b| b.last_activity.cmp(&a.last_activity));
                callback(rooms);
            }
            Err(e) => warn!(error = %e, "Room list delivery skipped"),
        }
    }

    async fn deliver_room(
        store: &Arc<dyn ChatStore + Send + Sync>,
        room_id: &str,
        callback: &(impl Fn(Option<Room>) + Send + Sync),
    ) {
        match store.get_room(room_id).await {
            Ok(room) => callback(room),
            Err(e) => warn!(room_id = %room_id, error = %e, "Room delivery skipped"),
        }
    }

    async fn deliver_messages(
        store: &Arc<dyn ChatStore + Send + Sync>,
        room_id: &str,
        callback: &(impl Fn(Vec<ChatMessage>) + Send + Sync),
    ) {
        match store.list_messages(room_id).await {
            Ok(mut messages) => {
                messages.sort_by(|a, b| {
                    a.timestamp
                        .cmp(&b.timestamp)
                        .then_with(|| a.id.cmp(&b.id))
                });
                let start = messages.len().saturating_sub(MESSAGE_HISTORY_LIMIT);
                callback(messages.split_off(start));
            }
            Err(e) => warn!(room_id = %room_id, error = %e, "Message delivery skipped"),
        }
    }
}
