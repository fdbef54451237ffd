// Abstraction over the managed real-time store.
// Services only see this trait; the in-memory implementation backs
// development and every test.

pub mod memory;

pub use memory::InMemoryChatStore;

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::models::{ChatMessage, NewMessage, Room, User, UserPatch};
use crate::shared::AppError;

/// Change notification emitted by the store on every mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    /// The room collection changed (room added/removed, occupancy changed).
    RoomsChanged,
    /// A single room's metadata or occupant set changed.
    RoomChanged(String),
    /// A room's message log changed.
    MessagesChanged(String),
}

/// Capability set consumed from the real-time store.
///
/// Every method is a single-record operation; the store guarantees
/// last-write-wins per record and nothing across records. Merge-style
/// updates (`update_user`, `touch_room`) are silent no-ops when the target
/// record is gone, so late timer writes after an eviction are harmless.
#[async_trait]
pub trait ChatStore: Send + Sync {
    async fn put_room(&self, room: &Room) -> Result<(), AppError>;
    async fn get_room(&self, room_id: &str) -> Result<Option<Room>, AppError>;
    async fn list_rooms(&self) -> Result<Vec<Room>, AppError>;
    async fn delete_room(&self, room_id: &str) -> Result<(), AppError>;

    /// Bumps the room's last-activity timestamp, optionally incrementing
    /// the message count in the same merge.
    async fn touch_room(&self, room_id: &str, bump_message_count: bool) -> Result<(), AppError>;

    async fn put_user(&self, room_id: &str, user: &User) -> Result<(), AppError>;
    async fn update_user(
        &self,
        room_id: &str,
        user_id: &str,
        patch: UserPatch,
    ) -> Result<(), AppError>;

    /// Idempotent; deleting an absent user succeeds.
    async fn delete_user(&self, room_id: &str, user_id: &str) -> Result<(), AppError>;

    /// Appends a message and returns the store-generated ID. IDs are
    /// monotonically orderable within a room and serve as the timestamp
    /// tiebreak.
    async fn append_message(&self, room_id: &str, message: NewMessage) -> Result<String, AppError>;
    async fn list_messages(&self, room_id: &str) -> Result<Vec<ChatMessage>, AppError>;
    async fn clear_messages(&self, room_id: &str) -> Result<(), AppError>;

    /// Server-side registration: the user record is removed when this
    /// client's connection drops, regardless of process liveness.
    async fn register_disconnect_removal(
        &self,
        room_id: &str,
        user_id: &str,
    ) -> Result<(), AppError>;

    /// Change feed covering every mutation through this store.
    fn subscribe(&self) -> broadcast::Receiver<StoreEvent>;
}

/// Handle for a change-feed listener.
///
/// `close` detaches the underlying watcher exactly once; further calls are
/// no-ops. Dropping the handle closes it as well.
pub struct Subscription {
    handle: JoinHandle<()>,
    closed: AtomicBool,
}

impl Subscription {
    pub fn new(handle: JoinHandle<()>) -> Self {
        Self {
            handle,
            closed: AtomicBool::new(false),
        }
    }

    /// Detaches the listener; safe to call multiple times
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            debug!("Closing store subscription");
            self.handle.abort();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.close();
    }
}
