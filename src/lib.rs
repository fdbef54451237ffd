// Library crate for the roomchat presence and message-relay server
// This file exposes the public API for integration tests

pub mod directory;
pub mod identity;
pub mod models;
pub mod presence;
pub mod relay;
pub mod shared;
pub mod store;

// Re-export commonly used types for easier access in tests
pub use directory::{RoomDirectory, MESSAGE_HISTORY_LIMIT};
pub use models::{ChatMessage, MessageKind, NewMessage, Room, User, UserPatch, UserStatus};
pub use presence::{JoinOutcome, PresenceConfig, PresenceService, SessionRegistry, TypingTimers};
pub use relay::MessageRelay;
pub use shared::{AppError, AppState};
pub use store::{ChatStore, InMemoryChatStore, StoreEvent, Subscription};
