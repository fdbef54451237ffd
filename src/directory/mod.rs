// Public API - what other modules can use
pub use service::{RoomDirectory, MESSAGE_HISTORY_LIMIT};

// Internal modules
pub mod handlers;
mod service;
pub mod types;
