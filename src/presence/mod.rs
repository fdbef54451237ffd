// Public API - what other modules can use
pub use service::{JoinOutcome, PresenceConfig, PresenceService};
pub use session::{session_key, SessionEntry, SessionRegistry};
pub use typing::TypingTimers;

// Internal modules
pub mod handlers;
mod service;
pub mod session;
pub mod typing;
pub mod types;
