// Public API - what other modules can use
pub use service::MessageRelay;

// Internal modules
pub mod handlers;
mod service;
pub mod types;
