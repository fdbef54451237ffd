use std::sync::Arc;
use std::time::Duration;

use roomchat::presence::PresenceConfig;
use roomchat::shared::AppState;
use roomchat::store::{ChatStore, InMemoryChatStore};

pub mod mocks;

pub use mocks::{gated_store, GatedChatStore};

// ============================================================================
// Test Setup Infrastructure
// ============================================================================

pub struct TestEnv {
    pub store: Arc<InMemoryChatStore>,
    pub state: AppState,
}

/// Builds an AppState over a fresh in-memory store with short timings so
/// debounce-dependent workflows settle quickly.
pub fn test_env() -> TestEnv {
    let store = Arc::new(InMemoryChatStore::new());
    let state = AppState::new(
        Arc::clone(&store) as Arc<dyn ChatStore + Send + Sync>,
        fast_config(),
    );
    TestEnv { store, state }
}

/// Builds an AppState over an arbitrary store implementation
pub fn test_env_with_store(store: Arc<dyn ChatStore + Send + Sync>) -> AppState {
    AppState::new(store, fast_config())
}

pub fn fast_config() -> PresenceConfig {
    PresenceConfig {
        typing_idle_window: Duration::from_millis(100),
        empty_room_check_delay: Duration::from_millis(20),
    }
}
