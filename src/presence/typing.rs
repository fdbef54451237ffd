use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::models::UserPatch;
use crate::store::ChatStore;

/// Per-user cancelable expiry timers for ephemeral typing state.
///
/// Every keystroke event re-arms the timer for its `(room, user)` key;
/// when the idle window elapses without another keystroke, the timer
/// clears the user's typing state in the store. This models "stop showing
/// the indicator after silence" without an explicit stop event from the
/// client.
pub struct TypingTimers {
    timers: Mutex<HashMap<(String, String), JoinHandle<()>>>,
    idle_window: Duration,
}

impl TypingTimers {
    pub fn new(idle_window: Duration) -> Self {
        Self {
            timers: Mutex::new(HashMap::new()),
            idle_window,
        }
    }

    /// Arms (or re-arms) the expiry timer for one occupant. Any pending
    /// timer for the same key is cancelled first, so the window restarts
    /// from the latest keystroke.
    pub fn arm(&self, store: Arc<dyn ChatStore + Send + Sync>, room_id: &str, user_id: &str) {
        let key = (room_id.to_string(), user_id.to_string());
        let idle_window = self.idle_window;

        let room = room_id.to_string();
        let user = user_id.to_string();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(idle_window).await;

            debug!(room_id = %room, user_id = %user, "Typing idle window elapsed, clearing state");
            if let Err(e) = store
                .update_user(&room, &user, UserPatch::typing_cleared())
                .await
            {
                warn!(
                    room_id = %room,
                    user_id = %user,
                    error = %e,
                    "Failed to clear expired typing state"
                );
            }
        });

        let mut timers = self.timers.lock().unwrap();
        if let Some(previous) = timers.insert(key, handle) {
            previous.abort();
        }
    }

    /// Cancels the pending timer for one occupant, if any
    pub fn cancel(&self, room_id: &str, user_id: &str) {
        let key = (room_id.to_string(), user_id.to_string());
        let mut timers = self.timers.lock().unwrap();
        if let Some(handle) = timers.remove(&key) {
            debug!(room_id = %room_id, user_id = %user_id, "Cancelled typing timer");
            handle.abort();
        }
    }

    /// Aborts every pending timer. Process teardown.
    pub fn shutdown(&self) {
        let mut timers = self.timers.lock().unwrap();
        let count = timers.len();
        for (_, handle) in timers.drain() {
            handle.abort();
        }
        debug!(timer_count = count, "Typing timers shut down");
    }

    #[cfg(test)]
    pub fn pending_count(&self) -> usize {
        self.timers.lock().unwrap().len()
    }
}
