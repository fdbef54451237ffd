use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

/// Process-local record of a session this instance believes is connected
#[derive(Debug, Clone)]
pub struct SessionEntry {
    pub user_id: String,
    pub joined_at: DateTime<Utc>,
}

/// Builds the key identifying one logical user in one room
pub fn session_key(room_id: &str, username: &str) -> String {
    format!("{}:{}", room_id, username)
}

/// Process-local map from `(room, username)` to the active session, plus
/// the in-flight joining guard set.
///
/// This is deliberately not distributed: it only protects against
/// re-entrant joins from this process instance. Cross-process conflicts
/// are handled by duplicate-username eviction against the store.
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, SessionEntry>>,
    joining: Mutex<HashSet<String>>,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            joining: Mutex::new(HashSet::new()),
        }
    }

    /// Marks a join in flight for the key.
    ///
    /// Returns `None` when a join is already in flight and this is not a
    /// creator-bypass call. On success the returned guard keeps the key
    /// marked until it is dropped, so every exit path clears it.
    pub fn begin_join(&self, key: &str, creator_bypass: bool) -> Option<JoinGuard<'_>> {
        let mut joining = self.joining.lock().unwrap();
        if joining.contains(key) && !creator_bypass {
            warn!(session_key = %key, "Join already in flight for this key");
            return None;
        }
        joining.insert(key.to_string());

        Some(JoinGuard {
            registry: self,
            key: key.to_string(),
        })
    }

    fn end_join(&self, key: &str) {
        let mut joining = self.joining.lock().unwrap();
        joining.remove(key);
    }

    /// Looks up the session this process recorded for the key
    pub fn get(&self, key: &str) -> Option<SessionEntry> {
        let sessions = self.sessions.lock().unwrap();
        sessions.get(key).cloned()
    }

    /// Records a freshly committed session
    pub fn insert(&self, key: &str, user_id: String) {
        debug!(session_key = %key, user_id = %user_id, "Recording session");
        let mut sessions = self.sessions.lock().unwrap();
        sessions.insert(
            key.to_string(),
            SessionEntry {
                user_id,
                joined_at: Utc::now(),
            },
        );
    }

    pub fn remove(&self, key: &str) -> Option<SessionEntry> {
        let mut sessions = self.sessions.lock().unwrap();
        sessions.remove(key)
    }

    /// Drops all local session and in-flight state. Process teardown.
    pub fn clear(&self) {
        let mut sessions = self.sessions.lock().unwrap();
        let count = sessions.len();
        sessions.clear();
        drop(sessions);

        let mut joining = self.joining.lock().unwrap();
        joining.clear();

        debug!(session_count = count, "Cleared session registry");
    }

    #[cfg(test)]
    pub fn joining_count(&self) -> usize {
        self.joining.lock().unwrap().len()
    }
}

/// Clears the in-flight mark when dropped
pub struct JoinGuard<'a> {
    registry: &'a SessionRegistry,
    key: String,
}

impl Drop for JoinGuard<'_> {
    fn drop(&mut self) {
        self.registry.end_join(&self.key);
    }
}
