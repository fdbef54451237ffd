use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, instrument, warn};

use super::session::{session_key, SessionRegistry};
use super::typing::TypingTimers;
use crate::identity;
use crate::models::{MessageKind, User, UserPatch};
use crate::relay::MessageRelay;
use crate::shared::AppError;
use crate::store::ChatStore;

/// Configuration for presence timing behavior
#[derive(Debug, Clone)]
pub struct PresenceConfig {
    /// Silence period after which a user's typing state expires.
    pub typing_idle_window: Duration,
    /// Debounce before the post-leave emptiness check runs, leaving room
    /// for a near-concurrent rejoin to settle.
    pub empty_room_check_delay: Duration,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            typing_idle_window: Duration::from_secs(5),
            empty_room_check_delay: Duration::from_secs(2),
        }
    }
}

/// Successful join result
#[derive(Debug, Clone)]
pub struct JoinOutcome {
    pub user_id: String,
}

/// Orchestrates join, leave, typing updates, and forced cleanup against
/// the shared store.
///
/// The session registry and typing timers are process-local; the store is
/// the cross-process source of truth. Every store call is a suspension
/// point where other events can interleave, which is why the in-flight
/// guard and stale-session reconciliation exist.
pub struct PresenceService {
    store: Arc<dyn ChatStore + Send + Sync>,
    relay: Arc<MessageRelay>,
    sessions: SessionRegistry,
    typing: TypingTimers,
    config: PresenceConfig,
}

impl PresenceService {
    pub fn new(
        store: Arc<dyn ChatStore + Send + Sync>,
        relay: Arc<MessageRelay>,
        config: PresenceConfig,
    ) -> Self {
        Self {
            store,
            relay,
            sessions: SessionRegistry::new(),
            typing: TypingTimers::new(config.typing_idle_window),
            config,
        }
    }

    /// Joins a room, reconciling stale sessions and evicting occupants
    /// that already use the same display name.
    ///
    /// `creator_bypass` is set by create-and-join: the room is guaranteed
    /// fresh, so the in-flight guard check is skipped. Partial writes on a
    /// failure path are not rolled back; the next cleanup cycle heals them.
    #[instrument(skip(self, password))]
    pub async fn join_room(
        &self,
        room_id: &str,
        username: &str,
        password: Option<&str>,
        creator_bypass: bool,
    ) -> Result<JoinOutcome, AppError> {
        if username.is_empty() {
            return Err(AppError::EmptyUsername);
        }

        let key = session_key(room_id, username);
        // Guard clears on every exit path, including errors below.
        let _guard = self
            .sessions
            .begin_join(&key, creator_bypass)
            .ok_or(AppError::AlreadyJoining)?;

        // A prior join from this process that never cleanly left leaves a
        // registry entry behind; purge its record before proceeding.
        if let Some(stale) = self.sessions.get(&key) {
            info!(
                session_key = %key,
                stale_user_id = %stale.user_id,
                "Reconciling stale session before join"
            );
            self.cleanup_user(room_id, &stale.user_id).await;
            self.sessions.remove(&key);
        }

        let room = self.store.get_room(room_id).await?;

        // A missing room record means no restriction: the record may not
        // have materialized yet, and the join proceeds.
        if let Some(room) = &room {
            if room.is_private && room.password.as_deref() != password {
                warn!(room_id = %room_id, username = %username, "Join rejected: wrong password");
                return Err(AppError::InvalidPassword);
            }
        }

        // Display names are unique among active occupants; evict any
        // holder of this name before writing the new record.
        if let Some(room) = &room {
            for duplicate in room.users_named(username) {
                info!(
                    room_id = %room_id,
                    username = %username,
                    evicted_user_id = %duplicate.id,
                    "Evicting duplicate-username occupant"
                );
                self.cleanup_user(room_id, &duplicate.id).await;
            }
        }

        let user_id = identity::generate_user_id();
        let user = User::new(
            user_id.clone(),
            username.to_string(),
            identity::pick_color().to_string(),
        );

        self.store.put_user(room_id, &user).await?;
        self.sessions.insert(&key, user_id.clone());
        self.store
            .register_disconnect_removal(room_id, &user_id)
            .await?;
        self.store.touch_room(room_id, false).await?;
        self.relay
            .add_system_message(room_id, &format!("{} joined", username), MessageKind::Join)
            .await;

        info!(room_id = %room_id, username = %username, user_id = %user_id, "User joined room");
        Ok(JoinOutcome { user_id })
    }

    /// Leaves a room: removes the session and user record, announces the
    /// leave, and schedules the deferred emptiness check. Fire-and-forget.
    #[instrument(skip(self))]
    pub async fn leave_room(&self, room_id: &str, user_id: &str, username: &str) {
        self.sessions.remove(&session_key(room_id, username));
        self.cleanup_user(room_id, user_id).await;
        self.relay
            .add_system_message(room_id, &format!("{} left", username), MessageKind::Leave)
            .await;

        info!(room_id = %room_id, username = %username, user_id = %user_id, "User left room");
        self.schedule_empty_room_check(room_id);
    }

    /// Forced cleanup: deletes the user record and cancels any pending
    /// typing timer. Idempotent, safe on an already-removed user.
    #[instrument(skip(self))]
    pub async fn cleanup_user(&self, room_id: &str, user_id: &str) {
        self.typing.cancel(room_id, user_id);
        if let Err(e) = self.store.delete_user(room_id, user_id).await {
            warn!(room_id = %room_id, user_id = %user_id, error = %e, "Failed to delete user record");
        }
    }

    /// Records a keystroke event: merge-writes the previews and derived
    /// typing flag, and restarts the idle-expiry timer. Fire-and-forget.
    #[instrument(skip(self, typing, composing))]
    pub async fn update_typing(&self, room_id: &str, user_id: &str, typing: &str, composing: &str) {
        let patch = UserPatch::typing_update(typing.to_string(), composing.to_string());
        let is_typing = patch.is_typing == Some(true);

        if let Err(e) = self.store.update_user(room_id, user_id, patch).await {
            warn!(room_id = %room_id, user_id = %user_id, error = %e, "Failed to write typing state");
        }

        if is_typing {
            self.typing.arm(Arc::clone(&self.store), room_id, user_id);
        } else {
            self.typing.cancel(room_id, user_id);
        }
    }

    /// Process-teardown hook: aborts all timers and clears local session
    /// state. The store's disconnect removals handle the remote records.
    pub fn cleanup_all_sessions(&self) {
        info!("Tearing down presence state");
        self.typing.shutdown();
        self.sessions.clear();
    }

    /// One-shot, non-cancelable deferred check; the delay is a debounce
    /// for near-concurrent rejoins, not a correctness guarantee.
    fn schedule_empty_room_check(&self, room_id: &str) {
        let store = Arc::clone(&self.store);
        let delay = self.config.empty_room_check_delay;
        let room_id = room_id.to_string();

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            match store.get_room(&room_id).await {
                Ok(Some(room)) if room.is_empty() => {
                    info!(room_id = %room_id, "Room empty after debounce, deleting");
                    if let Err(e) = store.delete_room(&room_id).await {
                        warn!(room_id = %room_id, error = %e, "Failed to delete empty room");
                    }
                }
                Ok(Some(_)) => {
                    debug!(room_id = %room_id, "Room reoccupied before emptiness check");
                }
                Ok(None) => {
                    debug!(room_id = %room_id, "Room already gone at emptiness check");
                }
                Err(e) => {
                    warn!(room_id = %room_id, error = %e, "Emptiness check failed");
                }
            }
        });
    }
}
