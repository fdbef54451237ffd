use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;

use crate::directory::RoomDirectory;
use crate::presence::{PresenceConfig, PresenceService};
use crate::relay::MessageRelay;
use crate::store::ChatStore;

/// Shared application state containing all dependencies
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ChatStore + Send + Sync>,
    pub presence: Arc<PresenceService>,
    pub relay: Arc<MessageRelay>,
    pub directory: Arc<RoomDirectory>,
}

impl AppState {
    /// Wires the service graph over the given store
    pub fn new(store: Arc<dyn ChatStore + Send + Sync>, config: PresenceConfig) -> Self {
        let relay = Arc::new(MessageRelay::new(Arc::clone(&store)));
        let presence = Arc::new(PresenceService::new(
            Arc::clone(&store),
            Arc::clone(&relay),
            config,
        ));
        let directory = Arc::new(RoomDirectory::new(
            Arc::clone(&store),
            Arc::clone(&presence),
            Arc::clone(&relay),
        ));

        Self {
            store,
            presence,
            relay,
            directory,
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("A join for this user is already in progress")]
    AlreadyJoining,

    #[error("Invalid room password")]
    InvalidPassword,

    #[error("Username must not be empty")]
    EmptyUsername,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Store error: {0}")]
    StoreUnavailable(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::AlreadyJoining => StatusCode::CONFLICT,
            AppError::InvalidPassword => StatusCode::FORBIDDEN,
            AppError::EmptyUsername => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::StoreUnavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let error_message = self.to_string();

        let body = Json(json!({
            "error": error_message
        }));

        (status, body).into_response()
    }
}
