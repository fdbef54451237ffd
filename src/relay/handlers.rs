use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::instrument;

use super::types::SendMessageRequest;
use crate::shared::AppState;

/// HTTP handler for sending a chat message. Fire-and-forget: always
/// accepted; persistence failures are logged server-side.
///
/// POST /rooms/{room_id}/messages
#[instrument(name = "send_message", skip(state, request))]
pub async fn send_message(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Json(request): Json<SendMessageRequest>,
) -> StatusCode {
    state
        .relay
        .send_chat_message(
            &room_id,
            &request.user_id,
            &request.username,
            &request.text,
            &request.color,
        )
        .await;

    StatusCode::ACCEPTED
}

/// HTTP handler for clearing a room's message log
///
/// POST /rooms/{room_id}/clear
#[instrument(name = "clear_messages", skip(state))]
pub async fn clear_messages(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> StatusCode {
    state.relay.clear_room_messages(&room_id).await;

    StatusCode::ACCEPTED
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::test_utils::AppStateBuilder;
    use axum::{body::Body, http::Request, Router};
    use tower::ServiceExt; // for `oneshot`

    fn test_app(state: AppState) -> Router {
        Router::new()
            .route(
                "/rooms/:room_id/messages",
                axum::routing::post(send_message),
            )
            .route("/rooms/:room_id/clear", axum::routing::post(clear_messages))
            .with_state(state)
    }

    #[tokio::test]
    async fn test_send_message_appends_to_log() {
        let state = AppStateBuilder::new().build();
        let (room, outcome) = state
            .directory
            .create_and_join_room("Lobby", false, None, "alice")
            .await
            .unwrap();
        let app = test_app(state.clone());

        let body = format!(
            r##"{{"user_id": "{}", "username": "alice", "text": "hello", "color": "#fff"}}"##,
            outcome.user_id
        );
        let request = Request::builder()
            .method("POST")
            .uri(format!("/rooms/{}/messages", room.id))
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);

        let messages = state.store.list_messages(&room.id).await.unwrap();
        // Join announcement plus the chat message
        assert_eq!(messages.len(), 2);
        assert_eq!(messages.last().unwrap().text, "hello");
    }

    #[tokio::test]
    async fn test_clear_messages_resets_log() {
        let state = AppStateBuilder::new().build();
        let (room, _) = state
            .directory
            .create_and_join_room("Lobby", false, None, "alice")
            .await
            .unwrap();
        let app = test_app(state.clone());

        let request = Request::builder()
            .method("POST")
            .uri(format!("/rooms/{}/clear", room.id))
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);

        let messages = state.store.list_messages(&room.id).await.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(
            messages[0].kind,
            Some(crate::models::MessageKind::System)
        );
    }
}
