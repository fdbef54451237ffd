use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use roomchat::presence::PresenceConfig;
use roomchat::shared::AppState;
use roomchat::store::InMemoryChatStore;
use roomchat::{directory, presence, relay};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "roomchat=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting roomchat server");

    // In-memory store for development; a managed real-time store backs
    // production deployments behind the same trait.
    let store = Arc::new(InMemoryChatStore::new());
    let app_state = AppState::new(store, PresenceConfig::default());

    let app = Router::new()
        .route("/rooms", post(directory::handlers::create_room))
        .route("/rooms", get(directory::handlers::list_rooms))
        .route("/rooms/:room_id/join", post(presence::handlers::join_room))
        .route("/rooms/:room_id/leave", post(presence::handlers::leave_room))
        .route(
            "/rooms/:room_id/typing",
            post(presence::handlers::update_typing),
        )
        .route(
            "/rooms/:room_id/messages",
            post(relay::handlers::send_message),
        )
        .route(
            "/rooms/:room_id/clear",
            post(relay::handlers::clear_messages),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(app_state.clone());

    let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await.unwrap();
    info!("Server running on http://localhost:3000");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(app_state))
        .await
        .unwrap();
}

async fn shutdown_signal(state: AppState) {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install Ctrl+C handler");

    info!("Shutdown signal received, tearing down sessions");
    state.presence.cleanup_all_sessions();
}
