//! Server execution logic.

use std::sync::Arc;

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::usecase::RoomRegistry;

use super::{
    handler::{
        create_room, get_room_logs, get_rooms, get_stats, health_check, websocket_handler,
    },
    signal::shutdown_signal,
    state::AppState,
};

/// Draw room server
///
/// # Example
///
/// ```ignore
/// let registry = Arc::new(RoomRegistry::new(config, pusher_factory));
/// Server::new(registry).run("127.0.0.1".to_string(), 8080).await?;
/// ```
pub struct Server {
    /// RoomRegistry（全ルームのコーディネーターを管理）
    registry: Arc<RoomRegistry>,
}

impl Server {
    pub fn new(registry: Arc<RoomRegistry>) -> Self {
        Self { registry }
    }

    /// Build the router with every endpoint mounted.
    pub fn router(&self) -> Router {
        let app_state = Arc::new(AppState {
            registry: self.registry.clone(),
        });

        Router::new()
            // WebSocket エンドポイント
            .route("/ws/rooms/{room_id}", get(websocket_handler))
            // HTTP エンドポイント
            .route("/api/health", get(health_check))
            .route("/api/rooms", get(get_rooms).post(create_room))
            .route("/api/rooms/{room_id}/logs", get(get_room_logs))
            .route("/api/stats", get(get_stats))
            .layer(TraceLayer::new_for_http())
            .with_state(app_state)
    }

    /// Run the server until Ctrl+C or SIGTERM.
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to bind to the specified address or
    /// if there's an error during server execution.
    pub async fn run(self, host: String, port: u16) -> Result<(), Box<dyn std::error::Error>> {
        let app = self.router();

        let bind_addr = format!("{}:{}", host, port);
        let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

        tracing::info!("Draw room server listening on {}", listener.local_addr()?);
        tracing::info!("Connect to: ws://{}/ws/rooms/<room_id>", bind_addr);
        tracing::info!("Press Ctrl+C to shutdown gracefully");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server shutdown complete");

        Ok(())
    }
}
