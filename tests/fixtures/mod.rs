//! Shared helpers for integration tests: an in-process server and a
//! WebSocket test client.

#![allow(dead_code)]

use std::{net::SocketAddr, sync::Arc, time::Duration};

use draw_room::{
    domain::MessagePusher,
    infrastructure::message_pusher::WebSocketMessagePusher,
    ui::Server,
    usecase::{RegistryConfig, RoomRegistry},
};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};

const RECV_TIMEOUT: Duration = Duration::from_secs(2);

/// Helper struct holding a server bound to an ephemeral port
pub struct TestServer {
    pub addr: SocketAddr,
    pub registry: Arc<RoomRegistry>,
}

impl TestServer {
    /// Start a server on 127.0.0.1 with an OS-assigned port
    pub async fn start() -> Self {
        Self::start_with_idle_grace(Duration::from_secs(60)).await
    }

    pub async fn start_with_idle_grace(idle_grace: Duration) -> Self {
        let registry = Arc::new(RoomRegistry::new(
            RegistryConfig { idle_grace },
            Arc::new(|| Arc::new(WebSocketMessagePusher::new()) as Arc<dyn MessagePusher>),
        ));
        let app = Server::new(registry.clone()).router();

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("Failed to read local addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Test server failed");
        });

        TestServer { addr, registry }
    }

    pub fn ws_url(&self, room_id: &str) -> String {
        format!("ws://{}/ws/rooms/{}", self.addr, room_id)
    }

    pub fn http_url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

/// Helper struct wrapping one WebSocket connection
pub struct TestClient {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl TestClient {
    /// Connect to a room and consume the initial `users` broadcast
    pub async fn join(server: &TestServer, room_id: &str) -> Self {
        let mut client = Self::connect(server, room_id).await;
        let users = client.recv_type("users").await;
        assert!(users["users"].is_array());
        client
    }

    /// Connect without consuming anything
    pub async fn connect(server: &TestServer, room_id: &str) -> Self {
        let (ws, _response) = connect_async(server.ws_url(room_id))
            .await
            .expect("Failed to connect");
        TestClient { ws }
    }

    pub async fn send(&mut self, message: Value) {
        self.ws
            .send(Message::Text(message.to_string().into()))
            .await
            .expect("Failed to send");
    }

    /// Next text frame, parsed as JSON
    pub async fn recv(&mut self) -> Value {
        loop {
            let frame = tokio::time::timeout(RECV_TIMEOUT, self.ws.next())
                .await
                .expect("Timed out waiting for a message")
                .expect("Connection closed")
                .expect("WebSocket error");
            if let Message::Text(text) = frame {
                return serde_json::from_str(text.as_str()).expect("Invalid JSON from server");
            }
        }
    }

    /// Skip messages until one of the given type arrives
    pub async fn recv_type(&mut self, message_type: &str) -> Value {
        loop {
            let message = self.recv().await;
            if message["type"] == message_type {
                return message;
            }
        }
    }

    /// Round-trip a ping; everything queued before the pong is returned.
    pub async fn sync(&mut self) -> Vec<Value> {
        self.send(serde_json::json!({"type": "ping"})).await;
        let mut before = Vec::new();
        loop {
            let message = self.recv().await;
            if message["type"] == "pong" {
                return before;
            }
            before.push(message);
        }
    }

    pub async fn close(mut self) {
        let _ = self.ws.close(None).await;
    }
}
