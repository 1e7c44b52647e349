//! WebSocket を使った MessagePusher 実装
//!
//! ## 責務
//!
//! - セッションごとの有界な `Sender` を管理
//! - セッションへのメッセージ送信（push_to, broadcast）
//!
//! ## 設計ノート
//!
//! WebSocket の生成は UI 層（`src/ui/handler/websocket.rs`）で行われます。
//! この実装は生成された `Sender` を受け取り、`try_send` でメッセージを積みます。
//! キューが満杯のセッション（読み出しが止まった相手）は送信失敗として扱います。
//! ルームごとに 1 インスタンスを持ち、ルーム間で状態は共有しません。

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc::error::TrySendError};

use crate::domain::{MessagePushError, MessagePusher, PusherChannel, SessionId};

/// WebSocket を使った MessagePusher 実装
///
/// ## 使用例
///
/// ```ignore
/// let pusher = WebSocketMessagePusher::new();
/// pusher.register_session(session_id.clone(), tx).await;
/// pusher.push_to(&session_id, "{\"type\":\"pong\"}").await?;
/// ```
#[derive(Default)]
pub struct WebSocketMessagePusher {
    /// 接続中のセッションの送信チャンネル
    sessions: Mutex<HashMap<SessionId, PusherChannel>>,
}

impl WebSocketMessagePusher {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MessagePusher for WebSocketMessagePusher {
    async fn register_session(&self, session_id: SessionId, sender: PusherChannel) {
        let mut sessions = self.sessions.lock().await;
        tracing::debug!("Session '{}' registered to MessagePusher", session_id);
        sessions.insert(session_id, sender);
    }

    async fn unregister_session(&self, session_id: &SessionId) {
        let mut sessions = self.sessions.lock().await;
        // Dropping the sender ends the session's writer task
        if sessions.remove(session_id).is_some() {
            tracing::debug!("Session '{}' unregistered from MessagePusher", session_id);
        }
    }

    async fn push_to(
        &self,
        session_id: &SessionId,
        content: &str,
    ) -> Result<(), MessagePushError> {
        let sessions = self.sessions.lock().await;

        let sender = sessions
            .get(session_id)
            .ok_or_else(|| MessagePushError::SessionNotFound(session_id.to_string()))?;
        sender
            .try_send(content.to_string())
            .map_err(|e| MessagePushError::PushFailed(describe(&e)))?;
        tracing::debug!("Pushed message to session '{}'", session_id);
        Ok(())
    }

    async fn broadcast(&self, targets: Vec<SessionId>, content: &str) -> Vec<SessionId> {
        let sessions = self.sessions.lock().await;
        let mut failed = Vec::new();

        for target in targets {
            let Some(sender) = sessions.get(&target) else {
                tracing::warn!("Session '{}' is not registered", target);
                failed.push(target);
                continue;
            };
            match sender.try_send(content.to_string()) {
                Ok(()) => tracing::debug!("Broadcasted message to session '{}'", target),
                Err(e) => {
                    tracing::warn!("Failed to push message to session '{}': {}", target, describe(&e));
                    failed.push(target);
                }
            }
        }

        failed
    }
}

fn describe(error: &TrySendError<String>) -> String {
    match error {
        TrySendError::Full(_) => "outbound queue full".to_string(),
        TrySendError::Closed(_) => "channel closed".to_string(),
    }
}
