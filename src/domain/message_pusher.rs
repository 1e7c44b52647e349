//! MessagePusher trait 定義
//!
//! ドメイン層が必要とする「セッションへのメッセージ送信」のインターフェースを定義します。
//! 具体的な実装は Infrastructure 層が提供します（依存性の逆転）。

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{MessagePushError, SessionId};

/// 1 セッションあたりの未送信メッセージの上限
pub const OUTBOUND_QUEUE_CAPACITY: usize = 256;

/// セッションへの送信チャンネル
///
/// 受信側（WebSocket 書き込みタスク）が終了した場合、または
/// [`OUTBOUND_QUEUE_CAPACITY`] 件が溜まったままの場合は送信が失敗します。
pub type PusherChannel = mpsc::Sender<String>;

/// MessagePusher trait
///
/// コーディネーターはこの trait に依存し、WebSocket などの具体的な転送手段には依存しない。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessagePusher: Send + Sync {
    /// セッションの送信チャンネルを登録
    async fn register_session(&self, session_id: SessionId, sender: PusherChannel);

    /// セッションの送信チャンネルを登録解除
    ///
    /// チャンネルを破棄することで、書き込みタスク側に切断を伝える。
    async fn unregister_session(&self, session_id: &SessionId);

    /// 特定のセッションにメッセージを送信
    async fn push_to(&self, session_id: &SessionId, content: &str)
    -> Result<(), MessagePushError>;

    /// 複数のセッションにメッセージを送信
    ///
    /// 送信に失敗したセッションの ID を返す。1 つの失敗で他への送信は止まらない。
    async fn broadcast(&self, targets: Vec<SessionId>, content: &str) -> Vec<SessionId>;
}
