//! UseCase: ルームコーディネーター
//!
//! 1 つのルームの状態（セッション・抽選リスト・直前の結果・アクティビティログ）を
//! 唯一所有し、全ての変更をここで適用します。
//!
//! ## 並行性
//!
//! [`RoomCoordinator::spawn`] で専用の tokio タスクとして起動し、
//! [`RoomHandle`] からコマンドキュー（mpsc）経由で操作します。
//! 同じルームのイベントは 1 つずつ順番に処理されるため、ロックは不要です。
//!
//! ## ブロードキャスト
//!
//! 送信に失敗したセッションは配送パスの完了後にまとめて切断し、
//! その結果を presence（`users`）として残りのセッションに通知します。

use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use rand::{SeedableRng, rngs::StdRng};
use tokio::{
    sync::{mpsc, oneshot},
    time::Instant,
};

use crate::{
    common::time::{Clock, SystemClock},
    domain::{
        ClientRequest, DrawError, MessagePusher, PusherChannel, Room, RoomId, Session, SessionId,
        SessionIdFactory, Timestamp,
    },
    infrastructure::dto::websocket::{InboundMessage, OutboundMessage},
};

use super::error::CoordinatorError;

/// Commands accepted by a running coordinator task
#[derive(Debug)]
pub enum RoomCommand {
    Attach {
        sender: PusherChannel,
        reply: oneshot::Sender<SessionId>,
    },
    Inbound {
        session_id: SessionId,
        raw: String,
    },
    Detach {
        session_id: SessionId,
    },
    Snapshot {
        reply: oneshot::Sender<Room>,
    },
}

/// Cloneable handle to a running coordinator.
#[derive(Debug, Clone)]
pub struct RoomHandle {
    room_id: RoomId,
    commands: mpsc::UnboundedSender<RoomCommand>,
}

impl RoomHandle {
    /// Whether the coordinator task has stopped accepting commands
    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }

    /// Resolves once the coordinator task has stopped.
    pub async fn closed(&self) {
        self.commands.closed().await
    }

    /// Whether both handles drive the same coordinator task
    pub fn same_coordinator(&self, other: &RoomHandle) -> bool {
        self.commands.same_channel(&other.commands)
    }

    /// Attach a connection and wait for its session id.
    pub async fn attach(&self, sender: PusherChannel) -> Result<SessionId, CoordinatorError> {
        let (reply, response) = oneshot::channel();
        self.send(RoomCommand::Attach { sender, reply })?;
        response.await.map_err(|_| self.closed_error())
    }

    /// Queue a raw inbound frame. Does not wait for it to be applied.
    pub fn handle_inbound(&self, session_id: &SessionId, raw: String) -> Result<(), CoordinatorError> {
        self.send(RoomCommand::Inbound {
            session_id: session_id.clone(),
            raw,
        })
    }

    pub fn detach(&self, session_id: &SessionId) -> Result<(), CoordinatorError> {
        self.send(RoomCommand::Detach {
            session_id: session_id.clone(),
        })
    }

    /// Copy of the current room state.
    pub async fn snapshot(&self) -> Result<Room, CoordinatorError> {
        let (reply, response) = oneshot::channel();
        self.send(RoomCommand::Snapshot { reply })?;
        response.await.map_err(|_| self.closed_error())
    }

    fn send(&self, command: RoomCommand) -> Result<(), CoordinatorError> {
        self.commands.send(command).map_err(|_| self.closed_error())
    }

    fn closed_error(&self) -> CoordinatorError {
        CoordinatorError::Closed(self.room_id.to_string())
    }
}

/// ルームの状態を所有し、イベントを適用するコーディネーター
pub struct RoomCoordinator {
    room: Room,
    /// MessagePusher（メッセージ通知の抽象化）
    message_pusher: Arc<dyn MessagePusher>,
    clock: Arc<dyn Clock>,
    rng: StdRng,
    /// Process-wide draw counter shared with the registry
    draw_counter: Arc<AtomicU64>,
}

impl RoomCoordinator {
    /// 新しい RoomCoordinator を作成
    pub fn new(room: Room, message_pusher: Arc<dyn MessagePusher>) -> Self {
        Self {
            room,
            message_pusher,
            clock: Arc::new(SystemClock),
            rng: StdRng::from_entropy(),
            draw_counter: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    pub fn with_draw_counter(mut self, draw_counter: Arc<AtomicU64>) -> Self {
        self.draw_counter = draw_counter;
        self
    }

    pub fn room(&self) -> &Room {
        &self.room
    }

    /// Run the coordinator on its own task.
    ///
    /// The task stops once the room has had no sessions for `idle_grace`,
    /// or when every handle has been dropped.
    pub fn spawn(self, idle_grace: Duration) -> RoomHandle {
        let (commands, receiver) = mpsc::unbounded_channel();
        let handle = RoomHandle {
            room_id: self.room.id.clone(),
            commands,
        };
        tokio::spawn(self.run(receiver, idle_grace));
        handle
    }

    async fn run(mut self, mut receiver: mpsc::UnboundedReceiver<RoomCommand>, idle_grace: Duration) {
        tracing::info!("Room '{}' coordinator started", self.room.id);
        let mut idle_deadline = Some(Instant::now() + idle_grace);

        loop {
            let command = match idle_deadline {
                Some(deadline) => tokio::select! {
                    command = receiver.recv() => command,
                    _ = tokio::time::sleep_until(deadline) => {
                        tracing::info!("Room '{}' idle for {:?}, shutting down", self.room.id, idle_grace);
                        break;
                    }
                },
                None => receiver.recv().await,
            };
            let Some(command) = command else {
                break;
            };

            self.apply(command).await;

            idle_deadline = match (self.room.is_empty(), idle_deadline) {
                (false, _) => None,
                (true, Some(deadline)) => Some(deadline),
                (true, None) => Some(Instant::now() + idle_grace),
            };
        }

        tracing::info!("Room '{}' coordinator stopped", self.room.id);
    }

    async fn apply(&mut self, command: RoomCommand) {
        match command {
            RoomCommand::Attach { sender, reply } => {
                let session_id = self.attach(sender).await;
                if reply.send(session_id.clone()).is_err() {
                    // The connection gave up waiting; nobody will ever detach it
                    self.detach(&session_id).await;
                }
            }
            RoomCommand::Inbound { session_id, raw } => {
                self.handle_inbound(&session_id, &raw).await;
            }
            RoomCommand::Detach { session_id } => self.detach(&session_id).await,
            RoomCommand::Snapshot { reply } => {
                let _ = reply.send(self.room.clone());
            }
        }
    }

    /// 新しいセッションを登録し、現在の状態を送信する
    ///
    /// 直前の結果と抽選リストは新規セッションにのみ送り、その後
    /// presence を全員にブロードキャストする。
    pub async fn attach(&mut self, sender: PusherChannel) -> SessionId {
        let session_id = SessionIdFactory::generate();
        let session = Session::new(session_id.clone());

        self.message_pusher
            .register_session(session_id.clone(), sender)
            .await;
        tracing::info!(
            "Session '{}' attached to room '{}' as '{}'",
            session_id,
            self.room.id,
            session.name
        );
        self.room.add_session(session);

        let mut catch_up = Vec::new();
        if let Some(result) = self.room.last_result() {
            catch_up.push(OutboundMessage::from(result));
        }
        if let Some(list) = self.room.draw_list() {
            catch_up.push(OutboundMessage::from(list));
        }

        for message in &catch_up {
            if !self.send_to(&session_id, message).await {
                self.detach(&session_id).await;
                return session_id;
            }
        }

        self.broadcast_presence().await;
        session_id
    }

    /// セッションからの生メッセージを適用する
    ///
    /// 解釈できないメッセージと未登録セッションからのメッセージは破棄する。
    pub async fn handle_inbound(&mut self, session_id: &SessionId, raw: &str) {
        let Some(session) = self.room.get_session(session_id) else {
            tracing::debug!("Dropping message from detached session '{}'", session_id);
            return;
        };
        let author = session.name.clone();

        let request = match InboundMessage::parse(raw) {
            Ok(message) => ClientRequest::from(message),
            Err(e) => {
                tracing::warn!("Dropping unparseable message from '{}': {}", session_id, e);
                return;
            }
        };
        tracing::debug!("Session '{}' sent {:?}", session_id, request);

        match request {
            ClientRequest::Ping => {
                self.send_or_detach(session_id, &OutboundMessage::Pong).await;
            }
            ClientRequest::Rename(name) => {
                self.room.rename_session(session_id, name);
                self.broadcast_presence().await;
            }
            ClientRequest::SetList(Err(e)) => self.reject(session_id, e).await,
            ClientRequest::SetList(Ok(list)) => {
                tracing::info!(
                    "Room '{}' list replaced by '{}' ({} items, with_replacement={})",
                    self.room.id,
                    author,
                    list.items().len(),
                    list.with_replacement()
                );
                let message = OutboundMessage::from(&list);
                self.room.set_draw_list(list);
                self.broadcast(&message).await;
            }
            ClientRequest::Draw(request) => {
                let now = self.now();
                match self.room.draw(author, request, now, &mut self.rng) {
                    Ok(outcome) => {
                        self.draw_counter.fetch_add(1, Ordering::Relaxed);
                        tracing::info!(
                            "Room '{}' {} draw by '{}': {}",
                            self.room.id,
                            outcome.result.mode,
                            outcome.result.by,
                            outcome.result.value
                        );
                        if outcome.list_changed
                            && let Some(list) = self.room.draw_list()
                        {
                            let list_state = OutboundMessage::from(list);
                            self.broadcast(&list_state).await;
                        }
                        self.broadcast(&OutboundMessage::from(&outcome.result)).await;
                    }
                    Err(e) => self.reject(session_id, e).await,
                }
            }
        }
    }

    /// セッションを切断する（冪等）
    pub async fn detach(&mut self, session_id: &SessionId) {
        if self.remove_session(session_id).await {
            self.broadcast_presence().await;
        }
    }

    async fn reject(&mut self, session_id: &SessionId, error: DrawError) {
        tracing::debug!("Rejected request from '{}': {}", session_id, error);
        let message = OutboundMessage::Error {
            message: error.to_string(),
        };
        self.send_or_detach(session_id, &message).await;
    }

    async fn broadcast_presence(&mut self) {
        let message = OutboundMessage::Users {
            users: self.room.presence(),
        };
        self.broadcast(&message).await;
    }

    /// Deliver to every registered session, then detach the ones that failed.
    async fn broadcast(&mut self, message: &OutboundMessage) {
        let Some(json) = encode(message) else {
            return;
        };
        let mut failed = self
            .message_pusher
            .broadcast(self.room.session_ids(), &json)
            .await;

        // Each round of detaches produces one presence broadcast, which may
        // itself uncover more dead sessions.
        while !failed.is_empty() {
            let mut removed_any = false;
            for session_id in failed.drain(..) {
                removed_any |= self.remove_session(&session_id).await;
            }
            if !removed_any {
                break;
            }
            let presence = OutboundMessage::Users {
                users: self.room.presence(),
            };
            let Some(json) = encode(&presence) else {
                return;
            };
            failed = self
                .message_pusher
                .broadcast(self.room.session_ids(), &json)
                .await;
        }
    }

    async fn send_or_detach(&mut self, session_id: &SessionId, message: &OutboundMessage) {
        if !self.send_to(session_id, message).await {
            self.detach(session_id).await;
        }
    }

    async fn send_to(&self, session_id: &SessionId, message: &OutboundMessage) -> bool {
        let Some(json) = encode(message) else {
            return true;
        };
        match self.message_pusher.push_to(session_id, &json).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Failed to send to session '{}': {}", session_id, e);
                false
            }
        }
    }

    async fn remove_session(&mut self, session_id: &SessionId) -> bool {
        let Some(session) = self.room.remove_session(session_id) else {
            return false;
        };
        self.message_pusher.unregister_session(session_id).await;
        tracing::info!(
            "Session '{}' ('{}') detached from room '{}'",
            session_id,
            session.name,
            self.room.id
        );
        true
    }

    fn now(&self) -> Timestamp {
        Timestamp::new(self.clock.now_millis())
    }
}

fn encode(message: &OutboundMessage) -> Option<String> {
    match message.encode() {
        Ok(json) => Some(json),
        Err(e) => {
            tracing::error!("Failed to serialize outbound message: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        common::time::FixedClock,
        domain::{MessagePushError, MockMessagePusher},
        infrastructure::message_pusher::WebSocketMessagePusher,
    };
    use serde_json::{Value, json};
    use crate::domain::OUTBOUND_QUEUE_CAPACITY;
    use tokio::sync::mpsc::Receiver;

    // ========================================
    // テスト作業記録
    // ========================================
    // 【何をテストするか】
    // - attach / handle_inbound / detach の各操作と送信されるメッセージ
    // - 途中参加者への状態の同期（result と list_state が users より先に届く）
    // - 送信失敗 = 切断 のルール
    // - タスクとして起動した場合の直列化とアイドル停止
    //
    // 【どのようなシナリオをテストするか】
    // 1. 正常系: 各メッセージ種別の適用とブロードキャスト
    // 2. 異常系: 検証エラーは送信者のみに返り、状態は変わらない
    // 3. エッジケース: 解釈できないメッセージ、切断済みセッション、送信失敗
    // ========================================

    const NOW: i64 = 1_700_000_000_000;

    fn create_test_coordinator() -> RoomCoordinator {
        let room = Room::new(RoomId::new("test-room".to_string()).unwrap(), Timestamp::new(0));
        RoomCoordinator::new(room, Arc::new(WebSocketMessagePusher::new()))
            .with_clock(Arc::new(FixedClock::new(NOW)))
            .with_rng(StdRng::seed_from_u64(17))
    }

    async fn attach(coordinator: &mut RoomCoordinator) -> (SessionId, Receiver<String>) {
        let (tx, rx) = mpsc::channel(OUTBOUND_QUEUE_CAPACITY);
        let session_id = coordinator.attach(tx).await;
        (session_id, rx)
    }

    /// Everything queued for a session so far, parsed as JSON.
    fn drain(rx: &mut Receiver<String>) -> Vec<Value> {
        let mut messages = Vec::new();
        while let Ok(text) = rx.try_recv() {
            messages.push(serde_json::from_str(&text).unwrap());
        }
        messages
    }

    fn types(messages: &[Value]) -> Vec<&str> {
        messages.iter().map(|m| m["type"].as_str().unwrap()).collect()
    }

    #[tokio::test]
    async fn test_attach_broadcasts_presence_to_everyone() {
        // テスト項目: 接続すると新規セッションを含む全員に users が送られる
        // given (前提条件):
        let mut coordinator = create_test_coordinator();
        let (alice, mut alice_rx) = attach(&mut coordinator).await;

        // when (操作):
        let (bob, mut bob_rx) = attach(&mut coordinator).await;

        // then (期待する結果):
        let expected = json!([alice.guest_label().as_str(), bob.guest_label().as_str()]);
        let alice_msgs = drain(&mut alice_rx);
        assert_eq!(types(&alice_msgs), vec!["users", "users"]);
        assert_eq!(alice_msgs[1]["users"], expected);
        let bob_msgs = drain(&mut bob_rx);
        assert_eq!(types(&bob_msgs), vec!["users"]);
        assert_eq!(bob_msgs[0]["users"], expected);
    }

    #[tokio::test]
    async fn test_late_joiner_receives_result_and_list_before_users() {
        // テスト項目: 途中参加者は直前の結果とリスト状態を users より先に受け取る
        // given (前提条件):
        let mut coordinator = create_test_coordinator();
        let (alice, _alice_rx) = attach(&mut coordinator).await;
        coordinator
            .handle_inbound(&alice, r#"{"type":"join","name":"Alice"}"#)
            .await;
        coordinator
            .handle_inbound(
                &alice,
                r#"{"type":"set_list","items":["a","b","c"],"withReplacement":false}"#,
            )
            .await;
        coordinator
            .handle_inbound(&alice, r#"{"type":"draw","mode":"list"}"#)
            .await;

        // when (操作):
        let (_bob, mut bob_rx) = attach(&mut coordinator).await;

        // then (期待する結果):
        let messages = drain(&mut bob_rx);
        assert_eq!(types(&messages), vec!["result", "list_state", "users"]);
        let drawn = messages[0]["result"].clone();
        assert_eq!(messages[0]["by"], "Alice");
        assert_eq!(messages[0]["mode"], "list");
        assert_eq!(messages[0]["ts"], NOW);
        assert_eq!(messages[1]["items"], json!(["a", "b", "c"]));
        assert_eq!(messages[1]["drawn"], json!([drawn]));
        assert_eq!(messages[1]["withReplacement"], false);
    }

    #[tokio::test]
    async fn test_ping_replies_only_to_sender() {
        // テスト項目: ping には送信者にのみ pong が返る
        // given (前提条件):
        let mut coordinator = create_test_coordinator();
        let (alice, mut alice_rx) = attach(&mut coordinator).await;
        let (_bob, mut bob_rx) = attach(&mut coordinator).await;
        drain(&mut alice_rx);
        drain(&mut bob_rx);

        // when (操作):
        coordinator.handle_inbound(&alice, r#"{"type":"ping"}"#).await;

        // then (期待する結果):
        assert_eq!(drain(&mut alice_rx), vec![json!({"type": "pong"})]);
        assert!(drain(&mut bob_rx).is_empty());
    }

    #[tokio::test]
    async fn test_join_sanitizes_name() {
        // テスト項目: 80 文字の名前は 32 文字に、空白のみの名前は "Guest" になる
        // given (前提条件):
        let mut coordinator = create_test_coordinator();
        let (alice, mut alice_rx) = attach(&mut coordinator).await;
        drain(&mut alice_rx);
        let long_name = "n".repeat(80);

        // when (操作):
        let raw = json!({"type": "join", "name": long_name}).to_string();
        coordinator.handle_inbound(&alice, &raw).await;

        // then (期待する結果):
        let messages = drain(&mut alice_rx);
        assert_eq!(messages, vec![json!({"type": "users", "users": ["n".repeat(32)]})]);

        // when (操作):
        coordinator
            .handle_inbound(&alice, r#"{"type":"join","name":"   "}"#)
            .await;

        // then (期待する結果):
        assert_eq!(coordinator.room().presence(), vec!["Guest"]);
    }

    #[tokio::test]
    async fn test_set_list_empty_replies_error_to_sender_only() {
        // テスト項目: 空のリストは送信者にのみエラーが返り、状態は変わらない
        // given (前提条件):
        let mut coordinator = create_test_coordinator();
        let (alice, mut alice_rx) = attach(&mut coordinator).await;
        let (_bob, mut bob_rx) = attach(&mut coordinator).await;
        drain(&mut alice_rx);
        drain(&mut bob_rx);

        // when (操作):
        coordinator
            .handle_inbound(&alice, r#"{"type":"set_list","items":["  ", 5]}"#)
            .await;

        // then (期待する結果):
        assert_eq!(
            drain(&mut alice_rx),
            vec![json!({"type": "error", "message": "List is empty"})]
        );
        assert!(drain(&mut bob_rx).is_empty());
        assert!(coordinator.room().draw_list().is_none());
    }

    #[tokio::test]
    async fn test_set_list_replaces_and_resets_history() {
        // テスト項目: リストの再設定で抽選履歴がリセットされ、全員に list_state が届く
        // given (前提条件):
        let mut coordinator = create_test_coordinator();
        let (alice, mut alice_rx) = attach(&mut coordinator).await;
        coordinator
            .handle_inbound(
                &alice,
                r#"{"type":"set_list","items":["a","b"],"withReplacement":false}"#,
            )
            .await;
        coordinator
            .handle_inbound(&alice, r#"{"type":"draw","mode":"list"}"#)
            .await;
        drain(&mut alice_rx);

        // when (操作):
        coordinator
            .handle_inbound(
                &alice,
                r#"{"type":"set_list","items":[" x ","y","z"],"withReplacement":false}"#,
            )
            .await;

        // then (期待する結果):
        assert_eq!(
            drain(&mut alice_rx),
            vec![json!({"type": "list_state", "items": ["x", "y", "z"], "drawn": [], "withReplacement": false})]
        );
        let list = coordinator.room().draw_list().unwrap();
        assert_eq!(list.remaining_indices().len(), 3);
    }

    #[tokio::test]
    async fn test_number_draw_single_value_and_inverted_range() {
        // テスト項目: min=5,max=5 は常に "5"、min=10,max=1 はエラーで結果は変わらない
        // given (前提条件):
        let mut coordinator = create_test_coordinator();
        let (alice, mut alice_rx) = attach(&mut coordinator).await;
        drain(&mut alice_rx);

        // when (操作):
        coordinator
            .handle_inbound(&alice, r#"{"type":"draw","mode":"number","min":5,"max":5}"#)
            .await;
        coordinator
            .handle_inbound(&alice, r#"{"type":"draw","mode":"number","min":10,"max":1}"#)
            .await;

        // then (期待する結果):
        let messages = drain(&mut alice_rx);
        assert_eq!(types(&messages), vec!["result", "error"]);
        assert_eq!(messages[0]["result"], "5");
        assert_eq!(messages[1]["message"], "min cannot exceed max");
        assert_eq!(coordinator.room().last_result().unwrap().value, "5");
    }

    #[tokio::test]
    async fn test_list_draw_without_list_never_broadcasts_result() {
        // テスト項目: リスト未設定の抽選はエラーのみで result は配信されない
        // given (前提条件):
        let mut coordinator = create_test_coordinator();
        let (alice, mut alice_rx) = attach(&mut coordinator).await;
        let (_bob, mut bob_rx) = attach(&mut coordinator).await;
        drain(&mut alice_rx);
        drain(&mut bob_rx);

        // when (操作):
        coordinator
            .handle_inbound(&alice, r#"{"type":"draw","mode":"list"}"#)
            .await;

        // then (期待する結果):
        assert_eq!(
            drain(&mut alice_rx),
            vec![json!({"type": "error", "message": "Add a list before drawing"})]
        );
        assert!(drain(&mut bob_rx).is_empty());
        assert!(coordinator.room().last_result().is_none());
    }

    #[tokio::test]
    async fn test_without_replacement_two_items_then_exhausted() {
        // テスト項目: 2 件の非復元リストは重複なく 2 回引け、3 回目はエラーになる
        // given (前提条件):
        let mut coordinator = create_test_coordinator();
        let (alice, mut alice_rx) = attach(&mut coordinator).await;
        let (_bob, mut bob_rx) = attach(&mut coordinator).await;
        coordinator
            .handle_inbound(
                &alice,
                r#"{"type":"set_list","items":["red","blue"],"withReplacement":false}"#,
            )
            .await;
        drain(&mut alice_rx);
        drain(&mut bob_rx);

        // when (操作):
        for _ in 0..3 {
            coordinator
                .handle_inbound(&alice, r#"{"type":"draw","mode":"list"}"#)
                .await;
        }

        // then (期待する結果):
        let alice_msgs = drain(&mut alice_rx);
        assert_eq!(
            types(&alice_msgs),
            vec!["list_state", "result", "list_state", "result", "error"]
        );
        assert_ne!(alice_msgs[1]["result"], alice_msgs[3]["result"]);
        assert_eq!(alice_msgs[2]["drawn"].as_array().unwrap().len(), 2);
        assert_eq!(alice_msgs[4]["message"], "All items already drawn");

        let bob_msgs = drain(&mut bob_rx);
        assert_eq!(
            types(&bob_msgs),
            vec!["list_state", "result", "list_state", "result"]
        );
    }

    #[tokio::test]
    async fn test_with_replacement_draw_does_not_rebroadcast_list() {
        // テスト項目: 復元抽出では list_state は再送されず result のみが配信される
        // given (前提条件):
        let mut coordinator = create_test_coordinator();
        let (alice, mut alice_rx) = attach(&mut coordinator).await;
        coordinator
            .handle_inbound(&alice, r#"{"type":"set_list","items":["solo"]}"#)
            .await;
        drain(&mut alice_rx);

        // when (操作):
        coordinator
            .handle_inbound(&alice, r#"{"type":"draw","mode":"list"}"#)
            .await;
        coordinator
            .handle_inbound(&alice, r#"{"type":"draw","mode":"list"}"#)
            .await;

        // then (期待する結果):
        let messages = drain(&mut alice_rx);
        assert_eq!(types(&messages), vec!["result", "result"]);
        assert!(messages.iter().all(|m| m["result"] == "solo"));
    }

    #[tokio::test]
    async fn test_coin_draw_result_is_heads_or_tails() {
        // テスト項目: コイン抽選の結果は Heads か Tails で、抽選カウンタが増える
        let counter = Arc::new(AtomicU64::new(0));
        let mut coordinator = create_test_coordinator().with_draw_counter(counter.clone());
        let (alice, mut alice_rx) = attach(&mut coordinator).await;
        drain(&mut alice_rx);

        coordinator
            .handle_inbound(&alice, r#"{"type":"draw","mode":"coin"}"#)
            .await;

        let messages = drain(&mut alice_rx);
        assert!(messages[0]["result"] == "Heads" || messages[0]["result"] == "Tails");
        assert_eq!(counter.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_malformed_message_is_dropped() {
        // テスト項目: 解釈できないメッセージは無視され、何も送信されない
        let mut coordinator = create_test_coordinator();
        let (alice, mut alice_rx) = attach(&mut coordinator).await;
        drain(&mut alice_rx);

        coordinator.handle_inbound(&alice, "{not json").await;
        coordinator.handle_inbound(&alice, r#"{"type":"shout"}"#).await;

        assert!(drain(&mut alice_rx).is_empty());
        assert_eq!(coordinator.room().sessions().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_send_detaches_session() {
        // テスト項目: ブロードキャスト中に送信失敗したセッションは削除され、次の users に含まれない
        // given (前提条件):
        let mut coordinator = create_test_coordinator();
        let (alice, mut alice_rx) = attach(&mut coordinator).await;
        let (bob, bob_rx) = attach(&mut coordinator).await;
        coordinator
            .handle_inbound(&alice, r#"{"type":"join","name":"Alice"}"#)
            .await;
        drain(&mut alice_rx);
        drop(bob_rx);

        // when (操作):
        coordinator
            .handle_inbound(&alice, r#"{"type":"draw","mode":"coin"}"#)
            .await;

        // then (期待する結果):
        let messages = drain(&mut alice_rx);
        assert_eq!(types(&messages), vec!["result", "users"]);
        assert_eq!(messages[1]["users"], json!(["Alice"]));
        assert!(coordinator.room().get_session(&bob).is_none());
    }

    #[tokio::test]
    async fn test_stalled_session_is_detached_when_queue_fills() {
        // テスト項目: 受信を読み出さないセッションはキューが満杯になった時点で切断され、次の users に含まれない
        // given (前提条件):
        let mut coordinator = create_test_coordinator();
        let (alice, mut alice_rx) = attach(&mut coordinator).await;
        let (stalled, _stalled_rx) = attach(&mut coordinator).await;
        coordinator
            .handle_inbound(&alice, r#"{"type":"join","name":"Alice"}"#)
            .await;

        // when (操作): stalled 側は一度も読み出さない
        let mut seen_by_alice = Vec::new();
        for _ in 0..OUTBOUND_QUEUE_CAPACITY + 10 {
            coordinator
                .handle_inbound(&alice, r#"{"type":"draw","mode":"coin"}"#)
                .await;
            seen_by_alice.extend(drain(&mut alice_rx));
        }

        // then (期待する結果):
        assert!(coordinator.room().get_session(&stalled).is_none());
        assert_eq!(coordinator.room().presence(), vec!["Alice"]);
        let last_users = seen_by_alice
            .iter()
            .rev()
            .find(|m| m["type"] == "users")
            .unwrap();
        assert_eq!(last_users["users"], json!(["Alice"]));
    }

    #[tokio::test]
    async fn test_detach_is_idempotent() {
        // テスト項目: 切断は冪等で、2 回目以降は何も送信されない
        // given (前提条件):
        let mut coordinator = create_test_coordinator();
        let (alice, mut alice_rx) = attach(&mut coordinator).await;
        let (bob, _bob_rx) = attach(&mut coordinator).await;
        drain(&mut alice_rx);

        // when (操作):
        coordinator.detach(&bob).await;
        coordinator.detach(&bob).await;

        // then (期待する結果):
        let messages = drain(&mut alice_rx);
        assert_eq!(
            messages,
            vec![json!({"type": "users", "users": [alice.guest_label().as_str()]})]
        );
    }

    #[tokio::test]
    async fn test_message_from_detached_session_is_ignored() {
        // テスト項目: 切断済みセッションからのメッセージは適用されない
        let mut coordinator = create_test_coordinator();
        let (alice, _alice_rx) = attach(&mut coordinator).await;
        coordinator.detach(&alice).await;

        coordinator
            .handle_inbound(&alice, r#"{"type":"set_list","items":["a"]}"#)
            .await;

        assert!(coordinator.room().draw_list().is_none());
    }

    #[tokio::test]
    async fn test_broadcast_failure_reported_by_pusher_triggers_detach() {
        // テスト項目: MessagePusher が報告した送信失敗セッションは登録解除され、presence が再送される
        // given (前提条件):
        let mut pusher = MockMessagePusher::new();
        pusher.expect_register_session().returning(|_, _| ());
        pusher.expect_push_to().returning(|_, _| Ok(()));
        // 1 回目のブロードキャスト（2 人目の attach 時の users）で 2 人目が失敗する
        let mut calls = 0;
        pusher
            .expect_broadcast()
            .returning(move |targets: Vec<SessionId>, _content: &str| {
                calls += 1;
                if calls == 2 {
                    targets.last().cloned().into_iter().collect()
                } else {
                    Vec::new()
                }
            });
        pusher.expect_unregister_session().times(1).returning(|_| ());

        let room = Room::new(RoomId::new("mocked".to_string()).unwrap(), Timestamp::new(0));
        let mut coordinator = RoomCoordinator::new(room, Arc::new(pusher));

        // when (操作):
        let (tx1, _rx1) = mpsc::channel(OUTBOUND_QUEUE_CAPACITY);
        let (tx2, _rx2) = mpsc::channel(OUTBOUND_QUEUE_CAPACITY);
        let alice = coordinator.attach(tx1).await;
        let bob = coordinator.attach(tx2).await;

        // then (期待する結果):
        assert!(coordinator.room().get_session(&alice).is_some());
        assert!(coordinator.room().get_session(&bob).is_none());
    }

    #[tokio::test]
    async fn test_attach_detaches_when_catch_up_send_fails() {
        // テスト項目: 途中参加時の状態送信に失敗したセッションは即座に切断される
        let mut pusher = MockMessagePusher::new();
        pusher.expect_register_session().returning(|_, _| ());
        pusher
            .expect_push_to()
            .returning(|id: &SessionId, _content: &str| {
                Err(MessagePushError::PushFailed(id.to_string()))
            });
        pusher.expect_broadcast().returning(|_, _| Vec::new());
        pusher.expect_unregister_session().times(1).returning(|_| ());

        let mut room = Room::new(RoomId::new("mocked".to_string()).unwrap(), Timestamp::new(0));
        room.set_draw_list(crate::domain::DrawList::new(vec!["a".into()], true).unwrap());
        let mut coordinator = RoomCoordinator::new(room, Arc::new(pusher));

        let (tx, _rx) = mpsc::channel(OUTBOUND_QUEUE_CAPACITY);
        let session_id = coordinator.attach(tx).await;

        assert!(coordinator.room().get_session(&session_id).is_none());
        assert!(coordinator.room().is_empty());
    }

    #[tokio::test]
    async fn test_spawned_coordinator_serializes_concurrent_draws() {
        // テスト項目: 複数セッションから同時に非復元抽選しても同じ要素が 2 回引かれない
        // given (前提条件):
        let handle = create_test_coordinator().spawn(Duration::from_secs(60));
        let mut sessions = Vec::new();
        for _ in 0..4 {
            let (tx, rx) = mpsc::channel(OUTBOUND_QUEUE_CAPACITY);
            let session_id = handle.attach(tx).await.unwrap();
            sessions.push((session_id, rx));
        }
        let items: Vec<String> = (0..20).map(|i| format!("item-{i}")).collect();
        let raw = json!({"type": "set_list", "items": items, "withReplacement": false}).to_string();
        handle.handle_inbound(&sessions[0].0, raw).unwrap();

        // when (操作): 4 セッションが 5 回ずつ抽選
        let mut tasks = Vec::new();
        for (session_id, _) in &sessions {
            let handle = handle.clone();
            let session_id = session_id.clone();
            tasks.push(tokio::spawn(async move {
                for _ in 0..5 {
                    handle
                        .handle_inbound(&session_id, r#"{"type":"draw","mode":"list"}"#.to_string())
                        .unwrap();
                    tokio::task::yield_now().await;
                }
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        // then (期待する結果):
        let room = handle.snapshot().await.unwrap();
        let list = room.draw_list().unwrap();
        assert_eq!(list.visible_drawn().len(), 20);
        assert!(list.remaining_indices().is_empty());
        let mut drawn = list.visible_drawn().to_vec();
        drawn.sort();
        drawn.dedup();
        assert_eq!(drawn.len(), 20);
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawned_coordinator_stops_after_idle_grace() {
        // テスト項目: 全員が切断してから猶予期間が過ぎるとコーディネーターが停止する
        // given (前提条件):
        let handle = create_test_coordinator().spawn(Duration::from_secs(30));
        let (tx, _rx) = mpsc::channel(OUTBOUND_QUEUE_CAPACITY);
        let session_id = handle.attach(tx).await.unwrap();

        // when (操作): 接続中は猶予期間を過ぎても停止しない
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert!(!handle.is_closed());

        handle.detach(&session_id).unwrap();
        tokio::time::sleep(Duration::from_secs(31)).await;

        // then (期待する結果):
        assert!(handle.is_closed());
        let (tx, _rx) = mpsc::channel(OUTBOUND_QUEUE_CAPACITY);
        assert_eq!(
            handle.attach(tx).await,
            Err(CoordinatorError::Closed("test-room".to_string()))
        );
    }
}
