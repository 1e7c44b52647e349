//! UseCase: ルームレジストリ
//!
//! ルーム ID からコーディネーターへの対応表を管理します。
//! 接続時に必要ならコーディネーターを起動し、停止したコーディネーターは
//! 対応表から自動的に取り除きます。
//! ルーム間で共有される状態は統計カウンタのみです。

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use tokio::sync::Mutex;

use crate::{
    common::time::{Clock, SystemClock},
    domain::{MessagePusher, PusherChannel, Room, RoomId, RoomIdFactory, SessionId, Timestamp},
};

use super::{
    coordinator::{RoomCoordinator, RoomHandle},
    error::CoordinatorError,
};

/// Default time an empty room is kept alive
pub const DEFAULT_IDLE_GRACE: Duration = Duration::from_secs(60);

/// Builds the message pusher for a newly spawned room
pub type PusherFactory = Arc<dyn Fn() -> Arc<dyn MessagePusher> + Send + Sync>;

#[derive(Debug, Clone, Copy)]
pub struct RegistryConfig {
    pub idle_grace: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            idle_grace: DEFAULT_IDLE_GRACE,
        }
    }
}

/// Process-wide counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryStats {
    pub rooms_created: u64,
    pub rooms_active: usize,
    pub draws_performed: u64,
}

type RoomMap = Arc<Mutex<HashMap<RoomId, RoomHandle>>>;

pub struct RoomRegistry {
    rooms: RoomMap,
    config: RegistryConfig,
    pusher_factory: PusherFactory,
    clock: Arc<dyn Clock>,
    rooms_created: AtomicU64,
    draws_performed: Arc<AtomicU64>,
}

impl RoomRegistry {
    pub fn new(config: RegistryConfig, pusher_factory: PusherFactory) -> Self {
        Self {
            rooms: Arc::new(Mutex::new(HashMap::new())),
            config,
            pusher_factory,
            clock: Arc::new(SystemClock),
            rooms_created: AtomicU64::new(0),
            draws_performed: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Generate a fresh room id that no live room is using.
    ///
    /// No coordinator is started until someone connects.
    pub async fn create_room_id(&self) -> RoomId {
        let mut rooms = self.rooms.lock().await;
        sweep(&mut rooms);
        loop {
            match RoomIdFactory::generate() {
                Ok(room_id) if !rooms.get(&room_id).is_some_and(|h| !h.is_closed()) => {
                    tracing::info!("Room id '{}' issued", room_id);
                    return room_id;
                }
                Ok(_) => continue,
                Err(e) => tracing::error!("Generated an invalid room id: {}", e),
            }
        }
    }

    /// Handle of the live coordinator for `room_id`, spawning one if needed
    pub async fn get_or_create(&self, room_id: &RoomId) -> RoomHandle {
        let mut rooms = self.rooms.lock().await;
        if let Some(handle) = rooms.get(room_id)
            && !handle.is_closed()
        {
            return handle.clone();
        }

        let room = Room::new(room_id.clone(), Timestamp::new(self.clock.now_millis()));
        let handle = RoomCoordinator::new(room, (self.pusher_factory)())
            .with_clock(self.clock.clone())
            .with_draw_counter(self.draws_performed.clone())
            .spawn(self.config.idle_grace);
        self.rooms_created.fetch_add(1, Ordering::Relaxed);
        tracing::info!("Room '{}' created", room_id);

        rooms.insert(room_id.clone(), handle.clone());
        remove_when_closed(self.rooms.clone(), room_id.clone(), handle.clone());
        handle
    }

    /// Handle of the live coordinator, without creating one
    pub async fn get(&self, room_id: &RoomId) -> Option<RoomHandle> {
        let rooms = self.rooms.lock().await;
        rooms.get(room_id).filter(|h| !h.is_closed()).cloned()
    }

    /// Attach a connection to a room.
    ///
    /// If the coordinator shut down between lookup and attach, a new one is
    /// spawned and the attach retried once.
    pub async fn attach(
        &self,
        room_id: &RoomId,
        sender: PusherChannel,
    ) -> Result<(RoomHandle, SessionId), CoordinatorError> {
        let handle = self.get_or_create(room_id).await;
        match handle.attach(sender.clone()).await {
            Ok(session_id) => Ok((handle, session_id)),
            Err(e) => {
                tracing::debug!("{}; retrying attach", e);
                let handle = self.get_or_create(room_id).await;
                let session_id = handle.attach(sender).await?;
                Ok((handle, session_id))
            }
        }
    }

    /// Snapshots of every live room, in id order
    pub async fn rooms(&self) -> Vec<Room> {
        let handles: Vec<RoomHandle> = {
            let rooms = self.rooms.lock().await;
            rooms.values().filter(|h| !h.is_closed()).cloned().collect()
        };

        let mut snapshots = Vec::with_capacity(handles.len());
        for handle in handles {
            // A room may shut down while we are collecting
            if let Ok(room) = handle.snapshot().await {
                snapshots.push(room);
            }
        }
        snapshots.sort_by(|a, b| a.id.as_str().cmp(b.id.as_str()));
        snapshots
    }

    /// Snapshot of a single live room
    pub async fn room(&self, room_id: &RoomId) -> Option<Room> {
        let handle = self.get(room_id).await?;
        handle.snapshot().await.ok()
    }

    pub async fn stats(&self) -> RegistryStats {
        let rooms_active = {
            let rooms = self.rooms.lock().await;
            rooms.values().filter(|h| !h.is_closed()).count()
        };
        RegistryStats {
            rooms_created: self.rooms_created.load(Ordering::Relaxed),
            rooms_active,
            draws_performed: self.draws_performed.load(Ordering::Relaxed),
        }
    }

    /// Drop handles of coordinators that have shut down.
    ///
    /// Entries normally remove themselves when their coordinator stops; this
    /// sweeps anything left behind. Returns the number of entries removed.
    pub async fn prune(&self) -> usize {
        let mut rooms = self.rooms.lock().await;
        sweep(&mut rooms)
    }
}

fn sweep(rooms: &mut HashMap<RoomId, RoomHandle>) -> usize {
    let before = rooms.len();
    rooms.retain(|_, handle| !handle.is_closed());
    let removed = before - rooms.len();
    if removed > 0 {
        tracing::debug!("Pruned {} closed room(s)", removed);
    }
    removed
}

/// Remove the map entry for `room_id` once its coordinator stops, unless a
/// newer coordinator has already taken the slot.
fn remove_when_closed(rooms: RoomMap, room_id: RoomId, handle: RoomHandle) {
    tokio::spawn(async move {
        handle.closed().await;
        let mut rooms = rooms.lock().await;
        if rooms
            .get(&room_id)
            .is_some_and(|current| current.same_coordinator(&handle))
        {
            rooms.remove(&room_id);
            tracing::debug!("Room '{}' removed from registry", room_id);
        }
    });
}
