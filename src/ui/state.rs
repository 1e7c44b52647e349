//! Shared server state.

use std::sync::Arc;

use crate::usecase::RoomRegistry;

/// Shared application state
pub struct AppState {
    /// RoomRegistry（ルーム ID からコーディネーターを引く）
    pub registry: Arc<RoomRegistry>,
}
