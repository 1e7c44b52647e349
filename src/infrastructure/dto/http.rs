//! HTTP API response DTOs.

use serde::{Deserialize, Serialize};

use crate::domain::DrawMode;

/// Response of `POST /api/rooms`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomCreatedDto {
    pub room_id: String,
}

/// Room summary for `GET /api/rooms`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomSummaryDto {
    pub id: String,
    /// Display names of attached sessions, in attach order
    pub participants: Vec<String>,
    /// RFC 3339 formatted timestamp
    pub created_at: String,
}

/// One activity log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntryDto {
    pub id: u64,
    /// RFC 3339 formatted timestamp
    pub timestamp: String,
    pub user_name: String,
    pub action: DrawMode,
    pub result: String,
}

/// Response of `GET /api/rooms/{room_id}/logs`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogsResponseDto {
    pub logs: Vec<LogEntryDto>,
}

/// Response of `GET /api/stats`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsDto {
    pub rooms_created: u64,
    pub rooms_active: usize,
    pub draws_performed: u64,
}
