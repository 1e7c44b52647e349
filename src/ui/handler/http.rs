//! HTTP API endpoint handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;

use crate::{
    common::time::timestamp_to_rfc3339,
    domain::RoomId,
    infrastructure::dto::http::{
        LogEntryDto, LogsResponseDto, RoomCreatedDto, RoomSummaryDto, StatsDto,
    },
    ui::state::AppState,
};

/// Largest page size accepted by the logs endpoint
const MAX_PAGE_SIZE: usize = 100;
const DEFAULT_PAGE_SIZE: usize = 20;

/// Health check endpoint
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Issue a fresh room id
pub async fn create_room(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<RoomCreatedDto>) {
    let room_id = state.registry.create_room_id().await;
    (
        StatusCode::CREATED,
        Json(RoomCreatedDto {
            room_id: room_id.into_string(),
        }),
    )
}

/// Get list of live rooms
pub async fn get_rooms(State(state): State<Arc<AppState>>) -> Json<Vec<RoomSummaryDto>> {
    let rooms = state.registry.rooms().await;

    // Domain Model から DTO への変換
    let room_summaries: Vec<RoomSummaryDto> = rooms
        .into_iter()
        .map(|room| RoomSummaryDto {
            id: room.id.as_str().to_string(),
            participants: room.presence(),
            created_at: timestamp_to_rfc3339(room.created_at.value()),
        })
        .collect();

    Json(room_summaries)
}

#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    #[serde(default)]
    pub page: usize,
    pub page_size: Option<usize>,
}

/// Get one page of a room's activity log, newest first
pub async fn get_room_logs(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
    Query(query): Query<LogsQuery>,
) -> Result<Json<LogsResponseDto>, StatusCode> {
    let room_id = RoomId::try_from(room_id).map_err(|_| StatusCode::NOT_FOUND)?;
    let room = state
        .registry
        .room(&room_id)
        .await
        .ok_or(StatusCode::NOT_FOUND)?;

    let page_size = query
        .page_size
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);
    let logs: Vec<LogEntryDto> = room
        .log_page(query.page, page_size)
        .iter()
        .map(LogEntryDto::from)
        .collect();

    Ok(Json(LogsResponseDto { logs }))
}

/// Process-wide counters
pub async fn get_stats(State(state): State<Arc<AppState>>) -> Json<StatsDto> {
    let stats = state.registry.stats().await;
    Json(StatsDto {
        rooms_created: stats.rooms_created,
        rooms_active: stats.rooms_active,
        draws_performed: stats.draws_performed,
    })
}
