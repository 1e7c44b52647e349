//! Conversion logic between DTOs and domain entities.

use serde_json::Value;

use crate::{
    common::time::timestamp_to_rfc3339,
    domain::{
        ClientRequest, DisplayName, DrawList, DrawMode, DrawRequest, DrawResult, LogEntry,
        draw::{DEFAULT_MAX, DEFAULT_MIN, clamp_bound, sanitize_items},
    },
    infrastructure::dto::{http as http_dto, websocket as ws_dto},
};

// ========================================
// DTO → Domain
// ========================================

impl From<ws_dto::InboundMessage> for ClientRequest {
    fn from(dto: ws_dto::InboundMessage) -> Self {
        match dto {
            ws_dto::InboundMessage::Ping {} => Self::Ping,
            ws_dto::InboundMessage::Join { name } => {
                Self::Rename(DisplayName::sanitize(name.as_str()))
            }
            ws_dto::InboundMessage::SetList {
                items,
                with_replacement,
            } => {
                let raw_items = items.as_array().map(Vec::as_slice).unwrap_or_default();
                let list = sanitize_items(raw_items.iter().map(Value::as_str))
                    .and_then(|items| DrawList::new(items, replacement_flag(&with_replacement)));
                Self::SetList(list)
            }
            ws_dto::InboundMessage::Draw { mode, min, max } => {
                let request = match DrawMode::parse_lenient(mode.as_str()) {
                    DrawMode::Coin => DrawRequest::Coin,
                    DrawMode::List => DrawRequest::List,
                    DrawMode::Number => DrawRequest::Number {
                        min: bound(min.as_ref(), DEFAULT_MIN),
                        max: bound(max.as_ref(), DEFAULT_MAX),
                    },
                };
                Self::Draw(request)
            }
        }
    }
}

/// Replacement is on unless the client sent an explicit `false`.
fn replacement_flag(value: &Value) -> bool {
    !matches!(value, Value::Bool(false))
}

/// Coerce a numeric draw bound.
///
/// A missing (or `null`) bound takes `default`; anything present goes
/// through [`clamp_bound`], where non-numeric input becomes the floor.
fn bound(value: Option<&Value>, default: i64) -> i64 {
    match value {
        None | Some(Value::Null) => default,
        Some(value) => clamp_bound(as_number(value)),
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    }
}

// ========================================
// Domain → DTO
// ========================================

impl From<&DrawResult> for ws_dto::OutboundMessage {
    fn from(model: &DrawResult) -> Self {
        Self::DrawResult {
            mode: model.mode,
            result: model.value.clone(),
            by: model.by.as_str().to_string(),
            ts: model.ts.value(),
        }
    }
}

impl From<&DrawList> for ws_dto::OutboundMessage {
    fn from(model: &DrawList) -> Self {
        Self::ListState {
            items: model.items().to_vec(),
            drawn: model.visible_drawn().to_vec(),
            with_replacement: model.with_replacement(),
        }
    }
}

impl From<&LogEntry> for http_dto::LogEntryDto {
    fn from(model: &LogEntry) -> Self {
        Self {
            id: model.id,
            timestamp: timestamp_to_rfc3339(model.ts.value()),
            user_name: model.by.as_str().to_string(),
            action: model.mode,
            result: model.result.clone(),
        }
    }
}
