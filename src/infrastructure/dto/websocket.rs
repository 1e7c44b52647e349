//! WebSocket message DTOs for the draw room.
//!
//! Inbound fields that clients may send with the wrong JSON type are kept
//! as raw [`Value`]s and coerced in [`super::conversion`]; only a missing or
//! unknown `type` makes a payload unparseable.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::DrawMode;

/// Message sent by a client
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundMessage {
    Ping {},
    Join {
        #[serde(default)]
        name: Value,
    },
    SetList {
        #[serde(default)]
        items: Value,
        #[serde(default, rename = "withReplacement")]
        with_replacement: Value,
    },
    Draw {
        #[serde(default)]
        mode: Value,
        #[serde(default)]
        min: Option<Value>,
        #[serde(default)]
        max: Option<Value>,
    },
}

impl InboundMessage {
    /// Parse a raw text frame.
    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

/// Message sent to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    Pong,
    Users {
        users: Vec<String>,
    },
    ListState {
        items: Vec<String>,
        drawn: Vec<String>,
        #[serde(rename = "withReplacement")]
        with_replacement: bool,
    },
    #[serde(rename = "result")]
    DrawResult {
        mode: DrawMode,
        result: String,
        by: String,
        /// Unix timestamp (milliseconds since epoch)
        ts: i64,
    },
    Error {
        message: String,
    },
}

impl OutboundMessage {
    /// Serialize to the JSON text sent over the wire.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
