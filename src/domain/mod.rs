//! Domain layer for the draw room.
//!
//! This module contains business logic that is independent of
//! data transfer objects (DTOs) and infrastructure concerns.

pub mod draw;
pub mod entity;
pub mod error;
pub mod factory;
pub mod message_pusher;
pub mod value_object;

pub use draw::{DrawList, NumberRange};
pub use entity::{ClientRequest, DrawOutcome, DrawRequest, DrawResult, LogEntry, Room, Session};
pub use error::{DrawError, MessagePushError, ValueObjectError};
pub use factory::{RoomIdFactory, SessionIdFactory};
pub use message_pusher::{MessagePusher, OUTBOUND_QUEUE_CAPACITY, PusherChannel};
pub use value_object::{DisplayName, DrawMode, RoomId, SessionId, Timestamp};

#[cfg(test)]
pub use message_pusher::MockMessagePusher;
