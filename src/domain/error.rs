//! Domain layer error definitions.

use thiserror::Error;

/// Errors related to Value Objects validation
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValueObjectError {
    /// RoomId validation error
    #[error("RoomId cannot be empty")]
    RoomIdEmpty,

    /// RoomId too long error
    #[error("RoomId cannot exceed {max} characters (got {actual})")]
    RoomIdTooLong { max: usize, actual: usize },

    /// RoomId contains characters outside `[A-Za-z0-9_-]`
    #[error("RoomId contains invalid characters (got: {0})")]
    RoomIdInvalidFormat(String),

    /// SessionId validation error
    #[error("SessionId cannot be empty")]
    SessionIdEmpty,
}

/// Validation failures of a draw room operation.
///
/// The `Display` output is sent verbatim to the originating client.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DrawError {
    #[error("List is empty")]
    EmptyList,

    #[error("min cannot exceed max")]
    InvertedRange { min: i64, max: i64 },

    #[error("Add a list before drawing")]
    NoList,

    #[error("All items already drawn")]
    Exhausted,
}

/// Errors raised while pushing messages to connected sessions
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MessagePushError {
    /// The session is not registered with the pusher
    #[error("Session '{0}' not found")]
    SessionNotFound(String),

    /// The session's outbound channel is closed
    #[error("Failed to push message: {0}")]
    PushFailed(String),
}
