//! Value Objects for domain models.
//!
//! Value Objects are immutable objects that represent values in the domain.
//! They are compared by their value, not by identity.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::error::ValueObjectError;

/// Maximum length of a room identifier
pub const ROOM_ID_MAX_LEN: usize = 64;

/// Maximum number of characters kept in a display name
pub const DISPLAY_NAME_MAX_CHARS: usize = 32;

/// Display name used when a participant supplies an unusable name
pub const FALLBACK_DISPLAY_NAME: &str = "Guest";

/// Room identifier value object.
///
/// Short, URL-safe identifier chosen by the participant (or generated by
/// [`RoomIdFactory`](super::factory::RoomIdFactory)).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoomId(String);

impl RoomId {
    /// Create a new RoomId.
    ///
    /// # Arguments
    ///
    /// * `id` - The room identifier string
    ///
    /// # Returns
    ///
    /// A Result containing the RoomId or an error if validation fails
    pub fn new(id: String) -> Result<Self, ValueObjectError> {
        if id.is_empty() {
            return Err(ValueObjectError::RoomIdEmpty);
        }
        let len = id.len();
        if len > ROOM_ID_MAX_LEN {
            return Err(ValueObjectError::RoomIdTooLong {
                max: ROOM_ID_MAX_LEN,
                actual: len,
            });
        }
        if !id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(ValueObjectError::RoomIdInvalidFormat(id));
        }
        Ok(Self(id))
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Convert to owned String.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl TryFrom<String> for RoomId {
    type Error = ValueObjectError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Session identifier value object.
///
/// Opaque and unique within a room; generated at attach time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: String) -> Result<Self, ValueObjectError> {
        if id.is_empty() {
            return Err(ValueObjectError::SessionIdEmpty);
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Guest label derived from this id, e.g. `Guest-3f9a`.
    pub fn guest_label(&self) -> DisplayName {
        let prefix: String = self.0.chars().take(4).collect();
        DisplayName(format!("{FALLBACK_DISPLAY_NAME}-{prefix}"))
    }
}

impl From<uuid::Uuid> for SessionId {
    fn from(uuid: uuid::Uuid) -> Self {
        Self(uuid.simple().to_string())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Display name of a session, always sanitized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayName(String);

impl DisplayName {
    /// Sanitize a participant-supplied name.
    ///
    /// `None` (missing or non-string input), empty and whitespace-only names
    /// collapse to `"Guest"`. Anything else is trimmed and truncated to
    /// [`DISPLAY_NAME_MAX_CHARS`] characters.
    pub fn sanitize(raw: Option<&str>) -> Self {
        let trimmed = raw.map(str::trim).unwrap_or_default();
        if trimmed.is_empty() {
            return Self(FALLBACK_DISPLAY_NAME.to_string());
        }
        Self(trimmed.chars().take(DISPLAY_NAME_MAX_CHARS).collect())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

}

impl fmt::Display for DisplayName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of draw requested by a participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DrawMode {
    Coin,
    Number,
    List,
}

impl DrawMode {
    /// Parse a mode leniently: anything other than `coin`/`number`/`list`
    /// (including a missing value) means [`DrawMode::Number`].
    pub fn parse_lenient(raw: Option<&str>) -> Self {
        match raw {
            Some("coin") => Self::Coin,
            Some("list") => Self::List,
            _ => Self::Number,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Coin => "coin",
            Self::Number => "number",
            Self::List => "list",
        }
    }
}

impl fmt::Display for DrawMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Timestamp value object.
///
/// Represents a Unix timestamp in milliseconds (UTC).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(i64);

impl Timestamp {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Get the inner i64 value.
    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
