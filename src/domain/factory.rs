//! Domain factories for creating identifiers.

use rand::Rng;

use super::{
    error::ValueObjectError,
    value_object::{RoomId, SessionId},
};

/// Length of generated room identifiers
pub const GENERATED_ROOM_ID_LEN: usize = 8;

const ROOM_ID_ALPHABET: &[u8] = b"abcdefghijkmnpqrstuvwxyz23456789";

/// Factory for generating RoomId instances.
///
/// Generated ids are short and avoid look-alike characters (`0`/`o`, `1`/`l`)
/// so they can be read out loud.
pub struct RoomIdFactory;

impl RoomIdFactory {
    /// Generate a new RoomId using the thread-local random source.
    ///
    /// # Errors
    ///
    /// This method should not fail in practice, but returns Result for consistency
    /// with the domain error handling pattern.
    pub fn generate() -> Result<RoomId, ValueObjectError> {
        Self::generate_with(&mut rand::thread_rng())
    }

    /// Generate a new RoomId from the given random source.
    pub fn generate_with<R: Rng + ?Sized>(rng: &mut R) -> Result<RoomId, ValueObjectError> {
        let id: String = (0..GENERATED_ROOM_ID_LEN)
            .map(|_| char::from(ROOM_ID_ALPHABET[rng.gen_range(0..ROOM_ID_ALPHABET.len())]))
            .collect();
        RoomId::new(id)
    }
}

/// Factory for generating SessionId instances.
pub struct SessionIdFactory;

impl SessionIdFactory {
    /// Generate a new SessionId with a random UUID v4 (simple format).
    pub fn generate() -> SessionId {
        SessionId::from(uuid::Uuid::new_v4())
    }
}
