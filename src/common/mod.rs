//! Utilities shared by the server binary and the library.

pub mod logger;
pub mod time;
