//! Shared draw room server library.
//!
//! Participants join a room over WebSocket and share coin flips, number
//! draws and list draws; every result is broadcast to the whole room.

// layers
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;

// shared library
pub mod common;
