//! HTTP / WebSocket server for draw rooms.

mod handler;
mod server;
mod signal;
pub mod state;

pub use server::Server;
