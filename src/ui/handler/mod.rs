//! Request handlers.

mod http;
mod websocket;

pub use http::{create_room, get_room_logs, get_rooms, get_stats, health_check};
pub use websocket::websocket_handler;
