//! Infrastructure 層
//!
//! DTO の定義と、ドメイン層が定義する trait の具体的な実装を提供します。

pub mod dto;
pub mod message_pusher;
