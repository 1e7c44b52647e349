//! UseCase 層
//!
//! ルームごとのコーディネーター（状態の唯一の所有者）と、
//! ルーム ID からコーディネーターを引くレジストリを提供します。

pub mod coordinator;
pub mod error;
pub mod registry;

pub use coordinator::{RoomCommand, RoomCoordinator, RoomHandle};
pub use error::CoordinatorError;
pub use registry::{
    DEFAULT_IDLE_GRACE, PusherFactory, RegistryConfig, RegistryStats, RoomRegistry,
};
