//! UseCase 層のエラー定義

use thiserror::Error;

/// ルームコーディネーターとのやり取りで発生するエラー
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoordinatorError {
    /// コーディネーターが停止済み（アイドル猶予期間の経過など）
    #[error("Coordinator for room '{0}' has shut down")]
    Closed(String),
}
