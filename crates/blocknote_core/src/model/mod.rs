//! Note content domain model.
//!
//! # Responsibility
//! - Define the canonical note and content-block structures.
//! - Keep block kinds a closed set so every consumer matches exhaustively.
//!
//! # Invariants
//! - Every note and block is identified by a non-nil UUID.
//! - A block never changes kind after construction.

pub mod block;
pub mod note;

/// Current wall-clock time in Unix epoch milliseconds.
pub fn now_epoch_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
