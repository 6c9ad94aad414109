//! The messaging-transport seam.
//!
//! The core asks the chat platform for exactly two things: deleting a
//! stale result message and delivering a file. Everything else the
//! transport does (sending, editing, keyboards) stays on its side.

use async_trait::async_trait;

use crate::error::ServiceError;
use crate::types::{FileRef, MessageRef, UserId};

/// Narrow contract against the chat transport.
#[async_trait]
pub trait Messenger: Send + Sync + 'static {
    /// Deletes a chat message. Implementations must treat an already-gone
    /// message as success; the core only ever calls this best-effort.
    async fn delete_message(&self, message: MessageRef) -> Result<(), ServiceError>;

    /// Delivers a file to a user.
    async fn send_file(&self, user_id: UserId, file: FileRef) -> Result<(), ServiceError>;
}
