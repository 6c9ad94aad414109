//! Log-only messenger for standalone runs.
//!
//! A real chat adapter implements `Messenger` against its platform API.
//! This one just records what would have happened, which is all the host
//! needs when no transport is wired in.

use async_trait::async_trait;

use biblio_service::error::ServiceError;
use biblio_service::messenger::Messenger;
use biblio_service::types::{FileRef, MessageRef, UserId};

/// Messenger that logs every call and always succeeds.
pub struct LogMessenger;

#[async_trait]
impl Messenger for LogMessenger {
    async fn delete_message(&self, message: MessageRef) -> Result<(), ServiceError> {
        tracing::info!(
            chat_id = message.chat_id,
            message_id = message.message_id,
            "would delete message",
        );
        Ok(())
    }

    async fn send_file(&self, user_id: UserId, file: FileRef) -> Result<(), ServiceError> {
        tracing::info!(user_id, file = %file.0, "would send file");
        Ok(())
    }
}
