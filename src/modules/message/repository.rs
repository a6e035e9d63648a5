use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    api::error,
    modules::{
        conversation::schema::ConversationEntity,
        message::{model::InsertMessage, schema::MessageEntity},
    },
};

/// Message log operations. Each call runs as one atomic unit against its
/// conversation: the log, the preview fields and `typing_users` change together.
#[async_trait::async_trait]
pub trait MessageRepository {
    /// Assigns `seq`, clamps `created_at` to the last message, stores `sent`,
    /// refreshes the preview, bumps `updated_at` and clears the sender's typing flag.
    async fn append(
        &self,
        conversation_id: &Uuid,
        message: &InsertMessage,
    ) -> Result<MessageEntity, error::SystemError>;

    /// Sender only. Recomputes the preview from the new last message.
    async fn delete(
        &self,
        conversation_id: &Uuid,
        message_id: &Uuid,
        requester: &str,
        at: DateTime<Utc>,
    ) -> Result<(), error::SystemError>;

    async fn add_reaction(
        &self,
        conversation_id: &Uuid,
        message_id: &Uuid,
        identity: &str,
        emoji: &str,
        at: DateTime<Utc>,
    ) -> Result<MessageEntity, error::SystemError>;

    async fn remove_reaction(
        &self,
        conversation_id: &Uuid,
        message_id: &Uuid,
        identity: &str,
        emoji: &str,
        at: DateTime<Utc>,
    ) -> Result<MessageEntity, error::SystemError>;

    /// Marks every `sent` message from someone other than `reader` as `seen`
    /// and returns the conversation and its log as they are after that write.
    async fn read_marking_seen(
        &self,
        conversation_id: &Uuid,
        reader: &str,
    ) -> Result<(ConversationEntity, Vec<MessageEntity>), error::SystemError>;
}
