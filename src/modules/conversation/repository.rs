use uuid::Uuid;

use crate::{
    api::error,
    modules::conversation::{model::NewConversation, schema::ConversationEntity},
};

/// Every mutating call is atomic per conversation.
#[async_trait::async_trait]
pub trait ConversationRepository {
    async fn find_by_id(
        &self,
        conversation_id: &Uuid,
    ) -> Result<Option<ConversationEntity>, error::SystemError>;

    /// Most recently updated first.
    async fn find_by_participant(
        &self,
        identity: &str,
    ) -> Result<Vec<ConversationEntity>, error::SystemError>;

    async fn create_group(
        &self,
        conversation: &NewConversation,
    ) -> Result<ConversationEntity, error::SystemError>;

    /// Returns the existing conversation for `direct_key` if there is one.
    /// The flag is true only when this call inserted the row.
    async fn find_or_create_direct(
        &self,
        conversation: &NewConversation,
    ) -> Result<(ConversationEntity, bool), error::SystemError>;

    async fn set_typing(
        &self,
        conversation_id: &Uuid,
        identity: &str,
        is_typing: bool,
    ) -> Result<(), error::SystemError>;

    /// Group only. Adding an existing member is a no-op.
    async fn add_member(
        &self,
        conversation_id: &Uuid,
        requester: &str,
        member: &str,
    ) -> Result<ConversationEntity, error::SystemError>;
}
