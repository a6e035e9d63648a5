use uuid::Uuid;

use crate::{
    api::error,
    modules::conversation::{
        model::NewConversation, repository::ConversationRepository, schema::ConversationEntity,
    },
};

#[derive(Clone)]
pub struct ConversationRepositoryPg {
    pool: sqlx::PgPool,
}

impl ConversationRepositoryPg {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

/// Loads the conversation row and holds its lock until the transaction ends.
pub async fn lock_conversation(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    conversation_id: &Uuid,
) -> Result<ConversationEntity, error::SystemError> {
    sqlx::query_as::<_, ConversationEntity>("SELECT * FROM conversations WHERE id = $1 FOR UPDATE")
        .bind(conversation_id)
        .fetch_optional(tx.as_mut())
        .await?
        .ok_or_else(|| error::SystemError::not_found("Conversation not found"))
}

#[async_trait::async_trait]
impl ConversationRepository for ConversationRepositoryPg {
    async fn find_by_id(
        &self,
        conversation_id: &Uuid,
    ) -> Result<Option<ConversationEntity>, error::SystemError> {
        let conversation =
            sqlx::query_as::<_, ConversationEntity>("SELECT * FROM conversations WHERE id = $1")
                .bind(conversation_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(conversation)
    }

    async fn find_by_participant(
        &self,
        identity: &str,
    ) -> Result<Vec<ConversationEntity>, error::SystemError> {
        let conversations = sqlx::query_as::<_, ConversationEntity>(
            r#"
            SELECT *
            FROM conversations
            WHERE $1 = ANY(participants)
            ORDER BY updated_at DESC, id DESC
            "#,
        )
        .bind(identity)
        .fetch_all(&self.pool)
        .await?;

        Ok(conversations)
    }

    async fn create_group(
        &self,
        conversation: &NewConversation,
    ) -> Result<ConversationEntity, error::SystemError> {
        let entity = sqlx::query_as::<_, ConversationEntity>(
            r#"
            INSERT INTO conversations (id, type, participants, name, avatar_color, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $6)
            RETURNING *
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(conversation._type)
        .bind(&conversation.participants)
        .bind(&conversation.name)
        .bind(&conversation.avatar_color)
        .bind(conversation.created_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(entity)
    }

    async fn find_or_create_direct(
        &self,
        conversation: &NewConversation,
    ) -> Result<(ConversationEntity, bool), error::SystemError> {
        let inserted = sqlx::query_as::<_, ConversationEntity>(
            r#"
            INSERT INTO conversations (id, type, participants, name, avatar_color, direct_key, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
            ON CONFLICT (direct_key) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(conversation._type)
        .bind(&conversation.participants)
        .bind(&conversation.name)
        .bind(&conversation.avatar_color)
        .bind(&conversation.direct_key)
        .bind(conversation.created_at)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(entity) = inserted {
            return Ok((entity, true));
        }

        let existing = sqlx::query_as::<_, ConversationEntity>(
            "SELECT * FROM conversations WHERE direct_key = $1",
        )
        .bind(&conversation.direct_key)
        .fetch_one(&self.pool)
        .await?;

        Ok((existing, false))
    }

    async fn set_typing(
        &self,
        conversation_id: &Uuid,
        identity: &str,
        is_typing: bool,
    ) -> Result<(), error::SystemError> {
        let mut tx = self.pool.begin().await?;

        let mut conversation = lock_conversation(&mut tx, conversation_id).await?;
        conversation.require_participant(identity)?;
        conversation.apply_typing(identity, is_typing);

        sqlx::query("UPDATE conversations SET typing_users = $2 WHERE id = $1")
            .bind(conversation_id)
            .bind(&conversation.typing_users)
            .execute(tx.as_mut())
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn add_member(
        &self,
        conversation_id: &Uuid,
        requester: &str,
        member: &str,
    ) -> Result<ConversationEntity, error::SystemError> {
        let mut tx = self.pool.begin().await?;

        let mut conversation = lock_conversation(&mut tx, conversation_id).await?;
        if conversation.apply_new_member(requester, member)? {
            sqlx::query("UPDATE conversations SET participants = $2 WHERE id = $1")
                .bind(conversation_id)
                .bind(&conversation.participants)
                .execute(tx.as_mut())
                .await?;
        }

        tx.commit().await?;
        Ok(conversation)
    }
}
