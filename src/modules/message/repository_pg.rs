use chrono::{DateTime, Utc};
use sqlx::prelude::FromRow;
use std::collections::HashMap;
use uuid::Uuid;

use crate::{
    api::error,
    modules::{
        conversation::{repository_pg::lock_conversation, schema::ConversationEntity},
        message::{
            model::InsertMessage,
            repository::MessageRepository,
            schema::{Attachment, AttachmentKind, MessageEntity, ReactionEntity, StoredStatus},
        },
    },
};

#[derive(FromRow)]
struct MessageRow {
    id: Uuid,
    conversation_id: Uuid,
    seq: i64,
    sender: String,
    text: String,
    attachment_url: Option<String>,
    attachment_kind: Option<AttachmentKind>,
    attachment_name: Option<String>,
    status: StoredStatus,
    created_at: DateTime<Utc>,
}

impl MessageRow {
    fn into_entity(self, reactions: Vec<ReactionEntity>) -> MessageEntity {
        let attachment = match (self.attachment_url, self.attachment_kind) {
            (Some(url), Some(kind)) => Some(Attachment {
                url,
                kind,
                original_name: self.attachment_name.unwrap_or_default(),
            }),
            _ => None,
        };

        MessageEntity {
            id: self.id,
            conversation_id: self.conversation_id,
            seq: self.seq,
            sender: self.sender,
            text: self.text,
            attachment,
            status: self.status,
            reactions,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct ReactionRow {
    message_id: Uuid,
    emoji: String,
    identity: String,
    created_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct MessageRepositoryPg {
    pool: sqlx::PgPool,
}

impl MessageRepositoryPg {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

async fn fetch_messages(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    conversation_id: &Uuid,
) -> Result<Vec<MessageEntity>, error::SystemError> {
    let rows = sqlx::query_as::<_, MessageRow>(
        "SELECT * FROM messages WHERE conversation_id = $1 ORDER BY seq ASC",
    )
    .bind(conversation_id)
    .fetch_all(tx.as_mut())
    .await?;

    let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
    let reactions = fetch_reactions(tx, &ids).await?;
    Ok(attach_reactions(rows, reactions))
}

async fn fetch_message(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    conversation_id: &Uuid,
    message_id: &Uuid,
) -> Result<MessageEntity, error::SystemError> {
    let row = sqlx::query_as::<_, MessageRow>(
        "SELECT * FROM messages WHERE id = $1 AND conversation_id = $2",
    )
    .bind(message_id)
    .bind(conversation_id)
    .fetch_optional(tx.as_mut())
    .await?
    .ok_or_else(|| error::SystemError::not_found("Message not found"))?;

    let reactions = fetch_reactions(tx, &[row.id]).await?;
    Ok(attach_reactions(vec![row], reactions).remove(0))
}

async fn fetch_reactions(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    message_ids: &[Uuid],
) -> Result<Vec<ReactionRow>, error::SystemError> {
    if message_ids.is_empty() {
        return Ok(vec![]);
    }

    let rows = sqlx::query_as::<_, ReactionRow>(
        r#"
        SELECT message_id, emoji, identity, created_at
        FROM message_reactions
        WHERE message_id = ANY($1)
        ORDER BY created_at ASC, identity ASC, emoji ASC
        "#,
    )
    .bind(message_ids)
    .fetch_all(tx.as_mut())
    .await?;
    Ok(rows)
}

fn attach_reactions(rows: Vec<MessageRow>, reactions: Vec<ReactionRow>) -> Vec<MessageEntity> {
    let mut by_message: HashMap<Uuid, Vec<ReactionEntity>> = HashMap::new();
    for r in reactions {
        by_message.entry(r.message_id).or_default().push(ReactionEntity {
            emoji: r.emoji,
            identity: r.identity,
            created_at: r.created_at,
        });
    }

    rows.into_iter()
        .map(|row| {
            let reactions = by_message.remove(&row.id).unwrap_or_default();
            row.into_entity(reactions)
        })
        .collect()
}

/// Rewrites the preview columns from the current last message.
async fn refresh_preview(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    conversation_id: &Uuid,
    updated_at: DateTime<Utc>,
) -> Result<(), error::SystemError> {
    let last = sqlx::query_as::<_, MessageRow>(
        "SELECT * FROM messages WHERE conversation_id = $1 ORDER BY seq DESC LIMIT 1",
    )
    .bind(conversation_id)
    .fetch_optional(tx.as_mut())
    .await?
    .map(|row| row.into_entity(vec![]));

    sqlx::query(
        r#"
        UPDATE conversations
        SET last_message_preview = $2, last_message_at = $3, updated_at = $4
        WHERE id = $1
        "#,
    )
    .bind(conversation_id)
    .bind(last.as_ref().map(MessageEntity::preview))
    .bind(last.as_ref().map(|m| m.created_at))
    .bind(updated_at)
    .execute(tx.as_mut())
    .await?;
    Ok(())
}

async fn touch(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    conversation_id: &Uuid,
    at: DateTime<Utc>,
) -> Result<(), error::SystemError> {
    sqlx::query("UPDATE conversations SET updated_at = $2 WHERE id = $1")
        .bind(conversation_id)
        .bind(at)
        .execute(tx.as_mut())
        .await?;
    Ok(())
}

#[async_trait::async_trait]
impl MessageRepository for MessageRepositoryPg {
    async fn append(
        &self,
        conversation_id: &Uuid,
        message: &InsertMessage,
    ) -> Result<MessageEntity, error::SystemError> {
        let mut tx = self.pool.begin().await?;

        let mut conversation = lock_conversation(&mut tx, conversation_id).await?;
        conversation.require_participant(&message.sender)?;
        conversation.apply_typing(&message.sender, false);

        let seq: i64 = sqlx::query_scalar(
            "UPDATE conversations SET next_seq = next_seq + 1 WHERE id = $1 RETURNING next_seq - 1",
        )
        .bind(conversation_id)
        .fetch_one(tx.as_mut())
        .await?;

        let row = sqlx::query_as::<_, MessageRow>(
            r#"
            INSERT INTO messages
                (id, conversation_id, seq, sender, text, attachment_url, attachment_kind, attachment_name, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'sent',
                GREATEST($9, COALESCE((SELECT MAX(created_at) FROM messages WHERE conversation_id = $2), $9)))
            RETURNING *
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(conversation_id)
        .bind(seq)
        .bind(&message.sender)
        .bind(&message.text)
        .bind(message.attachment.as_ref().map(|a| a.url.clone()))
        .bind(message.attachment.as_ref().map(|a| a.kind))
        .bind(message.attachment.as_ref().map(|a| a.original_name.clone()))
        .bind(message.created_at)
        .fetch_one(tx.as_mut())
        .await?;
        let entity = row.into_entity(vec![]);

        sqlx::query(
            r#"
            UPDATE conversations
            SET last_message_preview = $2, last_message_at = $3, updated_at = $4, typing_users = $5
            WHERE id = $1
            "#,
        )
        .bind(conversation_id)
        .bind(entity.preview())
        .bind(entity.created_at)
        .bind(message.created_at)
        .bind(&conversation.typing_users)
        .execute(tx.as_mut())
        .await?;

        tx.commit().await?;
        Ok(entity)
    }

    async fn delete(
        &self,
        conversation_id: &Uuid,
        message_id: &Uuid,
        requester: &str,
        at: DateTime<Utc>,
    ) -> Result<(), error::SystemError> {
        let mut tx = self.pool.begin().await?;

        lock_conversation(&mut tx, conversation_id).await?;
        let message = fetch_message(&mut tx, conversation_id, message_id).await?;
        if message.sender != requester {
            return Err(error::SystemError::permission_denied(
                "Only the sender can delete this message",
            ));
        }

        sqlx::query("DELETE FROM messages WHERE id = $1")
            .bind(message_id)
            .execute(tx.as_mut())
            .await?;
        refresh_preview(&mut tx, conversation_id, at).await?;

        tx.commit().await?;
        Ok(())
    }

    async fn add_reaction(
        &self,
        conversation_id: &Uuid,
        message_id: &Uuid,
        identity: &str,
        emoji: &str,
        at: DateTime<Utc>,
    ) -> Result<MessageEntity, error::SystemError> {
        let mut tx = self.pool.begin().await?;

        let conversation = lock_conversation(&mut tx, conversation_id).await?;
        conversation.require_participant(identity)?;
        fetch_message(&mut tx, conversation_id, message_id).await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO message_reactions (message_id, identity, emoji, created_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (message_id, identity, emoji) DO NOTHING
            "#,
        )
        .bind(message_id)
        .bind(identity)
        .bind(emoji)
        .bind(at)
        .execute(tx.as_mut())
        .await?;
        if inserted.rows_affected() > 0 {
            touch(&mut tx, conversation_id, at).await?;
        }

        let message = fetch_message(&mut tx, conversation_id, message_id).await?;
        tx.commit().await?;
        Ok(message)
    }

    async fn remove_reaction(
        &self,
        conversation_id: &Uuid,
        message_id: &Uuid,
        identity: &str,
        emoji: &str,
        at: DateTime<Utc>,
    ) -> Result<MessageEntity, error::SystemError> {
        let mut tx = self.pool.begin().await?;

        let conversation = lock_conversation(&mut tx, conversation_id).await?;
        conversation.require_participant(identity)?;
        fetch_message(&mut tx, conversation_id, message_id).await?;

        let removed = sqlx::query(
            "DELETE FROM message_reactions WHERE message_id = $1 AND identity = $2 AND emoji = $3",
        )
        .bind(message_id)
        .bind(identity)
        .bind(emoji)
        .execute(tx.as_mut())
        .await?;
        if removed.rows_affected() > 0 {
            touch(&mut tx, conversation_id, at).await?;
        }

        let message = fetch_message(&mut tx, conversation_id, message_id).await?;
        tx.commit().await?;
        Ok(message)
    }

    async fn read_marking_seen(
        &self,
        conversation_id: &Uuid,
        reader: &str,
    ) -> Result<(ConversationEntity, Vec<MessageEntity>), error::SystemError> {
        let mut tx = self.pool.begin().await?;

        let conversation = lock_conversation(&mut tx, conversation_id).await?;
        conversation.require_participant(reader)?;

        sqlx::query(
            r#"
            UPDATE messages
            SET status = 'seen'
            WHERE conversation_id = $1 AND sender <> $2 AND status = 'sent'
            "#,
        )
        .bind(conversation_id)
        .bind(reader)
        .execute(tx.as_mut())
        .await?;

        let messages = fetch_messages(&mut tx, conversation_id).await?;
        tx.commit().await?;
        Ok((conversation, messages))
    }
}
