use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    api::error,
    modules::{
        conversation::{
            repository_memory::{ConversationDocument, ConversationRepositoryMemory},
            schema::ConversationEntity,
        },
        message::{
            model::InsertMessage,
            repository::MessageRepository,
            schema::{MessageEntity, StoredStatus},
        },
    },
};

fn refresh_preview(doc: &mut ConversationDocument) {
    let last = doc.messages.last();
    doc.conversation.last_message_preview = last.map(MessageEntity::preview);
    doc.conversation.last_message_at = last.map(|m| m.created_at);
}

fn find_message<'a>(
    doc: &'a mut ConversationDocument,
    message_id: &Uuid,
) -> Result<&'a mut MessageEntity, error::SystemError> {
    doc.messages
        .iter_mut()
        .find(|m| m.id == *message_id)
        .ok_or_else(|| error::SystemError::not_found("Message not found"))
}

#[async_trait::async_trait]
impl MessageRepository for ConversationRepositoryMemory {
    async fn append(
        &self,
        conversation_id: &Uuid,
        message: &InsertMessage,
    ) -> Result<MessageEntity, error::SystemError> {
        let doc = self.require_document(conversation_id).await?;
        let mut doc = doc.lock().await;
        doc.conversation.require_participant(&message.sender)?;

        let created_at = match doc.messages.last() {
            Some(last) if last.created_at > message.created_at => last.created_at,
            _ => message.created_at,
        };
        let entity = MessageEntity {
            id: Uuid::now_v7(),
            conversation_id: *conversation_id,
            seq: doc.next_seq,
            sender: message.sender.clone(),
            text: message.text.clone(),
            attachment: message.attachment.clone(),
            status: StoredStatus::Sent,
            reactions: Vec::new(),
            created_at,
        };

        doc.next_seq += 1;
        doc.messages.push(entity.clone());
        refresh_preview(&mut doc);
        doc.conversation.updated_at = message.created_at;
        doc.conversation.apply_typing(&message.sender, false);
        Ok(entity)
    }

    async fn delete(
        &self,
        conversation_id: &Uuid,
        message_id: &Uuid,
        requester: &str,
        at: DateTime<Utc>,
    ) -> Result<(), error::SystemError> {
        let doc = self.require_document(conversation_id).await?;
        let mut doc = doc.lock().await;

        let message = find_message(&mut doc, message_id)?;
        if message.sender != requester {
            return Err(error::SystemError::permission_denied(
                "Only the sender can delete this message",
            ));
        }

        doc.messages.retain(|m| m.id != *message_id);
        refresh_preview(&mut doc);
        doc.conversation.updated_at = at;
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
        let doc = self.require_document(conversation_id).await?;
        let mut doc = doc.lock().await;
        doc.conversation.require_participant(identity)?;

        let message = find_message(&mut doc, message_id)?;
        let changed = message.add_reaction(identity, emoji, at);
        let message = message.clone();
        if changed {
            doc.conversation.updated_at = at;
        }
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
        let doc = self.require_document(conversation_id).await?;
        let mut doc = doc.lock().await;
        doc.conversation.require_participant(identity)?;

        let message = find_message(&mut doc, message_id)?;
        let changed = message.remove_reaction(identity, emoji);
        let message = message.clone();
        if changed {
            doc.conversation.updated_at = at;
        }
        Ok(message)
    }

    async fn read_marking_seen(
        &self,
        conversation_id: &Uuid,
        reader: &str,
    ) -> Result<(ConversationEntity, Vec<MessageEntity>), error::SystemError> {
        let doc = self.require_document(conversation_id).await?;
        let mut doc = doc.lock().await;
        doc.conversation.require_participant(reader)?;

        for message in doc.messages.iter_mut() {
            if message.sender != reader && message.status == StoredStatus::Sent {
                message.status = StoredStatus::Seen;
            }
        }
        Ok((doc.conversation.clone(), doc.messages.clone()))
    }
}
