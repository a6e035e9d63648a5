use std::{collections::HashMap, sync::Arc};
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::{
    api::error,
    modules::{
        conversation::{
            model::NewConversation, repository::ConversationRepository,
            schema::ConversationEntity,
        },
        message::schema::MessageEntity,
    },
};

/// A conversation together with its append-ordered message log.
pub struct ConversationDocument {
    pub conversation: ConversationEntity,
    pub messages: Vec<MessageEntity>,
    pub next_seq: i64,
}

pub type SharedDocument = Arc<Mutex<ConversationDocument>>;

/// In-process store. Each conversation document sits behind its own mutex,
/// so operations on one conversation serialize without blocking the others.
#[derive(Default)]
pub struct ConversationRepositoryMemory {
    documents: RwLock<HashMap<Uuid, SharedDocument>>,
    direct_index: Mutex<HashMap<String, Uuid>>,
}

impl ConversationRepositoryMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn document(&self, conversation_id: &Uuid) -> Option<SharedDocument> {
        self.documents.read().await.get(conversation_id).cloned()
    }

    pub async fn require_document(
        &self,
        conversation_id: &Uuid,
    ) -> Result<SharedDocument, error::SystemError> {
        self.document(conversation_id)
            .await
            .ok_or_else(|| error::SystemError::not_found("Conversation not found"))
    }

    async fn insert(&self, conversation: &NewConversation) -> ConversationEntity {
        let entity = ConversationEntity {
            id: Uuid::now_v7(),
            _type: conversation._type,
            participants: conversation.participants.clone(),
            name: conversation.name.clone(),
            avatar_color: conversation.avatar_color.clone(),
            typing_users: Vec::new(),
            direct_key: conversation.direct_key.clone(),
            last_message_preview: None,
            last_message_at: None,
            created_at: conversation.created_at,
            updated_at: conversation.created_at,
        };
        let doc = ConversationDocument {
            conversation: entity.clone(),
            messages: Vec::new(),
            next_seq: 1,
        };
        self.documents.write().await.insert(entity.id, Arc::new(Mutex::new(doc)));
        entity
    }
}

#[async_trait::async_trait]
impl ConversationRepository for ConversationRepositoryMemory {
    async fn find_by_id(
        &self,
        conversation_id: &Uuid,
    ) -> Result<Option<ConversationEntity>, error::SystemError> {
        match self.document(conversation_id).await {
            Some(doc) => Ok(Some(doc.lock().await.conversation.clone())),
            None => Ok(None),
        }
    }

    async fn find_by_participant(
        &self,
        identity: &str,
    ) -> Result<Vec<ConversationEntity>, error::SystemError> {
        let docs: Vec<SharedDocument> = self.documents.read().await.values().cloned().collect();

        let mut result = Vec::new();
        for doc in docs {
            let doc = doc.lock().await;
            if doc.conversation.is_participant(identity) {
                result.push(doc.conversation.clone());
            }
        }
        result.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then_with(|| b.id.cmp(&a.id)));
        Ok(result)
    }

    async fn create_group(
        &self,
        conversation: &NewConversation,
    ) -> Result<ConversationEntity, error::SystemError> {
        Ok(self.insert(conversation).await)
    }

    async fn find_or_create_direct(
        &self,
        conversation: &NewConversation,
    ) -> Result<(ConversationEntity, bool), error::SystemError> {
        let key = conversation
            .direct_key
            .clone()
            .ok_or_else(|| error::SystemError::invalid_operation("Direct key is required"))?;

        // Held across lookup and insert so concurrent callers agree on one id.
        let mut index = self.direct_index.lock().await;
        if let Some(id) = index.get(&key) {
            if let Some(doc) = self.document(id).await {
                return Ok((doc.lock().await.conversation.clone(), false));
            }
        }

        let entity = self.insert(conversation).await;
        index.insert(key, entity.id);
        Ok((entity, true))
    }

    async fn set_typing(
        &self,
        conversation_id: &Uuid,
        identity: &str,
        is_typing: bool,
    ) -> Result<(), error::SystemError> {
        let doc = self.require_document(conversation_id).await?;
        let mut doc = doc.lock().await;
        doc.conversation.require_participant(identity)?;
        doc.conversation.apply_typing(identity, is_typing);
        Ok(())
    }

    async fn add_member(
        &self,
        conversation_id: &Uuid,
        requester: &str,
        member: &str,
    ) -> Result<ConversationEntity, error::SystemError> {
        let doc = self.require_document(conversation_id).await?;
        let mut doc = doc.lock().await;
        doc.conversation.apply_new_member(requester, member)?;
        Ok(doc.conversation.clone())
    }
}
