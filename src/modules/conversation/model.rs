use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::modules::conversation::schema::ConversationType;

pub struct NewConversation {
    pub _type: ConversationType,
    pub participants: Vec<String>,
    pub name: String,
    pub avatar_color: String,
    pub direct_key: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateGroupModel {
    #[validate(length(min = 1, max = 100, message = "Group name must be 1-100 characters"))]
    pub name: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateDirectModel {
    #[validate(length(min = 1, message = "Target identity is required"))]
    pub identity: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AddMemberModel {
    #[validate(length(min = 1, message = "Member identity is required"))]
    pub identity: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct TypingModel {
    pub is_typing: bool,
}

/// One row of the conversation list as the requester sees it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub _type: ConversationType,
    pub name: String,
    pub avatar_color: String,
    pub avatar_url: Option<String>,
    pub participants: Vec<String>,
    pub last_message_preview: Option<String>,
    pub last_message_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectConversationResponse {
    pub conversation: ConversationSummary,
    pub created: bool,
}
