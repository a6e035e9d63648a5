use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::modules::{
    message::schema::Attachment, presence::model::PresenceLabel, user::schema::DisplayInfo,
};

pub struct InsertMessage {
    pub sender: String,
    pub text: String,
    pub attachment: Option<Attachment>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SendMessageModel {
    #[serde(default)]
    #[validate(length(max = 4000, message = "Message is too long"))]
    pub text: String,
    pub attachment: Option<Attachment>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ReactionModel {
    #[validate(length(min = 1, max = 32, message = "Emoji is required"))]
    pub emoji: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Sent,
    Delivered,
    Seen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SenderLabel {
    Me,
    Them,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionSummary {
    pub emoji: String,
    pub count: usize,
    pub reacted_by_me: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageView {
    pub id: Uuid,
    pub seq: i64,
    pub sender: SenderLabel,
    pub sender_identity: String,
    pub sender_display: DisplayInfo,
    pub text: String,
    pub attachment: Option<Attachment>,
    pub created_at: DateTime<Utc>,
    pub status: MessageStatus,
    pub reactions: Vec<ReactionSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantView {
    pub identity: String,
    pub display: DisplayInfo,
    pub is_me: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantStatus {
    pub identity: String,
    pub last_active_at: Option<DateTime<Utc>>,
    pub online: bool,
}

/// Everything a poll needs to render one conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadSnapshot {
    pub conversation_id: Uuid,
    pub messages: Vec<MessageView>,
    /// Display names of other participants currently typing.
    pub typing: Vec<String>,
    pub participants: Vec<ParticipantView>,
    /// Presence of everyone except the requester.
    pub participants_status: Vec<ParticipantStatus>,
    pub presence: PresenceLabel,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentMessageResponse {
    pub id: Uuid,
    pub seq: i64,
    pub created_at: DateTime<Utc>,
    pub status: MessageStatus,
}
