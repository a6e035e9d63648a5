use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::{FromRow, Type};
use uuid::Uuid;

use crate::api::error;

#[derive(Debug, PartialEq, Eq, Clone, Copy, Type, Serialize, Deserialize)]
#[sqlx(type_name = "conversation_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ConversationType {
    Direct,
    Group,
}

#[derive(Debug, Clone, FromRow)]
pub struct ConversationEntity {
    pub id: Uuid,
    #[sqlx(rename = "type")]
    pub _type: ConversationType,
    /// Ordered by join time; direct conversations hold exactly two.
    pub participants: Vec<String>,
    pub name: String,
    pub avatar_color: String,
    pub typing_users: Vec<String>,
    pub direct_key: Option<String>,
    pub last_message_preview: Option<String>,
    pub last_message_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ConversationEntity {
    pub fn is_participant(&self, identity: &str) -> bool {
        self.participants.iter().any(|p| p == identity)
    }

    pub fn other_participants<'a>(&'a self, identity: &'a str) -> impl Iterator<Item = &'a String> {
        self.participants.iter().filter(move |p| p.as_str() != identity)
    }

    pub fn require_participant(&self, identity: &str) -> Result<(), error::SystemError> {
        if self.is_participant(identity) {
            Ok(())
        } else {
            Err(error::SystemError::permission_denied("Not a participant of this conversation"))
        }
    }

    /// Membership only grows, and only in groups.
    pub fn apply_new_member(&mut self, requester: &str, member: &str) -> Result<bool, error::SystemError> {
        self.require_participant(requester)?;
        if self._type == ConversationType::Direct {
            return Err(error::SystemError::invalid_operation(
                "Direct conversations have a fixed participant pair",
            ));
        }
        if self.is_participant(member) {
            return Ok(false);
        }
        self.participants.push(member.to_string());
        Ok(true)
    }

    /// Set semantics: adding twice keeps one entry, removing an absent identity is a no-op.
    pub fn apply_typing(&mut self, identity: &str, is_typing: bool) {
        if is_typing {
            if !self.typing_users.iter().any(|u| u == identity) {
                self.typing_users.push(identity.to_string());
            }
        } else {
            self.typing_users.retain(|u| u != identity);
        }
    }
}

/// Unique key of an unordered identity pair.
pub fn direct_key(a: &str, b: &str) -> String {
    if a <= b {
        format!("{a} {b}")
    } else {
        format!("{b} {a}")
    }
}
