use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::{FromRow, Type};
use uuid::Uuid;

use crate::constants::{ATTACHMENT_FALLBACK_CAPTION, ATTACHMENT_MARKER};

#[derive(Debug, PartialEq, Eq, Clone, Copy, Type, Serialize, Deserialize)]
#[sqlx(type_name = "attachment_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AttachmentKind {
    Image,
    File,
}

impl AttachmentKind {
    pub fn from_mime(mime: &str) -> Self {
        if mime.starts_with("image/") {
            AttachmentKind::Image
        } else {
            AttachmentKind::File
        }
    }
}

/// Reference to an already-stored file.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct Attachment {
    pub url: String,
    pub kind: AttachmentKind,
    pub original_name: String,
}

/// Only `sent` and `seen` are ever written; `delivered` exists at read time.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Type, Serialize, Deserialize)]
#[sqlx(type_name = "message_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum StoredStatus {
    Sent,
    Seen,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct ReactionEntity {
    pub emoji: String,
    pub identity: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct MessageEntity {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub seq: i64,
    pub sender: String,
    pub text: String,
    pub attachment: Option<Attachment>,
    pub status: StoredStatus,
    pub reactions: Vec<ReactionEntity>,
    pub created_at: DateTime<Utc>,
}

impl MessageEntity {
    pub fn preview(&self) -> String {
        preview_text(&self.text, self.attachment.as_ref())
    }

    /// Dedup per (identity, emoji). Returns false when nothing changed.
    pub fn add_reaction(&mut self, identity: &str, emoji: &str, at: DateTime<Utc>) -> bool {
        if self.reactions.iter().any(|r| r.identity == identity && r.emoji == emoji) {
            return false;
        }
        self.reactions.push(ReactionEntity {
            emoji: emoji.to_string(),
            identity: identity.to_string(),
            created_at: at,
        });
        true
    }

    pub fn remove_reaction(&mut self, identity: &str, emoji: &str) -> bool {
        let before = self.reactions.len();
        self.reactions.retain(|r| !(r.identity == identity && r.emoji == emoji));
        self.reactions.len() != before
    }
}

/// Conversation list preview of a message.
pub fn preview_text(text: &str, attachment: Option<&Attachment>) -> String {
    match attachment {
        Some(_) => {
            let caption = text.trim();
            let caption = if caption.is_empty() { ATTACHMENT_FALLBACK_CAPTION } else { caption };
            format!("{ATTACHMENT_MARKER} {caption}")
        }
        None => text.to_string(),
    }
}
