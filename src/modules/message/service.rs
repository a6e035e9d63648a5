/// Message Service
///
/// Service layer xử lý business logic cho messages, bao gồm:
/// - Gửi tin nhắn (text và/hoặc attachment đã upload sẵn)
/// - Xóa tin nhắn (chỉ người gửi) và reaction
/// - Đọc hội thoại cho vòng poll: đánh dấu `seen` và tính trạng thái tin nhắn
///
/// Trạng thái hiển thị được tính ở mỗi lần đọc theo thứ tự ưu tiên `seen > delivered > sent`.
/// `delivered` chỉ là suy đoán từ `last_active_at` của người nhận, không bao giờ được lưu.
use chrono::{DateTime, Utc};
use log::info;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::api::error;
use crate::modules::message::{
    model::{
        InsertMessage, MessageStatus, MessageView, ParticipantStatus, ParticipantView,
        ReactionSummary, SenderLabel, ThreadSnapshot,
    },
    repository::MessageRepository,
    schema::{Attachment, MessageEntity, ReactionEntity, StoredStatus},
};
use crate::modules::presence::service::{effective_last_active, is_online, last_seen_label};
use crate::modules::user::repository::UserRepository;
use crate::modules::user::service::{display_info, load_user_map};
use crate::utils::Clock;

/// Display status of a message given the last-active times of everyone but its sender.
pub fn derive_status<I>(message: &MessageEntity, others_last_active: I) -> MessageStatus
where
    I: IntoIterator<Item = Option<DateTime<Utc>>>,
{
    if message.status == StoredStatus::Seen {
        return MessageStatus::Seen;
    }

    let delivered = others_last_active
        .into_iter()
        .filter_map(effective_last_active)
        .any(|at| at > message.created_at);
    if delivered {
        MessageStatus::Delivered
    } else {
        MessageStatus::Sent
    }
}

/// Groups reactions by emoji in order of first use.
pub fn group_reactions(reactions: &[ReactionEntity], requester: &str) -> Vec<ReactionSummary> {
    let mut groups: Vec<ReactionSummary> = Vec::new();
    for reaction in reactions {
        let mine = reaction.identity == requester;
        match groups.iter_mut().find(|g| g.emoji == reaction.emoji) {
            Some(group) => {
                group.count += 1;
                group.reacted_by_me |= mine;
            }
            None => groups.push(ReactionSummary {
                emoji: reaction.emoji.clone(),
                count: 1,
                reacted_by_me: mine,
            }),
        }
    }
    groups
}

#[derive(Clone)]
pub struct MessageService {
    message_repo: Arc<dyn MessageRepository + Send + Sync>,
    user_repo: Arc<dyn UserRepository + Send + Sync>,
    clock: Arc<dyn Clock>,
}

impl MessageService {
    pub fn with_dependencies(
        message_repo: Arc<dyn MessageRepository + Send + Sync>,
        user_repo: Arc<dyn UserRepository + Send + Sync>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        MessageService { message_repo, user_repo, clock }
    }

    pub async fn append(
        &self,
        conversation_id: &Uuid,
        sender: &str,
        text: &str,
        attachment: Option<Attachment>,
    ) -> Result<MessageEntity, error::SystemError> {
        let text = text.trim();
        if text.is_empty() && attachment.is_none() {
            return Err(error::SystemError::invalid_operation(
                "Message must contain text or an attachment",
            ));
        }
        if attachment.as_ref().is_some_and(|a| a.url.trim().is_empty()) {
            return Err(error::SystemError::invalid_operation("Attachment url is required"));
        }

        let message = self
            .message_repo
            .append(
                conversation_id,
                &InsertMessage {
                    sender: sender.to_string(),
                    text: text.to_string(),
                    attachment,
                    created_at: self.clock.now(),
                },
            )
            .await?;

        info!("Message {} appended to {} by {}", message.id, conversation_id, sender);
        Ok(message)
    }

    pub async fn delete(
        &self,
        conversation_id: &Uuid,
        message_id: &Uuid,
        requester: &str,
    ) -> Result<(), error::SystemError> {
        self.message_repo.delete(conversation_id, message_id, requester, self.clock.now()).await?;
        info!("Message {} deleted from {} by {}", message_id, conversation_id, requester);
        Ok(())
    }

    pub async fn add_reaction(
        &self,
        conversation_id: &Uuid,
        message_id: &Uuid,
        identity: &str,
        emoji: &str,
    ) -> Result<Vec<ReactionSummary>, error::SystemError> {
        let emoji = require_emoji(emoji)?;
        let message = self
            .message_repo
            .add_reaction(conversation_id, message_id, identity, emoji, self.clock.now())
            .await?;
        Ok(group_reactions(&message.reactions, identity))
    }

    pub async fn remove_reaction(
        &self,
        conversation_id: &Uuid,
        message_id: &Uuid,
        identity: &str,
        emoji: &str,
    ) -> Result<Vec<ReactionSummary>, error::SystemError> {
        let emoji = require_emoji(emoji)?;
        let message = self
            .message_repo
            .remove_reaction(conversation_id, message_id, identity, emoji, self.clock.now())
            .await?;
        Ok(group_reactions(&message.reactions, identity))
    }

    /// The poll read path. Marks others' messages as seen in the same unit of work
    /// that produces the snapshot.
    pub async fn read(
        &self,
        conversation_id: &Uuid,
        requester: &str,
    ) -> Result<ThreadSnapshot, error::SystemError> {
        let (conversation, messages) =
            self.message_repo.read_marking_seen(conversation_id, requester).await?;

        let mut identities = conversation.participants.clone();
        identities.extend(messages.iter().map(|m| m.sender.clone()));
        identities.sort();
        identities.dedup();
        let users = load_user_map(self.user_repo.as_ref(), &identities).await?;

        let last_active: HashMap<&str, Option<DateTime<Utc>>> = users
            .values()
            .map(|u| (u.email.as_str(), effective_last_active(u.last_active_at)))
            .collect();
        let last_active_of = |identity: &str| last_active.get(identity).copied().flatten();

        let messages = messages
            .into_iter()
            .map(|m| {
                let status = derive_status(
                    &m,
                    conversation.other_participants(&m.sender).map(|p| last_active_of(p.as_str())),
                );
                MessageView {
                    id: m.id,
                    seq: m.seq,
                    sender: if m.sender == requester { SenderLabel::Me } else { SenderLabel::Them },
                    sender_display: display_info(&users, &m.sender),
                    reactions: group_reactions(&m.reactions, requester),
                    sender_identity: m.sender,
                    text: m.text,
                    attachment: m.attachment,
                    created_at: m.created_at,
                    status,
                }
            })
            .collect();

        let typing = conversation
            .typing_users
            .iter()
            .filter(|u| u.as_str() != requester)
            .map(|u| display_info(&users, u).name)
            .collect();

        let participants = conversation
            .participants
            .iter()
            .map(|p| ParticipantView {
                identity: p.clone(),
                display: display_info(&users, p),
                is_me: p == requester,
            })
            .collect();

        let now = self.clock.now();
        let participants_status: Vec<ParticipantStatus> = conversation
            .other_participants(requester)
            .map(|p| {
                let last_active_at = last_active_of(p.as_str());
                ParticipantStatus {
                    identity: p.clone(),
                    last_active_at,
                    online: is_online(last_active_at, now),
                }
            })
            .collect();
        let presence = last_seen_label(participants_status.iter().map(|p| p.last_active_at), now);

        Ok(ThreadSnapshot {
            conversation_id: conversation.id,
            messages,
            typing,
            participants,
            participants_status,
            presence,
        })
    }
}

fn require_emoji(emoji: &str) -> Result<&str, error::SystemError> {
    let emoji = emoji.trim();
    if emoji.is_empty() {
        return Err(error::SystemError::invalid_operation("Emoji cannot be empty"));
    }
    Ok(emoji)
}
