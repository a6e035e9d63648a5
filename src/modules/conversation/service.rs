/// Conversation Service
///
/// Quản lý danh sách hội thoại của user:
///
/// - Direct: đúng 2 người, mỗi cặp chỉ có một hội thoại (khóa `direct_key` không phân biệt thứ tự)
/// - Group: người tạo là thành viên đầu tiên, có thể thêm thành viên sau
/// - Tên và avatar của người còn lại trong direct được lấy trực tiếp từ bảng user
///   ở mỗi lần đọc, nên đổi profile sẽ hiện ngay trong danh sách
use log::info;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::api::error;
use crate::constants::{DEFAULT_DIRECT_COLOR, DEFAULT_GROUP_COLOR};
use crate::modules::conversation::{
    model::{ConversationSummary, DirectConversationResponse, NewConversation},
    repository::ConversationRepository,
    schema::{direct_key, ConversationEntity, ConversationType},
};
use crate::modules::user::repository::UserRepository;
use crate::modules::user::schema::UserEntity;
use crate::modules::user::service::{display_info, load_user_map};
use crate::utils::{normalize_identity, Clock};

#[derive(Clone)]
pub struct ConversationService {
    conversation_repo: Arc<dyn ConversationRepository + Send + Sync>,
    user_repo: Arc<dyn UserRepository + Send + Sync>,
    clock: Arc<dyn Clock>,
}

impl ConversationService {
    pub fn with_dependencies(
        conversation_repo: Arc<dyn ConversationRepository + Send + Sync>,
        user_repo: Arc<dyn UserRepository + Send + Sync>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        ConversationService { conversation_repo, user_repo, clock }
    }

    pub async fn get_by_id(
        &self,
        conversation_id: &Uuid,
    ) -> Result<ConversationEntity, error::SystemError> {
        self.conversation_repo
            .find_by_id(conversation_id)
            .await?
            .ok_or_else(|| error::SystemError::not_found("Conversation not found"))
    }

    pub async fn list_for_user(
        &self,
        identity: &str,
    ) -> Result<Vec<ConversationSummary>, error::SystemError> {
        let conversations = self.conversation_repo.find_by_participant(identity).await?;

        let mut others: Vec<String> = conversations
            .iter()
            .filter(|c| c._type == ConversationType::Direct)
            .flat_map(|c| c.other_participants(identity).cloned())
            .collect();
        others.sort();
        others.dedup();
        let users = load_user_map(self.user_repo.as_ref(), &others).await?;

        Ok(conversations.into_iter().map(|c| summarize(c, identity, &users)).collect())
    }

    pub async fn create_group(
        &self,
        creator: &str,
        name: &str,
    ) -> Result<ConversationSummary, error::SystemError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(error::SystemError::invalid_operation("Group name cannot be empty"));
        }

        let conversation = self
            .conversation_repo
            .create_group(&NewConversation {
                _type: ConversationType::Group,
                participants: vec![creator.to_string()],
                name: name.to_string(),
                avatar_color: DEFAULT_GROUP_COLOR.to_string(),
                direct_key: None,
                created_at: self.clock.now(),
            })
            .await?;

        info!("Group {} created by {}", conversation.id, creator);
        Ok(summarize(conversation, creator, &Default::default()))
    }

    pub async fn create_direct(
        &self,
        requester: &str,
        target: &str,
    ) -> Result<DirectConversationResponse, error::SystemError> {
        let target = normalize_identity(target);
        if target == requester {
            return Err(error::SystemError::invalid_operation(
                "Cannot start a direct conversation with yourself",
            ));
        }

        let target_user = self
            .user_repo
            .find_by_email(&target)
            .await?
            .ok_or_else(|| error::SystemError::not_found("User not found"))?;

        let (conversation, created) = self
            .conversation_repo
            .find_or_create_direct(&NewConversation {
                _type: ConversationType::Direct,
                participants: vec![requester.to_string(), target.clone()],
                name: String::new(),
                avatar_color: DEFAULT_DIRECT_COLOR.to_string(),
                direct_key: Some(direct_key(requester, &target)),
                created_at: self.clock.now(),
            })
            .await?;

        if created {
            info!(
                "Direct conversation {} created for {} and {}",
                conversation.id, requester, target
            );
        }

        let users: HashMap<_, _> = [(target_user.email.clone(), target_user)].into_iter().collect();
        Ok(DirectConversationResponse {
            conversation: summarize(conversation, requester, &users),
            created,
        })
    }

    pub async fn set_typing(
        &self,
        conversation_id: &Uuid,
        identity: &str,
        is_typing: bool,
    ) -> Result<(), error::SystemError> {
        self.conversation_repo.set_typing(conversation_id, identity, is_typing).await
    }

    pub async fn add_member(
        &self,
        conversation_id: &Uuid,
        requester: &str,
        member: &str,
    ) -> Result<ConversationSummary, error::SystemError> {
        // Outsiders learn nothing about which identities exist.
        self.get_by_id(conversation_id).await?.require_participant(requester)?;

        let member = normalize_identity(member);
        if self.user_repo.find_by_email(&member).await?.is_none() {
            return Err(error::SystemError::not_found("User not found"));
        }

        let conversation =
            self.conversation_repo.add_member(conversation_id, requester, &member).await?;
        Ok(summarize(conversation, requester, &Default::default()))
    }
}

fn summarize(
    conversation: ConversationEntity,
    identity: &str,
    users: &HashMap<String, UserEntity>,
) -> ConversationSummary {
    let (name, avatar_url, avatar_color) = match conversation._type {
        ConversationType::Group => (conversation.name, None, conversation.avatar_color),
        ConversationType::Direct => {
            let other = conversation
                .other_participants(identity)
                .next()
                .cloned()
                .unwrap_or_else(|| identity.to_string());
            let info = display_info(users, &other);
            let color = info.avatar_color.unwrap_or(conversation.avatar_color);
            (info.name, info.avatar_url, color)
        }
    };

    ConversationSummary {
        id: conversation.id,
        _type: conversation._type,
        name,
        avatar_color,
        avatar_url,
        participants: conversation.participants,
        last_message_preview: conversation.last_message_preview,
        last_message_at: conversation.last_message_at,
        updated_at: conversation.updated_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::user::model::UpdateProfileModel;
    use crate::test::TestHarness;

    #[tokio::test]
    async fn test_create_direct_is_idempotent_for_unordered_pair() {
        let h = TestHarness::new().await;
        h.sign_up("a@x.io", "Alice").await;
        h.sign_up("b@x.io", "Bob").await;
        let svc = &h.services.conversation;

        let first = svc.create_direct("a@x.io", "b@x.io").await.unwrap();
        let again = svc.create_direct("a@x.io", "B@x.io").await.unwrap();
        let reverse = svc.create_direct("b@x.io", "a@x.io").await.unwrap();

        assert!(first.created);
        assert!(!again.created);
        assert!(!reverse.created);
        assert_eq!(first.conversation.id, again.conversation.id);
        assert_eq!(first.conversation.id, reverse.conversation.id);
        assert_eq!(svc.list_for_user("a@x.io").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_create_direct_yields_one_conversation() {
        let h = TestHarness::new().await;
        h.sign_up("a@x.io", "Alice").await;
        h.sign_up("b@x.io", "Bob").await;

        let tasks: Vec<_> = (0..8)
            .map(|i| {
                let svc = h.services.conversation.clone();
                tokio::spawn(async move {
                    if i % 2 == 0 {
                        svc.create_direct("a@x.io", "b@x.io").await
                    } else {
                        svc.create_direct("b@x.io", "a@x.io").await
                    }
                })
            })
            .collect();

        let mut ids = Vec::new();
        let mut created = 0;
        for task in tasks {
            let res = task.await.unwrap().unwrap();
            ids.push(res.conversation.id);
            created += res.created as usize;
        }
        ids.dedup();
        assert_eq!(ids.len(), 1);
        assert_eq!(created, 1);
    }

    #[tokio::test]
    async fn test_create_direct_rejects_self_and_unknown() {
        let h = TestHarness::new().await;
        h.sign_up("a@x.io", "Alice").await;
        let svc = &h.services.conversation;

        let err = svc.create_direct("a@x.io", "A@x.io").await.unwrap_err();
        assert!(matches!(err, error::SystemError::InvalidOperation(_)));

        let err = svc.create_direct("a@x.io", "ghost@x.io").await.unwrap_err();
        assert!(matches!(err, error::SystemError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_create_group_requires_name() {
        let h = TestHarness::new().await;
        h.sign_up("a@x.io", "Alice").await;

        let err = h.services.conversation.create_group("a@x.io", "   ").await.unwrap_err();
        assert!(matches!(err, error::SystemError::InvalidOperation(_)));

        let group = h.services.conversation.create_group("a@x.io", " Team ").await.unwrap();
        assert_eq!(group.name, "Team");
        assert_eq!(group.participants, vec!["a@x.io".to_string()]);
        assert_eq!(group.avatar_color, DEFAULT_GROUP_COLOR);
    }

    #[tokio::test]
    async fn test_list_uses_live_display_of_other_participant() {
        let h = TestHarness::new().await;
        h.sign_up("a@x.io", "Alice").await;
        h.sign_up("b@x.io", "Bob").await;
        h.services.conversation.create_direct("a@x.io", "b@x.io").await.unwrap();

        let list = h.services.conversation.list_for_user("a@x.io").await.unwrap();
        assert_eq!(list[0].name, "Bob");

        h.services
            .user
            .update_profile(
                "b@x.io",
                UpdateProfileModel {
                    name: "Robert".into(),
                    avatar_color: None,
                    avatar_url: Some("/uploads/bob.png".into()),
                },
            )
            .await
            .unwrap();

        let list = h.services.conversation.list_for_user("a@x.io").await.unwrap();
        assert_eq!(list[0].name, "Robert");
        assert_eq!(list[0].avatar_url.as_deref(), Some("/uploads/bob.png"));

        let list = h.services.conversation.list_for_user("b@x.io").await.unwrap();
        assert_eq!(list[0].name, "Alice");
    }

    #[tokio::test]
    async fn test_list_is_ordered_by_recent_update() {
        let h = TestHarness::new().await;
        h.sign_up("a@x.io", "Alice").await;
        let first = h.services.conversation.create_group("a@x.io", "First").await.unwrap();
        h.clock.advance_secs(5);
        let second = h.services.conversation.create_group("a@x.io", "Second").await.unwrap();

        let list = h.services.conversation.list_for_user("a@x.io").await.unwrap();
        assert_eq!(list.iter().map(|c| c.id).collect::<Vec<_>>(), vec![second.id, first.id]);

        h.clock.advance_secs(5);
        h.services.message.append(&first.id, "a@x.io", "bump", None).await.unwrap();
        let list = h.services.conversation.list_for_user("a@x.io").await.unwrap();
        assert_eq!(list[0].id, first.id);
        assert_eq!(list[0].last_message_preview.as_deref(), Some("bump"));
    }

    #[tokio::test]
    async fn test_typing_is_a_set_and_requires_membership() {
        let h = TestHarness::new().await;
        h.sign_up("a@x.io", "Alice").await;
        h.sign_up("b@x.io", "Bob").await;
        h.sign_up("c@x.io", "Carol").await;
        let conv = h.services.conversation.create_direct("a@x.io", "b@x.io").await.unwrap();
        let id = conv.conversation.id;
        let svc = &h.services.conversation;

        svc.set_typing(&id, "a@x.io", true).await.unwrap();
        svc.set_typing(&id, "a@x.io", true).await.unwrap();
        assert_eq!(svc.get_by_id(&id).await.unwrap().typing_users, vec!["a@x.io".to_string()]);

        svc.set_typing(&id, "b@x.io", false).await.unwrap();
        assert_eq!(svc.get_by_id(&id).await.unwrap().typing_users.len(), 1);

        let err = svc.set_typing(&id, "c@x.io", true).await.unwrap_err();
        assert!(matches!(err, error::SystemError::PermissionDenied(_)));

        let err = svc.set_typing(&Uuid::now_v7(), "a@x.io", true).await.unwrap_err();
        assert!(matches!(err, error::SystemError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_add_member_to_group_only() {
        let h = TestHarness::new().await;
        h.sign_up("a@x.io", "Alice").await;
        h.sign_up("b@x.io", "Bob").await;
        h.sign_up("c@x.io", "Carol").await;
        let svc = &h.services.conversation;

        let group = svc.create_group("a@x.io", "Team").await.unwrap();
        let updated = svc.add_member(&group.id, "a@x.io", "B@x.io").await.unwrap();
        assert_eq!(updated.participants, vec!["a@x.io".to_string(), "b@x.io".to_string()]);
        let again = svc.add_member(&group.id, "b@x.io", "b@x.io").await.unwrap();
        assert_eq!(again.participants.len(), 2);

        let err = svc.add_member(&group.id, "c@x.io", "c@x.io").await.unwrap_err();
        assert!(matches!(err, error::SystemError::PermissionDenied(_)));
        let err = svc.add_member(&group.id, "c@x.io", "ghost@x.io").await.unwrap_err();
        assert!(matches!(err, error::SystemError::PermissionDenied(_)));
        let err = svc.add_member(&group.id, "a@x.io", "ghost@x.io").await.unwrap_err();
        assert!(matches!(err, error::SystemError::NotFound(_)));

        let direct = svc.create_direct("a@x.io", "b@x.io").await.unwrap();
        let err = svc.add_member(&direct.conversation.id, "a@x.io", "c@x.io").await.unwrap_err();
        assert!(matches!(err, error::SystemError::InvalidOperation(_)));
    }
}
