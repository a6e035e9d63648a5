use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    api::error,
    modules::user::{
        model::{InsertUser, UpdateUser},
        repository::UserRepository,
        schema::UserEntity,
    },
};

#[derive(Default)]
pub struct UserRepositoryMemory {
    users: RwLock<HashMap<String, UserEntity>>,
}

impl UserRepositoryMemory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl UserRepository for UserRepositoryMemory {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserEntity>, error::SystemError> {
        Ok(self.users.read().await.get(email).cloned())
    }

    async fn find_by_emails(
        &self,
        emails: &[String],
    ) -> Result<Vec<UserEntity>, error::SystemError> {
        let users = self.users.read().await;
        Ok(emails.iter().filter_map(|email| users.get(email).cloned()).collect())
    }

    async fn create(&self, user: &InsertUser) -> Result<UserEntity, error::SystemError> {
        let mut users = self.users.write().await;
        if users.contains_key(&user.email) {
            return Err(error::SystemError::Conflict(Some(error::DbErrorMeta {
                code: None,
                constraint: Some("users_email".to_string()),
                message: "duplicate email".to_string(),
            })));
        }

        let entity = UserEntity {
            id: Uuid::new_v7(uuid::Timestamp::now(uuid::NoContext)),
            email: user.email.clone(),
            hash_password: user.hash_password.clone(),
            display_name: user.display_name.clone(),
            avatar_color: Some(user.avatar_color.clone()),
            avatar_url: None,
            last_active_at: None,
            created_at: user.created_at,
            updated_at: user.created_at,
        };
        users.insert(entity.email.clone(), entity.clone());
        Ok(entity)
    }

    async fn update_profile(
        &self,
        email: &str,
        user: &UpdateUser,
    ) -> Result<Option<UserEntity>, error::SystemError> {
        let mut users = self.users.write().await;
        let Some(entity) = users.get_mut(email) else {
            return Ok(None);
        };

        entity.display_name = user.display_name.clone();
        if let Some(color) = &user.avatar_color {
            entity.avatar_color = Some(color.clone());
        }
        if let Some(url) = &user.avatar_url {
            entity.avatar_url = Some(url.clone());
        }
        entity.updated_at = user.updated_at;
        Ok(Some(entity.clone()))
    }

    async fn set_last_active(
        &self,
        email: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, error::SystemError> {
        let mut users = self.users.write().await;
        match users.get_mut(email) {
            Some(entity) => {
                entity.last_active_at = Some(at);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
