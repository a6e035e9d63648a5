use chrono::{DateTime, Utc};

use crate::{
    api::error,
    modules::user::{
        model::{InsertUser, UpdateUser},
        schema::UserEntity,
    },
};

#[async_trait::async_trait]
pub trait UserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserEntity>, error::SystemError>;

    /// Unknown identities are simply absent from the result.
    async fn find_by_emails(
        &self,
        emails: &[String],
    ) -> Result<Vec<UserEntity>, error::SystemError>;

    /// Fails with `Conflict` when the email is taken.
    async fn create(&self, user: &InsertUser) -> Result<UserEntity, error::SystemError>;

    async fn update_profile(
        &self,
        email: &str,
        user: &UpdateUser,
    ) -> Result<Option<UserEntity>, error::SystemError>;

    /// Returns false when no such user exists.
    async fn set_last_active(
        &self,
        email: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, error::SystemError>;
}
