use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    api::error,
    modules::user::{
        model::{InsertUser, UpdateUser},
        repository::UserRepository,
        schema::UserEntity,
    },
};

#[derive(Clone)]
pub struct UserRepositoryPg {
    pool: sqlx::PgPool,
}

impl UserRepositoryPg {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl UserRepository for UserRepositoryPg {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserEntity>, error::SystemError> {
        let user = sqlx::query_as::<_, UserEntity>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_by_emails(
        &self,
        emails: &[String],
    ) -> Result<Vec<UserEntity>, error::SystemError> {
        if emails.is_empty() {
            return Ok(vec![]);
        }

        let users = sqlx::query_as::<_, UserEntity>("SELECT * FROM users WHERE email = ANY($1)")
            .bind(emails)
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }

    async fn create(&self, user: &InsertUser) -> Result<UserEntity, error::SystemError> {
        let id = Uuid::new_v7(uuid::Timestamp::now(uuid::NoContext));
        let entity = sqlx::query_as::<_, UserEntity>(
            r#"
            INSERT INTO users (id, email, hash_password, display_name, avatar_color, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $6)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&user.email)
        .bind(&user.hash_password)
        .bind(&user.display_name)
        .bind(&user.avatar_color)
        .bind(user.created_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(entity)
    }

    async fn update_profile(
        &self,
        email: &str,
        user: &UpdateUser,
    ) -> Result<Option<UserEntity>, error::SystemError> {
        let entity = sqlx::query_as::<_, UserEntity>(
            r#"
            UPDATE users
            SET display_name = $2,
                avatar_color = COALESCE($3, avatar_color),
                avatar_url = COALESCE($4, avatar_url),
                updated_at = $5
            WHERE email = $1
            RETURNING *
            "#,
        )
        .bind(email)
        .bind(&user.display_name)
        .bind(&user.avatar_color)
        .bind(&user.avatar_url)
        .bind(user.updated_at)
        .fetch_optional(&self.pool)
        .await?;
        Ok(entity)
    }

    async fn set_last_active(
        &self,
        email: &str,
        at: DateTime<Utc>,
    ) -> Result<bool, error::SystemError> {
        let result = sqlx::query("UPDATE users SET last_active_at = $2 WHERE email = $1")
            .bind(email)
            .bind(at)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
